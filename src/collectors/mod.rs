//! Collectors
//!
//! One collector per enabled resource type: a filtered family set, the store
//! it renders into, and one reflector per namespace scope feeding that store.

pub mod build;
pub mod build_config;
pub mod cluster_resource_quota;
pub mod deployment_config;
pub mod util;

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use kube::Resource;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::metrics::{compose, filter_metric_families, ExporterMetrics, FamilyFilter, FamilyGenerator, IdentityLabels, WhiteBlackList};
use crate::options::NamespaceList;
use crate::store::{Layout, MetricsStore, MetricsWriter};
use crate::sync::{Reflector, ReflectorConfig, SourceFactory, WatchScope, WatchedObject};

/// Every collector name the exporter knows, sorted
pub const AVAILABLE_COLLECTORS: [&str; 4] = [
    build_config::RESOURCE,
    build::RESOURCE,
    cluster_resource_quota::RESOURCE,
    deployment_config::RESOURCE,
];

/// Collectors enabled when none are requested
pub const DEFAULT_COLLECTORS: [&str; 1] = [deployment_config::RESOURCE];

/// Everything needed to track one resource type
pub struct ResourceSpec<K> {
    pub name: &'static str,
    pub namespaced: bool,
    pub families: Vec<FamilyGenerator<K>>,
    pub identity: IdentityLabels<K>,
}

/// Build the store of a resource type over the families `filter` admits
pub fn new_store<K: Resource>(
    spec: ResourceSpec<K>,
    filter: &dyn FamilyFilter,
    layout: Layout,
    telemetry: Arc<ExporterMetrics>,
) -> MetricsStore<K> {
    let families = filter_metric_families(filter, spec.families);
    let generator = compose(spec.name, families, spec.identity, telemetry);
    MetricsStore::new(generator).with_layout(layout)
}

// =============================================================================
// Registry
// =============================================================================

/// A named store as seen by the scrape path
#[derive(Clone)]
pub struct Collector {
    name: &'static str,
    store: Arc<dyn MetricsWriter>,
}

impl Collector {
    pub fn new(name: &'static str, store: Arc<dyn MetricsWriter>) -> Self {
        Self { name, store }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn write_all(&self, out: &mut String) {
        self.store.write_all(out);
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

/// Enabled collectors in name order
pub struct CollectorRegistry {
    collectors: Vec<Collector>,
    telemetry: Arc<ExporterMetrics>,
}

impl CollectorRegistry {
    pub fn new(collectors: Vec<Collector>, telemetry: Arc<ExporterMetrics>) -> Self {
        Self {
            collectors,
            telemetry,
        }
    }

    /// Exposition text of every collector, concatenated
    pub fn gather(&self) -> String {
        let mut out = String::new();
        for collector in &self.collectors {
            self.telemetry
                .observe_resources_per_scrape(collector.name, collector.len());
            collector.write_all(&mut out);
        }
        out
    }

    pub fn collectors(&self) -> &[Collector] {
        &self.collectors
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.collectors.iter().map(Collector::name).collect()
    }
}

/// Registry plus the reflector tasks feeding it
pub struct RunningCollectors {
    registry: Arc<CollectorRegistry>,
    tasks: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for RunningCollectors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunningCollectors")
            .field("collectors", &self.registry.names())
            .field("tasks", &self.tasks.len())
            .finish()
    }
}

impl RunningCollectors {
    pub fn registry(&self) -> Arc<CollectorRegistry> {
        self.registry.clone()
    }

    /// Wait for every reflector to stop; they stop once cancelled
    pub async fn join(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!("Reflector task failed: {}", e);
            }
        }
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Assembles the enabled collectors and starts their reflectors
pub struct Builder<F> {
    factory: F,
    namespaces: NamespaceList,
    enabled: Vec<String>,
    filter: WhiteBlackList,
    layout: Layout,
    reflector: ReflectorConfig,
    telemetry: Arc<ExporterMetrics>,
    cancel: CancellationToken,
}

impl<F: SourceFactory> Builder<F> {
    pub fn new(factory: F, telemetry: Arc<ExporterMetrics>, cancel: CancellationToken) -> Self {
        Self {
            factory,
            namespaces: NamespaceList::all(),
            enabled: DEFAULT_COLLECTORS.iter().map(|c| c.to_string()).collect(),
            filter: WhiteBlackList::allow_all(),
            layout: Layout::default(),
            reflector: ReflectorConfig::default(),
            telemetry,
            cancel,
        }
    }

    pub fn with_namespaces(mut self, namespaces: NamespaceList) -> Self {
        self.namespaces = namespaces;
        self
    }

    /// Collectors to build; order and duplicates do not matter
    pub fn with_enabled_collectors<I, S>(mut self, collectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut enabled: Vec<String> = collectors.into_iter().map(Into::into).collect();
        enabled.sort();
        enabled.dedup();
        self.enabled = enabled;
        self
    }

    pub fn with_white_black_list(mut self, filter: WhiteBlackList) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_reflector_config(mut self, config: ReflectorConfig) -> Self {
        self.reflector = config;
        self
    }

    /// Build every enabled collector, then start the reflectors.
    ///
    /// Every store exists and is registered before the first reflector runs.
    pub fn build(&self) -> Result<RunningCollectors> {
        let mut collectors = Vec::with_capacity(self.enabled.len());
        let mut reflectors = Vec::new();

        for name in &self.enabled {
            let collector = match name.as_str() {
                build_config::RESOURCE => {
                    self.prepare(build_config::resource_spec(), &mut reflectors)
                }
                build::RESOURCE => self.prepare(build::resource_spec(), &mut reflectors),
                cluster_resource_quota::RESOURCE => {
                    self.prepare(cluster_resource_quota::resource_spec(), &mut reflectors)
                }
                deployment_config::RESOURCE => {
                    self.prepare(deployment_config::resource_spec(), &mut reflectors)
                }
                other => return Err(Error::UnknownCollector(other.to_string())),
            };
            collectors.push(collector);
        }

        let registry = Arc::new(CollectorRegistry::new(collectors, self.telemetry.clone()));
        info!(
            namespaces = %self.namespaces,
            "Active collectors: {}",
            registry.names().join(",")
        );

        let tasks = reflectors.into_iter().map(tokio::spawn).collect();
        Ok(RunningCollectors { registry, tasks })
    }

    fn prepare<K: WatchedObject>(
        &self,
        spec: ResourceSpec<K>,
        reflectors: &mut Vec<BoxFuture<'static, ()>>,
    ) -> Collector {
        let name = spec.name;
        let namespaced = spec.namespaced;
        let store = Arc::new(new_store(spec, &self.filter, self.layout, self.telemetry.clone()));

        for scope in self.scopes(namespaced) {
            let source = self.factory.source::<K>(name, &scope);
            let reflector = Reflector::new(name, scope, source, store.clone(), self.telemetry.clone())
                .with_config(self.reflector.clone());
            reflectors.push(reflector.run(self.cancel.clone()).boxed());
        }

        Collector::new(name, store)
    }

    fn scopes(&self, namespaced: bool) -> Vec<WatchScope> {
        if !namespaced {
            return vec![WatchScope::Cluster];
        }
        if self.namespaces.is_all_namespaces() {
            return vec![WatchScope::AllNamespaces];
        }
        self.namespaces
            .iter()
            .map(|ns| WatchScope::Namespace(ns.to_string()))
            .collect()
    }
}

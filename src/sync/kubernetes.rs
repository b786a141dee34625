//! Kubernetes watch source
//!
//! List/watch against the API server through an untyped `Api<DynamicObject>`
//! so every delivered object is checked for its kind before it is decoded.

use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{future, StreamExt};
use kube::api::{Api, ApiResource, DynamicObject, ListParams, WatchParams};
use kube::core::{TypeMeta, WatchEvent as KubeWatchEvent};
use kube::config::{Config, KubeConfigOptions, Kubeconfig};
use kube::Client;
use tracing::{debug, info, warn};

use super::{ListPage, SourceFactory, WatchEvent, WatchScope, WatchSource, WatchStream, WatchedObject};
use crate::error::{Error, Result};
use crate::metrics::ExporterMetrics;

/// Server-side watch timeout in seconds
const WATCH_TIMEOUT_SECS: u32 = 290;

/// Create a client from an explicit kubeconfig and/or API server URL,
/// falling back to in-cluster or default kubeconfig discovery.
pub async fn create_client(apiserver: Option<&str>, kubeconfig: Option<&Path>) -> Result<Client> {
    let mut config = match kubeconfig {
        Some(path) => {
            let raw = Kubeconfig::read_from(path)
                .map_err(|e| Error::Config(format!("failed to read kubeconfig {}: {}", path.display(), e)))?;
            Config::from_custom_kubeconfig(raw, &KubeConfigOptions::default())
                .await
                .map_err(|e| Error::Config(format!("invalid kubeconfig {}: {}", path.display(), e)))?
        }
        None => Config::infer()
            .await
            .map_err(|e| Error::Config(format!("failed to infer cluster config: {}", e)))?,
    };

    if let Some(server) = apiserver {
        config.cluster_url = server
            .parse()
            .map_err(|e| Error::Config(format!("invalid apiserver URL {:?}: {}", server, e)))?;
    }

    info!(apiserver = %config.cluster_url, "Using API server");
    Ok(Client::try_from(config)?)
}

/// Decode an untyped object into `K`, rejecting objects of another kind
pub fn decode_object<K: WatchedObject>(mut obj: DynamicObject) -> Result<K> {
    let expected = K::kind(&()).to_string();

    match &obj.types {
        Some(types) if !types.kind.is_empty() && types.kind != expected => {
            return Err(Error::TypeMismatch {
                expected,
                found: types.kind.clone(),
            });
        }
        _ => {}
    }

    // List items may omit apiVersion/kind
    obj.types = Some(TypeMeta {
        api_version: K::api_version(&()).to_string(),
        kind: expected,
    });

    let value = serde_json::to_value(obj)?;
    Ok(serde_json::from_value(value)?)
}

/// Watch source for `K` backed by the API server
pub struct KubeWatchSource<K> {
    api: Api<DynamicObject>,
    resource: &'static str,
    scope: WatchScope,
    telemetry: Arc<ExporterMetrics>,
    _marker: PhantomData<fn() -> K>,
}

impl<K: WatchedObject> KubeWatchSource<K> {
    pub fn new(
        client: Client,
        resource: &'static str,
        scope: &WatchScope,
        telemetry: Arc<ExporterMetrics>,
    ) -> Self {
        let api_resource = ApiResource::erase::<K>(&());
        let api = match scope {
            WatchScope::Namespace(ns) => Api::namespaced_with(client, ns, &api_resource),
            WatchScope::Cluster | WatchScope::AllNamespaces => Api::all_with(client, &api_resource),
        };

        Self {
            api,
            resource,
            scope: scope.clone(),
            telemetry,
            _marker: PhantomData,
        }
    }
}

/// Decode or log, count and drop
fn decode_or_skip<K: WatchedObject>(
    resource: &'static str,
    telemetry: &ExporterMetrics,
    obj: DynamicObject,
) -> Option<K> {
    let name = obj.metadata.name.clone().unwrap_or_default();
    match decode_object::<K>(obj) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!(resource, object = %name, "Skipping object: {}", e);
            let reason = match e {
                Error::TypeMismatch { .. } => "type_mismatch",
                _ => "decode_error",
            };
            telemetry.record_skipped_object(resource, reason);
            None
        }
    }
}

/// Map one raw watch event; `None` for bookmarks and skipped objects
fn convert_event<K: WatchedObject>(
    resource: &'static str,
    scope: &WatchScope,
    telemetry: &ExporterMetrics,
    event: kube::Result<KubeWatchEvent<DynamicObject>>,
) -> Option<Result<WatchEvent<K>>> {
    match event {
        Err(e) => Some(Err(Error::Kube(e))),
        Ok(KubeWatchEvent::Added(o)) => {
            decode_or_skip(resource, telemetry, o).map(|k| Ok(WatchEvent::Added(k)))
        }
        Ok(KubeWatchEvent::Modified(o)) => {
            decode_or_skip(resource, telemetry, o).map(|k| Ok(WatchEvent::Modified(k)))
        }
        Ok(KubeWatchEvent::Deleted(o)) => {
            decode_or_skip(resource, telemetry, o).map(|k| Ok(WatchEvent::Deleted(k)))
        }
        Ok(KubeWatchEvent::Bookmark(_)) => {
            debug!(resource, scope = %scope, "Watch bookmark");
            None
        }
        // 410 Gone lands here; the reflector relists
        Ok(KubeWatchEvent::Error(status)) => Some(Err(Error::Watch {
            resource: resource.to_string(),
            namespace: scope.to_string(),
            reason: format!("{} ({})", status.message, status.code),
        })),
    }
}

#[async_trait]
impl<K: WatchedObject> WatchSource<K> for KubeWatchSource<K> {
    async fn list(&self) -> Result<ListPage<K>> {
        let list = self.api.list(&ListParams::default()).await?;
        let resource_version = list.metadata.resource_version.clone().unwrap_or_default();

        let items = list
            .items
            .into_iter()
            .filter_map(|o| decode_or_skip(self.resource, &self.telemetry, o))
            .collect();

        Ok(ListPage {
            items,
            resource_version,
        })
    }

    async fn watch(&self, resource_version: &str) -> Result<WatchStream<K>> {
        let params = WatchParams::default().timeout(WATCH_TIMEOUT_SECS);
        let raw = self.api.watch(&params, resource_version).await?;

        let resource = self.resource;
        let scope = self.scope.clone();
        let telemetry = self.telemetry.clone();

        let events = raw.filter_map(move |event| {
            future::ready(convert_event(resource, &scope, &telemetry, event))
        });

        Ok(events.boxed())
    }
}

/// Builds [`KubeWatchSource`]s sharing one client
#[derive(Clone)]
pub struct KubeSourceFactory {
    client: Client,
    telemetry: Arc<ExporterMetrics>,
}

impl KubeSourceFactory {
    pub fn new(client: Client, telemetry: Arc<ExporterMetrics>) -> Self {
        Self { client, telemetry }
    }
}

impl SourceFactory for KubeSourceFactory {
    fn source<K: WatchedObject>(
        &self,
        resource: &'static str,
        scope: &WatchScope,
    ) -> Box<dyn WatchSource<K>> {
        Box::new(KubeWatchSource::<K>::new(
            self.client.clone(),
            resource,
            scope,
            self.telemetry.clone(),
        ))
    }
}

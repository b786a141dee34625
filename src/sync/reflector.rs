//! Reflector
//!
//! Keeps one store in step with one watch source: list, replace, then apply
//! watch events until the stream ends or fails, and start over.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{WatchEvent, WatchScope, WatchSource, WatchedObject};
use crate::error::Result;
use crate::metrics::ExporterMetrics;
use crate::store::MetricsStore;

/// Retry timing of a reflector
#[derive(Debug, Clone)]
pub struct ReflectorConfig {
    /// Delay after the first failure
    pub initial_backoff: Duration,
    /// Upper bound of the doubling delay
    pub max_backoff: Duration,
}

impl Default for ReflectorConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}

/// Mirrors a watch source into a metrics store
pub struct Reflector<K> {
    resource: &'static str,
    scope: WatchScope,
    source: Box<dyn WatchSource<K>>,
    store: Arc<MetricsStore<K>>,
    telemetry: Arc<ExporterMetrics>,
    config: ReflectorConfig,
}

impl<K: WatchedObject> Reflector<K> {
    pub fn new(
        resource: &'static str,
        scope: WatchScope,
        source: Box<dyn WatchSource<K>>,
        store: Arc<MetricsStore<K>>,
        telemetry: Arc<ExporterMetrics>,
    ) -> Self {
        Self {
            resource,
            scope,
            source,
            store,
            telemetry,
            config: ReflectorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ReflectorConfig) -> Self {
        self.config = config;
        self
    }

    /// Run until `cancel` fires
    pub async fn run(self, cancel: CancellationToken) {
        info!(resource = self.resource, scope = %self.scope, "Starting reflector");

        let mut backoff = self.config.initial_backoff;

        loop {
            let outcome = tokio::select! {
                _ = cancel.cancelled() => break,
                outcome = self.list_and_watch(&mut backoff) => outcome,
            };

            match outcome {
                Ok(()) => debug!(resource = self.resource, scope = %self.scope, "Watch closed, relisting"),
                Err(e) => {
                    warn!(
                        resource = self.resource,
                        scope = %self.scope,
                        "List/watch failed, retrying in {:?}: {}",
                        backoff,
                        e
                    );
                    self.telemetry
                        .record_watch_error(self.resource, &self.scope.to_string());

                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                    backoff = (backoff * 2).min(self.config.max_backoff);
                }
            }
        }

        info!(resource = self.resource, scope = %self.scope, "Reflector stopped");
    }

    async fn list_and_watch(&self, backoff: &mut Duration) -> Result<()> {
        let page = self.source.list().await?;
        debug!(
            resource = self.resource,
            scope = %self.scope,
            count = page.items.len(),
            resource_version = %page.resource_version,
            "Listed objects"
        );
        self.replace(&page.items);
        *backoff = self.config.initial_backoff;

        let mut events = self.source.watch(&page.resource_version).await?;
        while let Some(event) = events.next().await {
            self.apply(event?);
        }

        Ok(())
    }

    fn replace(&self, items: &[K]) {
        match &self.scope {
            WatchScope::Namespace(ns) => self.store.replace_namespace(ns, items),
            WatchScope::Cluster | WatchScope::AllNamespaces => self.store.replace(items),
        }
    }

    fn apply(&self, event: WatchEvent<K>) {
        self.telemetry
            .record_watch_event(self.resource, event.kind());

        match event {
            WatchEvent::Added(obj) => self.store.add(&obj),
            WatchEvent::Modified(obj) => self.store.update(&obj),
            WatchEvent::Deleted(obj) => self.store.delete(&obj),
        }
    }
}

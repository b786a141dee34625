//! In-memory watch source
//!
//! Serves list/watch from an append-only event log. Used by tests and by
//! anything that wants to drive stores without an API server.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use kube::Resource;
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::{ListPage, SourceFactory, WatchEvent, WatchScope, WatchSource, WatchStream, WatchedObject};
use crate::error::{Error, Result};
use crate::store::ObjectKey;

struct MemoryState<K> {
    objects: BTreeMap<ObjectKey, K>,
    log: Vec<WatchEvent<K>>,
    fail_next_list: Option<String>,
}

/// Shared handle to an in-memory object set; clones see the same state
pub struct MemoryWatchSource<K> {
    state: Arc<Mutex<MemoryState<K>>>,
    notify: Arc<Notify>,
    scope: WatchScope,
}

impl<K> Clone for MemoryWatchSource<K> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            notify: self.notify.clone(),
            scope: self.scope.clone(),
        }
    }
}

impl<K: Resource + Clone> Default for MemoryWatchSource<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Resource + Clone> MemoryWatchSource<K> {
    pub fn new() -> Self {
        Self::with_objects(Vec::new())
    }

    /// Source whose initial list returns `objects`
    pub fn with_objects(objects: Vec<K>) -> Self {
        let objects = objects
            .into_iter()
            .map(|o| (ObjectKey::from_resource(&o), o))
            .collect();

        Self {
            state: Arc::new(Mutex::new(MemoryState {
                objects,
                log: Vec::new(),
                fail_next_list: None,
            })),
            notify: Arc::new(Notify::new()),
            scope: WatchScope::AllNamespaces,
        }
    }

    /// Handle on the same object set that reports errors under `scope`
    pub fn scoped(&self, scope: WatchScope) -> Self {
        Self {
            scope,
            ..self.clone()
        }
    }

    /// Record a change and wake every open watch
    pub fn apply(&self, event: WatchEvent<K>) {
        {
            let mut state = self.state.lock();
            let key = ObjectKey::from_resource(event.object());
            match &event {
                WatchEvent::Added(o) | WatchEvent::Modified(o) => {
                    state.objects.insert(key, o.clone());
                }
                WatchEvent::Deleted(_) => {
                    state.objects.remove(&key);
                }
            }
            state.log.push(event);
        }
        self.notify.notify_waiters();
    }

    /// Make the next list call fail with `reason`
    pub fn fail_next_list(&self, reason: &str) {
        self.state.lock().fail_next_list = Some(reason.to_string());
    }

    /// Objects currently in the set
    pub fn objects(&self) -> Vec<K> {
        self.state.lock().objects.values().cloned().collect()
    }
}

#[async_trait]
impl<K: WatchedObject> WatchSource<K> for MemoryWatchSource<K> {
    async fn list(&self) -> Result<ListPage<K>> {
        let mut state = self.state.lock();

        if let Some(reason) = state.fail_next_list.take() {
            return Err(Error::Watch {
                resource: K::plural(&()).to_string(),
                namespace: self.scope.to_string(),
                reason,
            });
        }

        Ok(ListPage {
            items: state.objects.values().cloned().collect(),
            resource_version: state.log.len().to_string(),
        })
    }

    async fn watch(&self, resource_version: &str) -> Result<WatchStream<K>> {
        let start: usize = resource_version.parse().map_err(|_| Error::Watch {
            resource: K::plural(&()).to_string(),
            namespace: self.scope.to_string(),
            reason: format!("invalid resource version {:?}", resource_version),
        })?;

        let state = self.state.clone();
        let notify = self.notify.clone();

        let events = stream::unfold(start, move |position| {
            let state = state.clone();
            let notify = notify.clone();
            async move {
                loop {
                    let notified = notify.notified();
                    let next = state.lock().log.get(position).cloned();
                    if let Some(event) = next {
                        return Some((Ok(event), position + 1));
                    }
                    notified.await;
                }
            }
        });

        Ok(events.boxed())
    }
}

/// Hands out registered in-memory sources by resource type and scope.
///
/// A type/scope pair with nothing registered gets an empty source.
#[derive(Default)]
pub struct MemorySourceFactory {
    sources: Mutex<HashMap<(TypeId, WatchScope), Box<dyn Any + Send + Sync>>>,
}

impl MemorySourceFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<K: WatchedObject>(&self, scope: WatchScope, source: MemoryWatchSource<K>) {
        self.sources
            .lock()
            .insert((TypeId::of::<K>(), scope), Box::new(source));
    }
}

impl SourceFactory for MemorySourceFactory {
    fn source<K: WatchedObject>(
        &self,
        _resource: &'static str,
        scope: &WatchScope,
    ) -> Box<dyn WatchSource<K>> {
        let registered = self
            .sources
            .lock()
            .get(&(TypeId::of::<K>(), scope.clone()))
            .and_then(|s| s.downcast_ref::<MemoryWatchSource<K>>())
            .cloned()
            .unwrap_or_default();

        Box::new(registered.scoped(scope.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::ConfigMap;
    use kube::api::ObjectMeta;

    fn config_map(name: &str) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("ns1".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_list_reflects_applied_events() {
        let source = MemoryWatchSource::with_objects(vec![config_map("a")]);
        source.apply(WatchEvent::Added(config_map("b")));
        source.apply(WatchEvent::Deleted(config_map("a")));

        let page = source.list().await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].metadata.name.as_deref(), Some("b"));
        assert_eq!(page.resource_version, "2");
    }

    #[tokio::test]
    async fn test_watch_resumes_after_version() {
        let source = MemoryWatchSource::<ConfigMap>::new();
        source.apply(WatchEvent::Added(config_map("a")));

        let page = source.list().await.unwrap();
        let mut events = source.watch(&page.resource_version).await.unwrap();

        source.apply(WatchEvent::Modified(config_map("a")));
        let event = events.next().await.unwrap().unwrap();
        assert_eq!(event.kind(), "modified");
    }

    #[tokio::test]
    async fn test_fail_next_list_fails_once() {
        let source = MemoryWatchSource::<ConfigMap>::new();
        source.fail_next_list("boom");

        assert!(source.list().await.is_err());
        assert!(source.list().await.is_ok());
    }

    #[tokio::test]
    async fn test_list_error_names_the_scope() {
        let factory = MemorySourceFactory::new();
        let source = MemoryWatchSource::<ConfigMap>::new();
        source.fail_next_list("boom");
        factory.register(WatchScope::Namespace("ns1".into()), source);

        let found = factory.source::<ConfigMap>("configmaps", &WatchScope::Namespace("ns1".into()));
        let err = found.list().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Watch { ref resource, ref namespace, ref reason }
                if resource == "configmaps" && namespace == "ns1" && reason == "boom"
        ));
    }

    #[tokio::test]
    async fn test_bad_resource_version_names_the_scope() {
        let source = MemoryWatchSource::<ConfigMap>::new().scoped(WatchScope::Cluster);
        let err = source.watch("not-a-number").await.err().unwrap();
        assert!(matches!(err, Error::Watch { ref namespace, .. } if namespace == "cluster"));
    }

    #[tokio::test]
    async fn test_factory_returns_registered_source() {
        let factory = MemorySourceFactory::new();
        let source = MemoryWatchSource::with_objects(vec![config_map("a")]);
        factory.register(WatchScope::AllNamespaces, source);

        let found = factory.source::<ConfigMap>("configmaps", &WatchScope::AllNamespaces);
        assert_eq!(found.list().await.unwrap().items.len(), 1);

        let missing = factory.source::<ConfigMap>("configmaps", &WatchScope::Cluster);
        assert!(missing.list().await.unwrap().items.is_empty());
    }
}

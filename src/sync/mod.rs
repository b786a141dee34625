//! Synchronization layer
//!
//! Watch sources deliver the list/watch view of one resource type in one
//! namespace scope; a [`Reflector`] mirrors that view into a shared store.
//!
//! ```text
//! WatchSource (List + Watch) ──▶ Reflector ──▶ MetricsStore ◀── scrape
//! ```

mod kubernetes;
mod memory;
mod reflector;

use std::fmt;

use async_trait::async_trait;
use futures::stream::BoxStream;
use kube::Resource;
use serde::de::DeserializeOwned;

use crate::error::Result;

pub use kubernetes::{create_client, decode_object, KubeSourceFactory, KubeWatchSource};
pub use memory::{MemorySourceFactory, MemoryWatchSource};
pub use reflector::{Reflector, ReflectorConfig};

/// Object types that can be listed, watched and decoded
pub trait WatchedObject:
    Resource<DynamicType = ()> + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static
{
}

impl<K> WatchedObject for K where
    K: Resource<DynamicType = ()> + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static
{
}

/// One change delivered by a watch
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent<K> {
    Added(K),
    Modified(K),
    Deleted(K),
}

impl<K> WatchEvent<K> {
    /// Lowercase event name used in logs and telemetry
    pub fn kind(&self) -> &'static str {
        match self {
            WatchEvent::Added(_) => "added",
            WatchEvent::Modified(_) => "modified",
            WatchEvent::Deleted(_) => "deleted",
        }
    }

    pub fn object(&self) -> &K {
        match self {
            WatchEvent::Added(o) | WatchEvent::Modified(o) | WatchEvent::Deleted(o) => o,
        }
    }
}

/// Result of a full list
#[derive(Debug, Clone)]
pub struct ListPage<K> {
    pub items: Vec<K>,
    /// Version to resume watching from
    pub resource_version: String,
}

/// Stream of watch events, ending when the server closes the watch
pub type WatchStream<K> = BoxStream<'static, Result<WatchEvent<K>>>;

/// List/watch access to one resource type in one scope
#[async_trait]
pub trait WatchSource<K>: Send + Sync {
    /// Every object currently in scope
    async fn list(&self) -> Result<ListPage<K>>;

    /// Changes after `resource_version`
    async fn watch(&self, resource_version: &str) -> Result<WatchStream<K>>;
}

/// Scope a single synchronizer covers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WatchScope {
    /// Cluster-scoped resource type
    Cluster,
    /// Namespaced resource type, every namespace
    AllNamespaces,
    /// Namespaced resource type, one namespace
    Namespace(String),
}

impl WatchScope {
    /// Namespace name, if the scope is a single namespace
    pub fn namespace(&self) -> Option<&str> {
        match self {
            WatchScope::Namespace(ns) => Some(ns),
            _ => None,
        }
    }
}

impl fmt::Display for WatchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchScope::Cluster => write!(f, "cluster"),
            WatchScope::AllNamespaces => write!(f, "all"),
            WatchScope::Namespace(ns) => write!(f, "{}", ns),
        }
    }
}

/// Creates the watch source of a resource type for a scope
pub trait SourceFactory: Send + Sync {
    fn source<K: WatchedObject>(
        &self,
        resource: &'static str,
        scope: &WatchScope,
    ) -> Box<dyn WatchSource<K>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_event_kind() {
        assert_eq!(WatchEvent::Added(1).kind(), "added");
        assert_eq!(WatchEvent::Modified(1).kind(), "modified");
        assert_eq!(WatchEvent::Deleted(1).kind(), "deleted");
        assert_eq!(*WatchEvent::Deleted(7).object(), 7);
    }

    #[test]
    fn test_watch_scope_display() {
        assert_eq!(WatchScope::Cluster.to_string(), "cluster");
        assert_eq!(WatchScope::AllNamespaces.to_string(), "all");
        assert_eq!(WatchScope::Namespace("ns1".into()).to_string(), "ns1");
        assert_eq!(WatchScope::Namespace("ns1".into()).namespace(), Some("ns1"));
        assert_eq!(WatchScope::AllNamespaces.namespace(), None);
    }
}

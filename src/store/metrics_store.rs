//! Metrics Store
//!
//! Keyed cache of pre-rendered exposition text, one entry per tracked object.
//!
//! # Design
//!
//! - Transforms run on write, outside the lock; the lock is only held to
//!   swap the finished `Arc<RenderedEntry>` into the map
//! - Reads clone the entry `Arc`s under a read lock and concatenate after
//!   releasing it, so a scrape never runs a transform
//! - Each key holds the result of exactly one write (last write wins)

use std::collections::BTreeMap;
use std::sync::Arc;

use kube::Resource;
use parking_lot::RwLock;
use tracing::trace;

use super::entry::{ObjectKey, RenderedEntry};
use super::Layout;
use crate::metrics::ComposedGenerator;

/// Read side of a store, as seen by the scrape path
pub trait MetricsWriter: Send + Sync {
    /// Append the header block and all entries
    fn write_all(&self, out: &mut String);

    /// Number of tracked objects
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Concurrency-safe store of rendered metrics for objects of type `K`
pub struct MetricsStore<K> {
    headers: Vec<String>,
    generator: ComposedGenerator<K>,
    layout: Layout,
    entries: RwLock<BTreeMap<ObjectKey, Arc<RenderedEntry>>>,
}

impl<K: Resource> MetricsStore<K> {
    /// Create a store; the header block is fixed from here on
    pub fn new(generator: ComposedGenerator<K>) -> Self {
        Self {
            headers: generator.headers(),
            generator,
            layout: Layout::default(),
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    fn render(&self, obj: &K) -> (ObjectKey, Arc<RenderedEntry>) {
        let families = self.generator.generate(obj);
        (
            ObjectKey::from_resource(obj),
            Arc::new(RenderedEntry::render(&families)),
        )
    }

    /// Render `obj` and store it under its key
    pub fn add(&self, obj: &K) {
        let (key, entry) = self.render(obj);
        trace!(resource = self.generator.resource(), key = %key, "store add");
        self.entries.write().insert(key, entry);
    }

    /// Same effect as [`add`](Self::add)
    pub fn update(&self, obj: &K) {
        self.add(obj);
    }

    /// Remove the entry for `obj`; no-op if absent
    pub fn delete(&self, obj: &K) {
        self.delete_key(&ObjectKey::from_resource(obj));
    }

    pub fn delete_key(&self, key: &ObjectKey) {
        trace!(resource = self.generator.resource(), key = %key, "store delete");
        self.entries.write().remove(key);
    }

    /// Swap the whole mapping to exactly `objects`
    pub fn replace(&self, objects: &[K]) {
        let fresh: BTreeMap<_, _> = objects.iter().map(|o| self.render(o)).collect();
        *self.entries.write() = fresh;
    }

    /// Swap only the entries of `namespace` to exactly `objects`.
    ///
    /// Used when several synchronizers, one per namespace, share a store.
    pub fn replace_namespace(&self, namespace: &str, objects: &[K]) {
        let fresh: Vec<_> = objects.iter().map(|o| self.render(o)).collect();
        let mut entries = self.entries.write();
        entries.retain(|key, _| !key.in_namespace(namespace));
        entries.extend(fresh);
    }

    /// Header block followed by every entry
    pub fn list(&self) -> String {
        let mut out = String::new();
        self.write_all(&mut out);
        out
    }

    pub fn get(&self, key: &ObjectKey) -> Option<Arc<RenderedEntry>> {
        self.entries.read().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<ObjectKey> {
        self.entries.read().keys().cloned().collect()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    fn snapshot(&self) -> Vec<Arc<RenderedEntry>> {
        self.entries.read().values().cloned().collect()
    }
}

impl<K: Resource> MetricsWriter for MetricsStore<K> {
    fn write_all(&self, out: &mut String) {
        let entries = self.snapshot();

        match self.layout {
            Layout::ByObject => {
                for header in &self.headers {
                    out.push_str(header);
                }
                for entry in &entries {
                    out.push_str(entry.text());
                }
            }
            Layout::ByFamily => {
                for (i, header) in self.headers.iter().enumerate() {
                    out.push_str(header);
                    for entry in &entries {
                        out.push_str(entry.family(i));
                    }
                }
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{compose, ExporterMetrics, FamilyGenerator, IdentityLabels, Sample};
    use k8s_openapi::api::core::v1::ConfigMap;
    use kube::api::ObjectMeta;
    use std::collections::BTreeMap;

    fn config_map(ns: &str, name: &str, size: &str) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(ns.to_string()),
                ..Default::default()
            },
            data: Some(BTreeMap::from([("size".to_string(), size.to_string())])),
            ..Default::default()
        }
    }

    fn store() -> MetricsStore<ConfigMap> {
        let families = vec![
            FamilyGenerator::gauge("cm_size", "Size.", |cm: &ConfigMap| {
                let size = cm
                    .data
                    .as_ref()
                    .and_then(|d| d.get("size"))
                    .and_then(|s| s.parse::<f64>().ok());
                Ok(size.map(Sample::new).into_iter().collect())
            }),
            FamilyGenerator::gauge("cm_info", "Info.", |_: &ConfigMap| {
                Ok(vec![Sample::new(1.0)])
            }),
        ];
        let identity = IdentityLabels {
            keys: &["namespace", "configmap"],
            values: |cm: &ConfigMap| {
                vec![
                    cm.metadata.namespace.clone().unwrap_or_default(),
                    cm.metadata.name.clone().unwrap_or_default(),
                ]
            },
        };
        let telemetry = Arc::new(ExporterMetrics::new().unwrap());
        MetricsStore::new(compose("configmaps", families, identity, telemetry))
    }

    const HEADERS: &str = "# HELP cm_size Size.\n# TYPE cm_size gauge\n\
                           # HELP cm_info Info.\n# TYPE cm_info gauge\n";

    // =========================================================================
    // Basic Operation Tests
    // =========================================================================

    #[test]
    fn test_empty_store_lists_headers_only() {
        let store = store();
        assert_eq!(store.list(), HEADERS);
        assert!(store.is_empty());
        assert_eq!(store.headers().len(), 2);
    }

    #[test]
    fn test_add_renders_per_object_block() {
        let store = store();
        store.add(&config_map("ns1", "a", "3"));

        let expected = format!(
            "{}cm_size{{namespace=\"ns1\",configmap=\"a\"}} 3\n\
             cm_info{{namespace=\"ns1\",configmap=\"a\"}} 1\n",
            HEADERS
        );
        assert_eq!(store.list(), expected);
    }

    #[test]
    fn test_update_overwrites_entry() {
        let store = store();
        store.add(&config_map("ns1", "a", "3"));
        store.update(&config_map("ns1", "a", "7"));

        assert_eq!(store.len(), 1);
        assert!(store.list().contains("cm_size{namespace=\"ns1\",configmap=\"a\"} 7\n"));
        assert!(!store.list().contains("} 3\n"));
    }

    #[test]
    fn test_delete_removes_entry_and_ignores_missing() {
        let store = store();
        store.add(&config_map("ns1", "a", "3"));
        store.delete(&config_map("ns1", "a", "3"));
        store.delete(&config_map("ns1", "missing", "3"));

        assert_eq!(store.list(), HEADERS);
    }

    #[test]
    fn test_replace_discards_previous_state() {
        let store = store();
        store.add(&config_map("ns1", "old", "1"));
        store.replace(&[config_map("ns1", "a", "2"), config_map("ns2", "b", "3")]);

        let keys = store.keys();
        assert_eq!(
            keys,
            vec![ObjectKey::new(Some("ns1"), "a"), ObjectKey::new(Some("ns2"), "b")]
        );
        assert!(!store.list().contains("old"));
    }

    #[test]
    fn test_replace_namespace_keeps_other_namespaces() {
        let store = store();
        store.add(&config_map("ns1", "a", "1"));
        store.add(&config_map("ns2", "b", "2"));

        store.replace_namespace("ns1", &[config_map("ns1", "c", "3")]);

        assert_eq!(
            store.keys(),
            vec![ObjectKey::new(Some("ns1"), "c"), ObjectKey::new(Some("ns2"), "b")]
        );
    }

    // =========================================================================
    // Layout Tests
    // =========================================================================

    #[test]
    fn test_by_family_layout_groups_families() {
        let store = store().with_layout(Layout::ByFamily);
        store.add(&config_map("ns1", "a", "3"));
        store.add(&config_map("ns1", "b", "4"));

        let expected = "# HELP cm_size Size.\n# TYPE cm_size gauge\n\
                        cm_size{namespace=\"ns1\",configmap=\"a\"} 3\n\
                        cm_size{namespace=\"ns1\",configmap=\"b\"} 4\n\
                        # HELP cm_info Info.\n# TYPE cm_info gauge\n\
                        cm_info{namespace=\"ns1\",configmap=\"a\"} 1\n\
                        cm_info{namespace=\"ns1\",configmap=\"b\"} 1\n";
        assert_eq!(store.list(), expected);
    }

    #[test]
    fn test_by_object_layout_groups_objects() {
        let store = store();
        assert_eq!(store.layout(), Layout::ByObject);
        store.add(&config_map("ns1", "a", "3"));
        store.add(&config_map("ns1", "b", "4"));

        let body = store.list()[HEADERS.len()..].to_string();
        let lines: Vec<_> = body.lines().collect();
        assert!(lines[0].starts_with("cm_size{namespace=\"ns1\",configmap=\"a\"}"));
        assert!(lines[1].starts_with("cm_info{namespace=\"ns1\",configmap=\"a\"}"));
        assert!(lines[2].starts_with("cm_size{namespace=\"ns1\",configmap=\"b\"}"));
    }

    // =========================================================================
    // Concurrency Tests
    // =========================================================================

    #[test]
    fn test_racing_writers_leave_one_version() {
        let store = Arc::new(store());

        for round in 0..50 {
            let v1 = config_map("ns1", "a", "1");
            let v2 = ConfigMap {
                data: None,
                ..config_map("ns1", "a", "2")
            };

            let s1 = store.clone();
            let s2 = store.clone();
            let t1 = std::thread::spawn(move || s1.add(&v1));
            let t2 = std::thread::spawn(move || s2.update(&v2));
            t1.join().unwrap();
            t2.join().unwrap();

            let body = store.list()[HEADERS.len()..].to_string();
            let only_v1 = "cm_size{namespace=\"ns1\",configmap=\"a\"} 1\n\
                           cm_info{namespace=\"ns1\",configmap=\"a\"} 1\n";
            let only_v2 = "cm_info{namespace=\"ns1\",configmap=\"a\"} 1\n";
            assert!(
                body == only_v1 || body == only_v2,
                "round {}: hybrid entry {:?}",
                round,
                body
            );
        }
    }
}

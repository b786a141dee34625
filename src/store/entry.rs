//! Store Entries
//!
//! Object identity and the pre-rendered text kept per object.

use std::fmt;

use kube::Resource;

use crate::metrics::RenderedFamily;

/// Identity of a tracked object within one store
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectKey {
    /// `None` for cluster-scoped objects
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: Option<&str>, name: &str) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
        }
    }

    /// Key of a Kubernetes object from its metadata
    pub fn from_resource<K: Resource>(obj: &K) -> Self {
        let meta = obj.meta();
        Self {
            namespace: meta.namespace.clone(),
            name: meta.name.clone().unwrap_or_default(),
        }
    }

    /// True when the object lives in `namespace`
    pub fn in_namespace(&self, namespace: &str) -> bool {
        self.namespace.as_deref() == Some(namespace)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}", ns, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Text block of one object across all tracked families.
///
/// Family boundaries are kept so the block can also be emitted family by
/// family without re-rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedEntry {
    text: String,
    family_ends: Vec<usize>,
}

impl RenderedEntry {
    /// Render the families of one object, in descriptor order
    pub fn render(families: &[RenderedFamily]) -> Self {
        let mut text = String::new();
        let mut family_ends = Vec::with_capacity(families.len());

        for family in families {
            family.write_to(&mut text);
            family_ends.push(text.len());
        }

        Self { text, family_ends }
    }

    /// Whole block
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Lines of the family at `index`; empty when out of range
    pub fn family(&self, index: usize) -> &str {
        let Some(&end) = self.family_ends.get(index) else {
            return "";
        };
        let start = index
            .checked_sub(1)
            .and_then(|i| self.family_ends.get(i))
            .copied()
            .unwrap_or(0);
        &self.text[start..end]
    }

    pub fn family_count(&self) -> usize {
        self.family_ends.len()
    }
}

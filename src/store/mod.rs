//! Live metrics cache
//!
//! One [`MetricsStore`] per resource type absorbs Add/Update/Delete/Replace
//! from any number of synchronizers and serves the rendered snapshot.

mod entry;
mod metrics_store;

pub use entry::{ObjectKey, RenderedEntry};
pub use metrics_store::{MetricsStore, MetricsWriter};

/// Order in which a store emits its entries.
///
/// `ByObject` keeps every family of one object together after the header
/// block. `ByFamily` emits each header followed by that family's samples
/// across all objects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Layout {
    #[default]
    ByObject,
    ByFamily,
}

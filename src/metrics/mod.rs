//! Metrics module
//!
//! Family descriptors, sample rendering, family filtering and the exporter's
//! own telemetry.

mod compose;
mod family;
mod filter;
mod telemetry;

pub use compose::{
    compose, extract_metric_family_headers, filter_metric_families, ComposedGenerator,
    IdentityLabels,
};
pub use family::{
    bool_float, format_value, kube_labels_to_prometheus_labels, sanitize_label_name,
    timestamp_seconds, FamilyGenerator, GenerateResult, MetricType, RenderedFamily, Sample,
};
pub use filter::{filter_exposition, requested_families, FamilyFilter, WhiteBlackList};
pub use telemetry::ExporterMetrics;

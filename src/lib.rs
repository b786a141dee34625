//! OpenShift State Metrics
//!
//! Watches OpenShift resources (DeploymentConfigs, BuildConfigs, Builds,
//! ClusterResourceQuotas) and serves their current state as Prometheus
//! metrics in the text exposition format.
//!
//! # Architecture
//!
//! ```text
//! API server ──▶ Reflector ──▶ MetricsStore ──▶ CollectorRegistry ──▶ /metrics
//!   (list/watch)   (per scope)   (rendered text)   (sorted collectors)
//! ```
//!
//! Objects are rendered into exposition text when they change, so a scrape
//! only concatenates text already held in memory.
//!
//! # Modules
//!
//! - [`collectors`] - Per-resource family sets and the collector builder
//! - [`crd`] - Typed OpenShift resource models
//! - [`error`] - Error types
//! - [`metrics`] - Family descriptors, rendering, filtering and self-telemetry
//! - [`options`] - Configuration file and option validation
//! - [`server`] - Scrape and telemetry HTTP listeners
//! - [`store`] - Concurrency-safe rendered metrics store
//! - [`sync`] - Watch sources and reflectors

pub mod collectors;
pub mod crd;
pub mod error;
pub mod metrics;
pub mod options;
pub mod server;
pub mod store;
pub mod sync;

// Re-export commonly used types
pub use collectors::{Builder, CollectorRegistry, RunningCollectors};
pub use error::{Error, Result};
pub use metrics::{ExporterMetrics, WhiteBlackList};
pub use options::{ConfigFile, NamespaceList, Options};
pub use store::{Layout, MetricsStore};

//! Exporter Self-Telemetry
//!
//! Counters describing the exporter itself, kept in an explicit registry
//! that is served on the telemetry listener. On Linux the registry also
//! carries the standard `process_*` series.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::error::{Error, Result};

const NAMESPACE: &str = "openshift_state_metrics";

/// Self-telemetry handles, constructed once and shared by reference
#[derive(Clone)]
pub struct ExporterMetrics {
    registry: Registry,
    generation_errors: IntCounterVec,
    skipped_objects: IntCounterVec,
    watch_errors: IntCounterVec,
    watch_events: IntCounterVec,
    resources_per_scrape: HistogramVec,
}

impl ExporterMetrics {
    /// Create and register all exporter metrics in a fresh registry
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let generation_errors = IntCounterVec::new(
            Opts::new(
                "generation_errors_total",
                "Number of family transforms that failed for an object.",
            )
            .namespace(NAMESPACE),
            &["resource", "family"],
        )?;
        let skipped_objects = IntCounterVec::new(
            Opts::new(
                "skipped_objects_total",
                "Number of delivered objects skipped before reaching a store.",
            )
            .namespace(NAMESPACE),
            &["resource", "reason"],
        )?;
        let watch_errors = IntCounterVec::new(
            Opts::new(
                "watch_errors_total",
                "Number of failed list or watch attempts.",
            )
            .namespace(NAMESPACE),
            &["resource", "namespace"],
        )?;
        let watch_events = IntCounterVec::new(
            Opts::new(
                "watch_events_total",
                "Number of watch events applied to stores.",
            )
            .namespace(NAMESPACE),
            &["resource", "event"],
        )?;
        let resources_per_scrape = HistogramVec::new(
            HistogramOpts::new(
                "resources_per_scrape",
                "Number of resources returned per scrape.",
            )
            .namespace(NAMESPACE)
            .buckets(vec![1.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0]),
            &["resource"],
        )?;

        registry.register(Box::new(generation_errors.clone()))?;
        registry.register(Box::new(skipped_objects.clone()))?;
        registry.register(Box::new(watch_errors.clone()))?;
        registry.register(Box::new(watch_events.clone()))?;
        registry.register(Box::new(resources_per_scrape.clone()))?;
        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            registry,
            generation_errors,
            skipped_objects,
            watch_errors,
            watch_events,
            resources_per_scrape,
        })
    }

    pub fn record_generation_error(&self, resource: &str, family: &str) {
        self.generation_errors
            .with_label_values(&[resource, family])
            .inc();
    }

    pub fn record_skipped_object(&self, resource: &str, reason: &str) {
        self.skipped_objects
            .with_label_values(&[resource, reason])
            .inc();
    }

    pub fn record_watch_error(&self, resource: &str, namespace: &str) {
        self.watch_errors
            .with_label_values(&[resource, namespace])
            .inc();
    }

    pub fn record_watch_event(&self, resource: &str, event: &str) {
        self.watch_events.with_label_values(&[resource, event]).inc();
    }

    pub fn observe_resources_per_scrape(&self, resource: &str, count: usize) {
        self.resources_per_scrape
            .with_label_values(&[resource])
            .observe(count as f64);
    }

    pub fn generation_errors(&self, resource: &str, family: &str) -> u64 {
        self.generation_errors
            .with_label_values(&[resource, family])
            .get()
    }

    pub fn skipped_objects(&self, resource: &str, reason: &str) -> u64 {
        self.skipped_objects
            .with_label_values(&[resource, reason])
            .get()
    }

    pub fn watch_errors(&self, resource: &str, namespace: &str) -> u64 {
        self.watch_errors
            .with_label_values(&[resource, namespace])
            .get()
    }

    /// Render the registry in the text exposition format
    pub fn encode(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| Error::Internal(e.to_string()))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl std::fmt::Debug for ExporterMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExporterMetrics").finish_non_exhaustive()
    }
}

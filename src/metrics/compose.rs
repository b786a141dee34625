//! Generator Composition
//!
//! Turns the filtered family descriptors of a resource type into a single
//! transform producing every family's samples for one object.

use std::sync::Arc;

use tracing::warn;

use super::family::{FamilyGenerator, RenderedFamily, Sample};
use super::filter::FamilyFilter;
use super::telemetry::ExporterMetrics;
use crate::error::GenerateError;

/// Default labels identifying an object, prepended to every sample
pub struct IdentityLabels<K> {
    pub keys: &'static [&'static str],
    pub values: fn(&K) -> Vec<String>,
}

impl<K> Clone for IdentityLabels<K> {
    fn clone(&self) -> Self {
        Self {
            keys: self.keys,
            values: self.values,
        }
    }
}

/// Composed transform over an ordered, fixed family set
pub struct ComposedGenerator<K> {
    resource: &'static str,
    families: Vec<FamilyGenerator<K>>,
    identity: IdentityLabels<K>,
    telemetry: Arc<ExporterMetrics>,
}

/// Compose the transforms of `families` into one generator.
pub fn compose<K>(
    resource: &'static str,
    families: Vec<FamilyGenerator<K>>,
    identity: IdentityLabels<K>,
    telemetry: Arc<ExporterMetrics>,
) -> ComposedGenerator<K> {
    ComposedGenerator {
        resource,
        families,
        identity,
        telemetry,
    }
}

impl<K> ComposedGenerator<K> {
    /// Run every family transform for `obj`.
    ///
    /// A failing family yields an empty sample list; the failure is logged
    /// and counted but never aborts the other families.
    pub fn generate(&self, obj: &K) -> Vec<RenderedFamily> {
        let identity_values = (self.identity.values)(obj);

        self.families
            .iter()
            .map(|family| {
                let samples = (family.generate)(obj)
                    .and_then(|samples| self.prefix(samples, &identity_values))
                    .unwrap_or_else(|e| {
                        warn!(
                            resource = self.resource,
                            family = family.name,
                            object = %identity_values.join("/"),
                            "Failed to generate metric family: {}",
                            e
                        );
                        self.telemetry
                            .record_generation_error(self.resource, family.name);
                        Vec::new()
                    });

                RenderedFamily {
                    name: family.name,
                    samples,
                }
            })
            .collect()
    }

    fn prefix(
        &self,
        samples: Vec<Sample>,
        identity_values: &[String],
    ) -> Result<Vec<Sample>, GenerateError> {
        samples
            .into_iter()
            .map(|s| s.prefixed(self.identity.keys, identity_values))
            .collect()
    }

    /// Header block lines, one `# HELP`/`# TYPE` pair per family
    pub fn headers(&self) -> Vec<String> {
        extract_metric_family_headers(&self.families)
    }

    pub fn families(&self) -> &[FamilyGenerator<K>] {
        &self.families
    }

    pub fn resource(&self) -> &'static str {
        self.resource
    }
}

/// `# HELP`/`# TYPE` header for each family, in order
pub fn extract_metric_family_headers<K>(families: &[FamilyGenerator<K>]) -> Vec<String> {
    families.iter().map(FamilyGenerator::header).collect()
}

/// Drop the families the filter excludes, preserving order
pub fn filter_metric_families<K>(
    filter: &dyn FamilyFilter,
    families: Vec<FamilyGenerator<K>>,
) -> Vec<FamilyGenerator<K>> {
    families
        .into_iter()
        .filter(|f| filter.is_included(f.name))
        .collect()
}

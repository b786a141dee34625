//! BuildConfig metric families

use super::util::{created, labels, metadata_generation, namespace_and_name};
use super::ResourceSpec;
use crate::crd::BuildConfig;
use crate::metrics::{FamilyGenerator, IdentityLabels, Sample};

pub const RESOURCE: &str = "buildconfigs";

const DEFAULT_LABELS: &[&str] = &["namespace", "buildconfig"];

pub fn resource_spec() -> ResourceSpec<BuildConfig> {
    ResourceSpec {
        name: RESOURCE,
        namespaced: true,
        families: metric_families(),
        identity: IdentityLabels {
            keys: DEFAULT_LABELS,
            values: namespace_and_name::<BuildConfig>,
        },
    }
}

pub fn metric_families() -> Vec<FamilyGenerator<BuildConfig>> {
    vec![
        FamilyGenerator::gauge(
            "openshift_buildconfig_created",
            "Unix creation timestamp",
            created::<BuildConfig>,
        ),
        FamilyGenerator::gauge(
            "openshift_buildconfig_metadata_generation",
            "Sequence number representing a specific generation of the desired state.",
            metadata_generation::<BuildConfig>,
        ),
        FamilyGenerator::gauge(
            "openshift_buildconfig_labels",
            "Kubernetes labels converted to Prometheus labels.",
            labels::<BuildConfig>,
        ),
        FamilyGenerator::gauge(
            "openshift_buildconfig_status_latest_version",
            "The latest version of buildconfig.",
            |bc: &BuildConfig| {
                Ok(bc
                    .status
                    .as_ref()
                    .map(|s| Sample::new(s.last_version as f64))
                    .into_iter()
                    .collect())
            },
        ),
    ]
}

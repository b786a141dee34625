//! Build metric families

use chrono::{DateTime, Utc};

use super::util::{created, labels, metadata_generation, namespace_and_name};
use super::ResourceSpec;
use crate::crd::{Build, BuildPhase, BuildStatus};
use crate::metrics::{bool_float, timestamp_seconds, FamilyGenerator, GenerateResult, IdentityLabels, Sample};

pub const RESOURCE: &str = "builds";

const DEFAULT_LABELS: &[&str] = &["namespace", "build"];

pub fn resource_spec() -> ResourceSpec<Build> {
    ResourceSpec {
        name: RESOURCE,
        namespaced: true,
        families: metric_families(),
        identity: IdentityLabels {
            keys: DEFAULT_LABELS,
            values: namespace_and_name::<Build>,
        },
    }
}

/// One sample per known phase, 1 for the current one; all 0 while unset
fn phase_samples(phase: Option<BuildPhase>) -> Vec<Sample> {
    BuildPhase::ALL
        .iter()
        .map(|p| Sample::new(bool_float(Some(*p) == phase)).label("build_phase", p.as_label()))
        .collect()
}

fn status_timestamp(
    build: &Build,
    field: fn(&BuildStatus) -> Option<&DateTime<Utc>>,
) -> GenerateResult {
    Ok(build
        .status
        .as_ref()
        .and_then(field)
        .map(|t| Sample::new(timestamp_seconds(t)))
        .into_iter()
        .collect())
}

pub fn metric_families() -> Vec<FamilyGenerator<Build>> {
    vec![
        FamilyGenerator::gauge(
            "openshift_build_created",
            "Unix creation timestamp",
            created::<Build>,
        ),
        FamilyGenerator::gauge(
            "openshift_build_metadata_generation",
            "Sequence number representing a specific generation of the desired state.",
            metadata_generation::<Build>,
        ),
        FamilyGenerator::gauge(
            "openshift_build_labels",
            "Kubernetes labels converted to Prometheus labels.",
            labels::<Build>,
        ),
        FamilyGenerator::gauge(
            "openshift_build_status_phase",
            "The build phase.",
            |b: &Build| {
                Ok(b.status
                    .as_ref()
                    .map(|s| phase_samples(s.phase))
                    .unwrap_or_default())
            },
        ),
        FamilyGenerator::gauge(
            "openshift_build_started",
            "Start time of the build",
            |b: &Build| status_timestamp(b, |s| s.start_timestamp.as_ref()),
        ),
        FamilyGenerator::gauge(
            "openshift_build_complete",
            "Completion time of the build",
            |b: &Build| status_timestamp(b, |s| s.completion_timestamp.as_ref()),
        ),
        FamilyGenerator::gauge(
            "openshift_build_duration",
            "Duration of the build in nanoseconds",
            |b: &Build| {
                Ok(b.status
                    .as_ref()
                    .and_then(|s| s.duration)
                    .map(|d| Sample::new(d as f64))
                    .into_iter()
                    .collect())
            },
        ),
    ]
}

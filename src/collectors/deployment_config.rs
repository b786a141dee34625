//! DeploymentConfig metric families

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use super::util::{created, int_or_percent, labels, metadata_generation, namespace_and_name};
use super::ResourceSpec;
use crate::crd::{DeploymentConfig, DeploymentConfigStatus, RollingDeploymentStrategyParams};
use crate::metrics::{bool_float, FamilyGenerator, GenerateResult, IdentityLabels, Sample};

pub const RESOURCE: &str = "deploymentconfigs";

const DEFAULT_LABELS: &[&str] = &["namespace", "deploymentconfig"];

pub fn resource_spec() -> ResourceSpec<DeploymentConfig> {
    ResourceSpec {
        name: RESOURCE,
        namespaced: true,
        families: metric_families(),
        identity: IdentityLabels {
            keys: DEFAULT_LABELS,
            values: namespace_and_name::<DeploymentConfig>,
        },
    }
}

fn status_value(dc: &DeploymentConfig, field: fn(&DeploymentConfigStatus) -> f64) -> GenerateResult {
    Ok(dc
        .status
        .as_ref()
        .map(|s| Sample::new(field(s)))
        .into_iter()
        .collect())
}

fn rolling_value(
    dc: &DeploymentConfig,
    field: fn(&RollingDeploymentStrategyParams) -> Option<&IntOrString>,
) -> GenerateResult {
    let Some(value) = dc.spec.strategy.rolling_params.as_ref().and_then(field) else {
        return Ok(Vec::new());
    };
    let resolved = int_or_percent(value, dc.spec.replicas, true)?;
    Ok(vec![Sample::new(resolved as f64)])
}

pub fn metric_families() -> Vec<FamilyGenerator<DeploymentConfig>> {
    vec![
        FamilyGenerator::gauge(
            "openshift_deploymentconfig_created",
            "Unix creation timestamp",
            created::<DeploymentConfig>,
        ),
        FamilyGenerator::gauge(
            "openshift_deploymentconfig_status_replicas",
            "The number of replicas per deploymentconfig.",
            |dc: &DeploymentConfig| status_value(dc, |s| f64::from(s.replicas)),
        ),
        FamilyGenerator::gauge(
            "openshift_deploymentconfig_status_replicas_available",
            "The number of available replicas per deploymentconfig.",
            |dc: &DeploymentConfig| status_value(dc, |s| f64::from(s.available_replicas)),
        ),
        FamilyGenerator::gauge(
            "openshift_deploymentconfig_status_replicas_unavailable",
            "The number of unavailable replicas per deploymentconfig.",
            |dc: &DeploymentConfig| status_value(dc, |s| f64::from(s.unavailable_replicas)),
        ),
        FamilyGenerator::gauge(
            "openshift_deploymentconfig_status_replicas_updated",
            "The number of updated replicas per deploymentconfig.",
            |dc: &DeploymentConfig| status_value(dc, |s| f64::from(s.updated_replicas)),
        ),
        FamilyGenerator::gauge(
            "openshift_deploymentconfig_status_observed_generation",
            "The generation observed by the deploymentconfig controller.",
            |dc: &DeploymentConfig| status_value(dc, |s| s.observed_generation as f64),
        ),
        FamilyGenerator::gauge(
            "openshift_deploymentconfig_spec_replicas",
            "Number of desired pods for a deploymentconfig.",
            |dc: &DeploymentConfig| Ok(vec![Sample::new(f64::from(dc.spec.replicas))]),
        ),
        FamilyGenerator::gauge(
            "openshift_deploymentconfig_spec_paused",
            "Whether the deployment is paused and will not be processed by the deploymentconfig controller.",
            |dc: &DeploymentConfig| Ok(vec![Sample::new(bool_float(dc.spec.paused))]),
        ),
        FamilyGenerator::gauge(
            "openshift_deploymentconfig_spec_strategy_rollingupdate_max_unavailable",
            "Maximum number of unavailable replicas during a rolling update of a deploymentconfig.",
            |dc: &DeploymentConfig| rolling_value(dc, |p| p.max_unavailable.as_ref()),
        ),
        FamilyGenerator::gauge(
            "openshift_deploymentconfig_spec_strategy_rollingupdate_max_surge",
            "Maximum number of replicas that can be scheduled above the desired number of replicas during a rolling update of a deploymentconfig.",
            |dc: &DeploymentConfig| rolling_value(dc, |p| p.max_surge.as_ref()),
        ),
        FamilyGenerator::gauge(
            "openshift_deploymentconfig_metadata_generation",
            "Sequence number representing a specific generation of the desired state.",
            metadata_generation::<DeploymentConfig>,
        ),
        FamilyGenerator::gauge(
            "openshift_deploymentconfig_labels",
            "Kubernetes labels converted to Prometheus labels.",
            labels::<DeploymentConfig>,
        ),
    ]
}

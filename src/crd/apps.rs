//! apps.openshift.io Resource Definitions

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// =============================================================================
// DeploymentConfig
// =============================================================================

/// DeploymentConfig describes the desired rollout of a set of pods
#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "apps.openshift.io",
    version = "v1",
    kind = "DeploymentConfig",
    plural = "deploymentconfigs",
    shortname = "dc",
    status = "DeploymentConfigStatus",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfigSpec {
    /// Desired number of replicas
    #[serde(default)]
    pub replicas: i32,

    /// Paused deployments are not processed by the controller
    #[serde(default)]
    pub paused: bool,

    /// Deployment strategy
    #[serde(default)]
    pub strategy: DeploymentStrategy,

    /// Minimum seconds a new pod must be ready before it counts as available
    #[serde(default)]
    pub min_ready_seconds: Option<i32>,
}

/// How a deployment is rolled out
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentStrategy {
    /// Rolling, Recreate or Custom
    #[serde(rename = "type", default)]
    pub strategy_type: Option<String>,

    /// Parameters of the rolling strategy
    #[serde(default)]
    pub rolling_params: Option<RollingDeploymentStrategyParams>,
}

/// Rolling update parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RollingDeploymentStrategyParams {
    /// Absolute number or percentage of pods that may be unavailable
    #[serde(default)]
    #[schemars(with = "Option<serde_json::Value>")]
    pub max_unavailable: Option<IntOrString>,

    /// Absolute number or percentage of pods scheduled above the desired count
    #[serde(default)]
    #[schemars(with = "Option<serde_json::Value>")]
    pub max_surge: Option<IntOrString>,
}

/// Observed state of a DeploymentConfig
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfigStatus {
    #[serde(default)]
    pub latest_version: i64,

    #[serde(default)]
    pub observed_generation: i64,

    #[serde(default)]
    pub replicas: i32,

    #[serde(default)]
    pub updated_replicas: i32,

    #[serde(default)]
    pub available_replicas: i32,

    #[serde(default)]
    pub unavailable_replicas: i32,

    #[serde(default)]
    pub ready_replicas: i32,
}

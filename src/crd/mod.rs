//! OpenShift Resource Definitions
//!
//! Typed object models of the OpenShift resources the exporter mirrors.

mod apps;
mod build;
mod quota;

pub use apps::{
    DeploymentConfig, DeploymentConfigSpec, DeploymentConfigStatus, DeploymentStrategy,
    RollingDeploymentStrategyParams,
};

pub use build::{
    Build, BuildConfig, BuildConfigSpec, BuildConfigStatus, BuildPhase, BuildSpec, BuildStatus,
};

pub use quota::{
    ClusterResourceQuota, ClusterResourceQuotaSpec, ClusterResourceQuotaStatus, QuotaSpec,
    QuotaStatus,
};

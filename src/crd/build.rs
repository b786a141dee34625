//! build.openshift.io Resource Definitions

use chrono::{DateTime, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// BuildConfig
// =============================================================================

/// BuildConfig is a template from which builds are created
#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "build.openshift.io",
    version = "v1",
    kind = "BuildConfig",
    plural = "buildconfigs",
    shortname = "bc",
    status = "BuildConfigStatus",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfigSpec {
    /// Serial, SerialLatestOnly or Parallel
    #[serde(default)]
    pub run_policy: Option<String>,

    #[serde(default)]
    pub successful_builds_history_limit: Option<i32>,

    #[serde(default)]
    pub failed_builds_history_limit: Option<i32>,
}

/// Observed state of a BuildConfig
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfigStatus {
    /// Version of the last triggered build
    #[serde(default)]
    pub last_version: i64,
}

// =============================================================================
// Build
// =============================================================================

/// Build is a single execution of a build process
#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "build.openshift.io",
    version = "v1",
    kind = "Build",
    plural = "builds",
    status = "BuildStatus",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct BuildSpec {
    #[serde(default)]
    pub service_account: Option<String>,

    #[serde(default)]
    pub completion_deadline_seconds: Option<i64>,
}

/// Observed state of a Build
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuildStatus {
    /// Unset until the build controller first reports a phase
    #[serde(default)]
    pub phase: Option<BuildPhase>,

    #[serde(default)]
    pub cancelled: bool,

    #[serde(default)]
    pub reason: Option<String>,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub start_timestamp: Option<DateTime<Utc>>,

    #[serde(default)]
    pub completion_timestamp: Option<DateTime<Utc>>,

    /// Time the build ran, in nanoseconds
    #[serde(default)]
    pub duration: Option<i64>,
}

/// Lifecycle phase of a build
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum BuildPhase {
    New,
    Pending,
    Running,
    Complete,
    Failed,
    Error,
    Cancelled,
}

impl BuildPhase {
    /// Every phase, in the order samples are emitted
    pub const ALL: [BuildPhase; 7] = [
        BuildPhase::Complete,
        BuildPhase::Cancelled,
        BuildPhase::New,
        BuildPhase::Pending,
        BuildPhase::Running,
        BuildPhase::Failed,
        BuildPhase::Error,
    ];

    /// Lowercase label value
    pub fn as_label(&self) -> &'static str {
        match self {
            BuildPhase::New => "new",
            BuildPhase::Pending => "pending",
            BuildPhase::Running => "running",
            BuildPhase::Complete => "complete",
            BuildPhase::Failed => "failed",
            BuildPhase::Error => "error",
            BuildPhase::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_label())
    }
}

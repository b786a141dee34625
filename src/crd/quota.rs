//! quota.openshift.io Resource Definitions

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// ClusterResourceQuota limits resource usage across a set of projects
#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "quota.openshift.io",
    version = "v1",
    kind = "ClusterResourceQuota",
    plural = "clusterresourcequotas",
    status = "ClusterResourceQuotaStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterResourceQuotaSpec {
    /// Projects this quota applies to
    #[serde(default)]
    #[schemars(with = "Option<serde_json::Value>")]
    pub selector: Option<serde_json::Value>,

    /// Quota definition
    #[serde(default)]
    pub quota: QuotaSpec,
}

/// Hard limits per named resource
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuotaSpec {
    #[serde(default)]
    #[schemars(with = "BTreeMap<String, String>")]
    pub hard: BTreeMap<String, Quantity>,
}

/// Observed usage of a ClusterResourceQuota
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterResourceQuotaStatus {
    /// Totals across all selected projects
    #[serde(default)]
    pub total: QuotaStatus,
}

/// Enforced hard limits and current usage
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuotaStatus {
    #[serde(default)]
    #[schemars(with = "BTreeMap<String, String>")]
    pub hard: BTreeMap<String, Quantity>,

    #[serde(default)]
    #[schemars(with = "BTreeMap<String, String>")]
    pub used: BTreeMap<String, Quantity>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::Resource;

    #[test]
    fn test_quota_is_cluster_scoped() {
        assert_eq!(ClusterResourceQuota::kind(&()), "ClusterResourceQuota");
        assert_eq!(
            ClusterResourceQuota::url_path(&(), None),
            "/apis/quota.openshift.io/v1/clusterresourcequotas"
        );
    }

    #[test]
    fn test_deserialize_totals() {
        let quota: ClusterResourceQuota = serde_json::from_value(serde_json::json!({
            "apiVersion": "quota.openshift.io/v1",
            "kind": "ClusterResourceQuota",
            "metadata": { "name": "q1" },
            "spec": { "quota": { "hard": { "pods": "10" } } },
            "status": { "total": { "hard": { "pods": "10" }, "used": { "pods": "3" } } }
        }))
        .unwrap();

        let total = quota.status.unwrap().total;
        assert_eq!(total.used.get("pods"), Some(&Quantity("3".into())));
    }
}

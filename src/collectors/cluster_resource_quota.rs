//! ClusterResourceQuota metric families

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

use super::util::{created, labels, name_only, quantity_value};
use super::ResourceSpec;
use crate::crd::ClusterResourceQuota;
use crate::error::GenerateError;
use crate::metrics::{FamilyGenerator, GenerateResult, IdentityLabels, Sample};

pub const RESOURCE: &str = "clusterresourcequotas";

const DEFAULT_LABELS: &[&str] = &["name"];

pub fn resource_spec() -> ResourceSpec<ClusterResourceQuota> {
    ResourceSpec {
        name: RESOURCE,
        namespaced: false,
        families: metric_families(),
        identity: IdentityLabels {
            keys: DEFAULT_LABELS,
            values: name_only::<ClusterResourceQuota>,
        },
    }
}

fn quantity_samples(
    quantities: &BTreeMap<String, Quantity>,
    kind: &str,
) -> Result<Vec<Sample>, GenerateError> {
    quantities
        .iter()
        .map(|(resource, q)| {
            Ok(Sample::new(quantity_value(q)?)
                .label("resource", resource.as_str())
                .label("type", kind))
        })
        .collect()
}

fn quota_samples(quota: &ClusterResourceQuota) -> GenerateResult {
    let Some(status) = quota.status.as_ref() else {
        return Ok(Vec::new());
    };

    let mut samples = quantity_samples(&status.total.hard, "hard")?;
    samples.extend(quantity_samples(&status.total.used, "used")?);
    Ok(samples)
}

pub fn metric_families() -> Vec<FamilyGenerator<ClusterResourceQuota>> {
    vec![
        FamilyGenerator::gauge(
            "openshift_clusterresourcequota_created",
            "Unix creation timestamp",
            created::<ClusterResourceQuota>,
        ),
        FamilyGenerator::gauge(
            "openshift_clusterresourcequota_labels",
            "Kubernetes labels converted to Prometheus labels.",
            labels::<ClusterResourceQuota>,
        ),
        FamilyGenerator::gauge(
            "openshift_clusterresourcequota",
            "Information about resource quota.",
            quota_samples,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{ClusterResourceQuotaSpec, ClusterResourceQuotaStatus, QuotaStatus};
    use assert_matches::assert_matches;

    fn quota(hard: &[(&str, &str)], used: &[(&str, &str)]) -> ClusterResourceQuota {
        let to_map = |items: &[(&str, &str)]| {
            items
                .iter()
                .map(|(k, v)| (k.to_string(), Quantity(v.to_string())))
                .collect::<BTreeMap<_, _>>()
        };
        let mut q = ClusterResourceQuota::new("compute", ClusterResourceQuotaSpec::default());
        q.status = Some(ClusterResourceQuotaStatus {
            total: QuotaStatus {
                hard: to_map(hard),
                used: to_map(used),
            },
        });
        q
    }

    #[test]
    fn test_hard_then_used_in_resource_order() {
        let q = quota(&[("pods", "10"), ("cpu", "4")], &[("cpu", "500m")]);
        let samples = quota_samples(&q).unwrap();

        let rendered: Vec<_> = samples
            .iter()
            .map(|s| (s.label_values.join("/"), s.value))
            .collect();
        assert_eq!(
            rendered,
            vec![
                ("cpu/hard".to_string(), 4.0),
                ("pods/hard".to_string(), 10.0),
                ("cpu/used".to_string(), 0.5),
            ]
        );
    }

    #[test]
    fn test_bad_quantity_fails_family() {
        let q = quota(&[("cpu", "four")], &[]);
        assert_matches!(quota_samples(&q), Err(GenerateError::InvalidQuantity(_)));
    }

    #[test]
    fn test_labels_family_is_named() {
        assert!(metric_families()
            .iter()
            .all(|f| f.name.starts_with("openshift_clusterresourcequota")));
    }
}

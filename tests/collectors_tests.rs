//! Collector Output Tests
//!
//! Exposition text produced for each resource type, as a scrape would see it.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::DateTime;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::ObjectMeta;

use openshift_state_metrics::collectors::{
    build, build_config, cluster_resource_quota, deployment_config, new_store, ResourceSpec,
};
use openshift_state_metrics::crd::{
    Build, BuildConfig, BuildConfigSpec, BuildConfigStatus, BuildPhase, BuildSpec, BuildStatus,
    ClusterResourceQuota, ClusterResourceQuotaSpec, ClusterResourceQuotaStatus, DeploymentConfig,
    DeploymentConfigSpec, DeploymentConfigStatus, DeploymentStrategy, QuotaStatus,
    RollingDeploymentStrategyParams,
};
use openshift_state_metrics::metrics::{ExporterMetrics, WhiteBlackList};
use openshift_state_metrics::store::{Layout, MetricsStore};

// =============================================================================
// Helpers
// =============================================================================

fn meta(ns: Option<&str>, name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: ns.map(str::to_string),
        creation_timestamp: Some(Time(DateTime::from_timestamp(1_500_000_000, 0).unwrap())),
        generation: Some(21),
        labels: Some(BTreeMap::from([("app".to_string(), "example1".to_string())])),
        ..Default::default()
    }
}

fn store<K: kube::Resource>(spec: ResourceSpec<K>, filter: &WhiteBlackList) -> MetricsStore<K> {
    let telemetry = Arc::new(ExporterMetrics::new().unwrap());
    new_store(spec, filter, Layout::ByObject, telemetry)
}

fn set(items: &[&str]) -> HashSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Sample lines only, headers stripped
fn samples(text: &str) -> Vec<&str> {
    text.lines().filter(|l| !l.starts_with('#')).collect()
}

fn deployment_config() -> DeploymentConfig {
    let mut dc = DeploymentConfig::new(
        "dc1",
        DeploymentConfigSpec {
            replicas: 3,
            paused: true,
            strategy: DeploymentStrategy {
                strategy_type: Some("Rolling".into()),
                rolling_params: Some(RollingDeploymentStrategyParams {
                    max_unavailable: Some(IntOrString::String("25%".into())),
                    max_surge: Some(IntOrString::Int(1)),
                }),
            },
            min_ready_seconds: None,
        },
    );
    dc.metadata = meta(Some("ns1"), "dc1");
    dc.status = Some(DeploymentConfigStatus {
        latest_version: 4,
        observed_generation: 21,
        replicas: 2,
        updated_replicas: 2,
        available_replicas: 1,
        unavailable_replicas: 1,
        ready_replicas: 1,
    });
    dc
}

// =============================================================================
// DeploymentConfig
// =============================================================================

#[test]
fn test_deployment_config_exposition() {
    let store = store(deployment_config::resource_spec(), &WhiteBlackList::allow_all());
    store.add(&deployment_config());

    let text = store.list();
    assert!(text.starts_with(
        "# HELP openshift_deploymentconfig_created Unix creation timestamp\n\
         # TYPE openshift_deploymentconfig_created gauge\n"
    ));
    assert_eq!(text.matches("# TYPE ").count(), 12);

    let id = "namespace=\"ns1\",deploymentconfig=\"dc1\"";
    let expected = vec![
        format!("openshift_deploymentconfig_created{{{}}} 1.5e+09", id),
        format!("openshift_deploymentconfig_status_replicas{{{}}} 2", id),
        format!("openshift_deploymentconfig_status_replicas_available{{{}}} 1", id),
        format!("openshift_deploymentconfig_status_replicas_unavailable{{{}}} 1", id),
        format!("openshift_deploymentconfig_status_replicas_updated{{{}}} 2", id),
        format!("openshift_deploymentconfig_status_observed_generation{{{}}} 21", id),
        format!("openshift_deploymentconfig_spec_replicas{{{}}} 3", id),
        format!("openshift_deploymentconfig_spec_paused{{{}}} 1", id),
        format!("openshift_deploymentconfig_spec_strategy_rollingupdate_max_unavailable{{{}}} 1", id),
        format!("openshift_deploymentconfig_spec_strategy_rollingupdate_max_surge{{{}}} 1", id),
        format!("openshift_deploymentconfig_metadata_generation{{{}}} 21", id),
        format!("openshift_deploymentconfig_labels{{{},label_app=\"example1\"}} 1", id),
    ];
    assert_eq!(samples(&text), expected);
}

#[test]
fn test_unpaused_and_unset_created() {
    let store = store(deployment_config::resource_spec(), &WhiteBlackList::allow_all());
    let mut dc = deployment_config();
    dc.spec.paused = false;
    dc.metadata.creation_timestamp = None;
    store.add(&dc);

    let text = store.list();
    assert!(text.contains("openshift_deploymentconfig_spec_paused{namespace=\"ns1\",deploymentconfig=\"dc1\"} 0\n"));
    assert!(!text.contains("openshift_deploymentconfig_created{"));
    assert!(text.contains("# HELP openshift_deploymentconfig_created "));
}

#[test]
fn test_blacklisted_family_has_no_header_or_samples() {
    let filter = WhiteBlackList::new(HashSet::new(), set(&["openshift_deploymentconfig_created"])).unwrap();
    let store = store(deployment_config::resource_spec(), &filter);
    store.add(&deployment_config());

    let text = store.list();
    assert!(!text.contains("openshift_deploymentconfig_created"));
    assert_eq!(text.matches("# TYPE ").count(), 11);
}

#[test]
fn test_whitelist_keeps_only_named_families() {
    let filter = WhiteBlackList::new(set(&["openshift_deploymentconfig_spec_replicas"]), HashSet::new()).unwrap();
    let store = store(deployment_config::resource_spec(), &filter);
    store.add(&deployment_config());

    assert_eq!(
        store.list(),
        "# HELP openshift_deploymentconfig_spec_replicas Number of desired pods for a deploymentconfig.\n\
         # TYPE openshift_deploymentconfig_spec_replicas gauge\n\
         openshift_deploymentconfig_spec_replicas{namespace=\"ns1\",deploymentconfig=\"dc1\"} 3\n"
    );
}

#[test]
fn test_malformed_rolling_param_only_drops_its_family() {
    let telemetry = Arc::new(ExporterMetrics::new().unwrap());
    let store = new_store(
        deployment_config::resource_spec(),
        &WhiteBlackList::allow_all(),
        Layout::ByObject,
        telemetry.clone(),
    );
    let mut dc = deployment_config();
    if let Some(params) = dc.spec.strategy.rolling_params.as_mut() {
        params.max_unavailable = Some(IntOrString::String("many".into()));
    }
    store.add(&dc);

    let text = store.list();
    assert!(!text.contains("max_unavailable{"));
    assert!(text.contains("max_surge{namespace=\"ns1\",deploymentconfig=\"dc1\"} 1\n"));
    assert_eq!(
        telemetry.generation_errors(
            "deploymentconfigs",
            "openshift_deploymentconfig_spec_strategy_rollingupdate_max_unavailable"
        ),
        1
    );
}

// =============================================================================
// BuildConfig
// =============================================================================

#[test]
fn test_build_config_exposition() {
    let store = store(build_config::resource_spec(), &WhiteBlackList::allow_all());
    let mut bc = BuildConfig::new("bc1", BuildConfigSpec::default());
    bc.metadata = meta(Some("ns1"), "bc1");
    bc.status = Some(BuildConfigStatus { last_version: 7 });
    store.add(&bc);

    let id = "namespace=\"ns1\",buildconfig=\"bc1\"";
    assert_eq!(
        samples(&store.list()),
        vec![
            format!("openshift_buildconfig_created{{{}}} 1.5e+09", id),
            format!("openshift_buildconfig_metadata_generation{{{}}} 21", id),
            format!("openshift_buildconfig_labels{{{},label_app=\"example1\"}} 1", id),
            format!("openshift_buildconfig_status_latest_version{{{}}} 7", id),
        ]
    );
}

// =============================================================================
// Build
// =============================================================================

#[test]
fn test_build_exposition() {
    let store = store(build::resource_spec(), &WhiteBlackList::allow_all());
    let mut b = Build::new("b1", BuildSpec::default());
    b.metadata = meta(Some("ns1"), "b1");
    b.status = Some(BuildStatus {
        phase: Some(BuildPhase::Complete),
        start_timestamp: DateTime::from_timestamp(1_500_000_100, 0),
        completion_timestamp: DateTime::from_timestamp(1_500_000_200, 0),
        duration: Some(100_000_000_000),
        ..Default::default()
    });
    store.add(&b);

    let id = "namespace=\"ns1\",build=\"b1\"";
    let phase = |p: &str, v: u8| format!("openshift_build_status_phase{{{},build_phase=\"{}\"}} {}", id, p, v);
    assert_eq!(
        samples(&store.list()),
        vec![
            format!("openshift_build_created{{{}}} 1.5e+09", id),
            format!("openshift_build_metadata_generation{{{}}} 21", id),
            format!("openshift_build_labels{{{},label_app=\"example1\"}} 1", id),
            phase("complete", 1),
            phase("cancelled", 0),
            phase("new", 0),
            phase("pending", 0),
            phase("running", 0),
            phase("failed", 0),
            phase("error", 0),
            format!("openshift_build_started{{{}}} 1.5000001e+09", id),
            format!("openshift_build_complete{{{}}} 1.5000002e+09", id),
            format!("openshift_build_duration{{{}}} 1e+11", id),
        ]
    );
}

#[test]
fn test_running_build_has_no_completion() {
    let store = store(build::resource_spec(), &WhiteBlackList::allow_all());
    let mut b = Build::new("b2", BuildSpec::default());
    b.metadata = meta(Some("ns1"), "b2");
    b.status = Some(BuildStatus {
        phase: Some(BuildPhase::Running),
        start_timestamp: DateTime::from_timestamp(1_500_000_100, 0),
        ..Default::default()
    });
    store.add(&b);

    let text = store.list();
    assert!(text.contains("openshift_build_started{"));
    assert!(!text.contains("openshift_build_complete{"));
    assert!(!text.contains("openshift_build_duration{"));
    assert!(text.contains("build_phase=\"running\"} 1\n"));
}

// =============================================================================
// ClusterResourceQuota
// =============================================================================

#[test]
fn test_cluster_resource_quota_exposition() {
    let store = store(cluster_resource_quota::resource_spec(), &WhiteBlackList::allow_all());
    let mut q = ClusterResourceQuota::new("q1", ClusterResourceQuotaSpec::default());
    q.metadata = meta(None, "q1");
    q.status = Some(ClusterResourceQuotaStatus {
        total: QuotaStatus {
            hard: BTreeMap::from([
                ("pods".to_string(), Quantity("10".into())),
                ("limits.memory".to_string(), Quantity("2Gi".into())),
            ]),
            used: BTreeMap::from([("pods".to_string(), Quantity("3".into()))]),
        },
    });
    store.add(&q);

    assert_eq!(
        samples(&store.list()),
        vec![
            "openshift_clusterresourcequota_created{name=\"q1\"} 1.5e+09",
            "openshift_clusterresourcequota_labels{name=\"q1\",label_app=\"example1\"} 1",
            "openshift_clusterresourcequota{name=\"q1\",resource=\"limits.memory\",type=\"hard\"} 2.147483648e+09",
            "openshift_clusterresourcequota{name=\"q1\",resource=\"pods\",type=\"hard\"} 10",
            "openshift_clusterresourcequota{name=\"q1\",resource=\"pods\",type=\"used\"} 3",
        ]
    );
}

#[test]
fn test_overflowing_quantity_keeps_other_families() {
    let telemetry = Arc::new(ExporterMetrics::new().unwrap());
    let store = new_store(
        cluster_resource_quota::resource_spec(),
        &WhiteBlackList::allow_all(),
        Layout::ByObject,
        telemetry.clone(),
    );
    let mut q = ClusterResourceQuota::new("q1", ClusterResourceQuotaSpec::default());
    q.metadata = meta(None, "q1");
    q.status = Some(ClusterResourceQuotaStatus {
        total: QuotaStatus {
            hard: BTreeMap::from([("pods".to_string(), Quantity("1e2147483647".into()))]),
            used: BTreeMap::new(),
        },
    });
    store.add(&q);

    assert_eq!(
        samples(&store.list()),
        vec![
            "openshift_clusterresourcequota_created{name=\"q1\"} 1.5e+09",
            "openshift_clusterresourcequota_labels{name=\"q1\",label_app=\"example1\"} 1",
        ]
    );
    assert_eq!(
        telemetry.generation_errors("clusterresourcequotas", "openshift_clusterresourcequota"),
        1
    );

    // the next write for the same object renders normally
    if let Some(status) = q.status.as_mut() {
        status.total.hard.insert("pods".to_string(), Quantity("10".into()));
    }
    store.update(&q);
    assert!(store
        .list()
        .contains("openshift_clusterresourcequota{name=\"q1\",resource=\"pods\",type=\"hard\"} 10\n"));
}

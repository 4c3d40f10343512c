//! Lifecycle tracer orchestration
//!
//! Visits the fixed hop sequence, each hop under its own timeout, each
//! independently fallible. A hop that errors or times out degrades to its
//! own NotFound/Unknown entry; the tracer proceeds to the next hop
//! unconditionally and never discards hops already captured. No retries,
//! no caching across invocations.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use trellis_common::kube_utils::nested_str;

use super::hops::{TraceHop, TraceStage};
use super::normalize;
use super::reader::PlatformReader;

/// Default per-hop timeout in seconds
pub const DEFAULT_HOP_TIMEOUT_SECS: u64 = 5;

/// An ordered, partially-available status report
#[derive(Debug, Serialize)]
pub struct TraceReport {
    /// The logical name that was traced
    pub resource: String,
    /// Hops in visiting order
    pub chain: Vec<TraceHop>,
    /// Whether any status source resolved the name at all; total absence
    /// is the one condition the command exits non-zero for
    #[serde(skip)]
    pub identity_resolved: bool,
}

/// Visits the platform's status sources for one logical name.
pub struct Tracer<'a> {
    reader: &'a dyn PlatformReader,
    platform_namespace: &'a str,
    gitops_namespace: &'a str,
    default_cluster: Option<&'a str>,
    hop_timeout: Duration,
}

impl<'a> Tracer<'a> {
    /// Create a tracer over `reader`.
    pub fn new(
        reader: &'a dyn PlatformReader,
        platform_namespace: &'a str,
        gitops_namespace: &'a str,
        default_cluster: Option<&'a str>,
        hop_timeout: Duration,
    ) -> Self {
        Self {
            reader,
            platform_namespace,
            gitops_namespace,
            default_cluster,
            hop_timeout,
        }
    }

    /// Trace `name` through the lifecycle chain.
    ///
    /// Never fails: the worst case is a report where every hop is
    /// NotFound/Unknown and `identity_resolved` is false.
    pub async fn trace(&self, name: &str) -> TraceReport {
        let mut chain = Vec::with_capacity(5);

        // Hops 1+2 share one lookup: the request record and the pipeline
        // state derived from its conditions.
        let request = self
            .hop(
                TraceStage::RequestRecord,
                self.reader.get_request(self.platform_namespace, name),
            )
            .await
            .flatten();
        chain.push(normalize::request_hop(
            name,
            self.platform_namespace,
            request.as_ref(),
        ));
        chain.push(normalize::pipeline_hop(request.as_ref()));

        // Hop 3: the application descriptor, retrying conventional name
        // prefixes before giving up.
        let mut resolved_name = None;
        let mut application = self
            .hop(
                TraceStage::Application,
                self.reader.get_application(self.gitops_namespace, name),
            )
            .await
            .flatten();
        if application.is_some() {
            resolved_name = Some(name.to_string());
        } else {
            for candidate in self.fallback_names(name) {
                let found = self
                    .hop(
                        TraceStage::Application,
                        self.reader.get_application(self.gitops_namespace, &candidate),
                    )
                    .await
                    .flatten();
                if let Some(found) = found {
                    application = Some(found);
                    resolved_name = Some(candidate);
                    break;
                }
            }
        }
        chain.push(normalize::application_hop(
            name,
            application.as_ref(),
            resolved_name.as_deref(),
        ));

        // Hop 4: children scoped to the resolved descriptor. Omitted only
        // when the descriptor resolved and has no children; when the
        // descriptor itself is missing the hop reports that.
        if application.is_some() {
            let children: Vec<Value> = self
                .hop(
                    TraceStage::SubApplications,
                    self.reader.list_applications(self.gitops_namespace),
                )
                .await
                .unwrap_or_default()
                .into_iter()
                .filter(|app| {
                    nested_str(app, &["spec", "destination", "name"]) == Some(name)
                })
                .collect();
            if !children.is_empty() {
                chain.push(normalize::sub_applications_hop(&children));
            }
        } else {
            chain.push(
                TraceHop::new(TraceStage::SubApplications, "NotFound")
                    .with_detail("sync descriptor unresolved"),
            );
        }

        // Hop 5: running pods, namespace assumed equal to the logical name;
        // the label-filtered query falls back to an unfiltered listing.
        let selector = format!("app.kubernetes.io/name={name}");
        let mut pods = self
            .hop(
                TraceStage::Runtime,
                self.reader.list_pods(name, Some(&selector)),
            )
            .await
            .unwrap_or_default();
        if pods.is_empty() {
            pods = self
                .hop(TraceStage::Runtime, self.reader.list_pods(name, None))
                .await
                .unwrap_or_default();
        }
        chain.push(normalize::runtime_hop(name, &pods));

        TraceReport {
            resource: name.to_string(),
            identity_resolved: request.is_some() || application.is_some(),
            chain,
        }
    }

    /// Conventional name prefixes tried when the descriptor lookup misses.
    fn fallback_names(&self, name: &str) -> Vec<String> {
        let mut candidates = vec![format!("vcluster-{name}")];
        if let Some(cluster) = self.default_cluster {
            candidates.push(format!("{cluster}-{name}"));
        }
        candidates
    }

    /// Run one lookup under the per-hop timeout, degrading errors and
    /// timeouts to `None`.
    async fn hop<T>(
        &self,
        stage: TraceStage,
        lookup: impl Future<Output = crate::Result<T>>,
    ) -> Option<T> {
        match tokio::time::timeout(self.hop_timeout, lookup).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                debug!(stage = %stage, error = %e, "hop lookup failed");
                None
            }
            Err(_) => {
                debug!(stage = %stage, timeout = ?self.hop_timeout, "hop lookup timed out");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::trace::hops::StatusClass;
    use crate::commands::trace::reader::PodSummary;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::BTreeMap;
    use trellis_common::crd::TenantCluster;

    /// In-memory reader double.
    #[derive(Default)]
    struct FakeReader {
        requests: BTreeMap<String, TenantCluster>,
        applications: BTreeMap<String, Value>,
        pods: BTreeMap<String, Vec<PodSummary>>,
        fail_pods: bool,
    }

    impl FakeReader {
        fn with_request(mut self, namespace: &str, request: TenantCluster) -> Self {
            let name = request.spec.name.clone();
            self.requests.insert(format!("{namespace}/{name}"), request);
            self
        }

        fn with_application(mut self, namespace: &str, name: &str, app: Value) -> Self {
            self.applications
                .insert(format!("{namespace}/{name}"), app);
            self
        }

        fn with_pods(mut self, namespace: &str, selector: Option<&str>, pods: Vec<PodSummary>) -> Self {
            let key = format!("{namespace}/{}", selector.unwrap_or(""));
            self.pods.insert(key, pods);
            self
        }
    }

    #[async_trait]
    impl PlatformReader for FakeReader {
        async fn get_request(
            &self,
            namespace: &str,
            name: &str,
        ) -> crate::Result<Option<TenantCluster>> {
            Ok(self.requests.get(&format!("{namespace}/{name}")).cloned())
        }

        async fn get_application(
            &self,
            namespace: &str,
            name: &str,
        ) -> crate::Result<Option<Value>> {
            Ok(self
                .applications
                .get(&format!("{namespace}/{name}"))
                .cloned())
        }

        async fn list_applications(&self, namespace: &str) -> crate::Result<Vec<Value>> {
            let prefix = format!("{namespace}/");
            Ok(self
                .applications
                .iter()
                .filter(|(k, _)| k.starts_with(&prefix))
                .map(|(_, v)| v.clone())
                .collect())
        }

        async fn list_pods(
            &self,
            namespace: &str,
            label_selector: Option<&str>,
        ) -> crate::Result<Vec<PodSummary>> {
            if self.fail_pods {
                return Err(crate::Error::command_failed("connection refused"));
            }
            let key = format!("{namespace}/{}", label_selector.unwrap_or(""));
            Ok(self.pods.get(&key).cloned().unwrap_or_default())
        }
    }

    fn tenant_cluster(name: &str, status: Value) -> TenantCluster {
        serde_json::from_value(json!({
            "apiVersion": "platform.trellis.dev/v1alpha1",
            "kind": "TenantCluster",
            "metadata": {"name": name, "namespace": "platform-requests"},
            "spec": {"name": name},
            "status": status
        }))
        .unwrap()
    }

    fn tracer<'a>(reader: &'a FakeReader, default_cluster: Option<&'a str>) -> Tracer<'a> {
        Tracer::new(
            reader,
            "platform-requests",
            "argocd",
            default_cluster,
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn missing_resource_yields_exactly_five_unresolved_hops() {
        let reader = FakeReader::default();
        let report = tracer(&reader, None).trace("does-not-exist").await;

        assert_eq!(report.chain.len(), 5);
        assert!(!report.identity_resolved);
        for hop in &report.chain {
            assert!(
                matches!(hop.class(), StatusClass::NotFound | StatusClass::Unknown),
                "{:?} unexpectedly resolved",
                hop
            );
        }
        let stages: Vec<TraceStage> = report.chain.iter().map(|h| h.stage).collect();
        assert_eq!(
            stages,
            vec![
                TraceStage::RequestRecord,
                TraceStage::Pipeline,
                TraceStage::Application,
                TraceStage::SubApplications,
                TraceStage::Runtime
            ]
        );
    }

    #[tokio::test]
    async fn healthy_chain_reports_every_stage() {
        let reader = FakeReader::default()
            .with_request(
                "platform-requests",
                tenant_cluster(
                    "team-a",
                    json!({
                        "phase": "Ready",
                        "conditions": [{"type": "PipelineCompleted", "status": "True"}]
                    }),
                ),
            )
            .with_application(
                "argocd",
                "team-a",
                json!({
                    "metadata": {"name": "team-a"},
                    "status": {
                        "sync": {"status": "Synced", "revision": "abc1234def"},
                        "health": {"status": "Healthy"}
                    }
                }),
            )
            .with_pods(
                "team-a",
                Some("app.kubernetes.io/name=team-a"),
                vec![PodSummary {
                    name: "cp-0".into(),
                    phase: "Running".into(),
                    ready_containers: 1,
                    total_containers: 1,
                }],
            );

        let report = tracer(&reader, None).trace("team-a").await;
        assert!(report.identity_resolved);
        // No children target the tenant cluster, so the sub-app hop is
        // omitted.
        assert_eq!(report.chain.len(), 4);
        assert_eq!(report.chain[0].status, "Ready");
        assert_eq!(report.chain[1].status, "Completed");
        assert_eq!(report.chain[2].status, "Synced/Healthy");
        assert_eq!(report.chain[3].status, "1/1 pods ready");
    }

    #[tokio::test]
    async fn application_resolves_through_prefix_fallbacks() {
        let reader = FakeReader::default().with_application(
            "argocd",
            "vcluster-team-a",
            json!({
                "metadata": {"name": "vcluster-team-a"},
                "status": {"sync": {"status": "OutOfSync"}, "health": {"status": "Missing"}}
            }),
        );

        let report = tracer(&reader, None).trace("team-a").await;
        assert!(report.identity_resolved);
        let app_hop = &report.chain[2];
        assert_eq!(app_hop.status, "OutOfSync/Missing");
        assert!(app_hop.detail.as_deref().unwrap().contains("as vcluster-team-a"));
    }

    #[tokio::test]
    async fn default_cluster_prefix_is_tried_last() {
        let reader = FakeReader::default().with_application(
            "argocd",
            "host-team-a",
            json!({
                "metadata": {"name": "host-team-a"},
                "status": {"sync": {"status": "Synced"}, "health": {"status": "Healthy"}}
            }),
        );

        let report = tracer(&reader, Some("host")).trace("team-a").await;
        assert!(report.identity_resolved);
        assert_eq!(report.chain[2].status, "Synced/Healthy");
    }

    #[tokio::test]
    async fn sub_applications_aggregate_over_destination_children() {
        let reader = FakeReader::default()
            .with_application(
                "argocd",
                "team-a",
                json!({
                    "metadata": {"name": "team-a"},
                    "status": {"sync": {"status": "Synced"}, "health": {"status": "Healthy"}}
                }),
            )
            .with_application(
                "argocd",
                "team-a-ingress",
                json!({
                    "metadata": {"name": "team-a-ingress"},
                    "spec": {"destination": {"name": "team-a"}},
                    "status": {"sync": {"status": "Synced"}, "health": {"status": "Healthy"}}
                }),
            )
            .with_application(
                "argocd",
                "team-a-metrics",
                json!({
                    "metadata": {"name": "team-a-metrics"},
                    "spec": {"destination": {"name": "team-a"}},
                    "status": {"sync": {"status": "OutOfSync"}, "health": {"status": "Progressing"}}
                }),
            );

        let report = tracer(&reader, None).trace("team-a").await;
        let sub_hop = report
            .chain
            .iter()
            .find(|h| h.stage == TraceStage::SubApplications)
            .unwrap();
        assert_eq!(sub_hop.status, "1/2 synced, 1/2 healthy");
    }

    #[tokio::test]
    async fn runtime_falls_back_to_unfiltered_listing() {
        let reader = FakeReader::default().with_pods(
            "team-a",
            None,
            vec![
                PodSummary {
                    name: "cp-0".into(),
                    phase: "Running".into(),
                    ready_containers: 1,
                    total_containers: 1,
                },
                PodSummary {
                    name: "cp-1".into(),
                    phase: "Pending".into(),
                    ready_containers: 0,
                    total_containers: 1,
                },
            ],
        );

        let report = tracer(&reader, None).trace("team-a").await;
        let runtime = report.chain.last().unwrap();
        assert_eq!(runtime.status, "1/2 pods ready");
    }

    #[tokio::test]
    async fn hop_errors_degrade_only_that_hop() {
        let reader = FakeReader {
            fail_pods: true,
            ..Default::default()
        }
        .with_request(
            "platform-requests",
            tenant_cluster("team-a", json!({"phase": "Ready"})),
        );

        let report = tracer(&reader, None).trace("team-a").await;
        assert!(report.identity_resolved);
        assert_eq!(report.chain[0].status, "Ready");
        let runtime = report.chain.last().unwrap();
        assert_eq!(runtime.stage, TraceStage::Runtime);
        assert_eq!(runtime.class(), StatusClass::NotFound);
    }

    #[tokio::test]
    async fn report_serializes_as_resource_and_chain() {
        let reader = FakeReader::default();
        let report = tracer(&reader, None).trace("ghost").await;
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["resource"], "ghost");
        assert_eq!(json["chain"].as_array().unwrap().len(), 5);
        assert!(json.get("identity_resolved").is_none());
    }
}

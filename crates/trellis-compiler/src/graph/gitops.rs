//! GitOps project and application sub-requests
//!
//! Emitted as fully-formed declarative requests rather than raw ArgoCD
//! objects: the execution engine compiles them with the dedicated project
//! and application builders, keeping those builders independently testable.

use serde_json::json;

use trellis_common::document::ResourceDocument;
use trellis_common::PLATFORM_API_VERSION;

use super::SYNC_WAVE_ANNOTATION;
use crate::resolve::ResolvedConfig;
use crate::values::build_values;

/// Scoping descriptor: which repositories the application may draw from
/// and which destinations it may target.
pub fn build_project_request(cfg: &ResolvedConfig) -> ResourceDocument {
    ResourceDocument::new(
        PLATFORM_API_VERSION,
        "ArgoCDProject",
        Some(&cfg.request_namespace),
        &cfg.project_name,
        &cfg.name,
    )
    .with_label("app.kubernetes.io/name", "argocd-project")
    .with_user_labels(&cfg.extra_labels, &cfg.name)
    .with_annotations(&cfg.extra_annotations)
    .with_payload(json!({
        "spec": {
            "namespace": "argocd",
            "name": cfg.project_name,
            "description": format!("Tenant cluster project for {}", cfg.name),
            "annotations": {SYNC_WAVE_ANNOTATION: "-1"},
            "sourceRepos": [cfg.app_source.repo_url],
            "destinations": [{
                "namespace": cfg.target_namespace,
                "server": cfg.app_source.destination_server
            }],
            "clusterResourceWhitelist": [{"group": "*", "kind": "*"}],
            "namespaceResourceWhitelist": [{"group": "*", "kind": "*"}]
        }
    }))
}

/// Application descriptor: chart, revision, and the resolved values
/// payload, targeted at the project.
pub fn build_application_request(cfg: &ResolvedConfig) -> ResourceDocument {
    ResourceDocument::new(
        PLATFORM_API_VERSION,
        "ArgoCDApplication",
        Some(&cfg.request_namespace),
        &cfg.application_name,
        &cfg.name,
    )
    .with_label("app.kubernetes.io/name", "argocd-application")
    .with_user_labels(&cfg.extra_labels, &cfg.name)
    .with_annotations(&cfg.extra_annotations)
    .with_payload(json!({
        "spec": {
            "name": cfg.application_name,
            "namespace": "argocd",
            "annotations": {SYNC_WAVE_ANNOTATION: "0"},
            "finalizers": ["resources-finalizer.argocd.argoproj.io"],
            "project": cfg.project_name,
            "destination": {
                "server": cfg.app_source.destination_server,
                "namespace": cfg.target_namespace
            },
            "source": {
                "repoURL": cfg.app_source.repo_url,
                "chart": cfg.app_source.chart,
                "targetRevision": cfg.app_source.target_revision,
                "helm": {
                    "releaseName": cfg.name,
                    "valuesObject": build_values(cfg)
                }
            },
            "syncPolicy": {
                "automated": {"selfHeal": true, "prune": true},
                "syncOptions": ["CreateNamespace=true"]
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::PresetTable;
    use crate::resolve::resolve;
    use serde_json::json;

    fn config(value: serde_json::Value) -> ResolvedConfig {
        let spec = serde_json::from_value(value).unwrap();
        resolve(&spec, "platform-requests", &PresetTable::builtin()).unwrap()
    }

    #[test]
    fn project_scopes_sources_and_destinations() {
        let cfg = config(json!({"name": "team-a", "targetNamespace": "team-a-system"}));
        let doc = build_project_request(&cfg);
        assert_eq!(doc.name, "vcluster-team-a");
        assert_eq!(doc.namespace.as_deref(), Some("platform-requests"));
        assert_eq!(
            doc.payload["spec"]["sourceRepos"],
            json!(["https://charts.loft.sh"])
        );
        assert_eq!(
            doc.payload["spec"]["destinations"][0]["namespace"],
            "team-a-system"
        );
        assert_eq!(doc.payload["spec"]["annotations"][SYNC_WAVE_ANNOTATION], "-1");
    }

    #[test]
    fn application_targets_the_project_with_resolved_values() {
        let cfg = config(json!({"name": "team-a", "preset": "prod"}));
        let doc = build_application_request(&cfg);
        let spec = &doc.payload["spec"];
        assert_eq!(spec["project"], "vcluster-team-a");
        assert_eq!(spec["source"]["chart"], "vcluster");
        assert_eq!(spec["source"]["targetRevision"], "0.30.4");
        assert_eq!(spec["source"]["helm"]["releaseName"], "team-a");
        assert_eq!(
            spec["source"]["helm"]["valuesObject"]["controlPlane"]["statefulSet"]["highAvailability"]["replicas"],
            3
        );
        assert_eq!(spec["syncPolicy"]["automated"]["prune"], true);
    }

    #[test]
    fn chart_source_overrides_flow_through() {
        let cfg = config(json!({
            "name": "team-a",
            "application": {"repoUrl": "https://charts.internal", "targetRevision": "0.31.0"}
        }));
        let doc = build_application_request(&cfg);
        assert_eq!(doc.payload["spec"]["source"]["repoURL"], "https://charts.internal");
        assert_eq!(doc.payload["spec"]["source"]["targetRevision"], "0.31.0");
        // Project allows exactly the overridden repository.
        let project = build_project_request(&cfg);
        assert_eq!(
            project.payload["spec"]["sourceRepos"],
            json!(["https://charts.internal"])
        );
    }
}

//! ExternalSecret declarations
//!
//! Secret values never appear in any document the compiler emits. These
//! declarations only reference items in the external store: the token
//! secret the sync job authenticates with, the kubeconfig read back into
//! the host cluster, and the GitOps cluster registration secret.

use serde_json::json;

use trellis_common::document::ResourceDocument;

use super::{EXTERNAL_SECRETS_API, SECRET_STORE_NAME};
use crate::resolve::ResolvedConfig;

/// Item in the external store holding the connect token and vault id
const TOKEN_ITEM: &str = "onepassword-access-token";

fn external_secret(
    cfg: &ResolvedConfig,
    name: String,
    namespace: &str,
    component: &str,
) -> ResourceDocument {
    ResourceDocument::new(
        EXTERNAL_SECRETS_API,
        "ExternalSecret",
        Some(namespace),
        name,
        &cfg.name,
    )
    .with_label("app.kubernetes.io/name", "external-secret")
    .with_label("app.kubernetes.io/component", component)
    .with_user_labels(&cfg.extra_labels, &cfg.name)
    .with_annotations(&cfg.extra_annotations)
}

/// Token secret the sync job reads: connect token plus vault identifier,
/// pulled from the store's own access-token item.
pub fn build_token_external_secret(cfg: &ResolvedConfig) -> ResourceDocument {
    external_secret(
        cfg,
        format!("{}-onepassword-token", cfg.name),
        &cfg.target_namespace,
        "kubeconfig-sync",
    )
    .with_payload(json!({
        "spec": {
            "secretStoreRef": {"name": SECRET_STORE_NAME, "kind": "ClusterSecretStore"},
            "target": {"name": cfg.token_secret},
            "data": [
                {
                    "secretKey": "token",
                    "remoteRef": {"key": TOKEN_ITEM, "property": "credential"}
                },
                {
                    "secretKey": "vault",
                    "remoteRef": {"key": TOKEN_ITEM, "property": "vault"}
                }
            ]
        }
    }))
}

/// Read-back declaration exposing the synced kubeconfig into the cluster
/// by reference.
pub fn build_kubeconfig_external_secret(cfg: &ResolvedConfig) -> ResourceDocument {
    external_secret(
        cfg,
        format!("{}-kubeconfig", cfg.name),
        &cfg.target_namespace,
        "kubeconfig",
    )
    .with_payload(json!({
        "spec": {
            "secretStoreRef": {"name": SECRET_STORE_NAME, "kind": "ClusterSecretStore"},
            "target": {
                "name": format!("vcluster-{}-kubeconfig-external", cfg.name),
                "template": {
                    "engineVersion": "v2",
                    "data": {"config": "{{ .kubeconfig }}\n"}
                }
            },
            "dataFrom": [
                {"extract": {"key": cfg.vault_item}}
            ],
            "refreshInterval": "15m"
        }
    }))
}

/// GitOps cluster registration: materializes the name/server/config secret
/// the convergence engine uses to target the tenant cluster.
pub fn build_cluster_registration_external_secret(cfg: &ResolvedConfig) -> ResourceDocument {
    let mut target_labels = json!({
        "argocd.argoproj.io/secret-type": "cluster",
        "trellis.dev/tenant-cluster": cfg.name,
        "trellis.dev/environment": cfg.environment
    });
    for (k, v) in &cfg.cluster_labels {
        target_labels[k] = json!(v);
    }

    let mut template = json!({
        "engineVersion": "v2",
        "type": "Opaque",
        "metadata": {"labels": target_labels},
        "data": {
            "name": "{{ index . \"argocd-name\" }}",
            "server": "{{ index . \"argocd-server\" }}",
            "config": "{{ index . \"argocd-config\" }}"
        }
    });
    if !cfg.cluster_annotations.is_empty() {
        template["metadata"]["annotations"] = json!(cfg.cluster_annotations);
    }

    let mut doc = external_secret(
        cfg,
        format!("{}-argocd-cluster", cfg.name),
        "argocd",
        "argocd-cluster",
    )
    .with_label("argocd.argoproj.io/secret-type", "cluster")
    .with_payload(json!({
        "spec": {
            "secretStoreRef": {"name": SECRET_STORE_NAME, "kind": "ClusterSecretStore"},
            "target": {
                "name": format!("vcluster-{}", cfg.name),
                "template": template
            },
            "dataFrom": [
                {"extract": {"key": cfg.vault_item, "conversionStrategy": "Default", "decodingStrategy": "None"}}
            ],
            "refreshInterval": "15m"
        }
    }));
    doc = doc.with_labels(cfg.cluster_labels.clone());
    doc.with_annotations(&cfg.cluster_annotations)
}

//! Kubeconfig sync identity and job
//!
//! A one-shot Job waits for the chart-created kubeconfig secret to exist,
//! then pushes it to the external secret manager so the read-back
//! declarations can reference it. The job runs later, in the tenant
//! namespace, under a ServiceAccount whose Role is scoped by resourceNames
//! to exactly the two secrets it must read. The shell below is generated
//! text; the compiler never executes it.

use serde_json::json;

use trellis_common::document::ResourceDocument;

use super::RBAC_API;
use crate::resolve::ResolvedConfig;

/// In-cluster address of the secret-manager connect API
const CONNECT_HOST: &str = "http://onepassword-connect.external-secrets.svc:8080";

/// Init container: block until the kubeconfig secret volume shows up.
const WAIT_FOR_KUBECONFIG_SCRIPT: &str = r#"echo "Waiting for tenant kubeconfig secret..."
until [ -f /kubeconfig/config ]; do
  echo "kubeconfig not present yet, sleeping"
  sleep 5
done
echo "kubeconfig found""#;

/// Main container: push the kubeconfig and derived registration fields to
/// the secret manager. Fully parameterized through environment variables so
/// the text itself is identical for every tenant.
const SYNC_TO_VAULT_SCRIPT: &str = r#"set -e

apk add --no-cache curl jq >/dev/null 2>&1

echo "=== Kubeconfig sync ==="
echo "tenant: $TENANT_NAME"
echo "item: $OP_ITEM_NAME"

OP_CONNECT_HOST_CLEAN=$(printf '%s' "$OP_CONNECT_HOST" | tr -d '\r\n')
OP_CONNECT_TOKEN_CLEAN=$(printf '%s' "$OP_CONNECT_TOKEN" | tr -d '\r\n')
API_BASE="${OP_CONNECT_HOST_CLEAN%/}/v1"
AUTH_HEADER="Authorization: Bearer ${OP_CONNECT_TOKEN_CLEAN}"

VAULT_ID=$(printf '%s' "$OP_VAULT" | tr -d '\r\n')
if [ -z "$VAULT_ID" ]; then
  VAULT_ID=$(curl -fsS -H "$AUTH_HEADER" "$API_BASE/vaults" | jq -r --arg name "$OP_VAULT_NAME" '.[] | select(.name==$name) | .id' | head -n1)
fi
if [ -z "$VAULT_ID" ]; then
  echo "vault not found: $OP_VAULT_NAME"
  exit 1
fi

KUBECONFIG_CONTENT=$(cat /kubeconfig/config)

CA_DATA=$(grep 'certificate-authority-data:' /kubeconfig/config | awk '{print $2}' | tr -d '\r\n' | head -n1)
CLIENT_CERT=$(grep 'client-certificate-data:' /kubeconfig/config | awk '{print $2}' | tr -d '\r\n' | head -n1)
CLIENT_KEY=$(grep 'client-key-data:' /kubeconfig/config | awk '{print $2}' | tr -d '\r\n' | head -n1)

if [ -n "$CA_DATA" ] && [ -n "$CLIENT_CERT" ] && [ -n "$CLIENT_KEY" ]; then
  REGISTRATION_CONFIG=$(printf '{"tlsClientConfig":{"insecure":false,"caData":"%s","certData":"%s","keyData":"%s"}}' "$CA_DATA" "$CLIENT_CERT" "$CLIENT_KEY")
else
  echo "WARNING: kubeconfig carries no client certificates, registering insecurely"
  REGISTRATION_CONFIG='{"tlsClientConfig":{"insecure":true}}'
fi

FIELDS=$(jq -n \
  --arg kubeconfig "$KUBECONFIG_CONTENT" \
  --arg name "$TENANT_NAME" \
  --arg server "$EXTERNAL_SERVER_URL" \
  --arg config "$REGISTRATION_CONFIG" \
  '[
    {"id": "kubeconfig", "type": "CONCEALED", "label": "kubeconfig", "value": $kubeconfig},
    {"id": "argocd-name", "type": "STRING", "label": "argocd-name", "value": $name},
    {"id": "argocd-server", "type": "STRING", "label": "argocd-server", "value": $server},
    {"id": "argocd-config", "type": "CONCEALED", "label": "argocd-config", "value": $config}
  ]')
BODY=$(jq -n \
  --arg title "$OP_ITEM_NAME" \
  --arg vault "$VAULT_ID" \
  --arg env "$ENVIRONMENT" \
  --argjson fields "$FIELDS" \
  '{"title": $title, "vault": {"id": $vault}, "category": "SERVER", "tags": ["tenant-cluster", "kubeconfig", $env], "fields": $fields}')

ITEM_ID=$(curl -fsS -H "$AUTH_HEADER" "$API_BASE/vaults/$VAULT_ID/items" | jq -r --arg title "$OP_ITEM_NAME" '.[] | select(.title==$title) | .id' | head -n1)

if [ -z "$ITEM_ID" ]; then
  echo "creating item $OP_ITEM_NAME"
  curl -fsS -X POST "$API_BASE/vaults/$VAULT_ID/items" \
    -H "$AUTH_HEADER" -H "Content-Type: application/json" \
    -d "$BODY" >/dev/null
else
  echo "updating item $ITEM_ID"
  curl -fsS -X PUT "$API_BASE/vaults/$VAULT_ID/items/$ITEM_ID" \
    -H "$AUTH_HEADER" -H "Content-Type: application/json" \
    -d "$(printf '%s' "$BODY" | jq --arg id "$ITEM_ID" '. + {"id": $id}')" >/dev/null
fi

echo "kubeconfig synced""#;

/// Default vault looked up by name when the token secret carries no id
const DEFAULT_VAULT_NAME: &str = "platform";

fn identity_doc(cfg: &ResolvedConfig, kind: &str) -> ResourceDocument {
    let api_version = if kind == "ServiceAccount" { "v1" } else { RBAC_API };
    ResourceDocument::new(
        api_version,
        kind,
        Some(&cfg.target_namespace),
        &cfg.sync_job_name,
        &cfg.name,
    )
    .with_label("app.kubernetes.io/name", "kubeconfig-sync")
    .with_user_labels(&cfg.extra_labels, &cfg.name)
    .with_annotations(&cfg.extra_annotations)
}

/// ServiceAccount, Role, RoleBinding for the sync job.
///
/// The Role grants `get` on exactly the chart kubeconfig secret and the
/// connect-token secret, nothing wider.
pub fn build_sync_identity(cfg: &ResolvedConfig) -> Vec<ResourceDocument> {
    let service_account = identity_doc(cfg, "ServiceAccount").with_payload(json!({}));

    let role = identity_doc(cfg, "Role").with_payload(json!({
        "rules": [{
            "apiGroups": [""],
            "resources": ["secrets"],
            "resourceNames": [cfg.kubeconfig_secret, cfg.token_secret],
            "verbs": ["get"]
        }]
    }));

    let role_binding = identity_doc(cfg, "RoleBinding").with_payload(json!({
        "roleRef": {
            "apiGroup": "rbac.authorization.k8s.io",
            "kind": "Role",
            "name": cfg.sync_job_name
        },
        "subjects": [{
            "kind": "ServiceAccount",
            "name": cfg.sync_job_name,
            "namespace": cfg.target_namespace
        }]
    }));

    vec![service_account, role, role_binding]
}

/// The one-shot sync job.
pub fn build_sync_job(cfg: &ResolvedConfig) -> ResourceDocument {
    let external_server_url = cfg
        .exposure
        .as_ref()
        .map(|e| e.external_server_url.clone())
        .unwrap_or_default();

    ResourceDocument::new(
        "batch/v1",
        "Job",
        Some(&cfg.target_namespace),
        &cfg.sync_job_name,
        &cfg.name,
    )
    .with_label("app.kubernetes.io/name", "kubeconfig-sync")
    .with_user_labels(&cfg.extra_labels, &cfg.name)
    .with_annotations(&cfg.extra_annotations)
    .with_payload(json!({
        "spec": {
            "backoffLimit": 3,
            "ttlSecondsAfterFinished": 600,
            "template": {
                "metadata": {
                    "labels": {
                        "app.kubernetes.io/name": "kubeconfig-sync",
                        "app.kubernetes.io/instance": cfg.name
                    }
                },
                "spec": {
                    "serviceAccountName": cfg.sync_job_name,
                    "restartPolicy": "OnFailure",
                    "initContainers": [{
                        "name": "wait-for-kubeconfig",
                        "image": "busybox:1.36",
                        "command": ["sh", "-c", WAIT_FOR_KUBECONFIG_SCRIPT],
                        "volumeMounts": [{"name": "kubeconfig", "mountPath": "/kubeconfig"}]
                    }],
                    "containers": [{
                        "name": "sync-to-store",
                        "image": "alpine:3.20",
                        "command": ["sh", "-c", SYNC_TO_VAULT_SCRIPT],
                        "env": [
                            {"name": "OP_CONNECT_HOST", "value": CONNECT_HOST},
                            {"name": "OP_CONNECT_TOKEN", "valueFrom": {"secretKeyRef": {"name": cfg.token_secret, "key": "token"}}},
                            {"name": "OP_VAULT", "valueFrom": {"secretKeyRef": {"name": cfg.token_secret, "key": "vault"}}},
                            {"name": "OP_VAULT_NAME", "value": DEFAULT_VAULT_NAME},
                            {"name": "TENANT_NAME", "value": cfg.name},
                            {"name": "OP_ITEM_NAME", "value": cfg.vault_item},
                            {"name": "EXTERNAL_SERVER_URL", "value": external_server_url},
                            {"name": "ENVIRONMENT", "value": cfg.environment}
                        ],
                        "volumeMounts": [{"name": "kubeconfig", "mountPath": "/kubeconfig", "readOnly": true}]
                    }],
                    "volumes": [{
                        "name": "kubeconfig",
                        "secret": {"secretName": cfg.kubeconfig_secret, "optional": false}
                    }]
                }
            }
        }
    }))
}

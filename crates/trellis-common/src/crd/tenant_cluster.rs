//! TenantCluster Custom Resource Definition
//!
//! A TenantCluster is the single declarative request an operator authors to
//! get a provisioned virtual cluster: sizing via preset + leaf overrides,
//! optional external exposure, integration selectors, and the GitOps chart
//! source. The compiler turns one TenantCluster into the full dependency-
//! ordered document set; it never mutates the request itself.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{
    Action, ApplicationSourceSpec, Condition, CorednsSpec, ExposureSpec, IntegrationsSpec,
    IsolationSpec, PersistenceSpec, RequestPhase, ResourcesSpec,
};

/// Specification for a TenantCluster request
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "platform.trellis.dev",
    version = "v1alpha1",
    kind = "TenantCluster",
    plural = "tenantclusters",
    shortname = "tcl",
    status = "TenantClusterStatus",
    namespaced,
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Preset","type":"string","jsonPath":".spec.preset"}"#,
    printcolumn = r#"{"name":"Target","type":"string","jsonPath":".spec.targetNamespace"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct TenantClusterSpec {
    /// Logical name of the tenant cluster
    ///
    /// Seeds every derived resource name, so it is distinct from
    /// `metadata.name` and must be a DNS-1123 label.
    pub name: String,

    /// Namespace the tenant cluster is installed into (defaults to the
    /// request's own namespace)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_namespace: Option<String>,

    /// Sizing preset name; unknown names are rejected at resolution time
    /// with the allowed set
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Kubernetes version for the tenant control plane
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes_version: Option<String>,

    /// Control-plane replica count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u32>,

    /// Control-plane compute resources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourcesSpec>,

    /// Control-plane persistence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistence: Option<PersistenceSpec>,

    /// CoreDNS overlay settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coredns: Option<CorednsSpec>,

    /// DNS domain of the tenant cluster (default "cluster.local")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_domain: Option<String>,

    /// External exposure of the control endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exposure: Option<ExposureSpec>,

    /// Downstream integration selectors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrations: Option<IntegrationsSpec>,

    /// Chart source overrides for the generated application descriptor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<ApplicationSourceSpec>,

    /// Host-side network fencing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isolation: Option<IsolationSpec>,

    /// Extra labels merged into every emitted document
    ///
    /// User values win over computed defaults; the management label triple
    /// is never overridable.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Extra annotations merged into every emitted document
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    /// Action this request is compiled for
    #[serde(default)]
    pub action: Action,
}

fn default_preset() -> String {
    "dev".to_string()
}

impl TenantClusterSpec {
    /// Validate request fields that do not need the preset table
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.name.is_empty() {
            return Err(crate::Error::validation_for_field(
                "unknown",
                "spec.name",
                "name cannot be empty",
            ));
        }
        if !is_dns1123_label(&self.name) {
            return Err(crate::Error::validation_for_field(
                &self.name,
                "spec.name",
                format!(
                    "name {:?} must be a lowercase DNS-1123 label (alphanumerics and '-', max 63 chars)",
                    self.name
                ),
            ));
        }
        Ok(())
    }
}

/// True if `s` is a valid lowercase DNS-1123 label
fn is_dns1123_label(s: &str) -> bool {
    if s.is_empty() || s.len() > 63 {
        return false;
    }
    let bytes = s.as_bytes();
    let ok_edge = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    if !ok_edge(bytes[0]) || !ok_edge(bytes[bytes.len() - 1]) {
        return false;
    }
    bytes
        .iter()
        .all(|&b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// Status for a TenantCluster request
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TenantClusterStatus {
    /// Current phase of the request lifecycle
    #[serde(default)]
    pub phase: RequestPhase,

    /// Human-readable message about current state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Conditions recorded by the pipeline executor
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// The generation of the spec that was last processed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl TenantClusterStatus {
    /// Create a new status with the given phase and message
    pub fn with_phase(phase: RequestPhase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: Some(message.into()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_spec(name: &str) -> TenantClusterSpec {
        serde_json::from_value(serde_json::json!({ "name": name })).unwrap()
    }

    #[test]
    fn preset_defaults_to_dev() {
        let spec = minimal_spec("team-a");
        assert_eq!(spec.preset, "dev");
        assert_eq!(spec.action, Action::Configure);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let spec: TenantClusterSpec = serde_json::from_value(serde_json::json!({
            "name": "team-a",
            "somethingElse": {"nested": true}
        }))
        .unwrap();
        assert_eq!(spec.name, "team-a");
    }

    #[test]
    fn validate_rejects_bad_names() {
        assert!(minimal_spec("team-a").validate().is_ok());
        assert!(minimal_spec("Team-A").validate().is_err());
        assert!(minimal_spec("-team").validate().is_err());
        let err = minimal_spec("team_a").validate().unwrap_err();
        assert_eq!(err.field(), Some("spec.name"));
    }

    #[test]
    fn camel_case_round_trip() {
        let spec: TenantClusterSpec = serde_json::from_value(serde_json::json!({
            "name": "team-a",
            "targetNamespace": "team-a-system",
            "exposure": {"hostname": "team-a.example.com", "subnet": "10.0.4.0/24", "apiPort": 8443}
        }))
        .unwrap();
        assert_eq!(spec.target_namespace.as_deref(), Some("team-a-system"));
        let exposure = spec.exposure.as_ref().unwrap();
        assert_eq!(exposure.api_port, Some(8443));

        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["targetNamespace"], "team-a-system");
        assert_eq!(json["exposure"]["apiPort"], 8443);
    }
}

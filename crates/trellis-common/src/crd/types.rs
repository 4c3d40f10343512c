//! Shared types used by the TenantCluster CRD

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Sizing preset for a tenant cluster
///
/// Presets name a baseline bundle of sizing/topology defaults. The request
/// carries the preset as a plain string so the resolver can reject unknown
/// names with a message listing the allowed set.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Single-replica, ephemeral sizing for development clusters
    #[default]
    Dev,
    /// HA sizing with persistence for production clusters
    Prod,
}

impl Preset {
    /// All preset names accepted in a request, in canonical order
    pub const ALLOWED: &'static [&'static str] = &["dev", "prod"];

    /// Parse a preset name as it appears in a request document
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "dev" => Some(Self::Dev),
            "prod" => Some(Self::Prod),
            _ => None,
        }
    }

    /// The canonical lowercase name of this preset
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Prod => "prod",
        }
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow action a request is compiled for
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Emit the full resource graph
    #[default]
    Configure,
    /// Emit identity-only teardown documents for the same graph
    Delete,
}

impl Action {
    /// Parse an action name (used by the CLI `--action` flag)
    pub fn parse(s: &str) -> Result<Self, crate::Error> {
        match s {
            "configure" => Ok(Self::Configure),
            "delete" => Ok(Self::Delete),
            _ => Err(crate::Error::validation(format!(
                "unknown action {s:?}, expected one of: configure, delete"
            ))),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configure => write!(f, "configure"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Lifecycle phase reported on a TenantCluster status
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum RequestPhase {
    /// Request has been accepted but not yet compiled
    #[default]
    Pending,
    /// Resource documents have been emitted for creation
    Scheduled,
    /// Teardown documents have been emitted
    Deleting,
    /// All converging systems report healthy
    Ready,
    /// Compilation or convergence failed
    Failed,
}

impl std::fmt::Display for RequestPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Scheduled => write!(f, "Scheduled"),
            Self::Deleting => write!(f, "Deleting"),
            Self::Ready => write!(f, "Ready"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Condition status following Kubernetes conventions
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ConditionStatus {
    /// Condition is true
    True,
    /// Condition is false
    False,
    /// Condition state cannot be determined
    #[default]
    Unknown,
}

/// A status condition following Kubernetes conventions
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition (e.g., PipelineCompleted, ConfigureWorkflowCompleted)
    #[serde(rename = "type")]
    pub type_: String,

    /// Status of the condition (True, False, Unknown)
    pub status: ConditionStatus,

    /// Machine-readable reason for the condition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// CPU/memory quantity pair used in requests and limits
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct ResourceValues {
    /// CPU quantity (e.g., "500m")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,

    /// Memory quantity (e.g., "1Gi")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
}

/// Compute resources for the tenant control plane
///
/// Each leaf overrides its preset baseline independently; an empty block
/// leaves the baseline untouched.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct ResourcesSpec {
    /// Requested resources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests: Option<ResourceValues>,

    /// Resource limits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<ResourceValues>,
}

/// Control-plane persistence configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceSpec {
    /// Whether the control plane keeps state on a volume claim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Volume claim size (e.g., "10Gi")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    /// Storage class for the claim; absent means the cluster default class
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
}

/// CoreDNS overlay configuration for the tenant cluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct CorednsSpec {
    /// Number of CoreDNS replicas inside the tenant cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u32>,
}

/// External exposure of the tenant control plane
///
/// `hostname` and `subnet` are paired: supplying exactly one of them is a
/// validation error. When `vip` is absent it is derived from the subnet at a
/// fixed offset; supplied or derived, the VIP must fall inside the subnet.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExposureSpec {
    /// DNS hostname for the control endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    /// Subnet (CIDR) the virtual IP is allocated from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet: Option<String>,

    /// Virtual IP for the control endpoint's LoadBalancer service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vip: Option<String>,

    /// External API port (default 443)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_port: Option<u16>,
}

/// Selector labels for host-cluster issuers synced into the tenant
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CertManagerIntegration {
    /// Labels matching the ClusterIssuers to sync from the host
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cluster_issuer_selector_labels: BTreeMap<String, String>,
}

/// Selector labels for host-cluster secret stores synced into the tenant
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExternalSecretsIntegration {
    /// Labels matching the ClusterSecretStores to sync from the host
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cluster_store_selector_labels: BTreeMap<String, String>,
}

/// GitOps registration settings for the tenant cluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCdIntegration {
    /// Environment tag ("development"/"production"); defaults from the preset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    /// Extra labels for the generated cluster registration secret
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cluster_labels: BTreeMap<String, String>,

    /// Extra annotations for the generated cluster registration secret
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cluster_annotations: BTreeMap<String, String>,
}

/// Downstream integration selectors
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationsSpec {
    /// cert-manager issuer sync selector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_manager: Option<CertManagerIntegration>,

    /// external-secrets store sync selector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_secrets: Option<ExternalSecretsIntegration>,

    /// GitOps registration settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argocd: Option<ArgoCdIntegration>,
}

/// Chart source for the generated application descriptor
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSourceSpec {
    /// Helm repository URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,

    /// Chart name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<String>,

    /// Chart version / target revision
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_revision: Option<String>,

    /// Destination API server URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_server: Option<String>,
}

/// Host-side network fencing for the tenant namespace
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct IsolationSpec {
    /// Emit baseline NetworkPolicies (default-deny plus DNS, intra-namespace,
    /// and external egress allowances) into the target namespace
    #[serde(default)]
    pub enabled: bool,
}

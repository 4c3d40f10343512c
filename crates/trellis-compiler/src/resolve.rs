//! Request resolution
//!
//! Merges a request's explicit fields over its preset baseline, derives
//! computed values (VIP, external server URL, secret/item names), and
//! validates the invariants the builders rely on. Any failure aborts the
//! whole resolution; a partially-resolved config is never returned.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::Serialize;

use trellis_common::crd::{Preset, TenantClusterSpec};
use trellis_common::netutil::Ipv4Cidr;
use trellis_common::{Error, Result};

use crate::presets::PresetTable;

/// Offset above the network address used when deriving a VIP from a subnet
pub const DEFAULT_VIP_OFFSET: u32 = 100;

/// Default external API port
pub const DEFAULT_API_PORT: u16 = 443;

/// Default Kubernetes version for the tenant control plane
pub const DEFAULT_KUBERNETES_VERSION: &str = "v1.34.3";

/// Default DNS domain of the tenant cluster
pub const DEFAULT_CLUSTER_DOMAIN: &str = "cluster.local";

/// Default Helm repository for the tenant cluster chart
pub const DEFAULT_CHART_REPO: &str = "https://charts.loft.sh";

/// Default chart name
pub const DEFAULT_CHART: &str = "vcluster";

/// Default chart revision
pub const DEFAULT_CHART_REVISION: &str = "0.30.4";

/// Default destination API server for the application descriptor
pub const DEFAULT_DESTINATION_SERVER: &str = "https://kubernetes.default.svc";

/// Fully-resolved external exposure
///
/// Either the whole block is present (hostname, subnet, and a VIP proven to
/// lie inside it) or the request carried no exposure at all.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolvedExposure {
    /// DNS hostname of the control endpoint
    pub hostname: String,
    /// Subnet the VIP was allocated from, normalized CIDR
    pub subnet: String,
    /// Virtual IP, supplied or derived, inside `subnet`
    pub vip: String,
    /// External API port
    pub api_port: u16,
    /// `https://{hostname}:{api_port}`
    pub external_server_url: String,
    /// Subject alternative names for the control-plane proxy certificate
    pub extra_sans: Vec<String>,
}

/// Chart source for the application descriptor
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolvedAppSource {
    /// Helm repository URL
    pub repo_url: String,
    /// Chart name
    pub chart: String,
    /// Chart revision
    pub target_revision: String,
    /// Destination API server URL
    pub destination_server: String,
}

/// Fully-populated, immutable output of request resolution
///
/// Constructed fresh per compile call; never cached, never persisted.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResolvedConfig {
    /// Logical name of the tenant cluster
    pub name: String,
    /// Namespace the request lives in (sub-requests are emitted here)
    pub request_namespace: String,
    /// Namespace the tenant cluster is installed into
    pub target_namespace: String,
    /// The resolved preset
    pub preset: Preset,
    /// Kubernetes version of the tenant control plane
    pub kubernetes_version: String,
    /// DNS domain of the tenant cluster
    pub cluster_domain: String,
    /// Control-plane replica count
    pub replicas: u32,
    /// CPU request quantity
    pub cpu_request: String,
    /// Memory request quantity
    pub memory_request: String,
    /// CPU limit quantity
    pub cpu_limit: String,
    /// Memory limit quantity
    pub memory_limit: String,
    /// Whether the control plane persists state
    pub persistence_enabled: bool,
    /// Volume claim size
    pub persistence_size: String,
    /// Storage class for the claim; `None` means the cluster default class
    pub storage_class: Option<String>,
    /// CoreDNS replica count
    pub coredns_replicas: u32,
    /// External exposure, when the request asked for one
    pub exposure: Option<ResolvedExposure>,
    /// Selector for host ClusterIssuers synced into the tenant
    pub issuer_selector: BTreeMap<String, String>,
    /// Selector for host ClusterSecretStores synced into the tenant
    pub store_selector: BTreeMap<String, String>,
    /// Environment tag for GitOps registration
    pub environment: String,
    /// Extra labels for the cluster registration secret
    pub cluster_labels: BTreeMap<String, String>,
    /// Extra annotations for the cluster registration secret
    pub cluster_annotations: BTreeMap<String, String>,
    /// Chart source for the application descriptor
    pub app_source: ResolvedAppSource,
    /// Whether baseline NetworkPolicies are emitted
    pub isolation_enabled: bool,
    /// User labels merged into every document
    pub extra_labels: BTreeMap<String, String>,
    /// User annotations merged into every document
    pub extra_annotations: BTreeMap<String, String>,
    /// GitOps project name: `vcluster-{name}`
    pub project_name: String,
    /// GitOps application name: `vcluster-{name}`
    pub application_name: String,
    /// Secret-manager item holding the synced kubeconfig:
    /// `vcluster-{name}-kubeconfig`
    pub vault_item: String,
    /// Name shared by the sync job and its identity objects:
    /// `{name}-kubeconfig-sync`
    pub sync_job_name: String,
    /// Kubernetes secret the token ExternalSecret materializes:
    /// `vcluster-{name}-onepassword-token`
    pub token_secret: String,
    /// Chart-created secret holding the tenant kubeconfig: `vc-{name}`
    pub kubeconfig_secret: String,
}

/// Resolve a request against its preset baseline.
pub fn resolve(
    spec: &TenantClusterSpec,
    request_namespace: &str,
    presets: &PresetTable,
) -> Result<ResolvedConfig> {
    spec.validate()?;
    let name = spec.name.clone();

    let preset = Preset::parse(&spec.preset).ok_or_else(|| {
        Error::validation_for_field(
            &name,
            "spec.preset",
            format!(
                "unknown preset {:?}, allowed presets: {}",
                spec.preset,
                Preset::ALLOWED.join(", ")
            ),
        )
    })?;
    let baseline = presets.get(preset).ok_or_else(|| {
        Error::validation_for_field(
            &name,
            "spec.preset",
            format!("preset {preset} has no baseline in the preset table"),
        )
    })?;

    // Leaf-field overrides: each supplied leaf replaces its baseline value
    // independently; an empty block leaves the baseline untouched.
    let requests = spec.resources.as_ref().and_then(|r| r.requests.as_ref());
    let limits = spec.resources.as_ref().and_then(|r| r.limits.as_ref());

    let replicas = spec.replicas.unwrap_or(baseline.replicas);
    let cpu_request = requests
        .and_then(|r| r.cpu.clone())
        .unwrap_or_else(|| baseline.cpu_request.clone());
    let memory_request = requests
        .and_then(|r| r.memory.clone())
        .unwrap_or_else(|| baseline.memory_request.clone());
    let cpu_limit = limits
        .and_then(|l| l.cpu.clone())
        .unwrap_or_else(|| baseline.cpu_limit.clone());
    let memory_limit = limits
        .and_then(|l| l.memory.clone())
        .unwrap_or_else(|| baseline.memory_limit.clone());

    let persistence = spec.persistence.as_ref();
    let persistence_enabled = persistence
        .and_then(|p| p.enabled)
        .unwrap_or(baseline.persistence_enabled);
    let persistence_size = persistence
        .and_then(|p| p.size.clone())
        .unwrap_or_else(|| baseline.persistence_size.clone());
    let storage_class = persistence.and_then(|p| p.storage_class.clone());

    let coredns_replicas = spec
        .coredns
        .as_ref()
        .and_then(|c| c.replicas)
        .unwrap_or(baseline.coredns_replicas);

    let exposure = resolve_exposure(spec, &name)?;

    let integrations = spec.integrations.as_ref();
    let issuer_selector = integrations
        .and_then(|i| i.cert_manager.as_ref())
        .map(|c| c.cluster_issuer_selector_labels.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            BTreeMap::from([(
                "trellis.dev/cluster-issuer".to_string(),
                "letsencrypt-prod".to_string(),
            )])
        });
    let store_selector = integrations
        .and_then(|i| i.external_secrets.as_ref())
        .map(|e| e.cluster_store_selector_labels.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            BTreeMap::from([(
                "trellis.dev/cluster-secret-store".to_string(),
                "onepassword-store".to_string(),
            )])
        });

    let argocd = integrations.and_then(|i| i.argocd.as_ref());
    let environment = argocd
        .and_then(|a| a.environment.clone())
        .unwrap_or_else(|| match preset {
            Preset::Prod => "production".to_string(),
            Preset::Dev => "development".to_string(),
        });
    let cluster_labels = argocd.map(|a| a.cluster_labels.clone()).unwrap_or_default();
    let cluster_annotations = argocd
        .map(|a| a.cluster_annotations.clone())
        .unwrap_or_default();

    let app = spec.application.as_ref();
    let app_source = ResolvedAppSource {
        repo_url: app
            .and_then(|a| a.repo_url.clone())
            .unwrap_or_else(|| DEFAULT_CHART_REPO.to_string()),
        chart: app
            .and_then(|a| a.chart.clone())
            .unwrap_or_else(|| DEFAULT_CHART.to_string()),
        target_revision: app
            .and_then(|a| a.target_revision.clone())
            .unwrap_or_else(|| DEFAULT_CHART_REVISION.to_string()),
        destination_server: app
            .and_then(|a| a.destination_server.clone())
            .unwrap_or_else(|| DEFAULT_DESTINATION_SERVER.to_string()),
    };

    let isolation_enabled = spec.isolation.as_ref().map(|i| i.enabled).unwrap_or(false);

    let target_namespace = spec
        .target_namespace
        .clone()
        .unwrap_or_else(|| request_namespace.to_string());

    Ok(ResolvedConfig {
        request_namespace: request_namespace.to_string(),
        target_namespace,
        preset,
        kubernetes_version: spec
            .kubernetes_version
            .clone()
            .unwrap_or_else(|| DEFAULT_KUBERNETES_VERSION.to_string()),
        cluster_domain: spec
            .cluster_domain
            .clone()
            .unwrap_or_else(|| DEFAULT_CLUSTER_DOMAIN.to_string()),
        replicas,
        cpu_request,
        memory_request,
        cpu_limit,
        memory_limit,
        persistence_enabled,
        persistence_size,
        storage_class,
        coredns_replicas,
        exposure,
        issuer_selector,
        store_selector,
        environment,
        cluster_labels,
        cluster_annotations,
        app_source,
        isolation_enabled,
        extra_labels: spec.labels.clone(),
        extra_annotations: spec.annotations.clone(),
        project_name: format!("vcluster-{name}"),
        application_name: format!("vcluster-{name}"),
        vault_item: format!("vcluster-{name}-kubeconfig"),
        sync_job_name: format!("{name}-kubeconfig-sync"),
        token_secret: format!("vcluster-{name}-onepassword-token"),
        kubeconfig_secret: format!("vc-{name}"),
        name,
    })
}

/// Resolve the exposure block: pairing rules, VIP derivation, containment.
fn resolve_exposure(spec: &TenantClusterSpec, name: &str) -> Result<Option<ResolvedExposure>> {
    let Some(exp) = spec.exposure.as_ref() else {
        return Ok(None);
    };

    match (&exp.hostname, &exp.subnet) {
        (None, None) => {
            if exp.vip.is_some() {
                return Err(Error::validation_for_field(
                    name,
                    "spec.exposure.vip",
                    "exposure.vip requires exposure.subnet so containment can be validated",
                ));
            }
            // An exposure block without hostname/subnet/vip is treated as no
            // exposure at all.
            return Ok(None);
        }
        (Some(_), None) => {
            return Err(Error::validation_for_field(
                name,
                "spec.exposure.subnet",
                "exposure.hostname and exposure.subnet are paired; hostname was supplied without subnet",
            ));
        }
        (None, Some(_)) => {
            return Err(Error::validation_for_field(
                name,
                "spec.exposure.hostname",
                "exposure.hostname and exposure.subnet are paired; subnet was supplied without hostname",
            ));
        }
        (Some(_), Some(_)) => {}
    }

    let hostname = exp.hostname.clone().unwrap_or_default();
    let subnet_str = exp.subnet.as_deref().unwrap_or_default();
    let subnet = Ipv4Cidr::parse(subnet_str).map_err(|e| {
        Error::validation_for_field(name, "spec.exposure.subnet", e.to_string())
    })?;

    let vip = match &exp.vip {
        Some(vip_str) => Ipv4Addr::from_str(vip_str).map_err(|_| {
            Error::validation_for_field(
                name,
                "spec.exposure.vip",
                format!("invalid vip {vip_str:?}: bad address octets"),
            )
        })?,
        None => subnet.addr_at(DEFAULT_VIP_OFFSET).ok_or_else(|| {
            Error::validation_for_field(
                name,
                "spec.exposure.subnet",
                format!(
                    "subnet {subnet} is too small for the vip offset {DEFAULT_VIP_OFFSET} ({} addresses)",
                    subnet.host_count()
                ),
            )
        })?,
    };

    if !subnet.contains(vip) {
        return Err(Error::validation_for_field(
            name,
            "spec.exposure.vip",
            format!("vip {vip} is not within subnet {subnet}"),
        ));
    }

    let api_port = exp.api_port.unwrap_or(DEFAULT_API_PORT);
    let vip = vip.to_string();
    let external_server_url = external_server_url(Some(&hostname), Some(&vip), api_port);
    let extra_sans = vec![hostname.clone(), vip.clone()];

    Ok(Some(ResolvedExposure {
        hostname,
        subnet: subnet.to_string(),
        vip,
        api_port,
        external_server_url,
        extra_sans,
    }))
}

/// External server URL precedence: hostname, then vip, else empty.
fn external_server_url(hostname: Option<&str>, vip: Option<&str>, api_port: u16) -> String {
    if let Some(hostname) = hostname.filter(|h| !h.is_empty()) {
        format!("https://{hostname}:{api_port}")
    } else if let Some(vip) = vip.filter(|v| !v.is_empty()) {
        format!("https://{vip}:{api_port}")
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use trellis_common::crd::TenantClusterSpec;

    fn spec(value: serde_json::Value) -> TenantClusterSpec {
        serde_json::from_value(value).unwrap()
    }

    fn resolve_ok(value: serde_json::Value) -> ResolvedConfig {
        resolve(&spec(value), "platform-requests", &PresetTable::builtin()).unwrap()
    }

    fn resolve_err(value: serde_json::Value) -> Error {
        resolve(&spec(value), "platform-requests", &PresetTable::builtin()).unwrap_err()
    }

    #[test]
    fn unknown_preset_names_allowed_set() {
        let err = resolve_err(json!({"name": "team-a", "preset": "staging"}));
        assert_eq!(err.field(), Some("spec.preset"));
        let msg = err.to_string();
        assert!(msg.contains("staging"));
        assert!(msg.contains("dev"));
        assert!(msg.contains("prod"));
    }

    #[test]
    fn prod_baseline_with_single_leaf_override() {
        let cfg = resolve_ok(json!({
            "name": "team-a",
            "preset": "prod",
            "resources": {"requests": {"cpu": "750m"}}
        }));
        assert_eq!(cfg.cpu_request, "750m");
        // Every other sizing field stays at the prod baseline.
        assert_eq!(cfg.memory_request, "1Gi");
        assert_eq!(cfg.cpu_limit, "2");
        assert_eq!(cfg.memory_limit, "2Gi");
        assert_eq!(cfg.replicas, 3);
        assert!(cfg.persistence_enabled);
        assert_eq!(cfg.persistence_size, "10Gi");
        assert_eq!(cfg.coredns_replicas, 2);
    }

    #[test]
    fn resolution_is_deterministic() {
        let request = json!({
            "name": "team-a",
            "preset": "prod",
            "exposure": {"hostname": "team-a.example.com", "subnet": "10.0.4.0/24"},
            "labels": {"team": "a"}
        });
        let first = resolve_ok(request.clone());
        let second = resolve_ok(request);
        assert_eq!(first, second);
        // Byte-identical when serialized: no clock or randomness leaked in.
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn vip_is_derived_at_the_canonical_offset() {
        let cfg = resolve_ok(json!({
            "name": "team-a",
            "exposure": {"hostname": "team-a.example.com", "subnet": "10.0.4.0/24"}
        }));
        let exposure = cfg.exposure.unwrap();
        assert_eq!(exposure.vip, "10.0.4.100");
        assert_eq!(exposure.api_port, 443);
        assert_eq!(
            exposure.external_server_url,
            "https://team-a.example.com:443"
        );
        assert_eq!(exposure.extra_sans, vec!["team-a.example.com", "10.0.4.100"]);
    }

    #[test]
    fn supplied_vip_outside_subnet_is_rejected() {
        let err = resolve_err(json!({
            "name": "team-a",
            "exposure": {"hostname": "team-a.example.com", "subnet": "10.0.4.0/24", "vip": "10.0.5.5"}
        }));
        assert_eq!(err.field(), Some("spec.exposure.vip"));
        let msg = err.to_string();
        assert!(msg.contains("10.0.5.5"));
        assert!(msg.contains("10.0.4.0/24"));
    }

    #[test]
    fn subnet_too_small_for_offset_is_rejected() {
        let err = resolve_err(json!({
            "name": "team-a",
            "exposure": {"hostname": "team-a.example.com", "subnet": "10.0.4.0/26"}
        }));
        assert_eq!(err.field(), Some("spec.exposure.subnet"));
        assert!(err.to_string().contains("too small"));
    }

    #[test]
    fn hostname_and_subnet_are_paired() {
        let err = resolve_err(json!({
            "name": "team-a",
            "exposure": {"hostname": "team-a.example.com"}
        }));
        assert_eq!(err.field(), Some("spec.exposure.subnet"));

        let err = resolve_err(json!({
            "name": "team-a",
            "exposure": {"subnet": "10.0.4.0/24"}
        }));
        assert_eq!(err.field(), Some("spec.exposure.hostname"));

        // Both present succeeds; neither present resolves with no exposure.
        assert!(resolve_ok(json!({
            "name": "team-a",
            "exposure": {"hostname": "h.example.com", "subnet": "10.0.4.0/24"}
        }))
        .exposure
        .is_some());
        assert!(resolve_ok(json!({"name": "team-a"})).exposure.is_none());
        assert!(resolve_ok(json!({"name": "team-a", "exposure": {}})).exposure.is_none());
    }

    #[test]
    fn vip_without_subnet_is_rejected() {
        let err = resolve_err(json!({
            "name": "team-a",
            "exposure": {"vip": "10.0.4.100"}
        }));
        assert_eq!(err.field(), Some("spec.exposure.vip"));
    }

    #[test]
    fn malformed_subnet_octets_are_rejected() {
        let err = resolve_err(json!({
            "name": "team-a",
            "exposure": {"hostname": "h.example.com", "subnet": "10.0.300.0/24"}
        }));
        assert_eq!(err.field(), Some("spec.exposure.subnet"));
        assert!(err.to_string().contains("octets"));
    }

    #[test]
    fn derived_names_are_keyed_only_on_name() {
        let cfg = resolve_ok(json!({"name": "team-a"}));
        assert_eq!(cfg.project_name, "vcluster-team-a");
        assert_eq!(cfg.application_name, "vcluster-team-a");
        assert_eq!(cfg.vault_item, "vcluster-team-a-kubeconfig");
        assert_eq!(cfg.sync_job_name, "team-a-kubeconfig-sync");
        assert_eq!(cfg.token_secret, "vcluster-team-a-onepassword-token");
        assert_eq!(cfg.kubeconfig_secret, "vc-team-a");
    }

    #[test]
    fn environment_defaults_from_preset() {
        assert_eq!(resolve_ok(json!({"name": "a"})).environment, "development");
        assert_eq!(
            resolve_ok(json!({"name": "a", "preset": "prod"})).environment,
            "production"
        );
        assert_eq!(
            resolve_ok(json!({
                "name": "a",
                "integrations": {"argocd": {"environment": "staging"}}
            }))
            .environment,
            "staging"
        );
    }

    #[test]
    fn target_namespace_defaults_to_request_namespace() {
        assert_eq!(resolve_ok(json!({"name": "a"})).target_namespace, "platform-requests");
        assert_eq!(
            resolve_ok(json!({"name": "a", "targetNamespace": "a-system"})).target_namespace,
            "a-system"
        );
    }

    #[test]
    fn selector_defaults_apply_when_unset() {
        let cfg = resolve_ok(json!({"name": "a"}));
        assert_eq!(
            cfg.store_selector.get("trellis.dev/cluster-secret-store").unwrap(),
            "onepassword-store"
        );
        assert_eq!(
            cfg.issuer_selector.get("trellis.dev/cluster-issuer").unwrap(),
            "letsencrypt-prod"
        );

        let cfg = resolve_ok(json!({
            "name": "a",
            "integrations": {"externalSecrets": {"clusterStoreSelectorLabels": {"store": "vault"}}}
        }));
        assert_eq!(cfg.store_selector.get("store").unwrap(), "vault");
        assert!(!cfg.store_selector.contains_key("trellis.dev/cluster-secret-store"));
    }

    #[test]
    fn external_server_url_precedence() {
        assert_eq!(
            external_server_url(Some("h.example.com"), Some("10.0.4.100"), 443),
            "https://h.example.com:443"
        );
        assert_eq!(
            external_server_url(None, Some("10.0.4.100"), 8443),
            "https://10.0.4.100:8443"
        );
        assert_eq!(external_server_url(None, None, 443), "");
    }
}

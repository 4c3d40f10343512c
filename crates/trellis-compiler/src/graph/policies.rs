//! Baseline network fencing for the tenant namespace
//!
//! Opt-in via `spec.isolation.enabled`: a default-deny floor plus the
//! minimal allowances a tenant control plane needs (DNS, intra-namespace
//! traffic, egress to the outside world).

use serde_json::{json, Value};

use trellis_common::document::ResourceDocument;

use crate::resolve::ResolvedConfig;

const NETWORKING_API: &str = "networking.k8s.io/v1";

fn policy(cfg: &ResolvedConfig, name: &str, spec: Value) -> ResourceDocument {
    ResourceDocument::new(
        NETWORKING_API,
        "NetworkPolicy",
        Some(&cfg.target_namespace),
        name,
        &cfg.name,
    )
    .with_label("app.kubernetes.io/name", name)
    .with_label("app.kubernetes.io/component", "network-policy")
    .with_user_labels(&cfg.extra_labels, &cfg.name)
    .with_annotations(&cfg.extra_annotations)
    .with_payload(json!({ "spec": spec }))
}

/// The baseline policy set, deny-first.
pub fn build_network_policies(cfg: &ResolvedConfig) -> Vec<ResourceDocument> {
    vec![
        policy(
            cfg,
            "default-deny-all",
            json!({
                "podSelector": {},
                "policyTypes": ["Ingress", "Egress"]
            }),
        ),
        policy(
            cfg,
            "allow-dns",
            json!({
                "podSelector": {},
                "policyTypes": ["Egress"],
                "egress": [{
                    "to": [{
                        "namespaceSelector": {
                            "matchLabels": {"kubernetes.io/metadata.name": "kube-system"}
                        },
                        "podSelector": {"matchLabels": {"k8s-app": "kube-dns"}}
                    }],
                    "ports": [
                        {"protocol": "UDP", "port": 53},
                        {"protocol": "TCP", "port": 53}
                    ]
                }]
            }),
        ),
        policy(
            cfg,
            "allow-intra-namespace",
            json!({
                "podSelector": {},
                "policyTypes": ["Ingress", "Egress"],
                "ingress": [{"from": [{"podSelector": {}}]}],
                "egress": [{"to": [{"podSelector": {}}]}]
            }),
        ),
        policy(
            cfg,
            "allow-external-egress",
            json!({
                "podSelector": {},
                "policyTypes": ["Egress"],
                "egress": [{
                    "to": [{
                        "ipBlock": {
                            "cidr": "0.0.0.0/0",
                            "except": ["10.0.0.0/8", "172.16.0.0/12", "192.168.0.0/16"]
                        }
                    }]
                }]
            }),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::PresetTable;
    use crate::resolve::resolve;
    use serde_json::json;

    #[test]
    fn baseline_set_is_deny_first() {
        let spec = serde_json::from_value(json!({
            "name": "team-a",
            "isolation": {"enabled": true}
        }))
        .unwrap();
        let cfg = resolve(&spec, "platform-requests", &PresetTable::builtin()).unwrap();
        let policies = build_network_policies(&cfg);
        let names: Vec<&str> = policies.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "default-deny-all",
                "allow-dns",
                "allow-intra-namespace",
                "allow-external-egress"
            ]
        );
        for p in &policies {
            assert_eq!(p.namespace.as_deref(), Some("platform-requests"));
            assert_eq!(p.kind, "NetworkPolicy");
        }
        assert_eq!(
            policies[0].payload["spec"]["policyTypes"],
            json!(["Ingress", "Egress"])
        );
        assert_eq!(
            policies[3].payload["spec"]["egress"][0]["to"][0]["ipBlock"]["cidr"],
            "0.0.0.0/0"
        );
    }
}

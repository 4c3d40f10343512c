//! Helm values payload for the tenant cluster chart
//!
//! The values object is the one opaque payload the compiler produces: it is
//! chart input, not an identity-addressed resource, so it is assembled as
//! JSON directly from the resolved config. Everything here is a pure
//! function of the `ResolvedConfig`.

use serde_json::{json, Value};

use crate::resolve::{ResolvedConfig, DEFAULT_API_PORT};

/// Build the values payload embedded in the application descriptor.
pub fn build_values(cfg: &ResolvedConfig) -> Value {
    let mut values = json!({
        "controlPlane": control_plane(cfg),
        "integrations": {
            "externalSecrets": {
                "enabled": true,
                "sync": {
                    "fromHost": {
                        "clusterStores": {
                            "enabled": true,
                            "selector": {"matchLabels": cfg.store_selector}
                        }
                    }
                }
            },
            "certManager": {
                "enabled": true,
                "sync": {
                    "fromHost": {
                        "clusterIssuers": {
                            "enabled": true,
                            "selector": {"labels": cfg.issuer_selector}
                        }
                    }
                }
            },
            "metricsServer": {"enabled": true}
        },
        "networking": {
            "advanced": {"clusterDomain": cfg.cluster_domain}
        },
        "sync": {
            "toHost": {
                "pods": {"enabled": true},
                "persistentVolumes": {"enabled": true},
                "ingresses": {"enabled": true}
            },
            "fromHost": {
                "storageClasses": {"enabled": true},
                "ingressClasses": {"enabled": true}
            }
        },
        "rbac": {
            "clusterRole": {
                "enabled": true,
                "extraRules": [{
                    "apiGroups": [""],
                    "resources": ["secrets"],
                    "resourceNames": [cfg.token_secret],
                    "verbs": ["get", "list", "watch"]
                }]
            }
        },
        "telemetry": {"enabled": false},
        "logging": {"encoding": "json"}
    });

    if let Some(exposure) = &cfg.exposure {
        values["exportKubeConfig"] = json!({"server": exposure.external_server_url});
    }

    values
}

fn control_plane(cfg: &ResolvedConfig) -> Value {
    let mut volume_claim = json!({
        "enabled": cfg.persistence_enabled,
        "size": cfg.persistence_size
    });
    if let Some(class) = &cfg.storage_class {
        volume_claim["storageClass"] = json!(class);
    }

    let api_port = cfg
        .exposure
        .as_ref()
        .map(|e| e.api_port)
        .unwrap_or(DEFAULT_API_PORT);
    let mut ports = vec![json!({
        "name": "https",
        "port": api_port,
        "targetPort": 8443,
        "protocol": "TCP"
    })];
    if api_port != DEFAULT_API_PORT {
        // Keep 443 reachable inside the host cluster when the external port
        // moves.
        ports.push(json!({
            "name": "https-internal",
            "port": DEFAULT_API_PORT,
            "targetPort": 8443,
            "protocol": "TCP"
        }));
    }

    let mut service = json!({
        "enabled": true,
        "spec": {
            "type": "LoadBalancer",
            "ports": ports
        }
    });
    if let Some(exposure) = &cfg.exposure {
        service["annotations"] =
            json!({"external-dns.alpha.kubernetes.io/hostname": exposure.hostname});
        service["spec"]["loadBalancerIP"] = json!(exposure.vip);
    }

    let mut control_plane = json!({
        "distro": {
            "k8s": {"enabled": true, "version": cfg.kubernetes_version}
        },
        "statefulSet": {
            "highAvailability": {"replicas": cfg.replicas},
            "scheduling": {"podManagementPolicy": "Parallel"},
            "persistence": {"volumeClaim": volume_claim},
            "resources": {
                "requests": {"cpu": cfg.cpu_request, "memory": cfg.memory_request},
                "limits": {"cpu": cfg.cpu_limit, "memory": cfg.memory_limit}
            }
        },
        "coredns": {
            "enabled": true,
            "deployment": {"replicas": cfg.coredns_replicas}
        },
        "service": service,
        "ingress": {"enabled": false}
    });

    if let Some(exposure) = &cfg.exposure {
        control_plane["proxy"] = json!({"extraSANs": exposure.extra_sans});
    }

    control_plane
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::PresetTable;
    use crate::resolve::resolve;
    use serde_json::json;
    use trellis_common::crd::TenantClusterSpec;

    fn config(value: serde_json::Value) -> ResolvedConfig {
        let spec: TenantClusterSpec = serde_json::from_value(value).unwrap();
        resolve(&spec, "platform-requests", &PresetTable::builtin()).unwrap()
    }

    #[test]
    fn values_carry_resolved_sizing() {
        let values = build_values(&config(json!({"name": "team-a", "preset": "prod"})));
        let sts = &values["controlPlane"]["statefulSet"];
        assert_eq!(sts["highAvailability"]["replicas"], 3);
        assert_eq!(sts["resources"]["requests"]["cpu"], "500m");
        assert_eq!(sts["persistence"]["volumeClaim"]["enabled"], true);
        assert_eq!(sts["persistence"]["volumeClaim"]["size"], "10Gi");
        assert!(sts["persistence"]["volumeClaim"].get("storageClass").is_none());
        assert_eq!(values["controlPlane"]["coredns"]["deployment"]["replicas"], 2);
    }

    #[test]
    fn exposure_shapes_the_service_and_sans() {
        let values = build_values(&config(json!({
            "name": "team-a",
            "exposure": {"hostname": "team-a.example.com", "subnet": "10.0.4.0/24", "apiPort": 8443}
        })));
        let service = &values["controlPlane"]["service"];
        assert_eq!(service["spec"]["loadBalancerIP"], "10.0.4.100");
        assert_eq!(
            service["annotations"]["external-dns.alpha.kubernetes.io/hostname"],
            "team-a.example.com"
        );
        let ports = service["spec"]["ports"].as_array().unwrap();
        assert_eq!(ports.len(), 2);
        assert_eq!(ports[0]["port"], 8443);
        assert_eq!(ports[1]["name"], "https-internal");
        assert_eq!(
            values["controlPlane"]["proxy"]["extraSANs"],
            json!(["team-a.example.com", "10.0.4.100"])
        );
        assert_eq!(
            values["exportKubeConfig"]["server"],
            "https://team-a.example.com:8443"
        );
    }

    #[test]
    fn no_exposure_emits_no_network_block() {
        let values = build_values(&config(json!({"name": "team-a"})));
        let service = &values["controlPlane"]["service"];
        assert!(service["spec"].get("loadBalancerIP").is_none());
        assert!(service.get("annotations").is_none());
        assert!(values["controlPlane"].get("proxy").is_none());
        assert!(values.get("exportKubeConfig").is_none());
        let ports = service["spec"]["ports"].as_array().unwrap();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0]["port"], 443);
    }

    #[test]
    fn token_secret_is_scoped_in_rbac_rules() {
        let values = build_values(&config(json!({"name": "team-a"})));
        let rules = values["rbac"]["clusterRole"]["extraRules"].as_array().unwrap();
        assert_eq!(
            rules[0]["resourceNames"],
            json!(["vcluster-team-a-onepassword-token"])
        );
    }

    #[test]
    fn storage_class_appears_only_when_set() {
        let values = build_values(&config(json!({
            "name": "team-a",
            "persistence": {"storageClass": "fast-nvme"}
        })));
        assert_eq!(
            values["controlPlane"]["statefulSet"]["persistence"]["volumeClaim"]["storageClass"],
            "fast-nvme"
        );
    }
}

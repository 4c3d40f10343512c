//! CoreDNS overlay for the tenant cluster

use serde_json::json;

use trellis_common::document::ResourceDocument;

use crate::resolve::ResolvedConfig;

/// Corefile served to the tenant's CoreDNS deployment.
///
/// Listens on 1053 (the chart runs CoreDNS unprivileged) and forwards
/// everything outside the tenant domain to the host resolver.
fn corefile(cluster_domain: &str) -> String {
    format!(
        r#".:1053 {{
    errors
    health
    ready
    kubernetes {cluster_domain} in-addr.arpa ip6.arpa {{
        pods insecure
        fallthrough in-addr.arpa ip6.arpa
    }}
    hosts /etc/coredns/NodeHosts {{
        ttl 60
        reload 15s
        fallthrough
    }}
    prometheus :9153
    forward . /etc/resolv.conf
    cache 30
    loop
    reload
    loadbalance
}}

import /etc/coredns/custom/*.server
"#
    )
}

/// ConfigMap the tenant's CoreDNS deployment mounts.
pub fn build_coredns_configmap(cfg: &ResolvedConfig) -> ResourceDocument {
    ResourceDocument::new(
        "v1",
        "ConfigMap",
        Some(&cfg.target_namespace),
        format!("vc-{}-coredns", cfg.name),
        &cfg.name,
    )
    .with_label("app.kubernetes.io/name", "coredns")
    .with_label("app.kubernetes.io/instance", format!("vc-{}", cfg.name))
    .with_user_labels(&cfg.extra_labels, &cfg.name)
    .with_annotations(&cfg.extra_annotations)
    .with_payload(json!({
        "data": {
            "Corefile": corefile(&cfg.cluster_domain),
            "NodeHosts": ""
        }
    }))
}

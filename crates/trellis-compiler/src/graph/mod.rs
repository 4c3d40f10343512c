//! Resource graph builder
//!
//! Emits the dependency-ordered document set for a resolved request. Pure
//! function of `(ResolvedConfig, Action)`: no I/O, no clock, no randomness.
//! The delete graph is derived from the configure graph by stripping each
//! document to its identity, so the two actions cover exactly the same
//! `(kind, namespace, name)` set by construction.

mod dns;
mod gitops;
mod namespace;
mod policies;
mod secrets;
mod sync_job;

use trellis_common::crd::Action;
use trellis_common::document::EmittedDocument;

use crate::resolve::ResolvedConfig;

/// apiVersion for ExternalSecret resources
pub(crate) const EXTERNAL_SECRETS_API: &str = "external-secrets.io/v1beta1";

/// apiVersion for RBAC resources
pub(crate) const RBAC_API: &str = "rbac.authorization.k8s.io/v1";

/// Name of the host ClusterSecretStore every ExternalSecret references
pub(crate) const SECRET_STORE_NAME: &str = "onepassword-store";

/// Annotation ordering hint consumed by the convergence engine
pub(crate) const SYNC_WAVE_ANNOTATION: &str = "argocd.argoproj.io/sync-wave";

/// Build the document set for `action`.
pub fn build(cfg: &ResolvedConfig, action: Action) -> Vec<EmittedDocument> {
    let documents = build_configure(cfg);
    match action {
        Action::Configure => documents,
        Action::Delete => documents
            .into_iter()
            .map(|doc| doc.map(|d| d.into_delete_variant()))
            .collect(),
    }
}

/// The configure graph, in dependency order.
fn build_configure(cfg: &ResolvedConfig) -> Vec<EmittedDocument> {
    let mut documents = vec![
        EmittedDocument::Direct(namespace::build_namespace(cfg)),
        EmittedDocument::Direct(dns::build_coredns_configmap(cfg)),
        EmittedDocument::Direct(secrets::build_token_external_secret(cfg)),
    ];
    documents.extend(
        sync_job::build_sync_identity(cfg)
            .into_iter()
            .map(EmittedDocument::Direct),
    );
    documents.push(EmittedDocument::Direct(sync_job::build_sync_job(cfg)));
    documents.push(EmittedDocument::Direct(
        secrets::build_kubeconfig_external_secret(cfg),
    ));
    documents.push(EmittedDocument::Direct(
        secrets::build_cluster_registration_external_secret(cfg),
    ));
    documents.push(EmittedDocument::SubRequest(gitops::build_project_request(cfg)));
    documents.push(EmittedDocument::SubRequest(gitops::build_application_request(
        cfg,
    )));
    if cfg.isolation_enabled {
        documents.extend(
            policies::build_network_policies(cfg)
                .into_iter()
                .map(EmittedDocument::Direct),
        );
    }
    documents
}

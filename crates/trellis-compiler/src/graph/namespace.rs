//! Target namespace for the tenant cluster

use serde_json::json;

use trellis_common::document::ResourceDocument;

use super::SYNC_WAVE_ANNOTATION;
use crate::resolve::ResolvedConfig;

/// The namespace everything tenant-scoped lands in. Applied first
/// (sync-wave -2) so namespaced documents have somewhere to go.
pub fn build_namespace(cfg: &ResolvedConfig) -> ResourceDocument {
    ResourceDocument::new("v1", "Namespace", None, &cfg.target_namespace, &cfg.name)
        .with_label("app.kubernetes.io/name", "tenant-namespace")
        .with_label("trellis.dev/type", "tenant-cluster")
        .with_user_labels(&cfg.extra_labels, &cfg.name)
        .with_annotation(SYNC_WAVE_ANNOTATION, "-2")
        .with_annotations(&cfg.extra_annotations)
        .with_payload(json!({}))
}

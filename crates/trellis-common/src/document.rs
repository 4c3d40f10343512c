//! Compiled resource document model
//!
//! The compiler emits identity-addressed documents rather than rendered
//! text: `(kind, namespace, name)` plus labels, annotations, and an opaque
//! payload merged into the manifest root at serialization time. Delete
//! variants of the same conceptual resource keep the identity and drop the
//! payload, so the convergence engine can prune by identity alone.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single compiled resource document
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDocument {
    /// Full apiVersion (e.g., "external-secrets.io/v1beta1")
    pub api_version: String,
    /// Resource kind
    pub kind: String,
    /// Namespace; `None` for cluster-scoped resources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Resource name
    pub name: String,
    /// Labels; always includes the management triple
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    /// Body of the manifest below `metadata` (e.g., `{"spec": ...}` or
    /// `{"data": ...}`); `Value::Null` on delete variants
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
}

/// The `(kind, namespace, name)` identity of a document
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentIdentity {
    /// Resource kind
    pub kind: String,
    /// Namespace; `None` for cluster-scoped resources
    pub namespace: Option<String>,
    /// Resource name
    pub name: String,
}

impl std::fmt::Display for DocumentIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}/{}", self.kind, ns, self.name),
            None => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}

impl ResourceDocument {
    /// Create a document with the management triple for `resource_name`
    /// already applied.
    pub fn new(
        api_version: impl Into<String>,
        kind: impl Into<String>,
        namespace: Option<&str>,
        name: impl Into<String>,
        resource_name: &str,
    ) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            namespace: namespace.map(|s| s.to_string()),
            name: name.into(),
            labels: management_labels(resource_name),
            annotations: BTreeMap::new(),
            payload: Value::Null,
        }
    }

    /// Merge computed labels under the existing set.
    ///
    /// Existing entries (the management triple, or labels applied earlier)
    /// are not overwritten.
    pub fn with_labels(mut self, labels: BTreeMap<String, String>) -> Self {
        for (k, v) in labels {
            self.labels.entry(k).or_insert(v);
        }
        self
    }

    /// Add a single computed label unless already present.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.entry(key.into()).or_insert(value.into());
        self
    }

    /// Overlay user-supplied labels.
    ///
    /// User values replace computed defaults; the management triple is
    /// reasserted afterwards and can never be overridden.
    pub fn with_user_labels(
        mut self,
        user: &BTreeMap<String, String>,
        resource_name: &str,
    ) -> Self {
        for (k, v) in user {
            self.labels.insert(k.clone(), v.clone());
        }
        for (k, v) in management_labels(resource_name) {
            self.labels.insert(k, v);
        }
        self
    }

    /// Add an annotation.
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Merge annotations, keeping existing entries on key collision.
    pub fn with_annotations(mut self, annotations: &BTreeMap<String, String>) -> Self {
        for (k, v) in annotations {
            self.annotations.entry(k.clone()).or_insert(v.clone());
        }
        self
    }

    /// Set the manifest body below `metadata`.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// The `(kind, namespace, name)` identity of this document.
    pub fn identity(&self) -> DocumentIdentity {
        DocumentIdentity {
            kind: self.kind.clone(),
            namespace: self.namespace.clone(),
            name: self.name.clone(),
        }
    }

    /// The identity-only delete variant of this document: same
    /// `(kind, namespace, name)` and management labels, null payload, no
    /// annotations.
    pub fn into_delete_variant(mut self) -> Self {
        self.payload = Value::Null;
        self.annotations.clear();
        self
    }

    /// Render the document as a Kubernetes manifest value.
    ///
    /// Payload keys are merged into the manifest root next to `apiVersion`,
    /// `kind`, and `metadata`; a null payload renders identity-only.
    pub fn to_manifest(&self) -> Value {
        let mut metadata = serde_json::Map::new();
        metadata.insert("name".into(), Value::String(self.name.clone()));
        if let Some(ns) = &self.namespace {
            metadata.insert("namespace".into(), Value::String(ns.clone()));
        }
        if !self.labels.is_empty() {
            metadata.insert(
                "labels".into(),
                serde_json::to_value(&self.labels).unwrap_or(Value::Null),
            );
        }
        if !self.annotations.is_empty() {
            metadata.insert(
                "annotations".into(),
                serde_json::to_value(&self.annotations).unwrap_or(Value::Null),
            );
        }

        let mut root = serde_json::Map::new();
        root.insert("apiVersion".into(), Value::String(self.api_version.clone()));
        root.insert("kind".into(), Value::String(self.kind.clone()));
        root.insert("metadata".into(), Value::Object(metadata));

        if let Value::Object(body) = &self.payload {
            for (k, v) in body {
                root.insert(k.clone(), v.clone());
            }
        }

        Value::Object(root)
    }
}

/// A compiled document, tagged by how the execution engine consumes it
///
/// Direct documents are applied to the target systems as-is. Sub-requests
/// are fully-formed declarative requests for composed sub-features: the
/// engine compiles them recursively instead of this builder inlining the
/// sub-feature's resource logic.
#[derive(Clone, Debug, PartialEq)]
pub enum EmittedDocument {
    /// Applied directly by the convergence engine
    Direct(ResourceDocument),
    /// Compiled recursively by the execution engine
    SubRequest(ResourceDocument),
}

impl EmittedDocument {
    /// The underlying document.
    pub fn document(&self) -> &ResourceDocument {
        match self {
            Self::Direct(doc) | Self::SubRequest(doc) => doc,
        }
    }

    /// True for sub-request documents.
    pub fn is_sub_request(&self) -> bool {
        matches!(self, Self::SubRequest(_))
    }

    /// Map the underlying document, preserving the tag.
    pub fn map(self, f: impl FnOnce(ResourceDocument) -> ResourceDocument) -> Self {
        match self {
            Self::Direct(doc) => Self::Direct(f(doc)),
            Self::SubRequest(doc) => Self::SubRequest(f(doc)),
        }
    }
}

/// The fixed management label triple for `resource_name`.
///
/// Present on every emitted document so the convergence engine can
/// garbage-collect by selector.
pub fn management_labels(resource_name: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(
        crate::LABEL_MANAGED_BY.to_string(),
        crate::LABEL_MANAGED_BY_TRELLIS.to_string(),
    );
    labels.insert(
        crate::LABEL_FEATURE.to_string(),
        crate::FEATURE_TENANT_CLUSTER.to_string(),
    );
    labels.insert(
        crate::LABEL_RESOURCE_NAME.to_string(),
        resource_name.to_string(),
    );
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_document_carries_management_triple() {
        let doc = ResourceDocument::new("v1", "ConfigMap", Some("team-a"), "vc-team-a-coredns", "team-a");
        assert_eq!(doc.labels.get(crate::LABEL_MANAGED_BY).unwrap(), "trellis");
        assert_eq!(
            doc.labels.get(crate::LABEL_FEATURE).unwrap(),
            crate::FEATURE_TENANT_CLUSTER
        );
        assert_eq!(doc.labels.get(crate::LABEL_RESOURCE_NAME).unwrap(), "team-a");
    }

    #[test]
    fn user_labels_win_over_computed_but_never_the_triple() {
        let mut user = BTreeMap::new();
        user.insert("app.kubernetes.io/name".to_string(), "custom".to_string());
        user.insert(crate::LABEL_MANAGED_BY.to_string(), "someone-else".to_string());

        let doc = ResourceDocument::new("v1", "ConfigMap", Some("ns"), "cm", "team-a")
            .with_label("app.kubernetes.io/name", "computed")
            .with_user_labels(&user, "team-a");

        assert_eq!(doc.labels.get("app.kubernetes.io/name").unwrap(), "custom");
        assert_eq!(doc.labels.get(crate::LABEL_MANAGED_BY).unwrap(), "trellis");
    }

    #[test]
    fn delete_variant_keeps_identity_drops_payload() {
        let doc = ResourceDocument::new("batch/v1", "Job", Some("team-a"), "team-a-kubeconfig-sync", "team-a")
            .with_annotation("argocd.argoproj.io/sync-wave", "0")
            .with_payload(serde_json::json!({"spec": {"backoffLimit": 3}}));

        let deleted = doc.clone().into_delete_variant();
        assert_eq!(deleted.identity(), doc.identity());
        assert!(deleted.payload.is_null());
        assert!(deleted.annotations.is_empty());
        assert_eq!(
            deleted.labels.get(crate::LABEL_RESOURCE_NAME).unwrap(),
            "team-a"
        );
    }

    #[test]
    fn manifest_merges_payload_into_root() {
        let doc = ResourceDocument::new("v1", "ConfigMap", Some("ns"), "cm", "team-a")
            .with_payload(serde_json::json!({"data": {"Corefile": "..."}}));
        let manifest = doc.to_manifest();
        assert_eq!(manifest["apiVersion"], "v1");
        assert_eq!(manifest["kind"], "ConfigMap");
        assert_eq!(manifest["metadata"]["name"], "cm");
        assert_eq!(manifest["metadata"]["namespace"], "ns");
        assert_eq!(manifest["data"]["Corefile"], "...");
    }

    #[test]
    fn delete_manifest_is_identity_only() {
        let doc = ResourceDocument::new("v1", "Namespace", None, "team-a", "team-a")
            .with_payload(serde_json::json!({"spec": {}}))
            .into_delete_variant();
        let manifest = doc.to_manifest();
        assert!(manifest.get("spec").is_none());
        assert!(manifest["metadata"].get("namespace").is_none());
        assert_eq!(manifest["metadata"]["name"], "team-a");
    }

    #[test]
    fn emitted_document_tags() {
        let doc = ResourceDocument::new("v1", "Namespace", None, "team-a", "team-a");
        let direct = EmittedDocument::Direct(doc.clone());
        let sub = EmittedDocument::SubRequest(doc);
        assert!(!direct.is_sub_request());
        assert!(sub.is_sub_request());
        assert_eq!(direct.document().kind, "Namespace");
    }
}

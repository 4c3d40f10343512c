//! Document serialization at the boundary
//!
//! Documents stay structured until this point. Each one is written to its
//! own YAML file whose name is a pure function of `(kind, name)`, so a
//! re-compile overwrites exactly the files it produced last time and the
//! state-store diff is the semantic diff.

use std::fs;
use std::path::{Path, PathBuf};

use trellis_common::crd::TenantClusterStatus;
use trellis_common::document::EmittedDocument;
use trellis_common::{Error, Result};

/// File name for the status snippet
pub const STATUS_FILE: &str = "status.yaml";

/// Deterministic file name for a document: `{kind}-{name}.yaml`, prefixed
/// `subrequest-` for sub-requests.
pub fn document_file_name(doc: &EmittedDocument) -> String {
    let inner = doc.document();
    let stem = format!("{}-{}", inner.kind.to_ascii_lowercase(), inner.name);
    if doc.is_sub_request() {
        format!("subrequest-{stem}.yaml")
    } else {
        format!("{stem}.yaml")
    }
}

/// Serialize every document into `dir`, returning the written paths in
/// emission order.
pub fn write_documents(dir: &Path, documents: &[EmittedDocument]) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|e| {
        Error::internal_with_context("output", format!("failed to create {}: {}", dir.display(), e))
    })?;

    let mut paths = Vec::with_capacity(documents.len());
    for doc in documents {
        let path = dir.join(document_file_name(doc));
        let yaml = serde_yaml::to_string(&doc.document().to_manifest())
            .map_err(|e| Error::serialization(format!("{}: {}", doc.document().kind, e)))?;
        fs::write(&path, yaml).map_err(|e| {
            Error::internal_with_context(
                "output",
                format!("failed to write {}: {}", path.display(), e),
            )
        })?;
        tracing::debug!(path = %path.display(), "wrote document");
        paths.push(path);
    }
    Ok(paths)
}

/// Write the status snippet the execution engine patches back onto the
/// request.
pub fn write_status(dir: &Path, status: &TenantClusterStatus) -> Result<PathBuf> {
    let path = dir.join(STATUS_FILE);
    let yaml = serde_yaml::to_string(status)
        .map_err(|e| Error::serialization(format!("status: {e}")))?;
    fs::write(&path, yaml).map_err(|e| {
        Error::internal_with_context(
            "output",
            format!("failed to write {}: {}", path.display(), e),
        )
    })?;
    Ok(path)
}

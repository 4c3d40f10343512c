//! Common types for Trellis: the TenantCluster CRD, the compiled resource
//! document model, errors, and small Kubernetes utilities shared by the
//! compiler and the CLI.

pub mod crd;
pub mod document;
pub mod error;
pub mod kube_utils;
pub mod netutil;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// API group for Trellis platform resources
pub const PLATFORM_GROUP: &str = "platform.trellis.dev";

/// API version for Trellis platform resources
pub const PLATFORM_VERSION: &str = "v1alpha1";

/// Full apiVersion string for Trellis platform resources
pub const PLATFORM_API_VERSION: &str = "platform.trellis.dev/v1alpha1";

/// Label key identifying the manager of a compiled resource
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Value of [`LABEL_MANAGED_BY`] on every document Trellis emits
pub const LABEL_MANAGED_BY_TRELLIS: &str = "trellis";

/// Label key carrying the feature that produced a document
pub const LABEL_FEATURE: &str = "trellis.dev/feature";

/// Feature name for documents produced by the tenant-cluster compiler
pub const FEATURE_TENANT_CLUSTER: &str = "tenant-cluster";

/// Label key carrying the logical resource name a document belongs to
pub const LABEL_RESOURCE_NAME: &str = "trellis.dev/resource-name";

/// Default namespace where TenantCluster requests are authored
pub const DEFAULT_PLATFORM_NAMESPACE: &str = "platform-requests";

/// Default namespace where the GitOps engine keeps its descriptors
pub const DEFAULT_GITOPS_NAMESPACE: &str = "argocd";

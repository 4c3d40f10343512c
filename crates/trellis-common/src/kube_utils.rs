//! Shared Kubernetes utilities using kube-rs
//!
//! The read-only subset needed here: building `ApiResource` values for
//! dynamic access to custom objects, and extracting nested fields from
//! their JSON representation.

use kube::discovery::ApiResource;
use serde_json::Value;

/// Trait for types that have a known API group, version, and kind.
///
/// Implement this for CRD-backed types to derive their `ApiResource` from
/// internal constants, ensuring consistency between serialization and API
/// calls.
pub trait HasApiResource {
    /// Full API version (e.g., "argoproj.io/v1alpha1", "v1")
    const API_VERSION: &'static str;
    /// Resource kind (e.g., "Application")
    const KIND: &'static str;

    /// Build an ApiResource from the type's constants.
    fn api_resource() -> ApiResource {
        build_api_resource(Self::API_VERSION, Self::KIND)
    }
}

/// Build an ApiResource from a known apiVersion and kind.
///
/// The version you provide is used exactly; callers that need the server's
/// storage version should discover it instead.
pub fn build_api_resource(api_version: &str, kind: &str) -> ApiResource {
    let (group, version) = parse_api_version(api_version);
    ApiResource {
        group,
        version,
        kind: kind.to_string(),
        api_version: api_version.to_string(),
        plural: pluralize_kind(kind),
    }
}

/// Parse apiVersion into (group, version)
///
/// `"apps/v1"` parses to `("apps", "v1")`; a core-group version like `"v1"`
/// parses to `("", "v1")`.
pub fn parse_api_version(api_version: &str) -> (String, String) {
    match api_version.split_once('/') {
        Some((group, version)) => (group.to_string(), version.to_string()),
        None => (String::new(), api_version.to_string()),
    }
}

/// Pluralize a Kubernetes resource kind using the standard rules.
pub fn pluralize_kind(kind: &str) -> String {
    let lower = kind.to_lowercase();
    if lower.ends_with('s') || lower.ends_with("ch") || lower.ends_with("sh") {
        format!("{}es", lower)
    } else if lower.ends_with('y') && !lower.ends_with("ay") && !lower.ends_with("ey") {
        format!("{}ies", &lower[..lower.len() - 1])
    } else {
        format!("{}s", lower)
    }
}

/// Extract a nested string field from a dynamic object's JSON value.
///
/// Returns `None` when any path segment is missing or the leaf is not a
/// string — absent status fields are expected, not errors.
pub fn nested_str<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    let mut current = value;
    for segment in path {
        current = current.get(segment)?;
    }
    current.as_str()
}

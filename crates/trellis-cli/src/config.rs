//! Trellis CLI configuration stored at `~/.trellis/`.
//!
//! Persistent settings for the platform this CLI talks to:
//! - `~/.trellis/config.json` — platform/gitops namespaces, default cluster
//!
//! Every field can be overridden by a `TRELLIS_*` environment variable.
//! The kubeconfig resolution chain (highest priority first):
//! 1. Explicit `--kubeconfig` flag
//! 2. `TRELLIS_KUBECONFIG` environment variable
//! 3. `kubeconfig` from the config file
//! 4. Fall back to kube defaults (`KUBECONFIG` env / `~/.kube/config`)

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const CONFIG_DIR_NAME: &str = ".trellis";
const CONFIG_FILE_NAME: &str = "config.json";
const TRELLIS_KUBECONFIG_ENV: &str = "TRELLIS_KUBECONFIG";
const PLATFORM_NAMESPACE_ENV: &str = "TRELLIS_PLATFORM_NAMESPACE";
const GITOPS_NAMESPACE_ENV: &str = "TRELLIS_GITOPS_NAMESPACE";
const DEFAULT_CLUSTER_ENV: &str = "TRELLIS_DEFAULT_CLUSTER";

/// Persistent CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrellisConfig {
    /// Namespace TenantCluster requests are authored in.
    pub platform_namespace: String,
    /// Namespace the GitOps engine keeps its application descriptors in.
    pub gitops_namespace: String,
    /// Default cluster name, used as a name-prefix fallback when tracing.
    pub default_cluster: Option<String>,
    /// Path to the kubeconfig used for platform queries.
    pub kubeconfig: Option<String>,
}

impl Default for TrellisConfig {
    fn default() -> Self {
        Self {
            platform_namespace: trellis_common::DEFAULT_PLATFORM_NAMESPACE.to_string(),
            gitops_namespace: trellis_common::DEFAULT_GITOPS_NAMESPACE.to_string(),
            default_cluster: None,
            kubeconfig: None,
        }
    }
}

/// Path to `~/.trellis/config.json`.
pub fn config_path() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| Error::command_failed("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load config from `~/.trellis/config.json` (default when missing), then
/// apply environment overrides.
pub fn load_config() -> Result<TrellisConfig> {
    let path = config_path()?;
    let mut config = if path.exists() {
        let data = std::fs::read_to_string(&path).map_err(|e| {
            Error::command_failed(format!("failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&data).map_err(|e| {
            Error::command_failed(format!("failed to parse {}: {}", path.display(), e))
        })?
    } else {
        TrellisConfig::default()
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

fn apply_env_overrides(config: &mut TrellisConfig) {
    if let Ok(ns) = std::env::var(PLATFORM_NAMESPACE_ENV) {
        if !ns.is_empty() {
            config.platform_namespace = ns;
        }
    }
    if let Ok(ns) = std::env::var(GITOPS_NAMESPACE_ENV) {
        if !ns.is_empty() {
            config.gitops_namespace = ns;
        }
    }
    if let Ok(cluster) = std::env::var(DEFAULT_CLUSTER_ENV) {
        if !cluster.is_empty() {
            config.default_cluster = Some(cluster);
        }
    }
}

/// Resolve a kubeconfig path using the priority chain.
///
/// Returns `Some(path)` if a kubeconfig is configured, `None` to use kube
/// defaults.
pub fn resolve_kubeconfig(explicit: Option<&str>, config: &TrellisConfig) -> Option<String> {
    if let Some(path) = explicit {
        return Some(path.to_string());
    }
    if let Ok(path) = std::env::var(TRELLIS_KUBECONFIG_ENV) {
        if !path.is_empty() {
            return Some(path);
        }
    }
    config.kubeconfig.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_platform_conventions() {
        let config = TrellisConfig::default();
        assert_eq!(config.platform_namespace, "platform-requests");
        assert_eq!(config.gitops_namespace, "argocd");
        assert!(config.default_cluster.is_none());
    }

    #[test]
    fn partial_config_files_fall_back_to_defaults() {
        let config: TrellisConfig =
            serde_json::from_str(r#"{"defaultCluster": "host"}"#).unwrap();
        assert_eq!(config.platform_namespace, "platform-requests");
        assert_eq!(config.default_cluster.as_deref(), Some("host"));
    }

    #[test]
    fn explicit_kubeconfig_wins() {
        let config = TrellisConfig {
            kubeconfig: Some("/from/config".to_string()),
            ..Default::default()
        };
        assert_eq!(
            resolve_kubeconfig(Some("/from/flag"), &config).as_deref(),
            Some("/from/flag")
        );
    }
}

//! Read-only platform client abstraction
//!
//! The tracer talks to its status sources through this narrow trait so the
//! orchestration is testable without a cluster. The real implementation
//! wraps a kube client: typed APIs for TenantCluster and Pod, dynamic
//! access for the GitOps application descriptors.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, DynamicObject, ListParams};
use kube::Client;
use serde_json::Value;

use trellis_common::crd::TenantCluster;
use trellis_common::kube_utils::build_api_resource;

use crate::Result;

/// apiVersion of the GitOps application descriptor
pub const APPLICATION_API_VERSION: &str = "argoproj.io/v1alpha1";

/// Simplified pod view for the runtime probe
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PodSummary {
    /// Pod name
    pub name: String,
    /// Pod phase (Running, Pending, ...)
    pub phase: String,
    /// Containers currently ready
    pub ready_containers: usize,
    /// Containers defined on the pod
    pub total_containers: usize,
}

impl PodSummary {
    /// Running with every container ready.
    pub fn is_ready(&self) -> bool {
        self.phase == "Running" && self.ready_containers == self.total_containers
    }
}

/// Read-only access to the platform's status sources.
#[async_trait]
pub trait PlatformReader: Send + Sync {
    /// Fetch a TenantCluster request by name.
    async fn get_request(&self, namespace: &str, name: &str) -> Result<Option<TenantCluster>>;

    /// Fetch a GitOps application descriptor by name.
    async fn get_application(&self, namespace: &str, name: &str) -> Result<Option<Value>>;

    /// List every application descriptor in a namespace.
    async fn list_applications(&self, namespace: &str) -> Result<Vec<Value>>;

    /// List pods, optionally filtered by label selector.
    async fn list_pods(&self, namespace: &str, label_selector: Option<&str>)
        -> Result<Vec<PodSummary>>;
}

/// [`PlatformReader`] over a live cluster.
pub struct KubeReader {
    client: Client,
}

impl KubeReader {
    /// Wrap a kube client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn applications(&self, namespace: &str) -> Api<DynamicObject> {
        let ar = build_api_resource(APPLICATION_API_VERSION, "Application");
        Api::namespaced_with(self.client.clone(), namespace, &ar)
    }
}

#[async_trait]
impl PlatformReader for KubeReader {
    async fn get_request(&self, namespace: &str, name: &str) -> Result<Option<TenantCluster>> {
        let api: Api<TenantCluster> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn get_application(&self, namespace: &str, name: &str) -> Result<Option<Value>> {
        match self.applications(namespace).get_opt(name).await? {
            Some(obj) => Ok(Some(serde_json::to_value(&obj)?)),
            None => Ok(None),
        }
    }

    async fn list_applications(&self, namespace: &str) -> Result<Vec<Value>> {
        let list = self
            .applications(namespace)
            .list(&ListParams::default())
            .await?;
        list.items
            .iter()
            .map(|obj| Ok(serde_json::to_value(obj)?))
            .collect()
    }

    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: Option<&str>,
    ) -> Result<Vec<PodSummary>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let mut params = ListParams::default();
        if let Some(selector) = label_selector {
            params = params.labels(selector);
        }
        let pods = api.list(&params).await?;

        Ok(pods
            .items
            .into_iter()
            .map(|pod| {
                let phase = pod
                    .status
                    .as_ref()
                    .and_then(|s| s.phase.clone())
                    .unwrap_or_default();
                let ready_containers = pod
                    .status
                    .as_ref()
                    .and_then(|s| s.container_statuses.as_ref())
                    .map(|statuses| statuses.iter().filter(|c| c.ready).count())
                    .unwrap_or(0);
                let total_containers = pod
                    .spec
                    .as_ref()
                    .map(|s| s.containers.len())
                    .unwrap_or(0);
                PodSummary {
                    name: pod.metadata.name.unwrap_or_default(),
                    phase,
                    ready_containers,
                    total_containers,
                }
            })
            .collect())
    }
}

//! Custom Resource Definitions for Trellis

mod tenant_cluster;
mod types;

pub use tenant_cluster::{TenantCluster, TenantClusterSpec, TenantClusterStatus};
pub use types::{
    Action, ApplicationSourceSpec, ArgoCdIntegration, CertManagerIntegration, Condition,
    ConditionStatus, CorednsSpec, ExposureSpec, ExternalSecretsIntegration, IntegrationsSpec,
    IsolationSpec, PersistenceSpec, Preset, RequestPhase, ResourceValues, ResourcesSpec,
};

//! Trace hop model
//!
//! One hop per status source, in the fixed order the tracer visits them.
//! Statuses stay free text (each source keeps its own vocabulary) but are
//! classifiable by substring into the four classes that drive colorization
//! and the exit code.

use serde::Serialize;

/// A stage in the lifecycle chain, in visiting order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TraceStage {
    /// The TenantCluster request record itself
    #[serde(rename = "ResourceRequest")]
    RequestRecord,
    /// Pipeline execution, derived from the request's conditions
    Pipeline,
    /// The ArgoCD application descriptor for the tenant cluster
    #[serde(rename = "ArgoCD")]
    Application,
    /// Applications deployed into the tenant cluster
    SubApplications,
    /// Running pods in the tenant namespace
    Runtime,
}

impl std::fmt::Display for TraceStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RequestRecord => write!(f, "ResourceRequest"),
            Self::Pipeline => write!(f, "Pipeline"),
            Self::Application => write!(f, "ArgoCD"),
            Self::SubApplications => write!(f, "SubApplications"),
            Self::Runtime => write!(f, "Runtime"),
        }
    }
}

/// One stage's normalized status
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TraceHop {
    /// Which stage this hop reports on
    pub stage: TraceStage,
    /// The source's status, normalized but free text
    pub status: String,
    /// Optional context line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl TraceHop {
    /// Create a hop with no detail.
    pub fn new(stage: TraceStage, status: impl Into<String>) -> Self {
        Self {
            stage,
            status: status.into(),
            detail: None,
        }
    }

    /// Attach a detail line.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Classify this hop's status.
    pub fn class(&self) -> StatusClass {
        StatusClass::classify(&self.status)
    }
}

/// Coarse classification of a hop status
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusClass {
    /// The source reports healthy/complete
    Ok,
    /// The source is still converging
    InProgress,
    /// The source is missing, failed, or degraded
    NotFound,
    /// The source exists but reports nothing usable
    Unknown,
}

impl StatusClass {
    /// Substring classification of a free-text status.
    pub fn classify(status: &str) -> Self {
        let status = status.to_lowercase();
        if status.contains("notfound")
            || status.contains("not found")
            || status.contains("failed")
            || status.contains("degraded")
            || status.contains("error")
        {
            Self::NotFound
        } else if status.contains("progress")
            || status.contains("outofsync")
            || status.contains("pending")
            || status.contains("scheduled")
            || status.contains("deleting")
        {
            Self::InProgress
        } else if status.contains("unknown") || status.is_empty() {
            Self::Unknown
        } else {
            Self::Ok
        }
    }
}

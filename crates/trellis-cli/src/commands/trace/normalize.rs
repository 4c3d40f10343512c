//! Per-source status normalizers
//!
//! Each external system keeps its own status shape; one small function per
//! system maps it into a [`TraceHop`]. Adding a source never changes the
//! tracer's orchestration.

use serde_json::Value;

use trellis_common::crd::{ConditionStatus, TenantCluster};
use trellis_common::kube_utils::nested_str;

use super::hops::{TraceHop, TraceStage};
use super::reader::PodSummary;

/// Hop 1: the request record's self-reported phase.
pub fn request_hop(
    name: &str,
    platform_namespace: &str,
    request: Option<&TenantCluster>,
) -> TraceHop {
    match request {
        Some(request) => {
            let phase = request
                .status
                .as_ref()
                .map(|s| s.phase.to_string())
                .unwrap_or_else(|| "Unknown".to_string());
            TraceHop::new(TraceStage::RequestRecord, phase).with_detail(format!(
                "{} TenantCluster in {}",
                trellis_common::PLATFORM_API_VERSION,
                platform_namespace
            ))
        }
        None => TraceHop::new(TraceStage::RequestRecord, "NotFound").with_detail(format!(
            "no TenantCluster {name:?} in {platform_namespace}, checking ArgoCD directly"
        )),
    }
}

/// Hop 2: pipeline execution, derived from the request's condition list.
pub fn pipeline_hop(request: Option<&TenantCluster>) -> TraceHop {
    let Some(request) = request else {
        return TraceHop::new(TraceStage::Pipeline, "Unknown")
            .with_detail("no request record to derive pipeline state from");
    };

    let conditions = request
        .status
        .as_ref()
        .map(|s| s.conditions.as_slice())
        .unwrap_or_default();

    let status = if conditions.is_empty() {
        "Unknown"
    } else if conditions
        .iter()
        .all(|c| c.status == ConditionStatus::True)
    {
        "Completed"
    } else {
        "InProgress"
    };

    let mut hop = TraceHop::new(TraceStage::Pipeline, status);
    if let Some(message) = request.status.as_ref().and_then(|s| s.message.as_deref()) {
        hop = hop.with_detail(message);
    }
    hop
}

/// Hop 3: the application descriptor's sync/health pair.
///
/// `resolved_name` is the name the descriptor was actually found under
/// (possibly a prefix fallback); it is surfaced when it differs from the
/// logical name.
pub fn application_hop(
    name: &str,
    application: Option<&Value>,
    resolved_name: Option<&str>,
) -> TraceHop {
    let Some(application) = application else {
        return TraceHop::new(TraceStage::Application, "NotFound")
            .with_detail("no ArgoCD Application found");
    };

    let sync = nested_str(application, &["status", "sync", "status"]).unwrap_or("Unknown");
    let health = nested_str(application, &["status", "health", "status"]).unwrap_or("Unknown");

    let mut details = Vec::new();
    if let Some(revision) = nested_str(application, &["status", "sync", "revision"]) {
        let short: String = revision.chars().take(7).collect();
        details.push(format!("revision={short}"));
    }
    if let Some(resolved) = resolved_name.filter(|r| *r != name) {
        details.push(format!("as {resolved}"));
    }

    let mut hop = TraceHop::new(TraceStage::Application, format!("{sync}/{health}"));
    if !details.is_empty() {
        hop = hop.with_detail(details.join(" "));
    }
    hop
}

/// Hop 4: aggregate sync/health counts over the descriptor's children.
pub fn sub_applications_hop(children: &[Value]) -> TraceHop {
    let total = children.len();
    let synced = children
        .iter()
        .filter(|app| nested_str(app, &["status", "sync", "status"]) == Some("Synced"))
        .count();
    let healthy = children
        .iter()
        .filter(|app| nested_str(app, &["status", "health", "status"]) == Some("Healthy"))
        .count();

    TraceHop::new(
        TraceStage::SubApplications,
        format!("{synced}/{total} synced, {healthy}/{total} healthy"),
    )
    .with_detail(format!("{total} total sub-apps"))
}

/// Hop 5: ready-instance count over the tenant namespace's pods.
pub fn runtime_hop(namespace: &str, pods: &[PodSummary]) -> TraceHop {
    if pods.is_empty() {
        return TraceHop::new(TraceStage::Runtime, "NotFound")
            .with_detail(format!("no pods in namespace {namespace}"));
    }
    let ready = pods.iter().filter(|p| p.is_ready()).count();
    TraceHop::new(
        TraceStage::Runtime,
        format!("{ready}/{} pods ready", pods.len()),
    )
}

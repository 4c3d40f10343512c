//! Trellis request compiler
//!
//! Turns one declarative TenantCluster request into a coherent,
//! dependency-ordered set of resource documents: layered preset defaults,
//! derived values (a virtual IP inside a subnet, deterministic secret and
//! item names), validated invariants, and symmetric identity-only teardown
//! documents on delete.
//!
//! The compiler is pure: no I/O, no clock, no randomness. Re-running it
//! with identical input yields identical output from any thread.

pub mod graph;
pub mod output;
pub mod presets;
pub mod resolve;
pub mod values;

use trellis_common::crd::{Action, RequestPhase, TenantClusterSpec, TenantClusterStatus};
use trellis_common::document::EmittedDocument;
use trellis_common::Result;

pub use presets::{PresetBaseline, PresetTable};
pub use resolve::{resolve, ResolvedConfig};

/// Everything one compile invocation produces
#[derive(Clone, Debug)]
pub struct CompileOutput {
    /// The action the documents were compiled for
    pub action: Action,
    /// Dependency-ordered documents for the execution engine
    pub documents: Vec<EmittedDocument>,
    /// Status snippet the engine writes back to the request
    pub status: TenantClusterStatus,
}

/// Compile a request into its resource documents.
///
/// `action_override` takes precedence over the action carried in the
/// request itself (the CLI `--action` flag). Validation failures abort the
/// whole compile; no documents are emitted.
pub fn compile(
    spec: &TenantClusterSpec,
    request_namespace: &str,
    presets: &PresetTable,
    action_override: Option<Action>,
) -> Result<CompileOutput> {
    let config = resolve::resolve(spec, request_namespace, presets)?;
    let action = action_override.unwrap_or(spec.action);
    let documents = graph::build(&config, action);

    let status = match action {
        Action::Configure => TenantClusterStatus::with_phase(
            RequestPhase::Scheduled,
            format!("tenant cluster {} scheduled for creation", config.name),
        ),
        Action::Delete => TenantClusterStatus::with_phase(
            RequestPhase::Deleting,
            format!("tenant cluster {} scheduled for deletion", config.name),
        ),
    };

    tracing::info!(
        name = %config.name,
        action = %action,
        documents = documents.len(),
        "compiled tenant cluster request"
    );

    Ok(CompileOutput {
        action,
        documents,
        status,
    })
}

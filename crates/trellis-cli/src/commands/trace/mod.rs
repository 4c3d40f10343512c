//! `trellis trace` - follow a tenant cluster through the platform lifecycle
//!
//! Visits each stage of the delivery chain and shows where the resource
//! currently stands:
//!
//! 1. TenantCluster request record
//! 2. Pipeline execution (request conditions)
//! 3. ArgoCD Application sync
//! 4. Sub-applications targeting the tenant cluster
//! 5. Runtime pods
//!
//! Partial visibility is expected: individual hops reporting not-found is
//! not an error. The command exits non-zero only when no status source
//! resolves the name at all.

mod hops;
mod normalize;
mod reader;
mod tracer;

pub use hops::{StatusClass, TraceHop, TraceStage};
pub use reader::{KubeReader, PlatformReader, PodSummary};
pub use tracer::{TraceReport, Tracer, DEFAULT_HOP_TIMEOUT_SECS};

use std::time::Duration;

use clap::{Args, ValueEnum};
use owo_colors::OwoColorize;

use crate::{commands, config, Error, Result};

/// Arguments for the trace command
#[derive(Args, Debug)]
pub struct TraceArgs {
    /// Logical name of the resource to trace
    pub name: String,

    /// Output format
    #[arg(short, long, default_value = "tree")]
    pub output: OutputFormat,

    /// Per-hop timeout in seconds
    #[arg(long, default_value_t = DEFAULT_HOP_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Path to kubeconfig file
    #[arg(long)]
    pub kubeconfig: Option<String>,
}

/// Output format
#[derive(Clone, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    /// Hop tree with colorized statuses (default)
    #[default]
    Tree,
    /// JSON object with the hop chain
    Json,
}

/// Run the trace command
pub async fn run(args: TraceArgs) -> Result<()> {
    let cli_config = config::load_config()?;
    let kubeconfig = config::resolve_kubeconfig(args.kubeconfig.as_deref(), &cli_config);
    let client = commands::create_client(kubeconfig.as_deref()).await?;
    let reader = KubeReader::new(client);

    let tracer = Tracer::new(
        &reader,
        &cli_config.platform_namespace,
        &cli_config.gitops_namespace,
        cli_config.default_cluster.as_deref(),
        Duration::from_secs(args.timeout),
    );
    let report = tracer.trace(&args.name).await;

    match args.output {
        OutputFormat::Tree => render_tree(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if !report.identity_resolved {
        return Err(Error::command_failed(format!(
            "no platform identity found for {:?}",
            args.name
        )));
    }
    Ok(())
}

/// Render the hop chain as an indented tree.
fn render_tree(report: &TraceReport) {
    println!();
    println!("  Trace: {}", report.resource.bold());
    println!();

    let last_index = report.chain.len().saturating_sub(1);
    for (i, hop) in report.chain.iter().enumerate() {
        let (connector, indent) = if i == last_index {
            ("└─", "  ")
        } else {
            ("├─", "│ ")
        };

        let icon = match hop.class() {
            StatusClass::Ok => format!("{}", "✓".green()),
            StatusClass::InProgress | StatusClass::Unknown => format!("{}", "◌".yellow()),
            StatusClass::NotFound => format!("{}", "✗".red()),
        };
        let status = match hop.class() {
            StatusClass::Ok => format!("{}", hop.status.green()),
            StatusClass::InProgress | StatusClass::Unknown => format!("{}", hop.status.yellow()),
            StatusClass::NotFound => format!("{}", hop.status.red()),
        };

        println!("  {connector} {icon} {}  {status}", hop.stage);
        if let Some(detail) = &hop.detail {
            println!("  {indent}   {}", detail.dimmed());
        }
    }
    println!();
}

//! `trellis compile` - compile a request into resource documents

use std::path::Path;

use clap::Args;
use tracing::info;

use trellis_common::crd::{Action, TenantCluster};
use trellis_compiler::{output, PresetTable};

use crate::{config, Result};

/// Arguments for the compile command
#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Path to the TenantCluster request document
    #[arg(short, long)]
    pub input: String,

    /// Directory the compiled documents are written to
    #[arg(short, long, default_value = "compiled")]
    pub output_dir: String,

    /// Override the action carried in the request (configure|delete)
    #[arg(long, value_parser = Action::parse)]
    pub action: Option<Action>,

    /// Namespace the request is authored in (defaults to the document's
    /// metadata.namespace, then the configured platform namespace)
    #[arg(short, long)]
    pub namespace: Option<String>,
}

/// Run the compile command
pub fn run(args: CompileArgs) -> Result<()> {
    let cli_config = config::load_config()?;

    let raw = std::fs::read_to_string(&args.input)?;
    let request: TenantCluster = serde_yaml::from_str(&raw)?;

    let request_namespace = args
        .namespace
        .or_else(|| request.metadata.namespace.clone())
        .unwrap_or(cli_config.platform_namespace);

    let presets = PresetTable::builtin();
    let compiled =
        trellis_compiler::compile(&request.spec, &request_namespace, &presets, args.action)?;

    let dir = Path::new(&args.output_dir);
    let paths = output::write_documents(dir, &compiled.documents)?;
    output::write_status(dir, &compiled.status)?;

    info!(
        name = %request.spec.name,
        action = %compiled.action,
        "wrote {} documents to {}",
        paths.len(),
        dir.display()
    );
    for path in &paths {
        println!("{}", path.display());
    }

    Ok(())
}

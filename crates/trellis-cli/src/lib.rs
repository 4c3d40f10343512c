//! Trellis CLI library

pub mod commands;
pub mod config;
pub mod error;

pub use error::{Error, Result};

use clap::{Parser, Subcommand};

/// Trellis - tenant virtual cluster provisioning
#[derive(Parser, Debug)]
#[command(name = "trellis")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile a TenantCluster request into resource documents
    Compile(commands::compile::CompileArgs),
    /// Trace a tenant cluster through the platform lifecycle
    Trace(commands::trace::TraceArgs),
}

impl Cli {
    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Compile(args) => commands::compile::run(args),
            Commands::Trace(args) => commands::trace::run(args).await,
        }
    }
}

//! # ifw CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ifw_cli::context::{run_context, ContextArgs};
use ifw_cli::render::{run_render, RenderArgs};
use ifw_cli::validate::{run_validate, ValidateArgs};

/// Integration framework CLI
///
/// Validates the integration catalogue: manifest schema, cross-field rules,
/// and strict rendering of every declared template.
#[derive(Parser, Debug)]
#[command(name = "ifw", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to configuration file (default: ifw.yaml at the repository root).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the catalogue or selected integrations.
    Validate(ValidateArgs),

    /// Print the rendering context for an integration.
    Context(ContextArgs),

    /// Render a declared template or the endpoint of an integration.
    Render(RenderArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("ifw CLI v{} starting", env!("CARGO_PKG_VERSION"));

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let repo_root = ifw_cli::resolve_repo_root(&cwd).unwrap_or_else(|| {
        tracing::warn!("Could not locate repository root; using current directory");
        cwd.clone()
    });

    tracing::debug!(repo_root = %repo_root.display(), "resolved repository root");

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Validate(args) => run_validate(&args, &repo_root, config),
        Commands::Context(args) => run_context(&args, &repo_root, config),
        Commands::Render(args) => run_render(&args, &repo_root, config),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}

//! # Validate Subcommand
//!
//! Runs schema validation, manifest rules and template verification against
//! the whole catalogue, or against the integrations named on the command
//! line.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use ifw_catalogue::{CatalogueReport, CatalogueValidator};

/// Arguments for the `ifw validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Integration keys to validate. Validates the whole catalogue when empty.
    #[arg(value_name = "KEY")]
    pub keys: Vec<String>,

    /// Print the report as JSON instead of text.
    #[arg(long)]
    pub json: bool,

    /// Override the number of worker threads.
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,
}

/// Execute the validate subcommand.
///
/// Returns exit code: 0 on success, 1 on validation failure.
pub fn run_validate(args: &ValidateArgs, repo_root: &Path, config: Option<&Path>) -> Result<u8> {
    let mut validator = crate::load_validator(repo_root, config)?;
    if let Some(workers) = args.workers {
        validator = validator.with_workers(workers);
    }

    let report = collect_report(&validator, &args.keys)?;

    if args.json {
        let rendered = serde_json::to_string_pretty(&report.to_json())
            .context("failed to serialize report")?;
        println!("{rendered}");
    } else {
        print_report(&report);
    }

    Ok(if report.is_success() { 0 } else { 1 })
}

fn collect_report(validator: &CatalogueValidator, keys: &[String]) -> Result<CatalogueReport> {
    if keys.is_empty() {
        return validator
            .validate_all()
            .context("failed to validate catalogue");
    }

    let mut reports = Vec::with_capacity(keys.len());
    for key in keys {
        let dir = validator.integration_dir(key);
        if !dir.is_dir() {
            anyhow::bail!("integration {key} not found at {}", dir.display());
        }
        reports.push(validator.validate_integration(&dir));
    }
    Ok(CatalogueReport::new(reports))
}

fn print_report(report: &CatalogueReport) {
    println!(
        "Integrations: {}/{} passed ({} checks)",
        report.passed(),
        report.total(),
        report.total_checks()
    );

    for failure in report.failures() {
        println!(
            "  FAIL: {}/{} — {}",
            failure.integration, failure.check, failure.error
        );
    }

    if report.failed() > 0 {
        println!(
            "\n{} integration(s) failed validation out of {} total.",
            report.failed(),
            report.total()
        );
    }
}

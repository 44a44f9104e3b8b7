//! # Context Subcommand
//!
//! Prints the rendering context a template on a given surface is rendered
//! with, or the endpoint context, as pretty JSON.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use ifw_core::{PayloadKind, TemplateSurface};
use ifw_render::{endpoint_context, is_structured_format};
use serde_json::Value;

/// Arguments for the `ifw context` subcommand.
#[derive(Args, Debug)]
pub struct ContextArgs {
    /// Integration key.
    pub key: String,

    /// Surface whose template context to print.
    #[arg(long, default_value = "flag", value_parser = crate::parse_surface)]
    pub surface: TemplateSurface,

    /// Print the endpoint URL/header context instead.
    #[arg(long, conflicts_with = "surface")]
    pub endpoint: bool,
}

/// Execute the context subcommand.
pub fn run_context(args: &ContextArgs, repo_root: &Path, config: Option<&Path>) -> Result<u8> {
    let validator = crate::load_validator(repo_root, config)?;
    let context = build_context(&validator, args)?;
    let rendered = serde_json::to_string_pretty(&context).context("failed to serialize context")?;
    println!("{rendered}");
    Ok(0)
}

pub fn build_context(
    validator: &ifw_catalogue::CatalogueValidator,
    args: &ContextArgs,
) -> Result<Value> {
    let (_, manifest) = crate::load_integration(validator, &args.key)?;
    let verifier = validator.verifier();

    if args.endpoint {
        return Ok(endpoint_context(
            &manifest,
            verifier.payloads().get(PayloadKind::Flag),
        ));
    }

    // Escaping follows the declared template's format; undeclared surfaces
    // get the unescaped context.
    let structured = manifest
        .templates()
        .and_then(|t| t.get(args.surface))
        .is_some_and(is_structured_format);
    Ok(verifier.context_for(&manifest, args.surface, structured))
}

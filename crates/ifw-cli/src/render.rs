//! # Render Subcommand
//!
//! Renders one declared template (or the endpoint URL and headers) exactly
//! as validation does, and prints the output.

use std::path::Path;

use anyhow::{anyhow, Result};
use clap::Args;
use ifw_catalogue::CatalogueValidator;
use ifw_core::{CheckError, TemplateSurface};

/// Arguments for the `ifw render` subcommand.
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Integration key.
    pub key: String,

    /// Surface whose declared template to render.
    #[arg(long, default_value = "flag", value_parser = crate::parse_surface)]
    pub surface: TemplateSurface,

    /// Render the endpoint URL and headers instead.
    #[arg(long, conflicts_with = "surface")]
    pub endpoint: bool,
}

/// Execute the render subcommand.
///
/// Returns exit code: 0 when everything rendered and checked out, 1 otherwise.
pub fn run_render(args: &RenderArgs, repo_root: &Path, config: Option<&Path>) -> Result<u8> {
    let validator = crate::load_validator(repo_root, config)?;

    if args.endpoint {
        let mut ok = true;
        for (target, rendered) in render_endpoint(&validator, &args.key)? {
            match rendered {
                Ok(value) => println!("{target}: {value}"),
                Err(e) => {
                    ok = false;
                    println!("{target}: FAIL — {e}");
                }
            }
        }
        return Ok(if ok { 0 } else { 1 });
    }

    match render_surface(&validator, &args.key, args.surface)? {
        Ok(output) => {
            println!("{output}");
            Ok(0)
        }
        Err(e) => {
            eprintln!("FAIL: {}/template:{} — {e}", args.key, args.surface);
            Ok(1)
        }
    }
}

/// Render and check the template declared for `surface`.
///
/// The outer error is operational (unknown integration, undeclared surface);
/// the inner one is the check failure.
pub fn render_surface(
    validator: &CatalogueValidator,
    key: &str,
    surface: TemplateSurface,
) -> Result<Result<String, CheckError>> {
    let (loaded, manifest) = crate::load_integration(validator, key)?;
    let path = manifest
        .templates()
        .and_then(|t| t.get(surface))
        .ok_or_else(|| anyhow!("{key} declares no {surface} template"))?
        .to_string();

    let verifier = validator.verifier();
    Ok(verifier
        .verify_template(&loaded.dir, &manifest, surface, &path)
        .and_then(|()| verifier.render_template(&loaded.dir, &manifest, surface, &path)))
}

pub fn render_endpoint(
    validator: &CatalogueValidator,
    key: &str,
) -> Result<Vec<(String, Result<String, CheckError>)>> {
    let (_, manifest) = crate::load_integration(validator, key)?;
    if manifest.endpoint().is_none() {
        anyhow::bail!("{key} declares no endpoint");
    }
    Ok(validator.verifier().render_endpoint(&manifest))
}

//! # ifw-cli — Integration Framework CLI
//!
//! Provides the `ifw` command-line interface.
//!
//! ## Subcommands
//!
//! - `ifw validate` — Validate the whole catalogue or selected integrations.
//! - `ifw context` — Print the rendering context a template would see.
//! - `ifw render` — Render one declared template, or the endpoint.
//!
//! ```bash
//! ifw validate
//! ifw validate incident-hub --json
//! ifw context work-tracker --surface default
//! ifw render incident-hub --surface validation
//! ifw render incident-hub --endpoint
//! ```
//!
//! Exit codes: 0 on success, 1 on validation failure, 2 on operational error.

pub mod context;
pub mod render;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use ifw_catalogue::{CatalogueConfig, CatalogueValidator};
use ifw_core::{load_manifest, LoadedManifest, Manifest, TemplateSurface};

/// Walk up from `start` to the first directory containing `integrations/`.
pub fn resolve_repo_root(start: &Path) -> Option<PathBuf> {
    let mut dir = start;
    loop {
        if dir.join("integrations").is_dir() {
            return Some(dir.to_path_buf());
        }
        dir = dir.parent()?;
    }
}

/// Resolve a path that may be relative to the repository root.
///
/// Absolute paths are returned as-is. A relative path is taken relative to
/// `repo_root` when it exists there, otherwise relative to the current
/// directory.
pub fn resolve_path(path: &Path, repo_root: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    let repo_relative = repo_root.join(path);
    if repo_relative.exists() {
        repo_relative
    } else {
        path.to_path_buf()
    }
}

/// Load configuration and build the validator every subcommand works with.
pub fn load_validator(repo_root: &Path, config: Option<&Path>) -> Result<CatalogueValidator> {
    let explicit = config.map(|p| resolve_path(p, repo_root));
    let config = CatalogueConfig::load(repo_root, explicit.as_deref())
        .context("failed to load catalogue configuration")?;
    tracing::debug!(?config, "effective configuration");
    CatalogueValidator::from_config(&config).context("failed to initialise catalogue validator")
}

/// Load one integration and its typed model.
pub fn load_integration(validator: &CatalogueValidator, key: &str) -> Result<(LoadedManifest, Manifest)> {
    let dir = validator.integration_dir(key);
    let loaded = load_manifest(&dir).with_context(|| format!("failed to load integration {key}"))?;
    let manifest = loaded
        .model
        .clone()
        .map_err(|reason| anyhow!("manifest for {key} could not be interpreted: {reason}"))?;
    Ok((loaded, manifest))
}

/// `clap` value parser for template surfaces.
pub fn parse_surface(name: &str) -> std::result::Result<TemplateSurface, String> {
    TemplateSurface::from_name(name).ok_or_else(|| {
        let names: Vec<_> = TemplateSurface::ALL.iter().map(|s| s.as_str()).collect();
        format!("unknown surface {name:?}; expected one of {}", names.join(", "))
    })
}

//! Operational errors: anything that stops a catalogue run from starting.
//! Per-integration check failures are [`ifw_core::CheckError`]s inside the
//! report instead.

use std::path::PathBuf;

use ifw_render::PayloadError;
use ifw_schema::SchemaValidationError;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum CatalogueError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaValidationError),

    #[error("payload error: {0}")]
    Payload(#[from] PayloadError),

    #[error("integrations directory not found: {}", .0.display())]
    IntegrationsDirNotFound(PathBuf),

    #[error("failed to list {}: {source}", .path.display())]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

//! # Error Hierarchy
//!
//! Structured error types for manifest validation, built with `thiserror`.
//!
//! [`CheckError`] is the failure of a single check against a single
//! integration. It is always reported alongside the integration key and the
//! check name and never aborts the run. [`ManifestError`] is the failure to
//! read a manifest document off disk.

use std::path::PathBuf;

use thiserror::Error;

use crate::manifest::TemplateSurface;

/// Failure of one check scoped to one integration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    /// The raw document does not conform to the manifest schema.
    #[error("{count} schema violation(s):\n{}", .details.join("\n"))]
    SchemaViolation {
        /// Number of violations found.
        count: usize,
        /// One line per violation: `<instance path>: <message>`.
        details: Vec<String>,
    },

    /// An icon or template file referenced by the manifest is absent.
    #[error("missing {what}: {}", .path.display())]
    MissingAsset {
        /// What the file was declared as (e.g. `square icon`, `flag template`).
        what: String,
        /// Resolved path that does not exist.
        path: PathBuf,
    },

    /// A declared template failed to compile or render.
    #[error("{surface} template failed to render: {reason}")]
    Render {
        /// Surface the template is declared under.
        surface: TemplateSurface,
        /// Engine error text.
        reason: String,
    },

    /// The endpoint URL or a header value template failed to render.
    #[error("endpoint {target} failed to render: {reason}")]
    EndpointRender {
        /// `url` or `header:<name>`.
        target: String,
        /// Engine error text.
        reason: String,
    },

    /// A structured-format template rendered output that does not parse.
    #[error("{surface} template rendered malformed JSON: {reason}")]
    MalformedOutput {
        /// Surface the template is declared under.
        surface: TemplateSurface,
        /// Parser error text.
        reason: String,
    },

    /// The validation template rendered only whitespace.
    #[error("validation template rendered an empty message")]
    EmptyValidationOutput,

    /// A cross-field manifest rule was violated.
    #[error("{0}")]
    RuleViolation(String),

    /// The manifest could not be mapped onto the typed model.
    #[error("manifest could not be interpreted: {0}")]
    ManifestLoad(String),
}

impl CheckError {
    /// Short stable name of the error kind, used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SchemaViolation { .. } => "SchemaViolation",
            Self::MissingAsset { .. } => "MissingAsset",
            Self::Render { .. } => "RenderError",
            Self::EndpointRender { .. } => "EndpointRenderError",
            Self::MalformedOutput { .. } => "MalformedOutput",
            Self::EmptyValidationOutput => "EmptyValidationOutput",
            Self::RuleViolation(_) => "RuleViolation",
            Self::ManifestLoad(_) => "ManifestLoad",
        }
    }
}

/// Errors reading a manifest document.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The manifest file is not valid JSON.
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        /// Path that failed.
        path: PathBuf,
        /// Underlying parser error.
        #[source]
        source: serde_json::Error,
    },

    /// The integration directory has no usable name to derive a key from.
    #[error("cannot derive integration key from {}", .0.display())]
    NoKey(PathBuf),
}

//! # Runtime Schema Validation
//!
//! Validates manifest documents against JSON Schema (Draft 2020-12).
//!
//! ## Design
//!
//! A [`CompiledSchema`] wraps a compiled `jsonschema::Validator` built once
//! and reused for every document. The manifest schema bundled with the crate
//! is compiled lazily into a process-wide singleton
//! ([`CompiledSchema::bundled`]); a [`SchemaRegistry`] compiles schemas from a
//! directory instead, registering every `*.schema.json` it finds by `$id` so
//! that cross-file `$ref`s resolve locally. No schema is ever fetched over
//! the network.
//!
//! Violations carry the JSON Pointer to the offending field and a
//! human-readable message.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde_json::Value;
use thiserror::Error;

/// File name of the manifest schema, both bundled and in a schema directory.
pub const MANIFEST_SCHEMA_FILE: &str = "manifest.schema.json";

/// URI prefix for schemas that do not declare their own `$id`.
const SCHEMA_URI_PREFIX: &str = "https://schemas.ifw.dev/";

const BUNDLED_MANIFEST_SCHEMA: &str = include_str!("../../../schemas/manifest.schema.json");

static BUNDLED: OnceLock<Result<CompiledSchema, String>> = OnceLock::new();

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// A single structural violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaValidationDetail {
    /// JSON Pointer to the violating field; empty for the document root.
    pub instance_path: String,
    /// JSON Pointer into the schema keyword that rejected it.
    pub schema_path: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl std::fmt::Display for SchemaValidationDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.instance_path, self.message)
        }
    }
}

/// Errors loading or compiling schemas. Document violations are not errors
/// here; they are returned as data by [`CompiledSchema::validate`].
#[derive(Error, Debug)]
pub enum SchemaValidationError {
    /// A schema file could not be read or parsed.
    #[error("failed to load schema {path}: {reason}")]
    SchemaLoadError {
        /// Path or identifier of the schema that failed to load.
        path: String,
        /// Human-readable reason for the failure.
        reason: String,
    },

    /// The schema could not be compiled into a validator.
    #[error("failed to compile schema {schema_id}: {reason}")]
    SchemaCompileError {
        /// The schema `$id` or file name.
        schema_id: String,
        /// Human-readable reason.
        reason: String,
    },

    /// The requested schema was not found in the registry.
    #[error("schema not found: {0}")]
    SchemaNotFound(String),

    /// I/O error while walking the schema directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Schema retriever for $ref resolution
// ---------------------------------------------------------------------------

/// Resolves `$ref` URIs against schemas already loaded from disk.
struct LocalSchemaRetriever {
    schemas: HashMap<String, Value>,
}

impl jsonschema::Retrieve for LocalSchemaRetriever {
    fn retrieve(
        &self,
        uri: &jsonschema::Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let uri_str = uri.as_str();
        if let Some(schema) = self.schemas.get(uri_str) {
            return Ok(schema.clone());
        }

        // Fall back to the last path segment under our own prefix so that
        // relative `$ref: "other.schema.json"` resolves too.
        let filename = uri_str.rsplit('/').next().unwrap_or(uri_str);
        self.schemas
            .get(&format!("{SCHEMA_URI_PREFIX}{filename}"))
            .cloned()
            .ok_or_else(|| format!("schema not found for URI: {uri_str}").into())
    }
}

// ---------------------------------------------------------------------------
// CompiledSchema
// ---------------------------------------------------------------------------

/// A schema compiled once and reused for every document it validates.
pub struct CompiledSchema {
    schema_id: String,
    validator: jsonschema::Validator,
}

impl std::fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("schema_id", &self.schema_id)
            .finish()
    }
}

impl CompiledSchema {
    /// The manifest schema bundled into the binary, compiled on first use.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaValidationError::SchemaCompileError`] if the bundled
    /// schema does not compile. The failure is cached like the success.
    pub fn bundled() -> Result<&'static CompiledSchema, SchemaValidationError> {
        BUNDLED
            .get_or_init(|| {
                tracing::debug!("compiling bundled manifest schema");
                let schema: Value = serde_json::from_str(BUNDLED_MANIFEST_SCHEMA)
                    .map_err(|e| format!("bundled schema is not JSON: {e}"))?;
                Self::compile(MANIFEST_SCHEMA_FILE, &schema, HashMap::new())
                    .map_err(|e| e.to_string())
            })
            .as_ref()
            .map_err(|reason| SchemaValidationError::SchemaCompileError {
                schema_id: MANIFEST_SCHEMA_FILE.to_string(),
                reason: reason.clone(),
            })
    }

    /// Compile a standalone schema value (no cross-file `$ref`s).
    pub fn from_value(schema_id: &str, schema: &Value) -> Result<Self, SchemaValidationError> {
        Self::compile(schema_id, schema, HashMap::new())
    }

    fn compile(
        schema_id: &str,
        schema: &Value,
        others: HashMap<String, Value>,
    ) -> Result<Self, SchemaValidationError> {
        let validator = jsonschema::options()
            .with_draft(jsonschema::Draft::Draft202012)
            .with_retriever(LocalSchemaRetriever { schemas: others })
            .build(schema)
            .map_err(|e| SchemaValidationError::SchemaCompileError {
                schema_id: schema_id.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            schema_id: schema_id.to_string(),
            validator,
        })
    }

    /// The `$id` or file name this schema was compiled from.
    pub fn schema_id(&self) -> &str {
        &self.schema_id
    }

    /// Every violation of `document`; empty when it conforms.
    pub fn validate(&self, document: &Value) -> Vec<SchemaValidationDetail> {
        self.validator
            .iter_errors(document)
            .map(|err| SchemaValidationDetail {
                instance_path: err.instance_path.to_string(),
                schema_path: err.schema_path.to_string(),
                message: err.to_string(),
            })
            .collect()
    }

    pub fn is_valid(&self, document: &Value) -> bool {
        self.validator.is_valid(document)
    }
}

// ---------------------------------------------------------------------------
// SchemaRegistry
// ---------------------------------------------------------------------------

/// All `*.schema.json` files under a directory, indexed by `$id`.
pub struct SchemaRegistry {
    schema_dir: PathBuf,
    schema_map: HashMap<String, Value>,
    filename_to_id: HashMap<String, String>,
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("schema_dir", &self.schema_dir)
            .field("schema_count", &self.schema_map.len())
            .finish()
    }
}

impl SchemaRegistry {
    /// Load every `*.schema.json` under `schema_dir`, recursively.
    ///
    /// Schemas without an `$id` are registered under a URI derived from
    /// their path relative to `schema_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaValidationError::SchemaLoadError`] if the directory does
    /// not exist or any schema file cannot be read or parsed as JSON.
    pub fn new(schema_dir: impl Into<PathBuf>) -> Result<Self, SchemaValidationError> {
        let schema_dir = schema_dir.into();
        if !schema_dir.is_dir() {
            return Err(SchemaValidationError::SchemaLoadError {
                path: schema_dir.display().to_string(),
                reason: "not a directory".to_string(),
            });
        }

        let mut schema_map = HashMap::new();
        let mut filename_to_id = HashMap::new();
        let mut seen_paths = HashSet::new();

        for path in Self::glob_schemas(&schema_dir)? {
            if !seen_paths.insert(path.clone()) {
                continue;
            }

            let content = std::fs::read_to_string(&path).map_err(|e| {
                SchemaValidationError::SchemaLoadError {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                }
            })?;
            let schema: Value = serde_json::from_str(&content).map_err(|e| {
                SchemaValidationError::SchemaLoadError {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                }
            })?;

            let schema_id = match schema.get("$id").and_then(|v| v.as_str()) {
                Some(id) => id.to_string(),
                None => {
                    let rel = path.strip_prefix(&schema_dir).unwrap_or(&path);
                    format!("{SCHEMA_URI_PREFIX}{}", rel.display())
                }
            };

            if let Some(filename) = path.file_name().and_then(|f| f.to_str()) {
                filename_to_id.insert(filename.to_string(), schema_id.clone());
            }
            tracing::trace!(schema_id = %schema_id, path = %path.display(), "registered schema");
            schema_map.insert(schema_id, schema);
        }

        Ok(Self {
            schema_dir,
            schema_map,
            filename_to_id,
        })
    }

    pub fn schema_count(&self) -> usize {
        self.schema_map.len()
    }

    /// Compile the schema stored under `filename`, with every other
    /// registered schema available for `$ref` resolution.
    pub fn compile(&self, filename: &str) -> Result<CompiledSchema, SchemaValidationError> {
        let schema_id = self
            .filename_to_id
            .get(filename)
            .ok_or_else(|| SchemaValidationError::SchemaNotFound(filename.to_string()))?;
        let schema = self
            .schema_map
            .get(schema_id)
            .ok_or_else(|| SchemaValidationError::SchemaNotFound(schema_id.clone()))?;

        // Register every schema under its $id and under the derived URI for
        // its file name, so both absolute and relative refs resolve.
        let mut others = self.schema_map.clone();
        for (name, id) in &self.filename_to_id {
            if let Some(value) = self.schema_map.get(id) {
                others
                    .entry(format!("{SCHEMA_URI_PREFIX}{name}"))
                    .or_insert_with(|| value.clone());
            }
        }

        CompiledSchema::compile(schema_id, schema, others)
    }

    fn glob_schemas(dir: &Path) -> Result<Vec<PathBuf>, SchemaValidationError> {
        let mut results = Vec::new();
        Self::walk_for_schemas(dir, &mut results)?;
        results.sort();
        Ok(results)
    }

    fn walk_for_schemas(dir: &Path, acc: &mut Vec<PathBuf>) -> Result<(), SchemaValidationError> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                Self::walk_for_schemas(&path, acc)?;
            } else if path
                .file_name()
                .and_then(|f| f.to_str())
                .is_some_and(|name| name.ends_with(".schema.json"))
            {
                acc.push(path);
            }
        }
        Ok(())
    }
}

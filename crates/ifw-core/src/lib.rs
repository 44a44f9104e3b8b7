//! # ifw-core — Integration Framework Core Model
//!
//! Typed view of an integration manifest (`integrations/<key>/manifest.json`)
//! and the error hierarchy shared by every validation stage.
//!
//! ## Crate Policy
//!
//! - No I/O beyond reading a single manifest file in [`manifest::load_manifest`].
//! - The typed model is lenient: anything the schema is responsible for
//!   rejecting is accepted here so that cross-field rules can still run on
//!   schema-invalid documents.
//! - Loaded manifests are immutable; nothing in the workspace writes them back.

pub mod error;
pub mod manifest;

pub use error::{CheckError, ManifestError};
pub use manifest::{
    load_manifest, AuditLogEventsHook, Capabilities, Endpoint, FieldType, FormVariable, Header,
    Icons, LoadedManifest, Manifest, PayloadKind, TemplateSurface, Templates, MANIFEST_FILE,
};

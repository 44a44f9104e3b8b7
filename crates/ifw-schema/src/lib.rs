//! # ifw-schema — Manifest Schema Validation
//!
//! Structural validation of integration manifests against JSON Schema
//! (Draft 2020-12).
//!
//! ## Entry points
//!
//! - [`CompiledSchema::bundled`] — the manifest schema shipped in
//!   `schemas/manifest.schema.json`, compiled once per process.
//! - [`SchemaRegistry`] — loads every `*.schema.json` under a directory and
//!   compiles one of them with all others available for `$ref` resolution.
//!
//! Both produce a [`CompiledSchema`], whose [`CompiledSchema::validate`] is
//! a pure function of the document and safe to call from many threads.

pub mod validate;

pub use validate::{
    CompiledSchema, SchemaRegistry, SchemaValidationDetail, SchemaValidationError,
    MANIFEST_SCHEMA_FILE,
};

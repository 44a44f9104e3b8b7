//! # ifw-render — Context Synthesis & Template Verification
//!
//! Given only a manifest's declarations (no real user input), builds a
//! plausible rendering context for every template the manifest references
//! and checks that each renders and produces well-formed output.
//!
//! ## Pipeline
//!
//! 1. [`synth::synthesize`] — one synthetic value per declared form variable.
//! 2. [`auth::oauth_context`] — fixed placeholder credentials when the
//!    integration requires OAuth.
//! 3. [`context::compose`] — sample event payload + `formVariables` (+
//!    `oauth`), JSON-escaped when the target template produces JSON.
//! 4. [`verify::TemplateVerifier`] — strict rendering through
//!    [`engine::TemplateEngine`], then JSON parsing and the validation
//!    surface's non-empty rule.
//!
//! Every context is freshly allocated per render; sample payloads are
//! read-only and never modified.

pub mod auth;
pub mod context;
pub mod engine;
pub mod helpers;
pub mod payload;
pub mod synth;
pub mod verify;

pub use auth::oauth_context;
pub use context::{compose, endpoint_context, json_escape};
pub use engine::{RenderFailure, TemplateEngine};
pub use payload::{PayloadError, SamplePayloads};
pub use synth::synthesize;
pub use verify::{is_structured_format, TemplateCheck, TemplateVerifier};

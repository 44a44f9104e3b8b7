//! # Template Verification
//!
//! Renders every template a manifest declares against a synthesized context
//! and checks the output.
//!
//! ## Per template
//!
//! 1. The file must exist relative to the integration directory.
//! 2. It must compile and render in strict mode.
//! 3. `validation` templates must render a non-blank message.
//! 4. Structured templates (`*.json`, `*.json.hbs`, `*.json.handlebars`)
//!    must render a document that parses as JSON.
//!
//! ## Endpoint
//!
//! The endpoint URL and every header value are rendered separately against
//! the endpoint context; each is its own check.

use std::path::Path;

use ifw_core::{CheckError, LoadedManifest, Manifest, PayloadKind, TemplateSurface};
use serde_json::Value;

use crate::context::{compose, endpoint_context};
use crate::engine::TemplateEngine;
use crate::payload::{PayloadError, SamplePayloads};

const STRUCTURED_SUFFIXES: [&str; 3] = [".json", ".json.hbs", ".json.handlebars"];

/// Whether a template at `path` produces JSON.
pub fn is_structured_format(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    STRUCTURED_SUFFIXES
        .iter()
        .any(|suffix| lower.ends_with(suffix))
}

/// Outcome of one template or endpoint check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateCheck {
    /// `template:<surface>`, `endpoint:url` or `endpoint:header:<name>`.
    pub name: String,
    pub result: Result<(), CheckError>,
}

/// Renders and checks the templates of one manifest at a time. Holds only
/// read-only state and can be shared across threads.
#[derive(Debug)]
pub struct TemplateVerifier {
    engine: TemplateEngine,
    payloads: SamplePayloads,
}

impl TemplateVerifier {
    pub fn new(payloads: SamplePayloads) -> Self {
        Self {
            engine: TemplateEngine::new(),
            payloads,
        }
    }

    /// A verifier using the bundled sample payloads.
    pub fn bundled() -> Result<Self, PayloadError> {
        SamplePayloads::bundled().map(|payloads| Self::new(payloads.clone()))
    }

    pub fn payloads(&self) -> &SamplePayloads {
        &self.payloads
    }

    /// Every template and endpoint check for `loaded`, in declaration order.
    pub fn verify_manifest(&self, loaded: &LoadedManifest, manifest: &Manifest) -> Vec<TemplateCheck> {
        let mut checks = Vec::new();

        if let Some(templates) = manifest.templates() {
            for (surface, path) in templates.declared() {
                checks.push(TemplateCheck {
                    name: format!("template:{surface}"),
                    result: self.verify_template(&loaded.dir, manifest, surface, path),
                });
            }
        }

        checks.extend(self.verify_endpoint(manifest));
        checks
    }

    /// Render the template declared at `relative_path` and return its output.
    pub fn render_template(
        &self,
        dir: &Path,
        manifest: &Manifest,
        surface: TemplateSurface,
        relative_path: &str,
    ) -> Result<String, CheckError> {
        let path = dir.join(relative_path);
        if !path.is_file() {
            return Err(CheckError::MissingAsset {
                what: format!("{surface} template"),
                path,
            });
        }
        let source = std::fs::read_to_string(&path).map_err(|e| CheckError::Render {
            surface,
            reason: format!("cannot read {}: {e}", path.display()),
        })?;

        let structured = is_structured_format(relative_path);
        let context = self.context_for(manifest, surface, structured);
        tracing::debug!(
            surface = %surface,
            path = %path.display(),
            structured,
            "rendering template"
        );

        self.engine
            .render(&source, &context)
            .map_err(|e| CheckError::Render {
                surface,
                reason: e.to_string(),
            })
    }

    /// Render one declared template and check its output.
    pub fn verify_template(
        &self,
        dir: &Path,
        manifest: &Manifest,
        surface: TemplateSurface,
        relative_path: &str,
    ) -> Result<(), CheckError> {
        let output = self.render_template(dir, manifest, surface, relative_path)?;

        if surface == TemplateSurface::Validation && is_blank_message(&output) {
            return Err(CheckError::EmptyValidationOutput);
        }

        if is_structured_format(relative_path) {
            serde_json::from_str::<Value>(&output).map_err(|e| CheckError::MalformedOutput {
                surface,
                reason: e.to_string(),
            })?;
        }

        Ok(())
    }

    /// Render the endpoint URL and each header value, one check per target.
    pub fn verify_endpoint(&self, manifest: &Manifest) -> Vec<TemplateCheck> {
        self.render_endpoint(manifest)
            .into_iter()
            .map(|(target, rendered)| TemplateCheck {
                name: format!("endpoint:{target}"),
                result: rendered.map(|_| ()),
            })
            .collect()
    }

    /// Rendered endpoint targets: `("url", ..)` then `("header:<name>", ..)`.
    pub fn render_endpoint(&self, manifest: &Manifest) -> Vec<(String, Result<String, CheckError>)> {
        let Some(endpoint) = manifest.endpoint() else {
            return Vec::new();
        };
        let context = endpoint_context(manifest, self.payloads.get(PayloadKind::Flag));

        let targets = std::iter::once(("url".to_string(), endpoint.url.as_str())).chain(
            endpoint
                .headers
                .iter()
                .map(|h| (format!("header:{}", h.name), h.value.as_str())),
        );

        targets
            .map(|(target, source)| {
                let rendered = self.engine.render(source, &context).map_err(|e| {
                    CheckError::EndpointRender {
                        target: target.clone(),
                        reason: e.to_string(),
                    }
                });
                (target, rendered)
            })
            .collect()
    }

    /// The context a template on `surface` is rendered with.
    pub fn context_for(&self, manifest: &Manifest, surface: TemplateSurface, structured: bool) -> Value {
        compose(manifest, self.payloads.get(surface.payload_kind()), structured)
    }
}

/// Blank after trimming; a JSON string literal is judged by its content.
fn is_blank_message(output: &str) -> bool {
    let trimmed = output.trim();
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::String(message)) => message.trim().is_empty(),
        _ => trimmed.is_empty(),
    }
}

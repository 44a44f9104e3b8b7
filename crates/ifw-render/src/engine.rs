//! Strict Handlebars rendering.
//!
//! One registry, configured once and shared read-only: strict mode (a
//! reference to anything not in the context fails the render instead of
//! producing an empty string), no HTML escaping, and the manifest helpers.

use handlebars::{no_escape, Handlebars, RenderErrorReason};
use serde_json::Value;
use thiserror::Error;

use crate::helpers;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderFailure {
    /// The template source does not compile.
    #[error("template does not compile: {0}")]
    Compile(String),

    /// Rendering failed, typically an unresolved reference in strict mode.
    #[error("{0}")]
    Render(String),
}

pub struct TemplateEngine {
    registry: Handlebars<'static>,
}

impl std::fmt::Debug for TemplateEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateEngine")
            .field("strict", &self.registry.strict_mode())
            .finish()
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(no_escape);
        helpers::register(&mut registry);
        Self { registry }
    }

    /// Compile `source` and render it against `context`.
    pub fn render(&self, source: &str, context: &Value) -> Result<String, RenderFailure> {
        self.registry
            .render_template(source, context)
            .map_err(|e| match e.reason() {
                RenderErrorReason::TemplateError(compile) => {
                    RenderFailure::Compile(compile.to_string())
                }
                _ => RenderFailure::Render(e.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_nested_references() {
        let engine = TemplateEngine::new();
        let out = engine
            .render(
                "{{name}} in {{formVariables.region}}",
                &json!({"name": "Flag", "formVariables": {"region": "eu"}}),
            )
            .unwrap();
        assert_eq!(out, "Flag in eu");
    }

    #[test]
    fn missing_reference_fails_in_strict_mode() {
        let engine = TemplateEngine::new();
        let err = engine
            .render("{{formVariables.typo}}", &json!({"formVariables": {}}))
            .unwrap_err();
        assert!(matches!(err, RenderFailure::Render(_)));
    }

    #[test]
    fn reference_through_null_fails() {
        let engine = TemplateEngine::new();
        let err = engine
            .render(
                "{{formVariables.oauth.accessToken}}",
                &json!({"formVariables": {"oauth": null}}),
            )
            .unwrap_err();
        assert!(matches!(err, RenderFailure::Render(_)));
    }

    #[test]
    fn unclosed_block_fails_to_compile() {
        let engine = TemplateEngine::new();
        let err = engine.render("{{#each items}}", &json!({"items": []})).unwrap_err();
        assert!(matches!(err, RenderFailure::Compile(_)));
    }

    #[test]
    fn if_on_missing_reference_fails() {
        let engine = TemplateEngine::new();
        let ctx = json!({"formVariables": {"region": "eu"}});
        let err = engine
            .render("{{#if formVariables.regoin}}x{{/if}}", &ctx)
            .unwrap_err();
        assert!(matches!(err, RenderFailure::Render(_)));
        assert!(engine
            .render("{{#if formVariables.regoin}}x{{else}}y{{/if}}", &ctx)
            .is_err());
    }

    #[test]
    fn unless_on_missing_reference_fails() {
        let engine = TemplateEngine::new();
        let err = engine
            .render(
                "{{#unless formVariables.regoin}}x{{/unless}}",
                &json!({"formVariables": {"region": "eu"}}),
            )
            .unwrap_err();
        assert!(matches!(err, RenderFailure::Render(_)));
    }

    #[test]
    fn conditionals_on_present_values() {
        let engine = TemplateEngine::new();
        let ctx = json!({"on": true, "off": false, "zero": 0, "none": null, "kind": "flag"});
        let cases = [
            ("{{#if on}}y{{else}}n{{/if}}", "y"),
            ("{{#if off}}y{{else}}n{{/if}}", "n"),
            ("{{#if none}}y{{else}}n{{/if}}", "n"),
            ("{{#if zero}}y{{else}}n{{/if}}", "n"),
            ("{{#if zero includeZero=true}}y{{else}}n{{/if}}", "y"),
            ("{{#unless off}}y{{else}}n{{/unless}}", "y"),
            ("{{#unless on}}y{{else}}n{{/unless}}", "n"),
            ("{{#if (equal kind \"flag\")}}y{{/if}}", "y"),
        ];
        for (source, expected) in cases {
            assert_eq!(engine.render(source, &ctx).unwrap(), expected, "{source}");
        }
    }

    #[test]
    fn compile_error_is_reported_once_as_compile() {
        let engine = TemplateEngine::new();
        let err = engine.render("{{#if on}}x", &json!({"on": true})).unwrap_err();
        assert!(matches!(err, RenderFailure::Compile(_)));
    }

    #[test]
    fn output_is_not_html_escaped() {
        let engine = TemplateEngine::new();
        let out = engine
            .render("{{v}}", &json!({"v": "<a href=\"x\">&</a>"}))
            .unwrap();
        assert_eq!(out, "<a href=\"x\">&</a>");
    }

    #[test]
    fn engine_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TemplateEngine>();
    }
}

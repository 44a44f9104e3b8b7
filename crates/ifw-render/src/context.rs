//! Rendering context composition.
//!
//! Template context shape:
//!
//! ```text
//! { <sample payload fields>, formVariables: { <field values>, oauth: {..} | null } }
//! ```
//!
//! Endpoint context shape (URL and header templates):
//!
//! ```text
//! { <field values>, oauth: {..} | null, context: <flag payload> }
//! ```
//!
//! Both are built from copies; the payload passed in is never modified.

use ifw_core::Manifest;
use serde_json::{Map, Value};

use crate::auth::oauth_context;
use crate::synth::synthesize;

pub const FORM_VARIABLES_KEY: &str = "formVariables";
pub const OAUTH_KEY: &str = "oauth";
pub const CONTEXT_KEY: &str = "context";

/// Escape `s` for embedding between the quotes of a JSON string literal.
pub fn json_escape(s: &str) -> String {
    let encoded = Value::String(s.to_owned()).to_string();
    encoded[1..encoded.len() - 1].to_string()
}

/// Synthesized field values plus `oauth` (null when OAuth is not required).
pub fn form_variables(manifest: &Manifest) -> Map<String, Value> {
    let mut vars = synthesize(manifest.form_variables());
    vars.insert(OAUTH_KEY.to_string(), oauth_value(manifest));
    vars
}

fn oauth_value(manifest: &Manifest) -> Value {
    oauth_context(manifest.requires_oauth)
        .map(Value::Object)
        .unwrap_or(Value::Null)
}

/// Build the rendering context for a template.
///
/// With `escape_for_json`, every top-level string of the payload copy is
/// JSON-escaped so that interpolating it inside a JSON string literal keeps
/// the rendered document parseable.
pub fn compose(manifest: &Manifest, base_payload: &Value, escape_for_json: bool) -> Value {
    let mut ctx = match base_payload {
        Value::Object(fields) => fields.clone(),
        other => {
            tracing::debug!(payload = %other, "base payload is not an object; starting empty");
            Map::new()
        }
    };

    if escape_for_json {
        for value in ctx.values_mut() {
            if let Value::String(s) = value {
                *s = json_escape(s);
            }
        }
    }

    ctx.insert(
        FORM_VARIABLES_KEY.to_string(),
        Value::Object(form_variables(manifest)),
    );
    Value::Object(ctx)
}

/// Build the context for endpoint URL and header templates.
///
/// `oauth` and `context` are written last and win over fields with the same key.
pub fn endpoint_context(manifest: &Manifest, flag_payload: &Value) -> Value {
    let mut ctx = synthesize(manifest.form_variables());
    for reserved in [OAUTH_KEY, CONTEXT_KEY] {
        if ctx.contains_key(reserved) {
            tracing::warn!(key = reserved, "form variable shadowed by reserved endpoint context key");
        }
    }
    ctx.insert(OAUTH_KEY.to_string(), oauth_value(manifest));
    ctx.insert(CONTEXT_KEY.to_string(), flag_payload.clone());
    Value::Object(ctx)
}

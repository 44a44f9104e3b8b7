//! Helpers available to manifest templates.
//!
//! | Helper | Example | Output |
//! |---|---|---|
//! | `equal` | `{{#if (equal kind "flag")}}` | `true` when both arguments are equal JSON |
//! | `jsonEscape` | `"{{jsonEscape member.firstName}}"` | string escaped for a JSON literal |
//! | `pathEncode` | `/{{pathEncode project.key}}` | percent-encoded path segment |
//! | `queryEncode` | `?q={{queryEncode name}}` | form-urlencoded query value |
//! | `basicAuthHeaderValue` | `{{basicAuthHeaderValue user pass}}` | `Basic <base64(user:pass)>` |
//!
//! `if` and `unless` replace the built-in block helpers with strict ones: a
//! condition that names nothing in the context fails the render rather than
//! reading as false.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use handlebars::{
    handlebars_helper, Context, Handlebars, Helper, HelperDef, HelperResult, JsonTruthy, Output,
    RenderContext, RenderError, RenderErrorReason, Renderable,
};

use crate::context::json_escape;

handlebars_helper!(equal: |left: Json, right: Json| left == right);
handlebars_helper!(json_escape_helper: |value: str| json_escape(value));
handlebars_helper!(path_encode: |value: str| encode_path_segment(value));
handlebars_helper!(query_encode: |value: str| encode_query_value(value));
handlebars_helper!(basic_auth_header_value: |username: str, password: str| {
    basic_auth(username, password)
});

/// `{{#if}}` / `{{#unless}}` that refuse an unresolved condition.
#[derive(Clone, Copy)]
struct StrictConditional {
    name: &'static str,
    positive: bool,
}

const STRICT_IF: StrictConditional = StrictConditional {
    name: "if",
    positive: true,
};
const STRICT_UNLESS: StrictConditional = StrictConditional {
    name: "unless",
    positive: false,
};

impl HelperDef for StrictConditional {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        r: &'reg Handlebars<'reg>,
        ctx: &'rc Context,
        rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let param = h
            .param(0)
            .ok_or(RenderErrorReason::ParamNotFoundForIndex(self.name, 0))?;
        if param.is_value_missing() {
            return Err(RenderError::strict_error(param.relative_path()));
        }
        let include_zero = h
            .hash_get("includeZero")
            .and_then(|v| v.value().as_bool())
            .unwrap_or(false);

        let truthy = param.value().is_truthy(include_zero);
        let block = if truthy == self.positive {
            h.template()
        } else {
            h.inverse()
        };
        match block {
            Some(t) => t.render(r, ctx, rc, out),
            None => Ok(()),
        }
    }
}

/// Register every helper on `registry`.
pub fn register(registry: &mut Handlebars<'_>) {
    registry.register_helper("if", Box::new(STRICT_IF));
    registry.register_helper("unless", Box::new(STRICT_UNLESS));
    registry.register_helper("equal", Box::new(equal));
    registry.register_helper("jsonEscape", Box::new(json_escape_helper));
    registry.register_helper("pathEncode", Box::new(path_encode));
    registry.register_helper("queryEncode", Box::new(query_encode));
    registry.register_helper("basicAuthHeaderValue", Box::new(basic_auth_header_value));
}

pub fn encode_path_segment(value: &str) -> String {
    let Ok(mut url) = url::Url::parse("http://localhost/") else {
        return value.to_string();
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.clear().push(value);
    }
    url.path().trim_start_matches('/').to_string()
}

pub fn encode_query_value(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

pub fn basic_auth(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

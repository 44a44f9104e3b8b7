//! OAuth placeholder context.
//!
//! Integrations that authenticate through OAuth reference `oauth.baseURI`
//! and `oauth.accessToken` in their templates. Real values are substituted
//! at delivery time; here they are fixed placeholder tokens.

use serde_json::{Map, Value};

pub const OAUTH_BASE_URI_PLACEHOLDER: &str = "$OAUTH_BASE_URI";
pub const OAUTH_ACCESS_TOKEN_PLACEHOLDER: &str = "$OAUTH_ACCESS_TOKEN";

/// Placeholder credentials when `requires_oauth` is true, otherwise `None`.
pub fn oauth_context(requires_oauth: Option<bool>) -> Option<Map<String, Value>> {
    if !requires_oauth.unwrap_or(false) {
        return None;
    }
    let mut ctx = Map::new();
    ctx.insert(
        "baseURI".to_string(),
        Value::String(OAUTH_BASE_URI_PLACEHOLDER.to_string()),
    );
    ctx.insert(
        "accessToken".to_string(),
        Value::String(OAUTH_ACCESS_TOKEN_PLACEHOLDER.to_string()),
    );
    Some(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn required_yields_two_placeholders() {
        let ctx = oauth_context(Some(true)).unwrap();
        assert_eq!(
            Value::Object(ctx),
            json!({"baseURI": "$OAUTH_BASE_URI", "accessToken": "$OAUTH_ACCESS_TOKEN"})
        );
    }

    #[test]
    fn not_required_yields_none() {
        assert!(oauth_context(Some(false)).is_none());
        assert!(oauth_context(None).is_none());
    }
}

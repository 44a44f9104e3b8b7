//! # Manifest Rules
//!
//! Cross-field invariants the schema cannot express. Every rule runs on
//! every manifest and yields its own outcome; a failing rule never hides
//! another.
//!
//! | Rule | Passes when |
//! |---|---|
//! | `schema` | the raw document has no schema violations |
//! | `icons` | both declared icon files exist |
//! | `overviewPeriod` | `overview`, if present, ends with `.` |
//! | `oauthAllowList` | `requiresOAuth` integrations are allow-listed |
//! | `defaultValueOptional` | fields with a `defaultValue` are `isOptional` |
//! | `defaultValueType` | `defaultValue` matches the field type |
//! | `optionalDefault` | `isOptional` fields have a `defaultValue` |
//! | `secretType` | `isSecret` fields are `string` |
//! | `dynamicOptions` | `dynamicOptions` is declared exactly on `dynamicEnum` fields |
//! | `capabilities` | `capabilities` or a non-empty `otherCapabilities` |
//! | `enumDefaultAllowed` | an `enum` default is one of its `allowedValues` |
//! | `uniqueKeys` | field keys are unique |

use std::collections::{BTreeSet, HashSet};

use ifw_core::{CheckError, FieldType, FormVariable, LoadedManifest, Manifest};
use ifw_render::oauth_context;
use ifw_schema::CompiledSchema;
use serde_json::Value;

use crate::report::CheckOutcome;

/// Outcome name used when the typed model cannot be built, or when some
/// of its properties had to be left out.
pub const MANIFEST_CHECK: &str = "manifest";
pub const SCHEMA_RULE: &str = "schema";

/// Everything a typed rule may look at.
pub struct RuleInput<'a> {
    pub loaded: &'a LoadedManifest,
    pub manifest: &'a Manifest,
    pub oauth_allow_list: &'a BTreeSet<String>,
}

type RuleFn = fn(&RuleInput<'_>) -> Result<(), CheckError>;

/// Typed rules in reporting order.
pub const RULES: &[(&str, RuleFn)] = &[
    ("icons", icons),
    ("overviewPeriod", overview_period),
    ("oauthAllowList", oauth_allow_list),
    ("defaultValueOptional", default_value_optional),
    ("defaultValueType", default_value_type),
    ("optionalDefault", optional_default),
    ("secretType", secret_type),
    ("dynamicOptions", dynamic_options),
    ("capabilities", capabilities),
    ("enumDefaultAllowed", enum_default_allowed),
    ("uniqueKeys", unique_keys),
];

/// Names of every rule, `schema` first.
pub fn rule_names() -> Vec<&'static str> {
    std::iter::once(SCHEMA_RULE)
        .chain(RULES.iter().map(|(name, _)| *name))
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    oauth_allow_list: BTreeSet<String>,
}

impl RuleEngine {
    pub fn new(oauth_allow_list: BTreeSet<String>) -> Self {
        Self { oauth_allow_list }
    }

    /// Run the schema rule and every typed rule against `loaded`.
    ///
    /// Ill-typed properties add a failing `manifest` outcome but do not stop
    /// the typed rules. Only a document with no typed view at all (not an
    /// object) gets the `manifest` outcome in place of the typed rules.
    pub fn check(&self, loaded: &LoadedManifest, schema: &CompiledSchema) -> Vec<CheckOutcome> {
        let mut outcomes = vec![CheckOutcome::new(SCHEMA_RULE, check_schema(loaded, schema))];

        match &loaded.model {
            Ok(manifest) => {
                if !loaded.issues.is_empty() {
                    outcomes.push(CheckOutcome::new(
                        MANIFEST_CHECK,
                        Err(CheckError::ManifestLoad(loaded.issues.join("; "))),
                    ));
                }
                let input = RuleInput {
                    loaded,
                    manifest,
                    oauth_allow_list: &self.oauth_allow_list,
                };
                outcomes.extend(
                    RULES
                        .iter()
                        .map(|(name, rule)| CheckOutcome::new(*name, rule(&input))),
                );
            }
            Err(reason) => {
                outcomes.push(CheckOutcome::new(
                    MANIFEST_CHECK,
                    Err(CheckError::ManifestLoad(reason.clone())),
                ));
            }
        }
        outcomes
    }
}

pub fn check_schema(loaded: &LoadedManifest, schema: &CompiledSchema) -> Result<(), CheckError> {
    let details = schema.validate(&loaded.raw);
    if details.is_empty() {
        return Ok(());
    }
    Err(CheckError::SchemaViolation {
        count: details.len(),
        details: details.iter().map(ToString::to_string).collect(),
    })
}

fn violation(message: &str, keys: &[&str]) -> Result<(), CheckError> {
    if keys.is_empty() {
        Ok(())
    } else {
        Err(CheckError::RuleViolation(format!("{message}: {}", keys.join(", "))))
    }
}

fn offending_keys<'a>(
    fields: &'a [FormVariable],
    pred: impl Fn(&FormVariable) -> bool,
) -> Vec<&'a str> {
    fields
        .iter()
        .filter(|f| pred(f))
        .map(|f| f.key.as_str())
        .collect()
}

fn icons(input: &RuleInput<'_>) -> Result<(), CheckError> {
    let icons = input.manifest.icons.clone().unwrap_or_default();
    for (what, declared) in [
        ("square icon", icons.square.as_deref()),
        ("rectangular icon", icons.rectangular.as_deref()),
    ] {
        let Some(relative) = declared else {
            return Err(CheckError::RuleViolation(format!("no {what} declared")));
        };
        let path = input.loaded.resolve(relative);
        if !path.is_file() {
            return Err(CheckError::MissingAsset {
                what: what.to_string(),
                path,
            });
        }
    }
    Ok(())
}

fn overview_period(input: &RuleInput<'_>) -> Result<(), CheckError> {
    match input.manifest.overview.as_deref() {
        Some(overview) if !overview.ends_with('.') => Err(CheckError::RuleViolation(
            "overview must end with a period".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Reads the raw flag: anything other than `false` or absent counts as a
/// request for OAuth.
fn oauth_allow_list(input: &RuleInput<'_>) -> Result<(), CheckError> {
    let requested = match input.loaded.raw.get("requiresOAuth") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(_) => true,
    };
    if !requested {
        return Ok(());
    }
    let key = &input.loaded.key;
    if !input.oauth_allow_list.contains(key) {
        return Err(CheckError::RuleViolation(format!(
            "{key} requires OAuth but is not on the OAuth allow-list"
        )));
    }
    if oauth_context(Some(requested)).is_none() {
        return Err(CheckError::RuleViolation(format!(
            "{key} requires OAuth but no OAuth context is available"
        )));
    }
    Ok(())
}

fn default_value_optional(input: &RuleInput<'_>) -> Result<(), CheckError> {
    let keys = offending_keys(input.manifest.form_variables(), |f| {
        f.default_value.is_some() && !f.is_optional()
    });
    violation("fields with a defaultValue must set isOptional: true", &keys)
}

/// Whether `value` has the shape a default of `field_type` must have.
/// Unknown types accept anything.
pub fn default_matches_type(field_type: &FieldType, value: &Value) -> bool {
    match field_type {
        FieldType::Boolean => value.is_boolean(),
        FieldType::Unknown(_) => true,
        _ if field_type.is_string_like() => value.is_string(),
        _ => true,
    }
}

fn default_value_type(input: &RuleInput<'_>) -> Result<(), CheckError> {
    let keys = offending_keys(input.manifest.form_variables(), |f| {
        f.default_value
            .as_ref()
            .is_some_and(|v| !default_matches_type(&f.field_type, v))
    });
    violation("defaultValue does not match the field type", &keys)
}

fn optional_default(input: &RuleInput<'_>) -> Result<(), CheckError> {
    let keys = offending_keys(input.manifest.form_variables(), |f| {
        f.is_optional() && f.default_value.is_none()
    });
    violation("optional fields must declare a defaultValue", &keys)
}

fn secret_type(input: &RuleInput<'_>) -> Result<(), CheckError> {
    let keys = offending_keys(input.manifest.form_variables(), |f| {
        f.is_secret() && f.field_type != FieldType::String
    });
    violation("secret fields must be of type string", &keys)
}

fn dynamic_options(input: &RuleInput<'_>) -> Result<(), CheckError> {
    let fields = input.manifest.form_variables();
    let stray = offending_keys(fields, |f| {
        f.dynamic_options.is_some() && f.field_type != FieldType::DynamicEnum
    });
    violation("dynamicOptions is only allowed on dynamicEnum fields", &stray)?;
    let missing = offending_keys(fields, |f| {
        f.field_type == FieldType::DynamicEnum && f.dynamic_options.is_none()
    });
    violation("dynamicEnum fields must declare dynamicOptions", &missing)
}

fn capabilities(input: &RuleInput<'_>) -> Result<(), CheckError> {
    let raw = &input.loaded.raw;
    let has_capabilities = raw.get("capabilities").is_some_and(|c| !c.is_null());
    let has_other = raw
        .get("otherCapabilities")
        .and_then(Value::as_array)
        .is_some_and(|c| !c.is_empty());
    if !has_capabilities && !has_other {
        return Err(CheckError::RuleViolation(
            "manifest declares neither capabilities nor otherCapabilities".to_string(),
        ));
    }
    Ok(())
}

fn enum_default_allowed(input: &RuleInput<'_>) -> Result<(), CheckError> {
    let keys = offending_keys(input.manifest.form_variables(), |f| {
        if f.field_type != FieldType::Enum {
            return false;
        }
        match (&f.allowed_values, &f.default_value) {
            (Some(allowed), Some(Value::String(default))) => !allowed.contains(default),
            _ => false,
        }
    });
    violation("enum defaultValue is not one of allowedValues", &keys)
}

fn unique_keys(input: &RuleInput<'_>) -> Result<(), CheckError> {
    let mut seen = HashSet::new();
    let mut duplicates: Vec<&str> = Vec::new();
    for field in input.manifest.form_variables() {
        if !seen.insert(field.key.as_str()) && !duplicates.contains(&field.key.as_str()) {
            duplicates.push(&field.key);
        }
    }
    violation("duplicate form variable keys", &duplicates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn schema() -> &'static CompiledSchema {
        CompiledSchema::bundled().unwrap()
    }

    fn loaded(key: &str, raw: Value) -> LoadedManifest {
        LoadedManifest::from_value(key, std::env::temp_dir().join("ifw-rules-none"), raw)
    }

    fn outcome<'a>(outcomes: &'a [CheckOutcome], name: &str) -> &'a CheckOutcome {
        outcomes
            .iter()
            .find(|o| o.check == name)
            .unwrap_or_else(|| panic!("no outcome {name}"))
    }

    fn run(raw: Value) -> Vec<CheckOutcome> {
        RuleEngine::default().check(&loaded("acme", raw), schema())
    }

    #[test]
    fn every_rule_reports() {
        let outcomes = run(json!({"formVariables": []}));
        let names: Vec<_> = outcomes.iter().map(|o| o.check.as_str()).collect();
        assert_eq!(names, rule_names());
        assert_eq!(names.len(), 12);
    }

    #[test]
    fn rules_do_not_short_circuit() {
        let outcomes = run(json!({
            "overview": "No period",
            "formVariables": [{"key": "k", "type": "string", "isSecret": true, "isOptional": true}]
        }));
        assert!(outcome(&outcomes, "schema").result.is_err());
        assert!(outcome(&outcomes, "overviewPeriod").result.is_err());
        assert!(outcome(&outcomes, "optionalDefault").result.is_err());
        assert!(outcome(&outcomes, "capabilities").result.is_err());
        assert!(outcome(&outcomes, "secretType").result.is_ok());
    }

    #[test]
    fn boolean_field_with_string_default() {
        let outcomes = run(json!({
            "formVariables": [
                {"key": "notify", "type": "boolean", "isOptional": true, "defaultValue": "true"}
            ]
        }));
        let err = outcome(&outcomes, "defaultValueType").result.clone().unwrap_err();
        assert!(matches!(err, CheckError::RuleViolation(ref m) if m.contains("notify")));
        assert!(outcome(&outcomes, "defaultValueOptional").result.is_ok());
    }

    #[test]
    fn string_like_defaults_must_be_strings() {
        assert!(default_matches_type(&FieldType::Uri, &json!("https://x.com")));
        assert!(!default_matches_type(&FieldType::Enum, &json!(3)));
        assert!(!default_matches_type(&FieldType::String, &Value::Null));
        assert!(default_matches_type(&FieldType::Boolean, &json!(false)));
        assert!(default_matches_type(&FieldType::Unknown("x".into()), &json!([])));
    }

    #[test]
    fn default_without_optional() {
        let outcomes = run(json!({
            "formVariables": [{"key": "channel", "type": "string", "defaultValue": "#ops"}]
        }));
        assert!(matches!(
            &outcome(&outcomes, "defaultValueOptional").result,
            Err(CheckError::RuleViolation(m)) if m.ends_with(": channel")
        ));
    }

    #[test]
    fn explicit_null_default_counts_as_defined() {
        let outcomes = run(json!({
            "formVariables": [{"key": "k", "type": "string", "isOptional": true, "defaultValue": null}]
        }));
        assert!(outcome(&outcomes, "optionalDefault").result.is_ok());
        assert!(outcome(&outcomes, "defaultValueType").result.is_err());
    }

    #[test]
    fn oauth_requires_allow_list_entry() {
        let raw = json!({"requiresOAuth": true, "otherCapabilities": ["sso"]});

        let outcomes = RuleEngine::default().check(&loaded("acme", raw.clone()), schema());
        assert!(matches!(
            &outcome(&outcomes, "oauthAllowList").result,
            Err(CheckError::RuleViolation(m)) if m.contains("allow-list")
        ));

        let engine = RuleEngine::new(BTreeSet::from(["acme".to_string()]));
        let outcomes = engine.check(&loaded("acme", raw), schema());
        assert!(outcome(&outcomes, "oauthAllowList").result.is_ok());
    }

    #[test]
    fn secret_must_be_string() {
        let outcomes = run(json!({
            "formVariables": [{"key": "token", "type": "uri", "isSecret": true}]
        }));
        assert!(outcome(&outcomes, "secretType").result.is_err());
    }

    #[test]
    fn dynamic_options_both_directions() {
        let stray = run(json!({
            "formVariables": [{"key": "a", "type": "enum", "dynamicOptions": {}}]
        }));
        assert!(outcome(&stray, "dynamicOptions").result.is_err());

        let missing = run(json!({"formVariables": [{"key": "b", "type": "dynamicEnum"}]}));
        assert!(outcome(&missing, "dynamicOptions").result.is_err());

        let ok = run(json!({
            "formVariables": [{"key": "c", "type": "dynamicEnum", "dynamicOptions": {"endpoint": {}}}]
        }));
        assert!(outcome(&ok, "dynamicOptions").result.is_ok());
    }

    #[test]
    fn capabilities_or_other_capabilities() {
        assert!(outcome(&run(json!({})), "capabilities").result.is_err());
        assert!(outcome(&run(json!({"otherCapabilities": []})), "capabilities")
            .result
            .is_err());
        assert!(outcome(&run(json!({"otherCapabilities": ["sso"]})), "capabilities")
            .result
            .is_ok());
        assert!(outcome(&run(json!({"capabilities": {"trigger": {}}})), "capabilities")
            .result
            .is_ok());
    }

    #[test]
    fn enum_default_checked_against_allowed_values() {
        let outcomes = run(json!({
            "formVariables": [
                {"key": "region", "type": "enum", "isOptional": true,
                 "defaultValue": "apac", "allowedValues": ["us", "eu"]},
                {"key": "tier", "type": "enum", "isOptional": true,
                 "defaultValue": "gold", "allowedValues": ["gold"]}
            ]
        }));
        assert!(matches!(
            &outcome(&outcomes, "enumDefaultAllowed").result,
            Err(CheckError::RuleViolation(m)) if m.ends_with(": region")
        ));
    }

    #[test]
    fn duplicate_keys_reported_once() {
        let outcomes = run(json!({
            "formVariables": [
                {"key": "a", "type": "string"},
                {"key": "a", "type": "string"},
                {"key": "a", "type": "string"},
                {"key": "b", "type": "string"}
            ]
        }));
        assert!(matches!(
            &outcome(&outcomes, "uniqueKeys").result,
            Err(CheckError::RuleViolation(m)) if m.ends_with(": a")
        ));
    }

    #[test]
    fn icons_must_exist() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("assets")).unwrap();
        std::fs::write(tmp.path().join("assets/square.svg"), "<svg/>").unwrap();
        let raw = json!({"icons": {"square": "assets/square.svg", "rectangular": "assets/rect.svg"}});
        let loaded = LoadedManifest::from_value("acme", tmp.path(), raw);

        let outcomes = RuleEngine::default().check(&loaded, schema());
        match &outcome(&outcomes, "icons").result {
            Err(CheckError::MissingAsset { what, .. }) => assert_eq!(what, "rectangular icon"),
            other => panic!("expected MissingAsset, got {other:?}"),
        }
    }

    #[test]
    fn non_object_manifest_runs_schema_only() {
        let outcomes = run(json!([1, 2]));
        let names: Vec<_> = outcomes.iter().map(|o| o.check.as_str()).collect();
        assert_eq!(names, vec![SCHEMA_RULE, MANIFEST_CHECK]);
        assert!(matches!(
            outcomes[1].result,
            Err(CheckError::ManifestLoad(_))
        ));
        assert!(outcomes[0].result.is_err());
    }

    #[test]
    fn ill_typed_field_does_not_hide_other_rules() {
        let outcomes = run(json!({
            "overview": "No period",
            "requiresOAuth": true,
            "formVariables": [{"key": "a", "type": "string", "isOptional": "yes"}]
        }));
        for name in rule_names() {
            outcome(&outcomes, name);
        }
        assert_eq!(outcomes.len(), rule_names().len() + 1);
        assert!(outcome(&outcomes, "schema").result.is_err());
        assert!(matches!(
            &outcome(&outcomes, MANIFEST_CHECK).result,
            Err(CheckError::ManifestLoad(m)) if m.contains("formVariables[0].isOptional")
        ));
        assert!(outcome(&outcomes, "overviewPeriod").result.is_err());
        assert!(matches!(
            &outcome(&outcomes, "oauthAllowList").result,
            Err(CheckError::RuleViolation(m)) if m.contains("allow-list")
        ));
    }

    #[test]
    fn ill_typed_list_still_reaches_every_rule() {
        let outcomes = run(json!({"formVariables": "not a list", "otherCapabilities": ["sso"]}));
        assert_eq!(outcomes.len(), rule_names().len() + 1);
        assert!(outcome(&outcomes, MANIFEST_CHECK).result.is_err());
        assert!(outcome(&outcomes, "uniqueKeys").result.is_ok());
        assert!(outcome(&outcomes, "capabilities").result.is_ok());
    }

    #[test]
    fn ill_typed_oauth_flag_is_treated_as_requested() {
        let outcomes = run(json!({"requiresOAuth": "yes", "otherCapabilities": ["sso"]}));
        assert!(outcome(&outcomes, "oauthAllowList").result.is_err());
        assert!(outcome(&outcomes, MANIFEST_CHECK).result.is_err());
    }

    #[test]
    fn ill_typed_capabilities_still_count_as_declared() {
        let outcomes = run(json!({"capabilities": "webhook"}));
        assert!(outcome(&outcomes, "capabilities").result.is_ok());
        assert!(outcome(&outcomes, MANIFEST_CHECK).result.is_err());
    }

    proptest! {
        #[test]
        fn optional_and_default_pairing(optional in any::<bool>(), has_default in any::<bool>()) {
            let mut field = json!({"key": "k", "type": "string", "isOptional": optional});
            if has_default {
                field["defaultValue"] = json!("v");
            }
            let outcomes = run(json!({"formVariables": [field]}));
            prop_assert_eq!(
                outcome(&outcomes, "defaultValueOptional").result.is_ok(),
                !has_default || optional
            );
            prop_assert_eq!(
                outcome(&outcomes, "optionalDefault").result.is_ok(),
                !optional || has_default
            );
        }
    }
}

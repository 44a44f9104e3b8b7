//! # Integration Manifest Model
//!
//! Typed, read-only view of `manifest.json`. Every integration lives in its
//! own directory under the catalogue root; the directory name is the
//! integration key and every relative path in the manifest (icons, templates)
//! is resolved against that directory.
//!
//! The model deliberately accepts documents the schema would reject: optional
//! everywhere the schema says required, unknown field types preserved as
//! [`FieldType::Unknown`], unknown capability kinds kept as raw JSON. The
//! schema reports structural problems; this model only needs to be good
//! enough for the cross-field rules and template rendering to run.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::ManifestError;

/// File name of the manifest inside each integration directory.
pub const MANIFEST_FILE: &str = "manifest.json";

// ---------------------------------------------------------------------------
// Form variables
// ---------------------------------------------------------------------------

/// Declared type of a form variable.
///
/// The set of types is closed; anything else is carried as `Unknown` with the
/// original name so that loading never fails on a type the framework does not
/// know yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    String,
    Boolean,
    Uri,
    Enum,
    DynamicEnum,
    Unknown(String),
}

impl FieldType {
    /// The manifest spelling of this type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Uri => "uri",
            Self::Enum => "enum",
            Self::DynamicEnum => "dynamicEnum",
            Self::Unknown(name) => name,
        }
    }

    /// Whether values of this type are carried as JSON strings.
    pub fn is_string_like(&self) -> bool {
        matches!(
            self,
            Self::String | Self::Uri | Self::Enum | Self::DynamicEnum
        )
    }
}

impl From<String> for FieldType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "string" => Self::String,
            "boolean" => Self::Boolean,
            "uri" => Self::Uri,
            "enum" => Self::Enum,
            "dynamicEnum" => Self::DynamicEnum,
            _ => Self::Unknown(name),
        }
    }
}

impl From<FieldType> for String {
    fn from(ty: FieldType) -> Self {
        match ty {
            FieldType::Unknown(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `formVariables` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormVariable {
    pub key: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_optional: Option<bool>,
    /// `Some(Value::Null)` when the manifest spells out `"defaultValue": null`.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_secret: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub dynamic_options: Option<Value>,
}

impl FormVariable {
    pub fn is_optional(&self) -> bool {
        self.is_optional.unwrap_or(false)
    }

    pub fn is_secret(&self) -> bool {
        self.is_secret.unwrap_or(false)
    }
}

/// Distinguishes a key spelled out as `null` from an absent key.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Named rendering surface of an audit-log events hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateSurface {
    Flag,
    Project,
    Environment,
    Default,
    Validation,
}

impl TemplateSurface {
    pub const ALL: [TemplateSurface; 5] = [
        Self::Flag,
        Self::Project,
        Self::Environment,
        Self::Default,
        Self::Validation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Project => "project",
            Self::Environment => "environment",
            Self::Default => "default",
            Self::Validation => "validation",
        }
    }

    /// Which sample event payload a template on this surface is rendered with.
    pub fn payload_kind(self) -> PayloadKind {
        match self {
            Self::Flag | Self::Default => PayloadKind::Flag,
            Self::Project => PayloadKind::Project,
            Self::Environment | Self::Validation => PayloadKind::Environment,
        }
    }

    /// Parse a surface name as written in the `templates` mapping.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }
}

impl fmt::Display for TemplateSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of the sample trigger event a context is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Flag,
    Project,
    Environment,
}

impl PayloadKind {
    pub const ALL: [PayloadKind; 3] = [Self::Flag, Self::Project, Self::Environment];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Project => "project",
            Self::Environment => "environment",
        }
    }
}

/// `capabilities.auditLogEventsHook.templates`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Templates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<String>,
}

impl Templates {
    pub fn get(&self, surface: TemplateSurface) -> Option<&str> {
        match surface {
            TemplateSurface::Flag => self.flag.as_deref(),
            TemplateSurface::Project => self.project.as_deref(),
            TemplateSurface::Environment => self.environment.as_deref(),
            TemplateSurface::Default => self.default.as_deref(),
            TemplateSurface::Validation => self.validation.as_deref(),
        }
    }

    /// Declared `(surface, relative path)` pairs in surface order.
    pub fn declared(&self) -> Vec<(TemplateSurface, &str)> {
        TemplateSurface::ALL
            .into_iter()
            .filter_map(|surface| self.get(surface).map(|path| (surface, path)))
            .collect()
    }
}

/// One outbound header; `value` is a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// `capabilities.auditLogEventsHook.endpoint`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// URL template.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default)]
    pub headers: Vec<Header>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEventsHook {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<Endpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templates: Option<Templates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_policy: Option<Value>,
}

/// Structured capabilities. Kinds other than the audit-log hook are kept raw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_log_events_hook: Option<AuditLogEventsHook>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Icons {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub square: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rectangular: Option<String>,
}

/// Typed view of one `manifest.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Value>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icons: Option<Icons>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_variables: Option<Vec<FormVariable>>,
    #[serde(
        default,
        rename = "requiresOAuth",
        skip_serializing_if = "Option::is_none"
    )]
    pub requires_oauth: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Capabilities>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_capabilities: Option<Vec<String>>,
}

impl Manifest {
    /// Declared form variables, empty when the manifest has none.
    pub fn form_variables(&self) -> &[FormVariable] {
        self.form_variables.as_deref().unwrap_or(&[])
    }

    pub fn requires_oauth(&self) -> bool {
        self.requires_oauth.unwrap_or(false)
    }

    pub fn audit_log_events_hook(&self) -> Option<&AuditLogEventsHook> {
        self.capabilities
            .as_ref()
            .and_then(|c| c.audit_log_events_hook.as_ref())
    }

    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.audit_log_events_hook()
            .and_then(|hook| hook.endpoint.as_ref())
    }

    pub fn templates(&self) -> Option<&Templates> {
        self.audit_log_events_hook()
            .and_then(|hook| hook.templates.as_ref())
    }
}

// ---------------------------------------------------------------------------
// Property-by-property loading
// ---------------------------------------------------------------------------

/// Deserialize `obj[key]` on its own. An ill-typed value is recorded in
/// `issues` as `<path>: <error>` and read as absent.
fn property<T: DeserializeOwned>(
    obj: &Map<String, Value>,
    key: &str,
    prefix: &str,
    issues: &mut Vec<String>,
) -> Option<T> {
    let value = obj.get(key)?;
    match serde_json::from_value::<Option<T>>(value.clone()) {
        Ok(parsed) => parsed,
        Err(e) => {
            issues.push(format!("{prefix}{key}: {e}"));
            None
        }
    }
}

impl FormVariable {
    /// Build the field at `formVariables[index]` one property at a time.
    ///
    /// Returns `None` (with an issue) only when the entry is not an object or
    /// has no string `key` and `type`.
    fn from_value_lenient(value: &Value, index: usize, issues: &mut Vec<String>) -> Option<Self> {
        let prefix = format!("formVariables[{index}].");
        let Value::Object(obj) = value else {
            issues.push(format!("formVariables[{index}]: expected an object"));
            return None;
        };
        let key = obj.get("key").and_then(Value::as_str);
        let field_type = obj.get("type").and_then(Value::as_str);
        let (Some(key), Some(field_type)) = (key, field_type) else {
            issues.push(format!("formVariables[{index}]: key and type must be strings"));
            return None;
        };

        Some(Self {
            key: key.to_string(),
            field_type: FieldType::from(field_type.to_string()),
            name: property(obj, "name", &prefix, issues),
            description: property(obj, "description", &prefix, issues),
            placeholder: property(obj, "placeholder", &prefix, issues),
            is_optional: property(obj, "isOptional", &prefix, issues),
            default_value: obj.get("defaultValue").cloned(),
            is_secret: property(obj, "isSecret", &prefix, issues),
            allowed_values: property(obj, "allowedValues", &prefix, issues),
            dynamic_options: obj.get("dynamicOptions").cloned(),
        })
    }
}

impl Manifest {
    /// Build the typed model one property at a time.
    ///
    /// A property that does not fit is left out and described in the
    /// returned issue list, so one bad value never hides the rest of the
    /// document. Fails only when `raw` is not a JSON object.
    pub fn from_value_lenient(raw: &Value) -> Result<(Self, Vec<String>), String> {
        let Value::Object(obj) = raw else {
            return Err("manifest must be a JSON object".to_string());
        };
        let mut issues = Vec::new();

        let icons = match obj.get("icons") {
            Some(Value::Object(icons)) => Some(Icons {
                square: property(icons, "square", "icons.", &mut issues),
                rectangular: property(icons, "rectangular", "icons.", &mut issues),
            }),
            Some(Value::Null) | None => None,
            Some(_) => {
                issues.push("icons: expected an object".to_string());
                None
            }
        };

        let form_variables = match obj.get("formVariables") {
            Some(Value::Array(items)) => Some(
                items
                    .iter()
                    .enumerate()
                    .filter_map(|(i, item)| FormVariable::from_value_lenient(item, i, &mut issues))
                    .collect(),
            ),
            Some(Value::Null) | None => None,
            Some(_) => {
                issues.push("formVariables: expected an array".to_string());
                None
            }
        };

        let capabilities = match obj.get("capabilities") {
            Some(Value::Object(caps)) => Some(Capabilities {
                audit_log_events_hook: property(
                    caps,
                    "auditLogEventsHook",
                    "capabilities.",
                    &mut issues,
                ),
                other: caps
                    .iter()
                    .filter(|(k, _)| k.as_str() != "auditLogEventsHook")
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            }),
            Some(Value::Null) | None => None,
            Some(_) => {
                issues.push("capabilities: expected an object".to_string());
                None
            }
        };

        let manifest = Self {
            name: property(obj, "name", "", &mut issues),
            version: property(obj, "version", "", &mut issues),
            overview: property(obj, "overview", "", &mut issues),
            description: property(obj, "description", "", &mut issues),
            author: property(obj, "author", "", &mut issues),
            support_email: property(obj, "supportEmail", "", &mut issues),
            links: obj.get("links").filter(|v| !v.is_null()).cloned(),
            categories: property(obj, "categories", "", &mut issues).unwrap_or_default(),
            icons,
            form_variables,
            requires_oauth: property(obj, "requiresOAuth", "", &mut issues),
            capabilities,
            other_capabilities: property(obj, "otherCapabilities", "", &mut issues),
        };
        Ok((manifest, issues))
    }
}

/// A manifest read from disk: the raw document for schema validation plus
/// the typed model, or the reason the typed model could not be built.
#[derive(Debug, Clone)]
pub struct LoadedManifest {
    /// Integration key (directory name).
    pub key: String,
    /// Integration directory; base for every relative path in the manifest.
    pub dir: PathBuf,
    /// The document exactly as parsed.
    pub raw: Value,
    /// Typed model, or why the document has no typed view at all.
    pub model: Result<Manifest, String>,
    /// Properties left out of the typed model because they are ill-typed.
    pub issues: Vec<String>,
}

impl LoadedManifest {
    /// Build from an already-parsed document.
    pub fn from_value(key: impl Into<String>, dir: impl Into<PathBuf>, raw: Value) -> Self {
        let (model, issues) = match Manifest::from_value_lenient(&raw) {
            Ok((manifest, issues)) => (Ok(manifest), issues),
            Err(reason) => (Err(reason), Vec::new()),
        };
        Self {
            key: key.into(),
            dir: dir.into(),
            raw,
            model,
            issues,
        }
    }

    /// Resolve a manifest-relative path against the integration directory.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.dir.join(relative)
    }
}

/// Read `manifest.json` from an integration directory.
///
/// Fails only when the file cannot be read or is not JSON. A document that
/// parses but does not fit the typed model still loads; see
/// [`LoadedManifest::model`].
pub fn load_manifest(dir: &Path) -> Result<LoadedManifest, ManifestError> {
    let key = dir
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ManifestError::NoKey(dir.to_path_buf()))?
        .to_string();

    let path = dir.join(MANIFEST_FILE);
    let content = std::fs::read_to_string(&path).map_err(|source| ManifestError::Read {
        path: path.clone(),
        source,
    })?;
    let raw: Value =
        serde_json::from_str(&content).map_err(|source| ManifestError::Parse { path, source })?;

    Ok(LoadedManifest::from_value(key, dir, raw))
}

//! Sample trigger-event payloads.
//!
//! One representative audit-log event per [`PayloadKind`], used verbatim as
//! the non-field part of every rendering context. The bundled set is
//! embedded at compile time; a directory containing files with the same
//! names can be loaded instead.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use ifw_core::PayloadKind;
use serde_json::Value;
use thiserror::Error;

const BUNDLED_FLAG: &str = include_str!("../fixtures/flag-update.json");
const BUNDLED_PROJECT: &str = include_str!("../fixtures/project-update.json");
const BUNDLED_ENVIRONMENT: &str = include_str!("../fixtures/environment-update.json");

static BUNDLED: OnceLock<Result<SamplePayloads, String>> = OnceLock::new();

#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("failed to read payload {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("payload {name} is not valid JSON: {reason}")]
    Parse { name: String, reason: String },

    #[error("payload {0} must be a JSON object")]
    NotAnObject(String),
}

/// File name a payload of the given kind is stored under.
pub fn payload_file_name(kind: PayloadKind) -> &'static str {
    match kind {
        PayloadKind::Flag => "flag-update.json",
        PayloadKind::Project => "project-update.json",
        PayloadKind::Environment => "environment-update.json",
    }
}

/// The three sample events. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplePayloads {
    flag: Value,
    project: Value,
    environment: Value,
}

impl SamplePayloads {
    /// Build from explicit values. Each must be a JSON object.
    pub fn new(flag: Value, project: Value, environment: Value) -> Result<Self, PayloadError> {
        for (kind, value) in [
            (PayloadKind::Flag, &flag),
            (PayloadKind::Project, &project),
            (PayloadKind::Environment, &environment),
        ] {
            if !value.is_object() {
                return Err(PayloadError::NotAnObject(kind.as_str().to_string()));
            }
        }
        Ok(Self {
            flag,
            project,
            environment,
        })
    }

    /// The payloads embedded in the crate, parsed on first use.
    pub fn bundled() -> Result<&'static SamplePayloads, PayloadError> {
        BUNDLED
            .get_or_init(|| Self::parse_bundled().map_err(|e| e.to_string()))
            .as_ref()
            .map_err(|reason| PayloadError::Parse {
                name: "bundled payloads".to_string(),
                reason: reason.clone(),
            })
    }

    fn parse_bundled() -> Result<Self, PayloadError> {
        let parse = |name: &str, src: &str| {
            serde_json::from_str::<Value>(src).map_err(|e| PayloadError::Parse {
                name: name.to_string(),
                reason: e.to_string(),
            })
        };
        Self::new(
            parse("flag-update.json", BUNDLED_FLAG)?,
            parse("project-update.json", BUNDLED_PROJECT)?,
            parse("environment-update.json", BUNDLED_ENVIRONMENT)?,
        )
    }

    /// Load `flag-update.json`, `project-update.json` and
    /// `environment-update.json` from `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self, PayloadError> {
        let load = |kind: PayloadKind| -> Result<Value, PayloadError> {
            let path = dir.join(payload_file_name(kind));
            let content = std::fs::read_to_string(&path)
                .map_err(|source| PayloadError::Read { path: path.clone(), source })?;
            serde_json::from_str(&content).map_err(|e| PayloadError::Parse {
                name: path.display().to_string(),
                reason: e.to_string(),
            })
        };
        Self::new(
            load(PayloadKind::Flag)?,
            load(PayloadKind::Project)?,
            load(PayloadKind::Environment)?,
        )
    }

    pub fn get(&self, kind: PayloadKind) -> &Value {
        match kind {
            PayloadKind::Flag => &self.flag,
            PayloadKind::Project => &self.project,
            PayloadKind::Environment => &self.environment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bundled_payloads_parse_and_are_shared() {
        let a = SamplePayloads::bundled().unwrap();
        let b = SamplePayloads::bundled().unwrap();
        assert!(std::ptr::eq(a, b));
        assert_eq!(a.get(PayloadKind::Flag)["kind"], "flag");
        assert_eq!(a.get(PayloadKind::Project)["kind"], "project");
        assert_eq!(a.get(PayloadKind::Environment)["kind"], "environment");
    }

    #[test]
    fn bundled_flag_payload_has_characters_that_need_escaping() {
        let flag = SamplePayloads::bundled().unwrap().get(PayloadKind::Flag);
        let comment = flag["comment"].as_str().unwrap();
        assert!(comment.contains('"'));
        assert!(comment.contains('\n'));
    }

    #[test]
    fn new_rejects_non_objects() {
        let err = SamplePayloads::new(json!({}), json!([]), json!({})).unwrap_err();
        assert!(matches!(err, PayloadError::NotAnObject(kind) if kind == "project"));
    }

    #[test]
    fn from_dir_loads_all_three() {
        let tmp = tempfile::tempdir().unwrap();
        for kind in PayloadKind::ALL {
            std::fs::write(
                tmp.path().join(payload_file_name(kind)),
                format!(r#"{{"kind": "{}"}}"#, kind.as_str()),
            )
            .unwrap();
        }
        let payloads = SamplePayloads::from_dir(tmp.path()).unwrap();
        assert_eq!(payloads.get(PayloadKind::Environment), &json!({"kind": "environment"}));
    }

    #[test]
    fn from_dir_reports_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let err = SamplePayloads::from_dir(tmp.path()).unwrap_err();
        assert!(matches!(err, PayloadError::Read { .. }));
    }
}

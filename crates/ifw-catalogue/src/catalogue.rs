//! # Catalogue Validation
//!
//! Runs every check against every integration:
//!
//! 1. Load `manifest.json` (a missing file or a read/parse failure is one
//!    `manifest` outcome).
//! 2. Schema and manifest rules ([`crate::rules`]).
//! 3. Template and endpoint verification, when the typed model is available.
//!
//! Integrations are independent. Whole-catalogue runs spread them over a
//! scoped worker pool; all shared state (schema, rules, verifier) is
//! read-only.

use std::path::{Path, PathBuf};

use ifw_core::{load_manifest, CheckError, MANIFEST_FILE};
use ifw_render::{SamplePayloads, TemplateVerifier};
use ifw_schema::{CompiledSchema, SchemaRegistry, MANIFEST_SCHEMA_FILE};

use crate::config::CatalogueConfig;
use crate::discovery::discover;
use crate::error::CatalogueError;
use crate::report::{CatalogueReport, CheckOutcome, IntegrationReport};
use crate::rules::{RuleEngine, MANIFEST_CHECK};

/// The manifest schema in use: bundled, or compiled from a schema directory.
#[derive(Debug)]
pub enum ManifestSchema {
    Bundled(&'static CompiledSchema),
    Compiled(CompiledSchema),
}

impl ManifestSchema {
    pub fn bundled() -> Result<Self, CatalogueError> {
        Ok(Self::Bundled(CompiledSchema::bundled()?))
    }

    /// Compile `manifest.schema.json` from `dir`, resolving `$ref`s locally.
    pub fn from_dir(dir: &Path) -> Result<Self, CatalogueError> {
        let registry = SchemaRegistry::new(dir)?;
        tracing::info!(
            schema_count = registry.schema_count(),
            schema_dir = %dir.display(),
            "loaded schema registry"
        );
        Ok(Self::Compiled(registry.compile(MANIFEST_SCHEMA_FILE)?))
    }

    pub fn get(&self) -> &CompiledSchema {
        match self {
            Self::Bundled(schema) => schema,
            Self::Compiled(schema) => schema,
        }
    }
}

#[derive(Debug)]
pub struct CatalogueValidator {
    integrations_dir: PathBuf,
    schema: ManifestSchema,
    rules: RuleEngine,
    verifier: TemplateVerifier,
    workers: usize,
}

impl CatalogueValidator {
    pub fn new(
        integrations_dir: impl Into<PathBuf>,
        schema: ManifestSchema,
        rules: RuleEngine,
        verifier: TemplateVerifier,
    ) -> Self {
        Self {
            integrations_dir: integrations_dir.into(),
            schema,
            rules,
            verifier,
            workers: 1,
        }
    }

    /// Build a validator from resolved configuration.
    pub fn from_config(config: &CatalogueConfig) -> Result<Self, CatalogueError> {
        let schema = match &config.schema_dir {
            Some(dir) => ManifestSchema::from_dir(dir)?,
            None => ManifestSchema::bundled()?,
        };
        let payloads = match &config.payloads_dir {
            Some(dir) => SamplePayloads::from_dir(dir)?,
            None => SamplePayloads::bundled()?.clone(),
        };

        Ok(Self::new(
            config.integrations_dir.clone(),
            schema,
            RuleEngine::new(config.oauth_allow_list.clone()),
            TemplateVerifier::new(payloads),
        )
        .with_workers(config.worker_count()))
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn integrations_dir(&self) -> &Path {
        &self.integrations_dir
    }

    pub fn verifier(&self) -> &TemplateVerifier {
        &self.verifier
    }

    /// Directory of the integration with the given key.
    pub fn integration_dir(&self, key: &str) -> PathBuf {
        self.integrations_dir.join(key)
    }

    /// Every outcome for the integration in `dir`. Never fails; problems
    /// are outcomes.
    pub fn validate_integration(&self, dir: &Path) -> IntegrationReport {
        let key = dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        let manifest_path = dir.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            tracing::warn!(integration = %key, "no manifest.json");
            return IntegrationReport {
                key,
                dir: dir.to_path_buf(),
                outcomes: vec![CheckOutcome::new(
                    MANIFEST_CHECK,
                    Err(CheckError::MissingAsset {
                        what: "manifest".to_string(),
                        path: manifest_path,
                    }),
                )],
            };
        }

        let loaded = match load_manifest(dir) {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::warn!(integration = %key, error = %e, "failed to load manifest");
                return IntegrationReport {
                    key,
                    dir: dir.to_path_buf(),
                    outcomes: vec![CheckOutcome::new(
                        MANIFEST_CHECK,
                        Err(CheckError::ManifestLoad(e.to_string())),
                    )],
                };
            }
        };

        let mut outcomes = self.rules.check(&loaded, self.schema.get());
        if let Ok(manifest) = &loaded.model {
            outcomes.extend(
                self.verifier
                    .verify_manifest(&loaded, manifest)
                    .into_iter()
                    .map(CheckOutcome::from),
            );
        }

        for outcome in &outcomes {
            if let Err(e) = &outcome.result {
                tracing::info!(
                    integration = %loaded.key,
                    check = %outcome.check,
                    kind = e.kind(),
                    error = %e,
                    "check failed"
                );
            }
        }
        tracing::debug!(integration = %loaded.key, checks = outcomes.len(), "validated integration");

        IntegrationReport {
            key: loaded.key,
            dir: loaded.dir,
            outcomes,
        }
    }

    /// Validate every discovered integration. The report is sorted by key.
    pub fn validate_all(&self) -> Result<CatalogueReport, CatalogueError> {
        let dirs = discover(&self.integrations_dir)?;
        let workers = self.workers.min(dirs.len()).max(1);
        tracing::info!(
            integrations = dirs.len(),
            workers,
            root = %self.integrations_dir.display(),
            "validating catalogue"
        );

        let mut per_worker: Vec<Vec<&Path>> = vec![Vec::new(); workers];
        for (i, dir) in dirs.iter().enumerate() {
            per_worker[i % workers].push(dir);
        }

        let reports: Vec<IntegrationReport> = std::thread::scope(|s| {
            let joins: Vec<_> = per_worker
                .iter()
                .map(|assigned| {
                    let handle = s.spawn(move || {
                        assigned
                            .iter()
                            .map(|dir| self.validate_integration(dir))
                            .collect::<Vec<_>>()
                    });
                    (assigned, handle)
                })
                .collect();

            joins
                .into_iter()
                .flat_map(|(assigned, handle)| {
                    handle
                        .join()
                        .unwrap_or_else(|_| assigned.iter().map(|dir| worker_panicked(dir)).collect())
                })
                .collect()
        });

        Ok(CatalogueReport::new(reports))
    }
}

fn worker_panicked(dir: &Path) -> IntegrationReport {
    let key = dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    tracing::error!(integration = %key, "validation worker panicked");
    IntegrationReport {
        key,
        dir: dir.to_path_buf(),
        outcomes: vec![CheckOutcome::new(
            MANIFEST_CHECK,
            Err(CheckError::ManifestLoad("validation worker panicked".to_string())),
        )],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn validator(root: &Path) -> CatalogueValidator {
        CatalogueValidator::new(
            root,
            ManifestSchema::bundled().unwrap(),
            RuleEngine::default(),
            TemplateVerifier::bundled().unwrap(),
        )
    }

    fn write_integration(root: &Path, key: &str, manifest: &Value, files: &[(&str, &str)]) {
        let dir = root.join(key);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("manifest.json"), manifest.to_string()).unwrap();
        for (path, content) in files {
            let path = dir.join(path);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }
    }

    fn valid_manifest(key: &str) -> Value {
        json!({
            "name": key,
            "version": "1.0.0",
            "overview": "Send flag changes somewhere.",
            "description": "Longer description.",
            "author": "Example",
            "supportEmail": "support@example.com",
            "links": {"site": "https://example.com", "privacyPolicy": "https://example.com/privacy"},
            "categories": ["notifications"],
            "icons": {"square": "assets/square.svg", "rectangular": "assets/rect.svg"},
            "formVariables": [{"key": "region", "name": "Region", "type": "enum", "description": "Region."}],
            "capabilities": {"auditLogEventsHook": {
                "endpoint": {"url": "https://example.com/{{region}}", "method": "POST", "headers": []},
                "templates": {"flag": "templates/flag.json.hbs"},
                "defaultPolicy": [{"effect": "allow", "resources": ["proj/*"], "actions": ["*"]}]
            }}
        })
    }

    const ICONS: [(&str, &str); 2] = [("assets/square.svg", "<svg/>"), ("assets/rect.svg", "<svg/>")];

    fn valid_files() -> Vec<(&'static str, &'static str)> {
        let mut files = ICONS.to_vec();
        files.push((
            "templates/flag.json.hbs",
            r#"{"text": "{{title}}", "region": "{{formVariables.region}}"}"#,
        ));
        files
    }

    #[test]
    fn valid_integration_passes_every_check() {
        let tmp = tempfile::tempdir().unwrap();
        write_integration(tmp.path(), "acme", &valid_manifest("acme"), &valid_files());

        let report = validator(tmp.path()).validate_integration(&tmp.path().join("acme"));
        let failing: Vec<_> = report.failures().collect();
        assert!(failing.is_empty(), "unexpected failures: {failing:#?}");
        assert!(report.outcome("template:flag").is_some());
        assert!(report.outcome("endpoint:url").is_some());
    }

    #[test]
    fn unreadable_manifest_is_one_outcome() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("broken");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("manifest.json"), "{ not json").unwrap();

        let report = validator(tmp.path()).validate_integration(&dir);
        assert_eq!(report.key, "broken");
        assert_eq!(report.outcomes.len(), 1);
        assert!(matches!(
            report.outcomes[0].result,
            Err(CheckError::ManifestLoad(_))
        ));
    }

    #[test]
    fn directory_without_manifest_fails_the_catalogue() {
        let tmp = tempfile::tempdir().unwrap();
        write_integration(tmp.path(), "acme", &valid_manifest("acme"), &valid_files());
        std::fs::create_dir_all(tmp.path().join("ghost/assets")).unwrap();

        let report = validator(tmp.path()).validate_all().unwrap();
        assert_eq!(report.total(), 2);
        assert!(!report.is_success());

        let failures = report.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].integration, "ghost");
        assert_eq!(failures[0].check, MANIFEST_CHECK);

        let ghost = &report.integrations[1];
        match &ghost.outcomes[0].result {
            Err(CheckError::MissingAsset { what, path }) => {
                assert_eq!(what, "manifest");
                assert!(path.ends_with("ghost/manifest.json"));
            }
            other => panic!("expected MissingAsset, got {other:?}"),
        }
    }

    #[test]
    fn ill_typed_property_still_renders_templates() {
        let tmp = tempfile::tempdir().unwrap();
        let mut manifest = valid_manifest("acme");
        manifest["formVariables"][0]["isOptional"] = json!("yes");
        write_integration(tmp.path(), "acme", &manifest, &valid_files());

        let report = validator(tmp.path()).validate_integration(&tmp.path().join("acme"));
        assert!(report.outcome(MANIFEST_CHECK).unwrap().result.is_err());
        assert!(report.outcome("overviewPeriod").unwrap().result.is_ok());
        assert!(report.outcome("template:flag").unwrap().result.is_ok());
        assert!(report.outcome("endpoint:url").unwrap().result.is_ok());
    }

    #[test]
    fn failures_in_one_integration_do_not_affect_others() {
        let tmp = tempfile::tempdir().unwrap();
        for key in ["alpha", "gamma"] {
            write_integration(tmp.path(), key, &valid_manifest(key), &valid_files());
        }
        let mut bad = valid_manifest("beta");
        bad["overview"] = json!("No period");
        write_integration(
            tmp.path(),
            "beta",
            &bad,
            &[("assets/square.svg", "<svg/>"), ("templates/flag.json.hbs", "{{nope}}")],
        );

        let report = validator(tmp.path()).with_workers(3).validate_all().unwrap();
        let keys: Vec<_> = report.integrations.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["alpha", "beta", "gamma"]);
        assert_eq!(report.passed(), 2);
        assert_eq!(report.failed(), 1);

        let checks: Vec<_> = report.failures().iter().map(|f| f.check).collect();
        assert_eq!(checks, vec!["icons", "overviewPeriod", "template:flag"]);
        assert!(report.failures().iter().all(|f| f.integration == "beta"));
    }

    #[test]
    fn worker_count_does_not_change_the_report() {
        let tmp = tempfile::tempdir().unwrap();
        for key in ["a", "b", "c", "d", "e"] {
            write_integration(tmp.path(), key, &valid_manifest(key), &valid_files());
        }
        let v = validator(tmp.path());
        let serial = v.validate_all().unwrap().to_json();
        let v = v.with_workers(4);
        let parallel = v.validate_all().unwrap().to_json();
        assert_eq!(serial, parallel);
    }

    #[test]
    fn empty_catalogue() {
        let tmp = tempfile::tempdir().unwrap();
        let report = validator(tmp.path()).validate_all().unwrap();
        assert_eq!(report.total(), 0);
        assert!(report.is_success());
    }

    #[test]
    fn missing_integrations_dir_is_operational_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = validator(&tmp.path().join("missing")).validate_all().unwrap_err();
        assert!(matches!(err, CatalogueError::IntegrationsDirNotFound(_)));
    }

    #[test]
    fn from_config_uses_schema_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let schemas = tmp.path().join("schemas");
        std::fs::create_dir(&schemas).unwrap();
        std::fs::write(
            schemas.join(MANIFEST_SCHEMA_FILE),
            r#"{"$schema": "https://json-schema.org/draft/2020-12/schema", "type": "object", "required": ["name"]}"#,
        )
        .unwrap();

        let config = CatalogueConfig {
            integrations_dir: tmp.path().join("integrations"),
            schema_dir: Some(schemas),
            ..CatalogueConfig::default()
        };
        let v = CatalogueValidator::from_config(&config).unwrap();
        assert!(matches!(v.schema, ManifestSchema::Compiled(_)));
        assert!(v.schema.get().is_valid(&json!({"name": "x"})));
        assert!(!v.schema.get().is_valid(&json!({})));
    }
}

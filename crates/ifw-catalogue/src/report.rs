//! Validation report types.

use std::path::PathBuf;

use ifw_core::CheckError;
use ifw_render::TemplateCheck;
use serde_json::{json, Value};

/// Result of one named check against one integration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub check: String,
    pub result: Result<(), CheckError>,
}

impl CheckOutcome {
    pub fn new(check: impl Into<String>, result: Result<(), CheckError>) -> Self {
        Self {
            check: check.into(),
            result,
        }
    }

    pub fn passed(&self) -> bool {
        self.result.is_ok()
    }
}

impl From<TemplateCheck> for CheckOutcome {
    fn from(check: TemplateCheck) -> Self {
        Self {
            check: check.name,
            result: check.result,
        }
    }
}

/// Every outcome for one integration, in evaluation order.
#[derive(Debug, Clone)]
pub struct IntegrationReport {
    /// Integration key (directory name).
    pub key: String,
    pub dir: PathBuf,
    pub outcomes: Vec<CheckOutcome>,
}

impl IntegrationReport {
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(CheckOutcome::passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.outcomes.iter().filter(|o| !o.passed())
    }

    pub fn outcome(&self, check: &str) -> Option<&CheckOutcome> {
        self.outcomes.iter().find(|o| o.check == check)
    }
}

/// A failing check, flattened for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Failure<'a> {
    pub integration: &'a str,
    pub check: &'a str,
    pub error: &'a CheckError,
}

/// Result of validating a whole catalogue. Integrations are sorted by key.
#[derive(Debug, Clone, Default)]
pub struct CatalogueReport {
    pub integrations: Vec<IntegrationReport>,
}

impl CatalogueReport {
    pub fn new(mut integrations: Vec<IntegrationReport>) -> Self {
        integrations.sort_by(|a, b| a.key.cmp(&b.key));
        Self { integrations }
    }

    /// Number of integrations validated.
    pub fn total(&self) -> usize {
        self.integrations.len()
    }

    /// Integrations with no failing check.
    pub fn passed(&self) -> usize {
        self.integrations.iter().filter(|r| r.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.passed()
    }

    pub fn total_checks(&self) -> usize {
        self.integrations.iter().map(|r| r.outcomes.len()).sum()
    }

    pub fn is_success(&self) -> bool {
        self.integrations.iter().all(IntegrationReport::passed)
    }

    /// Every failing `(integration, check, error)` triple.
    pub fn failures(&self) -> Vec<Failure<'_>> {
        self.integrations
            .iter()
            .flat_map(|r| {
                r.failures().filter_map(move |o| {
                    o.result.as_ref().err().map(|error| Failure {
                        integration: &r.key,
                        check: &o.check,
                        error,
                    })
                })
            })
            .collect()
    }

    pub fn integration(&self, key: &str) -> Option<&IntegrationReport> {
        self.integrations.iter().find(|r| r.key == key)
    }

    /// Machine-readable summary.
    pub fn to_json(&self) -> Value {
        let failures: Vec<Value> = self
            .failures()
            .into_iter()
            .map(|f| {
                json!({
                    "integration": f.integration,
                    "check": f.check,
                    "kind": f.error.kind(),
                    "message": f.error.to_string(),
                })
            })
            .collect();

        json!({
            "total": self.total(),
            "passed": self.passed(),
            "failed": self.failed(),
            "checks": self.total_checks(),
            "failures": failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(key: &str, outcomes: Vec<CheckOutcome>) -> IntegrationReport {
        IntegrationReport {
            key: key.to_string(),
            dir: PathBuf::from(key),
            outcomes,
        }
    }

    fn sample() -> CatalogueReport {
        CatalogueReport::new(vec![
            report(
                "zeta",
                vec![
                    CheckOutcome::new("schema", Ok(())),
                    CheckOutcome::new("overviewPeriod", Err(CheckError::RuleViolation("x".into()))),
                ],
            ),
            report("alpha", vec![CheckOutcome::new("schema", Ok(()))]),
            report(
                "mid",
                vec![CheckOutcome::new(
                    "template:validation",
                    Err(CheckError::EmptyValidationOutput),
                )],
            ),
        ])
    }

    #[test]
    fn sorted_and_counted() {
        let r = sample();
        let keys: Vec<_> = r.integrations.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["alpha", "mid", "zeta"]);
        assert_eq!(r.total(), 3);
        assert_eq!(r.passed(), 1);
        assert_eq!(r.failed(), 2);
        assert_eq!(r.total_checks(), 4);
        assert!(!r.is_success());
    }

    #[test]
    fn failure_triples() {
        let r = sample();
        let failures = r.failures();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].integration, "mid");
        assert_eq!(failures[0].check, "template:validation");
        assert_eq!(failures[0].error, &CheckError::EmptyValidationOutput);
        assert_eq!(failures[1].check, "overviewPeriod");
    }

    #[test]
    fn json_summary() {
        let v = sample().to_json();
        assert_eq!(v["total"], 3);
        assert_eq!(v["failures"][0]["kind"], "EmptyValidationOutput");
        assert_eq!(v["failures"][1]["integration"], "zeta");
    }

    #[test]
    fn empty_catalogue_is_success() {
        let r = CatalogueReport::default();
        assert!(r.is_success());
        assert_eq!(r.failed(), 0);
    }
}

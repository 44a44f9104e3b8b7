//! # ifw-catalogue — Integration Catalogue Validation
//!
//! Discovers every integration under the catalogue root and runs the full
//! battery of checks against each one:
//!
//! - JSON Schema validation of the raw manifest.
//! - Cross-field manifest rules ([`rules`]).
//! - Strict rendering of every declared template and endpoint template.
//!
//! Results are collected, never short-circuited: a [`CatalogueReport`]
//! holds one outcome per (integration, check) pair.
//!
//! ```no_run
//! use ifw_catalogue::{CatalogueConfig, CatalogueValidator};
//!
//! let config = CatalogueConfig::load(std::path::Path::new("."), None)?;
//! let report = CatalogueValidator::from_config(&config)?.validate_all()?;
//! println!("Integrations: {}/{} passed", report.passed(), report.total());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod catalogue;
pub mod config;
pub mod discovery;
pub mod error;
pub mod report;
pub mod rules;

pub use catalogue::{CatalogueValidator, ManifestSchema};
pub use config::{CatalogueConfig, ConfigError, CONFIG_FILE};
pub use discovery::discover;
pub use error::CatalogueError;
pub use report::{CatalogueReport, CheckOutcome, Failure, IntegrationReport};
pub use rules::{rule_names, RuleEngine};

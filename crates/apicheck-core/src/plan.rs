//! Dry run plan types and config validation
//!
//! Describes what a run *would* do without sending any requests.
//! Used for pre-flight validation and CI previews.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config::{Config, MAX_TRANSPORT_RETRIES};
use crate::fixture::Fixtures;

// ── Plan types ──

/// Complete dry run plan: scenarios, call counts, and config checks.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DryRunPlan {
    pub scenarios: Vec<ScenarioPlan>,
    /// Total network calls that would be issued (first attempts only)
    pub total_calls: u64,
    pub validations: Vec<Validation>,
}

/// Execution plan for a single scenario.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScenarioPlan {
    pub name: String,
    pub endpoint: String,
    pub calls: u32,
    /// Scenario timeout in milliseconds
    pub budget_ms: u64,
}

/// A validation check result.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Validation {
    pub check: String,
    pub status: ValidationStatus,
    pub message: String,
}

/// Status of a validation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Ok,
    Warning,
    Error,
}

impl std::fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

fn check(name: &str, status: ValidationStatus, message: String) -> Validation {
    Validation {
        check: name.into(),
        status,
        message,
    }
}

// ── Config validation ──

/// Validate config and fixture source.
#[must_use]
pub fn validate_config(config: &Config) -> Vec<Validation> {
    let mut checks = Vec::new();

    if config.base_url.starts_with("http://") || config.base_url.starts_with("https://") {
        checks.push(check(
            "base_url",
            ValidationStatus::Ok,
            format!("base_url: {}", config.base_url),
        ));
    } else {
        checks.push(check(
            "base_url",
            ValidationStatus::Error,
            format!(
                "base_url: {} (missing http:// or https:// prefix)",
                config.base_url
            ),
        ));
    }

    match Fixtures::load(&config.fixtures).and_then(|f| f.user_id()) {
        Ok(id) => checks.push(check(
            "fixtures",
            ValidationStatus::Ok,
            format!("fixtures: {} (id = {id})", config.fixtures.display()),
        )),
        Err(e) => checks.push(check(
            "fixtures",
            ValidationStatus::Error,
            format!("fixtures: {e}"),
        )),
    }

    if config.response_time_limit_ms == 0 {
        checks.push(check(
            "response_time_limit",
            ValidationStatus::Error,
            "response_time_limit_ms: must be greater than 0".into(),
        ));
    } else if config.request_timeout_ms < config.response_time_limit_ms {
        checks.push(check(
            "response_time_limit",
            ValidationStatus::Warning,
            format!(
                "request_timeout_ms ({}) below SLA ({}): slow responses surface as transport failures",
                config.request_timeout_ms, config.response_time_limit_ms
            ),
        ));
    } else {
        checks.push(check(
            "response_time_limit",
            ValidationStatus::Ok,
            format!("response_time_limit_ms: {}", config.response_time_limit_ms),
        ));
    }

    if config.transport_retries > MAX_TRANSPORT_RETRIES {
        checks.push(check(
            "transport_retries",
            ValidationStatus::Warning,
            format!(
                "transport_retries: {} clamped to {MAX_TRANSPORT_RETRIES}",
                config.transport_retries
            ),
        ));
    }

    if config.content_type.trim().is_empty() {
        checks.push(check(
            "content_type",
            ValidationStatus::Error,
            "content_type: empty token".into(),
        ));
    }

    checks
}

// ── Display helpers ──

impl DryRunPlan {
    /// Format as human-readable terminal output.
    #[must_use]
    pub fn to_terminal(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!(
            "Dry run: {} scenarios, {} calls planned\n",
            self.scenarios.len(),
            self.total_calls,
        ));

        let mut endpoint = "";
        for s in &self.scenarios {
            if s.endpoint != endpoint {
                endpoint = &s.endpoint;
                lines.push(format!("{endpoint}:"));
            }
            lines.push(format!(
                "  {} ({} calls, budget {} ms)",
                s.name, s.calls, s.budget_ms
            ));
        }
        lines.push(String::new());

        lines.push("Config validation:".into());
        for v in &self.validations {
            lines.push(format!("  [{}] {}", v.status, v.message));
        }

        lines.join("\n")
    }

    /// Returns true if any validation has Error status.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.validations
            .iter()
            .any(|v| v.status == ValidationStatus::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config_with_fixture(dir: &tempfile::TempDir) -> Config {
        let path = dir.path().join("apiData.json");
        std::fs::write(&path, r#"{"id": 10}"#).unwrap();
        Config {
            base_url: "http://localhost:8080".into(),
            fixtures: path,
            ..Config::default()
        }
    }

    fn status_of(checks: &[Validation], name: &str) -> ValidationStatus {
        checks.iter().find(|c| c.check == name).unwrap().status
    }

    #[test]
    fn valid_config_all_ok() {
        let dir = tempfile::tempdir().unwrap();
        let checks = validate_config(&config_with_fixture(&dir));
        assert!(checks.iter().all(|c| c.status == ValidationStatus::Ok));
        assert!(checks.iter().any(|c| c.message.contains("id = 10")));
    }

    #[test]
    fn bad_base_url_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            base_url: "localhost:8080".into(),
            ..config_with_fixture(&dir)
        };
        assert_eq!(
            status_of(&validate_config(&cfg), "base_url"),
            ValidationStatus::Error
        );
    }

    #[test]
    fn missing_fixture_is_error() {
        let cfg = Config {
            fixtures: PathBuf::from("/nonexistent/apiData.json"),
            ..Config::default()
        };
        assert_eq!(
            status_of(&validate_config(&cfg), "fixtures"),
            ValidationStatus::Error
        );
    }

    #[test]
    fn short_transport_ceiling_warns() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            request_timeout_ms: 1000,
            ..config_with_fixture(&dir)
        };
        assert_eq!(
            status_of(&validate_config(&cfg), "response_time_limit"),
            ValidationStatus::Warning
        );
    }

    #[test]
    fn excessive_retries_warn() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            transport_retries: 9,
            ..config_with_fixture(&dir)
        };
        assert_eq!(
            status_of(&validate_config(&cfg), "transport_retries"),
            ValidationStatus::Warning
        );
    }

    #[test]
    fn plan_terminal_output() {
        let plan = DryRunPlan {
            scenarios: vec![
                ScenarioPlan {
                    name: "existing id is repeatable".into(),
                    endpoint: "/api/test/user/{id}".into(),
                    calls: 2,
                    budget_ms: 10_000,
                },
                ScenarioPlan {
                    name: "gender partition".into(),
                    endpoint: "/api/test/users".into(),
                    calls: 4,
                    budget_ms: 20_000,
                },
            ],
            total_calls: 6,
            validations: vec![check(
                "base_url",
                ValidationStatus::Ok,
                "base_url: http://localhost:8080".into(),
            )],
        };

        let text = plan.to_terminal();
        assert!(text.contains("2 scenarios, 6 calls planned"));
        assert!(text.contains("/api/test/user/{id}:"));
        assert!(text.contains("  gender partition (4 calls, budget 20000 ms)"));
        assert!(text.contains("[OK] base_url: http://localhost:8080"));
        assert!(!plan.has_errors());
    }
}

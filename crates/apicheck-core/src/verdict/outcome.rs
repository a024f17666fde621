//! Scenario outcomes and the run verdict

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{FailureKind, FailureRecord};

/// Pass/fail of one scenario or of the whole run. There is no partial pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum VerdictStatus {
    Pass,
    Fail,
}

impl std::fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

/// Result of one named scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScenarioOutcome {
    pub name: String,
    /// Endpoint group, e.g. `/api/test/user/{id}`
    pub endpoint: String,
    pub status: VerdictStatus,
    /// Network calls the scenario declares
    pub calls: u32,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureRecord>,
}

impl ScenarioOutcome {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.status == VerdictStatus::Pass
    }
}

/// Final verdict with exit code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Verdict {
    pub status: VerdictStatus,
    pub exit_code: i32,
    pub reason: String,
}

impl Verdict {
    /// Combine scenario outcomes.
    ///
    /// PASS requires at least one scenario and every scenario passing.
    /// Exit code is the highest among assertion-type failures (1) and
    /// timeouts (2); transport failures alone yield 3.
    #[must_use]
    pub fn from_outcomes(outcomes: &[ScenarioOutcome]) -> Self {
        if outcomes.is_empty() {
            return Self {
                status: VerdictStatus::Fail,
                exit_code: 3,
                reason: "No scenarios were run".to_string(),
            };
        }

        let failures: Vec<FailureKind> = outcomes
            .iter()
            .filter_map(|o| o.failure.as_ref().map(|f| f.kind))
            .collect();

        if failures.is_empty() {
            return Self {
                status: VerdictStatus::Pass,
                exit_code: 0,
                reason: format!("All {} scenarios passed", outcomes.len()),
            };
        }

        let count = |kind: FailureKind| failures.iter().filter(|k| **k == kind).count();
        let assertion_code = failures
            .iter()
            .filter(|k| **k != FailureKind::Transport)
            .map(|k| k.exit_code())
            .max()
            .unwrap_or(0);
        let exit_code = if assertion_code > 0 {
            assertion_code
        } else {
            FailureKind::Transport.exit_code()
        };

        let mut parts = vec![format!(
            "{} of {} scenarios failed",
            failures.len(),
            outcomes.len()
        )];
        let breakdown: Vec<String> = [
            FailureKind::ContractViolation,
            FailureKind::InvariantViolation,
            FailureKind::SetupFailure,
            FailureKind::Timeout,
            FailureKind::Transport,
        ]
        .into_iter()
        .filter_map(|kind| {
            let n = count(kind);
            (n > 0).then(|| format!("{n} {}", kind.description().to_lowercase()))
        })
        .collect();
        parts.push(format!("({})", breakdown.join(", ")));

        Self {
            status: VerdictStatus::Fail,
            exit_code,
            reason: parts.join(" "),
        }
    }
}

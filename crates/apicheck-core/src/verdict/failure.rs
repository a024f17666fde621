//! Failure taxonomy and structured representation

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::aggregate::{AggregateError, InvariantViolation};

/// Category of a scenario failure - determines exit code and retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Connection, DNS or per-call timeout; infrastructure, not the contract
    Transport,
    /// Scenario budget exhausted before all calls resolved
    Timeout,
    /// Wrong status, header, shape or value
    ContractViolation,
    /// Precondition broken before assertions could run
    SetupFailure,
    /// Cross-result invariant broken
    InvariantViolation,
}

impl FailureKind {
    /// Exit code contribution
    ///
    /// - contract / setup / invariant: 1
    /// - scenario timeout: 2
    /// - transport: 3 (tool or environment problem)
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::ContractViolation | Self::SetupFailure | Self::InvariantViolation => 1,
            Self::Timeout => 2,
            Self::Transport => 3,
        }
    }

    /// Human-readable description
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Transport => "Transport failure",
            Self::Timeout => "Scenario timed out",
            Self::ContractViolation => "Contract violation",
            Self::SetupFailure => "Scenario setup failure",
            Self::InvariantViolation => "Cross-result invariant violation",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// First violated clause of a contract rule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{clause}: expected {expected}, got {actual}")]
pub struct Violation {
    pub clause: String,
    pub expected: String,
    pub actual: String,
}

impl Violation {
    #[must_use]
    pub fn new(
        clause: impl Into<String>,
        expected: impl std::fmt::Display,
        actual: impl std::fmt::Display,
    ) -> Self {
        Self {
            clause: clause.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

/// Why a scenario failed. Every variant is scenario-local.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScenarioError {
    #[error("{step}: transport failure: {message}")]
    Transport { step: String, message: String },
    #[error("{step}: {violation}")]
    Contract { step: String, violation: Violation },
    #[error("setup failure: {0}")]
    Setup(String),
    #[error("invariant violation: {0}")]
    Invariant(InvariantViolation),
    #[error("timed out after {budget_ms} ms")]
    Timeout { budget_ms: u64 },
}

impl ScenarioError {
    #[must_use]
    pub fn contract(step: impl Into<String>, violation: Violation) -> Self {
        Self::Contract {
            step: step.into(),
            violation,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Transport { .. } => FailureKind::Transport,
            Self::Contract { .. } => FailureKind::ContractViolation,
            Self::Setup(_) => FailureKind::SetupFailure,
            Self::Invariant(_) => FailureKind::InvariantViolation,
            Self::Timeout { .. } => FailureKind::Timeout,
        }
    }
}

impl From<AggregateError> for ScenarioError {
    fn from(err: AggregateError) -> Self {
        match err {
            AggregateError::Violation(v) => Self::Invariant(v),
            other => Self::Setup(other.to_string()),
        }
    }
}

/// Attach the step label to a contract rule result.
pub trait ContractResultExt<T> {
    /// # Errors
    ///
    /// Wraps the violation as [`ScenarioError::Contract`].
    fn at(self, step: &str) -> Result<T, ScenarioError>;
}

impl<T> ContractResultExt<T> for Result<T, Violation> {
    fn at(self, step: &str) -> Result<T, ScenarioError> {
        self.map_err(|v| ScenarioError::contract(step, v))
    }
}

/// Serializable failure entry of a scenario outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FailureRecord {
    pub kind: FailureKind,
    /// Full cause chain, e.g. `GET /api/test/user/9: status: expected 200, got 500`
    pub message: String,
}

impl From<&ScenarioError> for FailureRecord {
    fn from(err: &ScenarioError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Invariant;

    #[test]
    fn kind_exit_codes() {
        assert_eq!(FailureKind::ContractViolation.exit_code(), 1);
        assert_eq!(FailureKind::SetupFailure.exit_code(), 1);
        assert_eq!(FailureKind::InvariantViolation.exit_code(), 1);
        assert_eq!(FailureKind::Timeout.exit_code(), 2);
        assert_eq!(FailureKind::Transport.exit_code(), 3);
    }

    #[test]
    fn contract_error_renders_cause_chain() {
        let err: Result<(), _> = Err(Violation::new("status", 200, 500));
        let err = err.at("GET /api/test/user/9").unwrap_err();
        assert_eq!(err.kind(), FailureKind::ContractViolation);
        assert_eq!(
            err.to_string(),
            "GET /api/test/user/9: status: expected 200, got 500"
        );
    }

    #[test]
    fn aggregate_errors_split_by_kind() {
        let violation = AggregateError::Violation(InvariantViolation {
            invariant: Invariant::Disjointness,
            left: "male".into(),
            right: "female".into(),
            offending: vec!["3".into()],
        });
        assert_eq!(
            ScenarioError::from(violation).kind(),
            FailureKind::InvariantViolation
        );

        let incomplete = AggregateError::Incomplete(vec!["female".into()]);
        assert_eq!(
            ScenarioError::from(incomplete).kind(),
            FailureKind::SetupFailure
        );
    }

    #[test]
    fn failure_kind_serialization() {
        let json = serde_json::to_string(&FailureKind::ContractViolation).unwrap();
        assert_eq!(json, "\"contract_violation\"");
        let record = FailureRecord::from(&ScenarioError::Timeout { budget_ms: 10 });
        assert_eq!(record.kind, FailureKind::Timeout);
        assert_eq!(record.message, "timed out after 10 ms");
    }
}

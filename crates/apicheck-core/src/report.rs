//! Machine-readable run result printed by `--output json`
//!
//! Nothing here is persisted; the JSON Schema is exported by `apicheck schema`
//! for consumers of the stdout format.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::verdict::{ScenarioOutcome, Verdict};

/// Top-level output of one run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RunReport {
    /// API under test
    pub base_url: String,
    /// Known-valid id taken from fixtures
    pub fixture_id: u64,
    pub verdict: Verdict,
    /// One entry per executed scenario, in catalog order
    pub scenarios: Vec<ScenarioOutcome>,
    pub duration_ms: u64,
}

impl RunReport {
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        fixture_id: u64,
        scenarios: Vec<ScenarioOutcome>,
        duration_ms: u64,
    ) -> Self {
        let verdict = Verdict::from_outcomes(&scenarios);
        Self {
            base_url: base_url.into(),
            fixture_id,
            verdict,
            scenarios,
            duration_ms,
        }
    }

    #[must_use]
    pub fn failed(&self) -> impl Iterator<Item = &ScenarioOutcome> {
        self.scenarios.iter().filter(|s| !s.passed())
    }
}

/// Generate JSON Schema for the run report.
///
/// # Errors
///
/// Returns error if the schema cannot be serialized.
pub fn generate_schema() -> Result<String, serde_json::Error> {
    let schema = schemars::schema_for!(RunReport);
    serde_json::to_string_pretty(&schema)
}

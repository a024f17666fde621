//! Scenario runner: one task per scenario under its own timeout budget

use std::time::{Duration, Instant};

use futures::{StreamExt, stream};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::{Instrument, error, info, info_span, warn};

use apicheck_core::plan::{ScenarioPlan, validate_config};
use apicheck_core::{
    Config, DryRunPlan, FailureRecord, FixtureError, Fixtures, ScenarioError, ScenarioOutcome,
    VerdictStatus,
};

use crate::contract::ContractLimits;
use crate::executor::{Executor, TransportError};
use crate::scenarios::{Scenario, ScenarioContext, catalog};

/// Scenarios in flight at once. Each owns its context, so this only bounds load.
const MAX_CONCURRENT_SCENARIOS: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("fixture error: {0}")]
    Fixture(#[from] FixtureError),
    #[error("executor error: {0}")]
    Executor(#[from] TransportError),
    #[error("no scenario matches filter {0:?}")]
    NoScenarios(String),
}

/// Catalog entries whose name contains `filter` (case-insensitive).
#[must_use]
pub fn select(filter: Option<&str>) -> Vec<Scenario> {
    let scenarios = catalog();
    match filter {
        None => scenarios,
        Some(f) => {
            let needle = f.to_lowercase();
            scenarios
                .into_iter()
                .filter(|s| s.name.to_lowercase().contains(&needle))
                .collect()
        }
    }
}

/// Describe a run without sending requests.
#[must_use]
pub fn plan(config: &Config, filter: Option<&str>) -> DryRunPlan {
    let scenarios: Vec<ScenarioPlan> = select(filter)
        .iter()
        .map(|s| ScenarioPlan {
            name: s.name.to_string(),
            endpoint: s.endpoint.to_string(),
            calls: s.calls,
            budget_ms: millis(config.scenario_budget(s.calls)),
        })
        .collect();
    let total_calls = scenarios.iter().map(|s| u64::from(s.calls)).sum();
    DryRunPlan {
        scenarios,
        total_calls,
        validations: validate_config(config),
    }
}

pub struct ScenarioRunner {
    config: Config,
    executor: Executor,
    limits: ContractLimits,
    fixture_id: u64,
    scenarios: Vec<Scenario>,
}

impl ScenarioRunner {
    /// Bind the runner to a config and the loaded fixtures.
    ///
    /// # Errors
    ///
    /// Returns error if the fixture id is missing or invalid, or the base URL
    /// is unusable.
    pub fn new(config: &Config, fixtures: &Fixtures) -> Result<Self, RunnerError> {
        let fixture_id = fixtures.user_id()?;
        let executor = Executor::from_config(config)?;
        Ok(Self {
            config: config.clone(),
            executor,
            limits: ContractLimits::from_config(config),
            fixture_id,
            scenarios: catalog(),
        })
    }

    /// Replace the catalog with an explicit scenario list.
    #[must_use]
    pub fn with_scenarios(mut self, scenarios: Vec<Scenario>) -> Self {
        self.scenarios = scenarios;
        self
    }

    /// Keep only scenarios whose name contains `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::NoScenarios`] if nothing matches.
    pub fn with_filter(mut self, filter: Option<&str>) -> Result<Self, RunnerError> {
        if let Some(f) = filter {
            self.scenarios = select(Some(f));
            if self.scenarios.is_empty() {
                return Err(RunnerError::NoScenarios(f.to_string()));
            }
        }
        Ok(self)
    }

    #[must_use]
    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    #[must_use]
    pub const fn fixture_id(&self) -> u64 {
        self.fixture_id
    }

    /// Run every selected scenario. Outcomes come back in catalog order.
    pub async fn run(&self) -> Vec<ScenarioOutcome> {
        info!(
            base_url = %self.config.base_url,
            fixture_id = self.fixture_id,
            scenarios = self.scenarios.len(),
            "starting run"
        );
        stream::iter(self.scenarios.iter().enumerate())
            .map(|(index, scenario)| self.spawn(index, scenario))
            .buffered(MAX_CONCURRENT_SCENARIOS)
            .collect()
            .await
    }

    /// Start one scenario on its own task. A panic inside it becomes a failed
    /// outcome for that scenario only.
    fn spawn(
        &self,
        index: usize,
        scenario: &Scenario,
    ) -> impl Future<Output = ScenarioOutcome> + use<> {
        let rng = match self.config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed.wrapping_add(index as u64)),
            None => SmallRng::from_entropy(),
        };
        let ctx = ScenarioContext::new(
            self.executor.clone(),
            self.limits.clone(),
            self.fixture_id,
            rng,
        );
        let budget = self.config.scenario_budget(scenario.calls);
        let start = Instant::now();
        let task = tokio::spawn(run_scenario(scenario.clone(), ctx, budget));
        let scenario = scenario.clone();

        async move {
            task.await.unwrap_or_else(|e| {
                let cause = if e.is_panic() { "panicked" } else { "was cancelled" };
                let failure = ScenarioError::Setup(format!("scenario task {cause}: {e}"));
                error!(scenario = scenario.name, error = %failure, "scenario aborted");
                outcome(&scenario, &Err(failure), millis(start.elapsed()))
            })
        }
    }
}

async fn run_scenario(
    scenario: Scenario,
    mut ctx: ScenarioContext,
    budget: Duration,
) -> ScenarioOutcome {
    let span = info_span!("scenario", scenario = scenario.name);

    async {
        let start = Instant::now();
        let result = match tokio::time::timeout(budget, scenario.run(&mut ctx)).await {
            Ok(result) => result,
            Err(_) => Err(ScenarioError::Timeout {
                budget_ms: millis(budget),
            }),
        };
        let duration_ms = millis(start.elapsed());

        match &result {
            Ok(()) => info!(duration_ms, "pass"),
            Err(e) => warn!(duration_ms, kind = %e.kind(), error = %e, "fail"),
        }
        outcome(&scenario, &result, duration_ms)
    }
    .instrument(span)
    .await
}

fn outcome(
    scenario: &Scenario,
    result: &Result<(), ScenarioError>,
    duration_ms: u64,
) -> ScenarioOutcome {
    ScenarioOutcome {
        name: scenario.name.to_string(),
        endpoint: scenario.endpoint.to_string(),
        status: if result.is_ok() {
            VerdictStatus::Pass
        } else {
            VerdictStatus::Fail
        },
        calls: scenario.calls,
        duration_ms,
        failure: result.as_ref().err().map(FailureRecord::from),
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

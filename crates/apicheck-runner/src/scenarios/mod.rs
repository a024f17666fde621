//! Scenario catalog for the user-directory API
//!
//! A scenario is a named async procedure over a [`ScenarioContext`]. It
//! issues its own calls, applies contract rules, and returns the first
//! failure. Scenarios never share state.

mod user;
mod users;

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use rand::rngs::SmallRng;

use apicheck_core::{EndpointTarget, ResponseRecord, ScenarioError};

use crate::contract::ContractLimits;
use crate::executor::Executor;
use crate::sample::sample_uniform;

pub const USER_PATH: &str = "/api/test/user/{id}";
pub const USERS_PATH: &str = "/api/test/users";

/// Everything a scenario may touch while it runs.
pub struct ScenarioContext {
    executor: Executor,
    limits: ContractLimits,
    fixture_id: u64,
    rng: SmallRng,
}

impl ScenarioContext {
    #[must_use]
    pub const fn new(
        executor: Executor,
        limits: ContractLimits,
        fixture_id: u64,
        rng: SmallRng,
    ) -> Self {
        Self {
            executor,
            limits,
            fixture_id,
            rng,
        }
    }

    /// Issue one call. Any status is a record; only transport errors fail here.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Transport`] labelled with the request, or
    /// [`ScenarioError::Setup`] when the request itself cannot be built.
    pub async fn call(&self, target: &EndpointTarget) -> Result<ResponseRecord, ScenarioError> {
        self.executor.execute(target).await.map_err(|e| {
            if e.is_retryable() {
                ScenarioError::Transport {
                    step: target.label(),
                    message: e.to_string(),
                }
            } else {
                ScenarioError::Setup(format!("{}: {e}", target.label()))
            }
        })
    }

    /// Uniformly pick one id from a server-returned list.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Setup`] if the list is empty.
    pub fn sample(&mut self, ids: &[i64], what: &str) -> Result<i64, ScenarioError> {
        sample_uniform(ids, &mut self.rng, what).copied()
    }

    #[must_use]
    pub const fn fixture_id(&self) -> u64 {
        self.fixture_id
    }

    #[must_use]
    pub const fn limits(&self) -> &ContractLimits {
        &self.limits
    }
}

pub type ScenarioFuture<'a> = BoxFuture<'a, Result<(), ScenarioError>>;

type ScenarioFn = dyn for<'a> Fn(&'a mut ScenarioContext) -> ScenarioFuture<'a> + Send + Sync;

/// A named, self-contained test case.
#[derive(Clone)]
pub struct Scenario {
    pub name: &'static str,
    /// Endpoint group the scenario belongs to
    pub endpoint: &'static str,
    /// Network calls issued on the happy path, used for the timeout budget
    pub calls: u32,
    run: Arc<ScenarioFn>,
}

impl Scenario {
    pub fn new<F>(name: &'static str, endpoint: &'static str, calls: u32, run: F) -> Self
    where
        F: for<'a> Fn(&'a mut ScenarioContext) -> ScenarioFuture<'a> + Send + Sync + 'static,
    {
        Self {
            name,
            endpoint,
            calls,
            run: Arc::new(run),
        }
    }

    /// Start the scenario against `ctx`.
    pub fn run<'a>(&self, ctx: &'a mut ScenarioContext) -> ScenarioFuture<'a> {
        (self.run)(ctx)
    }
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("calls", &self.calls)
            .finish_non_exhaustive()
    }
}

/// Every scenario, user endpoint first.
#[must_use]
pub fn catalog() -> Vec<Scenario> {
    let mut scenarios = user::scenarios();
    scenarios.extend(users::scenarios());
    scenarios
}

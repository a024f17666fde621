//! apicheck-runner: HTTP execution, contract rules and the scenario catalog

pub mod contract;
pub mod executor;
pub mod runner;
pub mod sample;
pub mod scenarios;

pub use contract::ContractLimits;
pub use executor::{Executor, TransportError};
pub use runner::{RunnerError, ScenarioRunner, plan, select};
pub use scenarios::{Scenario, ScenarioContext, catalog};

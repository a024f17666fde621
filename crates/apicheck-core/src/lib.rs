//! apicheck-core: Core types, aggregation and verdict logic for API contract checks
//!
//! This crate holds everything that does not touch the network: configuration,
//! fixtures, request/response records, the identifier grammar, the
//! consistency aggregator, and the per-scenario verdict model.

pub mod aggregate;
pub mod config;
pub mod fixture;
pub mod identifier;
pub mod plan;
pub mod record;
pub mod report;
pub mod verdict;

pub use aggregate::{AggregateError, Aggregator, Contribution, Invariant, InvariantViolation, Sealed};
pub use config::{Config, ConfigError};
pub use fixture::{FixtureError, Fixtures};
pub use identifier::{IdentifierClass, classify, number_format_message};
pub use plan::DryRunPlan;
pub use record::{Body, EndpointTarget, Headers, HttpMethod, ResponseRecord};
pub use report::RunReport;
pub use verdict::{
    ContractResultExt, FailureKind, FailureRecord, ScenarioError, ScenarioOutcome, Verdict,
    VerdictStatus, Violation,
};

//! Verdict module - failure taxonomy and scenario outcomes

mod failure;
mod outcome;

pub use failure::{ContractResultExt, FailureKind, FailureRecord, ScenarioError, Violation};
pub use outcome::{ScenarioOutcome, Verdict, VerdictStatus};

//! Consistency aggregation across calls of one scenario
//!
//! Calls hand their derived values to an [`Aggregator`] under a key declared
//! up front. Invariants only exist on [`Sealed`], which can be obtained once
//! every declared key has a contribution, so an invariant can never run
//! against a partially populated accumulator.

use std::collections::{BTreeMap, BTreeSet};

/// Value derived from one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contribution {
    /// Id list in server order
    Ids(Vec<i64>),
    /// Raw response body
    Body(String),
}

impl Contribution {
    const fn kind(&self) -> &'static str {
        match self {
            Self::Ids(_) => "id list",
            Self::Body(_) => "body",
        }
    }
}

/// Which cross-result invariant was checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invariant {
    Repeatability,
    PartitionMembership,
    Disjointness,
}

impl Invariant {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Repeatability => "repeatability",
            Self::PartitionMembership => "partition membership",
            Self::Disjointness => "disjointness",
        }
    }
}

impl std::fmt::Display for Invariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed invariant with the elements that broke it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{invariant}({left}, {right}) violated: {}", .offending.join(", "))]
pub struct InvariantViolation {
    pub invariant: Invariant,
    pub left: String,
    pub right: String,
    pub offending: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregateError {
    #[error("contributions still missing: {}", .0.join(", "))]
    Incomplete(Vec<String>),
    #[error("contribution '{0}' was not declared")]
    UnknownKey(String),
    #[error("contribution '{0}' was already recorded")]
    Duplicate(String),
    #[error("contribution '{key}' is a {actual}, expected {expected}")]
    KindMismatch {
        key: String,
        expected: &'static str,
        actual: &'static str,
    },
    #[error(transparent)]
    Violation(#[from] InvariantViolation),
}

/// Scenario-owned buffer of keyed contributions.
#[derive(Debug, Default)]
pub struct Aggregator {
    expected: BTreeSet<String>,
    contributions: BTreeMap<String, Contribution>,
}

impl Aggregator {
    /// Declare every key that must contribute before sealing.
    pub fn expecting<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            expected: keys.into_iter().map(Into::into).collect(),
            contributions: BTreeMap::new(),
        }
    }

    /// Record the value produced by one call.
    ///
    /// # Errors
    ///
    /// Returns error for an undeclared key or a second contribution under
    /// the same key.
    pub fn contribute(
        &mut self,
        key: &str,
        contribution: Contribution,
    ) -> Result<(), AggregateError> {
        if !self.expected.contains(key) {
            return Err(AggregateError::UnknownKey(key.to_string()));
        }
        if self.contributions.contains_key(key) {
            return Err(AggregateError::Duplicate(key.to_string()));
        }
        self.contributions.insert(key.to_string(), contribution);
        Ok(())
    }

    /// Declared keys without a contribution yet.
    #[must_use]
    pub fn missing(&self) -> Vec<String> {
        self.expected
            .iter()
            .filter(|k| !self.contributions.contains_key(*k))
            .cloned()
            .collect()
    }

    /// Close the buffer once it is complete.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::Incomplete`] naming every missing key.
    pub fn seal(self) -> Result<Sealed, AggregateError> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(AggregateError::Incomplete(missing));
        }
        Ok(Sealed {
            contributions: self.contributions,
        })
    }
}

/// Complete set of contributions; the only place invariants are evaluated.
#[derive(Debug)]
pub struct Sealed {
    contributions: BTreeMap<String, Contribution>,
}

impl Sealed {
    fn get(&self, key: &str) -> Result<&Contribution, AggregateError> {
        self.contributions
            .get(key)
            .ok_or_else(|| AggregateError::UnknownKey(key.to_string()))
    }

    /// Id list contributed under `key`.
    ///
    /// # Errors
    ///
    /// Returns error if the key is unknown or holds a body.
    pub fn ids(&self, key: &str) -> Result<&[i64], AggregateError> {
        match self.get(key)? {
            Contribution::Ids(ids) => Ok(ids),
            other => Err(AggregateError::KindMismatch {
                key: key.to_string(),
                expected: "id list",
                actual: other.kind(),
            }),
        }
    }

    /// Both contributions must be identical: bodies byte for byte, id lists
    /// element for element in order.
    ///
    /// # Errors
    ///
    /// Returns a violation naming the first divergence.
    pub fn repeatable(&self, left: &str, right: &str) -> Result<(), AggregateError> {
        let offending = match (self.get(left)?, self.get(right)?) {
            (Contribution::Body(a), Contribution::Body(b)) => body_divergence(a, b),
            (Contribution::Ids(a), Contribution::Ids(b)) => ids_divergence(a, b),
            (a, b) => {
                return Err(AggregateError::KindMismatch {
                    key: right.to_string(),
                    expected: a.kind(),
                    actual: b.kind(),
                });
            }
        };
        match offending {
            Some(offending) => Err(violation(Invariant::Repeatability, left, right, offending)),
            None => Ok(()),
        }
    }

    /// Every id of `subset` must appear in `superset`.
    ///
    /// # Errors
    ///
    /// Returns a violation listing the ids missing from `superset`.
    pub fn subset(&self, subset: &str, superset: &str) -> Result<(), AggregateError> {
        let sup: BTreeSet<i64> = self.ids(superset)?.iter().copied().collect();
        let outside: BTreeSet<i64> = self
            .ids(subset)?
            .iter()
            .copied()
            .filter(|id| !sup.contains(id))
            .collect();
        if outside.is_empty() {
            Ok(())
        } else {
            Err(violation(
                Invariant::PartitionMembership,
                subset,
                superset,
                outside.iter().map(ToString::to_string).collect(),
            ))
        }
    }

    /// The two id lists must share no element.
    ///
    /// # Errors
    ///
    /// Returns a violation listing the shared ids.
    pub fn disjoint(&self, left: &str, right: &str) -> Result<(), AggregateError> {
        let a: BTreeSet<i64> = self.ids(left)?.iter().copied().collect();
        let b: BTreeSet<i64> = self.ids(right)?.iter().copied().collect();
        let shared: Vec<String> = a.intersection(&b).map(ToString::to_string).collect();
        if shared.is_empty() {
            Ok(())
        } else {
            Err(violation(Invariant::Disjointness, left, right, shared))
        }
    }
}

fn violation(invariant: Invariant, left: &str, right: &str, offending: Vec<String>) -> AggregateError {
    AggregateError::Violation(InvariantViolation {
        invariant,
        left: left.to_string(),
        right: right.to_string(),
        offending,
    })
}

/// First differing byte offset with a short excerpt of each side.
fn body_divergence(a: &str, b: &str) -> Option<Vec<String>> {
    if a == b {
        return None;
    }
    let offset = a
        .bytes()
        .zip(b.bytes())
        .position(|(x, y)| x != y)
        .unwrap_or_else(|| a.len().min(b.len()));
    Some(vec![
        format!("bodies differ at byte {offset}"),
        format!("left: {}", excerpt(a, offset)),
        format!("right: {}", excerpt(b, offset)),
    ])
}

fn excerpt(s: &str, offset: usize) -> String {
    let mut start = offset.saturating_sub(16);
    while start > 0 && !s.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (offset + 16).min(s.len());
    while end < s.len() && !s.is_char_boundary(end) {
        end += 1;
    }
    format!("{:?}", &s[start..end])
}

fn ids_divergence(a: &[i64], b: &[i64]) -> Option<Vec<String>> {
    if a == b {
        return None;
    }
    if a.len() != b.len() {
        return Some(vec![format!("length {} != {}", a.len(), b.len())]);
    }
    a.iter()
        .zip(b)
        .enumerate()
        .find(|(_, (x, y))| x != y)
        .map(|(i, (x, y))| vec![format!("index {i}: {x} != {y}")])
}

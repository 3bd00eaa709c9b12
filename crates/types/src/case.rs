//! Test case data types.

use std::{collections::BTreeMap, fmt};

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON pointer selecting the main processor list of a target config.
pub const DEFAULT_TARGET_POINTER: &str = "/pipeline/processors";

/// Access to the parts of a case that decide which processors it needs.
///
/// The engine uses this to warm the processors cache before any case runs, so
/// it only needs the cache key of a case and nothing about its assertions.
pub trait CaseScope {
    fn target_processors(&self) -> &ProcessorTargets;
    fn environment(&self) -> &Environment;
}

/// Processor identifiers a case targets, in declaration order.
///
/// Identifiers starting with `/` are JSON pointers into the target config;
/// anything else names a processor by its `label`. Resolved processors follow
/// the declared order, so `[upper, prefix]` and `[prefix, upper]` are different
/// pipelines. Repeated identifiers keep their first position.
///
/// Deserializes from either a single string or a list of strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "TargetsRepr", into = "Vec<String>")]
pub struct ProcessorTargets(IndexSet<String>);

impl PartialEq for ProcessorTargets {
    fn eq(&self, other: &Self) -> bool {
        self.0.iter().eq(other.0.iter())
    }
}

impl Eq for ProcessorTargets {}

#[derive(Deserialize)]
#[serde(untagged)]
enum TargetsRepr {
    Single(String),
    Many(Vec<String>),
}

impl From<TargetsRepr> for ProcessorTargets {
    fn from(repr: TargetsRepr) -> Self {
        match repr {
            TargetsRepr::Single(target) => Self::from_iter([target]),
            TargetsRepr::Many(targets) => Self::from_iter(targets),
        }
    }
}

impl From<ProcessorTargets> for Vec<String> {
    fn from(targets: ProcessorTargets) -> Self {
        targets.0.into_iter().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for ProcessorTargets {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(Into::into)
                .map(|target: String| target.trim().to_string())
                .filter(|target| !target.is_empty())
                .collect(),
        )
    }
}

impl ProcessorTargets {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Display for ProcessorTargets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str(DEFAULT_TARGET_POINTER);
        }
        let joined: Vec<&str> = self.iter().collect();
        f.write_str(&joined.join(","))
    }
}

/// Variable overlay applied to the target config before its processors are resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Environment(BTreeMap<String, String>);

impl Environment {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(name.into(), value.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(name, value)| (name.into(), value.into())).collect())
    }
}

/// A declarative test case as written in a definition file.
///
/// Only `target_processors` and `environment` are interpreted by the engine.
/// Every other field (input batches, output conditions, ...) is kept verbatim
/// in `body` for whichever case runner evaluates it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseSpec {
    /// Human readable case name, used to attribute failures.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub target_processors: ProcessorTargets,
    #[serde(default)]
    pub environment: Environment,
    /// Runner specific fields in declaration order.
    #[serde(flatten)]
    pub body: IndexMap<String, Value>,
}

impl CaseScope for CaseSpec {
    fn target_processors(&self) -> &ProcessorTargets {
        &self.target_processors
    }

    fn environment(&self) -> &Environment {
        &self.environment
    }
}

/// A single failed expectation reported by a case.
///
/// Failures are data, not errors: a case that reports failures still ran to
/// completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseFailure {
    /// Name of the case that reported the failure.
    pub case: String,
    /// What went wrong.
    pub reason: String,
}

impl CaseFailure {
    pub fn new(case: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            case: case.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for CaseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.case, self.reason)
    }
}

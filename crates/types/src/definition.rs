//! Test definition document.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::case::{CaseSpec, DEFAULT_TARGET_POINTER, Environment, ProcessorTargets};

/// A group of test cases run against one target config file.
///
/// The order of `cases` is significant: failures are reported in case order and
/// errors are attributed by case index. Cases are shared behind an `Arc` so
/// concurrent runs can hand each task the whole suite without copying it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Definition<C = CaseSpec> {
    /// Run the cases concurrently instead of one after another.
    #[serde(default)]
    pub parallel: bool,
    #[serde(rename = "tests", default = "no_cases")]
    pub cases: Arc<[C]>,
}

fn no_cases<C>() -> Arc<[C]> {
    Arc::from(Vec::new())
}

impl<C> Definition<C> {
    pub fn new(parallel: bool, cases: Vec<C>) -> Self {
        Self {
            parallel,
            cases: Arc::from(cases),
        }
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

impl<C> Default for Definition<C> {
    fn default() -> Self {
        Self::new(false, Vec::new())
    }
}

/// Returns a definition containing a single example case.
///
/// Used to scaffold new definition files.
pub fn example_definition() -> Definition<CaseSpec> {
    let mut body = IndexMap::new();
    body.insert(
        "input_batches".to_string(),
        json!([[{
            "content": "example content",
            "metadata": { "example_key": "example metadata value" }
        }]]),
    );
    body.insert(
        "output_batches".to_string(),
        json!([[{
            "content_equals": "example content",
            "metadata_equals": { "example_key": "example metadata value" }
        }]]),
    );

    let case = CaseSpec {
        name: "example test".to_string(),
        target_processors: ProcessorTargets::from_iter([DEFAULT_TARGET_POINTER]),
        environment: Environment::default(),
        body,
    };
    Definition::new(true, vec![case])
}

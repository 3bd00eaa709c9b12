//! Loading definition files from disk.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use pipecheck_types::{CaseSpec, Definition};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Loads a definition file. JSON is a subset of YAML, so both are accepted.
///
/// # Errors
///
/// Returns an error when the file cannot be read or does not match the
/// definition format.
pub fn parse_definition_file(file_path: impl AsRef<Path>) -> Result<Definition<CaseSpec>> {
    parse_definition_file_as(file_path)
}

/// Loads a definition file whose cases deserialize into `C`.
pub fn parse_definition_file_as<C: DeserializeOwned>(file_path: impl AsRef<Path>) -> Result<Definition<C>> {
    let file_path = file_path.as_ref();
    let content = fs::read_to_string(file_path).with_context(|| format!("Failed to read definition file: {}", file_path.display()))?;
    let definition: Definition<C> =
        serde_yaml::from_str(&content).with_context(|| format!("Failed to parse definition file: {}", file_path.display()))?;
    debug!(
        path = %file_path.display(),
        parallel = definition.parallel,
        case_count = definition.len(),
        "loaded definition file"
    );
    Ok(definition)
}

//! File-backed processor resolution.
//!
//! A target config is a YAML (or JSON) pipeline description. Cases pick the
//! processors they exercise either by JSON pointer (`/pipeline/processors/0`)
//! or by processor `label`.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use pipecheck_types::{DEFAULT_TARGET_POINTER, Environment, ProcessorTargets};
use pipecheck_util::interpolate_variables;
use serde_json::Value;
use tracing::debug;

use super::{CachedProvider, ProcessorResolver, ProcessorsProvider, ProvidersFactory, ProviderError, ResolvedProcessors};

/// Resolves processors by reading the target config from disk.
///
/// The file is read and parsed on every call; wrap it in a [`CachedProvider`]
/// so each distinct key is only resolved once.
#[derive(Debug, Clone)]
pub struct TargetConfigResolver {
    path: PathBuf,
}

impl TargetConfigResolver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn display_path(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self, environment: &Environment) -> Result<Value, ProviderError> {
        let raw = fs::read_to_string(&self.path).map_err(|source| ProviderError::Io {
            path: self.display_path(),
            source,
        })?;
        let interpolated = interpolate_variables(&raw, environment);
        serde_yaml::from_str::<Value>(&interpolated).map_err(|source| ProviderError::Parse {
            path: self.display_path(),
            source,
        })
    }

    fn select_pointer(&self, config: &Value, pointer: &str, selected: &mut Vec<Value>) -> Result<(), ProviderError> {
        match config.pointer(pointer) {
            Some(Value::Array(items)) => selected.extend(items.iter().cloned()),
            Some(Value::Null) => {}
            Some(item) => selected.push(item.clone()),
            None => {
                return Err(ProviderError::TargetNotFound {
                    target: pointer.to_string(),
                    path: self.display_path(),
                });
            }
        }
        Ok(())
    }

    fn select_label(&self, config: &Value, label: &str, selected: &mut Vec<Value>) -> Result<(), ProviderError> {
        let processor = find_labelled_processor(config, label).ok_or_else(|| ProviderError::TargetNotFound {
            target: label.to_string(),
            path: self.display_path(),
        })?;
        selected.push(processor.clone());
        Ok(())
    }
}

impl ProcessorResolver for TargetConfigResolver {
    fn resolve_uncached(&self, targets: &ProcessorTargets, environment: &Environment) -> Result<ResolvedProcessors, ProviderError> {
        let config = self.load(environment)?;
        let mut selected = Vec::new();

        if targets.is_empty() {
            self.select_pointer(&config, DEFAULT_TARGET_POINTER, &mut selected)?;
        }
        for target in targets.iter() {
            if target.starts_with('/') {
                self.select_pointer(&config, target, &mut selected)?;
            } else {
                self.select_label(&config, target, &mut selected)?;
            }
        }

        debug!(
            path = %self.path.display(),
            targets = %targets,
            processor_count = selected.len(),
            "resolved target processors"
        );
        Ok(ResolvedProcessors::new(selected))
    }
}

/// Search every `processors` list in the config for an entry with `label`.
fn find_labelled_processor<'a>(value: &'a Value, label: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => {
            if let Some(Value::Array(processors)) = map.get("processors")
                && let Some(found) = processors
                    .iter()
                    .find(|processor| processor.get("label").and_then(Value::as_str) == Some(label))
            {
                return Some(found);
            }
            map.values().find_map(|child| find_labelled_processor(child, label))
        }
        Value::Array(items) => items.iter().find_map(|item| find_labelled_processor(item, label)),
        _ => None,
    }
}

/// Creates a fresh [`CachedProvider`] over a [`TargetConfigResolver`] per run.
///
/// The target file is not touched here. An unreadable target surfaces on the
/// first resolution, attributed to the case that needed it.
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetConfigFactory;

impl ProvidersFactory for TargetConfigFactory {
    fn create(&self, target: &Path) -> Result<Arc<dyn ProcessorsProvider>, ProviderError> {
        Ok(Arc::new(CachedProvider::new(TargetConfigResolver::new(target))))
    }
}

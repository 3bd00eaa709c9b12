//! Environment variable interpolation for target config files.
//!
//! Supports `${NAME}`, `${NAME:default}` and the `$${NAME}` escape, which is
//! left in the output as a literal `${NAME}`.

use once_cell::sync::Lazy;
use pipecheck_types::Environment;
use regex::{Captures, Regex};
use tracing::debug;

static VARIABLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$(\$?)\{([A-Za-z0-9_.\-]+)(?::([^}]*))?\}").expect("variable pattern is valid"));

/// Replace variable references in `value`.
///
/// Lookup order is the `overlay`, then the process environment, then the
/// inline default. A reference with no value and no default becomes an empty
/// string.
pub fn interpolate_variables(value: &str, overlay: &Environment) -> String {
    interpolate_with(value, |name| {
        overlay
            .get(name)
            .map(str::to_string)
            .or_else(|| std::env::var(name).ok())
    })
}

/// Replace variable references using a caller supplied lookup.
pub fn interpolate_with<F>(value: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    VARIABLE_PATTERN
        .replace_all(value, |caps: &Captures| {
            let whole = &caps[0];
            if !caps[1].is_empty() {
                return whole[1..].to_string();
            }
            let name = &caps[2];
            match lookup(name) {
                Some(resolved) => {
                    debug!(variable = %name, "interpolated variable -> [REDACTED]");
                    resolved
                }
                None => {
                    let fallback = caps.get(3).map(|default| default.as_str()).unwrap_or_default();
                    debug!(variable = %name, has_default = caps.get(3).is_some(), "variable not set");
                    fallback.to_string()
                }
            }
        })
        .into_owned()
}

//! Process-level settings read from the environment.
//!
//! Command line flags always win; these values only fill in what the operator
//! did not pass explicitly.

use std::path::PathBuf;

use dirs_next::home_dir;

/// Forces sequential execution for every definition when set to a truthy value.
pub const FORCE_SEQUENTIAL_ENV_VAR: &str = "PIPECHECK_FORCE_SEQUENTIAL";

/// Log filter directive used when `RUST_LOG` is not set.
pub const LOG_ENV_VAR: &str = "PIPECHECK_LOG";

/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Whether definitions should run sequentially regardless of their `parallel` flag.
pub fn force_sequential() -> bool {
    parse_flag(std::env::var(FORCE_SEQUENTIAL_ENV_VAR).ok()).unwrap_or(false)
}

/// Log filter from `RUST_LOG`, then `PIPECHECK_LOG`, then the default.
pub fn log_filter() -> String {
    ["RUST_LOG", LOG_ENV_VAR]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

fn parse_flag(raw: Option<String>) -> Option<bool> {
    match raw?.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Expands a leading `~` in a user supplied path to the home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    let trimmed = path.trim();
    let Some(rest) = trimmed.strip_prefix('~') else {
        return PathBuf::from(trimmed);
    };
    let Some(home) = home_dir() else {
        return PathBuf::from(trimmed);
    };
    if rest.is_empty() {
        return home;
    }
    match rest.strip_prefix(['/', '\\']) {
        Some(relative) => home.join(relative),
        // `~user` forms are left alone.
        None => PathBuf::from(trimmed),
    }
}

//! Helpers shared by the pipecheck engine and command line.

pub mod interpolation;
pub mod settings;

pub use interpolation::{interpolate_variables, interpolate_with};
pub use settings::{DEFAULT_LOG_FILTER, FORCE_SEQUENTIAL_ENV_VAR, LOG_ENV_VAR, expand_tilde, force_sequential, log_filter};

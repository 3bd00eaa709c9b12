//! Rendering run outcomes for the terminal.

use std::{fmt::Write as _, process::ExitCode};

use clap::ValueEnum;
use pipecheck_engine::{ExecutionError, ExecutionMode, Verdict};
use pipecheck_types::CaseFailure;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// User visible result of a run: passed, failed, or errored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Passed,
    Failed,
    Errored,
}

impl RunStatus {
    pub fn code(self) -> u8 {
        match self {
            Self::Passed => 0,
            Self::Failed => 1,
            Self::Errored => 2,
        }
    }

    pub fn exit_code(self) -> ExitCode {
        ExitCode::from(self.code())
    }
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub status: RunStatus,
    pub mode: ExecutionMode,
    pub case_count: usize,
    pub failures: Vec<CaseFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_index: Option<usize>,
}

impl RunReport {
    pub fn from_result(mode: ExecutionMode, case_count: usize, result: Result<Vec<CaseFailure>, ExecutionError>) -> Self {
        match result {
            Ok(failures) => {
                let verdict = Verdict::from_failures(failures);
                let status = if verdict.is_passed() { RunStatus::Passed } else { RunStatus::Failed };
                Self {
                    status,
                    mode,
                    case_count,
                    failures: verdict.failures().to_vec(),
                    error: None,
                    case_index: None,
                }
            }
            Err(error) => Self {
                status: RunStatus::Errored,
                mode,
                case_count,
                failures: Vec::new(),
                case_index: error.index(),
                error: Some(error.to_string()),
            },
        }
    }

    pub fn render(&self, format: OutputFormat) -> anyhow::Result<String> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            OutputFormat::Text => Ok(self.render_text()),
        }
    }

    fn render_text(&self) -> String {
        let mut out = String::new();
        match self.status {
            RunStatus::Passed => {
                let _ = write!(out, "PASS: {} test case(s) ({})", self.case_count, self.mode.as_str());
            }
            RunStatus::Failed => {
                let _ = writeln!(out, "FAIL: {} failure(s) across {} test case(s)", self.failures.len(), self.case_count);
                for failure in &self.failures {
                    let _ = writeln!(out, "  - {failure}");
                }
                out.truncate(out.trim_end().len());
            }
            RunStatus::Errored => {
                let _ = write!(out, "ERROR: {}", self.error.as_deref().unwrap_or("unknown error"));
            }
        }
        out
    }
}

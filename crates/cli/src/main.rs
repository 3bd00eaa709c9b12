use std::{fs, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pipecheck_engine::{CaseSpec, DefinitionExecutor, ResolveOnlyRunner, example_definition, parse_definition_file};
use pipecheck_util::{expand_tilde, force_sequential, log_filter};
use tracing::{debug, error};

mod report;

use report::{OutputFormat, RunReport, RunStatus};

#[derive(Debug, Parser)]
#[command(name = "pipecheck", version, about = "Run declarative test definitions against pipeline configs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write an example test definition.
    Init {
        /// Where to write the definition.
        #[arg(default_value = "config_test.yaml")]
        output: String,
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Check that every case of a definition resolves against a target config.
    Check(CheckArgs),
}

#[derive(Debug, Args)]
struct CheckArgs {
    /// Test definition file (YAML or JSON).
    #[arg(long, short = 'd')]
    definition: String,
    /// Target pipeline config the cases are validated against.
    #[arg(long, short = 't')]
    target: String,
    /// Run cases one at a time regardless of the definition's `parallel` flag.
    #[arg(long, conflicts_with = "parallel")]
    sequential: bool,
    /// Run cases concurrently regardless of the definition's `parallel` flag.
    #[arg(long)]
    parallel: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let outcome = match cli.command {
        Command::Init { output, force } => run_init(&output, force).map(|_| RunStatus::Passed),
        Command::Check(args) => run_check(args).await,
    };

    match outcome {
        Ok(status) => status.exit_code(),
        Err(error) => {
            error!(error = %format!("{error:#}"), "pipecheck failed");
            eprintln!("error: {error:#}");
            RunStatus::Errored.exit_code()
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_init(output: &str, force: bool) -> Result<()> {
    let path = expand_tilde(output);
    if path.exists() && !force {
        anyhow::bail!("{} already exists; pass --force to overwrite", path.display());
    }
    let yaml = serde_yaml::to_string(&example_definition()).context("Failed to render example definition")?;
    fs::write(&path, yaml).with_context(|| format!("Failed to write definition file: {}", path.display()))?;
    println!("wrote example definition to {}", path.display());
    Ok(())
}

async fn run_check(args: CheckArgs) -> Result<RunStatus> {
    let definition = parse_definition_file(expand_tilde(&args.definition))?;
    let target = expand_tilde(&args.target);
    let mode_override = parallel_override(args.sequential, args.parallel, force_sequential());
    debug!(?mode_override, "resolved execution mode override");

    let executor: DefinitionExecutor<CaseSpec> =
        DefinitionExecutor::with_target_configs(Arc::new(ResolveOnlyRunner)).parallel_override(mode_override);
    let mode = executor.mode_for(&definition);
    let result = executor.execute(&definition, &target).await;

    let report = RunReport::from_result(mode, definition.len(), result);
    println!("{}", report.render(args.format)?);
    Ok(report.status)
}

/// Explicit flags win over the environment; no flag and no environment
/// setting keeps each definition's own mode.
fn parallel_override(sequential: bool, parallel: bool, env_forces_sequential: bool) -> Option<bool> {
    if sequential {
        Some(false)
    } else if parallel {
        Some(true)
    } else if env_forces_sequential {
        Some(false)
    } else {
        None
    }
}

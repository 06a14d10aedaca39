// crates/rtb-hooks-cli/src/main.rs
// ============================================================================
// Module: RTB Hooks CLI Entry Point
// Description: Command dispatcher for hook configuration tooling.
// Purpose: Validate hook configuration and inspect resolved execution plans.
// Dependencies: clap, rtb-hooks-config, rtb-hooks-core, serde, serde_json, thiserror.
// ============================================================================

//! ## Overview
//! The RTB hooks CLI loads `rtb-hooks.toml` with the same strict rules the
//! host uses, validates it, and prints the execution plan a request would
//! see for a given endpoint, stage, and optional account.
//! Inputs are untrusted: account files are read under a hard size limit.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use rtb_hooks_config::ConfiguredPlanBuilder;
use rtb_hooks_config::HookRepository;
use rtb_hooks_config::RtbHooksConfig;
use rtb_hooks_core::Account;
use rtb_hooks_core::Endpoint;
use rtb_hooks_core::GroupPlan;
use rtb_hooks_core::Stage;
use rtb_hooks_core::UnknownStageError;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum account file size in bytes.
const MAX_ACCOUNT_FILE_SIZE: usize = 1024 * 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "rtb-hooks", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Print the resolved execution plan for one stage.
    Plan(PlanCommand),
    /// List hook stages in lifecycle order.
    Stages,
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a configuration file.
    Validate(ConfigValidateCommand),
}

/// Arguments for config validation.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to rtb-hooks.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for plan inspection.
#[derive(Args, Debug)]
struct PlanCommand {
    /// Optional config file path (defaults to rtb-hooks.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Endpoint path the request arrives on.
    #[arg(long, value_name = "PATH", default_value = "/openrtb2/auction")]
    endpoint: String,
    /// Stage label (for example `raw_auction_request`).
    #[arg(long, value_name = "STAGE")]
    stage: String,
    /// Optional account JSON file.
    #[arg(long, value_name = "FILE")]
    account: Option<PathBuf>,
}

// ============================================================================
// SECTION: Output Types
// ============================================================================

/// Resolved plan printed by the `plan` command.
#[derive(Debug, Serialize)]
struct PlanReport {
    /// Endpoint path.
    endpoint: String,
    /// Stage label.
    stage: Stage,
    /// Account identifier, when an account was supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    account_id: Option<String>,
    /// Whether hook execution is enabled on the host.
    hooks_enabled: bool,
    /// Declared groups in execution order.
    groups: Vec<GroupPlan>,
}

/// Stage listing entry printed by the `stages` command.
#[derive(Debug, Serialize)]
struct StageReport {
    /// Stage label.
    stage: Stage,
    /// Whether hooks may reject the request at this stage.
    rejectable: bool,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing error messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

/// Errors returned by bounded file reads.
#[derive(Debug, Error)]
enum ReadLimitError {
    /// File I/O failure.
    #[error("{0}")]
    Io(std::io::Error),
    /// File size exceeds the configured limit.
    #[error("file size {size} exceeds limit {limit}")]
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&format!("rtb-hooks {version}"))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Config {
            command,
        } => command_config(command),
        Commands::Plan(command) => command_plan(&command),
        Commands::Stages => command_stages(),
    }
}

/// Prints CLI help.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(())
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let state = if config.hooks.enabled { "enabled" } else { "disabled" };
    write_stdout_line(&format!("config ok (hooks {state})"))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Plan Commands
// ============================================================================

/// Executes the plan inspection command.
fn command_plan(command: &PlanCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let stage: Stage =
        command.stage.parse().map_err(|err: UnknownStageError| CliError::new(err.to_string()))?;
    let account = command.account.as_deref().map(load_account).transpose()?;
    let endpoint = Endpoint::new(command.endpoint.clone());
    let report = plan_report(&config, &endpoint, stage, account.as_ref());
    write_json(&report)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the stage listing command.
fn command_stages() -> CliResult<ExitCode> {
    let stages: Vec<StageReport> = Stage::ALL
        .into_iter()
        .map(|stage| StageReport {
            stage,
            rejectable: stage.is_rejectable(),
        })
        .collect();
    write_json(&stages)?;
    Ok(ExitCode::SUCCESS)
}

/// Builds the plan report for a stage.
///
/// The entrypoint stage ignores the account, matching runtime resolution.
fn plan_report(
    config: &RtbHooksConfig,
    endpoint: &Endpoint,
    stage: Stage,
    account: Option<&Account>,
) -> PlanReport {
    let account = account.filter(|_| stage != Stage::Entrypoint);
    let groups = if config.hooks.enabled {
        ConfiguredPlanBuilder::new(&config.hooks, HookRepository::default())
            .declared_groups(endpoint, stage, account)
    } else {
        Vec::new()
    };
    PlanReport {
        endpoint: endpoint.as_str().to_string(),
        stage,
        account_id: account.map(|account| account.id.as_str().to_string()),
        hooks_enabled: config.hooks.enabled,
        groups,
    }
}

// ============================================================================
// SECTION: Input Helpers
// ============================================================================

/// Loads and validates the hooks configuration.
fn load_config(path: Option<&Path>) -> CliResult<RtbHooksConfig> {
    RtbHooksConfig::load(path).map_err(|err| CliError::new(format!("failed to load config: {err}")))
}

/// Loads an account from a JSON file.
fn load_account(path: &Path) -> CliResult<Account> {
    let bytes = read_bytes_with_limit(path, MAX_ACCOUNT_FILE_SIZE).map_err(|err| {
        CliError::new(format!("failed to read account {}: {err}", path.display()))
    })?;
    serde_json::from_slice(&bytes).map_err(|err| {
        CliError::new(format!("failed to parse account {}: {err}", path.display()))
    })
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let metadata = file.metadata().map_err(ReadLimitError::Io)?;
    let size = metadata.len();
    let limit = u64::try_from(max_bytes).map_err(|_| ReadLimitError::TooLarge {
        size,
        limit: max_bytes,
    })?;
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let mut limited = file.take(limit.saturating_add(1));
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        return Err(ReadLimitError::TooLarge {
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes pretty JSON to stdout.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::new(format!("failed to render json: {err}")))?;
    write_stdout_line(&rendered).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}

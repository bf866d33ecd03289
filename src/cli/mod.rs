//! CLI module for nanotest
//!
//! ## Commands
//!
//! - `list --manifest <file>` - Print the selected test cases
//! - `replay --manifest <file> [LOG]` - Parse captured agent output and report results (pytest-style)
//!
//! ## Modules
//!
//! - `commands` - Command implementations
//! - `reporter` - Console reporting
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;
pub mod reporter;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use nanotest_core::DeviceType;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Replay and report test agent output
#[derive(Parser, Debug)]
#[command(name = "nanotest")]
#[command(version = VERSION)]
#[command(about = "Parse test agent output into per-case results", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the test cases a manifest selects
    List {
        /// Discovery manifest (JSON)
        #[arg(short, long, value_name = "FILE")]
        manifest: PathBuf,
        /// Device type to select cases for
        #[arg(short, long, value_name = "DEVICE", default_value = "virtual", value_parser = parse_device)]
        device: DeviceType,
    },

    /// Parse a captured agent log and report one result per selected case
    Replay {
        /// Discovery manifest (JSON)
        #[arg(short, long, value_name = "FILE")]
        manifest: PathBuf,
        /// Device type to select cases for
        #[arg(short, long, value_name = "DEVICE", default_value = "virtual", value_parser = parse_device)]
        device: DeviceType,
        /// Report prefix the agent uses for control records
        #[arg(long, value_name = "PREFIX")]
        prefix: Option<String>,
        /// The agent reports codes as ordinals instead of names
        #[arg(long)]
        ordinal_codes: bool,
        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
        /// Captured output (default: stdin)
        #[arg(value_name = "LOG")]
        log: Option<PathBuf>,
    },
}

fn parse_device(value: &str) -> Result<DeviceType, String> {
    DeviceType::from_str(value).ok_or_else(|| format!("unknown device type '{value}' (expected virtual or real)"))
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Command::List { manifest, device } => commands::list_cases(&manifest, device),
        Command::Replay {
            manifest,
            device,
            prefix,
            ordinal_codes,
            verbose,
            log,
        } => commands::replay(commands::ReplayOptions {
            manifest: &manifest,
            device,
            prefix,
            ordinal_codes,
            verbose,
            log: log.as_deref(),
        }),
    }
}

// ============================================================================
// Tests
// ============================================================================

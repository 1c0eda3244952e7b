// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Command-line interface parsing and argument validation.

use std::env;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, ValueEnum};

use crate::core::error::{PpError, PpErrorKind, PpRunError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const LONG_ABOUT: &str = "Line-oriented macro preprocessor.

Reads a text file of plain lines and directives and writes the expanded
text plus a separate diagnostics stream. Supported directives:
.CONST NAME=VALUE defines an integer constant, .REPT EXPR opens a repeat
block whose count is an arithmetic expression over constants (+ - * /),
and .ENDM closes the innermost open block. Blocks nest. Lines starting
with # and blank lines are ignored.

Diagnostics go to stderr unless -E/--error routes them to a file.
The expanded output defaults to the input base with a .out extension;
use -o/--outfile to override, or -o - for stdout.";

#[derive(Parser, Debug)]
#[command(
    name = "lineForge",
    version = VERSION,
    about = "Line-oriented macro preprocessor with constant definitions and arithmetic repeat blocks",
    long_about = LONG_ABOUT
)]
pub struct Cli {
    #[arg(
        long = "format",
        value_enum,
        default_value_t = OutputFormat::Text,
        long_help = "Select diagnostics output format. text writes the plain message stream; json writes one machine-readable object per diagnostic."
    )]
    pub format: OutputFormat,
    #[arg(
        short = 'q',
        long = "quiet",
        action = ArgAction::SetTrue,
        long_help = "Suppress diagnostic output for successful runs. Failing runs still report."
    )]
    pub quiet: bool,
    #[arg(
        short = 'E',
        long = "error",
        value_name = "FILE",
        long_help = "Write diagnostics to FILE instead of stderr."
    )]
    pub error_file: Option<PathBuf>,
    #[arg(
        long = "error-append",
        action = ArgAction::SetTrue,
        requires = "error_file",
        long_help = "Append diagnostics to --error FILE instead of truncating it."
    )]
    pub error_append: bool,
    #[arg(
        long = "no-error",
        action = ArgAction::SetTrue,
        conflicts_with_all = ["error_file", "error_append"],
        long_help = "Disable all diagnostic output routing."
    )]
    pub no_error: bool,
    #[arg(
        long = "Werror",
        action = ArgAction::SetTrue,
        long_help = "Treat recoverable diagnostics as errors (non-zero exit status)."
    )]
    pub warn_error: bool,
    #[arg(
        long = "diag-context",
        action = ArgAction::SetTrue,
        long_help = "Append the offending source line to each text diagnostic."
    )]
    pub diag_context: bool,
    #[arg(
        short = 'o',
        long = "outfile",
        value_name = "FILE",
        long_help = "Expanded output destination. Defaults to the input base with a .out extension. Use - for stdout."
    )]
    pub outfile: Option<String>,
    #[arg(
        short = 'D',
        long = "define",
        value_name = "NAME[=VAL]",
        action = ArgAction::Append,
        long_help = "Predefine a constant (repeatable). If VAL is omitted, defaults to 1."
    )]
    pub defines: Vec<String>,
    #[arg(
        short = 'i',
        long = "infile",
        value_name = "FILE",
        long_help = "Input source file."
    )]
    pub infile: Option<PathBuf>,
    #[arg(
        value_name = "INPUT",
        long_help = "Positional input file, equivalent to -i INPUT."
    )]
    pub positional_input: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticsSinkConfig {
    Stderr,
    File { path: PathBuf, append: bool },
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSinkConfig {
    Stdout,
    File(PathBuf),
}

/// Validated CLI configuration.
#[derive(Debug)]
pub struct CliConfig {
    pub input_path: PathBuf,
    pub output: OutputSinkConfig,
    pub defines: Vec<(String, i64)>,
    pub quiet: bool,
    pub output_format: OutputFormat,
    pub diagnostics_sink: DiagnosticsSinkConfig,
    pub treat_warnings_as_errors: bool,
    pub diag_context: bool,
}

fn cli_error(message: impl Into<String>) -> PpRunError {
    PpRunError::new(
        PpError::new(PpErrorKind::Cli, &message.into(), None),
        Vec::new(),
        Vec::new(),
    )
}

fn parse_env_bool(var_name: &str) -> Result<Option<bool>, PpRunError> {
    let Some(raw) = env::var_os(var_name) else {
        return Ok(None);
    };
    let value = raw.to_string_lossy().trim().to_ascii_lowercase();
    let parsed = match value.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        "" => None,
        _ => {
            return Err(cli_error(format!(
                "Invalid boolean value for {var_name}: {value}"
            )))
        }
    };
    Ok(parsed)
}

fn parse_env_path(var_name: &str) -> Result<Option<PathBuf>, PpRunError> {
    let Some(raw) = env::var_os(var_name) else {
        return Ok(None);
    };
    let value = raw.to_string_lossy().trim().to_string();
    if value.is_empty() {
        return Ok(None);
    }
    Ok(Some(PathBuf::from(value)))
}

fn parse_env_csv_list(var_name: &str) -> Result<Vec<String>, PpRunError> {
    let Some(raw) = env::var_os(var_name) else {
        return Ok(Vec::new());
    };
    let value = raw.to_string_lossy();
    Ok(value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(ToString::to_string)
        .collect())
}

/// Parse a `-D NAME[=VAL]` argument. A bare NAME defaults to 1.
pub fn parse_define_arg(arg: &str) -> Result<(String, i64), &'static str> {
    const DEFINE_ERR: &str = "Invalid -D/--define value; expected NAME or NAME=INTEGER";

    let (name, value) = match arg.split_once('=') {
        Some((name, value)) => {
            let value = value.trim().parse::<i64>().map_err(|_| DEFINE_ERR)?;
            (name.trim(), value)
        }
        None => (arg.trim(), 1),
    };
    if name.is_empty() {
        return Err(DEFINE_ERR);
    }
    Ok((name.to_string(), value))
}

fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("out")
}

/// Validate CLI arguments and return parsed configuration.
pub fn validate_cli(cli: &Cli) -> Result<CliConfig, PpRunError> {
    let env_quiet = parse_env_bool("LINEFORGE_QUIET")?;
    let env_warn_error = parse_env_bool("LINEFORGE_WERROR")?;
    let env_error_file = parse_env_path("LINEFORGE_ERROR_FILE")?;
    let env_error_append = parse_env_bool("LINEFORGE_ERROR_APPEND")?;
    let env_no_error = parse_env_bool("LINEFORGE_NO_ERROR")?;
    let env_defines = parse_env_csv_list("LINEFORGE_DEFINES")?;

    let input_path = match (&cli.infile, &cli.positional_input) {
        (Some(_), Some(_)) => {
            return Err(cli_error(
                "Do not mix positional input with -i/--infile; use one style",
            ));
        }
        (Some(path), None) => path.clone(),
        (None, Some(path)) => path.clone(),
        (None, None) => {
            return Err(cli_error("No input file specified. Use -i/--infile"));
        }
    };

    let effective_quiet = if cli.quiet {
        true
    } else {
        env_quiet.unwrap_or(false)
    };

    let effective_warn_error = if cli.warn_error {
        true
    } else {
        env_warn_error.unwrap_or(false)
    };

    let effective_error_file = if cli.error_file.is_some() {
        cli.error_file.clone()
    } else {
        env_error_file
    };

    let effective_error_append = if cli.error_append {
        true
    } else {
        env_error_append.unwrap_or(false)
    };

    let effective_no_error = if cli.no_error {
        true
    } else if cli.error_file.is_some() {
        false
    } else {
        env_no_error.unwrap_or(false)
    };

    // Env defines first; later command-line -D entries overwrite them when
    // the engine inserts in order.
    let mut defines = Vec::new();
    for arg in env_defines.iter().chain(cli.defines.iter()) {
        let pair = parse_define_arg(arg).map_err(cli_error)?;
        defines.push(pair);
    }

    let output = match cli.outfile.as_deref() {
        Some("-") => OutputSinkConfig::Stdout,
        Some(name) if !name.is_empty() => OutputSinkConfig::File(PathBuf::from(name)),
        Some(_) => return Err(cli_error("-o/--outfile expects a file name or -")),
        None => OutputSinkConfig::File(default_output_path(&input_path)),
    };

    Ok(CliConfig {
        input_path,
        output,
        defines,
        quiet: effective_quiet,
        output_format: cli.format,
        diagnostics_sink: if effective_no_error {
            DiagnosticsSinkConfig::Disabled
        } else if let Some(path) = &effective_error_file {
            DiagnosticsSinkConfig::File {
                path: path.clone(),
                append: effective_error_append,
            }
        } else {
            DiagnosticsSinkConfig::Stderr
        },
        treat_warnings_as_errors: effective_warn_error,
        diag_context: cli.diag_context,
    })
}

// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// CLI entrypoint for lineForge.

use std::fs::OpenOptions;
use std::io::{self, Write};

use clap::Parser;
use serde_json::json;

use lineforge::core::error::{Diagnostic, Severity, build_context_line};
use lineforge::processor::cli::{Cli, DiagnosticsSinkConfig, OutputFormat, validate_cli};

struct DiagnosticsSink {
    writer: Option<Box<dyn Write>>,
}

impl DiagnosticsSink {
    fn from_config(config: &DiagnosticsSinkConfig) -> io::Result<Self> {
        match config {
            DiagnosticsSinkConfig::Disabled => Ok(Self { writer: None }),
            DiagnosticsSinkConfig::Stderr => Ok(Self {
                writer: Some(Box::new(io::stderr())),
            }),
            DiagnosticsSinkConfig::File { path, append } => {
                let mut opts = OpenOptions::new();
                opts.create(true).write(true);
                if *append {
                    opts.append(true);
                } else {
                    opts.truncate(true);
                }
                let file = opts.open(path)?;
                Ok(Self {
                    writer: Some(Box::new(file)),
                })
            }
        }
    }

    fn emit_line(&mut self, line: &str) {
        if let Some(writer) = &mut self.writer {
            let _ = writeln!(writer, "{line}");
        }
    }

    fn emit_diagnostics(
        &mut self,
        diagnostics: &[Diagnostic],
        source_lines: Option<&[String]>,
        format: OutputFormat,
        diag_context: bool,
    ) {
        for diag in diagnostics {
            self.emit_line(&format_diagnostic_line(
                diag,
                source_lines,
                format,
                diag_context,
            ));
        }
    }
}

fn severity_to_str(severity: Severity) -> &'static str {
    match severity {
        Severity::Warning => "warning",
        Severity::Error => "error",
    }
}

fn format_diagnostic_line(
    diag: &Diagnostic,
    source_lines: Option<&[String]>,
    format: OutputFormat,
    diag_context: bool,
) -> String {
    if format == OutputFormat::Json {
        return json!({
            "severity": severity_to_str(diag.severity()),
            "line": diag.line(),
            "message": diag.message(),
        })
        .to_string();
    }

    let mut out = diag.message().to_string();
    if diag_context {
        out.push('\n');
        out.push_str(&build_context_line(diag.line(), source_lines));
    }
    out
}

fn main() {
    let cli = Cli::parse();
    let cli_config = match validate_cli(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    let mut sink = match DiagnosticsSink::from_config(&cli_config.diagnostics_sink) {
        Ok(sink) => sink,
        Err(err) => {
            eprintln!("Failed to open diagnostics sink: {err}");
            std::process::exit(1);
        }
    };

    match lineforge::processor::run_with_config(&cli_config) {
        Ok(report) => {
            let failed = report.error_count() > 0
                || (cli_config.treat_warnings_as_errors && report.warning_count() > 0);
            if !cli_config.quiet || failed {
                sink.emit_diagnostics(
                    report.diagnostics(),
                    Some(report.source_lines()),
                    cli_config.output_format,
                    cli_config.diag_context,
                );
            }
            if failed {
                std::process::exit(1);
            }
        }
        Err(err) => {
            sink.emit_diagnostics(
                err.diagnostics(),
                Some(err.source_lines()),
                cli_config.output_format,
                cli_config.diag_context,
            );
            if cli_config.output_format != OutputFormat::Json {
                sink.emit_line(&err.to_string());
            }
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineforge::core::error::{PpError, PpErrorKind};

    #[test]
    fn format_diagnostic_line_json_has_expected_keys() {
        let diag = Diagnostic::new(
            7,
            Severity::Error,
            PpError::new(PpErrorKind::Expression, "boom", None),
        );
        let line = format_diagnostic_line(&diag, None, OutputFormat::Json, false);
        let value: serde_json::Value = serde_json::from_str(&line).expect("valid json");
        assert_eq!(value["severity"], "error");
        assert_eq!(value["line"], 7);
        assert_eq!(value["message"], "boom");
    }

    #[test]
    fn format_diagnostic_line_text_is_the_bare_message() {
        let diag = Diagnostic::new(
            3,
            Severity::Warning,
            PpError::new(PpErrorKind::Directive, "Unmached .ENDM in line: 3", None),
        );
        let line = format_diagnostic_line(&diag, None, OutputFormat::Text, false);
        assert_eq!(line, "Unmached .ENDM in line: 3");
    }

    #[test]
    fn format_diagnostic_line_text_appends_context_when_requested() {
        let diag = Diagnostic::new(
            2,
            Severity::Warning,
            PpError::new(PpErrorKind::Directive, "Unmached .ENDM in line: 2", None),
        );
        let lines = vec!["plain".to_string(), ".ENDM".to_string()];
        let rendered = format_diagnostic_line(&diag, Some(&lines), OutputFormat::Text, true);
        assert_eq!(rendered, "Unmached .ENDM in line: 2\n    2 | .ENDM");
    }
}

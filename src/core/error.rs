// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Error types, diagnostics, and run reports for the preprocessor.

use std::fmt;

/// Categories of expression evaluation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalErrorKind {
    InvalidCharacter,
    UndefinedConstant,
    MissingOperand,
    DivisionByZero,
    InvalidIntegerLiteral,
    EmptyExpression,
}

/// Error returned from expression evaluation.
#[derive(Debug, Clone)]
pub struct EvalError {
    kind: EvalErrorKind,
    message: String,
}

impl EvalError {
    pub fn new(kind: EvalErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> EvalErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EvalError {}

/// Categories of preprocessor errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PpErrorKind {
    Cli,
    Constant,
    Directive,
    Expression,
    Io,
}

/// A preprocessor error with a kind and message.
#[derive(Debug, Clone)]
pub struct PpError {
    kind: PpErrorKind,
    message: String,
}

impl PpError {
    pub fn new(kind: PpErrorKind, msg: &str, param: Option<&str>) -> Self {
        Self {
            kind,
            message: format_error(msg, param),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> PpErrorKind {
        self.kind
    }
}

impl fmt::Display for PpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for PpError {}

/// Severity level for diagnostics.
///
/// `Warning` covers the recoverable tier (processing continues and the run
/// still succeeds unless warnings are promoted); `Error` covers failures
/// that make the run exit non-zero even though later lines are still
/// processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A diagnostic message tied to a source line.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    line: u32,
    severity: Severity,
    error: PpError,
}

impl Diagnostic {
    pub fn new(line: u32, severity: Severity, error: PpError) -> Self {
        Self {
            line,
            severity,
            error,
        }
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn kind(&self) -> PpErrorKind {
        self.error.kind()
    }

    /// The diagnostic stream line for this problem. Line numbers are part
    /// of the message text itself, so this is the full rendering.
    pub fn message(&self) -> &str {
        self.error.message()
    }
}

/// Render the offending source line for context display.
pub fn build_context_line(line_num: u32, lines: Option<&[String]>) -> String {
    let line_idx = line_num.saturating_sub(1) as usize;
    match lines {
        Some(lines) if line_idx < lines.len() => {
            format!("{:>5} | {}", line_num, lines[line_idx])
        }
        _ => format!("{:>5} | <source unavailable>", line_num),
    }
}

/// Per-run statistics.
#[derive(Debug, Default, Clone, Copy)]
pub struct LineCounts {
    pub lines: u32,
    pub errors: u32,
    pub warnings: u32,
}

impl LineCounts {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Report from a completed preprocessing run.
#[derive(Debug)]
pub struct PpRunReport {
    diagnostics: Vec<Diagnostic>,
    output_lines: Vec<String>,
    source_lines: Vec<String>,
    counts: LineCounts,
}

impl PpRunReport {
    pub fn new(
        diagnostics: Vec<Diagnostic>,
        output_lines: Vec<String>,
        source_lines: Vec<String>,
        counts: LineCounts,
    ) -> Self {
        Self {
            diagnostics,
            output_lines,
            source_lines,
            counts,
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn output_lines(&self) -> &[String] {
        &self.output_lines
    }

    pub fn source_lines(&self) -> &[String] {
        &self.source_lines
    }

    pub fn counts(&self) -> LineCounts {
        self.counts
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }
}

/// Error from a failed preprocessing run.
#[derive(Debug)]
pub struct PpRunError {
    error: PpError,
    diagnostics: Vec<Diagnostic>,
    source_lines: Vec<String>,
}

impl PpRunError {
    pub fn new(error: PpError, diagnostics: Vec<Diagnostic>, source_lines: Vec<String>) -> Self {
        Self {
            error,
            diagnostics,
            source_lines,
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn source_lines(&self) -> &[String] {
        &self.source_lines
    }

    pub fn kind(&self) -> PpErrorKind {
        self.error.kind()
    }
}

impl fmt::Display for PpRunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for PpRunError {}

/// Format an error message with an optional parameter.
pub fn format_error(msg: &str, param: Option<&str>) -> String {
    match param {
        Some(p) => format!("{msg}: {p}"),
        None => msg.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_message_is_the_stream_line() {
        let err = PpError::new(PpErrorKind::Directive, "Unmached .ENDM in line: 12", None);
        let diag = Diagnostic::new(12, Severity::Warning, err);
        assert_eq!(diag.message(), "Unmached .ENDM in line: 12");
        assert_eq!(diag.line(), 12);
        assert_eq!(diag.severity(), Severity::Warning);
    }

    #[test]
    fn format_error_appends_param() {
        assert_eq!(
            format_error("Error opening input file", Some("no such file")),
            "Error opening input file: no such file"
        );
        assert_eq!(format_error("Bad thing", None), "Bad thing");
    }

    #[test]
    fn context_line_renders_source_or_placeholder() {
        let lines = vec!["first".to_string(), "second".to_string()];
        assert_eq!(build_context_line(2, Some(&lines)), "    2 | second");
        assert_eq!(
            build_context_line(9, Some(&lines)),
            "    9 | <source unavailable>"
        );
        assert_eq!(build_context_line(1, None), "    1 | <source unavailable>");
    }

    #[test]
    fn report_counts_split_by_severity() {
        let diagnostics = vec![
            Diagnostic::new(
                1,
                Severity::Warning,
                PpError::new(PpErrorKind::Directive, "w", None),
            ),
            Diagnostic::new(
                2,
                Severity::Error,
                PpError::new(PpErrorKind::Expression, "e", None),
            ),
            Diagnostic::new(
                3,
                Severity::Error,
                PpError::new(PpErrorKind::Constant, "e2", None),
            ),
        ];
        let report = PpRunReport::new(diagnostics, Vec::new(), Vec::new(), LineCounts::new());
        assert_eq!(report.warning_count(), 1);
        assert_eq!(report.error_count(), 2);
    }
}

// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Macro processing engine: constant table, repeat stack, line dispatch.
//!
//! The engine is a single-pass state machine over input lines. Plain lines
//! pass through (or are captured by the innermost open repeat block);
//! `.CONST` mutates the constant table; `.REPT`/`.ENDM` open and close
//! repeat blocks whose counts are evaluated expressions. Nested blocks are
//! realized by deferral: a closed inner block's expansion is appended to
//! its parent's line buffer instead of the output.

use std::collections::HashMap;

use crate::core::error::{Diagnostic, LineCounts, PpError, PpErrorKind, Severity};
use crate::core::evaluator;

/// An open repeat block accumulating lines until its matching `.ENDM`.
#[derive(Debug, Clone)]
struct RepeatBlock {
    count: i64,
    lines: Vec<String>,
}

/// One preprocessing run's worth of state. Create a fresh engine per run.
#[derive(Debug)]
pub struct MacroEngine {
    constants: HashMap<String, i64>,
    repeat_stack: Vec<RepeatBlock>,
    output: Vec<String>,
    diagnostics: Vec<Diagnostic>,
    line_num: u32,
}

impl Default for MacroEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MacroEngine {
    pub fn new() -> Self {
        Self {
            constants: HashMap::new(),
            repeat_stack: Vec::new(),
            output: Vec::new(),
            diagnostics: Vec::new(),
            line_num: 0,
        }
    }

    /// Predefine a constant (for `-D NAME=VAL` style seeding).
    pub fn define_constant(&mut self, name: impl Into<String>, value: i64) {
        self.constants.insert(name.into(), value);
    }

    /// Process a full input and close out the run.
    pub fn process(&mut self, lines: &[String]) {
        for line in lines {
            self.process_line(line);
        }
        self.finish();
    }

    /// Process one physical input line.
    pub fn process_line(&mut self, raw: &str) {
        self.line_num += 1;
        // Only ordinary spaces are trimmed; tabs are content.
        let line = raw.trim_matches(' ');
        if line.is_empty() || line.starts_with('#') {
            return;
        }

        let stripped = line.trim_start();
        let (cmd, rest) = match stripped.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, rest),
            None => (stripped, ""),
        };

        match cmd {
            ".CONST" => self.handle_const(rest.trim()),
            ".REPT" => self.handle_rept(rest.split_whitespace().next()),
            ".ENDM" => self.handle_endm(),
            _ if cmd.starts_with('.') => {
                let message = format!(
                    "Syntax error: Unrecognized command in line {}: {}",
                    self.line_num, cmd
                );
                self.diag(Severity::Warning, PpErrorKind::Directive, message);
            }
            _ => self.emit(line),
        }
    }

    /// Close out the run: any block still open is unterminated.
    pub fn finish(&mut self) {
        if !self.repeat_stack.is_empty() {
            self.repeat_stack.clear();
            self.diag(
                Severity::Warning,
                PpErrorKind::Directive,
                "Missing .ENDM for .REPT block".to_string(),
            );
        }
    }

    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn counts(&self) -> LineCounts {
        let mut counts = LineCounts::new();
        counts.lines = self.line_num;
        for diag in &self.diagnostics {
            match diag.severity() {
                Severity::Warning => counts.warnings += 1,
                Severity::Error => counts.errors += 1,
            }
        }
        counts
    }

    fn handle_const(&mut self, def: &str) {
        let Some((name, value)) = def.split_once('=') else {
            let message = format!(
                "Syntax error in .CONST definition in line: {}",
                self.line_num
            );
            self.diag(Severity::Warning, PpErrorKind::Constant, message);
            return;
        };
        match value.trim().parse::<i64>() {
            Ok(value) => {
                // Last definition wins, silently.
                self.constants.insert(name.trim().to_string(), value);
            }
            Err(_) => {
                let message = format!(
                    "Invalid integer literal in .CONST definition in line: {}",
                    self.line_num
                );
                self.diag(Severity::Error, PpErrorKind::Constant, message);
            }
        }
    }

    fn handle_rept(&mut self, expr: Option<&str>) {
        let Some(expr) = expr else {
            let message = format!(
                "No expression detected for .REPT in line: {}",
                self.line_num
            );
            self.diag(Severity::Warning, PpErrorKind::Directive, message);
            return;
        };
        match evaluator::evaluate(expr, &self.constants) {
            Ok(count) => self.repeat_stack.push(RepeatBlock {
                count,
                lines: Vec::new(),
            }),
            Err(err) => {
                let message = format!(
                    "Error in .REPT expression in line: {}: {}",
                    self.line_num,
                    err.message()
                );
                self.diag(Severity::Error, PpErrorKind::Expression, message);
            }
        }
    }

    fn handle_endm(&mut self) {
        let Some(block) = self.repeat_stack.pop() else {
            let message = format!("Unmached .ENDM in line: {}", self.line_num);
            self.diag(Severity::Warning, PpErrorKind::Directive, message);
            return;
        };

        // Non-positive counts expand to nothing, silently.
        let mut expanded = Vec::new();
        for _ in 0..block.count.max(0) {
            expanded.extend(block.lines.iter().cloned());
        }

        match self.repeat_stack.last_mut() {
            Some(parent) => parent.lines.extend(expanded),
            None => self.output.extend(expanded),
        }
    }

    fn emit(&mut self, line: &str) {
        match self.repeat_stack.last_mut() {
            Some(block) => block.lines.push(line.to_string()),
            None => self.output.push(line.to_string()),
        }
    }

    fn diag(&mut self, severity: Severity, kind: PpErrorKind, message: String) {
        let error = PpError::new(kind, &message, None);
        self.diagnostics.push(Diagnostic::new(self.line_num, severity, error));
    }
}

#[cfg(test)]
mod tests {
    use super::MacroEngine;
    use crate::core::error::{PpErrorKind, Severity};

    fn run(lines: &[&str]) -> MacroEngine {
        let lines: Vec<String> = lines.iter().map(|line| line.to_string()).collect();
        let mut engine = MacroEngine::new();
        engine.process(&lines);
        engine
    }

    fn messages(engine: &MacroEngine) -> Vec<&str> {
        engine.diagnostics().iter().map(|d| d.message()).collect()
    }

    #[test]
    fn expands_repeat_block_with_constant_expression() {
        let engine = run(&[
            ".CONST PI=3",
            ".CONST E=2",
            ".REPT PI+1",
            "Line inside repeat block",
            ".ENDM",
            "Line outside repeat block",
        ]);
        assert_eq!(
            engine.output(),
            vec![
                "Line inside repeat block",
                "Line inside repeat block",
                "Line inside repeat block",
                "Line inside repeat block",
                "Line outside repeat block",
            ]
        );
        assert!(engine.diagnostics().is_empty());
    }

    #[test]
    fn nested_blocks_interleave_per_outer_iteration() {
        let engine = run(&[
            ".REPT 2",
            "Outer line",
            ".REPT 3",
            "Inner line",
            ".ENDM",
            ".ENDM",
        ]);
        assert_eq!(
            engine.output(),
            vec![
                "Outer line",
                "Inner line",
                "Inner line",
                "Inner line",
                "Outer line",
                "Inner line",
                "Inner line",
                "Inner line",
            ]
        );
        assert!(engine.diagnostics().is_empty());
    }

    #[test]
    fn repeat_of_one_reproduces_inner_lines_unchanged() {
        let engine = run(&[".REPT 1", "a", "b", ".ENDM"]);
        assert_eq!(engine.output(), vec!["a", "b"]);
        assert!(engine.diagnostics().is_empty());
    }

    #[test]
    fn zero_and_negative_counts_expand_to_nothing() {
        let engine = run(&[".REPT 0", "dropped", ".ENDM"]);
        assert!(engine.output().is_empty());
        assert!(engine.diagnostics().is_empty());

        let engine = run(&[".CONST N=2", ".REPT N-5", "dropped", ".ENDM", "kept"]);
        assert_eq!(engine.output(), vec!["kept"]);
        assert!(engine.diagnostics().is_empty());
    }

    #[test]
    fn plain_text_passes_through_unchanged() {
        let engine = run(&["first", "second", "third"]);
        assert_eq!(engine.output(), vec!["first", "second", "third"]);
        assert!(engine.diagnostics().is_empty());
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let engine = run(&["# a comment", "", "   ", "text", "  # indented comment"]);
        assert_eq!(engine.output(), vec!["text"]);
        assert!(engine.diagnostics().is_empty());
    }

    #[test]
    fn empty_input_produces_nothing() {
        let engine = run(&[]);
        assert!(engine.output().is_empty());
        assert!(engine.diagnostics().is_empty());
    }

    #[test]
    fn surrounding_spaces_are_trimmed_from_content() {
        let engine = run(&["   padded   "]);
        assert_eq!(engine.output(), vec!["padded"]);
    }

    #[test]
    fn const_without_equals_is_a_syntax_diagnostic() {
        let engine = run(&[".CONST InvalidConstDefinition"]);
        assert_eq!(
            messages(&engine),
            vec!["Syntax error in .CONST definition in line: 1"]
        );
        assert_eq!(engine.diagnostics()[0].severity(), Severity::Warning);
    }

    #[test]
    fn const_redefinition_is_last_write_wins() {
        let engine = run(&[".CONST N=2", ".CONST N=5", ".REPT N", "x", ".ENDM"]);
        assert_eq!(engine.output(), vec!["x", "x", "x", "x", "x"]);
        assert!(engine.diagnostics().is_empty());
    }

    #[test]
    fn const_tolerates_spaces_around_equals() {
        let engine = run(&[".CONST N = 2", ".REPT N", "x", ".ENDM"]);
        assert_eq!(engine.output(), vec!["x", "x"]);
        assert!(engine.diagnostics().is_empty());
    }

    #[test]
    fn const_accepts_negative_values() {
        let engine = run(&[".CONST N=-3", ".REPT N", "dropped", ".ENDM"]);
        assert!(engine.output().is_empty());
        assert!(engine.diagnostics().is_empty());
    }

    #[test]
    fn const_with_bad_integer_is_an_error_but_run_continues() {
        let engine = run(&[".CONST N=abc", "still here"]);
        assert_eq!(
            messages(&engine),
            vec!["Invalid integer literal in .CONST definition in line: 1"]
        );
        assert_eq!(engine.diagnostics()[0].severity(), Severity::Error);
        assert_eq!(engine.diagnostics()[0].kind(), PpErrorKind::Constant);
        assert_eq!(engine.output(), vec!["still here"]);
    }

    #[test]
    fn rept_without_expression_is_diagnosed_and_skipped() {
        let engine = run(&[".REPT", "not captured", ".ENDM"]);
        assert_eq!(
            messages(&engine),
            vec![
                "No expression detected for .REPT in line: 1",
                "Unmached .ENDM in line: 3",
            ]
        );
        // No frame was pushed, so the body line went straight to output.
        assert_eq!(engine.output(), vec!["not captured"]);
    }

    #[test]
    fn rept_ignores_trailing_tokens_after_the_expression() {
        let engine = run(&[".REPT 2 trailing junk", "x", ".ENDM"]);
        assert_eq!(engine.output(), vec!["x", "x"]);
        assert!(engine.diagnostics().is_empty());
    }

    #[test]
    fn rept_with_undefined_constant_is_an_error_but_run_continues() {
        let engine = run(&[".REPT BOGUS", "line", ".ENDM", "after"]);
        assert_eq!(
            messages(&engine),
            vec![
                "Error in .REPT expression in line: 1: Undefined constant: BOGUS",
                "Unmached .ENDM in line: 3",
            ]
        );
        assert_eq!(engine.diagnostics()[0].severity(), Severity::Error);
        assert_eq!(engine.diagnostics()[0].kind(), PpErrorKind::Expression);
        assert_eq!(engine.output(), vec!["line", "after"]);
    }

    #[test]
    fn rept_with_division_by_zero_is_an_error() {
        let engine = run(&[".REPT 3/0", "x", ".ENDM"]);
        assert_eq!(
            messages(&engine)[0],
            "Error in .REPT expression in line: 1: Division by zero"
        );
    }

    #[test]
    fn unmatched_endm_is_diagnosed_and_processing_continues() {
        let engine = run(&[".ENDM", "after"]);
        assert_eq!(messages(&engine), vec!["Unmached .ENDM in line: 1"]);
        assert_eq!(engine.output(), vec!["after"]);
    }

    #[test]
    fn unrecognized_command_is_diagnosed() {
        let engine = run(&[".UNKNOWNCOMMAND"]);
        assert_eq!(
            messages(&engine),
            vec!["Syntax error: Unrecognized command in line 1: .UNKNOWNCOMMAND"]
        );
    }

    #[test]
    fn unterminated_block_drops_trapped_content() {
        let engine = run(&[".REPT 3", "Unfinished repeat block"]);
        assert_eq!(messages(&engine), vec!["Missing .ENDM for .REPT block"]);
        assert!(engine.output().is_empty());
    }

    #[test]
    fn unterminated_nesting_reports_missing_endm_once() {
        let engine = run(&[".REPT 2", ".REPT 3", "deep"]);
        assert_eq!(messages(&engine), vec!["Missing .ENDM for .REPT block"]);
        assert!(engine.output().is_empty());
    }

    #[test]
    fn diagnostics_use_physical_line_numbers() {
        // Blank and comment lines count once each, so the bad directive on
        // physical line 4 is reported as line 4.
        let engine = run(&["# header", "", "text", ".BOGUS"]);
        assert_eq!(
            messages(&engine),
            vec!["Syntax error: Unrecognized command in line 4: .BOGUS"]
        );
        assert_eq!(engine.diagnostics()[0].line(), 4);
    }

    #[test]
    fn predefined_constants_are_visible_to_rept() {
        let lines: Vec<String> = vec![".REPT N".to_string(), "x".to_string(), ".ENDM".to_string()];
        let mut engine = MacroEngine::new();
        engine.define_constant("N", 2);
        engine.process(&lines);
        assert_eq!(engine.output(), vec!["x", "x"]);
        assert!(engine.diagnostics().is_empty());
    }

    #[test]
    fn counts_track_lines_and_severities() {
        let engine = run(&[".CONST N=abc", ".ENDM", "plain"]);
        let counts = engine.counts();
        assert_eq!(counts.lines, 3);
        assert_eq!(counts.errors, 1);
        assert_eq!(counts.warnings, 1);
    }
}

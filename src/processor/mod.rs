// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Preprocessor run orchestration.
//!
//! Ties the CLI configuration to the engine and the file sinks: reads the
//! input line-by-line, drives [`MacroEngine`], writes the expanded output,
//! and returns a run report carrying output lines, diagnostics, and counts.

pub mod cli;
mod engine;

pub use cli::VERSION;
pub use engine::MacroEngine;

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use clap::Parser;

use crate::core::error::{PpError, PpErrorKind, PpRunError, PpRunReport};
use cli::{Cli, CliConfig, OutputSinkConfig, validate_cli};

/// Run the preprocessor with command-line arguments.
pub fn run() -> Result<PpRunReport, PpRunError> {
    let cli = Cli::parse();
    run_with_cli(&cli)
}

pub fn run_with_cli(cli: &Cli) -> Result<PpRunReport, PpRunError> {
    let config = validate_cli(cli)?;
    run_with_config(&config)
}

pub fn run_with_config(config: &CliConfig) -> Result<PpRunReport, PpRunError> {
    let source_lines = read_source_lines(&config.input_path)?;

    let mut macro_engine = MacroEngine::new();
    for (name, value) in &config.defines {
        macro_engine.define_constant(name.clone(), *value);
    }
    macro_engine.process(&source_lines);

    let counts = macro_engine.counts();
    let output_lines = macro_engine.take_output();
    let diagnostics = macro_engine.take_diagnostics();

    if let Err(err) = write_output(&config.output, &output_lines) {
        return Err(PpRunError::new(
            PpError::new(PpErrorKind::Io, "Error writing output", Some(&err.to_string())),
            diagnostics,
            source_lines,
        ));
    }

    Ok(PpRunReport::new(
        diagnostics,
        output_lines,
        source_lines,
        counts,
    ))
}

fn read_source_lines(path: &Path) -> Result<Vec<String>, PpRunError> {
    let io_error = |err: io::Error| {
        PpRunError::new(
            PpError::new(
                PpErrorKind::Io,
                "Error reading input file",
                Some(&err.to_string()),
            ),
            Vec::new(),
            Vec::new(),
        )
    };

    let file = File::open(path).map_err(io_error)?;
    let mut lines = Vec::new();
    for line in BufReader::new(file).lines() {
        lines.push(line.map_err(io_error)?);
    }
    Ok(lines)
}

fn write_output(output: &OutputSinkConfig, lines: &[String]) -> io::Result<()> {
    match output {
        OutputSinkConfig::Stdout => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            for line in lines {
                writeln!(writer, "{line}")?;
            }
            writer.flush()
        }
        OutputSinkConfig::File(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            for line in lines {
                writeln!(writer, "{line}")?;
            }
            writer.flush()
        }
    }
}

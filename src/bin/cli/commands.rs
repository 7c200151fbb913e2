//! Command implementations for the CLI tool.

use std::path::Path;

use bulkdump::{ArchiveScanner, Dialect, EntrySelector, RecordConsumer, RunConfig, RunCoordinator};

use crate::OutputFormat;
use crate::exit_codes::{ExitCode, error_to_exit_code};
use crate::output::create_formatter;

/// Record processing commands (count, cat, grep)
pub fn run(
    config: &RunConfig,
    consumer: &mut dyn RecordConsumer,
    format: OutputFormat,
) -> ExitCode {
    let formatter = create_formatter(format);
    let coordinator = RunCoordinator::new(config.clone());

    let stats = match coordinator.run(consumer) {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("Error: {}", e);
            return error_to_exit_code(&e);
        }
    };

    // Records own standard output unless they went to a file
    let report = formatter.format_stats(&stats);
    if config.output.is_some() {
        println!("{}", report.trim_end());
    } else {
        eprintln!("{}", report.trim_end());
    }

    if stats.failures() > 0 {
        ExitCode::Warning
    } else {
        ExitCode::Success
    }
}

/// List command implementation
pub fn list(input: &Path, selector: Option<EntrySelector>, format: OutputFormat) -> ExitCode {
    let formatter = create_formatter(format);

    let mut scanner = ArchiveScanner::new(input, selector.unwrap_or_default());
    if let Err(e) = scanner.open() {
        eprintln!("Error opening archive: {}", e);
        return error_to_exit_code(&e);
    }

    let mut names = Vec::new();
    loop {
        match scanner.next_entry() {
            Ok(Some(entry)) => names.push(entry.name().to_string()),
            Ok(None) => break,
            Err(e) => {
                eprintln!("Error: {}", e);
                return error_to_exit_code(&e);
            }
        }
    }
    scanner.close();

    println!("{}", formatter.format_entries(&names).trim_end());
    ExitCode::Success
}

/// Detect command implementation
pub fn detect(input: &Path, format: OutputFormat) -> ExitCode {
    let formatter = create_formatter(format);

    match Dialect::detect(input, None) {
        Ok(dialect) => {
            let report = formatter.format_dialect(&input.display().to_string(), dialect);
            println!("{}", report.trim_end());
            if dialect.is_some() {
                ExitCode::Success
            } else {
                ExitCode::Warning
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            error_to_exit_code(&e)
        }
    }
}

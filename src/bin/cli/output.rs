//! Output formatting for CLI operations.

use serde_json::json;

use bulkdump::{Dialect, RunStatistics};

/// Trait for output formatting
pub trait OutputFormatter {
    /// Formats run statistics
    fn format_stats(&self, stats: &RunStatistics) -> String;

    /// Formats a list of archive entry names
    fn format_entries(&self, entries: &[String]) -> String;

    /// Formats a dialect detection result
    fn format_dialect(&self, input: &str, dialect: Option<Dialect>) -> String;
}

/// Human-readable output formatter
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn format_stats(&self, stats: &RunStatistics) -> String {
        let mut output = String::new();

        output.push_str(&format!("{}:\n", stats.task_name()));
        output.push_str(&"-".repeat(40));
        output.push('\n');
        output.push_str(&format!("  Records:   {}\n", stats.records()));
        output.push_str(&format!("  Succeeded: {}\n", stats.successes()));
        output.push_str(&format!("  Failed:    {}\n", stats.failures()));
        if stats.records() > 0 {
            output.push_str(&format!(
                "  Success:   {:.1}%\n",
                stats.success_rate() * 100.0
            ));
        }

        if !stats.failed_sources().is_empty() {
            output.push_str("\nFailures:\n");
            for source in stats.failed_sources() {
                output.push_str(&format!("  {}\n", source));
            }
        }

        output
    }

    fn format_entries(&self, entries: &[String]) -> String {
        let mut output = String::new();
        for entry in entries {
            output.push_str(entry);
            output.push('\n');
        }
        output.push_str(&"-".repeat(40));
        output.push('\n');
        output.push_str(&format!("{} entries\n", entries.len()));
        output
    }

    fn format_dialect(&self, input: &str, dialect: Option<Dialect>) -> String {
        match dialect {
            Some(dialect) => match dialect.body_tag() {
                Some(tag) => format!("{}: {} (<{}> records)\n", input, dialect, tag),
                None => format!("{}: {} (flat records)\n", input, dialect),
            },
            None => format!("{}: unknown\n", input),
        }
    }
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format_stats(&self, stats: &RunStatistics) -> String {
        let obj = json!({
            "task": stats.task_name(),
            "records": stats.records(),
            "successes": stats.successes(),
            "failures": stats.failures(),
            "success_rate": stats.success_rate(),
            "failed_sources": stats.failed_sources(),
        });

        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_entries(&self, entries: &[String]) -> String {
        serde_json::to_string_pretty(entries).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_dialect(&self, input: &str, dialect: Option<Dialect>) -> String {
        let obj = json!({
            "input": input,
            "dialect": dialect.map(|d| d.name()),
            "body_tag": dialect.and_then(|d| d.body_tag()),
        });

        serde_json::to_string_pretty(&obj).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Creates the appropriate formatter based on output format
pub fn create_formatter(format: super::OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        super::OutputFormat::Human => Box::new(HumanFormatter),
        super::OutputFormat::Json => Box::new(JsonFormatter),
    }
}

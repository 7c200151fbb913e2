//! Record consumers behind the CLI commands.

use std::io::Write;

use bulkdump::{ConsumerResult, Dialect, Outcome, RecordConsumer, RecordContext};
use regex::{Regex, RegexBuilder};

/// Counts records; every record succeeds.
#[derive(Default)]
pub struct Count {
    bytes: u64,
}

impl RecordConsumer for Count {
    fn process(
        &mut self,
        _ctx: &RecordContext<'_>,
        record: &str,
        _out: &mut dyn Write,
    ) -> ConsumerResult<Outcome> {
        self.bytes += record.len() as u64;
        Ok(Outcome::Success)
    }

    fn finish(&mut self, _out: &mut dyn Write) -> ConsumerResult<()> {
        log::info!("{} record bytes read", self.bytes);
        Ok(())
    }
}

/// Copies raw records to the output.
#[derive(Default)]
pub struct Cat {
    dialect: Option<Dialect>,
}

impl RecordConsumer for Cat {
    fn on_dialect(&mut self, dialect: Option<Dialect>) {
        self.dialect = dialect;
    }

    fn process(
        &mut self,
        ctx: &RecordContext<'_>,
        record: &str,
        out: &mut dyn Write,
    ) -> ConsumerResult<Outcome> {
        if record.trim().is_empty() {
            log::warn!("[{}] empty {} record", ctx, dialect_name(self.dialect));
            return Ok(Outcome::Failure);
        }
        out.write_all(record.as_bytes())?;
        if !record.ends_with('\n') {
            out.write_all(b"\n")?;
        }
        Ok(Outcome::Success)
    }
}

/// Writes the source identifier of every record matching a pattern.
///
/// Matching records succeed; the rest fail, so the failure list of the run
/// holds every non-matching record.
pub struct Grep {
    pattern: Regex,
}

impl Grep {
    pub fn new(pattern: &str, ignore_case: bool) -> Result<Self, regex::Error> {
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(ignore_case)
            .build()?;
        Ok(Self { pattern })
    }
}

impl RecordConsumer for Grep {
    fn setup(&mut self, _out: &mut dyn Write) -> ConsumerResult<()> {
        log::debug!("searching for /{}/", self.pattern);
        Ok(())
    }

    fn process(
        &mut self,
        ctx: &RecordContext<'_>,
        record: &str,
        out: &mut dyn Write,
    ) -> ConsumerResult<Outcome> {
        let matched = self.pattern.is_match(record);
        if matched {
            writeln!(out, "{}", ctx.source())?;
        }
        Ok(Outcome::from(matched))
    }
}

fn dialect_name(dialect: Option<Dialect>) -> &'static str {
    dialect.map_or("unknown", |d| d.name())
}

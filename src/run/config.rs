//! Run configuration.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::select::EntrySelector;
use crate::stats::RunStatistics;
use crate::{Error, Result};

/// Configuration for one [`RunCoordinator`](super::RunCoordinator) run.
///
/// Limits are optional; a limit of `None` never stops the run. The setters
/// treat `0` as "no limit".
///
/// # Example
///
/// ```rust
/// use bulkdump::RunConfig;
///
/// let config = RunConfig::new("ipg050104.zip")
///     .skip(100)
///     .max_records(1_000)
///     .max_failures(10);
/// assert_eq!(config.task_name(), "ipg050104.zip");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Dump file, ZIP archive or directory to read.
    pub input: PathBuf,

    /// Output file. Standard output is used when unset.
    pub output: Option<PathBuf>,

    /// Records skipped once, before the first record is processed.
    pub skip: u64,

    /// Stop once this many records have been examined.
    pub max_records: Option<u64>,

    /// Stop once this many records have succeeded.
    pub max_successes: Option<u64>,

    /// Stop once this many records have failed.
    pub max_failures: Option<u64>,

    /// Prefix SGML records with the entity-definition header.
    pub inject_entity_header: bool,

    /// Treat the input as a flat dump without sniffing it.
    pub force_flat: bool,

    /// Body element overriding the detected one.
    pub body_tag: Option<String>,

    /// Start-of-record marker overriding `PATN` for flat dumps.
    pub marker: Option<String>,

    /// Entries to read from an archive or directory. When set, every
    /// matching entry is read in turn.
    pub selector: Option<EntrySelector>,

    /// Name for the returned statistics. Derived from the input file name
    /// when unset.
    pub task_name: Option<String>,
}

impl RunConfig {
    /// Creates a configuration reading `input` with no limits.
    pub fn new<P: AsRef<Path>>(input: P) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Sets the output file.
    pub fn output<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the number of records skipped before processing starts.
    pub fn skip(mut self, count: u64) -> Self {
        self.skip = count;
        self
    }

    /// Sets the maximum number of records examined.
    pub fn max_records(mut self, count: u64) -> Self {
        self.max_records = limit(count);
        self
    }

    /// Sets the maximum number of successes.
    pub fn max_successes(mut self, count: u64) -> Self {
        self.max_successes = limit(count);
        self
    }

    /// Sets the maximum number of failures.
    pub fn max_failures(mut self, count: u64) -> Self {
        self.max_failures = limit(count);
        self
    }

    /// Sets whether SGML records get the entity-definition header.
    pub fn inject_entity_header(mut self, inject: bool) -> Self {
        self.inject_entity_header = inject;
        self
    }

    /// Sets whether the input is read as a flat dump regardless of content.
    pub fn force_flat(mut self, force: bool) -> Self {
        self.force_flat = force;
        self
    }

    /// Overrides the body element of tagged dumps.
    pub fn body_tag(mut self, tag: impl Into<String>) -> Self {
        self.body_tag = Some(tag.into());
        self
    }

    /// Overrides the start-of-record marker of flat dumps.
    pub fn marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    /// Reads every archive entry passing `selector`.
    pub fn selector(mut self, selector: EntrySelector) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Name of the returned statistics.
    pub fn task_name(&self) -> String {
        match &self.task_name {
            Some(name) => name.clone(),
            None => self
                .input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.input.display().to_string()),
        }
    }

    /// Sets the name of the returned statistics.
    pub fn with_task_name(mut self, name: impl Into<String>) -> Self {
        self.task_name = Some(name.into());
        self
    }

    /// Returns the first configured limit that `stats` has reached.
    pub fn limit_reached(&self, stats: &RunStatistics) -> Option<Limit> {
        let reached = |max: Option<u64>, count: u64| max.is_some_and(|max| count >= max);
        if reached(self.max_records, stats.records()) {
            Some(Limit::Records)
        } else if reached(self.max_successes, stats.successes()) {
            Some(Limit::Successes)
        } else if reached(self.max_failures, stats.failures()) {
            Some(Limit::Failures)
        } else {
            None
        }
    }

    /// Validates the configuration.
    ///
    /// Returns an error if any values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.input.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("input path is empty".into()));
        }

        if let Some(marker) = &self.marker {
            if marker.trim().is_empty() {
                return Err(Error::InvalidConfig("record marker is empty".into()));
            }
            if marker.contains('\n') {
                return Err(Error::InvalidConfig(
                    "record marker must be a single line".into(),
                ));
            }
        }

        if let Some(tag) = &self.body_tag {
            let invalid = |c: char| c.is_whitespace() || c == '<' || c == '>';
            if tag.is_empty() || tag.contains(invalid) {
                return Err(Error::InvalidConfig(format!(
                    "'{}' is not a valid element name",
                    tag
                )));
            }
        }

        Ok(())
    }
}

fn limit(count: u64) -> Option<u64> {
    (count > 0).then_some(count)
}

/// A run limit that stopped processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// Maximum records examined.
    Records,
    /// Maximum successes.
    Successes,
    /// Maximum failures.
    Failures,
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Records => write!(f, "record limit"),
            Limit::Successes => write!(f, "success limit"),
            Limit::Failures => write!(f, "failure limit"),
        }
    }
}

//! Per-run outcome ledger.
//!
//! [`RunStatistics`] counts records examined, successes and failures, and
//! remembers where every failure happened so that a later run can target
//! only the failed subset. Statistics compose: a parent built from several
//! per-input children carries their summed totals and keeps the children
//! for lookup by task name.

use std::fmt;

/// Counts and failure locations for one run, or for a group of runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStatistics {
    task_name: String,
    records: u64,
    successes: u64,
    failures: u64,
    failed_sources: Vec<String>,
    children: Vec<RunStatistics>,
}

impl RunStatistics {
    /// Creates empty statistics for the named task.
    pub fn new(task_name: impl Into<String>) -> Self {
        Self {
            task_name: task_name.into(),
            ..Default::default()
        }
    }

    /// Counts one record examined.
    pub fn record(&mut self) {
        self.records += 1;
    }

    /// Counts one successful record.
    pub fn success(&mut self) {
        self.successes += 1;
    }

    /// Counts one failed record and remembers where it came from.
    pub fn failure(&mut self, location: impl Into<String>) {
        self.failures += 1;
        self.failed_sources.push(location.into());
    }

    /// Folds each child's counts into these statistics and keeps the
    /// children for [`child`](Self::child) lookups.
    ///
    /// The fold is a snapshot: the children are moved in, so nothing can
    /// change them afterwards.
    pub fn add<I>(&mut self, children: I)
    where
        I: IntoIterator<Item = RunStatistics>,
    {
        for child in children {
            self.records += child.records;
            self.successes += child.successes;
            self.failures += child.failures;
            self.children.push(child);
        }
    }

    /// Finds a child by task name.
    pub fn child(&self, name: &str) -> Option<&RunStatistics> {
        self.children.iter().find(|c| c.task_name == name)
    }

    /// Children added so far, in insertion order.
    pub fn children(&self) -> &[RunStatistics] {
        &self.children
    }

    /// Task name.
    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    /// Records examined.
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Records the consumer reported as successful.
    pub fn successes(&self) -> u64 {
        self.successes
    }

    /// Records the consumer reported as failed.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Source identifiers of failed records, in the order they failed.
    ///
    /// Only failures recorded directly on these statistics are listed;
    /// children keep their own.
    pub fn failed_sources(&self) -> &[String] {
        &self.failed_sources
    }

    /// Returns true when every examined record ended as a success or a
    /// failure.
    pub fn is_balanced(&self) -> bool {
        self.records == self.successes + self.failures
    }

    /// Fraction of examined records that succeeded, or 0.0 if none were.
    pub fn success_rate(&self) -> f64 {
        if self.records == 0 {
            0.0
        } else {
            self.successes as f64 / self.records as f64
        }
    }
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.task_name.is_empty() {
            write!(f, "{}: ", self.task_name)?;
        }
        write!(
            f,
            "{} records, {} succeeded, {} failed",
            self.records, self.successes, self.failures
        )?;
        if self.records > 0 {
            write!(f, " ({:.1}% success)", self.success_rate() * 100.0)?;
        }
        Ok(())
    }
}

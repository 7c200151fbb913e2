//! The per-record consumer contract.

use std::io::Write;

use crate::dialect::Dialect;

/// Error type consumers may return from their hooks.
pub type ConsumerError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for consumer hooks.
pub type ConsumerResult<T> = std::result::Result<T, ConsumerError>;

/// How a consumer judged one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The record was handled.
    Success,
    /// The record was rejected. Counted and located; the run continues.
    Failure,
}

impl Outcome {
    /// Returns true for [`Outcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

impl From<bool> for Outcome {
    fn from(success: bool) -> Self {
        if success {
            Outcome::Success
        } else {
            Outcome::Failure
        }
    }
}

/// Diagnostic context for the record being processed.
///
/// Passed to [`RecordConsumer::process`] so that anything the consumer logs
/// can be attributed to its record.
#[derive(Debug, Clone, Copy)]
pub struct RecordContext<'a> {
    source: &'a str,
    position: u64,
    dialect: Option<Dialect>,
}

impl<'a> RecordContext<'a> {
    /// Creates a context.
    pub fn new(source: &'a str, position: u64, dialect: Option<Dialect>) -> Self {
        Self {
            source,
            position,
            dialect,
        }
    }

    /// Stable record identifier, `<file-name>:<position>`.
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// 1-based position of the record in its stream.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Dialect of the dump, if it was detected.
    pub fn dialect(&self) -> Option<Dialect> {
        self.dialect
    }
}

impl std::fmt::Display for RecordContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.source)
    }
}

/// Pluggable per-record processing driven by a
/// [`RunCoordinator`](super::RunCoordinator).
///
/// A run calls [`on_dialect`](Self::on_dialect) and
/// [`setup`](Self::setup) once, [`process`](Self::process) for every
/// record, and [`finish`](Self::finish) once, even when a limit or a fault
/// ended the run early.
///
/// An `Err` from any hook aborts the run. Rejecting a single record is
/// expressed as `Ok(Outcome::Failure)` instead.
pub trait RecordConsumer {
    /// Called with the detected dialect before processing starts.
    fn on_dialect(&mut self, dialect: Option<Dialect>) {
        let _ = dialect;
    }

    /// One-time setup with the output sink.
    fn setup(&mut self, out: &mut dyn Write) -> ConsumerResult<()> {
        let _ = out;
        Ok(())
    }

    /// Processes one record.
    fn process(
        &mut self,
        ctx: &RecordContext<'_>,
        record: &str,
        out: &mut dyn Write,
    ) -> ConsumerResult<Outcome>;

    /// One-time completion with the output sink.
    fn finish(&mut self, out: &mut dyn Write) -> ConsumerResult<()> {
        let _ = out;
        Ok(())
    }
}

impl<C: RecordConsumer + ?Sized> RecordConsumer for &mut C {
    fn on_dialect(&mut self, dialect: Option<Dialect>) {
        (**self).on_dialect(dialect)
    }

    fn setup(&mut self, out: &mut dyn Write) -> ConsumerResult<()> {
        (**self).setup(out)
    }

    fn process(
        &mut self,
        ctx: &RecordContext<'_>,
        record: &str,
        out: &mut dyn Write,
    ) -> ConsumerResult<Outcome> {
        (**self).process(ctx, record, out)
    }

    fn finish(&mut self, out: &mut dyn Write) -> ConsumerResult<()> {
        (**self).finish(out)
    }
}

/// A consumer that calls a closure for every record.
pub struct ClosureConsumer<F> {
    callback: F,
}

impl<F> ClosureConsumer<F>
where
    F: FnMut(&RecordContext<'_>, &str, &mut dyn Write) -> ConsumerResult<Outcome>,
{
    /// Creates a consumer from a closure.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> RecordConsumer for ClosureConsumer<F>
where
    F: FnMut(&RecordContext<'_>, &str, &mut dyn Write) -> ConsumerResult<Outcome>,
{
    fn process(
        &mut self,
        ctx: &RecordContext<'_>,
        record: &str,
        out: &mut dyn Write,
    ) -> ConsumerResult<Outcome> {
        (self.callback)(ctx, record, out)
    }
}

/// Creates a closure-based consumer.
pub fn consumer_fn<F>(f: F) -> ClosureConsumer<F>
where
    F: FnMut(&RecordContext<'_>, &str, &mut dyn Write) -> ConsumerResult<Outcome>,
{
    ClosureConsumer::new(f)
}

//! Drives a record stream through a consumer.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use super::config::RunConfig;
use super::consumer::{Outcome, RecordConsumer, RecordContext};
use crate::archive::{InputKind, detect_input};
use crate::dialect::{Detection, Dialect, ENTITY_HEADER};
use crate::error::Hook;
use crate::record::{DEFAULT_MARKER, RecordFormat, RecordStream};
use crate::select::EntrySelector;
use crate::stats::RunStatistics;
use crate::{Error, Result};

/// Runs a [`RecordConsumer`] over every record of one input.
///
/// A run detects the dump's dialect, builds the matching
/// [`RecordStream`], skips the configured lead records, then hands each
/// record to the consumer until the input runs out or a configured limit is
/// reached. The stream and the output sink are closed on every exit path.
///
/// # Example
///
/// ```rust,no_run
/// use std::io::Write;
/// use bulkdump::{Outcome, RunConfig, RunCoordinator, consumer_fn};
///
/// let coordinator = RunCoordinator::new(RunConfig::new("ipg050104.zip").max_records(100));
/// let mut consumer = consumer_fn(|ctx, record, out| {
///     writeln!(out, "{} {}", ctx.source(), record.len())?;
///     Ok(Outcome::Success)
/// });
/// let stats = coordinator.run(&mut consumer)?;
/// println!("{}", stats);
/// # Ok::<(), bulkdump::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct RunCoordinator {
    config: RunConfig,
}

impl RunCoordinator {
    /// Creates a coordinator for `config`.
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// The run configuration.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Detects the input's dialect and builds an unopened record stream
    /// for it.
    pub fn build_stream(&self) -> Result<RecordStream> {
        self.config.validate()?;
        build_stream(&self.config)
    }

    /// Runs `consumer` over the input, writing to the configured output
    /// file or to standard output.
    ///
    /// # Errors
    ///
    /// Fails if the input cannot be opened or read, if the output cannot be
    /// written, or if a consumer hook returns an error. The consumer's
    /// [`finish`](RecordConsumer::finish) hook still runs after a
    /// per-record fault.
    pub fn run<C: RecordConsumer + ?Sized>(&self, consumer: &mut C) -> Result<RunStatistics> {
        let stream = self.build_stream()?;
        match &self.config.output {
            Some(path) => {
                let mut sink = create_sink(path)?;
                self.drive(stream, consumer, &mut sink)
            }
            None => {
                let stdout = io::stdout();
                let mut sink = stdout.lock();
                self.drive(stream, consumer, &mut sink)
            }
        }
    }

    /// Runs `consumer` over the input, writing to `out`.
    pub fn run_to<C: RecordConsumer + ?Sized>(
        &self,
        consumer: &mut C,
        out: &mut dyn Write,
    ) -> Result<RunStatistics> {
        let stream = self.build_stream()?;
        self.drive(stream, consumer, out)
    }

    /// Runs `consumer` over several inputs in turn, using this coordinator's
    /// configuration for each, and returns statistics composed from the
    /// per-input runs.
    ///
    /// Every input gets its own setup and finish hooks. Output goes to one
    /// shared sink. The first fatal error stops the whole batch.
    pub fn run_all<I, P, C>(&self, inputs: I, consumer: &mut C) -> Result<RunStatistics>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
        C: RecordConsumer + ?Sized,
    {
        match &self.config.output {
            Some(path) => {
                let mut sink = create_sink(path)?;
                self.run_all_to(inputs, consumer, &mut sink)
            }
            None => {
                let stdout = io::stdout();
                let mut sink = stdout.lock();
                self.run_all_to(inputs, consumer, &mut sink)
            }
        }
    }

    /// Like [`run_all`](Self::run_all), writing to `out`.
    pub fn run_all_to<I, P, C>(
        &self,
        inputs: I,
        consumer: &mut C,
        out: &mut dyn Write,
    ) -> Result<RunStatistics>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
        C: RecordConsumer + ?Sized,
    {
        let name = self.config.task_name.clone().unwrap_or_else(|| "all".to_string());
        let mut children = Vec::new();
        for input in inputs {
            let mut config = self.config.clone();
            config.input = input.as_ref().to_path_buf();
            config.task_name = None;
            let child = RunCoordinator::new(config).run_to(consumer, out)?;
            log::info!("{}", child);
            children.push(child);
        }
        let mut parent = RunStatistics::new(name);
        parent.add(children);
        Ok(parent)
    }

    fn drive<C: RecordConsumer + ?Sized>(
        &self,
        mut stream: RecordStream,
        consumer: &mut C,
        out: &mut dyn Write,
    ) -> Result<RunStatistics> {
        let mut stats = RunStatistics::new(self.config.task_name());
        let result = self.drive_open(&mut stream, consumer, out, &mut stats);
        stream.close();
        result?;
        log::info!("{}", stats);
        Ok(stats)
    }

    fn drive_open<C: RecordConsumer + ?Sized>(
        &self,
        stream: &mut RecordStream,
        consumer: &mut C,
        out: &mut dyn Write,
        stats: &mut RunStatistics,
    ) -> Result<()> {
        stream.open()?;
        if self.config.skip > 0 {
            let skipped = stream.skip(self.config.skip)?;
            log::info!("skipped {} of {} lead records", skipped, self.config.skip);
        }

        consumer.on_dialect(stream.dialect());
        if let Err(e) = consumer.setup(out) {
            let _ = out.flush();
            return Err(Error::consumer(Hook::Setup, e));
        }

        let processed = self.process_records(stream, consumer, out, stats);
        let finished = consumer
            .finish(out)
            .map_err(|e| Error::consumer(Hook::Finish, e));
        let flushed = out.flush().map_err(Error::from);
        processed.and(finished).and(flushed)
    }

    fn process_records<C: RecordConsumer + ?Sized>(
        &self,
        stream: &mut RecordStream,
        consumer: &mut C,
        out: &mut dyn Write,
        stats: &mut RunStatistics,
    ) -> Result<()> {
        while stream.has_next()? {
            let Some(record) = stream.next_record()? else {
                break;
            };
            stats.record();

            let source = stream.source_id();
            let ctx = RecordContext::new(&source, stream.position(), stream.dialect());
            let outcome = consumer.process(&ctx, &record, out);
            match outcome {
                Ok(Outcome::Success) => stats.success(),
                Ok(Outcome::Failure) => {
                    log::debug!("[{}] record failed in '{}'", source, stream.source_name());
                    stats.failure(source);
                }
                Err(e) => {
                    log::error!("[{}] aborting run: {}", source, e);
                    return Err(Error::consumer(Hook::Process, e));
                }
            }

            if let Some(limit) = self.config.limit_reached(stats) {
                log::info!("{} reached after {} records", limit, stats.records());
                break;
            }
        }
        Ok(())
    }
}

fn create_sink(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path)?;
    log::debug!("writing output to '{}'", path.display());
    Ok(BufWriter::new(file))
}

fn build_stream(config: &RunConfig) -> Result<RecordStream> {
    let kind = detect_input(&config.input)?;
    let detection = if config.force_flat {
        Detection {
            dialect: Some(Dialect::Greenbook),
            entry: None,
        }
    } else {
        Dialect::locate(&config.input, config.selector.as_ref())?
    };
    let dialect = detection.dialect;
    let format = resolve_format(config, dialect);
    log::info!(
        "reading '{}' ({}) as {}",
        config.input.display(),
        kind,
        format
    );

    let mut stream = match (&config.selector, kind) {
        (Some(selector), _) => RecordStream::entries(&config.input, selector.clone(), format),
        (None, InputKind::Directory) => {
            // Every file shaped like the one the dialect was read from
            let suffix = match detection.entry.as_deref().and_then(extension_of) {
                Some(suffix) => suffix,
                None => entry_suffix(dialect, &format).to_string(),
            };
            let selector = EntrySelector::new().suffix(suffix);
            RecordStream::entries(&config.input, selector, format)
        }
        (None, _) => match detection.entry {
            Some(entry) => RecordStream::new(&config.input, format).with_entry(entry),
            None => {
                let suffix = entry_suffix(dialect, &format);
                RecordStream::new(&config.input, format).with_entry_suffix(suffix)
            }
        },
    };
    stream = stream.with_dialect(dialect);

    if config.inject_entity_header {
        if dialect.is_some_and(|d| d.needs_entity_header()) {
            stream = stream.with_record_prefix(ENTITY_HEADER);
        } else {
            log::debug!("entity header not needed for this dialect");
        }
    }
    Ok(stream)
}

fn resolve_format(config: &RunConfig, dialect: Option<Dialect>) -> RecordFormat {
    let flat = || RecordFormat::Flat {
        marker: config
            .marker
            .clone()
            .unwrap_or_else(|| DEFAULT_MARKER.to_string()),
    };
    if config.force_flat {
        return flat();
    }
    if let Some(tag) = &config.body_tag {
        return RecordFormat::tagged(tag.as_str());
    }
    match dialect.map(|d| d.record_format()) {
        Some(RecordFormat::Flat { .. }) => flat(),
        Some(format) => format,
        None if config.marker.is_some() => flat(),
        None => {
            let format = RecordFormat::default();
            log::warn!(
                "could not detect dialect of '{}', assuming {}",
                config.input.display(),
                format
            );
            format
        }
    }
}

fn entry_suffix(dialect: Option<Dialect>, format: &RecordFormat) -> &'static str {
    match dialect {
        Some(dialect) => dialect.entry_suffix(),
        None => format.default_entry_suffix(),
    }
}

/// `.xml` for `week1/ipg050104.xml`; `None` without an extension.
fn extension_of(entry: &str) -> Option<String> {
    let file_name = entry.rsplit('/').next().unwrap_or(entry);
    let (stem, ext) = file_name.rsplit_once('.')?;
    (!stem.is_empty() && !ext.is_empty()).then(|| format!(".{}", ext))
}

//! Forward-only record streams over bulk dumps.

use std::fs::File;
use std::path::{Path, PathBuf};

use super::boundary::{Boundary, RecordFormat};
use super::lines::LineReader;
use crate::archive::{ArchiveEntry, ArchiveScanner, InputKind, detect_input};
use crate::dialect::Dialect;
use crate::select::{EntrySelector, normalize_path};
use crate::{Error, Result};

/// Where a record stream reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A single dump: a plain file, or the first entry with the expected
    /// suffix inside a ZIP archive or directory.
    Path(PathBuf),
    /// Every entry of an archive or directory that passes `selector`,
    /// read one after another as a single sequence of records.
    Entries {
        /// Archive or directory path.
        root: PathBuf,
        /// Entry filter.
        selector: EntrySelector,
    },
}

impl Source {
    /// Path of the underlying file, archive or directory.
    pub fn path(&self) -> &Path {
        match self {
            Source::Path(path) => path,
            Source::Entries { root, .. } => root,
        }
    }
}

/// Reader state that exists only while a stream is open.
struct OpenState {
    lines: Option<LineReader>,
    boundary: Boundary,
    source_name: String,
    scanner: Option<ArchiveScanner<EntrySelector>>,
}

impl OpenState {
    fn new(boundary: Boundary, source_name: String) -> Self {
        Self {
            lines: None,
            boundary,
            source_name,
            scanner: None,
        }
    }

    fn switch_to(&mut self, entry: ArchiveEntry) {
        log::debug!("reading records from entry '{}'", entry.name());
        self.source_name = entry.name().to_string();
        self.lines = Some(LineReader::new(entry.into_reader()));
    }

    /// Runs the boundary detector until a record completes or all input is
    /// exhausted, moving on to the next archive entry when one runs dry.
    fn advance(&mut self, collect: bool) -> Result<Option<String>> {
        loop {
            if let Some(lines) = self.lines.as_mut() {
                while let Some(line) = lines.next_line()? {
                    if let Some(record) = self.boundary.feed(line, collect) {
                        return Ok(Some(record));
                    }
                }
                log::trace!(
                    "end of '{}' after {} lines",
                    self.source_name,
                    lines.lines_read()
                );
                self.lines = None;
                if let Some(record) = self.boundary.finish(collect) {
                    return Ok(Some(record));
                }
            }

            let Some(scanner) = self.scanner.as_mut() else {
                return Ok(None);
            };
            match scanner.next_entry()? {
                Some(entry) => self.switch_to(entry),
                None => return Ok(None),
            }
        }
    }

    fn has_next(&mut self) -> Result<bool> {
        if self.boundary.has_pending() {
            return Ok(true);
        }
        if let Some(lines) = self.lines.as_mut() {
            if !lines.at_eof()? {
                return Ok(true);
            }
        }
        Ok(self.scanner.as_ref().is_some_and(ArchiveScanner::has_next))
    }
}

/// A forward-only stream of whole records from one bulk dump.
///
/// A stream pairs a [`Source`] with a [`RecordFormat`]. It holds at most one
/// record in memory at a time; skipping and counting never materialize the
/// records they pass over.
///
/// Reading returns `Ok(Some(record))` for each record, `Ok(None)` once the
/// input is exhausted, and `Err` if the input could not be read.
///
/// # Example
///
/// ```rust,no_run
/// use bulkdump::RecordStream;
///
/// let mut stream = RecordStream::tagged_xml("ipg050104.zip", "us-patent-grant");
/// stream.open()?;
/// stream.skip(10)?;
/// while let Some(record) = stream.next_record()? {
///     println!("{}: {} bytes", stream.source_id(), record.len());
/// }
/// stream.close();
/// # Ok::<(), bulkdump::Error>(())
/// ```
pub struct RecordStream {
    source: Source,
    format: RecordFormat,
    entry_suffix: Option<String>,
    entry_name: Option<String>,
    record_prefix: Option<String>,
    dialect: Option<Dialect>,
    state: Option<OpenState>,
    position: u64,
    total: Option<u64>,
}

impl RecordStream {
    /// Creates a stream over a single dump at `path`.
    ///
    /// If `path` turns out to be a ZIP archive or directory, the first entry
    /// whose name ends with the format's suffix (`.xml` or `.txt`, see
    /// [`with_entry_suffix`](Self::with_entry_suffix)) is read instead.
    pub fn new<P: AsRef<Path>>(path: P, format: RecordFormat) -> Self {
        Self::from_source(Source::Path(path.as_ref().to_path_buf()), format)
    }

    /// Creates a stream over a flat dump with the default `PATN` marker.
    pub fn flat<P: AsRef<Path>>(path: P) -> Self {
        Self::new(path, RecordFormat::flat())
    }

    /// Creates a stream over a tagged XML dump with the given body element.
    pub fn tagged_xml<P: AsRef<Path>>(path: P, body_tag: impl Into<String>) -> Self {
        Self::new(path, RecordFormat::tagged(body_tag))
    }

    /// Creates a stream over every entry of `root` that passes `selector`.
    pub fn entries<P: AsRef<Path>>(root: P, selector: EntrySelector, format: RecordFormat) -> Self {
        Self::from_source(
            Source::Entries {
                root: root.as_ref().to_path_buf(),
                selector,
            },
            format,
        )
    }

    /// Creates a stream from an explicit source.
    pub fn from_source(source: Source, format: RecordFormat) -> Self {
        Self {
            source,
            format,
            entry_suffix: None,
            entry_name: None,
            record_prefix: None,
            dialect: None,
            state: None,
            position: 0,
            total: None,
        }
    }

    /// Overrides the entry suffix used to find a single dump inside an
    /// archive. Compared case-insensitively.
    pub fn with_entry_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.entry_suffix = Some(suffix.into());
        self
    }

    /// Reads the archive entry with this full path instead of searching by
    /// suffix. Only used when the source is a single dump inside an archive
    /// or directory.
    pub fn with_entry(mut self, name: impl Into<String>) -> Self {
        self.entry_name = Some(normalize_path(&name.into()));
        self
    }

    /// Prepends `prefix` to every record returned by
    /// [`next_record`](Self::next_record).
    pub fn with_record_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.record_prefix = Some(prefix.into());
        self
    }

    /// Tags the stream with the dialect its content was detected as.
    pub fn with_dialect(mut self, dialect: Option<Dialect>) -> Self {
        self.dialect = dialect;
        self
    }

    /// The record format.
    pub fn format(&self) -> &RecordFormat {
        &self.format
    }

    /// The source this stream reads.
    pub fn source(&self) -> &Source {
        &self.source
    }

    /// The dialect the stream was tagged with, if any.
    pub fn dialect(&self) -> Option<Dialect> {
        self.dialect
    }

    /// Returns true between [`open`](Self::open) and [`close`](Self::close).
    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    /// Opens the source and positions the stream before the first record.
    ///
    /// Opening an already open stream starts over from the beginning.
    pub fn open(&mut self) -> Result<()> {
        self.close();
        let state = self.open_state()?;
        log::debug!(
            "opened {} record stream over '{}'",
            self.format,
            self.source.path().display()
        );
        self.state = Some(state);
        self.position = 0;
        Ok(())
    }

    /// Re-opens the stream from scratch.
    pub fn reset(&mut self) -> Result<()> {
        self.open()
    }

    /// Returns true if unread input remains.
    ///
    /// Trailing input that holds no complete record still counts, so a
    /// `true` here may be followed by `Ok(None)` from
    /// [`next_record`](Self::next_record).
    pub fn has_next(&mut self) -> Result<bool> {
        match self.state.as_mut() {
            Some(state) => state.has_next(),
            None => Ok(false),
        }
    }

    /// Reads the next record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotOpen`] before [`open`](Self::open), and
    /// [`Error::Io`] if the input fails partway through.
    pub fn next_record(&mut self) -> Result<Option<String>> {
        let state = self.state.as_mut().ok_or(Error::NotOpen("record stream"))?;
        let Some(mut record) = state.advance(true)? else {
            return Ok(None);
        };
        self.position += 1;
        if let Some(prefix) = &self.record_prefix {
            record.insert_str(0, prefix);
        }
        Ok(Some(record))
    }

    /// Skips up to `n` records without materializing them.
    ///
    /// Returns how many records were skipped, which is less than `n` only
    /// when the input ran out.
    pub fn skip(&mut self, n: u64) -> Result<u64> {
        let state = self.state.as_mut().ok_or(Error::NotOpen("record stream"))?;
        let mut skipped = 0;
        while skipped < n && state.advance(false)?.is_some() {
            skipped += 1;
        }
        self.position += skipped;
        Ok(skipped)
    }

    /// Reads the record at 1-based position `n`, skipping those before it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PositionPassed`] if record `n` was already read;
    /// streams only move forward.
    pub fn jump_to(&mut self, n: u64) -> Result<Option<String>> {
        if n <= self.position {
            return Err(Error::PositionPassed {
                requested: n,
                current: self.position,
            });
        }
        let wanted = n - 1 - self.position;
        if self.skip(wanted)? < wanted {
            return Ok(None);
        }
        self.next_record()
    }

    /// Number of records read or skipped since the stream was opened. After
    /// a read this is the 1-based position of the record just returned.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// File name of the dump, or full path of the archive entry currently
    /// being read.
    pub fn source_name(&self) -> &str {
        self.state.as_ref().map_or("", |s| s.source_name.as_str())
    }

    /// Identifier of the current record: `<input-file-name>:<position>`.
    ///
    /// The position counts records across every entry of the input, so
    /// skipping `position - 1` records of a fresh stream over the same input
    /// reaches the record again.
    pub fn source_id(&self) -> String {
        format!("{}:{}", file_name_of(self.source.path()), self.position)
    }

    /// Total number of records in the source.
    ///
    /// Computed on first call by scanning a second, independent reader over
    /// the whole source, then cached. Does not move this stream.
    pub fn total_records(&mut self) -> Result<u64> {
        if let Some(total) = self.total {
            return Ok(total);
        }
        let mut counter = self.open_state()?;
        let mut total = 0;
        while counter.advance(false)?.is_some() {
            total += 1;
        }
        log::debug!(
            "counted {} records in '{}'",
            total,
            self.source.path().display()
        );
        self.total = Some(total);
        Ok(total)
    }

    /// Iterates over the remaining records.
    pub fn records(&mut self) -> Records<'_> {
        Records {
            stream: self,
            failed: false,
        }
    }

    /// Closes the source. Calling it again is a no-op.
    pub fn close(&mut self) {
        if let Some(mut state) = self.state.take() {
            if let Some(scanner) = state.scanner.as_mut() {
                scanner.close();
            }
            log::debug!(
                "closed record stream over '{}' at position {}",
                self.source.path().display(),
                self.position
            );
        }
    }

    fn entry_suffix(&self) -> &str {
        self.entry_suffix
            .as_deref()
            .unwrap_or_else(|| self.format.default_entry_suffix())
    }

    fn open_state(&self) -> Result<OpenState> {
        let boundary = Boundary::new(&self.format);
        match &self.source {
            Source::Path(path) => match detect_input(path)? {
                InputKind::Plain => {
                    let file = File::open(path)?;
                    let mut state = OpenState::new(boundary, file_name_of(path));
                    state.lines = Some(LineReader::new(Box::new(file)));
                    Ok(state)
                }
                InputKind::Zip | InputKind::Directory => {
                    let entry = match &self.entry_name {
                        Some(name) => entry_named(path, name)?,
                        None => {
                            let suffix = self.entry_suffix().to_ascii_lowercase();
                            first_entry_with_suffix(path, &suffix)?
                        }
                    };
                    let mut state = OpenState::new(boundary, String::new());
                    state.switch_to(entry);
                    Ok(state)
                }
            },
            Source::Entries { root, selector } => {
                let mut scanner = ArchiveScanner::new(root, selector.clone());
                scanner.open()?;
                let mut state = OpenState::new(boundary, String::new());
                match scanner.next_entry()? {
                    Some(entry) => state.switch_to(entry),
                    None => log::warn!("no entry in '{}' matches {}", root.display(), selector),
                }
                state.scanner = Some(scanner);
                Ok(state)
            }
        }
    }
}

impl Drop for RecordStream {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for RecordStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStream")
            .field("source", &self.source)
            .field("format", &self.format)
            .field("dialect", &self.dialect)
            .field("open", &self.is_open())
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

/// Iterator over the remaining records of a [`RecordStream`].
///
/// Yields `Err` at most once; iteration ends after a read fault.
pub struct Records<'a> {
    stream: &'a mut RecordStream,
    failed: bool,
}

impl Iterator for Records<'_> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let next = self.stream.next_record().transpose();
        if matches!(next, Some(Err(_))) {
            self.failed = true;
        }
        next
    }
}

fn first_entry_with_suffix(path: &Path, suffix: &str) -> Result<ArchiveEntry> {
    let wanted = suffix.to_string();
    let mut scanner = ArchiveScanner::new(path, move |name: &str| {
        name.to_ascii_lowercase().ends_with(wanted.as_str())
    });
    scanner.open()?;
    let entry = scanner.next_entry()?;
    scanner.close();
    entry.ok_or_else(|| Error::NoMatchingEntry {
        path: path.display().to_string(),
        wanted: format!("suffix '{}'", suffix),
    })
}

fn entry_named(path: &Path, name: &str) -> Result<ArchiveEntry> {
    let wanted = name.to_string();
    let mut scanner = ArchiveScanner::new(path, move |entry: &str| entry == wanted);
    scanner.open()?;
    let entry = scanner.next_entry()?;
    scanner.close();
    entry.ok_or_else(|| Error::NoMatchingEntry {
        path: path.display().to_string(),
        wanted: format!("entry '{}'", name),
    })
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

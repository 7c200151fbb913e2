//! Lazy scanning of archive and directory entries.
//!
//! [`ArchiveScanner`] walks the entries of a ZIP archive (or the files of a
//! directory) in their native order, tests each against an [`EntryFilter`],
//! and hands out one streaming [`ArchiveEntry`] per match. Only the entry
//! currently being read is open; skipped entries are matched by name and
//! never decompressed.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::ZipArchive;

use super::detect::{InputKind, detect_input};
use super::entry::{ArchiveEntry, EntryLocation, EntryMethod};
use crate::select::{EntryFilter, EntrySelector, normalize_path};
use crate::{Error, Result};

/// Open enumeration state.
enum ScanState {
    Zip {
        archive: ZipArchive<BufReader<File>>,
        next_index: usize,
    },
    Directory {
        files: Vec<(String, PathBuf)>,
        next_index: usize,
    },
}

impl ScanState {
    fn has_next(&self) -> bool {
        match self {
            ScanState::Zip {
                archive,
                next_index,
            } => *next_index < archive.len(),
            ScanState::Directory { files, next_index } => *next_index < files.len(),
        }
    }
}

/// Lazily enumerates the entries of an archive or directory that pass a
/// filter.
///
/// # Example
///
/// ```rust,no_run
/// use bulkdump::{ArchiveScanner, EntrySelector};
///
/// let selector = EntrySelector::new().parent_path("corpus/patents").suffix("xml");
/// let mut scanner = ArchiveScanner::new("bulk.zip", selector);
/// scanner.open()?;
/// scanner.skip(2)?;
/// if let Some(entry) = scanner.next_entry()? {
///     println!("third matching entry: {}", entry.name());
/// }
/// scanner.close();
/// # Ok::<(), bulkdump::Error>(())
/// ```
pub struct ArchiveScanner<F = EntrySelector> {
    path: PathBuf,
    filter: F,
    state: Option<ScanState>,
    matched: u64,
}

impl<F: EntryFilter> ArchiveScanner<F> {
    /// Creates a scanner over `path`; nothing is opened until [`open`](Self::open).
    pub fn new<P: AsRef<Path>>(path: P, filter: F) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            filter,
            state: None,
            matched: 0,
        }
    }

    /// Path of the archive or directory being scanned.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The filter entries are tested against.
    pub fn filter(&self) -> &F {
        &self.filter
    }

    /// Returns true between [`open`](Self::open) and [`close`](Self::close).
    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    /// Number of matching entries returned or skipped so far.
    pub fn entries_matched(&self) -> u64 {
        self.matched
    }

    /// Opens the archive and prepares the entry enumeration.
    ///
    /// Re-opening an open scanner restarts the enumeration from the first
    /// entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the path cannot be read and
    /// [`Error::InvalidArchive`] if a file is not a readable ZIP archive.
    pub fn open(&mut self) -> Result<()> {
        self.close();
        let state = match detect_input(&self.path)? {
            InputKind::Directory => ScanState::Directory {
                files: walk_directory(&self.path)?,
                next_index: 0,
            },
            InputKind::Zip | InputKind::Plain => {
                let file = File::open(&self.path)?;
                let archive = ZipArchive::new(BufReader::new(file))
                    .map_err(|e| Error::invalid_archive(self.path.display().to_string(), e))?;
                ScanState::Zip {
                    archive,
                    next_index: 0,
                }
            }
        };
        log::debug!(
            "opened '{}' for scanning ({})",
            self.path.display(),
            self.filter.describe()
        );
        self.state = Some(state);
        self.matched = 0;
        Ok(())
    }

    /// Returns true while unread entries remain in enumeration order.
    ///
    /// Remaining entries may still all fail the filter, in which case
    /// [`next_entry`](Self::next_entry) returns `Ok(None)`.
    pub fn has_next(&self) -> bool {
        self.state.as_ref().is_some_and(ScanState::has_next)
    }

    /// Returns a stream over the next matching entry, or `Ok(None)` once
    /// the enumeration is exhausted.
    pub fn next_entry(&mut self) -> Result<Option<ArchiveEntry>> {
        match self.advance()? {
            Some((name, index, location)) => {
                Ok(Some(ArchiveEntry::open(name, index, &location)?))
            }
            None => Ok(None),
        }
    }

    /// Skips up to `n` matching entries without opening them.
    ///
    /// Returns how many entries were actually skipped, which is less than
    /// `n` only when the enumeration ran out.
    pub fn skip(&mut self, n: u64) -> Result<u64> {
        let mut skipped = 0;
        while skipped < n {
            match self.advance()? {
                Some((name, _, _)) => {
                    log::trace!("skipped entry '{}'", name);
                    skipped += 1;
                }
                None => break,
            }
        }
        Ok(skipped)
    }

    /// Returns the `n`-th matching entry counted from the current position
    /// (1-based), skipping the `n - 1` before it.
    pub fn jump_to(&mut self, n: u64) -> Result<Option<ArchiveEntry>> {
        if n == 0 {
            return Ok(None);
        }
        if self.skip(n - 1)? < n - 1 {
            return Ok(None);
        }
        self.next_entry()
    }

    /// Releases the archive handle. Calling it again is a no-op.
    pub fn close(&mut self) {
        if self.state.take().is_some() {
            log::debug!("closed '{}'", self.path.display());
        }
    }

    /// Finds the next matching entry and describes where its data lives.
    fn advance(&mut self) -> Result<Option<(String, usize, EntryLocation)>> {
        let state = self.state.as_mut().ok_or(Error::NotOpen("archive scanner"))?;
        let found = match state {
            ScanState::Zip {
                archive,
                next_index,
            } => next_zip_match(&self.path, archive, next_index, &self.filter)?,
            ScanState::Directory { files, next_index } => {
                let mut found = None;
                while *next_index < files.len() {
                    let index = *next_index;
                    *next_index += 1;
                    let (name, path) = &files[index];
                    if self.filter.select(name) {
                        found = Some((name.clone(), index, EntryLocation::File(path.clone())));
                        break;
                    }
                }
                found
            }
        };
        if found.is_some() {
            self.matched += 1;
        }
        Ok(found)
    }
}

fn next_zip_match<F: EntryFilter>(
    path: &Path,
    archive: &mut ZipArchive<BufReader<File>>,
    next_index: &mut usize,
    filter: &F,
) -> Result<Option<(String, usize, EntryLocation)>> {
    while *next_index < archive.len() {
        let index = *next_index;
        *next_index += 1;

        let file = archive
            .by_index_raw(index)
            .map_err(|e| Error::invalid_archive(path.display().to_string(), e))?;
        if file.is_dir() {
            continue;
        }
        let name = normalize_path(file.name());
        if !filter.select(&name) {
            continue;
        }

        let location = EntryLocation::Zip {
            archive: path.to_path_buf(),
            data_start: file.data_start(),
            compressed_size: file.compressed_size(),
            size: file.size(),
            crc32: file.crc32(),
            method: EntryMethod::from(file.compression()),
            encrypted: file.encrypted(),
        };
        return Ok(Some((name, index, location)));
    }
    Ok(None)
}

/// Lists regular files under `root`, sorted by path, with `/`-separated
/// names relative to `root`.
fn walk_directory(root: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            e.into_io_error()
                .unwrap_or_else(|| std::io::Error::other("directory walk failed"))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let name = normalize_path(&relative.to_string_lossy());
        files.push((name, entry.path().to_path_buf()));
    }
    Ok(files)
}

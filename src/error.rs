//! Error types for bulk dump reading.
//!
//! This module provides the [`Error`] enum which represents all possible
//! failure modes when scanning archives, reading records, and driving a
//! run, along with a convenient [`Result<T>`] type alias.
//!
//! Running out of records is *not* an error: record and entry readers
//! return `Ok(None)` at the end of input. An `Err` returned from a read
//! means the dump could not be read any further and the run should stop.
//!
//! # Example
//!
//! ```rust,no_run
//! use bulkdump::{Error, RecordStream};
//!
//! fn first_record(path: &str) -> bulkdump::Result<Option<String>> {
//!     let mut stream = RecordStream::tagged_xml(path, "us-patent-grant");
//!     match stream.open() {
//!         Ok(()) => stream.next_record(),
//!         Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
//!             eprintln!("Dump not found: {}", path);
//!             Ok(None)
//!         }
//!         Err(e) => Err(e),
//!     }
//! }
//! ```

use std::fmt;
use std::io;

/// Consumer lifecycle hook that raised a fatal fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    /// The one-time setup hook.
    Setup,
    /// The per-record processing operation.
    Process,
    /// The one-time completion hook.
    Finish,
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup => write!(f, "setup"),
            Self::Process => write!(f, "process"),
            Self::Finish => write!(f, "finish"),
        }
    }
}

/// The main error type for bulk dump operations.
///
/// # Error Categories
///
/// | Category | Variants | Typical Cause |
/// |----------|----------|---------------|
/// | I/O | [`Io`][Self::Io] | Open failures, read faults partway through a dump |
/// | Archive | [`InvalidArchive`][Self::InvalidArchive], [`UnsupportedCompression`][Self::UnsupportedCompression], [`NoMatchingEntry`][Self::NoMatchingEntry] | Unreadable or unexpected archive layout |
/// | Usage | [`NotOpen`][Self::NotOpen], [`PositionPassed`][Self::PositionPassed], [`InvalidConfig`][Self::InvalidConfig] | Calling operations out of order |
/// | Consumer | [`Consumer`][Self::Consumer] | A pluggable consumer raised a fatal fault |
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred while opening or reading a dump.
    ///
    /// Raised at `open()` time when a file cannot be opened, and from
    /// `next_record()` when the underlying reader fails mid-dump. A clean
    /// end of file is never reported through this variant.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input could not be read as a ZIP archive.
    #[error("Invalid archive '{path}': {reason}")]
    InvalidArchive {
        /// Path of the archive.
        path: String,
        /// Description from the archive parser.
        reason: String,
    },

    /// An archive entry uses a compression method this build cannot decode.
    #[error("Unsupported compression method '{method}' for entry {entry}")]
    UnsupportedCompression {
        /// Entry name inside the archive.
        entry: String,
        /// Compression method name.
        method: String,
    },

    /// No archive entry satisfied the configured filter.
    #[error("No entry in '{path}' matches {wanted}")]
    NoMatchingEntry {
        /// Path of the archive or directory.
        path: String,
        /// Description of what was searched for.
        wanted: String,
    },

    /// An operation that needs an open source was called before `open()`
    /// or after `close()`.
    #[error("{0} is not open")]
    NotOpen(&'static str),

    /// A forward-only jump targeted a position the reader already passed.
    #[error("Cannot jump to position {requested}: reader is already at {current}")]
    PositionPassed {
        /// Requested 1-based position.
        requested: u64,
        /// Current 1-based position.
        current: u64,
    },

    /// The run configuration is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A record consumer raised a fatal fault.
    ///
    /// Faults from the setup and completion hooks, and faults the per-record
    /// operation raises (as opposed to reporting a failed outcome), abort
    /// the whole run.
    #[error("Record consumer failed during {hook}: {source}")]
    Consumer {
        /// Hook that raised the fault.
        hook: Hook,
        /// Underlying cause.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

impl Error {
    /// Wraps an arbitrary consumer fault.
    pub fn consumer(
        hook: Hook,
        source: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    ) -> Self {
        Error::Consumer {
            hook,
            source: source.into(),
        }
    }

    /// Builds an [`Error::InvalidArchive`] for the given path.
    pub fn invalid_archive(path: impl Into<String>, reason: impl fmt::Display) -> Self {
        Error::InvalidArchive {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns true for I/O errors, including read faults mid-dump.
    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io(_))
    }

    /// Returns true if this error was raised by a record consumer.
    pub fn is_consumer_fault(&self) -> bool {
        matches!(self, Error::Consumer { .. })
    }

    /// Returns the consumer hook that failed, if any.
    pub fn hook(&self) -> Option<Hook> {
        match self {
            Error::Consumer { hook, .. } => Some(*hook),
            _ => None,
        }
    }
}

/// A specialized Result type for bulk dump operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::invalid_archive("dump.zip", "invalid Zip archive: bad magic");
        assert_eq!(
            err.to_string(),
            "Invalid archive 'dump.zip': invalid Zip archive: bad magic"
        );

        let err = Error::PositionPassed {
            requested: 2,
            current: 5,
        };
        assert!(err.to_string().contains("position 2"));
        assert!(err.to_string().contains("at 5"));

        let err = Error::NotOpen("record stream");
        assert_eq!(err.to_string(), "record stream is not open");
    }

    #[test]
    fn test_consumer_fault() {
        let err = Error::consumer(Hook::Setup, "template missing");
        assert!(err.is_consumer_fault());
        assert!(!err.is_io());
        assert_eq!(err.hook(), Some(Hook::Setup));
        assert_eq!(
            err.to_string(),
            "Record consumer failed during setup: template missing"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_io_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let err: Error = io_err.into();
        assert!(err.is_io());
        assert_eq!(err.hook(), None);
    }
}

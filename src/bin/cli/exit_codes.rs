//! Process exit statuses.

use bulkdump::Error;

/// How a command ended, as reported to the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Every record was handled.
    Success = 0,
    /// The run completed but some records failed, or nothing was detected.
    Warning = 1,
    /// A consumer fault or misuse stopped the run.
    FatalError = 2,
    /// The input is not a readable archive.
    BadArchive = 3,
    /// The archive holds no entry the run could read.
    NoDump = 4,
    /// Opening, reading or writing a file failed.
    IoError = 5,
    /// The command line could not be turned into a run.
    BadArgs = 255,
}

impl ExitCode {
    /// Numeric status passed to `std::process::exit`.
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl From<&Error> for ExitCode {
    fn from(error: &Error) -> Self {
        match error {
            Error::Io(_) => Self::IoError,
            Error::InvalidArchive { .. } | Error::UnsupportedCompression { .. } => {
                Self::BadArchive
            }
            Error::NoMatchingEntry { .. } => Self::NoDump,
            Error::InvalidConfig(_) => Self::BadArgs,
            // Consumers writing to a closed pipe or full disk
            Error::Consumer { source, .. } if source.is::<std::io::Error>() => Self::IoError,
            _ => Self::FatalError,
        }
    }
}

/// Maps a library error to the status the process exits with.
pub fn error_to_exit_code(error: &Error) -> ExitCode {
    ExitCode::from(error)
}

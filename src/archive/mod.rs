//! Archive and directory access.
//!
//! Bulk dumps are usually distributed as ZIP files (one or more dump files
//! per archive) or unpacked into directory trees. This module provides:
//!
//! - [`detect_input`] to tell directories, ZIP archives and plain files apart
//! - [`ArchiveScanner`] to walk the entries that pass an
//!   [`EntryFilter`](crate::EntryFilter)
//! - [`ArchiveEntry`], an owning stream over one entry's data

pub mod detect;
mod entry;
mod scanner;

pub use detect::{InputKind, detect_input};
pub use entry::ArchiveEntry;
pub use scanner::ArchiveScanner;

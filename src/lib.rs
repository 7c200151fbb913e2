//! # bulkdump
//!
//! Streaming access to bulk government document dumps.
//!
//! Patent offices publish their full text as bulk dumps: a flat text file,
//! an SGML or XML file holding thousands of concatenated documents, or a
//! ZIP archive of such files. This crate reads those dumps one record at a
//! time, with bounded memory, and drives a pluggable consumer over them.
//!
//! ## Quick Start
//!
//! ### Reading Records
//!
//! ```rust,no_run
//! use bulkdump::{RecordStream, Result};
//!
//! fn main() -> Result<()> {
//!     // A plain XML file, or the first .xml entry of a ZIP archive
//!     let mut stream = RecordStream::tagged_xml("ipg050104.zip", "us-patent-grant");
//!     stream.open()?;
//!
//!     // Skipped records are never materialized
//!     stream.skip(10)?;
//!
//!     while let Some(record) = stream.next_record()? {
//!         println!("{}: {} bytes", stream.source_id(), record.len());
//!     }
//!     stream.close();
//!     Ok(())
//! }
//! ```
//!
//! ### Scanning Archive Entries
//!
//! ```rust,no_run
//! use bulkdump::{ArchiveScanner, EntrySelector, Result};
//!
//! fn main() -> Result<()> {
//!     let selector = EntrySelector::new().parent_path("corpus/patents").suffix(".xml");
//!     let mut scanner = ArchiveScanner::new("corpus.zip", selector);
//!     scanner.open()?;
//!     while let Some(entry) = scanner.next_entry()? {
//!         println!("{}", entry.name());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Running a Consumer
//!
//! ```rust,no_run
//! use std::io::Write;
//! use bulkdump::{Outcome, RunConfig, RunCoordinator, consumer_fn};
//!
//! fn main() -> bulkdump::Result<()> {
//!     let config = RunConfig::new("pftaps19760106_wk01.zip")
//!         .output("titles.txt")
//!         .max_failures(10);
//!
//!     let mut consumer = consumer_fn(|ctx, record, out| {
//!         match record.lines().find(|l| l.starts_with("TTL ")) {
//!             Some(title) => {
//!                 writeln!(out, "{}\t{}", ctx.source(), &title[4..])?;
//!                 Ok(Outcome::Success)
//!             }
//!             None => Ok(Outcome::Failure),
//!         }
//!     });
//!
//!     let stats = RunCoordinator::new(config).run(&mut consumer)?;
//!     println!("{}", stats);
//!     for source in stats.failed_sources() {
//!         eprintln!("no title: {}", source);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `deflate` | Yes | Deflate-compressed ZIP entries |
//! | `bzip2` | Yes | BZip2-compressed ZIP entries |
//! | `cli` | No | The `bulkdump` command-line tool |
//!
//! ## Modules
//!
//! - [`select`] - Entry selection criteria
//! - [`archive`] - Input detection and archive entry scanning
//! - [`record`] - Record boundary detection and record streams
//! - [`dialect`] - Dump dialect detection
//! - [`run`] - Consumer-driven processing runs
//! - [`stats`] - Run statistics
//! - [`error`] - Error types

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

/// Default buffer size for read operations (8 KiB).
pub(crate) const READ_BUFFER_SIZE: usize = 8192;

pub mod archive;
pub mod dialect;
pub mod error;
pub mod record;
pub mod run;
pub mod select;
pub mod stats;

pub use error::{Error, Hook, Result};

// Re-export the reading API at crate root for convenience
pub use archive::{ArchiveEntry, ArchiveScanner, InputKind, detect_input};
pub use dialect::{Detection, Dialect, ENTITY_HEADER};
pub use record::{RecordFormat, RecordStream, Records, Source};
pub use select::{EntryFilter, EntrySelector};

// Re-export the run API
pub use run::{
    ConsumerError, ConsumerResult, Limit, Outcome, RecordConsumer, RecordContext, RunConfig,
    RunCoordinator, consumer_fn,
};
pub use stats::RunStatistics;

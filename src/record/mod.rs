//! Record streams.
//!
//! A bulk dump is a long run of concatenated records. This module splits a
//! dump into whole records without interpreting their content:
//!
//! - [`RecordFormat::Flat`]: records start at a fixed marker line (`PATN`)
//! - [`RecordFormat::TaggedXml`]: records are delimited by a body element
//!
//! Both formats share one line-buffering driver; the format only decides
//! where a record begins and ends. [`RecordStream`] combines a format with a
//! [`Source`] (a single file, a single archive entry, or every selected
//! entry of an archive).

mod boundary;
mod lines;
mod stream;

pub use boundary::{DEFAULT_BODY_TAG, DEFAULT_MARKER, RecordFormat};
pub use stream::{RecordStream, Records, Source};

//! Record processing runs.
//!
//! A run feeds every record of one bulk dump to a [`RecordConsumer`] and
//! tallies the outcomes in a [`RunStatistics`](crate::RunStatistics).
//! [`RunConfig`] sets the input, output, lead skip and stop limits;
//! [`RunCoordinator`] does the driving.

mod config;
mod consumer;
mod coordinator;

pub use config::{Limit, RunConfig};
pub use consumer::{
    ClosureConsumer, ConsumerError, ConsumerResult, Outcome, RecordConsumer, RecordContext,
    consumer_fn,
};
pub use coordinator::RunCoordinator;

//! Queue engine: ticket intake, teller dispatch and step transitions.

mod error;
mod service;

pub use error::QueueError;
pub use service::{GrabOutcome, QueueService};

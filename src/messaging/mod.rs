//! # Messaging Module
//!
//! Wire formats exchanged over the bus and the publisher seam used to send
//! responses back to requesters.

pub mod publisher;
pub mod request;
pub mod response;

pub use publisher::{BroadcastPublisher, MessagePublisher, PublishedMessage};
pub use request::{DecodeError, ExecutionRequest};
pub use response::{ExecutionResponse, ResponseStatus};

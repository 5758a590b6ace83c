//! Child Transport - capture child processes and their framed stdio streams
//!
//! A capture source runs as an external child process speaking the capture
//! frame protocol over stdin/stdout. This crate owns that relationship:
//! locating the binary inside the configured allow-list, spawning it with
//! piped stdio, pumping decoded frames upstream in arrival order, accepting
//! whole-frame writes, and terminating the child gracefully or by force.
//!
//! # Design
//!
//! - **Allow-list launches**: binaries resolve against an ordered list of
//!   permitted directories; path-qualified names are refused outright.
//! - **Pump tasks**: one task reads stdout through the frame decoder, one
//!   owns stdin and performs all-or-nothing frame writes, one drains stderr
//!   into logging, one reaps the child.
//! - **Ordered delivery**: frames from one child arrive on a single channel
//!   in decode order; a `Closed` event always follows the final frame.

mod binary;
mod child;
mod error;

pub use binary::resolve_binary;
pub use child::{ChildTransport, TransportEvent, READ_BUFFER_SIZE, WRITE_QUEUE_DEPTH};
pub use error::TransportError;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

#[cfg(test)]
mod child_test;

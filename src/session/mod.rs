//! Connection/transport layer.
//!
//! Owns the daemon socket: sends framed command packets, correlates each
//! command with its single response, and demultiplexes asynchronous event
//! packets to registered callbacks.

mod registry;
mod transport;

pub use registry::{EventCallback, EventRegistry};
pub use transport::Session;

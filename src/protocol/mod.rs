//! Wire protocol module.
//!
//! Defines the generic message tree, the packet model, the binary codec,
//! and the length-prefixed framing used on the daemon socket.
//!
//! ## Wire Format
//!
//! ```text
//! [4 bytes: length (big-endian u32)][1 byte: verb][optional name][elements]
//! ```

pub mod codec;
mod message;
mod packet;
pub mod wire;

pub use message::{Node, Section};
pub use packet::{Packet, PacketKind};

//! VICI Client Library
//!
//! This crate provides an asynchronous client for the VICI control
//! protocol spoken by the strongSwan IKE daemon over its Unix socket:
//! a generic message-tree codec, a connection layer that correlates
//! commands with responses while demultiplexing asynchronous events, and
//! typed convenience operations built on a generic record converter.

pub mod client;
pub mod config;
pub mod convert;
pub mod error;
pub mod protocol;
pub mod session;

pub use client::Client;
pub use config::SessionConfig;
pub use error::{Error, Result};
pub use protocol::{Node, Section};
pub use session::Session;

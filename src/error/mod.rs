//! Error types for the VICI client.
//!
//! Provides a unified error handling system using thiserror.

mod types;

pub use types::*;

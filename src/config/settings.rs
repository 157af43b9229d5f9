//! Configuration settings for a daemon session.

use serde::Deserialize;
use std::path::PathBuf;

use crate::protocol::wire::DEFAULT_MAX_PACKET_SIZE;

/// The charon VICI socket path used when none is configured.
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/charon.vici";

/// Session configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Path to the daemon's Unix socket file.
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,
    /// Maximum accepted packet size in bytes.
    #[serde(default = "default_max_packet_size")]
    pub max_packet_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            max_packet_size: default_max_packet_size(),
        }
    }
}

impl SessionConfig {
    /// Configuration pointing at a specific socket path.
    pub fn with_socket_path(path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: path.into(),
            ..Self::default()
        }
    }
}

fn default_socket_path() -> PathBuf {
    PathBuf::from(DEFAULT_SOCKET_PATH)
}

fn default_max_packet_size() -> usize {
    DEFAULT_MAX_PACKET_SIZE
}

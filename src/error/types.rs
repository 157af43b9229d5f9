//! Error types for the VICI client.

use thiserror::Error;

/// Main error type for the client.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors on the daemon socket.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Wire protocol violations. Fatal to the connection: a corrupt
    /// element stream cannot be resynchronized.
    #[error("Protocol error: {kind}")]
    Protocol { kind: ProtocolErrorKind },

    /// Mapping between a typed record and the generic message tree failed.
    #[error("Conversion error: {message}")]
    Conversion { message: String },

    /// The session is not connected (never dialed, or already closed).
    #[error("Not connected")]
    NotConnected,

    /// The connection was closed while an operation was in flight.
    #[error("Connection closed")]
    Closed,

    /// The daemon answered a command request with CMD_UNKNOWN.
    #[error("Unknown command: {name}")]
    UnknownCommand { name: String },

    /// The daemon answered an event (de-)registration with EVENT_UNKNOWN.
    #[error("Unknown event: {name}")]
    UnknownEvent { name: String },

    /// An event subscription with this name already exists.
    #[error("Event already registered: {name}")]
    AlreadyRegistered { name: String },

    /// No event subscription with this name exists.
    #[error("Event not registered: {name}")]
    NotRegistered { name: String },

    /// The daemon reported failure in a response body (`success` != "yes").
    #[error("Daemon error: {message}")]
    Daemon { message: String },
}

/// Wire protocol error kinds.
#[derive(Error, Debug)]
pub enum ProtocolErrorKind {
    #[error("Packet too large: {size} bytes exceeds maximum of {max} bytes")]
    PacketTooLarge { size: usize, max: usize },

    #[error("Unknown packet type: {value}")]
    UnknownPacketType { value: u8 },

    #[error("Unknown element type: {value}")]
    UnknownElementType { value: u8 },

    #[error("Unexpected end of packet while reading {context}")]
    UnexpectedEof { context: &'static str },

    #[error("Unterminated {what}")]
    Unterminated { what: &'static str },

    #[error("Unexpected {what}")]
    UnexpectedElement { what: &'static str },

    #[error("Element name exceeds 255 bytes")]
    NameTooLong,

    #[error("Message nested too deeply")]
    NestingTooDeep,

    #[error("Invalid UTF-8 in {context}")]
    InvalidUtf8 { context: &'static str },

    #[error("Connection closed")]
    ConnectionClosed,
}

impl Error {
    /// Shorthand used throughout the codec.
    pub(crate) fn protocol(kind: ProtocolErrorKind) -> Self {
        Error::Protocol { kind }
    }

    /// Whether this is the clean end-of-stream marker from the framing layer.
    pub fn is_connection_closed(&self) -> bool {
        matches!(
            self,
            Error::Protocol {
                kind: ProtocolErrorKind::ConnectionClosed
            }
        )
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

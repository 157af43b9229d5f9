//! Packet-level protocol model.
//!
//! A packet is the unit of transport: a verb byte, an optional name, and an
//! encoded message body. The framing (4-byte length prefix) and the element
//! encoding live in [`wire`](super::wire) and [`codec`](super::codec).

use std::fmt;

use crate::error::{Error, ProtocolErrorKind, Result};
use crate::protocol::message::Section;

/// Packet verbs, as defined by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketKind {
    /// A named command request (client -> daemon).
    CmdRequest = 0,
    /// The response to the outstanding command (daemon -> client).
    CmdResponse = 1,
    /// The outstanding command was unknown to the daemon.
    CmdUnknown = 2,
    /// A named event registration request (client -> daemon).
    EventRegister = 3,
    /// A named event deregistration request (client -> daemon).
    EventUnregister = 4,
    /// The outstanding (de-)registration succeeded.
    EventConfirm = 5,
    /// The outstanding (de-)registration named an unknown event.
    EventUnknown = 6,
    /// A named asynchronous event (daemon -> client).
    Event = 7,
}

impl PacketKind {
    /// Whether packets of this kind carry a length-prefixed name.
    pub fn is_named(self) -> bool {
        matches!(
            self,
            PacketKind::CmdRequest
                | PacketKind::EventRegister
                | PacketKind::EventUnregister
                | PacketKind::Event
        )
    }
}

impl TryFrom<u8> for PacketKind {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Ok(match value {
            0 => PacketKind::CmdRequest,
            1 => PacketKind::CmdResponse,
            2 => PacketKind::CmdUnknown,
            3 => PacketKind::EventRegister,
            4 => PacketKind::EventUnregister,
            5 => PacketKind::EventConfirm,
            6 => PacketKind::EventUnknown,
            7 => PacketKind::Event,
            value => {
                return Err(Error::protocol(ProtocolErrorKind::UnknownPacketType {
                    value,
                }))
            }
        })
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A decoded packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// The packet verb.
    pub kind: PacketKind,
    /// The command or event name; present exactly when `kind.is_named()`.
    pub name: Option<String>,
    /// The message body. Empty for bodiless packets such as EVENT_CONFIRM.
    pub body: Section,
}

impl Packet {
    /// A named request packet (CMD_REQUEST, EVENT_REGISTER, EVENT_UNREGISTER, EVENT).
    pub fn named(kind: PacketKind, name: impl Into<String>, body: Section) -> Self {
        Self {
            kind,
            name: Some(name.into()),
            body,
        }
    }

    /// An unnamed reply packet.
    pub fn unnamed(kind: PacketKind, body: Section) -> Self {
        Self {
            kind,
            name: None,
            body,
        }
    }
}

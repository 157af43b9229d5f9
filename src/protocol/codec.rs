//! Binary codec for packets and message trees.
//!
//! Packet payload layout (the 4-byte frame length lives in
//! [`wire`](super::wire)):
//!
//! ```text
//! [1 byte: verb]
//! [1 byte: name length][name bytes]        (named verbs only)
//! [zero or more elements]
//! ```
//!
//! Elements are a tag byte followed by tag-specific fields. Names carry a
//! 1-byte length, values a 4-byte big-endian length. These widths are the
//! daemon's fixed contract.

use crate::error::{Error, ProtocolErrorKind, Result};
use crate::protocol::message::{Node, Section};
use crate::protocol::packet::{Packet, PacketKind};

const SECTION_START: u8 = 1;
const SECTION_END: u8 = 2;
const KEY_VALUE: u8 = 3;
const LIST_START: u8 = 4;
const LIST_ITEM: u8 = 5;
const LIST_END: u8 = 6;

/// Maximum section nesting accepted by the decoder.
const MAX_DEPTH: usize = 32;

/// Encode a packet into its payload bytes (without the frame length).
pub fn encode_packet(packet: &Packet) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(64);
    out.push(packet.kind as u8);
    if packet.kind.is_named() {
        // Named verbs always carry a name; the Packet constructors enforce it.
        let name = packet.name.as_deref().unwrap_or_default();
        encode_name(&mut out, name)?;
    }
    encode_section_body(&mut out, &packet.body)?;
    Ok(out)
}

/// Decode one packet from its payload bytes.
pub fn decode_packet(bytes: &[u8]) -> Result<Packet> {
    let mut reader = Reader::new(bytes);
    let kind = PacketKind::try_from(reader.take_u8("packet type")?)?;
    let name = if kind.is_named() {
        Some(reader.take_name()?)
    } else {
        None
    };
    let body = decode_section_body(&mut reader)?;
    Ok(Packet { kind, name, body })
}

fn encode_name(out: &mut Vec<u8>, name: &str) -> Result<()> {
    let bytes = name.as_bytes();
    if bytes.len() > u8::MAX as usize {
        return Err(Error::protocol(ProtocolErrorKind::NameTooLong));
    }
    out.push(bytes.len() as u8);
    out.extend_from_slice(bytes);
    Ok(())
}

fn encode_value(out: &mut Vec<u8>, value: &str) {
    let bytes = value.as_bytes();
    out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(bytes);
}

fn encode_section_body(out: &mut Vec<u8>, section: &Section) -> Result<()> {
    for (name, node) in section.iter() {
        match node {
            Node::Text(value) => {
                out.push(KEY_VALUE);
                encode_name(out, name)?;
                encode_value(out, value);
            }
            Node::List(items) => {
                out.push(LIST_START);
                encode_name(out, name)?;
                for item in items {
                    out.push(LIST_ITEM);
                    encode_value(out, item);
                }
                out.push(LIST_END);
            }
            Node::Section(inner) => {
                out.push(SECTION_START);
                encode_name(out, name)?;
                encode_section_body(out, inner)?;
                out.push(SECTION_END);
            }
        }
    }
    Ok(())
}

fn decode_section_body(reader: &mut Reader<'_>) -> Result<Section> {
    let mut root = Section::new();
    // Open sections, innermost last. The root never appears on the stack.
    let mut stack: Vec<(String, Section)> = Vec::new();

    while !reader.is_empty() {
        let tag = reader.take_u8("element type")?;
        match tag {
            KEY_VALUE => {
                let name = reader.take_name()?;
                let value = reader.take_value()?;
                current(&mut root, &mut stack).insert(name, value);
            }
            LIST_START => {
                let name = reader.take_name()?;
                let mut items = Vec::new();
                loop {
                    match reader.take_u8("list element")? {
                        LIST_ITEM => items.push(reader.take_value()?),
                        LIST_END => break,
                        SECTION_START | SECTION_END | KEY_VALUE | LIST_START => {
                            return Err(Error::protocol(
                                ProtocolErrorKind::UnexpectedElement {
                                    what: "non-item element inside list",
                                },
                            ))
                        }
                        value => {
                            return Err(Error::protocol(
                                ProtocolErrorKind::UnknownElementType { value },
                            ))
                        }
                    }
                }
                current(&mut root, &mut stack).insert(name, items);
            }
            SECTION_START => {
                if stack.len() >= MAX_DEPTH {
                    return Err(Error::protocol(ProtocolErrorKind::NestingTooDeep));
                }
                let name = reader.take_name()?;
                stack.push((name, Section::new()));
            }
            SECTION_END => match stack.pop() {
                Some((name, section)) => {
                    current(&mut root, &mut stack).insert(name, section);
                }
                None => {
                    return Err(Error::protocol(ProtocolErrorKind::UnexpectedElement {
                        what: "section end without matching start",
                    }))
                }
            },
            LIST_ITEM | LIST_END => {
                return Err(Error::protocol(ProtocolErrorKind::UnexpectedElement {
                    what: "list element outside list",
                }))
            }
            value => {
                return Err(Error::protocol(ProtocolErrorKind::UnknownElementType {
                    value,
                }))
            }
        }
    }

    if !stack.is_empty() {
        return Err(Error::protocol(ProtocolErrorKind::Unterminated {
            what: "section",
        }));
    }
    Ok(root)
}

fn current<'a>(root: &'a mut Section, stack: &'a mut [(String, Section)]) -> &'a mut Section {
    match stack.last_mut() {
        Some((_, section)) => section,
        None => root,
    }
}

/// Bounds-checked cursor over a packet payload.
struct Reader<'a> {
    input: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self { input }
    }

    fn is_empty(&self) -> bool {
        self.input.is_empty()
    }

    fn take_u8(&mut self, context: &'static str) -> Result<u8> {
        match self.input.split_first() {
            Some((&byte, rest)) => {
                self.input = rest;
                Ok(byte)
            }
            None => Err(Error::protocol(ProtocolErrorKind::UnexpectedEof {
                context,
            })),
        }
    }

    fn take_u32(&mut self, context: &'static str) -> Result<u32> {
        let bytes = self.take_bytes(4, context)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn take_bytes(&mut self, n: usize, context: &'static str) -> Result<&'a [u8]> {
        if self.input.len() < n {
            return Err(Error::protocol(ProtocolErrorKind::UnexpectedEof {
                context,
            }));
        }
        let (taken, rest) = self.input.split_at(n);
        self.input = rest;
        Ok(taken)
    }

    fn take_name(&mut self) -> Result<String> {
        let len = self.take_u8("name length")? as usize;
        let bytes = self.take_bytes(len, "name")?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| Error::protocol(ProtocolErrorKind::InvalidUtf8 { context: "name" }))
    }

    fn take_value(&mut self) -> Result<String> {
        let len = self.take_u32("value length")? as usize;
        let bytes = self.take_bytes(len, "value")?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| Error::protocol(ProtocolErrorKind::InvalidUtf8 { context: "value" }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ProtocolErrorKind};

    fn roundtrip(section: Section) -> Section {
        let packet = Packet::named(PacketKind::CmdRequest, "test", section);
        let bytes = encode_packet(&packet).unwrap();
        let decoded = decode_packet(&bytes).unwrap();
        assert_eq!(decoded.kind, PacketKind::CmdRequest);
        assert_eq!(decoded.name.as_deref(), Some("test"));
        decoded.body
    }

    #[test]
    fn test_roundtrip_flat_section() {
        let section = Section::new()
            .with("version", "2")
            .with("encap", "yes")
            .with("proposals", vec!["aes256-sha256-modp2048"]);

        assert_eq!(roundtrip(section.clone()), section);
    }

    #[test]
    fn test_roundtrip_nested_sections() {
        let section = Section::new()
            .with("version", "2")
            .with("encap", "yes")
            .with(
                "children",
                Section::new().with("c1", Section::new().with("mode", "tunnel")),
            );

        let decoded = roundtrip(section.clone());
        assert_eq!(decoded, section);
        let mode = decoded
            .section("children")
            .and_then(|c| c.section("c1"))
            .and_then(|c| c.text("mode"));
        assert_eq!(mode, Some("tunnel"));
    }

    #[test]
    fn test_roundtrip_preserves_list_order() {
        let section = Section::new().with("local_ts", vec!["10.0.1.0/24", "10.0.2.0/24", "10.0.0.0/8"]);
        let decoded = roundtrip(section);
        assert_eq!(
            decoded.list("local_ts").unwrap(),
            &["10.0.1.0/24", "10.0.2.0/24", "10.0.0.0/8"]
        );
    }

    #[test]
    fn test_wire_layout_is_fixed() {
        let packet = Packet::named(
            PacketKind::CmdRequest,
            "version",
            Section::new().with("key", "val"),
        );
        let bytes = encode_packet(&packet).unwrap();

        let mut expected = vec![0u8]; // CMD_REQUEST
        expected.push(7);
        expected.extend_from_slice(b"version");
        expected.push(KEY_VALUE);
        expected.push(3);
        expected.extend_from_slice(b"key");
        expected.extend_from_slice(&3u32.to_be_bytes());
        expected.extend_from_slice(b"val");
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_unnamed_packet_with_empty_body() {
        let packet = Packet::unnamed(PacketKind::EventConfirm, Section::new());
        let bytes = encode_packet(&packet).unwrap();
        assert_eq!(bytes, vec![5u8]);

        let decoded = decode_packet(&bytes).unwrap();
        assert_eq!(decoded.kind, PacketKind::EventConfirm);
        assert!(decoded.name.is_none());
        assert!(decoded.body.is_empty());
    }

    #[test]
    fn test_decode_unknown_verb() {
        let err = decode_packet(&[9]).unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol {
                kind: ProtocolErrorKind::UnknownPacketType { value: 9 }
            }
        ));
    }

    #[test]
    fn test_decode_unknown_element_tag() {
        // CMD_RESPONSE followed by an element tag the protocol does not define.
        let err = decode_packet(&[1, 99]).unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol {
                kind: ProtocolErrorKind::UnknownElementType { value: 99 }
            }
        ));
    }

    #[test]
    fn test_decode_value_length_overruns_buffer() {
        // KEY_VALUE "k" claiming 10 value bytes with only 2 present.
        let mut bytes = vec![1u8]; // CMD_RESPONSE
        bytes.push(KEY_VALUE);
        bytes.push(1);
        bytes.push(b'k');
        bytes.extend_from_slice(&10u32.to_be_bytes());
        bytes.extend_from_slice(b"ab");

        let err = decode_packet(&bytes).unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol {
                kind: ProtocolErrorKind::UnexpectedEof { context: "value" }
            }
        ));
    }

    #[test]
    fn test_decode_unterminated_section() {
        let mut bytes = vec![1u8]; // CMD_RESPONSE
        bytes.push(SECTION_START);
        bytes.push(1);
        bytes.push(b's');
        // EOF before SECTION_END.
        let err = decode_packet(&bytes).unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol {
                kind: ProtocolErrorKind::Unterminated { what: "section" }
            }
        ));
    }

    #[test]
    fn test_decode_unterminated_list() {
        let mut bytes = vec![1u8];
        bytes.push(LIST_START);
        bytes.push(1);
        bytes.push(b'l');
        bytes.push(LIST_ITEM);
        bytes.extend_from_slice(&1u32.to_be_bytes());
        bytes.push(b'x');
        let err = decode_packet(&bytes).unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol {
                kind: ProtocolErrorKind::UnexpectedEof { .. }
            }
        ));
    }

    #[test]
    fn test_decode_section_end_without_start() {
        let err = decode_packet(&[1, SECTION_END]).unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol {
                kind: ProtocolErrorKind::UnexpectedElement { .. }
            }
        ));
    }

    #[test]
    fn test_decode_key_value_inside_list() {
        let mut bytes = vec![1u8];
        bytes.push(LIST_START);
        bytes.push(1);
        bytes.push(b'l');
        bytes.push(KEY_VALUE);
        let err = decode_packet(&bytes).unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol {
                kind: ProtocolErrorKind::UnexpectedElement { .. }
            }
        ));
    }

    #[test]
    fn test_decode_rejects_excessive_nesting() {
        let mut bytes = vec![1u8];
        for _ in 0..40 {
            bytes.push(SECTION_START);
            bytes.push(1);
            bytes.push(b's');
        }
        let err = decode_packet(&bytes).unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol {
                kind: ProtocolErrorKind::NestingTooDeep
            }
        ));
    }

    #[test]
    fn test_encode_rejects_long_name() {
        let long = "x".repeat(300);
        let packet = Packet::named(
            PacketKind::CmdRequest,
            "cmd",
            Section::new().with(long, "v"),
        );
        let err = encode_packet(&packet).unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol {
                kind: ProtocolErrorKind::NameTooLong
            }
        ));
    }

    #[test]
    fn test_decode_event_packet_carries_name_and_body() {
        let packet = Packet::named(
            PacketKind::Event,
            "ike-updown",
            Section::new().with("up", "yes"),
        );
        let bytes = encode_packet(&packet).unwrap();
        let decoded = decode_packet(&bytes).unwrap();
        assert_eq!(decoded, packet);
    }
}

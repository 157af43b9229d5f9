//! Wire format for packet framing.
//!
//! Packets are length-prefixed: [4 bytes big-endian u32][payload]

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::{Error, ProtocolErrorKind, Result};
use crate::protocol::codec::{decode_packet, encode_packet};
use crate::protocol::packet::Packet;

/// Maximum packet size accepted by default. Matches the daemon's own
/// frame limit of 512 KiB.
pub const DEFAULT_MAX_PACKET_SIZE: usize = 512 * 1024;

/// Read one framed packet from the reader.
///
/// Returns a `ConnectionClosed` protocol error on clean EOF at a frame
/// boundary, and an error if the frame is too large, truncated, or its
/// payload fails to decode.
pub async fn read_packet<R>(reader: &mut R, max_size: usize) -> Result<Packet>
where
    R: AsyncReadExt + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(Error::protocol(ProtocolErrorKind::ConnectionClosed));
        }
        Err(e) => return Err(Error::Io(e)),
    }

    let len = u32::from_be_bytes(len_buf) as usize;

    // Sanity check the frame size before allocating
    if len > max_size {
        return Err(Error::protocol(ProtocolErrorKind::PacketTooLarge {
            size: len,
            max: max_size,
        }));
    }

    let mut buf = vec![0u8; len];
    match reader.read_exact(&mut buf).await {
        Ok(_) => {}
        // EOF in the middle of a frame is a truncated packet, not a
        // clean close.
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(Error::protocol(ProtocolErrorKind::UnexpectedEof {
                context: "packet payload",
            }));
        }
        Err(e) => return Err(Error::Io(e)),
    }

    decode_packet(&buf)
}

/// Write one framed packet to the writer.
pub async fn write_packet<W>(writer: &mut W, packet: &Packet, max_size: usize) -> Result<()>
where
    W: AsyncWriteExt + Unpin,
{
    let payload = encode_packet(packet)?;
    if payload.len() > max_size {
        return Err(Error::protocol(ProtocolErrorKind::PacketTooLarge {
            size: payload.len(),
            max: max_size,
        }));
    }
    let len = (payload.len() as u32).to_be_bytes();
    writer.write_all(&len).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::message::Section;
    use crate::protocol::packet::PacketKind;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_write_and_read_packet() {
        let packet = Packet::named(
            PacketKind::CmdRequest,
            "list-sas",
            Section::new().with("ike", "gw"),
        );

        let mut buffer = Vec::new();
        write_packet(&mut buffer, &packet, DEFAULT_MAX_PACKET_SIZE)
            .await
            .unwrap();

        // 4-byte length prefix, then verb
        let payload_len = u32::from_be_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]);
        assert_eq!(payload_len as usize, buffer.len() - 4);
        assert_eq!(buffer[4], 0); // CMD_REQUEST

        let mut cursor = Cursor::new(buffer);
        let decoded = read_packet(&mut cursor, DEFAULT_MAX_PACKET_SIZE)
            .await
            .unwrap();
        assert_eq!(decoded, packet);
    }

    #[tokio::test]
    async fn test_read_eof_is_connection_closed() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        let err = read_packet(&mut cursor, DEFAULT_MAX_PACKET_SIZE)
            .await
            .unwrap_err();
        assert!(err.is_connection_closed());
    }

    #[tokio::test]
    async fn test_read_truncated_payload() {
        // Frame declares 10 payload bytes but only 6 follow.
        let mut data = 10u32.to_be_bytes().to_vec();
        data.extend_from_slice(&[1, 0, 0, 0, 0, 0]);
        let mut cursor = Cursor::new(data);

        let err = read_packet(&mut cursor, DEFAULT_MAX_PACKET_SIZE)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol {
                kind: ProtocolErrorKind::UnexpectedEof { .. }
            }
        ));
    }

    #[tokio::test]
    async fn test_read_oversized_frame_rejected() {
        let data = 2_000_000u32.to_be_bytes().to_vec();
        let mut cursor = Cursor::new(data);

        let err = read_packet(&mut cursor, DEFAULT_MAX_PACKET_SIZE)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol {
                kind: ProtocolErrorKind::PacketTooLarge { .. }
            }
        ));
    }
}

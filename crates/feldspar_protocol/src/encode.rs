//! The build side of the codec.

use crate::packets::{AnyPacket, Disconnect};
use crate::Result;

/// Accumulates outgoing packets into one buffer so a burst can be written to
/// the socket in a single call.
#[derive(Default)]
pub struct PacketEncoder {
    buf: Vec<u8>,
}

impl PacketEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one packet, tag byte first. If encoding fails the buffer is
    /// left exactly as it was.
    pub fn append_packet(&mut self, packet: &AnyPacket) -> Result<()> {
        packet.encode(&mut self.buf)
    }

    /// Copies raw, already-encoded packet data onto the buffer.
    pub fn append_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Takes everything written so far.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Builds the error packet (tag 255) a server sends before closing a
/// connection it is deliberately dropping.
pub fn make_error(message: &str) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    AnyPacket::Disconnect(Disconnect {
        message: message.into(),
    })
    .encode(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packets::{MultiBlockChange, Ping};
    use crate::parse_stream;

    #[test]
    fn make_error_builds_a_disconnect() {
        let bytes = make_error("bye").unwrap();
        assert_eq!(bytes, [0xff, 0x00, 0x03, b'b', b'y', b'e']);
    }

    #[test]
    fn encoder_batches_packets() {
        let mut enc = PacketEncoder::new();
        enc.append_packet(&Ping.into()).unwrap();
        enc.append_packet(&Ping.into()).unwrap();

        let bytes = enc.take();
        assert_eq!(bytes, [0x00, 0x00]);
        assert!(enc.is_empty());

        let parsed = parse_stream(&bytes);
        assert_eq!(parsed.packets.len(), 2);
    }

    #[test]
    fn failed_append_leaves_earlier_packets_intact() {
        let mut enc = PacketEncoder::new();
        enc.append_packet(&Ping.into()).unwrap();

        let bad: AnyPacket = MultiBlockChange {
            x: 0,
            z: 0,
            coords: vec![1],
            kinds: Vec::new(),
            metadata: Vec::new(),
        }
        .into();
        assert!(enc.append_packet(&bad).is_err());

        assert_eq!(enc.take(), [0x00]);
    }
}

//! The opportunistic stream side of the codec.

use bytes::{Buf, BytesMut};

use crate::packets::AnyPacket;
use crate::{Error, Result};

/// An incremental packet decoder.
///
/// Bytes are queued as they arrive off the socket and whole packets are
/// yielded as soon as they are complete. There is no length envelope on the
/// wire; the tag's schema decides how many bytes a packet occupies, so the
/// decoder simply attempts a parse and rolls back when the buffer ends
/// mid-field.
#[derive(Default)]
pub struct PacketDecoder {
    buf: BytesMut,
    /// Bytes consumed over the life of the stream, for error offsets.
    consumed: usize,
}

impl PacketDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to decode the next complete packet.
    ///
    /// Returns `Ok(None)` when the buffer is empty or ends inside a packet;
    /// in that case the buffer is left untouched and the call can be retried
    /// after queueing more bytes. [`Error::UnknownPacket`] and
    /// [`Error::SchemaMismatch`] are unrecoverable: the caller should send an
    /// error packet and drop the connection.
    pub fn try_next_packet(&mut self) -> Result<Option<AnyPacket>> {
        let Some(&tag) = self.buf.first() else {
            return Ok(None);
        };

        let mut r = &self.buf[1..];
        let before = r.len();

        match AnyPacket::decode_body(tag, &mut r) {
            Ok(packet) => {
                let len = 1 + (before - r.len());
                self.buf.advance(len);
                self.consumed += len;
                Ok(Some(packet))
            }
            Err(Error::ShortRead) => Ok(None),
            Err(Error::UnknownPacket { tag, .. }) => Err(Error::UnknownPacket {
                tag,
                offset: self.consumed,
            }),
            Err(e) => Err(e),
        }
    }

    /// Queues a buffer previously handed out by [`take_capacity`], without
    /// copying.
    ///
    /// [`take_capacity`]: Self::take_capacity
    pub fn queue_bytes(&mut self, bytes: BytesMut) {
        self.buf.unsplit(bytes);
    }

    /// Copies `bytes` onto the end of the internal buffer.
    pub fn queue_slice(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Takes the unused capacity off the end of the internal buffer so the
    /// caller can read into it directly.
    pub fn take_capacity(&mut self) -> BytesMut {
        self.buf.split_off(self.buf.len())
    }

    pub fn reserve(&mut self, additional: usize) {
        self.buf.reserve(additional);
    }
}

/// The outcome of one opportunistic pass over a byte stream.
#[derive(Debug)]
pub struct StreamParse<'a> {
    /// Whole packets, in wire order.
    pub packets: Vec<AnyPacket>,
    /// The unconsumed tail. Always a suffix of the input slice, never a
    /// copy; on a clean stop it begins at the next packet's tag byte.
    pub leftover: &'a [u8],
    /// The error that stopped the pass, if any. [`Error::ShortRead`] never
    /// appears here; running out of bytes mid-packet is a clean stop.
    pub error: Option<Error>,
}

/// Opportunistically parses as many whole packets as possible out of `buf`.
///
/// Stops without error when the buffer is exhausted or ends inside a packet.
/// Stops with an error on an unknown tag or a malformed field; the
/// accumulated packets and the tail from the offending tag byte are still
/// returned so the caller can decide how to fail.
pub fn parse_stream(buf: &[u8]) -> StreamParse<'_> {
    let mut packets = Vec::new();
    let mut rest = buf;

    loop {
        let Some(&tag) = rest.first() else {
            return StreamParse {
                packets,
                leftover: rest,
                error: None,
            };
        };

        let mut r = &rest[1..];
        let before = r.len();

        match AnyPacket::decode_body(tag, &mut r) {
            Ok(packet) => {
                let len = 1 + (before - r.len());
                rest = &rest[len..];
                packets.push(packet);
            }
            Err(Error::ShortRead) => {
                return StreamParse {
                    packets,
                    leftover: rest,
                    error: None,
                };
            }
            Err(Error::UnknownPacket { tag, .. }) => {
                let offset = buf.len() - rest.len();
                return StreamParse {
                    packets,
                    leftover: rest,
                    error: Some(Error::UnknownPacket { tag, offset }),
                };
            }
            Err(e) => {
                return StreamParse {
                    packets,
                    leftover: rest,
                    error: Some(e),
                };
            }
        }
    }
}

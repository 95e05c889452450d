#![doc = include_str!("../README.md")]

mod decode;
mod encode;
mod error;
mod impls;
pub mod packets;

pub use decode::{parse_stream, PacketDecoder, StreamParse};
pub use encode::{make_error, PacketEncoder};
pub use error::{Error, Result, SchemaMismatch};
pub use impls::Blob;
pub use packets::AnyPacket;

/// The protocol generation this library speaks (Alpha).
pub const PROTOCOL_VERSION: u32 = 2;

/// The `Encode` trait allows objects to be written to the wire. It is the
/// inverse of [`Decode`].
///
/// Fields are encoded in the order they appear in the type definition, with
/// no padding or alignment. Integers and floats are big-endian; strings carry
/// a `u16` byte-count prefix and blobs a `u32` one.
pub trait Encode {
    /// Appends this object's wire form to `w`.
    ///
    /// Successful calls must decode back to an equal value via [`Decode`],
    /// consuming exactly the bytes that were written.
    fn encode(&self, w: &mut Vec<u8>) -> Result<()>;
}

/// The `Decode` trait allows objects to be read from the wire. It is the
/// inverse of [`Encode`].
///
/// Implementations shrink the slice from the front as bytes are read, so the
/// caller can measure the consumed span by comparing slice lengths. A decoder
/// that runs out of input fails with [`Error::ShortRead`] and the caller may
/// retry once more bytes have arrived.
pub trait Decode<'a>: Sized {
    /// Reads this object from the front of `r`.
    fn decode(r: &mut &'a [u8]) -> Result<Self>;
}

/// Types considered to be packets.
///
/// In serialized form a packet is its single [`TAG`](Self::TAG) byte followed
/// by the body. The [`Encode`] and [`Decode`] impls on the type cover only
/// the body; the tag is handled by the registry in [`packets`].
pub trait Packet {
    /// The leading tag byte of this packet.
    const TAG: u8;
    /// The name of this packet for debugging purposes.
    const NAME: &'static str;
}

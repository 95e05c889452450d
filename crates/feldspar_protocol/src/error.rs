use std::str::Utf8Error;

use thiserror::Error;

/// Result alias used throughout the codec.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    /// The buffer ended inside a field. Non-fatal at stream level: the
    /// decoder leaves the buffer untouched and the parse can be retried once
    /// more bytes have arrived.
    #[error("buffer ended inside a field")]
    ShortRead,

    /// The leading tag byte is not in the registry. Fatal: with no framing
    /// envelope there is no way to resynchronise the stream.
    #[error("unknown packet tag {tag:#04x} at stream offset {offset}")]
    UnknownPacket { tag: u8, offset: usize },

    /// A field violated its schema, on either the build or the parse side.
    /// Fatal at stream level.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(#[from] SchemaMismatch),
}

impl Error {
    /// Whether the stream can still make progress once more bytes arrive.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::ShortRead)
    }
}

/// The ways a value can disagree with its packet schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SchemaMismatch {
    #[error("string field is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] Utf8Error),
    #[error("string of {0} bytes does not fit the u16 length prefix")]
    StringTooLong(usize),
    #[error("blob of {0} bytes does not fit the u32 length prefix")]
    BlobTooLong(usize),
    #[error("array of {0} elements does not fit the u16 count prefix")]
    ArrayTooLong(usize),
    #[error("parallel arrays disagree on length ({0} vs {1})")]
    CountMismatch(usize, usize),
    #[error("occupied slot uses the empty-slot id {0:#06x}")]
    ReservedSlotId(u16),
}

//! Implementations of [`Encode`] and [`Decode`] on the schema primitives.

use crate::error::SchemaMismatch;
use crate::{Decode, Encode, Error, Result};

/// Splits `N` bytes off the front of `r`.
fn take<'a, const N: usize>(r: &mut &'a [u8]) -> Result<&'a [u8; N]> {
    if r.len() < N {
        return Err(Error::ShortRead);
    }

    let (head, rest) = r.split_at(N);
    *r = rest;
    Ok(head.try_into().unwrap())
}

macro_rules! fixed_width_impl {
    ($($ty:ty),*) => {
        $(
            impl Encode for $ty {
                fn encode(&self, w: &mut Vec<u8>) -> Result<()> {
                    w.extend_from_slice(&self.to_be_bytes());
                    Ok(())
                }
            }

            impl Decode<'_> for $ty {
                fn decode(r: &mut &[u8]) -> Result<Self> {
                    Ok(<$ty>::from_be_bytes(*take::<{ std::mem::size_of::<$ty>() }>(r)?))
                }
            }
        )*
    };
}

fixed_width_impl!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self, w: &mut Vec<u8>) -> Result<()> {
        (**self).encode(w)
    }
}

impl Encode for bool {
    fn encode(&self, w: &mut Vec<u8>) -> Result<()> {
        w.push(u8::from(*self));
        Ok(())
    }
}

impl Decode<'_> for bool {
    fn decode(r: &mut &[u8]) -> Result<Self> {
        Ok(u8::decode(r)? != 0)
    }
}

impl Encode for str {
    fn encode(&self, w: &mut Vec<u8>) -> Result<()> {
        // The prefix counts encoded UTF-8 bytes, not characters.
        let len = self.len();
        let Ok(len) = u16::try_from(len) else {
            return Err(SchemaMismatch::StringTooLong(len).into());
        };

        len.encode(w)?;
        w.extend_from_slice(self.as_bytes());
        Ok(())
    }
}

impl Encode for String {
    fn encode(&self, w: &mut Vec<u8>) -> Result<()> {
        self.as_str().encode(w)
    }
}

impl<'a> Decode<'a> for &'a str {
    fn decode(r: &mut &'a [u8]) -> Result<Self> {
        let len = u16::decode(r)? as usize;
        if r.len() < len {
            return Err(Error::ShortRead);
        }

        let (bytes, rest) = r.split_at(len);
        let s = std::str::from_utf8(bytes).map_err(SchemaMismatch::from)?;
        *r = rest;
        Ok(s)
    }
}

impl Decode<'_> for String {
    fn decode(r: &mut &[u8]) -> Result<Self> {
        Ok(<&str>::decode(r)?.into())
    }
}

/// A `u32`-length-prefixed run of raw bytes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Blob(pub Vec<u8>);

impl Encode for Blob {
    fn encode(&self, w: &mut Vec<u8>) -> Result<()> {
        let len = self.0.len();
        let Ok(len) = u32::try_from(len) else {
            return Err(SchemaMismatch::BlobTooLong(len).into());
        };

        len.encode(w)?;
        w.extend_from_slice(&self.0);
        Ok(())
    }
}

impl Decode<'_> for Blob {
    fn decode(r: &mut &[u8]) -> Result<Self> {
        let len = u32::decode(r)? as usize;
        if r.len() < len {
            return Err(Error::ShortRead);
        }

        let (bytes, rest) = r.split_at(len);
        *r = rest;
        Ok(Blob(bytes.to_vec()))
    }
}

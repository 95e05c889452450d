//! Small typed accessors over named-tag compounds. Readers are tolerant:
//! a missing or mis-typed key is `None` and the caller picks the fallback.

use valence_nbt::{Compound, Value};

pub(crate) fn byte(tag: &Compound, key: &str) -> Option<i8> {
    match tag.get(key) {
        Some(Value::Byte(v)) => Some(*v),
        _ => None,
    }
}

pub(crate) fn int(tag: &Compound, key: &str) -> Option<i32> {
    match tag.get(key) {
        Some(Value::Int(v)) => Some(*v),
        _ => None,
    }
}

pub(crate) fn long(tag: &Compound, key: &str) -> Option<i64> {
    match tag.get(key) {
        Some(Value::Long(v)) => Some(*v),
        _ => None,
    }
}

pub(crate) fn double(tag: &Compound, key: &str) -> Option<f64> {
    match tag.get(key) {
        Some(Value::Double(v)) => Some(*v),
        _ => None,
    }
}

pub(crate) fn byte_array<'a>(tag: &'a Compound, key: &str) -> Option<&'a [i8]> {
    match tag.get(key) {
        Some(Value::ByteArray(v)) => Some(v),
        _ => None,
    }
}

pub(crate) fn compound<'a>(tag: &'a Compound, key: &str) -> Option<&'a Compound> {
    match tag.get(key) {
        Some(Value::Compound(v)) => Some(v),
        _ => None,
    }
}

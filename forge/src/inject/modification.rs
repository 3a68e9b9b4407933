//! Transformation steps which can be attached to an [`Injectable`](super::Injectable).
//!
//! Each step is plain data so that a chain can be written to a configuration file, logged and
//! compared in tests.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// One step of a transformation chain over values of type `T`. Applying a step never fails.
pub trait Modification<T>:
    fmt::Debug + fmt::Display + Clone + PartialEq + Serialize + DeserializeOwned
{
    fn modify(&self, input: T) -> T;
}

/// Modifications of counts and lengths. Arithmetic wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntegerModification {
    Add(u32),
    Subtract(u32),
    Xor(u32),
    ExplicitValue(u32),
    ShiftLeft(u32),
    ShiftRight(u32),
}

impl Modification<u32> for IntegerModification {
    fn modify(&self, input: u32) -> u32 {
        match *self {
            IntegerModification::Add(summand) => input.wrapping_add(summand),
            IntegerModification::Subtract(subtrahend) => input.wrapping_sub(subtrahend),
            IntegerModification::Xor(xor) => input ^ xor,
            IntegerModification::ExplicitValue(value) => value,
            IntegerModification::ShiftLeft(shift) => input.checked_shl(shift).unwrap_or(0),
            IntegerModification::ShiftRight(shift) => input.checked_shr(shift).unwrap_or(0),
        }
    }
}

impl fmt::Display for IntegerModification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegerModification::Add(v) => write!(f, "+{}", v),
            IntegerModification::Subtract(v) => write!(f, "-{}", v),
            IntegerModification::Xor(v) => write!(f, "^{:#x}", v),
            IntegerModification::ExplicitValue(v) => write!(f, "={}", v),
            IntegerModification::ShiftLeft(v) => write!(f, "<<{}", v),
            IntegerModification::ShiftRight(v) => write!(f, ">>{}", v),
        }
    }
}

/// Modifications of single-byte fields such as enum tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ByteModification {
    Add(u8),
    Subtract(u8),
    Xor(u8),
    ExplicitValue(u8),
}

impl Modification<u8> for ByteModification {
    fn modify(&self, input: u8) -> u8 {
        match *self {
            ByteModification::Add(summand) => input.wrapping_add(summand),
            ByteModification::Subtract(subtrahend) => input.wrapping_sub(subtrahend),
            ByteModification::Xor(xor) => input ^ xor,
            ByteModification::ExplicitValue(value) => value,
        }
    }
}

impl fmt::Display for ByteModification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteModification::Add(v) => write!(f, "+{}", v),
            ByteModification::Subtract(v) => write!(f, "-{}", v),
            ByteModification::Xor(v) => write!(f, "^{:#04x}", v),
            ByteModification::ExplicitValue(v) => write!(f, "={:#04x}", v),
        }
    }
}

/// Modifications of byte arrays. Positions past the end are clamped to the end.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BytesModification {
    /// XOR `xor` onto the input starting at `start_position`; bytes of `xor` which would land
    /// past the end are dropped
    Xor { start_position: usize, xor: Vec<u8> },
    ExplicitValue(Vec<u8>),
    Insert { position: usize, bytes: Vec<u8> },
    Delete { start_position: usize, count: usize },
    /// Append a copy of the input to itself
    Duplicate,
}

impl Modification<Vec<u8>> for BytesModification {
    fn modify(&self, mut input: Vec<u8>) -> Vec<u8> {
        match self {
            BytesModification::Xor {
                start_position,
                xor,
            } => {
                let start = (*start_position).min(input.len());
                input[start..]
                    .iter_mut()
                    .zip(xor.iter())
                    .for_each(|(byte, x)| *byte ^= x);
                input
            }
            BytesModification::ExplicitValue(value) => value.clone(),
            BytesModification::Insert { position, bytes } => {
                let position = (*position).min(input.len());
                input.splice(position..position, bytes.iter().copied());
                input
            }
            BytesModification::Delete {
                start_position,
                count,
            } => {
                let start = (*start_position).min(input.len());
                let end = start.saturating_add(*count).min(input.len());
                input.drain(start..end);
                input
            }
            BytesModification::Duplicate => {
                input.extend_from_within(..);
                input
            }
        }
    }
}

impl fmt::Display for BytesModification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BytesModification::Xor {
                start_position,
                xor,
            } => write!(f, "xor({}, {})", start_position, hex::encode(xor)),
            BytesModification::ExplicitValue(value) => write!(f, "={}", hex::encode(value)),
            BytesModification::Insert { position, bytes } => {
                write!(f, "insert({}, {})", position, hex::encode(bytes))
            }
            BytesModification::Delete {
                start_position,
                count,
            } => write!(f, "delete({}, {})", start_position, count),
            BytesModification::Duplicate => write!(f, "duplicate"),
        }
    }
}

/// A modification of any family, as found in configuration files before it is known which
/// field it will be attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnyModification {
    Byte(ByteModification),
    Integer(IntegerModification),
    Bytes(BytesModification),
}

impl AnyModification {
    pub fn family(&self) -> &'static str {
        match self {
            AnyModification::Byte(_) => "byte",
            AnyModification::Integer(_) => "integer",
            AnyModification::Bytes(_) => "bytes",
        }
    }
}

impl fmt::Display for AnyModification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnyModification::Byte(m) => m.fmt(f),
            AnyModification::Integer(m) => m.fmt(f),
            AnyModification::Bytes(m) => m.fmt(f),
        }
    }
}

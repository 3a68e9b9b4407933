//! Protocol-agnostic building blocks of the manipulation engine.
//!
//! * [`codec`] reads and writes big-endian wire fields with an absolute, forward-only cursor.
//! * [`inject`] holds field values separately from the modifications applied when they are
//!   written, which is how a single field of a protocol-correct message gets corrupted.
//! * [`error`] is the error type shared by every layer.

pub mod codec;
pub mod error;
pub mod inject;
pub mod log;

//! The TLS handshake engine

#[macro_use]
mod macros;

pub mod algorithm;
pub mod context;
#[allow(non_camel_case_types)]
pub mod enums;
pub mod handshake;
pub mod hash_hs;
pub mod key_exchange;
pub mod prf;

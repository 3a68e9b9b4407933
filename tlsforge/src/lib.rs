//! A TLS handshake engine for testing implementations with malformed messages.
//!
//! Every wire field of a handshake message is an injectable value: the engine computes the
//! protocol-correct original, and a test may attach modifications which are applied when the
//! message is written. This keeps a message consistent except for exactly the corrupted fields.
//!
//! The [`oracle`] module builds on the same engine to query TLS servers as PKCS#1 v1.5 padding
//! oracles.

pub mod config;
pub mod oracle;
pub mod tls;

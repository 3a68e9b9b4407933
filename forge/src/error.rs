use std::{fmt, fmt::Formatter, io};

use serde::{Deserialize, Serialize};

use crate::codec::DecodeError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Error {
    /// The peer sent something the protocol does not allow: a wrong message type tag, a declared
    /// length which does not match the consumed payload or an unknown algorithm value.
    ProtocolViolation(String),
    /// A handler was invoked for an algorithm it does not implement. This is a bug in the test
    /// setup and never a network condition.
    ConfigurationMismatch(String),
    /// No cryptographic algorithm is known for the negotiated parameters, or a cryptographic
    /// collaborator failed. Fatal for the connection.
    CryptoConfiguration(String),
    /// The channel to the decryption endpoint of an oracle is unavailable. This is distinct from
    /// a negative conformity verdict.
    OracleCommunication(String),
    /// Input ended before a field could be read completely
    Codec(DecodeError),
    /// A configuration file or an injection descriptor could not be used
    Config(String),
    /// There was an unexpected IO error
    IO(String),
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::ProtocolViolation(err) => write!(f, "protocol violation: {}", err),
            Error::ConfigurationMismatch(err) => write!(f, "configuration mismatch: {}", err),
            Error::CryptoConfiguration(err) => {
                write!(f, "error in the cryptographic configuration: {}", err)
            }
            Error::OracleCommunication(err) => {
                write!(f, "error while communicating with the oracle: {}", err)
            }
            Error::Codec(err) => write!(f, "error while decoding: {}", err),
            Error::Config(err) => write!(f, "error in the configuration: {}", err),
            Error::IO(err) => write!(f, "error in io: {}", err),
        }
    }
}

impl From<DecodeError> for Error {
    fn from(err: DecodeError) -> Self {
        Error::Codec(err)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::IO(err.to_string())
    }
}

impl From<hex::FromHexError> for Error {
    fn from(err: hex::FromHexError) -> Self {
        Error::Config(format!("invalid hex: {}", err))
    }
}

impl Error {
    /// Whether an attack driver may retry the operation which produced this error
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::OracleCommunication(_) | Error::IO(_))
    }
}

//! Maps negotiated parameters to the algorithms they imply.

use forge::error::Error;
use serde::{Deserialize, Serialize};

use crate::tls::enums::{CipherSuite, ProtocolVersion};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyExchangeAlgorithm {
    Rsa,
    DheRsa,
    EcdheRsa,
    EcdheEcdsa,
}

/// The shape of the ClientKeyExchange a key exchange algorithm requires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyExchangeFamily {
    /// Encrypted premaster secret
    Rsa,
    /// Finite field Diffie-Hellman public value
    Dh,
    /// Elliptic curve Diffie-Hellman public point
    Ecdh,
}

impl KeyExchangeAlgorithm {
    pub fn family(&self) -> KeyExchangeFamily {
        match self {
            KeyExchangeAlgorithm::Rsa => KeyExchangeFamily::Rsa,
            KeyExchangeAlgorithm::DheRsa => KeyExchangeFamily::Dh,
            KeyExchangeAlgorithm::EcdheRsa | KeyExchangeAlgorithm::EcdheEcdsa => {
                KeyExchangeFamily::Ecdh
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// MD5 and SHA-1 concatenated, used up to TLS 1.1
    Md5Sha1,
    Sha256,
    Sha384,
}

impl DigestAlgorithm {
    pub fn output_len(&self) -> usize {
        match self {
            DigestAlgorithm::Md5Sha1 => 16 + 20,
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Sha384 => 48,
        }
    }
}

pub fn key_exchange_algorithm(suite: CipherSuite) -> Result<KeyExchangeAlgorithm, Error> {
    use CipherSuite::*;

    match suite {
        TLS_RSA_WITH_AES_128_CBC_SHA
        | TLS_RSA_WITH_AES_256_CBC_SHA
        | TLS_RSA_WITH_AES_128_CBC_SHA256
        | TLS_RSA_WITH_AES_256_CBC_SHA256
        | TLS_RSA_WITH_AES_128_GCM_SHA256
        | TLS_RSA_WITH_AES_256_GCM_SHA384 => Ok(KeyExchangeAlgorithm::Rsa),
        TLS_DHE_RSA_WITH_AES_128_CBC_SHA
        | TLS_DHE_RSA_WITH_AES_256_CBC_SHA
        | TLS_DHE_RSA_WITH_AES_128_CBC_SHA256
        | TLS_DHE_RSA_WITH_AES_128_GCM_SHA256
        | TLS_DHE_RSA_WITH_AES_256_GCM_SHA384 => Ok(KeyExchangeAlgorithm::DheRsa),
        TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA
        | TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA
        | TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256
        | TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384 => Ok(KeyExchangeAlgorithm::EcdheRsa),
        TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA
        | TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256
        | TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384 => Ok(KeyExchangeAlgorithm::EcdheEcdsa),
        TLS13_AES_128_GCM_SHA256 | TLS13_AES_256_GCM_SHA384 => Err(Error::ConfigurationMismatch(
            format!("{:?} does not imply a TLS 1.2 key exchange", suite),
        )),
        Unknown(value) => Err(Error::ProtocolViolation(format!(
            "unknown cipher suite {:#06x}",
            value
        ))),
    }
}

/// Hash used by the PRF of a TLS 1.2 cipher suite
pub fn prf_digest_algorithm(suite: CipherSuite) -> Result<DigestAlgorithm, Error> {
    use CipherSuite::*;

    match suite {
        TLS_RSA_WITH_AES_256_GCM_SHA384
        | TLS_DHE_RSA_WITH_AES_256_GCM_SHA384
        | TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384
        | TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384 => Ok(DigestAlgorithm::Sha384),
        TLS13_AES_128_GCM_SHA256 | TLS13_AES_256_GCM_SHA384 | Unknown(_) => {
            Err(Error::CryptoConfiguration(format!(
                "no TLS 1.2 digest algorithm for {:?}",
                suite
            )))
        }
        _ => Ok(DigestAlgorithm::Sha256),
    }
}

/// Transcript digest for the combination of protocol version and cipher suite
pub fn digest_algorithm(
    version: ProtocolVersion,
    suite: CipherSuite,
) -> Result<DigestAlgorithm, Error> {
    match version {
        ProtocolVersion::SSLv3
        | ProtocolVersion::TLSv1_0
        | ProtocolVersion::TLSv1_1
        | ProtocolVersion::DTLSv1_0 => Ok(DigestAlgorithm::Md5Sha1),
        ProtocolVersion::TLSv1_2 | ProtocolVersion::DTLSv1_2 => prf_digest_algorithm(suite),
        ProtocolVersion::Unknown(value) => Err(Error::CryptoConfiguration(format!(
            "no digest algorithm for protocol version {:#06x}",
            value
        ))),
    }
}

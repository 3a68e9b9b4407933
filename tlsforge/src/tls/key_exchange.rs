//! Interface to the key exchange cryptography the handshake engine delegates.
//!
//! Handlers only need the bytes that go on the wire and the resulting premaster secret; how they
//! are computed is up to a [`KeyExchangeBackend`] installed in the [`TlsContext`].
//!
//! [`TlsContext`]: crate::tls::context::TlsContext

use std::fmt::Debug;

use forge::error::Error;
use ring::{agreement, rand::SystemRandom};
use serde::{Deserialize, Serialize};

use crate::tls::enums::{ECPointFormat, NamedGroup};

/// Finite field Diffie-Hellman parameters as announced by the server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DhParameters {
    pub p: Vec<u8>,
    pub g: Vec<u8>,
    pub server_public: Vec<u8>,
    /// Only known when we are the server
    pub server_private: Option<Vec<u8>>,
    pub client_public: Vec<u8>,
}

/// Elliptic curve negotiation state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcContext {
    pub named_group: Option<NamedGroup>,
    pub point_format: ECPointFormat,
    pub server_public_point: Vec<u8>,
    pub client_public_point: Vec<u8>,
}

impl Default for EcContext {
    fn default() -> Self {
        Self {
            named_group: None,
            point_format: ECPointFormat::Uncompressed,
            server_public_point: Vec::new(),
            client_public_point: Vec::new(),
        }
    }
}

/// Result of a key agreement performed by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAgreement {
    pub public_value: Vec<u8>,
    pub premaster_secret: Vec<u8>,
}

pub trait KeyExchangeBackend: Debug {
    /// Encrypt the premaster secret for the server whose certificate chain is given
    fn encrypt_premaster_secret(
        &self,
        server_certificates: &[Vec<u8>],
        premaster_secret: &[u8],
    ) -> Result<Vec<u8>, Error>;

    /// Decrypt a received premaster secret. `None` if the backend holds no private key.
    fn decrypt_premaster_secret(&self, encrypted: &[u8]) -> Result<Option<Vec<u8>>, Error>;

    fn dh_agreement(&self, parameters: &DhParameters) -> Result<KeyAgreement, Error>;

    fn ecdh_agreement(&self, ec_context: &EcContext) -> Result<KeyAgreement, Error>;
}

/// ECDH through `ring`. RSA and finite field DH need a backend with big number support.
#[derive(Debug, Default)]
pub struct RingKeyExchange;

impl RingKeyExchange {
    fn algorithm(group: NamedGroup) -> Result<&'static agreement::Algorithm, Error> {
        match group {
            NamedGroup::secp256r1 => Ok(&agreement::ECDH_P256),
            NamedGroup::secp384r1 => Ok(&agreement::ECDH_P384),
            NamedGroup::X25519 => Ok(&agreement::X25519),
            other => Err(Error::CryptoConfiguration(format!(
                "no ECDH implementation for {:?}",
                other
            ))),
        }
    }
}

impl KeyExchangeBackend for RingKeyExchange {
    fn encrypt_premaster_secret(
        &self,
        _server_certificates: &[Vec<u8>],
        _premaster_secret: &[u8],
    ) -> Result<Vec<u8>, Error> {
        Err(Error::CryptoConfiguration(
            "RSA premaster encryption needs an external key exchange backend".to_string(),
        ))
    }

    fn decrypt_premaster_secret(&self, _encrypted: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        Ok(None)
    }

    fn dh_agreement(&self, _parameters: &DhParameters) -> Result<KeyAgreement, Error> {
        Err(Error::CryptoConfiguration(
            "finite field DH needs an external key exchange backend".to_string(),
        ))
    }

    fn ecdh_agreement(&self, ec_context: &EcContext) -> Result<KeyAgreement, Error> {
        let group = ec_context.named_group.ok_or_else(|| {
            Error::CryptoConfiguration("no named group negotiated for ECDH".to_string())
        })?;
        let algorithm = Self::algorithm(group)?;
        let rng = SystemRandom::new();
        let private_key = agreement::EphemeralPrivateKey::generate(algorithm, &rng)
            .map_err(|_| Error::CryptoConfiguration("failed to generate ECDH key".to_string()))?;
        let public_value = private_key
            .compute_public_key()
            .map_err(|_| Error::CryptoConfiguration("failed to compute ECDH key".to_string()))?
            .as_ref()
            .to_vec();
        let peer = agreement::UnparsedPublicKey::new(algorithm, &ec_context.server_public_point);
        let premaster_secret = agreement::agree_ephemeral(
            private_key,
            &peer,
            Error::CryptoConfiguration(format!("invalid server public point for {:?}", group)),
            |secret| Ok(secret.to_vec()),
        )?;

        Ok(KeyAgreement {
            public_value,
            premaster_secret,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_point(algorithm: &'static agreement::Algorithm) -> Vec<u8> {
        let rng = SystemRandom::new();
        let key = agreement::EphemeralPrivateKey::generate(algorithm, &rng).unwrap();
        key.compute_public_key().unwrap().as_ref().to_vec()
    }

    #[test_log::test]
    fn ecdh_x25519() {
        let ec_context = EcContext {
            named_group: Some(NamedGroup::X25519),
            server_public_point: server_point(&agreement::X25519),
            ..EcContext::default()
        };
        let agreement = RingKeyExchange.ecdh_agreement(&ec_context).unwrap();
        assert_eq!(agreement.public_value.len(), 32);
        assert_eq!(agreement.premaster_secret.len(), 32);
    }

    #[test_log::test]
    fn ecdh_rejects_garbage_point() {
        let ec_context = EcContext {
            named_group: Some(NamedGroup::secp256r1),
            server_public_point: vec![0x04, 0x01, 0x02],
            ..EcContext::default()
        };
        assert!(matches!(
            RingKeyExchange.ecdh_agreement(&ec_context),
            Err(Error::CryptoConfiguration(_))
        ));
    }

    #[test_log::test]
    fn rsa_needs_external_backend() {
        assert!(RingKeyExchange
            .encrypt_premaster_secret(&[], &[0u8; 48])
            .is_err());
        assert_eq!(RingKeyExchange.decrypt_premaster_secret(&[1, 2]), Ok(None));
    }
}

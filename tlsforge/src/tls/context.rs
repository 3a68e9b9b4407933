use chrono::Utc;
use forge::error::Error;
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};

use crate::tls::algorithm;
use crate::tls::algorithm::DigestAlgorithm;
use crate::tls::enums::{
    CipherSuite, ClientCertificateType, Compression, ConnectionEnd, ProtocolVersion,
    SignatureAndHashAlgorithm,
};
use crate::tls::hash_hs::HandshakeHash;
use crate::tls::key_exchange::{DhParameters, EcContext, KeyExchangeBackend, RingKeyExchange};

pub const RANDOM_LENGTH: usize = 32;
pub const UNIX_TIME_LENGTH: usize = 4;
pub const MASTER_SECRET_LENGTH: usize = 48;
pub const PREMASTER_SECRET_LENGTH: usize = 48;

/// Which optional steps of the server side of the handshake have happened. Tells the record
/// fetching driver whether a Finished has to be kept back until ClientKeyExchange is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ServerHandshakeStatus {
    /// ServerHelloDone not prepared yet, or Finished handled
    #[default]
    Normal,
    /// ServerHelloDone prepared and the client was asked to authenticate
    ClientAuthentication,
    /// ServerHelloDone prepared without client authentication: a Finished arriving early is
    /// deferred
    FinishedDeferred,
    /// ClientKeyExchange parsed, the deferred Finished can be parsed now
    DeferredFinishedReady,
}

impl ServerHandshakeStatus {
    pub fn get_u8(&self) -> u8 {
        match self {
            ServerHandshakeStatus::Normal => 0,
            ServerHandshakeStatus::ClientAuthentication => 1,
            ServerHandshakeStatus::FinishedDeferred => 2,
            ServerHandshakeStatus::DeferredFinishedReady => 3,
        }
    }
}

/// What a parser does when the bytes it consumed do not add up to the declared length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LengthCheck {
    /// Reject the message as a protocol violation
    #[default]
    Strict,
    /// Accept the message and log a warning
    Tolerant,
}

/// Everything negotiated or derived during one handshake. Exactly one instance exists per
/// connection, and every handler reads and updates it.
#[derive(Debug)]
pub struct TlsContext {
    pub protocol_version: ProtocolVersion,
    pub connection_end: ConnectionEnd,
    pub selected_cipher_suite: CipherSuite,
    /// Suites we propose in a ClientHello
    pub cipher_suites: Vec<CipherSuite>,
    /// Suites the peer proposed in its ClientHello
    pub peer_cipher_suites: Vec<CipherSuite>,
    pub compression_method: Compression,
    /// gmt_unix_time followed by 28 random bytes
    pub client_random: [u8; RANDOM_LENGTH],
    pub server_random: [u8; RANDOM_LENGTH],
    pub session_id: Vec<u8>,
    pub premaster_secret: Vec<u8>,
    pub master_secret: [u8; MASTER_SECRET_LENGTH],
    /// DER certificates we present, leaf first
    pub certificate_chain: Vec<Vec<u8>>,
    pub server_certificates: Vec<Vec<u8>>,
    pub client_certificates: Vec<Vec<u8>>,
    pub ec_context: EcContext,
    pub dh_parameters: DhParameters,
    pub digest: HandshakeHash,
    pub supported_signature_and_hash_algorithms: Vec<SignatureAndHashAlgorithm>,
    pub client_certificate_types: Vec<ClientCertificateType>,
    pub client_authentication: bool,
    pub server_handshake_status: ServerHandshakeStatus,
    pub dtls_cookie: Vec<u8>,
    /// Opaque extension block we send in a ClientHello
    pub client_extensions: Vec<u8>,
    /// Opaque extension block we send in a ServerHello
    pub server_extensions: Vec<u8>,
    /// verify_data of the last Finished received from the peer
    pub peer_verify_data: Vec<u8>,
    pub length_check: LengthCheck,
    pub key_exchange: Box<dyn KeyExchangeBackend>,
}

impl Default for TlsContext {
    fn default() -> Self {
        Self {
            protocol_version: ProtocolVersion::TLSv1_2,
            connection_end: ConnectionEnd::Client,
            selected_cipher_suite: CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA,
            cipher_suites: vec![CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA],
            peer_cipher_suites: Vec::new(),
            compression_method: Compression::Null,
            client_random: [0u8; RANDOM_LENGTH],
            server_random: [0u8; RANDOM_LENGTH],
            session_id: Vec::new(),
            premaster_secret: Vec::new(),
            master_secret: [0u8; MASTER_SECRET_LENGTH],
            certificate_chain: Vec::new(),
            server_certificates: Vec::new(),
            client_certificates: Vec::new(),
            ec_context: EcContext::default(),
            dh_parameters: DhParameters::default(),
            digest: HandshakeHash::new(),
            supported_signature_and_hash_algorithms: Vec::new(),
            client_certificate_types: vec![ClientCertificateType::RSA_SIGN],
            client_authentication: false,
            server_handshake_status: ServerHandshakeStatus::Normal,
            dtls_cookie: Vec::new(),
            client_extensions: Vec::new(),
            server_extensions: Vec::new(),
            peer_verify_data: Vec::new(),
            length_check: LengthCheck::Strict,
            key_exchange: Box::new(RingKeyExchange),
        }
    }
}

impl TlsContext {
    pub fn new(connection_end: ConnectionEnd) -> Self {
        Self {
            connection_end,
            ..Self::default()
        }
    }

    pub fn with_version(connection_end: ConnectionEnd, protocol_version: ProtocolVersion) -> Self {
        Self {
            protocol_version,
            ..Self::new(connection_end)
        }
    }

    pub fn set_key_exchange_backend(&mut self, backend: Box<dyn KeyExchangeBackend>) {
        self.key_exchange = backend;
    }

    /// Select the transcript digest algorithm implied by protocol version and cipher suite.
    /// Must be called whenever either of them changes.
    pub fn initialize_digest(&mut self) -> Result<(), Error> {
        let algorithm =
            algorithm::digest_algorithm(self.protocol_version, self.selected_cipher_suite)?;
        log::trace!(
            "Transcript digest for {:?}/{:?} is {:?}",
            self.protocol_version,
            self.selected_cipher_suite,
            algorithm
        );
        self.digest.initialize(algorithm);
        Ok(())
    }

    /// Hash of the PRF. Only TLS 1.2 and DTLS 1.2 are supported.
    pub fn prf_algorithm(&self) -> Result<DigestAlgorithm, Error> {
        match self.protocol_version {
            ProtocolVersion::TLSv1_2 | ProtocolVersion::DTLSv1_2 => {
                algorithm::prf_digest_algorithm(self.selected_cipher_suite)
            }
            version => Err(Error::CryptoConfiguration(format!(
                "no PRF implementation for {:?}",
                version
            ))),
        }
    }

    pub fn client_server_random(&self) -> Vec<u8> {
        [self.client_random, self.server_random].concat()
    }

    /// The certificate chain of the peer
    pub fn peer_certificates(&self) -> &[Vec<u8>] {
        match self.connection_end {
            ConnectionEnd::Client => &self.server_certificates,
            ConnectionEnd::Server => &self.client_certificates,
        }
    }
}

/// A random value prefixed by the current time, as carried in Hello messages
pub fn fresh_random() -> Result<[u8; RANDOM_LENGTH], Error> {
    let mut random = [0u8; RANDOM_LENGTH];
    let now = Utc::now().timestamp() as u32;
    random[..UNIX_TIME_LENGTH].copy_from_slice(&now.to_be_bytes());
    fill_random(&mut random[UNIX_TIME_LENGTH..])?;
    Ok(random)
}

pub fn fill_random(out: &mut [u8]) -> Result<(), Error> {
    SystemRandom::new()
        .fill(out)
        .map_err(|_| Error::CryptoConfiguration("system random generator failed".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn fixed_length_fields_are_zero_filled() {
        let ctx = TlsContext::default();
        assert_eq!(ctx.client_random, [0u8; 32]);
        assert_eq!(ctx.master_secret.len(), MASTER_SECRET_LENGTH);
        assert_eq!(ctx.client_server_random().len(), 64);
        assert!(ctx.dtls_cookie.is_empty());
        assert_eq!(ctx.server_handshake_status.get_u8(), 0);
    }

    #[test_log::test]
    fn digest_follows_cipher_suite() {
        let mut ctx = TlsContext::default();
        ctx.initialize_digest().unwrap();
        assert_eq!(ctx.digest.algorithm(), Some(DigestAlgorithm::Sha256));

        ctx.selected_cipher_suite = CipherSuite::TLS_RSA_WITH_AES_256_GCM_SHA384;
        ctx.initialize_digest().unwrap();
        assert_eq!(ctx.digest.algorithm(), Some(DigestAlgorithm::Sha384));

        ctx.selected_cipher_suite = CipherSuite::Unknown(0xffff);
        assert!(matches!(
            ctx.initialize_digest(),
            Err(Error::CryptoConfiguration(_))
        ));
    }

    #[test_log::test]
    fn prf_needs_tls12() {
        let mut ctx = TlsContext::default();
        assert_eq!(ctx.prf_algorithm(), Ok(DigestAlgorithm::Sha256));
        ctx.protocol_version = ProtocolVersion::TLSv1_1;
        assert!(matches!(
            ctx.prf_algorithm(),
            Err(Error::CryptoConfiguration(_))
        ));
    }

    #[test_log::test]
    fn random_is_time_prefixed() {
        let random = fresh_random().unwrap();
        let time = u32::from_be_bytes([random[0], random[1], random[2], random[3]]);
        assert!(time > 0);
    }
}

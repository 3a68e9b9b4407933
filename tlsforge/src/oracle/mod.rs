//! Padding oracles for Bleichenbacher and Manger style attacks on RSA PKCS#1 v1.5.
//!
//! A [`Pkcs1Oracle`] answers whether a ciphertext decrypts to a block which its
//! [`OracleType`] considers PKCS#1 conforming. Attack drivers may query one oracle from several
//! threads; the only shared mutable state is the query counter in [`OracleState`].

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use forge::error::Error;
use serde::{Deserialize, Serialize};

pub mod conformity;
pub mod probe;

pub use probe::client_key_exchange_probe;

use crate::oracle::conformity::DEFAULT_KEY_LENGTH;

/// Oracle types of the Crypto'12 paper plus implementation specific oracles
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OracleType {
    /// Checks only 00 02
    TTT,
    TFT,
    FTT,
    FFT,
    /// Checks 00 02, no zero within the first 8 padding bytes and the separator position
    FFF,
    /// The padding check of the Java Secure Socket Extension
    JSSE,
    /// Checks the length of the unpadded key (16, 24 or 32 bytes)
    XMLENC,
    /// Checks only the second byte for 02
    BigIP,
    /// Checks only the first byte for 00
    MANGER_0x00,
}

impl fmt::Display for OracleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl FromStr for OracleType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TTT" => Ok(OracleType::TTT),
            "TFT" => Ok(OracleType::TFT),
            "FTT" => Ok(OracleType::FTT),
            "FFT" => Ok(OracleType::FFT),
            "FFF" => Ok(OracleType::FFF),
            "JSSE" => Ok(OracleType::JSSE),
            "XMLENC" => Ok(OracleType::XMLENC),
            "BigIP" => Ok(OracleType::BigIP),
            "MANGER_0x00" => Ok(OracleType::MANGER_0x00),
            _ => Err(Error::Config(format!("unknown oracle type {}", s))),
        }
    }
}

/// Big-endian RSA public key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsaPublicKey {
    pub modulus: Vec<u8>,
    pub public_exponent: Vec<u8>,
}

impl RsaPublicKey {
    pub fn new(modulus: Vec<u8>, public_exponent: Vec<u8>) -> Self {
        Self {
            modulus,
            public_exponent,
        }
    }

    /// Byte length of the modulus, ignoring leading zeros
    pub fn modulus_length(&self) -> usize {
        let leading_zeros = self.modulus.iter().take_while(|byte| **byte == 0).count();
        self.modulus.len() - leading_zeros
    }
}

/// What every oracle implementation keeps
#[derive(Debug)]
pub struct OracleState {
    oracle_type: OracleType,
    public_key: RsaPublicKey,
    block_size: usize,
    plaintext: bool,
    queries: AtomicU64,
}

impl OracleState {
    pub fn new(oracle_type: OracleType, public_key: RsaPublicKey, plaintext: bool) -> Self {
        Self {
            oracle_type,
            block_size: public_key.modulus_length(),
            public_key,
            plaintext,
            queries: AtomicU64::new(0),
        }
    }

    /// Count one query and return the number of queries including this one
    pub fn count_query(&self) -> u64 {
        self.queries.fetch_add(1, Ordering::SeqCst) + 1
    }
}

pub trait Pkcs1Oracle: Send + Sync {
    fn state(&self) -> &OracleState;

    /// Check whether `msg` decrypts to a conforming block. Counts as one query, also when the
    /// endpoint cannot be reached.
    fn check_pkcs_conformity(&self, msg: &[u8]) -> Result<bool, Error>;

    fn block_size(&self) -> usize {
        self.state().block_size
    }

    fn number_of_queries(&self) -> u64 {
        self.state().queries.load(Ordering::SeqCst)
    }

    fn reset_number_of_queries(&self) {
        self.state().queries.store(0, Ordering::SeqCst);
    }

    fn public_key(&self) -> &RsaPublicKey {
        &self.state().public_key
    }

    /// Whether the oracle evaluates blocks directly instead of decrypting ciphertexts
    fn is_plaintext_oracle(&self) -> bool {
        self.state().plaintext
    }

    fn oracle_type(&self) -> OracleType {
        self.state().oracle_type
    }
}

/// Reference oracle for testing attack implementations: the "ciphertext" is the padded block
/// itself.
#[derive(Debug)]
pub struct PlaintextOracle {
    state: OracleState,
    key_length: usize,
}

impl PlaintextOracle {
    pub fn new(oracle_type: OracleType, public_key: RsaPublicKey) -> Self {
        Self {
            state: OracleState::new(oracle_type, public_key, true),
            key_length: DEFAULT_KEY_LENGTH,
        }
    }

    pub fn with_key_length(mut self, key_length: usize) -> Self {
        self.key_length = key_length;
        self
    }
}

/// Restore leading zeros lost by a big number encoding
fn to_block(msg: &[u8], block_size: usize) -> Option<Vec<u8>> {
    if msg.len() > block_size {
        return None;
    }
    let mut block = vec![0u8; block_size - msg.len()];
    block.extend_from_slice(msg);
    Some(block)
}

impl Pkcs1Oracle for PlaintextOracle {
    fn state(&self) -> &OracleState {
        &self.state
    }

    fn check_pkcs_conformity(&self, msg: &[u8]) -> Result<bool, Error> {
        let query = self.state.count_query();
        let conforming = match to_block(msg, self.block_size()) {
            Some(block) => conformity::check(self.oracle_type(), &block, self.key_length),
            None => {
                log::debug!(
                    "Query {}: {} bytes exceed the block size of {}",
                    query,
                    msg.len(),
                    self.block_size()
                );
                false
            }
        };
        log::trace!("Query {}: {}", query, conforming);
        Ok(conforming)
    }
}

/// The decryption service an [`EndpointOracle`] asks
pub trait OracleEndpoint: Send + Sync {
    /// Decrypt `ciphertext` and return the raw block. Fails with
    /// [`Error::OracleCommunication`] if the endpoint is not reachable.
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, Error>;
}

/// Oracle which decrypts through a real or simulated endpoint
pub struct EndpointOracle<E: OracleEndpoint> {
    state: OracleState,
    key_length: usize,
    endpoint: E,
}

impl<E: OracleEndpoint> EndpointOracle<E> {
    pub fn new(oracle_type: OracleType, public_key: RsaPublicKey, endpoint: E) -> Self {
        Self {
            state: OracleState::new(oracle_type, public_key, false),
            key_length: DEFAULT_KEY_LENGTH,
            endpoint,
        }
    }

    pub fn with_key_length(mut self, key_length: usize) -> Self {
        self.key_length = key_length;
        self
    }

    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }
}

impl<E: OracleEndpoint> Pkcs1Oracle for EndpointOracle<E> {
    fn state(&self) -> &OracleState {
        &self.state
    }

    fn check_pkcs_conformity(&self, msg: &[u8]) -> Result<bool, Error> {
        let query = self.state.count_query();
        let decrypted = self.endpoint.decrypt(msg).map_err(|err| match err {
            Error::OracleCommunication(_) => err,
            other => Error::OracleCommunication(other.to_string()),
        })?;
        let conforming = match to_block(&decrypted, self.block_size()) {
            Some(block) => conformity::check(self.oracle_type(), &block, self.key_length),
            None => false,
        };
        log::trace!("Query {}: {}", query, conforming);
        Ok(conforming)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::thread;

    use super::*;

    fn public_key() -> RsaPublicKey {
        let mut modulus = vec![0x00];
        modulus.extend(vec![0xc5; 128]);
        RsaPublicKey::new(modulus, vec![0x01, 0x00, 0x01])
    }

    fn conforming_block() -> Vec<u8> {
        let mut block = vec![0x00, 0x02];
        block.resize(128 - DEFAULT_KEY_LENGTH - 1, 0x11);
        block.push(0x00);
        block.resize(128, 0x03);
        block
    }

    #[test_log::test]
    fn counter_counts_every_query() {
        let oracle = PlaintextOracle::new(OracleType::FFF, public_key());
        assert_eq!(oracle.block_size(), 128);
        assert!(oracle.is_plaintext_oracle());

        assert!(oracle.check_pkcs_conformity(&conforming_block()).unwrap());
        let mut bad = conforming_block();
        bad[4] = 0x00;
        assert!(!oracle.check_pkcs_conformity(&bad).unwrap());
        assert!(!oracle.check_pkcs_conformity(&[0u8; 200]).unwrap());
        assert_eq!(oracle.number_of_queries(), 3);

        oracle.reset_number_of_queries();
        assert_eq!(oracle.number_of_queries(), 0);
        oracle.check_pkcs_conformity(&bad).unwrap();
        assert_eq!(oracle.number_of_queries(), 1);
    }

    #[test_log::test]
    fn leading_zero_is_restored() {
        let oracle = PlaintextOracle::new(OracleType::TTT, public_key());
        let block = conforming_block();
        assert!(oracle.check_pkcs_conformity(&block[1..]).unwrap());
    }

    #[test_log::test]
    fn concurrent_queries_are_all_counted() {
        let oracle = Arc::new(PlaintextOracle::new(OracleType::TTT, public_key()));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let oracle = Arc::clone(&oracle);
                thread::spawn(move || {
                    for _ in 0..25 {
                        oracle.check_pkcs_conformity(&conforming_block()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(oracle.number_of_queries(), 100);
    }

    struct FlakyEndpoint {
        reachable: AtomicBool,
    }

    impl OracleEndpoint for FlakyEndpoint {
        fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
            if self.reachable.load(Ordering::SeqCst) {
                Ok(ciphertext.iter().map(|byte| byte ^ 0xff).collect())
            } else {
                Err(Error::OracleCommunication("connection refused".to_string()))
            }
        }
    }

    #[test_log::test]
    fn unreachable_endpoint_is_not_a_verdict() {
        let endpoint = FlakyEndpoint {
            reachable: AtomicBool::new(true),
        };
        let oracle = EndpointOracle::new(OracleType::TTT, public_key(), endpoint);
        assert!(!oracle.is_plaintext_oracle());

        let ciphertext: Vec<u8> = conforming_block().iter().map(|byte| byte ^ 0xff).collect();
        assert_eq!(oracle.check_pkcs_conformity(&ciphertext), Ok(true));
        assert_eq!(oracle.check_pkcs_conformity(&[0xff; 128]), Ok(false));

        oracle.endpoint().reachable.store(false, Ordering::SeqCst);
        let err = oracle.check_pkcs_conformity(&ciphertext).unwrap_err();
        assert!(matches!(err, Error::OracleCommunication(_)));
        assert!(err.is_transient());
        assert_eq!(oracle.number_of_queries(), 3);
    }

    #[test_log::test]
    fn oracle_type_names() {
        assert_eq!("MANGER_0x00".parse::<OracleType>(), Ok(OracleType::MANGER_0x00));
        assert_eq!(OracleType::BigIP.to_string(), "BigIP");
        assert!(matches!("TTF".parse::<OracleType>(), Err(Error::Config(_))));
    }
}

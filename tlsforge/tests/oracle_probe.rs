use std::sync::Arc;
use std::thread;

use forge::error::Error;
use tlsforge::oracle::conformity::DEFAULT_KEY_LENGTH;
use tlsforge::oracle::{
    client_key_exchange_probe, EndpointOracle, OracleEndpoint, OracleType, Pkcs1Oracle,
    RsaPublicKey,
};
use tlsforge::tls::context::TlsContext;
use tlsforge::tls::enums::ConnectionEnd;
use tlsforge::tls::handshake::HandshakeMessage;
use tlsforge::tls::key_exchange::{DhParameters, EcContext, KeyAgreement, KeyExchangeBackend};

const BLOCK_SIZE: usize = 128;
const MASK: u8 = 0x5a;

/// Toy RSA private key operation: XOR with a constant
#[derive(Debug)]
struct MaskingKey;

impl KeyExchangeBackend for MaskingKey {
    fn encrypt_premaster_secret(
        &self,
        _server_certificates: &[Vec<u8>],
        premaster_secret: &[u8],
    ) -> Result<Vec<u8>, Error> {
        Ok(premaster_secret.iter().map(|byte| byte ^ MASK).collect())
    }

    fn decrypt_premaster_secret(&self, encrypted: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        Ok(Some(encrypted.iter().map(|byte| byte ^ MASK).collect()))
    }

    fn dh_agreement(&self, _parameters: &DhParameters) -> Result<KeyAgreement, Error> {
        Err(Error::CryptoConfiguration("no DH".to_string()))
    }

    fn ecdh_agreement(&self, _ec_context: &EcContext) -> Result<KeyAgreement, Error> {
        Err(Error::CryptoConfiguration("no ECDH".to_string()))
    }
}

/// A server which receives each ciphertext in a ClientKeyExchange of a fresh connection
struct SimulatedServer;

impl OracleEndpoint for SimulatedServer {
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
        let mut client = TlsContext::new(ConnectionEnd::Client);
        let probe = client_key_exchange_probe(&mut client, ciphertext)?;

        let mut server = TlsContext::new(ConnectionEnd::Server);
        server.set_key_exchange_backend(Box::new(MaskingKey));
        HandshakeMessage::read_next(&mut server, &probe, 0)?;
        Ok(server.premaster_secret)
    }
}

fn oracle(oracle_type: OracleType) -> EndpointOracle<SimulatedServer> {
    let public_key = RsaPublicKey::new(vec![0xe1; BLOCK_SIZE], vec![0x01, 0x00, 0x01]);
    EndpointOracle::new(oracle_type, public_key, SimulatedServer)
}

fn encrypt(block: &[u8]) -> Vec<u8> {
    block.iter().map(|byte| byte ^ MASK).collect()
}

fn padded(key_length: usize) -> Vec<u8> {
    let mut block = vec![0x00, 0x02];
    block.resize(BLOCK_SIZE - key_length - 1, 0x33);
    block.push(0x00);
    block.resize(BLOCK_SIZE, 0x44);
    block
}

#[test_log::test]
fn server_answers_as_padding_oracle() {
    let oracle = oracle(OracleType::FFF);
    assert_eq!(oracle.block_size(), BLOCK_SIZE);

    assert!(oracle
        .check_pkcs_conformity(&encrypt(&padded(DEFAULT_KEY_LENGTH)))
        .unwrap());
    assert!(!oracle.check_pkcs_conformity(&encrypt(&padded(24))).unwrap());

    let mut zero_in_padding = padded(DEFAULT_KEY_LENGTH);
    zero_in_padding[3] = 0x00;
    assert!(!oracle
        .check_pkcs_conformity(&encrypt(&zero_in_padding))
        .unwrap());
    assert_eq!(oracle.number_of_queries(), 3);
}

#[test_log::test]
fn weaker_oracle_accepts_more() {
    let oracle = oracle(OracleType::TTT);
    assert!(oracle.check_pkcs_conformity(&encrypt(&padded(24))).unwrap());

    let mut wrong_prefix = padded(DEFAULT_KEY_LENGTH);
    wrong_prefix[1] = 0x01;
    assert!(!oracle.check_pkcs_conformity(&encrypt(&wrong_prefix)).unwrap());
}

#[test_log::test]
fn parallel_attack_counts_every_query() {
    let oracle = Arc::new(oracle(OracleType::JSSE));
    let handles: Vec<_> = (0..3)
        .map(|worker| {
            let oracle = Arc::clone(&oracle);
            thread::spawn(move || {
                (0..10)
                    .filter(|i| {
                        let mut block = padded(DEFAULT_KEY_LENGTH);
                        if (worker + i) % 2 == 0 {
                            block[0] = 0x01;
                        }
                        oracle.check_pkcs_conformity(&encrypt(&block)).unwrap()
                    })
                    .count()
            })
        })
        .collect();
    let conforming: usize = handles.into_iter().map(|handle| handle.join().unwrap()).sum();

    assert_eq!(oracle.number_of_queries(), 30);
    assert_eq!(conforming, 15);
}

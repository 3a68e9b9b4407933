use std::mem;

use forge::error::Error;

use crate::tls::algorithm::KeyExchangeFamily;
use crate::tls::context::TlsContext;
use crate::tls::handshake::HandshakeMessage;
use crate::tls::key_exchange::{DhParameters, EcContext, KeyAgreement, KeyExchangeBackend};

/// Key exchange which "encrypts" every premaster secret to one chosen ciphertext
#[derive(Debug)]
struct ChosenCiphertext(Vec<u8>);

impl KeyExchangeBackend for ChosenCiphertext {
    fn encrypt_premaster_secret(
        &self,
        _server_certificates: &[Vec<u8>],
        _premaster_secret: &[u8],
    ) -> Result<Vec<u8>, Error> {
        Ok(self.0.clone())
    }

    fn decrypt_premaster_secret(&self, _encrypted: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        Ok(None)
    }

    fn dh_agreement(&self, _parameters: &DhParameters) -> Result<KeyAgreement, Error> {
        Err(Error::ConfigurationMismatch(
            "oracle probes use RSA key exchange".to_string(),
        ))
    }

    fn ecdh_agreement(&self, _ec_context: &EcContext) -> Result<KeyAgreement, Error> {
        Err(Error::ConfigurationMismatch(
            "oracle probes use RSA key exchange".to_string(),
        ))
    }
}

/// Build an RSA ClientKeyExchange carrying `ciphertext` as encrypted premaster secret.
///
/// This is how a TLS server is queried as a padding oracle: the message is prepared by the
/// regular handler, so header and length fields stay consistent, and the server's reaction to it
/// is the verdict. `ctx` should belong to a fresh connection which negotiated an RSA suite.
pub fn client_key_exchange_probe(ctx: &mut TlsContext, ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
    let mut message = HandshakeMessage::client_key_exchange(KeyExchangeFamily::Rsa);
    let backend = mem::replace(
        &mut ctx.key_exchange,
        Box::new(ChosenCiphertext(ciphertext.to_vec())),
    );
    let prepared = message.prepare(ctx);
    ctx.key_exchange = backend;
    prepared
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tls::enums::{CipherSuite, ConnectionEnd};

    #[test_log::test]
    fn probe_carries_ciphertext() {
        let mut ctx = TlsContext::new(ConnectionEnd::Client);
        ctx.selected_cipher_suite = CipherSuite::TLS_RSA_WITH_AES_256_CBC_SHA;
        let ciphertext = vec![0x5a; 128];
        let bytes = client_key_exchange_probe(&mut ctx, &ciphertext).unwrap();

        assert_eq!(&bytes[..6], &[0x10, 0x00, 0x00, 0x82, 0x00, 0x80]);
        assert_eq!(&bytes[6..], &ciphertext[..]);
        assert_eq!(ctx.digest.raw(), &bytes[..]);
        // the default backend is back in place
        assert!(ctx
            .key_exchange
            .encrypt_premaster_secret(&[], &[0u8; 48])
            .is_err());
    }

    #[test_log::test]
    fn probe_needs_an_rsa_suite() {
        let mut ctx = TlsContext::new(ConnectionEnd::Client);
        ctx.selected_cipher_suite = CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256;
        assert!(matches!(
            client_key_exchange_probe(&mut ctx, &[0x01; 16]),
            Err(Error::ConfigurationMismatch(_))
        ));
    }
}

//! ClientKeyExchange of RFC 5246, section 7.4.7, specialized by key exchange family.
//!
//! The premaster secret is an [`Injectable`](forge::inject::Injectable) as well, although it
//! never appears on the wire in clear. This way a test can send a valid encryption of an invalid
//! premaster secret.

use forge::codec::{Codec, Reader};
use forge::error::Error;
use forge::inject::{FieldMut, InjectableBytes, InjectableInteger};
use serde::{Deserialize, Serialize};

use crate::tls::algorithm::{key_exchange_algorithm, KeyExchangeFamily};
use crate::tls::context::{
    fill_random, ServerHandshakeStatus, TlsContext, MASTER_SECRET_LENGTH, PREMASTER_SECRET_LENGTH,
};
use crate::tls::enums::{ConnectionEnd, HandshakeType};
use crate::tls::handshake::{read_vector, write_vector, HandshakeBody, HandshakeHeader};
use crate::tls::prf::{prf, MASTER_SECRET_LABEL};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientKeyExchangeMessage {
    pub header: HandshakeHeader,
    pub family: KeyExchangeFamily,
    /// Length of the encrypted premaster secret or of the public value
    pub exchange_keys_length: InjectableInteger,
    /// Encrypted premaster secret (RSA) or client public value (DH, ECDH)
    pub exchange_keys: InjectableBytes,
    pub premaster_secret: InjectableBytes,
}

impl ClientKeyExchangeMessage {
    pub fn new(family: KeyExchangeFamily) -> Self {
        Self {
            header: HandshakeHeader::default(),
            family,
            exchange_keys_length: InjectableInteger::new(),
            exchange_keys: InjectableBytes::new(),
            premaster_secret: InjectableBytes::new(),
        }
    }

    /// Width of the length field in front of the exchange keys
    pub fn length_width(&self) -> usize {
        match self.family {
            KeyExchangeFamily::Rsa | KeyExchangeFamily::Dh => 2,
            KeyExchangeFamily::Ecdh => 1,
        }
    }

    fn prepare_premaster_secret(&mut self, ctx: &mut TlsContext) -> Result<Vec<u8>, Error> {
        match self.family {
            KeyExchangeFamily::Rsa => {
                let mut premaster_secret = vec![0u8; PREMASTER_SECRET_LENGTH];
                premaster_secret[..2].copy_from_slice(&ctx.protocol_version.get_encoding());
                fill_random(&mut premaster_secret[2..])?;
                self.premaster_secret.set_original(premaster_secret);
                let premaster_secret = self.premaster_secret.value();
                let encrypted = ctx
                    .key_exchange
                    .encrypt_premaster_secret(&ctx.server_certificates, &premaster_secret)?;
                self.exchange_keys.set_original(encrypted);
                Ok(premaster_secret)
            }
            KeyExchangeFamily::Dh => {
                let agreement = ctx.key_exchange.dh_agreement(&ctx.dh_parameters)?;
                ctx.dh_parameters.client_public = agreement.public_value.clone();
                self.exchange_keys.set_original(agreement.public_value);
                self.premaster_secret
                    .set_original(agreement.premaster_secret);
                Ok(self.premaster_secret.value())
            }
            KeyExchangeFamily::Ecdh => {
                let agreement = ctx.key_exchange.ecdh_agreement(&ctx.ec_context)?;
                ctx.ec_context.client_public_point = agreement.public_value.clone();
                self.exchange_keys.set_original(agreement.public_value);
                self.premaster_secret
                    .set_original(agreement.premaster_secret);
                Ok(self.premaster_secret.value())
            }
        }
    }
}

/// Derive the master secret from the premaster secret stored in the context
pub fn derive_master_secret(ctx: &mut TlsContext) -> Result<(), Error> {
    let mut master_secret = [0u8; MASTER_SECRET_LENGTH];
    prf(
        &mut master_secret,
        ctx.prf_algorithm()?,
        &ctx.premaster_secret,
        MASTER_SECRET_LABEL,
        &ctx.client_server_random(),
    )?;
    ctx.master_secret = master_secret;
    log::trace!("Master secret {}", hex::encode(master_secret));
    Ok(())
}

impl HandshakeBody for ClientKeyExchangeMessage {
    const TYPE: HandshakeType = HandshakeType::ClientKeyExchange;

    fn header(&self) -> &HandshakeHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut HandshakeHeader {
        &mut self.header
    }

    fn check_context(&self, ctx: &TlsContext) -> Result<(), Error> {
        let negotiated = key_exchange_algorithm(ctx.selected_cipher_suite)?;
        if negotiated.family() != self.family {
            return Err(Error::ConfigurationMismatch(format!(
                "the selected key exchange algorithm ({:?}) is not supported by the {:?} \
                 ClientKeyExchange",
                negotiated, self.family
            )));
        }
        Ok(())
    }

    fn prepare_body(&mut self, ctx: &mut TlsContext) -> Result<Vec<u8>, Error> {
        ctx.premaster_secret = self.prepare_premaster_secret(ctx)?;
        derive_master_secret(ctx)?;

        let exchange_keys = self.exchange_keys.original().cloned().unwrap_or_default();
        let mut bytes = Vec::new();
        write_vector(
            &mut bytes,
            self.length_width(),
            &mut self.exchange_keys_length,
            &mut self.exchange_keys,
            exchange_keys,
        );
        Ok(bytes)
    }

    fn parse_body(&mut self, r: &mut Reader) -> Result<(), Error> {
        let width = self.length_width();
        read_vector(r, width, &mut self.exchange_keys_length, &mut self.exchange_keys)
    }

    fn adjust_context(&mut self, ctx: &mut TlsContext) -> Result<(), Error> {
        let exchange_keys = self.exchange_keys.original().cloned().unwrap_or_default();
        match self.family {
            KeyExchangeFamily::Rsa => {
                match ctx.key_exchange.decrypt_premaster_secret(&exchange_keys)? {
                    Some(premaster_secret) => {
                        self.premaster_secret.set_original(premaster_secret.clone());
                        ctx.premaster_secret = premaster_secret;
                        derive_master_secret(ctx)?;
                    }
                    None => log::debug!("No private key for decrypting the premaster secret"),
                }
            }
            KeyExchangeFamily::Dh => ctx.dh_parameters.client_public = exchange_keys,
            KeyExchangeFamily::Ecdh => ctx.ec_context.client_public_point = exchange_keys,
        }

        if ctx.connection_end == ConnectionEnd::Server
            && ctx.server_handshake_status == ServerHandshakeStatus::FinishedDeferred
        {
            ctx.server_handshake_status = ServerHandshakeStatus::DeferredFinishedReady;
        }
        Ok(())
    }

    fn field_mut(&mut self, name: &str) -> Option<FieldMut<'_>> {
        match name {
            "exchange_keys_length" => Some(FieldMut::Integer(&mut self.exchange_keys_length)),
            "exchange_keys" => Some(FieldMut::Bytes(&mut self.exchange_keys)),
            "premaster_secret" => Some(FieldMut::Bytes(&mut self.premaster_secret)),
            _ => None,
        }
    }
}

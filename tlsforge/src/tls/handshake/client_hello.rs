use forge::codec::{encode_all, read_all, Codec, Reader};
use forge::error::Error;
use forge::inject::{FieldMut, InjectableBytes, InjectableInteger};
use serde::{Deserialize, Serialize};

use crate::tls::context::{fresh_random, TlsContext, RANDOM_LENGTH};
use crate::tls::enums::{CipherSuite, Compression, HandshakeType, ProtocolVersion};
use crate::tls::handshake::{
    payload_left, read_vector, write_vector, HandshakeBody, HandshakeHeader,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientHelloMessage {
    pub header: HandshakeHeader,
    pub protocol_version: InjectableBytes,
    pub random: InjectableBytes,
    pub session_id_length: InjectableInteger,
    pub session_id: InjectableBytes,
    /// Only on the wire for DTLS
    pub cookie_length: InjectableInteger,
    pub cookie: InjectableBytes,
    pub cipher_suites_length: InjectableInteger,
    pub cipher_suites: InjectableBytes,
    pub compressions_length: InjectableInteger,
    pub compressions: InjectableBytes,
    pub extensions_length: InjectableInteger,
    /// Opaque extension block, omitted from the wire when empty
    pub extensions: InjectableBytes,
}

impl ClientHelloMessage {
    pub fn version(&self) -> ProtocolVersion {
        ProtocolVersion::read_bytes(&self.protocol_version.value())
            .unwrap_or(ProtocolVersion::Unknown(0))
    }

    fn sends_extensions(&self, ctx: &TlsContext) -> bool {
        !ctx.client_extensions.is_empty()
            || self.extensions.is_injected()
            || self.extensions_length.is_injected()
    }
}

impl HandshakeBody for ClientHelloMessage {
    const TYPE: HandshakeType = HandshakeType::ClientHello;

    fn header(&self) -> &HandshakeHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut HandshakeHeader {
        &mut self.header
    }

    fn prepare_body(&mut self, ctx: &mut TlsContext) -> Result<Vec<u8>, Error> {
        let mut bytes = Vec::new();

        self.protocol_version
            .set_original(ctx.protocol_version.get_encoding());
        bytes.extend(self.protocol_version.value());

        ctx.client_random = fresh_random()?;
        self.random.set_original(ctx.client_random.to_vec());
        bytes.extend(self.random.value());

        write_vector(
            &mut bytes,
            1,
            &mut self.session_id_length,
            &mut self.session_id,
            ctx.session_id.clone(),
        );
        if ctx.protocol_version.is_dtls() {
            write_vector(
                &mut bytes,
                1,
                &mut self.cookie_length,
                &mut self.cookie,
                ctx.dtls_cookie.clone(),
            );
        }
        write_vector(
            &mut bytes,
            2,
            &mut self.cipher_suites_length,
            &mut self.cipher_suites,
            encode_all(&ctx.cipher_suites),
        );
        write_vector(
            &mut bytes,
            1,
            &mut self.compressions_length,
            &mut self.compressions,
            ctx.compression_method.get_encoding(),
        );
        if self.sends_extensions(ctx) {
            write_vector(
                &mut bytes,
                2,
                &mut self.extensions_length,
                &mut self.extensions,
                ctx.client_extensions.clone(),
            );
        }
        Ok(bytes)
    }

    fn parse_body(&mut self, r: &mut Reader) -> Result<(), Error> {
        let body_start = r.used();

        let version = ProtocolVersion::read(r)?;
        self.protocol_version.set_original(version.get_encoding());
        self.random.set_original(r.take(RANDOM_LENGTH)?.to_vec());
        read_vector(r, 1, &mut self.session_id_length, &mut self.session_id)?;
        if version.is_dtls() {
            read_vector(r, 1, &mut self.cookie_length, &mut self.cookie)?;
        }
        read_vector(r, 2, &mut self.cipher_suites_length, &mut self.cipher_suites)?;
        read_vector(r, 1, &mut self.compressions_length, &mut self.compressions)?;
        if payload_left(&self.header, body_start, r) {
            read_vector(r, 2, &mut self.extensions_length, &mut self.extensions)?;
        }

        let suites = self.cipher_suites.original().map(Vec::len).unwrap_or_default();
        if suites % 2 != 0 {
            return Err(Error::ProtocolViolation(format!(
                "cipher suite list of odd length {}",
                suites
            )));
        }
        Ok(())
    }

    fn adjust_context(&mut self, ctx: &mut TlsContext) -> Result<(), Error> {
        let version = ProtocolVersion::read_bytes(
            self.protocol_version.original().map(Vec::as_slice).unwrap_or_default(),
        )?;
        let peer_cipher_suites: Vec<CipherSuite> =
            read_all(self.cipher_suites.original().map(Vec::as_slice).unwrap_or_default())?;
        let compressions = self.compressions.original().cloned().unwrap_or_default();
        if !compressions.contains(&Compression::Null.get_u8()) {
            log::warn!("Peer does not offer the null compression method");
        }
        log::debug!(
            "Peer offers {:?} with {} cipher suites",
            version,
            peer_cipher_suites.len()
        );

        ctx.peer_cipher_suites = peer_cipher_suites;
        let random = self.random.original().map(Vec::as_slice).unwrap_or_default();
        ctx.client_random.copy_from_slice(random);
        ctx.session_id = self.session_id.original().cloned().unwrap_or_default();
        if version.is_dtls() {
            ctx.dtls_cookie = self.cookie.original().cloned().unwrap_or_default();
        }
        Ok(())
    }

    fn field_mut(&mut self, name: &str) -> Option<FieldMut<'_>> {
        Some(match name {
            "protocol_version" => FieldMut::Bytes(&mut self.protocol_version),
            "random" => FieldMut::Bytes(&mut self.random),
            "session_id_length" => FieldMut::Integer(&mut self.session_id_length),
            "session_id" => FieldMut::Bytes(&mut self.session_id),
            "cookie_length" => FieldMut::Integer(&mut self.cookie_length),
            "cookie" => FieldMut::Bytes(&mut self.cookie),
            "cipher_suites_length" => FieldMut::Integer(&mut self.cipher_suites_length),
            "cipher_suites" => FieldMut::Bytes(&mut self.cipher_suites),
            "compressions_length" => FieldMut::Integer(&mut self.compressions_length),
            "compressions" => FieldMut::Bytes(&mut self.compressions),
            "extensions_length" => FieldMut::Integer(&mut self.extensions_length),
            "extensions" => FieldMut::Bytes(&mut self.extensions),
            _ => return None,
        })
    }
}

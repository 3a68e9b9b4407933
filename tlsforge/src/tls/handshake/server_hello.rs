use forge::codec::{Codec, Reader};
use forge::error::Error;
use forge::inject::{FieldMut, InjectableByte, InjectableBytes, InjectableInteger};
use serde::{Deserialize, Serialize};

use crate::tls::context::{fill_random, fresh_random, TlsContext, RANDOM_LENGTH};
use crate::tls::enums::{CipherSuite, Compression, HandshakeType, ProtocolVersion};
use crate::tls::handshake::{
    payload_left, read_vector, write_vector, HandshakeBody, HandshakeHeader,
};

pub const SESSION_ID_LENGTH: usize = 32;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerHelloMessage {
    pub header: HandshakeHeader,
    pub protocol_version: InjectableBytes,
    pub random: InjectableBytes,
    pub session_id_length: InjectableInteger,
    pub session_id: InjectableBytes,
    pub selected_cipher_suite: InjectableBytes,
    pub selected_compression_method: InjectableByte,
    pub extensions_length: InjectableInteger,
    pub extensions: InjectableBytes,
}

impl HandshakeBody for ServerHelloMessage {
    const TYPE: HandshakeType = HandshakeType::ServerHello;

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

        ctx.server_random = fresh_random()?;
        self.random.set_original(ctx.server_random.to_vec());
        bytes.extend(self.random.value());

        if ctx.session_id.is_empty() {
            let mut session_id = vec![0u8; SESSION_ID_LENGTH];
            fill_random(&mut session_id)?;
            ctx.session_id = session_id;
        }
        write_vector(
            &mut bytes,
            1,
            &mut self.session_id_length,
            &mut self.session_id,
            ctx.session_id.clone(),
        );

        self.selected_cipher_suite
            .set_original(ctx.selected_cipher_suite.get_encoding());
        bytes.extend(self.selected_cipher_suite.value());
        self.selected_compression_method
            .set_original(ctx.compression_method.get_u8());
        bytes.push(self.selected_compression_method.value());

        if !ctx.server_extensions.is_empty()
            || self.extensions.is_injected()
            || self.extensions_length.is_injected()
        {
            write_vector(
                &mut bytes,
                2,
                &mut self.extensions_length,
                &mut self.extensions,
                ctx.server_extensions.clone(),
            );
        }

        ctx.initialize_digest()?;
        Ok(bytes)
    }

    fn parse_body(&mut self, r: &mut Reader) -> Result<(), Error> {
        let body_start = r.used();

        let version = ProtocolVersion::read(r)?;
        self.protocol_version.set_original(version.get_encoding());
        self.random.set_original(r.take(RANDOM_LENGTH)?.to_vec());
        read_vector(r, 1, &mut self.session_id_length, &mut self.session_id)?;
        let suite = CipherSuite::read(r)?;
        self.selected_cipher_suite.set_original(suite.get_encoding());
        let compression = Compression::read(r)?;
        self.selected_compression_method
            .set_original(compression.get_u8());
        if payload_left(&self.header, body_start, r) {
            read_vector(r, 2, &mut self.extensions_length, &mut self.extensions)?;
        }

        if !version.is_known() {
            return Err(Error::ProtocolViolation(format!(
                "server selected unknown protocol version {:?}",
                version
            )));
        }
        if !suite.is_known() {
            return Err(Error::ProtocolViolation(format!(
                "server selected unknown cipher suite {:?}",
                suite
            )));
        }
        Ok(())
    }

    fn adjust_context(&mut self, ctx: &mut TlsContext) -> Result<(), Error> {
        let version = ProtocolVersion::read_bytes(
            self.protocol_version.original().map(Vec::as_slice).unwrap_or_default(),
        )?;
        let suite = CipherSuite::read_bytes(
            self.selected_cipher_suite
                .original()
                .map(Vec::as_slice)
                .unwrap_or_default(),
        )?;
        let compression = Compression::from(
            self.selected_compression_method
                .original()
                .copied()
                .unwrap_or_default(),
        );
        log::debug!("Server selected {:?} with {:?}", version, suite);

        ctx.protocol_version = version;
        ctx.selected_cipher_suite = suite;
        ctx.compression_method = compression;
        let random = self.random.original().map(Vec::as_slice).unwrap_or_default();
        ctx.server_random.copy_from_slice(random);
        ctx.session_id = self.session_id.original().cloned().unwrap_or_default();
        ctx.initialize_digest()
    }

    fn field_mut(&mut self, name: &str) -> Option<FieldMut<'_>> {
        Some(match name {
            "protocol_version" => FieldMut::Bytes(&mut self.protocol_version),
            "random" => FieldMut::Bytes(&mut self.random),
            "session_id_length" => FieldMut::Integer(&mut self.session_id_length),
            "session_id" => FieldMut::Bytes(&mut self.session_id),
            "selected_cipher_suite" => FieldMut::Bytes(&mut self.selected_cipher_suite),
            "selected_compression_method" => {
                FieldMut::Byte(&mut self.selected_compression_method)
            }
            "extensions_length" => FieldMut::Integer(&mut self.extensions_length),
            "extensions" => FieldMut::Bytes(&mut self.extensions),
            _ => return None,
        })
    }
}

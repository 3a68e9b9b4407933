use forge::codec::{Codec, Reader};
use forge::error::Error;
use forge::inject::{FieldMut, InjectableBytes, InjectableInteger};
use serde::{Deserialize, Serialize};

use crate::tls::context::{fill_random, TlsContext};
use crate::tls::enums::{HandshakeType, ProtocolVersion};
use crate::tls::handshake::{read_vector, write_vector, HandshakeBody, HandshakeHeader};

pub const COOKIE_LENGTH: usize = 20;

/// DTLS cookie exchange of RFC 6347, section 4.2.1. Neither this message nor the ClientHello
/// before it are part of the transcript.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HelloVerifyRequestMessage {
    pub header: HandshakeHeader,
    pub protocol_version: InjectableBytes,
    pub cookie_length: InjectableInteger,
    pub cookie: InjectableBytes,
}

impl HandshakeBody for HelloVerifyRequestMessage {
    const TYPE: HandshakeType = HandshakeType::HelloVerifyRequest;

    fn header(&self) -> &HandshakeHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut HandshakeHeader {
        &mut self.header
    }

    fn prepare_body(&mut self, ctx: &mut TlsContext) -> Result<Vec<u8>, Error> {
        if ctx.dtls_cookie.is_empty() {
            let mut cookie = vec![0u8; COOKIE_LENGTH];
            fill_random(&mut cookie)?;
            ctx.dtls_cookie = cookie;
        }

        let mut bytes = Vec::new();
        self.protocol_version
            .set_original(ctx.protocol_version.get_encoding());
        bytes.extend(self.protocol_version.value());
        write_vector(
            &mut bytes,
            1,
            &mut self.cookie_length,
            &mut self.cookie,
            ctx.dtls_cookie.clone(),
        );

        ctx.digest.reset();
        Ok(bytes)
    }

    fn parse_body(&mut self, r: &mut Reader) -> Result<(), Error> {
        let version = ProtocolVersion::read(r)?;
        self.protocol_version.set_original(version.get_encoding());
        read_vector(r, 1, &mut self.cookie_length, &mut self.cookie)
    }

    fn adjust_context(&mut self, ctx: &mut TlsContext) -> Result<(), Error> {
        ctx.dtls_cookie = self.cookie.original().cloned().unwrap_or_default();
        ctx.digest.reset();
        log::debug!("Received a cookie of {} bytes", ctx.dtls_cookie.len());
        Ok(())
    }

    fn field_mut(&mut self, name: &str) -> Option<FieldMut<'_>> {
        match name {
            "protocol_version" => Some(FieldMut::Bytes(&mut self.protocol_version)),
            "cookie_length" => Some(FieldMut::Integer(&mut self.cookie_length)),
            "cookie" => Some(FieldMut::Bytes(&mut self.cookie)),
            _ => None,
        }
    }

    fn updates_digest(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tls::enums::ConnectionEnd;
    use crate::tls::handshake::HandshakeMessage;

    #[test_log::test]
    fn cookie_exchange_restarts_the_transcript() {
        let mut client = TlsContext::with_version(ConnectionEnd::Client, ProtocolVersion::DTLSv1_2);
        let mut server = TlsContext::with_version(ConnectionEnd::Server, ProtocolVersion::DTLSv1_2);

        let mut hello = HandshakeMessage::new(HandshakeType::ClientHello).unwrap();
        let first = hello.prepare(&mut client).unwrap();
        HandshakeMessage::new(HandshakeType::ClientHello)
            .unwrap()
            .parse(&mut server, &first, 0)
            .unwrap();
        assert!(server.dtls_cookie.is_empty());

        let mut verify = HandshakeMessage::new(HandshakeType::HelloVerifyRequest).unwrap();
        let bytes = verify.prepare(&mut server).unwrap();
        assert_eq!(bytes.len(), 4 + 2 + 1 + COOKIE_LENGTH);
        assert!(server.digest.raw().is_empty());

        let (parsed, _) = HandshakeMessage::read_next(&mut client, &bytes, 0).unwrap();
        assert!(matches!(parsed, HandshakeMessage::HelloVerifyRequest(_)));
        assert_eq!(client.dtls_cookie, server.dtls_cookie);
        assert!(client.digest.raw().is_empty());

        let second = HandshakeMessage::new(HandshakeType::ClientHello)
            .unwrap()
            .prepare(&mut client)
            .unwrap();
        assert_eq!(&second[39..40], &[COOKIE_LENGTH as u8]);
        assert_eq!(client.digest.raw(), &second[..]);
    }
}

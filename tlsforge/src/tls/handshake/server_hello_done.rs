use forge::codec::Reader;
use forge::error::Error;
use forge::inject::FieldMut;
use serde::{Deserialize, Serialize};

use crate::tls::context::{ServerHandshakeStatus, TlsContext};
use crate::tls::enums::{ConnectionEnd, HandshakeType};
use crate::tls::handshake::{HandshakeBody, HandshakeHeader};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerHelloDoneMessage {
    pub header: HandshakeHeader,
}

impl HandshakeBody for ServerHelloDoneMessage {
    const TYPE: HandshakeType = HandshakeType::ServerHelloDone;

    fn header(&self) -> &HandshakeHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut HandshakeHeader {
        &mut self.header
    }

    fn prepare_body(&mut self, ctx: &mut TlsContext) -> Result<Vec<u8>, Error> {
        if ctx.connection_end == ConnectionEnd::Server {
            ctx.server_handshake_status = if ctx.client_authentication {
                ServerHandshakeStatus::ClientAuthentication
            } else {
                ServerHandshakeStatus::FinishedDeferred
            };
        }
        Ok(Vec::new())
    }

    fn parse_body(&mut self, _r: &mut Reader) -> Result<(), Error> {
        Ok(())
    }

    fn field_mut(&mut self, _name: &str) -> Option<FieldMut<'_>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tls::handshake::{parse_message, prepare_message};

    #[test_log::test]
    fn status_depends_on_client_authentication() {
        let mut ctx = TlsContext::new(ConnectionEnd::Server);
        let bytes = prepare_message(&mut ServerHelloDoneMessage::default(), &mut ctx).unwrap();
        assert_eq!(bytes, vec![0x0e, 0x00, 0x00, 0x00]);
        assert_eq!(
            ctx.server_handshake_status,
            ServerHandshakeStatus::FinishedDeferred
        );

        let mut ctx = TlsContext::new(ConnectionEnd::Server);
        ctx.client_authentication = true;
        prepare_message(&mut ServerHelloDoneMessage::default(), &mut ctx).unwrap();
        assert_eq!(ctx.server_handshake_status.get_u8(), 1);
    }

    #[test_log::test]
    fn trailing_payload_is_rejected() {
        let mut ctx = TlsContext::new(ConnectionEnd::Client);
        let mut message = ServerHelloDoneMessage::default();
        assert!(matches!(
            parse_message(&mut message, &mut ctx, &[0x0e, 0x00, 0x00, 0x01, 0xff], 0),
            Err(Error::ProtocolViolation(_))
        ));
        assert_eq!(
            parse_message(&mut message, &mut ctx, &[0x0e, 0x00, 0x00, 0x00], 0),
            Ok(4)
        );
    }
}

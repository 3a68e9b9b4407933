use forge::codec::Reader;
use forge::error::Error;
use forge::inject::{FieldMut, InjectableBytes};
use serde::{Deserialize, Serialize};

use crate::tls::context::{ServerHandshakeStatus, TlsContext};
use crate::tls::enums::{ConnectionEnd, HandshakeType};
use crate::tls::handshake::{HandshakeBody, HandshakeHeader};
use crate::tls::prf::{prf, CLIENT_FINISHED_LABEL, SERVER_FINISHED_LABEL};

pub const VERIFY_DATA_LENGTH: usize = 12;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinishedMessage {
    pub header: HandshakeHeader,
    pub verify_data: InjectableBytes,
}

/// verify_data which `sender` has to put into its Finished, given the transcript so far
pub fn expected_verify_data(ctx: &TlsContext, sender: ConnectionEnd) -> Result<Vec<u8>, Error> {
    let label = match sender {
        ConnectionEnd::Client => CLIENT_FINISHED_LABEL,
        ConnectionEnd::Server => SERVER_FINISHED_LABEL,
    };
    let mut verify_data = vec![0u8; VERIFY_DATA_LENGTH];
    prf(
        &mut verify_data,
        ctx.prf_algorithm()?,
        &ctx.master_secret,
        label,
        &ctx.digest.get_current_hash()?,
    )?;
    Ok(verify_data)
}

impl HandshakeBody for FinishedMessage {
    const TYPE: HandshakeType = HandshakeType::Finished;

    fn header(&self) -> &HandshakeHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut HandshakeHeader {
        &mut self.header
    }

    fn prepare_body(&mut self, ctx: &mut TlsContext) -> Result<Vec<u8>, Error> {
        self.verify_data
            .set_original(expected_verify_data(ctx, ctx.connection_end)?);
        Ok(self.verify_data.value())
    }

    fn parse_body(&mut self, r: &mut Reader) -> Result<(), Error> {
        self.verify_data
            .set_original(r.take(VERIFY_DATA_LENGTH)?.to_vec());
        Ok(())
    }

    fn adjust_context(&mut self, ctx: &mut TlsContext) -> Result<(), Error> {
        let verify_data = self.verify_data.original().cloned().unwrap_or_default();
        let expected = expected_verify_data(ctx, ctx.connection_end.peer())?;
        if expected == verify_data {
            log::debug!("Peer Finished verified");
        } else {
            log::warn!(
                "Peer Finished carries {} but the transcript gives {}",
                hex::encode(&verify_data),
                hex::encode(&expected)
            );
        }

        ctx.peer_verify_data = verify_data;
        if ctx.connection_end == ConnectionEnd::Server {
            ctx.server_handshake_status = ServerHandshakeStatus::Normal;
        }
        Ok(())
    }

    fn field_mut(&mut self, name: &str) -> Option<FieldMut<'_>> {
        match name {
            "verify_data" => Some(FieldMut::Bytes(&mut self.verify_data)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tls::handshake::{parse_message, prepare_message};

    fn context(end: ConnectionEnd) -> TlsContext {
        let mut ctx = TlsContext::new(end);
        ctx.master_secret = [0x42; 48];
        ctx.initialize_digest().unwrap();
        ctx.digest.add_message(b"previous handshake messages");
        ctx
    }

    #[test_log::test]
    fn verify_data_depends_on_sender() {
        let ctx = context(ConnectionEnd::Client);
        let client = expected_verify_data(&ctx, ConnectionEnd::Client).unwrap();
        let server = expected_verify_data(&ctx, ConnectionEnd::Server).unwrap();
        assert_eq!(client.len(), VERIFY_DATA_LENGTH);
        assert_ne!(client, server);
    }

    #[test_log::test]
    fn peer_verify_data_is_recorded() {
        let mut client = context(ConnectionEnd::Client);
        let mut server = context(ConnectionEnd::Server);
        server.server_handshake_status = ServerHandshakeStatus::DeferredFinishedReady;

        let mut prepared = FinishedMessage::default();
        let bytes = prepare_message(&mut prepared, &mut client).unwrap();
        assert_eq!(bytes.len(), 4 + VERIFY_DATA_LENGTH);

        let mut parsed = FinishedMessage::default();
        parse_message(&mut parsed, &mut server, &bytes, 0).unwrap();
        assert_eq!(server.peer_verify_data, prepared.verify_data.value());
        assert_eq!(server.server_handshake_status, ServerHandshakeStatus::Normal);
        assert_eq!(client.digest.raw(), server.digest.raw());
    }

    #[test_log::test]
    fn legacy_version_cannot_verify_peer_finished() {
        let mut ctx = TlsContext::with_version(
            ConnectionEnd::Server,
            crate::tls::enums::ProtocolVersion::TLSv1_0,
        );
        let mut bytes = vec![0x14, 0x00, 0x00, 0x0c];
        bytes.extend([0xab; VERIFY_DATA_LENGTH]);
        let mut parsed = FinishedMessage::default();
        assert!(matches!(
            parse_message(&mut parsed, &mut ctx, &bytes, 0),
            Err(Error::CryptoConfiguration(_))
        ));
        assert!(ctx.peer_verify_data.is_empty());
        assert!(ctx.digest.raw().is_empty());
    }

    #[test_log::test]
    fn uninitialized_digest_is_surfaced() {
        let mut ctx = TlsContext::new(ConnectionEnd::Client);
        let mut bytes = vec![0x14, 0x00, 0x00, 0x0c];
        bytes.extend([0xab; VERIFY_DATA_LENGTH]);
        assert!(matches!(
            parse_message(&mut FinishedMessage::default(), &mut ctx, &bytes, 0),
            Err(Error::CryptoConfiguration(_))
        ));
    }

    #[test_log::test]
    fn legacy_version_cannot_compute_verify_data() {
        let mut ctx = context(ConnectionEnd::Client);
        ctx.protocol_version = crate::tls::enums::ProtocolVersion::TLSv1_0;
        assert!(matches!(
            prepare_message(&mut FinishedMessage::default(), &mut ctx),
            Err(Error::CryptoConfiguration(_))
        ));
    }
}

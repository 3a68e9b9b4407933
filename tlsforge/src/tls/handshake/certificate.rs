use forge::codec::{put_uint, Reader};
use forge::error::Error;
use forge::inject::{FieldMut, InjectableBytes, InjectableInteger};
use serde::{Deserialize, Serialize};

use crate::tls::context::TlsContext;
use crate::tls::enums::{ConnectionEnd, HandshakeType};
use crate::tls::handshake::{read_vector, write_vector, HandshakeBody, HandshakeHeader};

/// Certificate chain of RFC 5246, section 7.4.2. The certificates are kept as DER.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CertificateMessage {
    pub header: HandshakeHeader,
    pub certificates_length: InjectableInteger,
    /// Concatenation of the 3 byte length prefixed certificates
    pub certificates: InjectableBytes,
}

pub fn encode_certificate_list(chain: &[Vec<u8>]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for certificate in chain {
        put_uint(certificate.len() as u32, 3, &mut bytes);
        bytes.extend_from_slice(certificate);
    }
    bytes
}

pub fn decode_certificate_list(bytes: &[u8]) -> Result<Vec<Vec<u8>>, Error> {
    let mut r = Reader::init(bytes);
    let mut chain = Vec::new();
    while r.any_left() {
        let len = r.read_u24()? as usize;
        chain.push(r.take(len)?.to_vec());
    }
    Ok(chain)
}

impl HandshakeBody for CertificateMessage {
    const TYPE: HandshakeType = HandshakeType::Certificate;

    fn header(&self) -> &HandshakeHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut HandshakeHeader {
        &mut self.header
    }

    fn prepare_body(&mut self, ctx: &mut TlsContext) -> Result<Vec<u8>, Error> {
        if ctx.certificate_chain.is_empty() {
            log::debug!("Sending an empty certificate chain");
        }
        let mut bytes = Vec::new();
        write_vector(
            &mut bytes,
            3,
            &mut self.certificates_length,
            &mut self.certificates,
            encode_certificate_list(&ctx.certificate_chain),
        );
        Ok(bytes)
    }

    fn parse_body(&mut self, r: &mut Reader) -> Result<(), Error> {
        read_vector(r, 3, &mut self.certificates_length, &mut self.certificates)
    }

    fn adjust_context(&mut self, ctx: &mut TlsContext) -> Result<(), Error> {
        let chain = decode_certificate_list(
            self.certificates
                .original()
                .map(Vec::as_slice)
                .unwrap_or_default(),
        )?;
        log::debug!("Peer presented {} certificates", chain.len());
        match ctx.connection_end {
            ConnectionEnd::Client => ctx.server_certificates = chain,
            ConnectionEnd::Server => ctx.client_certificates = chain,
        }
        Ok(())
    }

    fn field_mut(&mut self, name: &str) -> Option<FieldMut<'_>> {
        match name {
            "certificates_length" => Some(FieldMut::Integer(&mut self.certificates_length)),
            "certificates" => Some(FieldMut::Bytes(&mut self.certificates)),
            _ => None,
        }
    }
}

use forge::codec::{encode_all, read_all, Reader};
use forge::error::Error;
use forge::inject::{FieldMut, InjectableBytes, InjectableInteger};
use serde::{Deserialize, Serialize};

use crate::tls::context::TlsContext;
use crate::tls::enums::{ClientCertificateType, HandshakeType, SignatureAndHashAlgorithm};
use crate::tls::handshake::{read_vector, write_vector, HandshakeBody, HandshakeHeader};

/// CertificateRequest of RFC 5246, section 7.4.4
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CertificateRequestMessage {
    pub header: HandshakeHeader,
    pub client_certificate_types_count: InjectableInteger,
    pub client_certificate_types: InjectableBytes,
    pub signature_hash_algorithms_length: InjectableInteger,
    pub signature_hash_algorithms: InjectableBytes,
    pub distinguished_names_length: InjectableInteger,
    pub distinguished_names: InjectableBytes,
}

impl HandshakeBody for CertificateRequestMessage {
    const TYPE: HandshakeType = HandshakeType::CertificateRequest;

    fn header(&self) -> &HandshakeHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut HandshakeHeader {
        &mut self.header
    }

    fn prepare_body(&mut self, ctx: &mut TlsContext) -> Result<Vec<u8>, Error> {
        let algorithms = if ctx.supported_signature_and_hash_algorithms.is_empty() {
            SignatureAndHashAlgorithm::all_rsa()
        } else {
            ctx.supported_signature_and_hash_algorithms.clone()
        };

        let mut bytes = Vec::new();
        write_vector(
            &mut bytes,
            1,
            &mut self.client_certificate_types_count,
            &mut self.client_certificate_types,
            encode_all(&ctx.client_certificate_types),
        );
        write_vector(
            &mut bytes,
            2,
            &mut self.signature_hash_algorithms_length,
            &mut self.signature_hash_algorithms,
            encode_all(&algorithms),
        );
        write_vector(
            &mut bytes,
            2,
            &mut self.distinguished_names_length,
            &mut self.distinguished_names,
            Vec::new(),
        );

        ctx.client_authentication = true;
        Ok(bytes)
    }

    fn parse_body(&mut self, r: &mut Reader) -> Result<(), Error> {
        read_vector(
            r,
            1,
            &mut self.client_certificate_types_count,
            &mut self.client_certificate_types,
        )?;
        read_vector(
            r,
            2,
            &mut self.signature_hash_algorithms_length,
            &mut self.signature_hash_algorithms,
        )?;
        read_vector(
            r,
            2,
            &mut self.distinguished_names_length,
            &mut self.distinguished_names,
        )
    }

    fn adjust_context(&mut self, ctx: &mut TlsContext) -> Result<(), Error> {
        let client_certificate_types: Vec<ClientCertificateType> = self
            .client_certificate_types
            .original()
            .map(|types| types.iter().copied().map(ClientCertificateType::from).collect())
            .unwrap_or_default();
        let signature_and_hash_algorithms = read_all(
            self.signature_hash_algorithms
                .original()
                .map(Vec::as_slice)
                .unwrap_or_default(),
        )?;
        log::trace!(
            "Peer asks for a certificate of types {:?}",
            client_certificate_types
        );

        ctx.client_certificate_types = client_certificate_types;
        ctx.supported_signature_and_hash_algorithms = signature_and_hash_algorithms;
        ctx.client_authentication = true;
        Ok(())
    }

    fn field_mut(&mut self, name: &str) -> Option<FieldMut<'_>> {
        Some(match name {
            "client_certificate_types_count" => {
                FieldMut::Integer(&mut self.client_certificate_types_count)
            }
            "client_certificate_types" => FieldMut::Bytes(&mut self.client_certificate_types),
            "signature_hash_algorithms_length" => {
                FieldMut::Integer(&mut self.signature_hash_algorithms_length)
            }
            "signature_hash_algorithms" => FieldMut::Bytes(&mut self.signature_hash_algorithms),
            "distinguished_names_length" => {
                FieldMut::Integer(&mut self.distinguished_names_length)
            }
            "distinguished_names" => FieldMut::Bytes(&mut self.distinguished_names),
            _ => return None,
        })
    }
}

impl CertificateRequestMessage {
    pub fn signature_and_hash_algorithms(&self) -> Result<Vec<SignatureAndHashAlgorithm>, Error> {
        Ok(read_all(&self.signature_hash_algorithms.value())?)
    }

    pub fn first_certificate_type(&self) -> Option<ClientCertificateType> {
        self.client_certificate_types
            .value()
            .first()
            .map(|typ| ClientCertificateType::from(*typ))
    }
}

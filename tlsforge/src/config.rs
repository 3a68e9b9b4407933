//! TOML configuration of a connection and of the fields to inject.
//!
//! ```toml
//! protocol_version = "TLSv1_2"
//! connection_end = "Server"
//! selected_cipher_suite = "TLS_RSA_WITH_AES_256_GCM_SHA384"
//!
//! [[injections]]
//! message = "CertificateRequest"
//! field = "signature_hash_algorithms_length"
//! modifications = [{ integer = { Add = 1 } }]
//! ```

use std::fs;
use std::path::Path;

use forge::error::Error;
use forge::inject::AnyModification;
use serde::{Deserialize, Serialize};

use crate::tls::context::{LengthCheck, TlsContext};
use crate::tls::enums::{
    CipherSuite, ClientCertificateType, ConnectionEnd, HandshakeType, ProtocolVersion,
    SignatureAndHashAlgorithm,
};
use crate::tls::handshake::HandshakeMessage;

/// A modification chain for one field of one message kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectionConfig {
    pub message: HandshakeType,
    pub field: String,
    #[serde(default)]
    pub modifications: Vec<AnyModification>,
    #[serde(default)]
    pub post: Option<AnyModification>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    pub protocol_version: ProtocolVersion,
    pub connection_end: ConnectionEnd,
    pub selected_cipher_suite: CipherSuite,
    pub cipher_suites: Vec<CipherSuite>,
    pub signature_and_hash_algorithms: Vec<SignatureAndHashAlgorithm>,
    pub client_certificate_types: Vec<ClientCertificateType>,
    /// DER certificates in hex, leaf first
    pub certificate_chain: Vec<String>,
    /// Opaque extension block for our Hello message, in hex
    pub extensions: String,
    pub length_check: LengthCheck,
    pub injections: Vec<InjectionConfig>,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        let ctx = TlsContext::default();
        Self {
            protocol_version: ctx.protocol_version,
            connection_end: ctx.connection_end,
            selected_cipher_suite: ctx.selected_cipher_suite,
            cipher_suites: ctx.cipher_suites,
            signature_and_hash_algorithms: ctx.supported_signature_and_hash_algorithms,
            client_certificate_types: ctx.client_certificate_types,
            certificate_chain: Vec::new(),
            extensions: String::new(),
            length_check: ctx.length_check,
            injections: Vec::new(),
        }
    }
}

impl ForgeConfig {
    pub fn from_toml(toml: &str) -> Result<Self, Error> {
        toml::from_str(toml).map_err(|err| Error::Config(err.to_string()))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let content = fs::read_to_string(path.as_ref())?;
        log::debug!("Loading configuration from {}", path.as_ref().display());
        Self::from_toml(&content)
    }

    /// Attach the configured chains to the fields of `message`. Injections for other message
    /// kinds are skipped.
    pub fn apply_injections(&self, message: &mut HandshakeMessage) -> Result<usize, Error> {
        let typ = message.typ();
        let mut applied = 0;
        for injection in self
            .injections
            .iter()
            .filter(|injection| injection.message == typ)
        {
            let mut field = message.field_mut(&injection.field)?;
            for modification in &injection.modifications {
                field.push(modification.clone())?;
            }
            if let Some(post) = &injection.post {
                field.set_post(post.clone())?;
            }
            log::debug!(
                "Injected into {:?}.{}",
                injection.message,
                injection.field
            );
            applied += 1;
        }
        Ok(applied)
    }
}

impl TlsContext {
    pub fn from_config(config: &ForgeConfig) -> Result<Self, Error> {
        let certificate_chain = config
            .certificate_chain
            .iter()
            .map(hex::decode)
            .collect::<Result<Vec<_>, _>>()?;
        let extensions = hex::decode(&config.extensions)?;

        let mut ctx = TlsContext::with_version(config.connection_end, config.protocol_version);
        ctx.selected_cipher_suite = config.selected_cipher_suite;
        ctx.cipher_suites = config.cipher_suites.clone();
        ctx.supported_signature_and_hash_algorithms = config.signature_and_hash_algorithms.clone();
        ctx.client_certificate_types = config.client_certificate_types.clone();
        ctx.certificate_chain = certificate_chain;
        match config.connection_end {
            ConnectionEnd::Client => ctx.client_extensions = extensions,
            ConnectionEnd::Server => ctx.server_extensions = extensions,
        }
        ctx.length_check = config.length_check;
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use forge::inject::IntegerModification;

    use super::*;
    use crate::tls::enums::{HashAlgorithm, SignatureAlgorithm};

    const CONFIG: &str = r#"
        protocol_version = "TLSv1_2"
        connection_end = "Server"
        selected_cipher_suite = "TLS_RSA_WITH_AES_256_GCM_SHA384"
        signature_and_hash_algorithms = [{ signature = "RSA", hash = "SHA512" }]
        certificate_chain = ["3003020101"]
        length_check = "Tolerant"

        [[injections]]
        message = "CertificateRequest"
        field = "signature_hash_algorithms_length"
        modifications = [{ integer = { Add = 1 } }]
        post = { integer = { Xor = 256 } }

        [[injections]]
        message = "Finished"
        field = "verify_data"
        modifications = [{ bytes = { Xor = { start_position = 0, xor = [1] } } }]
    "#;

    #[test_log::test]
    fn context_from_config() {
        let config = ForgeConfig::from_toml(CONFIG).unwrap();
        let ctx = TlsContext::from_config(&config).unwrap();
        assert_eq!(ctx.connection_end, ConnectionEnd::Server);
        assert_eq!(
            ctx.selected_cipher_suite,
            CipherSuite::TLS_RSA_WITH_AES_256_GCM_SHA384
        );
        assert_eq!(
            ctx.supported_signature_and_hash_algorithms,
            vec![SignatureAndHashAlgorithm::new(
                SignatureAlgorithm::RSA,
                HashAlgorithm::SHA512
            )]
        );
        assert_eq!(ctx.certificate_chain, vec![vec![0x30, 0x03, 0x02, 0x01, 0x01]]);
        assert_eq!(ctx.length_check, LengthCheck::Tolerant);
        assert_eq!(
            config.injections[0].post,
            Some(AnyModification::Integer(IntegerModification::Xor(256)))
        );
    }

    #[test_log::test]
    fn empty_config_is_default() {
        assert_eq!(ForgeConfig::from_toml("").unwrap(), ForgeConfig::default());
    }

    #[test_log::test]
    fn injections_reach_the_wire() {
        let config = ForgeConfig::from_toml(CONFIG).unwrap();
        let mut ctx = TlsContext::from_config(&config).unwrap();
        let mut message = HandshakeMessage::new(HandshakeType::CertificateRequest).unwrap();
        assert_eq!(config.apply_injections(&mut message).unwrap(), 1);
        let bytes = message.prepare(&mut ctx).unwrap();
        // (2 + 1) ^ 0x100
        assert_eq!(&bytes[6..8], &[0x01, 0x03]);
    }

    #[test_log::test]
    fn invalid_descriptors() {
        assert!(matches!(
            ForgeConfig::from_toml("certificate_chain = [\"zz\"]")
                .and_then(|config| TlsContext::from_config(&config)),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            ForgeConfig::from_toml("protocol_version = 3"),
            Err(Error::Config(_))
        ));

        let config = ForgeConfig::from_toml(
            r#"
            [[injections]]
            message = "Finished"
            field = "verify_data"
            modifications = [{ integer = { Add = 1 } }]
            "#,
        )
        .unwrap();
        let mut message = HandshakeMessage::new(HandshakeType::Finished).unwrap();
        assert!(matches!(
            config.apply_injections(&mut message),
            Err(Error::ConfigurationMismatch(_))
        ));
    }
}

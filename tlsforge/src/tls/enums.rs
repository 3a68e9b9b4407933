use std::fmt;

use forge::codec::{Codec, DecodeError, Reader};
use serde::{Deserialize, Serialize};

enum_builder! {@U16
    EnumName: ProtocolVersion;
    EnumVal {
        SSLv3 => 0x0300,
        TLSv1_0 => 0x0301,
        TLSv1_1 => 0x0302,
        TLSv1_2 => 0x0303,
        DTLSv1_0 => 0xfeff,
        DTLSv1_2 => 0xfefd,
    }
}

impl ProtocolVersion {
    pub fn is_dtls(&self) -> bool {
        matches!(self, ProtocolVersion::DTLSv1_0 | ProtocolVersion::DTLSv1_2)
    }
}

enum_builder! {@U8
    EnumName: HandshakeType;
    EnumVal {
        HelloRequest => 0x00,
        ClientHello => 0x01,
        ServerHello => 0x02,
        HelloVerifyRequest => 0x03,
        NewSessionTicket => 0x04,
        Certificate => 0x0b,
        ServerKeyExchange => 0x0c,
        CertificateRequest => 0x0d,
        ServerHelloDone => 0x0e,
        CertificateVerify => 0x0f,
        ClientKeyExchange => 0x10,
        Finished => 0x14,
    }
}

enum_builder! {@U16
    EnumName: CipherSuite;
    EnumVal {
        TLS_RSA_WITH_AES_128_CBC_SHA => 0x002f,
        TLS_DHE_RSA_WITH_AES_128_CBC_SHA => 0x0033,
        TLS_RSA_WITH_AES_256_CBC_SHA => 0x0035,
        TLS_DHE_RSA_WITH_AES_256_CBC_SHA => 0x0039,
        TLS_RSA_WITH_AES_128_CBC_SHA256 => 0x003c,
        TLS_RSA_WITH_AES_256_CBC_SHA256 => 0x003d,
        TLS_DHE_RSA_WITH_AES_128_CBC_SHA256 => 0x0067,
        TLS_RSA_WITH_AES_128_GCM_SHA256 => 0x009c,
        TLS_RSA_WITH_AES_256_GCM_SHA384 => 0x009d,
        TLS_DHE_RSA_WITH_AES_128_GCM_SHA256 => 0x009e,
        TLS_DHE_RSA_WITH_AES_256_GCM_SHA384 => 0x009f,
        TLS13_AES_128_GCM_SHA256 => 0x1301,
        TLS13_AES_256_GCM_SHA384 => 0x1302,
        TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA => 0xc009,
        TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA => 0xc013,
        TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA => 0xc014,
        TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256 => 0xc02b,
        TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384 => 0xc02c,
        TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256 => 0xc02f,
        TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384 => 0xc030,
    }
}

enum_builder! {@U8
    EnumName: Compression;
    EnumVal {
        Null => 0x00,
        Deflate => 0x01,
    }
}

enum_builder! {@U8
    EnumName: ClientCertificateType;
    EnumVal {
        RSA_SIGN => 0x01,
        DSS_SIGN => 0x02,
        RSA_FIXED_DH => 0x03,
        DSS_FIXED_DH => 0x04,
        ECDSA_SIGN => 0x40,
        RSA_FIXED_ECDH => 0x41,
        ECDSA_FIXED_ECDH => 0x42,
    }
}

enum_builder! {@U8
    EnumName: HashAlgorithm;
    EnumVal {
        NONE => 0x00,
        MD5 => 0x01,
        SHA1 => 0x02,
        SHA224 => 0x03,
        SHA256 => 0x04,
        SHA384 => 0x05,
        SHA512 => 0x06,
    }
}

enum_builder! {@U8
    EnumName: SignatureAlgorithm;
    EnumVal {
        Anonymous => 0x00,
        RSA => 0x01,
        DSA => 0x02,
        ECDSA => 0x03,
    }
}

enum_builder! {@U16
    EnumName: NamedGroup;
    EnumVal {
        secp256r1 => 0x0017,
        secp384r1 => 0x0018,
        secp521r1 => 0x0019,
        X25519 => 0x001d,
    }
}

enum_builder! {@U8
    EnumName: ECPointFormat;
    EnumVal {
        Uncompressed => 0x00,
        ANSIX962CompressedPrime => 0x01,
        ANSIX962CompressedChar2 => 0x02,
    }
}

/// A `SignatureAndHashAlgorithm` of RFC 5246, section 7.4.1.4.1. On the wire the hash comes
/// first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignatureAndHashAlgorithm {
    pub signature: SignatureAlgorithm,
    pub hash: HashAlgorithm,
}

impl SignatureAndHashAlgorithm {
    pub fn new(signature: SignatureAlgorithm, hash: HashAlgorithm) -> Self {
        Self { signature, hash }
    }

    pub fn to_bytes(&self) -> [u8; 2] {
        [self.hash.get_u8(), self.signature.get_u8()]
    }

    /// RSA combined with every hash a TLS 1.2 peer may ask for, strongest last
    pub fn all_rsa() -> Vec<Self> {
        [
            HashAlgorithm::MD5,
            HashAlgorithm::SHA1,
            HashAlgorithm::SHA224,
            HashAlgorithm::SHA256,
            HashAlgorithm::SHA384,
            HashAlgorithm::SHA512,
        ]
        .into_iter()
        .map(|hash| Self::new(SignatureAlgorithm::RSA, hash))
        .collect()
    }
}

impl Codec for SignatureAndHashAlgorithm {
    fn encode(&self, bytes: &mut Vec<u8>) {
        bytes.extend_from_slice(&self.to_bytes());
    }

    fn read(r: &mut Reader) -> Result<Self, DecodeError> {
        let hash = HashAlgorithm::read(r)?;
        let signature = SignatureAlgorithm::read(r)?;
        Ok(Self { signature, hash })
    }
}

impl fmt::Display for SignatureAndHashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}-{:?}", self.hash, self.signature)
    }
}

/// Which side of the connection we are playing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ConnectionEnd {
    #[default]
    Client,
    Server,
}

impl ConnectionEnd {
    pub fn peer(&self) -> Self {
        match self {
            ConnectionEnd::Client => ConnectionEnd::Server,
            ConnectionEnd::Server => ConnectionEnd::Client,
        }
    }
}

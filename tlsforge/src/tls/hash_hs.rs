use forge::error::Error;
use md5::{Digest, Md5};
use ring::digest;

use crate::tls::algorithm::DigestAlgorithm;

/// Running hash over all handshake messages of a connection.
///
/// The raw messages are kept, so the algorithm can be chosen (or changed) after the first
/// messages were seen: the hash is always computed over everything added so far with the
/// algorithm set last.
#[derive(Debug, Clone, Default)]
pub struct HandshakeHash {
    algorithm: Option<DigestAlgorithm>,
    buffer: Vec<u8>,
}

impl HandshakeHash {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the algorithm. Messages added before are hashed with it as well.
    pub fn initialize(&mut self, algorithm: DigestAlgorithm) {
        if let Some(previous) = self.algorithm {
            if previous != algorithm {
                log::debug!(
                    "Transcript digest switches from {:?} to {:?} after {} bytes",
                    previous,
                    algorithm,
                    self.buffer.len()
                );
            }
        }
        self.algorithm = Some(algorithm);
    }

    pub fn algorithm(&self) -> Option<DigestAlgorithm> {
        self.algorithm
    }

    pub fn add_message(&mut self, message: &[u8]) {
        self.buffer.extend_from_slice(message);
    }

    /// The handshake messages seen so far
    pub fn raw(&self) -> &[u8] {
        &self.buffer
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    pub fn get_current_hash(&self) -> Result<Vec<u8>, Error> {
        let algorithm = self.algorithm.ok_or_else(|| {
            Error::CryptoConfiguration("transcript digest was never initialized".to_string())
        })?;
        Ok(hash(algorithm, &self.buffer))
    }
}

pub fn hash(algorithm: DigestAlgorithm, data: &[u8]) -> Vec<u8> {
    match algorithm {
        DigestAlgorithm::Md5Sha1 => {
            let mut out = Md5::digest(data).to_vec();
            out.extend_from_slice(
                digest::digest(&digest::SHA1_FOR_LEGACY_USE_ONLY, data).as_ref(),
            );
            out
        }
        DigestAlgorithm::Sha256 => digest::digest(&digest::SHA256, data).as_ref().to_vec(),
        DigestAlgorithm::Sha384 => digest::digest(&digest::SHA384, data).as_ref().to_vec(),
    }
}

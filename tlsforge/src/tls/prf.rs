//! The TLS 1.2 pseudo random function of RFC 5246, section 5.

use forge::error::Error;
use ring::hmac;

use crate::tls::algorithm::DigestAlgorithm;

pub const MASTER_SECRET_LABEL: &[u8] = b"master secret";
pub const CLIENT_FINISHED_LABEL: &[u8] = b"client finished";
pub const SERVER_FINISHED_LABEL: &[u8] = b"server finished";

fn hmac_algorithm(algorithm: DigestAlgorithm) -> Result<hmac::Algorithm, Error> {
    match algorithm {
        DigestAlgorithm::Sha256 => Ok(hmac::HMAC_SHA256),
        DigestAlgorithm::Sha384 => Ok(hmac::HMAC_SHA384),
        DigestAlgorithm::Md5Sha1 => Err(Error::CryptoConfiguration(
            "the MD5/SHA-1 PRF of TLS 1.0 and 1.1 is not supported".to_string(),
        )),
    }
}

fn p_hash(out: &mut [u8], algorithm: hmac::Algorithm, secret: &[u8], seed: &[u8]) {
    let key = hmac::Key::new(algorithm, secret);

    // A(1)
    let mut current_a = hmac::sign(&key, seed);
    let chunk_size = algorithm.digest_algorithm().output_len;
    for chunk in out.chunks_mut(chunk_size) {
        // P_hash[i] = HMAC_hash(secret, A(i) + seed)
        let mut ctx = hmac::Context::with_key(&key);
        ctx.update(current_a.as_ref());
        ctx.update(seed);
        let p_term = ctx.sign();
        chunk.copy_from_slice(&p_term.as_ref()[..chunk.len()]);

        // A(i+1) = HMAC_hash(secret, A(i))
        current_a = hmac::sign(&key, current_a.as_ref());
    }
}

pub fn prf(
    out: &mut [u8],
    algorithm: DigestAlgorithm,
    secret: &[u8],
    label: &[u8],
    seed: &[u8],
) -> Result<(), Error> {
    let mut joined_seed = Vec::with_capacity(label.len() + seed.len());
    joined_seed.extend_from_slice(label);
    joined_seed.extend_from_slice(seed);
    p_hash(out, hmac_algorithm(algorithm)?, secret, &joined_seed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn sha256_test_vector() {
        let secret = hex::decode("9bbe436ba940f017b17652849a71db35").unwrap();
        let seed = hex::decode("a0ba9f936cda311827a6f796ffd5198c").unwrap();
        let mut out = [0u8; 100];
        prf(&mut out, DigestAlgorithm::Sha256, &secret, b"test label", &seed).unwrap();
        assert_eq!(hex::encode(&out[..16]), "e3f229ba727be17b8d122620557cd453");
    }

    #[test_log::test]
    fn shorter_output_is_prefix() {
        let mut long = [0u8; 48];
        let mut short = [0u8; 12];
        prf(&mut long, DigestAlgorithm::Sha384, b"secret", b"label", b"seed").unwrap();
        prf(&mut short, DigestAlgorithm::Sha384, b"secret", b"label", b"seed").unwrap();
        assert_eq!(&long[..12], &short[..]);
    }

    #[test_log::test]
    fn legacy_prf_is_rejected() {
        let mut out = [0u8; 12];
        assert!(matches!(
            prf(&mut out, DigestAlgorithm::Md5Sha1, b"s", b"l", b"x"),
            Err(Error::CryptoConfiguration(_))
        ));
    }
}

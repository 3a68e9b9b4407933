//! Conformity predicates of the PKCS#1 v1.5 oracle types.
//!
//! The TTT..FFF names follow Bardou et al., "Efficient Padding Oracle Attacks on Cryptographic
//! Hardware" (Crypto'12). Each letter says whether the oracle still answers true for a block with
//! (1) a zero byte within the first 8 padding bytes, (2) no zero separator at all and (3) a
//! separator at a position which does not yield a key of the expected length.

use crate::oracle::OracleType;

/// Premaster secret length of TLS
pub const DEFAULT_KEY_LENGTH: usize = 48;

/// Minimum number of non-zero padding bytes
pub const MIN_PADDING_LENGTH: usize = 8;

const PADDING_START: usize = 2;
const PADDING_END: usize = PADDING_START + MIN_PADDING_LENGTH;

fn has_prefix(block: &[u8]) -> bool {
    block.len() >= 2 && block[0] == 0x00 && block[1] == 0x02
}

/// Position of the first zero byte at or after `from`
fn first_zero(block: &[u8], from: usize) -> Option<usize> {
    block
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, byte)| **byte == 0x00)
        .map(|(position, _)| position)
}

fn padding_is_nonzero(block: &[u8]) -> bool {
    block.len() >= PADDING_END && !block[PADDING_START..PADDING_END].contains(&0x00)
}

/// Evaluate the predicate of `oracle_type` on a decrypted block. `key_length` is the length the
/// unpadded message must have for the types which check it.
pub fn check(oracle_type: OracleType, block: &[u8], key_length: usize) -> bool {
    match oracle_type {
        OracleType::TTT => has_prefix(block),
        OracleType::TFT => has_prefix(block) && first_zero(block, PADDING_START).is_some(),
        OracleType::FTT => has_prefix(block) && padding_is_nonzero(block),
        OracleType::FFT => {
            has_prefix(block)
                && padding_is_nonzero(block)
                && first_zero(block, PADDING_END).is_some()
        }
        OracleType::FFF => {
            has_prefix(block)
                && padding_is_nonzero(block)
                && block.len() > key_length
                && first_zero(block, PADDING_START) == Some(block.len() - key_length - 1)
        }
        OracleType::JSSE => {
            has_prefix(block)
                && matches!(first_zero(block, PADDING_START), Some(separator) if separator >= PADDING_END)
        }
        // 00 02 prefix plus an AES key length
        OracleType::XMLENC => {
            has_prefix(block)
                && match first_zero(block, PADDING_START) {
                    Some(separator) => matches!(block.len() - separator - 1, 16 | 24 | 32),
                    None => false,
                }
        }
        OracleType::BigIP => block.len() >= 2 && block[1] == 0x02,
        OracleType::MANGER_0x00 => block.first() == Some(&0x00),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK_SIZE: usize = 128;

    /// 00 02 <non-zero padding> 00 <key of key_length bytes>
    fn conforming(key_length: usize) -> Vec<u8> {
        let mut block = vec![0x00, 0x02];
        block.resize(BLOCK_SIZE - key_length - 1, 0xff);
        block.push(0x00);
        block.resize(BLOCK_SIZE, 0x42);
        block
    }

    const ALL: [OracleType; 9] = [
        OracleType::TTT,
        OracleType::TFT,
        OracleType::FTT,
        OracleType::FFT,
        OracleType::FFF,
        OracleType::JSSE,
        OracleType::XMLENC,
        OracleType::BigIP,
        OracleType::MANGER_0x00,
    ];

    #[test_log::test]
    fn well_formed_block() {
        let block = conforming(DEFAULT_KEY_LENGTH);
        for oracle_type in ALL {
            let expected = oracle_type != OracleType::XMLENC;
            assert_eq!(
                check(oracle_type, &block, DEFAULT_KEY_LENGTH),
                expected,
                "{:?}",
                oracle_type
            );
        }
        assert!(check(OracleType::XMLENC, &conforming(32), DEFAULT_KEY_LENGTH));
        assert!(check(OracleType::XMLENC, &conforming(16), DEFAULT_KEY_LENGTH));
        assert!(!check(OracleType::XMLENC, &conforming(20), DEFAULT_KEY_LENGTH));
    }

    #[test_log::test]
    fn xmlenc_needs_prefix() {
        let mut block = conforming(16);
        block[1] = 0x01;
        assert!(!check(OracleType::XMLENC, &block, DEFAULT_KEY_LENGTH));
    }

    #[test_log::test]
    fn fff_rejects_zero_in_padding() {
        let mut block = conforming(DEFAULT_KEY_LENGTH);
        block[5] = 0x00;
        assert!(!check(OracleType::FFF, &block, DEFAULT_KEY_LENGTH));
        assert!(!check(OracleType::FTT, &block, DEFAULT_KEY_LENGTH));
        assert!(!check(OracleType::JSSE, &block, DEFAULT_KEY_LENGTH));
        assert!(check(OracleType::TTT, &block, DEFAULT_KEY_LENGTH));
        assert!(check(OracleType::TFT, &block, DEFAULT_KEY_LENGTH));
    }

    #[test_log::test]
    fn separator_position() {
        let wrong_length = conforming(20);
        assert!(!check(OracleType::FFF, &wrong_length, DEFAULT_KEY_LENGTH));
        assert!(check(OracleType::FFT, &wrong_length, DEFAULT_KEY_LENGTH));
        assert!(check(OracleType::FFF, &wrong_length, 20));

        let mut no_separator = vec![0x00, 0x02];
        no_separator.resize(BLOCK_SIZE, 0x01);
        assert!(check(OracleType::TTT, &no_separator, DEFAULT_KEY_LENGTH));
        assert!(check(OracleType::FTT, &no_separator, DEFAULT_KEY_LENGTH));
        assert!(!check(OracleType::TFT, &no_separator, DEFAULT_KEY_LENGTH));
        assert!(!check(OracleType::FFT, &no_separator, DEFAULT_KEY_LENGTH));
        assert!(!check(OracleType::JSSE, &no_separator, DEFAULT_KEY_LENGTH));
    }

    #[test_log::test]
    fn single_byte_oracles() {
        let mut block = conforming(DEFAULT_KEY_LENGTH);
        block[0] = 0x17;
        assert!(check(OracleType::BigIP, &block, DEFAULT_KEY_LENGTH));
        assert!(!check(OracleType::MANGER_0x00, &block, DEFAULT_KEY_LENGTH));
        assert!(!check(OracleType::TTT, &block, DEFAULT_KEY_LENGTH));

        let mut block = conforming(DEFAULT_KEY_LENGTH);
        block[1] = 0x17;
        assert!(!check(OracleType::BigIP, &block, DEFAULT_KEY_LENGTH));
        assert!(check(OracleType::MANGER_0x00, &block, DEFAULT_KEY_LENGTH));
    }

    #[test_log::test]
    fn short_blocks_never_conform() {
        for oracle_type in ALL {
            assert!(!check(oracle_type, &[], DEFAULT_KEY_LENGTH));
        }
        assert!(!check(OracleType::FFF, &[0x00, 0x02, 0x01], DEFAULT_KEY_LENGTH));
    }
}

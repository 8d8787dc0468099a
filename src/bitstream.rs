use std::fmt::{self, Display, Formatter};

use crate::error::DecodeError;

const BITS_PER_NIBBLE: usize = 4;

/// A position within a bit sequence, decomposed as a character index
/// plus a bit index within that character's nibble.  `bit_idx` counts
/// from 3 (most significant) down to 0; the cursor always points at an
/// unread bit, or one past the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BitCursor {
    char_idx: usize,
    bit_idx: usize,
}

impl BitCursor {
    fn new() -> BitCursor {
        BitCursor {
            char_idx: 0,
            bit_idx: BITS_PER_NIBBLE - 1,
        }
    }

    fn linear_pos(&self) -> usize {
        self.char_idx * BITS_PER_NIBBLE + (BITS_PER_NIBBLE - 1 - self.bit_idx)
    }

    fn advance(&mut self) {
        if self.bit_idx == 0 {
            self.bit_idx = BITS_PER_NIBBLE - 1;
            self.char_idx += 1;
        } else {
            self.bit_idx -= 1;
        }
    }
}

fn nibble_to_char(nibble: u8) -> char {
    if nibble < 10 {
        (b'0' + nibble) as char
    } else {
        (b'A' + nibble - 10) as char
    }
}

/// A sequential, consumable view over a fixed-length run of bits backed
/// by hex text.  The declared bit length may be shorter than four times
/// the text length; reads are bounded by the declared length and fail
/// with [`DecodeError::Truncated`] rather than silently padding with
/// zeros.
#[derive(Debug, Clone)]
pub struct Bitstream {
    nibbles: Vec<u8>,
    cursor: BitCursor,
    nbits: usize,
}

impl Bitstream {
    /// Wraps a hex string as a bit sequence of length 4×len(hex).
    pub fn new(hex: &str) -> Result<Bitstream, DecodeError> {
        let nibbles: Vec<u8> = hex
            .chars()
            .enumerate()
            .map(|(position, ch)| match ch.to_digit(16) {
                Some(n) => Ok(n as u8),
                None => Err(DecodeError::InvalidHexDigit {
                    position,
                    found: ch,
                }),
            })
            .collect::<Result<Vec<u8>, DecodeError>>()?;
        let nbits = nibbles.len() * BITS_PER_NIBBLE;
        Ok(Bitstream {
            nibbles,
            cursor: BitCursor::new(),
            nbits,
        })
    }

    /// The cursor's linear bit position (bits consumed so far).
    pub fn bit_pos(&self) -> usize {
        self.cursor.linear_pos()
    }

    pub fn remaining(&self) -> usize {
        self.nbits.saturating_sub(self.bit_pos())
    }

    pub fn has_remaining(&self) -> bool {
        self.bit_pos() < self.nbits
    }

    /// Consumes exactly `n` bits, most significant first, returning the
    /// accumulated unsigned value.
    pub fn read_bits(&mut self, n: usize) -> Result<u64, DecodeError> {
        if n > 64 {
            return Err(DecodeError::BitCountTooLarge(n));
        }
        if n > self.remaining() {
            return Err(DecodeError::Truncated {
                wanted: n,
                available: self.remaining(),
            });
        }
        let mut result: u64 = 0;
        for _ in 0..n {
            // In range: the cursor stays below nbits, and every
            // substream's text covers its declared length.
            let nibble = self.nibbles[self.cursor.char_idx];
            let bit = (nibble >> self.cursor.bit_idx) & 1;
            result = (result << 1) | u64::from(bit);
            self.cursor.advance();
        }
        Ok(result)
    }

    /// Consumes `n` bits and re-encodes them as a brand-new, independent
    /// `Bitstream` whose declared length is exactly `n`.  A nested decode
    /// handed this substream cannot see anything beyond its window.
    pub fn read_substream(&mut self, n: usize) -> Result<Bitstream, DecodeError> {
        if n > self.remaining() {
            return Err(DecodeError::Truncated {
                wanted: n,
                available: self.remaining(),
            });
        }
        let mut nibbles: Vec<u8> =
            Vec::with_capacity((n + BITS_PER_NIBBLE - 1) / BITS_PER_NIBBLE);
        let mut taken = 0;
        while taken < n {
            let group = (n - taken).min(BITS_PER_NIBBLE);
            let bits = self.read_bits(group)? as u8;
            // A short final group sits in the high bits of its nibble.
            nibbles.push(bits << (BITS_PER_NIBBLE - group));
            taken += group;
        }
        Ok(Bitstream {
            nibbles,
            cursor: BitCursor::new(),
            nbits: n,
        })
    }
}

impl Display for Bitstream {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let hex: String = self.nibbles.iter().map(|n| nibble_to_char(*n)).collect();
        write!(
            f,
            "\"{}\" {} bits, position {}:{} ({})",
            hex,
            self.nbits,
            self.cursor.char_idx,
            self.cursor.bit_idx,
            self.bit_pos(),
        )
    }
}

#[test]
fn test_new_rejects_bad_digit() {
    assert!(Bitstream::new("D2FE28").is_ok());
    match Bitstream::new("2Z") {
        Err(DecodeError::InvalidHexDigit {
            position: 1,
            found: 'Z',
        }) => (),
        other => panic!("expected InvalidHexDigit, got {:?}", other),
    }
}

#[test]
fn test_read_bits_msb_first() {
    let mut bits = Bitstream::new("F0").expect("valid test data");
    assert_eq!(bits.read_bits(4), Ok(0b1111));
    assert_eq!(bits.read_bits(4), Ok(0b0000));
    assert!(!bits.has_remaining());
}

#[test]
fn test_read_bits_across_nibbles() {
    // D2FE28 = 110100101111111000101000
    let mut bits = Bitstream::new("D2FE28").expect("valid test data");
    assert_eq!(bits.read_bits(3), Ok(0b110));
    assert_eq!(bits.read_bits(3), Ok(0b100));
    assert_eq!(bits.read_bits(5), Ok(0b10111));
    assert_eq!(bits.bit_pos(), 11);
    assert_eq!(bits.remaining(), 13);
}

#[test]
fn test_read_zero_bits() {
    let mut bits = Bitstream::new("A").expect("valid test data");
    assert_eq!(bits.read_bits(0), Ok(0));
    assert_eq!(bits.bit_pos(), 0);
}

#[test]
fn test_read_past_end_is_an_error() {
    let mut bits = Bitstream::new("F").expect("valid test data");
    assert_eq!(
        bits.read_bits(5),
        Err(DecodeError::Truncated {
            wanted: 5,
            available: 4
        })
    );
    // A failed read does not advance the cursor.
    assert_eq!(bits.bit_pos(), 0);
    assert_eq!(bits.read_bits(4), Ok(0b1111));
}

#[test]
fn test_read_too_many_bits_at_once() {
    let mut bits = Bitstream::new("FFFFFFFFFFFFFFFFFF").expect("valid test data");
    assert_eq!(bits.read_bits(65), Err(DecodeError::BitCountTooLarge(65)));
}

#[test]
fn test_substream_is_bounded() {
    // F0 = 11110000; skip 2 bits, carve 3: 1,1,0.
    let mut bits = Bitstream::new("F0").expect("valid test data");
    bits.read_bits(2).expect("valid test data");
    let mut sub = bits.read_substream(3).expect("valid test data");
    assert_eq!(sub.remaining(), 3);
    assert_eq!(sub.read_bits(3), Ok(0b110));
    assert!(!sub.has_remaining());
    assert_eq!(
        sub.read_bits(1),
        Err(DecodeError::Truncated {
            wanted: 1,
            available: 0
        })
    );
    // The parent advanced past the carved window.
    assert_eq!(bits.bit_pos(), 5);
}

#[test]
fn test_substream_roundtrips_whole_nibbles() {
    let mut bits = Bitstream::new("AB").expect("valid test data");
    let mut sub = bits.read_substream(8).expect("valid test data");
    assert_eq!(sub.read_bits(8), Ok(0xAB));
    assert!(!bits.has_remaining());
}

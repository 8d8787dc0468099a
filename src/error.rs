use std::error::Error;
use std::fmt::{self, Display, Formatter};

use crate::packet::Operator;

/// Everything that can go wrong while turning a hex line into an
/// evaluated packet tree.  Out-of-range reads and bad operator arity
/// are reported explicitly rather than silently producing a wrong
/// answer.
#[derive(Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// A character in the input was not a hex digit.
    InvalidHexDigit { position: usize, found: char },
    /// A read ran past the declared end of the bit stream.
    Truncated { wanted: usize, available: usize },
    /// A single read asked for more bits than fit in a u64.
    BitCountTooLarge(usize),
    /// A literal had more 5-bit groups than a u64 value can hold.
    LiteralTooLong { groups: usize },
    /// A comparison operator had an operand count other than two.
    ComparisonArity { op: Operator, found: usize },
    /// A minimum/maximum operator had nothing to reduce over.
    EmptyOperator { op: Operator },
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::InvalidHexDigit { position, found } => {
                write!(
                    f,
                    "not a hex digit at position {}: '{}' (unicode {})",
                    position,
                    found,
                    found.escape_unicode(),
                )
            }
            DecodeError::Truncated { wanted, available } => {
                write!(
                    f,
                    "not enough bits remain, needed at least {}, we have only {}",
                    wanted, available,
                )
            }
            DecodeError::BitCountTooLarge(n) => {
                write!(f, "cannot read {} bits into a 64-bit value", n)
            }
            DecodeError::LiteralTooLong { groups } => {
                write!(
                    f,
                    "literal value has {} 5-bit groups, which overflows a 64-bit value",
                    groups,
                )
            }
            DecodeError::ComparisonArity { op, found } => {
                write!(
                    f,
                    "{} packet requires exactly 2 sub-packets, found {}",
                    op, found,
                )
            }
            DecodeError::EmptyOperator { op } => {
                write!(f, "{} packet has no sub-packets to reduce over", op)
            }
        }
    }
}

impl Error for DecodeError {}

use std::fmt::{self, Display, Formatter};

use tracing::{event, Level};

use crate::bitstream::Bitstream;
use crate::error::DecodeError;

const LITERAL_TYPE_ID: u64 = 4;

/// The combination rule of a non-literal packet, keyed by its 3-bit
/// type id (type 4 is a literal, not an operator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Sum,
    Product,
    Minimum,
    Maximum,
    GreaterThan,
    LessThan,
    Equal,
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operator::Sum => "sum",
            Operator::Product => "product",
            Operator::Minimum => "minimum",
            Operator::Maximum => "maximum",
            Operator::GreaterThan => "greater-than",
            Operator::LessThan => "less-than",
            Operator::Equal => "equal",
        })
    }
}

/// A node of the decoded message: either a literal value or an operator
/// over an ordered list of sub-packets.  Built once by a top-down
/// recursive decode; immutable afterwards.
#[derive(Debug, PartialEq, Eq)]
pub enum Packet {
    Literal {
        version: u8,
        value: u64,
    },
    Operator {
        version: u8,
        op: Operator,
        subpackets: Vec<Packet>,
    },
}

fn decode_literal(bits: &mut Bitstream) -> Result<u64, DecodeError> {
    let mut value: u64 = 0;
    let mut groups = 0;
    loop {
        let group = bits.read_bits(5)?;
        groups += 1;
        if groups > 16 {
            return Err(DecodeError::LiteralTooLong { groups });
        }
        value = (value << 4) | (group & 0b1111);
        if group & 0b10000 == 0 {
            return Ok(value);
        }
    }
}

impl Packet {
    /// Decodes one packet from the cursor's current position, advancing
    /// the cursor by exactly the bits the packet's structure occupies.
    pub fn decode(bits: &mut Bitstream) -> Result<Packet, DecodeError> {
        let version = bits.read_bits(3)? as u8;
        let type_id = bits.read_bits(3)?;
        event!(
            Level::TRACE,
            "packet header: version={}, type={}",
            version,
            type_id
        );

        if type_id == LITERAL_TYPE_ID {
            let value = decode_literal(bits)?;
            event!(Level::TRACE, "literal packet: value={}", value);
            return Ok(Packet::Literal { version, value });
        }

        let op = match type_id {
            0 => Operator::Sum,
            1 => Operator::Product,
            2 => Operator::Minimum,
            3 => Operator::Maximum,
            5 => Operator::GreaterThan,
            6 => Operator::LessThan,
            7 => Operator::Equal,
            // The type id is 3 bits and 4 was handled above.
            _ => unreachable!(),
        };

        let length_type = bits.read_bits(1)?;
        let subpackets = match length_type {
            0 => {
                let sub_bits = bits.read_bits(15)? as usize;
                event!(
                    Level::TRACE,
                    "{} packet: sub-packets in next {} bits",
                    op,
                    sub_bits
                );
                let mut window = bits.read_substream(sub_bits)?;
                let mut subpackets = Vec::new();
                while window.has_remaining() {
                    subpackets.push(Packet::decode(&mut window)?);
                }
                subpackets
            }
            1 => {
                let count = bits.read_bits(11)?;
                event!(Level::TRACE, "{} packet: {} sub-packets", op, count);
                (0..count)
                    .map(|_| Packet::decode(bits))
                    .collect::<Result<Vec<Packet>, DecodeError>>()?
            }
            // One bit.
            _ => unreachable!(),
        };
        Ok(Packet::Operator {
            version,
            op,
            subpackets,
        })
    }

    /// This packet's version plus the version sum of every sub-packet.
    pub fn version_sum(&self) -> u32 {
        match self {
            Packet::Literal { version, .. } => u32::from(*version),
            Packet::Operator {
                version,
                subpackets,
                ..
            } => {
                u32::from(*version) + subpackets.iter().map(Packet::version_sum).sum::<u32>()
            }
        }
    }

    /// Evaluates the packet tree.  Comparison operators require exactly
    /// two sub-packets; minimum and maximum require at least one.
    pub fn value(&self) -> Result<u64, DecodeError> {
        let (op, subpackets) = match self {
            Packet::Literal { value, .. } => return Ok(*value),
            Packet::Operator { op, subpackets, .. } => (op, subpackets),
        };
        let values = subpackets
            .iter()
            .map(Packet::value)
            .collect::<Result<Vec<u64>, DecodeError>>()?;
        match op {
            Operator::Sum => Ok(values.iter().sum()),
            Operator::Product => Ok(values.iter().product()),
            Operator::Minimum => values
                .iter()
                .copied()
                .min()
                .ok_or(DecodeError::EmptyOperator { op: *op }),
            Operator::Maximum => values
                .iter()
                .copied()
                .max()
                .ok_or(DecodeError::EmptyOperator { op: *op }),
            Operator::GreaterThan | Operator::LessThan | Operator::Equal => {
                match values.as_slice() {
                    [left, right] => Ok(u64::from(match op {
                        Operator::GreaterThan => left > right,
                        Operator::LessThan => left < right,
                        Operator::Equal => left == right,
                        _ => unreachable!(),
                    })),
                    _ => Err(DecodeError::ComparisonArity {
                        op: *op,
                        found: values.len(),
                    }),
                }
            }
        }
    }
}

#[cfg(test)]
fn decode_hex(hex: &str) -> (Packet, Bitstream) {
    let mut bits = Bitstream::new(hex).expect("valid test data");
    let packet = Packet::decode(&mut bits).expect("valid test data");
    (packet, bits)
}

#[test]
fn test_decode_literal_packet() {
    let (packet, bits) = decode_hex("D2FE28");
    assert_eq!(
        packet,
        Packet::Literal {
            version: 6,
            value: 2021
        }
    );
    // 3 version + 3 type + three 5-bit groups.
    assert_eq!(bits.bit_pos(), 21);
}

#[test]
fn test_decode_operator_by_total_length() {
    let (packet, bits) = decode_hex("38006F45291200");
    assert_eq!(
        packet,
        Packet::Operator {
            version: 1,
            op: Operator::LessThan,
            subpackets: vec![
                Packet::Literal {
                    version: 6,
                    value: 10
                },
                Packet::Literal {
                    version: 2,
                    value: 20
                },
            ],
        }
    );
    // 3 + 3 + 1 + 15 header bits, then 27 bits of sub-packets.
    assert_eq!(bits.bit_pos(), 49);
}

#[test]
fn test_decode_operator_by_packet_count() {
    let (packet, bits) = decode_hex("EE00D40C823060");
    assert_eq!(
        packet,
        Packet::Operator {
            version: 7,
            op: Operator::Maximum,
            subpackets: vec![
                Packet::Literal {
                    version: 2,
                    value: 1
                },
                Packet::Literal {
                    version: 4,
                    value: 2
                },
                Packet::Literal {
                    version: 1,
                    value: 3
                },
            ],
        }
    );
    // 3 + 3 + 1 + 11 header bits, then three 11-bit literals.
    assert_eq!(bits.bit_pos(), 51);
}

#[test]
fn test_decode_is_idempotent() {
    let hex = "9C0141080250320F1802104A08";
    let (first, _) = decode_hex(hex);
    let (second, _) = decode_hex(hex);
    assert_eq!(first, second);
    assert_eq!(first.version_sum(), second.version_sum());
    assert_eq!(first.value(), second.value());
}

#[test]
fn test_decode_truncated_stream() {
    // Literal header followed by only two of the five group bits.
    let mut bits = Bitstream::new("D2").expect("valid test data");
    assert_eq!(
        Packet::decode(&mut bits),
        Err(DecodeError::Truncated {
            wanted: 5,
            available: 2
        })
    );
}

#[test]
fn test_decode_oversized_literal() {
    // A literal of 17 five-bit groups (sixteen continuation groups and
    // a terminator), which cannot fit a u64.
    let mut bits = Bitstream::new("12108421084210842108400").expect("valid test data");
    assert_eq!(
        Packet::decode(&mut bits),
        Err(DecodeError::LiteralTooLong { groups: 17 })
    );
}

#[cfg(test)]
use test_case::test_case;

#[cfg(test)]
#[test_case("8A004A801A8002F478", 16; "nested operators")]
#[test_case("620080001611562C8802118E34", 12; "two sub-operators by count")]
#[test_case("C0015000016115A2E0802F182340", 23; "two sub-operators by length")]
#[test_case("A0016C880162017C3686B18A3D4780", 31; "deeply nested")]
fn test_version_sum_fixtures(hex: &str, expected: u32) {
    let (packet, _) = decode_hex(hex);
    assert_eq!(packet.version_sum(), expected);
}

#[cfg(test)]
#[test_case("C200B40A82", 3; "sum of 1 and 2")]
#[test_case("04005AC33890", 54; "product of 6 and 9")]
#[test_case("880086C3E88112", 7; "minimum of 7 8 9")]
#[test_case("CE00C43D881120", 9; "maximum of 7 8 9")]
#[test_case("D8005AC2A8F0", 1; "5 is less than 15")]
#[test_case("F600BC2D8F", 0; "5 is not greater than 15")]
#[test_case("9C005AC2F8F0", 0; "5 does not equal 15")]
#[test_case("9C0141080250320F1802104A08", 1; "sum equals product")]
fn test_value_fixtures(hex: &str, expected: u64) {
    let (packet, _) = decode_hex(hex);
    assert_eq!(packet.value(), Ok(expected));
}

#[cfg(test)]
fn literal(version: u8, value: u64) -> Packet {
    Packet::Literal { version, value }
}

#[cfg(test)]
fn operator(version: u8, op: Operator, subpackets: Vec<Packet>) -> Packet {
    Packet::Operator {
        version,
        op,
        subpackets,
    }
}

#[test]
fn test_version_sum_by_construction() {
    assert_eq!(literal(6, 2021).version_sum(), 6);
    let tree = operator(
        4,
        Operator::Sum,
        vec![literal(1, 10), operator(2, Operator::Product, vec![literal(0, 3)])],
    );
    assert_eq!(tree.version_sum(), 7);
}

#[test]
fn test_value_reductions_by_construction() {
    let literals = |values: &[u64]| -> Vec<Packet> {
        values.iter().map(|v| literal(0, *v)).collect()
    };
    assert_eq!(
        operator(0, Operator::Sum, literals(&[1, 2, 3])).value(),
        Ok(6)
    );
    assert_eq!(
        operator(0, Operator::Product, literals(&[2, 3, 4])).value(),
        Ok(24)
    );
    assert_eq!(
        operator(0, Operator::Minimum, literals(&[9, 2, 5])).value(),
        Ok(2)
    );
    assert_eq!(
        operator(0, Operator::Maximum, literals(&[9, 2, 5])).value(),
        Ok(9)
    );
    // Neutral elements for the empty reductions.
    assert_eq!(operator(0, Operator::Sum, vec![]).value(), Ok(0));
    assert_eq!(operator(0, Operator::Product, vec![]).value(), Ok(1));
}

#[test]
fn test_comparison_requires_two_operands() {
    let one_operand = operator(0, Operator::GreaterThan, vec![literal(0, 1)]);
    assert_eq!(
        one_operand.value(),
        Err(DecodeError::ComparisonArity {
            op: Operator::GreaterThan,
            found: 1
        })
    );
    let empty_minimum = operator(0, Operator::Minimum, vec![]);
    assert_eq!(
        empty_minimum.value(),
        Err(DecodeError::EmptyOperator {
            op: Operator::Minimum
        })
    );
}

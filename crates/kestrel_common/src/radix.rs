//! Radix-encoded numeric literals converted to little-endian bit vectors.
//!
//! Memory initialization files and hex test vectors both carry numbers in
//! one of four radices. Values are decoded digit by digit so widths beyond
//! 64 bits work for every radix except decimal, which goes through `u128`.

use crate::logic::Logic;
use std::fmt;

/// A numeric radix accepted in literal values.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Radix {
    /// Base 2.
    Bin,
    /// Base 8.
    Oct,
    /// Base 10.
    Dec,
    /// Base 16.
    Hex,
}

impl Radix {
    /// Parses a radix keyword (`BIN`, `OCT`, `DEC`, `HEX`), case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "BIN" => Some(Radix::Bin),
            "OCT" => Some(Radix::Oct),
            "DEC" => Some(Radix::Dec),
            "HEX" => Some(Radix::Hex),
            _ => None,
        }
    }

    /// Returns the numeric base.
    pub fn base(self) -> u32 {
        match self {
            Radix::Bin => 2,
            Radix::Oct => 8,
            Radix::Dec => 10,
            Radix::Hex => 16,
        }
    }

    /// Bits contributed by one digit, or `None` for decimal.
    fn bits_per_digit(self) -> Option<usize> {
        match self {
            Radix::Bin => Some(1),
            Radix::Oct => Some(3),
            Radix::Hex => Some(4),
            Radix::Dec => None,
        }
    }
}

impl fmt::Display for Radix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Radix::Bin => write!(f, "BIN"),
            Radix::Oct => write!(f, "OCT"),
            Radix::Dec => write!(f, "DEC"),
            Radix::Hex => write!(f, "HEX"),
        }
    }
}

/// Errors produced while decoding a radix literal.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RadixError {
    /// The literal has no digits.
    #[error("empty numeric literal")]
    Empty,

    /// A character is not a digit of the declared radix.
    #[error("invalid {radix} digit '{digit}' in '{literal}'")]
    InvalidDigit {
        /// The literal being decoded.
        literal: String,
        /// The offending character.
        digit: char,
        /// The radix the literal was declared in.
        radix: Radix,
    },

    /// The literal needs more bits than the target width.
    #[error("value '{literal}' does not fit in {width} bits")]
    Overflow {
        /// The literal being decoded.
        literal: String,
        /// The target width in bits.
        width: usize,
    },
}

/// Decodes `literal` in `radix` into exactly `width` bits, least significant first.
pub fn parse_radix_bits(literal: &str, radix: Radix, width: usize) -> Result<Vec<Logic>, RadixError> {
    if literal.is_empty() {
        return Err(RadixError::Empty);
    }

    let raw = match radix.bits_per_digit() {
        Some(per_digit) => {
            let mut bits = Vec::with_capacity(literal.len() * per_digit);
            for digit in literal.chars().rev() {
                let value = digit
                    .to_digit(radix.base())
                    .ok_or_else(|| RadixError::InvalidDigit {
                        literal: literal.to_string(),
                        digit,
                        radix,
                    })?;
                for i in 0..per_digit {
                    bits.push((value >> i) & 1 == 1);
                }
            }
            bits
        }
        None => {
            let mut value: u128 = 0;
            for digit in literal.chars() {
                let d = digit.to_digit(10).ok_or_else(|| RadixError::InvalidDigit {
                    literal: literal.to_string(),
                    digit,
                    radix,
                })?;
                value = value
                    .checked_mul(10)
                    .and_then(|v| v.checked_add(u128::from(d)))
                    .ok_or_else(|| RadixError::Overflow {
                        literal: literal.to_string(),
                        width,
                    })?;
            }
            (0..128).map(|i| (value >> i) & 1 == 1).collect()
        }
    };

    if raw.iter().skip(width).any(|&bit| bit) {
        return Err(RadixError::Overflow {
            literal: literal.to_string(),
            width,
        });
    }

    let mut bits: Vec<Logic> = raw.into_iter().take(width).map(Logic::from_bool).collect();
    bits.resize(width, Logic::Zero);
    Ok(bits)
}

/// Interprets little-endian bits as an unsigned integer.
///
/// Returns `None` if any bit is unknown or the value needs more than 64 bits.
pub fn bits_to_u64(bits: &[Logic]) -> Option<u64> {
    let mut value = 0u64;
    for (i, bit) in bits.iter().enumerate() {
        match bit {
            Logic::One if i >= 64 => return None,
            Logic::One => value |= 1 << i,
            Logic::Zero => {}
            Logic::X => return None,
        }
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use Logic::{One, Zero, X};

    #[test]
    fn radix_names() {
        assert_eq!(Radix::from_name("hex"), Some(Radix::Hex));
        assert_eq!(Radix::from_name("BIN"), Some(Radix::Bin));
        assert_eq!(Radix::from_name("UNS"), None);
        assert_eq!(Radix::Oct.to_string(), "OCT");
    }

    #[test]
    fn hex_is_little_endian() {
        let bits = parse_radix_bits("A", Radix::Hex, 4).unwrap();
        assert_eq!(bits, vec![Zero, One, Zero, One]);
    }

    #[test]
    fn pads_to_width() {
        let bits = parse_radix_bits("1", Radix::Bin, 3).unwrap();
        assert_eq!(bits, vec![One, Zero, Zero]);
    }

    #[test]
    fn leading_zero_digits_fit() {
        // 0x0F needs 8 raw bits but only 4 significant ones
        let bits = parse_radix_bits("0F", Radix::Hex, 4).unwrap();
        assert_eq!(bits, vec![One; 4]);
    }

    #[test]
    fn decimal_and_octal() {
        assert_eq!(parse_radix_bits("6", Radix::Dec, 3).unwrap(), vec![Zero, One, One]);
        assert_eq!(parse_radix_bits("7", Radix::Oct, 3).unwrap(), vec![One, One, One]);
    }

    #[test]
    fn overflow_rejected() {
        let err = parse_radix_bits("10", Radix::Hex, 4).unwrap_err();
        assert_eq!(err.to_string(), "value '10' does not fit in 4 bits");
        assert!(parse_radix_bits("8", Radix::Dec, 3).is_err());
    }

    #[test]
    fn invalid_digit_rejected() {
        let err = parse_radix_bits("12", Radix::Bin, 4).unwrap_err();
        assert!(matches!(err, RadixError::InvalidDigit { digit: '2', .. }));
        assert_eq!(parse_radix_bits("", Radix::Hex, 4), Err(RadixError::Empty));
    }

    #[test]
    fn decode_unsigned() {
        assert_eq!(bits_to_u64(&[One, Zero, One]), Some(5));
        assert_eq!(bits_to_u64(&[]), Some(0));
        assert_eq!(bits_to_u64(&[One, X]), None);
    }
}

//! Three-state logic values with truth-table-based operators.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};
use std::str::FromStr;

/// A single logic value carried by a pin or net.
///
/// The three states are:
/// - `Zero`: logic low (driven 0)
/// - `One`: logic high (driven 1)
/// - `X`: unknown, either computed from unknown inputs or never driven
///
/// Each state has a signed code (`0`, `1`, `-1`) used by the value store,
/// which keeps values in atomic bytes. Any negative code decodes to `X`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[repr(i8)]
pub enum Logic {
    /// Logic low (0).
    Zero = 0,
    /// Logic high (1).
    One = 1,
    /// Unknown.
    #[default]
    X = -1,
}

impl Logic {
    /// Returns the signed storage code for this value.
    pub fn code(self) -> i8 {
        self as i8
    }

    /// Decodes a signed storage code. Negative and out-of-range codes map to `X`.
    pub fn from_code(code: i8) -> Self {
        match code {
            0 => Logic::Zero,
            1 => Logic::One,
            _ => Logic::X,
        }
    }

    /// Converts a `bool` to `One` or `Zero`.
    pub fn from_bool(value: bool) -> Self {
        if value {
            Logic::One
        } else {
            Logic::Zero
        }
    }

    /// Converts a character to a [`Logic`] value.
    ///
    /// Accepts '0', '1' and 'x'/'X'.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(Logic::Zero),
            '1' => Some(Logic::One),
            'x' | 'X' => Some(Logic::X),
            _ => None,
        }
    }

    /// Returns the character written to vector files (`0`, `1` or `x`).
    pub fn to_char(self) -> char {
        match self {
            Logic::Zero => '0',
            Logic::One => '1',
            Logic::X => 'x',
        }
    }

    /// Returns `true` for `Zero` and `One`.
    pub fn is_known(self) -> bool {
        self != Logic::X
    }

    /// Returns `Some(true)` for `One`, `Some(false)` for `Zero` and `None` for `X`.
    pub fn to_bool(self) -> Option<bool> {
        match self {
            Logic::Zero => Some(false),
            Logic::One => Some(true),
            Logic::X => None,
        }
    }
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Logic::Zero => write!(f, "0"),
            Logic::One => write!(f, "1"),
            Logic::X => write!(f, "X"),
        }
    }
}

/// Error returned when parsing a [`Logic`] from text fails.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid logic value '{0}' (expected 0, 1 or x)")]
pub struct ParseLogicError(pub String);

impl FromStr for Logic {
    type Err = ParseLogicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed {
            "0" => Ok(Logic::Zero),
            "1" => Ok(Logic::One),
            "x" | "X" | "-1" => Ok(Logic::X),
            _ => Err(ParseLogicError(trimmed.to_string())),
        }
    }
}

/// AND truth table:
/// ```text
///     0  1  X
/// 0 | 0  0  0
/// 1 | 0  1  X
/// X | 0  X  X
/// ```
impl BitAnd for Logic {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        use Logic::*;
        match (self, rhs) {
            (Zero, _) | (_, Zero) => Zero,
            (One, One) => One,
            _ => X,
        }
    }
}

/// OR truth table:
/// ```text
///     0  1  X
/// 0 | 0  1  X
/// 1 | 1  1  1
/// X | X  1  X
/// ```
impl BitOr for Logic {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        use Logic::*;
        match (self, rhs) {
            (One, _) | (_, One) => One,
            (Zero, Zero) => Zero,
            _ => X,
        }
    }
}

/// XOR truth table:
/// ```text
///     0  1  X
/// 0 | 0  1  X
/// 1 | 1  0  X
/// X | X  X  X
/// ```
impl BitXor for Logic {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self {
        use Logic::*;
        match (self, rhs) {
            (Zero, Zero) | (One, One) => Zero,
            (Zero, One) | (One, Zero) => One,
            _ => X,
        }
    }
}

/// NOT: `!0 = 1`, `!1 = 0`, `!X = X`
impl Not for Logic {
    type Output = Self;

    fn not(self) -> Self {
        use Logic::*;
        match self {
            Zero => One,
            One => Zero,
            X => X,
        }
    }
}

//! Test vectors: parsing, formatting, comparison and random generation.
//!
//! A vector file starts with a header naming its lines, followed by one row
//! per vector. Each row has one token per line: binary, most significant
//! bit first, or `0x`-prefixed hexadecimal.
//!
//! ```text
//! a b sel
//! 0X3 1 0
//! 0X1 x 1
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use kestrel_common::Logic;

use crate::engine::Engine;
use crate::error::SimError;
use crate::lines::{Line, Lines};

/// Warm-up cycles, per clock, before hold lines switch to their held value.
pub const HOLD_CYCLES_PER_CLOCK: i64 = 3;

/// The values of every line for one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestVector {
    /// One entry per line, least significant bit first.
    pub values: Vec<Vec<Logic>>,
}

impl TestVector {
    /// Parses one row of a vector file.
    pub fn parse(row: &str) -> Result<Self, SimError> {
        let values = row
            .split_whitespace()
            .map(parse_token)
            .collect::<Result<_, _>>()?;
        Ok(Self { values })
    }

    /// Samples the pins of `lines` at `cycle`.
    pub fn capture(lines: &Lines, engine: &Engine<'_>, cycle: i64) -> Self {
        let values = lines
            .iter()
            .map(|line| line.pins().map(|pin| engine.value(pin, cycle)).collect())
            .collect();
        Self { values }
    }

    /// Drives the pins of `lines` at `cycle`.
    ///
    /// Pins beyond the width of a line's value are driven to 0.
    pub fn apply(&self, lines: &Lines, engine: &Engine<'_>, cycle: i64) -> Result<(), SimError> {
        if self.values.len() != lines.len() {
            return Err(SimError::VectorShape {
                expected: lines.len(),
                found: self.values.len(),
            });
        }
        for (line, value) in lines.iter().zip(&self.values) {
            if line.is_empty() {
                return Err(SimError::EmptyLine(line.name.clone()));
            }
            for (bit, pin) in line.pins().enumerate() {
                engine.drive(pin, cycle, value.get(bit).copied().unwrap_or(Logic::Zero));
            }
        }
        Ok(())
    }

    /// Formats the vector as a row, without the trailing newline.
    pub fn format_line(&self) -> String {
        self.values
            .iter()
            .map(|bits| format_token(bits, "0X"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn parse_token(token: &str) -> Result<Vec<Logic>, SimError> {
    let malformed = |reason: String| SimError::MalformedVector {
        token: token.to_string(),
        reason,
    };
    let hex = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"));
    let Some(digits) = hex else {
        return token
            .chars()
            .rev()
            .map(|c| match c {
                '1' => Ok(Logic::One),
                '0' => Ok(Logic::Zero),
                'x' | 'X' => Ok(Logic::X),
                _ => Err(malformed(format!("'{c}' is not a binary digit"))),
            })
            .collect();
    };
    if digits.is_empty() {
        return Err(malformed("no hex digits".to_string()));
    }

    let mut bits = Vec::with_capacity(digits.len() * 4);
    for c in digits.chars().rev() {
        if c.eq_ignore_ascii_case(&'x') {
            bits.extend([Logic::X; 4]);
            continue;
        }
        let digit = c
            .to_digit(16)
            .ok_or_else(|| malformed(format!("'{c}' is not a hex digit")))?;
        bits.extend((0..4).map(|k| Logic::from_bool((digit >> k) & 1 == 1)));
    }
    Ok(bits)
}

/// Formats one line's bits: binary when any bit is unknown or there is a
/// single bit, otherwise `hex_prefix` followed by uppercase hex digits.
pub(crate) fn format_token(bits: &[Logic], hex_prefix: &str) -> String {
    if bits.len() == 1 || bits.contains(&Logic::X) {
        return bits.iter().rev().map(|b| b.to_char()).collect();
    }
    let digits = bits.len().div_ceil(4);
    let mut token = String::with_capacity(digits + hex_prefix.len());
    token.push_str(hex_prefix);
    for d in (0..digits).rev() {
        let nibble = bits[d * 4..]
            .iter()
            .take(4)
            .enumerate()
            .fold(0u32, |acc, (k, &b)| acc | (u32::from(b == Logic::One) << k));
        // nibble < 16
        token.push(char::from_digit(nibble, 16).unwrap_or('0').to_ascii_uppercase());
    }
    token
}

/// Outcome of comparing an output vector against its golden counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Every bit matches.
    Equal,
    /// Bits differ only where the golden vector has `x`.
    EqualWithDontCare,
    /// At least one bit differs.
    Different,
}

/// Compares `actual` against `expected`.
///
/// Lines of different width are compared on their common bits; the extra
/// high bits of the wider one must be 0.
pub fn compare_vectors(expected: &TestVector, actual: &TestVector) -> Comparison {
    if expected.values.len() != actual.values.len() {
        return Comparison::Different;
    }
    let mut result = Comparison::Equal;
    for (exp, act) in expected.values.iter().zip(&actual.values) {
        let common = exp.len().min(act.len());
        for (&e, &a) in exp[..common].iter().zip(&act[..common]) {
            if e == a {
                continue;
            }
            if e == Logic::X {
                result = Comparison::EqualWithDontCare;
            } else {
                return Comparison::Different;
            }
        }
        let longer = if exp.len() > common { exp } else { act };
        if longer[common..].iter().any(|&b| b != Logic::Zero) {
            return Comparison::Different;
        }
    }
    result
}

/// Seeded source of random input vectors.
pub struct RandomVectorGenerator {
    rng: StdRng,
    three_valued: bool,
    hold_high: Vec<String>,
    hold_low: Vec<String>,
    clocks: usize,
}

impl RandomVectorGenerator {
    /// Creates a generator.
    ///
    /// `clocks` is the number of clock inputs; it sets how long hold lines
    /// stay at their reset value.
    pub fn new(
        seed: u64,
        three_valued: bool,
        hold_high: &[String],
        hold_low: &[String],
        clocks: usize,
    ) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            three_valued,
            hold_high: hold_high.iter().map(|p| p.to_lowercase()).collect(),
            hold_low: hold_low.iter().map(|p| p.to_lowercase()).collect(),
            clocks,
        }
    }

    /// Generates the vector for `cycle`.
    pub fn generate(&mut self, lines: &Lines, cycle: i64) -> TestVector {
        let warm = cycle < HOLD_CYCLES_PER_CLOCK * self.clocks as i64;
        let values = lines
            .iter()
            .map(|line| {
                let held = if matches_any(line, &self.hold_high) {
                    Some(Logic::from_bool(!warm))
                } else if matches_any(line, &self.hold_low) {
                    Some(Logic::from_bool(warm))
                } else {
                    None
                };
                (0..line.width())
                    .map(|_| held.unwrap_or_else(|| self.random_bit()))
                    .collect()
            })
            .collect();
        TestVector { values }
    }

    fn random_bit(&mut self) -> Logic {
        if self.three_valued {
            match self.rng.gen_range(0..3) {
                0 => Logic::Zero,
                1 => Logic::One,
                _ => Logic::X,
            }
        } else {
            Logic::from_bool(self.rng.gen())
        }
    }
}

fn matches_any(line: &Line, patterns: &[String]) -> bool {
    if patterns.is_empty() {
        return false;
    }
    let name = line.name.to_lowercase();
    patterns.iter().any(|p| name.contains(p.as_str()))
}

/// Reads vectors from a vector file, checking its header first.
pub struct VectorReader<R> {
    reader: R,
    width: usize,
    read: u64,
}

impl<R: BufRead> VectorReader<R> {
    /// Reads the header and checks that it names `lines` in order.
    pub fn new(mut reader: R, lines: &Lines) -> Result<Self, SimError> {
        let mut header = String::new();
        reader.read_line(&mut header)?;
        let found = header.split_whitespace().collect::<Vec<_>>().join(" ");
        let expected = lines.header();
        if found != expected {
            return Err(SimError::VectorHeaderMismatch { expected, found });
        }
        Ok(Self {
            reader,
            width: lines.len(),
            read: 0,
        })
    }

    /// Number of vectors read so far.
    pub fn read(&self) -> u64 {
        self.read
    }

    /// Reads the next vector, skipping blank and `#` lines.
    ///
    /// With no lines to drive, each row yields an empty vector.
    pub fn next_vector(&mut self) -> Result<Option<TestVector>, SimError> {
        let mut row = String::new();
        loop {
            row.clear();
            if self.reader.read_line(&mut row)? == 0 {
                return Ok(None);
            }
            if is_vector_row(&row) {
                break;
            }
        }
        self.read += 1;
        if self.width == 0 {
            return Ok(Some(TestVector::default()));
        }
        TestVector::parse(&row).map(Some)
    }
}

impl VectorReader<BufReader<File>> {
    /// Opens a vector file.
    pub fn open(path: &Path, lines: &Lines) -> Result<Self, SimError> {
        Self::new(BufReader::new(File::open(path)?), lines)
    }
}

pub(crate) fn is_vector_row(row: &str) -> bool {
    let row = row.trim();
    !row.is_empty() && !row.starts_with('#')
}

/// Counts the vectors in a file: every non-blank, non-comment row after
/// the header.
pub fn count_vectors(path: &Path) -> Result<u64, SimError> {
    let reader = BufReader::new(File::open(path)?);
    let mut count = 0;
    for row in reader.lines().skip(1) {
        if is_vector_row(&row?) {
            count += 1;
        }
    }
    Ok(count)
}

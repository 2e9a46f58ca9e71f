//! Bit-level arithmetic on known operands, least significant bit first.
//!
//! Callers resolve `X` before calling in: any unknown operand bit makes the
//! whole arithmetic result unknown.

use kestrel_common::Logic;

/// Converts `values` to booleans, or `None` if any is unknown.
pub fn known_bits(values: &[Logic]) -> Option<Vec<bool>> {
    values.iter().map(|v| v.to_bool()).collect()
}

/// Ripple-carry sum of `a`, `b` and `carry`, `max(|a|, |b|) + 1` bits wide.
///
/// The shorter operand is zero-extended.
pub fn ripple_add(a: &[bool], b: &[bool], carry: bool) -> Vec<bool> {
    let width = a.len().max(b.len());
    let mut sum = Vec::with_capacity(width + 1);
    let mut carry = carry;
    for i in 0..width {
        let x = a.get(i).copied().unwrap_or(false);
        let y = b.get(i).copied().unwrap_or(false);
        sum.push(x ^ y ^ carry);
        carry = (x & y) | (x & carry) | (y & carry);
    }
    sum.push(carry);
    sum
}

/// Inverted operand plus `carry`, `|a| + 1` bits wide.
///
/// With `carry` set this is the two's-complement negation of `a`.
pub fn negate(a: &[bool], carry: bool) -> Vec<bool> {
    let inverted: Vec<bool> = a.iter().map(|&bit| !bit).collect();
    ripple_add(&inverted, &[], carry)
}

/// Schoolbook product of `a` and `b`, `|a| + |b|` bits wide.
pub fn multiply(a: &[bool], b: &[bool]) -> Vec<bool> {
    let mut product = vec![false; a.len() + b.len()];
    for (shift, &y) in b.iter().enumerate() {
        if !y {
            continue;
        }
        let mut carry = false;
        for (i, &x) in a.iter().enumerate() {
            let p = product[shift + i];
            product[shift + i] = p ^ x ^ carry;
            carry = (p & x) | (p & carry) | (x & carry);
        }
        let mut k = shift + a.len();
        while carry && k < product.len() {
            let p = product[k];
            product[k] = p ^ carry;
            carry = p & carry;
            k += 1;
        }
    }
    product
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(value: u64, width: usize) -> Vec<bool> {
        (0..width).map(|i| (value >> i) & 1 == 1).collect()
    }

    fn value(bits: &[bool]) -> u64 {
        bits.iter()
            .enumerate()
            .map(|(i, &b)| (b as u64) << i)
            .sum()
    }

    #[test]
    fn add_with_carry_out() {
        let sum = ripple_add(&bits(0b1111, 4), &bits(0b0001, 4), false);
        assert_eq!(sum.len(), 5);
        assert_eq!(value(&sum), 16);
    }

    #[test]
    fn add_uneven_widths() {
        let sum = ripple_add(&bits(5, 3), &bits(3, 2), true);
        assert_eq!(sum.len(), 4);
        assert_eq!(value(&sum), 9);
    }

    #[test]
    fn negation_wraps() {
        // -3 in 4 bits is 1101; the carry out is set only for zero
        let neg = negate(&bits(3, 4), true);
        assert_eq!(value(&neg[..4]), 0b1101);
        assert!(!neg[4]);
        let zero = negate(&bits(0, 4), true);
        assert_eq!(value(&zero), 0b10000);
    }

    #[test]
    fn negation_without_carry_is_complement() {
        let inv = negate(&bits(3, 4), false);
        assert_eq!(value(&inv), 0b1100);
    }

    #[test]
    fn products() {
        for (x, y) in [(0, 7), (3, 5), (15, 15), (9, 6)] {
            let p = multiply(&bits(x, 4), &bits(y, 4));
            assert_eq!(p.len(), 8);
            assert_eq!(value(&p), x * y, "{x} * {y}");
        }
    }

    #[test]
    fn unknown_operand() {
        assert_eq!(known_bits(&[Logic::One, Logic::Zero]), Some(vec![true, false]));
        assert_eq!(known_bits(&[Logic::One, Logic::X]), None);
    }
}

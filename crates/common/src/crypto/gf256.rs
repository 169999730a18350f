//! Arithmetic over GF(2^8)
//!
//! Elements are bytes, the field is reduced by the AES polynomial
//! `x^8 + x^4 + x^3 + x + 1` (0x11B). Multiplication never branches on its
//! operands, inversion is an exponentiation to 254 through a fixed addition
//! chain, and division masks its result through a constant-time select.

use subtle::{ConditionallySelectable, ConstantTimeEq};

/// Addition and subtraction are the same operation in characteristic 2
#[inline]
pub fn add(a: u8, b: u8) -> u8 {
    a ^ b
}

/// Carry-less multiplication with per-bit reduction, most significant bit first
#[inline]
pub fn mul(a: u8, b: u8) -> u8 {
    let mut r: u8 = 0;
    for i in (0..8).rev() {
        let bit = (b >> i) & 1;
        r = (bit.wrapping_neg() & a) ^ ((r >> 7).wrapping_neg() & 0x1b) ^ r.wrapping_add(r);
    }
    r
}

/// Multiplicative inverse, computed as `a^254`
///
/// `inverse(0)` is `0`, which callers never rely on: interpolation only
/// divides by differences of distinct x-coordinates.
pub fn inverse(a: u8) -> u8 {
    let mut b = mul(a, a); // a^2
    let mut c = mul(a, b); // a^3
    b = mul(c, c); // a^6
    b = mul(b, b); // a^12
    c = mul(b, c); // a^15
    b = mul(b, b); // a^24
    b = mul(b, b); // a^48
    b = mul(b, c); // a^63
    b = mul(b, b); // a^126
    b = mul(a, b); // a^127
    mul(b, b) // a^254
}

/// Division `a / b`; a zero numerator yields zero without a data-dependent branch
pub fn div(a: u8, b: u8) -> u8 {
    let quotient = mul(a, inverse(b));
    u8::conditional_select(&quotient, &0, a.ct_eq(&0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_xor() {
        assert_eq!(add(0x57, 0x83), 0xd4);
        assert_eq!(add(0xff, 0xff), 0);
    }

    #[test]
    fn test_mul_known_products() {
        // FIPS-197 worked examples
        assert_eq!(mul(0x57, 0x83), 0xc1);
        assert_eq!(mul(0x57, 0x13), 0xfe);
        assert_eq!(mul(0x53, 0xca), 0x01);
    }

    #[test]
    fn test_mul_identity_and_zero() {
        for a in 0..=255u8 {
            assert_eq!(mul(a, 1), a);
            assert_eq!(mul(1, a), a);
            assert_eq!(mul(a, 0), 0);
        }
    }

    #[test]
    fn test_mul_commutes() {
        for a in (0..=255u8).step_by(7) {
            for b in (0..=255u8).step_by(11) {
                assert_eq!(mul(a, b), mul(b, a));
            }
        }
    }

    #[test]
    fn test_inverse_for_every_nonzero_element() {
        for a in 1..=255u8 {
            assert_eq!(mul(a, inverse(a)), 1, "inverse failed for {a:#04x}");
        }
        assert_eq!(inverse(0), 0);
    }

    #[test]
    fn test_div() {
        assert_eq!(div(0, 0x42), 0);
        for a in 1..=255u8 {
            assert_eq!(div(a, a), 1);
            assert_eq!(div(mul(a, 0x1d), 0x1d), a);
        }
    }
}

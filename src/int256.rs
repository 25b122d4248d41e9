//! 256-bit integer helpers.
//!
//! `Int256`/`UInt256` and `Decimal256` travel on the wire as 32 bytes of
//! little-endian two's complement. Rust has no native 256-bit integer, so
//! this module keeps the raw byte representation and implements just the
//! arithmetic the codec needs: sign handling, widening from 128-bit, and
//! decimal string conversion via limb-wise multiply/divide by ten.

use crate::{
    Error,
    Result,
};
use std::fmt;

/// Unsigned 256-bit integer stored as little-endian bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct U256(pub [u8; 32]);

/// Signed 256-bit integer stored as little-endian two's complement bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct I256(pub [u8; 32]);

fn to_limbs(bytes: &[u8; 32]) -> [u64; 4] {
    let mut limbs = [0u64; 4];
    for (i, limb) in limbs.iter_mut().enumerate() {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[i * 8..i * 8 + 8]);
        *limb = u64::from_le_bytes(raw);
    }
    limbs
}

fn from_limbs(limbs: &[u64; 4]) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    for (i, limb) in limbs.iter().enumerate() {
        bytes[i * 8..i * 8 + 8].copy_from_slice(&limb.to_le_bytes());
    }
    bytes
}

fn limbs_is_zero(limbs: &[u64; 4]) -> bool {
    limbs.iter().all(|&l| l == 0)
}

/// limbs = limbs * mul + add; returns false on overflow.
fn limbs_mul_add(limbs: &mut [u64; 4], mul: u64, add: u64) -> bool {
    let mut carry = add as u128;
    for limb in limbs.iter_mut() {
        let product = (*limb as u128) * (mul as u128) + carry;
        *limb = product as u64;
        carry = product >> 64;
    }
    carry == 0
}

/// limbs = limbs / div; returns the remainder.
fn limbs_divmod(limbs: &mut [u64; 4], div: u64) -> u64 {
    let mut rem: u128 = 0;
    for limb in limbs.iter_mut().rev() {
        let cur = (rem << 64) | (*limb as u128);
        *limb = (cur / div as u128) as u64;
        rem = cur % div as u128;
    }
    rem as u64
}

fn negate(bytes: &[u8; 32]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut carry = 1u16;
    for (i, b) in bytes.iter().enumerate() {
        let v = (!b as u16) + carry;
        out[i] = v as u8;
        carry = v >> 8;
    }
    out
}

impl U256 {
    /// The zero value.
    pub const ZERO: U256 = U256([0u8; 32]);

    /// Widen a u128 into the low half.
    pub fn from_u128(v: u128) -> Self {
        let mut bytes = [0u8; 32];
        bytes[..16].copy_from_slice(&v.to_le_bytes());
        U256(bytes)
    }

    /// Narrow back to u128 if the high half is zero.
    pub fn to_u128(&self) -> Option<u128> {
        if self.0[16..].iter().any(|&b| b != 0) {
            return None;
        }
        let mut raw = [0u8; 16];
        raw.copy_from_slice(&self.0[..16]);
        Some(u128::from_le_bytes(raw))
    }

    /// Whether the value is zero.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Parse from a decimal digit string.
    pub fn from_decimal_str(s: &str) -> Result<Self> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::Protocol(format!(
                "Invalid UInt256 literal: {:?}",
                s
            )));
        }
        let mut limbs = [0u64; 4];
        for b in s.bytes() {
            if !limbs_mul_add(&mut limbs, 10, (b - b'0') as u64) {
                return Err(Error::Protocol(format!(
                    "UInt256 literal out of range: {}",
                    s
                )));
            }
        }
        Ok(U256(from_limbs(&limbs)))
    }
}

impl fmt::Display for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut limbs = to_limbs(&self.0);
        if limbs_is_zero(&limbs) {
            return f.write_str("0");
        }
        let mut digits = Vec::with_capacity(78);
        while !limbs_is_zero(&limbs) {
            let rem = limbs_divmod(&mut limbs, 10);
            digits.push(b'0' + rem as u8);
        }
        digits.reverse();
        f.write_str(std::str::from_utf8(&digits).expect("ascii digits"))
    }
}

impl I256 {
    /// The zero value.
    pub const ZERO: I256 = I256([0u8; 32]);

    /// Sign-extend an i128 into 256 bits.
    pub fn from_i128(v: i128) -> Self {
        let fill = if v < 0 { 0xFF } else { 0x00 };
        let mut bytes = [fill; 32];
        bytes[..16].copy_from_slice(&v.to_le_bytes());
        I256(bytes)
    }

    /// Narrow back to i128 if the value fits.
    pub fn to_i128(&self) -> Option<i128> {
        let mut raw = [0u8; 16];
        raw.copy_from_slice(&self.0[..16]);
        let low = i128::from_le_bytes(raw);
        let fill = if low < 0 { 0xFF } else { 0x00 };
        if self.0[16..].iter().any(|&b| b != fill) {
            return None;
        }
        Some(low)
    }

    /// Whether the sign bit is set.
    pub fn is_negative(&self) -> bool {
        self.0[31] & 0x80 != 0
    }

    /// Whether the value is zero.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Two's-complement negation (wrapping at the type boundary).
    pub fn wrapping_neg(&self) -> Self {
        I256(negate(&self.0))
    }

    /// The unsigned magnitude of the value.
    pub fn unsigned_abs(&self) -> U256 {
        if self.is_negative() {
            U256(negate(&self.0))
        } else {
            U256(self.0)
        }
    }

    /// Parse from a decimal digit string with optional leading `-`.
    pub fn from_decimal_str(s: &str) -> Result<Self> {
        let (neg, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let magnitude = U256::from_decimal_str(digits)
            .map_err(|_| Error::Protocol(format!("Invalid Int256 literal: {:?}", s)))?;
        // Magnitude must fit in 255 bits (or be exactly -2^255).
        let value = I256(magnitude.0);
        if neg {
            let negated = value.wrapping_neg();
            if !negated.is_negative() && !negated.is_zero() {
                return Err(Error::Protocol(format!(
                    "Int256 literal out of range: {}",
                    s
                )));
            }
            Ok(negated)
        } else {
            if value.is_negative() {
                return Err(Error::Protocol(format!(
                    "Int256 literal out of range: {}",
                    s
                )));
            }
            Ok(value)
        }
    }
}

impl fmt::Display for I256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            write!(f, "-{}", self.unsigned_abs())
        } else {
            write!(f, "{}", U256(self.0))
        }
    }
}

impl From<i128> for I256 {
    fn from(v: i128) -> Self {
        I256::from_i128(v)
    }
}

impl From<u128> for U256 {
    fn from(v: u128) -> Self {
        U256::from_u128(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u256_roundtrip_small() {
        for v in [0u128, 1, 9, 10, 255, u64::MAX as u128, u128::MAX] {
            let wide = U256::from_u128(v);
            assert_eq!(wide.to_u128(), Some(v));
            assert_eq!(wide.to_string(), v.to_string());
            assert_eq!(U256::from_decimal_str(&v.to_string()).unwrap(), wide);
        }
    }

    #[test]
    fn test_u256_beyond_u128() {
        // 2^128 = u128::MAX + 1
        let s = "340282366920938463463374607431768211456";
        let wide = U256::from_decimal_str(s).unwrap();
        assert_eq!(wide.to_u128(), None);
        assert_eq!(wide.to_string(), s);
        assert_eq!(wide.0[16], 1);
        assert!(wide.0[..16].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_u256_overflow_rejected() {
        // 2^256 does not fit.
        let s = "115792089237316195423570985008687907853269984665640564039457584007913129639936";
        assert!(U256::from_decimal_str(s).is_err());
        // 2^256 - 1 does.
        let max = "115792089237316195423570985008687907853269984665640564039457584007913129639935";
        let wide = U256::from_decimal_str(max).unwrap();
        assert_eq!(wide.0, [0xFF; 32]);
        assert_eq!(wide.to_string(), max);
    }

    #[test]
    fn test_i256_sign_extension() {
        for v in [0i128, 1, -1, 42, -42, i128::MIN, i128::MAX] {
            let wide = I256::from_i128(v);
            assert_eq!(wide.to_i128(), Some(v));
            assert_eq!(wide.is_negative(), v < 0);
            assert_eq!(wide.to_string(), v.to_string());
            assert_eq!(I256::from_decimal_str(&v.to_string()).unwrap(), wide);
        }
    }

    #[test]
    fn test_i256_negate() {
        let one = I256::from_i128(1);
        let minus_one = one.wrapping_neg();
        assert_eq!(minus_one.0, [0xFF; 32]);
        assert_eq!(minus_one.wrapping_neg(), one);
    }

    #[test]
    fn test_i256_range_limits() {
        // -2^255 is representable, 2^255 is not.
        let min = "-57896044618658097711785492504343953926634992332820282019728792003956564819968";
        let wide = I256::from_decimal_str(min).unwrap();
        assert!(wide.is_negative());
        assert_eq!(wide.to_string(), min);
        assert!(I256::from_decimal_str(&min[1..]).is_err());
    }
}

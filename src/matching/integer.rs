//! Order-preserving byte encoding for arbitrary-precision integers, and
//! the INTEGER matching rules built on it.
//!
//! The encoding sorts byte-lexicographically in numeric order, so a single
//! index serves both equality and ordering filters. Layout:
//!
//! - header: first byte carries the sign flag (bit 7, set for
//!   non-negative), a 3-bit width selector (bits 6-4) and the top 4 bits
//!   of the magnitude byte-length; the selector adds 0-4 further length
//!   bytes, giving usable length fields of 4, 12, 20, 28 or 31 bits, the
//!   smallest that fits;
//! - body: the minimal big-endian magnitude (no leading zero byte; zero
//!   encodes with an empty magnitude).
//!
//! Negative numbers are encoded as their magnitude and then bit-inverted
//! wholesale, which reverses their relative order and places them below
//! every non-negative encoding.

use num_bigint::{BigInt, Sign};

use crate::error::{DecodeError, DecodeResult};
use crate::matching::rule::{DefaultEqualityRule, DefaultOrderingRule, utf8};

/// Maximum encodable magnitude length: 31 bits.
const MAX_MAGNITUDE_LEN: u64 = (1 << 31) - 1;

/// Encode an integer so byte order equals numeric order.
pub fn encode_big_integer(value: &BigInt) -> Vec<u8> {
    let negative = value.sign() == Sign::Minus;
    let magnitude = match value.sign() {
        Sign::NoSign => Vec::new(),
        _ => value.magnitude().to_bytes_be(),
    };
    debug_assert!((magnitude.len() as u64) <= MAX_MAGNITUDE_LEN);

    let len = magnitude.len() as u64;
    let mut encoded = Vec::with_capacity(magnitude.len() + 5);
    if len < 1 << 4 {
        encoded.push(0x80 | len as u8);
    } else if len < 1 << 12 {
        encoded.push(0x80 | 0x10 | (len >> 8) as u8);
        encoded.push(len as u8);
    } else if len < 1 << 20 {
        encoded.push(0x80 | 0x20 | (len >> 16) as u8);
        encoded.push((len >> 8) as u8);
        encoded.push(len as u8);
    } else if len < 1 << 28 {
        encoded.push(0x80 | 0x30 | (len >> 24) as u8);
        encoded.push((len >> 16) as u8);
        encoded.push((len >> 8) as u8);
        encoded.push(len as u8);
    } else {
        encoded.push(0x80 | 0x40 | (len >> 32) as u8);
        encoded.push((len >> 24) as u8);
        encoded.push((len >> 16) as u8);
        encoded.push((len >> 8) as u8);
        encoded.push(len as u8);
    }
    encoded.extend_from_slice(&magnitude);

    if negative {
        for byte in &mut encoded {
            *byte ^= 0xFF;
        }
    }
    encoded
}

/// Decode an encoding produced by [`encode_big_integer`].
pub fn decode_big_integer(encoded: &[u8]) -> DecodeResult<BigInt> {
    let invalid = || DecodeError::InvalidInteger {
        value: crate::matching::rule::hex_string(encoded),
    };

    let first = *encoded.first().ok_or_else(invalid)?;
    let negative = first & 0x80 == 0;
    let buf: Vec<u8> = if negative {
        encoded.iter().map(|b| b ^ 0xFF).collect()
    } else {
        encoded.to_vec()
    };

    let selector = ((buf[0] >> 4) & 0x07) as usize;
    if selector > 4 || buf.len() < 1 + selector {
        return Err(invalid());
    }
    let mut len = (buf[0] & 0x0F) as u64;
    for &byte in &buf[1..=selector] {
        len = (len << 8) | byte as u64;
    }
    let magnitude = &buf[1 + selector..];
    if magnitude.len() as u64 != len {
        return Err(invalid());
    }

    let value = BigInt::from_bytes_be(Sign::Plus, magnitude);
    Ok(if negative { -value } else { value })
}

/// Encode a machine integer with the same layout.
pub fn encode_i64(value: i64) -> Vec<u8> {
    encode_big_integer(&BigInt::from(value))
}

/// Decode an encoding known to fit a machine integer.
pub fn decode_i64(encoded: &[u8]) -> DecodeResult<i64> {
    let value = decode_big_integer(encoded)?;
    i64::try_from(&value).map_err(|_| DecodeError::InvalidInteger {
        value: value.to_string(),
    })
}

/// Parse an LDAP INTEGER string and normalize it to the sortable encoding.
pub(crate) fn normalize_integer(value: &[u8]) -> DecodeResult<Vec<u8>> {
    let text = utf8(value)?.trim();
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DecodeError::InvalidInteger {
            value: text.to_string(),
        });
    }
    let parsed = BigInt::parse_bytes(text.as_bytes(), 10).ok_or_else(|| {
        DecodeError::InvalidInteger {
            value: text.to_string(),
        }
    })?;
    Ok(encode_big_integer(&parsed))
}

/// `integerMatch` (2.5.13.14).
pub fn integer_equality_rule() -> DefaultEqualityRule {
    DefaultEqualityRule::new("integerMatch", normalize_integer)
}

/// `integerOrderingMatch` (2.5.13.15). Shares the equality rule's index;
/// the encoding already sorts numerically.
pub fn integer_ordering_rule() -> DefaultOrderingRule {
    DefaultOrderingRule::sharing_equality_index("integerMatch", normalize_integer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cmp::Ordering;

    fn check_pair(a: &BigInt, b: &BigInt) {
        let ea = encode_big_integer(a);
        let eb = encode_big_integer(b);
        assert_eq!(
            ea.cmp(&eb),
            a.cmp(b),
            "byte order disagrees with numeric order for {a} vs {b}"
        );
    }

    #[test]
    fn test_round_trip() {
        for v in [-1_000_000i64, -256, -1, 0, 1, 15, 16, 255, 1 << 40] {
            let value = BigInt::from(v);
            assert_eq!(decode_big_integer(&encode_big_integer(&value)).unwrap(), value);
        }
    }

    #[test]
    fn test_ordering_small_values() {
        let values: Vec<BigInt> = (-70i64..70).map(BigInt::from).collect();
        for pair in values.windows(2) {
            check_pair(&pair[0], &pair[1]);
        }
    }

    #[test]
    fn test_ordering_across_length_thresholds() {
        // Magnitude byte lengths straddling each header width: 15/16 bytes
        // exercise the 4->12 bit transition, 4095/4096 the 12->20 bit one.
        for bytes in [15usize, 16, 4095, 4096] {
            // Smallest and largest magnitudes of exactly `bytes` bytes,
            // and their neighbors one byte shorter and longer.
            let smallest = BigInt::from(1) << (8 * (bytes - 1));
            let largest = (BigInt::from(1) << (8 * bytes)) - 1;
            let below = &smallest - 1;
            check_pair(&below, &smallest);
            check_pair(&smallest, &largest);
            check_pair(&largest, &(&largest + 1));
            check_pair(&(-&smallest), &(-&below));
            check_pair(&(-&smallest), &smallest);
        }
    }

    #[test]
    fn test_negatives_sort_below_non_negatives() {
        let neg = encode_big_integer(&BigInt::from(-1));
        let zero = encode_big_integer(&BigInt::from(0));
        let pos = encode_big_integer(&BigInt::from(1));
        assert!(neg < zero);
        assert!(zero < pos);
        assert_eq!(zero, vec![0x80]);
    }

    #[test]
    fn test_normalize_integer_strings() {
        assert_eq!(normalize_integer(b"0").unwrap(), encode_i64(0));
        assert_eq!(normalize_integer(b"-42").unwrap(), encode_i64(-42));
        assert_eq!(normalize_integer(b" 123 ").unwrap(), encode_i64(123));
        assert!(normalize_integer(b"").is_err());
        assert!(normalize_integer(b"+5").is_err());
        assert!(normalize_integer(b"12a").is_err());
        assert!(normalize_integer(b"-").is_err());
    }

    #[test]
    fn test_i64_round_trip() {
        for v in [i64::MIN, -1, 0, 1, i64::MAX] {
            assert_eq!(decode_i64(&encode_i64(v)).unwrap(), v);
        }
    }

    proptest! {
        #[test]
        fn prop_order_preserved(a in any::<i128>(), b in any::<i128>()) {
            let (ba, bb) = (BigInt::from(a), BigInt::from(b));
            let cmp = encode_big_integer(&ba).cmp(&encode_big_integer(&bb));
            prop_assert_eq!(cmp, ba.cmp(&bb));
            if cmp == Ordering::Equal {
                prop_assert_eq!(a, b);
            }
        }

        #[test]
        fn prop_round_trip(a in any::<i128>()) {
            let value = BigInt::from(a);
            prop_assert_eq!(decode_big_integer(&encode_big_integer(&value)).unwrap(), value);
        }
    }
}

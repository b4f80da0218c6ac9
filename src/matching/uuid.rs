//! UUID canonicalization, hashing, and the UUID matching rules.
//!
//! The canonical textual form is exactly 36 characters: 32 hex digits with
//! dashes at offsets 8, 13, 18 and 23. Normalization packs the digits into
//! the raw 16 bytes. The equality index stores a folded 4-byte hash;
//! collisions are expected and filtered by the exact comparison, never
//! trusted as authoritative.

use uuid::Uuid;

use crate::error::{DecodeError, DecodeResult};
use crate::index::{Indexer, IndexingOptions};
use crate::matching::rule::{
    Assertion, EqualityAssertion, MatchingRuleImpl, OrderingAssertion, OrderingOp, hex_string,
    utf8,
};
use crate::schema::Schema;

const DASH_POSITIONS: [usize; 4] = [8, 13, 18, 23];

/// Parse the canonical 36-character form into the packed 16 bytes,
/// identifying the offending position on failure.
pub fn normalize_uuid(value: &[u8]) -> DecodeResult<Vec<u8>> {
    let text = utf8(value)?;
    if text.chars().count() != 36 {
        return Err(DecodeError::InvalidUuidLength {
            value: text.to_string(),
            length: text.chars().count(),
        });
    }

    let mut bytes = Vec::with_capacity(16);
    let mut pending: Option<u32> = None;
    for (position, c) in text.chars().enumerate() {
        if DASH_POSITIONS.contains(&position) {
            if c != '-' {
                return Err(DecodeError::InvalidUuid {
                    value: text.to_string(),
                    position,
                    character: c,
                });
            }
            continue;
        }
        let digit = c.to_digit(16).ok_or_else(|| DecodeError::InvalidUuid {
            value: text.to_string(),
            position,
            character: c,
        })?;
        match pending.take() {
            Some(hi) => bytes.push(((hi << 4) | digit) as u8),
            None => pending = Some(digit),
        }
    }
    Ok(bytes)
}

/// Render the packed 16 bytes back to the canonical lowercase text.
pub fn canonical_uuid_text(normalized: &[u8]) -> Option<String> {
    let bytes: [u8; 16] = normalized.try_into().ok()?;
    Some(Uuid::from_bytes(bytes).hyphenated().to_string())
}

/// Fold the 16 bytes to the 4-byte equality index key: XOR of the two
/// big-endian 64-bit words, then XOR of its two 32-bit halves.
pub fn uuid_index_key(normalized: &[u8]) -> Option<[u8; 4]> {
    let bytes: [u8; 16] = normalized.try_into().ok()?;
    let hi = u64::from_be_bytes(bytes[..8].try_into().unwrap());
    let lo = u64::from_be_bytes(bytes[8..].try_into().unwrap());
    let folded = hi ^ lo;
    let key = (folded >> 32) as u32 ^ folded as u32;
    Some(key.to_be_bytes())
}

fn hashed_key_normalizer(value: &[u8]) -> DecodeResult<Vec<u8>> {
    let normalized = normalize_uuid(value)?;
    // Normalization always yields 16 bytes, so the fold cannot fail.
    Ok(uuid_index_key(&normalized).unwrap_or_default().to_vec())
}

/// `uuidMatch` (1.3.6.1.1.16.2).
#[derive(Debug)]
pub struct UuidEqualityRule;

impl UuidEqualityRule {
    const INDEX_ID: &'static str = "uuidMatch";
}

impl MatchingRuleImpl for UuidEqualityRule {
    fn normalize_attribute_value(&self, _schema: &Schema, value: &[u8]) -> DecodeResult<Vec<u8>> {
        normalize_uuid(value)
    }

    fn get_assertion(&self, schema: &Schema, value: &[u8]) -> DecodeResult<Assertion> {
        let normalized = self.normalize_attribute_value(schema, value)?;
        let key = uuid_index_key(&normalized).unwrap_or_default().to_vec();
        Ok(Assertion::Equality(EqualityAssertion::indexed(
            normalized,
            Self::INDEX_ID,
            key,
        )))
    }

    fn create_indexers(&self, _options: &IndexingOptions) -> Vec<Box<dyn Indexer>> {
        vec![Box::new(UuidIndexer {
            index_id: Self::INDEX_ID,
            normalizer: hashed_key_normalizer,
        })]
    }
}

/// `uuidOrderingMatch` (1.3.6.1.1.16.3). Byte order over the packed form;
/// the hashed equality index cannot serve ranges, so this rule keeps its
/// own order-preserving index.
#[derive(Debug)]
pub struct UuidOrderingRule;

impl UuidOrderingRule {
    const INDEX_ID: &'static str = "uuidOrderingMatch";

    fn assertion(&self, value: &[u8], op: OrderingOp) -> DecodeResult<Assertion> {
        let normalized = normalize_uuid(value)?;
        Ok(Assertion::Ordering(OrderingAssertion::new(
            Self::INDEX_ID,
            normalized,
            op,
        )))
    }
}

impl MatchingRuleImpl for UuidOrderingRule {
    fn normalize_attribute_value(&self, _schema: &Schema, value: &[u8]) -> DecodeResult<Vec<u8>> {
        normalize_uuid(value)
    }

    fn get_assertion(&self, _schema: &Schema, value: &[u8]) -> DecodeResult<Assertion> {
        self.assertion(value, OrderingOp::LessThan)
    }

    fn get_greater_or_equal_assertion(
        &self,
        _schema: &Schema,
        value: &[u8],
    ) -> DecodeResult<Assertion> {
        self.assertion(value, OrderingOp::GreaterOrEqual)
    }

    fn get_less_or_equal_assertion(
        &self,
        _schema: &Schema,
        value: &[u8],
    ) -> DecodeResult<Assertion> {
        self.assertion(value, OrderingOp::LessOrEqual)
    }

    fn create_indexers(&self, _options: &IndexingOptions) -> Vec<Box<dyn Indexer>> {
        vec![Box::new(UuidIndexer {
            index_id: Self::INDEX_ID,
            normalizer: normalize_uuid,
        })]
    }
}

/// Indexer rendering keys in canonical UUID text when they are full
/// UUIDs, falling back to hex for folded hash keys.
struct UuidIndexer {
    index_id: &'static str,
    normalizer: fn(&[u8]) -> DecodeResult<Vec<u8>>,
}

impl Indexer for UuidIndexer {
    fn index_id(&self) -> &str {
        self.index_id
    }

    fn create_keys(
        &self,
        _schema: &Schema,
        value: &[u8],
        keys: &mut Vec<Vec<u8>>,
    ) -> DecodeResult<()> {
        keys.push((self.normalizer)(value)?);
        Ok(())
    }

    fn key_to_human_readable_string(&self, key: &[u8]) -> String {
        canonical_uuid_text(key).unwrap_or_else(|| hex_string(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "f81d4fae-7dec-11d0-a765-00a0c91e6bf6";

    #[test]
    fn test_normalize_packs_16_bytes() {
        let normalized = normalize_uuid(SAMPLE.as_bytes()).unwrap();
        assert_eq!(normalized.len(), 16);
        assert_eq!(normalized[0], 0xf8);
        assert_eq!(normalized[15], 0xf6);
    }

    #[test]
    fn test_case_insensitive() {
        let upper = normalize_uuid(SAMPLE.to_uppercase().as_bytes()).unwrap();
        let lower = normalize_uuid(SAMPLE.as_bytes()).unwrap();
        assert_eq!(upper, lower);
    }

    #[test]
    fn test_round_trip() {
        let normalized = normalize_uuid(SAMPLE.as_bytes()).unwrap();
        let text = canonical_uuid_text(&normalized).unwrap();
        assert_eq!(text, SAMPLE);
        assert_eq!(normalize_uuid(text.as_bytes()).unwrap(), normalized);
    }

    #[test]
    fn test_wrong_length_rejected() {
        let err = normalize_uuid(b"f81d4fae").unwrap_err();
        assert!(matches!(
            err,
            DecodeError::InvalidUuidLength { length: 8, .. }
        ));
    }

    #[test]
    fn test_misplaced_dash_rejected() {
        let bad = "f81d4fae07dec-11d0-a765-00a0c91e6bf6"; // '0' where dash 8 belongs
        let err = normalize_uuid(bad.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::InvalidUuid {
                position: 8,
                character: '0',
                ..
            }
        ));
    }

    #[test]
    fn test_non_hex_digit_rejected() {
        let bad = "f81d4fae-7dec-11d0-a765-00a0c91e6bfg";
        let err = normalize_uuid(bad.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::InvalidUuid {
                position: 35,
                character: 'g',
                ..
            }
        ));
    }

    #[test]
    fn test_index_key_folds_words() {
        let normalized = normalize_uuid(SAMPLE.as_bytes()).unwrap();
        let hi = u64::from_be_bytes(normalized[..8].try_into().unwrap());
        let lo = u64::from_be_bytes(normalized[8..].try_into().unwrap());
        let folded = hi ^ lo;
        let expected = ((folded >> 32) as u32 ^ folded as u32).to_be_bytes();
        assert_eq!(uuid_index_key(&normalized).unwrap(), expected);
    }

    #[test]
    fn test_equality_rule_key_differs_from_value() {
        use crate::matching::rule::ConditionResult;

        let schema = crate::schema::core::core_schema();
        let rule = UuidEqualityRule;
        let assertion = rule.get_assertion(&schema, SAMPLE.as_bytes()).unwrap();
        let stored = rule
            .normalize_attribute_value(&schema, SAMPLE.to_uppercase().as_bytes())
            .unwrap();
        assert_eq!(assertion.matches(&stored), ConditionResult::True);

        let mut keys = Vec::new();
        let indexers = rule.create_indexers(&crate::index::IndexingOptions::default());
        indexers[0]
            .create_keys(&schema, SAMPLE.as_bytes(), &mut keys)
            .unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].len(), 4);
    }
}

//! The matching-rule contract shared by every rule implementation.
//!
//! A matching rule turns raw attribute and assertion values into canonical
//! byte forms, answers match questions over those forms, and derives index
//! keys and index queries so the storage engine can evaluate filters
//! without scanning. Rule kinds form a closed set, so assertions are a
//! tagged enum rather than trait objects; only the normalization logic
//! varies per rule.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{DecodeResult, DecodeError};
use crate::index::{IndexQueryFactory, Indexer, IndexingOptions};
use crate::matching::substring::SubstringAssertion;
use crate::matching::time::PartialDateTimeAssertion;
use crate::schema::Schema;

/// Three-valued match outcome.
///
/// `Undefined` arises when a rule cannot decide, e.g. an assertion built
/// from an operation the rule does not support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionResult {
    False,
    Undefined,
    True,
}

impl ConditionResult {
    /// Map a boolean onto the definite outcomes.
    pub fn from_bool(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }

    /// Whether this result is `True`.
    pub fn to_bool(self) -> bool {
        matches!(self, Self::True)
    }
}

/// Comparison operator carried by an ordering assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderingOp {
    LessThan,
    LessOrEqual,
    GreaterOrEqual,
    GreaterThan,
}

/// Byte-equality assertion, optionally backed by an exact-match index probe.
///
/// The comparison value and the index key may differ: the UUID rule
/// compares the full 16-byte form but probes a folded 4-byte hash key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EqualityAssertion {
    value: Vec<u8>,
    index: Option<(String, Vec<u8>)>,
}

impl EqualityAssertion {
    /// An indexed equality assertion probing `index_id` with `key`.
    pub fn indexed(value: Vec<u8>, index_id: impl Into<String>, key: Vec<u8>) -> Self {
        Self {
            value,
            index: Some((index_id.into(), key)),
        }
    }

    /// An equality assertion with no usable index; queries degrade to a
    /// match-all scan.
    pub fn unindexed(value: Vec<u8>) -> Self {
        Self { value, index: None }
    }

    fn matches(&self, normalized_value: &[u8]) -> ConditionResult {
        ConditionResult::from_bool(self.value == normalized_value)
    }

    fn create_index_query<F: IndexQueryFactory>(&self, factory: &F) -> F::Query {
        match &self.index {
            Some((index_id, key)) => factory.create_exact_match_query(index_id, key),
            None => factory.create_match_all_query(),
        }
    }
}

/// Byte-order comparison assertion backed by a range probe on an
/// order-preserving index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderingAssertion {
    index_id: String,
    value: Vec<u8>,
    op: OrderingOp,
}

impl OrderingAssertion {
    pub fn new(index_id: impl Into<String>, value: Vec<u8>, op: OrderingOp) -> Self {
        Self {
            index_id: index_id.into(),
            value,
            op,
        }
    }

    fn matches(&self, normalized_value: &[u8]) -> ConditionResult {
        let ordering = normalized_value.cmp(self.value.as_slice());
        let result = match self.op {
            OrderingOp::LessThan => ordering == Ordering::Less,
            OrderingOp::LessOrEqual => ordering != Ordering::Greater,
            OrderingOp::GreaterOrEqual => ordering != Ordering::Less,
            OrderingOp::GreaterThan => ordering == Ordering::Greater,
        };
        ConditionResult::from_bool(result)
    }

    fn create_index_query<F: IndexQueryFactory>(&self, factory: &F) -> F::Query {
        match self.op {
            OrderingOp::LessThan => {
                factory.create_range_match_query(&self.index_id, &[], &self.value, false, false)
            }
            OrderingOp::LessOrEqual => {
                factory.create_range_match_query(&self.index_id, &[], &self.value, false, true)
            }
            OrderingOp::GreaterOrEqual => {
                factory.create_range_match_query(&self.index_id, &self.value, &[], true, false)
            }
            OrderingOp::GreaterThan => {
                factory.create_range_match_query(&self.index_id, &self.value, &[], false, false)
            }
        }
    }
}

/// A decoded search assertion ready to test candidate values or emit an
/// index query.
///
/// The set of assertion shapes is closed: every matching rule produces one
/// of these, varying only in how it normalizes the operands.
#[derive(Debug, Clone)]
pub enum Assertion {
    /// Byte equality against a normalized assertion value.
    Equality(EqualityAssertion),
    /// Byte-order comparison against a normalized bound.
    Ordering(OrderingAssertion),
    /// Wildcard substring match.
    Substring(SubstringAssertion),
    /// Partial date/time component match.
    PartialDateTime(PartialDateTimeAssertion),
    /// The rule cannot evaluate this operation; matches nothing
    /// definitively and queries everything.
    Undefined,
}

impl Assertion {
    /// Test a candidate value, which must already be normalized by the
    /// owning matching rule.
    pub fn matches(&self, normalized_value: &[u8]) -> ConditionResult {
        match self {
            Self::Equality(a) => a.matches(normalized_value),
            Self::Ordering(a) => a.matches(normalized_value),
            Self::Substring(a) => a.matches(normalized_value),
            Self::PartialDateTime(a) => a.matches(normalized_value),
            Self::Undefined => ConditionResult::Undefined,
        }
    }

    /// Compose the index query answering this assertion through the
    /// storage engine's factory.
    pub fn create_index_query<F: IndexQueryFactory>(&self, factory: &F) -> F::Query {
        match self {
            Self::Equality(a) => a.create_index_query(factory),
            Self::Ordering(a) => a.create_index_query(factory),
            Self::Substring(a) => a.create_index_query(factory),
            Self::PartialDateTime(a) => a.create_index_query(factory),
            Self::Undefined => factory.create_match_all_query(),
        }
    }
}

/// Normalization function shared by the generic rule bases.
pub(crate) type NormalizerFn = fn(&[u8]) -> DecodeResult<Vec<u8>>;

/// Behavior every matching rule implementation provides.
///
/// All methods are pure; implementations hold no mutable state and are
/// safe for unbounded concurrent use once the owning schema is frozen.
pub trait MatchingRuleImpl: Send + Sync + fmt::Debug {
    /// Normalize a stored attribute value to its canonical byte form.
    fn normalize_attribute_value(&self, schema: &Schema, value: &[u8]) -> DecodeResult<Vec<u8>>;

    /// Build the assertion for an equality-style (default) filter operand.
    fn get_assertion(&self, schema: &Schema, value: &[u8]) -> DecodeResult<Assertion>;

    /// Build the assertion for a `>=` filter operand.
    fn get_greater_or_equal_assertion(
        &self,
        schema: &Schema,
        value: &[u8],
    ) -> DecodeResult<Assertion> {
        let _ = (schema, value);
        Ok(Assertion::Undefined)
    }

    /// Build the assertion for a `<=` filter operand.
    fn get_less_or_equal_assertion(&self, schema: &Schema, value: &[u8]) -> DecodeResult<Assertion> {
        let _ = (schema, value);
        Ok(Assertion::Undefined)
    }

    /// Build the assertion for a substring filter operand. `pattern` is the
    /// raw wildcard pattern, e.g. `jo*hn*n`.
    fn get_substring_assertion(&self, schema: &Schema, pattern: &[u8]) -> DecodeResult<Assertion> {
        let _ = (schema, pattern);
        Ok(Assertion::Undefined)
    }

    /// The indexers maintaining this rule's indexes, or empty when the
    /// rule has no meaningful index and every query degrades to match-all.
    fn create_indexers(&self, options: &IndexingOptions) -> Vec<Box<dyn Indexer>>;
}

/// Generic equality rule: one normalizer, one exact-match index.
#[derive(Debug)]
pub struct DefaultEqualityRule {
    index_id: &'static str,
    normalizer: NormalizerFn,
}

impl DefaultEqualityRule {
    pub(crate) fn new(index_id: &'static str, normalizer: NormalizerFn) -> Self {
        Self {
            index_id,
            normalizer,
        }
    }
}

impl MatchingRuleImpl for DefaultEqualityRule {
    fn normalize_attribute_value(&self, _schema: &Schema, value: &[u8]) -> DecodeResult<Vec<u8>> {
        (self.normalizer)(value)
    }

    fn get_assertion(&self, schema: &Schema, value: &[u8]) -> DecodeResult<Assertion> {
        let normalized = self.normalize_attribute_value(schema, value)?;
        Ok(Assertion::Equality(EqualityAssertion::indexed(
            normalized.clone(),
            self.index_id,
            normalized,
        )))
    }

    fn create_indexers(&self, _options: &IndexingOptions) -> Vec<Box<dyn Indexer>> {
        vec![Box::new(NormalizedKeyIndexer::new(
            self.index_id.to_string(),
            self.normalizer,
        ))]
    }
}

/// Generic ordering rule: byte comparison over one order-preserving index.
///
/// The index id may name the sibling equality rule's index when equality
/// and ordering share a single encoding, as the integer and generalized
/// time rules do.
#[derive(Debug)]
pub struct DefaultOrderingRule {
    index_id: &'static str,
    normalizer: NormalizerFn,
    /// Set when the ordering index is owned by the sibling equality rule,
    /// in which case this rule contributes no indexer of its own.
    shares_equality_index: bool,
}

impl DefaultOrderingRule {
    pub(crate) fn new(index_id: &'static str, normalizer: NormalizerFn) -> Self {
        Self {
            index_id,
            normalizer,
            shares_equality_index: false,
        }
    }

    pub(crate) fn sharing_equality_index(index_id: &'static str, normalizer: NormalizerFn) -> Self {
        Self {
            index_id,
            normalizer,
            shares_equality_index: true,
        }
    }

    fn ordering_assertion(
        &self,
        value: &[u8],
        op: OrderingOp,
    ) -> DecodeResult<Assertion> {
        let normalized = (self.normalizer)(value)?;
        Ok(Assertion::Ordering(OrderingAssertion::new(
            self.index_id,
            normalized,
            op,
        )))
    }
}

impl MatchingRuleImpl for DefaultOrderingRule {
    fn normalize_attribute_value(&self, _schema: &Schema, value: &[u8]) -> DecodeResult<Vec<u8>> {
        (self.normalizer)(value)
    }

    fn get_assertion(&self, _schema: &Schema, value: &[u8]) -> DecodeResult<Assertion> {
        // The default assertion of an ordering rule is "less than", per
        // X.501 ORDERING semantics.
        self.ordering_assertion(value, OrderingOp::LessThan)
    }

    fn get_greater_or_equal_assertion(
        &self,
        _schema: &Schema,
        value: &[u8],
    ) -> DecodeResult<Assertion> {
        self.ordering_assertion(value, OrderingOp::GreaterOrEqual)
    }

    fn get_less_or_equal_assertion(
        &self,
        _schema: &Schema,
        value: &[u8],
    ) -> DecodeResult<Assertion> {
        self.ordering_assertion(value, OrderingOp::LessOrEqual)
    }

    fn create_indexers(&self, _options: &IndexingOptions) -> Vec<Box<dyn Indexer>> {
        if self.shares_equality_index {
            return Vec::new();
        }
        vec![Box::new(NormalizedKeyIndexer::new(
            self.index_id.to_string(),
            self.normalizer,
        ))]
    }
}

/// Keyword-style equality rule with no meaningful index.
///
/// Used for rules like `objectIdentifierMatch` where a per-value index
/// buys nothing; every index query answers match-all and the filter
/// evaluator scans.
#[derive(Debug)]
pub struct KeywordEqualityRule {
    normalizer: NormalizerFn,
}

impl KeywordEqualityRule {
    pub(crate) fn new(normalizer: NormalizerFn) -> Self {
        Self { normalizer }
    }
}

impl MatchingRuleImpl for KeywordEqualityRule {
    fn normalize_attribute_value(&self, _schema: &Schema, value: &[u8]) -> DecodeResult<Vec<u8>> {
        (self.normalizer)(value)
    }

    fn get_assertion(&self, schema: &Schema, value: &[u8]) -> DecodeResult<Assertion> {
        let normalized = self.normalize_attribute_value(schema, value)?;
        Ok(Assertion::Equality(EqualityAssertion::unindexed(normalized)))
    }

    fn create_indexers(&self, _options: &IndexingOptions) -> Vec<Box<dyn Indexer>> {
        Vec::new()
    }
}

/// Indexer emitting one key per value: the rule's normalized form.
pub(crate) struct NormalizedKeyIndexer {
    index_id: String,
    normalizer: NormalizerFn,
}

impl NormalizedKeyIndexer {
    pub(crate) fn new(index_id: String, normalizer: NormalizerFn) -> Self {
        Self {
            index_id,
            normalizer,
        }
    }
}

impl Indexer for NormalizedKeyIndexer {
    fn index_id(&self) -> &str {
        &self.index_id
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
        match std::str::from_utf8(key) {
            Ok(text) => text.to_string(),
            Err(_) => hex_string(key),
        }
    }
}

/// Render bytes as lowercase hex for diagnostics.
pub(crate) fn hex_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        use std::fmt::Write;
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// Decode a UTF-8 value or fail with a typed error.
pub(crate) fn utf8(value: &[u8]) -> DecodeResult<&str> {
    std::str::from_utf8(value).map_err(|_| DecodeError::NotUtf8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::testing::{TestQuery, TestQueryFactory};
    use crate::schema::Schema;

    fn schema() -> Schema {
        crate::schema::core::core_schema()
    }

    fn identity(value: &[u8]) -> DecodeResult<Vec<u8>> {
        Ok(value.to_vec())
    }

    #[test]
    fn test_equality_assertion_matches() {
        let rule = DefaultEqualityRule::new("test", identity);
        let assertion = rule.get_assertion(&schema(), b"abc").unwrap();
        assert_eq!(assertion.matches(b"abc"), ConditionResult::True);
        assert_eq!(assertion.matches(b"abd"), ConditionResult::False);
    }

    #[test]
    fn test_equality_assertion_index_query() {
        let rule = DefaultEqualityRule::new("test", identity);
        let assertion = rule.get_assertion(&schema(), b"abc").unwrap();
        let factory = TestQueryFactory::new(6);
        assert_eq!(
            assertion.create_index_query(&factory),
            TestQuery::Exact {
                index_id: "test".to_string(),
                key: b"abc".to_vec(),
            }
        );
    }

    #[test]
    fn test_ordering_assertions() {
        let rule = DefaultOrderingRule::new("test", identity);
        let schema = schema();

        let lt = rule.get_assertion(&schema, b"m").unwrap();
        assert_eq!(lt.matches(b"a"), ConditionResult::True);
        assert_eq!(lt.matches(b"m"), ConditionResult::False);
        assert_eq!(lt.matches(b"z"), ConditionResult::False);

        let ge = rule.get_greater_or_equal_assertion(&schema, b"m").unwrap();
        assert_eq!(ge.matches(b"m"), ConditionResult::True);
        assert_eq!(ge.matches(b"z"), ConditionResult::True);
        assert_eq!(ge.matches(b"a"), ConditionResult::False);

        let le = rule.get_less_or_equal_assertion(&schema, b"m").unwrap();
        assert_eq!(le.matches(b"m"), ConditionResult::True);
        assert_eq!(le.matches(b"a"), ConditionResult::True);
        assert_eq!(le.matches(b"z"), ConditionResult::False);
    }

    #[test]
    fn test_ordering_range_query_bounds() {
        let rule = DefaultOrderingRule::new("test", identity);
        let factory = TestQueryFactory::new(6);
        let ge = rule
            .get_greater_or_equal_assertion(&schema(), b"m")
            .unwrap();
        assert_eq!(
            ge.create_index_query(&factory),
            TestQuery::Range {
                index_id: "test".to_string(),
                lower: b"m".to_vec(),
                upper: Vec::new(),
                lower_inclusive: true,
                upper_inclusive: false,
            }
        );
    }

    #[test]
    fn test_keyword_rule_has_no_indexers_and_queries_all() {
        let rule = KeywordEqualityRule::new(identity);
        assert!(rule.create_indexers(&IndexingOptions::default()).is_empty());

        let assertion = rule.get_assertion(&schema(), b"kw").unwrap();
        let factory = TestQueryFactory::new(6);
        assert_eq!(assertion.create_index_query(&factory), TestQuery::MatchAll);
        assert_eq!(assertion.matches(b"kw"), ConditionResult::True);
    }

    #[test]
    fn test_undefined_assertion() {
        let assertion = Assertion::Undefined;
        assert_eq!(assertion.matches(b"x"), ConditionResult::Undefined);
        let factory = TestQueryFactory::new(6);
        assert_eq!(assertion.create_index_query(&factory), TestQuery::MatchAll);
    }
}

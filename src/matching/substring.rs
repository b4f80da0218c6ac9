//! Substring assertion decomposition, matching, and index-key generation.
//!
//! A substring pattern `initial*any1*any2*final` decomposes into an
//! optional initial fragment, ordered interior fragments, and an optional
//! final fragment. Matching is a greedy left-to-right scan over the
//! normalized candidate with no backtracking across fragments. Indexing
//! slides a window of the configured key size over stored values; queries
//! probe exact windows for long fragments and prefix ranges for short
//! ones.

use std::collections::BTreeSet;

use crate::error::{DecodeError, DecodeResult};
use crate::index::{IndexQueryFactory, Indexer, IndexingOptions};
use crate::matching::rule::{
    Assertion, ConditionResult, MatchingRuleImpl, NormalizerFn, hex_string,
};
use crate::schema::Schema;

/// The decomposed fragments of a substring pattern, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawFragments {
    pub initial: Option<Vec<u8>>,
    pub any: Vec<Vec<u8>>,
    pub final_fragment: Option<Vec<u8>>,
}

/// Split a wildcard pattern into fragments, decoding `\xx` hex escapes.
///
/// Rejects patterns with no wildcard, empty interior fragments (`**`) and
/// malformed escapes, identifying the offending byte position.
pub(crate) fn decompose_pattern(pattern: &[u8]) -> DecodeResult<RawFragments> {
    let pattern_text = || String::from_utf8_lossy(pattern).into_owned();

    let mut fragments: Vec<Vec<u8>> = Vec::new();
    let mut current = Vec::new();
    let mut wildcard_positions = Vec::new();
    let mut i = 0;
    while i < pattern.len() {
        match pattern[i] {
            b'*' => {
                wildcard_positions.push(i);
                fragments.push(std::mem::take(&mut current));
                i += 1;
            }
            b'\\' => {
                let hi = pattern.get(i + 1).and_then(|b| (*b as char).to_digit(16));
                let lo = pattern.get(i + 2).and_then(|b| (*b as char).to_digit(16));
                match (hi, lo) {
                    (Some(hi), Some(lo)) => {
                        current.push(((hi << 4) | lo) as u8);
                        i += 3;
                    }
                    _ => {
                        return Err(DecodeError::InvalidEscapeSequence {
                            pattern: pattern_text(),
                            position: i,
                        });
                    }
                }
            }
            byte => {
                current.push(byte);
                i += 1;
            }
        }
    }
    fragments.push(current);

    if wildcard_positions.is_empty() {
        return Err(DecodeError::NoSubstringFragments);
    }

    // Interior fragments sit strictly between two wildcards; an empty one
    // means two adjacent wildcards.
    for (n, fragment) in fragments[1..fragments.len() - 1].iter().enumerate() {
        if fragment.is_empty() {
            return Err(DecodeError::EmptySubstringFragment {
                pattern: pattern_text(),
                position: wildcard_positions[n + 1],
            });
        }
    }

    let last = fragments.len() - 1;
    let final_fragment = match fragments[last].is_empty() {
        true => None,
        false => Some(fragments[last].clone()),
    };
    let initial = match fragments[0].is_empty() {
        true => None,
        false => Some(fragments[0].clone()),
    };
    let any = fragments[1..last].to_vec();

    Ok(RawFragments {
        initial,
        any,
        final_fragment,
    })
}

/// Construct the exclusive upper bound of the prefix range covering all
/// keys starting with `prefix`: the prefix incremented as a big-endian
/// integer with leftward carry. Returns an empty bound (unbounded) when
/// every byte is 0xFF.
pub(crate) fn prefix_range_upper_bound(prefix: &[u8]) -> Vec<u8> {
    let mut upper = prefix.to_vec();
    for i in (0..upper.len()).rev() {
        if upper[i] != 0xFF {
            upper[i] += 1;
            return upper;
        }
        upper[i] = 0x00;
    }
    Vec::new()
}

/// A decoded, normalized substring assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstringAssertion {
    initial: Option<Vec<u8>>,
    any: Vec<Vec<u8>>,
    final_fragment: Option<Vec<u8>>,
    substring_rule_id: String,
    equality_index_id: String,
}

impl SubstringAssertion {
    pub(crate) fn new(
        initial: Option<Vec<u8>>,
        any: Vec<Vec<u8>>,
        final_fragment: Option<Vec<u8>>,
        substring_rule_id: impl Into<String>,
        equality_index_id: impl Into<String>,
    ) -> Self {
        Self {
            initial,
            any,
            final_fragment,
            substring_rule_id: substring_rule_id.into(),
            equality_index_id: equality_index_id.into(),
        }
    }

    /// Greedy left-to-right match against a normalized candidate value.
    pub(crate) fn matches(&self, value: &[u8]) -> ConditionResult {
        let mut cursor = 0;

        if let Some(initial) = &self.initial {
            if !value.starts_with(initial) {
                return ConditionResult::False;
            }
            cursor = initial.len();
        }

        for fragment in &self.any {
            match find_from(value, cursor, fragment) {
                Some(at) => cursor = at + fragment.len(),
                None => return ConditionResult::False,
            }
        }

        if let Some(final_fragment) = &self.final_fragment {
            if value.len() < cursor + final_fragment.len() || !value.ends_with(final_fragment) {
                return ConditionResult::False;
            }
        }

        ConditionResult::True
    }

    /// Conjunction of per-fragment sub-queries, plus the equality-index
    /// prefix range for the initial fragment.
    pub(crate) fn create_index_query<F: IndexQueryFactory>(&self, factory: &F) -> F::Query {
        let key_size = factory.indexing_options().substring_key_size();
        let index_id = substring_index_id(&self.substring_rule_id, key_size);

        let mut subqueries = Vec::new();
        for fragment in self
            .initial
            .iter()
            .chain(self.any.iter())
            .chain(self.final_fragment.iter())
        {
            subqueries.push(fragment_query(factory, &index_id, fragment, key_size));
        }

        if let Some(initial) = &self.initial {
            // Redundant with the substring probes above, but the equality
            // index covers prefix searches in one range read. Intersection
            // keeps the redundancy safe.
            let upper = prefix_range_upper_bound(initial);
            subqueries.push(factory.create_range_match_query(
                &self.equality_index_id,
                initial,
                &upper,
                true,
                false,
            ));
        }

        match subqueries.len() {
            0 => factory.create_match_all_query(),
            1 => subqueries.pop().unwrap(),
            _ => factory.create_intersection_query(subqueries),
        }
    }
}

/// Sub-query for one fragment: a prefix range when the fragment is shorter
/// than the key size, otherwise an intersection of exact window probes.
fn fragment_query<F: IndexQueryFactory>(
    factory: &F,
    index_id: &str,
    fragment: &[u8],
    key_size: usize,
) -> F::Query {
    if fragment.len() < key_size {
        let upper = prefix_range_upper_bound(fragment);
        return factory.create_range_match_query(index_id, fragment, &upper, true, false);
    }

    // Non-overlapping windows, with the remainder covered by one final
    // window aligned to the end of the fragment.
    let mut windows: BTreeSet<&[u8]> = BTreeSet::new();
    let mut offset = 0;
    while offset + key_size <= fragment.len() {
        windows.insert(&fragment[offset..offset + key_size]);
        offset += key_size;
    }
    if offset < fragment.len() {
        windows.insert(&fragment[fragment.len() - key_size..]);
    }

    let mut queries: Vec<F::Query> = windows
        .into_iter()
        .map(|window| factory.create_exact_match_query(index_id, window))
        .collect();
    match queries.len() {
        1 => queries.pop().unwrap(),
        _ => factory.create_intersection_query(queries),
    }
}

fn find_from(value: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(from);
    }
    if value.len() < from + needle.len() {
        return None;
    }
    (from..=value.len() - needle.len()).find(|&at| &value[at..at + needle.len()] == needle)
}

fn substring_index_id(rule_id: &str, key_size: usize) -> String {
    format!("{rule_id}:{key_size}")
}

/// Generic substring rule: shared decomposition and indexing over a
/// per-rule normalizer.
#[derive(Debug)]
pub struct DefaultSubstringRule {
    rule_id: &'static str,
    equality_index_id: &'static str,
    normalizer: NormalizerFn,
}

impl DefaultSubstringRule {
    pub(crate) fn new(
        rule_id: &'static str,
        equality_index_id: &'static str,
        normalizer: NormalizerFn,
    ) -> Self {
        Self {
            rule_id,
            equality_index_id,
            normalizer,
        }
    }
}

impl MatchingRuleImpl for DefaultSubstringRule {
    fn normalize_attribute_value(&self, _schema: &Schema, value: &[u8]) -> DecodeResult<Vec<u8>> {
        (self.normalizer)(value)
    }

    fn get_assertion(&self, schema: &Schema, value: &[u8]) -> DecodeResult<Assertion> {
        self.get_substring_assertion(schema, value)
    }

    fn get_substring_assertion(&self, _schema: &Schema, pattern: &[u8]) -> DecodeResult<Assertion> {
        let raw = decompose_pattern(pattern)?;
        let initial = raw
            .initial
            .map(|f| (self.normalizer)(&f))
            .transpose()?;
        let any = raw
            .any
            .iter()
            .map(|f| (self.normalizer)(f))
            .collect::<DecodeResult<Vec<_>>>()?;
        let final_fragment = raw
            .final_fragment
            .map(|f| (self.normalizer)(&f))
            .transpose()?;
        Ok(Assertion::Substring(SubstringAssertion::new(
            initial,
            any,
            final_fragment,
            self.rule_id,
            self.equality_index_id,
        )))
    }

    fn create_indexers(&self, options: &IndexingOptions) -> Vec<Box<dyn Indexer>> {
        vec![Box::new(SubstringIndexer {
            index_id: substring_index_id(self.rule_id, options.substring_key_size()),
            key_size: options.substring_key_size(),
            normalizer: self.normalizer,
        })]
    }
}

/// Emits one window per byte offset of the normalized value, capped at the
/// configured key size; the tail contributes progressively shorter keys so
/// short query fragments can still range-probe.
struct SubstringIndexer {
    index_id: String,
    key_size: usize,
    normalizer: NormalizerFn,
}

impl Indexer for SubstringIndexer {
    fn index_id(&self) -> &str {
        &self.index_id
    }

    fn create_keys(
        &self,
        _schema: &Schema,
        value: &[u8],
        keys: &mut Vec<Vec<u8>>,
    ) -> DecodeResult<()> {
        let normalized = (self.normalizer)(value)?;
        let mut seen: BTreeSet<&[u8]> = BTreeSet::new();
        for offset in 0..normalized.len() {
            let len = self.key_size.min(normalized.len() - offset);
            seen.insert(&normalized[offset..offset + len]);
        }
        keys.extend(seen.into_iter().map(<[u8]>::to_vec));
        Ok(())
    }

    fn key_to_human_readable_string(&self, key: &[u8]) -> String {
        match std::str::from_utf8(key) {
            Ok(text) => text.to_string(),
            Err(_) => hex_string(key),
        }
    }
}

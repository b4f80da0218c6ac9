//! Index abstraction between matching rules and the storage engine.
//!
//! Matching rules never talk to a concrete index. At query time an
//! [`Assertion`](crate::matching::Assertion) composes an opaque query value
//! through an [`IndexQueryFactory`] implemented by the storage engine; at
//! write time the engine feeds stored values through the rule's
//! [`Indexer`]s to build the forward index with exactly the keys the query
//! side will probe.

use crate::error::DecodeResult;
use crate::schema::Schema;

/// Configuration shared between index maintenance and query generation.
///
/// The substring key size bounds the length of every key emitted by a
/// substring indexer and governs when a query fragment is probed with a
/// prefix range instead of exact window lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexingOptions {
    substring_key_size: usize,
}

impl IndexingOptions {
    /// Create options with an explicit substring key size.
    pub fn with_substring_key_size(substring_key_size: usize) -> Self {
        Self { substring_key_size }
    }

    /// The configured substring key size.
    pub fn substring_key_size(&self) -> usize {
        self.substring_key_size
    }
}

impl Default for IndexingOptions {
    fn default() -> Self {
        // Six bytes mirrors the default substring index configuration of
        // the directory backends this engine was built for.
        Self {
            substring_key_size: 6,
        }
    }
}

/// Factory turning abstract index probes into the storage engine's native
/// query representation.
///
/// The engine only composes queries through these primitives and never
/// inspects the resulting `Query` values. Range bounds are byte strings;
/// an empty bound means unbounded on that side.
pub trait IndexQueryFactory {
    /// The storage engine's native query type.
    type Query;

    /// A query returning the entries indexed under exactly `key` in the
    /// index named `index_id`.
    fn create_exact_match_query(&self, index_id: &str, key: &[u8]) -> Self::Query;

    /// A query returning the entries indexed under any key in the given
    /// range of the index named `index_id`.
    fn create_range_match_query(
        &self,
        index_id: &str,
        lower: &[u8],
        upper: &[u8],
        lower_inclusive: bool,
        upper_inclusive: bool,
    ) -> Self::Query;

    /// A query returning only entries matched by every sub-query.
    fn create_intersection_query(&self, subqueries: Vec<Self::Query>) -> Self::Query;

    /// A query matching every entry, forcing a filter-level scan.
    fn create_match_all_query(&self) -> Self::Query;

    /// The indexing configuration in force for this attribute's indexes.
    fn indexing_options(&self) -> &IndexingOptions;
}

/// Derives index keys from stored values for one matching rule.
///
/// Implemented by each indexable matching rule and consumed by the storage
/// engine when maintaining forward indexes. Key generation mirrors the
/// query-time generation exactly; a value indexed through `create_keys`
/// is always found by the queries its rule builds.
pub trait Indexer: Send + Sync {
    /// Identifier of the index this indexer maintains, unique per rule
    /// and configuration (e.g. `caseIgnoreSubstringsMatch:6`).
    fn index_id(&self) -> &str;

    /// Decompose a raw attribute value into index keys, appending them to
    /// `keys`. Duplicate keys may be produced; callers deduplicate.
    fn create_keys(&self, schema: &Schema, value: &[u8], keys: &mut Vec<Vec<u8>>)
    -> DecodeResult<()>;

    /// Render a key for diagnostics and index verification tooling.
    fn key_to_human_readable_string(&self, key: &[u8]) -> String;
}

#[cfg(test)]
pub(crate) mod testing {
    //! A reference factory producing a printable query tree, used by unit
    //! tests across the matching modules.

    use super::*;

    /// Query representation used in tests: a self-describing tree.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum TestQuery {
        Exact { index_id: String, key: Vec<u8> },
        Range {
            index_id: String,
            lower: Vec<u8>,
            upper: Vec<u8>,
            lower_inclusive: bool,
            upper_inclusive: bool,
        },
        Intersection(Vec<TestQuery>),
        MatchAll,
    }

    pub struct TestQueryFactory {
        options: IndexingOptions,
    }

    impl TestQueryFactory {
        pub fn new(substring_key_size: usize) -> Self {
            Self {
                options: IndexingOptions::with_substring_key_size(substring_key_size),
            }
        }
    }

    impl IndexQueryFactory for TestQueryFactory {
        type Query = TestQuery;

        fn create_exact_match_query(&self, index_id: &str, key: &[u8]) -> TestQuery {
            TestQuery::Exact {
                index_id: index_id.to_string(),
                key: key.to_vec(),
            }
        }

        fn create_range_match_query(
            &self,
            index_id: &str,
            lower: &[u8],
            upper: &[u8],
            lower_inclusive: bool,
            upper_inclusive: bool,
        ) -> TestQuery {
            TestQuery::Range {
                index_id: index_id.to_string(),
                lower: lower.to_vec(),
                upper: upper.to_vec(),
                lower_inclusive,
                upper_inclusive,
            }
        }

        fn create_intersection_query(&self, subqueries: Vec<TestQuery>) -> TestQuery {
            TestQuery::Intersection(subqueries)
        }

        fn create_match_all_query(&self) -> TestQuery {
            TestQuery::MatchAll
        }

        fn indexing_options(&self) -> &IndexingOptions {
            &self.options
        }
    }
}

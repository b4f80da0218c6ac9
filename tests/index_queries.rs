//! Index round-trip tests: feed stored values through the rules' indexers
//! the way a storage engine maintains its forward indexes, then verify
//! that the index queries built from filter assertions select exactly the
//! values the filter evaluator would.

use std::collections::{BTreeSet, HashMap};

use ldap_schema::schema::core::core_schema;
use ldap_schema::{IndexQueryFactory, IndexingOptions, Schema};

/// Self-describing query tree produced by the in-memory factory.
#[derive(Debug, Clone)]
enum Query {
    Exact {
        index_id: String,
        key: Vec<u8>,
    },
    Range {
        index_id: String,
        lower: Vec<u8>,
        upper: Vec<u8>,
        lower_inclusive: bool,
        upper_inclusive: bool,
    },
    Intersection(Vec<Query>),
    MatchAll,
}

struct MemoryFactory {
    options: IndexingOptions,
}

impl IndexQueryFactory for MemoryFactory {
    type Query = Query;

    fn create_exact_match_query(&self, index_id: &str, key: &[u8]) -> Query {
        Query::Exact {
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
    ) -> Query {
        Query::Range {
            index_id: index_id.to_string(),
            lower: lower.to_vec(),
            upper: upper.to_vec(),
            lower_inclusive,
            upper_inclusive,
        }
    }

    fn create_intersection_query(&self, subqueries: Vec<Query>) -> Query {
        Query::Intersection(subqueries)
    }

    fn create_match_all_query(&self) -> Query {
        Query::MatchAll
    }

    fn indexing_options(&self) -> &IndexingOptions {
        &self.options
    }
}

/// One indexed entry: the keys each index holds for its single value.
type EntryKeys = HashMap<String, BTreeSet<Vec<u8>>>;

/// Index a raw value under every indexer of the named matching rules.
fn index_value(schema: &Schema, rules: &[&str], options: &IndexingOptions, value: &[u8]) -> EntryKeys {
    let mut entry = EntryKeys::new();
    for rule_name in rules {
        let rule = schema.get_matching_rule(rule_name).unwrap();
        for indexer in rule.create_indexers(options) {
            let mut keys = Vec::new();
            indexer.create_keys(schema, value, &mut keys).unwrap();
            entry
                .entry(indexer.index_id().to_string())
                .or_default()
                .extend(keys);
        }
    }
    entry
}

/// Whether the query admits the entry, evaluating ranges and exact probes
/// against the entry's own keys.
fn admits(query: &Query, entry: &EntryKeys) -> bool {
    match query {
        Query::Exact { index_id, key } => {
            entry.get(index_id).is_some_and(|keys| keys.contains(key))
        }
        Query::Range {
            index_id,
            lower,
            upper,
            lower_inclusive,
            upper_inclusive,
        } => entry.get(index_id).is_some_and(|keys| {
            keys.iter().any(|key| {
                let above = match (lower.is_empty(), lower_inclusive) {
                    (true, _) => true,
                    (false, true) => key.as_slice() >= lower.as_slice(),
                    (false, false) => key.as_slice() > lower.as_slice(),
                };
                let below = match (upper.is_empty(), upper_inclusive) {
                    (true, _) => true,
                    (false, true) => key.as_slice() <= upper.as_slice(),
                    (false, false) => key.as_slice() < upper.as_slice(),
                };
                above && below
            })
        }),
        Query::Intersection(subqueries) => subqueries.iter().all(|q| admits(q, entry)),
        Query::MatchAll => true,
    }
}

const CN_RULES: &[&str] = &["caseIgnoreMatch", "caseIgnoreSubstringsMatch"];

#[test]
fn test_substring_query_selects_the_matching_entries() {
    let schema = core_schema();
    let factory = MemoryFactory {
        options: IndexingOptions::default(),
    };

    let values: &[&[u8]] = &[b"john", b"johnson", b"jon", b"smith"];
    let entries: Vec<EntryKeys> = values
        .iter()
        .map(|v| index_value(&schema, CN_RULES, factory.indexing_options(), v))
        .collect();

    let rule = schema.get_matching_rule("caseIgnoreSubstringsMatch").unwrap();
    let query = rule
        .get_substring_assertion(&schema, b"j*n")
        .unwrap()
        .create_index_query(&factory);

    let selected: Vec<&[u8]> = values
        .iter()
        .zip(&entries)
        .filter(|(_, entry)| admits(&query, entry))
        .map(|(value, _)| *value)
        .collect();
    assert_eq!(selected, vec![b"john" as &[u8], b"johnson", b"jon"]);

    let none = rule
        .get_substring_assertion(&schema, b"j*x")
        .unwrap()
        .create_index_query(&factory);
    assert!(entries.iter().all(|entry| !admits(&none, entry)));
}

#[test]
fn test_index_candidates_are_a_superset_of_filter_matches() {
    // The index may over-select, never under-select: every value the
    // filter evaluator accepts must be admitted by the index query.
    let schema = core_schema();
    let factory = MemoryFactory {
        options: IndexingOptions::with_substring_key_size(3),
    };
    let rule = schema.get_matching_rule("caseIgnoreSubstringsMatch").unwrap();

    let values: &[&[u8]] = &[b"abcdefgh", b"abc", b"zabcz", b"unrelated"];
    for pattern in [
        b"abc*".as_slice(),
        b"*abc",
        b"*abc*",
        b"a*c",
        b"*bcdefg*",
        b"ab*ef*gh",
    ] {
        let assertion = rule.get_substring_assertion(&schema, pattern).unwrap();
        let query = assertion.create_index_query(&factory);
        for value in values {
            let entry = index_value(&schema, CN_RULES, factory.indexing_options(), value);
            let normalized = rule.normalize_attribute_value(&schema, value).unwrap();
            if assertion.matches(&normalized).to_bool() {
                assert!(
                    admits(&query, &entry),
                    "index query for {:?} excluded matching value {:?}",
                    String::from_utf8_lossy(pattern),
                    String::from_utf8_lossy(value),
                );
            }
        }
    }
}

#[test]
fn test_integer_range_query_selects_by_numeric_order() {
    let schema = core_schema();
    let factory = MemoryFactory {
        options: IndexingOptions::default(),
    };
    let equality = schema.get_matching_rule("integerMatch").unwrap();
    let ordering = schema.get_matching_rule("integerOrderingMatch").unwrap();

    let values: &[&[u8]] = &[b"-500", b"-3", b"0", b"7", b"42", b"100000"];
    let entries: Vec<EntryKeys> = values
        .iter()
        .map(|v| index_value(&schema, &["integerMatch"], factory.indexing_options(), v))
        .collect();

    // values >= 7
    let query = ordering
        .get_greater_or_equal_assertion(&schema, b"7")
        .unwrap()
        .create_index_query(&factory);
    let selected: Vec<&[u8]> = values
        .iter()
        .zip(&entries)
        .filter(|(_, entry)| admits(&query, entry))
        .map(|(value, _)| *value)
        .collect();
    assert_eq!(selected, vec![b"7" as &[u8], b"42", b"100000"]);

    // Exact probe shares the same index.
    let exact = equality
        .get_assertion(&schema, b"42")
        .unwrap()
        .create_index_query(&factory);
    let hits = entries.iter().filter(|entry| admits(&exact, entry)).count();
    assert_eq!(hits, 1);
}

#[test]
fn test_partial_date_time_query_selects_by_components() {
    let schema = core_schema();
    let factory = MemoryFactory {
        options: IndexingOptions::default(),
    };
    let rule = schema
        .get_matching_rule("partialDateAndTimeMatchingRule")
        .unwrap();

    let values: &[&[u8]] = &[
        b"20101225090000Z",
        b"20111225090000Z",
        b"20100615120000Z",
    ];
    let entries: Vec<EntryKeys> = values
        .iter()
        .map(|v| {
            index_value(
                &schema,
                &["partialDateAndTimeMatchingRule"],
                factory.indexing_options(),
                v,
            )
        })
        .collect();

    // Every December 25th, regardless of year.
    let assertion = rule.get_assertion(&schema, b"25D12M").unwrap();
    let query = assertion.create_index_query(&factory);
    let selected: Vec<usize> = (0..values.len())
        .filter(|&n| admits(&query, &entries[n]))
        .collect();
    assert_eq!(selected, vec![0, 1]);

    for (n, value) in values.iter().enumerate() {
        let normalized = rule.normalize_attribute_value(&schema, value).unwrap();
        assert_eq!(assertion.matches(&normalized).to_bool(), selected.contains(&n));
    }
}

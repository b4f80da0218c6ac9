//! Matching rule implementations and the assertion model.
//!
//! Each submodule covers one family of rules: string folding, the
//! order-preserving integer codec, substring decomposition and indexing,
//! the double metaphone approximate rule, UUID matching, and the
//! generalized time family. [`rule`] holds the shared contract and the
//! generic equality and ordering bases the families build on.

pub mod integer;
pub mod metaphone;
pub mod rule;
pub mod strings;
pub mod substring;
pub mod time;
pub mod uuid;

pub use rule::{
    Assertion, ConditionResult, DefaultEqualityRule, DefaultOrderingRule, EqualityAssertion,
    KeywordEqualityRule, MatchingRuleImpl, OrderingAssertion, OrderingOp,
};
pub use substring::{DefaultSubstringRule, SubstringAssertion};
pub use time::{PartialDateTimeAssertion, PartialDateTimeRule, RelativeTimeOrderingRule};

//! LDAP schema and matching-rule engine.
//!
//! Implements the value-matching core of an LDAP directory: matching
//! rules with their normalization, assertion, and index-key algorithms,
//! plus the schema element model and validator that ties attribute types,
//! object classes, and DIT content rules together.
//!
//! # Core Components
//!
//! - [`Schema`] - Validated, immutable schema with strict and non-strict lookup
//! - [`SchemaBuilder`] - Staging and single-pass validation of schema elements
//! - [`MatchingRuleImpl`] - Contract every matching rule implements
//! - [`Assertion`] - Decoded filter operand: evaluate values or build index queries
//! - [`IndexQueryFactory`] - Storage-engine hook turning assertions into native queries
//!
//! # Quick Start
//!
//! ```rust
//! use ldap_schema::schema::core::core_schema;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = core_schema();
//! let cn = schema.get_attribute_type("cn")?;
//! let rule = schema.get_matching_rule(cn.equality_rule_oid().unwrap())?;
//! let assertion = rule.get_assertion(&schema, b"John Doe")?;
//! let stored = rule.normalize_attribute_value(&schema, b"john  doe")?;
//! assert!(assertion.matches(&stored).to_bool());
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod error;
pub mod index;
pub mod matching;
pub mod schema;

// Re-export commonly used types for convenience
pub use error::{DecodeError, DecodeResult, SchemaError, SchemaResult, SchemaWarning};
pub use index::{IndexQueryFactory, Indexer, IndexingOptions};
pub use matching::{Assertion, ConditionResult, MatchingRuleImpl};
pub use schema::{
    AttributeType, AttributeTypeDefinition, AttributeUsage, MatchingRule, ObjectClass,
    ObjectClassDefinition, ObjectClassKind, Schema, SchemaBuilder,
};

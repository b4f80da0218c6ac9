//! Schema element model, validation, and the frozen schema registry.
//!
//! Definitions stage in a [`SchemaBuilder`], get validated in one pass,
//! and freeze into an immutable [`Schema`] that is cheap to clone and safe
//! to share across threads. [`core`] bootstraps the standard elements.

pub mod attribute_type;
pub mod builder;
pub mod content_rule;
pub mod core;
pub mod matching_rule;
pub mod object_class;
pub mod registry;
pub mod syntax;

pub use attribute_type::{AttributeType, AttributeTypeDefinition, AttributeUsage};
pub use builder::{SchemaBuilder, SchemaDocument};
pub use content_rule::{DitContentRule, DitContentRuleDefinition};
pub use matching_rule::{MatchingRule, MatchingRuleUse, MatchingRuleUseDefinition};
pub use object_class::{ObjectClass, ObjectClassDefinition, ObjectClassKind};
pub use registry::Schema;
pub use syntax::{Syntax, SyntaxHandler};

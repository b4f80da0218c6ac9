//! Matching rule schema elements and matching rule uses.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::DecodeResult;
use crate::index::{Indexer, IndexingOptions};
use crate::matching::{Assertion, MatchingRuleImpl};
use crate::schema::attribute_type::AttributeType;
use crate::schema::registry::Schema;

/// A matching rule schema element: identity plus the attached
/// implementation providing normalization, assertions, and indexers.
#[derive(Debug, Clone)]
pub struct MatchingRule {
    oid: String,
    names: Vec<String>,
    description: String,
    syntax_oid: String,
    obsolete: bool,
    implementation: Arc<dyn MatchingRuleImpl>,
}

impl MatchingRule {
    pub fn new(
        oid: impl Into<String>,
        name: impl Into<String>,
        syntax_oid: impl Into<String>,
        implementation: Arc<dyn MatchingRuleImpl>,
    ) -> Self {
        Self {
            oid: oid.into(),
            names: vec![name.into()],
            description: String::new(),
            syntax_oid: syntax_oid.into(),
            obsolete: false,
            implementation,
        }
    }

    pub fn alias(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn obsolete(mut self) -> Self {
        self.obsolete = true;
        self
    }

    pub fn oid(&self) -> &str {
        &self.oid
    }

    pub fn name(&self) -> &str {
        self.names.first().map_or(&self.oid, String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.names.iter().any(|n| n.eq_ignore_ascii_case(name))
    }

    /// OID of the assertion syntax this rule compares against.
    pub fn syntax_oid(&self) -> &str {
        &self.syntax_oid
    }

    pub fn is_obsolete(&self) -> bool {
        self.obsolete
    }

    pub fn normalize_attribute_value(
        &self,
        schema: &Schema,
        value: &[u8],
    ) -> DecodeResult<Vec<u8>> {
        self.implementation.normalize_attribute_value(schema, value)
    }

    pub fn get_assertion(&self, schema: &Schema, value: &[u8]) -> DecodeResult<Assertion> {
        self.implementation.get_assertion(schema, value)
    }

    pub fn get_greater_or_equal_assertion(
        &self,
        schema: &Schema,
        value: &[u8],
    ) -> DecodeResult<Assertion> {
        self.implementation.get_greater_or_equal_assertion(schema, value)
    }

    pub fn get_less_or_equal_assertion(
        &self,
        schema: &Schema,
        value: &[u8],
    ) -> DecodeResult<Assertion> {
        self.implementation.get_less_or_equal_assertion(schema, value)
    }

    pub fn get_substring_assertion(
        &self,
        schema: &Schema,
        pattern: &[u8],
    ) -> DecodeResult<Assertion> {
        self.implementation.get_substring_assertion(schema, pattern)
    }

    pub fn create_indexers(&self, options: &IndexingOptions) -> Vec<Box<dyn Indexer>> {
        self.implementation.create_indexers(options)
    }
}

/// Staging definition of a matching rule use.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchingRuleUseDefinition {
    pub matching_rule: String,
    pub names: Vec<String>,
    pub description: String,
    pub applies_to: Vec<String>,
    pub obsolete: bool,
}

impl MatchingRuleUseDefinition {
    pub fn new(matching_rule: impl Into<String>) -> Self {
        Self {
            matching_rule: matching_rule.into(),
            ..Self::default()
        }
    }

    pub fn applies_to(mut self, attribute: impl Into<String>) -> Self {
        self.applies_to.push(attribute.into());
        self
    }
}

/// A validated matching rule use, restricting a rule to the listed
/// attribute types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchingRuleUse {
    matching_rule_oid: String,
    names: Vec<String>,
    attribute_oids: BTreeSet<String>,
    obsolete: bool,
}

impl MatchingRuleUse {
    pub(crate) fn resolved(
        definition: &MatchingRuleUseDefinition,
        matching_rule_oid: String,
        attribute_oids: BTreeSet<String>,
    ) -> Self {
        Self {
            matching_rule_oid,
            names: definition.names.clone(),
            attribute_oids,
            obsolete: definition.obsolete,
        }
    }

    pub fn matching_rule_oid(&self) -> &str {
        &self.matching_rule_oid
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn applies_to(&self, attribute: &AttributeType) -> bool {
        self.attribute_oids.contains(attribute.oid())
    }

    pub fn attribute_oids(&self) -> impl Iterator<Item = &str> {
        self.attribute_oids.iter().map(String::as_str)
    }

    pub fn is_obsolete(&self) -> bool {
        self.obsolete
    }
}

//! The frozen, validated schema and its lookup surface.

use std::collections::HashMap;
use std::sync::Arc;

use log::warn;

use crate::error::{SchemaError, SchemaResult, SchemaWarning};
use crate::schema::attribute_type::AttributeType;
use crate::schema::content_rule::DitContentRule;
use crate::schema::matching_rule::{MatchingRule, MatchingRuleUse};
use crate::schema::object_class::ObjectClass;
use crate::schema::syntax::Syntax;

/// A validated, immutable schema.
///
/// Cloning is cheap; all elements live behind one shared inner block.
/// Every schema is either strict (unknown lookups fail) or non-strict
/// (unknown attribute types are synthesized as place-holders); the two
/// modes are views over the same shared data.
#[derive(Debug, Clone)]
pub struct Schema {
    inner: Arc<SchemaInner>,
    strict: bool,
}

#[derive(Debug)]
pub(crate) struct SchemaInner {
    pub(crate) syntaxes: HashMap<String, Arc<Syntax>>,
    pub(crate) matching_rules: HashMap<String, Arc<MatchingRule>>,
    /// Lowercased name to OID.
    pub(crate) matching_rule_names: HashMap<String, String>,
    pub(crate) attribute_types: HashMap<String, Arc<AttributeType>>,
    pub(crate) attribute_type_names: HashMap<String, String>,
    pub(crate) object_classes: HashMap<String, Arc<ObjectClass>>,
    pub(crate) object_class_names: HashMap<String, String>,
    /// Keyed by structural class OID.
    pub(crate) content_rules: HashMap<String, Arc<DitContentRule>>,
    /// Keyed by matching rule OID.
    pub(crate) matching_rule_uses: HashMap<String, Arc<MatchingRuleUse>>,
    pub(crate) warnings: Vec<SchemaWarning>,
}

impl Schema {
    pub(crate) fn from_inner(inner: SchemaInner) -> Self {
        Self {
            inner: Arc::new(inner),
            strict: true,
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// A non-strict view over the same elements: unknown attribute type
    /// lookups synthesize place-holders instead of failing.
    pub fn as_non_strict(&self) -> Schema {
        Schema {
            inner: Arc::clone(&self.inner),
            strict: false,
        }
    }

    pub fn as_strict(&self) -> Schema {
        Schema {
            inner: Arc::clone(&self.inner),
            strict: true,
        }
    }

    /// Warnings collected while the schema was validated.
    pub fn warnings(&self) -> &[SchemaWarning] {
        &self.inner.warnings
    }

    pub fn get_syntax(&self, oid: &str) -> SchemaResult<Arc<Syntax>> {
        if let Some(syntax) = self.inner.syntaxes.get(oid) {
            return Ok(Arc::clone(syntax));
        }
        if self.strict {
            return Err(SchemaError::unknown_element("syntax", oid));
        }
        warn!("substituting an accept-all syntax for unknown OID {oid}");
        Ok(Arc::new(Syntax::new(oid, "Unknown syntax")))
    }

    pub fn has_syntax(&self, oid: &str) -> bool {
        self.inner.syntaxes.contains_key(oid)
    }

    /// Look a matching rule up by OID or by any of its names.
    pub fn get_matching_rule(&self, oid_or_name: &str) -> SchemaResult<Arc<MatchingRule>> {
        if let Some(rule) = self.inner.matching_rules.get(oid_or_name) {
            return Ok(Arc::clone(rule));
        }
        if let Some(oid) = self.inner.matching_rule_names.get(&oid_or_name.to_lowercase())
            && let Some(rule) = self.inner.matching_rules.get(oid)
        {
            return Ok(Arc::clone(rule));
        }
        Err(SchemaError::unknown_element("matching rule", oid_or_name))
    }

    pub fn has_matching_rule(&self, oid_or_name: &str) -> bool {
        self.get_matching_rule(oid_or_name).is_ok()
    }

    /// Look an attribute type up by OID or name. Under a non-strict schema
    /// an unknown name yields a freshly synthesized place-holder.
    pub fn get_attribute_type(&self, oid_or_name: &str) -> SchemaResult<Arc<AttributeType>> {
        if let Some(attribute) = self.inner.attribute_types.get(oid_or_name) {
            return Ok(Arc::clone(attribute));
        }
        if let Some(oid) = self
            .inner
            .attribute_type_names
            .get(&oid_or_name.to_lowercase())
            && let Some(attribute) = self.inner.attribute_types.get(oid)
        {
            return Ok(Arc::clone(attribute));
        }
        if self.strict {
            return Err(SchemaError::unknown_element("attribute type", oid_or_name));
        }
        Ok(Arc::new(AttributeType::new_place_holder(oid_or_name)))
    }

    pub fn has_attribute_type(&self, oid_or_name: &str) -> bool {
        self.inner.attribute_types.contains_key(oid_or_name)
            || self
                .inner
                .attribute_type_names
                .contains_key(&oid_or_name.to_lowercase())
    }

    pub fn get_object_class(&self, oid_or_name: &str) -> SchemaResult<Arc<ObjectClass>> {
        if let Some(class) = self.inner.object_classes.get(oid_or_name) {
            return Ok(Arc::clone(class));
        }
        if let Some(oid) = self.inner.object_class_names.get(&oid_or_name.to_lowercase())
            && let Some(class) = self.inner.object_classes.get(oid)
        {
            return Ok(Arc::clone(class));
        }
        Err(SchemaError::unknown_element("object class", oid_or_name))
    }

    pub fn has_object_class(&self, oid_or_name: &str) -> bool {
        self.get_object_class(oid_or_name).is_ok()
    }

    /// The DIT content rule governing entries of the given structural
    /// class, when one is defined.
    pub fn get_dit_content_rule(&self, structural_oid: &str) -> Option<Arc<DitContentRule>> {
        self.inner.content_rules.get(structural_oid).cloned()
    }

    pub fn get_matching_rule_use(&self, rule_oid: &str) -> Option<Arc<MatchingRuleUse>> {
        self.inner.matching_rule_uses.get(rule_oid).cloned()
    }

    pub fn attribute_types(&self) -> impl Iterator<Item = &Arc<AttributeType>> {
        self.inner.attribute_types.values()
    }

    pub fn object_classes(&self) -> impl Iterator<Item = &Arc<ObjectClass>> {
        self.inner.object_classes.values()
    }

    pub fn matching_rules(&self) -> impl Iterator<Item = &Arc<MatchingRule>> {
        self.inner.matching_rules.values()
    }

    pub fn syntaxes(&self) -> impl Iterator<Item = &Arc<Syntax>> {
        self.inner.syntaxes.values()
    }
}

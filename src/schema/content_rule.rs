//! DIT content rules.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::schema::attribute_type::AttributeType;

/// Staging definition of a DIT content rule, keyed by its structural
/// object class.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DitContentRuleDefinition {
    pub structural_class: String,
    pub names: Vec<String>,
    pub description: String,
    #[serde(rename = "aux")]
    pub auxiliaries: Vec<String>,
    #[serde(rename = "must")]
    pub required: Vec<String>,
    #[serde(rename = "may")]
    pub optional: Vec<String>,
    #[serde(rename = "not")]
    pub prohibited: Vec<String>,
    pub obsolete: bool,
}

impl DitContentRuleDefinition {
    pub fn new(structural_class: impl Into<String>) -> Self {
        Self {
            structural_class: structural_class.into(),
            ..Self::default()
        }
    }

    pub fn auxiliary(mut self, class: impl Into<String>) -> Self {
        self.auxiliaries.push(class.into());
        self
    }

    pub fn requires(mut self, attribute: impl Into<String>) -> Self {
        self.required.push(attribute.into());
        self
    }

    pub fn allows(mut self, attribute: impl Into<String>) -> Self {
        self.optional.push(attribute.into());
        self
    }

    pub fn prohibits(mut self, attribute: impl Into<String>) -> Self {
        self.prohibited.push(attribute.into());
        self
    }
}

/// A validated DIT content rule. All references are resolved to OIDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DitContentRule {
    structural_class_oid: String,
    names: Vec<String>,
    auxiliary_oids: BTreeSet<String>,
    required: BTreeSet<String>,
    optional: BTreeSet<String>,
    prohibited: BTreeSet<String>,
    obsolete: bool,
}

impl DitContentRule {
    pub(crate) fn resolved(
        definition: &DitContentRuleDefinition,
        structural_class_oid: String,
        auxiliary_oids: BTreeSet<String>,
        required: BTreeSet<String>,
        optional: BTreeSet<String>,
        prohibited: BTreeSet<String>,
    ) -> Self {
        Self {
            structural_class_oid,
            names: definition.names.clone(),
            auxiliary_oids,
            required,
            optional,
            prohibited,
            obsolete: definition.obsolete,
        }
    }

    pub fn structural_class_oid(&self) -> &str {
        &self.structural_class_oid
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn permits_auxiliary_oid(&self, oid: &str) -> bool {
        self.auxiliary_oids.contains(oid)
    }

    pub fn auxiliary_oids(&self) -> impl Iterator<Item = &str> {
        self.auxiliary_oids.iter().map(String::as_str)
    }

    pub fn is_required(&self, attribute: &AttributeType) -> bool {
        self.required.contains(attribute.oid())
    }

    pub fn is_optional(&self, attribute: &AttributeType) -> bool {
        self.optional.contains(attribute.oid())
    }

    pub fn is_prohibited(&self, attribute: &AttributeType) -> bool {
        self.prohibited.contains(attribute.oid())
    }

    pub fn is_obsolete(&self) -> bool {
        self.obsolete
    }
}

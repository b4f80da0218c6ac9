//! Object class definitions and their validated form.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::schema::attribute_type::AttributeType;

/// RFC 4512 object class kinds, governing what a class may derive from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectClassKind {
    Abstract,
    #[default]
    Structural,
    Auxiliary,
}

impl ObjectClassKind {
    /// Whether a class of this kind may name `superior` as a superior.
    pub(crate) fn may_derive_from(self, superior: ObjectClassKind) -> bool {
        match self {
            Self::Abstract => superior == Self::Abstract,
            Self::Structural => matches!(superior, Self::Abstract | Self::Structural),
            Self::Auxiliary => matches!(superior, Self::Abstract | Self::Auxiliary),
        }
    }
}

impl fmt::Display for ObjectClassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Abstract => "abstract",
            Self::Structural => "structural",
            Self::Auxiliary => "auxiliary",
        })
    }
}

/// Staging definition of an object class. Superior classes and attributes
/// may be referenced by OID or by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectClassDefinition {
    pub oid: String,
    pub names: Vec<String>,
    pub description: String,
    pub kind: ObjectClassKind,
    pub superiors: Vec<String>,
    #[serde(rename = "must")]
    pub required: Vec<String>,
    #[serde(rename = "may")]
    pub optional: Vec<String>,
    pub obsolete: bool,
}

impl ObjectClassDefinition {
    pub fn new(oid: impl Into<String>, name: impl Into<String>, kind: ObjectClassKind) -> Self {
        Self {
            oid: oid.into(),
            names: vec![name.into()],
            kind,
            ..Self::default()
        }
    }

    pub fn superior(mut self, superior: impl Into<String>) -> Self {
        self.superiors.push(superior.into());
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
}

/// A validated object class. The required and optional sets are the union
/// of the declared attributes and every ancestor's, keyed by attribute OID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectClass {
    oid: String,
    names: Vec<String>,
    description: String,
    kind: ObjectClassKind,
    superior_oids: Vec<String>,
    required: BTreeSet<String>,
    optional: BTreeSet<String>,
    obsolete: bool,
}

impl ObjectClass {
    pub(crate) fn resolved(
        definition: &ObjectClassDefinition,
        superior_oids: Vec<String>,
        required: BTreeSet<String>,
        optional: BTreeSet<String>,
    ) -> Self {
        Self {
            oid: definition.oid.clone(),
            names: definition.names.clone(),
            description: definition.description.clone(),
            kind: definition.kind,
            superior_oids,
            required,
            optional,
            obsolete: definition.obsolete,
        }
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

    pub fn kind(&self) -> ObjectClassKind {
        self.kind
    }

    pub fn superior_oids(&self) -> &[String] {
        &self.superior_oids
    }

    pub fn is_obsolete(&self) -> bool {
        self.obsolete
    }

    /// Whether entries of this class must carry the attribute, including
    /// requirements inherited from superiors.
    pub fn is_required(&self, attribute: &AttributeType) -> bool {
        self.required.contains(attribute.oid())
    }

    pub fn is_optional(&self, attribute: &AttributeType) -> bool {
        self.optional.contains(attribute.oid())
    }

    pub fn is_required_or_optional(&self, attribute: &AttributeType) -> bool {
        self.is_required(attribute) || self.is_optional(attribute)
    }

    pub fn required_attribute_oids(&self) -> impl Iterator<Item = &str> {
        self.required.iter().map(String::as_str)
    }

    pub fn optional_attribute_oids(&self) -> impl Iterator<Item = &str> {
        self.optional.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivation_rules() {
        use ObjectClassKind::*;
        assert!(Structural.may_derive_from(Abstract));
        assert!(Structural.may_derive_from(Structural));
        assert!(!Structural.may_derive_from(Auxiliary));
        assert!(Auxiliary.may_derive_from(Abstract));
        assert!(!Auxiliary.may_derive_from(Structural));
        assert!(!Abstract.may_derive_from(Structural));
    }

    #[test]
    fn test_definition_json_uses_must_and_may() {
        let definition: ObjectClassDefinition = serde_json::from_str(
            r#"{
                "oid": "2.5.6.6",
                "names": ["person"],
                "kind": "structural",
                "superiors": ["top"],
                "must": ["cn", "sn"],
                "may": ["description"]
            }"#,
        )
        .unwrap();
        assert_eq!(definition.kind, ObjectClassKind::Structural);
        assert_eq!(definition.required, vec!["cn", "sn"]);
        assert_eq!(definition.optional, vec!["description"]);
    }
}

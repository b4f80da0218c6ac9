//! Attribute type definitions and their validated, resolved form.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::schema::syntax::DIRECTORY_STRING_SYNTAX_OID;

const CASE_IGNORE_MATCH_OID: &str = "2.5.13.2";

/// X.501 attribute usage kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AttributeUsage {
    #[default]
    #[serde(rename = "userApplications")]
    UserApplications,
    #[serde(rename = "directoryOperation")]
    DirectoryOperation,
    #[serde(rename = "distributedOperation")]
    DistributedOperation,
    #[serde(rename = "dSAOperation")]
    DsaOperation,
}

impl AttributeUsage {
    /// Operational usages are maintained by the server, not clients.
    pub fn is_operational(self) -> bool {
        self != Self::UserApplications
    }
}

impl fmt::Display for AttributeUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UserApplications => "userApplications",
            Self::DirectoryOperation => "directoryOperation",
            Self::DistributedOperation => "distributedOperation",
            Self::DsaOperation => "dSAOperation",
        })
    }
}

/// Staging definition of an attribute type, as accepted by the schema
/// builder and by JSON schema documents. References may use OIDs or names;
/// unset syntax and matching rules inherit from the superior type during
/// validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttributeTypeDefinition {
    pub oid: String,
    pub names: Vec<String>,
    pub description: String,
    pub superior: Option<String>,
    pub syntax: Option<String>,
    pub equality: Option<String>,
    pub ordering: Option<String>,
    pub substring: Option<String>,
    pub approximate: Option<String>,
    pub usage: AttributeUsage,
    pub single_value: bool,
    pub collective: bool,
    pub no_user_modification: bool,
    pub obsolete: bool,
}

impl AttributeTypeDefinition {
    pub fn new(oid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            names: vec![name.into()],
            ..Self::default()
        }
    }

    pub fn alias(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    pub fn superior(mut self, superior: impl Into<String>) -> Self {
        self.superior = Some(superior.into());
        self
    }

    pub fn syntax(mut self, syntax_oid: impl Into<String>) -> Self {
        self.syntax = Some(syntax_oid.into());
        self
    }

    pub fn equality(mut self, rule: impl Into<String>) -> Self {
        self.equality = Some(rule.into());
        self
    }

    pub fn ordering(mut self, rule: impl Into<String>) -> Self {
        self.ordering = Some(rule.into());
        self
    }

    pub fn substring(mut self, rule: impl Into<String>) -> Self {
        self.substring = Some(rule.into());
        self
    }

    pub fn approximate(mut self, rule: impl Into<String>) -> Self {
        self.approximate = Some(rule.into());
        self
    }

    pub fn usage(mut self, usage: AttributeUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn single_value(mut self) -> Self {
        self.single_value = true;
        self
    }

    pub fn collective(mut self) -> Self {
        self.collective = true;
        self
    }

    pub fn no_user_modification(mut self) -> Self {
        self.no_user_modification = true;
        self
    }
}

/// A validated attribute type. Syntax and matching-rule fields hold the
/// resolved OIDs, with inheritance from the superior already applied; the
/// struct never changes after the owning schema is frozen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeType {
    oid: String,
    names: Vec<String>,
    description: String,
    superior_oid: Option<String>,
    syntax_oid: String,
    equality_oid: Option<String>,
    ordering_oid: Option<String>,
    substring_oid: Option<String>,
    approximate_oid: Option<String>,
    usage: AttributeUsage,
    single_value: bool,
    collective: bool,
    no_user_modification: bool,
    obsolete: bool,
    place_holder: bool,
}

impl AttributeType {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn resolved(
        definition: &AttributeTypeDefinition,
        superior_oid: Option<String>,
        syntax_oid: String,
        equality_oid: Option<String>,
        ordering_oid: Option<String>,
        substring_oid: Option<String>,
        approximate_oid: Option<String>,
    ) -> Self {
        Self {
            oid: definition.oid.clone(),
            names: definition.names.clone(),
            description: definition.description.clone(),
            superior_oid,
            syntax_oid,
            equality_oid,
            ordering_oid,
            substring_oid,
            approximate_oid,
            usage: definition.usage,
            single_value: definition.single_value,
            collective: definition.collective,
            no_user_modification: definition.no_user_modification,
            obsolete: definition.obsolete,
            place_holder: false,
        }
    }

    /// Stand-in for a name unknown to a non-strict schema: synthetic OID,
    /// Directory String syntax, case-ignore equality.
    pub(crate) fn new_place_holder(name: &str) -> Self {
        Self {
            oid: format!("{}-oid", name.to_lowercase()),
            names: vec![name.to_string()],
            description: String::new(),
            superior_oid: None,
            syntax_oid: DIRECTORY_STRING_SYNTAX_OID.to_string(),
            equality_oid: Some(CASE_IGNORE_MATCH_OID.to_string()),
            ordering_oid: None,
            substring_oid: None,
            approximate_oid: None,
            usage: AttributeUsage::UserApplications,
            single_value: false,
            collective: false,
            no_user_modification: false,
            obsolete: false,
            place_holder: true,
        }
    }

    pub fn oid(&self) -> &str {
        &self.oid
    }

    /// The primary name, or the OID when the type is unnamed.
    pub fn name(&self) -> &str {
        self.names.first().map_or(&self.oid, String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.names.iter().any(|n| n.eq_ignore_ascii_case(name))
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn superior_oid(&self) -> Option<&str> {
        self.superior_oid.as_deref()
    }

    pub fn syntax_oid(&self) -> &str {
        &self.syntax_oid
    }

    pub fn equality_rule_oid(&self) -> Option<&str> {
        self.equality_oid.as_deref()
    }

    pub fn ordering_rule_oid(&self) -> Option<&str> {
        self.ordering_oid.as_deref()
    }

    pub fn substring_rule_oid(&self) -> Option<&str> {
        self.substring_oid.as_deref()
    }

    pub fn approximate_rule_oid(&self) -> Option<&str> {
        self.approximate_oid.as_deref()
    }

    pub fn usage(&self) -> AttributeUsage {
        self.usage
    }

    pub fn is_operational(&self) -> bool {
        self.usage.is_operational()
    }

    pub fn is_single_value(&self) -> bool {
        self.single_value
    }

    pub fn is_collective(&self) -> bool {
        self.collective
    }

    pub fn is_no_user_modification(&self) -> bool {
        self.no_user_modification
    }

    pub fn is_obsolete(&self) -> bool {
        self.obsolete
    }

    pub fn is_place_holder(&self) -> bool {
        self.place_holder
    }

    /// Identity check relaxed for place-holders: two real types match only
    /// on OID, while a place-holder matches any type carrying its name.
    pub fn matches(&self, other: &AttributeType) -> bool {
        if self.oid == other.oid {
            return true;
        }
        (self.place_holder || other.place_holder)
            && (self.has_name(other.name()) || other.has_name(self.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn real_cn() -> AttributeType {
        AttributeType::resolved(
            &AttributeTypeDefinition::new("2.5.4.3", "cn").alias("commonName"),
            None,
            DIRECTORY_STRING_SYNTAX_OID.to_string(),
            Some(CASE_IGNORE_MATCH_OID.to_string()),
            None,
            None,
            None,
        )
    }

    #[test]
    fn test_place_holder_oid_synthesis() {
        let place_holder = AttributeType::new_place_holder("displayName");
        assert_eq!(place_holder.oid(), "displayname-oid");
        assert_eq!(place_holder.name(), "displayName");
        assert!(place_holder.is_place_holder());
    }

    #[test]
    fn test_matches_is_relaxed_only_for_place_holders() {
        let cn = real_cn();
        let place_holder = AttributeType::new_place_holder("CN");
        assert!(place_holder.matches(&cn));
        assert!(cn.matches(&place_holder));

        let other = AttributeType::new_place_holder("sn");
        assert!(!other.matches(&cn));

        // Two distinct real types never match, even when names collide.
        let impostor = AttributeType::resolved(
            &AttributeTypeDefinition::new("9.9.9.9", "cn"),
            None,
            DIRECTORY_STRING_SYNTAX_OID.to_string(),
            None,
            None,
            None,
            None,
        );
        assert!(!impostor.matches(&cn));
        assert!(cn.matches(&cn.clone()));
    }

    #[test]
    fn test_usage_serde_names() {
        let json = serde_json::to_string(&AttributeUsage::DsaOperation).unwrap();
        assert_eq!(json, "\"dSAOperation\"");
        let usage: AttributeUsage = serde_json::from_str("\"directoryOperation\"").unwrap();
        assert_eq!(usage, AttributeUsage::DirectoryOperation);
    }
}

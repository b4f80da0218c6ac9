//! Bootstrap subset of the standard schema.
//!
//! Covers the RFC 4512/4517 elements the engine's own matching rules and
//! tests depend on; directory deployments extend it through
//! [`SchemaBuilder`] or JSON schema documents.

use std::sync::{Arc, OnceLock};

use crate::matching::integer::{integer_equality_rule, integer_ordering_rule};
use crate::matching::metaphone::DoubleMetaphoneApproximateRule;
use crate::matching::strings::{
    case_exact_equality_rule, case_ignore_equality_rule, case_ignore_ordering_rule,
    case_ignore_substring_rule, object_identifier_equality_rule, octet_string_equality_rule,
};
use crate::matching::time::{
    PartialDateTimeRule, RelativeTimeOrderingRule, generalized_time_equality_rule,
    generalized_time_ordering_rule,
};
use crate::matching::uuid::{UuidEqualityRule, UuidOrderingRule};
use crate::schema::attribute_type::{AttributeTypeDefinition, AttributeUsage};
use crate::schema::builder::{SchemaBuilder, TOP_OBJECT_CLASS_OID};
use crate::schema::matching_rule::MatchingRule;
use crate::schema::object_class::{ObjectClassDefinition, ObjectClassKind};
use crate::schema::registry::Schema;
use crate::schema::syntax::{
    DIRECTORY_STRING_SYNTAX_OID, DirectoryStringSyntaxHandler, GENERALIZED_TIME_SYNTAX_OID,
    GeneralizedTimeSyntaxHandler, INTEGER_SYNTAX_OID, IntegerSyntaxHandler, OCTET_STRING_SYNTAX_OID,
    OID_SYNTAX_OID, OidSyntaxHandler, Syntax, UUID_SYNTAX_OID, UuidSyntaxHandler,
};

/// A builder pre-loaded with the standard syntaxes and matching rules but
/// no attribute types or object classes.
pub fn base_builder() -> SchemaBuilder {
    SchemaBuilder::new()
        .add_syntax(
            Syntax::new(DIRECTORY_STRING_SYNTAX_OID, "Directory String")
                .human_readable()
                .default_equality("2.5.13.2")
                .default_ordering("2.5.13.3")
                .default_substring("2.5.13.4")
                .default_approximate("1.3.6.1.4.1.26027.1.4.1")
                .with_handler(Arc::new(DirectoryStringSyntaxHandler)),
        )
        .add_syntax(
            Syntax::new(INTEGER_SYNTAX_OID, "INTEGER")
                .human_readable()
                .default_equality("2.5.13.14")
                .default_ordering("2.5.13.15")
                .with_handler(Arc::new(IntegerSyntaxHandler)),
        )
        .add_syntax(
            Syntax::new(GENERALIZED_TIME_SYNTAX_OID, "Generalized Time")
                .human_readable()
                .default_equality("2.5.13.27")
                .default_ordering("2.5.13.28")
                .with_handler(Arc::new(GeneralizedTimeSyntaxHandler)),
        )
        .add_syntax(
            Syntax::new(OID_SYNTAX_OID, "OID")
                .human_readable()
                .default_equality("2.5.13.0")
                .with_handler(Arc::new(OidSyntaxHandler)),
        )
        .add_syntax(Syntax::new(OCTET_STRING_SYNTAX_OID, "Octet String").default_equality("2.5.13.17"))
        .add_syntax(
            Syntax::new(UUID_SYNTAX_OID, "UUID")
                .human_readable()
                .default_equality("1.3.6.1.1.16.2")
                .default_ordering("1.3.6.1.1.16.3")
                .with_handler(Arc::new(UuidSyntaxHandler)),
        )
        .add_matching_rule(MatchingRule::new(
            "2.5.13.0",
            "objectIdentifierMatch",
            OID_SYNTAX_OID,
            Arc::new(object_identifier_equality_rule()),
        ))
        .add_matching_rule(MatchingRule::new(
            "2.5.13.2",
            "caseIgnoreMatch",
            DIRECTORY_STRING_SYNTAX_OID,
            Arc::new(case_ignore_equality_rule()),
        ))
        .add_matching_rule(MatchingRule::new(
            "2.5.13.3",
            "caseIgnoreOrderingMatch",
            DIRECTORY_STRING_SYNTAX_OID,
            Arc::new(case_ignore_ordering_rule()),
        ))
        .add_matching_rule(MatchingRule::new(
            "2.5.13.4",
            "caseIgnoreSubstringsMatch",
            DIRECTORY_STRING_SYNTAX_OID,
            Arc::new(case_ignore_substring_rule()),
        ))
        .add_matching_rule(MatchingRule::new(
            "2.5.13.5",
            "caseExactMatch",
            DIRECTORY_STRING_SYNTAX_OID,
            Arc::new(case_exact_equality_rule()),
        ))
        .add_matching_rule(MatchingRule::new(
            "2.5.13.14",
            "integerMatch",
            INTEGER_SYNTAX_OID,
            Arc::new(integer_equality_rule()),
        ))
        .add_matching_rule(MatchingRule::new(
            "2.5.13.15",
            "integerOrderingMatch",
            INTEGER_SYNTAX_OID,
            Arc::new(integer_ordering_rule()),
        ))
        .add_matching_rule(MatchingRule::new(
            "2.5.13.17",
            "octetStringMatch",
            OCTET_STRING_SYNTAX_OID,
            Arc::new(octet_string_equality_rule()),
        ))
        .add_matching_rule(MatchingRule::new(
            "2.5.13.27",
            "generalizedTimeMatch",
            GENERALIZED_TIME_SYNTAX_OID,
            Arc::new(generalized_time_equality_rule()),
        ))
        .add_matching_rule(MatchingRule::new(
            "2.5.13.28",
            "generalizedTimeOrderingMatch",
            GENERALIZED_TIME_SYNTAX_OID,
            Arc::new(generalized_time_ordering_rule()),
        ))
        .add_matching_rule(MatchingRule::new(
            "1.3.6.1.1.16.2",
            "uuidMatch",
            UUID_SYNTAX_OID,
            Arc::new(UuidEqualityRule),
        ))
        .add_matching_rule(MatchingRule::new(
            "1.3.6.1.1.16.3",
            "uuidOrderingMatch",
            UUID_SYNTAX_OID,
            Arc::new(UuidOrderingRule),
        ))
        .add_matching_rule(MatchingRule::new(
            "1.3.6.1.4.1.26027.1.4.1",
            "ds-mr-double-metaphone-approx",
            DIRECTORY_STRING_SYNTAX_OID,
            Arc::new(DoubleMetaphoneApproximateRule),
        ))
        .add_matching_rule(
            MatchingRule::new(
                "1.3.6.1.4.1.26027.1.4.5",
                "relativeTimeGTOrderingMatch",
                GENERALIZED_TIME_SYNTAX_OID,
                Arc::new(RelativeTimeOrderingRule::greater_than()),
            )
            .alias("relativeTimeOrderingMatch.gt"),
        )
        .add_matching_rule(
            MatchingRule::new(
                "1.3.6.1.4.1.26027.1.4.6",
                "relativeTimeLTOrderingMatch",
                GENERALIZED_TIME_SYNTAX_OID,
                Arc::new(RelativeTimeOrderingRule::less_than()),
            )
            .alias("relativeTimeOrderingMatch.lt"),
        )
        .add_matching_rule(MatchingRule::new(
            "1.3.6.1.4.1.26027.1.4.7",
            "partialDateAndTimeMatchingRule",
            GENERALIZED_TIME_SYNTAX_OID,
            Arc::new(PartialDateTimeRule),
        ))
}

/// [`base_builder`] plus the standard attribute types and object classes.
pub fn core_builder() -> SchemaBuilder {
    base_builder()
        .add_attribute_type(
            AttributeTypeDefinition::new("2.5.4.0", "objectClass")
                .syntax(OID_SYNTAX_OID)
                .equality("objectIdentifierMatch"),
        )
        .add_attribute_type(
            AttributeTypeDefinition::new("2.5.4.41", "name")
                .syntax(DIRECTORY_STRING_SYNTAX_OID)
                .equality("caseIgnoreMatch")
                .substring("caseIgnoreSubstringsMatch"),
        )
        .add_attribute_type(
            AttributeTypeDefinition::new("2.5.4.3", "cn")
                .alias("commonName")
                .superior("name")
                .approximate("ds-mr-double-metaphone-approx"),
        )
        .add_attribute_type(
            AttributeTypeDefinition::new("2.5.4.4", "sn")
                .alias("surname")
                .superior("name")
                .approximate("ds-mr-double-metaphone-approx"),
        )
        .add_attribute_type(
            AttributeTypeDefinition::new("2.5.4.13", "description")
                .syntax(DIRECTORY_STRING_SYNTAX_OID)
                .equality("caseIgnoreMatch")
                .substring("caseIgnoreSubstringsMatch"),
        )
        .add_attribute_type(
            AttributeTypeDefinition::new("0.9.2342.19200300.100.1.1", "uid")
                .syntax(DIRECTORY_STRING_SYNTAX_OID)
                .equality("caseIgnoreMatch")
                .substring("caseIgnoreSubstringsMatch"),
        )
        .add_attribute_type(
            AttributeTypeDefinition::new("1.3.6.1.1.16.4", "entryUUID")
                .syntax(UUID_SYNTAX_OID)
                .equality("uuidMatch")
                .ordering("uuidOrderingMatch")
                .usage(AttributeUsage::DirectoryOperation)
                .single_value()
                .no_user_modification(),
        )
        .add_attribute_type(
            AttributeTypeDefinition::new("2.5.18.1", "createTimestamp")
                .syntax(GENERALIZED_TIME_SYNTAX_OID)
                .equality("generalizedTimeMatch")
                .ordering("generalizedTimeOrderingMatch")
                .usage(AttributeUsage::DirectoryOperation)
                .single_value()
                .no_user_modification(),
        )
        .add_attribute_type(
            AttributeTypeDefinition::new("2.5.18.2", "modifyTimestamp")
                .syntax(GENERALIZED_TIME_SYNTAX_OID)
                .equality("generalizedTimeMatch")
                .ordering("generalizedTimeOrderingMatch")
                .usage(AttributeUsage::DirectoryOperation)
                .single_value()
                .no_user_modification(),
        )
        .add_object_class(
            ObjectClassDefinition::new(TOP_OBJECT_CLASS_OID, "top", ObjectClassKind::Abstract)
                .requires("objectClass"),
        )
        .add_object_class(
            ObjectClassDefinition::new("2.5.6.6", "person", ObjectClassKind::Structural)
                .superior("top")
                .requires("cn")
                .requires("sn")
                .allows("description"),
        )
}

/// The shared, immutable core schema. Built once and cheap to clone.
pub fn core_schema() -> Schema {
    static CORE: OnceLock<Schema> = OnceLock::new();
    CORE.get_or_init(|| {
        core_builder()
            .build()
            .expect("the built-in core schema definitions are valid")
    })
    .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_schema_builds() {
        let schema = core_schema();
        // The octet string syntax deliberately carries no handler.
        assert_eq!(schema.warnings().len(), 1);

        let person = schema.get_object_class("person").unwrap();
        let cn = schema.get_attribute_type("cn").unwrap();
        let sn = schema.get_attribute_type("sn").unwrap();
        let description = schema.get_attribute_type("description").unwrap();
        assert!(person.is_required(&cn));
        assert!(person.is_required(&sn));
        assert!(person.is_optional(&description));
        // objectClass is required via top.
        let object_class = schema.get_attribute_type("objectClass").unwrap();
        assert!(person.is_required(&object_class));
    }

    #[test]
    fn test_cn_inherits_from_name() {
        let schema = core_schema();
        let cn = schema.get_attribute_type("cn").unwrap();
        assert_eq!(cn.superior_oid(), Some("2.5.4.41"));
        assert_eq!(cn.syntax_oid(), DIRECTORY_STRING_SYNTAX_OID);
        assert_eq!(cn.equality_rule_oid(), Some("2.5.13.2"));
        assert_eq!(cn.substring_rule_oid(), Some("2.5.13.4"));
        assert_eq!(cn.approximate_rule_oid(), Some("1.3.6.1.4.1.26027.1.4.1"));
    }

    #[test]
    fn test_time_rules_registered() {
        let schema = core_schema();
        for name in [
            "relativeTimeGTOrderingMatch",
            "relativeTimeOrderingMatch.gt",
            "relativeTimeLTOrderingMatch",
            "partialDateAndTimeMatchingRule",
        ] {
            assert!(schema.has_matching_rule(name), "{name} missing");
        }
    }
}

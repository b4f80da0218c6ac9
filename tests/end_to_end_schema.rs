//! End-to-end schema and matching scenarios exercised through the public
//! API: build a schema from definitions, validate it, and run filters
//! against stored values the way a directory backend would.

use ldap_schema::schema::core::{base_builder, core_schema};
use ldap_schema::schema::syntax::DIRECTORY_STRING_SYNTAX_OID;
use ldap_schema::{
    AttributeTypeDefinition, ObjectClassDefinition, ObjectClassKind, Schema, SchemaError,
};

fn person_schema() -> Schema {
    base_builder()
        .add_attribute_type(
            AttributeTypeDefinition::new("2.5.4.3", "cn")
                .alias("commonName")
                .syntax(DIRECTORY_STRING_SYNTAX_OID)
                .equality("caseIgnoreMatch")
                .substring("caseIgnoreSubstringsMatch"),
        )
        .add_attribute_type(
            AttributeTypeDefinition::new("2.5.4.4", "sn")
                .syntax(DIRECTORY_STRING_SYNTAX_OID)
                .equality("caseIgnoreMatch"),
        )
        .add_object_class(ObjectClassDefinition::new(
            "2.5.6.0",
            "top",
            ObjectClassKind::Abstract,
        ))
        .add_object_class(
            ObjectClassDefinition::new("2.5.6.6", "person", ObjectClassKind::Structural)
                .superior("top")
                .requires("cn")
                .requires("sn"),
        )
        .build()
        .expect("person schema is valid")
}

#[test]
fn test_person_requires_cn_and_substring_filters_match() {
    let schema = person_schema();
    let person = schema.get_object_class("person").unwrap();
    let cn = schema.get_attribute_type("cn").unwrap();
    assert!(person.is_required(&cn));

    let substring_rule = schema
        .get_matching_rule(cn.substring_rule_oid().unwrap())
        .unwrap();
    let stored = substring_rule
        .normalize_attribute_value(&schema, b"john")
        .unwrap();

    let hit = substring_rule
        .get_substring_assertion(&schema, b"j*n")
        .unwrap();
    assert!(hit.matches(&stored).to_bool());

    let miss = substring_rule
        .get_substring_assertion(&schema, b"j*x")
        .unwrap();
    assert!(!miss.matches(&stored).to_bool());
}

#[test]
fn test_equality_filter_folds_case_and_whitespace() {
    let schema = person_schema();
    let cn = schema.get_attribute_type("cn").unwrap();
    let rule = schema
        .get_matching_rule(cn.equality_rule_oid().unwrap())
        .unwrap();

    let stored = rule
        .normalize_attribute_value(&schema, b"  John   Doe ")
        .unwrap();
    let assertion = rule.get_assertion(&schema, b"JOHN DOE").unwrap();
    assert!(assertion.matches(&stored).to_bool());
}

#[test]
fn test_non_strict_place_holder_interoperates_with_real_types() {
    let schema = person_schema();
    let relaxed = schema.as_non_strict();

    let unknown = relaxed.get_attribute_type("displayName").unwrap();
    assert!(unknown.is_place_holder());
    assert_eq!(unknown.oid(), "displayname-oid");

    let cn = relaxed.get_attribute_type("cn").unwrap();
    // A schema that never saw "cn" synthesizes a place-holder that still
    // matches the real type by name.
    let empty = base_builder().build().unwrap().as_non_strict();
    let cn_place_holder = empty.get_attribute_type("cn").unwrap();
    assert!(cn_place_holder.is_place_holder());
    assert!(cn_place_holder.matches(&cn));
    assert!(!unknown.matches(&cn));
}

#[test]
fn test_validation_failures_surface_every_error() {
    let errors = base_builder()
        .add_attribute_type(AttributeTypeDefinition::new("1.1.1", "broken").superior("missing"))
        .add_object_class(ObjectClassDefinition::new(
            "1.2.1",
            "orphan",
            ObjectClassKind::Structural,
        ))
        .build()
        .unwrap_err();

    assert!(errors
        .iter()
        .any(|e| matches!(e, SchemaError::UnknownReference { .. })));
    assert!(errors
        .iter()
        .any(|e| matches!(e, SchemaError::NotDerivedFromTop { .. })));
}

#[test]
fn test_relative_time_filters_against_the_core_schema() {
    let schema = core_schema();
    let gt = schema
        .get_matching_rule("relativeTimeGTOrderingMatch")
        .unwrap();

    // More recent than one day ago.
    let assertion = gt.get_assertion(&schema, b"-1d").unwrap();
    let far_future = gt
        .normalize_attribute_value(&schema, b"29900101000000Z")
        .unwrap();
    let far_past = gt
        .normalize_attribute_value(&schema, b"19900101000000Z")
        .unwrap();
    assert!(assertion.matches(&far_future).to_bool());
    assert!(!assertion.matches(&far_past).to_bool());
}

#[test]
fn test_approximate_match_through_the_schema() {
    let schema = core_schema();
    let cn = schema.get_attribute_type("cn").unwrap();
    let approx = schema
        .get_matching_rule(cn.approximate_rule_oid().unwrap())
        .unwrap();

    let stored = approx
        .normalize_attribute_value(&schema, b"Kathryn")
        .unwrap();
    let assertion = approx.get_assertion(&schema, b"Catherine").unwrap();
    assert!(assertion.matches(&stored).to_bool());

    let unrelated = approx.get_assertion(&schema, b"Smith").unwrap();
    assert!(!unrelated.matches(&stored).to_bool());
}

//! Error types for schema construction and value decoding.
//!
//! The engine has two independent failure channels: decode failures raised
//! while parsing attribute or assertion values, and schema failures raised
//! while resolving and validating schema elements. Decode failures are
//! always synchronous and deterministic; nothing in this crate retries.

/// Errors raised while decoding an attribute or assertion value.
///
/// Every variant carries enough context to produce a human-readable
/// diagnostic pointing at the offending input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// A value does not conform to its attribute syntax
    #[error("Value '{value}' is not valid for syntax {syntax_oid}: {reason}")]
    InvalidSyntax {
        value: String,
        syntax_oid: String,
        reason: String,
    },

    /// An integer value could not be parsed
    #[error("'{value}' is not a valid integer value")]
    InvalidInteger { value: String },

    /// A UUID is malformed at a specific position
    #[error("Invalid UUID '{value}': unexpected character '{character}' at position {position}")]
    InvalidUuid {
        value: String,
        position: usize,
        character: char,
    },

    /// A UUID has the wrong length
    #[error("Invalid UUID '{value}': expected 36 characters but found {length}")]
    InvalidUuidLength { value: String, length: usize },

    /// A substring pattern contains an empty fragment between wildcards
    #[error("Substring pattern '{pattern}' contains consecutive wildcards at position {position}")]
    EmptySubstringFragment { pattern: String, position: usize },

    /// A substring pattern contains a bad escape sequence
    #[error("Substring pattern '{pattern}' contains an invalid escape sequence at position {position}")]
    InvalidEscapeSequence { pattern: String, position: usize },

    /// A substring assertion was requested with no fragments at all
    #[error("Substring assertion must contain at least one fragment")]
    NoSubstringFragments,

    /// A generalized time value is malformed
    #[error("'{value}' is not a valid generalized time value: {reason}")]
    InvalidGeneralizedTime { value: String, reason: String },

    /// A relative time assertion is malformed
    #[error("'{value}' is not a valid relative time assertion: {reason}")]
    InvalidRelativeTime { value: String, reason: String },

    /// A partial date/time assertion is malformed
    #[error("'{value}' is not a valid partial date/time assertion: {reason}")]
    InvalidPartialDateTime { value: String, reason: String },

    /// A value that must be UTF-8 text is not
    #[error("Value is not valid UTF-8 text")]
    NotUtf8,
}

impl DecodeError {
    /// Create a syntax-violation error.
    pub fn invalid_syntax(
        value: impl Into<String>,
        syntax_oid: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidSyntax {
            value: value.into(),
            syntax_oid: syntax_oid.into(),
            reason: reason.into(),
        }
    }

    /// Create a generalized-time parse error.
    pub fn invalid_time(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidGeneralizedTime {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a relative-time parse error.
    pub fn invalid_relative_time(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRelativeTime {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a partial date/time parse error.
    pub fn invalid_partial_date_time(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPartialDateTime {
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Hard failures raised while validating schema elements.
///
/// An element that triggers one of these is marked invalid and excluded
/// from the frozen schema; all failures for a build are collected rather
/// than reported one at a time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// A referenced schema element does not exist
    #[error("{referencing_kind} {referencing} references unknown {referenced_kind} '{referenced}'")]
    UnknownReference {
        referencing_kind: &'static str,
        referencing: String,
        referenced_kind: &'static str,
        referenced: String,
    },

    /// A lookup on a strict schema did not find the element
    #[error("Unknown {kind} '{name}'")]
    UnknownSchemaElement { kind: &'static str, name: String },

    /// Two elements claim the same OID
    #[error("Duplicate {kind} definition for OID {oid}")]
    DuplicateOid { kind: &'static str, oid: String },

    /// An element has neither an OID nor a name
    #[error("A {kind} definition must have an OID")]
    MissingOid { kind: &'static str },

    /// An attribute type declares no syntax and cannot inherit one
    #[error("Attribute type {oid} declares no syntax and inherits none")]
    MissingSyntax { oid: String },

    /// A schema definition document could not be parsed
    #[error("Malformed schema definition document: {detail}")]
    DefinitionFormat { detail: String },

    /// Superior chains that loop back on themselves
    #[error("Circular superior chain detected while validating {kind} {oid}")]
    CircularReference { kind: &'static str, oid: String },

    /// An object class derives from a class of an incompatible kind
    #[error(
        "Object class {oid} is declared {kind} but its superior {superior_oid} is {superior_kind}"
    )]
    InvalidSuperiorKind {
        oid: String,
        kind: String,
        superior_oid: String,
        superior_kind: String,
    },

    /// A structural object class does not reach the root class
    #[error("Structural object class {oid} does not derive from 'top'")]
    NotDerivedFromTop { oid: String },

    /// A DIT content rule prohibits an attribute required elsewhere
    #[error(
        "DIT content rule for {structural_oid} prohibits attribute '{attribute}' which is required by {required_by}"
    )]
    ProhibitedAttributeRequired {
        structural_oid: String,
        attribute: String,
        required_by: String,
    },

    /// A DIT content rule names a class of the wrong kind
    #[error("DIT content rule for {structural_oid} expects {expected} class but {oid} is {actual}")]
    ContentRuleClassKind {
        structural_oid: String,
        oid: String,
        expected: String,
        actual: String,
    },

    /// An element failed because one of its dependencies failed
    #[error("{kind} {oid} depends on invalid element {dependency}")]
    InvalidDependency {
        kind: &'static str,
        oid: String,
        dependency: String,
    },
}

impl SchemaError {
    /// Create an unknown-reference error.
    pub fn unknown_reference(
        referencing_kind: &'static str,
        referencing: impl Into<String>,
        referenced_kind: &'static str,
        referenced: impl Into<String>,
    ) -> Self {
        Self::UnknownReference {
            referencing_kind,
            referencing: referencing.into(),
            referenced_kind,
            referenced: referenced.into(),
        }
    }

    /// Create an unknown-element lookup error.
    pub fn unknown_element(kind: &'static str, name: impl Into<String>) -> Self {
        Self::UnknownSchemaElement {
            kind,
            name: name.into(),
        }
    }
}

/// Soft warnings collected during schema validation.
///
/// Warnings do not invalidate the element that produced them; callers
/// decide whether to escalate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaWarning {
    /// A collective attribute with a non-default usage
    #[error("Collective attribute type {oid} has usage '{usage}' instead of userApplications")]
    CollectiveOperationalAttribute { oid: String, usage: String },

    /// NO-USER-MODIFICATION on a non-operational attribute
    #[error("Attribute type {oid} is declared NO-USER-MODIFICATION but is not operational")]
    NoUserModificationNotOperational { oid: String },

    /// A syntax with no registered handler falls back to accept-all
    #[error("Syntax {oid} has no registered handler; values will not be checked")]
    UnhandledSyntax { oid: String },

    /// A matching rule use names an obsolete matching rule
    #[error("Matching rule use for {oid} refers to an obsolete matching rule")]
    ObsoleteMatchingRule { oid: String },
}

// Result type aliases for convenience
pub type DecodeResult<T> = Result<T, DecodeError>;
pub type SchemaResult<T> = Result<T, SchemaError>;

//! Attribute syntaxes and their value-acceptance handlers.

use std::fmt;
use std::sync::Arc;

use crate::error::{DecodeError, DecodeResult};
use crate::matching::integer::normalize_integer;
use crate::matching::time::parse_generalized_time;
use crate::matching::uuid::normalize_uuid;

pub const DIRECTORY_STRING_SYNTAX_OID: &str = "1.3.6.1.4.1.1466.115.121.1.15";
pub const GENERALIZED_TIME_SYNTAX_OID: &str = "1.3.6.1.4.1.1466.115.121.1.24";
pub const INTEGER_SYNTAX_OID: &str = "1.3.6.1.4.1.1466.115.121.1.27";
pub const OID_SYNTAX_OID: &str = "1.3.6.1.4.1.1466.115.121.1.38";
pub const OCTET_STRING_SYNTAX_OID: &str = "1.3.6.1.4.1.1466.115.121.1.40";
pub const UUID_SYNTAX_OID: &str = "1.3.6.1.1.16.1";

/// Decides whether a raw value conforms to a syntax.
///
/// Handlers are registered on the [`Syntax`] element; a syntax without one
/// accepts every value and the schema build records a warning.
pub trait SyntaxHandler: Send + Sync + fmt::Debug {
    fn value_is_acceptable(&self, value: &[u8]) -> DecodeResult<()>;
}

/// An attribute syntax: value shape plus the default matching rules
/// attribute types of this syntax fall back to.
#[derive(Debug, Clone)]
pub struct Syntax {
    oid: String,
    description: String,
    human_readable: bool,
    equality_oid: Option<String>,
    ordering_oid: Option<String>,
    substring_oid: Option<String>,
    approximate_oid: Option<String>,
    handler: Option<Arc<dyn SyntaxHandler>>,
}

impl Syntax {
    pub fn new(oid: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            description: description.into(),
            human_readable: false,
            equality_oid: None,
            ordering_oid: None,
            substring_oid: None,
            approximate_oid: None,
            handler: None,
        }
    }

    pub fn human_readable(mut self) -> Self {
        self.human_readable = true;
        self
    }

    pub fn default_equality(mut self, rule_oid: impl Into<String>) -> Self {
        self.equality_oid = Some(rule_oid.into());
        self
    }

    pub fn default_ordering(mut self, rule_oid: impl Into<String>) -> Self {
        self.ordering_oid = Some(rule_oid.into());
        self
    }

    pub fn default_substring(mut self, rule_oid: impl Into<String>) -> Self {
        self.substring_oid = Some(rule_oid.into());
        self
    }

    pub fn default_approximate(mut self, rule_oid: impl Into<String>) -> Self {
        self.approximate_oid = Some(rule_oid.into());
        self
    }

    pub fn with_handler(mut self, handler: Arc<dyn SyntaxHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn oid(&self) -> &str {
        &self.oid
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_human_readable(&self) -> bool {
        self.human_readable
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

    pub(crate) fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Check a raw value against this syntax. A syntax without a handler
    /// accepts everything.
    pub fn value_is_acceptable(&self, value: &[u8]) -> DecodeResult<()> {
        match &self.handler {
            Some(handler) => handler.value_is_acceptable(value),
            None => Ok(()),
        }
    }
}

fn reject(value: &[u8], syntax_oid: &str, reason: &str) -> DecodeError {
    DecodeError::invalid_syntax(String::from_utf8_lossy(value), syntax_oid, reason)
}

/// Directory String: non-empty UTF-8.
#[derive(Debug)]
pub struct DirectoryStringSyntaxHandler;

impl SyntaxHandler for DirectoryStringSyntaxHandler {
    fn value_is_acceptable(&self, value: &[u8]) -> DecodeResult<()> {
        if value.is_empty() {
            return Err(reject(value, DIRECTORY_STRING_SYNTAX_OID, "empty value"));
        }
        std::str::from_utf8(value)
            .map(|_| ())
            .map_err(|_| reject(value, DIRECTORY_STRING_SYNTAX_OID, "not valid UTF-8"))
    }
}

#[derive(Debug)]
pub struct IntegerSyntaxHandler;

impl SyntaxHandler for IntegerSyntaxHandler {
    fn value_is_acceptable(&self, value: &[u8]) -> DecodeResult<()> {
        normalize_integer(value).map(|_| ())
    }
}

#[derive(Debug)]
pub struct GeneralizedTimeSyntaxHandler;

impl SyntaxHandler for GeneralizedTimeSyntaxHandler {
    fn value_is_acceptable(&self, value: &[u8]) -> DecodeResult<()> {
        let text = std::str::from_utf8(value)
            .map_err(|_| reject(value, GENERALIZED_TIME_SYNTAX_OID, "not valid UTF-8"))?;
        parse_generalized_time(text.trim()).map(|_| ())
    }
}

#[derive(Debug)]
pub struct UuidSyntaxHandler;

impl SyntaxHandler for UuidSyntaxHandler {
    fn value_is_acceptable(&self, value: &[u8]) -> DecodeResult<()> {
        normalize_uuid(value).map(|_| ())
    }
}

/// OID syntax: dotted-decimal, or a descriptor starting with a letter.
#[derive(Debug)]
pub struct OidSyntaxHandler;

impl SyntaxHandler for OidSyntaxHandler {
    fn value_is_acceptable(&self, value: &[u8]) -> DecodeResult<()> {
        let text = std::str::from_utf8(value)
            .map_err(|_| reject(value, OID_SYNTAX_OID, "not valid UTF-8"))?
            .trim();
        let mut chars = text.chars();
        let acceptable = match chars.next() {
            Some(c) if c.is_ascii_digit() => {
                !text.ends_with('.')
                    && !text.contains("..")
                    && text.chars().all(|c| c.is_ascii_digit() || c == '.')
            }
            Some(c) if c.is_ascii_alphabetic() => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
            }
            _ => false,
        };
        if acceptable {
            Ok(())
        } else {
            Err(reject(value, OID_SYNTAX_OID, "neither an OID nor a descriptor"))
        }
    }
}

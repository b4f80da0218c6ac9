//! Directory-string normalization and the standard string matching rules.
//!
//! Normalization follows the X.520 string preparation rules this engine's
//! consumers already index under: leading and trailing whitespace is
//! removed, interior whitespace runs collapse to a single space, and
//! case-insensitive rules fold through Unicode lowercase.

use crate::error::DecodeResult;
use crate::matching::rule::{
    DefaultEqualityRule, DefaultOrderingRule, KeywordEqualityRule, utf8,
};
use crate::matching::substring::DefaultSubstringRule;

/// Trim and collapse whitespace without case folding.
pub(crate) fn fold_case_exact(value: &[u8]) -> DecodeResult<Vec<u8>> {
    let text = utf8(value)?;
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    Ok(out.into_bytes())
}

/// Trim, collapse whitespace, and fold to Unicode lowercase.
pub(crate) fn fold_case_ignore(value: &[u8]) -> DecodeResult<Vec<u8>> {
    let text = utf8(value)?;
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        for c in word.chars() {
            out.extend(c.to_lowercase());
        }
    }
    Ok(out.into_bytes())
}

/// Identity normalization for octet strings.
pub(crate) fn identity(value: &[u8]) -> DecodeResult<Vec<u8>> {
    Ok(value.to_vec())
}

/// `caseIgnoreMatch` (2.5.13.2).
pub fn case_ignore_equality_rule() -> DefaultEqualityRule {
    DefaultEqualityRule::new("caseIgnoreMatch", fold_case_ignore)
}

/// `caseIgnoreOrderingMatch` (2.5.13.3).
pub fn case_ignore_ordering_rule() -> DefaultOrderingRule {
    DefaultOrderingRule::new("caseIgnoreOrderingMatch", fold_case_ignore)
}

/// `caseIgnoreSubstringsMatch` (2.5.13.4).
pub fn case_ignore_substring_rule() -> DefaultSubstringRule {
    DefaultSubstringRule::new(
        "caseIgnoreSubstringsMatch",
        "caseIgnoreMatch",
        fold_case_ignore,
    )
}

/// `caseExactMatch` (2.5.13.5).
pub fn case_exact_equality_rule() -> DefaultEqualityRule {
    DefaultEqualityRule::new("caseExactMatch", fold_case_exact)
}

/// `octetStringMatch` (2.5.13.17).
pub fn octet_string_equality_rule() -> DefaultEqualityRule {
    DefaultEqualityRule::new("octetStringMatch", identity)
}

/// `objectIdentifierMatch` (2.5.13.0). Keyword matching over OIDs and
/// descriptors; deliberately unindexed.
pub fn object_identifier_equality_rule() -> KeywordEqualityRule {
    KeywordEqualityRule::new(fold_case_ignore)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_ignore_folds_case_and_whitespace() {
        assert_eq!(
            fold_case_ignore(b"  John   F.  Kennedy  ").unwrap(),
            b"john f. kennedy".to_vec()
        );
    }

    #[test]
    fn test_case_exact_preserves_case() {
        assert_eq!(
            fold_case_exact(b" John  Smith ").unwrap(),
            b"John Smith".to_vec()
        );
    }

    #[test]
    fn test_case_ignore_handles_unicode() {
        assert_eq!(fold_case_ignore("Müller".as_bytes()).unwrap(), "müller".as_bytes().to_vec());
    }

    #[test]
    fn test_empty_and_blank_values() {
        assert_eq!(fold_case_ignore(b"").unwrap(), Vec::<u8>::new());
        assert_eq!(fold_case_ignore(b"   ").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        assert!(fold_case_ignore(&[0xff, 0xfe]).is_err());
    }
}

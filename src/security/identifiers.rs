//! Identifier sanitization for dynamically built SQL.
//!
//! These helpers are only for table/column names spliced into generated
//! introspection queries. They are never used to "repair" user SQL.

use crate::error::GuardError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Letter or underscore, then letters, digits or underscores, nothing else.
static SAFE_IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")
        .unwrap_or_else(|e| panic!("Internal error: invalid identifier pattern: {}", e))
});

/// Strip every character that is not an ASCII letter, digit or underscore.
///
/// Characters are deleted, not replaced, so no separator is left behind.
///
/// # Examples
///
/// ```
/// use sql_guard::security::sanitize_identifier;
///
/// assert_eq!(sanitize_identifier("user_name"), "user_name");
/// assert_eq!(sanitize_identifier("user; DROP TABLE--"), "userDROPTABLE");
/// ```
pub fn sanitize_identifier(identifier: &str) -> String {
    identifier
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// Check whether an identifier is safe to splice into a query as-is.
///
/// # Examples
///
/// ```
/// use sql_guard::security::is_safe_identifier;
///
/// assert!(is_safe_identifier("_x1"));
/// assert!(!is_safe_identifier("1x"));
/// assert!(!is_safe_identifier(""));
/// ```
pub fn is_safe_identifier(identifier: &str) -> bool {
    SAFE_IDENTIFIER.is_match(identifier)
}

/// Gate an identifier and quote it for SQLite.
///
/// Rejects rather than mangles: a name that fails [`is_safe_identifier`]
/// is an error.
pub fn quote_identifier(identifier: &str) -> Result<String, GuardError> {
    if identifier.is_empty() {
        return Err(GuardError::invalid_input("Identifier cannot be empty"));
    }

    if !is_safe_identifier(identifier) {
        return Err(GuardError::invalid_input(format!(
            "Identifier '{}' contains characters other than letters, digits and underscores",
            sanitize_identifier(identifier)
        )));
    }

    Ok(format!("\"{}\"", identifier))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_keeps_safe_characters() {
        assert_eq!(sanitize_identifier("user_name"), "user_name");
        assert_eq!(sanitize_identifier("Table1"), "Table1");
    }

    #[test]
    fn test_sanitize_deletes_everything_else() {
        assert_eq!(sanitize_identifier("a-b c;d"), "abcd");
        assert_eq!(sanitize_identifier("user; DROP TABLE--"), "userDROPTABLE");
        assert_eq!(sanitize_identifier("naïve"), "nave");
        assert_eq!(sanitize_identifier("\"quoted\""), "quoted");
        assert_eq!(sanitize_identifier(""), "");
    }

    #[test]
    fn test_is_safe_identifier_valid() {
        assert!(is_safe_identifier("user_name"));
        assert!(is_safe_identifier("Table1"));
        assert!(is_safe_identifier("_private"));
        assert!(is_safe_identifier("_x1"));
        assert!(is_safe_identifier("_"));
    }

    #[test]
    fn test_is_safe_identifier_invalid() {
        assert!(!is_safe_identifier(""));
        assert!(!is_safe_identifier("1x"));
        assert!(!is_safe_identifier("123start"));
        assert!(!is_safe_identifier("user-name"));
        assert!(!is_safe_identifier("a b"));
        assert!(!is_safe_identifier("name\n"));
        assert!(!is_safe_identifier("ñame"));
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("countries").unwrap(), "\"countries\"");
        assert!(quote_identifier("").is_err());
        assert!(quote_identifier("users; DROP TABLE users").is_err());
        assert!(quote_identifier("my table").is_err());
    }
}

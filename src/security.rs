//! Security module for read-only query validation and identifier hygiene.

mod identifiers;
mod injection;
mod validation;

pub use identifiers::{is_safe_identifier, quote_identifier, sanitize_identifier};
pub use injection::InjectionDetector;
pub use validation::{
    Rejection, SqlValidator, ValidationResult, ALLOWED_KEYWORDS, WRITE_KEYWORDS,
};

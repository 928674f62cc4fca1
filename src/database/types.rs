//! SQLite value mapping.

use rusqlite::types::ValueRef;
use serde::{Deserialize, Serialize};

/// A SQL value that can be serialized to JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Numeric view of the value, parsing text when it holds a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Integer(v) => Some(*v as f64),
            SqlValue::Real(v) => Some(*v),
            SqlValue::Text(v) => v.trim().parse().ok(),
            SqlValue::Null | SqlValue::Blob(_) => None,
        }
    }

    /// Convert to a display string.
    pub fn to_display_string(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Integer(v) => v.to_string(),
            SqlValue::Real(v) => v.to_string(),
            SqlValue::Text(v) => v.clone(),
            SqlValue::Blob(v) => {
                let hex: String = v.iter().map(|b| format!("{:02x}", b)).collect();
                format!("0x{}", hex)
            }
        }
    }
}

impl From<ValueRef<'_>> for SqlValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => SqlValue::Null,
            ValueRef::Integer(v) => SqlValue::Integer(v),
            ValueRef::Real(v) => SqlValue::Real(v),
            ValueRef::Text(v) => SqlValue::Text(String::from_utf8_lossy(v).into_owned()),
            ValueRef::Blob(v) => SqlValue::Blob(v.to_vec()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(SqlValue::Null.to_display_string(), "NULL");
        assert_eq!(SqlValue::Integer(42).to_display_string(), "42");
        assert_eq!(SqlValue::Real(64.5).to_display_string(), "64.5");
        assert_eq!(SqlValue::Blob(vec![0xde, 0xad]).to_display_string(), "0xdead");
    }

    #[test]
    fn test_as_f64() {
        assert_eq!(SqlValue::Integer(3).as_f64(), Some(3.0));
        assert_eq!(SqlValue::Text(" 2.5 ".to_string()).as_f64(), Some(2.5));
        assert_eq!(SqlValue::Text("Ghana".to_string()).as_f64(), None);
        assert_eq!(SqlValue::Null.as_f64(), None);
    }

    #[test]
    fn test_json_is_untagged() {
        let values = vec![
            SqlValue::Null,
            SqlValue::Integer(1),
            SqlValue::Text("a".to_string()),
        ];
        assert_eq!(serde_json::to_string(&values).unwrap(), r#"[null,1,"a"]"#);
    }

    #[test]
    fn test_from_value_ref() {
        assert_eq!(SqlValue::from(ValueRef::Integer(7)), SqlValue::Integer(7));
        assert_eq!(
            SqlValue::from(ValueRef::Text(b"Kenya")),
            SqlValue::Text("Kenya".to_string())
        );
    }
}

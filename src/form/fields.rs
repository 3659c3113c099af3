//! Field extraction
//!
//! Repeated keys resolve to their first value.

use super::FieldMap;
use crate::error::SubmissionError;

fn first_value<'a>(fields: &'a FieldMap, key: &str) -> Option<&'a str> {
    fields.get(key)?.first().map(String::as_str)
}

/// Trimmed value of a mandatory field.
///
/// Fails when the field is absent or blank after trimming.
pub fn require_field(fields: &FieldMap, key: &str) -> Result<String, SubmissionError> {
    optional_field(fields, key).ok_or_else(|| SubmissionError::missing_field(key))
}

/// Trimmed value of an optional field; blank counts as absent
pub fn optional_field(fields: &FieldMap, key: &str) -> Option<String> {
    first_value(fields, key)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn fields(pairs: &[(&str, &str)]) -> FieldMap {
        let mut map = FieldMap::new();
        for (k, v) in pairs {
            map.entry((*k).to_string()).or_default().push((*v).to_string());
        }
        map
    }

    #[test]
    fn test_require_trims() {
        let map = fields(&[("name", "  Jane Doe \n")]);
        assert_eq!(require_field(&map, "name").unwrap(), "Jane Doe");
    }

    #[test]
    fn test_require_missing() {
        let map = fields(&[("name", "Jane")]);
        let err = require_field(&map, "phone").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "Missing required field: phone");
    }

    #[test]
    fn test_require_blank() {
        let map = fields(&[("message", "   \t ")]);
        assert!(require_field(&map, "message").is_err());
    }

    #[test]
    fn test_first_value_wins() {
        let map = fields(&[("name", "A"), ("name", "B")]);
        assert_eq!(require_field(&map, "name").unwrap(), "A");
        assert_eq!(optional_field(&map, "name").as_deref(), Some("A"));
    }

    #[test]
    fn test_blank_first_value_is_not_skipped() {
        let map = fields(&[("name", " "), ("name", "B")]);
        assert!(require_field(&map, "name").is_err());
    }

    #[test]
    fn test_optional() {
        let map = fields(&[("phone", " 555-0100 "), ("serviceType", "")]);
        assert_eq!(optional_field(&map, "phone").as_deref(), Some("555-0100"));
        assert_eq!(optional_field(&map, "serviceType"), None);
        assert_eq!(optional_field(&map, "extraNotes"), None);
    }
}

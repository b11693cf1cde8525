//! Typed attribute values.
//!
//! A value is either a primitive (string, boolean, datetime, integer, binary)
//! or a complex value: an ordered mapping of sub-attribute name to a singular
//! attribute. Typed accessors fail with a schema violation on mismatch rather
//! than panicking.

use chrono::{DateTime, Utc};

use crate::error::SchemaViolation;
use crate::schema::DataType;

use super::attribute::ScimAttribute;

/// A single SCIM attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum ScimValue {
    /// UTF-8 string
    String(String),
    /// Boolean
    Boolean(bool),
    /// UTC timestamp
    DateTime(DateTime<Utc>),
    /// 64-bit signed integer
    Integer(i64),
    /// Raw bytes (base64 on the wire)
    Binary(Vec<u8>),
    /// Ordered mapping of sub-attribute name to singular attribute
    Complex(ComplexValue),
}

impl ScimValue {
    /// The data type of this value.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::String(_) => DataType::String,
            Self::Boolean(_) => DataType::Boolean,
            Self::DateTime(_) => DataType::DateTime,
            Self::Integer(_) => DataType::Integer,
            Self::Binary(_) => DataType::Binary,
            Self::Complex(_) => DataType::Complex,
        }
    }

    fn mismatch(&self, attribute: &str, expected: DataType) -> SchemaViolation {
        SchemaViolation::invalid_value(attribute, expected.name(), self.data_type().name())
    }

    /// Read the value as a string.
    pub fn as_string(&self) -> Result<&str, SchemaViolation> {
        match self {
            Self::String(s) => Ok(s),
            other => Err(other.mismatch("value", DataType::String)),
        }
    }

    /// Read the value as a boolean.
    pub fn as_boolean(&self) -> Result<bool, SchemaViolation> {
        match self {
            Self::Boolean(b) => Ok(*b),
            other => Err(other.mismatch("value", DataType::Boolean)),
        }
    }

    /// Read the value as a UTC timestamp.
    pub fn as_datetime(&self) -> Result<DateTime<Utc>, SchemaViolation> {
        match self {
            Self::DateTime(dt) => Ok(*dt),
            other => Err(other.mismatch("value", DataType::DateTime)),
        }
    }

    /// Read the value as an integer.
    pub fn as_integer(&self) -> Result<i64, SchemaViolation> {
        match self {
            Self::Integer(i) => Ok(*i),
            other => Err(other.mismatch("value", DataType::Integer)),
        }
    }

    /// Read the value as raw bytes.
    pub fn as_binary(&self) -> Result<&[u8], SchemaViolation> {
        match self {
            Self::Binary(b) => Ok(b),
            other => Err(other.mismatch("value", DataType::Binary)),
        }
    }

    /// Read the value as a complex value.
    pub fn as_complex(&self) -> Result<&ComplexValue, SchemaViolation> {
        match self {
            Self::Complex(c) => Ok(c),
            other => Err(other.mismatch("value", DataType::Complex)),
        }
    }
}

impl From<&str> for ScimValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for ScimValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for ScimValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<i64> for ScimValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<DateTime<Utc>> for ScimValue {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt)
    }
}

/// A complex value: ordered sub-attributes, each singular.
///
/// Lookup is case-insensitive on the sub-attribute name; insertion order is
/// preserved for marshalling. Equality ignores order and name case.
#[derive(Debug, Clone, Default)]
pub struct ComplexValue {
    subs: Vec<ScimAttribute>,
}

impl ComplexValue {
    /// Create an empty complex value.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sub-attributes present.
    pub fn len(&self) -> usize {
        self.subs.len()
    }

    /// Whether no sub-attributes are present.
    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }

    /// Look up a sub-attribute by name, case-insensitively.
    pub fn sub_attribute(&self, name: &str) -> Option<&ScimAttribute> {
        self.subs
            .iter()
            .find(|sub| sub.descriptor().name().eq_ignore_ascii_case(name))
    }

    /// Insert or replace a sub-attribute, keyed case-insensitively by name.
    pub fn set(&mut self, attribute: ScimAttribute) {
        let name = attribute.descriptor().name().to_string();
        match self
            .subs
            .iter_mut()
            .find(|sub| sub.descriptor().name().eq_ignore_ascii_case(&name))
        {
            Some(slot) => *slot = attribute,
            None => self.subs.push(attribute),
        }
    }

    /// Iterate sub-attributes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ScimAttribute> {
        self.subs.iter()
    }

    /// Shortcut: the string content of a sub-attribute, if present and a string.
    pub fn sub_string(&self, name: &str) -> Option<&str> {
        self.sub_attribute(name)
            .and_then(|sub| sub.value())
            .and_then(|v| v.as_string().ok())
    }

    /// Shortcut: the boolean content of a sub-attribute, if present and a boolean.
    pub fn sub_boolean(&self, name: &str) -> Option<bool> {
        self.sub_attribute(name)
            .and_then(|sub| sub.value())
            .and_then(|v| v.as_boolean().ok())
    }
}

impl PartialEq for ComplexValue {
    fn eq(&self, other: &Self) -> bool {
        self.subs.len() == other.subs.len()
            && self.subs.iter().all(|sub| {
                other
                    .sub_attribute(sub.descriptor().name())
                    .is_some_and(|o| o == sub)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeDescriptor, CORE_SCHEMA_URI, DataType};

    fn string_sub(name: &str, value: &str) -> ScimAttribute {
        ScimAttribute::singular(
            AttributeDescriptor::simple(CORE_SCHEMA_URI, name, DataType::String).into(),
            ScimValue::from(value),
        )
        .unwrap()
    }

    #[test]
    fn typed_access_rejects_mismatched_types() {
        let v = ScimValue::String("jdoe".into());
        assert_eq!(v.as_string().unwrap(), "jdoe");
        assert!(v.as_boolean().is_err());
        assert!(v.as_integer().is_err());
    }

    #[test]
    fn complex_lookup_ignores_case_and_equality_ignores_order() {
        let mut a = ComplexValue::new();
        a.set(string_sub("givenName", "Jane"));
        a.set(string_sub("familyName", "Doe"));

        let mut b = ComplexValue::new();
        b.set(string_sub("familyName", "Doe"));
        b.set(string_sub("givenName", "Jane"));

        assert_eq!(a.sub_string("GIVENNAME"), Some("Jane"));
        assert_eq!(a, b);
    }

    #[test]
    fn set_replaces_case_insensitively() {
        let mut c = ComplexValue::new();
        c.set(string_sub("givenName", "Jane"));
        c.set(string_sub("GIVENNAME", "Janet"));
        assert_eq!(c.len(), 1);
        assert_eq!(c.sub_string("givenName"), Some("Janet"));
    }
}

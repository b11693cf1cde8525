//! Attributes: a descriptor paired with its values.
//!
//! Constructors enforce the data-model invariants at build time: singular
//! attributes hold exactly one value, plural attributes hold zero or more
//! complex values over the canonical sub-attribute set, and at most one
//! plural element carries `primary=true`.

use std::sync::Arc;

use crate::error::SchemaViolation;
use crate::schema::{AttributeDescriptor, DataType};

use super::value::{ComplexValue, ScimValue};

/// A SCIM attribute: an immutable descriptor plus one or more values.
#[derive(Debug, Clone)]
pub struct ScimAttribute {
    descriptor: Arc<AttributeDescriptor>,
    values: Vec<ScimValue>,
}

impl ScimAttribute {
    /// Create a singular attribute.
    ///
    /// Rejects plural descriptors and values whose type does not match the
    /// descriptor's data type.
    pub fn singular(
        descriptor: Arc<AttributeDescriptor>,
        value: ScimValue,
    ) -> Result<Self, SchemaViolation> {
        if descriptor.is_multi_valued() {
            return Err(SchemaViolation::WrongMultiplicity {
                attribute: descriptor.name().to_string(),
            });
        }
        check_type(&descriptor, &value)?;
        if let ScimValue::Complex(complex) = &value {
            check_sub_attributes(&descriptor, complex)?;
        }
        Ok(Self {
            descriptor,
            values: vec![value],
        })
    }

    /// Create a plural attribute from zero or more complex element values.
    ///
    /// Each element's sub-attributes must be drawn from the plural's canonical
    /// sub-attribute set, and at most one element may be marked `primary`.
    pub fn plural(
        descriptor: Arc<AttributeDescriptor>,
        values: Vec<ScimValue>,
    ) -> Result<Self, SchemaViolation> {
        if !descriptor.is_multi_valued() {
            return Err(SchemaViolation::WrongMultiplicity {
                attribute: descriptor.name().to_string(),
            });
        }
        let mut primaries = 0;
        for value in &values {
            let complex = value.as_complex().map_err(|_| {
                SchemaViolation::invalid_value(
                    descriptor.name(),
                    DataType::Complex.name(),
                    value.data_type().name(),
                )
            })?;
            check_sub_attributes(&descriptor, complex)?;
            if complex.sub_boolean("primary") == Some(true) {
                primaries += 1;
            }
        }
        if primaries > 1 {
            return Err(SchemaViolation::MultiplePrimary {
                attribute: descriptor.name().to_string(),
            });
        }
        Ok(Self { descriptor, values })
    }

    /// The descriptor this attribute was built against.
    pub fn descriptor(&self) -> &Arc<AttributeDescriptor> {
        &self.descriptor
    }

    /// Shortcut for the attribute name.
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// The single value of a singular attribute; `None` for plurals.
    pub fn value(&self) -> Option<&ScimValue> {
        if self.descriptor.is_multi_valued() {
            None
        } else {
            self.values.first()
        }
    }

    /// All values. A singular attribute yields exactly one.
    pub fn values(&self) -> &[ScimValue] {
        &self.values
    }

    /// Typed read of a singular string attribute.
    pub fn as_string(&self) -> Result<&str, SchemaViolation> {
        self.singular_value()?.as_string()
    }

    /// Typed read of a singular boolean attribute.
    pub fn as_boolean(&self) -> Result<bool, SchemaViolation> {
        self.singular_value()?.as_boolean()
    }

    /// Typed read of a singular datetime attribute.
    pub fn as_datetime(&self) -> Result<chrono::DateTime<chrono::Utc>, SchemaViolation> {
        self.singular_value()?.as_datetime()
    }

    /// Typed read of a singular integer attribute.
    pub fn as_integer(&self) -> Result<i64, SchemaViolation> {
        self.singular_value()?.as_integer()
    }

    /// Typed read of a singular binary attribute.
    pub fn as_binary(&self) -> Result<&[u8], SchemaViolation> {
        self.singular_value()?.as_binary()
    }

    /// Typed read of a singular complex attribute.
    pub fn as_complex(&self) -> Result<&ComplexValue, SchemaViolation> {
        self.singular_value()?.as_complex()
    }

    fn singular_value(&self) -> Result<&ScimValue, SchemaViolation> {
        self.value().ok_or_else(|| SchemaViolation::SingularCardinality {
            attribute: self.descriptor.name().to_string(),
        })
    }
}

impl PartialEq for ScimAttribute {
    fn eq(&self, other: &Self) -> bool {
        if self.descriptor.as_ref() != other.descriptor.as_ref() {
            return false;
        }
        if self.descriptor.is_multi_valued() {
            // Plural values compare as multisets.
            self.values.len() == other.values.len()
                && self
                    .values
                    .iter()
                    .all(|v| other.values.iter().any(|o| o == v))
        } else {
            self.values == other.values
        }
    }
}

fn check_type(
    descriptor: &AttributeDescriptor,
    value: &ScimValue,
) -> Result<(), SchemaViolation> {
    if value.data_type() != descriptor.data_type() {
        return Err(SchemaViolation::invalid_value(
            descriptor.name(),
            descriptor.data_type().name(),
            value.data_type().name(),
        ));
    }
    Ok(())
}

fn check_sub_attributes(
    descriptor: &AttributeDescriptor,
    complex: &ComplexValue,
) -> Result<(), SchemaViolation> {
    for sub in complex.iter() {
        if descriptor.sub_attribute(sub.descriptor().name()).is_none() {
            return Err(SchemaViolation::UnknownSubAttribute {
                attribute: descriptor.name().to_string(),
                sub_attribute: sub.descriptor().name().to_string(),
            });
        }
    }
    Ok(())
}

/// Build one plural element (a complex value over the canonical sub-set) from
/// its parts. `value` is required; the rest are optional.
pub fn plural_element(
    descriptor: &AttributeDescriptor,
    value: ScimValue,
    type_tag: Option<&str>,
    primary: bool,
) -> Result<ScimValue, SchemaViolation> {
    let value_desc = descriptor
        .sub_attribute("value")
        .ok_or_else(|| SchemaViolation::UnknownSubAttribute {
            attribute: descriptor.name().to_string(),
            sub_attribute: "value".to_string(),
        })?
        .clone();
    let mut complex = ComplexValue::new();
    complex.set(ScimAttribute::singular(value_desc, value)?);
    if let Some(tag) = type_tag {
        let type_desc = descriptor
            .sub_attribute("type")
            .expect("plural descriptors always carry a type sub-attribute")
            .clone();
        complex.set(ScimAttribute::singular(type_desc, ScimValue::from(tag))?);
    }
    if primary {
        let primary_desc = descriptor
            .sub_attribute("primary")
            .expect("plural descriptors always carry a primary sub-attribute")
            .clone();
        complex.set(ScimAttribute::singular(primary_desc, ScimValue::Boolean(true))?);
    }
    Ok(ScimValue::Complex(complex))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeDescriptor, CORE_SCHEMA_URI};

    fn emails_descriptor() -> Arc<AttributeDescriptor> {
        AttributeDescriptor::plural(CORE_SCHEMA_URI, "emails", DataType::String, &["work", "home"])
            .into()
    }

    #[test]
    fn singular_rejects_plural_descriptor() {
        let err = ScimAttribute::singular(emails_descriptor(), ScimValue::from("a@x"));
        assert!(matches!(
            err,
            Err(SchemaViolation::WrongMultiplicity { .. })
        ));
    }

    #[test]
    fn plural_rejects_singular_descriptor() {
        let desc: Arc<AttributeDescriptor> =
            AttributeDescriptor::simple(CORE_SCHEMA_URI, "userName", DataType::String).into();
        assert!(matches!(
            ScimAttribute::plural(desc, vec![]),
            Err(SchemaViolation::WrongMultiplicity { .. })
        ));
    }

    #[test]
    fn singular_rejects_mismatched_value_type() {
        let desc: Arc<AttributeDescriptor> =
            AttributeDescriptor::simple(CORE_SCHEMA_URI, "active", DataType::Boolean).into();
        let err = ScimAttribute::singular(desc, ScimValue::from("yes"));
        assert!(matches!(
            err,
            Err(SchemaViolation::InvalidAttributeValue { .. })
        ));
    }

    #[test]
    fn at_most_one_primary_per_plural() {
        let desc = emails_descriptor();
        let a = plural_element(&desc, ScimValue::from("a@x"), Some("work"), true).unwrap();
        let b = plural_element(&desc, ScimValue::from("b@y"), Some("home"), true).unwrap();
        let err = ScimAttribute::plural(desc.clone(), vec![a.clone(), b]);
        assert!(matches!(err, Err(SchemaViolation::MultiplePrimary { .. })));

        let b_ok = plural_element(&desc, ScimValue::from("b@y"), Some("home"), false).unwrap();
        assert!(ScimAttribute::plural(desc, vec![a, b_ok]).is_ok());
    }

    #[test]
    fn plural_elements_must_use_canonical_sub_set() {
        let desc = emails_descriptor();
        let mut stray = ComplexValue::new();
        stray.set(
            ScimAttribute::singular(
                AttributeDescriptor::simple(CORE_SCHEMA_URI, "street", DataType::String).into(),
                ScimValue::from("nope"),
            )
            .unwrap(),
        );
        let err = ScimAttribute::plural(desc, vec![ScimValue::Complex(stray)]);
        assert!(matches!(err, Err(SchemaViolation::UnknownSubAttribute { .. })));
    }

    #[test]
    fn plural_values_compare_as_multisets() {
        let desc = emails_descriptor();
        let a = plural_element(&desc, ScimValue::from("a@x"), Some("work"), false).unwrap();
        let b = plural_element(&desc, ScimValue::from("b@y"), Some("home"), false).unwrap();
        let left = ScimAttribute::plural(desc.clone(), vec![a.clone(), b.clone()]).unwrap();
        let right = ScimAttribute::plural(desc, vec![b, a]).unwrap();
        assert_eq!(left, right);
    }
}

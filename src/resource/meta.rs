//! The server-managed `meta` attribute.
//!
//! Backends build a [`Meta`] for each resource they return and attach it via
//! [`Meta::to_attribute`]; the codec then serializes it like any other complex
//! attribute.

use chrono::{DateTime, Utc};

use crate::error::SchemaViolation;
use crate::schema::AttributeDescriptor;

use super::attribute::ScimAttribute;
use super::value::{ComplexValue, ScimValue};

/// Server-assigned resource metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Meta {
    /// When the resource was created
    pub created: Option<DateTime<Utc>>,
    /// When the resource was last modified
    pub last_modified: Option<DateTime<Utc>>,
    /// Absolute URI of the resource
    pub location: Option<String>,
    /// Opaque version tag (ETag value)
    pub version: Option<String>,
}

impl Meta {
    /// Meta for a freshly created resource: `created == lastModified == now`.
    pub fn created_now() -> Self {
        let now = Utc::now();
        Self {
            created: Some(now),
            last_modified: Some(now),
            location: None,
            version: None,
        }
    }

    /// Build the `meta` attribute against its descriptor.
    pub fn to_attribute(
        &self,
        descriptor: &std::sync::Arc<AttributeDescriptor>,
    ) -> Result<ScimAttribute, SchemaViolation> {
        let mut complex = ComplexValue::new();
        if let (Some(created), Some(desc)) = (self.created, descriptor.sub_attribute("created")) {
            complex.set(ScimAttribute::singular(desc.clone(), ScimValue::DateTime(created))?);
        }
        if let (Some(modified), Some(desc)) =
            (self.last_modified, descriptor.sub_attribute("lastModified"))
        {
            complex.set(ScimAttribute::singular(desc.clone(), ScimValue::DateTime(modified))?);
        }
        if let (Some(location), Some(desc)) =
            (self.location.as_deref(), descriptor.sub_attribute("location"))
        {
            complex.set(ScimAttribute::singular(desc.clone(), ScimValue::from(location))?);
        }
        if let (Some(version), Some(desc)) =
            (self.version.as_deref(), descriptor.sub_attribute("version"))
        {
            complex.set(ScimAttribute::singular(desc.clone(), ScimValue::from(version))?);
        }
        ScimAttribute::singular(descriptor.clone(), ScimValue::Complex(complex))
    }

    /// Read the meta attribute of an object back into a [`Meta`].
    pub fn from_attribute(attribute: &ScimAttribute) -> Self {
        let empty = ComplexValue::new();
        let complex = attribute.as_complex().unwrap_or(&empty);
        Self {
            created: complex
                .sub_attribute("created")
                .and_then(|a| a.as_datetime().ok()),
            last_modified: complex
                .sub_attribute("lastModified")
                .and_then(|a| a.as_datetime().ok()),
            location: complex.sub_string("location").map(str::to_string),
            version: complex.sub_string("version").map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::core::user_resource;

    #[test]
    fn meta_round_trips_through_its_attribute() {
        let user = user_resource();
        let descriptor = user.core_attribute("meta").unwrap();
        let meta = Meta {
            created: Some("2011-08-01T18:29:49Z".parse().unwrap()),
            last_modified: Some("2011-08-01T20:31:02Z".parse().unwrap()),
            location: Some("https://example.com/v1/Users/42".into()),
            version: Some("a330bc54f0671c9".into()),
        };
        let attribute = meta.to_attribute(descriptor).unwrap();
        assert_eq!(Meta::from_attribute(&attribute), meta);
    }
}

//! Descriptor types for SCIM resources and attributes.
//!
//! Descriptors are the metadata backbone of the crate: the codecs, the filter
//! evaluator, and the LDAP mapper are all driven by them. They are built once
//! at startup and shared immutably (`Arc`) for the life of the process.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// The SCIM 1.0 core schema URI.
pub const CORE_SCHEMA_URI: &str = "urn:scim:schemas:core:1.0";

/// Canonical sub-attribute names shared by every plural attribute.
pub const PLURAL_SUB_ATTRIBUTES: [&str; 5] = ["value", "type", "primary", "display", "operation"];

/// SCIM attribute data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// UTF-8 string
    String,
    /// Boolean
    Boolean,
    /// ISO-8601 timestamp
    DateTime,
    /// 64-bit signed integer
    Integer,
    /// Opaque bytes, base64 on the wire
    Binary,
    /// Composite of singular sub-attributes
    Complex,
}

impl DataType {
    /// Wire name of the data type, used in error messages and config files.
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::DateTime => "dateTime",
            Self::Integer => "integer",
            Self::Binary => "binary",
            Self::Complex => "complex",
        }
    }

    /// Parse a data type from its wire name (case-insensitive).
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "string" => Some(Self::String),
            "boolean" => Some(Self::Boolean),
            "datetime" => Some(Self::DateTime),
            "integer" => Some(Self::Integer),
            "binary" => Some(Self::Binary),
            "complex" => Some(Self::Complex),
            _ => None,
        }
    }
}

/// Immutable metadata for a single SCIM attribute.
///
/// Equality and hashing are defined on `(schema, lowercase(name))`: attribute
/// names compare case-insensitively while schema URIs compare exactly.
#[derive(Debug, Clone)]
pub struct AttributeDescriptor {
    schema: String,
    name: String,
    data_type: DataType,
    multi_valued: bool,
    required: bool,
    read_only: bool,
    case_exact: bool,
    canonical_types: Vec<String>,
    sub_attributes: Vec<Arc<AttributeDescriptor>>,
}

impl AttributeDescriptor {
    /// Create a simple (non-complex, singular) attribute descriptor.
    pub fn simple(schema: impl Into<String>, name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            data_type,
            multi_valued: false,
            required: false,
            read_only: false,
            case_exact: false,
            canonical_types: Vec::new(),
            sub_attributes: Vec::new(),
        }
    }

    /// Create a complex singular attribute descriptor from its sub-attributes.
    ///
    /// Sub-attributes of a complex attribute are always singular; nesting
    /// stops one level down.
    pub fn complex(
        schema: impl Into<String>,
        name: impl Into<String>,
        sub_attributes: Vec<AttributeDescriptor>,
    ) -> Self {
        Self {
            sub_attributes: sub_attributes.into_iter().map(Arc::new).collect(),
            ..Self::simple(schema, name, DataType::Complex)
        }
    }

    /// Create a plural attribute descriptor.
    ///
    /// Every plural element is a complex value over the canonical sub-set
    /// (`value`, `type`, `primary`, `display`, `operation`); `value_type` is
    /// the data type of the `value` sub-attribute.
    pub fn plural(
        schema: impl Into<String>,
        name: impl Into<String>,
        value_type: DataType,
        canonical_types: &[&str],
    ) -> Self {
        let schema = schema.into();
        let subs = vec![
            AttributeDescriptor::simple(schema.clone(), "value", value_type),
            AttributeDescriptor::simple(schema.clone(), "type", DataType::String),
            AttributeDescriptor::simple(schema.clone(), "primary", DataType::Boolean),
            AttributeDescriptor::simple(schema.clone(), "display", DataType::String),
            AttributeDescriptor::simple(schema.clone(), "operation", DataType::String),
        ];
        Self {
            multi_valued: true,
            canonical_types: canonical_types.iter().map(|t| t.to_string()).collect(),
            sub_attributes: subs.into_iter().map(Arc::new).collect(),
            ..Self::simple(schema, name, DataType::Complex)
        }
    }

    /// Mark the attribute as required on create.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark the attribute as server-managed; inbound values are ignored.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Mark string comparisons on this attribute as case-sensitive.
    pub fn case_exact(mut self) -> Self {
        self.case_exact = true;
        self
    }

    /// The schema URI this attribute belongs to.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// The attribute name as declared.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared data type. Plurals report [`DataType::Complex`] because
    /// their elements are complex values.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Whether the attribute takes zero or more values.
    pub fn is_multi_valued(&self) -> bool {
        self.multi_valued
    }

    /// Whether the attribute must be present on create.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Whether inbound values for this attribute are ignored.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Whether string comparison respects case.
    pub fn is_case_exact(&self) -> bool {
        self.case_exact
    }

    /// Canonical `type` values for a plural attribute (e.g. "work", "home").
    pub fn canonical_types(&self) -> &[String] {
        &self.canonical_types
    }

    /// Sub-attribute descriptors of a complex or plural attribute.
    pub fn sub_attributes(&self) -> &[Arc<AttributeDescriptor>] {
        &self.sub_attributes
    }

    /// Look up a sub-attribute by name, case-insensitively.
    pub fn sub_attribute(&self, name: &str) -> Option<&Arc<AttributeDescriptor>> {
        self.sub_attributes
            .iter()
            .find(|sub| sub.name.eq_ignore_ascii_case(name))
    }
}

impl PartialEq for AttributeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema && self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl Eq for AttributeDescriptor {}

impl Hash for AttributeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.schema.hash(state);
        self.name.to_ascii_lowercase().hash(state);
    }
}

/// A view of all attributes declared under one schema URI.
///
/// Built by the registry from the resource descriptors that reference the
/// schema; attribute order is registration order, which is also marshal order.
#[derive(Debug, Clone)]
pub struct Schema {
    uri: String,
    attributes: Vec<Arc<AttributeDescriptor>>,
}

impl Schema {
    pub(crate) fn new(uri: String) -> Self {
        Self {
            uri,
            attributes: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, attribute: Arc<AttributeDescriptor>) {
        if self.attribute(attribute.name()).is_none() {
            self.attributes.push(attribute);
        }
    }

    /// The schema URI.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// All attribute descriptors, in registration order.
    pub fn attributes(&self) -> &[Arc<AttributeDescriptor>] {
        &self.attributes
    }

    /// Look up an attribute by local name, case-insensitively.
    pub fn attribute(&self, local_name: &str) -> Option<&Arc<AttributeDescriptor>> {
        self.attributes
            .iter()
            .find(|attr| attr.name().eq_ignore_ascii_case(local_name))
    }
}

/// Metadata for a resource type: its primary schema, name, endpoint, and the
/// ordered attribute set drawn from one or more schemas.
#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    schema: String,
    name: String,
    endpoint: String,
    attributes: Vec<Arc<AttributeDescriptor>>,
}

impl ResourceDescriptor {
    /// Create a resource descriptor.
    pub fn new(
        schema: impl Into<String>,
        name: impl Into<String>,
        endpoint: impl Into<String>,
        attributes: Vec<AttributeDescriptor>,
    ) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            endpoint: endpoint.into(),
            attributes: attributes.into_iter().map(Arc::new).collect(),
        }
    }

    /// The primary schema URI of this resource.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// The resource name (e.g. "User"); also the XML root element name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The endpoint segment (e.g. "Users").
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// All attribute descriptors in registry (and marshal) order.
    pub fn attributes(&self) -> &[Arc<AttributeDescriptor>] {
        &self.attributes
    }

    /// Look up an attribute by name, case-insensitive on name and exact on
    /// schema URI.
    pub fn attribute(&self, schema: &str, name: &str) -> Option<&Arc<AttributeDescriptor>> {
        self.attributes
            .iter()
            .find(|attr| attr.schema() == schema && attr.name().eq_ignore_ascii_case(name))
    }

    /// Look up an attribute in the primary schema by name.
    pub fn core_attribute(&self, name: &str) -> Option<&Arc<AttributeDescriptor>> {
        self.attributes
            .iter()
            .find(|attr| attr.schema() == self.schema && attr.name().eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_equality_is_case_insensitive_on_name() {
        let a = AttributeDescriptor::simple(CORE_SCHEMA_URI, "userName", DataType::String);
        let b = AttributeDescriptor::simple(CORE_SCHEMA_URI, "USERNAME", DataType::String);
        let c = AttributeDescriptor::simple("urn:other:1.0", "userName", DataType::String);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn plural_descriptor_carries_canonical_sub_set() {
        let emails =
            AttributeDescriptor::plural(CORE_SCHEMA_URI, "emails", DataType::String, &["work", "home"]);
        assert!(emails.is_multi_valued());
        for name in PLURAL_SUB_ATTRIBUTES {
            assert!(emails.sub_attribute(name).is_some(), "missing {name}");
        }
        assert_eq!(emails.sub_attribute("primary").unwrap().data_type(), DataType::Boolean);
        assert_eq!(emails.canonical_types(), &["work", "home"]);
    }

    #[test]
    fn sub_attribute_lookup_ignores_case() {
        let name = AttributeDescriptor::complex(
            CORE_SCHEMA_URI,
            "name",
            vec![AttributeDescriptor::simple(CORE_SCHEMA_URI, "familyName", DataType::String)],
        );
        assert!(name.sub_attribute("FAMILYNAME").is_some());
        assert!(name.sub_attribute("nope").is_none());
    }
}

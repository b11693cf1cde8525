//! The in-memory resource instance.
//!
//! A [`ScimObject`] is an ordered mapping from schema URI to an ordered,
//! case-insensitive mapping from attribute name to [`ScimAttribute`]. Objects
//! are created by the codecs (parse) or by a backend (from directory entries),
//! mutated only within their construction scope, and then serialized.

use std::collections::BTreeMap;

use super::attribute::ScimAttribute;

/// A single SCIM resource instance.
///
/// Attribute lookup is case-insensitive on the attribute name and exact on
/// the schema URI. Insertion order is preserved per schema for marshalling.
///
/// Schema blocks from a request body whose URI is not registered are retained
/// verbatim (as raw JSON) so that PUT round-trips preserve them; see
/// [`ScimObject::retained_extensions`].
#[derive(Debug, Clone, Default)]
pub struct ScimObject {
    entries: Vec<(String, Vec<ScimAttribute>)>,
    retained: BTreeMap<String, serde_json::Value>,
}

impl ScimObject {
    /// Create an empty object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema URIs with at least one attribute present, in insertion order.
    pub fn schemas(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(uri, _)| uri.as_str())
    }

    /// All attributes under one schema URI, in insertion order.
    pub fn attributes(&self, schema: &str) -> &[ScimAttribute] {
        self.entries
            .iter()
            .find(|(uri, _)| uri == schema)
            .map(|(_, attrs)| attrs.as_slice())
            .unwrap_or(&[])
    }

    /// Look up one attribute by `(schema URI, name)`.
    pub fn attribute(&self, schema: &str, name: &str) -> Option<&ScimAttribute> {
        self.attributes(schema)
            .iter()
            .find(|attr| attr.name().eq_ignore_ascii_case(name))
    }

    /// Look up an attribute by name across all schemas, first match wins.
    pub fn attribute_anywhere(&self, name: &str) -> Option<&ScimAttribute> {
        self.entries
            .iter()
            .flat_map(|(_, attrs)| attrs.iter())
            .find(|attr| attr.name().eq_ignore_ascii_case(name))
    }

    /// Insert or replace an attribute; the schema comes from its descriptor.
    pub fn set_attribute(&mut self, attribute: ScimAttribute) {
        let schema = attribute.descriptor().schema().to_string();
        let index = match self.entries.iter().position(|(uri, _)| *uri == schema) {
            Some(index) => index,
            None => {
                self.entries.push((schema, Vec::new()));
                self.entries.len() - 1
            }
        };
        let attrs = &mut self.entries[index].1;
        match attrs
            .iter_mut()
            .find(|a| a.name().eq_ignore_ascii_case(attribute.name()))
        {
            Some(slot) => *slot = attribute,
            None => attrs.push(attribute),
        }
    }

    /// Remove an attribute, returning it if present. Empty schema blocks are
    /// dropped so `schemas()` only reports populated URIs.
    pub fn remove_attribute(&mut self, schema: &str, name: &str) -> Option<ScimAttribute> {
        let index = self.entries.iter().position(|(uri, _)| uri == schema)?;
        let pos = self.entries[index]
            .1
            .iter()
            .position(|a| a.name().eq_ignore_ascii_case(name))?;
        let removed = self.entries[index].1.remove(pos);
        if self.entries[index].1.is_empty() {
            self.entries.remove(index);
        }
        Some(removed)
    }

    /// Iterate `(schema URI, attribute)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScimAttribute)> {
        self.entries
            .iter()
            .flat_map(|(uri, attrs)| attrs.iter().map(move |a| (uri.as_str(), a)))
    }

    /// Whether the object holds no attributes at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.retained.is_empty()
    }

    /// Retain an unregistered extension block verbatim for round-tripping.
    pub fn retain_extension(&mut self, uri: impl Into<String>, raw: serde_json::Value) {
        self.retained.insert(uri.into(), raw);
    }

    /// Extension blocks preserved from unregistered schemas, keyed by URI.
    pub fn retained_extensions(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.retained
    }

    /// Shortcut: the `id` attribute in the given primary schema.
    pub fn id(&self, schema: &str) -> Option<&str> {
        self.attribute(schema, "id")
            .and_then(|a| a.as_string().ok())
    }

    /// Shortcut for building an object from attributes with one shared schema.
    pub fn from_attributes(
        attributes: impl IntoIterator<Item = ScimAttribute>,
    ) -> Self {
        let mut object = Self::new();
        for attribute in attributes {
            object.set_attribute(attribute);
        }
        object
    }
}

impl PartialEq for ScimObject {
    fn eq(&self, other: &Self) -> bool {
        if self.entries.len() != other.entries.len() || self.retained != other.retained {
            return false;
        }
        self.entries.iter().all(|(uri, attrs)| {
            let other_attrs = other.attributes(uri);
            attrs.len() == other_attrs.len()
                && attrs.iter().all(|attr| {
                    other_attrs
                        .iter()
                        .any(|o| o.name().eq_ignore_ascii_case(attr.name()) && o == attr)
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::value::ScimValue;
    use crate::schema::{AttributeDescriptor, CORE_SCHEMA_URI, DataType};
    use std::sync::Arc;

    fn string_attr(schema: &str, name: &str, value: &str) -> ScimAttribute {
        ScimAttribute::singular(
            Arc::new(AttributeDescriptor::simple(schema, name, DataType::String)),
            ScimValue::from(value),
        )
        .unwrap()
    }

    #[test]
    fn lookup_is_case_insensitive_on_name_exact_on_schema() {
        let mut object = ScimObject::new();
        object.set_attribute(string_attr(CORE_SCHEMA_URI, "userName", "jdoe"));
        assert!(object.attribute(CORE_SCHEMA_URI, "USERNAME").is_some());
        assert!(object.attribute("urn:other", "userName").is_none());
    }

    #[test]
    fn set_replaces_and_remove_drops_empty_schema_blocks() {
        let mut object = ScimObject::new();
        object.set_attribute(string_attr(CORE_SCHEMA_URI, "userName", "jdoe"));
        object.set_attribute(string_attr(CORE_SCHEMA_URI, "UserName", "jane"));
        assert_eq!(object.attributes(CORE_SCHEMA_URI).len(), 1);
        assert_eq!(
            object.attribute(CORE_SCHEMA_URI, "userName").unwrap().as_string().unwrap(),
            "jane"
        );

        object.remove_attribute(CORE_SCHEMA_URI, "userName");
        assert_eq!(object.schemas().count(), 0);
    }

    #[test]
    fn equality_ignores_attribute_order() {
        let mut a = ScimObject::new();
        a.set_attribute(string_attr(CORE_SCHEMA_URI, "userName", "jdoe"));
        a.set_attribute(string_attr(CORE_SCHEMA_URI, "displayName", "Jane"));

        let mut b = ScimObject::new();
        b.set_attribute(string_attr(CORE_SCHEMA_URI, "displayName", "Jane"));
        b.set_attribute(string_attr(CORE_SCHEMA_URI, "userName", "jdoe"));

        assert_eq!(a, b);
    }

    #[test]
    fn retained_extensions_participate_in_equality() {
        let mut a = ScimObject::new();
        a.retain_extension("urn:custom:1.0", serde_json::json!({"tier": "gold"}));
        let b = ScimObject::new();
        assert_ne!(a, b);
    }
}

//! Schema registry for resolving resource and attribute descriptors.
//!
//! The registry is initialized during startup with the built-in core schema
//! and any user-supplied resource definitions, then shared read-only: codec,
//! server, and backend all hold it behind an `Arc` and never mutate it after
//! construction.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ScimResult, SchemaViolation};

use super::core;
use super::types::{AttributeDescriptor, ResourceDescriptor, Schema};

/// Process-wide registry of resource descriptors and schemas.
///
/// Resolution paths:
/// * resource local name → [`ResourceDescriptor`] (case-insensitive),
/// * endpoint segment → [`ResourceDescriptor`] (case-insensitive),
/// * schema URI → [`Schema`] (exact), whose attribute lookup is
///   case-insensitive on the local name.
///
/// Lookups return `None` rather than failing; only duplicate registration is
/// an error, and only at init time.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    resources: HashMap<String, Arc<ResourceDescriptor>>,
    endpoints: HashMap<String, Arc<ResourceDescriptor>>,
    schemas: HashMap<String, Schema>,
}

impl SchemaRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            resources: HashMap::new(),
            endpoints: HashMap::new(),
            schemas: HashMap::new(),
        }
    }

    /// Create a registry pre-loaded with the SCIM 1.0 core User and Group
    /// resources.
    pub fn core() -> Self {
        let mut registry = Self::new();
        registry
            .register(core::user_resource())
            .expect("core User registers into an empty registry");
        registry
            .register(core::group_resource())
            .expect("core Group registers into an empty registry");
        registry
    }

    /// Register a resource descriptor.
    ///
    /// The resource's attributes are folded into the per-URI [`Schema`] views.
    /// Registering a second resource under the same name or endpoint is
    /// rejected.
    pub fn register(&mut self, resource: ResourceDescriptor) -> ScimResult<()> {
        let name_key = resource.name().to_ascii_lowercase();
        let endpoint_key = resource.endpoint().to_ascii_lowercase();
        if self.resources.contains_key(&name_key) || self.endpoints.contains_key(&endpoint_key) {
            return Err(SchemaViolation::DuplicateResource {
                name: resource.name().to_string(),
            }
            .into());
        }

        for attribute in resource.attributes() {
            self.schemas
                .entry(attribute.schema().to_string())
                .or_insert_with(|| Schema::new(attribute.schema().to_string()))
                .push(attribute.clone());
        }

        let resource = Arc::new(resource);
        self.resources.insert(name_key, resource.clone());
        self.endpoints.insert(endpoint_key, resource);
        Ok(())
    }

    /// Look up a resource descriptor by local name.
    pub fn resource(&self, local_name: &str) -> Option<&Arc<ResourceDescriptor>> {
        self.resources.get(&local_name.to_ascii_lowercase())
    }

    /// Look up a resource descriptor by endpoint segment.
    pub fn resource_by_endpoint(&self, endpoint: &str) -> Option<&Arc<ResourceDescriptor>> {
        self.endpoints.get(&endpoint.to_ascii_lowercase())
    }

    /// Look up a schema by its URI (exact match).
    pub fn schema(&self, uri: &str) -> Option<&Schema> {
        self.schemas.get(uri)
    }

    /// Resolve `(schema URI, local name)` to an attribute descriptor.
    pub fn attribute(&self, uri: &str, local_name: &str) -> Option<&Arc<AttributeDescriptor>> {
        self.schemas.get(uri).and_then(|s| s.attribute(local_name))
    }

    /// All registered resource descriptors.
    pub fn resources(&self) -> impl Iterator<Item = &Arc<ResourceDescriptor>> {
        self.resources.values()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::core()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{CORE_SCHEMA_URI, DataType};

    #[test]
    fn core_registry_resolves_users_and_groups() {
        let registry = SchemaRegistry::core();
        assert!(registry.resource("user").is_some());
        assert!(registry.resource("GROUP").is_some());
        assert!(registry.resource_by_endpoint("users").is_some());
        assert!(registry.resource("Device").is_none());
    }

    #[test]
    fn attribute_lookup_is_case_insensitive_on_name_only() {
        let registry = SchemaRegistry::core();
        assert!(registry.attribute(CORE_SCHEMA_URI, "USERNAME").is_some());
        assert!(registry.attribute("URN:SCIM:SCHEMAS:CORE:1.0", "userName").is_none());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = SchemaRegistry::core();
        let dup = ResourceDescriptor::new(
            CORE_SCHEMA_URI,
            "User",
            "Users2",
            vec![AttributeDescriptor::simple(CORE_SCHEMA_URI, "userName", DataType::String)],
        );
        assert!(registry.register(dup).is_err());
    }
}

//! Schema definitions and the process-wide schema registry.
//!
//! The registry holds resource and attribute descriptors and resolves
//! `(namespace, localName)` pairs for the codecs, the filter evaluator, and
//! the LDAP mapper. It is constructed once at startup — from the built-in
//! SCIM 1.0 core schema plus any resource mapping files — and is immutable
//! afterwards.

pub mod core;
pub mod registry;
pub mod types;

pub use registry::SchemaRegistry;
pub use types::{
    AttributeDescriptor, CORE_SCHEMA_URI, DataType, PLURAL_SUB_ATTRIBUTES, ResourceDescriptor,
    Schema,
};

//! # SCIM 1.0 Directory Library
//!
//! An implementation of the Simple Cloud Identity Management (SCIM) 1.0
//! protocol: a schema-driven attribute model with dual JSON/XML
//! representations, the SCIM query language (filter, sort, pagination,
//! attribute selection), a resource URI model, and a resource server that
//! dispatches protocol requests to a pluggable backend. Resources are
//! typically materialized from an LDAP directory through a declarative
//! attribute mapping.
//!
//! ## Features
//!
//! - Typed object graph (`ScimObject` / `ScimAttribute`) whose constructors
//!   enforce the data-model invariants
//! - JSON and XML codecs behind one marshaller contract, driven entirely by
//!   the schema registry
//! - Filter expressions evaluable in memory and translatable to RFC 4515
//!   LDAP search filters
//! - Transport-agnostic server and client; the HTTP container and the
//!   exchange transport are external collaborators
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use scim_directory::backend::InMemoryBackend;
//! use scim_directory::schema::SchemaRegistry;
//! use scim_directory::server::{HttpMethod, RequestHeaders, ResourceServer, ScimHttpRequest};
//!
//! # async fn example() {
//! let registry = Arc::new(SchemaRegistry::core());
//! let backend = InMemoryBackend::new(registry.clone())
//!     .with_base_uri("https://example.com/v1")
//!     .with_credentials("admin", "s3cret");
//! let server = ResourceServer::new(registry, backend, "https://example.com/v1");
//!
//! let response = server
//!     .handle(ScimHttpRequest {
//!         method: HttpMethod::Get,
//!         uri: "/Users?filter=userName%20eq%20%22jdoe%22".to_string(),
//!         headers: RequestHeaders::default(),
//!         body: Vec::new(),
//!     })
//!     .await;
//! assert_eq!(response.status, 200);
//! # }
//! ```
//!
//! For a directory-backed deployment, load the per-resource mapping files
//! with [`ldap::load_resources`], register each mapping's descriptor with the
//! registry, and serve an [`ldap::LdapBackend`] instead.

pub mod backend;
pub mod client;
pub mod codec;
pub mod error;
pub mod filter;
pub mod ldap;
pub mod protocol;
pub mod resource;
pub mod schema;
pub mod server;
pub mod uri;

// Core re-exports for library users
pub use backend::{Backend, InMemoryBackend, RequestContext};
pub use client::{ClientConfig, PreparedRequest, ScimClient};
pub use codec::{JsonCodec, Marshaller, MediaType, Unmarshaller, XmlCodec};
pub use error::{ScimError, ScimResult, SchemaViolation, TransportError};
pub use filter::{AttrPath, AttributeSelection, FilterExpr, PageSpec, SortOrder, SortSpec};
pub use protocol::{ErrorDetail, ListResponse, ResponseBody};
pub use resource::{ComplexValue, Meta, ScimAttribute, ScimObject, ScimValue};
pub use schema::{
    AttributeDescriptor, CORE_SCHEMA_URI, DataType, ResourceDescriptor, Schema, SchemaRegistry,
};
pub use server::{ResourceServer, ScimHttpRequest, ScimHttpResponse};
pub use uri::{ScimQuery, ScimUri};

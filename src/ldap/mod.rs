//! LDAP integration: declarative mapping, filter translation, connection
//! pooling, and the directory-backed [`Backend`](crate::backend::Backend).
//!
//! The mapping configuration (one XML definition per resource) drives
//! everything: it produces the resource descriptor registered with the schema
//! registry, the entry/object translations, and the SCIM-to-RFC-4515 filter
//! synthesis.

pub mod backend;
pub mod config;
pub mod filter;
pub mod mapper;
pub mod pool;

pub use backend::{LdapBackend, LdapBackendConfig, RetryPolicy};
pub use config::{
    AttributeMapping, ComplexMapping, DerivedMapping, PluralMapping, PluralTypeMapping,
    ResourceMapping, SimpleMapping, SubMapping, ValueTransform, load_resources, parse_resources,
};
pub use filter::to_ldap_filter;
pub use mapper::LdapMapper;
pub use pool::{LdapPool, LdapPoolConfig, PooledLdap};

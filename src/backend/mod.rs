//! The backend interface and its implementations.
//!
//! A [`Backend`] turns typed protocol requests into resources. The interface
//! is symmetric and side-effect-free at the type level: each method consumes
//! one request value and produces a result the server wraps in a response
//! envelope. Implementations must be safe for concurrent use.
//!
//! Two backends ship with the crate: [`InMemoryBackend`] (the reference
//! implementation of the interface semantics, used heavily by tests) and
//! [`LdapBackend`](crate::ldap::LdapBackend), which maps resources onto an
//! LDAP directory.

pub mod in_memory;
pub mod requests;

use std::future::Future;

use sha2::{Digest, Sha256};

use crate::error::{ScimResult, SchemaViolation};
use crate::resource::ScimObject;
use crate::schema::ResourceDescriptor;

pub use in_memory::InMemoryBackend;
pub use requests::{
    DeleteResourceRequest, GetResourceRequest, GetResourcesRequest, PostResourceRequest,
    PutResourceRequest, RequestContext, ResourcePage,
};

/// Storage interface for SCIM resources.
///
/// Errors use the protocol taxonomy directly ([`crate::error::ScimError`]),
/// so the server can map any failure to a response envelope without knowing
/// the backend; backend-internal faults must be wrapped as
/// [`ScimError::Backend`](crate::error::ScimError::Backend) with a generic
/// description.
pub trait Backend: Send + Sync {
    /// Fetch a single resource by ID.
    fn get_resource(
        &self,
        request: &GetResourceRequest,
    ) -> impl Future<Output = ScimResult<ScimObject>> + Send;

    /// List resources, honoring filter, sort, pagination, and selection.
    fn get_resources(
        &self,
        request: &GetResourcesRequest,
    ) -> impl Future<Output = ScimResult<ResourcePage>> + Send;

    /// Create a resource; the result carries the server-assigned `id` and `meta`.
    fn post_resource(
        &self,
        request: &PostResourceRequest,
    ) -> impl Future<Output = ScimResult<ScimObject>> + Send;

    /// Fully replace a resource; absent mutable attributes are deleted.
    fn put_resource(
        &self,
        request: &PutResourceRequest,
    ) -> impl Future<Output = ScimResult<ScimObject>> + Send;

    /// Delete a resource.
    fn delete_resource(
        &self,
        request: &DeleteResourceRequest,
    ) -> impl Future<Output = ScimResult<()>> + Send;

    /// Verify credentials before a mutation is dispatched.
    ///
    /// Bad credentials map to 401; an authenticated principal without the
    /// needed privilege maps to 403.
    fn authenticate(
        &self,
        user: &str,
        password: &str,
        context: &RequestContext,
    ) -> impl Future<Output = ScimResult<()>> + Send;
}

/// Drop attributes the descriptor marks read-only; inbound values for them
/// are ignored, not errored.
pub(crate) fn strip_read_only(resource: &ResourceDescriptor, object: &ScimObject) -> ScimObject {
    let mut sanitized = object.clone();
    for descriptor in resource.attributes() {
        if descriptor.is_read_only() {
            sanitized.remove_attribute(descriptor.schema(), descriptor.name());
        }
    }
    sanitized
}

/// Required attributes must be present on create.
pub(crate) fn validate_required(
    resource: &ResourceDescriptor,
    object: &ScimObject,
) -> ScimResult<()> {
    for descriptor in resource.attributes() {
        if descriptor.is_required()
            && !descriptor.is_read_only()
            && object
                .attribute(descriptor.schema(), descriptor.name())
                .is_none()
        {
            return Err(SchemaViolation::missing_required(descriptor.name()).into());
        }
    }
    Ok(())
}

/// Version tag over serialized resource content: a truncated SHA-256 hex
/// digest, stable across processes for identical content.
pub(crate) fn content_version(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    digest
        .iter()
        .take(8)
        .map(|b| format!("{b:02x}"))
        .collect()
}

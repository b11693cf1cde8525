//! In-memory backend.
//!
//! Thread-safe reference implementation of the [`Backend`] interface over a
//! nested `HashMap` behind an async `RwLock`. Filter, sort, pagination, and
//! attribute selection are evaluated directly against the typed objects.
//! Used for testing and as the reference implementation of the interface
//! semantics; durable deployments use the LDAP backend.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::debug;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::codec::{JsonCodec, Marshaller};
use crate::error::{ScimError, ScimResult};
use crate::resource::{Meta, ScimAttribute, ScimObject, ScimValue};
use crate::schema::{ResourceDescriptor, SchemaRegistry};

use super::requests::{
    DeleteResourceRequest, GetResourceRequest, GetResourcesRequest, PostResourceRequest,
    PutResourceRequest, RequestContext, ResourcePage,
};
use super::{Backend, content_version, strip_read_only, validate_required};

/// In-memory [`Backend`] implementation.
///
/// Storage shape: resource type → resource ID → object. Credentials are
/// fixed at construction time; the resource map is guarded by an async
/// `RwLock` for concurrent request handling.
pub struct InMemoryBackend {
    registry: Arc<SchemaRegistry>,
    base_uri: Option<String>,
    default_count: usize,
    data: RwLock<HashMap<String, HashMap<String, ScimObject>>>,
    credentials: HashMap<String, String>,
    forbidden: HashSet<String>,
}

impl InMemoryBackend {
    /// Create an empty backend over the given registry.
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            registry,
            base_uri: None,
            default_count: 100,
            data: RwLock::new(HashMap::new()),
            credentials: HashMap::new(),
            forbidden: HashSet::new(),
        }
    }

    /// Set the base URI used for `meta.location`.
    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = Some(base_uri.into());
        self
    }

    /// Set the page size used when a request does not specify `count`.
    pub fn with_default_count(mut self, default_count: usize) -> Self {
        self.default_count = default_count;
        self
    }

    /// Register credentials accepted by [`Backend::authenticate`].
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials.insert(user.into(), password.into());
        self
    }

    /// Mark a user as authenticated but without mutation privilege.
    pub fn with_forbidden(mut self, user: impl Into<String>) -> Self {
        self.forbidden.insert(user.into());
        self
    }

    /// Number of stored resources of one type, for test assertions.
    pub async fn count(&self, resource_name: &str) -> usize {
        self.data
            .read()
            .await
            .get(&resource_name.to_ascii_lowercase())
            .map(HashMap::len)
            .unwrap_or(0)
    }

    fn version_of(&self, resource: &ResourceDescriptor, object: &ScimObject) -> ScimResult<String> {
        let bytes = JsonCodec::new(self.registry.clone()).marshal(resource, object)?;
        Ok(content_version(&bytes))
    }

    fn location_of(&self, resource: &ResourceDescriptor, id: &str) -> Option<String> {
        self.base_uri
            .as_deref()
            .map(|base| format!("{}/{}/{}", base.trim_end_matches('/'), resource.endpoint(), id))
    }

    fn attach_meta(
        &self,
        resource: &ResourceDescriptor,
        object: &mut ScimObject,
        meta: Meta,
    ) -> ScimResult<()> {
        if let Some(descriptor) = resource.core_attribute("meta") {
            object.set_attribute(meta.to_attribute(descriptor)?);
        }
        Ok(())
    }
}

impl Backend for InMemoryBackend {
    async fn get_resource(&self, request: &GetResourceRequest) -> ScimResult<ScimObject> {
        let data = self.data.read().await;
        let stored = data
            .get(&storage_key(&request.resource))
            .and_then(|entries| entries.get(&request.id))
            .ok_or_else(|| ScimError::not_found(request.resource.name(), &request.id))?;
        Ok(request.selection.apply(stored))
    }

    async fn get_resources(&self, request: &GetResourcesRequest) -> ScimResult<ResourcePage> {
        let data = self.data.read().await;
        let mut candidates: Vec<ScimObject> = data
            .get(&storage_key(&request.resource))
            .map(|entries| entries.values().cloned().collect())
            .unwrap_or_default();

        if let Some(filter) = &request.filter {
            candidates.retain(|object| crate::filter::matches(filter, object));
        }
        match &request.sort {
            Some(sort) => sort.sort(&mut candidates),
            // Stable listing order without a sort: by ID.
            None => candidates.sort_by(|a, b| {
                id_of(&request.resource, a).cmp(&id_of(&request.resource, b))
            }),
        }

        let (total, page) = request.page.slice(candidates, self.default_count);
        debug!(
            "list {} returned {}/{} resources (request {})",
            request.resource.endpoint(),
            page.len(),
            total,
            request.context.request_id
        );
        Ok(ResourcePage {
            total_results: total,
            start_index: request.page.start_index,
            resources: page.iter().map(|o| request.selection.apply(o)).collect(),
        })
    }

    async fn post_resource(&self, request: &PostResourceRequest) -> ScimResult<ScimObject> {
        let resource = &request.resource;
        let mut object = strip_read_only(resource, &request.object);
        validate_required(resource, &object)?;

        let mut data = self.data.write().await;
        let entries = data.entry(storage_key(resource)).or_default();
        check_user_name_conflict(resource, &object, entries, None)?;

        let id = Uuid::new_v4().to_string();
        if let Some(descriptor) = resource.core_attribute("id") {
            object.set_attribute(ScimAttribute::singular(
                descriptor.clone(),
                ScimValue::from(id.as_str()),
            )?);
        }
        let version = self.version_of(resource, &object)?;
        let mut meta = Meta::created_now();
        meta.location = self.location_of(resource, &id);
        meta.version = Some(version);
        self.attach_meta(resource, &mut object, meta)?;

        debug!(
            "created {} {} (request {})",
            resource.name(),
            id,
            request.context.request_id
        );
        entries.insert(id, object.clone());
        Ok(request.selection.apply(&object))
    }

    async fn put_resource(&self, request: &PutResourceRequest) -> ScimResult<ScimObject> {
        let resource = &request.resource;
        let mut data = self.data.write().await;
        let entries = data.entry(storage_key(resource)).or_default();
        let stored = entries
            .get(&request.id)
            .ok_or_else(|| ScimError::not_found(resource.name(), &request.id))?
            .clone();

        let stored_meta = stored
            .attribute(resource.schema(), "meta")
            .map(Meta::from_attribute);
        if let Some(expected) = &request.expected_version {
            let current = stored_meta.as_ref().and_then(|m| m.version.clone());
            if current.as_deref() != Some(expected.as_str()) {
                return Err(ScimError::PreconditionFailed {
                    message: format!("version '{expected}' does not match current resource"),
                });
            }
        }

        // Full replace: the inbound body wins, read-only attributes carry
        // over from the stored resource, everything else absent is deleted.
        let mut object = strip_read_only(resource, &request.object);
        check_user_name_conflict(resource, &object, entries, Some(&request.id))?;
        for descriptor in resource.attributes() {
            if descriptor.is_read_only()
                && !descriptor.name().eq_ignore_ascii_case("meta")
                && let Some(kept) = stored.attribute(descriptor.schema(), descriptor.name())
            {
                object.set_attribute(kept.clone());
            }
        }

        let version = self.version_of(resource, &object)?;
        let mut meta = stored_meta.unwrap_or_else(Meta::created_now);
        meta.last_modified = Some(chrono::Utc::now());
        meta.version = Some(version);
        self.attach_meta(resource, &mut object, meta)?;

        debug!(
            "replaced {} {} (request {})",
            resource.name(),
            request.id,
            request.context.request_id
        );
        entries.insert(request.id.clone(), object.clone());
        Ok(request.selection.apply(&object))
    }

    async fn delete_resource(&self, request: &DeleteResourceRequest) -> ScimResult<()> {
        let resource = &request.resource;
        let mut data = self.data.write().await;
        let entries = data.entry(storage_key(resource)).or_default();
        if let Some(expected) = &request.expected_version {
            let current = entries
                .get(&request.id)
                .and_then(|o| o.attribute(resource.schema(), "meta"))
                .map(Meta::from_attribute)
                .and_then(|m| m.version);
            if entries.contains_key(&request.id) && current.as_deref() != Some(expected.as_str()) {
                return Err(ScimError::PreconditionFailed {
                    message: format!("version '{expected}' does not match current resource"),
                });
            }
        }
        entries
            .remove(&request.id)
            .map(|_| ())
            .ok_or_else(|| ScimError::not_found(resource.name(), &request.id))
    }

    async fn authenticate(
        &self,
        user: &str,
        password: &str,
        _context: &RequestContext,
    ) -> ScimResult<()> {
        match self.credentials.get(user) {
            Some(expected) if expected == password => {
                if self.forbidden.contains(user) {
                    Err(ScimError::Forbidden {
                        message: format!("user '{user}' may not modify resources"),
                    })
                } else {
                    Ok(())
                }
            }
            _ => Err(ScimError::unauthorized("invalid credentials")),
        }
    }
}

fn storage_key(resource: &ResourceDescriptor) -> String {
    resource.name().to_ascii_lowercase()
}

fn id_of(resource: &ResourceDescriptor, object: &ScimObject) -> String {
    object.id(resource.schema()).unwrap_or_default().to_string()
}

/// Uniqueness on `userName`: creating or renaming onto an existing value is a
/// conflict.
fn check_user_name_conflict(
    resource: &ResourceDescriptor,
    object: &ScimObject,
    entries: &HashMap<String, ScimObject>,
    exclude_id: Option<&str>,
) -> ScimResult<()> {
    let Some(descriptor) = resource.core_attribute("userName") else {
        return Ok(());
    };
    let Some(user_name) = object
        .attribute(resource.schema(), "userName")
        .and_then(|a| a.as_string().ok())
    else {
        return Ok(());
    };
    let clashes = |candidate: &str| {
        if descriptor.is_case_exact() {
            candidate == user_name
        } else {
            candidate.eq_ignore_ascii_case(user_name)
        }
    };
    for (id, existing) in entries {
        if exclude_id == Some(id.as_str()) {
            continue;
        }
        if existing
            .attribute(resource.schema(), "userName")
            .and_then(|a| a.as_string().ok())
            .is_some_and(clashes)
        {
            return Err(ScimError::conflict(format!(
                "userName '{user_name}' already exists"
            )));
        }
    }
    Ok(())
}

//! Typed backend requests and results.
//!
//! Each protocol operation has its own request type carrying the resolved
//! resource descriptor and the parameters the backend needs. The server
//! builds these from the parsed URI and body; tests build them directly.

use std::sync::Arc;

use uuid::Uuid;

use crate::filter::{AttributeSelection, FilterExpr, PageSpec, SortSpec};
use crate::resource::ScimObject;
use crate::schema::ResourceDescriptor;

/// Per-request context: correlation ID plus the authenticated principal.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Unique identifier for this request, used in logs
    pub request_id: String,
    /// The authenticated user ID, when authentication has run
    pub principal: Option<String>,
}

impl RequestContext {
    /// Create a context with a specific request ID.
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            principal: None,
        }
    }

    /// Create a context with a generated request ID.
    pub fn with_generated_id() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    /// Attach the authenticated principal.
    pub fn with_principal(mut self, principal: impl Into<String>) -> Self {
        self.principal = Some(principal.into());
        self
    }
}

/// Request for a single resource by ID.
#[derive(Debug, Clone)]
pub struct GetResourceRequest {
    /// The resource type being fetched
    pub resource: Arc<ResourceDescriptor>,
    /// The resource ID
    pub id: String,
    /// Attribute selection to apply to the result
    pub selection: AttributeSelection,
    /// Request context
    pub context: RequestContext,
}

/// Request for a filtered, sorted, paginated listing.
#[derive(Debug, Clone)]
pub struct GetResourcesRequest {
    /// The resource type being listed
    pub resource: Arc<ResourceDescriptor>,
    /// Parsed filter, if any
    pub filter: Option<FilterExpr>,
    /// Sort specification, if any
    pub sort: Option<SortSpec>,
    /// Pagination parameters
    pub page: PageSpec,
    /// Attribute selection to apply to each result
    pub selection: AttributeSelection,
    /// Request context
    pub context: RequestContext,
}

/// Request to create a resource.
#[derive(Debug, Clone)]
pub struct PostResourceRequest {
    /// The resource type being created
    pub resource: Arc<ResourceDescriptor>,
    /// The inbound resource body
    pub object: ScimObject,
    /// Attribute selection to apply to the returned resource
    pub selection: AttributeSelection,
    /// Request context
    pub context: RequestContext,
}

/// Request to fully replace a resource.
#[derive(Debug, Clone)]
pub struct PutResourceRequest {
    /// The resource type being replaced
    pub resource: Arc<ResourceDescriptor>,
    /// The resource ID
    pub id: String,
    /// The replacement body; read-only attributes in it are ignored
    pub object: ScimObject,
    /// Version precondition; mismatch fails with 412
    pub expected_version: Option<String>,
    /// Attribute selection to apply to the returned resource
    pub selection: AttributeSelection,
    /// Request context
    pub context: RequestContext,
}

/// Request to delete a resource.
#[derive(Debug, Clone)]
pub struct DeleteResourceRequest {
    /// The resource type being deleted
    pub resource: Arc<ResourceDescriptor>,
    /// The resource ID
    pub id: String,
    /// Version precondition; mismatch fails with 412
    pub expected_version: Option<String>,
    /// Request context
    pub context: RequestContext,
}

/// One page of a listing, with the true total across all pages.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourcePage {
    /// Total matching resources, not just this page
    pub total_results: usize,
    /// 1-based index of the first returned resource
    pub start_index: usize,
    /// The page of resources
    pub resources: Vec<ScimObject>,
}

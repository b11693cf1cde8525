//! The SCIM response envelope.
//!
//! A response body is either a bare resource, a `Resources` list with paging
//! totals, or an `Errors` list. The envelope is shared by the server (which
//! emits it) and the client (which parses it); the codecs translate it to and
//! from JSON and XML.

use crate::error::ScimError;
use crate::resource::ScimObject;

/// A list-response envelope: one page of resources plus paging totals.
#[derive(Debug, Clone, PartialEq)]
pub struct ListResponse {
    /// Total number of results matching the query, across all pages
    pub total_results: usize,
    /// 1-based index of the first returned result
    pub start_index: usize,
    /// Number of resources in this page
    pub items_per_page: usize,
    /// The page of resources
    pub resources: Vec<ScimObject>,
}

impl ListResponse {
    /// Build an envelope from a page of resources.
    pub fn new(total_results: usize, start_index: usize, resources: Vec<ScimObject>) -> Self {
        Self {
            total_results,
            start_index,
            items_per_page: resources.len(),
            resources,
        }
    }
}

/// One entry of an `Errors` envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorDetail {
    /// HTTP status code, as a string on the wire
    pub code: u16,
    /// Human-readable description
    pub description: String,
    /// Optional URI identifying the error condition
    pub uri: Option<String>,
}

impl From<&ScimError> for ErrorDetail {
    fn from(error: &ScimError) -> Self {
        Self {
            code: error.status(),
            description: error.to_string(),
            uri: None,
        }
    }
}

/// A parsed response body: a single resource, a list, or errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// A bare resource
    Resource(ScimObject),
    /// A `Resources` list with totals
    List(ListResponse),
    /// An `Errors` envelope
    Errors(Vec<ErrorDetail>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_detail_carries_status_and_message() {
        let err = ScimError::not_found("User", "42");
        let detail = ErrorDetail::from(&err);
        assert_eq!(detail.code, 404);
        assert!(detail.description.contains("42"));
    }

    #[test]
    fn items_per_page_tracks_the_page_not_the_total() {
        let list = ListResponse::new(50, 3, vec![]);
        assert_eq!(list.total_results, 50);
        assert_eq!(list.items_per_page, 0);
    }
}

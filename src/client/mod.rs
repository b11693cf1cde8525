//! The protocol-driving client.
//!
//! The client prepares HTTP exchanges and interprets their responses; the
//! actual transport is an external collaborator, the same way the server's
//! HTTP container is. Each prepared request captures the configuration values
//! (formats, method-override, credentials) at the call site, so reconfiguring
//! a client mid-flight never affects exchanges already in progress.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::codec::{MediaType, marshaller, unmarshaller};
use crate::error::{ScimError, ScimResult};
use crate::protocol::{ErrorDetail, ListResponse, ResponseBody};
use crate::resource::ScimObject;
use crate::schema::{ResourceDescriptor, SchemaRegistry};
use crate::server::HttpMethod;
use crate::uri::{ScimQuery, ScimUri};

/// Client configuration. Mutable between calls; each request captures the
/// current values when it is built.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URI (e.g. `https://example.com/v1`)
    pub base_uri: String,
    /// Format requested for responses
    pub accept: MediaType,
    /// Format used for request bodies
    pub send: MediaType,
    /// Tunnel PUT/DELETE through POST with `X-HTTP-Method-Override`
    pub use_method_override: bool,
    /// Deadline the transport should apply to the exchange
    pub deadline: Duration,
    /// HTTP Basic credentials
    pub credentials: Option<(String, String)>,
}

impl ClientConfig {
    /// A configuration with protocol defaults: JSON both ways, no method
    /// override, 30 second deadline.
    pub fn new(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            accept: MediaType::Json,
            send: MediaType::Json,
            use_method_override: false,
            deadline: Duration::from_secs(30),
            credentials: None,
        }
    }

    /// Authenticate with HTTP Basic credentials.
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((user.into(), password.into()));
        self
    }

    /// Use XML for both requests and responses.
    pub fn xml(mut self) -> Self {
        self.accept = MediaType::Xml;
        self.send = MediaType::Xml;
        self
    }
}

/// An exchange ready for the transport: method, absolute URI, headers, body.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    /// HTTP method to send
    pub method: HttpMethod,
    /// Absolute request URI
    pub uri: String,
    /// Header name/value pairs
    pub headers: Vec<(String, String)>,
    /// Request body, when the operation carries one
    pub body: Option<Vec<u8>>,
    /// Deadline the transport should enforce
    pub deadline: Duration,
}

/// Prepares protocol exchanges and parses their responses.
pub struct ScimClient {
    registry: Arc<SchemaRegistry>,
    config: ClientConfig,
}

impl ScimClient {
    /// Create a client over a registry and configuration.
    pub fn new(registry: Arc<SchemaRegistry>, config: ClientConfig) -> Self {
        Self { registry, config }
    }

    /// The current configuration, mutable between calls.
    pub fn config_mut(&mut self) -> &mut ClientConfig {
        &mut self.config
    }

    /// Prepare a GET for one resource.
    pub fn get_request(&self, resource: &ResourceDescriptor, id: &str) -> PreparedRequest {
        let uri = ScimUri::resource(resource.endpoint(), id);
        self.prepare(HttpMethod::Get, uri, None)
    }

    /// Prepare a listing GET with query parameters.
    pub fn query_request(
        &self,
        resource: &ResourceDescriptor,
        query: ScimQuery,
    ) -> PreparedRequest {
        let mut uri = ScimUri::endpoint(resource.endpoint());
        uri.query = query;
        self.prepare(HttpMethod::Get, uri, None)
    }

    /// Prepare a POST creating a resource.
    pub fn create_request(
        &self,
        resource: &ResourceDescriptor,
        object: &ScimObject,
    ) -> ScimResult<PreparedRequest> {
        let body = marshaller(self.config.send, self.registry.clone()).marshal(resource, object)?;
        let uri = ScimUri::endpoint(resource.endpoint());
        Ok(self.prepare(HttpMethod::Post, uri, Some(body)))
    }

    /// Prepare a PUT replacing a resource.
    pub fn replace_request(
        &self,
        resource: &ResourceDescriptor,
        id: &str,
        object: &ScimObject,
        expected_version: Option<&str>,
    ) -> ScimResult<PreparedRequest> {
        let body = marshaller(self.config.send, self.registry.clone()).marshal(resource, object)?;
        let uri = ScimUri::resource(resource.endpoint(), id);
        let mut request = self.prepare(HttpMethod::Put, uri, Some(body));
        if let Some(version) = expected_version {
            request
                .headers
                .push(("If-Match".to_string(), format!("\"{version}\"")));
        }
        Ok(request)
    }

    /// Prepare a DELETE.
    pub fn delete_request(
        &self,
        resource: &ResourceDescriptor,
        id: &str,
        expected_version: Option<&str>,
    ) -> PreparedRequest {
        let uri = ScimUri::resource(resource.endpoint(), id);
        let mut request = self.prepare(HttpMethod::Delete, uri, None);
        if let Some(version) = expected_version {
            request
                .headers
                .push(("If-Match".to_string(), format!("\"{version}\"")));
        }
        request
    }

    /// Interpret a single-resource response.
    pub fn read_resource(
        &self,
        status: u16,
        content_type: Option<&str>,
        body: &[u8],
        resource: &ResourceDescriptor,
    ) -> ScimResult<ScimObject> {
        match self.read_response(status, content_type, body, resource)? {
            ResponseBody::Resource(object) => Ok(object),
            other => Err(ScimError::invalid_resource(format!(
                "expected a single resource, got {}",
                body_kind(&other)
            ))),
        }
    }

    /// Interpret a list response.
    pub fn read_list(
        &self,
        status: u16,
        content_type: Option<&str>,
        body: &[u8],
        resource: &ResourceDescriptor,
    ) -> ScimResult<ListResponse> {
        match self.read_response(status, content_type, body, resource)? {
            ResponseBody::List(list) => Ok(list),
            other => Err(ScimError::invalid_resource(format!(
                "expected a list response, got {}",
                body_kind(&other)
            ))),
        }
    }

    /// Interpret a bodyless response (DELETE).
    pub fn read_empty(
        &self,
        status: u16,
        content_type: Option<&str>,
        body: &[u8],
        resource: &ResourceDescriptor,
    ) -> ScimResult<()> {
        if status < 400 {
            return Ok(());
        }
        match self.read_response(status, content_type, body, resource)? {
            ResponseBody::Errors(errors) => Err(error_from_envelope(status, errors)),
            _ => Err(error_from_envelope(status, Vec::new())),
        }
    }

    fn read_response(
        &self,
        status: u16,
        content_type: Option<&str>,
        body: &[u8],
        resource: &ResourceDescriptor,
    ) -> ScimResult<ResponseBody> {
        let media = content_type
            .and_then(MediaType::from_content_type)
            .unwrap_or(self.config.accept);
        if status >= 400 {
            let errors = match unmarshaller(media, self.registry.clone())
                .unmarshal_response(body, resource)
            {
                Ok(ResponseBody::Errors(errors)) => errors,
                _ => Vec::new(),
            };
            return Err(error_from_envelope(status, errors));
        }
        unmarshaller(media, self.registry.clone()).unmarshal_response(body, resource)
    }

    fn prepare(
        &self,
        method: HttpMethod,
        uri: ScimUri,
        body: Option<Vec<u8>>,
    ) -> PreparedRequest {
        let mut headers = vec![(
            "Accept".to_string(),
            self.config.accept.content_type().to_string(),
        )];
        if body.is_some() {
            headers.push((
                "Content-Type".to_string(),
                self.config.send.content_type().to_string(),
            ));
        }
        if let Some((user, password)) = &self.config.credentials {
            let token = BASE64.encode(format!("{user}:{password}"));
            headers.push(("Authorization".to_string(), format!("Basic {token}")));
        }
        // Some intermediaries only pass GET and POST; tunnel the verb.
        let method = if self.config.use_method_override
            && matches!(method, HttpMethod::Put | HttpMethod::Delete | HttpMethod::Patch)
        {
            let name = match method {
                HttpMethod::Put => "PUT",
                HttpMethod::Delete => "DELETE",
                _ => "PATCH",
            };
            headers.push(("X-HTTP-Method-Override".to_string(), name.to_string()));
            HttpMethod::Post
        } else {
            method
        };
        PreparedRequest {
            method,
            uri: uri.emit(&self.config.base_uri),
            headers,
            body,
            deadline: self.config.deadline,
        }
    }
}

fn body_kind(body: &ResponseBody) -> &'static str {
    match body {
        ResponseBody::Resource(_) => "a resource",
        ResponseBody::List(_) => "a list",
        ResponseBody::Errors(_) => "an error envelope",
    }
}

/// Reconstruct a typed error from a response status and `Errors` envelope.
fn error_from_envelope(status: u16, errors: Vec<ErrorDetail>) -> ScimError {
    let description = errors
        .first()
        .map(|e| e.description.clone())
        .unwrap_or_else(|| format!("request failed with status {status}"));
    match status {
        400 => ScimError::invalid_resource(description),
        401 => ScimError::unauthorized(description),
        403 => ScimError::Forbidden {
            message: description,
        },
        404 => ScimError::NotFound {
            resource: "resource".to_string(),
            id: description,
        },
        409 => ScimError::conflict(description),
        412 => ScimError::PreconditionFailed {
            message: description,
        },
        501 => ScimError::NotImplemented {
            message: description,
        },
        _ => ScimError::backend(description),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::PageSpec;

    fn client() -> (ScimClient, Arc<ResourceDescriptor>) {
        let registry = Arc::new(SchemaRegistry::core());
        let resource = registry.resource("User").unwrap().clone();
        let config = ClientConfig::new("https://example.com/v1").with_credentials("admin", "pw");
        (ScimClient::new(registry, config), resource)
    }

    fn header<'a>(request: &'a PreparedRequest, name: &str) -> Option<&'a str> {
        request
            .headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn get_request_shape() {
        let (client, resource) = client();
        let request = client.get_request(&resource, "42");
        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.uri, "https://example.com/v1/Users/42");
        assert_eq!(header(&request, "Accept"), Some("application/json"));
        assert!(header(&request, "Authorization").unwrap().starts_with("Basic "));
        assert!(request.body.is_none());
    }

    #[test]
    fn query_request_carries_parameters() {
        let (client, resource) = client();
        let query = ScimQuery {
            filter: Some("userName eq \"alice\"".into()),
            page: PageSpec {
                start_index: 2,
                count: Some(5),
            },
            ..ScimQuery::default()
        };
        let request = client.query_request(&resource, query);
        assert!(request.uri.contains("filter=userName"));
        assert!(request.uri.contains("startIndex=2"));
        assert!(request.uri.contains("count=5"));
    }

    #[test]
    fn method_override_tunnels_delete_through_post() {
        let (mut client, resource) = client();
        client.config_mut().use_method_override = true;
        let request = client.delete_request(&resource, "42", None);
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(header(&request, "X-HTTP-Method-Override"), Some("DELETE"));
    }

    #[test]
    fn replace_request_carries_if_match() {
        let (client, resource) = client();
        let request = client
            .replace_request(&resource, "42", &ScimObject::new(), Some("v1"))
            .unwrap();
        assert_eq!(header(&request, "If-Match"), Some("\"v1\""));
        assert_eq!(header(&request, "Content-Type"), Some("application/json"));
    }

    #[test]
    fn error_envelopes_become_typed_errors() {
        let (client, resource) = client();
        let body = br#"{"Errors":[{"description":"resource not found","code":"404"}]}"#;
        let err = client
            .read_resource(404, Some("application/json"), body, &resource)
            .unwrap_err();
        assert_eq!(err.status(), 404);
    }
}

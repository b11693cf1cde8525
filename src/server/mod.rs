//! The transport-agnostic resource server.
//!
//! The HTTP container (an external collaborator) hands the server one
//! [`ScimHttpRequest`] per exchange and writes back the returned
//! [`ScimHttpResponse`]; everything protocol-shaped happens here: URI and
//! query parsing, content negotiation, method-override tunneling, Basic
//! authentication passthrough, verb dispatch to the [`Backend`], and
//! rendering of resources and error envelopes through the codecs.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use log::{debug, info};

use crate::backend::{
    Backend, DeleteResourceRequest, GetResourceRequest, GetResourcesRequest, PostResourceRequest,
    PutResourceRequest, RequestContext,
};
use crate::codec::{MediaType, marshaller, unmarshaller};
use crate::error::{ScimError, ScimResult};
use crate::filter::FilterExpr;
use crate::protocol::{ErrorDetail, ListResponse};
use crate::resource::ScimObject;
use crate::schema::{ResourceDescriptor, SchemaRegistry};
use crate::uri::ScimUri;

/// HTTP methods the server dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// Retrieve one resource or a listing
    Get,
    /// Create, or tunnel another verb via `X-HTTP-Method-Override`
    Post,
    /// Full replace
    Put,
    /// Partial modify (its wire tunneling is recognized, not implemented)
    Patch,
    /// Remove
    Delete,
}

impl HttpMethod {
    fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }

    fn is_mutation(&self) -> bool {
        !matches!(self, Self::Get)
    }
}

/// The request headers the protocol consumes.
#[derive(Debug, Clone, Default)]
pub struct RequestHeaders {
    /// `Accept`, possibly listing both media types comma-separated
    pub accept: Option<String>,
    /// `Content-Type` of the request body
    pub content_type: Option<String>,
    /// `Authorization` (HTTP Basic)
    pub authorization: Option<String>,
    /// `X-HTTP-Method-Override`, honored on POST
    pub method_override: Option<String>,
    /// `If-Match` version precondition for PUT/DELETE
    pub if_match: Option<String>,
}

/// One HTTP exchange as seen by the server core.
#[derive(Debug, Clone)]
pub struct ScimHttpRequest {
    /// The HTTP verb
    pub method: HttpMethod,
    /// Path and query relative to the server base URI
    pub uri: String,
    /// Protocol-relevant headers
    pub headers: RequestHeaders,
    /// Request body, empty when absent
    pub body: Vec<u8>,
}

/// The server's answer to one exchange.
#[derive(Debug, Clone)]
pub struct ScimHttpResponse {
    /// HTTP status code
    pub status: u16,
    /// `Content-Type` of the body, when a body is present
    pub content_type: Option<&'static str>,
    /// `Location` header (set on create)
    pub location: Option<String>,
    /// Response body
    pub body: Vec<u8>,
}

/// Dispatches SCIM protocol requests to a [`Backend`].
pub struct ResourceServer<B> {
    registry: Arc<SchemaRegistry>,
    backend: B,
    base_uri: String,
}

impl<B: Backend> ResourceServer<B> {
    /// Create a server over a registry and backend. `base_uri` is used for
    /// `Location` headers and absolute-URI parsing.
    pub fn new(registry: Arc<SchemaRegistry>, backend: B, base_uri: impl Into<String>) -> Self {
        Self {
            registry,
            backend,
            base_uri: base_uri.into(),
        }
    }

    /// The backend, for test setup and administrative access.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Handle one exchange. Never fails: protocol and backend errors are
    /// rendered as SCIM error envelopes with the matching status code.
    pub async fn handle(&self, request: ScimHttpRequest) -> ScimHttpResponse {
        // Media negotiation must survive URI parse failures, so derive a
        // fallback from the Accept header first.
        let fallback_media = negotiate_accept(request.headers.accept.as_deref());
        match self.dispatch(&request).await {
            Ok(response) => response,
            Err(error) => {
                let media = ScimUri::parse(&request.uri)
                    .ok()
                    .and_then(|u| u.media)
                    .unwrap_or(fallback_media);
                self.error_response(media, &error)
            }
        }
    }

    async fn dispatch(&self, request: &ScimHttpRequest) -> ScimResult<ScimHttpResponse> {
        let uri = ScimUri::parse(&request.uri)?;
        let media = uri
            .media
            .unwrap_or_else(|| negotiate_accept(request.headers.accept.as_deref()));
        let resource = self
            .registry
            .resource_by_endpoint(&uri.endpoint)
            .cloned()
            .ok_or_else(|| ScimError::UnknownEndpoint {
                endpoint: uri.endpoint.clone(),
            })?;

        let method = effective_method(request)?;
        let mut context = RequestContext::with_generated_id();
        if method.is_mutation() {
            let (user, password) = basic_credentials(request.headers.authorization.as_deref())?;
            self.backend
                .authenticate(&user, &password, &context)
                .await?;
            context = context.with_principal(user);
        }
        info!(
            "{:?} /{}{} (request {})",
            method,
            uri.endpoint,
            uri.resource_id.as_deref().map(|id| format!("/{id}")).unwrap_or_default(),
            context.request_id
        );

        match (method, uri.resource_id.as_deref()) {
            (HttpMethod::Get, Some(id)) => {
                let object = self
                    .backend
                    .get_resource(&GetResourceRequest {
                        resource: resource.clone(),
                        id: id.to_string(),
                        selection: uri.query.attributes.clone(),
                        context,
                    })
                    .await?;
                self.resource_response(200, media, &resource, &object, None)
            }
            (HttpMethod::Get, None) => {
                let filter = uri
                    .query
                    .filter
                    .as_deref()
                    .map(FilterExpr::parse)
                    .transpose()?;
                let page = self
                    .backend
                    .get_resources(&GetResourcesRequest {
                        resource: resource.clone(),
                        filter,
                        sort: uri.query.sort.clone(),
                        page: uri.query.page,
                        selection: uri.query.attributes.clone(),
                        context,
                    })
                    .await?;
                let list = ListResponse {
                    total_results: page.total_results,
                    start_index: page.start_index,
                    items_per_page: page.resources.len(),
                    resources: page.resources,
                };
                let body = marshaller(media, self.registry.clone()).marshal_list(&resource, &list)?;
                Ok(ScimHttpResponse {
                    status: 200,
                    content_type: Some(media.content_type()),
                    location: None,
                    body,
                })
            }
            (HttpMethod::Post, None) => {
                let object = self.read_body(request, media, &resource)?;
                let created = self
                    .backend
                    .post_resource(&PostResourceRequest {
                        resource: resource.clone(),
                        object,
                        selection: uri.query.attributes.clone(),
                        context,
                    })
                    .await?;
                let location = created
                    .id(resource.schema())
                    .map(|id| ScimUri::resource(resource.endpoint(), id).emit(&self.base_uri));
                self.resource_response(201, media, &resource, &created, location)
            }
            (HttpMethod::Put, Some(id)) => {
                let object = self.read_body(request, media, &resource)?;
                let updated = self
                    .backend
                    .put_resource(&PutResourceRequest {
                        resource: resource.clone(),
                        id: id.to_string(),
                        object,
                        expected_version: etag_value(request.headers.if_match.as_deref()),
                        selection: uri.query.attributes.clone(),
                        context,
                    })
                    .await?;
                self.resource_response(200, media, &resource, &updated, None)
            }
            (HttpMethod::Delete, Some(id)) => {
                self.backend
                    .delete_resource(&DeleteResourceRequest {
                        resource: resource.clone(),
                        id: id.to_string(),
                        expected_version: etag_value(request.headers.if_match.as_deref()),
                        context,
                    })
                    .await?;
                Ok(ScimHttpResponse {
                    status: 200,
                    content_type: None,
                    location: None,
                    body: Vec::new(),
                })
            }
            (HttpMethod::Patch, _) => Err(ScimError::NotImplemented {
                message: "PATCH is not supported".to_string(),
            }),
            (HttpMethod::Post, Some(_)) => Err(ScimError::invalid_uri(
                "POST to a resource URI requires X-HTTP-Method-Override",
            )),
            (HttpMethod::Put, None) | (HttpMethod::Delete, None) => Err(
                ScimError::invalid_uri("this method requires a resource ID in the URI"),
            ),
        }
    }

    fn read_body(
        &self,
        request: &ScimHttpRequest,
        response_media: MediaType,
        resource: &Arc<ResourceDescriptor>,
    ) -> ScimResult<ScimObject> {
        if request.body.is_empty() {
            return Err(ScimError::invalid_resource("request body is required"));
        }
        // The declared Content-Type is honored; a body that does not parse in
        // the declared format is a 400.
        let media = match request.headers.content_type.as_deref() {
            Some(declared) => MediaType::from_content_type(declared).ok_or_else(|| {
                ScimError::invalid_resource(format!("unsupported content type '{declared}'"))
            })?,
            None => response_media,
        };
        unmarshaller(media, self.registry.clone()).unmarshal(&request.body, resource)
    }

    fn resource_response(
        &self,
        status: u16,
        media: MediaType,
        resource: &Arc<ResourceDescriptor>,
        object: &ScimObject,
        location: Option<String>,
    ) -> ScimResult<ScimHttpResponse> {
        let body = marshaller(media, self.registry.clone()).marshal(resource, object)?;
        Ok(ScimHttpResponse {
            status,
            content_type: Some(media.content_type()),
            location,
            body,
        })
    }

    fn error_response(&self, media: MediaType, error: &ScimError) -> ScimHttpResponse {
        debug!("request failed: {error}");
        let errors = [ErrorDetail::from(error)];
        let body = marshaller(media, self.registry.clone())
            .marshal_errors(&errors)
            .unwrap_or_default();
        ScimHttpResponse {
            status: error.status(),
            content_type: Some(media.content_type()),
            location: None,
            body,
        }
    }
}

/// Resolve the effective verb, honoring `X-HTTP-Method-Override` on POST.
fn effective_method(request: &ScimHttpRequest) -> ScimResult<HttpMethod> {
    let Some(override_name) = request.headers.method_override.as_deref() else {
        return Ok(request.method);
    };
    if request.method != HttpMethod::Post {
        return Ok(request.method);
    }
    match HttpMethod::parse(override_name) {
        Some(method @ (HttpMethod::Put | HttpMethod::Patch | HttpMethod::Delete)) => Ok(method),
        _ => Err(ScimError::invalid_uri(format!(
            "invalid X-HTTP-Method-Override '{override_name}'"
        ))),
    }
}

/// Pick the response format from an `Accept` header. JSON is preferred when
/// both formats are acceptable, and is the default when the header is absent
/// or names neither format.
fn negotiate_accept(accept: Option<&str>) -> MediaType {
    let Some(accept) = accept else {
        return MediaType::Json;
    };
    let mut acceptable = Vec::new();
    for part in accept.split(',') {
        let essence = part.split(';').next().unwrap_or("").trim();
        if essence == "*/*" || essence == "application/*" {
            return MediaType::Json;
        }
        if let Some(media) = MediaType::from_content_type(essence) {
            acceptable.push(media);
        }
    }
    if acceptable.contains(&MediaType::Json) {
        MediaType::Json
    } else if acceptable.contains(&MediaType::Xml) {
        MediaType::Xml
    } else {
        MediaType::Json
    }
}

/// Parse HTTP Basic credentials into `(userID, password)`.
fn basic_credentials(authorization: Option<&str>) -> ScimResult<(String, String)> {
    let header = authorization
        .ok_or_else(|| ScimError::unauthorized("authentication required"))?;
    let encoded = header
        .strip_prefix("Basic ")
        .or_else(|| header.strip_prefix("basic "))
        .ok_or_else(|| ScimError::unauthorized("only Basic authentication is supported"))?;
    let decoded = BASE64
        .decode(encoded.trim())
        .map_err(|_| ScimError::unauthorized("malformed Basic credentials"))?;
    let decoded = String::from_utf8(decoded)
        .map_err(|_| ScimError::unauthorized("malformed Basic credentials"))?;
    let (user, password) = decoded
        .split_once(':')
        .ok_or_else(|| ScimError::unauthorized("malformed Basic credentials"))?;
    Ok((user.to_string(), password.to_string()))
}

/// Strip the quotes (and weak prefix) from an `If-Match` value.
fn etag_value(if_match: Option<&str>) -> Option<String> {
    if_match.map(|raw| {
        raw.trim()
            .trim_start_matches("W/")
            .trim_matches('"')
            .to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_negotiation_prefers_json() {
        assert_eq!(negotiate_accept(None), MediaType::Json);
        assert_eq!(negotiate_accept(Some("*/*")), MediaType::Json);
        assert_eq!(negotiate_accept(Some("application/xml")), MediaType::Xml);
        assert_eq!(
            negotiate_accept(Some("application/xml, application/json")),
            MediaType::Json
        );
        assert_eq!(negotiate_accept(Some("text/plain")), MediaType::Json);
    }

    #[test]
    fn basic_credentials_parse() {
        let header = format!("Basic {}", BASE64.encode("jdoe:s3cret"));
        let (user, password) = basic_credentials(Some(&header)).unwrap();
        assert_eq!(user, "jdoe");
        assert_eq!(password, "s3cret");

        assert!(basic_credentials(None).is_err());
        assert!(basic_credentials(Some("Bearer xyz")).is_err());
        assert!(basic_credentials(Some("Basic !!!")).is_err());
    }

    #[test]
    fn method_override_applies_to_post_only() {
        let mut request = ScimHttpRequest {
            method: HttpMethod::Post,
            uri: "/Users/42".into(),
            headers: RequestHeaders {
                method_override: Some("DELETE".into()),
                ..RequestHeaders::default()
            },
            body: Vec::new(),
        };
        assert_eq!(effective_method(&request).unwrap(), HttpMethod::Delete);

        request.method = HttpMethod::Get;
        assert_eq!(effective_method(&request).unwrap(), HttpMethod::Get);

        request.method = HttpMethod::Post;
        request.headers.method_override = Some("GET".into());
        assert!(effective_method(&request).is_err());
    }

    #[test]
    fn etag_values_unquote() {
        assert_eq!(etag_value(Some("\"abc\"")), Some("abc".to_string()));
        assert_eq!(etag_value(Some("W/\"abc\"")), Some("abc".to_string()));
        assert_eq!(etag_value(None), None);
    }
}

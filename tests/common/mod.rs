//! Shared test support: an in-memory-backed server plus request helpers.
#![allow(dead_code)] // not every test binary uses every helper

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;

use scim_directory::backend::InMemoryBackend;
use scim_directory::schema::SchemaRegistry;
use scim_directory::server::{
    HttpMethod, RequestHeaders, ResourceServer, ScimHttpRequest, ScimHttpResponse,
};

pub const BASE_URI: &str = "https://example.com/v1";
pub const ADMIN: &str = "admin";
pub const PASSWORD: &str = "s3cret";

/// A server over a fresh in-memory backend with admin credentials.
pub fn test_server() -> ResourceServer<InMemoryBackend> {
    let registry = Arc::new(SchemaRegistry::core());
    let backend = InMemoryBackend::new(registry.clone())
        .with_base_uri(BASE_URI)
        .with_credentials(ADMIN, PASSWORD)
        .with_credentials("viewer", "viewerpw")
        .with_forbidden("viewer");
    ResourceServer::new(registry, backend, BASE_URI)
}

pub fn basic_auth(user: &str, password: &str) -> String {
    format!("Basic {}", BASE64.encode(format!("{user}:{password}")))
}

pub fn admin_headers() -> RequestHeaders {
    RequestHeaders {
        authorization: Some(basic_auth(ADMIN, PASSWORD)),
        ..RequestHeaders::default()
    }
}

pub async fn get(server: &ResourceServer<InMemoryBackend>, uri: &str) -> ScimHttpResponse {
    server
        .handle(ScimHttpRequest {
            method: HttpMethod::Get,
            uri: uri.to_string(),
            headers: RequestHeaders::default(),
            body: Vec::new(),
        })
        .await
}

pub async fn post_json(
    server: &ResourceServer<InMemoryBackend>,
    uri: &str,
    body: &Value,
) -> ScimHttpResponse {
    let mut headers = admin_headers();
    headers.content_type = Some("application/json".to_string());
    server
        .handle(ScimHttpRequest {
            method: HttpMethod::Post,
            uri: uri.to_string(),
            headers,
            body: serde_json::to_vec(body).unwrap(),
        })
        .await
}

pub async fn put_json(
    server: &ResourceServer<InMemoryBackend>,
    uri: &str,
    body: &Value,
) -> ScimHttpResponse {
    let mut headers = admin_headers();
    headers.content_type = Some("application/json".to_string());
    server
        .handle(ScimHttpRequest {
            method: HttpMethod::Put,
            uri: uri.to_string(),
            headers,
            body: serde_json::to_vec(body).unwrap(),
        })
        .await
}

pub async fn delete(server: &ResourceServer<InMemoryBackend>, uri: &str) -> ScimHttpResponse {
    server
        .handle(ScimHttpRequest {
            method: HttpMethod::Delete,
            uri: uri.to_string(),
            headers: admin_headers(),
            body: Vec::new(),
        })
        .await
}

/// Parse a JSON response body.
pub fn json_body(response: &ScimHttpResponse) -> Value {
    serde_json::from_slice(&response.body).unwrap_or_else(|e| {
        panic!(
            "response body is not JSON ({e}): {}",
            String::from_utf8_lossy(&response.body)
        )
    })
}

/// Create a user and return its server-assigned ID.
pub async fn seed_user(server: &ResourceServer<InMemoryBackend>, body: &Value) -> String {
    let response = post_json(server, "/Users", body).await;
    assert_eq!(response.status, 201, "seed failed: {}", String::from_utf8_lossy(&response.body));
    json_body(&response)["id"].as_str().unwrap().to_string()
}

//! End-to-end protocol scenarios against the in-memory backend.

mod common;

use common::*;
use serde_json::json;

use scim_directory::server::{HttpMethod, RequestHeaders, ScimHttpRequest};

#[tokio::test]
async fn create_then_get() {
    let server = test_server();
    let response = post_json(
        &server,
        "/Users",
        &json!({
            "schemas": ["urn:scim:schemas:core:1.0"],
            "userName": "jdoe",
            "name": { "formatted": "Jane Doe" }
        }),
    )
    .await;
    assert_eq!(response.status, 201);
    let created = json_body(&response);
    let id = created["id"].as_str().expect("server-assigned id");
    let location = response.location.as_deref().expect("Location header");
    assert_eq!(location, format!("{BASE_URI}/Users/{id}"));

    let response = get(&server, &format!("/Users/{id}")).await;
    assert_eq!(response.status, 200);
    let fetched = json_body(&response);
    assert_eq!(fetched["id"], created["id"]);
    assert_eq!(fetched["userName"], "jdoe");
    assert_eq!(fetched["name"]["formatted"], "Jane Doe");
    let created_at = fetched["meta"]["created"].as_str().unwrap();
    let modified_at = fetched["meta"]["lastModified"].as_str().unwrap();
    assert!(created_at <= modified_at);
}

#[tokio::test]
async fn filter_equality() {
    let server = test_server();
    seed_user(&server, &json!({"userName": "alice"})).await;
    seed_user(&server, &json!({"userName": "bob"})).await;

    let response = get(&server, "/Users?filter=userName%20eq%20%22alice%22").await;
    assert_eq!(response.status, 200);
    let body = json_body(&response);
    assert_eq!(body["totalResults"], 1);
    assert_eq!(body["Resources"][0]["userName"], "alice");
}

#[tokio::test]
async fn sort_and_page() {
    let server = test_server();
    for (user, family) in [("u1", "E"), ("u2", "D"), ("u3", "C"), ("u4", "B"), ("u5", "A")] {
        seed_user(
            &server,
            &json!({"userName": user, "name": {"familyName": family}}),
        )
        .await;
    }

    let response = get(
        &server,
        "/Users?sortBy=name.familyName&sortOrder=ascending&startIndex=2&count=2",
    )
    .await;
    assert_eq!(response.status, 200);
    let body = json_body(&response);
    assert_eq!(body["totalResults"], 5);
    assert_eq!(body["startIndex"], 2);
    assert_eq!(body["itemsPerPage"], 2);
    assert_eq!(body["Resources"][0]["name"]["familyName"], "B");
    assert_eq!(body["Resources"][1]["name"]["familyName"], "C");
}

#[tokio::test]
async fn method_override_delete() {
    let server = test_server();
    let id = seed_user(&server, &json!({"userName": "jdoe"})).await;

    let mut headers = admin_headers();
    headers.method_override = Some("DELETE".to_string());
    let response = server
        .handle(ScimHttpRequest {
            method: HttpMethod::Post,
            uri: format!("/Users/{id}"),
            headers,
            body: Vec::new(),
        })
        .await;
    assert_eq!(response.status, 200);

    let response = get(&server, &format!("/Users/{id}")).await;
    assert_eq!(response.status, 404);
}

#[tokio::test]
async fn put_discards_read_only_and_deletes_absent_attributes() {
    let server = test_server();
    let id = seed_user(
        &server,
        &json!({"userName": "jdoe", "displayName": "Jane", "title": "Engineer"}),
    )
    .await;

    let response = put_json(
        &server,
        &format!("/Users/{id}"),
        &json!({
            "id": "forged-id",
            "userName": "jdoe",
            "displayName": "Jane Doe"
        }),
    )
    .await;
    assert_eq!(response.status, 200);
    let updated = json_body(&response);
    assert_eq!(updated["id"], id.as_str(), "read-only id is preserved, not replaced");
    assert_eq!(updated["displayName"], "Jane Doe");
    assert!(updated.get("title").is_none(), "absent mutable attribute is deleted");
}

#[tokio::test]
async fn unknown_endpoint_and_malformed_filter_are_client_errors() {
    let server = test_server();
    assert_eq!(get(&server, "/Devices").await.status, 404);

    let response = get(&server, "/Users?filter=userName%20zz%20%22x%22").await;
    assert_eq!(response.status, 400);
    let body = json_body(&response);
    assert_eq!(body["Errors"][0]["code"], "400");
}

#[tokio::test]
async fn mutations_require_authentication() {
    let server = test_server();
    let body = json!({"userName": "jdoe"});

    // No credentials.
    let response = server
        .handle(ScimHttpRequest {
            method: HttpMethod::Post,
            uri: "/Users".to_string(),
            headers: RequestHeaders {
                content_type: Some("application/json".to_string()),
                ..RequestHeaders::default()
            },
            body: serde_json::to_vec(&body).unwrap(),
        })
        .await;
    assert_eq!(response.status, 401);

    // Wrong password.
    let response = server
        .handle(ScimHttpRequest {
            method: HttpMethod::Post,
            uri: "/Users".to_string(),
            headers: RequestHeaders {
                authorization: Some(basic_auth(ADMIN, "wrong")),
                content_type: Some("application/json".to_string()),
                ..RequestHeaders::default()
            },
            body: serde_json::to_vec(&body).unwrap(),
        })
        .await;
    assert_eq!(response.status, 401);

    // Authenticated but not privileged.
    let response = server
        .handle(ScimHttpRequest {
            method: HttpMethod::Post,
            uri: "/Users".to_string(),
            headers: RequestHeaders {
                authorization: Some(basic_auth("viewer", "viewerpw")),
                content_type: Some("application/json".to_string()),
                ..RequestHeaders::default()
            },
            body: serde_json::to_vec(&body).unwrap(),
        })
        .await;
    assert_eq!(response.status, 403);

    // Reads pass through without credentials.
    assert_eq!(get(&server, "/Users").await.status, 200);
}

#[tokio::test]
async fn duplicate_user_name_is_conflict() {
    let server = test_server();
    seed_user(&server, &json!({"userName": "jdoe"})).await;
    let response = post_json(&server, "/Users", &json!({"userName": "jdoe"})).await;
    assert_eq!(response.status, 409);
}

#[tokio::test]
async fn media_suffix_overrides_accept_header() {
    let server = test_server();
    let id = seed_user(&server, &json!({"userName": "jdoe"})).await;

    let response = server
        .handle(ScimHttpRequest {
            method: HttpMethod::Get,
            uri: format!("/Users/{id}.xml"),
            headers: RequestHeaders {
                accept: Some("application/json".to_string()),
                ..RequestHeaders::default()
            },
            body: Vec::new(),
        })
        .await;
    assert_eq!(response.status, 200);
    assert_eq!(response.content_type, Some("application/xml"));
    let text = String::from_utf8(response.body).unwrap();
    assert!(text.starts_with("<?xml"));
    assert!(text.contains("<userName>jdoe</userName>"));
}

#[tokio::test]
async fn attribute_selection_boundaries() {
    let server = test_server();
    let id = seed_user(
        &server,
        &json!({"userName": "jdoe", "displayName": "Jane", "title": "Engineer"}),
    )
    .await;

    // Empty attributes= list returns all attributes.
    let response = get(&server, &format!("/Users/{id}?attributes=")).await;
    let body = json_body(&response);
    assert_eq!(body["displayName"], "Jane");
    assert_eq!(body["title"], "Engineer");

    // A subset keeps the always-returned id/meta/schemas.
    let response = get(&server, &format!("/Users/{id}?attributes=userName")).await;
    let body = json_body(&response);
    assert_eq!(body["userName"], "jdoe");
    assert_eq!(body["id"], id.as_str());
    assert!(body.get("meta").is_some());
    assert!(body.get("schemas").is_some());
    assert!(body.get("displayName").is_none());
}

#[tokio::test]
async fn start_index_beyond_total_returns_empty_page_with_true_total() {
    let server = test_server();
    seed_user(&server, &json!({"userName": "alice"})).await;
    seed_user(&server, &json!({"userName": "bob"})).await;

    let response = get(&server, "/Users?startIndex=10&count=5").await;
    let body = json_body(&response);
    assert_eq!(body["totalResults"], 2);
    assert_eq!(body["itemsPerPage"], 0);
    assert_eq!(body["Resources"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn present_filter_on_absent_attribute_returns_empty_set() {
    let server = test_server();
    seed_user(&server, &json!({"userName": "alice"})).await;
    let response = get(&server, "/Users?filter=title%20pr").await;
    let body = json_body(&response);
    assert_eq!(body["totalResults"], 0);
}

#[tokio::test]
async fn codec_equivalence_for_plural_payloads() {
    use scim_directory::codec::{JsonCodec, Marshaller, Unmarshaller, XmlCodec};
    use scim_directory::schema::SchemaRegistry;
    use std::sync::Arc;

    let registry = Arc::new(SchemaRegistry::core());
    let resource = registry.resource("User").unwrap().clone();
    let json_codec = JsonCodec::new(registry.clone());
    let xml_codec = XmlCodec::new(registry.clone());

    let body = serde_json::to_vec(&json!({
        "schemas": ["urn:scim:schemas:core:1.0"],
        "userName": "jdoe",
        "emails": [
            {"value": "a@x", "type": "work", "primary": true},
            {"value": "b@y", "type": "home"}
        ]
    }))
    .unwrap();
    let from_json = json_codec.unmarshal(&body, &resource).unwrap();

    // The same resource through the XML representation.
    let xml = xml_codec.marshal(&resource, &from_json).unwrap();
    let from_xml = xml_codec.unmarshal(&xml, &resource).unwrap();
    assert_eq!(from_json, from_xml);

    // And back through JSON again.
    let json_again = json_codec.marshal(&resource, &from_xml).unwrap();
    let round = json_codec.unmarshal(&json_again, &resource).unwrap();
    assert_eq!(round, from_json);

    // Exactly one email is primary after all conversions.
    let emails = round.attribute("urn:scim:schemas:core:1.0", "emails").unwrap();
    let primaries = emails
        .values()
        .iter()
        .filter(|v| {
            v.as_complex()
                .map(|c| c.sub_boolean("primary") == Some(true))
                .unwrap_or(false)
        })
        .count();
    assert_eq!(primaries, 1);
}

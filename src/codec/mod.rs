//! Codecs: marshal and unmarshal resources to JSON and XML.
//!
//! Both codecs implement the shared [`Marshaller`] / [`Unmarshaller`]
//! contract and are driven entirely by the schema registry: the wire shape of
//! every attribute comes from its descriptor, and a single dispatch on
//! [`DataType`](crate::schema::DataType) handles the leaves.
//!
//! Marshal ordering is deterministic: attributes appear in registry order
//! within a schema, and schemas in lexical URI order with the primary schema
//! first. Datetimes are ISO-8601 UTC with a `Z` suffix; binary values are
//! base64.

pub mod json;
pub mod xml;

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{ScimResult, SchemaViolation};
use crate::protocol::{ErrorDetail, ListResponse, ResponseBody};
use crate::resource::ScimObject;
use crate::schema::{ResourceDescriptor, SchemaRegistry};

pub use json::JsonCodec;
pub use xml::XmlCodec;

/// The two SCIM 1.0 wire formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    /// `application/json`
    Json,
    /// `application/xml`
    Xml,
}

impl MediaType {
    /// The media type string used in `Content-Type` and `Accept` headers.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Xml => "application/xml",
        }
    }

    /// Parse a `Content-Type` header value, ignoring parameters.
    pub fn from_content_type(value: &str) -> Option<Self> {
        let essence = value.split(';').next().unwrap_or("").trim();
        match essence.to_ascii_lowercase().as_str() {
            "application/json" => Some(Self::Json),
            "application/xml" | "text/xml" => Some(Self::Xml),
            _ => None,
        }
    }

    /// Parse a URI media suffix (without the dot).
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "xml" => Some(Self::Xml),
            _ => None,
        }
    }

    /// The URI suffix including the dot.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Json => ".json",
            Self::Xml => ".xml",
        }
    }
}

/// Serializes objects and envelopes into one wire format.
pub trait Marshaller: Send + Sync {
    /// Marshal a single resource.
    fn marshal(&self, resource: &ResourceDescriptor, object: &ScimObject) -> ScimResult<Vec<u8>>;

    /// Marshal a list-response envelope.
    fn marshal_list(&self, resource: &ResourceDescriptor, list: &ListResponse)
    -> ScimResult<Vec<u8>>;

    /// Marshal an errors envelope.
    fn marshal_errors(&self, errors: &[ErrorDetail]) -> ScimResult<Vec<u8>>;
}

/// Parses wire bytes back into objects and envelopes.
pub trait Unmarshaller: Send + Sync {
    /// Unmarshal a single resource of the given type.
    fn unmarshal(&self, input: &[u8], resource: &ResourceDescriptor) -> ScimResult<ScimObject>;

    /// Unmarshal a response body, which may be a bare resource, a list, or an
    /// errors envelope.
    fn unmarshal_response(
        &self,
        input: &[u8],
        resource: &ResourceDescriptor,
    ) -> ScimResult<ResponseBody>;
}

/// Construct the marshaller for a media type.
pub fn marshaller(media: MediaType, registry: Arc<SchemaRegistry>) -> Box<dyn Marshaller> {
    match media {
        MediaType::Json => Box::new(JsonCodec::new(registry)),
        MediaType::Xml => Box::new(XmlCodec::new(registry)),
    }
}

/// Construct the unmarshaller for a media type.
pub fn unmarshaller(media: MediaType, registry: Arc<SchemaRegistry>) -> Box<dyn Unmarshaller> {
    match media {
        MediaType::Json => Box::new(JsonCodec::new(registry)),
        MediaType::Xml => Box::new(XmlCodec::new(registry)),
    }
}

/// Emit a datetime in ISO-8601 UTC with a `Z` suffix.
pub(crate) fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an ISO-8601 datetime, normalizing to UTC.
pub(crate) fn parse_datetime(attribute: &str, raw: &str) -> Result<DateTime<Utc>, SchemaViolation> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| SchemaViolation::invalid_value(attribute, "dateTime", raw))
}

/// Encode binary content as base64.
pub(crate) fn encode_binary(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Decode base64 binary content.
pub(crate) fn decode_binary(attribute: &str, raw: &str) -> Result<Vec<u8>, SchemaViolation> {
    BASE64
        .decode(raw)
        .map_err(|_| SchemaViolation::invalid_value(attribute, "binary", "malformed base64"))
}

/// The schema URIs of an object in marshal order: primary first, the rest in
/// lexical order. Registered and retained extension URIs both participate.
pub(crate) fn ordered_schemas(object: &ScimObject, primary: &str) -> Vec<String> {
    let mut uris: Vec<String> = object
        .schemas()
        .map(str::to_string)
        .chain(object.retained_extensions().keys().cloned())
        .filter(|uri| uri != primary)
        .collect();
    uris.sort();
    uris.dedup();
    let mut ordered = vec![primary.to_string()];
    ordered.extend(uris);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_negotiation_basics() {
        assert_eq!(
            MediaType::from_content_type("application/json; charset=utf-8"),
            Some(MediaType::Json)
        );
        assert_eq!(MediaType::from_content_type("TEXT/XML"), Some(MediaType::Xml));
        assert_eq!(MediaType::from_content_type("text/plain"), None);
        assert_eq!(MediaType::from_suffix("XML"), Some(MediaType::Xml));
    }

    #[test]
    fn datetime_format_is_utc_with_z() {
        let dt = parse_datetime("meta.created", "2011-08-01T18:29:49-07:00").unwrap();
        assert_eq!(format_datetime(dt), "2011-08-02T01:29:49Z");
    }

    #[test]
    fn binary_round_trip() {
        let bytes = b"\x00\x01binary";
        let encoded = encode_binary(bytes);
        assert_eq!(decode_binary("photo", &encoded).unwrap(), bytes);
        assert!(decode_binary("photo", "!!!").is_err());
    }
}

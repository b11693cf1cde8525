//! JSON codec.
//!
//! SCIM 1.0 JSON puts the primary schema's attributes at the top level of the
//! resource object; attributes of other schemas nest under a key equal to the
//! schema URI. The `schemas` array names every schema with attributes
//! present. Schema blocks whose URI is not registered are preserved verbatim
//! and re-emitted on marshal.

use std::sync::Arc;

use serde_json::{Map, Value, json};

use crate::error::{ScimError, ScimResult, SchemaViolation};
use crate::protocol::{ErrorDetail, ListResponse, ResponseBody};
use crate::resource::{ComplexValue, ScimAttribute, ScimObject, ScimValue};
use crate::schema::{AttributeDescriptor, CORE_SCHEMA_URI, DataType, ResourceDescriptor, SchemaRegistry};

use super::{
    Marshaller, Unmarshaller, decode_binary, encode_binary, format_datetime, ordered_schemas,
    parse_datetime,
};

/// Marshals and unmarshals SCIM resources as `application/json`.
///
/// Stateless apart from the shared registry; each call works on its own
/// buffers, so one codec value can serve concurrent requests.
#[derive(Clone)]
pub struct JsonCodec {
    registry: Arc<SchemaRegistry>,
    strict: bool,
}

impl JsonCodec {
    /// Create a codec over the given registry.
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            registry,
            strict: false,
        }
    }

    /// Reject unknown attributes instead of dropping them.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    fn parse_object(
        &self,
        map: &Map<String, Value>,
        resource: &ResourceDescriptor,
    ) -> ScimResult<ScimObject> {
        let primary = resource.schema();
        let mut object = ScimObject::new();
        for (key, value) in map {
            if key.eq_ignore_ascii_case("schemas") {
                continue;
            }
            if is_schema_uri(key) {
                self.parse_schema_block(&mut object, key, value)?;
                continue;
            }
            match self.resolve(resource, primary, key) {
                Some(descriptor) => {
                    object.set_attribute(self.parse_attribute(&descriptor, value)?);
                }
                None if self.strict => {
                    return Err(SchemaViolation::UnknownAttribute {
                        attribute: key.clone(),
                        schema: primary.to_string(),
                    }
                    .into());
                }
                None => {} // unknown attributes are dropped
            }
        }
        Ok(object)
    }

    fn parse_schema_block(
        &self,
        object: &mut ScimObject,
        uri: &str,
        value: &Value,
    ) -> ScimResult<()> {
        let Some(block) = value.as_object() else {
            return Err(ScimError::invalid_resource(format!(
                "schema block '{uri}' must be a JSON object"
            )));
        };
        match self.registry.schema(uri) {
            Some(schema) => {
                for (key, sub_value) in block {
                    match schema.attribute(key) {
                        Some(descriptor) => {
                            let descriptor = descriptor.clone();
                            object.set_attribute(self.parse_attribute(&descriptor, sub_value)?);
                        }
                        None if self.strict => {
                            return Err(SchemaViolation::UnknownAttribute {
                                attribute: key.clone(),
                                schema: uri.to_string(),
                            }
                            .into());
                        }
                        None => {}
                    }
                }
            }
            // Unregistered schemas survive PUT round-trips verbatim.
            None => object.retain_extension(uri, value.clone()),
        }
        Ok(())
    }

    fn resolve(
        &self,
        resource: &ResourceDescriptor,
        schema: &str,
        name: &str,
    ) -> Option<Arc<AttributeDescriptor>> {
        resource
            .attribute(schema, name)
            .or_else(|| self.registry.attribute(schema, name))
            .cloned()
    }

    fn parse_attribute(
        &self,
        descriptor: &Arc<AttributeDescriptor>,
        value: &Value,
    ) -> ScimResult<ScimAttribute> {
        if descriptor.is_multi_valued() {
            let Some(elements) = value.as_array() else {
                return Err(SchemaViolation::invalid_value(
                    descriptor.name(),
                    "array",
                    json_type(value),
                )
                .into());
            };
            let mut values = Vec::with_capacity(elements.len());
            for element in elements {
                values.push(ScimValue::Complex(self.parse_plural_element(descriptor, element)?));
            }
            return Ok(ScimAttribute::plural(descriptor.clone(), values)?);
        }
        if descriptor.data_type() == DataType::Complex {
            let Some(block) = value.as_object() else {
                return Err(SchemaViolation::invalid_value(
                    descriptor.name(),
                    "object",
                    json_type(value),
                )
                .into());
            };
            let complex = self.parse_complex(descriptor, block)?;
            return Ok(ScimAttribute::singular(descriptor.clone(), ScimValue::Complex(complex))?);
        }
        let parsed = parse_primitive(descriptor, value)?;
        Ok(ScimAttribute::singular(descriptor.clone(), parsed)?)
    }

    fn parse_plural_element(
        &self,
        descriptor: &Arc<AttributeDescriptor>,
        element: &Value,
    ) -> ScimResult<ComplexValue> {
        match element {
            Value::Object(block) => self.parse_complex(descriptor, block),
            // A bare primitive is shorthand for its `value` sub-attribute.
            other => {
                let value_desc = descriptor
                    .sub_attribute("value")
                    .expect("plural descriptors always carry a value sub-attribute")
                    .clone();
                let mut complex = ComplexValue::new();
                complex.set(ScimAttribute::singular(
                    value_desc.clone(),
                    parse_primitive(&value_desc, other)?,
                )?);
                Ok(complex)
            }
        }
    }

    fn parse_complex(
        &self,
        descriptor: &Arc<AttributeDescriptor>,
        block: &Map<String, Value>,
    ) -> ScimResult<ComplexValue> {
        let mut complex = ComplexValue::new();
        for (key, value) in block {
            match descriptor.sub_attribute(key) {
                Some(sub_desc) => {
                    let sub_desc = sub_desc.clone();
                    complex.set(ScimAttribute::singular(
                        sub_desc.clone(),
                        parse_primitive(&sub_desc, value)?,
                    )?);
                }
                None if self.strict => {
                    return Err(SchemaViolation::UnknownSubAttribute {
                        attribute: descriptor.name().to_string(),
                        sub_attribute: key.clone(),
                    }
                    .into());
                }
                None => {}
            }
        }
        Ok(complex)
    }

    fn object_to_map(
        &self,
        resource: &ResourceDescriptor,
        object: &ScimObject,
    ) -> Map<String, Value> {
        let primary = resource.schema();
        let schemas = ordered_schemas(object, primary);
        let mut map = Map::new();
        map.insert("schemas".to_string(), json!(schemas));
        for attribute in ordered_attributes(resource, object, primary) {
            map.insert(attribute.name().to_string(), attribute_to_json(attribute));
        }
        for uri in schemas.iter().skip(1) {
            if let Some(raw) = object.retained_extensions().get(uri) {
                map.insert(uri.clone(), raw.clone());
                continue;
            }
            let attrs = ordered_attributes(resource, object, uri);
            if !attrs.is_empty() {
                let mut block = Map::new();
                for attribute in attrs {
                    block.insert(attribute.name().to_string(), attribute_to_json(attribute));
                }
                map.insert(uri.clone(), Value::Object(block));
            }
        }
        map
    }
}

impl Marshaller for JsonCodec {
    fn marshal(&self, resource: &ResourceDescriptor, object: &ScimObject) -> ScimResult<Vec<u8>> {
        let map = self.object_to_map(resource, object);
        serde_json::to_vec(&Value::Object(map))
            .map_err(|e| ScimError::invalid_resource(format!("JSON serialization failed: {e}")))
    }

    fn marshal_list(
        &self,
        resource: &ResourceDescriptor,
        list: &ListResponse,
    ) -> ScimResult<Vec<u8>> {
        let resources: Vec<Value> = list
            .resources
            .iter()
            .map(|object| Value::Object(self.object_to_map(resource, object)))
            .collect();
        let envelope = json!({
            "schemas": [CORE_SCHEMA_URI],
            "totalResults": list.total_results,
            "itemsPerPage": list.items_per_page,
            "startIndex": list.start_index,
            "Resources": resources,
        });
        serde_json::to_vec(&envelope)
            .map_err(|e| ScimError::invalid_resource(format!("JSON serialization failed: {e}")))
    }

    fn marshal_errors(&self, errors: &[ErrorDetail]) -> ScimResult<Vec<u8>> {
        let entries: Vec<Value> = errors
            .iter()
            .map(|e| {
                let mut entry = Map::new();
                entry.insert("description".into(), json!(e.description));
                entry.insert("code".into(), json!(e.code.to_string()));
                if let Some(uri) = &e.uri {
                    entry.insert("uri".into(), json!(uri));
                }
                Value::Object(entry)
            })
            .collect();
        serde_json::to_vec(&json!({ "Errors": entries }))
            .map_err(|e| ScimError::invalid_resource(format!("JSON serialization failed: {e}")))
    }
}

impl Unmarshaller for JsonCodec {
    fn unmarshal(&self, input: &[u8], resource: &ResourceDescriptor) -> ScimResult<ScimObject> {
        let root: Value = serde_json::from_slice(input)
            .map_err(|e| ScimError::invalid_resource(format!("malformed JSON: {e}")))?;
        let map = root
            .as_object()
            .ok_or_else(|| ScimError::invalid_resource("resource must be a JSON object"))?;
        self.parse_object(map, resource)
    }

    fn unmarshal_response(
        &self,
        input: &[u8],
        resource: &ResourceDescriptor,
    ) -> ScimResult<ResponseBody> {
        let root: Value = serde_json::from_slice(input)
            .map_err(|e| ScimError::invalid_resource(format!("malformed JSON: {e}")))?;
        let map = root
            .as_object()
            .ok_or_else(|| ScimError::invalid_resource("response must be a JSON object"))?;

        if let Some(errors) = map.get("Errors") {
            return Ok(ResponseBody::Errors(parse_errors(errors)?));
        }
        if map.contains_key("Resources") || map.contains_key("totalResults") {
            let resources = match map.get("Resources") {
                Some(Value::Array(items)) => items
                    .iter()
                    .map(|item| {
                        item.as_object()
                            .ok_or_else(|| {
                                ScimError::invalid_resource("Resources entries must be objects")
                            })
                            .and_then(|m| self.parse_object(m, resource))
                    })
                    .collect::<ScimResult<Vec<_>>>()?,
                Some(other) => {
                    return Err(ScimError::invalid_resource(format!(
                        "Resources must be an array, got {}",
                        json_type(other)
                    )));
                }
                None => Vec::new(),
            };
            let total = read_usize(map, "totalResults").unwrap_or(resources.len());
            let start_index = read_usize(map, "startIndex").unwrap_or(1);
            let items_per_page = read_usize(map, "itemsPerPage").unwrap_or(resources.len());
            return Ok(ResponseBody::List(ListResponse {
                total_results: total,
                start_index,
                items_per_page,
                resources,
            }));
        }
        Ok(ResponseBody::Resource(self.parse_object(map, resource)?))
    }
}

fn parse_errors(value: &Value) -> ScimResult<Vec<ErrorDetail>> {
    let Some(entries) = value.as_array() else {
        return Err(ScimError::invalid_resource("Errors must be an array"));
    };
    let mut errors = Vec::with_capacity(entries.len());
    for entry in entries {
        let map = entry
            .as_object()
            .ok_or_else(|| ScimError::invalid_resource("Errors entries must be objects"))?;
        let code = match map.get("code") {
            Some(Value::String(s)) => s.parse().unwrap_or(500),
            Some(Value::Number(n)) => n.as_u64().unwrap_or(500) as u16,
            _ => 500,
        };
        errors.push(ErrorDetail {
            code,
            description: map
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            uri: map.get("uri").and_then(Value::as_str).map(str::to_string),
        });
    }
    Ok(errors)
}

fn read_usize(map: &Map<String, Value>, key: &str) -> Option<usize> {
    map.get(key).and_then(Value::as_u64).map(|n| n as usize)
}

fn parse_primitive(
    descriptor: &Arc<AttributeDescriptor>,
    value: &Value,
) -> Result<ScimValue, SchemaViolation> {
    let name = descriptor.name();
    let mismatch = || SchemaViolation::invalid_value(name, descriptor.data_type().name(), json_type(value));
    match descriptor.data_type() {
        DataType::String => value
            .as_str()
            .map(|s| ScimValue::String(s.to_string()))
            .ok_or_else(mismatch),
        DataType::Boolean => value.as_bool().map(ScimValue::Boolean).ok_or_else(mismatch),
        DataType::Integer => value.as_i64().map(ScimValue::Integer).ok_or_else(mismatch),
        DataType::DateTime => value
            .as_str()
            .ok_or_else(mismatch)
            .and_then(|s| parse_datetime(name, s))
            .map(ScimValue::DateTime),
        DataType::Binary => value
            .as_str()
            .ok_or_else(mismatch)
            .and_then(|s| decode_binary(name, s))
            .map(ScimValue::Binary),
        DataType::Complex => Err(mismatch()),
    }
}

fn attribute_to_json(attribute: &ScimAttribute) -> Value {
    if attribute.descriptor().is_multi_valued() {
        let elements: Vec<Value> = attribute
            .values()
            .iter()
            .filter_map(|v| v.as_complex().ok())
            .map(|complex| complex_to_json(attribute.descriptor(), complex))
            .collect();
        return Value::Array(elements);
    }
    match attribute.value() {
        Some(ScimValue::Complex(complex)) => complex_to_json(attribute.descriptor(), complex),
        Some(primitive) => primitive_to_json(primitive),
        None => Value::Null,
    }
}

fn complex_to_json(descriptor: &AttributeDescriptor, complex: &ComplexValue) -> Value {
    let mut block = Map::new();
    // Descriptor order first for deterministic output.
    for sub_desc in descriptor.sub_attributes() {
        if let Some(sub) = complex.sub_attribute(sub_desc.name())
            && let Some(value) = sub.value()
        {
            block.insert(sub.name().to_string(), primitive_to_json(value));
        }
    }
    for sub in complex.iter() {
        if !block.contains_key(sub.name())
            && let Some(value) = sub.value()
        {
            block.insert(sub.name().to_string(), primitive_to_json(value));
        }
    }
    Value::Object(block)
}

fn primitive_to_json(value: &ScimValue) -> Value {
    match value {
        ScimValue::String(s) => json!(s),
        ScimValue::Boolean(b) => json!(b),
        ScimValue::Integer(i) => json!(i),
        ScimValue::DateTime(dt) => json!(format_datetime(*dt)),
        ScimValue::Binary(bytes) => json!(encode_binary(bytes)),
        ScimValue::Complex(_) => Value::Null, // nested complex is excluded by construction
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() => "integer",
        Value::Number(_) => "decimal",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_schema_uri(key: &str) -> bool {
    key.starts_with("urn:") || key.contains("://")
}

/// Attributes of one schema present on the object, in resource descriptor
/// order; attributes the descriptor does not know keep insertion order at the
/// end.
fn ordered_attributes<'a>(
    resource: &ResourceDescriptor,
    object: &'a ScimObject,
    schema: &str,
) -> Vec<&'a ScimAttribute> {
    let present = object.attributes(schema);
    let mut ordered: Vec<&ScimAttribute> = resource
        .attributes()
        .iter()
        .filter(|d| d.schema() == schema)
        .filter_map(|d| {
            present
                .iter()
                .find(|a| a.name().eq_ignore_ascii_case(d.name()))
        })
        .collect();
    for attribute in present {
        if !ordered
            .iter()
            .any(|a| a.name().eq_ignore_ascii_case(attribute.name()))
        {
            ordered.push(attribute);
        }
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> (JsonCodec, Arc<ResourceDescriptor>) {
        let registry = Arc::new(SchemaRegistry::core());
        let resource = registry.resource("User").unwrap().clone();
        (JsonCodec::new(registry), resource)
    }

    #[test]
    fn unmarshal_minimal_user() {
        let (codec, resource) = codec();
        let body = serde_json::to_vec(&json!({
            "schemas": [CORE_SCHEMA_URI],
            "userName": "jdoe",
            "name": { "formatted": "Jane Doe", "familyName": "Doe" },
            "active": true
        }))
        .unwrap();
        let object = codec.unmarshal(&body, &resource).unwrap();
        assert_eq!(
            object.attribute(CORE_SCHEMA_URI, "userName").unwrap().as_string().unwrap(),
            "jdoe"
        );
        let name = object.attribute(CORE_SCHEMA_URI, "name").unwrap().as_complex().unwrap();
        assert_eq!(name.sub_string("formatted"), Some("Jane Doe"));
        assert!(object.attribute(CORE_SCHEMA_URI, "active").unwrap().as_boolean().unwrap());
    }

    #[test]
    fn unknown_attributes_are_dropped_unless_strict() {
        let (codec, resource) = codec();
        let body = serde_json::to_vec(&json!({
            "userName": "jdoe",
            "favoriteColor": "teal"
        }))
        .unwrap();
        let object = codec.unmarshal(&body, &resource).unwrap();
        assert!(object.attribute(CORE_SCHEMA_URI, "favoriteColor").is_none());

        let strict = codec.clone().strict();
        assert!(strict.unmarshal(&body, &resource).is_err());
    }

    #[test]
    fn plural_with_bare_primitive_becomes_value_sub() {
        let (codec, resource) = codec();
        let body = serde_json::to_vec(&json!({
            "userName": "jdoe",
            "emails": ["jdoe@example.com", {"value": "j@home.example", "type": "home"}]
        }))
        .unwrap();
        let object = codec.unmarshal(&body, &resource).unwrap();
        let emails = object.attribute(CORE_SCHEMA_URI, "emails").unwrap();
        assert_eq!(emails.values().len(), 2);
        let first = emails.values()[0].as_complex().unwrap();
        assert_eq!(first.sub_string("value"), Some("jdoe@example.com"));
    }

    #[test]
    fn two_primaries_fail_unmarshal() {
        let (codec, resource) = codec();
        let body = serde_json::to_vec(&json!({
            "userName": "jdoe",
            "emails": [
                {"value": "a@x", "primary": true},
                {"value": "b@y", "primary": true}
            ]
        }))
        .unwrap();
        let err = codec.unmarshal(&body, &resource).unwrap_err();
        assert!(matches!(
            err,
            ScimError::Schema(SchemaViolation::MultiplePrimary { .. })
        ));
    }

    #[test]
    fn type_mismatch_is_schema_violation() {
        let (codec, resource) = codec();
        let body = serde_json::to_vec(&json!({ "active": "yes" })).unwrap();
        let err = codec.unmarshal(&body, &resource).unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn malformed_json_is_invalid_resource() {
        let (codec, resource) = codec();
        let err = codec.unmarshal(b"{not json", &resource).unwrap_err();
        assert!(matches!(err, ScimError::InvalidResource { .. }));
    }

    #[test]
    fn marshal_puts_primary_schema_first() {
        let (codec, resource) = codec();
        let body = serde_json::to_vec(&json!({
            "userName": "jdoe",
            "urn:example:custom:1.0": { "tier": "gold" }
        }))
        .unwrap();
        let object = codec.unmarshal(&body, &resource).unwrap();
        let out = codec.marshal(&resource, &object).unwrap();
        let round: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(round["schemas"][0], CORE_SCHEMA_URI);
        assert_eq!(round["urn:example:custom:1.0"]["tier"], "gold");
    }

    #[test]
    fn round_trip_preserves_object() {
        let (codec, resource) = codec();
        let body = serde_json::to_vec(&json!({
            "schemas": [CORE_SCHEMA_URI],
            "userName": "jdoe",
            "name": { "givenName": "Jane", "familyName": "Doe" },
            "emails": [
                {"value": "a@x.example", "type": "work", "primary": true},
                {"value": "b@y.example", "type": "home"}
            ],
            "active": false
        }))
        .unwrap();
        let object = codec.unmarshal(&body, &resource).unwrap();
        let out = codec.marshal(&resource, &object).unwrap();
        let round = codec.unmarshal(&out, &resource).unwrap();
        assert_eq!(object, round);
    }

    #[test]
    fn list_envelope_round_trip() {
        let (codec, resource) = codec();
        let body = serde_json::to_vec(&json!({ "userName": "alice" })).unwrap();
        let alice = codec.unmarshal(&body, &resource).unwrap();
        let list = ListResponse::new(7, 3, vec![alice.clone()]);
        let out = codec.marshal_list(&resource, &list).unwrap();
        match codec.unmarshal_response(&out, &resource).unwrap() {
            ResponseBody::List(parsed) => {
                assert_eq!(parsed.total_results, 7);
                assert_eq!(parsed.start_index, 3);
                assert_eq!(parsed.items_per_page, 1);
                assert_eq!(parsed.resources[0], alice);
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn errors_envelope_round_trip() {
        let (codec, resource) = codec();
        let errors = vec![ErrorDetail {
            code: 404,
            description: "resource not found: User with id '42'".into(),
            uri: None,
        }];
        let out = codec.marshal_errors(&errors).unwrap();
        match codec.unmarshal_response(&out, &resource).unwrap() {
            ResponseBody::Errors(parsed) => assert_eq!(parsed, errors),
            other => panic!("expected errors, got {other:?}"),
        }
    }
}

//! XML codec.
//!
//! SCIM 1.0 XML represents a resource as a root element named after the
//! resource type, in the namespace of its primary schema. Attributes of other
//! schemas appear as prefixed elements whose namespace is declared on the
//! root. Parsing is namespace-aware, whitespace-stripped, and non-validating:
//! the input is read into a small DOM first, then mapped onto the typed
//! object graph, mirroring the JSON codec's structure.

use std::sync::Arc;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::{NsReader, Writer};

use crate::error::{ScimError, ScimResult, SchemaViolation};
use crate::protocol::{ErrorDetail, ListResponse, ResponseBody};
use crate::resource::{ComplexValue, ScimAttribute, ScimObject, ScimValue};
use crate::schema::{AttributeDescriptor, CORE_SCHEMA_URI, DataType, ResourceDescriptor, SchemaRegistry};

use super::{
    Marshaller, Unmarshaller, decode_binary, encode_binary, format_datetime, parse_datetime,
};

/// Marshals and unmarshals SCIM resources as `application/xml`.
#[derive(Clone)]
pub struct XmlCodec {
    registry: Arc<SchemaRegistry>,
    strict: bool,
}

impl XmlCodec {
    /// Create a codec over the given registry.
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            registry,
            strict: false,
        }
    }

    /// Reject unknown elements instead of dropping them.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    fn parse_object(
        &self,
        children: &[XmlNode],
        resource: &ResourceDescriptor,
        primary: &str,
    ) -> ScimResult<ScimObject> {
        let mut object = ScimObject::new();
        for child in children {
            let ns = child.ns.as_deref().unwrap_or(primary);
            let descriptor = resource
                .attribute(ns, &child.local)
                .or_else(|| self.registry.attribute(ns, &child.local))
                .cloned();
            match descriptor {
                Some(descriptor) => {
                    object.set_attribute(self.parse_attribute(&descriptor, child)?);
                }
                None if self.strict => {
                    return Err(SchemaViolation::UnknownAttribute {
                        attribute: child.local.clone(),
                        schema: ns.to_string(),
                    }
                    .into());
                }
                None => {} // unknown elements are dropped
            }
        }
        Ok(object)
    }

    fn parse_attribute(
        &self,
        descriptor: &Arc<AttributeDescriptor>,
        node: &XmlNode,
    ) -> ScimResult<ScimAttribute> {
        if descriptor.is_multi_valued() {
            let mut values = Vec::with_capacity(node.children.len());
            for element in &node.children {
                values.push(ScimValue::Complex(self.parse_complex(descriptor, element)?));
            }
            return Ok(ScimAttribute::plural(descriptor.clone(), values)?);
        }
        if descriptor.data_type() == DataType::Complex {
            let complex = self.parse_complex(descriptor, node)?;
            return Ok(ScimAttribute::singular(descriptor.clone(), ScimValue::Complex(complex))?);
        }
        let value = parse_primitive(descriptor, &node.text)?;
        Ok(ScimAttribute::singular(descriptor.clone(), value)?)
    }

    fn parse_complex(
        &self,
        descriptor: &Arc<AttributeDescriptor>,
        node: &XmlNode,
    ) -> ScimResult<ComplexValue> {
        let mut complex = ComplexValue::new();
        for child in &node.children {
            match descriptor.sub_attribute(&child.local) {
                Some(sub_desc) => {
                    let sub_desc = sub_desc.clone();
                    complex.set(ScimAttribute::singular(
                        sub_desc.clone(),
                        parse_primitive(&sub_desc, &child.text)?,
                    )?);
                }
                None if self.strict => {
                    return Err(SchemaViolation::UnknownSubAttribute {
                        attribute: descriptor.name().to_string(),
                        sub_attribute: child.local.clone(),
                    }
                    .into());
                }
                None => {}
            }
        }
        Ok(complex)
    }

    /// Write one resource's attribute elements (everything inside the root).
    fn write_object<W: std::io::Write>(
        &self,
        writer: &mut Writer<W>,
        resource: &ResourceDescriptor,
        object: &ScimObject,
        prefixes: &[(String, String)],
    ) -> ScimResult<()> {
        for attribute in ordered_attributes(resource, object, resource.schema()) {
            write_attribute(writer, attribute, None)?;
        }
        for (uri, prefix) in prefixes {
            for attribute in ordered_attributes(resource, object, uri) {
                write_attribute(writer, attribute, Some(prefix))?;
            }
        }
        Ok(())
    }
}

impl Marshaller for XmlCodec {
    fn marshal(&self, resource: &ResourceDescriptor, object: &ScimObject) -> ScimResult<Vec<u8>> {
        let prefixes = extension_prefixes(object, resource.schema());
        let mut writer = Writer::new(Vec::new());
        write_decl(&mut writer)?;

        let mut root = BytesStart::new(resource.name());
        root.push_attribute(("xmlns", resource.schema()));
        for (uri, prefix) in &prefixes {
            let key = format!("xmlns:{prefix}");
            root.push_attribute((key.as_str(), uri.as_str()));
        }
        write_event(&mut writer, Event::Start(root))?;
        self.write_object(&mut writer, resource, object, &prefixes)?;
        write_event(&mut writer, Event::End(BytesEnd::new(resource.name())))?;
        Ok(writer.into_inner())
    }

    fn marshal_list(
        &self,
        resource: &ResourceDescriptor,
        list: &ListResponse,
    ) -> ScimResult<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        write_decl(&mut writer)?;

        let mut root = BytesStart::new("Response");
        root.push_attribute(("xmlns", CORE_SCHEMA_URI));
        write_event(&mut writer, Event::Start(root))?;
        write_text_element(&mut writer, "totalResults", &list.total_results.to_string())?;
        write_text_element(&mut writer, "itemsPerPage", &list.items_per_page.to_string())?;
        write_text_element(&mut writer, "startIndex", &list.start_index.to_string())?;

        write_event(&mut writer, Event::Start(BytesStart::new("Resources")))?;
        for object in &list.resources {
            let prefixes = extension_prefixes(object, resource.schema());
            let mut entry = BytesStart::new("Resource");
            if resource.schema() != CORE_SCHEMA_URI {
                entry.push_attribute(("xmlns", resource.schema()));
            }
            for (uri, prefix) in &prefixes {
                let key = format!("xmlns:{prefix}");
                entry.push_attribute((key.as_str(), uri.as_str()));
            }
            write_event(&mut writer, Event::Start(entry))?;
            self.write_object(&mut writer, resource, object, &prefixes)?;
            write_event(&mut writer, Event::End(BytesEnd::new("Resource")))?;
        }
        write_event(&mut writer, Event::End(BytesEnd::new("Resources")))?;
        write_event(&mut writer, Event::End(BytesEnd::new("Response")))?;
        Ok(writer.into_inner())
    }

    fn marshal_errors(&self, errors: &[ErrorDetail]) -> ScimResult<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        write_decl(&mut writer)?;

        let mut root = BytesStart::new("Response");
        root.push_attribute(("xmlns", CORE_SCHEMA_URI));
        write_event(&mut writer, Event::Start(root))?;
        write_event(&mut writer, Event::Start(BytesStart::new("Errors")))?;
        for error in errors {
            write_event(&mut writer, Event::Start(BytesStart::new("Error")))?;
            write_text_element(&mut writer, "description", &error.description)?;
            write_text_element(&mut writer, "code", &error.code.to_string())?;
            if let Some(uri) = &error.uri {
                write_text_element(&mut writer, "uri", uri)?;
            }
            write_event(&mut writer, Event::End(BytesEnd::new("Error")))?;
        }
        write_event(&mut writer, Event::End(BytesEnd::new("Errors")))?;
        write_event(&mut writer, Event::End(BytesEnd::new("Response")))?;
        Ok(writer.into_inner())
    }
}

impl Unmarshaller for XmlCodec {
    fn unmarshal(&self, input: &[u8], resource: &ResourceDescriptor) -> ScimResult<ScimObject> {
        let root = parse_dom(input)?;
        if root.local != resource.name() {
            return Err(ScimError::invalid_resource(format!(
                "expected root element '{}', got '{}'",
                resource.name(),
                root.local
            )));
        }
        // The root namespace selects the primary schema.
        let primary = root.ns.as_deref().unwrap_or(resource.schema());
        if primary != resource.schema() {
            return Err(ScimError::invalid_resource(format!(
                "root namespace '{primary}' does not match schema '{}'",
                resource.schema()
            )));
        }
        self.parse_object(&root.children, resource, primary)
    }

    fn unmarshal_response(
        &self,
        input: &[u8],
        resource: &ResourceDescriptor,
    ) -> ScimResult<ResponseBody> {
        let root = parse_dom(input)?;
        if root.local == resource.name() {
            let primary = root.ns.as_deref().unwrap_or(resource.schema());
            return Ok(ResponseBody::Resource(self.parse_object(
                &root.children,
                resource,
                primary,
            )?));
        }
        if root.local != "Response" {
            return Err(ScimError::invalid_resource(format!(
                "unexpected root element '{}'",
                root.local
            )));
        }
        if let Some(errors) = root.child("Errors") {
            let parsed = errors
                .children
                .iter()
                .map(|entry| ErrorDetail {
                    code: entry
                        .child("code")
                        .and_then(|c| c.text.parse().ok())
                        .unwrap_or(500),
                    description: entry
                        .child("description")
                        .map(|c| c.text.clone())
                        .unwrap_or_default(),
                    uri: entry.child("uri").map(|c| c.text.clone()),
                })
                .collect();
            return Ok(ResponseBody::Errors(parsed));
        }
        let resources = match root.child("Resources") {
            Some(container) => container
                .children
                .iter()
                .map(|entry| {
                    let primary = entry.ns.as_deref().unwrap_or(resource.schema());
                    self.parse_object(&entry.children, resource, primary)
                })
                .collect::<ScimResult<Vec<_>>>()?,
            None => Vec::new(),
        };
        let read_count = |name: &str| root.child(name).and_then(|c| c.text.parse::<usize>().ok());
        Ok(ResponseBody::List(ListResponse {
            total_results: read_count("totalResults").unwrap_or(resources.len()),
            start_index: read_count("startIndex").unwrap_or(1),
            items_per_page: read_count("itemsPerPage").unwrap_or(resources.len()),
            resources,
        }))
    }
}

/// A minimal namespace-aware DOM node.
#[derive(Debug, Default)]
struct XmlNode {
    ns: Option<String>,
    local: String,
    text: String,
    children: Vec<XmlNode>,
}

impl XmlNode {
    fn child(&self, local: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.local == local)
    }
}

fn parse_dom(input: &[u8]) -> ScimResult<XmlNode> {
    let mut reader = NsReader::from_reader(input);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;
    loop {
        buf.clear();
        let (resolve, event) = reader
            .read_resolved_event_into(&mut buf)
            .map_err(|e| ScimError::invalid_resource(format!("malformed XML: {e}")))?;
        match event {
            Event::Start(e) => stack.push(node_from(&resolve, &e)),
            Event::Empty(e) => {
                let node = node_from(&resolve, &e);
                attach(&mut stack, &mut root, node)?;
            }
            Event::Text(e) => {
                let text = e
                    .unescape()
                    .map_err(|e| ScimError::invalid_resource(format!("malformed XML text: {e}")))?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text);
                }
            }
            Event::CData(e) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| ScimError::invalid_resource("unbalanced XML end tag"))?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::Eof => break,
            _ => {} // declarations, comments, processing instructions
        }
    }
    if !stack.is_empty() {
        return Err(ScimError::invalid_resource("unterminated XML element"));
    }
    root.ok_or_else(|| ScimError::invalid_resource("empty XML document"))
}

fn node_from(resolve: &ResolveResult<'_>, start: &BytesStart<'_>) -> XmlNode {
    let ns = match resolve {
        ResolveResult::Bound(Namespace(bytes)) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
        _ => None,
    };
    XmlNode {
        ns,
        local: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
        text: String::new(),
        children: Vec::new(),
    }
}

fn attach(
    stack: &mut [XmlNode],
    root: &mut Option<XmlNode>,
    node: XmlNode,
) -> ScimResult<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(node);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(node);
            Ok(())
        }
        None => Err(ScimError::invalid_resource(
            "multiple root elements in XML document",
        )),
    }
}

fn parse_primitive(
    descriptor: &Arc<AttributeDescriptor>,
    text: &str,
) -> Result<ScimValue, SchemaViolation> {
    let name = descriptor.name();
    match descriptor.data_type() {
        DataType::String => Ok(ScimValue::String(text.to_string())),
        DataType::Boolean => match text {
            "true" | "1" => Ok(ScimValue::Boolean(true)),
            "false" | "0" => Ok(ScimValue::Boolean(false)),
            other => Err(SchemaViolation::invalid_value(name, "boolean", other)),
        },
        DataType::Integer => text
            .parse()
            .map(ScimValue::Integer)
            .map_err(|_| SchemaViolation::invalid_value(name, "integer", text)),
        DataType::DateTime => parse_datetime(name, text).map(ScimValue::DateTime),
        DataType::Binary => decode_binary(name, text).map(ScimValue::Binary),
        DataType::Complex => Err(SchemaViolation::invalid_value(name, "complex", "text")),
    }
}

fn write_decl<W: std::io::Write>(writer: &mut Writer<W>) -> ScimResult<()> {
    write_event(writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
}

fn write_event<W: std::io::Write>(writer: &mut Writer<W>, event: Event<'_>) -> ScimResult<()> {
    writer
        .write_event(event)
        .map_err(|e| ScimError::invalid_resource(format!("XML write failed: {e}")))
}

fn write_text_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> ScimResult<()> {
    write_event(writer, Event::Start(BytesStart::new(name)))?;
    write_event(writer, Event::Text(BytesText::new(text)))?;
    write_event(writer, Event::End(BytesEnd::new(name)))
}

fn write_attribute<W: std::io::Write>(
    writer: &mut Writer<W>,
    attribute: &ScimAttribute,
    prefix: Option<&str>,
) -> ScimResult<()> {
    let descriptor = attribute.descriptor();
    let name = qualified(prefix, descriptor.name());
    if descriptor.is_multi_valued() {
        let element_name = qualified(prefix, &singularize(descriptor.name()));
        write_event(writer, Event::Start(BytesStart::new(name.as_str())))?;
        for value in attribute.values() {
            if let Ok(complex) = value.as_complex() {
                write_event(writer, Event::Start(BytesStart::new(element_name.as_str())))?;
                write_complex(writer, descriptor, complex, prefix)?;
                write_event(writer, Event::End(BytesEnd::new(element_name.as_str())))?;
            }
        }
        write_event(writer, Event::End(BytesEnd::new(name.as_str())))?;
        return Ok(());
    }
    match attribute.value() {
        Some(ScimValue::Complex(complex)) => {
            write_event(writer, Event::Start(BytesStart::new(name.as_str())))?;
            write_complex(writer, descriptor, complex, prefix)?;
            write_event(writer, Event::End(BytesEnd::new(name.as_str())))?;
        }
        Some(primitive) => {
            write_text_element(writer, &name, &primitive_text(primitive))?;
        }
        None => {}
    }
    Ok(())
}

fn write_complex<W: std::io::Write>(
    writer: &mut Writer<W>,
    descriptor: &AttributeDescriptor,
    complex: &ComplexValue,
    prefix: Option<&str>,
) -> ScimResult<()> {
    // Descriptor order first for deterministic output.
    for sub_desc in descriptor.sub_attributes() {
        if let Some(sub) = complex.sub_attribute(sub_desc.name())
            && let Some(value) = sub.value()
        {
            write_text_element(writer, &qualified(prefix, sub.name()), &primitive_text(value))?;
        }
    }
    Ok(())
}

fn primitive_text(value: &ScimValue) -> String {
    match value {
        ScimValue::String(s) => s.clone(),
        ScimValue::Boolean(b) => b.to_string(),
        ScimValue::Integer(i) => i.to_string(),
        ScimValue::DateTime(dt) => format_datetime(*dt),
        ScimValue::Binary(bytes) => encode_binary(bytes),
        ScimValue::Complex(_) => String::new(), // nested complex is excluded by construction
    }
}

fn qualified(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}:{name}"),
        None => name.to_string(),
    }
}

/// Element name for one value of a plural attribute: `emails` → `email`,
/// `addresses` → `address`. The reader accepts any child name, so this only
/// affects emitted documents.
fn singularize(name: &str) -> String {
    if let Some(stem) = name.strip_suffix("ses") {
        format!("{stem}s")
    } else if let Some(stem) = name.strip_suffix('s') {
        stem.to_string()
    } else {
        name.to_string()
    }
}

/// Extension schema URIs of the object (beyond the primary), in lexical
/// order, each assigned a generated prefix. Retained raw JSON extensions have
/// no XML form and are skipped.
fn extension_prefixes(object: &ScimObject, primary: &str) -> Vec<(String, String)> {
    let mut uris: Vec<String> = object
        .schemas()
        .filter(|uri| *uri != primary)
        .map(str::to_string)
        .collect();
    uris.sort();
    uris.into_iter()
        .enumerate()
        .map(|(i, uri)| (uri, format!("ns{}", i + 1)))
        .collect()
}

/// Attributes of one schema present on the object, in resource descriptor
/// order; attributes the descriptor does not know keep insertion order.
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

    fn codec() -> (XmlCodec, Arc<ResourceDescriptor>) {
        let registry = Arc::new(SchemaRegistry::core());
        let resource = registry.resource("User").unwrap().clone();
        (XmlCodec::new(registry), resource)
    }

    const USER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<User xmlns="urn:scim:schemas:core:1.0">
  <userName>jdoe</userName>
  <name>
    <formatted>Jane Doe</formatted>
    <familyName>Doe</familyName>
  </name>
  <active>true</active>
  <emails>
    <email>
      <value>jdoe@example.com</value>
      <type>work</type>
      <primary>true</primary>
    </email>
    <email>
      <value>jane@home.example</value>
      <type>home</type>
    </email>
  </emails>
</User>"#;

    #[test]
    fn unmarshal_user_document() {
        let (codec, resource) = codec();
        let object = codec.unmarshal(USER_XML.as_bytes(), &resource).unwrap();
        assert_eq!(
            object.attribute(CORE_SCHEMA_URI, "userName").unwrap().as_string().unwrap(),
            "jdoe"
        );
        let emails = object.attribute(CORE_SCHEMA_URI, "emails").unwrap();
        assert_eq!(emails.values().len(), 2);
        let first = emails.values()[0].as_complex().unwrap();
        assert_eq!(first.sub_string("type"), Some("work"));
        assert_eq!(first.sub_boolean("primary"), Some(true));
    }

    #[test]
    fn root_element_must_match_resource_name() {
        let (codec, resource) = codec();
        let doc = r#"<Group xmlns="urn:scim:schemas:core:1.0"><displayName>x</displayName></Group>"#;
        assert!(codec.unmarshal(doc.as_bytes(), &resource).is_err());
    }

    #[test]
    fn wrong_root_namespace_is_rejected() {
        let (codec, resource) = codec();
        let doc = r#"<User xmlns="urn:wrong:1.0"><userName>x</userName></User>"#;
        assert!(codec.unmarshal(doc.as_bytes(), &resource).is_err());
    }

    #[test]
    fn unknown_elements_are_dropped() {
        let (codec, resource) = codec();
        let doc = r#"<User xmlns="urn:scim:schemas:core:1.0">
            <userName>jdoe</userName>
            <shoeSize>44</shoeSize>
        </User>"#;
        let object = codec.unmarshal(doc.as_bytes(), &resource).unwrap();
        assert_eq!(object.attributes(CORE_SCHEMA_URI).len(), 1);
    }

    #[test]
    fn malformed_xml_is_invalid_resource() {
        let (codec, resource) = codec();
        assert!(codec.unmarshal(b"<User><userName>", &resource).is_err());
        assert!(codec.unmarshal(b"", &resource).is_err());
    }

    #[test]
    fn numeric_booleans_accepted() {
        let (codec, resource) = codec();
        let doc = r#"<User xmlns="urn:scim:schemas:core:1.0">
            <userName>jdoe</userName>
            <active>1</active>
        </User>"#;
        let object = codec.unmarshal(doc.as_bytes(), &resource).unwrap();
        assert!(object.attribute(CORE_SCHEMA_URI, "active").unwrap().as_boolean().unwrap());
    }

    #[test]
    fn marshal_escapes_text_content() {
        let (codec, resource) = codec();
        let mut object = ScimObject::new();
        let desc = resource.core_attribute("displayName").unwrap().clone();
        object.set_attribute(
            ScimAttribute::singular(desc, ScimValue::from("Jane <Doe> & Co")).unwrap(),
        );
        let out = codec.marshal(&resource, &object).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Jane &lt;Doe&gt; &amp; Co"));
    }

    #[test]
    fn round_trip_preserves_object() {
        let (codec, resource) = codec();
        let object = codec.unmarshal(USER_XML.as_bytes(), &resource).unwrap();
        let out = codec.marshal(&resource, &object).unwrap();
        let round = codec.unmarshal(&out, &resource).unwrap();
        assert_eq!(object, round);
    }

    #[test]
    fn list_envelope_round_trip() {
        let (codec, resource) = codec();
        let object = codec.unmarshal(USER_XML.as_bytes(), &resource).unwrap();
        let list = ListResponse::new(12, 5, vec![object.clone()]);
        let out = codec.marshal_list(&resource, &list).unwrap();
        match codec.unmarshal_response(&out, &resource).unwrap() {
            ResponseBody::List(parsed) => {
                assert_eq!(parsed.total_results, 12);
                assert_eq!(parsed.start_index, 5);
                assert_eq!(parsed.resources[0], object);
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn errors_envelope_round_trip() {
        let (codec, resource) = codec();
        let errors = vec![ErrorDetail {
            code: 409,
            description: "userName already exists".into(),
            uri: None,
        }];
        let out = codec.marshal_errors(&errors).unwrap();
        match codec.unmarshal_response(&out, &resource).unwrap() {
            ResponseBody::Errors(parsed) => assert_eq!(parsed, errors),
            other => panic!("expected errors, got {other:?}"),
        }
    }

    #[test]
    fn singularize_handles_core_plural_names() {
        assert_eq!(singularize("emails"), "email");
        assert_eq!(singularize("addresses"), "address");
        assert_eq!(singularize("phoneNumbers"), "phoneNumber");
        assert_eq!(singularize("members"), "member");
    }
}

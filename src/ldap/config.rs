//! Declarative resource mapping configuration.
//!
//! One XML definition per resource describes how SCIM attributes map onto
//! LDAP attributes: the DN template, the object classes added on create, the
//! filter selecting candidate entries, and one mapping element per attribute.
//!
//! ```xml
//! <resources>
//!   <resource name="User" schema="urn:scim:schemas:core:1.0" endpoint="Users">
//!     <dnTemplate>entryUUID={id},ou=people,dc=example,dc=com</dnTemplate>
//!     <objectClass>inetOrgPerson</objectClass>
//!     <searchFilter>(objectClass=inetOrgPerson)</searchFilter>
//!     <attribute scim="userName" ldap="uid" required="true"/>
//!     <complex scim="name">
//!       <sub scim="familyName" ldap="sn"/>
//!       <sub scim="givenName" ldap="givenName"/>
//!     </complex>
//!     <plural scim="emails">
//!       <type value="work" ldap="mail" primary="primaryMail"/>
//!       <type value="home" ldap="homeEmail"/>
//!     </plural>
//!     <derived scim="name.formatted" ldap="cn"/>
//!   </resource>
//! </resources>
//! ```
//!
//! The same file doubles as the user-supplied schema source: a parsed
//! [`ResourceMapping`] produces the [`ResourceDescriptor`] registered with
//! the schema registry.

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{ScimError, ScimResult, SchemaViolation};
use crate::resource::ScimValue;
use crate::schema::{AttributeDescriptor, DataType, ResourceDescriptor};

/// Value transform between a SCIM value and an LDAP attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueTransform {
    /// Identity string transform
    #[default]
    String,
    /// SCIM boolean ↔ LDAP `TRUE`/`FALSE`
    Boolean,
    /// SCIM datetime ↔ LDAP generalized time (`YYYYMMDDHHMMSSZ`)
    GeneralizedTime,
    /// SCIM integer ↔ decimal string
    Integer,
    /// SCIM binary ↔ raw octets
    Binary,
}

impl ValueTransform {
    /// Parse a transform from its config name.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "string" => Some(Self::String),
            "boolean" => Some(Self::Boolean),
            "datetime" | "generalizedtime" => Some(Self::GeneralizedTime),
            "integer" => Some(Self::Integer),
            "binary" => Some(Self::Binary),
            _ => None,
        }
    }

    /// The SCIM data type this transform produces.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::String => DataType::String,
            Self::Boolean => DataType::Boolean,
            Self::GeneralizedTime => DataType::DateTime,
            Self::Integer => DataType::Integer,
            Self::Binary => DataType::Binary,
        }
    }

    /// Encode a SCIM value as LDAP attribute octets.
    pub fn to_ldap(&self, attribute: &str, value: &ScimValue) -> Result<Vec<u8>, SchemaViolation> {
        let mismatch =
            || SchemaViolation::invalid_value(attribute, self.data_type().name(), value.data_type().name());
        match self {
            Self::String => Ok(value.as_string().map_err(|_| mismatch())?.as_bytes().to_vec()),
            Self::Boolean => Ok(if value.as_boolean().map_err(|_| mismatch())? {
                b"TRUE".to_vec()
            } else {
                b"FALSE".to_vec()
            }),
            Self::GeneralizedTime => {
                let dt = value.as_datetime().map_err(|_| mismatch())?;
                Ok(dt.format("%Y%m%d%H%M%SZ").to_string().into_bytes())
            }
            Self::Integer => Ok(value
                .as_integer()
                .map_err(|_| mismatch())?
                .to_string()
                .into_bytes()),
            Self::Binary => Ok(value.as_binary().map_err(|_| mismatch())?.to_vec()),
        }
    }

    /// Encode a SCIM value as the string form used inside LDAP search filters.
    pub fn to_filter_literal(&self, raw: &str) -> String {
        match self {
            Self::Boolean => match raw {
                "true" => "TRUE".to_string(),
                "false" => "FALSE".to_string(),
                other => other.to_string(),
            },
            Self::GeneralizedTime => match DateTime::parse_from_rfc3339(raw) {
                Ok(dt) => dt.with_timezone(&Utc).format("%Y%m%d%H%M%SZ").to_string(),
                Err(_) => raw.to_string(),
            },
            _ => raw.to_string(),
        }
    }

    /// Decode an LDAP text value into a SCIM value.
    pub fn from_ldap(&self, attribute: &str, raw: &str) -> Result<ScimValue, SchemaViolation> {
        match self {
            Self::String => Ok(ScimValue::String(raw.to_string())),
            Self::Boolean => match raw.to_ascii_uppercase().as_str() {
                "TRUE" => Ok(ScimValue::Boolean(true)),
                "FALSE" => Ok(ScimValue::Boolean(false)),
                other => Err(SchemaViolation::invalid_value(attribute, "boolean", other)),
            },
            Self::GeneralizedTime => parse_generalized_time(raw)
                .map(ScimValue::DateTime)
                .ok_or_else(|| SchemaViolation::invalid_value(attribute, "dateTime", raw)),
            Self::Integer => raw
                .parse()
                .map(ScimValue::Integer)
                .map_err(|_| SchemaViolation::invalid_value(attribute, "integer", raw)),
            Self::Binary => Ok(ScimValue::Binary(raw.as_bytes().to_vec())),
        }
    }

    /// Decode raw LDAP octets (for attributes the server returns as binary).
    pub fn from_ldap_bytes(
        &self,
        attribute: &str,
        raw: &[u8],
    ) -> Result<ScimValue, SchemaViolation> {
        match self {
            Self::Binary => Ok(ScimValue::Binary(raw.to_vec())),
            _ => self.from_ldap(attribute, &String::from_utf8_lossy(raw)),
        }
    }
}

/// Parse an LDAP generalized time value (`YYYYMMDDHHMMSS[.fff](Z|±hhmm)`).
///
/// Fractional seconds and numeric offsets are accepted but collapsed to UTC
/// seconds precision.
pub fn parse_generalized_time(raw: &str) -> Option<DateTime<Utc>> {
    let digits: String = raw.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() < 14 {
        return None;
    }
    NaiveDateTime::parse_from_str(&digits[..14], "%Y%m%d%H%M%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Mapping of one SCIM attribute onto LDAP.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeMapping {
    /// One SCIM attribute ↔ one LDAP attribute
    Simple(SimpleMapping),
    /// Each sub-attribute maps to a distinct LDAP attribute
    Complex(ComplexMapping),
    /// One LDAP attribute per canonical `type`
    Plural(PluralMapping),
    /// Read-only value computed from another LDAP attribute
    Derived(DerivedMapping),
}

impl AttributeMapping {
    /// The SCIM attribute name this mapping covers (for derived sub-paths,
    /// the top-level name).
    pub fn scim_name(&self) -> &str {
        match self {
            Self::Simple(m) => &m.scim,
            Self::Complex(m) => &m.scim,
            Self::Plural(m) => &m.scim,
            Self::Derived(m) => &m.scim,
        }
    }
}

/// Simple attribute mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleMapping {
    /// SCIM attribute name
    pub scim: String,
    /// LDAP attribute name
    pub ldap: String,
    /// Value transform
    pub transform: ValueTransform,
    /// Whether the SCIM attribute is required on create
    pub required: bool,
    /// Whether string comparison is case-sensitive
    pub case_exact: bool,
}

/// Complex attribute mapping: one LDAP attribute per sub-attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexMapping {
    /// SCIM attribute name
    pub scim: String,
    /// Sub-attribute mappings
    pub subs: Vec<SubMapping>,
}

/// One sub-attribute of a complex mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct SubMapping {
    /// SCIM sub-attribute name
    pub scim: String,
    /// LDAP attribute name
    pub ldap: String,
    /// Value transform
    pub transform: ValueTransform,
}

/// Plural attribute mapping: one LDAP attribute per canonical type.
#[derive(Debug, Clone, PartialEq)]
pub struct PluralMapping {
    /// SCIM attribute name
    pub scim: String,
    /// Transform applied to every element's `value`
    pub transform: ValueTransform,
    /// Per-type LDAP attributes
    pub types: Vec<PluralTypeMapping>,
}

/// One canonical type of a plural mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct PluralTypeMapping {
    /// The canonical `type` token (e.g. "work")
    pub type_value: String,
    /// The LDAP attribute holding values of this type
    pub ldap: String,
    /// Optional LDAP attribute marking the primary value
    pub primary_marker: Option<String>,
}

/// Derived (read-only) mapping, possibly into a sub-attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedMapping {
    /// Top-level SCIM attribute name
    pub scim: String,
    /// Sub-attribute name when the target is inside a complex attribute
    pub sub: Option<String>,
    /// Source LDAP attribute
    pub ldap: String,
}

/// The full mapping definition for one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceMapping {
    /// SCIM resource name (e.g. "User")
    pub name: String,
    /// Primary schema URI
    pub schema: String,
    /// Endpoint segment (e.g. "Users")
    pub endpoint: String,
    /// DN pattern with an `{id}` slot and optional attribute slots
    pub dn_template: String,
    /// Object classes added on create
    pub object_classes: Vec<String>,
    /// LDAP filter selecting candidate entries
    pub search_filter: Option<String>,
    /// Attribute mappings
    pub attributes: Vec<AttributeMapping>,
}

impl ResourceMapping {
    /// Build the resource descriptor this mapping implies, for registration
    /// with the schema registry. The common `id`/`externalId`/`meta`
    /// attributes are always present.
    pub fn to_descriptor(&self) -> ResourceDescriptor {
        let schema = &self.schema;
        let mut attributes = vec![
            AttributeDescriptor::simple(schema.clone(), "id", DataType::String)
                .read_only()
                .case_exact(),
            AttributeDescriptor::simple(schema.clone(), "externalId", DataType::String)
                .case_exact(),
            AttributeDescriptor::complex(
                schema.clone(),
                "meta",
                vec![
                    AttributeDescriptor::simple(schema.clone(), "created", DataType::DateTime),
                    AttributeDescriptor::simple(schema.clone(), "lastModified", DataType::DateTime),
                    AttributeDescriptor::simple(schema.clone(), "location", DataType::String)
                        .case_exact(),
                    AttributeDescriptor::simple(schema.clone(), "version", DataType::String)
                        .case_exact(),
                ],
            )
            .read_only(),
        ];
        for mapping in &self.attributes {
            match mapping {
                AttributeMapping::Simple(m) => {
                    let mut desc = AttributeDescriptor::simple(
                        schema.clone(),
                        m.scim.clone(),
                        m.transform.data_type(),
                    );
                    if m.required {
                        desc = desc.required();
                    }
                    if m.case_exact {
                        desc = desc.case_exact();
                    }
                    attributes.push(desc);
                }
                AttributeMapping::Complex(m) => {
                    let mut subs: Vec<AttributeDescriptor> = m
                        .subs
                        .iter()
                        .map(|sub| {
                            AttributeDescriptor::simple(
                                schema.clone(),
                                sub.scim.clone(),
                                sub.transform.data_type(),
                            )
                        })
                        .collect();
                    // Derived sub-paths contribute read-only sub-attributes.
                    for derived in self.derived_subs(&m.scim) {
                        if !subs.iter().any(|s| s.name().eq_ignore_ascii_case(&derived)) {
                            subs.push(
                                AttributeDescriptor::simple(schema.clone(), derived, DataType::String)
                                    .read_only(),
                            );
                        }
                    }
                    attributes.push(AttributeDescriptor::complex(
                        schema.clone(),
                        m.scim.clone(),
                        subs,
                    ));
                }
                AttributeMapping::Plural(m) => {
                    let types: Vec<&str> = m.types.iter().map(|t| t.type_value.as_str()).collect();
                    attributes.push(AttributeDescriptor::plural(
                        schema.clone(),
                        m.scim.clone(),
                        m.transform.data_type(),
                        &types,
                    ));
                }
                AttributeMapping::Derived(m) => {
                    if m.sub.is_none()
                        && !attributes.iter().any(|a| a.name().eq_ignore_ascii_case(&m.scim))
                    {
                        attributes.push(
                            AttributeDescriptor::simple(schema.clone(), m.scim.clone(), DataType::String)
                                .read_only(),
                        );
                    }
                }
            }
        }
        ResourceDescriptor::new(
            schema.clone(),
            self.name.clone(),
            self.endpoint.clone(),
            attributes,
        )
    }

    fn derived_subs(&self, parent: &str) -> Vec<String> {
        self.attributes
            .iter()
            .filter_map(|m| match m {
                AttributeMapping::Derived(d)
                    if d.scim.eq_ignore_ascii_case(parent) && d.sub.is_some() =>
                {
                    d.sub.clone()
                }
                _ => None,
            })
            .collect()
    }

    /// The RDN attribute of the DN template (`uid` in `uid={id},ou=people`).
    pub fn rdn_attribute(&self) -> ScimResult<&str> {
        self.dn_template
            .split_once('=')
            .map(|(attr, _)| attr.trim())
            .filter(|attr| !attr.is_empty())
            .ok_or_else(|| config_error(format!("invalid dnTemplate '{}'", self.dn_template)))
    }

    /// The search base implied by the DN template (everything after the RDN).
    pub fn base_dn(&self) -> ScimResult<&str> {
        self.dn_template
            .split_once(',')
            .map(|(_, base)| base.trim())
            .filter(|base| !base.is_empty())
            .ok_or_else(|| config_error(format!("dnTemplate '{}' has no base DN", self.dn_template)))
    }

    fn validate(&self) -> ScimResult<()> {
        if !self.dn_template.contains("{id}") {
            return Err(config_error(format!(
                "dnTemplate '{}' is missing the {{id}} slot",
                self.dn_template
            )));
        }
        self.rdn_attribute()?;
        self.base_dn()?;
        Ok(())
    }
}

fn config_error(message: impl Into<String>) -> ScimError {
    ScimError::InvalidResource {
        message: message.into(),
    }
}

/// Parse mapping definitions from XML.
pub fn parse_resources(xml: &[u8]) -> ScimResult<Vec<ResourceMapping>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut mappings = Vec::new();
    let mut current: Option<ResourceMapping> = None;
    let mut complex: Option<ComplexMapping> = None;
    let mut plural: Option<PluralMapping> = None;
    let mut text = String::new();
    let mut text_element: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| config_error(format!("malformed mapping XML: {e}")))?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let empty = matches!(event, Event::Empty(_));
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                match name.as_str() {
                    "resources" => {}
                    "resource" => {
                        current = Some(ResourceMapping {
                            name: require_attr(e, "name")?,
                            schema: require_attr(e, "schema")?,
                            endpoint: require_attr(e, "endpoint")?,
                            dn_template: String::new(),
                            object_classes: Vec::new(),
                            search_filter: None,
                            attributes: Vec::new(),
                        });
                    }
                    "dnTemplate" | "objectClass" | "searchFilter" => {
                        text.clear();
                        text_element = Some(name);
                    }
                    "attribute" => {
                        let mapping = AttributeMapping::Simple(SimpleMapping {
                            scim: require_attr(e, "scim")?,
                            ldap: require_attr(e, "ldap")?,
                            transform: read_transform(e)?,
                            required: flag_attr(e, "required")?,
                            case_exact: flag_attr(e, "caseExact")?,
                        });
                        current_mut(&mut current)?.attributes.push(mapping);
                    }
                    "complex" => {
                        let mapping = ComplexMapping {
                            scim: require_attr(e, "scim")?,
                            subs: Vec::new(),
                        };
                        if empty {
                            current_mut(&mut current)?
                                .attributes
                                .push(AttributeMapping::Complex(mapping));
                        } else {
                            complex = Some(mapping);
                        }
                    }
                    "sub" => {
                        let sub = SubMapping {
                            scim: require_attr(e, "scim")?,
                            ldap: require_attr(e, "ldap")?,
                            transform: read_transform(e)?,
                        };
                        complex
                            .as_mut()
                            .ok_or_else(|| config_error("<sub> outside <complex>"))?
                            .subs
                            .push(sub);
                    }
                    "plural" => {
                        let mapping = PluralMapping {
                            scim: require_attr(e, "scim")?,
                            transform: read_transform(e)?,
                            types: Vec::new(),
                        };
                        if empty {
                            current_mut(&mut current)?
                                .attributes
                                .push(AttributeMapping::Plural(mapping));
                        } else {
                            plural = Some(mapping);
                        }
                    }
                    "type" => {
                        let type_mapping = PluralTypeMapping {
                            type_value: require_attr(e, "value")?,
                            ldap: require_attr(e, "ldap")?,
                            primary_marker: optional_attr(e, "primary")?,
                        };
                        plural
                            .as_mut()
                            .ok_or_else(|| config_error("<type> outside <plural>"))?
                            .types
                            .push(type_mapping);
                    }
                    "derived" => {
                        let path = require_attr(e, "scim")?;
                        let (scim, sub) = match path.split_once('.') {
                            Some((name, sub)) => (name.to_string(), Some(sub.to_string())),
                            None => (path, None),
                        };
                        current_mut(&mut current)?.attributes.push(
                            AttributeMapping::Derived(DerivedMapping {
                                scim,
                                sub,
                                ldap: require_attr(e, "ldap")?,
                            }),
                        );
                    }
                    other => {
                        return Err(config_error(format!(
                            "unknown mapping element <{other}>"
                        )));
                    }
                }
            }
            Event::Text(e) => {
                if text_element.is_some() {
                    text.push_str(
                        &e.unescape()
                            .map_err(|e| config_error(format!("malformed mapping XML: {e}")))?,
                    );
                }
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                match name.as_str() {
                    "dnTemplate" => {
                        current_mut(&mut current)?.dn_template = text.trim().to_string();
                        text_element = None;
                    }
                    "objectClass" => {
                        current_mut(&mut current)?
                            .object_classes
                            .push(text.trim().to_string());
                        text_element = None;
                    }
                    "searchFilter" => {
                        current_mut(&mut current)?.search_filter = Some(text.trim().to_string());
                        text_element = None;
                    }
                    "complex" => {
                        if let Some(mapping) = complex.take() {
                            current_mut(&mut current)?
                                .attributes
                                .push(AttributeMapping::Complex(mapping));
                        }
                    }
                    "plural" => {
                        if let Some(mapping) = plural.take() {
                            current_mut(&mut current)?
                                .attributes
                                .push(AttributeMapping::Plural(mapping));
                        }
                    }
                    "resource" => {
                        let mapping = current
                            .take()
                            .ok_or_else(|| config_error("unbalanced </resource>"))?;
                        mapping.validate()?;
                        mappings.push(mapping);
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    if mappings.is_empty() {
        return Err(config_error("mapping file declares no resources"));
    }
    Ok(mappings)
}

/// Load mapping definitions from a file.
pub fn load_resources<P: AsRef<Path>>(path: P) -> ScimResult<Vec<ResourceMapping>> {
    let content = std::fs::read(&path).map_err(|e| {
        config_error(format!(
            "cannot read mapping file {}: {e}",
            path.as_ref().display()
        ))
    })?;
    parse_resources(&content)
}

fn current_mut<'a>(
    current: &'a mut Option<ResourceMapping>,
) -> ScimResult<&'a mut ResourceMapping> {
    current
        .as_mut()
        .ok_or_else(|| config_error("mapping element outside <resource>"))
}

fn require_attr(e: &BytesStart<'_>, name: &str) -> ScimResult<String> {
    optional_attr(e, name)?.ok_or_else(|| {
        config_error(format!(
            "<{}> is missing the '{name}' attribute",
            String::from_utf8_lossy(e.local_name().as_ref())
        ))
    })
}

fn optional_attr(e: &BytesStart<'_>, name: &str) -> ScimResult<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| config_error(format!("malformed attribute: {e}")))?;
        if attr.key.as_ref() == name.as_bytes() {
            let value = attr
                .unescape_value()
                .map_err(|e| config_error(format!("malformed attribute value: {e}")))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn flag_attr(e: &BytesStart<'_>, name: &str) -> ScimResult<bool> {
    Ok(optional_attr(e, name)?.as_deref() == Some("true"))
}

fn read_transform(e: &BytesStart<'_>) -> ScimResult<ValueTransform> {
    match optional_attr(e, "type")? {
        Some(name) => ValueTransform::parse(&name)
            .ok_or_else(|| config_error(format!("unknown transform type '{name}'"))),
        None => Ok(ValueTransform::String),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER_MAPPING: &str = r#"
<resources>
  <resource name="User" schema="urn:scim:schemas:core:1.0" endpoint="Users">
    <dnTemplate>entryUUID={id},ou=people,dc=example,dc=com</dnTemplate>
    <objectClass>top</objectClass>
    <objectClass>inetOrgPerson</objectClass>
    <searchFilter>(objectClass=inetOrgPerson)</searchFilter>
    <attribute scim="userName" ldap="uid" required="true"/>
    <attribute scim="active" ldap="employeeActive" type="boolean"/>
    <complex scim="name">
      <sub scim="familyName" ldap="sn"/>
      <sub scim="givenName" ldap="givenName"/>
    </complex>
    <plural scim="emails">
      <type value="work" ldap="mail" primary="primaryMail"/>
      <type value="home" ldap="homeEmail"/>
    </plural>
    <derived scim="displayName" ldap="cn"/>
    <derived scim="name.formatted" ldap="cn"/>
  </resource>
</resources>
"#;

    #[test]
    fn parses_full_user_mapping() {
        let mappings = parse_resources(USER_MAPPING.as_bytes()).unwrap();
        assert_eq!(mappings.len(), 1);
        let user = &mappings[0];
        assert_eq!(user.name, "User");
        assert_eq!(user.endpoint, "Users");
        assert_eq!(user.object_classes, vec!["top", "inetOrgPerson"]);
        assert_eq!(user.rdn_attribute().unwrap(), "entryUUID");
        assert_eq!(user.base_dn().unwrap(), "ou=people,dc=example,dc=com");
        assert_eq!(user.attributes.len(), 6);

        match &user.attributes[1] {
            AttributeMapping::Simple(m) => {
                assert_eq!(m.ldap, "employeeActive");
                assert_eq!(m.transform, ValueTransform::Boolean);
            }
            other => panic!("unexpected {other:?}"),
        }
        match &user.attributes[3] {
            AttributeMapping::Plural(m) => {
                assert_eq!(m.types.len(), 2);
                assert_eq!(m.types[0].primary_marker.as_deref(), Some("primaryMail"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn descriptor_includes_common_and_derived_attributes() {
        let mappings = parse_resources(USER_MAPPING.as_bytes()).unwrap();
        let descriptor = mappings[0].to_descriptor();
        assert!(descriptor.core_attribute("id").unwrap().is_read_only());
        assert!(descriptor.core_attribute("displayName").unwrap().is_read_only());
        let name = descriptor.core_attribute("name").unwrap();
        assert!(name.sub_attribute("formatted").is_some());
        assert!(name.sub_attribute("familyName").is_some());
        assert!(descriptor.core_attribute("userName").unwrap().is_required());
    }

    #[test]
    fn missing_id_slot_is_rejected() {
        let bad = r#"
<resources>
  <resource name="User" schema="urn:x" endpoint="Users">
    <dnTemplate>uid=fixed,ou=people,dc=example</dnTemplate>
  </resource>
</resources>"#;
        assert!(parse_resources(bad.as_bytes()).is_err());
    }

    #[test]
    fn mapping_elements_outside_resource_are_rejected() {
        let bad = r#"<resources><attribute scim="a" ldap="b"/></resources>"#;
        assert!(parse_resources(bad.as_bytes()).is_err());
    }

    #[test]
    fn generalized_time_round_trip() {
        let dt = parse_generalized_time("20110801182949Z").unwrap();
        assert_eq!(dt.format("%Y%m%d%H%M%SZ").to_string(), "20110801182949Z");
        assert!(parse_generalized_time("2011").is_none());
        // Fractional seconds are accepted.
        assert!(parse_generalized_time("20110801182949.5Z").is_some());
    }

    #[test]
    fn boolean_transform_round_trip() {
        let t = ValueTransform::Boolean;
        assert_eq!(t.to_ldap("active", &ScimValue::Boolean(true)).unwrap(), b"TRUE");
        assert_eq!(
            t.from_ldap("active", "FALSE").unwrap(),
            ScimValue::Boolean(false)
        );
        assert!(t.from_ldap("active", "maybe").is_err());
        assert!(t.to_ldap("active", &ScimValue::from("x")).is_err());
    }
}

//! Bidirectional mapping between SCIM objects and LDAP entries.
//!
//! An [`LdapMapper`] pairs a [`ResourceMapping`] with the resource descriptor
//! it implies and performs the three translations the backend needs: object →
//! entry attributes (create), object → modification list (replace), and entry
//! → object (read). Filter and sort translation build on
//! [`LdapMapper::map_path`].

use std::collections::HashSet;
use std::sync::Arc;

use ldap3::{Mod, SearchEntry};

use crate::error::{ScimResult, SchemaViolation};
use crate::filter::AttrPath;
use crate::resource::{ComplexValue, Meta, ScimAttribute, ScimObject, ScimValue};
use crate::schema::ResourceDescriptor;

use super::config::{
    AttributeMapping, PluralMapping, ResourceMapping, ValueTransform, parse_generalized_time,
};

/// Operational attributes requested alongside the mapped ones.
const OPERATIONAL_ATTRS: [&str; 3] = ["entryUUID", "createTimestamp", "modifyTimestamp"];

/// Maps one resource type between its SCIM and LDAP representations.
#[derive(Debug, Clone)]
pub struct LdapMapper {
    mapping: ResourceMapping,
    resource: Arc<ResourceDescriptor>,
}

impl LdapMapper {
    /// Build a mapper; the descriptor is derived from the mapping.
    pub fn new(mapping: ResourceMapping) -> Self {
        let resource = Arc::new(mapping.to_descriptor());
        Self { mapping, resource }
    }

    /// The resource descriptor implied by the mapping.
    pub fn resource(&self) -> &Arc<ResourceDescriptor> {
        &self.resource
    }

    /// The underlying mapping definition.
    pub fn mapping(&self) -> &ResourceMapping {
        &self.mapping
    }

    /// The search base for this resource.
    pub fn base_dn(&self) -> &str {
        self.mapping.base_dn().expect("mapping was validated at load")
    }

    /// The RDN attribute naming entries of this resource.
    pub fn rdn_attribute(&self) -> &str {
        self.mapping
            .rdn_attribute()
            .expect("mapping was validated at load")
    }

    /// The candidate-selection filter from the mapping config.
    pub fn search_filter(&self) -> &str {
        self.mapping
            .search_filter
            .as_deref()
            .unwrap_or("(objectClass=*)")
    }

    /// The DN for a resource with the given ID, substituting the `{id}` slot
    /// and any attribute slots from the object being created.
    pub fn dn_for(&self, id: &str, object: Option<&ScimObject>) -> String {
        let mut dn = self.mapping.dn_template.replace("{id}", id);
        while let Some(start) = dn.find('{') {
            let Some(end) = dn[start..].find('}') else {
                break;
            };
            let slot = dn[start + 1..start + end].to_string();
            let replacement = object
                .and_then(|o| o.attribute(self.resource.schema(), &slot))
                .and_then(|a| a.as_string().ok())
                .unwrap_or_default()
                .to_string();
            dn.replace_range(start..start + end + 1, &replacement);
        }
        dn
    }

    /// All LDAP attributes to request when reading entries of this resource.
    pub fn ldap_attributes(&self) -> Vec<String> {
        let mut attrs: Vec<String> = vec![self.rdn_attribute().to_string()];
        for mapping in &self.mapping.attributes {
            match mapping {
                AttributeMapping::Simple(m) => attrs.push(m.ldap.clone()),
                AttributeMapping::Complex(m) => {
                    attrs.extend(m.subs.iter().map(|s| s.ldap.clone()));
                }
                AttributeMapping::Plural(m) => {
                    for t in &m.types {
                        attrs.push(t.ldap.clone());
                        if let Some(marker) = &t.primary_marker {
                            attrs.push(marker.clone());
                        }
                    }
                }
                AttributeMapping::Derived(m) => attrs.push(m.ldap.clone()),
            }
        }
        attrs.extend(OPERATIONAL_ATTRS.iter().map(|s| s.to_string()));
        attrs.sort_unstable();
        attrs.dedup();
        attrs
    }

    /// Translate an object into the attribute list for an LDAP add.
    ///
    /// Derived mappings are read-only and contribute nothing; object classes
    /// are included.
    pub fn to_entry(&self, object: &ScimObject) -> ScimResult<Vec<(Vec<u8>, HashSet<Vec<u8>>)>> {
        let mut attrs: Vec<(Vec<u8>, HashSet<Vec<u8>>)> = Vec::new();
        if !self.mapping.object_classes.is_empty() {
            attrs.push((
                b"objectClass".to_vec(),
                self.mapping
                    .object_classes
                    .iter()
                    .map(|c| c.as_bytes().to_vec())
                    .collect(),
            ));
        }
        for (ldap, values) in self.attribute_values(object)? {
            if !values.is_empty() {
                attrs.push((ldap.into_bytes(), values.into_iter().collect()));
            }
        }
        Ok(attrs)
    }

    /// Translate an object into the modification list for a full replace.
    ///
    /// Mapped attributes present on the object are replaced; mapped
    /// attributes absent from the object are deleted when the entry still
    /// carries them (`existing` is the entry's current attribute set,
    /// lowercase).
    pub fn to_modifications(
        &self,
        object: &ScimObject,
        existing: &HashSet<String>,
    ) -> ScimResult<Vec<Mod<Vec<u8>>>> {
        let mut mods = Vec::new();
        for (ldap, values) in self.attribute_values(object)? {
            if !values.is_empty() {
                mods.push(Mod::Replace(
                    ldap.into_bytes(),
                    values.into_iter().collect(),
                ));
            } else if existing.contains(&ldap.to_ascii_lowercase()) {
                mods.push(Mod::Delete(ldap.into_bytes(), HashSet::new()));
            }
        }
        Ok(mods)
    }

    /// The writable LDAP attributes and their values for an object, in
    /// mapping order. Attributes without values are reported with an empty
    /// list so callers can emit deletions.
    fn attribute_values(&self, object: &ScimObject) -> ScimResult<Vec<(String, Vec<Vec<u8>>)>> {
        let schema = self.resource.schema();
        let mut out: Vec<(String, Vec<Vec<u8>>)> = Vec::new();
        for mapping in &self.mapping.attributes {
            match mapping {
                AttributeMapping::Simple(m) => {
                    let value = object
                        .attribute(schema, &m.scim)
                        .and_then(|a| a.value())
                        .map(|v| m.transform.to_ldap(&m.scim, v))
                        .transpose()?;
                    out.push((m.ldap.clone(), value.into_iter().collect()));
                }
                AttributeMapping::Complex(m) => {
                    let complex = object
                        .attribute(schema, &m.scim)
                        .and_then(|a| a.as_complex().ok());
                    for sub in &m.subs {
                        let value = complex
                            .and_then(|c| c.sub_attribute(&sub.scim))
                            .and_then(|a| a.value())
                            .map(|v| sub.transform.to_ldap(&sub.scim, v))
                            .transpose()?;
                        out.push((sub.ldap.clone(), value.into_iter().collect()));
                    }
                }
                AttributeMapping::Plural(m) => {
                    out.extend(self.plural_values(object, m)?);
                }
                AttributeMapping::Derived(_) => {}
            }
        }
        Ok(out)
    }

    fn plural_values(
        &self,
        object: &ScimObject,
        mapping: &PluralMapping,
    ) -> ScimResult<Vec<(String, Vec<Vec<u8>>)>> {
        let schema = self.resource.schema();
        let attribute = object.attribute(schema, &mapping.scim);
        let mut out: Vec<(String, Vec<Vec<u8>>)> = mapping
            .types
            .iter()
            .map(|t| (t.ldap.clone(), Vec::new()))
            .collect();
        let mut markers: Vec<(String, Vec<Vec<u8>>)> = mapping
            .types
            .iter()
            .filter_map(|t| t.primary_marker.clone())
            .map(|marker| (marker, Vec::new()))
            .collect();

        if let Some(attribute) = attribute {
            for element in attribute.values() {
                let Ok(complex) = element.as_complex() else {
                    continue;
                };
                let Some(value) = complex.sub_attribute("value").and_then(|a| a.value()) else {
                    continue;
                };
                let type_token = complex.sub_string("type");
                let Some(index) = type_index(mapping, type_token) else {
                    return Err(SchemaViolation::invalid_value(
                        &mapping.scim,
                        "canonical type",
                        type_token.unwrap_or("none"),
                    )
                    .into());
                };
                let encoded = mapping.transform.to_ldap(&mapping.scim, value)?;
                out[index].1.push(encoded.clone());
                if complex.sub_boolean("primary") == Some(true)
                    && let Some(marker) = &mapping.types[index].primary_marker
                {
                    if let Some(slot) = markers.iter_mut().find(|(m, _)| m == marker) {
                        slot.1.push(encoded);
                    }
                }
            }
        }
        out.append(&mut markers);
        Ok(out)
    }

    /// Build a SCIM object from an LDAP entry. Derived mappings populate
    /// read-only values; `meta` comes from the operational timestamps.
    pub fn from_entry(&self, entry: &SearchEntry) -> ScimResult<ScimObject> {
        let schema = self.resource.schema();
        let mut object = ScimObject::new();

        if let Some(id) = self.entry_id(entry)
            && let Some(descriptor) = self.resource.core_attribute("id")
        {
            object.set_attribute(ScimAttribute::singular(
                descriptor.clone(),
                ScimValue::from(id.as_str()),
            )?)
        }

        for mapping in &self.mapping.attributes {
            match mapping {
                AttributeMapping::Simple(m) => {
                    if let Some(raw) = first_value(entry, &m.ldap)
                        && let Some(descriptor) = self.resource.attribute(schema, &m.scim)
                    {
                        object.set_attribute(ScimAttribute::singular(
                            descriptor.clone(),
                            m.transform.from_ldap_bytes(&m.scim, &raw)?,
                        )?);
                    }
                }
                AttributeMapping::Complex(m) => {
                    let Some(descriptor) = self.resource.attribute(schema, &m.scim) else {
                        continue;
                    };
                    let mut complex = ComplexValue::new();
                    for sub in &m.subs {
                        if let Some(raw) = first_value(entry, &sub.ldap)
                            && let Some(sub_desc) = descriptor.sub_attribute(&sub.scim)
                        {
                            complex.set(ScimAttribute::singular(
                                sub_desc.clone(),
                                sub.transform.from_ldap_bytes(&sub.scim, &raw)?,
                            )?);
                        }
                    }
                    if !complex.is_empty() {
                        object.set_attribute(ScimAttribute::singular(
                            descriptor.clone(),
                            ScimValue::Complex(complex),
                        )?);
                    }
                }
                AttributeMapping::Plural(m) => {
                    if let Some(attribute) = self.plural_from_entry(entry, m)? {
                        object.set_attribute(attribute);
                    }
                }
                AttributeMapping::Derived(m) => {
                    self.apply_derived(&mut object, entry, m)?;
                }
            }
        }

        if let Some(descriptor) = self.resource.core_attribute("meta") {
            let meta = Meta {
                created: first_text(entry, "createTimestamp")
                    .and_then(|raw| parse_generalized_time(&raw)),
                last_modified: first_text(entry, "modifyTimestamp")
                    .and_then(|raw| parse_generalized_time(&raw)),
                location: None,
                version: Some(entry_version(entry)),
            };
            object.set_attribute(meta.to_attribute(descriptor)?);
        }
        Ok(object)
    }

    fn plural_from_entry(
        &self,
        entry: &SearchEntry,
        mapping: &PluralMapping,
    ) -> ScimResult<Option<ScimAttribute>> {
        let schema = self.resource.schema();
        let Some(descriptor) = self.resource.attribute(schema, &mapping.scim) else {
            return Ok(None);
        };
        let mut elements = Vec::new();
        for type_mapping in &mapping.types {
            let primaries: HashSet<String> = type_mapping
                .primary_marker
                .as_deref()
                .and_then(|marker| all_text(entry, marker))
                .unwrap_or_default();
            for raw in all_text(entry, &type_mapping.ldap).unwrap_or_default() {
                let value = mapping.transform.from_ldap(&mapping.scim, &raw)?;
                elements.push(crate::resource::plural_element(
                    descriptor,
                    value,
                    Some(&type_mapping.type_value),
                    primaries.contains(&raw),
                )?);
            }
        }
        if elements.is_empty() {
            return Ok(None);
        }
        Ok(Some(ScimAttribute::plural(descriptor.clone(), elements)?))
    }

    fn apply_derived(
        &self,
        object: &mut ScimObject,
        entry: &SearchEntry,
        mapping: &super::config::DerivedMapping,
    ) -> ScimResult<()> {
        let schema = self.resource.schema();
        let Some(raw) = first_text(entry, &mapping.ldap) else {
            return Ok(());
        };
        let Some(descriptor) = self.resource.attribute(schema, &mapping.scim) else {
            return Ok(());
        };
        match &mapping.sub {
            None => {
                object.set_attribute(ScimAttribute::singular(
                    descriptor.clone(),
                    ScimValue::from(raw.as_str()),
                )?);
            }
            Some(sub_name) => {
                let Some(sub_desc) = descriptor.sub_attribute(sub_name) else {
                    return Ok(());
                };
                let mut complex = object
                    .attribute(schema, &mapping.scim)
                    .and_then(|a| a.as_complex().ok())
                    .cloned()
                    .unwrap_or_default();
                complex.set(ScimAttribute::singular(
                    sub_desc.clone(),
                    ScimValue::from(raw.as_str()),
                )?);
                object.set_attribute(ScimAttribute::singular(
                    descriptor.clone(),
                    ScimValue::Complex(complex),
                )?);
            }
        }
        Ok(())
    }

    /// The resource ID carried by an entry: the RDN attribute value (which
    /// holds the `{id}` slot), falling back to `entryUUID`.
    pub fn entry_id(&self, entry: &SearchEntry) -> Option<String> {
        first_text(entry, self.rdn_attribute()).or_else(|| first_text(entry, "entryUUID"))
    }

    /// Map an attribute path to the LDAP attributes implementing it, with
    /// their transforms. Empty means the path is unmapped.
    pub fn map_path(&self, path: &AttrPath) -> Vec<(String, ValueTransform)> {
        for mapping in &self.mapping.attributes {
            if !mapping.scim_name().eq_ignore_ascii_case(&path.name) {
                continue;
            }
            match mapping {
                AttributeMapping::Simple(m) => {
                    if path.sub.is_none() {
                        return vec![(m.ldap.clone(), m.transform)];
                    }
                }
                AttributeMapping::Complex(m) => {
                    if let Some(sub_name) = &path.sub {
                        for sub in &m.subs {
                            if sub.scim.eq_ignore_ascii_case(sub_name) {
                                return vec![(sub.ldap.clone(), sub.transform)];
                            }
                        }
                    }
                }
                AttributeMapping::Plural(m) => {
                    // A bare plural path or its `value` sub fans out to every
                    // type's attribute; a canonical type token selects one.
                    match path.sub.as_deref() {
                        None | Some("value") => {
                            return m
                                .types
                                .iter()
                                .map(|t| (t.ldap.clone(), m.transform))
                                .collect();
                        }
                        Some(token) => {
                            if let Some(t) = m
                                .types
                                .iter()
                                .find(|t| t.type_value.eq_ignore_ascii_case(token))
                            {
                                return vec![(t.ldap.clone(), m.transform)];
                            }
                        }
                    }
                }
                AttributeMapping::Derived(m) => {
                    if m.sub.as_deref() == path.sub.as_deref()
                        || (path.sub.is_none() && m.sub.is_none())
                    {
                        return vec![(m.ldap.clone(), ValueTransform::String)];
                    }
                }
            }
        }
        Vec::new()
    }

    /// The LDAP attribute to sort a candidate set by, if the path is mapped.
    pub fn sort_attribute(&self, path: &AttrPath) -> Option<String> {
        self.map_path(path).into_iter().next().map(|(attr, _)| attr)
    }
}

/// Index of the canonical type token within a plural mapping's types, or
/// `None` if the token is absent or matches no configured type.
fn type_index(mapping: &PluralMapping, type_token: Option<&str>) -> Option<usize> {
    let token = type_token?;
    mapping
        .types
        .iter()
        .position(|t| t.type_value.eq_ignore_ascii_case(token))
}

/// First value of an entry attribute as raw octets, case-insensitive on the
/// attribute name (servers differ in returned casing).
fn first_value(entry: &SearchEntry, name: &str) -> Option<Vec<u8>> {
    for (key, values) in &entry.attrs {
        if key.eq_ignore_ascii_case(name) {
            return values.first().map(|v| v.as_bytes().to_vec());
        }
    }
    for (key, values) in &entry.bin_attrs {
        if key.eq_ignore_ascii_case(name) {
            return values.first().cloned();
        }
    }
    None
}

fn first_text(entry: &SearchEntry, name: &str) -> Option<String> {
    for (key, values) in &entry.attrs {
        if key.eq_ignore_ascii_case(name) {
            return values.first().cloned();
        }
    }
    None
}

fn all_text(entry: &SearchEntry, name: &str) -> Option<HashSet<String>> {
    for (key, values) in &entry.attrs {
        if key.eq_ignore_ascii_case(name) {
            return Some(values.iter().cloned().collect());
        }
    }
    None
}

/// Version tag for an entry: hash over its attributes in sorted order, so the
/// value is stable regardless of server return order.
pub(crate) fn entry_version(entry: &SearchEntry) -> String {
    let mut parts: Vec<String> = entry
        .attrs
        .iter()
        .map(|(k, vs)| {
            let mut vs = vs.clone();
            vs.sort();
            format!("{}={}", k.to_ascii_lowercase(), vs.join("\x1f"))
        })
        .collect();
    parts.sort();
    crate::backend::content_version(parts.join("\x1e").as_bytes())
}

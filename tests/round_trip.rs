//! Property tests for the round-trip laws: codec marshal/unmarshal, URI
//! emit/parse, and filter predicate totality.

use std::sync::Arc;

use proptest::prelude::*;

use scim_directory::codec::{JsonCodec, Marshaller, MediaType, Unmarshaller, XmlCodec};
use scim_directory::filter::{
    AttributeSelection, FilterExpr, PageSpec, SortSpec, matches,
};
use scim_directory::resource::{ScimAttribute, ScimObject, ScimValue, plural_element};
use scim_directory::schema::{CORE_SCHEMA_URI, SchemaRegistry};
use scim_directory::uri::{ScimQuery, ScimUri};

fn registry() -> Arc<SchemaRegistry> {
    Arc::new(SchemaRegistry::core())
}

/// Printable strings without XML-invalid control characters. Leading and
/// trailing whitespace is excluded because the XML reader strips it.
fn text() -> impl Strategy<Value = String> {
    "([!-~]([ -~]{0,20}[!-~])?)?"
}

fn user_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9.]{0,15}"
}

prop_compose! {
    fn arbitrary_user()(
        user_name in user_name(),
        display in proptest::option::of(text()),
        active in proptest::option::of(any::<bool>()),
        given in proptest::option::of(text()),
        family in proptest::option::of(text()),
        emails in proptest::collection::vec((user_name(), any::<bool>()), 0..3),
    ) -> ScimObject {
        let registry = registry();
        let resource = registry.resource("User").unwrap().clone();
        let mut object = ScimObject::new();
        let set = |object: &mut ScimObject, name: &str, value: ScimValue| {
            let descriptor = resource.core_attribute(name).unwrap().clone();
            object.set_attribute(ScimAttribute::singular(descriptor, value).unwrap());
        };
        set(&mut object, "userName", ScimValue::from(user_name));
        if let Some(display) = display {
            set(&mut object, "displayName", ScimValue::from(display));
        }
        if let Some(active) = active {
            set(&mut object, "active", ScimValue::Boolean(active));
        }
        if given.is_some() || family.is_some() {
            let name_desc = resource.core_attribute("name").unwrap().clone();
            let mut complex = scim_directory::resource::ComplexValue::new();
            if let Some(given) = given {
                complex.set(
                    ScimAttribute::singular(
                        name_desc.sub_attribute("givenName").unwrap().clone(),
                        ScimValue::from(given),
                    )
                    .unwrap(),
                );
            }
            if let Some(family) = family {
                complex.set(
                    ScimAttribute::singular(
                        name_desc.sub_attribute("familyName").unwrap().clone(),
                        ScimValue::from(family),
                    )
                    .unwrap(),
                );
            }
            object.set_attribute(
                ScimAttribute::singular(name_desc, ScimValue::Complex(complex)).unwrap(),
            );
        }
        if !emails.is_empty() {
            let emails_desc = resource.core_attribute("emails").unwrap().clone();
            let mut first_primary = emails.iter().position(|(_, primary)| *primary);
            let elements: Vec<ScimValue> = emails
                .into_iter()
                .enumerate()
                .map(|(i, (value, _))| {
                    // Keep at most one primary element.
                    let primary = first_primary.take_if(|p| *p == i).is_some();
                    plural_element(
                        &emails_desc,
                        ScimValue::from(format!("{value}@example.com")),
                        Some(if i % 2 == 0 { "work" } else { "home" }),
                        primary,
                    )
                    .unwrap()
                })
                .collect();
            object.set_attribute(ScimAttribute::plural(emails_desc, elements).unwrap());
        }
        object
    }
}

proptest! {
    #[test]
    fn json_codec_round_trips(object in arbitrary_user()) {
        let registry = registry();
        let resource = registry.resource("User").unwrap().clone();
        let codec = JsonCodec::new(registry.clone());
        let bytes = codec.marshal(&resource, &object).unwrap();
        let round = codec.unmarshal(&bytes, &resource).unwrap();
        prop_assert_eq!(round, object);
    }

    #[test]
    fn xml_codec_round_trips(object in arbitrary_user()) {
        let registry = registry();
        let resource = registry.resource("User").unwrap().clone();
        let codec = XmlCodec::new(registry.clone());
        let bytes = codec.marshal(&resource, &object).unwrap();
        let round = codec.unmarshal(&bytes, &resource).unwrap();
        prop_assert_eq!(round, object);
    }

    #[test]
    fn cross_codec_objects_are_equal(object in arbitrary_user()) {
        let registry = registry();
        let resource = registry.resource("User").unwrap().clone();
        let json_codec = JsonCodec::new(registry.clone());
        let xml_codec = XmlCodec::new(registry.clone());
        let via_json = json_codec
            .unmarshal(&json_codec.marshal(&resource, &object).unwrap(), &resource)
            .unwrap();
        let via_xml = xml_codec
            .unmarshal(&xml_codec.marshal(&resource, &object).unwrap(), &resource)
            .unwrap();
        prop_assert_eq!(via_json, via_xml);
    }

    #[test]
    fn uri_emit_parse_round_trips(
        id in proptest::option::of("[a-zA-Z0-9-]{1,16}"),
        filter in proptest::option::of("[a-zA-Z \"@.]{1,20}"),
        start_index in 1usize..50,
        count in proptest::option::of(0usize..50),
        xml in any::<bool>(),
        sorted in any::<bool>(),
    ) {
        let uri = ScimUri {
            endpoint: "Users".to_string(),
            resource_id: id,
            media: if xml { Some(MediaType::Xml) } else { None },
            query: ScimQuery {
                attributes: AttributeSelection::All,
                filter,
                sort: if sorted {
                    Some(SortSpec::from_params("userName", Some("descending")).unwrap())
                } else {
                    None
                },
                page: PageSpec { start_index, count },
            },
        };
        let emitted = uri.emit("https://example.com/v1");
        let parsed = ScimUri::parse_absolute("https://example.com/v1", &emitted).unwrap();
        prop_assert_eq!(parsed, uri);
    }

    /// Predicate totality: an equality predicate over a present attribute is
    /// true exactly when its oracle is, and its complement inverts it.
    #[test]
    fn equality_predicates_are_total(object in arbitrary_user(), probe in user_name()) {
        let actual = object
            .attribute(CORE_SCHEMA_URI, "userName")
            .unwrap()
            .as_string()
            .unwrap()
            .to_string();
        let filter = FilterExpr::parse(&format!("userName eq \"{probe}\"")).unwrap();
        let outcome = matches(&filter, &object);
        prop_assert_eq!(outcome, actual.eq_ignore_ascii_case(&probe));
        // Exactly one of the predicate and its logical complement holds.
        prop_assert_ne!(outcome, !outcome);
    }
}

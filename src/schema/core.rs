//! The SCIM 1.0 core schema, built in code.
//!
//! Resource and attribute descriptors for the core User and Group resources
//! under `urn:scim:schemas:core:1.0`. These are registered by
//! [`SchemaRegistry::core`](super::SchemaRegistry::core) at startup.

use super::types::{AttributeDescriptor, CORE_SCHEMA_URI, DataType, ResourceDescriptor};

/// Common attributes shared by every core resource: `id`, `externalId`, `meta`.
fn common_attributes() -> Vec<AttributeDescriptor> {
    vec![
        AttributeDescriptor::simple(CORE_SCHEMA_URI, "id", DataType::String)
            .read_only()
            .case_exact(),
        AttributeDescriptor::simple(CORE_SCHEMA_URI, "externalId", DataType::String).case_exact(),
        AttributeDescriptor::complex(
            CORE_SCHEMA_URI,
            "meta",
            vec![
                AttributeDescriptor::simple(CORE_SCHEMA_URI, "created", DataType::DateTime),
                AttributeDescriptor::simple(CORE_SCHEMA_URI, "lastModified", DataType::DateTime),
                AttributeDescriptor::simple(CORE_SCHEMA_URI, "location", DataType::String)
                    .case_exact(),
                AttributeDescriptor::simple(CORE_SCHEMA_URI, "version", DataType::String)
                    .case_exact(),
            ],
        )
        .read_only(),
    ]
}

/// The core User resource descriptor.
pub fn user_resource() -> ResourceDescriptor {
    let mut attributes = common_attributes();
    attributes.extend([
        AttributeDescriptor::simple(CORE_SCHEMA_URI, "userName", DataType::String).required(),
        AttributeDescriptor::complex(
            CORE_SCHEMA_URI,
            "name",
            vec![
                AttributeDescriptor::simple(CORE_SCHEMA_URI, "formatted", DataType::String),
                AttributeDescriptor::simple(CORE_SCHEMA_URI, "familyName", DataType::String),
                AttributeDescriptor::simple(CORE_SCHEMA_URI, "givenName", DataType::String),
                AttributeDescriptor::simple(CORE_SCHEMA_URI, "middleName", DataType::String),
                AttributeDescriptor::simple(CORE_SCHEMA_URI, "honorificPrefix", DataType::String),
                AttributeDescriptor::simple(CORE_SCHEMA_URI, "honorificSuffix", DataType::String),
            ],
        ),
        AttributeDescriptor::simple(CORE_SCHEMA_URI, "displayName", DataType::String),
        AttributeDescriptor::simple(CORE_SCHEMA_URI, "nickName", DataType::String),
        AttributeDescriptor::simple(CORE_SCHEMA_URI, "profileUrl", DataType::String).case_exact(),
        AttributeDescriptor::simple(CORE_SCHEMA_URI, "title", DataType::String),
        AttributeDescriptor::simple(CORE_SCHEMA_URI, "userType", DataType::String),
        AttributeDescriptor::simple(CORE_SCHEMA_URI, "preferredLanguage", DataType::String),
        AttributeDescriptor::simple(CORE_SCHEMA_URI, "locale", DataType::String),
        AttributeDescriptor::simple(CORE_SCHEMA_URI, "timezone", DataType::String),
        AttributeDescriptor::simple(CORE_SCHEMA_URI, "active", DataType::Boolean),
        AttributeDescriptor::simple(CORE_SCHEMA_URI, "password", DataType::String),
        AttributeDescriptor::plural(
            CORE_SCHEMA_URI,
            "emails",
            DataType::String,
            &["work", "home", "other"],
        ),
        AttributeDescriptor::plural(
            CORE_SCHEMA_URI,
            "phoneNumbers",
            DataType::String,
            &["work", "home", "mobile", "fax", "pager", "other"],
        ),
        AttributeDescriptor::plural(
            CORE_SCHEMA_URI,
            "addresses",
            DataType::String,
            &["work", "home", "other"],
        ),
        AttributeDescriptor::plural(CORE_SCHEMA_URI, "groups", DataType::String, &[]).read_only(),
    ]);
    ResourceDescriptor::new(CORE_SCHEMA_URI, "User", "Users", attributes)
}

/// The core Group resource descriptor.
pub fn group_resource() -> ResourceDescriptor {
    let mut attributes = common_attributes();
    attributes.extend([
        AttributeDescriptor::simple(CORE_SCHEMA_URI, "displayName", DataType::String).required(),
        AttributeDescriptor::plural(CORE_SCHEMA_URI, "members", DataType::String, &["User", "Group"]),
    ]);
    ResourceDescriptor::new(CORE_SCHEMA_URI, "Group", "Groups", attributes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_resource_has_required_user_name() {
        let user = user_resource();
        let user_name = user.core_attribute("username").expect("userName");
        assert!(user_name.is_required());
        assert!(!user_name.is_multi_valued());
    }

    #[test]
    fn meta_is_read_only_complex() {
        let user = user_resource();
        let meta = user.core_attribute("meta").expect("meta");
        assert!(meta.is_read_only());
        assert_eq!(meta.data_type(), DataType::Complex);
        assert!(meta.sub_attribute("lastModified").is_some());
    }

    #[test]
    fn group_members_have_canonical_types() {
        let group = group_resource();
        let members = group.core_attribute("members").expect("members");
        assert_eq!(members.canonical_types(), &["User", "Group"]);
    }
}

//! The SCIM URI model.
//!
//! A SCIM URI has the shape
//! `<baseURI>/<endpoint>[/<resourceID>][.mediaSuffix][?query]`. This module
//! parses and emits those URIs, including the standard query parameters
//! (`attributes`, `filter`, `sortBy`, `sortOrder`, `startIndex`, `count`).
//! The media suffix, when present, overrides `Accept`-header negotiation.
//!
//! Emission and parsing are inverses: `parse(emit(x)) == x` for every
//! well-formed value.

use url::form_urlencoded;

use crate::codec::MediaType;
use crate::error::{ScimError, ScimResult};
use crate::filter::{AttributeSelection, PageSpec, SortSpec};

/// Query parameters of a SCIM request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScimQuery {
    /// Attribute selection (`attributes=` csv)
    pub attributes: AttributeSelection,
    /// Raw filter expression, if any
    pub filter: Option<String>,
    /// Sort specification, if any
    pub sort: Option<SortSpec>,
    /// Pagination parameters
    pub page: PageSpec,
}

/// A parsed SCIM resource URI, relative to some base URI.
#[derive(Debug, Clone, PartialEq)]
pub struct ScimUri {
    /// The endpoint segment (e.g. "Users")
    pub endpoint: String,
    /// The resource ID, when the URI names a single resource
    pub resource_id: Option<String>,
    /// Media suffix (`.json` / `.xml`), which wins over `Accept`
    pub media: Option<MediaType>,
    /// Query parameters
    pub query: ScimQuery,
}

impl ScimUri {
    /// A bare endpoint URI with no ID, suffix, or query.
    pub fn endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            resource_id: None,
            media: None,
            query: ScimQuery::default(),
        }
    }

    /// An endpoint plus resource ID.
    pub fn resource(endpoint: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_id: Some(id.into()),
            ..Self::endpoint(endpoint)
        }
    }

    /// Parse the path-and-query part of a SCIM URI (everything after the
    /// base URI, with or without a leading slash).
    pub fn parse(path_and_query: &str) -> ScimResult<Self> {
        let (path, query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (path_and_query, None),
        };

        let mut segments = path
            .trim_start_matches('/')
            .trim_end_matches('/')
            .split('/')
            .filter(|s| !s.is_empty());
        let endpoint = segments
            .next()
            .ok_or_else(|| ScimError::invalid_uri("missing endpoint segment"))?;
        let resource_id = segments.next();
        if segments.next().is_some() {
            return Err(ScimError::invalid_uri(format!(
                "too many path segments in '{path}'"
            )));
        }

        // The media suffix attaches to the last segment.
        let (endpoint, resource_id, media) = match resource_id {
            Some(id) => {
                let (id, media) = split_suffix(id);
                (endpoint.to_string(), Some(id), media)
            }
            None => {
                let (endpoint, media) = split_suffix(endpoint);
                (endpoint, None, media)
            }
        };
        if endpoint.is_empty() {
            return Err(ScimError::invalid_uri("missing endpoint segment"));
        }
        if let Some(id) = &resource_id
            && id.is_empty()
        {
            return Err(ScimError::invalid_uri("empty resource ID segment"));
        }

        let query = match query {
            Some(raw) => parse_query(raw)?,
            None => ScimQuery::default(),
        };
        Ok(Self {
            endpoint,
            resource_id,
            media,
            query,
        })
    }

    /// Emit this URI relative to a base URI.
    pub fn emit(&self, base: &str) -> String {
        let mut out = String::from(base.trim_end_matches('/'));
        out.push('/');
        out.push_str(&self.endpoint);
        if let Some(id) = &self.resource_id {
            out.push('/');
            out.push_str(id);
        }
        if let Some(media) = self.media {
            out.push_str(media.suffix());
        }

        let mut pairs = form_urlencoded::Serializer::new(String::new());
        if let Some(csv) = self.query.attributes.to_csv() {
            pairs.append_pair("attributes", &csv);
        }
        if let Some(filter) = &self.query.filter {
            pairs.append_pair("filter", filter);
        }
        if let Some(sort) = &self.query.sort {
            pairs.append_pair("sortBy", &sort.by.to_string());
            pairs.append_pair("sortOrder", sort.order.as_str());
        }
        if self.query.page.start_index != 1 {
            pairs.append_pair("startIndex", &self.query.page.start_index.to_string());
        }
        if let Some(count) = self.query.page.count {
            pairs.append_pair("count", &count.to_string());
        }
        let encoded = pairs.finish();
        if !encoded.is_empty() {
            out.push('?');
            out.push_str(&encoded);
        }
        out
    }

    /// Strip a base URI from an absolute URI and parse the remainder.
    pub fn parse_absolute(base: &str, uri: &str) -> ScimResult<Self> {
        let base = base.trim_end_matches('/');
        let rest = uri.strip_prefix(base).ok_or_else(|| {
            ScimError::invalid_uri(format!("URI '{uri}' is not under base '{base}'"))
        })?;
        Self::parse(rest)
    }
}

fn split_suffix(segment: &str) -> (String, Option<MediaType>) {
    if let Some((stem, suffix)) = segment.rsplit_once('.')
        && let Some(media) = MediaType::from_suffix(suffix)
    {
        return (stem.to_string(), Some(media));
    }
    (segment.to_string(), None)
}

fn parse_query(raw: &str) -> ScimResult<ScimQuery> {
    let mut attributes = None;
    let mut filter = None;
    let mut sort_by = None;
    let mut sort_order = None;
    let mut start_index = None;
    let mut count = None;
    for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
        match key.to_ascii_lowercase().as_str() {
            "attributes" => attributes = Some(AttributeSelection::parse(&value)?),
            "filter" => filter = Some(value.into_owned()),
            "sortby" => sort_by = Some(value.into_owned()),
            "sortorder" => sort_order = Some(value.into_owned()),
            "startindex" => start_index = Some(value.into_owned()),
            "count" => count = Some(value.into_owned()),
            _ => {} // unknown parameters are ignored
        }
    }
    let sort = match sort_by {
        Some(by) => Some(SortSpec::from_params(&by, sort_order.as_deref())?),
        None => {
            if sort_order.is_some() {
                return Err(ScimError::invalid_uri("sortOrder requires sortBy"));
            }
            None
        }
    };
    Ok(ScimQuery {
        attributes: attributes.unwrap_or_default(),
        filter,
        sort,
        page: PageSpec::from_params(start_index.as_deref(), count.as_deref())?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{AttrPath, SortOrder};

    #[test]
    fn parses_endpoint_and_id() {
        let uri = ScimUri::parse("/Users/2819c223").unwrap();
        assert_eq!(uri.endpoint, "Users");
        assert_eq!(uri.resource_id.as_deref(), Some("2819c223"));
        assert_eq!(uri.media, None);
    }

    #[test]
    fn media_suffix_attaches_to_last_segment() {
        let uri = ScimUri::parse("/Users.xml").unwrap();
        assert_eq!(uri.endpoint, "Users");
        assert_eq!(uri.media, Some(MediaType::Xml));

        let uri = ScimUri::parse("/Users/42.json").unwrap();
        assert_eq!(uri.endpoint, "Users");
        assert_eq!(uri.resource_id.as_deref(), Some("42"));
        assert_eq!(uri.media, Some(MediaType::Json));
    }

    #[test]
    fn id_containing_dot_without_known_suffix_is_kept() {
        let uri = ScimUri::parse("/Users/user.name@example.com").unwrap();
        assert_eq!(uri.resource_id.as_deref(), Some("user.name@example.com"));
        assert_eq!(uri.media, None);
    }

    #[test]
    fn query_parameters_parse() {
        let uri = ScimUri::parse(
            "/Users?filter=userName%20eq%20%22alice%22&sortBy=name.familyName&sortOrder=descending&startIndex=2&count=10&attributes=userName,emails",
        )
        .unwrap();
        assert_eq!(uri.query.filter.as_deref(), Some("userName eq \"alice\""));
        let sort = uri.query.sort.as_ref().unwrap();
        assert_eq!(sort.by, AttrPath::parse("name.familyName").unwrap());
        assert_eq!(sort.order, SortOrder::Descending);
        assert_eq!(uri.query.page.start_index, 2);
        assert_eq!(uri.query.page.count, Some(10));
        match &uri.query.attributes {
            AttributeSelection::Subset(paths) => assert_eq!(paths.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn malformed_uris_are_rejected() {
        assert!(ScimUri::parse("").is_err());
        assert!(ScimUri::parse("/Users/42/extra").is_err());
        assert!(ScimUri::parse("/Users?sortOrder=ascending").is_err());
        assert!(ScimUri::parse("/Users?startIndex=abc").is_err());
    }

    #[test]
    fn emit_then_parse_round_trips() {
        let uri = ScimUri {
            endpoint: "Users".into(),
            resource_id: None,
            media: Some(MediaType::Json),
            query: ScimQuery {
                attributes: AttributeSelection::parse("userName,name.familyName").unwrap(),
                filter: Some("userName eq \"a b\"".into()),
                sort: Some(SortSpec::from_params("userName", Some("ascending")).unwrap()),
                page: PageSpec {
                    start_index: 3,
                    count: Some(7),
                },
            },
        };
        let emitted = uri.emit("https://example.com/v1");
        let parsed = ScimUri::parse_absolute("https://example.com/v1", &emitted).unwrap();
        assert_eq!(parsed, uri);
    }

    #[test]
    fn base_mismatch_is_rejected() {
        assert!(ScimUri::parse_absolute("https://a/v1", "https://b/v1/Users").is_err());
    }
}

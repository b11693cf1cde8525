//! Sort, pagination, and attribute-selection parameters.
//!
//! These are the non-filter query parameters of a list request. Sorting
//! compares by the target attribute's natural order (strings per `caseExact`,
//! integers numerically, datetimes chronologically); objects missing the sort
//! attribute order last. Pagination is 1-based; an out-of-range start index
//! yields an empty slice while `totalResults` stays truthful.

use std::cmp::Ordering;

use crate::error::{ScimError, ScimResult};
use crate::resource::{ScimObject, ScimValue};

use super::eval;
use super::parser::AttrPath;

/// Sort direction. Default is ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Smallest value first
    #[default]
    Ascending,
    /// Largest value first
    Descending,
}

impl SortOrder {
    /// Parse the `sortOrder` query value.
    pub fn parse(value: &str) -> ScimResult<Self> {
        match value.to_ascii_lowercase().as_str() {
            "ascending" => Ok(Self::Ascending),
            "descending" => Ok(Self::Descending),
            other => Err(ScimError::invalid_uri(format!(
                "invalid sortOrder '{other}', expected ascending or descending"
            ))),
        }
    }

    /// The wire form of this order.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ascending => "ascending",
            Self::Descending => "descending",
        }
    }
}

/// A sort specification: attribute path plus direction.
#[derive(Debug, Clone, PartialEq)]
pub struct SortSpec {
    /// The attribute to sort by
    pub by: AttrPath,
    /// The direction
    pub order: SortOrder,
}

impl SortSpec {
    /// Build from the `sortBy` / `sortOrder` query parameters.
    pub fn from_params(sort_by: &str, sort_order: Option<&str>) -> ScimResult<Self> {
        Ok(Self {
            by: AttrPath::parse(sort_by)
                .map_err(|_| ScimError::invalid_uri(format!("invalid sortBy '{sort_by}'")))?,
            order: sort_order.map(SortOrder::parse).transpose()?.unwrap_or_default(),
        })
    }

    /// Sort a candidate set in place.
    pub fn sort(&self, objects: &mut [ScimObject]) {
        objects.sort_by(|a, b| self.compare(a, b));
    }

    /// Compare two objects under this spec.
    pub fn compare(&self, a: &ScimObject, b: &ScimObject) -> Ordering {
        let va = eval::sort_key(a, &self.by);
        let vb = eval::sort_key(b, &self.by);
        let ordering = match (va, vb) {
            (Some(va), Some(vb)) => compare_values(va, vb),
            // Objects without the sort attribute order last, regardless of
            // direction.
            (Some(_), None) => return Ordering::Less,
            (None, Some(_)) => return Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        match self.order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}

fn compare_values(a: (bool, &ScimValue), b: (bool, &ScimValue)) -> Ordering {
    let case_exact = a.0 || b.0;
    match (a.1, b.1) {
        (ScimValue::String(x), ScimValue::String(y)) => {
            if case_exact {
                x.cmp(y)
            } else {
                x.to_lowercase().cmp(&y.to_lowercase())
            }
        }
        (ScimValue::Integer(x), ScimValue::Integer(y)) => x.cmp(y),
        (ScimValue::DateTime(x), ScimValue::DateTime(y)) => x.cmp(y),
        (ScimValue::Boolean(x), ScimValue::Boolean(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// Pagination parameters: 1-based `startIndex` and a non-negative `count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpec {
    /// 1-based index of the first result to return
    pub start_index: usize,
    /// Maximum number of results to return; `None` means the server default
    pub count: Option<usize>,
}

impl Default for PageSpec {
    fn default() -> Self {
        Self {
            start_index: 1,
            count: None,
        }
    }
}

impl PageSpec {
    /// Build from raw query values, applying defaults and bounds.
    pub fn from_params(start_index: Option<&str>, count: Option<&str>) -> ScimResult<Self> {
        let start_index = match start_index {
            Some(raw) => {
                let parsed: i64 = raw
                    .parse()
                    .map_err(|_| ScimError::invalid_uri(format!("invalid startIndex '{raw}'")))?;
                // Out-of-range values snap to the nearest legal value.
                parsed.max(1) as usize
            }
            None => 1,
        };
        let count = match count {
            Some(raw) => {
                let parsed: i64 = raw
                    .parse()
                    .map_err(|_| ScimError::invalid_uri(format!("invalid count '{raw}'")))?;
                Some(parsed.max(0) as usize)
            }
            None => None,
        };
        Ok(Self { start_index, count })
    }

    /// Slice a fully materialized result set.
    ///
    /// Returns the page plus the true total. A start index beyond the end
    /// produces an empty page.
    pub fn slice<T>(&self, items: Vec<T>, default_count: usize) -> (usize, Vec<T>) {
        let total = items.len();
        let skip = self.start_index.saturating_sub(1);
        let take = self.count.unwrap_or(default_count);
        let page = items.into_iter().skip(skip).take(take).collect();
        (total, page)
    }
}

/// The `attributes=` selection: which attribute paths to include in results.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AttributeSelection {
    /// Return every attribute
    #[default]
    All,
    /// Return only the listed paths (plus `id`, `meta`, `schemas`)
    Subset(Vec<AttrPath>),
}

impl AttributeSelection {
    /// Parse the comma-separated `attributes` parameter. An empty list means
    /// all attributes.
    pub fn parse(csv: &str) -> ScimResult<Self> {
        let paths: Vec<AttrPath> = csv
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(AttrPath::parse)
            .collect::<ScimResult<_>>()?;
        Ok(if paths.is_empty() {
            Self::All
        } else {
            Self::Subset(paths)
        })
    }

    /// The csv form, or `None` when everything is selected.
    pub fn to_csv(&self) -> Option<String> {
        match self {
            Self::All => None,
            Self::Subset(paths) => Some(
                paths
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(","),
            ),
        }
    }

    /// Project an object down to the selected paths.
    ///
    /// `id`, `meta`, and the schema set are always returned. When every
    /// listed path for a complex attribute is sub-qualified, the attribute is
    /// narrowed to those sub-attributes; a bare name keeps the whole value.
    pub fn apply(&self, object: &ScimObject) -> ScimObject {
        let Self::Subset(paths) = self else {
            return object.clone();
        };
        let mut projected = ScimObject::new();
        for (_, attribute) in object.iter() {
            let name = attribute.name();
            if name.eq_ignore_ascii_case("id") || name.eq_ignore_ascii_case("meta") {
                projected.set_attribute(attribute.clone());
                continue;
            }
            let matching: Vec<&AttrPath> = paths
                .iter()
                .filter(|p| p.name.eq_ignore_ascii_case(name))
                .collect();
            if matching.is_empty() {
                continue;
            }
            if matching.iter().any(|p| p.sub.is_none()) {
                projected.set_attribute(attribute.clone());
                continue;
            }
            let subs: Vec<&str> = matching.iter().filter_map(|p| p.sub.as_deref()).collect();
            if let Some(narrowed) = eval::narrow_to_subs(attribute, &subs) {
                projected.set_attribute(narrowed);
            }
        }
        for (uri, raw) in object.retained_extensions() {
            projected.retain_extension(uri.clone(), raw.clone());
        }
        projected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_defaults_and_bounds() {
        let page = PageSpec::from_params(None, None).unwrap();
        assert_eq!(page.start_index, 1);
        assert_eq!(page.count, None);

        let page = PageSpec::from_params(Some("0"), Some("-3")).unwrap();
        assert_eq!(page.start_index, 1);
        assert_eq!(page.count, Some(0));

        assert!(PageSpec::from_params(Some("x"), None).is_err());
    }

    #[test]
    fn slice_beyond_total_is_empty_with_true_total() {
        let page = PageSpec {
            start_index: 10,
            count: Some(5),
        };
        let (total, items) = page.slice(vec![1, 2, 3], 100);
        assert_eq!(total, 3);
        assert!(items.is_empty());
    }

    #[test]
    fn slice_mid_walk() {
        let page = PageSpec {
            start_index: 2,
            count: Some(2),
        };
        let (total, items) = page.slice(vec![10, 20, 30, 40, 50], 100);
        assert_eq!(total, 5);
        assert_eq!(items, vec![20, 30]);
    }

    #[test]
    fn empty_attribute_selection_means_all() {
        assert_eq!(AttributeSelection::parse("").unwrap(), AttributeSelection::All);
        assert_eq!(AttributeSelection::parse(" , ").unwrap(), AttributeSelection::All);
        let subset = AttributeSelection::parse("userName,name.familyName").unwrap();
        match &subset {
            AttributeSelection::Subset(paths) => assert_eq!(paths.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(subset.to_csv().as_deref(), Some("userName,name.familyName"));
    }

    #[test]
    fn sort_order_parses_case_insensitively() {
        assert_eq!(SortOrder::parse("Descending").unwrap(), SortOrder::Descending);
        assert!(SortOrder::parse("sideways").is_err());
    }
}

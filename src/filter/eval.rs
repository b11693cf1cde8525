//! Filter evaluation against in-memory objects.
//!
//! String comparison respects the descriptor's `caseExact`; a type mismatch
//! between the literal and the attribute value evaluates the predicate to
//! false rather than erroring, per SCIM leniency. A predicate over a plural
//! attribute matches when any element matches.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::resource::{ScimObject, ScimValue};

use super::parser::{AttrPath, CompareOp, FilterExpr, FilterValue};

/// Evaluate a filter expression against an object.
pub fn matches(expr: &FilterExpr, object: &ScimObject) -> bool {
    match expr {
        FilterExpr::And(terms) => terms.iter().all(|t| matches(t, object)),
        FilterExpr::Or(terms) => terms.iter().any(|t| matches(t, object)),
        FilterExpr::Present(path) => !candidates(object, path).is_empty(),
        FilterExpr::Compare { path, op, value } => candidates(object, path)
            .into_iter()
            .any(|(case_exact, candidate)| compare(candidate, *op, value, case_exact)),
    }
}

/// Collect the values a path resolves to, paired with the `caseExact` flag of
/// the descriptor they belong to.
///
/// * simple path on a simple attribute → its value,
/// * `name.sub` on a complex attribute → the sub-attribute's value,
/// * `name.sub` on a plural attribute → that sub of every element,
/// * bare plural name → the `value` sub of every element.
fn candidates<'a>(object: &'a ScimObject, path: &AttrPath) -> Vec<(bool, &'a ScimValue)> {
    let Some(attribute) = object.attribute_anywhere(&path.name) else {
        return Vec::new();
    };
    let descriptor = attribute.descriptor();
    let mut out = Vec::new();
    if descriptor.is_multi_valued() {
        let sub_name = path.sub.as_deref().unwrap_or("value");
        for element in attribute.values() {
            if let Ok(complex) = element.as_complex()
                && let Some(sub) = complex.sub_attribute(sub_name)
                && let Some(value) = sub.value()
            {
                out.push((sub.descriptor().is_case_exact(), value));
            }
        }
    } else if let Some(sub_name) = path.sub.as_deref() {
        if let Some(value) = attribute.value()
            && let Ok(complex) = value.as_complex()
            && let Some(sub) = complex.sub_attribute(sub_name)
            && let Some(sub_value) = sub.value()
        {
            out.push((sub.descriptor().is_case_exact(), sub_value));
        }
    } else if let Some(value) = attribute.value() {
        out.push((descriptor.is_case_exact(), value));
    }
    out
}

/// The value an object sorts by for a given path: the first candidate in
/// document order, with its `caseExact` flag.
pub(crate) fn sort_key<'a>(
    object: &'a ScimObject,
    path: &AttrPath,
) -> Option<(bool, &'a ScimValue)> {
    candidates(object, path).into_iter().next()
}

/// Narrow a complex or plural attribute to the named sub-attributes, for
/// `attributes=` projection. Returns `None` when nothing survives.
pub(crate) fn narrow_to_subs(
    attribute: &crate::resource::ScimAttribute,
    subs: &[&str],
) -> Option<crate::resource::ScimAttribute> {
    use crate::resource::{ComplexValue, ScimAttribute};

    let descriptor = attribute.descriptor().clone();
    let narrow = |value: &ScimValue| -> Option<ScimValue> {
        let complex = value.as_complex().ok()?;
        let mut narrowed = ComplexValue::new();
        for sub in complex.iter() {
            if subs.iter().any(|s| s.eq_ignore_ascii_case(sub.name())) {
                narrowed.set(sub.clone());
            }
        }
        if narrowed.is_empty() {
            None
        } else {
            Some(ScimValue::Complex(narrowed))
        }
    };

    if descriptor.is_multi_valued() {
        let elements: Vec<ScimValue> = attribute.values().iter().filter_map(narrow).collect();
        if elements.is_empty() {
            return None;
        }
        ScimAttribute::plural(descriptor, elements).ok()
    } else {
        let narrowed = narrow(attribute.value()?)?;
        ScimAttribute::singular(descriptor, narrowed).ok()
    }
}

fn compare(candidate: &ScimValue, op: CompareOp, literal: &FilterValue, case_exact: bool) -> bool {
    match (candidate, literal) {
        (ScimValue::String(have), FilterValue::Str(want)) => {
            compare_strings(have, want, op, case_exact)
        }
        (ScimValue::DateTime(have), FilterValue::Str(want)) => {
            match DateTime::parse_from_rfc3339(want) {
                Ok(want) => ordering_matches(op, have.cmp(&want.with_timezone(&Utc))),
                Err(_) => false,
            }
        }
        (ScimValue::Integer(have), FilterValue::Number(want)) => {
            ordering_matches(op, have.cmp(want))
        }
        (ScimValue::Boolean(have), FilterValue::Bool(want)) => {
            op == CompareOp::Eq && have == want
        }
        // Type mismatch evaluates to false, not error.
        _ => false,
    }
}

fn compare_strings(have: &str, want: &str, op: CompareOp, case_exact: bool) -> bool {
    let (have, want) = if case_exact {
        (have.to_string(), want.to_string())
    } else {
        (have.to_lowercase(), want.to_lowercase())
    };
    match op {
        CompareOp::Eq => have == want,
        CompareOp::Co => have.contains(&want),
        CompareOp::Sw => have.starts_with(&want),
        CompareOp::Ew => have.ends_with(&want),
        _ => ordering_matches(op, have.cmp(&want)),
    }
}

fn ordering_matches(op: CompareOp, ordering: Ordering) -> bool {
    match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
        // Substring operators never reach here.
        CompareOp::Co | CompareOp::Sw | CompareOp::Ew => false,
    }
}

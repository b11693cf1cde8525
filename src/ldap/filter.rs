//! Translation of SCIM filter expressions to RFC 4515 LDAP search filters.
//!
//! Combinators map directly; `gt`/`lt` have no LDAP equivalent and expand to
//! `(&(>=)(!(=)))` / `(&(<=)(!(=)))`. A predicate over an unmapped attribute
//! becomes a match-nothing filter, so `pr` on an unmapped attribute returns
//! the empty set rather than erroring.

use ldap3::ldap_escape;

use crate::filter::{CompareOp, FilterExpr, FilterValue};

use super::config::ValueTransform;
use super::mapper::LdapMapper;

/// A filter no entry matches, used for unmapped attribute paths.
const MATCH_NOTHING: &str = "(!(objectClass=*))";

/// Translate a SCIM filter expression into an LDAP search filter.
pub fn to_ldap_filter(expr: &FilterExpr, mapper: &LdapMapper) -> String {
    match expr {
        FilterExpr::And(terms) => combine('&', terms, mapper),
        FilterExpr::Or(terms) => combine('|', terms, mapper),
        FilterExpr::Present(path) => {
            any_of(mapper.map_path(path), |(attr, _)| format!("({attr}=*)"))
        }
        FilterExpr::Compare { path, op, value } => {
            any_of(mapper.map_path(path), |(attr, transform)| {
                predicate(&attr, transform, *op, value)
            })
        }
    }
}

fn combine(op: char, terms: &[FilterExpr], mapper: &LdapMapper) -> String {
    let inner: String = terms.iter().map(|t| to_ldap_filter(t, mapper)).collect();
    format!("({op}{inner})")
}

/// A path can fan out to several LDAP attributes (one per canonical type);
/// any of them matching satisfies the predicate.
fn any_of<F>(attrs: Vec<(String, ValueTransform)>, f: F) -> String
where
    F: Fn((String, ValueTransform)) -> String,
{
    match attrs.len() {
        0 => MATCH_NOTHING.to_string(),
        1 => f(attrs.into_iter().next().expect("one attribute")),
        _ => {
            let inner: String = attrs.into_iter().map(f).collect();
            format!("(|{inner})")
        }
    }
}

fn predicate(attr: &str, transform: ValueTransform, op: CompareOp, value: &FilterValue) -> String {
    let raw = match value {
        FilterValue::Str(s) => transform.to_filter_literal(s),
        FilterValue::Number(n) => n.to_string(),
        FilterValue::Bool(b) => transform.to_filter_literal(&b.to_string()),
    };
    let escaped = ldap_escape(raw.as_str());
    match op {
        CompareOp::Eq => format!("({attr}={escaped})"),
        CompareOp::Co => format!("({attr}=*{escaped}*)"),
        CompareOp::Sw => format!("({attr}={escaped}*)"),
        CompareOp::Ew => format!("({attr}=*{escaped})"),
        CompareOp::Ge => format!("({attr}>={escaped})"),
        CompareOp::Le => format!("({attr}<={escaped})"),
        // LDAP has no strict inequalities.
        CompareOp::Gt => format!("(&({attr}>={escaped})(!({attr}={escaped})))"),
        CompareOp::Lt => format!("(&({attr}<={escaped})(!({attr}={escaped})))"),
    }
}

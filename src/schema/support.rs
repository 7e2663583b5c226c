//! Helpers shared by filter evaluation: resolving a path against a JSON
//! resource and comparing JSON scalars the way SCIM prescribes.

use std::cmp::Ordering;

use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value};

use crate::error::AppResult;
use crate::filter::evaluator::Evaluator;
use crate::filter::Filter;
use crate::path::Path;
use crate::schema::definitions::{AttributeDefinition, SCIM_SCHEMA_CORE_USER};
use crate::utils::parse_scim_datetime;

/// Returns every JSON node addressed by `path` within `node`.
///
/// Arrays met before the last path element are traversed, so `emails.value`
/// yields one node per email. An array addressed by the last element is
/// returned whole; with a value filter on that element only the matching
/// elements are returned. Missing attributes contribute nothing.
pub fn match_path<'v>(path: &Path, node: &'v Value) -> AppResult<Vec<&'v Value>> {
    match_path_with(path, node, &Evaluator::default())
}

/// Like [`match_path`], evaluating value filters with `evaluator`.
pub fn match_path_with<'v>(
    path: &Path,
    node: &'v Value,
    evaluator: &Evaluator<'_>,
) -> AppResult<Vec<&'v Value>> {
    let mut values = Vec::new();
    match node {
        Value::Object(object) => {
            if path.is_root() && path.namespace().is_none() {
                values.push(node);
            } else {
                traverse(evaluator, object, 0, path, &mut values)?;
            }
        }
        _ if path.is_root() && path.namespace().is_none() => values.push(node),
        _ => {}
    }
    Ok(values)
}

fn traverse<'v>(
    evaluator: &Evaluator<'_>,
    object: &'v Map<String, Value>,
    index: usize,
    path: &Path,
    values: &mut Vec<&'v Value>,
) -> AppResult<()> {
    // with a namespace, level 0 is the extension object keyed by its URN
    let (field, filter, depth, element_len) = match path.namespace() {
        Some(namespace) if index == 0 => (namespace, None, path.len() + 1, 0),
        Some(_) => {
            let element = path.element(index - 1);
            (
                element.map_or("", |e| e.attribute()),
                element.and_then(|e| e.filter()),
                path.len() + 1,
                index,
            )
        }
        None => {
            let element = path.element(index);
            (
                element.map_or("", |e| e.attribute()),
                element.and_then(|e| e.filter()),
                path.len(),
                index + 1,
            )
        }
    };

    let child = match field_value(object, field) {
        Some(child) => child,
        // core attributes may carry their schema URN but sit at the top level
        None if index == 0 && is_core_namespace(path) => {
            return traverse(evaluator, object, index + 1, path, values);
        }
        None => return Ok(()),
    };

    if index + 1 < depth {
        match child {
            Value::Array(items) => {
                for item in items {
                    if let Value::Object(inner) = item {
                        if matches_element(evaluator, path, element_len, filter, item)? {
                            traverse(evaluator, inner, index + 1, path, values)?;
                        }
                    }
                }
            }
            Value::Object(inner) => traverse(evaluator, inner, index + 1, path, values)?,
            _ => {}
        }
    } else {
        match (child, filter) {
            (Value::Array(items), Some(_)) => {
                for item in items {
                    if matches_element(evaluator, path, element_len, filter, item)? {
                        values.push(item);
                    }
                }
            }
            _ => values.push(child),
        }
    }
    Ok(())
}

fn matches_element(
    evaluator: &Evaluator<'_>,
    path: &Path,
    element_len: usize,
    filter: Option<&Filter>,
    item: &Value,
) -> AppResult<bool> {
    match filter {
        Some(filter) => {
            let scope = path.sub(element_len)?;
            evaluator.nested(&scope).evaluate(filter, item)
        }
        None => Ok(true),
    }
}

fn is_core_namespace(path: &Path) -> bool {
    path.namespace()
        .map_or(false, |n| n.eq_ignore_ascii_case(SCIM_SCHEMA_CORE_USER))
}

/// Attribute names are case-insensitive; an exact key match wins.
fn field_value<'v>(object: &'v Map<String, Value>, field: &str) -> Option<&'v Value> {
    object.get(field).or_else(|| {
        object
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(field))
            .map(|(_, value)| value)
    })
}

/// Compares two JSON values.
///
/// Text that parses as a dateTime on both sides is compared chronologically,
/// other text honours the attribute's `caseExact` flag. Numbers compare
/// numerically. Anything else is compared by its text form.
pub fn compare_values(lhs: &Value, rhs: &Value, definition: Option<&AttributeDefinition>) -> Ordering {
    match (lhs, rhs) {
        (Value::String(l), Value::String(r)) => {
            if let (Some(d1), Some(d2)) = (date_value(l), date_value(r)) {
                return d1.cmp(&d2);
            }
            if definition.map_or(false, |d| d.case_exact) {
                l.cmp(r)
            } else {
                l.to_lowercase().cmp(&r.to_lowercase())
            }
        }
        (Value::Number(l), Value::Number(r)) => {
            if let (Some(a), Some(b)) = (l.as_i64(), r.as_i64()) {
                return a.cmp(&b);
            }
            if let (Some(a), Some(b)) = (l.as_u64(), r.as_u64()) {
                return a.cmp(&b);
            }
            let a = l.as_f64().unwrap_or(f64::NAN);
            let b = r.as_f64().unwrap_or(f64::NAN);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        _ => text_of(lhs).cmp(&text_of(rhs)),
    }
}

/// Parses a SCIM dateTime, returning `None` when the text is not one.
pub fn date_value(text: &str) -> Option<DateTime<FixedOffset>> {
    parse_scim_datetime(text)
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => String::new(),
    }
}

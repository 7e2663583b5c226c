//! Matching filters against JSON resources.

use std::cmp::Ordering;

use serde_json::Value;
use tracing::trace;

use crate::error::{AppError, AppResult};
use crate::filter::{Filter, FilterType, ScalarValue, Visitor};
use crate::path::Path;
use crate::schema::definitions::AttributeDefinition;
use crate::schema::support::{compare_values, match_path_with};

/// Supplies attribute definitions, which decide case sensitivity and which
/// values may be ordered.
pub trait AttributeResolver {
    fn definition(&self, path: &Path) -> Option<&AttributeDefinition>;
}

/// Resolver without any definitions: every attribute is case-insensitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDefinitions;

impl AttributeResolver for NoDefinitions {
    fn definition(&self, _path: &Path) -> Option<&AttributeDefinition> {
        None
    }
}

static NO_DEFINITIONS: NoDefinitions = NoDefinitions;

/// Decides whether a JSON resource matches a filter.
///
/// An evaluator holds no mutable state; one instance can be shared freely.
/// Within a value filter (`emails[type eq "work"]`) it is re-scoped to the
/// enclosing attribute so definitions resolve as `emails.type`.
#[derive(Clone)]
pub struct Evaluator<'r> {
    resolver: &'r dyn AttributeResolver,
    scope: Path,
}

impl Default for Evaluator<'static> {
    fn default() -> Self {
        Self {
            resolver: &NO_DEFINITIONS,
            scope: Path::root(),
        }
    }
}

/// Evaluate `filter` against `node` without attribute definitions.
pub fn evaluate(filter: &Filter, node: &Value) -> AppResult<bool> {
    Evaluator::default().evaluate(filter, node)
}

impl<'r> Evaluator<'r> {
    pub fn new(resolver: &'r dyn AttributeResolver) -> Self {
        Self {
            resolver,
            scope: Path::root(),
        }
    }

    pub fn evaluate(&self, filter: &Filter, node: &Value) -> AppResult<bool> {
        trace!(filter = %filter, "evaluating filter");
        filter.accept(self, node)
    }

    /// An evaluator for filters nested below `path`.
    pub fn nested(&self, path: &Path) -> Evaluator<'r> {
        Self {
            resolver: self.resolver,
            scope: self.scoped(path),
        }
    }

    fn scoped(&self, path: &Path) -> Path {
        if self.scope.is_root() && self.scope.namespace().is_none() {
            path.without_filters()
        } else {
            self.scope.append(&path.without_filters())
        }
    }

    fn definition(&self, path: &Path) -> Option<&AttributeDefinition> {
        self.resolver.definition(&self.scoped(path))
    }

    fn candidates<'v>(&self, path: &Path, node: &'v Value) -> AppResult<Vec<&'v Value>> {
        match node {
            Value::Array(items) => Ok(items.iter().collect()),
            Value::Object(_) => {
                let mut candidates = Vec::new();
                for matched in match_path_with(path, node, self)? {
                    match matched {
                        Value::Array(items) => candidates.extend(items.iter()),
                        other => candidates.push(other),
                    }
                }
                Ok(candidates)
            }
            _ if path.is_self_value() => Ok(vec![node]),
            _ => Ok(Vec::new()),
        }
    }

    fn compare(
        &self,
        filter_type: FilterType,
        node: &Value,
        path: &Path,
        value: &ScalarValue,
        accept: fn(Ordering) -> bool,
    ) -> AppResult<bool> {
        let definition = self.definition(path);
        let unordered = definition.map_or(false, |d| !d.attr_type.is_ordered());
        let operand = value.to_json();

        let mut matched = false;
        for candidate in self.candidates(path, node)? {
            if candidate.is_boolean() || unordered {
                return Err(AppError::InvalidFilter(format!(
                    "'{}' filter may not compare boolean or binary attribute values",
                    filter_type
                )));
            }
            if is_scalar(candidate) && accept(compare_values(candidate, &operand, definition)) {
                matched = true;
            }
        }
        Ok(matched)
    }

    fn substring(
        &self,
        node: &Value,
        path: &Path,
        value: &ScalarValue,
        accept: fn(&str, &str) -> bool,
    ) -> AppResult<bool> {
        let definition = self.definition(path);
        let case_exact = definition.map_or(false, |d| d.case_exact);
        let operand = value.to_json();

        for candidate in self.candidates(path, node)? {
            let matched = match (candidate, value) {
                (Value::String(text), ScalarValue::Text(pattern)) => {
                    if case_exact {
                        accept(text, pattern)
                    } else {
                        accept(&text.to_lowercase(), &pattern.to_lowercase())
                    }
                }
                _ => {
                    is_scalar(candidate)
                        && compare_values(candidate, &operand, definition) == Ordering::Equal
                }
            };
            if matched {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Null, or an array holding nothing but empty values. SCIM treats such an
/// attribute the same as one that is not there.
fn is_empty(node: &Value) -> bool {
    match node {
        Value::Null => true,
        Value::Array(items) => items.iter().all(is_empty),
        _ => false,
    }
}

fn is_scalar(node: &Value) -> bool {
    !matches!(node, Value::Null | Value::Array(_) | Value::Object(_))
}

impl<'r, 'v> Visitor<bool, &'v Value> for Evaluator<'r> {
    fn and(&self, node: &'v Value, filters: &[Filter]) -> AppResult<bool> {
        for filter in filters {
            if !self.evaluate(filter, node)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn or(&self, node: &'v Value, filters: &[Filter]) -> AppResult<bool> {
        for filter in filters {
            if self.evaluate(filter, node)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn not(&self, node: &'v Value, filter: &Filter) -> AppResult<bool> {
        Ok(!self.evaluate(filter, node)?)
    }

    fn present(&self, node: &'v Value, path: &Path) -> AppResult<bool> {
        Ok(self.candidates(path, node)?.into_iter().any(|c| !is_empty(c)))
    }

    fn equals(&self, node: &'v Value, path: &Path, value: &ScalarValue) -> AppResult<bool> {
        let candidates = self.candidates(path, node)?;
        if value.is_null() {
            return Ok(candidates.into_iter().all(is_empty));
        }
        let definition = self.definition(path);
        let operand = value.to_json();
        Ok(candidates.into_iter().any(|c| {
            is_scalar(c) && compare_values(c, &operand, definition) == Ordering::Equal
        }))
    }

    fn not_equals(&self, node: &'v Value, path: &Path, value: &ScalarValue) -> AppResult<bool> {
        Ok(!self.equals(node, path, value)?)
    }

    fn greater_than(&self, node: &'v Value, path: &Path, value: &ScalarValue) -> AppResult<bool> {
        self.compare(FilterType::Gt, node, path, value, |o| o == Ordering::Greater)
    }

    fn greater_than_or_equal(
        &self,
        node: &'v Value,
        path: &Path,
        value: &ScalarValue,
    ) -> AppResult<bool> {
        self.compare(FilterType::Ge, node, path, value, |o| o != Ordering::Less)
    }

    fn less_than(&self, node: &'v Value, path: &Path, value: &ScalarValue) -> AppResult<bool> {
        self.compare(FilterType::Lt, node, path, value, |o| o == Ordering::Less)
    }

    fn less_than_or_equal(
        &self,
        node: &'v Value,
        path: &Path,
        value: &ScalarValue,
    ) -> AppResult<bool> {
        self.compare(FilterType::Le, node, path, value, |o| o != Ordering::Greater)
    }

    fn starts_with(&self, node: &'v Value, path: &Path, value: &ScalarValue) -> AppResult<bool> {
        self.substring(node, path, value, |text, pattern| text.starts_with(pattern))
    }

    fn ends_with(&self, node: &'v Value, path: &Path, value: &ScalarValue) -> AppResult<bool> {
        self.substring(node, path, value, |text, pattern| text.ends_with(pattern))
    }

    fn contains(&self, node: &'v Value, path: &Path, value: &ScalarValue) -> AppResult<bool> {
        self.substring(node, path, value, |text, pattern| text.contains(pattern))
    }

    fn complex(&self, node: &'v Value, path: &Path, filter: &Filter) -> AppResult<bool> {
        let nested = self.nested(path);
        for candidate in self.candidates(path, node)? {
            let matched = match candidate {
                Value::Array(items) => {
                    let mut any = false;
                    for item in items {
                        if nested.evaluate(filter, item)? {
                            any = true;
                            break;
                        }
                    }
                    any
                }
                other => nested.evaluate(filter, other)?,
            };
            if matched {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

//! SCIM filter expressions (RFC 7644 section 3.4.2.2).

pub mod evaluator;
pub mod translator;
pub mod value;

use std::fmt;

use crate::error::{AppError, AppResult};
use crate::parser::filter_parser::parse_filter;
use crate::path::Path;

pub use evaluator::{AttributeResolver, Evaluator, NoDefinitions};
pub use translator::{translate, FilterTranslator};
pub use value::ScalarValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterType {
    And,
    Or,
    Not,
    Complex,
    Eq,
    Ne,
    Co,
    Sw,
    Ew,
    Pr,
    Gt,
    Ge,
    Lt,
    Le,
}

impl FilterType {
    /// The operator keyword as written in filter text.
    pub fn value(&self) -> &'static str {
        match self {
            FilterType::And => "and",
            FilterType::Or => "or",
            FilterType::Not => "not",
            FilterType::Complex => "complex",
            FilterType::Eq => "eq",
            FilterType::Ne => "ne",
            FilterType::Co => "co",
            FilterType::Sw => "sw",
            FilterType::Ew => "ew",
            FilterType::Pr => "pr",
            FilterType::Gt => "gt",
            FilterType::Ge => "ge",
            FilterType::Lt => "lt",
            FilterType::Le => "le",
        }
    }

    pub fn from_str(value: &str) -> AppResult<Self> {
        let kind = match value.to_ascii_lowercase().as_str() {
            "and" => FilterType::And,
            "or" => FilterType::Or,
            "not" => FilterType::Not,
            "complex" => FilterType::Complex,
            "eq" => FilterType::Eq,
            "ne" => FilterType::Ne,
            "co" => FilterType::Co,
            "sw" => FilterType::Sw,
            "ew" => FilterType::Ew,
            "pr" => FilterType::Pr,
            "gt" => FilterType::Gt,
            "ge" => FilterType::Ge,
            "lt" => FilterType::Lt,
            "le" => FilterType::Le,
            _ => {
                return Err(AppError::FilterParse(format!(
                    "Unrecognized operator: {}",
                    value
                )))
            }
        };
        Ok(kind)
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl ComparisonOp {
    pub fn filter_type(&self) -> FilterType {
        match self {
            ComparisonOp::Eq => FilterType::Eq,
            ComparisonOp::Ne => FilterType::Ne,
            ComparisonOp::Gt => FilterType::Gt,
            ComparisonOp::Ge => FilterType::Ge,
            ComparisonOp::Lt => FilterType::Lt,
            ComparisonOp::Le => FilterType::Le,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubstringOp {
    StartsWith,
    EndsWith,
    Contains,
}

impl SubstringOp {
    pub fn filter_type(&self) -> FilterType {
        match self {
            SubstringOp::StartsWith => FilterType::Sw,
            SubstringOp::EndsWith => FilterType::Ew,
            SubstringOp::Contains => FilterType::Co,
        }
    }
}

/// A filter expression tree.
///
/// `And(vec![])` matches everything and `Or(vec![])` matches nothing.
/// Trees are immutable once built; the constructors below are the usual way
/// to create them and collapse degenerate `and`/`or` input.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Presence(Path),
    Comparison {
        op: ComparisonOp,
        path: Path,
        value: ScalarValue,
    },
    Substring {
        op: SubstringOp,
        path: Path,
        value: ScalarValue,
    },
    /// A value filter applied to each element of a multi-valued attribute:
    /// `emails[type eq "work"]`.
    Complex { path: Path, filter: Box<Filter> },
}

/// One method per kind of filter node. [`Filter::accept`] calls exactly one
/// of them and hands back its result.
pub trait Visitor<R, P> {
    fn and(&self, parameter: P, filters: &[Filter]) -> AppResult<R>;
    fn or(&self, parameter: P, filters: &[Filter]) -> AppResult<R>;
    fn not(&self, parameter: P, filter: &Filter) -> AppResult<R>;
    fn present(&self, parameter: P, path: &Path) -> AppResult<R>;
    fn equals(&self, parameter: P, path: &Path, value: &ScalarValue) -> AppResult<R>;
    fn not_equals(&self, parameter: P, path: &Path, value: &ScalarValue) -> AppResult<R>;
    fn greater_than(&self, parameter: P, path: &Path, value: &ScalarValue) -> AppResult<R>;
    fn greater_than_or_equal(&self, parameter: P, path: &Path, value: &ScalarValue)
        -> AppResult<R>;
    fn less_than(&self, parameter: P, path: &Path, value: &ScalarValue) -> AppResult<R>;
    fn less_than_or_equal(&self, parameter: P, path: &Path, value: &ScalarValue) -> AppResult<R>;
    fn starts_with(&self, parameter: P, path: &Path, value: &ScalarValue) -> AppResult<R>;
    fn ends_with(&self, parameter: P, path: &Path, value: &ScalarValue) -> AppResult<R>;
    fn contains(&self, parameter: P, path: &Path, value: &ScalarValue) -> AppResult<R>;
    fn complex(&self, parameter: P, path: &Path, filter: &Filter) -> AppResult<R>;
}

impl Filter {
    pub fn filter_type(&self) -> FilterType {
        match self {
            Filter::And(_) => FilterType::And,
            Filter::Or(_) => FilterType::Or,
            Filter::Not(_) => FilterType::Not,
            Filter::Presence(_) => FilterType::Pr,
            Filter::Comparison { op, .. } => op.filter_type(),
            Filter::Substring { op, .. } => op.filter_type(),
            Filter::Complex { .. } => FilterType::Complex,
        }
    }

    /// The attribute path of a leaf or complex filter.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Filter::Presence(path)
            | Filter::Comparison { path, .. }
            | Filter::Substring { path, .. }
            | Filter::Complex { path, .. } => Some(path),
            Filter::And(_) | Filter::Or(_) | Filter::Not(_) => None,
        }
    }

    /// The comparison operand of a comparison or substring filter.
    pub fn value(&self) -> Option<&ScalarValue> {
        match self {
            Filter::Comparison { value, .. } | Filter::Substring { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, Filter::Complex { .. })
    }

    pub fn accept<R, P, V>(&self, visitor: &V, parameter: P) -> AppResult<R>
    where
        V: Visitor<R, P> + ?Sized,
    {
        match self {
            Filter::And(filters) => visitor.and(parameter, filters),
            Filter::Or(filters) => visitor.or(parameter, filters),
            Filter::Not(filter) => visitor.not(parameter, filter),
            Filter::Presence(path) => visitor.present(parameter, path),
            Filter::Comparison { op, path, value } => match op {
                ComparisonOp::Eq => visitor.equals(parameter, path, value),
                ComparisonOp::Ne => visitor.not_equals(parameter, path, value),
                ComparisonOp::Gt => visitor.greater_than(parameter, path, value),
                ComparisonOp::Ge => visitor.greater_than_or_equal(parameter, path, value),
                ComparisonOp::Lt => visitor.less_than(parameter, path, value),
                ComparisonOp::Le => visitor.less_than_or_equal(parameter, path, value),
            },
            Filter::Substring { op, path, value } => match op {
                SubstringOp::StartsWith => visitor.starts_with(parameter, path, value),
                SubstringOp::EndsWith => visitor.ends_with(parameter, path, value),
                SubstringOp::Contains => visitor.contains(parameter, path, value),
            },
            Filter::Complex { path, filter } => visitor.complex(parameter, path, filter),
        }
    }

    /// Parse a filter expression.
    pub fn from(expression: &str) -> AppResult<Filter> {
        parse_filter(expression)
    }

    /// Conjunction of `filters`: `None` when empty, the filter itself when
    /// there is only one.
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Option<Filter> {
        let mut filters: Vec<Filter> = filters.into_iter().collect();
        match filters.len() {
            0 => None,
            1 => filters.pop(),
            _ => Some(Filter::And(filters)),
        }
    }

    /// Disjunction of `filters`: `None` when empty, the filter itself when
    /// there is only one.
    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Option<Filter> {
        let mut filters: Vec<Filter> = filters.into_iter().collect();
        match filters.len() {
            0 => None,
            1 => filters.pop(),
            _ => Some(Filter::Or(filters)),
        }
    }

    pub fn and_pair(lhs: Filter, rhs: Filter) -> Filter {
        Filter::And(vec![lhs, rhs])
    }

    pub fn not(filter: Filter) -> Filter {
        Filter::Not(Box::new(filter))
    }

    pub fn pr(path: &str) -> AppResult<Filter> {
        Ok(Filter::Presence(Path::from(path)?))
    }

    pub fn eq(path: &str, value: impl Into<ScalarValue>) -> AppResult<Filter> {
        Ok(Self::comparison(ComparisonOp::Eq, Path::from(path)?, value.into()))
    }

    /// `ne` is expressed as the negation of `eq`.
    pub fn ne(path: &str, value: impl Into<ScalarValue>) -> AppResult<Filter> {
        Ok(Filter::not(Self::eq(path, value)?))
    }

    pub fn gt(path: &str, value: impl Into<ScalarValue>) -> AppResult<Filter> {
        Ok(Self::comparison(ComparisonOp::Gt, Path::from(path)?, value.into()))
    }

    pub fn ge(path: &str, value: impl Into<ScalarValue>) -> AppResult<Filter> {
        Ok(Self::comparison(ComparisonOp::Ge, Path::from(path)?, value.into()))
    }

    pub fn lt(path: &str, value: impl Into<ScalarValue>) -> AppResult<Filter> {
        Ok(Self::comparison(ComparisonOp::Lt, Path::from(path)?, value.into()))
    }

    pub fn le(path: &str, value: impl Into<ScalarValue>) -> AppResult<Filter> {
        Ok(Self::comparison(ComparisonOp::Le, Path::from(path)?, value.into()))
    }

    pub fn sw(path: &str, value: impl Into<ScalarValue>) -> AppResult<Filter> {
        Ok(Self::substring(SubstringOp::StartsWith, Path::from(path)?, value.into()))
    }

    pub fn ew(path: &str, value: impl Into<ScalarValue>) -> AppResult<Filter> {
        Ok(Self::substring(SubstringOp::EndsWith, Path::from(path)?, value.into()))
    }

    pub fn co(path: &str, value: impl Into<ScalarValue>) -> AppResult<Filter> {
        Ok(Self::substring(SubstringOp::Contains, Path::from(path)?, value.into()))
    }

    pub fn complex(path: &str, filter: Filter) -> AppResult<Filter> {
        Ok(Self::complex_path(Path::from(path)?, filter))
    }

    /// `complex("emails", "type eq \"work\"")` is `emails[type eq "work"]`.
    pub fn complex_expr(path: &str, expression: &str) -> AppResult<Filter> {
        Self::complex(path, Filter::from(expression)?)
    }

    pub fn presence(path: Path) -> Filter {
        Filter::Presence(path)
    }

    pub fn comparison(op: ComparisonOp, path: Path, value: ScalarValue) -> Filter {
        Filter::Comparison { op, path, value }
    }

    pub fn substring(op: SubstringOp, path: Path, value: ScalarValue) -> Filter {
        Filter::Substring { op, path, value }
    }

    pub fn complex_path(path: Path, filter: Filter) -> Filter {
        Filter::Complex {
            path,
            filter: Box::new(filter),
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::And(filters) | Filter::Or(filters) if filters.len() > 1 => {
                write!(f, "({})", self)
            }
            _ => write!(f, "{}", self),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::And(filters) | Filter::Or(filters) => {
                if filters.is_empty() {
                    // no textual form; render the identity as an empty group
                    return write!(f, "()");
                }
                let keyword = self.filter_type().value();
                for (i, filter) in filters.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", keyword)?;
                    }
                    filter.fmt_operand(f)?;
                }
                Ok(())
            }
            Filter::Not(filter) => write!(f, "not ({})", filter),
            Filter::Presence(path) => write!(f, "{} pr", path),
            Filter::Comparison { op, path, value } => {
                write!(f, "{} {} {}", path, op.filter_type(), value)
            }
            Filter::Substring { op, path, value } => {
                write!(f, "{} {} {}", path, op.filter_type(), value)
            }
            Filter::Complex { path, filter } => write!(f, "{}[{}]", path, filter),
        }
    }
}

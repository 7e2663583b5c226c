//! Attribute paths as used by SCIM filters and PATCH operations.
//!
//! A path is an optional schema URN followed by dot-separated attribute
//! names, each of which may carry a value filter selecting elements of a
//! multi-valued attribute: `urn:...:enterprise:2.0:User:manager.value`,
//! `emails[type eq "work"].value`.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{AppError, AppResult};
use crate::filter::Filter;
use crate::parser::path_parser;
use crate::schema::is_schema_urn;

/// The attribute name that refers to the value of a plain multi-valued
/// attribute inside a value filter, e.g. `tags[value eq "x"]`.
pub const SELF_VALUE: &str = "value";

#[derive(Debug, Clone)]
pub struct PathElement {
    attribute: String,
    filter: Option<Filter>,
}

impl PathElement {
    pub fn new(attribute: impl Into<String>, filter: Option<Filter>) -> Self {
        Self {
            attribute: attribute.into(),
            filter,
        }
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }
}

impl PartialEq for PathElement {
    fn eq(&self, other: &Self) -> bool {
        self.attribute.eq_ignore_ascii_case(&other.attribute) && self.filter == other.filter
    }
}

impl Hash for PathElement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // the filter only takes part in equality; names are case-insensitive
        self.attribute.to_ascii_lowercase().hash(state);
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.attribute)?;
        if let Some(filter) = &self.filter {
            write!(f, "[{}]", filter)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Path {
    namespace: Option<String>,
    elements: Vec<PathElement>,
}

impl Path {
    /// The empty path, addressing the resource itself.
    pub fn root() -> Self {
        Self::default()
    }

    /// The root of an extension schema.
    pub fn with_namespace(namespace: &str) -> AppResult<Self> {
        if !is_schema_urn(namespace) {
            return Err(AppError::InvalidPath(format!(
                "Invalid extension schema URN: {}",
                namespace
            )));
        }
        Ok(Self {
            namespace: Some(namespace.to_string()),
            elements: Vec::new(),
        })
    }

    /// A single attribute in the core schema.
    pub fn attribute_path(attribute: impl Into<String>) -> Self {
        Self::root().attribute(attribute)
    }

    /// Parse a path expression such as `name.givenName` or
    /// `emails[type eq "work"].value`.
    pub fn from(expression: &str) -> AppResult<Self> {
        path_parser::parse_path(expression)
    }

    pub fn is_root(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn element(&self, index: usize) -> Option<&PathElement> {
        self.elements.get(index)
    }

    pub fn last(&self) -> Option<&PathElement> {
        self.elements.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathElement> {
        self.elements.iter()
    }

    /// True for the bare `value` path that addresses a scalar element of a
    /// multi-valued attribute.
    pub fn is_self_value(&self) -> bool {
        self.namespace.is_none()
            && self.elements.len() == 1
            && self
                .last()
                .map_or(false, |e| e.filter.is_none() && e.attribute.eq_ignore_ascii_case(SELF_VALUE))
    }

    pub fn attribute(&self, attribute: impl Into<String>) -> Self {
        self.push(PathElement::new(attribute, None))
    }

    pub fn attribute_with_filter(&self, attribute: impl Into<String>, filter: Filter) -> Self {
        self.push(PathElement::new(attribute, Some(filter)))
    }

    /// Append the elements of `other`, keeping this path's namespace.
    pub fn append(&self, other: &Path) -> Self {
        let mut elements = self.elements.clone();
        elements.extend(other.elements.iter().cloned());
        Self {
            namespace: self.namespace.clone(),
            elements,
        }
    }

    /// The first `len` elements of this path.
    pub fn sub(&self, len: usize) -> AppResult<Self> {
        if len > self.elements.len() {
            return Err(AppError::InvalidPath(format!(
                "Index {} out of bounds for path {}",
                len, self
            )));
        }
        Ok(Self {
            namespace: self.namespace.clone(),
            elements: self.elements[..len].to_vec(),
        })
    }

    pub fn replace_attribute(&self, index: usize, attribute: impl Into<String>) -> AppResult<Self> {
        let current = self.checked_element(index)?;
        let filter = current.filter.clone();
        self.replace(index, PathElement::new(attribute, filter))
    }

    pub fn replace_filter(&self, index: usize, filter: Option<Filter>) -> AppResult<Self> {
        let current = self.checked_element(index)?;
        let attribute = current.attribute.clone();
        self.replace(index, PathElement::new(attribute, filter))
    }

    /// The same path with every element's value filter removed.
    pub fn without_filters(&self) -> Self {
        Self {
            namespace: self.namespace.clone(),
            elements: self
                .elements
                .iter()
                .map(|e| PathElement::new(e.attribute.clone(), None))
                .collect(),
        }
    }

    /// Dotted attribute names without namespace or filters, suitable for
    /// schema lookups (`emails.value`).
    pub fn attribute_names(&self) -> String {
        self.iter()
            .map(|e| e.attribute.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }

    fn push(&self, element: PathElement) -> Self {
        let mut elements = self.elements.clone();
        elements.push(element);
        Self {
            namespace: self.namespace.clone(),
            elements,
        }
    }

    fn replace(&self, index: usize, element: PathElement) -> AppResult<Self> {
        let mut elements = self.elements.clone();
        elements[index] = element;
        Ok(Self {
            namespace: self.namespace.clone(),
            elements,
        })
    }

    fn checked_element(&self, index: usize) -> AppResult<&PathElement> {
        self.elements.get(index).ok_or_else(|| {
            AppError::InvalidPath(format!("Index {} out of bounds for path {}", index, self))
        })
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        let namespace_eq = match (&self.namespace, &other.namespace) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            (None, None) => true,
            _ => false,
        };
        namespace_eq && self.elements == other.elements
    }
}

impl Hash for Path {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace.as_ref().map(|n| n.to_ascii_lowercase()).hash(state);
        self.elements.hash(state);
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(namespace) = &self.namespace {
            write!(f, "{}:", namespace)?;
        }
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", element)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a PathElement;
    type IntoIter = std::slice::Iter<'a, PathElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENTERPRISE: &str = "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User";

    #[test]
    fn test_build_and_display() {
        let path = Path::attribute_path("name").attribute("givenName");
        assert_eq!(path.to_string(), "name.givenName");
        assert_eq!(path.len(), 2);
        assert!(!path.is_root());
        assert!(Path::root().is_root());
    }

    #[test]
    fn test_namespace_display() {
        let path = Path::with_namespace(ENTERPRISE).unwrap().attribute("manager").attribute("value");
        assert_eq!(path.to_string(), format!("{}:manager.value", ENTERPRISE));
        assert_eq!(path.namespace(), Some(ENTERPRISE));
    }

    #[test]
    fn test_invalid_namespace() {
        assert!(matches!(Path::with_namespace("enterprise"), Err(AppError::InvalidPath(_))));
    }

    #[test]
    fn test_equality_ignores_case() {
        assert_eq!(Path::attribute_path("userName"), Path::attribute_path("USERNAME"));
        assert_ne!(Path::attribute_path("userName"), Path::attribute_path("displayName"));
    }

    #[test]
    fn test_self_value() {
        assert!(Path::attribute_path("value").is_self_value());
        assert!(Path::attribute_path("VALUE").is_self_value());
        assert!(!Path::attribute_path("emails").attribute("value").is_self_value());
        assert!(!Path::attribute_path("display").is_self_value());
        let filtered = Path::root().attribute_with_filter("value", Filter::pr("type").unwrap());
        assert!(!filtered.is_self_value());
    }

    #[test]
    fn test_sub_and_replace() {
        let path = Path::attribute_path("emails").attribute("value");
        assert_eq!(path.sub(1).unwrap(), Path::attribute_path("emails"));
        assert!(path.sub(3).is_err());

        let replaced = path.replace_attribute(1, "type").unwrap();
        assert_eq!(replaced.to_string(), "emails.type");
        assert!(path.replace_attribute(2, "type").is_err());
    }

    #[test]
    fn test_filters_on_elements() {
        let work = Filter::eq("type", "work").unwrap();
        let path = Path::root()
            .attribute_with_filter("emails", work.clone())
            .attribute("value");
        assert_eq!(path.to_string(), "emails[type eq \"work\"].value");
        assert_eq!(path.element(0).unwrap().filter(), Some(&work));

        let bare = path.without_filters();
        assert_eq!(bare.to_string(), "emails.value");
        assert_eq!(bare.attribute_names(), "emails.value");

        let cleared = path.replace_filter(0, None).unwrap();
        assert_eq!(cleared, bare);

        assert_eq!(path.last().unwrap().attribute(), "value");
        let filtered: Vec<&str> = path
            .iter()
            .filter(|e| e.filter().is_some())
            .map(|e| e.attribute())
            .collect();
        assert_eq!(filtered, vec!["emails"]);
        assert_eq!((&path).into_iter().count(), 2);
        assert!(Path::root().last().is_none());
    }

    #[test]
    fn test_append() {
        let path = Path::attribute_path("name").append(&Path::attribute_path("familyName"));
        assert_eq!(path.to_string(), "name.familyName");
    }
}

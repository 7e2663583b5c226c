//! SCIM 2.0 Schema Knowledge
//!
//! Attribute definitions consulted while evaluating filters: the data type
//! decides which comparisons are legal and `case_exact` decides how text is
//! compared. Any schema customization should be done here or through the
//! `schema` section of the configuration.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::filter::evaluator::AttributeResolver;
use crate::path::Path;

/// SCIM 2.0 Core Schema identifiers
pub const SCIM_SCHEMA_CORE_USER: &str = "urn:ietf:params:scim:schemas:core:2.0:User";
pub const SCIM_SCHEMA_ENTERPRISE_USER: &str =
    "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User";

/// Attribute type in SCIM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeType {
    String,
    Boolean,
    Integer,
    Decimal,
    DateTime,
    Reference,
    Binary,
    Complex,
}

impl AttributeType {
    /// Booleans and binary data have no ordering.
    pub fn is_ordered(&self) -> bool {
        !matches!(self, AttributeType::Boolean | AttributeType::Binary)
    }
}

/// Attribute definition, as far as filtering is concerned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    #[serde(default)]
    pub multi_valued: bool,
    #[serde(default)]
    pub case_exact: bool,
    #[serde(default)]
    pub sub_attributes: Vec<AttributeDefinition>,
}

impl AttributeDefinition {
    pub fn new(name: &str, attr_type: AttributeType) -> Self {
        Self {
            name: name.to_string(),
            attr_type,
            multi_valued: false,
            case_exact: false,
            sub_attributes: Vec::new(),
        }
    }

    pub fn case_exact(mut self) -> Self {
        self.case_exact = true;
        self
    }

    pub fn multi_valued(mut self) -> Self {
        self.multi_valued = true;
        self
    }

    pub fn with_sub_attributes(mut self, sub_attributes: Vec<AttributeDefinition>) -> Self {
        self.sub_attributes = sub_attributes;
        self
    }
}

/// Schema definition
#[derive(Debug, Clone)]
pub struct SchemaDefinition {
    pub id: String,
    pub name: String,
    pub attributes: Vec<AttributeDefinition>,
}

fn string(name: &str) -> AttributeDefinition {
    AttributeDefinition::new(name, AttributeType::String)
}

fn boolean(name: &str) -> AttributeDefinition {
    AttributeDefinition::new(name, AttributeType::Boolean)
}

fn date_time(name: &str) -> AttributeDefinition {
    AttributeDefinition::new(name, AttributeType::DateTime)
}

fn reference(name: &str) -> AttributeDefinition {
    AttributeDefinition::new(name, AttributeType::Reference)
}

/// A multi-valued complex attribute with the usual `value`/`display`/`type`/
/// `primary` sub-attributes.
fn multi_valued(name: &str, value: AttributeDefinition) -> AttributeDefinition {
    AttributeDefinition::new(name, AttributeType::Complex)
        .multi_valued()
        .with_sub_attributes(vec![value, string("display"), string("type"), boolean("primary")])
}

lazy_static! {
    /// User schema definition
    pub static ref USER_SCHEMA: SchemaDefinition = SchemaDefinition {
        id: SCIM_SCHEMA_CORE_USER.to_string(),
        name: "User".to_string(),
        attributes: vec![
            string("id").case_exact(),
            string("externalId").case_exact(),
            // Case-insensitive per RFC 7643
            string("userName"),
            AttributeDefinition::new("name", AttributeType::Complex).with_sub_attributes(vec![
                string("formatted"),
                string("familyName"),
                string("givenName"),
                string("middleName"),
                string("honorificPrefix"),
                string("honorificSuffix"),
            ]),
            string("displayName"),
            string("nickName"),
            reference("profileUrl"),
            string("title"),
            string("userType"),
            string("preferredLanguage"),
            string("locale"),
            string("timezone"),
            boolean("active"),
            string("password").case_exact(),
            multi_valued("emails", string("value")),
            multi_valued("phoneNumbers", string("value")),
            multi_valued("ims", string("value")),
            multi_valued("photos", reference("value")),
            AttributeDefinition::new("addresses", AttributeType::Complex)
                .multi_valued()
                .with_sub_attributes(vec![
                    string("formatted"),
                    string("streetAddress"),
                    string("locality"),
                    string("region"),
                    string("postalCode"),
                    string("country"),
                    string("type"),
                    boolean("primary"),
                ]),
            multi_valued("groups", string("value")),
            multi_valued("entitlements", string("value")),
            multi_valued("roles", string("value")),
            multi_valued(
                "x509Certificates",
                AttributeDefinition::new("value", AttributeType::Binary),
            ),
            AttributeDefinition::new("meta", AttributeType::Complex).with_sub_attributes(vec![
                string("resourceType").case_exact(),
                date_time("created"),
                date_time("lastModified"),
                reference("location").case_exact(),
                string("version").case_exact(),
            ]),
        ],
    };

    /// Enterprise User extension schema definition
    pub static ref ENTERPRISE_USER_SCHEMA: SchemaDefinition = SchemaDefinition {
        id: SCIM_SCHEMA_ENTERPRISE_USER.to_string(),
        name: "EnterpriseUser".to_string(),
        attributes: vec![
            string("employeeNumber"),
            string("costCenter"),
            string("organization"),
            string("division"),
            string("department"),
            AttributeDefinition::new("manager", AttributeType::Complex).with_sub_attributes(vec![
                string("value"),
                reference("$ref"),
                string("displayName"),
            ]),
        ],
    };
}

/// Find an attribute by dotted path (`emails.value`), case-insensitively.
pub fn find_attribute<'a>(
    schema: &'a SchemaDefinition,
    attr_path: &str,
) -> Option<&'a AttributeDefinition> {
    let parts: Vec<&str> = attr_path.split('.').collect();

    let mut current_attrs = &schema.attributes;
    let mut result = None;

    for (i, part) in parts.iter().enumerate() {
        let attr = current_attrs
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(part))?;
        result = Some(attr);
        if i < parts.len() - 1 {
            if attr.sub_attributes.is_empty() {
                return None;
            }
            current_attrs = &attr.sub_attributes;
        }
    }

    result
}

/// Resolves attribute definitions from a set of schemas. Paths without a
/// namespace are looked up in the first (core) schema.
#[derive(Debug, Clone)]
pub struct SchemaResolver {
    schemas: Vec<SchemaDefinition>,
}

impl SchemaResolver {
    pub fn new(schemas: Vec<SchemaDefinition>) -> Self {
        Self { schemas }
    }

    /// The built-in User schema plus the Enterprise User extension.
    pub fn builtin() -> Self {
        Self::new(vec![USER_SCHEMA.clone(), ENTERPRISE_USER_SCHEMA.clone()])
    }

    /// Replace or add top-level attributes of the core schema.
    pub fn with_overrides(mut self, overrides: &[AttributeDefinition]) -> Self {
        if let Some(core) = self.schemas.first_mut() {
            for definition in overrides {
                match core
                    .attributes
                    .iter_mut()
                    .find(|a| a.name.eq_ignore_ascii_case(&definition.name))
                {
                    Some(existing) => *existing = definition.clone(),
                    None => core.attributes.push(definition.clone()),
                }
            }
        }
        self
    }

    fn schema_for(&self, path: &Path) -> Option<&SchemaDefinition> {
        match path.namespace() {
            Some(namespace) => self
                .schemas
                .iter()
                .find(|s| s.id.eq_ignore_ascii_case(namespace)),
            None => self.schemas.first(),
        }
    }
}

impl Default for SchemaResolver {
    fn default() -> Self {
        Self::builtin()
    }
}

impl AttributeResolver for SchemaResolver {
    fn definition(&self, path: &Path) -> Option<&AttributeDefinition> {
        if path.is_root() {
            return None;
        }
        let schema = self.schema_for(path)?;
        find_attribute(schema, &path.attribute_names())
    }
}

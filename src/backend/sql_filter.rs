use chrono::Utc;
use std::fmt;

use tracing::debug;

use crate::config::{AppConfig, TranslatorConfig};
use crate::error::{AppError, AppResult};
use crate::filter::evaluator::AttributeResolver;
use crate::filter::{Filter, FilterTranslator, ScalarValue};
use crate::path::Path;
use crate::schema::{AttributeType, SchemaResolver, SCIM_SCHEMA_CORE_USER};
use crate::utils::{format_scim_datetime, parse_scim_datetime};

/// A parameterised SQL condition.
///
/// Placeholders are positional `?`, so combining two expressions is a matter
/// of concatenating their clauses and their parameters in the same order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SqlExpression {
    pub clause: String,
    pub params: Vec<String>,
}

impl SqlExpression {
    fn new(clause: String, params: Vec<String>) -> Self {
        Self { clause, params }
    }

    fn combine(lhs: &SqlExpression, rhs: &SqlExpression, operator: &str) -> Self {
        let mut params = lhs.params.clone();
        params.extend(rhs.params.iter().cloned());
        Self::new(
            format!("({} {} {})", lhs.clause, operator, rhs.clause),
            params,
        )
    }
}

impl fmt::Display for SqlExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.clause)?;
        if !self.params.is_empty() {
            write!(f, " {:?}", self.params)?;
        }
        Ok(())
    }
}

/// Column a SCIM attribute is stored in, and how it compares.
#[derive(Debug, Clone)]
struct Column {
    path: Path,
    name: String,
    case_exact: bool,
    attr_type: Option<AttributeType>,
}

/// Translates filters on a single table into SQL conditions.
///
/// Only attributes present in the configured column map are pushed down.
/// String columns that are not caseExact compare through `LOWER()`.
#[derive(Debug, Clone)]
pub struct SqlTranslator {
    table: String,
    columns: Vec<Column>,
    support_and: bool,
    support_or: bool,
}

impl SqlTranslator {
    pub fn new(config: &TranslatorConfig, resolver: &SchemaResolver) -> AppResult<Self> {
        let mut columns = Vec::with_capacity(config.columns.len());
        for (attribute, name) in &config.columns {
            let path = Path::from(attribute).map_err(|e| {
                AppError::Configuration(format!("Invalid column mapping for '{}': {}", attribute, e))
            })?;
            let definition = resolver.definition(&path);
            columns.push(Column {
                case_exact: definition.map(|d| d.case_exact).unwrap_or(false),
                attr_type: definition.map(|d| d.attr_type),
                path,
                name: name.clone(),
            });
        }

        Ok(Self {
            table: config.table.clone(),
            columns,
            support_and: config.support_and,
            support_or: config.support_or,
        })
    }

    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        Self::new(&config.translator, &config.resolver())
    }

    /// Translate `filter` with a translator built from `config`.
    pub fn build(config: &AppConfig, filter: Option<&Filter>) -> AppResult<Vec<SqlExpression>> {
        let translator = Self::from_config(config)?;
        translator.translate(filter)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// A `SELECT` over the union of `expressions`. No expressions selects
    /// the whole table.
    pub fn select(&self, expressions: &[SqlExpression]) -> SqlExpression {
        if expressions.is_empty() {
            return SqlExpression::new(format!("SELECT * FROM {}", self.table), Vec::new());
        }
        let clauses: Vec<&str> = expressions.iter().map(|e| e.clause.as_str()).collect();
        let params = expressions
            .iter()
            .flat_map(|e| e.params.iter().cloned())
            .collect();
        let sql = format!(
            "SELECT * FROM {} WHERE {}",
            self.table,
            clauses.join(" OR ")
        );
        debug!(sql = %sql, "built select");
        SqlExpression::new(sql, params)
    }

    fn column(&self, path: &Path) -> Option<&Column> {
        let core = match path.namespace() {
            Some(namespace) if namespace.eq_ignore_ascii_case(SCIM_SCHEMA_CORE_USER) => {
                Some(Path::root().append(path))
            }
            _ => None,
        };
        self.columns
            .iter()
            .find(|c| c.path == *path || core.as_ref() == Some(&c.path))
    }

    /// Date parameters are normalised to UTC so they compare as text.
    fn parameter(column: &Column, value: &ScalarValue) -> String {
        if let (Some(AttributeType::DateTime), ScalarValue::Text(text)) = (column.attr_type, value) {
            if let Some(date) = parse_scim_datetime(text) {
                return format_scim_datetime(date.with_timezone(&Utc));
            }
        }
        value.as_plain_text()
    }

    fn folds_case(column: &Column, value: &ScalarValue) -> bool {
        let textual = matches!(
            column.attr_type,
            None | Some(AttributeType::String) | Some(AttributeType::Reference)
        );
        textual && !column.case_exact && value.as_text().is_some()
    }

    /// `col <op> ?`, or `col <negated> ?` when `not` is set. Negated
    /// comparisons also accept rows where the column is NULL, as an absent
    /// attribute satisfies `not (...)`.
    fn compare(
        &self,
        path: &Path,
        value: &ScalarValue,
        not: bool,
        operator: &str,
        negated: &str,
    ) -> Option<SqlExpression> {
        let column = self.column(path)?;
        match value {
            ScalarValue::Null | ScalarValue::Boolean(_) if operator != "=" => return None,
            ScalarValue::Null => {
                let test = if not { "IS NOT NULL" } else { "IS NULL" };
                return Some(SqlExpression::new(
                    format!("{} {}", column.name, test),
                    Vec::new(),
                ));
            }
            _ => {}
        }
        if matches!(column.attr_type, Some(AttributeType::Boolean)) && operator != "=" {
            return None;
        }

        let (lhs, param) = if Self::folds_case(column, value) {
            (
                format!("LOWER({})", column.name),
                value.as_plain_text().to_lowercase(),
            )
        } else {
            (column.name.clone(), Self::parameter(column, value))
        };

        let clause = if not {
            format!("({} {} ? OR {} IS NULL)", lhs, negated, column.name)
        } else {
            format!("{} {} ?", lhs, operator)
        };
        Some(SqlExpression::new(clause, vec![param]))
    }

    fn like(
        &self,
        path: &Path,
        value: &ScalarValue,
        not: bool,
        prefix: &str,
        suffix: &str,
    ) -> Option<SqlExpression> {
        let column = self.column(path)?;
        let text = value.as_text()?;

        let (lhs, text) = if Self::folds_case(column, value) {
            (format!("LOWER({})", column.name), text.to_lowercase())
        } else {
            (column.name.clone(), text.to_string())
        };
        let pattern = format!("{}{}{}", prefix, escape_like(&text), suffix);

        let clause = if not {
            format!(
                "({} NOT LIKE ? ESCAPE '\\' OR {} IS NULL)",
                lhs, column.name
            )
        } else {
            format!("{} LIKE ? ESCAPE '\\'", lhs)
        };
        Some(SqlExpression::new(clause, vec![pattern]))
    }
}

impl FilterTranslator for SqlTranslator {
    type Expr = SqlExpression;

    fn create_and(&self, lhs: &SqlExpression, rhs: &SqlExpression) -> Option<SqlExpression> {
        if !self.support_and {
            return None;
        }
        Some(SqlExpression::combine(lhs, rhs, "AND"))
    }

    fn create_or(&self, lhs: &SqlExpression, rhs: &SqlExpression) -> Option<SqlExpression> {
        if !self.support_or {
            return None;
        }
        Some(SqlExpression::combine(lhs, rhs, "OR"))
    }

    fn create_pr(&self, path: &Path, not: bool) -> Option<SqlExpression> {
        let column = self.column(path)?;
        let test = if not { "IS NULL" } else { "IS NOT NULL" };
        Some(SqlExpression::new(
            format!("{} {}", column.name, test),
            Vec::new(),
        ))
    }

    fn create_eq(&self, path: &Path, value: &ScalarValue, not: bool) -> Option<SqlExpression> {
        self.compare(path, value, not, "=", "<>")
    }

    fn create_gt(&self, path: &Path, value: &ScalarValue, not: bool) -> Option<SqlExpression> {
        self.compare(path, value, not, ">", "<=")
    }

    fn create_ge(&self, path: &Path, value: &ScalarValue, not: bool) -> Option<SqlExpression> {
        self.compare(path, value, not, ">=", "<")
    }

    fn create_lt(&self, path: &Path, value: &ScalarValue, not: bool) -> Option<SqlExpression> {
        self.compare(path, value, not, "<", ">=")
    }

    fn create_le(&self, path: &Path, value: &ScalarValue, not: bool) -> Option<SqlExpression> {
        self.compare(path, value, not, "<=", ">")
    }

    fn create_sw(&self, path: &Path, value: &ScalarValue, not: bool) -> Option<SqlExpression> {
        self.like(path, value, not, "", "%")
    }

    fn create_ew(&self, path: &Path, value: &ScalarValue, not: bool) -> Option<SqlExpression> {
        self.like(path, value, not, "%", "")
    }

    fn create_co(&self, path: &Path, value: &ScalarValue, not: bool) -> Option<SqlExpression> {
        self.like(path, value, not, "%", "%")
    }
}

/// Escape LIKE wildcards so the value matches literally.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translator() -> SqlTranslator {
        SqlTranslator::from_config(&AppConfig::default_config()).unwrap()
    }

    fn translate(text: &str) -> Vec<SqlExpression> {
        let filter = Filter::from(text).unwrap();
        translator().translate(Some(&filter)).unwrap()
    }

    #[test]
    fn test_case_insensitive_equality() {
        let result = translate("userName eq \"BJensen\"");
        assert_eq!(
            result,
            vec![SqlExpression::new(
                "LOWER(user_name) = ?".to_string(),
                vec!["bjensen".to_string()]
            )]
        );
    }

    #[test]
    fn test_case_exact_equality() {
        let result = translate("externalId eq \"AbC\"");
        assert_eq!(result[0].clause, "external_id = ?");
        assert_eq!(result[0].params, vec!["AbC"]);
    }

    #[test]
    fn test_not_equal_accepts_null() {
        let result = translate("title ne \"Tour Guide\"");
        assert_eq!(result[0].clause, "(LOWER(title) <> ? OR title IS NULL)");
        assert_eq!(result[0].params, vec!["tour guide"]);
    }

    #[test]
    fn test_negated_ordering() {
        let result = translate("not (meta.lastModified gt \"2011-05-13T06:42:34+02:00\")");
        assert_eq!(
            result[0].clause,
            "(last_modified <= ? OR last_modified IS NULL)"
        );
        assert_eq!(result[0].params, vec!["2011-05-13T04:42:34.000Z"]);
    }

    #[test]
    fn test_presence() {
        assert_eq!(translate("title pr")[0].clause, "title IS NOT NULL");
        assert_eq!(translate("not (title pr)")[0].clause, "title IS NULL");
    }

    #[test]
    fn test_equals_null() {
        assert_eq!(translate("title eq null")[0].clause, "title IS NULL");
        assert_eq!(translate("title ne null")[0].clause, "title IS NOT NULL");
        assert!(translate("title gt null").is_empty());
    }

    #[test]
    fn test_like_patterns_are_escaped() {
        let result = translate("userName co \"50%_off\"");
        assert_eq!(result[0].clause, "LOWER(user_name) LIKE ? ESCAPE '\\'");
        assert_eq!(result[0].params, vec!["%50\\%\\_off%"]);

        let result = translate("userName sw \"J\"");
        assert_eq!(result[0].params, vec!["j%"]);

        let result = translate("not (userName ew \"x\")");
        assert_eq!(
            result[0].clause,
            "(LOWER(user_name) NOT LIKE ? ESCAPE '\\' OR user_name IS NULL)"
        );
        assert_eq!(result[0].params, vec!["%x"]);
    }

    #[test]
    fn test_boolean_column() {
        let result = translate("active eq true");
        assert_eq!(result[0].clause, "active = ?");
        assert_eq!(result[0].params, vec!["true"]);
        assert!(translate("active gt false").is_empty());
    }

    #[test]
    fn test_unmapped_attributes_fetch_everything() {
        assert!(translate("nickName eq \"Babs\"").is_empty());
        assert!(translate("emails[type eq \"work\"]").is_empty());
        assert!(translate("userName eq \"a\" or nickName eq \"b\"").is_empty());
    }

    #[test]
    fn test_and_drops_unmapped_side() {
        let result = translate("userName eq \"a\" and nickName eq \"b\"");
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].clause, "LOWER(user_name) = ?");
    }

    #[test]
    fn test_combined_clauses() {
        let result = translate("(userName eq \"a\" or title eq \"b\") and active eq true");
        assert_eq!(result.len(), 1);
        assert_eq!(
            result[0].clause,
            "((LOWER(user_name) = ? OR LOWER(title) = ?) AND active = ?)"
        );
        assert_eq!(result[0].params, vec!["a", "b", "true"]);
    }

    #[test]
    fn test_without_native_or() {
        let mut config = AppConfig::default_config();
        config.translator.support_or = false;
        let filter = Filter::from("(userName eq \"a\" or title eq \"b\") and active eq true").unwrap();
        let result = SqlTranslator::build(&config, Some(&filter)).unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].clause, "(LOWER(user_name) = ? AND active = ?)");
        assert_eq!(result[0].params, vec!["a", "true"]);
        assert_eq!(result[1].clause, "(LOWER(title) = ? AND active = ?)");
        assert_eq!(result[1].params, vec!["b", "true"]);
    }

    #[test]
    fn test_core_namespace_maps_to_column() {
        let result =
            translate("urn:ietf:params:scim:schemas:core:2.0:User:userName eq \"a\"");
        assert_eq!(result[0].clause, "LOWER(user_name) = ?");
    }

    #[test]
    fn test_select() {
        let translator = translator();
        let all = translator.select(&[]);
        assert_eq!(all.clause, "SELECT * FROM users");

        let filter = Filter::from("userName eq \"a\" or userName eq \"b\"").unwrap();
        let mut config = AppConfig::default_config();
        config.translator.support_or = false;
        let expressions = SqlTranslator::build(&config, Some(&filter)).unwrap();
        let select = translator.select(&expressions);
        assert_eq!(
            select.clause,
            "SELECT * FROM users WHERE LOWER(user_name) = ? OR LOWER(user_name) = ?"
        );
        assert_eq!(select.params, vec!["a", "b"]);
    }

    #[test]
    fn test_invalid_column_mapping() {
        let mut config = AppConfig::default_config();
        config
            .translator
            .columns
            .insert("emails[".to_string(), "email".to_string());
        assert!(matches!(
            SqlTranslator::from_config(&config),
            Err(AppError::Configuration(_))
        ));
    }
}

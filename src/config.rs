use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{AppError, AppResult};
use crate::logging::parse_level;
use crate::path::Path as AttributePath;
use crate::schema::{AttributeDefinition, SchemaResolver};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Attribute definitions replacing or extending the built-in User schema
    #[serde(default)]
    pub schema: Vec<AttributeDefinition>,
    #[serde(default)]
    pub translator: TranslatorConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TranslatorConfig {
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_true")]
    pub support_or: bool,
    #[serde(default = "default_true")]
    pub support_and: bool,
    /// SCIM attribute path -> column. Only these attributes are pushed down.
    #[serde(default)]
    pub columns: BTreeMap<String, String>,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
            support_or: true,
            support_and: true,
            columns: BTreeMap::new(),
        }
    }
}

fn default_table() -> String {
    "users".to_string()
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Load configuration from YAML file
    pub fn load_from_file<P: AsRef<Path>>(config_path: P) -> AppResult<Self> {
        let path = config_path.as_ref();

        if !path.exists() {
            return Err(AppError::Configuration(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            AppError::Configuration(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        // Expand environment variables in YAML content
        let expanded_content = Self::expand_env_vars(&content)?;

        let app_config: AppConfig = serde_yaml::from_str(&expanded_content).map_err(|e| {
            AppError::Configuration(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })?;

        app_config.validate()?;
        Ok(app_config)
    }

    /// Info logging, the built-in schema and a column map for a typical
    /// `users` table
    pub fn default_config() -> Self {
        let columns = [
            ("id", "id"),
            ("externalId", "external_id"),
            ("userName", "user_name"),
            ("displayName", "display_name"),
            ("name.familyName", "family_name"),
            ("name.givenName", "given_name"),
            ("title", "title"),
            ("active", "active"),
            ("meta.created", "created"),
            ("meta.lastModified", "last_modified"),
        ]
        .into_iter()
        .map(|(attribute, column)| (attribute.to_string(), column.to_string()))
        .collect();

        AppConfig {
            logging: LoggingConfig::default(),
            schema: Vec::new(),
            translator: TranslatorConfig {
                columns,
                ..TranslatorConfig::default()
            },
        }
    }

    /// Attribute definitions in effect: the built-in schemas with the
    /// configured overrides applied.
    pub fn resolver(&self) -> SchemaResolver {
        SchemaResolver::builtin().with_overrides(&self.schema)
    }

    pub fn validate(&self) -> AppResult<()> {
        parse_level(&self.logging.level)?;

        if self.translator.table.trim().is_empty() {
            return Err(AppError::Configuration(
                "translator.table must not be empty".to_string(),
            ));
        }

        for (attribute, column) in &self.translator.columns {
            AttributePath::from(attribute).map_err(|e| {
                AppError::Configuration(format!("Invalid column mapping for '{}': {}", attribute, e))
            })?;
            if column.trim().is_empty() {
                return Err(AppError::Configuration(format!(
                    "Column for '{}' must not be empty",
                    attribute
                )));
            }
        }
        Ok(())
    }

    /// Expand environment variables in format ${VAR_NAME} or ${VAR_NAME:-default}
    fn expand_env_vars(content: &str) -> AppResult<String> {
        let chars: Vec<char> = content.chars().collect();
        let mut expanded = String::new();
        let mut i = 0;

        while i < chars.len() {
            if i + 1 < chars.len() && chars[i] == '$' && chars[i + 1] == '{' {
                // Find the closing brace
                let mut j = i + 2;
                while j < chars.len() && chars[j] != '}' {
                    j += 1;
                }

                if j < chars.len() {
                    let var_expr: String = chars[i + 2..j].iter().collect();

                    let (var_name, default_value) = match var_expr.find(":-") {
                        Some(pos) => (
                            var_expr[..pos].to_string(),
                            Some(var_expr[pos + 2..].to_string()),
                        ),
                        None => (var_expr, None),
                    };

                    let value = match (std::env::var(&var_name), default_value) {
                        (Ok(val), _) => val,
                        (Err(_), Some(default)) => default,
                        (Err(_), None) => {
                            return Err(AppError::Configuration(format!(
                                "Environment variable {} not found and no default provided",
                                var_name
                            )));
                        }
                    };

                    expanded.push_str(&value);
                    i = j + 1;
                } else {
                    expanded.push(chars[i]);
                    i += 1;
                }
            } else {
                expanded.push(chars[i]);
                i += 1;
            }
        }

        Ok(expanded)
    }
}

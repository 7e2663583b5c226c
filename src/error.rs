use serde_json::{json, Value};
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    FilterParse(String),
    InvalidPath(String),
    /// A filter that parsed fine but cannot be applied to the data it met,
    /// e.g. an ordering operator against a boolean value.
    InvalidFilter(String),
    /// A translator factory answered differently for the same input across
    /// the simplify and translate passes.
    FilterInconsistent(String),
    Serialization(serde_json::Error),
    Configuration(String),
    Io(std::io::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::FilterParse(e) => write!(f, "Filter parse error: {}", e),
            AppError::InvalidPath(e) => write!(f, "Invalid path: {}", e),
            AppError::InvalidFilter(e) => write!(f, "Invalid filter usage: {}", e),
            AppError::FilterInconsistent(e) => write!(f, "Filter method inconsistent: {}", e),
            AppError::Serialization(e) => write!(f, "Serialization error: {}", e),
            AppError::Configuration(e) => write!(f, "Configuration error: {}", e),
            AppError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Serialization(e) => Some(e),
            AppError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err)
    }
}

pub type AppResult<T> = Result<T, AppError>;

// SCIM 2.0 standard error response helper
pub fn scim_error_response(status: u16, scim_type: &str, detail: &str) -> Value {
    json!({
        "schemas": ["urn:ietf:params:scim:api:messages:2.0:Error"],
        "detail": detail,
        "status": status.to_string(),
        "scimType": scim_type
    })
}

impl AppError {
    /// The RFC 7644 `scimType` keyword matching this error.
    pub fn scim_type(&self) -> &'static str {
        match self {
            AppError::FilterParse(_) | AppError::InvalidFilter(_) => "invalidFilter",
            AppError::InvalidPath(_) => "invalidPath",
            AppError::Serialization(_) => "invalidSyntax",
            AppError::FilterInconsistent(_) | AppError::Configuration(_) | AppError::Io(_) => {
                "internal"
            }
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            AppError::FilterParse(_)
            | AppError::InvalidPath(_)
            | AppError::InvalidFilter(_)
            | AppError::Serialization(_) => 400,
            AppError::FilterInconsistent(_) | AppError::Configuration(_) | AppError::Io(_) => 500,
        }
    }

    pub fn to_response(&self) -> Value {
        scim_error_response(self.status(), self.scim_type(), &self.to_string())
    }
}

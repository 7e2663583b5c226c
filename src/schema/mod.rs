pub mod definitions;
pub mod support;

use lazy_static::lazy_static;
use regex::Regex;

// Re-export commonly used items from definitions
pub use definitions::*;
pub use support::{compare_values, date_value, match_path};

lazy_static! {
    static ref SCHEMA_URN: Regex =
        Regex::new(r#"(?i)^urn:[a-z0-9][a-z0-9-]*(:[^:\s\[\]"]+)+$"#).unwrap();
}

/// Whether `text` looks like a schema URN that may prefix an attribute path.
pub fn is_schema_urn(text: &str) -> bool {
    SCHEMA_URN.is_match(text)
}

pub mod backend;
pub mod config;
pub mod error;
pub mod filter;
pub mod logging;
pub mod parser;
pub mod path;
pub mod schema;
pub mod utils;

// Re-export commonly used types for easier access
pub use error::{AppError, AppResult};
pub use filter::evaluator::evaluate;
pub use filter::{translate, Evaluator, Filter, FilterTranslator, ScalarValue};
pub use path::Path;

pub mod filter_parser;
pub mod path_parser;

pub use filter_parser::parse_filter;
pub use path_parser::parse_path;

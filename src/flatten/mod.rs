//! JSON flattening - reduce nested documents to column -> scalar rows
//!
//! Nested objects become dot-separated columns (`user.name`), array elements
//! become bracket-indexed columns (`user.tags[1]`), and strings holding an
//! object or array are decoded and merged under their own key.

pub mod flattener;
pub mod parse;
pub mod path;
pub mod repair;

pub use flattener::{FlattenOutput, Flattener};
pub use parse::parse_json;
pub use path::{available_paths, extract_path, parse_path, PathSegment};
pub use repair::{beautify, Beautified, Repair};

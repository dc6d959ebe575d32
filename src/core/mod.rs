//! Core configuration types: values, sections, trees, and fingerprints.

pub mod fingerprint;
mod section;
mod token;
mod tree;
mod value;

pub use section::ConfigSection;
pub use token::clean_token;
pub use tree::{ConfigTree, TreeState};
pub use value::ConfigValue;

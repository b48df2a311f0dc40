//! Command implementations.

pub mod completions;
pub mod import;
pub mod normalize;
pub mod version;

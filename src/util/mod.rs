//! Small helpers shared across layers

pub mod path;
pub mod testing;

pub use path::resolve_repository_root;

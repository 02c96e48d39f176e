//! Domain layer: entities and layout rules
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod entities;
pub mod error;
pub mod layout;

pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use layout::BuildLayout;

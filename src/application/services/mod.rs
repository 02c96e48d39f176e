//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, CommandRunner,
//! FragmentGenerator) but are themselves concrete structs, not traits.

mod build;
mod render;

pub use build::BuildService;
pub use render::RenderService;

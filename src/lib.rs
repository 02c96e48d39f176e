//! docbundle: assembles the documentation bundle and renders the manual.
//!
//! Layers, innermost first: `domain` (layout rules, no I/O), `application`
//! (build and render services over I/O traits), `infrastructure` (real I/O,
//! generator, DI container), `cli`.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;

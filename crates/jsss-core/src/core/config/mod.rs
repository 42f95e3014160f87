//! Configuration, settings, and per-command context assembly.

pub mod context;
mod file;
pub mod settings;

pub use settings::*;

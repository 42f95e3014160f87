//! Internal implementation modules for `jsss-core`.
//!
//! Callers should go through the re-exports at the crate root.

pub mod archive;
pub mod commands;
pub mod config;
pub mod corpus;
pub mod dataset;
pub mod effects;
pub mod errors;
pub mod fs;
pub mod origin;
pub mod outcome;
pub mod preprocess;
pub mod resolve;
pub mod store;

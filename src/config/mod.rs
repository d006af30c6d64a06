// src/config/mod.rs

//! Configuration loading, validation and overrides for docpipe.
//!
//! Responsibilities:
//! - Define the TOML-backed pipeline model (`model.rs`).
//! - Find and load a config file or inline document (`loader.rs`).
//! - Validate invariants serde cannot express (`validate.rs`).
//! - Apply command-line overrides (`overrides.rs`).
//! - Write starter config files (`bootstrap.rs`).

pub mod bootstrap;
pub mod loader;
pub mod model;
pub mod overrides;
pub mod validate;

pub use bootstrap::{bootstrap, Template};
pub use loader::{load_and_validate, load_from_path, load_from_str, resolve_source, CONFIG_FILENAMES};
pub use model::{ConfigSource, LoadedConfig, PipelineConfig};
pub use overrides::{OverrideSet, TocTarget};

//! YAML configuration loading for Home Assistant
//!
//! This crate loads `configuration.yaml` with support for Home Assistant's
//! custom tags (`!include`, `!include_dir_named`, `!include_dir_merge_named`,
//! `!secret`, `!env_var`) and provides the error type used by component
//! schema validation.
//!
//! # Example
//!
//! ```ignore
//! use ha_config::{load_yaml, section};
//!
//! let config = load_yaml("/config", "configuration.yaml")?;
//! let auto_group = section(&config, "auto_group");
//! ```

mod error;
mod loader;
mod secrets;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_yaml, section, YamlLoader};
pub use secrets::Secrets;

// Re-export serde_yaml types for convenience
pub use serde_yaml::{Mapping, Value};

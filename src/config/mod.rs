//! Configuration loading, parsing, and validation for Stepwise.
//!
//! - Schema definitions in [`schema`]
//! - File discovery and loading in [`loader`]
//! - Validation in [`validator`]
//!
//! # Example
//!
//! ```
//! use stepwise::config::{load_config_or_default, validate};
//! use tempfile::TempDir;
//! use std::fs;
//!
//! let temp = TempDir::new().unwrap();
//! fs::write(temp.path().join(".stepwise.yml"), "settle_delay_ms: 250").unwrap();
//!
//! let config = load_config_or_default(temp.path()).unwrap();
//! validate(&config).unwrap();
//! assert_eq!(config.settle_delay_ms, 250);
//! assert_eq!(config.step_timeout_ms, 30_000);
//! ```

pub mod loader;
pub mod schema;
pub mod validator;

pub use loader::{
    find_config, load_config_file, load_config_or_default, parse_config, CONFIG_FILE_NAME,
};
pub use schema::{FaultPatternConfig, OrchestratorConfig};
pub use validator::{validate, validate_config, ValidationError};

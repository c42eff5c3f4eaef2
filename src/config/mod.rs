//! Tool configuration.
//!
//! - Schema definitions in [`schema`]
//! - File discovery, loading and validation in [`loader`]
//!
//! # Example
//!
//! ```
//! use vcrbpkg::config::parse_settings;
//! use std::path::Path;
//!
//! let settings = parse_settings("gemset: scan\n", Path::new("config.yml")).unwrap();
//! assert_eq!(settings.gemset, "scan");
//! assert_eq!(settings.boot_timeout_secs, 15);
//! ```
//!
//! # Configuration File Locations
//!
//! 1. `--config <FILE>` (or `VCRBPKG_CONFIG`), which must exist
//! 2. `~/.vcrbpkg/config.yml`, if present
//! 3. Built-in defaults

pub mod loader;
pub mod schema;

pub use loader::{load_settings, load_settings_file, parse_settings, user_config_path, validate};
pub use schema::Settings;

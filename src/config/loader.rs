//! Configuration file discovery and loading.

use crate::config::schema::Settings;
use crate::error::{PackagerError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// User config at `~/.vcrbpkg/config.yml`.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".vcrbpkg").join("config.yml"))
}

/// Load settings.
///
/// An explicit path must exist. Without one, the user config is used when
/// present, otherwise the defaults.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    if let Some(path) = explicit {
        return load_settings_file(path);
    }

    match user_config_path() {
        Some(path) if path.is_file() => load_settings_file(&path),
        _ => Ok(Settings::default()),
    }
}

/// Load and validate a single settings file.
///
/// # Errors
///
/// Returns `ConfigNotFound` if the file doesn't exist.
/// Returns `ConfigParseError` if the YAML is invalid.
/// Returns `ConfigValidationError` if a value is out of range.
pub fn load_settings_file(path: &Path) -> Result<Settings> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PackagerError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            PackagerError::Io(e)
        }
    })?;

    parse_settings(&content, path)
}

/// Parse YAML content into validated settings.
///
/// * `source_path` - Path for error reporting
pub fn parse_settings(content: &str, source_path: &Path) -> Result<Settings> {
    if content.trim().is_empty() {
        return Ok(Settings::default());
    }

    let settings: Settings =
        serde_yaml::from_str(content).map_err(|e| PackagerError::ConfigParseError {
            path: source_path.to_path_buf(),
            message: e.to_string(),
        })?;

    validate(&settings)?;
    Ok(settings)
}

/// Reject values that would make a run impossible.
pub fn validate(settings: &Settings) -> Result<()> {
    let invalid = |message: &str| {
        Err(PackagerError::ConfigValidationError {
            message: message.to_string(),
        })
    };

    if settings.gemset.trim().is_empty() {
        return invalid("gemset must not be empty");
    }
    if settings.gemset.contains(char::is_whitespace) || settings.gemset.contains('@') {
        return invalid("gemset must be a single word without '@'");
    }
    if settings.boot_timeout_secs == 0 {
        return invalid("boot_timeout_secs must be greater than 0");
    }
    if settings.clone_depth == 0 {
        return invalid("clone_depth must be greater than 0");
    }
    if settings.gem_source.trim().is_empty() {
        return invalid("gem_source must not be empty");
    }
    Ok(())
}

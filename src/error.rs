//! Error types for packaging runs.
//!
//! This module defines [`PackagerError`], the primary error type used
//! throughout the application, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - `PackagerError` variants are the fatal tier: any of them aborts the run
//! - Recoverable conditions (missing version files, failing boot tests,
//!   unsupported versions) never become errors; they are reported as warnings
//! - Use `anyhow::Error` (via `PackagerError::Other`) for unexpected errors

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for packaging runs.
#[derive(Debug, Error)]
pub enum PackagerError {
    /// A required tool is not on PATH or cannot be run.
    #[error("Missing prerequisite '{tool}': {message}")]
    PrerequisiteMissing { tool: String, message: String },

    /// Cloning the target repository failed.
    #[error("Failed to clone '{target}': {message}")]
    CloneFailed { target: String, message: String },

    /// The project root lacks the files every Rails application has.
    #[error(
        "{path} does not have a Rails structure ('{missing}' not found), can only package Rails apps"
    )]
    NotARailsApp { path: PathBuf, missing: String },

    /// Installing the interpreter, the gemset or a gem failed.
    #[error("Failed to install {what}: {message}")]
    InstallFailed { what: String, message: String },

    /// The packaging gem failed or produced no artifact.
    #[error("Packaging failed: {message}")]
    PackagingFailed { message: String },

    /// The artifact could not be copied to the requested output path.
    #[error("Failed to copy {from} to {to}: {source}")]
    ArtifactCopyFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A command could not be started.
    #[error("Failed to run '{command}': {message}")]
    CommandFailed { command: String, message: String },

    /// Configuration file not found at the given location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// Invalid configuration values.
    #[error("Invalid configuration: {message}")]
    ConfigValidationError { message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PackagerError {
    /// Short name of the stage that failed, used in the final summary line.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::PrerequisiteMissing { .. } => "prerequisites",
            Self::CloneFailed { .. } | Self::NotARailsApp { .. } => "source",
            Self::InstallFailed { .. } => "install",
            Self::PackagingFailed { .. } | Self::ArtifactCopyFailed { .. } => "packaging",
            Self::ConfigNotFound { .. }
            | Self::ConfigParseError { .. }
            | Self::ConfigValidationError { .. } => "config",
            Self::CommandFailed { .. } | Self::Io(_) | Self::Other(_) => "internal",
        }
    }
}

/// Result type alias for packaging operations.
pub type Result<T> = std::result::Result<T, PackagerError>;

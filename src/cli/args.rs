//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::Parser;
use std::path::PathBuf;

use crate::source::Target;

/// Package Ruby on Rails applications for Veracode Static Analysis.
#[derive(Debug, Parser)]
#[command(name = "vcrbpkg")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Examples:\n  vcrbpkg ./my-rails-app\n  vcrbpkg https://github.com/user/repo")]
pub struct Cli {
    /// Rails application directory or git repository URL
    #[arg(value_name = "TARGET", value_parser = Target::parse)]
    pub target: Target,

    /// Copy the packaged archive to this file
    #[arg(short, long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        env = "VCRBPKG_LOG_LEVEL",
        value_parser = ["trace", "debug", "info", "warn", "error"]
    )]
    pub log_level: Option<String>,

    /// Path to config file (overrides ~/.vcrbpkg/config.yml)
    #[arg(short, long, env = "VCRBPKG_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Tracing filter directive for the flags given, if any.
    ///
    /// `--debug` wins over `--log-level`. `None` leaves the choice to
    /// `RUST_LOG`.
    pub fn log_directive(&self) -> Option<String> {
        if self.debug {
            Some("vcrbpkg=debug".to_string())
        } else {
            self.log_level
                .as_ref()
                .map(|level| format!("vcrbpkg={}", level))
        }
    }
}

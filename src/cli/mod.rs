//! Command-line interface for vcrbpkg.
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`command`] - Settings loading and the packaging run

pub mod args;
pub mod command;

pub use args::Cli;
pub use command::{execute, summary};

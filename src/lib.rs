//! vcrbpkg - Package Ruby on Rails applications for Veracode Static Analysis.
//!
//! Given a Rails application directory or repository URL, vcrbpkg installs
//! the Ruby version the project asks for with RVM, adds the `veracode` gem,
//! finds a `RAILS_ENV` the application boots in and runs
//! `veracode prepare` to produce the upload archive.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Settings loading, parsing, and validation
//! - [`error`] - Error types and result aliases
//! - [`package`] - The end-to-end packaging run
//! - [`probe`] - Runtime profile selection by boot smoke test
//! - [`report`] - Explicitly passed message reporting
//! - [`shell`] - Process execution behind a mockable trait
//! - [`source`] - Target classification, cloning and Rails layout checks
//! - [`toolchain`] - RVM, Bundler and `veracode` command lines
//! - [`version`] - Version parsing, detection and support lists
//!
//! # Example
//!
//! ```
//! use vcrbpkg::report::MockReporter;
//! use vcrbpkg::version::{VersionDetector, VersionSpec};
//!
//! let project = tempfile::tempdir().unwrap();
//! std::fs::write(project.path().join(".ruby-version"), "2.7.6\n").unwrap();
//!
//! let reporter = MockReporter::new();
//! let version = VersionDetector::new(&reporter).detect(project.path());
//! assert_eq!(version, VersionSpec::new(2, 7, 6));
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod package;
pub mod probe;
pub mod report;
pub mod shell;
pub mod source;
pub mod toolchain;
pub mod version;

pub use error::{PackagerError, Result};

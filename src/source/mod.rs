//! Locating the project to package.
//!
//! A target is either an existing directory, used in place, or a repository
//! reference that is shallow-cloned into a fresh temporary directory.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PackagerError, Result};
use crate::report::Reporter;
use crate::shell::{CommandSpec, ProcessRunner};

/// Entries every Rails application root contains.
pub const RAILS_ENTRIES: &[&str] = &["app", "config", "public", "Gemfile"];

/// Prefix of clone directories under the system temp dir.
pub const CLONE_PREFIX: &str = "vcrbpkg";

/// What the user asked to package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// An existing directory.
    Directory(PathBuf),
    /// A repository reference for `git clone`.
    Repository(String),
}

impl Target {
    /// Classify command-line input.
    ///
    /// Existing directories win; otherwise the input must look like a URL
    /// (`scheme://...`) or an scp-style reference (`git@host:path`).
    pub fn parse(input: &str) -> std::result::Result<Self, String> {
        let path = Path::new(input);
        if path.is_dir() {
            return Ok(Target::Directory(path.to_path_buf()));
        }
        if looks_like_repository(input) {
            return Ok(Target::Repository(input.to_string()));
        }
        Err(format!(
            "invalid input: {} must be either a URL or a directory",
            input
        ))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Directory(path) => write!(f, "{}", path.display()),
            Target::Repository(reference) => f.write_str(reference),
        }
    }
}

fn looks_like_repository(input: &str) -> bool {
    if input.chars().any(char::is_whitespace) {
        return false;
    }
    if let Some((scheme, rest)) = input.split_once("://") {
        return !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
            && !rest.is_empty();
    }
    match input.split_once(':') {
        Some((user_host, path)) => user_host.contains('@') && !path.is_empty(),
        None => false,
    }
}

/// A project root ready for packaging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSource {
    pub root: PathBuf,
    /// Whether `root` is a fresh clone owned by this run.
    pub cloned: bool,
}

/// Turns a [`Target`] into a local project root.
pub struct SourceLocator<'a> {
    runner: &'a dyn ProcessRunner,
    reporter: &'a dyn Reporter,
    clone_depth: u32,
}

impl<'a> SourceLocator<'a> {
    pub fn new(runner: &'a dyn ProcessRunner, reporter: &'a dyn Reporter) -> Self {
        Self {
            runner,
            reporter,
            clone_depth: 1,
        }
    }

    pub fn with_clone_depth(mut self, depth: u32) -> Self {
        self.clone_depth = depth;
        self
    }

    /// Resolve the target, cloning when it is a repository reference.
    pub fn resolve(&self, target: &Target) -> Result<ProjectSource> {
        match target {
            Target::Directory(path) => {
                self.reporter
                    .info(&format!("{} is a valid directory, skipping clone", path.display()));
                Ok(ProjectSource {
                    root: path.clone(),
                    cloned: false,
                })
            }
            Target::Repository(reference) => self.clone_repository(reference),
        }
    }

    fn clone_repository(&self, reference: &str) -> Result<ProjectSource> {
        let git = self
            .runner
            .which("git")
            .ok_or_else(|| PackagerError::PrerequisiteMissing {
                tool: "git".to_string(),
                message: "git is not installed, please install git".to_string(),
            })?;
        self.reporter
            .debug(&format!("git is available at {}", git.display()));

        // The clone outlives this run so the artifact can be inspected.
        let dir = tempfile::Builder::new()
            .prefix(CLONE_PREFIX)
            .tempdir()
            .map_err(|e| PackagerError::CloneFailed {
                target: reference.to_string(),
                message: format!("cannot create temporary directory: {}", e),
            })?
            .keep();
        self.reporter
            .info(&format!("Temporary directory: {}", dir.display()));

        let cmd = CommandSpec::new("git")
            .arg("clone")
            .arg("--depth")
            .arg(self.clone_depth.to_string())
            .arg(reference)
            .arg(dir.to_string_lossy());
        self.reporter
            .info(&format!("Cloning repository from {}...", reference));

        let result = match self.runner.run(&cmd) {
            Ok(result) => result,
            Err(e) => {
                let _ = fs::remove_dir_all(&dir);
                return Err(PackagerError::CloneFailed {
                    target: reference.to_string(),
                    message: e.to_string(),
                });
            }
        };
        if !result.success {
            let _ = fs::remove_dir_all(&dir);
            return Err(PackagerError::CloneFailed {
                target: reference.to_string(),
                message: format!(
                    "git clone into '{}' exited with code {:?}",
                    dir.display(),
                    result.exit_code
                ),
            });
        }

        self.reporter.info(&format!(
            "Repository cloned successfully at '{}'",
            dir.display()
        ));
        Ok(ProjectSource {
            root: dir,
            cloned: true,
        })
    }
}

/// Fail unless `root` has the layout of a Rails application.
pub fn ensure_rails_structure(root: &Path) -> Result<()> {
    match RAILS_ENTRIES.iter().find(|entry| !root.join(entry).exists()) {
        Some(missing) => Err(PackagerError::NotARailsApp {
            path: root.to_path_buf(),
            missing: missing.to_string(),
        }),
        None => Ok(()),
    }
}

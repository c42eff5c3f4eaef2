//! Runtime profile selection by boot smoke test.
//!
//! Production is preferred because it carries none of the development
//! tooling, but it often needs setup (credentials, a database) to boot. The
//! probe installs each profile's dependencies and starts `rails server`
//! briefly, falling back through development and test.
//!
//! The success signal is a heuristic: a server still running when the boot
//! timeout fires is taken to have started. There is no health check behind
//! it.
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use std::time::Duration;
//! use vcrbpkg::probe::{EnvironmentProbe, RuntimeProfile};
//! use vcrbpkg::report::MockReporter;
//! use vcrbpkg::shell::{CommandResult, MockRunner};
//! use vcrbpkg::version::VersionSpec;
//!
//! let runner = MockRunner::new().respond(
//!     "rails server",
//!     CommandResult::timed_out("", Duration::from_secs(15)),
//! );
//! let reporter = MockReporter::new();
//! let probe = EnvironmentProbe::new(&runner, &reporter);
//!
//! let profile = probe.select(Path::new("/srv/app"), VersionSpec::new(3, 2, 2));
//! assert_eq!(profile, RuntimeProfile::Production);
//! ```

use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::report::Reporter;
use crate::shell::{CommandResult, ProcessRunner};
use crate::toolchain::{bundler, RubyEnv};
use crate::version::VersionSpec;

/// How long `rails server` must stay up to count as booted.
pub const DEFAULT_BOOT_TIMEOUT: Duration = Duration::from_secs(15);

/// Gemset the probe installs into unless configured otherwise.
pub const DEFAULT_GEMSET: &str = "veracode";

/// A `RAILS_ENV` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeProfile {
    Production,
    Development,
    Test,
}

impl RuntimeProfile {
    /// The first profile tried.
    pub const FIRST: RuntimeProfile = RuntimeProfile::Production;

    /// The profile tried after this one, if any.
    pub fn next(self) -> Option<RuntimeProfile> {
        match self {
            RuntimeProfile::Production => Some(RuntimeProfile::Development),
            RuntimeProfile::Development => Some(RuntimeProfile::Test),
            RuntimeProfile::Test => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RuntimeProfile::Production => "production",
            RuntimeProfile::Development => "development",
            RuntimeProfile::Test => "test",
        }
    }

    /// Bundler groups left out when installing for this profile.
    pub fn excluded_groups(self) -> &'static [&'static str] {
        match self {
            RuntimeProfile::Production => &["development", "test"],
            RuntimeProfile::Development | RuntimeProfile::Test => &[],
        }
    }
}

impl fmt::Display for RuntimeProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a boot smoke test ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootOutcome {
    /// Still running at the timeout and killed.
    StayedUp,
    /// Exited with status 0 before the timeout.
    ExitedCleanly,
    /// Exited with a failure status (None if killed by a signal).
    Crashed { code: Option<i32> },
    /// The process could not be started.
    FailedToStart,
}

impl BootOutcome {
    /// Interpret a finished boot run.
    pub fn from_result(result: &CommandResult) -> Self {
        if result.timed_out {
            BootOutcome::StayedUp
        } else if result.success {
            BootOutcome::ExitedCleanly
        } else {
            BootOutcome::Crashed {
                code: result.exit_code,
            }
        }
    }

    /// Only a server that stayed up counts as booted.
    pub fn is_success(self) -> bool {
        self == BootOutcome::StayedUp
    }
}

enum ProbeState {
    Attempt(RuntimeProfile),
    Done(RuntimeProfile),
}

/// Selects the runtime profile to package with.
pub struct EnvironmentProbe<'a> {
    runner: &'a dyn ProcessRunner,
    reporter: &'a dyn Reporter,
    gemset: String,
    boot_timeout: Duration,
}

impl<'a> EnvironmentProbe<'a> {
    pub fn new(runner: &'a dyn ProcessRunner, reporter: &'a dyn Reporter) -> Self {
        Self {
            runner,
            reporter,
            gemset: DEFAULT_GEMSET.to_string(),
            boot_timeout: DEFAULT_BOOT_TIMEOUT,
        }
    }

    pub fn with_gemset(mut self, gemset: impl Into<String>) -> Self {
        self.gemset = gemset.into();
        self
    }

    pub fn with_boot_timeout(mut self, timeout: Duration) -> Self {
        self.boot_timeout = timeout;
        self
    }

    /// Try each profile in order and return the first that boots.
    ///
    /// Falls back to production when none does. Installed gems from earlier
    /// attempts are kept.
    pub fn select(&self, root: &Path, version: VersionSpec) -> RuntimeProfile {
        let env = RubyEnv::new(version, self.gemset.clone());
        let mut state = ProbeState::Attempt(RuntimeProfile::FIRST);

        loop {
            state = match state {
                ProbeState::Attempt(profile) => {
                    self.install_dependencies(root, &env, profile);
                    if self.boot(root, &env, profile).is_success() {
                        self.reporter.info(&format!(
                            "Successfully verified Rails environment {}, using it for packaging",
                            profile
                        ));
                        ProbeState::Done(profile)
                    } else {
                        match profile.next() {
                            Some(next) => ProbeState::Attempt(next),
                            None => {
                                self.reporter.warn(
                                    "Testing failed for all known environments, trying our luck with production",
                                );
                                ProbeState::Done(RuntimeProfile::Production)
                            }
                        }
                    }
                }
                ProbeState::Done(profile) => return profile,
            };
        }
    }

    /// Install the profile's gems. Failure only warns.
    fn install_dependencies(&self, root: &Path, env: &RubyEnv, profile: RuntimeProfile) {
        let cmd = bundler::install(env, profile.excluded_groups()).cwd(root);
        self.reporter
            .info(&format!("Doing bundle install for {}", profile));

        match self.runner.run(&cmd) {
            Ok(result) if result.success => {}
            Ok(result) => self.reporter.warn(&format!(
                "bundle install exited with code {:?}, trying to run server anyway, will probably fail",
                result.exit_code
            )),
            Err(e) => self.reporter.warn(&format!(
                "Failed to do bundle install ({}), trying to run server anyway, will probably fail",
                e
            )),
        }
    }

    /// Start `rails server` under `profile` and wait for the boot timeout.
    pub fn boot(&self, root: &Path, env: &RubyEnv, profile: RuntimeProfile) -> BootOutcome {
        let cmd = env
            .exec(["rails", "server"])
            .env("RAILS_ENV", profile.as_str())
            .cwd(root)
            .timeout(self.boot_timeout);
        self.reporter
            .info(&format!("Running rails server in {}", profile));

        let outcome = match self.runner.run(&cmd) {
            Ok(result) => BootOutcome::from_result(&result),
            Err(e) => {
                self.reporter
                    .warn(&format!("Unable to start rails server: {}", e));
                BootOutcome::FailedToStart
            }
        };

        match outcome {
            BootOutcome::StayedUp => self
                .reporter
                .info("Server ran until getting killed, nice!"),
            BootOutcome::ExitedCleanly => self
                .reporter
                .warn("Rails server ran without error? That's unexpected."),
            BootOutcome::Crashed { code } => self.reporter.warn(&format!(
                "Rails server failed in {} with exit code {:?}",
                profile, code
            )),
            BootOutcome::FailedToStart => {}
        }
        outcome
    }
}

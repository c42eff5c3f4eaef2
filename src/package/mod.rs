//! End-to-end packaging of a Rails application.
//!
//! [`Packager::run`] checks the host tooling, locates the project, prepares
//! an RVM interpreter and gemset for it, adds the `veracode` gem, picks a
//! runtime profile and finally runs `veracode prepare`. Fatal failures are
//! typed [`PackagerError`]s; everything else is reported as a warning and
//! the run carries on.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::error::{PackagerError, Result};
use crate::probe::{EnvironmentProbe, RuntimeProfile};
use crate::report::Reporter;
use crate::shell::{CommandSpec, ProcessRunner};
use crate::source::{ensure_rails_structure, SourceLocator, Target};
use crate::toolchain::{bundler, rvm, veracode, RubyEnv};
use crate::version::{classify_rails, parse_bundle_show, Support, VersionDetector, VersionSpec};

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageOutcome {
    /// Project root that was packaged (a fresh clone for repository targets).
    pub root: PathBuf,
    pub ruby_version: VersionSpec,
    pub profile: RuntimeProfile,
    /// Archive written by `veracode prepare`, if it could be located.
    pub artifact: Option<PathBuf>,
    /// Where the archive was copied with `--out`.
    pub copied_to: Option<PathBuf>,
}

/// A host tool that must be installed before anything else runs.
struct Prerequisite {
    tool: &'static str,
    version_args: &'static [&'static str],
    missing_hint: &'static str,
    broken_hint: &'static str,
}

const PREREQUISITES: &[Prerequisite] = &[
    Prerequisite {
        tool: "ruby",
        version_args: &["--version"],
        missing_hint: "unable to run ruby command, please ensure ruby is installed",
        broken_hint: "unable to run ruby --version, please ensure ruby is installed correctly",
    },
    Prerequisite {
        tool: "rvm",
        version_args: &["version"],
        missing_hint: "RVM may not be available, please install with: curl -sSL https://get.rvm.io | bash",
        broken_hint: "unable to run rvm version, please reinstall RVM",
    },
];

/// Sequences a packaging run.
pub struct Packager<'a> {
    runner: &'a dyn ProcessRunner,
    reporter: &'a dyn Reporter,
    settings: &'a Settings,
}

impl<'a> Packager<'a> {
    pub fn new(
        runner: &'a dyn ProcessRunner,
        reporter: &'a dyn Reporter,
        settings: &'a Settings,
    ) -> Self {
        Self {
            runner,
            reporter,
            settings,
        }
    }

    /// Package `target`, copying the archive to `out` when given.
    pub fn run(&self, target: &Target, out: Option<&Path>) -> Result<PackageOutcome> {
        self.check_prerequisites()?;

        let source = SourceLocator::new(self.runner, self.reporter)
            .with_clone_depth(self.settings.clone_depth)
            .resolve(target)?;
        let root = source.root;
        ensure_rails_structure(&root)?;

        let detector = VersionDetector::new(self.reporter)
            .with_default(self.settings.default_ruby_version);
        let ruby_version = detector.detect(&root);
        detector.classify_supported(ruby_version);

        let env = RubyEnv::new(ruby_version, self.settings.gemset.clone());
        self.install_ruby(&root, &env)?;
        self.check_rails_version(&root, &env);
        self.install_packaging_gem(&root, &env)?;

        let profile = EnvironmentProbe::new(self.runner, self.reporter)
            .with_gemset(self.settings.gemset.clone())
            .with_boot_timeout(self.settings.boot_timeout())
            .select(&root, ruby_version);

        let artifact = self.prepare(&root, &env, profile)?;
        let copied_to = match out {
            Some(out) => Some(self.copy_artifact(artifact.as_deref(), out)?),
            None => None,
        };

        self.reporter.info("All done!");
        Ok(PackageOutcome {
            root,
            ruby_version,
            profile,
            artifact,
            copied_to,
        })
    }

    fn check_prerequisites(&self) -> Result<()> {
        PREREQUISITES
            .iter()
            .try_for_each(|prerequisite| self.ensure_prerequisite(prerequisite))
    }

    fn ensure_prerequisite(&self, prerequisite: &Prerequisite) -> Result<()> {
        let missing = |hint: &str| PackagerError::PrerequisiteMissing {
            tool: prerequisite.tool.to_string(),
            message: hint.to_string(),
        };

        let path = self
            .runner
            .which(prerequisite.tool)
            .ok_or_else(|| missing(prerequisite.missing_hint))?;
        self.reporter.info(&format!(
            "{} is available at {}",
            prerequisite.tool,
            path.display()
        ));

        let cmd = CommandSpec::new(prerequisite.tool)
            .args(prerequisite.version_args.iter().copied())
            .capture();
        match self.runner.run(&cmd) {
            Ok(result) if result.success => {
                self.reporter.info(&format!(
                    "{} version: {}",
                    prerequisite.tool,
                    result.output.trim()
                ));
                Ok(())
            }
            Ok(_) | Err(_) => Err(missing(prerequisite.broken_hint)),
        }
    }

    /// Install the interpreter and create the gemset.
    fn install_ruby(&self, root: &Path, env: &RubyEnv) -> Result<()> {
        if rvm::needs_vendored_openssl(env.version) {
            self.reporter.info("Installing OpenSSL for RVM");
            let openssl = self.runner.run(&rvm::install_openssl().cwd(root));
            if !matches!(openssl, Ok(ref result) if result.success) {
                self.reporter.warn("Failed to install OpenSSL for RVM");
            }
        }

        self.reporter
            .info(&format!("Installing Ruby {} with RVM", env.version));
        self.run_install(
            rvm::install_ruby(env.version, &self.settings.openssl_dir).cwd(root),
            format!("Ruby {}", env.version),
        )?;

        self.reporter
            .info(&format!("Creating gemset {}", env.selector()));
        self.run_install(
            rvm::create_gemset(env).cwd(root),
            format!("gemset {}", env.selector()),
        )
    }

    /// Classify the bundled Rails version. Never fatal.
    fn check_rails_version(&self, root: &Path, env: &RubyEnv) {
        self.reporter.info("Detecting Rails version with Bundler");

        let output = match self.runner.run(&bundler::show(env, "rails").cwd(root)) {
            Ok(result) if result.success => result.output,
            _ => {
                self.reporter.warn(
                    "Failed to run bundle show rails, unable to verify Rails version, continuing",
                );
                return;
            }
        };

        match parse_bundle_show(&output).map(|version| (version, classify_rails(version))) {
            Some((version, Support::Supported)) => self
                .reporter
                .info(&format!("Supported Rails version {}", version)),
            Some((version, Support::Unsupported)) => self.reporter.warn(&format!(
                "Unsupported Rails version {}, continuing anyway",
                version
            )),
            None => self.reporter.warn(
                "Failed to parse output of bundle show rails, unable to verify Rails version, continuing",
            ),
        }
    }

    /// Add `veracode` (and rubyzip 1.x for old rubies) to the Gemfile.
    fn install_packaging_gem(&self, root: &Path, env: &RubyEnv) -> Result<()> {
        let source = self.settings.gem_source.as_str();

        if bundler::needs_legacy_rubyzip(env.version) {
            self.reporter.info(&format!(
                "Ruby {} needs rubyzip 1.x, adding it to the Gemfile",
                env.version
            ));
            self.run_install(
                bundler::add(env, "rubyzip", Some("~>1.0"), source).cwd(root),
                "rubyzip".to_string(),
            )?;
        }

        self.reporter
            .info(&format!("Checking for existence of '{}' gem", veracode::GEM_NAME));
        match self.runner.run(&bundler::show(env, veracode::GEM_NAME).cwd(root)) {
            Ok(result) if result.success => {
                self.reporter
                    .info("veracode gem already present, skipping install");
                Ok(())
            }
            _ => {
                self.reporter.info("Adding veracode gem with Bundler");
                self.run_install(
                    bundler::add(env, veracode::GEM_NAME, None, source).cwd(root),
                    format!("{} gem", veracode::GEM_NAME),
                )
            }
        }
    }

    fn run_install(&self, cmd: CommandSpec, what: String) -> Result<()> {
        let rendered = cmd.to_string();
        match self.runner.run(&cmd) {
            Ok(result) if result.success => Ok(()),
            Ok(result) => Err(PackagerError::InstallFailed {
                what,
                message: format!("`{}` exited with code {:?}", rendered, result.exit_code),
            }),
            Err(e) => Err(PackagerError::InstallFailed {
                what,
                message: e.to_string(),
            }),
        }
    }

    /// Run `veracode prepare` and locate the archive it wrote.
    fn prepare(
        &self,
        root: &Path,
        env: &RubyEnv,
        profile: RuntimeProfile,
    ) -> Result<Option<PathBuf>> {
        self.reporter.info(&format!(
            "Running veracode prepare with RAILS_ENV={}, this may take a while",
            profile
        ));

        let result = self
            .runner
            .run(&veracode::prepare(env, profile.as_str()).cwd(root))
            .map_err(|e| PackagerError::PackagingFailed {
                message: e.to_string(),
            })?;
        if !result.output.is_empty() {
            self.reporter.info(result.output.trim_end());
        }
        if !result.success {
            return Err(PackagerError::PackagingFailed {
                message: format!("veracode prepare exited with code {:?}", result.exit_code),
            });
        }

        let artifact = veracode::find_artifact(root, &result.output);
        match &artifact {
            Some(path) => self
                .reporter
                .info(&format!("Packaged artifact: {}", path.display())),
            None => self
                .reporter
                .warn("veracode prepare succeeded but no archive could be found"),
        }
        Ok(artifact)
    }

    fn copy_artifact(&self, artifact: Option<&Path>, out: &Path) -> Result<PathBuf> {
        let from = artifact.ok_or_else(|| PackagerError::PackagingFailed {
            message: format!("no archive to copy to {}", out.display()),
        })?;

        fs::copy(from, out).map_err(|source| PackagerError::ArtifactCopyFailed {
            from: from.to_path_buf(),
            to: out.to_path_buf(),
            source,
        })?;
        self.reporter
            .info(&format!("Copied {} to {}", from.display(), out.display()));
        Ok(out.to_path_buf())
    }
}

//! The packaging command behind the CLI.

use crate::cli::args::Cli;
use crate::config::load_settings;
use crate::error::Result;
use crate::package::{PackageOutcome, Packager};
use crate::report::Reporter;
use crate::shell::ProcessRunner;

/// Run a packaging job for the parsed arguments.
pub fn execute(
    cli: &Cli,
    runner: &dyn ProcessRunner,
    reporter: &dyn Reporter,
) -> Result<PackageOutcome> {
    let settings = load_settings(cli.config.as_deref())?;
    reporter.debug(&format!("Settings: {:?}", settings));

    Packager::new(runner, reporter, &settings).run(&cli.target, cli.out.as_deref())
}

/// One-line summary of a finished run.
pub fn summary(outcome: &PackageOutcome) -> String {
    let location = outcome
        .copied_to
        .as_ref()
        .or(outcome.artifact.as_ref())
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "location unknown".to_string());

    format!(
        "Packaged {} (Ruby {}, RAILS_ENV={}): {}",
        outcome.root.display(),
        outcome.ruby_version,
        outcome.profile,
        location
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PackagerError;
    use crate::probe::RuntimeProfile;
    use crate::report::MockReporter;
    use crate::shell::MockRunner;
    use crate::version::VersionSpec;
    use clap::Parser;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn outcome() -> PackageOutcome {
        PackageOutcome {
            root: PathBuf::from("/srv/app"),
            ruby_version: VersionSpec::new(2, 7, 6),
            profile: RuntimeProfile::Development,
            artifact: Some(PathBuf::from("/srv/app/tmp/veracode-app.zip")),
            copied_to: None,
        }
    }

    #[test]
    fn summary_names_artifact() {
        assert_eq!(
            summary(&outcome()),
            "Packaged /srv/app (Ruby 2.7.6, RAILS_ENV=development): /srv/app/tmp/veracode-app.zip"
        );
    }

    #[test]
    fn summary_prefers_copy() {
        let outcome = PackageOutcome {
            copied_to: Some(PathBuf::from("/out/app.zip")),
            ..outcome()
        };
        assert!(summary(&outcome).ends_with(": /out/app.zip"));
    }

    #[test]
    fn summary_without_artifact() {
        let outcome = PackageOutcome {
            artifact: None,
            ..outcome()
        };
        assert!(summary(&outcome).ends_with("location unknown"));
    }

    #[test]
    fn missing_explicit_config_fails_before_packaging() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("absent.yml");
        let cli = Cli::try_parse_from([
            "vcrbpkg",
            temp.path().to_str().unwrap(),
            "--config",
            missing.to_str().unwrap(),
        ])
        .unwrap();
        let runner = MockRunner::new();
        let reporter = MockReporter::new();

        let err = execute(&cli, &runner, &reporter).unwrap_err();

        assert!(matches!(err, PackagerError::ConfigNotFound { .. }));
        assert!(runner.commands().is_empty());
    }

    #[test]
    fn explicit_config_reaches_packager() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("config.yml");
        fs::write(&config, "gemset: scan\n").unwrap();
        let cli = Cli::try_parse_from([
            "vcrbpkg",
            temp.path().to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
        ])
        .unwrap();
        let runner = MockRunner::new();
        let reporter = MockReporter::new();

        // No ruby on the mock PATH, so the run stops at prerequisites.
        let err = execute(&cli, &runner, &reporter).unwrap_err();

        assert!(matches!(err, PackagerError::PrerequisiteMissing { .. }));
        assert!(reporter.has_message("gemset: \"scan\""));
    }
}

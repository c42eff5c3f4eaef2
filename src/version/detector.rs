//! Ruby version detection for a project checkout.
//!
//! Sources are consulted in a fixed priority order and the first one that
//! yields a version wins:
//!
//! 1. `.ruby-version`
//! 2. `.ruby-version.sample`
//! 3. the `ruby` directive in the `Gemfile`
//! 4. `ruby-version:` keys in `.github/workflows/*.yml`
//!
//! When none of them yields a version, the configured default is used and a
//! warning is reported. I/O failures only make a source absent.

use regex::Regex;
use std::fs;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use super::support::{classify_ruby, Support};
use super::VersionSpec;
use crate::report::Reporter;

/// Version used when no source names one.
pub const DEFAULT_RUBY_VERSION: VersionSpec = VersionSpec::new(3, 2, 2);

pub const PIN_FILE: &str = ".ruby-version";
pub const SAMPLE_PIN_FILE: &str = ".ruby-version.sample";
pub const MANIFEST_FILE: &str = "Gemfile";
pub const WORKFLOWS_DIR: &str = ".github/workflows";

/// Gemfile line such as `ruby '~> 3.1.2'` or `ruby "2.7.6", engine: ...`.
static MANIFEST_RUBY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ruby\b.+?(\d+\.\d+\.\d+)").expect("valid manifest regex")
});

/// Workflow line such as `ruby-version: '3.1.2'` or `ruby-version: [3.0.6]`.
static CI_RUBY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"ruby-version\s*:.*?(\d+\.\d+\.\d+)").expect("valid workflow regex")
});

/// Where a detected version came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSource {
    PinFile,
    SamplePinFile,
    Manifest,
    CiConfig,
}

impl VersionSource {
    /// Sources in the order they are consulted.
    pub const PRIORITY: [VersionSource; 4] = [
        VersionSource::PinFile,
        VersionSource::SamplePinFile,
        VersionSource::Manifest,
        VersionSource::CiConfig,
    ];

    /// Location of this source relative to the project root.
    pub fn relative_path(self) -> &'static str {
        match self {
            VersionSource::PinFile => PIN_FILE,
            VersionSource::SamplePinFile => SAMPLE_PIN_FILE,
            VersionSource::Manifest => MANIFEST_FILE,
            VersionSource::CiConfig => WORKFLOWS_DIR,
        }
    }
}

/// A detected version and the source that produced it.
///
/// `source` is `None` when the default was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub version: VersionSpec,
    pub source: Option<VersionSource>,
}

/// Determines which Ruby version a project needs.
pub struct VersionDetector<'a> {
    reporter: &'a dyn Reporter,
    default: VersionSpec,
}

impl<'a> VersionDetector<'a> {
    pub fn new(reporter: &'a dyn Reporter) -> Self {
        Self {
            reporter,
            default: DEFAULT_RUBY_VERSION,
        }
    }

    /// Use a different fallback version.
    pub fn with_default(mut self, default: VersionSpec) -> Self {
        self.default = default;
        self
    }

    /// Detect the version for the project at `root`. Never fails.
    pub fn detect(&self, root: &Path) -> VersionSpec {
        self.detect_with_source(root).version
    }

    /// Detect the version and report which source produced it.
    pub fn detect_with_source(&self, root: &Path) -> Detection {
        for source in VersionSource::PRIORITY {
            if let Some(version) = self.check_source(root, source) {
                return Detection {
                    version,
                    source: Some(source),
                };
            }
        }

        self.reporter.warn(&format!(
            "Unable to find Ruby version, giving it a try with {}",
            self.default
        ));
        Detection {
            version: self.default,
            source: None,
        }
    }

    /// Consult a single source.
    pub fn check_source(&self, root: &Path, source: VersionSource) -> Option<VersionSpec> {
        let path = root.join(source.relative_path());
        match source {
            VersionSource::PinFile | VersionSource::SamplePinFile => self.check_pin_file(&path),
            VersionSource::Manifest => self.check_manifest(&path),
            VersionSource::CiConfig => self.check_workflows(&path),
        }
    }

    /// Classify `version` against the supported list, warning if it is not.
    pub fn classify_supported(&self, version: VersionSpec) -> Support {
        let support = classify_ruby(version);
        match support {
            Support::Supported => self
                .reporter
                .info(&format!("Supported Ruby version {}", version)),
            Support::Unsupported => self.reporter.warn(&format!(
                "Ruby version {} is not supported! Trying anyway...",
                version
            )),
        }
        support
    }

    fn check_pin_file(&self, path: &Path) -> Option<VersionSpec> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.reporter
                    .info(&format!("File does not exist: {}", path.display()));
                return None;
            }
            Err(e) => {
                self.reporter
                    .warn(&format!("Error reading file {}: {}", path.display(), e));
                return None;
            }
        };

        let trimmed = content.trim();
        if trimmed.is_empty() {
            self.reporter
                .warn(&format!("File {} exists but is empty", path.display()));
            return None;
        }

        // rbenv and RVM also accept the engine-qualified form.
        let candidate = trimmed.strip_prefix("ruby-").unwrap_or(trimmed);
        match VersionSpec::parse(candidate) {
            Some(version) => {
                self.reporter.info(&format!(
                    "Found Ruby version {} in {}",
                    version,
                    path.display()
                ));
                Some(version)
            }
            None => {
                self.reporter.warn(&format!(
                    "Unrecognized format in {}: '{}' does not match x.y.z format",
                    path.display(),
                    trimmed
                ));
                None
            }
        }
    }

    fn check_manifest(&self, path: &Path) -> Option<VersionSpec> {
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.reporter
                    .info(&format!("File does not exist: {}", path.display()));
                return None;
            }
            Err(e) => {
                self.reporter.warn(&format!(
                    "Unable to open {}: {}",
                    path.display(),
                    e
                ));
                return None;
            }
        };

        let found = self.scan_lines(path, BufReader::new(file), &MANIFEST_RUBY);
        if found.is_none() {
            self.reporter
                .info(&format!("No ruby directive in {}", path.display()));
        }
        found
    }

    fn check_workflows(&self, dir: &Path) -> Option<VersionSpec> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.reporter
                    .info(&format!("No CI workflows at {}", dir.display()));
                return None;
            }
            Err(e) => {
                self.reporter
                    .warn(&format!("Error listing {}: {}", dir.display(), e));
                return None;
            }
        };

        let mut workflows: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && matches!(
                        path.extension().and_then(|ext| ext.to_str()),
                        Some("yml" | "yaml")
                    )
            })
            .collect();
        workflows.sort();

        for workflow in &workflows {
            let file = match fs::File::open(workflow) {
                Ok(file) => file,
                Err(e) => {
                    self.reporter.warn(&format!(
                        "Unable to open {}: {}",
                        workflow.display(),
                        e
                    ));
                    continue;
                }
            };
            if let Some(version) = self.scan_lines(workflow, BufReader::new(file), &CI_RUBY) {
                return Some(version);
            }
        }

        self.reporter.info(&format!(
            "No ruby-version in {} workflow file(s)",
            workflows.len()
        ));
        None
    }

    /// Return the first line match of `pattern` whose capture parses.
    ///
    /// Lines are decoded lossily so a stray non-UTF-8 byte only affects its
    /// own line.
    fn scan_lines<R>(&self, path: &Path, mut reader: R, pattern: &Regex) -> Option<VersionSpec>
    where
        R: BufRead,
    {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    self.reporter
                        .warn(&format!("Error reading {}: {}", path.display(), e));
                    return None;
                }
            }

            let line = String::from_utf8_lossy(&buf);
            let Some(caps) = pattern.captures(line.trim_end()) else {
                continue;
            };
            if let Some(version) = VersionSpec::parse(&caps[1]) {
                self.reporter.info(&format!(
                    "Found Ruby version {} in {}",
                    version,
                    path.display()
                ));
                return Some(version);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MockReporter;
    use tempfile::TempDir;

    fn project(files: &[(&str, &str)]) -> TempDir {
        let temp = TempDir::new().unwrap();
        for (path, content) in files {
            let full = temp.path().join(path);
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(full, content).unwrap();
        }
        temp
    }

    #[test]
    fn pin_file_wins_over_manifest() {
        let temp = project(&[
            (".ruby-version", "2.7.6\n"),
            ("Gemfile", "source 'https://rubygems.org'\nruby '3.1.2'\n"),
        ]);
        let reporter = MockReporter::new();
        let detection = VersionDetector::new(&reporter).detect_with_source(temp.path());

        assert_eq!(detection.version, VersionSpec::new(2, 7, 6));
        assert_eq!(detection.source, Some(VersionSource::PinFile));
        assert!(!reporter.has_message("Gemfile"));
    }

    #[test]
    fn sample_pin_file_is_second() {
        let temp = project(&[
            (".ruby-version.sample", "3.0.6"),
            ("Gemfile", "ruby '3.1.2'\n"),
        ]);
        let reporter = MockReporter::new();
        let detection = VersionDetector::new(&reporter).detect_with_source(temp.path());

        assert_eq!(detection.version, VersionSpec::new(3, 0, 6));
        assert_eq!(detection.source, Some(VersionSource::SamplePinFile));
    }

    #[test]
    fn malformed_pin_file_falls_through() {
        let temp = project(&[(".ruby-version", "3.1\n"), ("Gemfile", "ruby '3.1.4'\n")]);
        let reporter = MockReporter::new();
        let version = VersionDetector::new(&reporter).detect(temp.path());

        assert_eq!(version, VersionSpec::new(3, 1, 4));
        assert!(reporter.has_warning("does not match x.y.z"));
    }

    #[test]
    fn empty_pin_file_falls_through_with_warning() {
        let temp = project(&[(".ruby-version", "  \n"), ("Gemfile", "ruby '2.6.10'\n")]);
        let reporter = MockReporter::new();
        let version = VersionDetector::new(&reporter).detect(temp.path());

        assert_eq!(version, VersionSpec::new(2, 6, 10));
        assert!(reporter.has_warning("empty"));
    }

    #[test]
    fn pin_file_with_engine_prefix() {
        let temp = project(&[(".ruby-version", "ruby-3.1.2\n")]);
        let reporter = MockReporter::new();
        let version = VersionDetector::new(&reporter).detect(temp.path());

        assert_eq!(version, VersionSpec::new(3, 1, 2));
    }

    #[test]
    fn manifest_with_pessimistic_constraint() {
        let temp = project(&[(
            "Gemfile",
            "source 'https://rubygems.org'\ngit_source(:github) { |repo| repo }\n\nruby '~> 3.1.2'\n\ngem 'rails', '~> 7.0.4'\n",
        )]);
        let reporter = MockReporter::new();
        let detection = VersionDetector::new(&reporter).detect_with_source(temp.path());

        assert_eq!(detection.version, VersionSpec::new(3, 1, 2));
        assert_eq!(detection.source, Some(VersionSource::Manifest));
    }

    #[test]
    fn manifest_takes_first_triple_on_the_line() {
        let temp = project(&[(
            "Gemfile",
            "ruby \"13.1.2\", engine: \"jruby\", engine_version: \"9.4.0.0\"\n",
        )]);
        let reporter = MockReporter::new();
        let version = VersionDetector::new(&reporter).detect(temp.path());

        assert_eq!(version, VersionSpec::new(13, 1, 2));
    }

    #[test]
    fn manifest_ignores_gem_lines() {
        let temp = project(&[(
            "Gemfile",
            "gem 'rubyzip', '~> 1.2.3'\n  ruby '2.7.6'\nruby_version = '2.5.1'\n",
        )]);
        let reporter = MockReporter::new();
        let detection = VersionDetector::new(&reporter).detect_with_source(temp.path());

        assert_eq!(detection.source, None);
        assert_eq!(detection.version, DEFAULT_RUBY_VERSION);
    }

    #[test]
    fn ci_workflow_is_last_source() {
        let temp = project(&[
            ("Gemfile", "source 'https://rubygems.org'\n"),
            (
                ".github/workflows/ci.yaml",
                "jobs:\n  test:\n    steps:\n      - uses: ruby/setup-ruby@v1\n        with:\n          ruby-version: '3.0.6'\n",
            ),
        ]);
        let reporter = MockReporter::new();
        let detection = VersionDetector::new(&reporter).detect_with_source(temp.path());

        assert_eq!(detection.version, VersionSpec::new(3, 0, 6));
        assert_eq!(detection.source, Some(VersionSource::CiConfig));
    }

    #[test]
    fn ci_workflows_are_read_in_name_order() {
        let temp = project(&[
            (".github/workflows/b.yml", "ruby-version: 2.7.8\n"),
            (".github/workflows/a.yml", "ruby-version: [\"3.1.4\", \"3.2.2\"]\n"),
            (".github/workflows/notes.txt", "ruby-version: 1.9.3\n"),
        ]);
        let reporter = MockReporter::new();
        let version = VersionDetector::new(&reporter).detect(temp.path());

        assert_eq!(version, VersionSpec::new(3, 1, 4));
    }

    #[test]
    fn ci_workflow_with_minor_only_is_absent() {
        let temp = project(&[(".github/workflows/ci.yml", "ruby-version: '3.0'\n")]);
        let reporter = MockReporter::new();
        let detection = VersionDetector::new(&reporter).detect_with_source(temp.path());

        assert_eq!(detection.source, None);
    }

    #[test]
    fn no_source_falls_back_to_default_with_warning() {
        let temp = TempDir::new().unwrap();
        let reporter = MockReporter::new();
        let version = VersionDetector::new(&reporter).detect(temp.path());

        assert_eq!(version, VersionSpec::new(3, 2, 2));
        assert!(reporter.has_warning("Unable to find Ruby version"));
    }

    #[test]
    fn configured_default_is_used() {
        let temp = TempDir::new().unwrap();
        let reporter = MockReporter::new();
        let version = VersionDetector::new(&reporter)
            .with_default(VersionSpec::new(2, 7, 8))
            .detect(temp.path());

        assert_eq!(version, VersionSpec::new(2, 7, 8));
    }

    #[test]
    fn missing_pin_file_is_not_a_warning() {
        let temp = project(&[("Gemfile", "ruby '3.2.2'\n")]);
        let reporter = MockReporter::new();
        VersionDetector::new(&reporter).detect(temp.path());

        assert!(reporter.has_message("File does not exist"));
        assert!(reporter.warnings().is_empty());
    }

    #[test]
    fn classify_supported_warns_but_returns() {
        let reporter = MockReporter::new();
        let detector = VersionDetector::new(&reporter);

        assert_eq!(
            detector.classify_supported(VersionSpec::new(2, 5, 0)),
            Support::Supported
        );
        assert!(reporter.warnings().is_empty());

        assert_eq!(
            detector.classify_supported(VersionSpec::new(4, 0, 0)),
            Support::Unsupported
        );
        assert!(reporter.has_warning("not supported"));
    }

    #[test]
    fn unreadable_pin_file_warns_and_falls_through() {
        let temp = project(&[("Gemfile", "ruby '3.1.2'\n")]);
        fs::create_dir_all(temp.path().join(PIN_FILE)).unwrap();
        let reporter = MockReporter::new();

        let detection = VersionDetector::new(&reporter).detect_with_source(temp.path());

        assert_eq!(detection.version, VersionSpec::new(3, 1, 2));
        assert_eq!(detection.source, Some(VersionSource::Manifest));
        assert!(reporter.has_warning("Error reading file"));
    }

    #[test]
    fn unreadable_manifest_warns_and_falls_through() {
        let temp = project(&[(
            ".github/workflows/ci.yml",
            "          ruby-version: 3.0.6\n",
        )]);
        fs::create_dir_all(temp.path().join(MANIFEST_FILE)).unwrap();
        let reporter = MockReporter::new();

        let detection = VersionDetector::new(&reporter).detect_with_source(temp.path());

        assert_eq!(detection.version, VersionSpec::new(3, 0, 6));
        assert_eq!(detection.source, Some(VersionSource::CiConfig));
        assert!(reporter.has_warning("Gemfile"));
    }

    #[test]
    fn manifest_with_latin1_comment_still_matches() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(MANIFEST_FILE),
            b"# Maintainer: M\xfcller\nsource 'https://rubygems.org'\nruby '2.7.6'\n",
        )
        .unwrap();
        let reporter = MockReporter::new();

        let detection = VersionDetector::new(&reporter).detect_with_source(temp.path());

        assert_eq!(detection.version, VersionSpec::new(2, 7, 6));
        assert_eq!(detection.source, Some(VersionSource::Manifest));
        assert!(reporter.warnings().is_empty());
    }

    #[test]
    fn workflow_with_invalid_utf8_still_matches() {
        let temp = TempDir::new().unwrap();
        let workflows = temp.path().join(WORKFLOWS_DIR);
        fs::create_dir_all(&workflows).unwrap();
        fs::write(
            workflows.join("ci.yml"),
            b"name: \xff\xfe build\njobs:\n  ruby-version: '3.1.4'\n",
        )
        .unwrap();
        let reporter = MockReporter::new();

        assert_eq!(
            VersionDetector::new(&reporter).detect(temp.path()),
            VersionSpec::new(3, 1, 4)
        );
    }
}

//! Allow-lists of Ruby and Rails versions the analysis is known to handle.
//!
//! Being outside the list is never fatal; callers warn and carry on.

use regex::Regex;
use std::ops::RangeInclusive;
use std::sync::LazyLock;

use super::VersionSpec;

static BUNDLE_SHOW_RAILS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"rails-(\d+\.\d+\.\d+)").expect("valid rails regex"));

/// Whether a version is on an allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Support {
    Supported,
    Unsupported,
}

impl Support {
    pub fn is_supported(self) -> bool {
        self == Support::Supported
    }
}

/// One entry of an allow-list.
#[derive(Debug, Clone)]
enum SupportRule {
    /// Exactly this version.
    Exact(VersionSpec),
    /// Any version whose major is in range.
    Majors(RangeInclusive<u32>),
    /// A major with minors in range.
    Minors {
        major: u32,
        minors: RangeInclusive<u32>,
    },
}

impl SupportRule {
    fn matches(&self, version: VersionSpec) -> bool {
        match self {
            SupportRule::Exact(exact) => *exact == version,
            SupportRule::Majors(majors) => majors.contains(&version.major),
            SupportRule::Minors { major, minors } => {
                version.major == *major && minors.contains(&version.minor)
            }
        }
    }
}

const SUPPORTED_RUBY: &[SupportRule] = &[
    SupportRule::Exact(VersionSpec::new(1, 9, 3)),
    SupportRule::Minors {
        major: 2,
        minors: 0..=1,
    },
    SupportRule::Minors {
        major: 2,
        minors: 3..=7,
    },
    SupportRule::Minors {
        major: 3,
        minors: 0..=2,
    },
];

const SUPPORTED_RAILS: &[SupportRule] = &[
    SupportRule::Majors(3..=6),
    SupportRule::Minors {
        major: 7,
        minors: 0..=0,
    },
];

fn classify(rules: &[SupportRule], version: VersionSpec) -> Support {
    if rules.iter().any(|rule| rule.matches(version)) {
        Support::Supported
    } else {
        Support::Unsupported
    }
}

/// Classify a Ruby interpreter version.
pub fn classify_ruby(version: VersionSpec) -> Support {
    classify(SUPPORTED_RUBY, version)
}

/// Classify a Rails version.
pub fn classify_rails(version: VersionSpec) -> Support {
    classify(SUPPORTED_RAILS, version)
}

/// Extract the Rails version from `bundle show rails` output.
///
/// Bundler prints the gem's install path, e.g.
/// `/usr/local/rvm/gems/ruby-2.7.6@veracode/gems/rails-6.1.7`.
pub fn parse_bundle_show(output: &str) -> Option<VersionSpec> {
    let caps = BUNDLE_SHOW_RAILS.captures(output)?;
    VersionSpec::parse(&caps[1])
}

//! Three-part version numbers.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

/// `major.minor.patch` at the start of the input; anything after is ignored.
static VERSION_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.(\d+)\.(\d+)").expect("valid version regex"));

/// A `major.minor.patch` version.
///
/// Ordering is lexicographic on (major, minor, patch). A failed parse is
/// `None`, never a zero triple.
///
/// # Example
///
/// ```
/// use vcrbpkg::version::VersionSpec;
///
/// let v = VersionSpec::parse("3.2.2-rc1").unwrap();
/// assert_eq!(v, VersionSpec::new(3, 2, 2));
/// assert!(v > VersionSpec::new(3, 1, 9));
/// assert_eq!(VersionSpec::parse("1.2"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionSpec {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

/// Input that does not start with a `major.minor.patch` triple.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{input}' does not match the major.minor.patch format")]
pub struct InvalidVersion {
    pub input: String,
}

impl VersionSpec {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse the triple at the start of the trimmed text.
    ///
    /// Returns `None` for empty input, fewer than three numeric groups, or a
    /// group that does not fit in a `u32`.
    pub fn parse(text: &str) -> Option<Self> {
        let caps = VERSION_PREFIX.captures(text.trim())?;
        let major = caps[1].parse().ok()?;
        let minor = caps[2].parse().ok()?;
        let patch = caps[3].parse().ok()?;
        Some(Self::new(major, minor, patch))
    }

    /// The `major.minor` line, e.g. `2.7` for `2.7.6`.
    pub fn line(&self) -> (u32, u32) {
        (self.major, self.minor)
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for VersionSpec {
    type Err = InvalidVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| InvalidVersion {
            input: s.to_string(),
        })
    }
}

impl TryFrom<String> for VersionSpec {
    type Error = InvalidVersion;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VersionSpec> for String {
    fn from(version: VersionSpec) -> Self {
        version.to_string()
    }
}

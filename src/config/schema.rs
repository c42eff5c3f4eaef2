//! Configuration schema.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::probe::{DEFAULT_BOOT_TIMEOUT, DEFAULT_GEMSET};
use crate::version::{VersionSpec, DEFAULT_RUBY_VERSION};

/// Tool settings. Every key is optional.
///
/// ```yaml
/// default_ruby_version: 3.2.2
/// gemset: veracode
/// boot_timeout_secs: 15
/// gem_source: https://rubygems.org
/// openssl_dir: /usr/local/rvm/usr/
/// clone_depth: 1
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Ruby version used when the project names none.
    pub default_ruby_version: VersionSpec,

    /// RVM gemset the project's gems are installed into.
    pub gemset: String,

    /// Seconds `rails server` must stay up to count as booted.
    pub boot_timeout_secs: u64,

    /// Gem source passed to `bundle add`.
    pub gem_source: String,

    /// OpenSSL prefix used when building Ruby 2.x.
    pub openssl_dir: String,

    /// `git clone --depth` for repository targets.
    pub clone_depth: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_ruby_version: DEFAULT_RUBY_VERSION,
            gemset: DEFAULT_GEMSET.to_string(),
            boot_timeout_secs: DEFAULT_BOOT_TIMEOUT.as_secs(),
            gem_source: "https://rubygems.org".to_string(),
            openssl_dir: "/usr/local/rvm/usr/".to_string(),
            clone_depth: 1,
        }
    }
}

impl Settings {
    pub fn boot_timeout(&self) -> Duration {
        Duration::from_secs(self.boot_timeout_secs)
    }
}

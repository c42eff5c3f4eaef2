//! RVM command lines.

use crate::shell::CommandSpec;
use crate::version::VersionSpec;

/// An interpreter version paired with an isolated gemset.
///
/// Every project command runs through `rvm <version>@<gemset> do ...` so
/// gems never leak into the global interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RubyEnv {
    pub version: VersionSpec,
    pub gemset: String,
}

impl RubyEnv {
    pub fn new(version: VersionSpec, gemset: impl Into<String>) -> Self {
        Self {
            version,
            gemset: gemset.into(),
        }
    }

    /// The `<version>@<gemset>` selector.
    pub fn selector(&self) -> String {
        format!("{}@{}", self.version, self.gemset)
    }

    /// `rvm <version>@<gemset> do <args...>`
    pub fn exec<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::new("rvm")
            .arg(self.selector())
            .arg("do")
            .args(args)
    }
}

/// Ruby 2.x does not build against the OpenSSL 3 most systems ship.
pub fn needs_vendored_openssl(version: VersionSpec) -> bool {
    version.major == 2
}

/// `rvm pkg install openssl`
pub fn install_openssl() -> CommandSpec {
    CommandSpec::new("rvm").args(["pkg", "install", "openssl"])
}

/// `rvm install <version>`, building against RVM's OpenSSL where needed.
pub fn install_ruby(version: VersionSpec, openssl_dir: &str) -> CommandSpec {
    let cmd = CommandSpec::new("rvm").arg("install");
    if needs_vendored_openssl(version) {
        cmd.arg("--autolibs=disabled")
            .arg(format!("--with-openssl-dir={}", openssl_dir))
            .arg(version.to_string())
    } else {
        cmd.arg(version.to_string())
    }
}

/// `rvm <version> do rvm gemset create <gemset>`
pub fn create_gemset(env: &RubyEnv) -> CommandSpec {
    CommandSpec::new("rvm")
        .arg(env.version.to_string())
        .args(["do", "rvm", "gemset", "create"])
        .arg(env.gemset.clone())
}

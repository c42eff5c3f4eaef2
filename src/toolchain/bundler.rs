//! Bundler command lines, always run inside a [`RubyEnv`].

use super::rvm::RubyEnv;
use crate::shell::CommandSpec;
use crate::version::VersionSpec;

/// `bundle install`, optionally skipping dependency groups.
pub fn install(env: &RubyEnv, without: &[&str]) -> CommandSpec {
    let cmd = env.exec(["bundle", "install"]);
    if without.is_empty() {
        cmd
    } else {
        cmd.arg("--without").args(without.iter().copied())
    }
}

/// `bundle show <gem>`, output captured.
pub fn show(env: &RubyEnv, gem: &str) -> CommandSpec {
    env.exec(["bundle", "show", gem]).capture()
}

/// `bundle add <gem> [--version <req>] --source <source> --skip-install`
pub fn add(env: &RubyEnv, gem: &str, requirement: Option<&str>, source: &str) -> CommandSpec {
    let mut cmd = env.exec(["bundle", "add", gem]);
    if let Some(requirement) = requirement {
        cmd = cmd.args(["--version", requirement]);
    }
    cmd.args(["--source", source, "--skip-install"])
}

/// Rubies up to 2.4 need rubyzip 1.x; newer rubyzip releases dropped them.
pub fn needs_legacy_rubyzip(version: VersionSpec) -> bool {
    version.major < 2 || (version.major == 2 && version.minor <= 4)
}

//! The `veracode` packaging gem.

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::SystemTime;

use super::rvm::RubyEnv;
use crate::shell::CommandSpec;

pub const GEM_NAME: &str = "veracode";

static ZIP_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([^\s'"]+\.zip)\b"#).expect("valid zip path regex"));

/// `veracode prepare -vD` with the selected `RAILS_ENV`, output captured.
pub fn prepare(env: &RubyEnv, rails_env: &str) -> CommandSpec {
    env.exec([GEM_NAME, "prepare", "-vD"])
        .env("RAILS_ENV", rails_env)
        .capture()
}

/// Locate the archive written by `veracode prepare`.
///
/// Prefers the first existing `.zip` path named in the output (relative
/// paths are resolved against `root`), then the newest `tmp/veracode*.zip`.
pub fn find_artifact(root: &Path, output: &str) -> Option<PathBuf> {
    artifact_from_output(root, output).or_else(|| newest_in_tmp(root))
}

fn artifact_from_output(root: &Path, output: &str) -> Option<PathBuf> {
    ZIP_PATH
        .captures_iter(output)
        .map(|caps| {
            let path = PathBuf::from(&caps[1]);
            if path.is_absolute() {
                path
            } else {
                root.join(path)
            }
        })
        .find(|path| path.is_file())
}

fn newest_in_tmp(root: &Path) -> Option<PathBuf> {
    let entries = fs::read_dir(root.join("tmp")).ok()?;

    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            name.starts_with(GEM_NAME) && name.ends_with(".zip")
        })
        .filter_map(|entry| {
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            Some((modified, entry.path())).filter(|(_, path)| path.is_file())
        })
        .max_by_key(|(modified, _)| *modified)
        .map(|(_, path)| path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::VersionSpec;
    use tempfile::TempDir;

    #[test]
    fn prepare_sets_rails_env() {
        let env = RubyEnv::new(VersionSpec::new(3, 2, 2), "veracode");
        let cmd = prepare(&env, "development");
        assert!(cmd.capture);
        assert_eq!(
            cmd.to_string(),
            "RAILS_ENV=development rvm 3.2.2@veracode do veracode prepare -vD"
        );
    }

    #[test]
    fn artifact_named_in_output() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("tmp")).unwrap();
        fs::write(temp.path().join("tmp/veracode-20240101.zip"), "zip").unwrap();

        let output = "Compiling...\nCreating archive 'tmp/veracode-20240101.zip'\nDone\n";
        assert_eq!(
            find_artifact(temp.path(), output),
            Some(temp.path().join("tmp/veracode-20240101.zip"))
        );
    }

    #[test]
    fn artifact_absolute_path_in_output() {
        let temp = TempDir::new().unwrap();
        let zip = temp.path().join("upload.zip");
        fs::write(&zip, "zip").unwrap();

        let output = format!("Wrote {}\n", zip.display());
        assert_eq!(find_artifact(temp.path(), &output), Some(zip));
    }

    #[test]
    fn nonexistent_path_in_output_falls_back_to_tmp() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("tmp")).unwrap();
        fs::write(temp.path().join("tmp/veracode-app.zip"), "zip").unwrap();
        fs::write(temp.path().join("tmp/other.zip"), "zip").unwrap();

        let output = "archive at /nowhere/missing.zip\n";
        assert_eq!(
            find_artifact(temp.path(), output),
            Some(temp.path().join("tmp/veracode-app.zip"))
        );
    }

    #[test]
    fn no_artifact_anywhere() {
        let temp = TempDir::new().unwrap();
        assert_eq!(find_artifact(temp.path(), "nothing here"), None);
    }
}

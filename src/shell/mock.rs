//! Scripted process runner for testing.
//!
//! `MockRunner` implements the `ProcessRunner` trait without starting any
//! process. Outcomes are matched by substring against the rendered command
//! line (see `CommandSpec`'s `Display`), and every call is recorded.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use vcrbpkg::shell::{CommandResult, CommandSpec, MockRunner, ProcessRunner};
//!
//! let runner = MockRunner::new()
//!     .with_tool("git")
//!     .respond("git clone", CommandResult::failure(Some(128), "", Duration::ZERO));
//!
//! assert!(runner.which("git").is_some());
//! let result = runner.run(&CommandSpec::new("git").arg("clone")).unwrap();
//! assert_eq!(result.exit_code, Some(128));
//! assert!(runner.ran("git clone"));
//! ```

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{PackagerError, Result};

use super::{CommandResult, CommandSpec, ProcessRunner};

/// Process runner with scripted outcomes.
///
/// Queued outcomes are consumed first, then sticky responses apply.
/// Unmatched commands succeed with empty output.
#[derive(Debug, Default)]
pub struct MockRunner {
    tools: HashMap<String, PathBuf>,
    responses: Vec<(String, CommandResult)>,
    queues: RefCell<Vec<(String, VecDeque<CommandResult>)>>,
    unstartable: Vec<String>,
    calls: RefCell<Vec<CommandSpec>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `which(name)` succeed.
    pub fn with_tool(mut self, name: &str) -> Self {
        self.tools
            .insert(name.to_string(), PathBuf::from("/usr/bin").join(name));
        self
    }

    /// Return `result` for every command containing `pattern`.
    pub fn respond(mut self, pattern: &str, result: CommandResult) -> Self {
        self.responses.push((pattern.to_string(), result));
        self
    }

    /// Return `results` in order for commands containing `pattern`.
    pub fn queue(self, pattern: &str, results: Vec<CommandResult>) -> Self {
        self.queues
            .borrow_mut()
            .push((pattern.to_string(), results.into_iter().collect()));
        self
    }

    /// Fail to start any command containing `pattern`.
    pub fn unstartable(mut self, pattern: &str) -> Self {
        self.unstartable.push(pattern.to_string());
        self
    }

    /// Every command run so far.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.borrow().clone()
    }

    /// Every command run so far, rendered.
    pub fn commands(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.to_string()).collect()
    }

    /// Whether any command containing `pattern` was run.
    pub fn ran(&self, pattern: &str) -> bool {
        self.commands().iter().any(|c| c.contains(pattern))
    }

    /// Number of commands containing `pattern` that were run.
    pub fn count(&self, pattern: &str) -> usize {
        self.commands().iter().filter(|c| c.contains(pattern)).count()
    }
}

impl ProcessRunner for MockRunner {
    fn which(&self, program: &str) -> Option<PathBuf> {
        self.tools.get(program).cloned()
    }

    fn run(&self, spec: &CommandSpec) -> Result<CommandResult> {
        self.calls.borrow_mut().push(spec.clone());
        let rendered = spec.to_string();

        if self.unstartable.iter().any(|p| rendered.contains(p)) {
            return Err(PackagerError::CommandFailed {
                command: rendered,
                message: "scripted start failure".to_string(),
            });
        }

        for (pattern, queue) in self.queues.borrow_mut().iter_mut() {
            if rendered.contains(pattern.as_str()) {
                if let Some(result) = queue.pop_front() {
                    return Ok(result);
                }
            }
        }

        if let Some((_, result)) = self.responses.iter().find(|(p, _)| rendered.contains(p)) {
            return Ok(result.clone());
        }

        Ok(CommandResult::success(String::new(), Duration::ZERO))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmatched_commands_succeed() {
        let runner = MockRunner::new();
        let result = runner.run(&CommandSpec::new("ruby").arg("--version")).unwrap();
        assert!(result.success);
        assert_eq!(runner.commands(), vec!["ruby --version".to_string()]);
    }

    #[test]
    fn queued_results_are_consumed_in_order() {
        let runner = MockRunner::new().queue(
            "rails server",
            vec![
                CommandResult::failure(Some(1), "", Duration::ZERO),
                CommandResult::timed_out("", Duration::ZERO),
            ],
        );
        let spec = CommandSpec::new("rails").arg("server");

        assert_eq!(runner.run(&spec).unwrap().exit_code, Some(1));
        assert!(runner.run(&spec).unwrap().timed_out);
        assert!(runner.run(&spec).unwrap().success);
        assert_eq!(runner.count("rails server"), 3);
    }

    #[test]
    fn env_overrides_take_part_in_matching() {
        let runner = MockRunner::new().respond(
            "RAILS_ENV=test",
            CommandResult::timed_out("", Duration::ZERO),
        );
        let dev = CommandSpec::new("rails").env("RAILS_ENV", "development");
        let test = CommandSpec::new("rails").env("RAILS_ENV", "test");

        assert!(!runner.run(&dev).unwrap().timed_out);
        assert!(runner.run(&test).unwrap().timed_out);
    }

    #[test]
    fn unstartable_commands_error() {
        let runner = MockRunner::new().unstartable("veracode");
        let err = runner
            .run(&CommandSpec::new("veracode").arg("prepare"))
            .unwrap_err();
        assert!(matches!(err, PackagerError::CommandFailed { .. }));
    }

    #[test]
    fn which_only_knows_registered_tools() {
        let runner = MockRunner::new().with_tool("rvm");
        assert_eq!(runner.which("rvm"), Some(PathBuf::from("/usr/bin/rvm")));
        assert!(runner.which("git").is_none());
    }
}

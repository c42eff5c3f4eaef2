//! External process execution and executable lookup.

pub mod command;
pub mod mock;
pub mod path;

pub use command::{execute, CommandResult, CommandSpec, ProcessRunner, SystemRunner};
pub use mock::MockRunner;
pub use path::{is_executable, parse_system_path, resolve_tool_path};

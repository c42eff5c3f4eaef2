//! Command lines for the Ruby toolchain: RVM, Bundler and the packaging gem.
//!
//! These functions only build [`CommandSpec`](crate::shell::CommandSpec)s;
//! running them is up to the caller's
//! [`ProcessRunner`](crate::shell::ProcessRunner).

pub mod bundler;
pub mod rvm;
pub mod veracode;

pub use rvm::RubyEnv;

//! Version parsing, detection and support classification.

pub mod detector;
pub mod spec;
pub mod support;

pub use detector::{Detection, VersionDetector, VersionSource, DEFAULT_RUBY_VERSION};
pub use spec::{InvalidVersion, VersionSpec};
pub use support::{classify_rails, classify_ruby, parse_bundle_show, Support};

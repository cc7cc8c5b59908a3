//! Version handling for registry artifacts
//!
//! - [`semver`]: validation and ordering of `major.minor.patch[-pre][+build]`
//!   strings, including the `""` / `"latest"` sentinels

pub mod semver;

pub use semver::{LATEST, SemanticVersion, VersionComparator, is_sentinel};

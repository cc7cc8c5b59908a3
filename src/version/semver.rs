use std::cmp::Ordering;
use std::fmt;

use regex::Regex;

use crate::error::ValidationError;

/// Sentinel meaning "most recent version"
pub const LATEST: &str = "latest";

/// `v?MAJOR.MINOR.PATCH[-prerelease][+build]`
const VERSION_PATTERN: &str =
    r"^v?(\d+)\.(\d+)\.(\d+)(?:-([0-9A-Za-z.\-]+))?(?:\+([0-9A-Za-z.\-]+))?$";

/// Returns true for the two version strings that mean "unconstrained"
pub fn is_sentinel(version: &str) -> bool {
    version.is_empty() || version == LATEST
}

/// A parsed version. `build_metadata` never participates in ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SemanticVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: String,
    pub build_metadata: String,
}

impl SemanticVersion {
    pub fn is_prerelease(&self) -> bool {
        !self.prerelease.is_empty()
    }

    /// Order by numeric core, then release-before-prerelease, then the
    /// prerelease tags compared as plain strings.
    ///
    /// The prerelease comparison is lexical on purpose: `beta.10` sorts
    /// before `beta.2`.
    pub fn precedence(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (self.is_prerelease(), other.is_prerelease()) {
                (false, true) => Ordering::Greater,
                (true, false) => Ordering::Less,
                _ => self.prerelease.cmp(&other.prerelease),
            })
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.prerelease.is_empty() {
            write!(f, "-{}", self.prerelease)?;
        }
        if !self.build_metadata.is_empty() {
            write!(f, "+{}", self.build_metadata)?;
        }
        Ok(())
    }
}

/// Validates and orders version strings.
///
/// Holds its compiled grammar, so construct it once and share it.
#[derive(Debug, Clone)]
pub struct VersionComparator {
    pattern: Regex,
}

impl VersionComparator {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(VERSION_PATTERN).expect("version pattern is a valid regex"),
        }
    }

    /// Parse a version string. Sentinels and malformed strings yield `None`.
    pub fn parse(&self, version: &str) -> Option<SemanticVersion> {
        let caps = self.pattern.captures(version)?;
        let number = |i: usize| caps.get(i)?.as_str().parse::<u64>().ok();
        let text = |i: usize| {
            caps.get(i)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        };

        Some(SemanticVersion {
            major: number(1)?,
            minor: number(2)?,
            patch: number(3)?,
            prerelease: text(4),
            build_metadata: text(5),
        })
    }

    /// Accepts the sentinels `""` and `"latest"`, or a full semantic version
    pub fn validate(&self, version: &str) -> Result<(), ValidationError> {
        if is_sentinel(version) {
            return Ok(());
        }

        if !self.pattern.is_match(version) {
            return Err(ValidationError::new(
                "version",
                version,
                format!("invalid semantic version format: {}", version),
            ));
        }

        if self.parse(version).is_none() {
            return Err(ValidationError::new(
                "version",
                version,
                format!("version component out of range: {}", version),
            ));
        }

        Ok(())
    }

    /// Compare two version strings.
    ///
    /// Strings that do not parse (including the sentinels) order as `0.0.0`.
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        let a = self.parse(a).unwrap_or_default();
        let b = self.parse(b).unwrap_or_default();
        a.precedence(&b)
    }

    /// The greatest version in `versions`, or `None` when the list is empty.
    ///
    /// On ties the earliest entry wins.
    pub fn max<'a, S: AsRef<str>>(&self, versions: &'a [S]) -> Option<&'a str> {
        let mut iter = versions.iter().map(AsRef::as_ref);
        let first = iter.next()?;
        Some(iter.fold(first, |best, candidate| {
            if self.compare(candidate, best) == Ordering::Greater {
                candidate
            } else {
                best
            }
        }))
    }
}

impl Default for VersionComparator {
    fn default() -> Self {
        Self::new()
    }
}

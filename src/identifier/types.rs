//! Validated identifier values
//!
//! Instances are only produced by [`IdentifierParser`](super::IdentifierParser)
//! or by field validation, so every field is known to match its grammar.

use std::fmt;

/// `namespace/name/provider/version`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleId {
    pub namespace: String,
    pub name: String,
    pub provider: String,
    pub version: String,
}

impl ModuleId {
    /// `namespace/name/provider`, shared by every version of the module
    pub fn base(&self) -> String {
        format!("{}/{}/{}", self.namespace, self.name, self.provider)
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base(), self.version)
    }
}

/// `namespace/name/version`, optionally written with a `policies/` marker
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PolicyId {
    pub namespace: String,
    pub name: String,
    pub version: String,
}

impl PolicyId {
    pub fn base(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

impl fmt::Display for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base(), self.version)
    }
}

/// A provider reference. `version` is `None` when absent or a sentinel
/// (`latest`), meaning "most recent".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderUri {
    pub namespace: String,
    pub name: String,
    pub version: Option<String>,
}

impl fmt::Display for ProviderUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)?;
        if let Some(version) = &self.version {
            write!(f, "/{}", version)?;
        }
        Ok(())
    }
}

/// Version-independent identity of a listed item, used to merge results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub key: String,
    pub version: Option<String>,
}

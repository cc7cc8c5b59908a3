//! Sentinel policy set configuration derived from a policy release

use std::fmt::{self, Write as _};
use std::str::FromStr;

use serde::Serialize;
use tracing::warn;

use crate::error::ValidationError;
use crate::identifier::PolicyId;
use crate::registry::types::{PolicyDetails, PolicyIncluded};

const POLICY_MODULE_KIND: &str = "policy-modules";
const POLICY_KIND: &str = "policies";

/// How strictly a policy is enforced by a policy set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EnforcementLevel {
    #[default]
    Advisory,
    SoftMandatory,
    HardMandatory,
}

impl EnforcementLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            EnforcementLevel::Advisory => "advisory",
            EnforcementLevel::SoftMandatory => "soft-mandatory",
            EnforcementLevel::HardMandatory => "hard-mandatory",
        }
    }
}

impl fmt::Display for EnforcementLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnforcementLevel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "advisory" => Ok(EnforcementLevel::Advisory),
            "soft-mandatory" => Ok(EnforcementLevel::SoftMandatory),
            "hard-mandatory" => Ok(EnforcementLevel::HardMandatory),
            other => Err(ValidationError::new(
                "enforcement_level",
                other,
                "enforcement level must be one of: advisory, soft-mandatory, hard-mandatory",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentinelModule {
    pub name: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentinelPolicy {
    pub name: String,
    /// `sha256:<hex>`
    pub checksum: String,
    pub source: String,
}

/// Modules and policies of one policy release, with checksummed sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentinelPolicyContent {
    pub policy_id: String,
    pub description: String,
    pub version: String,
    pub modules: Vec<SentinelModule>,
    pub policies: Vec<SentinelPolicy>,
}

impl SentinelPolicyContent {
    /// Collect the bundled modules and policies of `details`. Entries
    /// without a name or checksum are skipped.
    pub fn from_details(base_url: &str, id: &PolicyId, details: &PolicyDetails) -> Self {
        let release = format!(
            "{}/v2/policies/{}/{}/{}",
            base_url, id.namespace, id.name, id.version
        );
        let mut modules = Vec::new();
        let mut policies = Vec::new();

        for included in &details.included {
            let kind = included.kind.as_str();
            if kind != POLICY_MODULE_KIND && kind != POLICY_KIND {
                continue;
            }
            let Some((name, shasum)) = name_and_shasum(included) else {
                warn!("Skipping {} entry {} of {}: missing name or shasum", kind, included.id, id);
                continue;
            };

            if kind == POLICY_MODULE_KIND {
                modules.push(SentinelModule {
                    name: name.to_string(),
                    source: format!(
                        "{}/policy-module/{}.sentinel?checksum=sha256:{}",
                        release, name, shasum
                    ),
                });
            } else {
                policies.push(SentinelPolicy {
                    name: name.to_string(),
                    checksum: format!("sha256:{}", shasum),
                    source: format!(
                        "{}/policy/{}.sentinel?checksum=sha256:{}",
                        release, name, shasum
                    ),
                });
            }
        }

        Self {
            policy_id: id.to_string(),
            description: details.data.attributes.description.clone(),
            version: details.data.attributes.version.clone(),
            modules,
            policies,
        }
    }

    /// Policy set configuration in HCL, every policy at `level`
    pub fn generate_hcl(&self, level: EnforcementLevel) -> String {
        let mut hcl = String::new();
        // writing into a String cannot fail
        let _ = write!(
            hcl,
            "# Sentinel Policy Configuration\n# Policy: {}\n# Version: {}\n# Description: {}\n\n",
            self.policy_id, self.version, self.description
        );

        if !self.modules.is_empty() {
            hcl.push_str("# Policy Modules\n");
            for module in &self.modules {
                let _ = write!(
                    hcl,
                    "module \"{}\" {{\n  source = \"{}\"\n}}\n\n",
                    module.name, module.source
                );
            }
        }

        if !self.policies.is_empty() {
            hcl.push_str("# Policies\n");
            for policy in &self.policies {
                let _ = write!(
                    hcl,
                    "policy \"{}\" {{\n  source            = \"{}\"\n  enforcement_level = \"{}\"\n}}\n\n",
                    policy.name, policy.source, level
                );
            }
        }

        hcl
    }
}

fn name_and_shasum(included: &PolicyIncluded) -> Option<(&str, &str)> {
    let attributes = &included.attributes;
    if attributes.name.is_empty() || attributes.shasum.is_empty() {
        return None;
    }
    Some((attributes.name.as_str(), attributes.shasum.as_str()))
}

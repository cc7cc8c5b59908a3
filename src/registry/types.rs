//! Response types of the registry's v1 (modules, provider versions) and
//! v2 JSON:API (providers, policies) endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::search::Searchable;

/// Treat `null` like a missing field
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// Modules (v1)
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Module {
    pub id: String,
    pub owner: String,
    pub namespace: String,
    pub name: String,
    pub version: String,
    pub provider: String,
    #[serde(deserialize_with = "nullable")]
    pub description: String,
    #[serde(deserialize_with = "nullable")]
    pub source: String,
    pub tag: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub downloads: u64,
    pub verified: bool,
}

impl Searchable for Module {
    fn identifier(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn provider(&self) -> &str {
        &self.provider
    }

    fn verified(&self) -> bool {
        self.verified
    }

    fn downloads(&self) -> u64 {
        self.downloads
    }

    fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }
}

/// Offset pagination of module search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleMeta {
    pub limit: u64,
    pub current_offset: u64,
    pub next_offset: Option<u64>,
    pub prev_offset: Option<u64>,
    pub next_url: Option<String>,
    pub prev_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleList {
    pub meta: ModuleMeta,
    pub modules: Vec<Module>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleDetails {
    #[serde(flatten)]
    pub module: Module,
    pub provider_logo_url: Option<String>,
    pub root: ModulePart,
    pub submodules: Vec<ModulePart>,
    pub examples: Vec<ModulePart>,
    pub providers: Vec<String>,
    pub versions: Vec<String>,
}

/// Root module, submodule or example
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModulePart {
    pub path: String,
    pub name: String,
    pub readme: Option<String>,
    pub empty: bool,
    pub inputs: Vec<ModuleInput>,
    pub outputs: Vec<ModuleOutput>,
    pub dependencies: Vec<ModuleDependency>,
    pub provider_dependencies: Vec<ModuleProviderDependency>,
    pub resources: Vec<ModuleResource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleInput {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(deserialize_with = "nullable")]
    pub description: String,
    pub default: Option<serde_json::Value>,
    pub required: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleOutput {
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleDependency {
    pub name: String,
    pub source: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleProviderDependency {
    pub name: String,
    pub namespace: String,
    pub source: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleResource {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Body of `modules/{namespace}/{name}/{provider}/versions`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ModuleVersionsResponse {
    pub modules: Vec<ModuleVersionGroup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ModuleVersionGroup {
    pub versions: Vec<ModuleVersionEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ModuleVersionEntry {
    pub version: String,
}

// =============================================================================
// Providers
// =============================================================================

/// A specific provider release (v1)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Provider {
    pub id: String,
    pub owner: String,
    pub namespace: String,
    pub name: String,
    pub alias: Option<String>,
    pub version: String,
    pub tag: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub description: String,
    #[serde(deserialize_with = "nullable")]
    pub source: String,
    pub published_at: Option<DateTime<Utc>>,
    pub downloads: u64,
    pub tier: String,
    pub logo_url: Option<String>,
    pub versions: Vec<String>,
}

/// Provider resource (v2)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderData {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub attributes: ProviderAttributes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProviderAttributes {
    pub alias: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub description: String,
    pub downloads: u64,
    pub featured: bool,
    pub full_name: String,
    pub logo_url: Option<String>,
    pub name: String,
    pub namespace: String,
    pub owner_name: String,
    #[serde(deserialize_with = "nullable")]
    pub source: String,
    pub tier: String,
    pub unlisted: bool,
}

/// Provider version resource (v2 `included`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderVersion {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub attributes: VersionAttributes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct VersionAttributes {
    #[serde(deserialize_with = "nullable")]
    pub description: String,
    pub downloads: u64,
    pub published_at: Option<DateTime<Utc>>,
    pub tag: Option<String>,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderLatestVersion {
    pub provider: ProviderData,
    pub version: String,
}

/// One page of the provider listing (v2)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderList {
    pub data: Vec<ProviderData>,
    pub links: Links,
    pub meta: Meta,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Links {
    pub first: Option<String>,
    pub last: Option<String>,
    pub next: Option<String>,
    pub prev: Option<String>,
}

/// Documentation page entry of a v1 provider release
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderDoc {
    pub id: String,
    pub title: String,
    pub path: String,
    pub slug: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub language: String,
}

/// A provider release together with its documentation index (v1)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderDocs {
    #[serde(flatten)]
    pub provider: Provider,
    pub docs: Vec<ProviderDoc>,
}

/// Provider documentation resource (v2). `content` is only filled in by
/// single-document lookups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderDocData {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub attributes: DocAttributes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocAttributes {
    pub category: String,
    #[serde(deserialize_with = "nullable")]
    pub content: String,
    pub language: String,
    pub path: String,
    pub slug: String,
    pub subcategory: Option<String>,
    pub title: String,
    pub truncated: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderDocDetails {
    pub data: ProviderDocData,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ProviderDocList {
    pub data: Vec<ProviderDocData>,
    pub meta: Meta,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ProviderVersionsResponse {
    pub included: Vec<ProviderVersion>,
}

// =============================================================================
// Policies (v2)
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub attributes: PolicyAttributes,
    pub relationships: PolicyRelationships,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PolicyAttributes {
    pub downloads: u64,
    pub full_name: String,
    pub ingress: String,
    pub name: String,
    pub namespace: String,
    pub owner_name: String,
    #[serde(deserialize_with = "nullable")]
    pub source: String,
    #[serde(deserialize_with = "nullable")]
    pub title: String,
    pub verified: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PolicyRelationships {
    pub latest_version: Option<Relationship>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Relationship {
    pub data: Option<ResourceIdentifier>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceIdentifier {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Searchable for Policy {
    fn identifier(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.attributes.name
    }

    fn description(&self) -> &str {
        &self.attributes.title
    }

    fn namespace(&self) -> &str {
        &self.attributes.namespace
    }

    fn verified(&self) -> bool {
        self.attributes.verified
    }

    fn downloads(&self) -> u64 {
        self.attributes.downloads
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyList {
    pub data: Vec<Policy>,
    pub included: Vec<PolicyVersion>,
    pub meta: Meta,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Meta {
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Pagination {
    pub page_size: u32,
    pub current_page: u32,
    pub next_page: Option<u32>,
    pub prev_page: Option<u32>,
    pub total_pages: u32,
    pub total_count: u32,
}

/// A specific policy release
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyVersion {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub attributes: PolicyVersionAttributes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PolicyVersionAttributes {
    #[serde(deserialize_with = "nullable")]
    pub description: String,
    pub downloads: u64,
    pub published_at: Option<DateTime<Utc>>,
    pub readme: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub source: String,
    pub tag: Option<String>,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyDetails {
    pub data: PolicyVersion,
    pub included: Vec<PolicyIncluded>,
}

/// Individual policies, modules and the library bundled in a policy release
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyIncluded {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub attributes: PolicyIncludedAttributes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PolicyIncludedAttributes {
    #[serde(deserialize_with = "nullable")]
    pub description: String,
    pub downloads: u64,
    pub full_name: String,
    pub name: String,
    pub shasum: String,
    pub shasum_type: String,
    #[serde(deserialize_with = "nullable")]
    pub title: String,
}

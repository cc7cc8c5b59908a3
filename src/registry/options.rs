//! Filters accepted by the listing endpoints

use std::fmt;
use std::str::FromStr;

use crate::config::MAX_PAGE_SIZE;
use crate::error::{MultiError, RegistryError, ValidationError};
use crate::identifier::IdentifierParser;

/// Page size sent when the caller leaves it at 0
pub const DEFAULT_LIST_PAGE_SIZE: u32 = 50;

/// Effective page size for `requested`: 0 selects the default, anything
/// above the registry maximum is rejected.
pub fn effective_page_size(field: &str, requested: u32) -> Result<u32, ValidationError> {
    match requested {
        0 => Ok(DEFAULT_LIST_PAGE_SIZE),
        size if size > MAX_PAGE_SIZE => Err(ValidationError::new(
            field,
            size.to_string(),
            format!("{} must be between 0 and {}", field, MAX_PAGE_SIZE),
        )),
        size => Ok(size),
    }
}

/// Filters of the module listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleListOptions {
    pub offset: u64,
    /// 0 means the default page size
    pub limit: u32,
    pub provider: Option<String>,
    /// Only verified modules when set
    pub verified: bool,
}

impl ModuleListOptions {
    /// Query parameters, after checking every field
    pub fn to_params(
        &self,
        parser: &IdentifierParser,
    ) -> Result<Vec<(&'static str, String)>, RegistryError> {
        let mut errors = MultiError::new();
        let limit = match effective_page_size("limit", self.limit) {
            Ok(limit) => limit,
            Err(e) => {
                errors.add(e);
                DEFAULT_LIST_PAGE_SIZE
            }
        };
        if let Some(provider) = self
            .provider
            .as_deref()
            .filter(|p| !parser.is_valid_provider(p))
        {
            errors.add(ValidationError::new(
                "provider",
                provider,
                "provider must start with a lowercase letter and contain only lowercase letters, digits and hyphens",
            ));
        }
        errors.into_result()?;

        let mut params = Vec::new();
        if self.offset > 0 {
            params.push(("offset", self.offset.to_string()));
        }
        params.push(("limit", limit.to_string()));
        if let Some(provider) = &self.provider {
            params.push(("provider", provider.clone()));
        }
        if self.verified {
            params.push(("verified", "true".to_string()));
        }
        Ok(params)
    }
}

/// Provider tiers the registry distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderTier {
    Official,
    Partner,
    Community,
}

impl ProviderTier {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderTier::Official => "official",
            ProviderTier::Partner => "partner",
            ProviderTier::Community => "community",
        }
    }
}

impl fmt::Display for ProviderTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderTier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "official" => Ok(ProviderTier::Official),
            "partner" => Ok(ProviderTier::Partner),
            "community" => Ok(ProviderTier::Community),
            other => Err(ValidationError::new(
                "tier",
                other,
                "tier must be one of: official, partner, community",
            )),
        }
    }
}

/// Filters of the provider listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderListOptions {
    pub tier: Option<ProviderTier>,
    pub namespace: Option<String>,
    /// 0 means the first page
    pub page: u32,
    /// 0 means the default page size
    pub page_size: u32,
}

impl ProviderListOptions {
    /// Query parameters for `page`, after checking every field
    pub fn to_params(
        &self,
        parser: &IdentifierParser,
        page: u32,
    ) -> Result<Vec<(&'static str, String)>, RegistryError> {
        let mut errors = MultiError::new();
        let page_size = match effective_page_size("page_size", self.page_size) {
            Ok(size) => size,
            Err(e) => {
                errors.add(e);
                DEFAULT_LIST_PAGE_SIZE
            }
        };
        if let Some(namespace) = self
            .namespace
            .as_deref()
            .filter(|ns| !parser.is_valid_name(ns))
        {
            errors.add(ValidationError::new("namespace", namespace, "invalid namespace format"));
        }
        errors.into_result()?;

        let mut params = Vec::new();
        if let Some(tier) = self.tier {
            params.push(("filter[tier]", tier.to_string()));
        }
        if let Some(namespace) = &self.namespace {
            params.push(("filter[namespace]", namespace.clone()));
        }
        if page > 0 {
            params.push(("page[number]", page.to_string()));
        }
        params.push(("page[size]", page_size.to_string()));
        Ok(params)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocCategory {
    Resources,
    DataSources,
    Functions,
    Guides,
    Overview,
}

impl DocCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            DocCategory::Resources => "resources",
            DocCategory::DataSources => "data-sources",
            DocCategory::Functions => "functions",
            DocCategory::Guides => "guides",
            DocCategory::Overview => "overview",
        }
    }
}

impl FromStr for DocCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "resources" => Ok(DocCategory::Resources),
            "data-sources" => Ok(DocCategory::DataSources),
            "functions" => Ok(DocCategory::Functions),
            "guides" => Ok(DocCategory::Guides),
            "overview" => Ok(DocCategory::Overview),
            other => Err(ValidationError::new(
                "category",
                other,
                "category must be one of: resources, data-sources, functions, guides, overview",
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DocLanguage {
    #[default]
    Hcl,
    Terraform,
    Json,
}

impl DocLanguage {
    pub fn as_str(self) -> &'static str {
        match self {
            DocLanguage::Hcl => "hcl",
            DocLanguage::Terraform => "terraform",
            DocLanguage::Json => "json",
        }
    }
}

impl FromStr for DocLanguage {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hcl" => Ok(DocLanguage::Hcl),
            "terraform" => Ok(DocLanguage::Terraform),
            "json" => Ok(DocLanguage::Json),
            other => Err(ValidationError::new(
                "language",
                other,
                "language must be one of: hcl, terraform, json",
            )),
        }
    }
}

/// Filters of the v2 documentation listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocListOptions {
    /// Required; see `ProvidersApi::get_version_id`
    pub provider_version_id: String,
    pub category: Option<DocCategory>,
    pub subcategory: Option<String>,
    pub slug: Option<String>,
    pub language: DocLanguage,
    /// Fetch only this page; 0 walks every page
    pub page: u32,
}

impl DocListOptions {
    pub fn new(provider_version_id: impl Into<String>) -> Self {
        Self {
            provider_version_id: provider_version_id.into(),
            ..Default::default()
        }
    }

    pub fn to_params(&self, page: u32) -> Result<Vec<(&'static str, String)>, RegistryError> {
        if self.provider_version_id.trim().is_empty() {
            return Err(ValidationError::new(
                "provider_version_id",
                self.provider_version_id.as_str(),
                "provider version ID is required",
            )
            .into());
        }

        let mut params = vec![("filter[provider-version]", self.provider_version_id.clone())];
        if let Some(category) = self.category {
            params.push(("filter[category]", category.as_str().to_string()));
        }
        if let Some(subcategory) = self.subcategory.as_deref().filter(|s| !s.is_empty()) {
            params.push(("filter[subcategory]", subcategory.to_string()));
        }
        if let Some(slug) = self.slug.as_deref().filter(|s| !s.is_empty()) {
            params.push(("filter[slug]", slug.to_string()));
        }
        params.push(("filter[language]", self.language.as_str().to_string()));
        params.push(("page[number]", page.max(1).to_string()));
        params.push(("page[size]", DEFAULT_LIST_PAGE_SIZE.to_string()));
        Ok(params)
    }
}

//! Provider listing, lookup, version resolution and documentation

use std::sync::Arc;

use tracing::debug;

use crate::error::{RegistryError, ValidationError};
use crate::registry::api::{ApiCore, ApiVersion};
use crate::registry::options::{DocCategory, DocListOptions, ProviderListOptions};
use crate::registry::types::{
    Provider, ProviderData, ProviderDocData, ProviderDocDetails, ProviderDocList, ProviderDocs,
    ProviderLatestVersion, ProviderList, ProviderVersion, ProviderVersionsResponse,
};
use crate::search::{Page, PageFetcher};
use crate::version::{LATEST, is_sentinel};

const OVERVIEW_SLUG: &str = "index";

/// Provider capabilities of the registry
#[async_trait::async_trait]
pub trait ProvidersApi: Send + Sync {
    /// One page of the provider listing
    async fn list(&self, options: &ProviderListOptions) -> Result<ProviderList, RegistryError>;

    /// Every page of the listing from `options.page` on
    async fn list_all(
        &self,
        options: &ProviderListOptions,
    ) -> Result<Vec<ProviderData>, RegistryError>;

    async fn get(&self, namespace: &str, name: &str) -> Result<ProviderData, RegistryError>;

    /// Every published version, in registry order
    async fn list_versions(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Vec<ProviderVersion>, RegistryError>;

    async fn get_latest(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ProviderLatestVersion, RegistryError>;

    /// Release details of one version
    async fn get_version(
        &self,
        namespace: &str,
        name: &str,
        version: &str,
    ) -> Result<Provider, RegistryError>;

    /// Resolve any accepted provider URI form to release details, picking
    /// the latest version when the URI has none.
    async fn get_by_uri(&self, uri: &str) -> Result<Provider, RegistryError>;

    /// Registry-internal ID of a provider version, as needed by the v2
    /// documentation filters
    async fn get_version_id(
        &self,
        namespace: &str,
        name: &str,
        version: &str,
    ) -> Result<String, RegistryError>;

    /// Documentation index of a release (v1)
    async fn list_docs(
        &self,
        namespace: &str,
        name: &str,
        version: &str,
    ) -> Result<ProviderDocs, RegistryError>;

    /// Documentation entries of a provider version. `options.page` 0 walks
    /// every page.
    async fn list_docs_v2(
        &self,
        options: &DocListOptions,
    ) -> Result<Vec<ProviderDocData>, RegistryError>;

    /// One documentation page, including its content
    async fn get_doc(&self, doc_id: &str) -> Result<ProviderDocDetails, RegistryError>;

    /// Content of the overview pages of a provider version, one per line
    async fn get_overview_docs(&self, provider_version_id: &str) -> Result<String, RegistryError>;
}

pub struct ProvidersService {
    core: Arc<ApiCore>,
}

impl ProvidersService {
    pub fn new(core: Arc<ApiCore>) -> Self {
        Self { core }
    }

    /// Versions of an already looked-up provider
    async fn versions_of(
        &self,
        provider: &ProviderData,
    ) -> Result<Vec<ProviderVersion>, RegistryError> {
        let path = format!("providers/{}", provider.id);
        let response: ProviderVersionsResponse = self
            .core
            .get_json(
                ApiVersion::V2,
                &path,
                &[("include", "provider-versions".to_string())],
            )
            .await?;
        Ok(response.included)
    }

    fn greatest(
        &self,
        versions: &[ProviderVersion],
        namespace: &str,
        name: &str,
    ) -> Result<String, RegistryError> {
        let numbers: Vec<&str> = versions
            .iter()
            .map(|v| v.attributes.version.as_str())
            .filter(|v| !v.is_empty())
            .collect();
        self.core
            .parser()
            .versions()
            .max(&numbers)
            .map(str::to_string)
            .ok_or_else(|| {
                RegistryError::NotFound(format!("no versions found for provider {}/{}", namespace, name))
            })
    }

    /// Concrete version for `version`, resolving `""` and `latest`
    async fn resolve_version(
        &self,
        namespace: &str,
        name: &str,
        version: &str,
    ) -> Result<String, RegistryError> {
        if is_sentinel(version) {
            return Ok(self.get_latest(namespace, name).await?.version);
        }
        self.core.parser().versions().validate(version)?;
        Ok(version.to_string())
    }
}

fn parse_page(token: Option<&str>, first: u32) -> Result<u32, RegistryError> {
    match token {
        Some(token) => token
            .parse::<u32>()
            .map_err(|_| RegistryError::InvalidResponse(format!("invalid next-page: {}", token))),
        None => Ok(first.max(1)),
    }
}

fn next_page_after(next: Option<u32>, page: u32) -> Option<String> {
    next.filter(|next| *next > page).map(|next| next.to_string())
}

/// Page-number pages of the provider listing
struct ListingPages<'a> {
    service: &'a ProvidersService,
    options: &'a ProviderListOptions,
}

#[async_trait::async_trait]
impl<'a> PageFetcher<ProviderData> for ListingPages<'a> {
    async fn fetch_page(
        &self,
        _query: &str,
        page_token: Option<&str>,
    ) -> Result<Page<ProviderData>, RegistryError> {
        let page = parse_page(page_token, self.options.page)?;
        let options = ProviderListOptions {
            page,
            ..self.options.clone()
        };
        let list = self.service.list(&options).await?;
        Ok(Page::new(list.data, next_page_after(list.meta.pagination.next_page, page)))
    }
}

/// Page-number pages of the v2 documentation listing
struct DocPages<'a> {
    core: &'a ApiCore,
    options: &'a DocListOptions,
}

impl<'a> DocPages<'a> {
    async fn fetch(&self, page: u32) -> Result<ProviderDocList, RegistryError> {
        let params = self.options.to_params(page)?;
        self.core.get_json(ApiVersion::V2, "provider-docs", &params).await
    }
}

#[async_trait::async_trait]
impl<'a> PageFetcher<ProviderDocData> for DocPages<'a> {
    async fn fetch_page(
        &self,
        _query: &str,
        page_token: Option<&str>,
    ) -> Result<Page<ProviderDocData>, RegistryError> {
        let page = parse_page(page_token, 1)?;
        let list = self.fetch(page).await?;
        Ok(Page::new(list.data, next_page_after(list.meta.pagination.next_page, page)))
    }
}

#[async_trait::async_trait]
impl ProvidersApi for ProvidersService {
    async fn list(&self, options: &ProviderListOptions) -> Result<ProviderList, RegistryError> {
        let params = options.to_params(self.core.parser(), options.page)?;
        self.core.get_json(ApiVersion::V2, "providers", &params).await
    }

    async fn list_all(
        &self,
        options: &ProviderListOptions,
    ) -> Result<Vec<ProviderData>, RegistryError> {
        options.to_params(self.core.parser(), options.page)?;
        let pages = ListingPages {
            service: self,
            options,
        };
        self.core.engine().collect_all("provider listing", &pages).await
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<ProviderData, RegistryError> {
        self.core.parser().validate_provider_fields(namespace, name)?;

        let response: ProviderList = self
            .core
            .get_json(
                ApiVersion::V2,
                "providers",
                &[
                    ("filter[namespace]", namespace.to_string()),
                    ("filter[name]", name.to_string()),
                ],
            )
            .await?;

        response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| RegistryError::NotFound(format!("provider {}/{} not found", namespace, name)))
    }

    async fn list_versions(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Vec<ProviderVersion>, RegistryError> {
        let provider = self.get(namespace, name).await?;
        self.versions_of(&provider).await
    }

    async fn get_latest(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ProviderLatestVersion, RegistryError> {
        let provider = self.get(namespace, name).await?;
        let versions = self.versions_of(&provider).await?;
        let version = self.greatest(&versions, namespace, name)?;

        debug!("Latest version of provider {}/{} is {}", namespace, name, version);
        Ok(ProviderLatestVersion { provider, version })
    }

    async fn get_version(
        &self,
        namespace: &str,
        name: &str,
        version: &str,
    ) -> Result<Provider, RegistryError> {
        self.core.parser().validate_provider_fields(namespace, name)?;
        let version = self.resolve_version(namespace, name, version).await?;

        let path = format!("providers/{}/{}/{}", namespace, name, version);
        self.core.get_json(ApiVersion::V1, &path, &[]).await
    }

    async fn get_by_uri(&self, uri: &str) -> Result<Provider, RegistryError> {
        let parsed = self.core.parser().parse_provider_uri(uri)?;
        let version = parsed.version.as_deref().unwrap_or(LATEST);
        self.get_version(&parsed.namespace, &parsed.name, version).await
    }

    async fn get_version_id(
        &self,
        namespace: &str,
        name: &str,
        version: &str,
    ) -> Result<String, RegistryError> {
        if !is_sentinel(version) {
            self.core.parser().versions().validate(version)?;
        }
        let provider = self.get(namespace, name).await?;
        let versions = self.versions_of(&provider).await?;
        let wanted = if is_sentinel(version) {
            self.greatest(&versions, namespace, name)?
        } else {
            version.to_string()
        };

        versions
            .into_iter()
            .find(|v| v.attributes.version == wanted)
            .map(|v| v.id)
            .ok_or_else(|| {
                RegistryError::NotFound(format!(
                    "provider version {}/{}@{} not found",
                    namespace, name, wanted
                ))
            })
    }

    async fn list_docs(
        &self,
        namespace: &str,
        name: &str,
        version: &str,
    ) -> Result<ProviderDocs, RegistryError> {
        self.core.parser().validate_provider_fields(namespace, name)?;
        let version = self.resolve_version(namespace, name, version).await?;

        let path = format!("providers/{}/{}/{}", namespace, name, version);
        self.core.get_json(ApiVersion::V1, &path, &[]).await
    }

    async fn list_docs_v2(
        &self,
        options: &DocListOptions,
    ) -> Result<Vec<ProviderDocData>, RegistryError> {
        let pages = DocPages {
            core: self.core.as_ref(),
            options,
        };
        if options.page > 0 {
            return Ok(pages.fetch(options.page).await?.data);
        }
        options.to_params(1)?;
        self.core
            .engine()
            .collect_all(&options.provider_version_id, &pages)
            .await
    }

    async fn get_doc(&self, doc_id: &str) -> Result<ProviderDocDetails, RegistryError> {
        if doc_id.trim().is_empty() {
            return Err(ValidationError::new("doc_id", doc_id, "doc ID cannot be empty").into());
        }
        let path = format!("provider-docs/{}", doc_id);
        self.core.get_json(ApiVersion::V2, &path, &[]).await
    }

    async fn get_overview_docs(&self, provider_version_id: &str) -> Result<String, RegistryError> {
        if provider_version_id.trim().is_empty() {
            return Err(ValidationError::new(
                "provider_version_id",
                provider_version_id,
                "provider version ID cannot be empty",
            )
            .into());
        }

        let options = DocListOptions {
            category: Some(DocCategory::Overview),
            slug: Some(OVERVIEW_SLUG.to_string()),
            ..DocListOptions::new(provider_version_id)
        };
        let docs = self.list_docs_v2(&options).await?;
        if docs.is_empty() {
            return Err(RegistryError::NotFound(
                "overview documentation not found".to_string(),
            ));
        }

        let mut content = String::new();
        for doc in &docs {
            let details = self.get_doc(&doc.id).await?;
            content.push_str(&details.data.attributes.content);
            content.push('\n');
        }
        Ok(content)
    }
}

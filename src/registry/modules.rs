//! Module search, lookup and version resolution (v1 API)

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::debug;

use crate::error::{RegistryError, ValidationError};
use crate::registry::api::{ApiCore, ApiVersion};
use crate::registry::options::ModuleListOptions;
use crate::registry::types::{Module, ModuleDetails, ModuleList, ModuleVersionsResponse};
use crate::search::{Page, PageFetcher, RankedItem};
use crate::version::is_sentinel;

/// Module capabilities of the registry
#[async_trait::async_trait]
pub trait ModulesApi: Send + Sync {
    /// One page of the module listing, optionally narrowed by provider or
    /// to verified modules
    async fn list(&self, options: &ModuleListOptions) -> Result<ModuleList, RegistryError>;

    /// Every page of the listing from `options.offset` on
    async fn list_all(&self, options: &ModuleListOptions) -> Result<Vec<Module>, RegistryError>;

    /// One page of raw search results starting at `offset`
    async fn search(&self, query: &str, offset: u64) -> Result<ModuleList, RegistryError>;

    /// One page of search results, ranked by relevance
    async fn search_ranked(
        &self,
        query: &str,
        offset: u64,
    ) -> Result<Vec<RankedItem<Module>>, RegistryError>;

    /// Every page of search results, ranked by relevance
    async fn search_all(&self, query: &str) -> Result<Vec<RankedItem<Module>>, RegistryError>;

    /// First pages of several queries, deduplicated and ranked together
    async fn search_many(&self, queries: &[String])
    -> Result<Vec<RankedItem<Module>>, RegistryError>;

    /// `version` may be `latest` (or empty), which resolves to the greatest
    /// listed version
    async fn get(
        &self,
        namespace: &str,
        name: &str,
        provider: &str,
        version: &str,
    ) -> Result<ModuleDetails, RegistryError>;

    /// Look up `namespace/name/provider/version`
    async fn get_by_id(&self, module_id: &str) -> Result<ModuleDetails, RegistryError>;

    async fn list_versions(
        &self,
        namespace: &str,
        name: &str,
        provider: &str,
    ) -> Result<Vec<String>, RegistryError>;

    /// Details of the greatest listed version
    async fn get_latest(
        &self,
        namespace: &str,
        name: &str,
        provider: &str,
    ) -> Result<ModuleDetails, RegistryError>;

    /// Download endpoint of a module version, after checking it exists
    async fn download_url(
        &self,
        namespace: &str,
        name: &str,
        provider: &str,
        version: &str,
    ) -> Result<String, RegistryError>;
}

pub struct ModulesService {
    core: Arc<ApiCore>,
}

impl ModulesService {
    pub fn new(core: Arc<ApiCore>) -> Self {
        Self { core }
    }
}

fn validate_query(query: &str) -> Result<(), RegistryError> {
    if query.trim().is_empty() {
        return Err(ValidationError::new("query", query, "search query cannot be empty").into());
    }
    Ok(())
}

fn parse_offset(token: Option<&str>, first: u64) -> Result<u64, RegistryError> {
    match token {
        Some(token) => token
            .parse::<u64>()
            .map_err(|_| RegistryError::InvalidResponse(format!("invalid next_offset: {}", token))),
        None => Ok(first),
    }
}

/// Next page of an offset-paginated response. A cursor that does not move
/// forward ends the walk.
fn into_page(list: ModuleList, offset: u64) -> Page<Module> {
    let next_page = list
        .meta
        .next_offset
        .filter(|next| *next > offset)
        .map(|next| next.to_string());
    Page::new(list.modules, next_page)
}

/// Offset-cursor pages of module search
struct SearchPages<'a> {
    service: &'a ModulesService,
}

#[async_trait::async_trait]
impl<'a> PageFetcher<Module> for SearchPages<'a> {
    async fn fetch_page(
        &self,
        query: &str,
        page_token: Option<&str>,
    ) -> Result<Page<Module>, RegistryError> {
        let offset = parse_offset(page_token, 0)?;
        let list = self.service.search(query, offset).await?;
        Ok(into_page(list, offset))
    }
}

/// Offset-cursor pages of the filtered module listing
struct ListingPages<'a> {
    service: &'a ModulesService,
    options: &'a ModuleListOptions,
}

#[async_trait::async_trait]
impl<'a> PageFetcher<Module> for ListingPages<'a> {
    async fn fetch_page(
        &self,
        _query: &str,
        page_token: Option<&str>,
    ) -> Result<Page<Module>, RegistryError> {
        let offset = parse_offset(page_token, self.options.offset)?;
        let options = ModuleListOptions {
            offset,
            ..self.options.clone()
        };
        let list = self.service.list(&options).await?;
        Ok(into_page(list, offset))
    }
}

#[async_trait::async_trait]
impl ModulesApi for ModulesService {
    async fn list(&self, options: &ModuleListOptions) -> Result<ModuleList, RegistryError> {
        let params = options.to_params(self.core.parser())?;
        self.core.get_json(ApiVersion::V1, "modules", &params).await
    }

    async fn list_all(&self, options: &ModuleListOptions) -> Result<Vec<Module>, RegistryError> {
        // fail on bad filters before the first page
        options.to_params(self.core.parser())?;
        let pages = ListingPages {
            service: self,
            options,
        };
        self.core.engine().collect_all("module listing", &pages).await
    }

    async fn search(&self, query: &str, offset: u64) -> Result<ModuleList, RegistryError> {
        validate_query(query)?;
        self.core
            .get_json(
                ApiVersion::V1,
                "modules/search",
                &[("q", query.to_string()), ("offset", offset.to_string())],
            )
            .await
    }

    async fn search_ranked(
        &self,
        query: &str,
        offset: u64,
    ) -> Result<Vec<RankedItem<Module>>, RegistryError> {
        let list = self.search(query, offset).await?;
        Ok(self.core.engine().rank_one_page(query, list.modules))
    }

    async fn search_all(&self, query: &str) -> Result<Vec<RankedItem<Module>>, RegistryError> {
        validate_query(query)?;
        let pages = SearchPages { service: self };
        self.core.engine().rank_all(query, &pages).await
    }

    async fn search_many(
        &self,
        queries: &[String],
    ) -> Result<Vec<RankedItem<Module>>, RegistryError> {
        if queries.is_empty() {
            return Err(
                ValidationError::new("queries", "", "at least one search query is required").into(),
            );
        }
        for query in queries {
            validate_query(query)?;
        }

        let lists = try_join_all(queries.iter().map(|query| self.search(query, 0))).await?;
        let batches: Vec<Vec<Module>> = lists.into_iter().map(|list| list.modules).collect();
        debug!(
            queries = queries.len(),
            items = batches.iter().map(Vec::len).sum::<usize>(),
            "Merging module search results"
        );

        Ok(self.core.engine().rank_merged(&queries.join(" "), batches))
    }

    async fn get(
        &self,
        namespace: &str,
        name: &str,
        provider: &str,
        version: &str,
    ) -> Result<ModuleDetails, RegistryError> {
        if is_sentinel(version) {
            return self.get_latest(namespace, name, provider).await;
        }
        self.core
            .parser()
            .validate_module_fields(namespace, name, provider, Some(version))?;

        let path = format!("modules/{}/{}/{}/{}", namespace, name, provider, version);
        self.core.get_json(ApiVersion::V1, &path, &[]).await
    }

    async fn get_by_id(&self, module_id: &str) -> Result<ModuleDetails, RegistryError> {
        let id = self.core.parser().parse_module_id(module_id)?;
        self.get(&id.namespace, &id.name, &id.provider, &id.version).await
    }

    async fn list_versions(
        &self,
        namespace: &str,
        name: &str,
        provider: &str,
    ) -> Result<Vec<String>, RegistryError> {
        self.core
            .parser()
            .validate_module_fields(namespace, name, provider, None)?;

        let path = format!("modules/{}/{}/{}/versions", namespace, name, provider);
        let response: ModuleVersionsResponse =
            self.core.get_json(ApiVersion::V1, &path, &[]).await?;

        let group = response.modules.into_iter().next().ok_or_else(|| {
            RegistryError::NotFound(format!("module {}/{}/{} not found", namespace, name, provider))
        })?;

        let versions: Vec<String> = group
            .versions
            .into_iter()
            .map(|entry| entry.version)
            .filter(|version| !version.is_empty())
            .collect();

        if versions.is_empty() {
            return Err(RegistryError::NotFound(format!(
                "no versions found for module {}/{}/{}",
                namespace, name, provider
            )));
        }
        Ok(versions)
    }

    async fn get_latest(
        &self,
        namespace: &str,
        name: &str,
        provider: &str,
    ) -> Result<ModuleDetails, RegistryError> {
        let versions = self.list_versions(namespace, name, provider).await?;
        let latest = self
            .core
            .parser()
            .versions()
            .max(&versions)
            .map(str::to_string)
            .ok_or_else(|| {
                RegistryError::NotFound(format!(
                    "no versions found for module {}/{}/{}",
                    namespace, name, provider
                ))
            })?;

        debug!("Latest version of {}/{}/{} is {}", namespace, name, provider, latest);
        self.get(namespace, name, provider, &latest).await
    }

    async fn download_url(
        &self,
        namespace: &str,
        name: &str,
        provider: &str,
        version: &str,
    ) -> Result<String, RegistryError> {
        let details = self.get(namespace, name, provider, version).await?;
        let version = if is_sentinel(version) {
            details.module.version.as_str()
        } else {
            version
        };
        Ok(format!(
            "{}/v1/modules/{}/{}/{}/{}/download",
            self.core.base_url(),
            namespace,
            name,
            provider,
            version
        ))
    }
}

//! Policy library listing, search and lookup (v2 API)

use std::sync::Arc;

use tracing::debug;

use crate::error::{RegistryError, ValidationError};
use crate::registry::api::{ApiCore, ApiVersion};
use crate::registry::options::effective_page_size;
use crate::registry::sentinel::SentinelPolicyContent;
use crate::registry::types::{Policy, PolicyDetails, PolicyList};
use crate::search::{Page, PageFetcher, Query, RankedItem, text_match};

/// Policy capabilities of the registry
#[async_trait::async_trait]
pub trait PoliciesApi: Send + Sync {
    /// One page of the policy listing. `page` 0 means the first page and
    /// `page_size` 0 the registry default.
    async fn list(&self, page: u32, page_size: u32) -> Result<PolicyList, RegistryError>;

    /// Rank the full listing against `query`. Policies whose name, title and
    /// namespace never mention the query are dropped, however popular.
    async fn search(&self, query: &str) -> Result<Vec<RankedItem<Policy>>, RegistryError>;

    async fn get(
        &self,
        namespace: &str,
        name: &str,
        version: &str,
    ) -> Result<PolicyDetails, RegistryError>;

    /// Look up `[policies/]namespace/name/version`
    async fn get_by_id(&self, policy_id: &str) -> Result<PolicyDetails, RegistryError>;

    /// Bundled modules and policies of a release, ready for
    /// [`SentinelPolicyContent::generate_hcl`]
    async fn get_sentinel_content(
        &self,
        policy_id: &str,
    ) -> Result<SentinelPolicyContent, RegistryError>;
}

pub struct PoliciesService {
    core: Arc<ApiCore>,
}

impl PoliciesService {
    pub fn new(core: Arc<ApiCore>) -> Self {
        Self { core }
    }
}

/// Page-number pages of the policy listing
struct ListingPages<'a> {
    service: &'a PoliciesService,
    page_size: u32,
}

#[async_trait::async_trait]
impl<'a> PageFetcher<Policy> for ListingPages<'a> {
    async fn fetch_page(
        &self,
        _query: &str,
        page_token: Option<&str>,
    ) -> Result<Page<Policy>, RegistryError> {
        let page = match page_token {
            Some(token) => token.parse::<u32>().map_err(|_| {
                RegistryError::InvalidResponse(format!("invalid next-page: {}", token))
            })?,
            None => 1,
        };

        let list = self.service.list(page, self.page_size).await?;
        let next_page = list
            .meta
            .pagination
            .next_page
            .filter(|next| *next > page)
            .map(|next| next.to_string());
        Ok(Page::new(list.data, next_page))
    }
}

#[async_trait::async_trait]
impl PoliciesApi for PoliciesService {
    async fn list(&self, page: u32, page_size: u32) -> Result<PolicyList, RegistryError> {
        let page_size = effective_page_size("page_size", page_size)?;
        let mut params = vec![("page[size]", page_size.to_string())];
        if page > 0 {
            params.push(("page[number]", page.to_string()));
        }
        params.push(("include", "latest-version".to_string()));

        self.core.get_json(ApiVersion::V2, "policies", &params).await
    }

    async fn search(&self, query: &str) -> Result<Vec<RankedItem<Policy>>, RegistryError> {
        if query.trim().is_empty() {
            return Err(
                ValidationError::new("query", query, "search query cannot be empty").into(),
            );
        }

        let pages = ListingPages {
            service: self,
            page_size: self.core.page_size(),
        };
        let mut ranked = self.core.engine().rank_all(query, &pages).await?;
        let total = ranked.len();
        let terms = Query::new(query);
        ranked.retain(|r| text_match(&r.item, &terms) > 0.0);
        debug!(
            "Policy search '{}' matched {} of {} policies",
            query,
            ranked.len(),
            total
        );
        Ok(ranked)
    }

    async fn get(
        &self,
        namespace: &str,
        name: &str,
        version: &str,
    ) -> Result<PolicyDetails, RegistryError> {
        self.core
            .parser()
            .validate_policy_fields(namespace, name, version)?;

        let path = format!("policies/{}/{}/{}", namespace, name, version);
        self.core
            .get_json(
                ApiVersion::V2,
                &path,
                &[(
                    "include",
                    "policies,policy-modules,policy-library".to_string(),
                )],
            )
            .await
    }

    async fn get_by_id(&self, policy_id: &str) -> Result<PolicyDetails, RegistryError> {
        let id = self.core.parser().parse_policy_id(policy_id)?;
        self.get(&id.namespace, &id.name, &id.version).await
    }

    async fn get_sentinel_content(
        &self,
        policy_id: &str,
    ) -> Result<SentinelPolicyContent, RegistryError> {
        let id = self.core.parser().parse_policy_id(policy_id)?;
        let details = self.get(&id.namespace, &id.name, &id.version).await?;
        let content = SentinelPolicyContent::from_details(self.core.base_url(), &id, &details);
        debug!(
            "Policy {} bundles {} modules and {} policies",
            id,
            content.modules.len(),
            content.policies.len()
        );
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::test_support::client_for;
    use mockito::{Matcher, Server};
    use rstest::rstest;

    fn policy_json(id: u32, name: &str, title: &str, verified: bool) -> String {
        format!(
            r#"{{"type":"policy-libraries","id":"{id}","attributes":{{"name":"{name}","namespace":"hashicorp","title":"{title}","verified":{verified},"downloads":0}}}}"#,
            id = id,
            name = name,
            title = title,
            verified = verified
        )
    }

    #[tokio::test]
    async fn list_sends_page_parameters() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v2/policies")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page[size]".into(), "20".into()),
                Matcher::UrlEncoded("page[number]".into(), "3".into()),
                Matcher::UrlEncoded("include".into(), "latest-version".into()),
            ]))
            .with_status(200)
            .with_body(format!(
                r#"{{"data":[{}],"meta":{{"pagination":{{"current-page":3}}}}}}"#,
                policy_json(1, "cis", "CIS", true)
            ))
            .create_async()
            .await;

        let client = client_for(&server.url());
        let list = client.policies().list(3, 20).await.unwrap();

        mock.assert_async().await;
        assert_eq!(list.data.len(), 1);
        assert_eq!(list.meta.pagination.current_page, 3);
    }

    #[tokio::test]
    async fn list_uses_default_page_size() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v2/policies")
            .match_query(Matcher::UrlEncoded("page[size]".into(), "50".into()))
            .with_status(200)
            .with_body(r#"{"data":[]}"#)
            .create_async()
            .await;

        let client = client_for(&server.url());
        client.policies().list(0, 0).await.unwrap();

        mock.assert_async().await;
    }

    #[rstest]
    #[case(101)]
    #[case(1000)]
    #[tokio::test]
    async fn list_rejects_oversized_pages(#[case] page_size: u32) {
        let server = Server::new_async().await;
        let client = client_for(&server.url());

        let err = client.policies().list(1, page_size).await.unwrap_err();

        assert!(matches!(err, RegistryError::Validation(ref e) if e.field == "page_size"));
    }

    #[tokio::test]
    async fn search_walks_pages_and_drops_unrelated_policies() {
        let mut server = Server::new_async().await;
        let first = server
            .mock("GET", "/v2/policies")
            .match_query(Matcher::UrlEncoded("page[number]".into(), "1".into()))
            .with_status(200)
            .with_body(format!(
                r#"{{"data":[{},{}],"meta":{{"pagination":{{"current-page":1,"next-page":2}}}}}}"#,
                policy_json(1, "aws-networking", "Networking guardrails", false),
                policy_json(2, "gcp-storage", "Bucket rules", false)
            ))
            .create_async()
            .await;
        let second = server
            .mock("GET", "/v2/policies")
            .match_query(Matcher::UrlEncoded("page[number]".into(), "2".into()))
            .with_status(200)
            .with_body(format!(
                r#"{{"data":[{}],"meta":{{"pagination":{{"current-page":2}}}}}}"#,
                policy_json(3, "aws", "AWS baseline", false)
            ))
            .create_async()
            .await;

        let client = client_for(&server.url());
        let ranked = client.policies().search("aws").await.unwrap();

        first.assert_async().await;
        second.assert_async().await;
        let names: Vec<_> = ranked.iter().map(|r| r.item.attributes.name.as_str()).collect();
        assert_eq!(names, ["aws", "aws-networking"]);
    }

    #[tokio::test]
    async fn search_drops_popular_policies_that_do_not_match() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v2/policies")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(format!(
                r#"{{"data":[{},{}],"meta":{{"pagination":{{"current-page":1}}}}}}"#,
                r#"{"type":"policy-libraries","id":"1","attributes":{"name":"gcp-storage","namespace":"hashicorp","title":"Bucket rules","verified":true,"downloads":5000000}}"#,
                policy_json(2, "aws-baseline", "Baseline", false)
            ))
            .create_async()
            .await;

        let client = client_for(&server.url());
        let ranked = client.policies().search("aws").await.unwrap();

        let names: Vec<_> = ranked.iter().map(|r| r.item.attributes.name.as_str()).collect();
        assert_eq!(names, ["aws-baseline"]);
    }

    #[tokio::test]
    async fn search_stops_when_next_page_does_not_advance() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v2/policies")
            .match_query(Matcher::UrlEncoded("page[number]".into(), "1".into()))
            .with_status(200)
            .with_body(format!(
                r#"{{"data":[{}],"meta":{{"pagination":{{"current-page":1,"next-page":1}}}}}}"#,
                policy_json(1, "aws", "AWS baseline", false)
            ))
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server.url());
        let ranked = client.policies().search("aws").await.unwrap();

        mock.assert_async().await;
        assert_eq!(ranked.len(), 1);
    }

    #[tokio::test]
    async fn search_rejects_empty_query() {
        let server = Server::new_async().await;
        let client = client_for(&server.url());

        let err = client.policies().search("").await.unwrap_err();

        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn get_by_id_strips_marker_and_requests_includes() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v2/policies/hashicorp/cis-aws/1.0.1")
            .match_query(Matcher::UrlEncoded(
                "include".into(),
                "policies,policy-modules,policy-library".into(),
            ))
            .with_status(200)
            .with_body(
                r#"{"data":{"type":"policy-library-versions","id":"302","attributes":{"version":"1.0.1","description":"CIS"}},
                    "included":[{"type":"policies","id":"9","attributes":{"name":"s3-block-public","full-name":"cis-aws/s3-block-public"}}]}"#,
            )
            .create_async()
            .await;

        let client = client_for(&server.url());
        let details = client
            .policies()
            .get_by_id("policies/hashicorp/cis-aws/1.0.1")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(details.data.attributes.version, "1.0.1");
        assert_eq!(details.included[0].attributes.name, "s3-block-public");
    }

    #[tokio::test]
    async fn get_sentinel_content_keeps_complete_entries() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v2/policies/hashicorp/cis-aws/1.0.1")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"data":{"type":"policy-library-versions","id":"302","attributes":{"version":"1.0.1","description":"CIS"}},
                    "included":[
                        {"type":"policy-modules","id":"1","attributes":{"name":"tfplan-functions","shasum":"abc"}},
                        {"type":"policies","id":"9","attributes":{"name":"s3-block-public","shasum":"def"}},
                        {"type":"policies","id":"10","attributes":{"name":"","shasum":"123"}}
                    ]}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server.url());
        let content = client
            .policies()
            .get_sentinel_content("policies/hashicorp/cis-aws/1.0.1")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(content.policy_id, "hashicorp/cis-aws/1.0.1");
        assert_eq!(content.description, "CIS");
        assert_eq!(content.modules.len(), 1);
        assert_eq!(content.policies.len(), 1);
        assert_eq!(
            content.policies[0].source,
            format!(
                "{}/v2/policies/hashicorp/cis-aws/1.0.1/policy/s3-block-public.sentinel?checksum=sha256:def",
                server.url()
            )
        );
    }

    #[tokio::test]
    async fn get_validates_all_fields() {
        let server = Server::new_async().await;
        let client = client_for(&server.url());

        let err = client.policies().get("", "", "x").await.unwrap_err();

        assert!(matches!(err, RegistryError::Multi(ref m) if m.len() == 3));
    }
}

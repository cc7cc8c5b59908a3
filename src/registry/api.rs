//! Request construction and JSON decoding shared by the resource services

use reqwest::Url;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::RegistryError;
use crate::identifier::IdentifierParser;
use crate::search::RelevanceSearchEngine;
use crate::transport::{CancellationToken, RequestDescriptor, ResilientTransport};

/// Registry API generation a path belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    V1,
    V2,
}

impl ApiVersion {
    fn as_str(self) -> &'static str {
        match self {
            ApiVersion::V1 => "v1",
            ApiVersion::V2 => "v2",
        }
    }
}

/// Everything the services share: one transport (and so one rate budget),
/// the identifier grammars, the search engine and the default headers.
pub struct ApiCore {
    base_url: String,
    authorization: Option<HeaderValue>,
    transport: ResilientTransport,
    parser: IdentifierParser,
    engine: RelevanceSearchEngine,
    page_size: u32,
    cancel: CancellationToken,
}

impl ApiCore {
    pub fn new(
        config: &ClientConfig,
        transport: ResilientTransport,
        parser: IdentifierParser,
        engine: RelevanceSearchEngine,
        cancel: CancellationToken,
    ) -> Result<Self, RegistryError> {
        let authorization = config
            .api_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .map(|token| {
                let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|e| RegistryError::Config(format!("invalid apiToken: {}", e)))?;
                value.set_sensitive(true);
                Ok::<_, RegistryError>(value)
            })
            .transpose()?;

        Ok(Self {
            base_url: config.base_url().to_string(),
            authorization,
            transport,
            parser,
            engine,
            page_size: config.search.page_size,
            cancel,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport(&self) -> &ResilientTransport {
        &self.transport
    }

    pub fn parser(&self) -> &IdentifierParser {
        &self.parser
    }

    pub fn engine(&self) -> &RelevanceSearchEngine {
        &self.engine
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// `{base}/{v1|v2}/{path}` with URL-encoded query parameters
    pub fn url(
        &self,
        version: ApiVersion,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<String, RegistryError> {
        let raw = format!("{}/{}/{}", self.base_url, version.as_str(), path);
        let url = if params.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, params)
        }
        .map_err(|e| RegistryError::Config(format!("invalid request URL {}: {}", raw, e)))?;
        Ok(url.into())
    }

    pub fn request(&self, url: String) -> RequestDescriptor {
        let request =
            RequestDescriptor::get(url).with_header(ACCEPT, HeaderValue::from_static("application/json"));
        match &self.authorization {
            Some(value) => request.with_header(AUTHORIZATION, value.clone()),
            None => request,
        }
    }

    /// GET a JSON document through the rate-limited, retrying transport
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        version: ApiVersion,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, RegistryError> {
        let url = self.url(version, path, params)?;
        debug!("GET {}", url);
        let response = self.transport.execute(&self.request(url), &self.cancel).await?;
        response.json()
    }
}

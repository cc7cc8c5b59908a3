//! Registry client and its per-resource capability sets
//!
//! - api.rs: URL building, default headers, JSON over the resilient transport
//! - modules.rs / providers.rs / policies.rs: one service per resource kind
//! - options.rs: listing filters
//! - sentinel.rs: policy set configuration built from a policy release
//! - types.rs: response documents

pub mod api;
pub mod modules;
pub mod options;
pub mod policies;
pub mod providers;
pub mod sentinel;
pub mod types;

use std::sync::Arc;

use tracing::info;

use crate::config::ClientConfig;
use crate::error::RegistryError;
use crate::identifier::IdentifierParser;
use crate::search::RelevanceSearchEngine;
use crate::transport::{
    CancellationToken, HttpAttempt, RateLimiter, ReqwestAttempt, ResilientTransport, RetryPolicy,
};

pub use api::{ApiCore, ApiVersion};
pub use modules::{ModulesApi, ModulesService};
pub use options::{
    DocCategory, DocLanguage, DocListOptions, ModuleListOptions, ProviderListOptions, ProviderTier,
};
pub use policies::{PoliciesApi, PoliciesService};
pub use providers::{ProvidersApi, ProvidersService};
pub use sentinel::{EnforcementLevel, SentinelPolicyContent};

/// Entry point: one rate budget, one retry policy and one set of grammars,
/// shared by every service.
pub struct RegistryClient {
    config: ClientConfig,
    core: Arc<ApiCore>,
    modules: ModulesService,
    providers: ProvidersService,
    policies: PoliciesService,
}

impl RegistryClient {
    pub fn new(config: ClientConfig) -> Result<Self, RegistryError> {
        config.validate()?;
        let attempt = ReqwestAttempt::build(&config.user_agent, config.timeout())?;
        Self::with_attempt(config, Arc::new(attempt))
    }

    /// Build on a custom single-attempt executor
    pub fn with_attempt(
        config: ClientConfig,
        attempt: Arc<dyn HttpAttempt>,
    ) -> Result<Self, RegistryError> {
        config.validate()?;

        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit.requests,
            config.rate_limit.period(),
        ));
        let transport = ResilientTransport::new(attempt, limiter, RetryPolicy::from(&config.retry));
        let parser = IdentifierParser::new();
        let engine = RelevanceSearchEngine::new(parser.clone(), config.search.max_pages);
        let core = Arc::new(ApiCore::new(
            &config,
            transport,
            parser,
            engine,
            CancellationToken::new(),
        )?);

        info!(
            "Registry client for {} ({} requests per {:?}, up to {} attempts)",
            core.base_url(),
            config.rate_limit.requests,
            config.rate_limit.period(),
            config.retry.max_attempts
        );

        Ok(Self {
            modules: ModulesService::new(core.clone()),
            providers: ProvidersService::new(core.clone()),
            policies: PoliciesService::new(core.clone()),
            config,
            core,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn modules(&self) -> &ModulesService {
        &self.modules
    }

    pub fn providers(&self) -> &ProvidersService {
        &self.providers
    }

    pub fn policies(&self) -> &PoliciesService {
        &self.policies
    }

    pub fn parser(&self) -> &IdentifierParser {
        self.core.parser()
    }

    pub fn search_engine(&self) -> &RelevanceSearchEngine {
        self.core.engine()
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        self.core.transport().limiter()
    }

    /// Cancel every pending and future call of this client
    pub fn cancel(&self) {
        self.core.cancellation().cancel();
    }

    pub fn cancellation(&self) -> &CancellationToken {
        self.core.cancellation()
    }
}

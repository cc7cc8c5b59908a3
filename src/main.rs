use std::cmp::Ordering;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::warn;

use registry_client::ClientConfig;
use registry_client::logging::{LogOptions, init_logging};
use registry_client::registry::{
    DocCategory, DocLanguage, DocListOptions, EnforcementLevel, ModuleListOptions, ModulesApi,
    PoliciesApi, ProviderListOptions, ProviderTier, ProvidersApi, RegistryClient,
};
use registry_client::search::RankedItem;
use registry_client::search::Searchable;
use registry_client::version::VersionComparator;

#[derive(Parser)]
#[command(name = "registry-client")]
#[command(version, about = "Search and inspect module, provider and policy registries")]
struct Cli {
    /// Registry base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// JSON config file (defaults to $XDG_CONFIG_HOME/registry-client/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Requests allowed per rate-limit period
    #[arg(long, global = true)]
    rate_limit: Option<u32>,

    /// Attempts per request, retries included
    #[arg(long, global = true)]
    max_attempts: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search modules; several queries are merged and ranked together
    SearchModules {
        #[arg(required = true)]
        queries: Vec<String>,
        /// Walk every result page (single query only)
        #[arg(long)]
        all: bool,
        #[arg(long, default_value_t = 0)]
        offset: u64,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Keep only the greatest version of each module
        #[arg(long)]
        latest_only: bool,
    },
    /// List modules, optionally by provider or verified only
    ListModules {
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        verified: bool,
        #[arg(long, default_value_t = 0)]
        offset: u64,
        /// Page size (0 for the registry default)
        #[arg(long, default_value_t = 0)]
        limit: u32,
        /// Walk every page from `offset` on
        #[arg(long)]
        all: bool,
    },
    /// List providers by tier or namespace
    ListProviders {
        #[arg(long)]
        tier: Option<ProviderTier>,
        #[arg(long)]
        namespace: Option<String>,
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long, default_value_t = 0)]
        page_size: u32,
        #[arg(long)]
        all: bool,
    },
    /// List documentation of a provider version, or print its overview
    ProviderDocs {
        namespace: String,
        name: String,
        #[arg(long, default_value = "latest")]
        version: String,
        #[arg(long)]
        category: Option<DocCategory>,
        #[arg(long)]
        slug: Option<String>,
        #[arg(long, default_value = "hcl")]
        language: DocLanguage,
        /// Print the overview pages instead of the listing
        #[arg(long)]
        overview: bool,
    },
    /// Print one provider documentation page
    ProviderDoc { id: String },
    /// Search the policy libraries
    SearchPolicies {
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Show a module by namespace/name/provider/version
    Module { id: String },
    /// Show the latest version of a module
    ModuleLatest {
        namespace: String,
        name: String,
        provider: String,
    },
    /// Show a provider release by URI (namespace/name[/version], registry://..., providers/...)
    Provider { uri: String },
    /// Show a policy library release by [policies/]namespace/name/version
    Policy { id: String },
    /// Print the policy set configuration of a policy library release
    PolicyHcl {
        id: String,
        #[arg(long, default_value = "advisory")]
        level: EnforcementLevel,
    },
    /// Parse and validate an identifier without contacting the registry
    Parse { kind: IdKind, value: String },
    /// Order versions and report the greatest
    CompareVersions {
        #[arg(required = true)]
        versions: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum IdKind {
    Module,
    Policy,
    Provider,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _guard = init_logging(&LogOptions {
        json: cli.log_json,
        file: cli.log_file.clone(),
        filter: None,
    })?;

    match cli.command {
        Command::Parse { kind, ref value } => parse(kind, value),
        Command::CompareVersions { ref versions } => compare_versions(versions),
        _ => tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?
            .block_on(run_remote(cli)),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::load_or_default()?,
    };
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(requests) = cli.rate_limit {
        config.rate_limit.requests = requests;
    }
    if let Some(max_attempts) = cli.max_attempts {
        config.retry.max_attempts = max_attempts;
    }
    config.validate()?;
    Ok(config)
}

async fn run_remote(cli: Cli) -> anyhow::Result<()> {
    let client = Arc::new(RegistryClient::new(load_config(&cli)?)?);

    {
        let client = client.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling pending requests");
                client.cancel();
            }
        });
    }

    match cli.command {
        Command::SearchModules {
            queries,
            all,
            offset,
            limit,
            latest_only,
        } => {
            let modules = client.modules();
            let mut ranked = match queries.as_slice() {
                [query] if all => modules.search_all(query).await?,
                [query] => modules.search_ranked(query, offset).await?,
                _ => modules.search_many(&queries).await?,
            };
            if latest_only {
                let engine = client.search_engine();
                let items: Vec<_> = ranked.into_iter().map(|entry| entry.item).collect();
                ranked = engine.rank_one_page(&queries.join(" "), engine.keep_latest_versions(items));
            }
            print_ranked(&ranked, limit);
        }
        Command::ListModules {
            provider,
            verified,
            offset,
            limit,
            all,
        } => {
            let options = ModuleListOptions {
                offset,
                limit,
                provider,
                verified,
            };
            let modules = if all {
                client.modules().list_all(&options).await?
            } else {
                client.modules().list(&options).await?.modules
            };
            for module in &modules {
                println!("{}  {}", module.id, module.description);
            }
        }
        Command::ListProviders {
            tier,
            namespace,
            page,
            page_size,
            all,
        } => {
            let options = ProviderListOptions {
                tier,
                namespace,
                page,
                page_size,
            };
            let providers = if all {
                client.providers().list_all(&options).await?
            } else {
                client.providers().list(&options).await?.data
            };
            for provider in &providers {
                let attributes = &provider.attributes;
                println!(
                    "{}  {}  {} downloads",
                    attributes.full_name, attributes.tier, attributes.downloads
                );
            }
        }
        Command::ProviderDocs {
            namespace,
            name,
            version,
            category,
            slug,
            language,
            overview,
        } => {
            let providers = client.providers();
            let version_id = providers
                .get_version_id(&namespace, &name, &version)
                .await
                .with_context(|| format!("failed to resolve {}/{}@{}", namespace, name, version))?;
            if overview {
                print!("{}", providers.get_overview_docs(&version_id).await?);
            } else {
                let options = DocListOptions {
                    category,
                    slug,
                    language,
                    ..DocListOptions::new(version_id)
                };
                for doc in providers.list_docs_v2(&options).await? {
                    println!("{}  {}  {}", doc.id, doc.attributes.category, doc.attributes.title);
                }
            }
        }
        Command::ProviderDoc { id } => {
            let doc = client.providers().get_doc(&id).await?;
            println!("{}", doc.data.attributes.content);
            if doc.data.attributes.truncated {
                warn!("Documentation page {} is truncated", id);
            }
        }
        Command::SearchPolicies { query, limit } => {
            let ranked = client.policies().search(&query).await?;
            print_ranked(&ranked, limit);
        }
        Command::Module { id } => {
            let details = client
                .modules()
                .get_by_id(&id)
                .await
                .with_context(|| format!("failed to get module {}", id))?;
            println!("{}", serde_json::to_string_pretty(&details)?);
        }
        Command::ModuleLatest {
            namespace,
            name,
            provider,
        } => {
            let details = client
                .modules()
                .get_latest(&namespace, &name, &provider)
                .await?;
            println!("{}", serde_json::to_string_pretty(&details)?);
        }
        Command::Provider { uri } => {
            let provider = client
                .providers()
                .get_by_uri(&uri)
                .await
                .with_context(|| format!("failed to get provider {}", uri))?;
            println!("{}", serde_json::to_string_pretty(&provider)?);
        }
        Command::Policy { id } => {
            let details = client
                .policies()
                .get_by_id(&id)
                .await
                .with_context(|| format!("failed to get policy {}", id))?;
            println!("{}", serde_json::to_string_pretty(&details)?);
        }
        Command::PolicyHcl { id, level } => {
            let content = client
                .policies()
                .get_sentinel_content(&id)
                .await
                .with_context(|| format!("failed to get policy {}", id))?;
            print!("{}", content.generate_hcl(level));
        }
        Command::Parse { .. } | Command::CompareVersions { .. } => {}
    }

    Ok(())
}

fn print_ranked<T: Searchable>(ranked: &[RankedItem<T>], limit: usize) {
    for entry in ranked.iter().take(limit) {
        println!(
            "{:>6.2}  {}  {}",
            entry.relevance,
            entry.item.identifier(),
            entry.item.description()
        );
    }
    if ranked.len() > limit {
        println!("... {} more", ranked.len() - limit);
    }
}

fn parse(kind: IdKind, value: &str) -> anyhow::Result<()> {
    let parser = registry_client::identifier::IdentifierParser::new();
    match kind {
        IdKind::Module => {
            let id = parser.parse_module_id(value)?;
            println!("namespace: {}", id.namespace);
            println!("name:      {}", id.name);
            println!("provider:  {}", id.provider);
            println!("version:   {}", id.version);
        }
        IdKind::Policy => {
            let id = parser.parse_policy_id(value)?;
            println!("namespace: {}", id.namespace);
            println!("name:      {}", id.name);
            println!("version:   {}", id.version);
        }
        IdKind::Provider => {
            let uri = parser.parse_provider_uri(value)?;
            println!("namespace: {}", uri.namespace);
            println!("name:      {}", uri.name);
            println!("version:   {}", uri.version.as_deref().unwrap_or("latest"));
        }
    }
    Ok(())
}

fn compare_versions(versions: &[String]) -> anyhow::Result<()> {
    let comparator = VersionComparator::new();
    for version in versions {
        comparator
            .validate(version)
            .with_context(|| format!("invalid version {}", version))?;
    }

    let mut sorted: Vec<&String> = versions.iter().collect();
    sorted.sort_by(|a, b| comparator.compare(a, b));
    for pair in sorted.windows(2) {
        let symbol = match comparator.compare(pair[0], pair[1]) {
            Ordering::Less => "<",
            Ordering::Equal => "=",
            Ordering::Greater => ">",
        };
        println!("{} {} {}", pair[0], symbol, pair[1]);
    }
    if let Some(max) = comparator.max(versions) {
        println!("latest: {}", max);
    }
    Ok(())
}

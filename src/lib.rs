//! Rate-limited, retrying, relevance-ranking client for module, provider and
//! policy registries.

pub mod config;
pub mod error;
pub mod identifier;
pub mod logging;
pub mod registry;
pub mod search;
pub mod transport;
pub mod version;

pub use config::ClientConfig;
pub use error::{MultiError, RegistryError, ValidationError};
pub use registry::RegistryClient;

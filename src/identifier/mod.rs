//! Composite identifier parsing
//!
//! - types.rs: validated identifier values (`ModuleId`, `PolicyId`, `ProviderUri`)
//! - parser.rs: `IdentifierParser`, the grammars and the three parse entry points

pub mod parser;
pub mod types;

pub use parser::IdentifierParser;
pub use types::{Identity, ModuleId, PolicyId, ProviderUri};

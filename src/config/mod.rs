//! Central configuration — one parsed document per process, served as typed
//! sections.
//!
//! ## Core types
//!
//! - [`ConfigSingleton`] — loads the backing document once, on first access,
//!   and hands out [`Section`] projections of it.
//! - [`DocumentParser`] / [`YamlParser`] — how the document text becomes a
//!   typed value; [`Validate`] adds semantic checks on top of serde.
//! - [`CentralConfig`] — the schema of the server's own document.
//! - [`central`] — the process-wide instance.
//!
//! The document path is taken from `CTXCONF_CONFIG_PATH` when set, otherwise
//! [`DEFAULT_CONFIG_PATH`].

use std::env;
use std::path::PathBuf;

use once_cell::sync::Lazy;

mod error;
mod parser;
mod schema;
mod section;
mod singleton;

pub use error::ConfigError;
pub use parser::{DocumentParser, Validate, YamlParser};
pub use schema::{
    CentralConfig, CommunicationsApiConfig, EngineConfig, IndexerConfig, IndexerNode,
    ManagementApiConfig, NodeConfig, NodeRole, ServerConfig, ServerInternalConfig,
};
pub use section::Section;
pub use singleton::ConfigSingleton;

/// Environment variable overriding the location of the central document.
pub const CONFIG_PATH_ENV: &str = "CTXCONF_CONFIG_PATH";

/// Location of the central document when [`CONFIG_PATH_ENV`] is not set.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/ctxconf/server.yml";

static CENTRAL: Lazy<ConfigSingleton<CentralConfig>> =
    Lazy::new(|| ConfigSingleton::new(config_path()));

/// The process-wide central configuration.
///
/// The path is resolved when this is first called; the document itself is
/// read on the first section access.
pub fn central() -> &'static ConfigSingleton<CentralConfig> {
    &CENTRAL
}

fn config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

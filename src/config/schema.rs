//! Typed schema of the central configuration document.
//!
//! ```yaml
//! server:
//!   node:
//!     name: node01
//!     role: master
//!   nodes: [node01]
//! indexer:
//!   hosts:
//!     - host: localhost
//!       port: 9200
//! ```
//!
//! Only `server` is required; every other section falls back to its defaults.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::Validate;

const DEFAULT_SERVER_PORT: u16 = 1516;
const DEFAULT_INDEXER_PORT: u16 = 9200;
const DEFAULT_COMMS_API_PORT: u16 = 27000;
const DEFAULT_MANAGEMENT_API_PORT: u16 = 55000;
const DEFAULT_MAX_UPLOAD_SIZE: u64 = 10 * 1024 * 1024;

/// Root of the central configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CentralConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub indexer: IndexerConfig,
    #[serde(default)]
    pub communications_api: CommunicationsApiConfig,
    #[serde(default)]
    pub management_api: ManagementApiConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Validate for CentralConfig {
    fn validate(&self) -> Result<(), String> {
        self.server.validate()?;
        self.indexer.validate()?;
        self.communications_api.validate()?;
        self.management_api.validate()?;
        self.engine.validate()
    }
}

/// Role of a node in the server cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Master,
    Worker,
}

/// Identity of the local node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    pub name: String,
    pub role: NodeRole,
}

/// `server` section — cluster membership and listening address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub node: NodeConfig,
    pub nodes: Vec<String>,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl ServerConfig {
    /// Internal tuning values that are not read from the document.
    pub fn internal_config(&self) -> ServerInternalConfig {
        ServerInternalConfig {
            is_master: self.node.role == NodeRole::Master,
            ..ServerInternalConfig::default()
        }
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<(), String> {
        if self.node.name.trim().is_empty() {
            return Err("server.node.name must not be empty".to_owned());
        }
        if self.nodes.is_empty() {
            return Err("server.nodes must list at least one node".to_owned());
        }
        if self.port == 0 {
            return Err("server.port must not be 0".to_owned());
        }
        Ok(())
    }
}

/// Fixed internal settings of the server, derived from [`ServerConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInternalConfig {
    pub is_master: bool,
    pub request_timeout: Duration,
    pub receive_timeout: Duration,
    pub keep_alive_interval: Duration,
    pub max_chunk_size: usize,
}

impl Default for ServerInternalConfig {
    fn default() -> Self {
        Self {
            is_master: false,
            request_timeout: Duration::from_secs(10),
            receive_timeout: Duration::from_secs(120),
            keep_alive_interval: Duration::from_secs(60),
            max_chunk_size: 5 * 1024 * 1024,
        }
    }
}

/// One indexer endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexerNode {
    pub host: String,
    #[serde(default = "default_indexer_port")]
    pub port: u16,
}

/// `indexer` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexerConfig {
    pub hosts: Vec<IndexerNode>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            hosts: vec![IndexerNode {
                host: "localhost".to_owned(),
                port: DEFAULT_INDEXER_PORT,
            }],
            username: None,
            password: None,
        }
    }
}

impl Validate for IndexerConfig {
    fn validate(&self) -> Result<(), String> {
        if self.hosts.is_empty() {
            return Err("indexer.hosts must list at least one host".to_owned());
        }
        for node in &self.hosts {
            if node.host.trim().is_empty() || node.port == 0 {
                return Err(format!("invalid indexer host {}:{}", node.host, node.port));
            }
        }
        Ok(())
    }
}

/// `communications_api` section — the agent-facing API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommunicationsApiConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

impl Default for CommunicationsApiConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: DEFAULT_COMMS_API_PORT,
            workers: 4,
        }
    }
}

impl Validate for CommunicationsApiConfig {
    fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("communications_api.port must not be 0".to_owned());
        }
        if self.workers == 0 {
            return Err("communications_api.workers must be at least 1".to_owned());
        }
        Ok(())
    }
}

/// `management_api` section — the administrative API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManagementApiConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_size: u64,
}

impl Default for ManagementApiConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: DEFAULT_MANAGEMENT_API_PORT,
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
        }
    }
}

impl Validate for ManagementApiConfig {
    fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("management_api.port must not be 0".to_owned());
        }
        if self.max_upload_size == 0 {
            return Err("management_api.max_upload_size must not be 0".to_owned());
        }
        Ok(())
    }
}

/// `engine` section — how to reach the analysis engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub socket_path: PathBuf,
    pub retries: u32,
    pub timeout_secs: u64,
}

impl EngineConfig {
    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from("/run/ctxconf/engine.socket"),
            retries: 3,
            timeout_secs: 10,
        }
    }
}

impl Validate for EngineConfig {
    fn validate(&self) -> Result<(), String> {
        if self.timeout_secs == 0 {
            return Err("engine.timeout_secs must not be 0".to_owned());
        }
        Ok(())
    }
}

fn default_server_port() -> u16 {
    DEFAULT_SERVER_PORT
}

fn default_indexer_port() -> u16 {
    DEFAULT_INDEXER_PORT
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "\
server:
  node:
    name: node01
    role: master
  nodes: [node01]
";

    fn parse(text: &str) -> Result<CentralConfig, String> {
        let config: CentralConfig = serde_yaml::from_str(text).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn minimal_document_uses_defaults() {
        let config = parse(MINIMAL).unwrap();
        assert_eq!(config.server.port, DEFAULT_SERVER_PORT);
        assert_eq!(config.server.bind_addr, "0.0.0.0");
        assert_eq!(config.indexer, IndexerConfig::default());
        assert_eq!(config.communications_api.port, DEFAULT_COMMS_API_PORT);
        assert_eq!(config.management_api.port, DEFAULT_MANAGEMENT_API_PORT);
        assert_eq!(config.engine.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn partial_section_fills_remaining_fields() {
        let text = format!("{MINIMAL}communications_api:\n  port: 28000\n");
        let config = parse(&text).unwrap();
        assert_eq!(config.communications_api.port, 28000);
        assert_eq!(config.communications_api.workers, 4);
        assert_eq!(config.communications_api.host, "localhost");
    }

    #[test]
    fn indexer_host_port_defaults() {
        let text = format!("{MINIMAL}indexer:\n  hosts:\n    - host: 10.0.0.5\n");
        let config = parse(&text).unwrap();
        assert_eq!(config.indexer.hosts[0].port, DEFAULT_INDEXER_PORT);
        assert_eq!(config.indexer.hosts[0].host, "10.0.0.5");
    }

    #[test]
    fn server_section_is_required() {
        assert!(parse("indexer:\n  hosts: []\n").is_err());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let text = format!("{MINIMAL}  colour: blue\n");
        assert!(parse(&text).is_err());
    }

    #[test]
    fn empty_node_list_fails_validation() {
        let text = "server:\n  node:\n    name: a\n    role: worker\n  nodes: []\n";
        assert_eq!(
            parse(text).unwrap_err(),
            "server.nodes must list at least one node"
        );
    }

    #[test]
    fn zero_workers_fails_validation() {
        let text = format!("{MINIMAL}communications_api:\n  workers: 0\n");
        assert!(parse(&text).is_err());
    }

    #[test]
    fn internal_config_follows_role() {
        let config = parse(MINIMAL).unwrap();
        let internal = config.server.internal_config();
        assert!(internal.is_master);
        assert_eq!(internal.request_timeout, Duration::from_secs(10));
    }
}

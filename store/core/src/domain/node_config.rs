// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Store Configuration Types
//
// Defines the configuration schema shared by the router and both backend
// nodes:
// - Home directory and the marker clients use for it
// - Transfer settings (buffer size, connect and idle timeouts)
// - Identity, extension and endpoint of each of the three nodes
//
// Every process of a deployment loads the same file so that all of them
// agree on the namespace segments.

use crate::domain::extension::ExtensionClass;
use crate::domain::node::{NodeEndpoint, StorageNode, StorageTopology};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Home directory the node roots live under (default: the user's home)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<PathBuf>,

    /// Marker clients use for the home directory in virtual paths
    #[serde(default = "default_home_marker")]
    pub home_marker: String,

    /// Stream transfer settings
    #[serde(default)]
    pub transfer: TransferConfig,

    /// The three storage nodes
    #[serde(default)]
    pub nodes: NodesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Size of the relay buffer in bytes
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Upper bound for connecting to a backend node
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Idle bound for any single read or write during an exchange
    #[serde(default = "default_io_timeout", with = "humantime_serde")]
    pub io_timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodesConfig {
    /// The router, which stores its own class locally
    pub local: NodeSpec,

    /// First backend node
    pub backend_a: NodeSpec,

    /// Second backend node
    pub backend_b: NodeSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Node name; also its namespace segment under home
    pub name: String,

    /// Suffix owned by this node, including the leading dot
    pub extension: String,

    #[serde(default = "default_host")]
    pub host: String,

    pub port: u16,
}

fn default_home_marker() -> String {
    "~".to_string()
}

fn default_buffer_size() -> usize {
    1024
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_io_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            connect_timeout: default_connect_timeout(),
            io_timeout: default_io_timeout(),
        }
    }
}

impl Default for NodesConfig {
    fn default() -> Self {
        Self {
            local: NodeSpec {
                name: "smain".to_string(),
                extension: ".c".to_string(),
                host: default_host(),
                port: 3001,
            },
            backend_a: NodeSpec {
                name: "spdf".to_string(),
                extension: ".pdf".to_string(),
                host: default_host(),
                port: 3002,
            },
            backend_b: NodeSpec {
                name: "stext".to_string(),
                extension: ".txt".to_string(),
                host: default_host(),
                port: 3003,
            },
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            home: None,
            home_marker: default_home_marker(),
            transfer: TransferConfig::default(),
            nodes: NodesConfig::default(),
        }
    }
}

impl NodesConfig {
    pub fn spec(&self, class: ExtensionClass) -> &NodeSpec {
        match class {
            ExtensionClass::Local => &self.local,
            ExtensionClass::BackendA => &self.backend_a,
            ExtensionClass::BackendB => &self.backend_b,
        }
    }
}

impl StoreConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. SPLITSTORE_CONFIG_PATH environment variable
    /// 2. ./splitstore.yaml (working directory)
    /// 3. ~/.splitstore/config.yaml (user home)
    /// 4. /etc/splitstore/config.yaml (system)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("SPLITSTORE_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./splitstore.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".splitstore").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/splitstore/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::debug!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(home) = std::env::var("SPLITSTORE_HOME") {
            tracing::info!("Environment override: SPLITSTORE_HOME={}", home);
            self.home = Some(PathBuf::from(home));
        }

        if let Ok(val) = std::env::var("SPLITSTORE_BUFFER_SIZE") {
            match val.parse::<usize>() {
                Ok(size) if size > 0 => {
                    tracing::info!("Environment override: SPLITSTORE_BUFFER_SIZE={}", size);
                    self.transfer.buffer_size = size;
                }
                _ => {
                    tracing::warn!(
                        "Invalid value for SPLITSTORE_BUFFER_SIZE: '{}'. Expected a positive integer. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        // Names travel as command tokens, so none may contain whitespace.
        if self.home_marker.is_empty()
            || self.home_marker.contains('/')
            || self.home_marker.contains(char::is_whitespace)
        {
            anyhow::bail!("home_marker must be non-empty and contain no '/' or whitespace");
        }

        if self.transfer.buffer_size == 0 {
            anyhow::bail!("transfer.buffer_size must be greater than zero");
        }

        if let Some(home) = &self.home {
            if !home.is_absolute() {
                anyhow::bail!("home must be an absolute path: {}", home.display());
            }
        }

        let mut names = HashSet::new();
        let mut extensions = HashSet::new();
        let mut endpoints = HashSet::new();
        for class in ExtensionClass::ALL {
            let spec = self.nodes.spec(class);

            if spec.name.is_empty()
                || spec.name.contains('/')
                || spec.name.contains(char::is_whitespace)
                || spec.name == "."
                || spec.name == ".."
            {
                anyhow::bail!("Node name '{}' must be a single path segment", spec.name);
            }

            let ext = spec.extension.strip_prefix('.').unwrap_or_default();
            if ext.is_empty() || ext.contains('.') || ext.contains('/') || ext.contains(char::is_whitespace) {
                anyhow::bail!(
                    "Extension '{}' of node '{}' must look like '.ext'",
                    spec.extension,
                    spec.name
                );
            }

            if spec.port == 0 {
                anyhow::bail!("Node '{}' must have a non-zero port", spec.name);
            }

            if !names.insert(spec.name.as_str()) {
                anyhow::bail!("Duplicate node name: {}", spec.name);
            }
            if !extensions.insert(spec.extension.as_str()) {
                anyhow::bail!("Duplicate extension: {}", spec.extension);
            }
            if !endpoints.insert((spec.host.as_str(), spec.port)) {
                anyhow::bail!("Duplicate endpoint: {}:{}", spec.host, spec.port);
            }
        }

        Ok(())
    }

    /// Resolved home directory
    pub fn home_dir(&self) -> anyhow::Result<PathBuf> {
        match &self.home {
            Some(home) => Ok(home.clone()),
            None => dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Could not determine home directory; set `home`")),
        }
    }

    /// Build the immutable node topology
    pub fn topology(&self) -> anyhow::Result<StorageTopology> {
        self.validate()?;
        let home = self.home_dir()?;

        let node = |class: ExtensionClass| {
            let spec = self.nodes.spec(class);
            StorageNode {
                class,
                name: spec.name.clone(),
                extension: spec.extension.clone(),
                endpoint: NodeEndpoint {
                    host: spec.host.clone(),
                    port: spec.port,
                },
                root: home.join(&spec.name),
            }
        };

        Ok(StorageTopology::new(
            home.clone(),
            self.home_marker.clone(),
            node(ExtensionClass::Local),
            node(ExtensionClass::BackendA),
            node(ExtensionClass::BackendB),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.home_marker, "~");
        assert_eq!(config.transfer.buffer_size, 1024);
        assert_eq!(config.nodes.local.port, 3001);
        assert_eq!(config.nodes.backend_a.extension, ".pdf");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r#"
home: /srv/store
transfer:
  buffer_size: 4096
  connect_timeout: 2s
  io_timeout: 1m
nodes:
  local: { name: main, extension: ".rs", port: 4001 }
  backend_a: { name: docs, extension: ".md", port: 4002 }
  backend_b: { name: data, extension: ".csv", host: 10.0.0.2, port: 4003 }
"#;
        let config = StoreConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.home, Some(PathBuf::from("/srv/store")));
        assert_eq!(config.home_marker, "~");
        assert_eq!(config.transfer.buffer_size, 4096);
        assert_eq!(config.transfer.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.transfer.io_timeout, Duration::from_secs(60));
        assert_eq!(config.nodes.backend_b.host, "10.0.0.2");
        assert_eq!(config.nodes.local.host, "127.0.0.1");

        let topology = config.topology().unwrap();
        assert_eq!(topology.local().root, PathBuf::from("/srv/store/main"));
        assert_eq!(topology.classify("x.csv"), Some(ExtensionClass::BackendB));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let mut config = StoreConfig::default();
        config.home = Some(PathBuf::from("/tmp/h"));
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed = StoreConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed.home, config.home);
        assert_eq!(parsed.nodes.backend_b.name, "stext");
        assert_eq!(parsed.transfer.io_timeout, config.transfer.io_timeout);
    }

    #[test]
    fn test_validation() {
        let mut config = StoreConfig::default();
        config.nodes.backend_b.extension = ".pdf".to_string();
        assert!(config.validate().is_err());

        let mut config = StoreConfig::default();
        config.nodes.backend_a.name = "a/b".to_string();
        assert!(config.validate().is_err());

        let mut config = StoreConfig::default();
        config.nodes.backend_a.extension = "pdf".to_string();
        assert!(config.validate().is_err());

        let mut config = StoreConfig::default();
        config.nodes.backend_b.port = 3002;
        assert!(config.validate().is_err());

        let mut config = StoreConfig::default();
        config.transfer.buffer_size = 0;
        assert!(config.validate().is_err());

        let mut config = StoreConfig::default();
        config.home = Some(PathBuf::from("relative"));
        assert!(config.validate().is_err());

        let mut config = StoreConfig::default();
        config.nodes.backend_a.name = "s pdf".to_string();
        assert!(config.validate().is_err());

        let mut config = StoreConfig::default();
        config.home_marker = "~ ".to_string();
        assert!(config.validate().is_err());

        let mut config = StoreConfig::default();
        config.home = Some(PathBuf::from("/Users/John Doe"));
        config.validate().unwrap();
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("splitstore.yaml");
        let mut config = StoreConfig::default();
        config.transfer.buffer_size = 8;
        config.to_yaml_file(&path).unwrap();

        let loaded = StoreConfig::from_yaml_file(&path).unwrap();
        assert_eq!(loaded.transfer.buffer_size, 8);
    }
}

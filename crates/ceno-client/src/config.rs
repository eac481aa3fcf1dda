//! TOML configuration for the client daemon.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ceno_core::{FreenetUri, KeyType};
use ceno_fcp::FcpConfig;
use ceno_fcp::constants::{
    DEFAULT_CLIENT_NAME, DEFAULT_CONNECT_TIMEOUT, DEFAULT_FCP_ADDRESS, DEFAULT_MAX_RETRIES,
};
use serde::Deserialize;

use crate::error::ClientError;

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Deserialize)]
pub struct ClientConfig {
    pub bridge: BridgeSection,
    #[serde(default)]
    pub fcp: FcpSection,
    #[serde(default)]
    pub signaling: SignalingSection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl ClientConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ClientError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("failed to read config file: {e}")))?;
        Self::parse(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ClientError> {
        let config: Self = toml::from_str(s)
            .map_err(|e| ClientError::Config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ClientError> {
        let key = self.bridge.key.trim();
        if key.is_empty() {
            return Err(ClientError::Config("bridge.key is empty".into()));
        }
        let uri = FreenetUri::parse(key)
            .map_err(|e| ClientError::Config(format!("bridge.key is not a valid URI: {e}")))?;
        if !matches!(uri.key_type(), KeyType::Ssk | KeyType::Usk) {
            return Err(ClientError::Config(format!(
                "bridge.key must be an SSK or USK, got {}",
                uri.key_type()
            )));
        }
        if self.signaling.tick_interval_secs == 0 {
            return Err(ClientError::Config(
                "signaling.tick_interval_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// The `[bridge]` section.
#[derive(Debug, Deserialize)]
pub struct BridgeSection {
    /// The bridge's public key, under which it advertises its puzzle.
    pub key: String,
}

/// The `[fcp]` section.
#[derive(Debug, Deserialize)]
pub struct FcpSection {
    #[serde(default = "default_fcp_address")]
    pub address: String,
    #[serde(default = "default_client_name")]
    pub client_name: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: i32,
}

fn default_fcp_address() -> String {
    DEFAULT_FCP_ADDRESS.to_string()
}

fn default_client_name() -> String {
    DEFAULT_CLIENT_NAME.to_string()
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT.as_secs()
}

fn default_max_retries() -> i32 {
    DEFAULT_MAX_RETRIES
}

impl Default for FcpSection {
    fn default() -> Self {
        Self {
            address: default_fcp_address(),
            client_name: default_client_name(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl FcpSection {
    pub fn to_fcp_config(&self) -> FcpConfig {
        FcpConfig {
            address: self.address.clone(),
            client_name: self.client_name.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            max_retries: self.max_retries,
        }
    }
}

/// The `[signaling]` section.
#[derive(Debug, Deserialize)]
pub struct SignalingSection {
    /// Seconds between channel maker cycles. Default: 600.
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
    /// Replace a fatal channel maker with one holding a fresh key. Default: true.
    #[serde(default = "default_regenerate_on_fatal")]
    pub regenerate_on_fatal: bool,
}

fn default_tick_interval_secs() -> u64 {
    600
}

fn default_regenerate_on_fatal() -> bool {
    true
}

impl Default for SignalingSection {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
            regenerate_on_fatal: default_regenerate_on_fatal(),
        }
    }
}

/// The `[storage]` section.
#[derive(Debug, Deserialize)]
pub struct StorageSection {
    #[serde(default = "default_enable_storage")]
    pub enable: bool,
    /// Storage directory. Defaults to `~/.ceno/storage`.
    pub path: Option<String>,
}

fn default_enable_storage() -> bool {
    true
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            enable: default_enable_storage(),
            path: None,
        }
    }
}

/// The `[logging]` section.
#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Expand a leading `~/` to the home directory.
pub fn parse_path(s: &str) -> PathBuf {
    match s.strip_prefix("~/") {
        Some(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(s),
        },
        None => PathBuf::from(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ceno_core::SignalingKeyPair;

    fn bridge() -> String {
        SignalingKeyPair::generate_local().request_uri().to_ascii_string()
    }

    #[test]
    fn parse_minimal_config() {
        let toml = format!("[bridge]\nkey = \"{}\"\n", bridge());
        let config = ClientConfig::parse(&toml).unwrap();
        assert_eq!(config.fcp.address, "127.0.0.1:9481");
        assert_eq!(config.fcp.client_name, "ceno-client");
        assert_eq!(config.fcp.connect_timeout_secs, 10);
        assert_eq!(config.fcp.max_retries, 3);
        assert_eq!(config.signaling.tick_interval_secs, 600);
        assert!(config.signaling.regenerate_on_fatal);
        assert!(config.storage.enable);
        assert!(config.storage.path.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn parse_full_config() {
        let key = bridge();
        let toml = format!(
            r#"
[bridge]
key = "{key}"

[fcp]
address = "10.0.0.5:9481"
client_name = "ceno-test"
connect_timeout_secs = 3
max_retries = -1

[signaling]
tick_interval_secs = 30
regenerate_on_fatal = false

[storage]
enable = false
path = "/var/lib/ceno"

[logging]
level = "debug"
"#
        );
        let config = ClientConfig::parse(&toml).unwrap();
        assert_eq!(config.bridge.key, key);
        assert_eq!(config.fcp.address, "10.0.0.5:9481");
        assert_eq!(config.fcp.max_retries, -1);
        assert_eq!(config.signaling.tick_interval_secs, 30);
        assert!(!config.signaling.regenerate_on_fatal);
        assert!(!config.storage.enable);
        assert_eq!(config.storage.path.as_deref(), Some("/var/lib/ceno"));
        assert_eq!(config.logging.level, "debug");

        let fcp = config.fcp.to_fcp_config();
        assert_eq!(fcp.connect_timeout, Duration::from_secs(3));
        assert_eq!(fcp.client_name, "ceno-test");
    }

    #[test]
    fn missing_bridge_section() {
        let err = ClientConfig::parse("[logging]\nlevel = \"info\"\n").unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn empty_bridge_key() {
        let err = ClientConfig::parse("[bridge]\nkey = \"  \"\n").unwrap_err();
        assert!(err.to_string().contains("bridge.key is empty"));
    }

    #[test]
    fn unparseable_bridge_key() {
        let err = ClientConfig::parse("[bridge]\nkey = \"not a key\"\n").unwrap_err();
        assert!(err.to_string().contains("not a valid URI"));
    }

    #[test]
    fn keyword_bridge_key() {
        let err = ClientConfig::parse("[bridge]\nkey = \"KSK@bridge\"\n").unwrap_err();
        assert!(err.to_string().contains("must be an SSK or USK"));
    }

    #[test]
    fn content_hash_bridge_key() {
        let ssk = bridge();
        let keys = ssk
            .trim_start_matches("SSK@")
            .trim_end_matches('/');
        let chk = format!("CHK@{keys}");
        assert_eq!(FreenetUri::parse(&chk).unwrap().key_type(), KeyType::Chk);

        let err = ClientConfig::parse(&format!("[bridge]\nkey = \"{chk}\"\n")).unwrap_err();
        assert!(err.to_string().contains("must be an SSK or USK, got CHK"));
    }

    #[test]
    fn zero_tick_interval() {
        let toml = format!(
            "[bridge]\nkey = \"{}\"\n[signaling]\ntick_interval_secs = 0\n",
            bridge()
        );
        assert!(ClientConfig::parse(&toml).is_err());
    }

    #[test]
    fn wrong_field_types() {
        let toml = format!(
            "[bridge]\nkey = \"{}\"\n[fcp]\nconnect_timeout_secs = \"soon\"\n",
            bridge()
        );
        assert!(ClientConfig::parse(&toml).is_err());
    }

    #[test]
    fn malformed_toml() {
        assert!(ClientConfig::parse("[bridge\nkey=").is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.toml");
        std::fs::write(&path, format!("[bridge]\nkey = \"{}\"\n", bridge())).unwrap();
        assert!(ClientConfig::load(&path).is_ok());
        assert!(ClientConfig::load(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn parse_path_expands_home() {
        assert_eq!(parse_path("/var/lib/ceno"), PathBuf::from("/var/lib/ceno"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(parse_path("~/.ceno"), home.join(".ceno"));
        }
    }
}

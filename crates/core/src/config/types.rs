use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::generation::GenerationConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub llm: Option<LlmConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Durable plan storage
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("waypoint.db")
}

/// Local fallback storage
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory for plans saved as JSON files.
    #[serde(default = "default_local_dir")]
    pub local_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            local_dir: default_local_dir(),
        }
    }
}

fn default_local_dir() -> PathBuf {
    PathBuf::from("plans")
}

/// Available LLM providers
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Anthropic,
    Ollama,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "anthropic",
            LlmProvider::Ollama => "ollama",
        }
    }
}

/// LLM configuration for the outline and chunk producers
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    /// API key (required for anthropic)
    #[serde(default)]
    pub api_key: Option<String>,
    /// Override the provider's default endpoint
    #[serde(default)]
    pub api_base: Option<String>,
    /// Maximum tokens per completion (default: 4096)
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_max_tokens() -> u32 {
    4096
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub generation: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm: Option<SanitizedLlmConfig>,
}

/// Sanitized LLM config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedLlmConfig {
    pub provider: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    pub api_key_configured: bool,
    pub max_tokens: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            storage: config.storage.clone(),
            generation: config.generation.clone(),
            llm: config.llm.as_ref().map(|l| SanitizedLlmConfig {
                provider: l.provider.as_str().to_string(),
                model: l.model.clone(),
                api_base: l.api_base.clone(),
                api_key_configured: l.api_key.as_ref().is_some_and(|k| !k.is_empty()),
                max_tokens: l.max_tokens,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.database.path, PathBuf::from("waypoint.db"));
        assert_eq!(config.storage.local_dir, PathBuf::from("plans"));
        assert_eq!(config.generation.max_chunk_days, 3);
        assert!(config.llm.is_none());
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000

[database]
path = "/var/lib/waypoint/plans.db"

[storage]
local_dir = "/var/lib/waypoint/local"

[generation]
max_chunk_days = 2
lead_chunk_first = true

[llm]
provider = "anthropic"
model = "claude-3-haiku-20240307"
api_key = "sk-test"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(
            config.database.path,
            PathBuf::from("/var/lib/waypoint/plans.db")
        );
        assert_eq!(config.generation.max_chunk_days, 2);
        assert!(config.generation.lead_chunk_first);
        assert_eq!(config.generation.chunk_timeout_secs, 90);

        let llm = config.llm.unwrap();
        assert_eq!(llm.provider, LlmProvider::Anthropic);
        assert_eq!(llm.max_tokens, 4096);
    }

    #[test]
    fn test_deserialize_unknown_provider_fails() {
        let toml = r#"
[llm]
provider = "magic"
model = "x"
"#;
        assert!(toml::from_str::<Config>(toml).is_err());
    }

    #[test]
    fn test_sanitized_config_hides_api_key() {
        let toml = r#"
[llm]
provider = "anthropic"
model = "claude-3-haiku-20240307"
api_key = "sk-secret"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let sanitized = SanitizedConfig::from(&config);
        let json = serde_json::to_string(&sanitized).unwrap();

        assert!(!json.contains("sk-secret"));
        let llm = sanitized.llm.unwrap();
        assert!(llm.api_key_configured);
        assert_eq!(llm.provider, "anthropic");
    }

    #[test]
    fn test_sanitized_config_without_llm() {
        let sanitized = SanitizedConfig::from(&Config::default());
        let json = serde_json::to_value(&sanitized).unwrap();
        assert!(json.get("llm").is_none());
        assert_eq!(json["generation"]["max_chunk_days"], 3);
    }
}

use super::{types::Config, ConfigError, LlmProvider};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Chunks hold at least one day
/// - Trips may last at least one day
/// - Anthropic has an API key
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.generation.max_chunk_days == 0 {
        return Err(ConfigError::ValidationError(
            "generation.max_chunk_days must be at least 1".to_string(),
        ));
    }

    if config.generation.max_trip_days == 0 {
        return Err(ConfigError::ValidationError(
            "generation.max_trip_days must be at least 1".to_string(),
        ));
    }

    if let Some(llm) = &config.llm {
        if llm.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "llm.model cannot be empty".to_string(),
            ));
        }
        let has_key = llm.api_key.as_ref().is_some_and(|k| !k.is_empty());
        if llm.provider == LlmProvider::Anthropic && !has_key {
            return Err(ConfigError::ValidationError(
                "llm.api_key is required for the anthropic provider".to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LlmConfig, ServerConfig};

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let config = Config {
            server: ServerConfig {
                host: "0.0.0.0".parse().unwrap(),
                port: 0,
            },
            ..Default::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_zero_chunk_days_fails() {
        let mut config = Config::default();
        config.generation.max_chunk_days = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_trip_days_fails() {
        let mut config = Config::default();
        config.generation.max_trip_days = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("max_trip_days"));
    }

    #[test]
    fn test_validate_anthropic_requires_key() {
        let mut config = Config::default();
        config.llm = Some(LlmConfig {
            provider: LlmProvider::Anthropic,
            model: "claude-3-haiku-20240307".to_string(),
            api_key: None,
            api_base: None,
            max_tokens: 4096,
        });
        assert!(validate_config(&config).is_err());

        if let Some(llm) = config.llm.as_mut() {
            llm.api_key = Some("sk-test".to_string());
        }
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_ollama_needs_no_key() {
        let mut config = Config::default();
        config.llm = Some(LlmConfig {
            provider: LlmProvider::Ollama,
            model: "llama3".to_string(),
            api_key: None,
            api_base: Some("http://localhost:11434".to_string()),
            max_tokens: 2048,
        });
        assert!(validate_config(&config).is_ok());
    }
}

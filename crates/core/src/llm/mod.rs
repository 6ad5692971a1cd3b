//! Language-model backed outline and chunk producers.

mod client;
pub mod prompt;
mod producer;

use std::sync::Arc;

pub use client::{
    parse_json_response, AnthropicClient, CompletionRequest, CompletionResponse, LlmClient,
    LlmError, LlmUsage, OllamaClient,
};
pub use producer::{LlmChunkProducer, LlmOutlineProducer};

use crate::config::{LlmConfig, LlmProvider};

/// Build the client for the configured provider.
pub fn create_llm_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    match config.provider {
        LlmProvider::Anthropic => {
            let api_key = config
                .api_key
                .as_deref()
                .filter(|k| !k.is_empty())
                .ok_or(LlmError::NotConfigured)?;
            let mut client = AnthropicClient::new(api_key, &config.model);
            if let Some(base) = &config.api_base {
                client = client.with_api_base(base);
            }
            Ok(Arc::new(client))
        }
        LlmProvider::Ollama => {
            let mut client = OllamaClient::new(&config.model);
            if let Some(base) = &config.api_base {
                client = client.with_api_base(base);
            }
            Ok(Arc::new(client))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn llm_config(provider: LlmProvider, api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            provider,
            model: "test-model".to_string(),
            api_key: api_key.map(str::to_string),
            api_base: None,
            max_tokens: 1024,
        }
    }

    #[test]
    fn test_create_anthropic_client() {
        let client = create_llm_client(&llm_config(LlmProvider::Anthropic, Some("sk-test"))).unwrap();
        assert_eq!(client.provider(), "anthropic");
        assert_eq!(client.model(), "test-model");
    }

    #[test]
    fn test_create_anthropic_without_key_fails() {
        let result = create_llm_client(&llm_config(LlmProvider::Anthropic, None));
        assert!(matches!(result, Err(LlmError::NotConfigured)));
    }

    #[test]
    fn test_create_ollama_client() {
        let client = create_llm_client(&llm_config(LlmProvider::Ollama, None)).unwrap();
        assert_eq!(client.provider(), "ollama");
    }
}

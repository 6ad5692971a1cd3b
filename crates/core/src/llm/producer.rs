//! Outline and chunk producers backed by a language model.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::client::{parse_json_response, CompletionRequest, LlmClient, LlmError, LlmUsage};
use super::prompt;
use crate::generation::{
    ChunkFailure, ChunkProducer, ChunkRequest, OutlineFailure, OutlineProducer, OutlineResult,
};
use crate::metrics;
use crate::trip::{DayPlan, HeroImage, ModelInfo, Outline, OutlineDay, TripPreferences};

/// Raw outline as the model returns it.
#[derive(Debug, Deserialize)]
struct OutlineResponse {
    destination: String,
    #[serde(default)]
    description: String,
    days: Vec<OutlineDay>,
    #[serde(default)]
    hero_image: Option<HeroImage>,
}

#[derive(Debug, Deserialize)]
struct ChunkResponse {
    days: Vec<DayPlan>,
}

fn record_usage(client: &dyn LlmClient, usage: &LlmUsage) {
    metrics::LLM_TOKENS
        .with_label_values(&[client.provider(), "input"])
        .inc_by(u64::from(usage.input_tokens));
    metrics::LLM_TOKENS
        .with_label_values(&[client.provider(), "output"])
        .inc_by(u64::from(usage.output_tokens));
}

fn outline_failure(err: LlmError) -> OutlineFailure {
    match err {
        LlmError::RateLimited {
            message,
            retry_after_secs,
        } => OutlineFailure::rate_limited(message, retry_after_secs),
        e if e.is_client_error() => OutlineFailure::invalid_input(e.to_string()),
        e => OutlineFailure::model_error(e.to_string()),
    }
}

/// Produces outlines with an LLM.
pub struct LlmOutlineProducer {
    client: Arc<dyn LlmClient>,
    max_tokens: u32,
}

impl LlmOutlineProducer {
    pub fn new(client: Arc<dyn LlmClient>, max_tokens: u32) -> Self {
        Self { client, max_tokens }
    }
}

#[async_trait]
impl OutlineProducer for LlmOutlineProducer {
    fn name(&self) -> &str {
        "llm"
    }

    async fn produce_outline(
        &self,
        preferences: &TripPreferences,
    ) -> Result<OutlineResult, OutlineFailure> {
        let request = CompletionRequest::new(prompt::outline_prompt(preferences))
            .with_system(prompt::outline_system(&[]))
            .with_max_tokens(self.max_tokens);

        let response = self.client.complete(request).await.map_err(outline_failure)?;
        record_usage(self.client.as_ref(), &response.usage);

        let parsed: OutlineResponse = parse_json_response(&response.text).map_err(|e| {
            warn!("Outline response was not valid JSON: {}", e);
            OutlineFailure::model_error(e.to_string())
        })?;

        if parsed.destination.trim().is_empty() {
            return Err(OutlineFailure::model_error(
                "outline has no destination".to_string(),
            ));
        }

        let mut resolved = preferences.clone();
        if !resolved.destination_decided {
            debug!("Model suggested destination {}", parsed.destination);
            resolved.destinations = vec![parsed.destination.clone()];
            resolved.destination_decided = true;
        }

        let outline = Outline {
            destination: parsed.destination,
            description: parsed.description,
            days: parsed.days,
        };

        let mut result = OutlineResult::new(outline, resolved);
        result.hero_image = parsed.hero_image;
        result.model_info = Some(ModelInfo {
            provider: self.client.provider().to_string(),
            model: response.model,
        });
        Ok(result)
    }
}

/// Produces detailed days with an LLM.
pub struct LlmChunkProducer {
    client: Arc<dyn LlmClient>,
    max_tokens: u32,
}

impl LlmChunkProducer {
    pub fn new(client: Arc<dyn LlmClient>, max_tokens: u32) -> Self {
        Self { client, max_tokens }
    }
}

#[async_trait]
impl ChunkProducer for LlmChunkProducer {
    fn name(&self) -> &str {
        "llm"
    }

    async fn produce_chunk(&self, request: &ChunkRequest) -> Result<Vec<DayPlan>, ChunkFailure> {
        let completion = CompletionRequest::new(prompt::chunk_prompt(request))
            .with_system(prompt::chunk_system(request))
            .with_max_tokens(self.max_tokens);

        let response = self
            .client
            .complete(completion)
            .await
            .map_err(|e| ChunkFailure::model_error(e.to_string()))?;
        record_usage(self.client.as_ref(), &response.usage);

        let parsed: ChunkResponse = parse_json_response(&response.text).map_err(|e| {
            warn!("Chunk {} response was not valid JSON: {}", request.range, e);
            ChunkFailure::model_error(e.to_string())
        })?;

        Ok(parsed.days)
    }
}

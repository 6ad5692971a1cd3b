use std::sync::Arc;
use waypoint_core::{Config, FallbackSink, GenerationConfig, GenerationHandle, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    generation: GenerationHandle,
    plans: Arc<FallbackSink>,
}

impl AppState {
    pub fn new(config: Config, generation: GenerationHandle, plans: Arc<FallbackSink>) -> Self {
        Self {
            config,
            generation,
            plans,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn generation_config(&self) -> &GenerationConfig {
        &self.config.generation
    }

    pub fn generation(&self) -> &GenerationHandle {
        &self.generation
    }

    /// Read access to saved plans, durable and local.
    pub fn plans(&self) -> &FallbackSink {
        self.plans.as_ref()
    }
}

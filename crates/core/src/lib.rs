pub mod config;
pub mod generation;
pub mod llm;
pub mod metrics;
pub mod persistence;
pub mod planner;
pub mod testing;
pub mod trip;

pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config,
    ConfigError, DatabaseConfig, LlmConfig, LlmProvider, SanitizedConfig,
};
pub use generation::{
    Caller, DayStatus, GenerationConfig, GenerationCoordinator, GenerationError,
    GenerationEvent, GenerationHandle, GenerationPhase, ProgressSnapshot, RetryError, RunId,
};
pub use persistence::{FallbackSink, JsonFilePlanStore, PersistenceSink, SqlitePlanStore};
pub use planner::{ChunkPlanner, DayRange};
pub use trip::{Itinerary, TripDuration, TripPreferences};

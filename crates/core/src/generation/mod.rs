//! Chunked itinerary generation.
//!
//! A run produces an outline first, splits its days into chunks and generates
//! the chunks concurrently. Failed chunks stay failed until the caller retries
//! them; once every day is completed the days are merged into an itinerary
//! exactly once and handed to the persistence sink.
//!
//! ```text
//! start -> outline -> plan chunks -> chunk jobs (concurrent) -> merge -> persist
//!                                       ^             |
//!                                       +-- retry ----+ (failed ranges only)
//! ```

mod config;
mod coordinator;
mod events;
mod handle;
mod merge;
mod messages;
mod run;
mod traits;
mod types;

pub use config::GenerationConfig;
pub use coordinator::GenerationCoordinator;
pub use events::GenerationEvent;
pub use handle::GenerationHandle;
pub use merge::{build_itinerary, merge_days, ItineraryParts, MergeError};
pub use messages::ChunkResult;
pub use run::{ChunkApplied, RunState};
pub use traits::{ChunkProducer, ChunkRequest, OutlineProducer, OutlineResult};
pub use types::{
    Caller, ChunkFailure, ChunkFailureReason, DayStatus, GenerationError, GenerationPhase,
    OutlineFailure, OutlineFailureReason, PersistenceStatus, ProgressSnapshot, RetryError, RunId,
};

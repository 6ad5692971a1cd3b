//! Generation orchestrator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::planner::ChunkPlanner;

/// Configuration for the generation coordinator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationConfig {
    /// Maximum number of days per chunk call.
    #[serde(default = "default_max_chunk_days")]
    pub max_chunk_days: u32,

    /// Longest trip a run accepts. Longer durations fail the run before the
    /// outline call.
    #[serde(default = "default_max_trip_days")]
    pub max_trip_days: u32,

    /// Attempts allowed per day range, first call included (0 = unlimited).
    /// Once used up, retries for that range are rejected.
    #[serde(default = "default_max_chunk_attempts")]
    pub max_chunk_attempts: u32,

    /// Deadline for the outline call (seconds).
    #[serde(default = "default_outline_timeout")]
    pub outline_timeout_secs: u64,

    /// Deadline for a single chunk call (seconds).
    /// An expired call marks its days as failed.
    #[serde(default = "default_chunk_timeout")]
    pub chunk_timeout_secs: u64,

    /// Run the first chunk alone and fan out the rest once it settles.
    /// Useful with rate-limited providers.
    #[serde(default)]
    pub lead_chunk_first: bool,

    /// Capacity of the coordinator's command queue.
    #[serde(default = "default_buffer")]
    pub command_buffer: usize,

    /// Capacity of the event broadcast channel.
    #[serde(default = "default_buffer")]
    pub event_buffer: usize,
}

fn default_max_chunk_days() -> u32 {
    3
}

fn default_max_trip_days() -> u32 {
    crate::planner::DEFAULT_MAX_TRIP_DAYS
}

fn default_max_chunk_attempts() -> u32 {
    5
}

fn default_outline_timeout() -> u64 {
    120
}

fn default_chunk_timeout() -> u64 {
    90
}

fn default_buffer() -> usize {
    256
}

impl GenerationConfig {
    pub fn outline_timeout(&self) -> Duration {
        Duration::from_secs(self.outline_timeout_secs)
    }

    pub fn chunk_timeout(&self) -> Duration {
        Duration::from_secs(self.chunk_timeout_secs)
    }

    pub fn planner(&self) -> ChunkPlanner {
        ChunkPlanner::new(self.max_chunk_days).with_max_trip_days(self.max_trip_days)
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_chunk_days: default_max_chunk_days(),
            max_trip_days: default_max_trip_days(),
            max_chunk_attempts: default_max_chunk_attempts(),
            outline_timeout_secs: default_outline_timeout(),
            chunk_timeout_secs: default_chunk_timeout(),
            lead_chunk_first: false,
            command_buffer: default_buffer(),
            event_buffer: default_buffer(),
        }
    }
}

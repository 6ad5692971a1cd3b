//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Generation runs (starts, outcomes, chunk calls, retries)
//! - Persistence (durable and local saves)
//! - LLM usage

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Runs
// =============================================================================

/// Runs started.
pub static RUNS_STARTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("waypoint_runs_started_total", "Total generation runs started").unwrap()
});

/// Runs that reached a terminal phase, by result.
pub static RUNS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "waypoint_runs_finished_total",
            "Total generation runs that reached a terminal phase",
        ),
        &["result"], // "completed", "outline_failed", "abandoned"
    )
    .unwrap()
});

// =============================================================================
// Chunks
// =============================================================================

/// Chunk calls by result.
pub static CHUNK_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("waypoint_chunk_attempts_total", "Total chunk generation calls"),
        &["result"], // "success", "model_error", "timeout", "stale"
    )
    .unwrap()
});

/// Chunk call duration in seconds.
pub static CHUNK_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "waypoint_chunk_duration_seconds",
            "Duration of chunk generation calls",
        )
        .buckets(vec![1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0, 90.0, 120.0]),
        &["result"],
    )
    .unwrap()
});

/// Caller-initiated retries by result.
pub static RETRIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("waypoint_retries_total", "Total chunk retry requests"),
        &["result"], // "accepted", "rejected"
    )
    .unwrap()
});

// =============================================================================
// Persistence
// =============================================================================

/// Persistence outcomes by kind.
pub static PERSIST_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("waypoint_persist_total", "Total itinerary persistence outcomes"),
        &["kind"], // "durable", "local", "failed"
    )
    .unwrap()
});

// =============================================================================
// LLM
// =============================================================================

/// LLM tokens used.
pub static LLM_TOKENS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("waypoint_llm_tokens_total", "Total LLM tokens used"),
        &["provider", "direction"], // direction: "input", "output"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Runs
        Box::new(RUNS_STARTED.clone()),
        Box::new(RUNS_FINISHED.clone()),
        // Chunks
        Box::new(CHUNK_ATTEMPTS.clone()),
        Box::new(CHUNK_DURATION.clone()),
        Box::new(RETRIES.clone()),
        // Persistence
        Box::new(PERSIST_TOTAL.clone()),
        // LLM
        Box::new(LLM_TOKENS.clone()),
    ]
}

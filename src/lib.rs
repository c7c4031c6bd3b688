//! Core processing pipeline for the candidate-screening platform.
//!
//! The crate owns the screening-session state machine, the scoring and
//! risk-classification engines, follow-up reminder scheduling, and the
//! context-compaction subsystem. Durable storage, job lookups, and
//! notification delivery stay behind the traits in
//! [`screening::repository`] so the pipeline can be exercised in isolation.

pub mod config;
pub mod error;
pub mod screening;
pub mod telemetry;

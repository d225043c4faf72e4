//! Transcode worker.
//!
//! This crate provides:
//! - The sequential driver loop over the message bus
//! - The transcode pipeline (fetch, encode, publish, finalize)
//! - A hard per-job deadline that aborts in-flight work
//! - Best-effort status bookkeeping that never blocks the pipeline

pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod pipeline;

pub use config::WorkerConfig;
pub use context::WorkerContext;
pub use error::{WorkerError, WorkerResult};
pub use executor::Worker;
pub use pipeline::{PipelineOutcome, PipelineServices};

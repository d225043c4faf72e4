//! Redis Streams message bus between the dispatch service and workers.
//!
//! This crate provides:
//! - Durable publish with internal retry and durability acknowledgment
//! - Blocking consumer-group polling with explicit acks
//! - The flat, self-contained transcode work message
//!
//! A single stream is totally ordered, which subsumes the contract's
//! per-job-id ordering. Delivery is at-least-once; consumers must
//! process idempotently.

pub mod bus;
pub mod error;
pub mod message;
pub mod retry;

pub use bus::{BusConfig, Delivery, JobBus};
pub use error::{BusError, BusResult};
pub use message::TranscodeJobMessage;
pub use retry::{retry_async, RetryConfig};

//! # Retry Relay
//!
//! A message-driven retry engine for processing pipelines.
//!
//! The engine watches a stream of messages, each either a success or a
//! failure notice. Successes pass straight through and are remembered as
//! the last known good message. Every failure re-sends that message after
//! a configurable delay, until a fresh success arrives or the retry budget
//! is used up, at which point a terminal failure can be raised.
//!
//! ## Delay Strategies
//!
//! | Strategy | Behaviour |
//! |----------|-----------|
//! | `immediate` | Re-send synchronously |
//! | `fixed_delay` | Wait a fixed delay (default 5 s) |
//! | `random_delay` | Wait a uniform draw between two bounds (default 3–10 s) |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use retry_relay::{
//!     ChannelSink, DurationUnit, Failure, Message, RetryConfig, RetryEngine, RetryEvent,
//!     RetryStrategy,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RetryConfig::builder()
//!         .strategy(RetryStrategy::FixedDelay)
//!         .fixed_delay(500.0, DurationUnit::Milliseconds)
//!         .max_attempts(3)
//!         .build()?;
//!
//!     let (sink, mut events) = ChannelSink::new();
//!     let engine = RetryEngine::new(config, sink);
//!
//!     // A success passes through and is remembered
//!     engine.handle(Message::new("request"));
//!     // A failure re-sends "request" after 500 ms
//!     engine.handle(Message::failed("request", Failure::with_description("timeout")));
//!
//!     let mut forwarded = 0;
//!     while let Some(event) = events.recv().await {
//!         if let RetryEvent::Forward(msg) = event {
//!             println!("forwarded: {}", msg.payload);
//!             forwarded += 1;
//!             if forwarded == 2 {
//!                 break;
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! RetryConfig ──► DelayPolicy
//!      │              │
//!      ▼              ▼
//! RetryEngine<M, S> ──► RetrySink (forward / status / terminal failure)
//! ```
//!
//! ## Features
//!
//! - `tracing` - tracing instrumentation (enabled by default)

pub mod engine;
pub mod errors;
pub mod message;
pub mod types;
pub(crate) mod utils;

// Re-export commonly used types at the crate root
pub use engine::{
    ChannelSink, ORPHAN_FAILURE_WARNING, RawRetryConfig, RetryConfig, RetryConfigBuilder,
    RetryEngine, RetryEvent, RetryExhausted, RetrySink, RetryStatus, StatusKind,
};
pub use errors::ConfigurationError;
pub use message::{Failure, Message, RetryMessage};
pub use types::{
    Delay, DelayRange, DurationUnit, DurationUnitError, RetryStrategy, RetryStrategyError,
};
pub use utils::duration::{from_milliseconds, to_milliseconds};
pub use utils::retry::{ComputedDelay, DelayPolicy};

// Re-export for cancellation support
pub use tokio_util::sync::CancellationToken;

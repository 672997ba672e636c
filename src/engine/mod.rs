//! Retry engine: configuration, state machine and outbound interface.

pub(crate) mod config;
pub(crate) mod error;
pub(crate) mod sink;
pub(crate) mod structure;
pub(crate) mod traits;

pub use config::{RawRetryConfig, RetryConfig, RetryConfigBuilder};
pub use error::RetryExhausted;
pub use sink::{ChannelSink, RetryEvent};
pub use structure::{ORPHAN_FAILURE_WARNING, RetryEngine};
pub use traits::{RetrySink, RetryStatus, StatusKind};

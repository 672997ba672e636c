//! Outbound interface of the retry engine.

use super::error::RetryExhausted;
use crate::utils::retry::ComputedDelay;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// Coarse state shown by a status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    /// A success message was stored as the new last known good message.
    StoredValid,
    /// A retry was scheduled (or sent immediately).
    Retrying,
    /// The retry budget is used up.
    Exhausted,
}

/// Status update emitted by the engine after each handled message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RetryStatus {
    /// A success message was stored.
    StoredValid,
    /// Retry `attempt` of `max_attempts` was scheduled after `delay`.
    Retrying {
        attempt: u32,
        max_attempts: u32,
        delay: ComputedDelay,
    },
    /// All `attempts` retries were made without success.
    Exhausted { attempts: u32 },
}

impl RetryStatus {
    /// Coarse kind of this status.
    pub fn kind(&self) -> StatusKind {
        match self {
            Self::StoredValid => StatusKind::StoredValid,
            Self::Retrying { .. } => StatusKind::Retrying,
            Self::Exhausted { .. } => StatusKind::Exhausted,
        }
    }
}

impl Display for RetryStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::StoredValid => f.write_str("stored valid message"),
            Self::Retrying {
                attempt,
                max_attempts,
                delay,
            } => {
                write!(f, "retry {attempt} of {max_attempts}")?;
                if !delay.is_immediate() {
                    write!(f, " in {delay}")?;
                }
                Ok(())
            }
            Self::Exhausted { attempts } => f.write_str(&RetryExhausted::status_text(*attempts)),
        }
    }
}

/// Receiver of everything a retry engine emits.
///
/// The engine calls these methods while it holds its state lock, so a sink
/// must not call back into the same engine synchronously. Queueing the
/// output (as [`ChannelSink`](super::ChannelSink) does) is the usual way to
/// hand it to other stages.
///
/// # Example
///
/// ```rust,ignore
/// use retry_relay::{Message, RetryExhausted, RetrySink};
///
/// struct Downstream { /* ... */ }
///
/// impl RetrySink<Message> for Downstream {
///     fn forward(&self, msg: Message) {
///         // Hand the message to the next pipeline stage
///     }
///
///     fn report_terminal_failure(&self, error: &RetryExhausted, original: &Message) {
///         // Route the failure to an error handler
///     }
/// }
/// ```
pub trait RetrySink<M>: Send + Sync + 'static {
    /// Emit a message downstream: either a success passing through or a
    /// re-sent copy of the last good message.
    fn forward(&self, msg: M);

    /// Surface the terminal failure raised when the retry budget is used up.
    ///
    /// Only called when the configuration asks for exhaustion to raise.
    fn report_terminal_failure(&self, error: &RetryExhausted, original: &M);

    /// Observe a status change.
    ///
    /// Default implementation ignores the status.
    fn report_status(&self, status: &RetryStatus) {
        let _ = status;
    }

    /// Observe a dropped failure that arrived before any success.
    ///
    /// Default implementation ignores the warning.
    fn report_warning(&self, text: &str, msg: &M) {
        let _ = (text, msg);
    }
}

impl<M, S: RetrySink<M> + ?Sized> RetrySink<M> for Arc<S> {
    fn forward(&self, msg: M) {
        (**self).forward(msg)
    }

    fn report_terminal_failure(&self, error: &RetryExhausted, original: &M) {
        (**self).report_terminal_failure(error, original)
    }

    fn report_status(&self, status: &RetryStatus) {
        (**self).report_status(status)
    }

    fn report_warning(&self, text: &str, msg: &M) {
        (**self).report_warning(text, msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DurationUnit;

    #[test]
    fn test_status_text_with_delay() {
        let status = RetryStatus::Retrying {
            attempt: 1,
            max_attempts: 3,
            delay: ComputedDelay {
                millis: 600.0,
                magnitude: 0.6,
                unit: DurationUnit::Seconds,
            },
        };
        assert_eq!(status.to_string(), "retry 1 of 3 in 0.6 sec");
        assert_eq!(status.kind(), StatusKind::Retrying);
    }

    #[test]
    fn test_status_text_immediate_omits_delay() {
        let status = RetryStatus::Retrying {
            attempt: 2,
            max_attempts: 200,
            delay: ComputedDelay::immediate(),
        };
        assert_eq!(status.to_string(), "retry 2 of 200");
    }

    #[test]
    fn test_status_text_stored_and_exhausted() {
        assert_eq!(RetryStatus::StoredValid.to_string(), "stored valid message");
        assert_eq!(RetryStatus::StoredValid.kind(), StatusKind::StoredValid);

        let exhausted = RetryStatus::Exhausted { attempts: 2 };
        assert_eq!(exhausted.to_string(), "failed after retrying 2 times.");
        assert_eq!(exhausted.kind(), StatusKind::Exhausted);
    }
}

//! Terminal failure raised when the retry budget is used up.

use crate::message::RetryMessage;
use thiserror::Error;

/// The retry budget was exhausted without an intervening success.
///
/// The display text puts the original failure description (when there is
/// one) in front of the generic exhaustion text:
///
/// ```rust
/// use retry_relay::RetryExhausted;
///
/// let err = RetryExhausted::new(2, Some("X"));
/// assert_eq!(err.to_string(), "X ([Retry] failed after retrying 2 times.)");
///
/// let err = RetryExhausted::new(2, None);
/// assert_eq!(err.to_string(), "failed after retrying 2 times.");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RetryExhausted {
    attempts: u32,
    description: Option<String>,
    message: String,
}

impl RetryExhausted {
    /// Compose the terminal error for `attempts` retries.
    pub fn new(attempts: u32, description: Option<&str>) -> Self {
        let generic = Self::status_text(attempts);
        let message = match description {
            Some(description) => format!("{description} ([Retry] {generic})"),
            None => generic,
        };
        Self {
            attempts,
            description: description.map(str::to_string),
            message,
        }
    }

    /// Generic exhaustion text, also used as the status line.
    pub fn status_text(attempts: u32) -> String {
        format!("failed after retrying {attempts} times.")
    }

    /// Number of retries that were made.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Description of the failure that hit the exhausted budget.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Composed error text.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Copy of `original` whose failure description is the composed text.
    pub fn annotate<M: RetryMessage>(&self, original: &M) -> M {
        let mut annotated = original.clone();
        annotated.set_failure_description(self.message.clone());
        annotated
    }
}

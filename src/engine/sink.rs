//! Channel-backed sink.

use super::error::RetryExhausted;
use super::traits::{RetrySink, RetryStatus};
use crate::message::RetryMessage;
use tokio::sync::mpsc;

#[cfg(feature = "tracing")]
use tracing::debug;

/// Everything a retry engine can emit, as a value.
#[derive(Debug, Clone)]
pub enum RetryEvent<M> {
    /// A message forwarded downstream.
    Forward(M),
    /// A status update.
    Status(RetryStatus),
    /// A failure dropped because no success had been seen yet.
    Warning { text: String, message: M },
    /// The retry budget was exhausted. `message` is the failure that hit
    /// the limit, with its description replaced by the composed error text.
    TerminalFailure { error: RetryExhausted, message: M },
}

impl<M> RetryEvent<M> {
    /// The forwarded message, if this is a forward event.
    pub fn into_forwarded(self) -> Option<M> {
        match self {
            Self::Forward(msg) => Some(msg),
            _ => None,
        }
    }
}

/// [`RetrySink`] that publishes [`RetryEvent`]s on an unbounded channel.
///
/// Events are dropped silently once the receiver is gone.
///
/// ```rust
/// use retry_relay::{ChannelSink, Message, RetryConfig, RetryEngine, RetryEvent, RetryStrategy};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (sink, mut events) = ChannelSink::new();
/// let config = RetryConfig::builder()
///     .strategy(RetryStrategy::Immediate)
///     .build()
///     .unwrap();
/// let engine = RetryEngine::new(config, sink);
///
/// engine.handle(Message::new("hello"));
/// assert!(matches!(events.try_recv(), Ok(RetryEvent::Status(_))));
/// assert!(matches!(events.try_recv(), Ok(RetryEvent::Forward(_))));
/// # }
/// ```
#[derive(Debug)]
pub struct ChannelSink<M> {
    tx: mpsc::UnboundedSender<RetryEvent<M>>,
}

impl<M> Clone for ChannelSink<M> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<M> ChannelSink<M> {
    /// Create a sink and the receiver its events arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RetryEvent<M>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Create a sink publishing on an existing sender.
    pub fn from_sender(tx: mpsc::UnboundedSender<RetryEvent<M>>) -> Self {
        Self { tx }
    }

    fn publish(&self, event: RetryEvent<M>) {
        if self.tx.send(event).is_err() {
            #[cfg(feature = "tracing")]
            debug!("Event receiver dropped, discarding retry event");
        }
    }
}

impl<M: RetryMessage> RetrySink<M> for ChannelSink<M> {
    fn forward(&self, msg: M) {
        self.publish(RetryEvent::Forward(msg));
    }

    fn report_terminal_failure(&self, error: &RetryExhausted, original: &M) {
        self.publish(RetryEvent::TerminalFailure {
            error: error.clone(),
            message: error.annotate(original),
        });
    }

    fn report_status(&self, status: &RetryStatus) {
        self.publish(RetryEvent::Status(*status));
    }

    fn report_warning(&self, text: &str, msg: &M) {
        self.publish(RetryEvent::Warning {
            text: text.to_string(),
            message: msg.clone(),
        });
    }
}

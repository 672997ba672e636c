//! Retry engine state machine.

use super::config::{RawRetryConfig, RetryConfig};
use super::error::RetryExhausted;
use super::traits::{RetrySink, RetryStatus};
use crate::errors::ConfigurationError;
use crate::message::RetryMessage;
use crate::utils::retry::{ComputedDelay, DelayPolicy};
use std::fmt::{self, Debug, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[cfg(feature = "tracing")]
use tracing::{debug, error, info, warn};

/// Warning reported for a failure that arrives before any success.
pub const ORPHAN_FAILURE_WARNING: &str =
    "failure reported before any valid message, skipping retry attempts";

/// Handle of the one scheduled retry.
struct PendingRetry {
    id: u64,
    token: CancellationToken,
}

/// Mutable state of one engine. Only touched under the engine's lock.
struct RetryState<M> {
    last_success: Option<M>,
    attempt_count: u32,
    pending: Option<PendingRetry>,
    next_timer_id: u64,
}

impl<M> RetryState<M> {
    fn new() -> Self {
        Self {
            last_success: None,
            attempt_count: 0,
            pending: None,
            next_timer_id: 0,
        }
    }

    /// Cancel the scheduled retry, if any. Returns whether one was pending.
    fn cancel_pending(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                pending.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether `id` still names the live, uncancelled timer.
    fn is_current(&self, id: u64) -> bool {
        matches!(&self.pending, Some(p) if p.id == id && !p.token.is_cancelled())
    }
}

struct Inner<M, S> {
    config: RetryConfig,
    policy: DelayPolicy,
    sink: S,
    state: Mutex<RetryState<M>>,
}

impl<M, S> Inner<M, S> {
    fn lock(&self) -> MutexGuard<'_, RetryState<M>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<M: RetryMessage, S: RetrySink<M>> Inner<M, S> {
    /// Timer callback: re-send the last good message unless superseded.
    fn fire(&self, id: u64) {
        let mut state = self.lock();
        if !state.is_current(id) {
            #[cfg(feature = "tracing")]
            debug!(
                engine = %self.config.display_name(),
                timer = id,
                "Discarding superseded retry timer"
            );
            return;
        }
        state.pending = None;

        if let Some(msg) = state.last_success.clone() {
            #[cfg(feature = "tracing")]
            info!(
                engine = %self.config.display_name(),
                attempt = state.attempt_count,
                "Re-sending last valid message"
            );
            self.sink.forward(msg);
        }
    }
}

impl<M, S> Drop for Inner<M, S> {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        state.cancel_pending();
    }
}

/// Event-driven retry engine.
///
/// Feed it every message of a stream with [`handle`](RetryEngine::handle).
/// Success messages pass through and are remembered; each failure re-sends
/// the remembered message after the configured delay, until the retry
/// budget is used up or a new success arrives.
///
/// The engine is a cheap, cloneable handle; all clones share one state.
/// Messages are processed one at a time and a firing timer takes the same
/// lock, so a retry superseded by a newer message is never sent.
///
/// Delayed retries are spawned onto the current Tokio runtime, so
/// [`handle`](RetryEngine::handle) must be called from within one when the
/// strategy is not immediate.
///
/// # Example
///
/// ```rust
/// use retry_relay::{ChannelSink, Failure, Message, RetryConfig, RetryEngine, RetryEvent, RetryStrategy};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let config = RetryConfig::builder()
///     .strategy(RetryStrategy::Immediate)
///     .max_attempts(1)
///     .build()
///     .unwrap();
/// let (sink, mut events) = ChannelSink::new();
/// let engine = RetryEngine::new(config, sink);
///
/// engine.handle(Message::new("job-1"));
/// engine.handle(Message::failed("job-1", Failure::with_description("timeout")));
///
/// let forwarded: Vec<Message> = std::iter::from_fn(|| events.try_recv().ok())
///     .filter_map(RetryEvent::into_forwarded)
///     .collect();
/// assert_eq!(forwarded, vec![Message::new("job-1"), Message::new("job-1")]);
/// # }
/// ```
pub struct RetryEngine<M, S> {
    inner: Arc<Inner<M, S>>,
}

impl<M, S> Clone for RetryEngine<M, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M, S> Debug for RetryEngine<M, S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("RetryEngine")
            .field("config", &self.inner.config)
            .field("has_last_success", &state.last_success.is_some())
            .field("attempt_count", &state.attempt_count)
            .field("pending_retry", &state.pending.is_some())
            .finish()
    }
}

impl<M: RetryMessage, S: RetrySink<M>> RetryEngine<M, S> {
    /// Create an engine from a validated configuration.
    pub fn new(config: RetryConfig, sink: S) -> Self {
        let policy = DelayPolicy::new(&config);

        #[cfg(feature = "tracing")]
        debug!(
            engine = %config.display_name(),
            strategy = %config.strategy(),
            max_attempts = config.max_attempts(),
            "Retry engine created"
        );

        Self {
            inner: Arc::new(Inner {
                config,
                policy,
                sink,
                state: Mutex::new(RetryState::new()),
            }),
        }
    }

    /// Validate a raw configuration and create an engine from it.
    ///
    /// Fails closed: on an invalid configuration no engine exists.
    pub fn from_raw(raw: RawRetryConfig, sink: S) -> Result<Self, ConfigurationError> {
        #[cfg(feature = "tracing")]
        let name = raw.name.clone();

        let result = RetryConfig::try_from(raw);

        #[cfg(feature = "tracing")]
        if let Err(e) = &result {
            error!(
                engine = name.as_deref().unwrap_or("retry"),
                error = %e,
                "Incorrect or inconsistent retry configuration, skipping further processing"
            );
        }

        Ok(Self::new(result?, sink))
    }

    /// Configuration this engine runs with.
    pub fn config(&self) -> &RetryConfig {
        &self.inner.config
    }

    /// Sink receiving this engine's output.
    pub fn sink(&self) -> &S {
        &self.inner.sink
    }

    /// Retries made since the last success.
    pub fn attempt_count(&self) -> u32 {
        self.inner.lock().attempt_count
    }

    /// Whether a delayed retry is currently scheduled.
    pub fn has_pending_retry(&self) -> bool {
        self.inner.lock().pending.is_some()
    }

    /// The last known good message, if any.
    pub fn last_success(&self) -> Option<M> {
        self.inner.lock().last_success.clone()
    }

    /// Process one incoming message.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "retry_engine.handle",
            skip_all,
            fields(engine = %self.inner.config.display_name(), failure = msg.is_failure())
        )
    )]
    pub fn handle(&self, msg: M) {
        let mut state = self.inner.lock();
        if msg.is_failure() {
            self.handle_failure(&mut state, msg);
        } else {
            self.handle_success(&mut state, msg);
        }
    }

    fn handle_success(&self, state: &mut RetryState<M>, msg: M) {
        let _superseded = state.cancel_pending();

        #[cfg(feature = "tracing")]
        info!(
            engine = %self.inner.config.display_name(),
            superseded_retry = _superseded,
            previous_attempts = state.attempt_count,
            "Stored valid message"
        );

        state.last_success = Some(msg.clone());
        state.attempt_count = 0;

        self.inner.sink.report_status(&RetryStatus::StoredValid);
        self.inner.sink.forward(msg);
    }

    fn handle_failure(&self, state: &mut RetryState<M>, msg: M) {
        if state.last_success.is_none() {
            #[cfg(feature = "tracing")]
            warn!(
                engine = %self.inner.config.display_name(),
                description = msg.failure_description().unwrap_or_default(),
                "{ORPHAN_FAILURE_WARNING}"
            );
            self.inner.sink.report_warning(ORPHAN_FAILURE_WARNING, &msg);
            return;
        }

        let _superseded = state.cancel_pending();
        #[cfg(feature = "tracing")]
        if _superseded {
            debug!(
                engine = %self.inner.config.display_name(),
                "Cancelled pending retry superseded by a new failure"
            );
        }

        let max_attempts = self.inner.config.max_attempts();
        if state.attempt_count < max_attempts {
            state.attempt_count += 1;
            let delay = self.inner.policy.compute_delay();

            #[cfg(feature = "tracing")]
            debug!(
                engine = %self.inner.config.display_name(),
                attempt = state.attempt_count,
                max_attempts,
                delay_ms = delay.millis,
                "Scheduling retry"
            );

            self.inner.sink.report_status(&RetryStatus::Retrying {
                attempt: state.attempt_count,
                max_attempts,
                delay,
            });

            if delay.is_immediate() {
                if let Some(last) = state.last_success.clone() {
                    self.inner.sink.forward(last);
                }
            } else {
                self.schedule(state, delay);
            }
        } else {
            let attempts = state.attempt_count;

            #[cfg(feature = "tracing")]
            warn!(
                engine = %self.inner.config.display_name(),
                attempts,
                "Retry budget exhausted"
            );

            self.inner
                .sink
                .report_status(&RetryStatus::Exhausted { attempts });

            if self.inner.config.raise_error_on_exhaustion() {
                let exhausted = RetryExhausted::new(attempts, msg.failure_description());

                #[cfg(feature = "tracing")]
                error!(
                    engine = %self.inner.config.display_name(),
                    error = %exhausted,
                    "Raising terminal failure"
                );

                self.inner.sink.report_terminal_failure(&exhausted, &msg);
            }
        }
    }

    /// Arm the single retry timer. The caller has already cancelled any
    /// previous one.
    fn schedule(&self, state: &mut RetryState<M>, delay: ComputedDelay) {
        let id = state.next_timer_id;
        state.next_timer_id = state.next_timer_id.wrapping_add(1);

        let token = CancellationToken::new();
        state.pending = Some(PendingRetry {
            id,
            token: token.clone(),
        });

        let engine: Weak<Inner<M, S>> = Arc::downgrade(&self.inner);
        let duration = delay.as_duration();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(duration) => {
                    if let Some(inner) = engine.upgrade() {
                        inner.fire(id);
                    }
                }
            }
        });
    }

    /// Cancel any scheduled retry. The engine stays usable.
    pub fn close(&self) {
        let _cancelled = self.inner.lock().cancel_pending();

        #[cfg(feature = "tracing")]
        debug!(
            engine = %self.inner.config.display_name(),
            cancelled_retry = _cancelled,
            "Retry engine closed"
        );
    }

    /// Drive the engine from a channel until it closes or `shutdown` fires,
    /// then [`close`](RetryEngine::close) it.
    pub async fn run(&self, mut messages: mpsc::Receiver<M>, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                received = messages.recv() => match received {
                    Some(msg) => self.handle(msg),
                    None => break,
                },
            }
        }
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::sink::{ChannelSink, RetryEvent};
    use crate::message::{Failure, Message};
    use crate::types::{DurationUnit, RetryStrategy};
    use std::time::Duration;

    type TestEngine = RetryEngine<Message, ChannelSink<Message>>;
    type Events = mpsc::UnboundedReceiver<RetryEvent<Message>>;

    fn fixed_engine(millis: f64) -> (TestEngine, Events) {
        let config = RetryConfig::builder()
            .strategy(RetryStrategy::FixedDelay)
            .fixed_delay(millis, DurationUnit::Milliseconds)
            .build()
            .unwrap();
        let (sink, events) = ChannelSink::new();
        (RetryEngine::new(config, sink), events)
    }

    fn forwarded(events: &mut Events) -> Vec<Message> {
        std::iter::from_fn(|| events.try_recv().ok())
            .filter_map(RetryEvent::into_forwarded)
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_timer_fire_is_ignored() {
        let (engine, mut events) = fixed_engine(500.0);
        engine.handle(Message::new("a"));
        engine.handle(Message::failed("a", Failure::new()));
        assert!(engine.has_pending_retry());

        engine.handle(Message::new("b"));
        assert!(!engine.has_pending_retry());

        // A fire that raced the cancellation must not forward anything
        engine.inner.fire(0);
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(
            forwarded(&mut events),
            vec![Message::new("a"), Message::new("b")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_failure_replaces_pending_timer() {
        let (engine, mut events) = fixed_engine(500.0);
        engine.handle(Message::new("a"));
        engine.handle(Message::failed("a", Failure::new()));
        engine.handle(Message::failed("a", Failure::new()));
        assert_eq!(engine.attempt_count(), 2);

        engine.inner.fire(0);
        assert!(engine.has_pending_retry());

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(!engine.has_pending_retry());
        assert_eq!(
            forwarded(&mut events),
            vec![Message::new("a"), Message::new("a")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_engine_cancels_pending_retry() {
        let (engine, mut events) = fixed_engine(500.0);
        engine.handle(Message::new("a"));
        engine.handle(Message::failed("a", Failure::new()));
        drop(engine);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(forwarded(&mut events), vec![Message::new("a")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_cancels_but_keeps_state() {
        let (engine, mut events) = fixed_engine(500.0);
        engine.handle(Message::new("a"));
        engine.handle(Message::failed("a", Failure::new()));
        engine.close();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!engine.has_pending_retry());
        assert_eq!(engine.attempt_count(), 1);
        assert_eq!(engine.last_success(), Some(Message::new("a")));
        assert_eq!(forwarded(&mut events), vec![Message::new("a")]);
    }

    #[test]
    fn test_debug_does_not_expose_messages() {
        let (sink, _events) = ChannelSink::<Message>::new();
        let engine = RetryEngine::new(RetryConfig::default(), sink);
        engine.handle(Message::new("secret"));
        let debug = format!("{engine:?}");
        assert!(debug.contains("has_last_success: true"));
        assert!(!debug.contains("secret"));
    }
}

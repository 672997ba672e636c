//! Basic usage example for Retry Relay.
//!
//! A custom sink prints everything the engine emits while a simulated
//! stage fails twice and then recovers.
//!
//! # Running
//!
//! ```bash
//! RUST_LOG=retry_relay=debug cargo run --example basic_usage
//! ```

use retry_relay::{
    DurationUnit, Failure, Message, RetryConfig, RetryEngine, RetryExhausted, RetrySink,
    RetryStatus, RetryStrategy,
};
use std::time::Duration;

/// Sink that prints to stdout.
struct ConsoleSink;

impl RetrySink<Message> for ConsoleSink {
    fn forward(&self, msg: Message) {
        println!("  -> forwarded {}", msg.payload);
    }

    fn report_terminal_failure(&self, error: &RetryExhausted, _original: &Message) {
        println!("  !! terminal failure: {error}");
    }

    fn report_status(&self, status: &RetryStatus) {
        println!("  [status] {status}");
    }

    fn report_warning(&self, text: &str, _msg: &Message) {
        println!("  [warning] {text}");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Re-send after 300 ms, at most twice per failure streak
    let config = RetryConfig::builder()
        .name("basic")
        .strategy(RetryStrategy::FixedDelay)
        .fixed_delay(300.0, DurationUnit::Milliseconds)
        .max_attempts(2)
        .build()?;
    let engine = RetryEngine::new(config, ConsoleSink);

    println!("Failure before any success:");
    engine.handle(Message::failed("nothing yet", Failure::new()));

    println!("First success:");
    engine.handle(Message::new("order #1"));

    println!("Stage fails twice, retries are scheduled:");
    for _ in 0..2 {
        engine.handle(Message::failed(
            "order #1",
            Failure::with_description("gateway timeout"),
        ));
        tokio::time::sleep(Duration::from_millis(400)).await;
    }

    println!("Third failure exhausts the budget:");
    engine.handle(Message::failed(
        "order #1",
        Failure::with_description("gateway timeout"),
    ));

    println!("Recovery resets the counter:");
    engine.handle(Message::new("order #2"));
    println!("  attempts since last success: {}", engine.attempt_count());

    Ok(())
}

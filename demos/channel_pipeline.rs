//! Channel pipeline example for Retry Relay.
//!
//! The engine runs as its own task between an input channel and a
//! [`ChannelSink`]. A consumer task reads the events and a Ctrl+C (or the
//! end of input) shuts the pipeline down.
//!
//! # Running
//!
//! ```bash
//! RUST_LOG=retry_relay=info cargo run --example channel_pipeline
//! ```

use retry_relay::{
    CancellationToken, ChannelSink, DurationUnit, Failure, Message, RetryConfig, RetryEngine,
    RetryEvent, RetryMessage, RetryStrategy,
};
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = RetryConfig::builder()
        .name("pipeline")
        .strategy(RetryStrategy::RandomDelay)
        .random_delay(100.0, 400.0, DurationUnit::Milliseconds)
        .max_attempts(3)
        .build()?;

    let (sink, mut events) = ChannelSink::<Message>::new();
    let engine = RetryEngine::new(config, sink);
    let (input, messages) = mpsc::channel(16);
    let shutdown = CancellationToken::new();

    let runner = {
        let engine = engine.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { engine.run(messages, shutdown).await })
    };

    let consumer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                RetryEvent::Forward(msg) => println!("forward   {}", msg.payload),
                RetryEvent::Status(status) => println!("status    {status}"),
                RetryEvent::Warning { text, .. } => println!("warning   {text}"),
                RetryEvent::TerminalFailure { message, .. } => println!(
                    "terminal  {}",
                    message.failure_description().unwrap_or_default()
                ),
            }
        }
    });

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                shutdown.cancel();
            }
        });
    }

    let script = [
        Message::new("reading 1").with_attribute("sensor", "t-01"),
        Message::failed("reading 1", Failure::with_description("checksum mismatch")),
        Message::failed("reading 1", Failure::with_description("checksum mismatch")),
        Message::new("reading 2").with_attribute("sensor", "t-01"),
        Message::failed("reading 2", Failure::with_description("sensor offline")),
        Message::failed("reading 2", Failure::with_description("sensor offline")),
        Message::failed("reading 2", Failure::with_description("sensor offline")),
        Message::failed("reading 2", Failure::with_description("sensor offline")),
    ];

    for msg in script {
        if shutdown.is_cancelled() {
            break;
        }
        input.send(msg).await?;
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    // Closing the input ends the run loop
    drop(input);
    runner.await?;

    // The last engine handle owns the sink; dropping it ends the consumer
    drop(engine);
    consumer.await?;

    Ok(())
}

//! Configuration loading example for Retry Relay.
//!
//! Shows how host-supplied JSON, including legacy key names, becomes a
//! validated configuration and how invalid input is reported.
//!
//! # Running
//!
//! ```bash
//! cargo run --example config_from_json
//! ```

use retry_relay::{ChannelSink, Message, RawRetryConfig, RetryConfig, RetryEngine};

const CONFIGS: &[(&str, &str)] = &[
    ("defaults", "{}"),
    (
        "current keys",
        r#"{ "strategy": "random_delay", "randomDelayMin": 1, "randomDelayMax": 2, "randomDelayUnit": "min" }"#,
    ),
    (
        "legacy keys",
        r#"{ "retryStrategy": "fixed_delay", "retryStrategyFixedDelay": "250",
             "retryStrategyFixedDelayUnit": "ms", "retryAttempts": "5",
             "throwAsErrorOnLimitExceeded": "false" }"#,
    ),
    ("unknown strategy", r#"{ "strategy": "exponential" }"#),
    ("unknown unit", r#"{ "fixedDelayUnit": "days" }"#),
    ("inverted range", r#"{ "randomDelayMin": 10, "randomDelayMax": 1 }"#),
    ("zero attempts", r#"{ "maxAttempts": 0 }"#),
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    for (label, json) in CONFIGS {
        match RetryConfig::from_json(json) {
            Ok(config) => println!(
                "{label:<18} ok: strategy={} fixed={} random={}..{} {} attempts={} raise={}",
                config.strategy(),
                config.fixed_delay(),
                config.random_delay().min,
                config.random_delay().max,
                config.random_delay().unit,
                config.max_attempts(),
                config.raise_error_on_exhaustion(),
            ),
            Err(err) => println!("{label:<18} rejected: {err}"),
        }
    }

    // An engine built from a raw bag fails closed
    let raw: RawRetryConfig = serde_json::from_str(r#"{ "retryAttempts": "-3" }"#)?;
    let (sink, _events) = ChannelSink::<Message>::new();
    match RetryEngine::from_raw(raw, sink) {
        Ok(_) => println!("engine created"),
        Err(err) => println!("no engine: {err}"),
    }

    Ok(())
}

//! Messages flowing through a retry engine.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Trait for messages that can be classified as success or failure.
///
/// The engine only needs to know whether a message marks a failure and,
/// if so, which description to put in front of the exhaustion error.
/// Everything else about the message is opaque and travels untouched.
///
/// # Examples
///
/// ```rust
/// use retry_relay::RetryMessage;
///
/// #[derive(Clone)]
/// enum Outcome {
///     Ok(Vec<u8>),
///     Err(String),
/// }
///
/// impl RetryMessage for Outcome {
///     fn is_failure(&self) -> bool {
///         matches!(self, Outcome::Err(_))
///     }
///
///     fn failure_description(&self) -> Option<&str> {
///         match self {
///             Outcome::Err(reason) => Some(reason.as_str()),
///             Outcome::Ok(_) => None,
///         }
///     }
/// }
/// ```
pub trait RetryMessage: Clone + Send + 'static {
    /// Returns true if this message carries a failure marker.
    ///
    /// Presence of the marker is what counts, not its content.
    fn is_failure(&self) -> bool;

    /// Human-readable description of the failure, if any.
    ///
    /// Default implementation returns `None`.
    fn failure_description(&self) -> Option<&str> {
        None
    }

    /// Replace the failure description, marking the message as failed.
    ///
    /// Used to hand the composed exhaustion error to downstream error
    /// handlers. Default implementation leaves the message unchanged.
    fn set_failure_description(&mut self, description: String) {
        let _ = description;
    }
}

/// Failure marker attached to a [`Message`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    /// Optional description of what went wrong.
    #[serde(rename = "message", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Failure {
    /// A failure marker without a description.
    pub fn new() -> Self {
        Self::default()
    }

    /// A failure marker with a description.
    pub fn with_description(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
        }
    }
}

/// Standard pipeline message: an opaque JSON payload, an optional failure
/// marker and any number of extra attributes.
///
/// The serialized form keeps the failure marker under `error` with its
/// description under `error.message`; extra attributes are flattened next
/// to `payload`. Any `error` key marks a failure, whatever its value,
/// including `null`.
///
/// ```rust
/// use retry_relay::{Message, RetryMessage};
/// use serde_json::json;
///
/// let msg: Message = serde_json::from_value(json!({
///     "payload": "data",
///     "topic": "sensors",
///     "error": { "message": "timeout" }
/// }))
/// .unwrap();
///
/// assert!(msg.is_failure());
/// assert_eq!(msg.failure_description(), Some("timeout"));
/// assert_eq!(msg.attribute("topic"), Some(&json!("sensors")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Opaque payload.
    #[serde(default)]
    pub payload: Value,
    /// Failure marker; `Some` means this is a failure message.
    #[serde(
        rename = "error",
        default,
        deserialize_with = "deserialize_failure",
        skip_serializing_if = "Option::is_none"
    )]
    pub failure: Option<Failure>,
    /// Additional attributes carried along unchanged.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Message {
    /// Create a success message with the given payload.
    pub fn new(payload: impl Into<Value>) -> Self {
        Self {
            payload: payload.into(),
            failure: None,
            attributes: Map::new(),
        }
    }

    /// Create a failure message with the given payload and failure marker.
    pub fn failed(payload: impl Into<Value>, failure: Failure) -> Self {
        Self {
            payload: payload.into(),
            failure: Some(failure),
            attributes: Map::new(),
        }
    }

    /// Attach an extra attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Look up an extra attribute.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

/// Any present `error` value is a failure marker. Only a `message` member
/// of an object becomes the description; non-string messages are rendered
/// as JSON.
fn deserialize_failure<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Failure>, D::Error> {
    let description = match Value::deserialize(d)? {
        Value::Object(mut fields) => match fields.remove("message") {
            Some(Value::String(text)) => Some(text),
            Some(other) => Some(other.to_string()),
            None => None,
        },
        _ => None,
    };
    Ok(Some(Failure { description }))
}

impl RetryMessage for Message {
    fn is_failure(&self) -> bool {
        self.failure.is_some()
    }

    fn failure_description(&self) -> Option<&str> {
        self.failure.as_ref()?.description.as_deref()
    }

    fn set_failure_description(&mut self, description: String) {
        self.failure.get_or_insert_with(Failure::new).description = Some(description);
    }
}

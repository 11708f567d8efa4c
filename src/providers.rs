use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::conversation::Role;

// -- Outbound request -------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
}

/// Body of the chat POST: `{ "messages": [{ "role", "content" }, ...] }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<WireMessage>,
}

// -- Inbound error body -----------------------------------------------------

/// Error body returned with non-2xx statuses. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<Value>,
}

impl ErrorBody {
    /// Parse the `error` field of a response body. Accepts both
    /// `{"error":"text"}` and `{"error":{"message":"text"}}`.
    pub fn message_from(body: &str) -> Option<String> {
        let parsed: ErrorBody = serde_json::from_str(body).ok()?;
        let text = match parsed.error? {
            Value::String(s) => s,
            Value::Object(map) => map.get("message")?.as_str()?.to_string(),
            _ => return None,
        };
        let text = text.trim();
        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }
}

// -- Inbound stream payload -------------------------------------------------

/// Locate the text delta of one streamed payload at `choices[0].delta.content`.
///
/// Payloads without the field, with a non-string value or with an empty
/// string carry no delta.
pub fn extract_delta(payload: &Value) -> Option<&str> {
    payload
        .pointer("/choices/0/delta/content")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

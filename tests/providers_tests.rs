//! External tests for the providers module: request serialization, error
//! bodies and delta extraction.

use dsa_assistant::conversation::{ChatMessage, Conversation, Role};
use dsa_assistant::providers::*;
use dsa_assistant::FailureReason;
use rstest::rstest;
use serde_json::Value;

// -- Request body ---------------------------------------------------------

#[test]
fn test_request_from_conversation_history() {
    let mut c = Conversation::new();
    c.push(ChatMessage::user("Explain BST insertion"));
    c.push(ChatMessage::assistant("Compare with the root, then recurse."));
    let req = ChatRequest { messages: c.history() };
    let parsed: Value = serde_json::to_value(&req).expect("serialize");
    let msgs = parsed["messages"].as_array().expect("array");
    assert_eq!(msgs.len(), 2);
    assert_eq!(msgs[0]["role"], "user");
    assert_eq!(msgs[1]["role"], "assistant");
    assert_eq!(msgs[1]["content"], "Compare with the root, then recurse.");
}

#[test]
fn test_request_only_has_messages_key() {
    let req = ChatRequest { messages: vec![WireMessage { role: Role::User, content: "x".into() }] };
    let parsed: Value = serde_json::to_value(&req).expect("serialize");
    let obj = parsed.as_object().expect("object");
    assert_eq!(obj.len(), 1);
    assert!(obj.contains_key("messages"));
}

#[test]
fn test_wire_message_has_no_timestamp() {
    let json = serde_json::to_string(&WireMessage { role: Role::Assistant, content: "y".into() }).expect("ser");
    assert_eq!(json, r#"{"role":"assistant","content":"y"}"#);
}

// -- Delta extraction -----------------------------------------------------

#[rstest]
#[case(r#"{"choices":[{"delta":{"content":"Hi"}}]}"#, Some("Hi"))]
#[case(r#"{"choices":[{"index":0,"delta":{"content":" there"},"finish_reason":null}]}"#, Some(" there"))]
#[case(r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#, None)]
#[case(r#"{"choices":[{"delta":{"content":null}}]}"#, None)]
#[case(r#"{"choices":[{"delta":{"content":42}}]}"#, None)]
#[case(r#"{"choices":[]}"#, None)]
#[case(r#"{"usage":{"total_tokens":12}}"#, None)]
#[case(r#"[]"#, None)]
fn test_extract_delta_table(#[case] json: &str, #[case] expected: Option<&str>) {
    let v: Value = serde_json::from_str(json).expect("valid json");
    assert_eq!(extract_delta(&v), expected);
}

#[test]
fn test_extract_delta_unicode() {
    let v: Value = serde_json::from_str(r#"{"choices":[{"delta":{"content":"木構造 🌳"}}]}"#).expect("json");
    assert_eq!(extract_delta(&v), Some("木構造 🌳"));
}

// -- Error bodies and status mapping --------------------------------------

#[rstest]
#[case(429, "", "⚠️ Rate limit exceeded. Please wait a moment and try again.")]
#[case(402, "", "⚠️ AI credits exhausted. Please add credits to continue.")]
#[case(500, r#"{"error":"AI gateway error"}"#, "⚠️ AI gateway error")]
#[case(400, r#"{"error":{"message":"messages is required"}}"#, "⚠️ messages is required")]
#[case(502, "Bad Gateway", "⚠️ Failed to get a response from the assistant.")]
#[case(401, r#"{"error":""}"#, "⚠️ Failed to get a response from the assistant.")]
fn test_status_notice(#[case] status: u16, #[case] body: &str, #[case] expected: &str) {
    assert_eq!(FailureReason::from_status(status, body).notice(), expected);
}

#[test]
fn test_error_body_ignores_non_text_error() {
    assert!(ErrorBody::message_from(r#"{"error":true}"#).is_none());
}

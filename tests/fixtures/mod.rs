//! Builders for response-document lines.

#![allow(dead_code)]

use base64::Engine;
use serde_json::{json, Value};

/// PNG signature plus a few bytes; enough to tell outputs apart.
pub const IMAGE_A: &[u8] = b"\x89PNG\r\n\x1a\nimage-a";
pub const IMAGE_C1: &[u8] = b"\x89PNG\r\n\x1a\nimage-c1";
pub const IMAGE_C2: &[u8] = b"\x89PNG\r\n\x1a\nimage-c2";

pub fn encode(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn image_candidate(bytes: &[u8]) -> Value {
    json!({
        "content": {"parts": [{"inline_data": {"mime_type": "image/png", "data": encode(bytes)}}]},
        "finish_reason": "STOP"
    })
}

/// A record with one image candidate per entry of `images`.
pub fn image_line(key: &str, images: &[&[u8]]) -> String {
    let candidates: Vec<Value> = images.iter().map(|b| image_candidate(b)).collect();
    json!({"custom_id": key, "response": {"candidates": candidates}}).to_string()
}

/// Same as [`image_line`] with the camelCase spelling some responses use.
pub fn camel_case_image_line(key: &str, image: &[u8]) -> String {
    json!({
        "custom_id": key,
        "response": {"candidates": [{
            "content": {"parts": [{"inlineData": {"mimeType": "image/png", "data": encode(image)}}]},
            "finishReason": 1
        }]}
    })
    .to_string()
}

pub fn error_line(key: &str, code: i64, message: &str) -> String {
    json!({"custom_id": key, "error": {"code": code, "message": message}}).to_string()
}

/// A record whose only candidate was stopped by the safety filter.
pub fn blocked_line(key: &str) -> String {
    json!({
        "custom_id": key,
        "response": {"candidates": [{
            "content": {"parts": []},
            "finish_reason": "SAFETY",
            "safety_ratings": [{"category": "HARM_CATEGORY_DANGEROUS_CONTENT", "probability": "HIGH", "blocked": true}]
        }]}
    })
    .to_string()
}

/// A record whose candidate answered with text instead of an image.
pub fn text_only_line(key: &str) -> String {
    json!({
        "custom_id": key,
        "response": {"candidates": [{"content": {"parts": [{"text": "I cannot edit this image."}]}}]}
    })
    .to_string()
}

/// A record whose only candidate carries an inline part with no bytes.
pub fn empty_payload_line(key: &str) -> String {
    json!({
        "custom_id": key,
        "response": {"candidates": [{"content": {"parts": [{"inline_data": {"data": ""}}]}}]}
    })
    .to_string()
}

/// Two candidates: the first returns `image`, the second only text.
pub fn image_then_text_line(key: &str, image: &[u8]) -> String {
    json!({
        "custom_id": key,
        "response": {"candidates": [
            image_candidate(image),
            {"content": {"parts": [{"text": "Here is another take."}]}, "finish_reason": "STOP"}
        ]}
    })
    .to_string()
}

pub fn document(lines: &[String]) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

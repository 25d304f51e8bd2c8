//! Response bodies of the compose-file API.

use serde::Deserialize;

/// Body of a successful `describe` call.
#[derive(Debug, Clone, Deserialize)]
pub struct DescribeResponse {
    /// The stored compose file.
    pub compose_file: StoredComposeFile,
}

/// A compose file as stored by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredComposeFile {
    /// Base64-encoded manifest content.
    pub content: String,
}

/// Extracts human-readable messages from an error response body.
///
/// The service reports `{"errors": {"field": ["message", ...]}}`. Bodies
/// that do not follow this shape are returned as a single raw message.
#[must_use]
pub fn error_messages(body: &str) -> Vec<String> {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let mut messages = Vec::new();

    if let Some(errors) = parsed.as_ref().and_then(|v| v.get("errors")) {
        collect_messages(errors, &mut messages);
    }
    if messages.is_empty() {
        let raw = body.trim();
        if !raw.is_empty() {
            messages.push(raw.to_owned());
        }
    }
    messages
}

fn collect_messages(value: &serde_json::Value, out: &mut Vec<String>) {
    match value {
        serde_json::Value::String(s) => out.push(s.clone()),
        serde_json::Value::Array(items) => items.iter().for_each(|v| collect_messages(v, out)),
        serde_json::Value::Object(fields) => fields.values().for_each(|v| collect_messages(v, out)),
        serde_json::Value::Null => {}
        other => out.push(other.to_string()),
    }
}

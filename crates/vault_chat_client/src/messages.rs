//! HTTP payloads exchanged with the vault organizer API. Client ↔ server JSON,
//! plus the event records decoded from the `/chat/stream` body.

use serde::{Deserialize, Serialize};

/// SSE event name carrying one JSON-encoded text fragment.
pub const TOKEN_EVENT: &str = "token";

/// SSE event name carrying the conversation id; always the last event.
pub const DONE_EVENT: &str = "done";

/// Client → server: chat message (both `/chat/` and `/chat/stream`).
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<&'a str>,
}

impl<'a> ChatRequest<'a> {
    pub fn new(message: &'a str, thread_id: Option<&'a str>) -> Self {
        Self { message, thread_id }
    }
}

/// Server → client: non-streaming chat answer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub thread_id: String,
}

/// Server → client: `/health` body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

/// Server → client: `/dashboard/summary` body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DashboardSummary {
    pub vault: VaultInfo,
    pub stats: VaultStats,
    pub recent_notes: Vec<RecentNote>,
    pub top_hubs: Vec<HubNote>,
    /// Unix timestamp (seconds, fractional).
    pub generated_at: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VaultInfo {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VaultStats {
    pub total_notes: u64,
    pub orphaned_notes: u64,
    pub broken_links: u64,
    pub untagged_notes: u64,
    pub recent_notes: u64,
}

/// A note modified within the last week.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecentNote {
    pub name: String,
    pub path: String,
    pub modified_at: f64,
}

/// A note ranked by backlink count.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HubNote {
    pub note: String,
    pub backlinks: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OrphanedNotes {
    pub orphaned_notes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UntaggedNotes {
    pub untagged_notes: Vec<String>,
}

/// One `event:`/`data:` pair read off the stream. `event_type` is empty when
/// the `data:` line had no preceding `event:` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub event_type: String,
    pub data: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_omits_missing_thread_id() {
        let json = serde_json::to_value(ChatRequest::new("hi", None)).unwrap();
        assert_eq!(json, serde_json::json!({ "message": "hi" }));
    }

    #[test]
    fn chat_request_carries_thread_id() {
        let json = serde_json::to_value(ChatRequest::new("hi", Some("t-1"))).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "message": "hi", "thread_id": "t-1" })
        );
    }

    #[test]
    fn chat_response_parses() {
        let resp: ChatResponse =
            serde_json::from_str(r#"{"response":"Hi there!","thread_id":"abc"}"#).unwrap();
        assert_eq!(resp.response, "Hi there!");
        assert_eq!(resp.thread_id, "abc");
    }
}

//! Wire payloads for the Ultron chat service.
//!
//! Timestamps stay as strings on the wire: the service emits naive ISO
//! datetimes and these values are display-only on our side.

use serde::{Deserialize, Serialize};

/// One conversation as returned by `/chats/{category}` and `/recent-chats`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatSummary {
    pub id: String,
    pub chat_name: String,
    pub created_at: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub last_message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatListResponse {
    pub chats: Vec<ChatSummary>,
}

/// A stored message as returned by `/chats/{id}/messages`.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendMessage {
    pub id: String,
    #[serde(default)]
    pub chat_id: Option<String>,
    pub content: String,
    pub role: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateChatRequest {
    pub slug: String,
    pub chat_name: String,
}

#[derive(Debug, Deserialize)]
pub struct NewChatResponse {
    pub id: String,
    pub chat_name: String,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct RenameChatRequest {
    pub new_title: String,
}

#[derive(Debug, Serialize)]
pub struct PostMessageRequest {
    pub sender: String,
    pub text: String,
}

/// Server confirmation for a posted message; carries the durable id that
/// replaces our tentative one.
#[derive(Debug, Clone, Deserialize)]
pub struct PostedMessage {
    pub id: String,
    #[serde(default)]
    pub chat_id: Option<String>,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// One prior turn sent with a streaming request.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HistoryTurn {
    pub role: String,
    pub content: String,
}

/// Body for the `/chat/{model}/stream` endpoints. The response is a
/// chunked `text/plain` body, not SSE.
#[derive(Debug, Serialize)]
pub struct StreamChatRequest {
    pub category: String,
    pub message: String,
    pub chat_id: Option<String>,
    pub history: Vec<HistoryTurn>,
    pub filenames: Vec<String>,
}

pub mod client;

pub use client::UltronClient;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_list_parses_with_and_without_last_message() {
        let body = r#"{"chats":[
            {"id":"c1","chat_name":"Chat Aug 27","created_at":"2026-08-27T10:00:00"},
            {"id":"c2","chat_name":"Code help","created_at":"2026-08-26T09:00:00",
             "category":"Code","last_message":"thanks!"}
        ]}"#;
        let parsed: ChatListResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.chats.len(), 2);
        assert!(parsed.chats[0].last_message.is_none());
        assert_eq!(parsed.chats[1].last_message.as_deref(), Some("thanks!"));
    }

    #[test]
    fn backend_message_tolerates_missing_chat_id() {
        let body = r#"{"id":"m1","content":"hi","role":"user","created_at":null}"#;
        let parsed: BackendMessage = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.role, "user");
        assert!(parsed.chat_id.is_none());
    }

    #[test]
    fn stream_request_serializes_backend_field_names() {
        let request = StreamChatRequest {
            category: "code".to_string(),
            message: "hello".to_string(),
            chat_id: Some("c1".to_string()),
            history: vec![HistoryTurn {
                role: "user".to_string(),
                content: "earlier".to_string(),
            }],
            filenames: Vec::new(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["chat_id"], "c1");
        assert_eq!(value["history"][0]["role"], "user");
        assert!(value["filenames"].as_array().unwrap().is_empty());
    }
}

//! Conversation state document
//!
//! Per-chat transient state for the multi-step host flows, persisted
//! separately from the registry so it can be reset independently and
//! survive process restarts. Keys are stringified chat ids; each entry
//! carries the state tag, the state's own payload shape, and optionally
//! the id of the wizard message being edited in place.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The persisted chat-id → session mapping.
pub type Sessions = BTreeMap<String, ChatSession>;

/// Where a chat currently is in a multi-step flow.
///
/// Idle chats have no entry at all. Each state owns its payload: the data
/// carried forward is exactly what later steps need, nothing more.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "data")]
#[serde(rename_all_fields = "camelCase")]
pub enum ChatState {
    /// Guided add flow: waiting for the user to type a host name.
    #[serde(rename = "WAITING_HOST_NAME")]
    AwaitingHostName,

    /// Guided add flow: name accepted, waiting for the address.
    #[serde(rename = "WAITING_HOST_ADDRESS")]
    AwaitingHostAddress { host_name: String },

    /// One-shot add staged, waiting for the Yes/No confirmation button.
    #[serde(rename = "WAITING_HOST_CONFIRMATION")]
    AwaitingConfirmation {
        host_name: String,
        host_address: String,
    },

    /// Removal staged, waiting for the Yes/No confirmation button.
    #[serde(rename = "WAITING_HOST_REMOVE")]
    AwaitingRemoval { host_name: String },
}

/// One chat's persisted session entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    #[serde(flatten)]
    pub state: ChatState,

    /// Message currently being edited in place for this flow, if any.
    #[serde(
        rename = "messageId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub message_id: Option<i64>,
}

impl ChatSession {
    /// Session entry with no tracked message yet.
    pub fn new(state: ChatState) -> Self {
        Self {
            state,
            message_id: None,
        }
    }
}

/// Document key for a chat id.
pub fn chat_key(chat_id: i64) -> String {
    chat_id.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_layout() {
        let mut sessions = Sessions::new();
        sessions.insert(
            chat_key(77),
            ChatSession {
                state: ChatState::AwaitingConfirmation {
                    host_name: "My-Host".to_string(),
                    host_address: "1.2.3.4".to_string(),
                },
                message_id: Some(9),
            },
        );

        let json = serde_json::to_string(&sessions).unwrap();
        assert!(json.contains("\"77\""));
        assert!(json.contains("\"state\":\"WAITING_HOST_CONFIRMATION\""));
        assert!(json.contains("\"hostName\":\"My-Host\""));
        assert!(json.contains("\"hostAddress\":\"1.2.3.4\""));
        assert!(json.contains("\"messageId\":9"));

        let back: Sessions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sessions);
    }

    #[test]
    fn test_unit_state_round_trip() {
        let session = ChatSession::new(ChatState::AwaitingHostName);
        let json = serde_json::to_string(&session).unwrap();
        assert!(json.contains("WAITING_HOST_NAME"));
        assert!(!json.contains("messageId"));

        let back: ChatSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back.state, ChatState::AwaitingHostName);
        assert_eq!(back.message_id, None);
    }

    #[test]
    fn test_removal_round_trip() {
        let session = ChatSession::new(ChatState::AwaitingRemoval {
            host_name: "demo".to_string(),
        });
        let json = serde_json::to_string(&session).unwrap();
        assert!(json.contains("WAITING_HOST_REMOVE"));

        let back: ChatSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);
    }
}

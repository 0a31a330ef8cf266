//! Error types and handling
//!
//! This module provides the error type used throughout the growhost engine.
//! Expected failures (guard violations in the host flows) carry the exact
//! chat message shown to the user; transport failures are logged and
//! surfaced as a generic retry message.

use thiserror::Error;

/// Main engine error type
///
/// Expected variants map one-to-one onto the guard failures of the host
/// registry and conversation flows. The remaining variants wrap transport
/// failures (file system, serialization, Telegram API) that abort the
/// current event but never the process.
#[derive(Debug, Error)]
pub enum BotError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // User / command guard failures
    #[error("User has no platform username")]
    MissingUsername,

    #[error("Missing command arguments")]
    MalformedArgs,

    #[error("Invalid characters in host name: {0}")]
    InvalidHostName(String),

    #[error("Invalid characters in host address: {0}")]
    InvalidHostAddress(String),

    // Registry consistency failures
    #[error("Host already exists: {0}")]
    HostAlreadyExists(String),

    #[error("Host already on user list: {0}")]
    AlreadyOnUserList(String),

    #[error("Host not found: {0}")]
    HostNotFound(String),

    // Conversation state failures
    #[error("Stale conversation state for chat {0}")]
    StaleState(i64),

    // Transport errors
    #[error("Telegram API error: {0}")]
    Telegram(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BotError {
    /// The chat message shown to the user for this error.
    ///
    /// Every expected guard failure has a specific message; anything else
    /// collapses into the generic retry line.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MissingUsername => "Please set your username to use this bot.",
            Self::MalformedArgs => "Please enter the host name and address.",
            Self::InvalidHostName(_) => {
                "Host name can only contain alphanumeric characters and -."
            }
            Self::InvalidHostAddress(_) => {
                "Host address can only contain alphanumeric characters and dots."
            }
            Self::HostAlreadyExists(_) => "Host already exists.",
            Self::AlreadyOnUserList(_) => "You already have a host with the same name.",
            Self::HostNotFound(_) => "Host not found.",
            Self::StaleState(_)
            | Self::Config(_)
            | Self::Telegram(_)
            | Self::Http(_)
            | Self::Serde(_)
            | Self::Io(_) => "Something went wrong. Please try again.",
        }
    }

    /// Whether this error is an expected guard failure.
    ///
    /// Expected errors are answered in chat and not logged as failures;
    /// unexpected ones abandon the event and are logged.
    pub fn is_expected(&self) -> bool {
        !matches!(
            self,
            Self::Config(_) | Self::Telegram(_) | Self::Http(_) | Self::Serde(_) | Self::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_failures_have_specific_messages() {
        let err = BotError::HostAlreadyExists("demo".to_string());
        assert_eq!(err.user_message(), "Host already exists.");

        let err = BotError::InvalidHostName("my host".to_string());
        assert_eq!(
            err.user_message(),
            "Host name can only contain alphanumeric characters and -."
        );

        let err = BotError::AlreadyOnUserList("demo".to_string());
        assert_eq!(
            err.user_message(),
            "You already have a host with the same name."
        );
    }

    #[test]
    fn test_transport_errors_are_generic() {
        let err = BotError::Telegram("ok=false".to_string());
        assert_eq!(err.user_message(), "Something went wrong. Please try again.");
        assert!(!err.is_expected());
    }

    #[test]
    fn test_expected_classification() {
        assert!(BotError::MissingUsername.is_expected());
        assert!(BotError::HostNotFound("x".to_string()).is_expected());
        assert!(BotError::StaleState(7).is_expected());
        assert!(!BotError::Config("bad".to_string()).is_expected());
    }
}

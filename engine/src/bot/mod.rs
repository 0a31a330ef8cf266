//! Chat transport
//!
//! Delivers inbound Telegram events to the conversation controller and
//! renders its presentation requests back through the Bot API.

pub mod telegram;

pub use telegram::TelegramBot;

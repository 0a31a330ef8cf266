//! Telegram Bot Integration
//!
//! Provides a long-polling interface over the Telegram Bot API. Messages
//! and button events are normalized into [`Inbound`] events, dispatched to
//! the conversation controller, and the resulting render requests are
//! delivered as messages, photo captions, or in-place edits.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::conversation::render::{Keyboard, RenderTarget};
use crate::conversation::{Controller, Inbound, InboundKind, Reply};
use crate::errors::BotError;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Delay before retrying after a failed poll.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Inline keyboard button for Telegram
#[derive(Serialize)]
struct InlineKeyboardButton {
    text: String,
    callback_data: String,
}

/// Inline keyboard markup for Telegram
#[derive(Serialize)]
struct InlineKeyboardMarkup {
    inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

impl From<&Keyboard> for InlineKeyboardMarkup {
    fn from(keyboard: &Keyboard) -> Self {
        Self {
            inline_keyboard: keyboard
                .0
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|button| InlineKeyboardButton {
                            text: button.text.clone(),
                            callback_data: button.action.clone(),
                        })
                        .collect()
                })
                .collect(),
        }
    }
}

#[derive(Deserialize, Debug)]
struct Update {
    update_id: i64,
    message: Option<Message>,
    callback_query: Option<CallbackQuery>,
}

#[derive(Deserialize, Debug)]
struct Message {
    message_id: i64,
    chat: Chat,
    text: Option<String>,
    from: Option<User>,
}

#[derive(Deserialize, Debug)]
struct Chat {
    id: i64,
}

#[derive(Deserialize, Debug)]
struct User {
    id: i64,
    username: Option<String>,
}

#[derive(Deserialize, Debug)]
struct CallbackQuery {
    id: String,
    data: Option<String>,
    from: User,
    message: Option<Message>,
}

#[derive(Deserialize, Debug)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
}

/// Telegram transport over the conversation controller.
pub struct TelegramBot {
    token: String,
    api_base: String,
    client: Client,
    banner_url: Option<String>,
    poll_timeout: u64,
    controller: Arc<Controller>,
}

impl std::fmt::Debug for TelegramBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramBot")
            .field("api_base", &self.api_base)
            .field("poll_timeout", &self.poll_timeout)
            .field("banner_url", &self.banner_url)
            .finish()
    }
}

impl TelegramBot {
    pub fn new(token: String, controller: Arc<Controller>) -> Self {
        Self {
            token,
            api_base: DEFAULT_API_BASE.to_string(),
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            banner_url: None,
            poll_timeout: 30,
            controller,
        }
    }

    /// Send screens as a banner photo with caption instead of plain text.
    pub fn with_banner_url(mut self, banner_url: Option<String>) -> Self {
        self.banner_url = banner_url.filter(|url| !url.is_empty());
        self
    }

    /// Override the getUpdates long-poll timeout.
    pub fn with_poll_timeout(mut self, poll_timeout: u64) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    /// Point the client at a different API host. Used by tests.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Start the long-polling loop
    ///
    /// This will block the current task. Poll failures are logged and
    /// retried after a short delay; the loop never returns on its own.
    pub async fn start_polling(&self) -> Result<(), BotError> {
        info!("Starting Telegram bot long-polling loop...");
        let mut offset = 0;

        loop {
            match self.poll_once(offset).await {
                Ok(next_offset) => offset = next_offset,
                Err(e) => {
                    error!("Failed to fetch Telegram updates: {}", e);
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                }
            }
        }
    }

    /// Fetch and process one batch of updates. Returns the next offset.
    pub async fn poll_once(&self, offset: i64) -> Result<i64, BotError> {
        let mut next_offset = offset;

        for update in self.get_updates(offset).await? {
            next_offset = update.update_id + 1;
            self.handle_update(update).await;
        }

        Ok(next_offset)
    }

    async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, BotError> {
        let url = format!(
            "{}?offset={}&timeout={}",
            self.api_url("getUpdates"),
            offset,
            self.poll_timeout
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await?
            .json::<ApiResponse<Vec<Update>>>()
            .await?;

        if !response.ok {
            return Err(BotError::Telegram("getUpdates returned ok=false".into()));
        }

        Ok(response.result.unwrap_or_default())
    }

    async fn handle_update(&self, update: Update) {
        if let Some(msg) = update.message {
            self.handle_message(msg).await;
        } else if let Some(query) = update.callback_query {
            self.handle_callback(query).await;
        }
    }

    async fn handle_message(&self, msg: Message) {
        let text = match msg.text {
            Some(text) => text,
            None => return,
        };

        let (user_id, username) = match msg.from {
            Some(user) => (user.id, user.username),
            None => {
                warn!("Message with no user info - ignoring");
                return;
            }
        };

        info!(
            "[MSG] {} ({}): {}",
            username.as_deref().unwrap_or("-"),
            user_id,
            text
        );

        let kind = match parse_command(&text) {
            Some((name, args)) => InboundKind::Command { name, args },
            None => InboundKind::Text(text),
        };

        let reply = self
            .controller
            .handle(Inbound {
                chat_id: msg.chat.id,
                username,
                message_id: Some(msg.message_id),
                kind,
            })
            .await;

        self.deliver(reply, None).await;
    }

    async fn handle_callback(&self, query: CallbackQuery) {
        let data = query.data.unwrap_or_default();

        info!(
            "[BTN] {} ({}): {}",
            query.from.username.as_deref().unwrap_or("-"),
            query.from.id,
            data
        );

        let message = match query.message {
            Some(message) => message,
            None => {
                // Nothing to act on; just acknowledge the tap
                self.answer_callback_query(&query.id, None).await;
                return;
            }
        };

        let reply = self
            .controller
            .handle(Inbound {
                chat_id: message.chat.id,
                username: query.from.username,
                message_id: Some(message.message_id),
                kind: InboundKind::Button { data },
            })
            .await;

        self.deliver(reply, Some(&query.id)).await;
    }

    /// Deliver the controller's render requests, then acknowledge the
    /// button event when one triggered this reply.
    async fn deliver(&self, reply: Reply, callback_id: Option<&str>) {
        for request in &reply.renders {
            let result = match request.target {
                RenderTarget::NewMessage => {
                    match self
                        .send_screen(request.chat_id, &request.text, request.keyboard.as_ref())
                        .await
                    {
                        Ok(message_id) => {
                            if request.track_message {
                                self.controller
                                    .record_message_id(request.chat_id, message_id)
                                    .await;
                            }
                            Ok(())
                        }
                        Err(e) => Err(e),
                    }
                }
                RenderTarget::EditMessage(message_id) => {
                    self.edit_screen(
                        request.chat_id,
                        message_id,
                        &request.text,
                        request.keyboard.as_ref(),
                    )
                    .await
                }
            };

            if let Err(e) = result {
                error!("Failed to render to chat {}: {}", request.chat_id, e);
            }
        }

        if let Some(id) = callback_id {
            self.answer_callback_query(id, reply.toast.as_deref()).await;
        }
    }

    /// Send a new screen: banner photo with caption when configured,
    /// plain text otherwise. Returns the sent message's id.
    async fn send_screen(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<i64, BotError> {
        match &self.banner_url {
            Some(banner_url) => {
                let mut body = json!({
                    "chat_id": chat_id,
                    "photo": banner_url,
                    "caption": text,
                    "parse_mode": "Markdown",
                });
                attach_keyboard(&mut body, keyboard);
                self.call_expect_message("sendPhoto", body).await
            }
            None => self.send_message(chat_id, text, keyboard).await,
        }
    }

    /// Send a plain text message. Returns the sent message's id.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<i64, BotError> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown",
        });
        attach_keyboard(&mut body, keyboard);
        self.call_expect_message("sendMessage", body).await
    }

    /// Edit a screen in place, picking the edit endpoint that matches how
    /// screens are sent (caption for photos, text otherwise).
    async fn edit_screen(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), BotError> {
        let (method, text_field) = if self.banner_url.is_some() {
            ("editMessageCaption", "caption")
        } else {
            ("editMessageText", "text")
        };

        let mut body = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            text_field: text,
            "parse_mode": "Markdown",
        });
        attach_keyboard(&mut body, keyboard);

        self.call(method, body).await?;
        Ok(())
    }

    /// Acknowledge a button event, with an optional toast text.
    async fn answer_callback_query(&self, callback_id: &str, toast: Option<&str>) {
        let mut body = json!({ "callback_query_id": callback_id });
        if let Some(toast) = toast {
            body["text"] = json!(toast);
        }

        if let Err(e) = self.call("answerCallbackQuery", body).await {
            warn!("Failed to answer callback query: {}", e);
        }
    }

    /// POST an API method and require ok=true.
    async fn call(&self, method: &str, body: serde_json::Value) -> Result<serde_json::Value, BotError> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(&body)
            .send()
            .await?
            .json::<ApiResponse<serde_json::Value>>()
            .await?;

        if !response.ok {
            return Err(BotError::Telegram(format!("{} returned ok=false", method)));
        }

        Ok(response.result.unwrap_or_default())
    }

    /// POST an API method whose result is a message; returns its id.
    async fn call_expect_message(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<i64, BotError> {
        let result = self.call(method, body).await?;

        result
            .get("message_id")
            .and_then(|id| id.as_i64())
            .ok_or_else(|| BotError::Telegram(format!("{} result had no message_id", method)))
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }
}

/// Attach an inline keyboard to an API request body.
fn attach_keyboard(body: &mut serde_json::Value, keyboard: Option<&Keyboard>) {
    if let Some(keyboard) = keyboard {
        if let Ok(markup) = serde_json::to_value(InlineKeyboardMarkup::from(keyboard)) {
            body["reply_markup"] = markup;
        }
    }
}

/// Parse a slash command into its name and whitespace-split arguments.
/// Strips a trailing `@botname` mention from the command itself.
fn parse_command(text: &str) -> Option<(String, Vec<String>)> {
    let mut parts = text.split_whitespace();
    let name = parts.next()?.strip_prefix('/')?;
    let name = name.split('@').next().unwrap_or(name);

    if name.is_empty() {
        return None;
    }

    Some((name.to_string(), parts.map(str::to_string).collect()))
}

//! Conversation controller
//!
//! Drives the per-chat state machine: interprets inbound commands, free
//! text and button events, consults the registry service, transitions the
//! persisted conversation state, and emits presentation requests for the
//! chat transport to deliver.
//!
//! States: idle (no session entry) → awaiting host name → awaiting host
//! address → committed, with a staged-confirmation shortcut for one-shot
//! `/add name address` and a parallel removal confirmation. Pagination is
//! stateless: the page index travels in the button payload and bounds are
//! recomputed on every event.
//!
//! Every guard is re-evaluated at commit time — state may have been
//! persisted across a restart and the host directory may have changed
//! underneath it.

use crate::db::{chat_key, ChatSession, ChatState, DocumentStore, Sessions};
use crate::errors::BotError;
use crate::hosts::{valid_host_address, valid_host_name};
use crate::service::HostService;
use std::path::PathBuf;
use tracing::{debug, error, warn};

pub mod render;

pub use render::{Keyboard, RenderRequest, RenderTarget};

use render::{
    actions, add_confirmation_caption, confirm_keyboard, default_keyboard, help_caption,
    host_list_caption, host_list_entry_caption, pager_keyboard, remove_confirmation_caption,
    remove_done_caption, remove_missing_caption, welcome_caption,
};

/// An inbound chat event, normalized by the transport.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub chat_id: i64,

    /// Platform username of the sender, when they have one.
    pub username: Option<String>,

    /// Message the event is attached to (the tapped message for buttons).
    pub message_id: Option<i64>,

    pub kind: InboundKind,
}

/// The kinds of events the controller understands.
#[derive(Debug, Clone)]
pub enum InboundKind {
    /// A slash command with whitespace-split arguments.
    Command { name: String, args: Vec<String> },

    /// Free text outside a command.
    Text(String),

    /// A button press carrying its callback payload.
    Button { data: String },
}

/// Everything to deliver in response to one inbound event.
#[derive(Debug, Clone, Default)]
pub struct Reply {
    pub renders: Vec<RenderRequest>,

    /// Toast text for acknowledging a button event.
    pub toast: Option<String>,
}

impl Reply {
    fn none() -> Self {
        Self::default()
    }

    fn render(request: RenderRequest) -> Self {
        Self {
            renders: vec![request],
            toast: None,
        }
    }

    fn with_toast(mut self, toast: impl Into<String>) -> Self {
        self.toast = Some(toast.into());
        self
    }
}

/// The per-chat state machine over the registry service.
pub struct Controller {
    service: HostService,
    sessions: DocumentStore<Sessions>,
}

impl Controller {
    /// Open the controller over the service and the state document.
    pub async fn open(
        service: HostService,
        state_path: impl Into<PathBuf>,
    ) -> Result<Self, BotError> {
        Ok(Self {
            service,
            sessions: DocumentStore::open(state_path).await?,
        })
    }

    /// The registry service this controller drives.
    pub fn service(&self) -> &HostService {
        &self.service
    }

    /// Current conversation state of a chat, `None` when idle.
    pub async fn state_of(&self, chat_id: i64) -> Option<ChatState> {
        self.sessions
            .read(|sessions| sessions.get(&chat_key(chat_id)).map(|s| s.state.clone()))
            .await
    }

    /// Record the message id of a tracked wizard message on the session.
    pub async fn record_message_id(&self, chat_id: i64, message_id: i64) {
        let result = self
            .sessions
            .mutate(|sessions| {
                if let Some(session) = sessions.get_mut(&chat_key(chat_id)) {
                    session.message_id = Some(message_id);
                }
            })
            .await;

        if let Err(e) = result {
            error!("Failed to record message id for chat {}: {}", chat_id, e);
        }
    }

    /// Handle one inbound event.
    ///
    /// Never fails: expected guard violations become their chat message,
    /// anything else is logged and becomes the generic retry line. The
    /// process keeps serving other chats either way.
    pub async fn handle(&self, inbound: Inbound) -> Reply {
        let chat_id = inbound.chat_id;

        let username = match inbound.username.clone() {
            Some(username) => username,
            None => {
                return Reply::render(RenderRequest::message(
                    chat_id,
                    BotError::MissingUsername.user_message(),
                ))
            }
        };

        match self.dispatch(&username, inbound).await {
            Ok(reply) => reply,
            Err(e) if e.is_expected() => {
                debug!("Guard failure for chat {}: {}", chat_id, e);
                Reply::render(RenderRequest::message(chat_id, e.user_message()))
            }
            Err(e) => {
                error!("Event failed for chat {}: {}", chat_id, e);
                Reply::render(RenderRequest::message(chat_id, e.user_message()))
            }
        }
    }

    async fn dispatch(&self, username: &str, inbound: Inbound) -> Result<Reply, BotError> {
        let chat_id = inbound.chat_id;

        match inbound.kind {
            InboundKind::Command { ref name, ref args } => match name.as_str() {
                "start" => self.cmd_start(chat_id, username).await,
                "add" => self.cmd_add(chat_id, username, args).await,
                "remove" => self.cmd_remove(chat_id, username, args).await,
                "list" => self.cmd_list(chat_id, username).await,
                "help" => Ok(Reply::render(
                    RenderRequest::message(chat_id, help_caption())
                        .with_keyboard(default_keyboard()),
                )),
                _ => Ok(Reply::render(RenderRequest::message(
                    chat_id,
                    "Unknown command.",
                ))),
            },
            InboundKind::Text(ref text) => self.on_text(chat_id, username, text).await,
            InboundKind::Button { ref data } => {
                self.on_button(chat_id, username, data, inbound.message_id)
                    .await
            }
        }
    }

    // ---- Commands ----

    async fn cmd_start(&self, chat_id: i64, username: &str) -> Result<Reply, BotError> {
        let created = self.service.ensure_user(username, chat_id).await?;

        Ok(Reply::render(
            RenderRequest::message(chat_id, welcome_caption(username, created))
                .with_keyboard(default_keyboard()),
        ))
    }

    async fn cmd_add(
        &self,
        chat_id: i64,
        username: &str,
        args: &[String],
    ) -> Result<Reply, BotError> {
        match args {
            // Guided flow: ask for the name first
            [] => {
                self.set_state(chat_id, ChatState::AwaitingHostName).await?;
                Ok(Reply::render(RenderRequest::message(
                    chat_id,
                    "Please enter the host name.",
                )))
            }

            // One-shot: validate, stage, ask for confirmation
            [name, address, ..] => {
                self.check_new_host_name(username, name).await?;
                if !valid_host_address(address) {
                    return Err(BotError::InvalidHostAddress(address.clone()));
                }

                self.set_state(
                    chat_id,
                    ChatState::AwaitingConfirmation {
                        host_name: name.clone(),
                        host_address: address.clone(),
                    },
                )
                .await?;

                Ok(Reply::render(
                    RenderRequest::message(chat_id, add_confirmation_caption(name, address))
                        .with_keyboard(confirm_keyboard(actions::WRITE_HOST))
                        .tracked(),
                ))
            }

            _ => Err(BotError::MalformedArgs),
        }
    }

    async fn cmd_remove(
        &self,
        chat_id: i64,
        username: &str,
        args: &[String],
    ) -> Result<Reply, BotError> {
        let name = match args.first() {
            Some(name) => name,
            None => {
                return Ok(Reply::render(RenderRequest::message(
                    chat_id,
                    "Please enter the host name.",
                )))
            }
        };

        if !self.service.user_owns_host(username, name).await {
            return Ok(Reply::render(
                RenderRequest::message(chat_id, remove_missing_caption(name))
                    .with_keyboard(default_keyboard()),
            ));
        }

        self.set_state(
            chat_id,
            ChatState::AwaitingRemoval {
                host_name: name.clone(),
            },
        )
        .await?;

        Ok(Reply::render(
            RenderRequest::message(chat_id, remove_confirmation_caption(name))
                .with_keyboard(confirm_keyboard(actions::REMOVE_HOST))
                .tracked(),
        ))
    }

    async fn cmd_list(&self, chat_id: i64, username: &str) -> Result<Reply, BotError> {
        if !self.service.user_exists(username).await {
            return Ok(Reply::render(RenderRequest::message(
                chat_id,
                "Please register first.",
            )));
        }

        Ok(Reply::render(
            RenderRequest::message(chat_id, host_list_entry_caption())
                .with_keyboard(Keyboard(vec![vec![render::Button::new(
                    "Host List",
                    actions::HOST_LIST,
                )]])),
        ))
    }

    // ---- Free text (guided add flow) ----

    async fn on_text(&self, chat_id: i64, username: &str, text: &str) -> Result<Reply, BotError> {
        match self.state_of(chat_id).await {
            Some(ChatState::AwaitingHostName) => {
                self.check_new_host_name(username, text).await?;

                self.set_state(
                    chat_id,
                    ChatState::AwaitingHostAddress {
                        host_name: text.to_string(),
                    },
                )
                .await?;

                Ok(Reply::render(RenderRequest::message(
                    chat_id,
                    "Please enter the host address.",
                )))
            }

            Some(ChatState::AwaitingHostAddress { host_name }) => {
                if !valid_host_address(text) {
                    return Err(BotError::InvalidHostAddress(text.to_string()));
                }

                // Re-checked inside create_host; a failure leaves the
                // state untouched so the user can retry.
                self.service.create_host(username, &host_name, text).await?;
                self.clear_state(chat_id).await?;

                Ok(Reply::render(
                    RenderRequest::message(
                        chat_id,
                        format!("Host {} has been added successfully.", host_name),
                    )
                    .with_keyboard(default_keyboard()),
                ))
            }

            // Plain text outside the guided flow is logged and ignored
            other => {
                debug!(
                    "Ignoring text from chat {} in state {:?}: {}",
                    chat_id, other, text
                );
                Ok(Reply::none())
            }
        }
    }

    // ---- Buttons ----

    async fn on_button(
        &self,
        chat_id: i64,
        username: &str,
        data: &str,
        message_id: Option<i64>,
    ) -> Result<Reply, BotError> {
        let parts: Vec<&str> = data.split('_').collect();

        match parts[0] {
            actions::HOST_LIST => Ok(self.page_view(chat_id, username, 0, message_id).await),

            actions::PAGER => {
                let (direction, page) = match (parts.get(1), parts.get(2)) {
                    (Some(direction), Some(page)) => (*direction, page.parse::<usize>()),
                    _ => {
                        warn!("Malformed pager payload from chat {}: {}", chat_id, data);
                        return Ok(Reply::none());
                    }
                };
                let page = match page {
                    Ok(page) => page,
                    Err(_) => {
                        warn!("Malformed pager payload from chat {}: {}", chat_id, data);
                        return Ok(Reply::none());
                    }
                };

                let total = self.service.total_pages(username).await;
                let stepped = match direction {
                    "next" => page.saturating_add(1),
                    _ => page.saturating_sub(1),
                };
                // Clamp to valid pages; the edge re-renders the same page
                let clamped = stepped.min(total.saturating_sub(1));

                Ok(self.page_view(chat_id, username, clamped, message_id).await)
            }

            actions::WRITE_HOST => {
                let (host_name, host_address) = match self.state_of(chat_id).await {
                    Some(ChatState::AwaitingConfirmation {
                        host_name,
                        host_address,
                    }) => (host_name, host_address),
                    _ => return Err(BotError::StaleState(chat_id)),
                };

                // Commit re-checks existence and ownership
                let result = self
                    .service
                    .create_host(username, &host_name, &host_address)
                    .await;
                self.clear_state(chat_id).await?;
                result?;

                Ok(Reply::render(RenderRequest::message(
                    chat_id,
                    format!("Host {} has been added successfully.", host_name),
                )))
            }

            actions::REMOVE_HOST => {
                let host_name = match self.state_of(chat_id).await {
                    Some(ChatState::AwaitingRemoval { host_name }) => host_name,
                    _ => return Err(BotError::StaleState(chat_id)),
                };

                self.clear_state(chat_id).await?;
                self.service.remove_host(username, &host_name).await?;

                let request = match message_id {
                    Some(id) => RenderRequest::edit(chat_id, id, remove_done_caption(&host_name)),
                    None => RenderRequest::message(chat_id, remove_done_caption(&host_name)),
                };

                Ok(
                    Reply::render(request.with_keyboard(default_keyboard()))
                        .with_toast("Host has been removed successfully."),
                )
            }

            actions::CANCEL => {
                self.clear_state(chat_id).await?;

                let caption = welcome_caption(username, false);
                let request = match message_id {
                    Some(id) => RenderRequest::edit(chat_id, id, caption),
                    None => RenderRequest::message(chat_id, caption),
                };

                Ok(Reply::render(request.with_keyboard(default_keyboard()))
                    .with_toast("Canceled"))
            }

            actions::HELP => {
                let request = match message_id {
                    Some(id) => RenderRequest::edit(chat_id, id, help_caption()),
                    None => RenderRequest::message(chat_id, help_caption()),
                };

                Ok(Reply::render(request.with_keyboard(default_keyboard())))
            }

            actions::NULL => Ok(Reply::none()),

            other => {
                warn!("Unknown button action from chat {}: {}", chat_id, other);
                Ok(Reply::none())
            }
        }
    }

    /// Render one host list page, recomputing bounds from the registry.
    async fn page_view(
        &self,
        chat_id: i64,
        username: &str,
        page: usize,
        message_id: Option<i64>,
    ) -> Reply {
        let total = self.service.total_pages(username).await;
        let hosts = self.service.hosts_page(username, page).await;

        let caption = host_list_caption(page, total, &hosts);
        let request = match message_id {
            Some(id) => RenderRequest::edit(chat_id, id, caption),
            None => RenderRequest::message(chat_id, caption),
        };

        Reply::render(request.with_keyboard(pager_keyboard(page, total)))
    }

    /// Shared guard for a prospective host name: whitelist, global
    /// uniqueness (artifact existence), and per-user uniqueness.
    async fn check_new_host_name(&self, username: &str, name: &str) -> Result<(), BotError> {
        if !valid_host_name(name) {
            return Err(BotError::InvalidHostName(name.to_string()));
        }
        if self.service.host_exists(name).await {
            return Err(BotError::HostAlreadyExists(name.to_string()));
        }
        if self.service.user_owns_host(username, name).await {
            return Err(BotError::AlreadyOnUserList(name.to_string()));
        }
        Ok(())
    }

    async fn set_state(&self, chat_id: i64, state: ChatState) -> Result<(), BotError> {
        self.sessions
            .mutate(|sessions| {
                sessions.insert(chat_key(chat_id), ChatSession::new(state));
            })
            .await?;
        Ok(())
    }

    async fn clear_state(&self, chat_id: i64) -> Result<(), BotError> {
        self.sessions
            .mutate(|sessions| {
                sessions.remove(&chat_key(chat_id));
            })
            .await?;
        Ok(())
    }
}

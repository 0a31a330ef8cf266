//! Outbound presentation requests
//!
//! The controller describes what to show as `RenderRequest` values; the
//! chat transport decides how to deliver them (photo caption vs. plain
//! text, send vs. edit). Captions and keyboards for every screen live
//! here so the transition logic stays free of presentation details.

use crate::hosts::generate_host_data;

/// Divider line framing every screen.
pub const DIVIDER: &str = "━━━━━━━━━━━━━━━━━━";

/// Button action tokens carried in callback data. Pagination encodes its
/// page index as `host_next_<p>` / `host_prev_<p>`.
pub mod actions {
    pub const HOST_LIST: &str = "hostList";
    pub const WRITE_HOST: &str = "writeHost";
    pub const REMOVE_HOST: &str = "removeHost";
    pub const CANCEL: &str = "cancel";
    pub const HELP: &str = "help";
    pub const NULL: &str = "null";
    pub const PAGER: &str = "host";
}

/// Where a render lands: a fresh message or an in-place edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    NewMessage,
    EditMessage(i64),
}

/// One inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub text: String,
    pub action: String,
}

impl Button {
    pub fn new(text: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: action.into(),
        }
    }
}

/// Rows of inline keyboard buttons.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard(pub Vec<Vec<Button>>);

/// A single outbound presentation request.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub chat_id: i64,
    pub target: RenderTarget,
    pub text: String,
    pub keyboard: Option<Keyboard>,

    /// When true, the transport records the sent message's id on the
    /// chat's session entry so the wizard can keep editing it.
    pub track_message: bool,
}

impl RenderRequest {
    /// A plain new message.
    pub fn message(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            target: RenderTarget::NewMessage,
            text: text.into(),
            keyboard: None,
            track_message: false,
        }
    }

    /// An in-place edit of `message_id`.
    pub fn edit(chat_id: i64, message_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            target: RenderTarget::EditMessage(message_id),
            text: text.into(),
            keyboard: None,
            track_message: false,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    pub fn tracked(mut self) -> Self {
        self.track_message = true;
        self
    }
}

/// The `[Host List | Help]` keyboard shown on idle screens.
pub fn default_keyboard() -> Keyboard {
    Keyboard(vec![vec![
        Button::new("Host List", actions::HOST_LIST),
        Button::new("Help", actions::HELP),
    ]])
}

/// Yes/No keyboard for staging confirmations.
pub fn confirm_keyboard(yes_action: &str) -> Keyboard {
    Keyboard(vec![vec![
        Button::new("Yes", yes_action),
        Button::new("No", actions::CANCEL),
    ]])
}

/// Pager keyboard for a host list page. The blocked direction at either
/// edge carries the `null` action instead of being omitted.
pub fn pager_keyboard(page: usize, total: usize) -> Keyboard {
    let prev = if page > 0 {
        format!("{}_prev_{}", actions::PAGER, page)
    } else {
        actions::NULL.to_string()
    };
    let next = if page + 1 < total {
        format!("{}_next_{}", actions::PAGER, page)
    } else {
        actions::NULL.to_string()
    };

    Keyboard(vec![
        vec![
            Button::new("Prev", prev),
            Button::new(format!("Page: {}", page + 1), actions::NULL),
            Button::new("Next", next),
        ],
        vec![Button::new("Cancel", actions::CANCEL)],
    ])
}

fn framed(title: &str, body: &str) -> String {
    format!("*• {} •*\n{}\n\n{}\n\n{}", title, DIVIDER, body, DIVIDER)
}

/// Welcome screen. The first registration gets the extra confirmation line.
pub fn welcome_caption(username: &str, newly_registered: bool) -> String {
    let body = if newly_registered {
        "You're now registered to the bot.\n\n\
         You can now use the bot feature by clicking the button below."
    } else {
        "You can use the bot feature by clicking the button below."
    };
    framed(&format!("Welcome {}", username), body)
}

/// Add-host confirmation screen, previewing the generated file content.
pub fn add_confirmation_caption(name: &str, address: &str) -> String {
    let body = format!(
        "Host Name: {}\nHost Address: ```php\n{}```",
        name,
        generate_host_data(address)
    );
    format!("{}\n\nDo you want to add this host?", framed("Add Host", &body))
}

/// Remove-host confirmation screen.
pub fn remove_confirmation_caption(name: &str) -> String {
    format!(
        "{}\n\nDo you want to remove this host?",
        framed("Remove Host", &format!("Host Name: *{}*", name))
    )
}

/// Remove screen for a host that is not on the caller's list.
pub fn remove_missing_caption(name: &str) -> String {
    format!(
        "{}\n\nHost are not on your list, check again using button below.",
        framed("Remove Host", &format!("Host Name: *{}*", name))
    )
}

/// Remove-completed screen.
pub fn remove_done_caption(name: &str) -> String {
    framed(
        "Remove Host",
        &format!("Host: {} has been removed successfully.", name),
    )
}

/// One host list page. The header always shows the true page count,
/// minimum one so an empty list reads `Page (1 / 1)`.
pub fn host_list_caption(page: usize, total: usize, hosts: &[String]) -> String {
    let mut body = format!("Hosts: Page ({} / {})\n", page + 1, total.max(1));
    for (index, host) in hosts.iter().enumerate() {
        body.push_str(&format!("{}. {}.txt\n", index + 1, host));
    }
    framed("Host List", body.trim_end())
}

/// Entry screen for the /list command.
pub fn host_list_entry_caption() -> String {
    "*• Host List •*".to_string()
}

/// Help screen listing every command.
pub fn help_caption() -> String {
    framed(
        "Help",
        "You can use the bot feature by using this command:\n\
         /start - Start the bot\n\
         /add - Add a new host, example /add MyHost 1.1.1.1\n\
         /remove - Remove a host, example /remove MyHost\n\
         /list - View the host list\n\
         /help - View the help message",
    )
}

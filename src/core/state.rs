//! # Application State
//!
//! Core business state for roomtalk. This module contains domain logic only -
//! no TUI-specific types. Presentation state lives in the `tui` module.
//!
//! ```text
//! App
//! ├── screen: Screen                 // which view is showing
//! ├── session: SessionContext        // username + tokens
//! ├── allow_anonymous: bool          // rooms joinable without login
//! ├── profile: Option<UserProfile>   // from /users/me
//! ├── rooms: Vec<Room>               // room list
//! ├── agents: Vec<Agent>             // agent list
//! ├── chat: ChatView                 // mirror of the channel task's state
//! ├── status_message: String         // status bar text
//! ├── error: Option<String>          // error banner
//! ├── in_flight: usize               // REST calls awaiting a result
//! └── login_hint: Option<String>     // username to prefill after register
//! ```
//!
//! State changes only happen through `update(state, action)` in action.rs.

use crate::api::{Agent, Room, UserProfile};
use crate::channel::{ChannelState, Message, Notice};
use crate::core::session::SessionContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Register,
    Rooms,
    Chat,
    Agents,
    Profile,
}

impl Screen {
    pub fn title(self) -> &'static str {
        match self {
            Screen::Login => "Login",
            Screen::Register => "Register",
            Screen::Rooms => "Rooms",
            Screen::Chat => "Chat",
            Screen::Agents => "Agents",
            Screen::Profile => "Profile",
        }
    }
}

/// What the UI knows about the active room's channel.
///
/// Fed exclusively by `ChannelUpdate`s; the channel task owns the truth.
#[derive(Debug, Clone, Default)]
pub struct ChatView {
    pub room: Option<String>,
    pub state: ChannelState,
    pub messages: Vec<Message>,
    pub typing: Vec<String>,
    pub notice: Option<Notice>,
    pub auth_recovery: AuthRecovery,
}

/// Progress of recovering from the channel rejecting our token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthRecovery {
    #[default]
    Idle,
    /// A `Me` call is checking (and if needed refreshing) the token.
    Verifying,
    /// Rejoined with a verified token; another rejection means log in again.
    Rejoined,
}

impl ChatView {
    /// Typing users other than `me`.
    pub fn others_typing(&self, me: &str) -> Vec<&str> {
        self.typing
            .iter()
            .map(String::as_str)
            .filter(|user| *user != me)
            .collect()
    }
}

pub struct App {
    pub screen: Screen,
    pub session: SessionContext,
    pub allow_anonymous: bool,
    pub profile: Option<UserProfile>,
    pub rooms: Vec<Room>,
    pub agents: Vec<Agent>,
    pub chat: ChatView,
    pub status_message: String,
    pub error: Option<String>,
    pub in_flight: usize,
    pub login_hint: Option<String>,
}

impl App {
    /// Starts on the room list when logged in (or anonymous use is allowed),
    /// otherwise on the login screen.
    pub fn new(session: SessionContext, allow_anonymous: bool) -> Self {
        let screen = if session.is_authenticated() || allow_anonymous {
            Screen::Rooms
        } else {
            Screen::Login
        };
        Self {
            screen,
            session,
            allow_anonymous,
            profile: None,
            rooms: Vec::new(),
            agents: Vec::new(),
            chat: ChatView::default(),
            status_message: String::from("Welcome to roomtalk!"),
            error: None,
            in_flight: 0,
            login_hint: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    pub fn is_moderator(&self) -> bool {
        self.profile.as_ref().is_some_and(|p| p.is_moderator)
    }

    /// Metadata for the room the chat view is showing, if the list has it.
    pub fn current_room(&self) -> Option<&Room> {
        let name = self.chat.room.as_deref()?;
        self.rooms.iter().find(|r| r.name == name)
    }

    pub fn current_room_mut(&mut self) -> Option<&mut Room> {
        let name = self.chat.room.clone()?;
        self.rooms.iter_mut().find(|r| r.name == name)
    }
}

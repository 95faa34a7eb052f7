//! # TUI Components
//!
//! Every screen is built from these pieces.
//!
//! ### Stateless (props only)
//!
//! - `TitleBar`: top status line
//! - `MessageView`: one chat message
//!
//! ### Stateful (event-driven)
//!
//! - `InputBox`: text field used by every form and the chat composer
//! - `MessageList`: scrollable room log with layout caching
//! - `RoomList`: room browser with join/create field
//! - `AuthForm`: login and registration
//! - `AgentPanel`: agents and per-room commands
//! - `ProfileView`: profile display and editing
//!
//! Stateful components split into a persistent `…State` (kept in `TuiState`,
//! implements `EventHandler`) and a transient view struct built each frame
//! with borrowed props (implements `Component`). Each file holds the state,
//! its events, rendering and tests.

pub mod agent_panel;
pub mod auth_form;
pub mod input_box;
pub mod message;
pub mod message_list;
pub mod profile;
pub mod room_list;
mod title_bar;

pub use agent_panel::{AgentPanel, AgentPanelEvent, AgentPanelState};
pub use auth_form::{AuthEvent, AuthForm, AuthFormState};
pub use input_box::{INPUT_HEIGHT, InputBox, InputEvent};
pub use message_list::{MessageList, MessageListState};
pub use profile::{ProfileEvent, ProfileState, ProfileView};
pub use room_list::{RoomList, RoomListEvent, RoomListState};
pub use title_bar::TitleBar;

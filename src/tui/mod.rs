//! # TUI Adapter
//!
//! The ratatui-specific layer. Handles terminal I/O, renders the UI,
//! translates keyboard events into `core::Action` values and carries out
//! the `Effect`s that `update()` returns.
//!
//! This is the only module that knows about ratatui and crossterm.
//!
//! ## Event Loop
//!
//! Three sources feed the loop:
//!
//! - terminal events, polled with a short timeout
//! - REST results, sent back by spawned tokio tasks as `Action::ApiCompleted`
//! - channel updates, forwarded from the channel manager as `Action::Channel`
//!
//! Background work reports through a std `mpsc` channel that the loop
//! drains between frames. The loop only redraws after something happened.
//!
//! A `SteadyBlock` cursor style is used instead of a blinking cursor because
//! ratatui's `set_cursor_position` resets the terminal's blink timer on every
//! `draw()` call.

mod component;
mod components;
mod event;
mod ui;

use std::io::stdout;
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, SetCursorStyle, Show};
use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
    KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use log::{debug, info, warn};
use ratatui::layout::Rect;

use crate::api::{ChatApi, HttpApi, call_with_refresh};
use crate::channel::{
    ChannelHandle, ChannelMachine, REACTIONS, TypingSet, WsConnector, spawn_channel,
};
use crate::core::action::{Action, Effect, update};
use crate::core::config::ResolvedConfig;
use crate::core::session::{SessionContext, persist_session};
use crate::core::state::{App, Screen};
use crate::tui::component::EventHandler;
use crate::tui::components::{
    AgentPanelEvent, AgentPanelState, AuthEvent, AuthFormState, InputBox, InputEvent,
    MessageListState, ProfileEvent, ProfileState, RoomListEvent, RoomListState,
};
use crate::tui::event::{TuiEvent, poll_event_immediate, poll_event_timeout};

/// Minimum gap between typing notifications sent to the room.
const TYPING_INTERVAL: Duration = Duration::from_secs(1);
const POLL_TIMEOUT: Duration = Duration::from_millis(250);

/// Modal input mode for the chat screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Navigate messages with arrow keys and react. Typing switches to Input.
    Cursor,
    /// Text editing in the composer. Esc switches to Cursor.
    Input,
}

/// TUI-specific presentation state (not part of core business logic)
pub struct TuiState {
    pub message_list: MessageListState,
    pub composer: InputBox,
    pub input_mode: InputMode,
    pub rooms: RoomListState,
    pub auth: AuthFormState,
    pub agents: AgentPanelState,
    pub profile: ProfileState,
    /// Where the message list was last drawn, for mouse hit testing
    pub chat_list_area: Rect,
    last_typing_sent: Option<Instant>,
    shown_room: Option<String>,
    applied_login_hint: Option<String>,
}

impl Default for TuiState {
    fn default() -> Self {
        Self::new()
    }
}

impl TuiState {
    pub fn new() -> Self {
        Self {
            message_list: MessageListState::new(),
            composer: InputBox::new("Message"),
            input_mode: InputMode::Input, // User expects to type immediately
            rooms: RoomListState::new(),
            auth: AuthFormState::new(),
            agents: AgentPanelState::new(),
            profile: ProfileState::new(),
            chat_list_area: Rect::default(),
            last_typing_sent: None,
            shown_room: None,
            applied_login_hint: None,
        }
    }

    /// Resets presentation state that belongs to data the core replaced.
    fn sync_with_app(&mut self, app: &App) {
        if self.shown_room != app.chat.room {
            self.shown_room = app.chat.room.clone();
            self.message_list = MessageListState::new();
            self.input_mode = InputMode::Input;
            self.composer.clear();
        }
        if app.login_hint != self.applied_login_hint {
            if let Some(username) = &app.login_hint {
                self.auth.prefill_username(username);
            }
            self.applied_login_hint = app.login_hint.clone();
        }
    }

    /// Whether a typing notification may go out now.
    fn typing_due(&mut self, now: Instant) -> bool {
        let due = self
            .last_typing_sent
            .is_none_or(|last| now.duration_since(last) >= TYPING_INTERVAL);
        if due {
            self.last_typing_sent = Some(now);
        }
        due
    }
}

struct TerminalModeGuard;

impl TerminalModeGuard {
    fn new() -> std::io::Result<Self> {
        execute!(
            stdout(),
            EnableMouseCapture,
            EnableBracketedPaste,
            Show,
            SetCursorStyle::SteadyBlock,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
        )?;
        info!("Terminal modes enabled (mouse, bracketed paste, steady block cursor, keyboard enhancement)");
        Ok(Self)
    }
}

impl Drop for TerminalModeGuard {
    fn drop(&mut self) {
        let _ = execute!(
            stdout(),
            PopKeyboardEnhancementFlags,
            DisableMouseCapture,
            DisableBracketedPaste,
            Hide
        );
    }
}

/// Translates a terminal event into a core action, updating TUI-local state.
fn handle_event(app: &App, tui: &mut TuiState, event: &TuiEvent) -> Option<Action> {
    match event {
        TuiEvent::ForceQuit => return Some(Action::Quit),
        TuiEvent::Resize => return None,
        TuiEvent::Escape if app.error.is_some() => return Some(Action::DismissError),
        TuiEvent::ShowRooms => return Some(Action::Navigate(Screen::Rooms)),
        TuiEvent::ShowChat => return Some(Action::Navigate(Screen::Chat)),
        TuiEvent::ShowAgents => return Some(Action::Navigate(Screen::Agents)),
        TuiEvent::ShowProfile => return Some(Action::Navigate(Screen::Profile)),
        TuiEvent::Logout if app.session.is_authenticated() => return Some(Action::Logout),
        TuiEvent::Logout => return Some(Action::Navigate(Screen::Login)),
        _ => {}
    }

    match app.screen {
        Screen::Login | Screen::Register => {
            let registering = app.screen == Screen::Register;
            match tui.auth.handle_event(event)? {
                AuthEvent::Submit(credentials) if registering => {
                    Some(Action::SubmitRegister(credentials))
                }
                AuthEvent::Submit(credentials) => Some(Action::SubmitLogin(credentials)),
                AuthEvent::SwitchMode if registering => Some(Action::Navigate(Screen::Login)),
                AuthEvent::SwitchMode => Some(Action::Navigate(Screen::Register)),
            }
        }
        Screen::Rooms => match tui.rooms.handle_event(event)? {
            RoomListEvent::Join(room) => Some(Action::JoinRoom(room)),
            RoomListEvent::Create { name, is_public } => Some(Action::CreateRoom { name, is_public }),
        },
        Screen::Chat => handle_chat_event(app, tui, event),
        Screen::Agents => match tui.agents.handle_event(event)? {
            AgentPanelEvent::ToggleActive(id) => Some(Action::ToggleAgent(id)),
            AgentPanelEvent::ToggleInRoom(id) => Some(Action::ToggleRoomAgent(id)),
            AgentPanelEvent::ToggleCommand(command) => Some(Action::ToggleRoomCommand(command)),
            AgentPanelEvent::Create(agent) => Some(Action::CreateAgent(agent)),
        },
        Screen::Profile => match tui.profile.handle_event(event)? {
            ProfileEvent::Save(update) => Some(Action::UpdateProfile(update)),
        },
    }
}

fn handle_chat_event(app: &App, tui: &mut TuiState, event: &TuiEvent) -> Option<Action> {
    let message_count = app.chat.messages.len();

    // Scrolling and hover work in both modes
    match event {
        TuiEvent::ScrollUp | TuiEvent::ScrollDown | TuiEvent::ScrollPageUp | TuiEvent::ScrollPageDown => {
            tui.message_list.handle_event(event);
            return None;
        }
        TuiEvent::MouseMove(_, row) => {
            let area = tui.chat_list_area;
            if tui.input_mode == InputMode::Cursor && *row >= area.y && *row < area.y + area.height {
                if let Some(idx) = tui.message_list.hit_test(row - area.y) {
                    tui.message_list.selected_index = Some(idx);
                }
            }
            return None;
        }
        _ => {}
    }

    match tui.input_mode {
        InputMode::Input => {
            if matches!(event, TuiEvent::Escape) {
                tui.input_mode = InputMode::Cursor;
                tui.message_list.select_previous(message_count);
                return None;
            }
            let edits_text = matches!(
                event,
                TuiEvent::InputChar(_) | TuiEvent::Paste(_) | TuiEvent::Backspace | TuiEvent::Delete
            );
            match tui.composer.handle_event(event)? {
                InputEvent::Submit(text) => Some(Action::SubmitMessage(text)),
                InputEvent::ContentChanged if edits_text && tui.typing_due(Instant::now()) => {
                    Some(Action::Typing)
                }
                InputEvent::ContentChanged => None,
            }
        }
        InputMode::Cursor => match event {
            TuiEvent::Escape => Some(Action::LeaveRoom),
            TuiEvent::CursorUp => {
                tui.message_list.select_previous(message_count);
                None
            }
            TuiEvent::CursorDown => {
                tui.message_list.select_next(message_count);
                None
            }
            TuiEvent::InputChar(c @ '1'..='6') => {
                let idx = tui.message_list.selected_index?;
                let message = app.chat.messages.get(idx)?;
                let slot = c.to_digit(10)? as usize - 1;
                Some(Action::React {
                    message_id: message.id.clone(),
                    symbol: REACTIONS[slot].to_string(),
                })
            }
            TuiEvent::Submit => {
                tui.input_mode = InputMode::Input;
                tui.message_list.selected_index = None;
                None
            }
            TuiEvent::InputChar(_) | TuiEvent::Paste(_) => {
                tui.input_mode = InputMode::Input;
                tui.message_list.selected_index = None;
                tui.composer.handle_event(event);
                None
            }
            _ => None,
        },
    }
}

/// Performs effects against the outside world.
struct EffectRunner {
    api: Arc<dyn ChatApi>,
    channel: ChannelHandle,
    tx: mpsc::Sender<Action>,
}

impl EffectRunner {
    /// Returns true when the app should quit.
    fn run(&self, app: &App, effect: Effect) -> bool {
        let mut quit = false;
        for effect in effect.into_vec() {
            match effect {
                Effect::None | Effect::Batch(_) => {}
                Effect::Quit => quit = true,
                Effect::Api(request) => self.spawn_api_call(request, app.session.clone()),
                Effect::Channel(request) => self.channel.request(request),
                Effect::SaveSession => persist_session(&app.session),
            }
        }
        quit
    }

    fn spawn_api_call(&self, request: crate::api::ApiRequest, session: SessionContext) {
        debug!("Spawning API call: {:?}", request);
        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let outcome = call_with_refresh(api.as_ref(), &request, &session).await;
            if tx.send(Action::ApiCompleted { request, outcome }).is_err() {
                warn!("Failed to deliver API result: receiver dropped");
            }
        });
    }
}

/// Runs the UI until the user quits. Must be called inside a tokio runtime.
pub fn run(config: ResolvedConfig, session: SessionContext) -> std::io::Result<()> {
    let server_url = config
        .server_url()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
    info!("Using server {}", server_url);

    let api: Arc<dyn ChatApi> = Arc::new(HttpApi::new(server_url.as_str()));
    let (tx, rx) = mpsc::channel();

    // Channel manager task + forwarder into the action queue
    let machine = ChannelMachine::new(
        session.clone(),
        config.reconnect,
        TypingSet::new(config.typing_ttl),
    );
    let (updates_tx, mut updates_rx) = tokio::sync::mpsc::unbounded_channel();
    let (channel, channel_task) =
        spawn_channel(machine, Arc::new(WsConnector::new(server_url)), updates_tx);
    let forward_tx = tx.clone();
    tokio::spawn(async move {
        while let Some(update) = updates_rx.recv().await {
            if forward_tx.send(Action::Channel(update)).is_err() {
                break;
            }
        }
    });

    let runner = EffectRunner {
        api,
        channel: channel.clone(),
        tx: tx.clone(),
    };

    let mut app = App::new(session, config.allow_anonymous);
    let mut tui = TuiState::new();
    let init = update(
        &mut app,
        Action::Init {
            default_room: config.default_room.clone(),
        },
    );
    let mut should_quit = runner.run(&app, init);

    let mut terminal = ratatui::init();
    let _terminal_mode_guard = TerminalModeGuard::new();
    let mut needs_redraw = true;

    while !should_quit {
        if needs_redraw {
            tui.sync_with_app(&app);
            terminal.draw(|f| ui::draw_ui(f, &app, &mut tui))?;
            needs_redraw = false;
        }

        // Process first event + drain all pending events before the next draw
        let first_event = poll_event_timeout(POLL_TIMEOUT);
        for event in first_event
            .into_iter()
            .chain(std::iter::from_fn(poll_event_immediate))
        {
            needs_redraw = true;
            if let Some(action) = handle_event(&app, &mut tui, &event) {
                let effect = update(&mut app, action);
                should_quit |= runner.run(&app, effect);
            }
        }

        // Results from background tasks
        while let Ok(action) = rx.try_recv() {
            needs_redraw = true;
            debug!("Event loop received: {:?}", action);
            let effect = update(&mut app, action);
            should_quit |= runner.run(&app, effect);
        }
    }

    channel.shutdown();
    drop(channel_task);
    ratatui::restore();
    info!("roomtalk exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelState, Message};
    use crate::test_support::test_app;

    fn chat_app() -> App {
        let mut app = test_app();
        app.screen = Screen::Chat;
        app.chat.room = Some("general".to_string());
        app.chat.state = ChannelState::Open;
        app.chat.messages = vec![Message::new("m1", "hi", "bob"), Message::new("m2", "yo", "eve")];
        app
    }

    #[test]
    fn test_global_shortcuts() {
        let app = test_app();
        let mut tui = TuiState::new();
        assert_eq!(handle_event(&app, &mut tui, &TuiEvent::ForceQuit), Some(Action::Quit));
        assert_eq!(
            handle_event(&app, &mut tui, &TuiEvent::ShowAgents),
            Some(Action::Navigate(Screen::Agents))
        );
        assert_eq!(handle_event(&app, &mut tui, &TuiEvent::Logout), Some(Action::Logout));
    }

    #[test]
    fn test_escape_dismisses_error_first() {
        let mut app = chat_app();
        app.error = Some("boom".to_string());
        let mut tui = TuiState::new();
        assert_eq!(handle_event(&app, &mut tui, &TuiEvent::Escape), Some(Action::DismissError));
        assert_eq!(tui.input_mode, InputMode::Input);
    }

    #[test]
    fn test_chat_submit_and_typing_throttle() {
        let app = chat_app();
        let mut tui = TuiState::new();

        assert_eq!(handle_event(&app, &mut tui, &TuiEvent::InputChar('h')), Some(Action::Typing));
        // Within the interval no second notification goes out
        assert_eq!(handle_event(&app, &mut tui, &TuiEvent::InputChar('i')), None);
        assert_eq!(
            handle_event(&app, &mut tui, &TuiEvent::Submit),
            Some(Action::SubmitMessage("hi".to_string()))
        );
    }

    #[test]
    fn test_typing_throttle_reopens_after_interval() {
        let mut tui = TuiState::new();
        let start = Instant::now();
        assert!(tui.typing_due(start));
        assert!(!tui.typing_due(start + Duration::from_millis(500)));
        assert!(tui.typing_due(start + TYPING_INTERVAL));
    }

    #[test]
    fn test_cursor_mode_reactions() {
        let app = chat_app();
        let mut tui = TuiState::new();

        assert_eq!(handle_event(&app, &mut tui, &TuiEvent::Escape), None);
        assert_eq!(tui.input_mode, InputMode::Cursor);
        assert_eq!(tui.message_list.selected_index, Some(1));

        assert_eq!(
            handle_event(&app, &mut tui, &TuiEvent::InputChar('2')),
            Some(Action::React {
                message_id: "m2".to_string(),
                symbol: REACTIONS[1].to_string(),
            })
        );

        handle_event(&app, &mut tui, &TuiEvent::CursorUp);
        assert_eq!(
            handle_event(&app, &mut tui, &TuiEvent::InputChar('1')),
            Some(Action::React {
                message_id: "m1".to_string(),
                symbol: REACTIONS[0].to_string(),
            })
        );
    }

    #[test]
    fn test_cursor_mode_typing_returns_to_input() {
        let app = chat_app();
        let mut tui = TuiState::new();
        handle_event(&app, &mut tui, &TuiEvent::Escape);
        handle_event(&app, &mut tui, &TuiEvent::InputChar('x'));
        assert_eq!(tui.input_mode, InputMode::Input);
        assert_eq!(tui.composer.value(), "x");
        assert_eq!(tui.message_list.selected_index, None);
    }

    #[test]
    fn test_escape_twice_leaves_room() {
        let app = chat_app();
        let mut tui = TuiState::new();
        handle_event(&app, &mut tui, &TuiEvent::Escape);
        assert_eq!(handle_event(&app, &mut tui, &TuiEvent::Escape), Some(Action::LeaveRoom));
    }

    #[test]
    fn test_login_form_submits_for_current_screen() {
        let mut app = test_app();
        app.screen = Screen::Register;
        let mut tui = TuiState::new();
        for c in "neo".chars() {
            handle_event(&app, &mut tui, &TuiEvent::InputChar(c));
        }
        handle_event(&app, &mut tui, &TuiEvent::Submit);
        for c in "pw".chars() {
            handle_event(&app, &mut tui, &TuiEvent::InputChar(c));
        }
        match handle_event(&app, &mut tui, &TuiEvent::Submit) {
            Some(Action::SubmitRegister(credentials)) => {
                assert_eq!(credentials.username, "neo");
                assert_eq!(credentials.password, "pw");
            }
            other => panic!("expected SubmitRegister, got {other:?}"),
        }
    }

    #[test]
    fn test_sync_resets_view_on_room_change() {
        let mut app = chat_app();
        let mut tui = TuiState::new();
        tui.sync_with_app(&app);
        tui.message_list.selected_index = Some(1);
        tui.input_mode = InputMode::Cursor;

        app.chat.room = Some("random".to_string());
        tui.sync_with_app(&app);
        assert_eq!(tui.message_list.selected_index, None);
        assert_eq!(tui.input_mode, InputMode::Input);
    }

    #[test]
    fn test_sync_prefills_login_hint() {
        let mut app = test_app();
        app.screen = Screen::Login;
        app.login_hint = Some("trinity".to_string());
        let mut tui = TuiState::new();
        tui.sync_with_app(&app);

        for c in "pw".chars() {
            handle_event(&app, &mut tui, &TuiEvent::InputChar(c));
        }
        match handle_event(&app, &mut tui, &TuiEvent::Submit) {
            Some(Action::SubmitLogin(credentials)) => assert_eq!(credentials.username, "trinity"),
            other => panic!("expected SubmitLogin, got {other:?}"),
        }
    }
}

//! # Actions
//!
//! Everything that can happen in roomtalk becomes an `Action`.
//! User presses Enter in the chat box? That's `Action::SubmitMessage`.
//! A REST call finishes? That's `Action::ApiCompleted`.
//! The channel task reports a change? That's `Action::Channel(update)`.
//!
//! The `update()` function takes the current state and an action,
//! mutates the state, and returns an [`Effect`] describing the I/O the
//! adapter should perform. No side effects here.
//!
//! ```text
//! State + Action  →  update()  →  New State + Effect
//! ```

use log::{debug, info, warn};

use crate::api::{
    ApiError, ApiRequest, ApiResponse, CallOutcome, Credentials, NewAgent, NewRoom, ProfileUpdate,
    Room,
};
use crate::channel::{ChannelRequest, ChannelState, ChannelUpdate, Notice};
use crate::core::compose::{ComposeError, Outgoing, compose};
use crate::core::state::{App, AuthRecovery, ChatView, Screen};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// First action after startup; optionally joins a room.
    Init { default_room: Option<String> },
    Quit,
    Navigate(Screen),
    SubmitLogin(Credentials),
    SubmitRegister(Credentials),
    Logout,
    RefreshRooms,
    CreateRoom { name: String, is_public: bool },
    JoinRoom(String),
    LeaveRoom,
    SubmitMessage(String),
    Typing,
    React { message_id: String, symbol: String },
    DismissError,
    RefreshAgents,
    CreateAgent(NewAgent),
    ToggleAgent(i64),
    ToggleRoomAgent(i64),
    ToggleRoomCommand(String),
    UpdateProfile(ProfileUpdate),
    ApiCompleted {
        request: ApiRequest,
        outcome: CallOutcome,
    },
    Channel(ChannelUpdate),
}

/// I/O the adapter performs after an update.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    Quit,
    Api(ApiRequest),
    Channel(ChannelRequest),
    SaveSession,
    Batch(Vec<Effect>),
}

impl Effect {
    /// Flattens nested batches into a list, dropping `None`.
    pub fn into_vec(self) -> Vec<Effect> {
        match self {
            Effect::None => Vec::new(),
            Effect::Batch(effects) => effects.into_iter().flat_map(Effect::into_vec).collect(),
            other => vec![other],
        }
    }
}

fn batch(mut effects: Vec<Effect>) -> Effect {
    match effects.len() {
        0 => Effect::None,
        1 => effects.pop().unwrap_or(Effect::None),
        _ => Effect::Batch(effects),
    }
}

/// Queues a REST call and counts it as in flight.
fn api(app: &mut App, request: ApiRequest) -> Effect {
    app.in_flight += 1;
    Effect::Api(request)
}

pub fn update(app: &mut App, action: Action) -> Effect {
    match action {
        Action::Init { default_room } => {
            let mut effects = Vec::new();
            if app.session.is_authenticated() {
                effects.push(api(app, ApiRequest::Me));
            }
            if app.screen == Screen::Rooms {
                effects.push(api(app, ApiRequest::ListRooms));
            }
            if let Some(room) = default_room {
                effects.push(update(app, Action::JoinRoom(room)));
            }
            batch(effects)
        }
        Action::Quit => Effect::Quit,
        Action::Navigate(screen) => navigate(app, screen),
        Action::SubmitLogin(credentials) => {
            if credentials.username.trim().is_empty() || credentials.password.is_empty() {
                app.error = Some("Username and password are required".to_string());
                return Effect::None;
            }
            app.error = None;
            app.status_message = format!("Logging in as {}...", credentials.username);
            api(app, ApiRequest::Login(credentials))
        }
        Action::SubmitRegister(credentials) => {
            if credentials.username.trim().is_empty() || credentials.password.is_empty() {
                app.error = Some("Username and password are required".to_string());
                return Effect::None;
            }
            app.error = None;
            app.status_message = "Creating account...".to_string();
            api(app, ApiRequest::Register(credentials))
        }
        Action::Logout => {
            info!("Logging out {}", app.session.username);
            app.session.clear_tokens();
            app.profile = None;
            app.status_message = "Logged out".to_string();
            let mut effects = vec![Effect::SaveSession];
            if leave_chat(app) {
                effects.insert(0, Effect::Channel(ChannelRequest::Disconnect));
            }
            app.screen = if app.allow_anonymous {
                Screen::Rooms
            } else {
                Screen::Login
            };
            batch(effects)
        }
        Action::RefreshRooms => api(app, ApiRequest::ListRooms),
        Action::CreateRoom { name, is_public } => {
            let name = name.trim().to_string();
            if name.is_empty() {
                app.error = Some("Room name cannot be empty".to_string());
                return Effect::None;
            }
            if !app.session.is_authenticated() {
                return require_login(app, "Log in to create rooms");
            }
            api(
                app,
                ApiRequest::CreateRoom(NewRoom {
                    name,
                    is_public,
                    user_ids: Vec::new(),
                }),
            )
        }
        Action::JoinRoom(room) => join_room(app, room),
        Action::LeaveRoom => {
            let was_in_room = leave_chat(app);
            app.screen = Screen::Rooms;
            if was_in_room {
                Effect::Channel(ChannelRequest::Disconnect)
            } else {
                Effect::None
            }
        }
        Action::SubmitMessage(text) => submit_message(app, &text),
        Action::Typing => {
            if app.chat.state == ChannelState::Open {
                Effect::Channel(ChannelRequest::Typing)
            } else {
                Effect::None
            }
        }
        Action::React { message_id, symbol } => {
            Effect::Channel(ChannelRequest::React { message_id, symbol })
        }
        Action::DismissError => {
            app.error = None;
            Effect::None
        }
        Action::RefreshAgents => api(app, ApiRequest::ListAgents),
        Action::CreateAgent(agent) => {
            if agent.name.trim().is_empty() {
                app.error = Some("Agent name cannot be empty".to_string());
                return Effect::None;
            }
            api(app, ApiRequest::CreateAgent(agent))
        }
        Action::ToggleAgent(agent_id) => {
            let Some(agent) = app.agents.iter().find(|a| a.id == agent_id) else {
                return Effect::None;
            };
            let is_active = !agent.is_active;
            api(
                app,
                ApiRequest::SetAgentActive {
                    agent_id,
                    is_active,
                },
            )
        }
        Action::ToggleRoomAgent(agent_id) => {
            let Some(room) = moderated_room(app) else {
                return Effect::None;
            };
            let is_active = !room.agents.iter().any(|a| a.id == agent_id);
            let room_id = room.id;
            api(
                app,
                ApiRequest::SetRoomAgent {
                    room_id,
                    agent_id,
                    is_active,
                },
            )
        }
        Action::ToggleRoomCommand(command) => {
            let Some(room) = moderated_room(app) else {
                return Effect::None;
            };
            let is_active = !room.active_commands.contains(&command);
            let room_id = room.id;
            api(
                app,
                ApiRequest::SetRoomCommand {
                    room_id,
                    command,
                    is_active,
                },
            )
        }
        Action::UpdateProfile(profile_update) => {
            if !app.session.is_authenticated() {
                return require_login(app, "Log in to edit your profile");
            }
            api(app, ApiRequest::UpdateMe(profile_update))
        }
        Action::ApiCompleted { request, outcome } => api_completed(app, request, outcome),
        Action::Channel(channel_update) => channel_update_received(app, channel_update),
    }
}

fn navigate(app: &mut App, screen: Screen) -> Effect {
    debug!("Navigate {:?} -> {:?}", app.screen, screen);
    match screen {
        Screen::Chat if app.chat.room.is_none() => {
            app.status_message = "Join a room first".to_string();
            Effect::None
        }
        Screen::Profile if !app.session.is_authenticated() => {
            require_login(app, "Log in to view your profile")
        }
        Screen::Rooms => {
            app.screen = screen;
            api(app, ApiRequest::ListRooms)
        }
        Screen::Agents => {
            app.screen = screen;
            api(app, ApiRequest::ListAgents)
        }
        Screen::Profile => {
            app.screen = screen;
            api(app, ApiRequest::Me)
        }
        _ => {
            app.screen = screen;
            Effect::None
        }
    }
}

fn require_login(app: &mut App, reason: &str) -> Effect {
    app.error = Some(reason.to_string());
    app.screen = Screen::Login;
    Effect::None
}

fn join_room(app: &mut App, room: String) -> Effect {
    let room = room.trim().to_string();
    if room.is_empty() {
        return Effect::None;
    }
    if !app.session.is_authenticated() && !app.allow_anonymous {
        return require_login(app, "Log in to join rooms");
    }
    info!("Joining room {room}");
    if app.chat.room.as_deref() != Some(room.as_str()) {
        app.chat = ChatView {
            room: Some(room.clone()),
            ..Default::default()
        };
    }
    app.error = None;
    app.screen = Screen::Chat;
    app.status_message = format!("Joined #{room}");
    Effect::Channel(ChannelRequest::Connect {
        room,
        session: app.session.clone(),
    })
}

/// Forgets the chat view. Returns whether a room was active.
fn leave_chat(app: &mut App) -> bool {
    let was_in_room = app.chat.room.is_some();
    app.chat = ChatView::default();
    was_in_room
}

fn moderated_room(app: &mut App) -> Option<&Room> {
    if !app.is_moderator() {
        app.error = Some("Only moderators can change room settings".to_string());
        return None;
    }
    if app.current_room().is_none() {
        app.error = Some("Join a room to manage it".to_string());
        return None;
    }
    app.current_room()
}

fn submit_message(app: &mut App, text: &str) -> Effect {
    let outgoing = match compose(text) {
        Ok(outgoing) => outgoing,
        Err(ComposeError::Empty) => return Effect::None,
        Err(e) => {
            app.error = Some(e.to_string());
            return Effect::None;
        }
    };

    if let Outgoing::Command { command, .. } = &outgoing
        && let Some(room) = app.current_room()
        && !room.active_commands.iter().any(|c| c == command)
    {
        app.error = Some(format!("{command} is not enabled in this room"));
        return Effect::None;
    }

    if app.chat.state != ChannelState::Open {
        // The channel drops sends while not open; say so instead of failing silently
        app.status_message = "Not connected, message not sent".to_string();
        return Effect::None;
    }

    Effect::Channel(ChannelRequest::Send(outgoing.into_wire()))
}

fn api_completed(app: &mut App, request: ApiRequest, outcome: CallOutcome) -> Effect {
    app.in_flight = app.in_flight.saturating_sub(1);
    let mut effects = Vec::new();

    if let Some(tokens) = &outcome.refreshed {
        info!("Access token refreshed");
        app.session.apply_tokens(tokens);
        effects.push(Effect::SaveSession);
    }

    if request == ApiRequest::Me && app.chat.auth_recovery == AuthRecovery::Verifying {
        if outcome.result.is_ok() {
            rejoin_verified(app, &mut effects);
        } else {
            app.chat.auth_recovery = AuthRecovery::Idle;
        }
    }

    match outcome.result {
        Ok(response) => api_succeeded(app, &request, response, &mut effects),
        Err(ApiError::Unauthorized) if request.is_credential_call() => {
            app.error = Some("Incorrect username or password".to_string());
        }
        Err(ApiError::Unauthorized) => expire_session(app, &mut effects),
        Err(e) => {
            warn!("{:?} failed: {}", request, e);
            app.error = Some(e.to_string());
        }
    }
    batch(effects)
}

fn api_succeeded(
    app: &mut App,
    request: &ApiRequest,
    response: ApiResponse,
    effects: &mut Vec<Effect>,
) {
    match response {
        ApiResponse::LoggedIn(tokens) => {
            if let ApiRequest::Login(credentials) = request {
                app.session.username = credentials.username.clone();
            }
            app.session.apply_tokens(&tokens);
            app.login_hint = None;
            app.error = None;
            app.status_message = format!("Logged in as {}", app.session.username);
            if leave_chat(app) {
                effects.push(Effect::Channel(ChannelRequest::Disconnect));
            }
            app.screen = Screen::Rooms;
            effects.push(Effect::SaveSession);
            effects.push(api(app, ApiRequest::Me));
            effects.push(api(app, ApiRequest::ListRooms));
        }
        ApiResponse::Registered(profile) => {
            app.status_message = format!("Account {} created, please log in", profile.username);
            app.login_hint = Some(profile.username);
            app.screen = Screen::Login;
        }
        ApiResponse::Profile(profile) => {
            if matches!(request, ApiRequest::UpdateMe(_)) {
                app.status_message = "Profile updated".to_string();
            }
            if app.session.username != profile.username {
                app.session.username = profile.username.clone();
                effects.push(Effect::SaveSession);
            }
            app.profile = Some(profile);
        }
        ApiResponse::Rooms(rooms) => {
            app.status_message = format!("{} rooms", rooms.len());
            app.rooms = rooms;
        }
        ApiResponse::RoomCreated(room) => {
            app.status_message = format!("Created #{}", room.name);
            app.rooms.retain(|r| r.id != room.id);
            app.rooms.push(room);
        }
        ApiResponse::Agents(agents) => {
            app.agents = agents;
        }
        ApiResponse::AgentSaved(agent) => {
            app.status_message = format!(
                "Agent {} {}",
                agent.name,
                if agent.is_active { "active" } else { "inactive" }
            );
            match app.agents.iter_mut().find(|a| a.id == agent.id) {
                Some(existing) => *existing = agent,
                None => app.agents.push(agent),
            }
        }
        ApiResponse::RoomAgentToggled {
            room_id,
            agent_id,
            is_active,
        } => {
            let agent = app.agents.iter().find(|a| a.id == agent_id).cloned();
            if let Some(room) = app.rooms.iter_mut().find(|r| r.id == room_id) {
                room.agents.retain(|a| a.id != agent_id);
                if is_active && let Some(agent) = agent {
                    room.agents.push(agent);
                }
            }
            app.status_message = format!(
                "Agent {} in room",
                if is_active { "enabled" } else { "disabled" }
            );
        }
        ApiResponse::CommandToggled(toggle) => {
            if let Some(room) = app.rooms.iter_mut().find(|r| r.id == toggle.room_id) {
                room.active_commands.retain(|c| c != &toggle.command);
                if toggle.is_active {
                    room.active_commands.push(toggle.command.clone());
                }
            }
            app.status_message = format!(
                "Command {} {}",
                toggle.command,
                if toggle.is_active { "enabled" } else { "disabled" }
            );
        }
    }
}

/// Tokens are no good and could not be refreshed: back to login.
fn expire_session(app: &mut App, effects: &mut Vec<Effect>) {
    warn!("Session for {} expired", app.session.username);
    app.session.clear_tokens();
    app.profile = None;
    if leave_chat(app) {
        effects.push(Effect::Channel(ChannelRequest::Disconnect));
    }
    app.error = Some("Session expired, please log in again".to_string());
    app.login_hint = Some(app.session.username.clone());
    app.screen = Screen::Login;
    effects.push(Effect::SaveSession);
}

fn channel_update_received(app: &mut App, channel_update: ChannelUpdate) -> Effect {
    match channel_update {
        ChannelUpdate::State(state) => {
            app.chat.state = state;
            if state == ChannelState::Open {
                app.chat.auth_recovery = AuthRecovery::Idle;
            }
            Effect::None
        }
        ChannelUpdate::RoomChanged(room) => {
            if app.chat.room.as_deref() != Some(room.as_str()) {
                app.chat = ChatView {
                    room: Some(room),
                    ..Default::default()
                };
            } else {
                app.chat.messages.clear();
                app.chat.typing.clear();
            }
            Effect::None
        }
        ChannelUpdate::MessageAppended(message) => {
            app.chat.messages.push(message);
            Effect::None
        }
        ChannelUpdate::MessageUpdated(message) => {
            if let Some(existing) = app.chat.messages.iter_mut().find(|m| m.id == message.id) {
                *existing = message;
            }
            Effect::None
        }
        ChannelUpdate::TypingChanged(users) => {
            app.chat.typing = users;
            Effect::None
        }
        ChannelUpdate::Notice(Notice::AuthRejected) => {
            app.chat.notice = Some(Notice::AuthRejected);
            auth_rejected(app)
        }
        ChannelUpdate::Notice(notice) => {
            app.chat.notice = Some(notice);
            Effect::None
        }
        ChannelUpdate::NoticeCleared => {
            app.chat.notice = None;
            Effect::None
        }
    }
}

/// The channel refused our token: refresh once and rejoin, else log in.
fn auth_rejected(app: &mut App) -> Effect {
    if !app.session.is_authenticated() {
        leave_chat(app);
        return require_login(app, "This room requires login");
    }
    match app.chat.auth_recovery {
        AuthRecovery::Verifying => Effect::None,
        AuthRecovery::Idle if app.session.refresh_token.is_some() => {
            app.chat.auth_recovery = AuthRecovery::Verifying;
            app.status_message = "Refreshing credentials...".to_string();
            // An authed call runs the refresh-and-retry path
            api(app, ApiRequest::Me)
        }
        AuthRecovery::Idle | AuthRecovery::Rejoined => {
            app.chat.auth_recovery = AuthRecovery::Idle;
            let mut effects = Vec::new();
            expire_session(app, &mut effects);
            batch(effects)
        }
    }
}

/// The token passed a `Me` check (refreshed or not): reconnect the room.
fn rejoin_verified(app: &mut App, effects: &mut Vec<Effect>) {
    match app.chat.room.clone() {
        Some(room) => {
            app.chat.auth_recovery = AuthRecovery::Rejoined;
            effects.push(Effect::Channel(ChannelRequest::Connect {
                room,
                session: app.session.clone(),
            }));
        }
        None => app.chat.auth_recovery = AuthRecovery::Idle,
    }
}

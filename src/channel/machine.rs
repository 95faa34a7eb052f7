//! # Channel State Machine
//!
//! The reconnect/dispatch logic for one room channel, with no I/O.
//!
//! ```text
//!                 connect()                  transport open
//! Disconnected ───────────────► Connecting ─────────────────► Open
//!      ▲                          ▲    │                        │
//!      │        reconnect due     │    │ close (cap exceeded,   │ close != 1000
//!      │   ┌──────────────────────┘    │  1000 or 1008)         │
//!      │   │                           ▼                        │
//!      │   └──── backoff wait ◄──── abnormal close ◄────────────┘
//!      │
//!      └──── Closing ◄── disconnect()
//! ```
//!
//! Every method takes the input, mutates state, and returns the
//! [`Command`]s the driver must execute. UI-facing changes accumulate as
//! [`ChannelUpdate`]s and are collected with [`ChannelMachine::take_updates`].
//!
//! Each transport attempt gets a fresh generation number. Callbacks tagged
//! with an older generation belong to a superseded connection and are dropped.

use std::fmt;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::time::Instant;

use crate::channel::backoff::ReconnectPolicy;
use crate::channel::event::{InboundEvent, OutboundEvent, parse_frame};
use crate::channel::log::{Message, MessageLog};
use crate::channel::typing::TypingSet;
use crate::core::session::SessionContext;

pub const NORMAL_CLOSURE: u16 = 1000;
pub const ABNORMAL_CLOSURE: u16 = 1006;
/// Sent by the server when the token is missing or invalid.
pub const POLICY_VIOLATION: u16 = 1008;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChannelState {
    #[default]
    Disconnected,
    Connecting,
    Open,
    Closing,
}

impl ChannelState {
    pub fn label(self) -> &'static str {
        match self {
            ChannelState::Disconnected => "offline",
            ChannelState::Connecting => "connecting",
            ChannelState::Open => "online",
            ChannelState::Closing => "closing",
        }
    }
}

/// Where a transport attempt should connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelTarget {
    pub room: String,
    pub token: Option<String>,
}

/// User-visible channel notices.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    ParseError(String),
    TransportError(String),
    Reconnecting { attempt: u32, delay: Duration },
    ReconnectExhausted { attempts: u32 },
    AuthRejected,
}

impl Notice {
    /// Blocking notices need user action; the rest clear themselves on reconnect.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Notice::ReconnectExhausted { .. } | Notice::AuthRejected)
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::ParseError(e) => write!(f, "Error parsing message from server: {e}"),
            Notice::TransportError(e) => write!(f, "Connection error: {e}"),
            Notice::Reconnecting { attempt, delay } => write!(
                f,
                "Connection lost. Reconnecting in {:.1}s (attempt {attempt})...",
                delay.as_secs_f32()
            ),
            Notice::ReconnectExhausted { attempts } => write!(
                f,
                "Unable to reconnect after {attempts} attempts. Rejoin the room to retry."
            ),
            Notice::AuthRejected => write!(f, "The server rejected your credentials."),
        }
    }
}

/// Changes the UI mirrors.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelUpdate {
    State(ChannelState),
    /// A different room was selected; the log and typing set were reset.
    RoomChanged(String),
    MessageAppended(Message),
    MessageUpdated(Message),
    TypingChanged(Vec<String>),
    Notice(Notice),
    NoticeCleared,
}

/// Side effects for the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Open { generation: u64, target: ChannelTarget },
    /// Close the live transport link (if any) with this code.
    Close { code: u16 },
    Transmit(String),
    ScheduleReconnect(Duration),
    CancelReconnect,
}

pub struct ChannelMachine {
    state: ChannelState,
    session: SessionContext,
    target: Option<ChannelTarget>,
    generation: u64,
    /// A transport link for `generation` exists and has not reported close.
    live: bool,
    attempt: u32,
    reconnect_pending: bool,
    policy: ReconnectPolicy,
    log: MessageLog,
    typing: TypingSet,
    notice: Option<Notice>,
    updates: Vec<ChannelUpdate>,
}

impl ChannelMachine {
    pub fn new(session: SessionContext, policy: ReconnectPolicy, typing: TypingSet) -> Self {
        Self {
            state: ChannelState::Disconnected,
            session,
            target: None,
            generation: 0,
            live: false,
            attempt: 0,
            reconnect_pending: false,
            policy,
            log: MessageLog::new(),
            typing,
            notice: None,
            updates: Vec::new(),
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    pub fn typing(&self) -> &TypingSet {
        &self.typing
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn target(&self) -> Option<&ChannelTarget> {
        self.target.as_ref()
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    pub fn take_updates(&mut self) -> Vec<ChannelUpdate> {
        std::mem::take(&mut self.updates)
    }

    // ------------------------------------------------------------------
    // UI-driven inputs
    // ------------------------------------------------------------------

    /// Opens a channel for `room`, superseding any live or pending one.
    pub fn connect(&mut self, room: &str, session: SessionContext) -> Vec<Command> {
        let mut commands = Vec::new();
        self.cancel_pending_reconnect(&mut commands);
        if self.live {
            info!("Superseding channel generation {}", self.generation);
            commands.push(Command::Close {
                code: NORMAL_CLOSURE,
            });
            self.live = false;
        }

        if self.target.as_ref().map(|t| t.room.as_str()) != Some(room) {
            self.log.clear();
            self.clear_typing();
            self.updates.push(ChannelUpdate::RoomChanged(room.to_string()));
        }

        self.target = Some(ChannelTarget {
            room: room.to_string(),
            token: session.access_token.clone(),
        });
        self.session = session;
        self.attempt = 0;
        self.open(&mut commands);
        commands
    }

    /// Closes the channel on purpose; no reconnect follows.
    pub fn disconnect(&mut self) -> Vec<Command> {
        let mut commands = Vec::new();
        self.cancel_pending_reconnect(&mut commands);
        self.clear_typing();
        if self.live {
            self.set_state(ChannelState::Closing);
            commands.push(Command::Close {
                code: NORMAL_CLOSURE,
            });
        } else {
            self.set_state(ChannelState::Disconnected);
        }
        commands
    }

    /// Builds a `message` frame. No-op unless the channel is open.
    pub fn send(&mut self, body: &str) -> Vec<Command> {
        if self.state != ChannelState::Open {
            debug!("Dropping message while {:?}", self.state);
            return Vec::new();
        }
        if body.trim().is_empty() {
            return Vec::new();
        }
        self.transmit(OutboundEvent::Message {
            id: Some(uuid::Uuid::new_v4().to_string()),
            message: body.to_string(),
            username: self.session.username.clone(),
        })
    }

    /// Builds a `typing` frame. No-op unless the channel is open.
    pub fn send_typing(&mut self) -> Vec<Command> {
        if self.state != ChannelState::Open {
            return Vec::new();
        }
        self.transmit(OutboundEvent::Typing {
            username: self.session.username.clone(),
        })
    }

    /// Adds the local user's reaction to a message in the log.
    pub fn react(&mut self, message_id: &str, symbol: &str) {
        let author = self.session.username.clone();
        if let Some(message) = self.log.add_reaction(message_id, symbol, &author) {
            self.updates.push(ChannelUpdate::MessageUpdated(message.clone()));
        }
    }

    // ------------------------------------------------------------------
    // Transport callbacks
    // ------------------------------------------------------------------

    pub fn on_open(&mut self, generation: u64) {
        if !self.is_current(generation) {
            return;
        }
        if self.state == ChannelState::Closing {
            debug!("Ignoring open of generation {generation} while closing");
            return;
        }
        info!("Channel generation {generation} open");
        self.set_state(ChannelState::Open);
        self.attempt = 0;
        if self.notice.take().is_some() {
            self.updates.push(ChannelUpdate::NoticeCleared);
        }
    }

    /// Dispatches one inbound text frame.
    pub fn on_frame(&mut self, generation: u64, raw: &str, unix_millis: i64, now: Instant) {
        if !self.is_current(generation) {
            return;
        }
        match parse_frame(raw) {
            Err(e) => {
                warn!("Channel {e}");
                self.set_notice(Notice::ParseError(e.0));
            }
            Ok(InboundEvent::Message {
                id,
                body,
                author,
                partial,
            }) => {
                let id = id.unwrap_or_else(|| self.log.synthesize_id(unix_millis));
                let mut message = Message::new(id, body, author);
                message.partial = partial;
                if self.log.append(message.clone()) {
                    self.updates.push(ChannelUpdate::MessageAppended(message));
                } else {
                    debug!("Duplicate message id {} ignored", message.id);
                }
            }
            Ok(InboundEvent::Typing { username }) => {
                self.typing.insert(&username, now);
                self.updates
                    .push(ChannelUpdate::TypingChanged(self.typing.users()));
            }
            Ok(InboundEvent::Ignored(kind)) => {
                debug!("Ignoring frame: {kind}");
            }
        }
    }

    /// Transport errors are informational; the close that follows drives recovery.
    pub fn on_error(&mut self, generation: u64, error: &str) {
        if !self.is_current(generation) {
            return;
        }
        warn!("Channel generation {generation} error: {error}");
        self.set_notice(Notice::TransportError(error.to_string()));
    }

    pub fn on_close(&mut self, generation: u64, code: u16) -> Vec<Command> {
        if !self.is_current(generation) {
            return Vec::new();
        }
        self.live = false;
        self.clear_typing();

        if self.state == ChannelState::Closing || code == NORMAL_CLOSURE {
            info!("Channel closed normally (code {code})");
            self.set_state(ChannelState::Disconnected);
            return Vec::new();
        }

        if code == POLICY_VIOLATION {
            warn!("Channel rejected by server (code {code})");
            self.set_state(ChannelState::Disconnected);
            self.set_notice(Notice::AuthRejected);
            return Vec::new();
        }

        self.attempt += 1;
        match self.policy.delay_for(self.attempt) {
            Some(delay) => {
                info!(
                    "Channel closed abnormally (code {code}), reconnect {} in {:?}",
                    self.attempt, delay
                );
                self.reconnect_pending = true;
                self.set_state(ChannelState::Connecting);
                self.set_notice(Notice::Reconnecting {
                    attempt: self.attempt,
                    delay,
                });
                vec![Command::ScheduleReconnect(delay)]
            }
            None => {
                let attempts = self.attempt - 1;
                warn!("Giving up after {attempts} reconnect attempts");
                self.set_state(ChannelState::Disconnected);
                self.set_notice(Notice::ReconnectExhausted { attempts });
                Vec::new()
            }
        }
    }

    // ------------------------------------------------------------------
    // Timers
    // ------------------------------------------------------------------

    /// The backoff deadline passed.
    pub fn on_reconnect_due(&mut self) -> Vec<Command> {
        if !self.reconnect_pending {
            return Vec::new();
        }
        self.reconnect_pending = false;
        let mut commands = Vec::new();
        if self.target.is_some() {
            self.open(&mut commands);
        }
        commands
    }

    /// Expires stale typing entries.
    pub fn on_tick(&mut self, now: Instant) {
        if !self.typing.expire(now).is_empty() {
            self.updates
                .push(ChannelUpdate::TypingChanged(self.typing.users()));
        }
    }

    pub fn next_typing_deadline(&self) -> Option<Instant> {
        self.typing.next_deadline()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn is_current(&self, generation: u64) -> bool {
        if generation != self.generation || !self.live {
            debug!(
                "Dropping callback from stale generation {generation} (current {})",
                self.generation
            );
            return false;
        }
        true
    }

    fn open(&mut self, commands: &mut Vec<Command>) {
        let Some(target) = self.target.clone() else {
            return;
        };
        self.generation += 1;
        self.live = true;
        self.set_state(ChannelState::Connecting);
        commands.push(Command::Open {
            generation: self.generation,
            target,
        });
    }

    fn cancel_pending_reconnect(&mut self, commands: &mut Vec<Command>) {
        if self.reconnect_pending {
            self.reconnect_pending = false;
            commands.push(Command::CancelReconnect);
        }
    }

    fn transmit(&mut self, event: OutboundEvent) -> Vec<Command> {
        match event.to_frame() {
            Ok(frame) => vec![Command::Transmit(frame)],
            Err(e) => {
                warn!("Failed to encode outbound frame: {e}");
                Vec::new()
            }
        }
    }

    fn set_state(&mut self, state: ChannelState) {
        if self.state != state {
            debug!("Channel state {:?} -> {:?}", self.state, state);
            self.state = state;
            self.updates.push(ChannelUpdate::State(state));
        }
    }

    fn set_notice(&mut self, notice: Notice) {
        self.notice = Some(notice.clone());
        self.updates.push(ChannelUpdate::Notice(notice));
    }

    fn clear_typing(&mut self) {
        if !self.typing.is_empty() {
            self.typing.clear();
            self.updates.push(ChannelUpdate::TypingChanged(Vec::new()));
        }
    }
}

//! # Realtime Channel
//!
//! One reconnecting WebSocket per room. The pure [`machine`] decides what
//! to do; the [`manager`] task performs it against a [`transport`].

pub mod backoff;
pub mod event;
pub mod log;
pub mod machine;
pub mod manager;
pub mod transport;
pub mod typing;

pub use backoff::ReconnectPolicy;
pub use log::{Message, MessageLog, REACTIONS};
pub use machine::{ChannelMachine, ChannelState, ChannelUpdate, Notice};
pub use manager::{ChannelHandle, ChannelRequest, spawn_channel};
pub use transport::{Connector, WsConnector};
pub use typing::TypingSet;

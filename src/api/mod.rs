//! # Chat Server API
//!
//! Typed access to the chat server's REST endpoints: accounts, tokens,
//! profile, rooms and agents. The real-time traffic goes through
//! [`crate::channel`] instead.

mod client;
mod error;
mod types;

pub use client::{ApiRequest, ApiResponse, CallOutcome, ChatApi, HttpApi, call_with_refresh, dispatch};
pub use error::ApiError;
pub use types::{
    Agent, CommandToggle, Credentials, NewAgent, NewRoom, ProfileUpdate, ROOM_COMMANDS, Room,
    TokenPair, UserProfile,
};

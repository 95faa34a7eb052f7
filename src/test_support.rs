//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use async_trait::async_trait;

use crate::api::{
    Agent, ApiError, ChatApi, CommandToggle, Credentials, NewAgent, NewRoom, ProfileUpdate, Room,
    TokenPair, UserProfile,
};
use crate::channel::{ChannelMachine, ReconnectPolicy, TypingSet};
use crate::core::session::SessionContext;
use crate::core::state::App;

/// An API that answers without a server.
///
/// With `valid_token` set, authed calls using any other token fail with
/// `Unauthorized`, and `refresh` issues `valid_token`.
#[derive(Default)]
pub struct NoopApi {
    pub valid_token: Option<String>,
}

impl NoopApi {
    fn check(&self, token: Option<&str>) -> Result<(), ApiError> {
        match &self.valid_token {
            Some(valid) if token != Some(valid.as_str()) => Err(ApiError::Unauthorized),
            _ => Ok(()),
        }
    }
}

pub fn test_profile() -> UserProfile {
    UserProfile {
        id: 1,
        username: "tester".to_string(),
        is_moderator: false,
        avatar: None,
        status: "online".to_string(),
    }
}

#[async_trait]
impl ChatApi for NoopApi {
    async fn register(&self, credentials: &Credentials) -> Result<UserProfile, ApiError> {
        Ok(UserProfile {
            username: credentials.username.clone(),
            ..test_profile()
        })
    }

    async fn login(&self, _credentials: &Credentials) -> Result<TokenPair, ApiError> {
        Ok(TokenPair {
            access_token: "access-token".to_string(),
            refresh_token: Some("refresh-token".to_string()),
            token_type: "bearer".to_string(),
        })
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<TokenPair, ApiError> {
        let access_token = self.valid_token.clone().ok_or(ApiError::Unauthorized)?;
        Ok(TokenPair {
            access_token,
            refresh_token: None,
            token_type: "bearer".to_string(),
        })
    }

    async fn me(&self, token: Option<&str>) -> Result<UserProfile, ApiError> {
        self.check(token)?;
        Ok(test_profile())
    }

    async fn update_me(
        &self,
        token: Option<&str>,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, ApiError> {
        self.check(token)?;
        let mut profile = test_profile();
        if let Some(status) = &update.status {
            profile.status = status.clone();
        }
        profile.avatar = update.avatar.clone();
        Ok(profile)
    }

    async fn list_rooms(&self, token: Option<&str>) -> Result<Vec<Room>, ApiError> {
        self.check(token)?;
        Ok(Vec::new())
    }

    async fn create_room(&self, token: Option<&str>, room: &NewRoom) -> Result<Room, ApiError> {
        self.check(token)?;
        Ok(test_room(1, &room.name))
    }

    async fn list_agents(&self, token: Option<&str>) -> Result<Vec<Agent>, ApiError> {
        self.check(token)?;
        Ok(Vec::new())
    }

    async fn create_agent(
        &self,
        token: Option<&str>,
        agent: &NewAgent,
    ) -> Result<Agent, ApiError> {
        self.check(token)?;
        Ok(Agent {
            id: 1,
            name: agent.name.clone(),
            is_active: true,
        })
    }

    async fn set_agent_active(
        &self,
        token: Option<&str>,
        agent_id: i64,
        is_active: bool,
    ) -> Result<Agent, ApiError> {
        self.check(token)?;
        Ok(Agent {
            id: agent_id,
            name: format!("Agent{agent_id}"),
            is_active,
        })
    }

    async fn set_room_agent(
        &self,
        token: Option<&str>,
        _room_id: i64,
        _agent_id: i64,
        _is_active: bool,
    ) -> Result<(), ApiError> {
        self.check(token)
    }

    async fn set_room_command(
        &self,
        token: Option<&str>,
        room_id: i64,
        command: &str,
        is_active: bool,
    ) -> Result<CommandToggle, ApiError> {
        self.check(token)?;
        Ok(CommandToggle {
            message: String::new(),
            room_id,
            command: command.to_string(),
            is_active,
        })
    }
}

pub fn test_room(id: i64, name: &str) -> Room {
    Room {
        id,
        name: name.to_string(),
        is_public: true,
        created_by: Some(1),
        users: Vec::new(),
        agents: Vec::new(),
        active_commands: Vec::new(),
    }
}

/// A logged-in session for user `tester`.
pub fn test_session() -> SessionContext {
    SessionContext {
        username: "tester".to_string(),
        access_token: Some("access-token".to_string()),
        refresh_token: Some("refresh-token".to_string()),
    }
}

/// A machine with default backoff and typing expiry.
pub fn test_machine() -> ChannelMachine {
    ChannelMachine::new(
        test_session(),
        ReconnectPolicy::default(),
        TypingSet::default(),
    )
}

/// An App logged in as `tester`, sitting on the room list.
pub fn test_app() -> App {
    App::new(test_session(), true)
}

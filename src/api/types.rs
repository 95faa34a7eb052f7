use serde::{Deserialize, Serialize};

/// Username/password pair for `/register` and `/token`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Tokens issued by `/token` and `/token/refresh`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    /// Not every server issues one; a missing value keeps the previous token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

#[derive(Serialize, Debug)]
pub(crate) struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub is_moderator: bool,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub status: String,
}

/// Body for `PUT /users/me`. Unset fields are left alone by the server.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Agent {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: i64,
    pub name: String,
    #[serde(default = "default_true")]
    pub is_public: bool,
    #[serde(default)]
    pub created_by: Option<i64>,
    #[serde(default)]
    pub users: Vec<UserProfile>,
    #[serde(default)]
    pub agents: Vec<Agent>,
    #[serde(default)]
    pub active_commands: Vec<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct NewRoom {
    pub name: String,
    pub is_public: bool,
    pub user_ids: Vec<i64>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct NewAgent {
    pub name: String,
    pub personality: String,
    pub context: String,
}

#[derive(Serialize, Debug)]
pub(crate) struct AgentActiveUpdate {
    pub is_active: bool,
}

/// Server acknowledgement for a room command toggle.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CommandToggle {
    #[serde(default)]
    pub message: String,
    pub room_id: i64,
    pub command: String,
    pub is_active: bool,
}

/// Server-side chat commands a moderator can toggle per room.
pub const ROOM_COMMANDS: [&str; 3] = ["iask", "iatranslate", "isummarize"];

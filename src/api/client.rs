//! REST client for the chat server.

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use super::error::{ApiError, error_message};
use super::types::{
    Agent, AgentActiveUpdate, CommandToggle, Credentials, NewAgent, NewRoom, ProfileUpdate,
    RefreshRequest, Room, TokenPair, UserProfile,
};
use crate::core::session::SessionContext;

#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn register(&self, credentials: &Credentials) -> Result<UserProfile, ApiError>;

    async fn login(&self, credentials: &Credentials) -> Result<TokenPair, ApiError>;

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError>;

    async fn me(&self, token: Option<&str>) -> Result<UserProfile, ApiError>;

    async fn update_me(
        &self,
        token: Option<&str>,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, ApiError>;

    async fn list_rooms(&self, token: Option<&str>) -> Result<Vec<Room>, ApiError>;

    async fn create_room(&self, token: Option<&str>, room: &NewRoom) -> Result<Room, ApiError>;

    async fn list_agents(&self, token: Option<&str>) -> Result<Vec<Agent>, ApiError>;

    async fn create_agent(&self, token: Option<&str>, agent: &NewAgent)
    -> Result<Agent, ApiError>;

    async fn set_agent_active(
        &self,
        token: Option<&str>,
        agent_id: i64,
        is_active: bool,
    ) -> Result<Agent, ApiError>;

    /// Moderator only.
    async fn set_room_agent(
        &self,
        token: Option<&str>,
        room_id: i64,
        agent_id: i64,
        is_active: bool,
    ) -> Result<(), ApiError>;

    /// Moderator only.
    async fn set_room_command(
        &self,
        token: Option<&str>,
        room_id: i64,
        command: &str,
        is_active: bool,
    ) -> Result<CommandToggle, ApiError>;
}

/// [`ChatApi`] over HTTP with reqwest.
pub struct HttpApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, builder: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

/// Sends the request and maps non-success statuses to [`ApiError`].
async fn send(builder: RequestBuilder) -> Result<reqwest::Response, ApiError> {
    let response = builder
        .send()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;

    let status = response.status();
    debug!("{} -> {}", response.url().path(), status);
    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized);
    }
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        warn!("API error: {} - {}", status, body);
        return Err(ApiError::Api {
            status: status.as_u16(),
            message: error_message(&body),
        });
    }
    Ok(response)
}

async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ApiError> {
    let body = send(builder)
        .await?
        .text()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;
    serde_json::from_str(&body).map_err(|e| ApiError::Parse(e.to_string()))
}

#[async_trait]
impl ChatApi for HttpApi {
    async fn register(&self, credentials: &Credentials) -> Result<UserProfile, ApiError> {
        info!("Registering user {}", credentials.username);
        send_json(self.client.post(self.url("/register")).json(credentials)).await
    }

    async fn login(&self, credentials: &Credentials) -> Result<TokenPair, ApiError> {
        info!("Logging in as {}", credentials.username);
        let form = [
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
        ];
        send_json(self.client.post(self.url("/token")).form(&form)).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        info!("Refreshing access token");
        send_json(
            self.client
                .post(self.url("/token/refresh"))
                .json(&RefreshRequest { refresh_token }),
        )
        .await
    }

    async fn me(&self, token: Option<&str>) -> Result<UserProfile, ApiError> {
        send_json(self.authed(self.client.get(self.url("/users/me")), token)).await
    }

    async fn update_me(
        &self,
        token: Option<&str>,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, ApiError> {
        send_json(
            self.authed(self.client.put(self.url("/users/me")), token)
                .json(update),
        )
        .await
    }

    async fn list_rooms(&self, token: Option<&str>) -> Result<Vec<Room>, ApiError> {
        send_json(self.authed(self.client.get(self.url("/rooms")), token)).await
    }

    async fn create_room(&self, token: Option<&str>, room: &NewRoom) -> Result<Room, ApiError> {
        info!("Creating room {}", room.name);
        send_json(
            self.authed(self.client.post(self.url("/rooms")), token)
                .json(room),
        )
        .await
    }

    async fn list_agents(&self, token: Option<&str>) -> Result<Vec<Agent>, ApiError> {
        send_json(self.authed(self.client.get(self.url("/agents")), token)).await
    }

    async fn create_agent(
        &self,
        token: Option<&str>,
        agent: &NewAgent,
    ) -> Result<Agent, ApiError> {
        info!("Creating agent {}", agent.name);
        send_json(
            self.authed(self.client.post(self.url("/agents")), token)
                .json(agent),
        )
        .await
    }

    async fn set_agent_active(
        &self,
        token: Option<&str>,
        agent_id: i64,
        is_active: bool,
    ) -> Result<Agent, ApiError> {
        send_json(
            self.authed(
                self.client.patch(self.url(&format!("/agents/{agent_id}"))),
                token,
            )
            .json(&AgentActiveUpdate { is_active }),
        )
        .await
    }

    async fn set_room_agent(
        &self,
        token: Option<&str>,
        room_id: i64,
        agent_id: i64,
        is_active: bool,
    ) -> Result<(), ApiError> {
        let url = self.url(&format!("/rooms/{room_id}/agents/{agent_id}"));
        send(
            self.authed(self.client.post(url), token)
                .query(&[("is_active", is_active)]),
        )
        .await?;
        Ok(())
    }

    async fn set_room_command(
        &self,
        token: Option<&str>,
        room_id: i64,
        command: &str,
        is_active: bool,
    ) -> Result<CommandToggle, ApiError> {
        let url = self.url(&format!("/rooms/{room_id}/commands/{command}"));
        send_json(
            self.authed(self.client.post(url), token)
                .query(&[("is_active", is_active)]),
        )
        .await
    }
}

/// A REST call as plain data, so the core can request it without doing I/O.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiRequest {
    Register(Credentials),
    Login(Credentials),
    Me,
    UpdateMe(ProfileUpdate),
    ListRooms,
    CreateRoom(NewRoom),
    ListAgents,
    CreateAgent(NewAgent),
    SetAgentActive {
        agent_id: i64,
        is_active: bool,
    },
    SetRoomAgent {
        room_id: i64,
        agent_id: i64,
        is_active: bool,
    },
    SetRoomCommand {
        room_id: i64,
        command: String,
        is_active: bool,
    },
}

impl ApiRequest {
    /// Credential calls never carry a bearer token and are never refreshed.
    pub fn is_credential_call(&self) -> bool {
        matches!(self, ApiRequest::Register(_) | ApiRequest::Login(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    Registered(UserProfile),
    LoggedIn(TokenPair),
    Profile(UserProfile),
    Rooms(Vec<Room>),
    RoomCreated(Room),
    Agents(Vec<Agent>),
    AgentSaved(Agent),
    RoomAgentToggled {
        room_id: i64,
        agent_id: i64,
        is_active: bool,
    },
    CommandToggled(CommandToggle),
}

/// Runs one request against `api`.
pub async fn dispatch(
    api: &dyn ChatApi,
    request: &ApiRequest,
    token: Option<&str>,
) -> Result<ApiResponse, ApiError> {
    Ok(match request {
        ApiRequest::Register(credentials) => ApiResponse::Registered(api.register(credentials).await?),
        ApiRequest::Login(credentials) => ApiResponse::LoggedIn(api.login(credentials).await?),
        ApiRequest::Me => ApiResponse::Profile(api.me(token).await?),
        ApiRequest::UpdateMe(update) => ApiResponse::Profile(api.update_me(token, update).await?),
        ApiRequest::ListRooms => ApiResponse::Rooms(api.list_rooms(token).await?),
        ApiRequest::CreateRoom(room) => ApiResponse::RoomCreated(api.create_room(token, room).await?),
        ApiRequest::ListAgents => ApiResponse::Agents(api.list_agents(token).await?),
        ApiRequest::CreateAgent(agent) => {
            ApiResponse::AgentSaved(api.create_agent(token, agent).await?)
        }
        ApiRequest::SetAgentActive {
            agent_id,
            is_active,
        } => ApiResponse::AgentSaved(api.set_agent_active(token, *agent_id, *is_active).await?),
        ApiRequest::SetRoomAgent {
            room_id,
            agent_id,
            is_active,
        } => {
            api.set_room_agent(token, *room_id, *agent_id, *is_active)
                .await?;
            ApiResponse::RoomAgentToggled {
                room_id: *room_id,
                agent_id: *agent_id,
                is_active: *is_active,
            }
        }
        ApiRequest::SetRoomCommand {
            room_id,
            command,
            is_active,
        } => ApiResponse::CommandToggled(
            api.set_room_command(token, *room_id, command, *is_active)
                .await?,
        ),
    })
}

/// Result of [`call_with_refresh`]. `refreshed` is set whenever new tokens
/// were issued, even if the retried call then failed.
#[derive(Debug, Clone, PartialEq)]
pub struct CallOutcome {
    pub result: Result<ApiResponse, ApiError>,
    pub refreshed: Option<TokenPair>,
}

/// Runs `request`; on 401 refreshes the access token once and retries.
///
/// A failed refresh, or no refresh token at all, surfaces as
/// [`ApiError::Unauthorized`] so the caller can send the user to login.
pub async fn call_with_refresh(
    api: &dyn ChatApi,
    request: &ApiRequest,
    session: &SessionContext,
) -> CallOutcome {
    let token = session.access_token.as_deref();
    let first = dispatch(api, request, token).await;

    let needs_refresh = matches!(first, Err(ApiError::Unauthorized)) && !request.is_credential_call();
    let refresh_token = match (&session.refresh_token, needs_refresh) {
        (Some(refresh_token), true) => refresh_token,
        _ => {
            return CallOutcome {
                result: first,
                refreshed: None,
            };
        }
    };

    info!("Access token rejected, attempting refresh");
    match api.refresh(refresh_token).await {
        Ok(tokens) => {
            let result = dispatch(api, request, Some(&tokens.access_token)).await;
            CallOutcome {
                result,
                refreshed: Some(tokens),
            }
        }
        Err(e) => {
            warn!("Token refresh failed: {e}");
            CallOutcome {
                result: Err(ApiError::Unauthorized),
                refreshed: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{NoopApi, test_session};

    #[test]
    fn test_http_api_trims_trailing_slash() {
        let api = HttpApi::new("http://localhost:8000/");
        assert_eq!(api.url("/rooms"), "http://localhost:8000/rooms");
    }

    #[test]
    fn test_credential_calls() {
        let credentials = Credentials {
            username: "a".to_string(),
            password: "b".to_string(),
        };
        assert!(ApiRequest::Login(credentials.clone()).is_credential_call());
        assert!(ApiRequest::Register(credentials).is_credential_call());
        assert!(!ApiRequest::ListRooms.is_credential_call());
    }

    #[tokio::test]
    async fn test_dispatch_routes_to_trait() {
        let api = NoopApi::default();
        let response = dispatch(&api, &ApiRequest::ListRooms, None).await.unwrap();
        assert_eq!(response, ApiResponse::Rooms(Vec::new()));
    }

    #[tokio::test]
    async fn test_refresh_then_retry() {
        let api = NoopApi {
            valid_token: Some("fresh".to_string()),
            ..Default::default()
        };
        let outcome = call_with_refresh(&api, &ApiRequest::Me, &test_session()).await;
        assert!(outcome.result.is_ok());
        assert_eq!(
            outcome.refreshed.map(|t| t.access_token),
            Some("fresh".to_string())
        );
    }

    #[tokio::test]
    async fn test_no_refresh_token_surfaces_unauthorized() {
        let api = NoopApi {
            valid_token: Some("fresh".to_string()),
            ..Default::default()
        };
        let mut session = test_session();
        session.refresh_token = None;
        let outcome = call_with_refresh(&api, &ApiRequest::Me, &session).await;
        assert_eq!(outcome.result, Err(ApiError::Unauthorized));
        assert!(outcome.refreshed.is_none());
    }
}

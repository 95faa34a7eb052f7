use roomtalk::api::{
    ApiError, ApiRequest, ApiResponse, ChatApi, Credentials, HttpApi, NewRoom, ProfileUpdate,
    call_with_refresh,
};
use roomtalk::core::session::SessionContext;
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, body_string_contains, header, method, path, query_param},
};

// ============================================================================
// Helper Functions
// ============================================================================

fn credentials() -> Credentials {
    Credentials {
        username: "alice".to_string(),
        password: "wonderland".to_string(),
    }
}

fn room_json(id: i64, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "is_public": true,
        "created_by": 1,
        "users": [],
        "agents": [],
        "active_commands": ["iask"]
    })
}

fn logged_in(access: &str, refresh: &str) -> SessionContext {
    SessionContext {
        username: "alice".to_string(),
        access_token: Some(access.to_string()),
        refresh_token: Some(refresh.to_string()),
    }
}

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
async fn test_login_posts_form_and_parses_tokens() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("username=alice"))
        .and(body_string_contains("password=wonderland"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "acc",
            "refresh_token": "ref",
            "token_type": "bearer"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let api = HttpApi::new(mock_server.uri());
    let tokens = api.login(&credentials()).await.expect("login should succeed");

    assert_eq!(tokens.access_token, "acc");
    assert_eq!(tokens.refresh_token.as_deref(), Some("ref"));
}

#[tokio::test]
async fn test_login_with_bad_password_is_unauthorized() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Incorrect username or password"})),
        )
        .mount(&mock_server)
        .await;

    let api = HttpApi::new(mock_server.uri());
    let err = api.login(&credentials()).await.unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn test_register_conflict_surfaces_detail() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/register"))
        .and(body_json(json!({"username": "alice", "password": "wonderland"})))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"detail": "Username already registered"})),
        )
        .mount(&mock_server)
        .await;

    let api = HttpApi::new(mock_server.uri());
    match api.register(&credentials()).await {
        Err(ApiError::Api { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "Username already registered");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

// ============================================================================
// Authenticated calls
// ============================================================================

#[tokio::test]
async fn test_list_rooms_sends_bearer_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rooms"))
        .and(header("authorization", "Bearer acc"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([room_json(1, "general"), room_json(2, "random")])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    // Trailing slash on the base URL is tolerated
    let api = HttpApi::new(format!("{}/", mock_server.uri()));
    let rooms = api.list_rooms(Some("acc")).await.expect("rooms should load");

    assert_eq!(rooms.len(), 2);
    assert_eq!(rooms[1].name, "random");
    assert_eq!(rooms[0].active_commands, vec!["iask".to_string()]);
}

#[tokio::test]
async fn test_create_room_posts_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rooms"))
        .and(body_json(json!({"name": "lab", "is_public": false, "user_ids": []})))
        .respond_with(ResponseTemplate::new(200).set_body_json(room_json(5, "lab")))
        .mount(&mock_server)
        .await;

    let api = HttpApi::new(mock_server.uri());
    let room = api
        .create_room(
            Some("acc"),
            &NewRoom {
                name: "lab".to_string(),
                is_public: false,
                user_ids: Vec::new(),
            },
        )
        .await
        .expect("room should be created");
    assert_eq!(room.id, 5);
}

#[tokio::test]
async fn test_update_me_omits_unset_fields() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/users/me"))
        .and(body_json(json!({"status": "away"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "username": "alice",
            "is_moderator": false,
            "avatar": null,
            "status": "away"
        })))
        .mount(&mock_server)
        .await;

    let api = HttpApi::new(mock_server.uri());
    let profile = api
        .update_me(
            Some("acc"),
            &ProfileUpdate {
                status: Some("away".to_string()),
                avatar: None,
            },
        )
        .await
        .expect("profile update should succeed");
    assert_eq!(profile.status, "away");
}

#[tokio::test]
async fn test_room_command_toggle_uses_query() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rooms/3/commands/iask"))
        .and(query_param("is_active", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Command iask deactivated",
            "room_id": 3,
            "command": "iask",
            "is_active": false
        })))
        .mount(&mock_server)
        .await;

    let api = HttpApi::new(mock_server.uri());
    let toggle = api
        .set_room_command(Some("acc"), 3, "iask", false)
        .await
        .expect("toggle should succeed");
    assert!(!toggle.is_active);
}

#[tokio::test]
async fn test_forbidden_is_an_api_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rooms/3/agents/7"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"detail": "Not a moderator"})))
        .mount(&mock_server)
        .await;

    let api = HttpApi::new(mock_server.uri());
    let err = api.set_room_agent(Some("acc"), 3, 7, true).await.unwrap_err();
    assert_eq!(err.to_string(), "server error (HTTP 403): Not a moderator");
}

#[tokio::test]
async fn test_malformed_body_is_parse_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/agents"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let api = HttpApi::new(mock_server.uri());
    let err = api.list_agents(None).await.unwrap_err();
    assert!(matches!(err, ApiError::Parse(_)));
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    // Nothing listens on port 9 (discard) in the test environment
    let api = HttpApi::new("http://127.0.0.1:9");
    let err = api.me(Some("acc")).await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
}

// ============================================================================
// Refresh flow
// ============================================================================

#[tokio::test]
async fn test_expired_token_is_refreshed_and_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token/refresh"))
        .and(body_json(json!({"refresh_token": "ref"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh",
            "token_type": "bearer"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "username": "alice",
            "is_moderator": true,
            "status": "online"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let api = HttpApi::new(mock_server.uri());
    let outcome = call_with_refresh(&api, &ApiRequest::Me, &logged_in("stale", "ref")).await;

    let refreshed = outcome.refreshed.expect("tokens should be refreshed");
    assert_eq!(refreshed.access_token, "fresh");
    // No refresh token in the response: the session keeps its old one
    assert_eq!(refreshed.refresh_token, None);
    match outcome.result {
        Ok(ApiResponse::Profile(profile)) => assert!(profile.is_moderator),
        other => panic!("expected profile, got {other:?}"),
    }
}

#[tokio::test]
async fn test_failed_refresh_reports_unauthorized() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rooms"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock_server)
        .await;

    let api = HttpApi::new(mock_server.uri());
    let outcome =
        call_with_refresh(&api, &ApiRequest::ListRooms, &logged_in("stale", "revoked")).await;

    assert!(outcome.refreshed.is_none());
    assert!(matches!(outcome.result, Err(ApiError::Unauthorized)));
}

#[tokio::test]
async fn test_login_failure_is_never_refreshed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let api = HttpApi::new(mock_server.uri());
    let outcome = call_with_refresh(
        &api,
        &ApiRequest::Login(credentials()),
        &logged_in("stale", "ref"),
    )
    .await;
    assert!(matches!(outcome.result, Err(ApiError::Unauthorized)));
    assert!(outcome.refreshed.is_none());
}

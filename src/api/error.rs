use std::fmt;

/// Errors from REST calls against the chat server.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Connection refused, DNS, timeout. Retryable.
    Network(String),
    /// HTTP 401. The access token is missing, expired or revoked.
    Unauthorized,
    /// Any other non-success status. `message` is the server's `detail` when present.
    Api { status: u16, message: String },
    /// The body did not match the expected shape.
    Parse(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(msg) => write!(f, "network error: {msg}"),
            ApiError::Unauthorized => write!(f, "not authorized, please log in again"),
            ApiError::Api { status, message } => write!(f, "server error (HTTP {status}): {message}"),
            ApiError::Parse(msg) => write!(f, "unexpected response: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

/// Pulls a readable message out of an error body.
///
/// FastAPI reports `{"detail": "..."}` for HTTP errors and
/// `{"detail": [{"msg": "..."}, ...]}` for validation failures.
pub(crate) fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };
    match value.get("detail") {
        Some(serde_json::Value::String(detail)) => detail.clone(),
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
            .collect::<Vec<_>>()
            .join("; "),
        _ => body.trim().to_string(),
    }
}

//! # Session Context
//!
//! Who the user is and which tokens they hold. Built once at startup and
//! handed explicitly to the API layer and the channel manager.
//!
//! Persisted at `~/.roomtalk/session.json` so a login survives restarts.
//! Writes use atomic rename (write `.tmp`, then `rename()`) for crash safety.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::api::TokenPair;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub username: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl SessionContext {
    /// A session with no credentials.
    pub fn anonymous(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            access_token: None,
            refresh_token: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Stores freshly issued tokens. A pair without a refresh token keeps the old one.
    pub fn apply_tokens(&mut self, tokens: &TokenPair) {
        self.access_token = Some(tokens.access_token.clone());
        if let Some(refresh) = &tokens.refresh_token {
            self.refresh_token = Some(refresh.clone());
        }
    }

    pub fn clear_tokens(&mut self) {
        self.access_token = None;
        self.refresh_token = None;
    }
}

/// Placeholder name for users who never logged in, e.g. `User_3f9a`.
pub fn guest_username() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("User_{}", &id[..4])
}

/// Returns `~/.roomtalk/session.json`.
pub fn session_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".roomtalk").join("session.json"))
}

/// Atomically write `data` as JSON to `path` (via `.tmp` + rename).
fn atomic_write_json<T: Serialize>(path: &Path, data: &T) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    fs::write(&tmp_path, json)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

pub fn save_session_to(path: &Path, session: &SessionContext) -> io::Result<()> {
    atomic_write_json(path, session)
}

/// Loads a session file. A missing file is `Ok(None)`.
pub fn load_session_from(path: &Path) -> io::Result<Option<SessionContext>> {
    if !path.exists() {
        return Ok(None);
    }
    let json = fs::read_to_string(path)?;
    let session =
        serde_json::from_str(&json).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(Some(session))
}

pub fn clear_session_at(path: &Path) -> io::Result<()> {
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}

/// Loads the saved session, if any. Failures are logged and treated as "no session".
pub fn load_saved_session() -> Option<SessionContext> {
    let path = session_path()?;
    match load_session_from(&path) {
        Ok(Some(session)) => {
            info!("Restored session for {}", session.username);
            Some(session)
        }
        Ok(None) => None,
        Err(e) => {
            warn!("Ignoring unreadable session file {}: {}", path.display(), e);
            None
        }
    }
}

/// Persists the session, or removes the file when it holds no credentials.
pub fn persist_session(session: &SessionContext) {
    let Some(path) = session_path() else {
        warn!("Could not determine home directory, session not saved");
        return;
    };
    let result = if session.is_authenticated() {
        save_session_to(&path, session)
    } else {
        clear_session_at(&path)
    };
    match result {
        Ok(()) => debug!("Session persisted for {}", session.username),
        Err(e) => warn!("Failed to persist session: {}", e),
    }
}

/// Picks the session to start with. A saved session wins unless the user
/// asked for a different name, in which case they start without tokens.
pub fn startup_session(saved: Option<SessionContext>, preferred: Option<&str>) -> SessionContext {
    match (saved, preferred) {
        (Some(saved), None) => saved,
        (Some(saved), Some(name)) if saved.username == name => saved,
        (_, Some(name)) => SessionContext::anonymous(name),
        (None, None) => SessionContext::anonymous(guest_username()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("roomtalk-test-{}", uuid::Uuid::new_v4()))
            .join("session.json")
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let path = scratch_path();
        let session = SessionContext {
            username: "alice".to_string(),
            access_token: Some("a".to_string()),
            refresh_token: Some("r".to_string()),
        };
        save_session_to(&path, &session).unwrap();
        assert_eq!(load_session_from(&path).unwrap(), Some(session));
        assert!(!path.with_extension("tmp").exists());

        clear_session_at(&path).unwrap();
        assert_eq!(load_session_from(&path).unwrap(), None);
    }

    #[test]
    fn test_load_rejects_garbage() {
        let path = scratch_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{oops").unwrap();
        let err = load_session_from(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_apply_tokens_keeps_refresh_when_absent() {
        let mut session = SessionContext::anonymous("bob");
        session.apply_tokens(&TokenPair {
            access_token: "a1".to_string(),
            refresh_token: Some("r1".to_string()),
            token_type: "bearer".to_string(),
        });
        session.apply_tokens(&TokenPair {
            access_token: "a2".to_string(),
            refresh_token: None,
            token_type: "bearer".to_string(),
        });
        assert_eq!(session.access_token.as_deref(), Some("a2"));
        assert_eq!(session.refresh_token.as_deref(), Some("r1"));
        assert!(session.is_authenticated());

        session.clear_tokens();
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_guest_username_shape() {
        let name = guest_username();
        assert!(name.starts_with("User_"));
        assert_eq!(name.len(), 9);
    }

    #[test]
    fn test_startup_session_prefers_saved_tokens() {
        let saved = SessionContext {
            username: "alice".to_string(),
            access_token: Some("a".to_string()),
            refresh_token: None,
        };
        assert_eq!(startup_session(Some(saved.clone()), None), saved);
        assert_eq!(startup_session(Some(saved.clone()), Some("alice")), saved);

        let other = startup_session(Some(saved), Some("bob"));
        assert_eq!(other, SessionContext::anonymous("bob"));

        let guest = startup_session(None, None);
        assert!(guest.username.starts_with("User_"));
        assert!(!guest.is_authenticated());
    }
}

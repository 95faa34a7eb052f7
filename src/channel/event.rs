//! Wire format for room channel frames.
//!
//! Every frame is a JSON text message keyed by `event`:
//!
//! ```text
//! { "event": "message", "id"?: "...", "message": "...", "username": "..." }
//! { "event": "typing", "username": "..." }
//! ```
//!
//! The server's agent broadcasts omit `event` and may carry `partial: true`
//! for streamed fragments, so parsing is deliberately loose: anything with
//! `message` + `username` and no `event` is still a message.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A frame the client sends.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum OutboundEvent {
    Message {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        message: String,
        username: String,
    },
    Typing {
        username: String,
    },
}

impl OutboundEvent {
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Message {
        id: Option<String>,
        body: String,
        author: String,
        partial: bool,
    },
    Typing {
        username: String,
    },
    /// Well-formed JSON that is not a chat event (unknown kind or missing fields).
    Ignored(String),
}

/// Raised when a frame is not valid JSON or not a JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError(pub String);

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed frame: {}", self.0)
    }
}

impl std::error::Error for ParseError {}

#[derive(Deserialize, Debug)]
struct RawFrame {
    event: Option<String>,
    id: Option<Value>,
    message: Option<String>,
    username: Option<String>,
    #[serde(default)]
    partial: bool,
}

/// Server ids arrive as strings or integers; anything else is treated as absent.
fn id_to_string(id: Option<Value>) -> Option<String> {
    match id? {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Decode one text frame.
pub fn parse_frame(raw: &str) -> Result<InboundEvent, ParseError> {
    let frame: RawFrame = serde_json::from_str(raw).map_err(|e| ParseError(e.to_string()))?;

    match frame.event.as_deref() {
        Some("typing") => Ok(match frame.username {
            Some(username) if !username.is_empty() => InboundEvent::Typing { username },
            _ => InboundEvent::Ignored("typing without username".to_string()),
        }),
        Some("message") | None => match (frame.message, frame.username) {
            (Some(body), Some(author)) if !body.is_empty() && !author.is_empty() => {
                Ok(InboundEvent::Message {
                    id: id_to_string(frame.id),
                    body,
                    author,
                    partial: frame.partial,
                })
            }
            _ => Ok(InboundEvent::Ignored(
                frame.event.unwrap_or_else(|| "untyped frame".to_string()),
            )),
        },
        Some(other) => Ok(InboundEvent::Ignored(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_message_event() {
        let event =
            parse_frame(r#"{"event":"message","id":"1","message":"hi","username":"alice"}"#)
                .unwrap();
        assert_eq!(
            event,
            InboundEvent::Message {
                id: Some("1".to_string()),
                body: "hi".to_string(),
                author: "alice".to_string(),
                partial: false,
            }
        );
    }

    #[test]
    fn test_parse_message_without_id() {
        let event = parse_frame(r#"{"event":"message","message":"hi","username":"bob"}"#).unwrap();
        assert!(matches!(event, InboundEvent::Message { id: None, .. }));
    }

    #[test]
    fn test_parse_numeric_id() {
        let event =
            parse_frame(r#"{"event":"message","id":42,"message":"x","username":"bob"}"#).unwrap();
        assert!(matches!(event, InboundEvent::Message { id: Some(ref id), .. } if id == "42"));
    }

    #[test]
    fn test_parse_untyped_agent_broadcast() {
        let event =
            parse_frame(r#"{"message":"Bonjour","username":"AI_Ask","partial":true}"#).unwrap();
        assert_eq!(
            event,
            InboundEvent::Message {
                id: None,
                body: "Bonjour".to_string(),
                author: "AI_Ask".to_string(),
                partial: true,
            }
        );
    }

    #[test]
    fn test_parse_typing_event() {
        let event = parse_frame(r#"{"event":"typing","username":"carol"}"#).unwrap();
        assert_eq!(
            event,
            InboundEvent::Typing {
                username: "carol".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_kind_is_ignored_not_error() {
        let event = parse_frame(r#"{"event":"join","username":"dave"}"#).unwrap();
        assert_eq!(event, InboundEvent::Ignored("join".to_string()));
    }

    #[test]
    fn test_message_missing_fields_is_ignored() {
        let event = parse_frame(r#"{"event":"message","username":"dave"}"#).unwrap();
        assert!(matches!(event, InboundEvent::Ignored(_)));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        assert!(parse_frame("{not json").is_err());
        assert!(parse_frame(r#""just text""#).is_err());
    }

    /// Contract test for the outbound wire shape.
    #[test]
    fn test_outbound_serialization() {
        let typing = OutboundEvent::Typing {
            username: "alice".to_string(),
        };
        assert_eq!(
            typing.to_frame().unwrap(),
            r#"{"event":"typing","username":"alice"}"#
        );

        let message = OutboundEvent::Message {
            id: None,
            message: "hi".to_string(),
            username: "alice".to_string(),
        };
        assert_eq!(
            message.to_frame().unwrap(),
            r#"{"event":"message","message":"hi","username":"alice"}"#
        );

        let with_id = OutboundEvent::Message {
            id: Some("abc".to_string()),
            message: "hi".to_string(),
            username: "alice".to_string(),
        };
        assert_eq!(
            with_id.to_frame().unwrap(),
            r#"{"event":"message","id":"abc","message":"hi","username":"alice"}"#
        );
    }
}

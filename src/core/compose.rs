//! Turns chat input into the text that goes on the wire.
//!
//! Slash shortcuts map to the server's AI commands, which trigger on
//! `<command>(<text>)`:
//!
//! ```text
//! /ask why?        →  iask(why?)
//! /translate hola  →  iatranslate(hola)
//! /summarize       →  (rejected, needs text)
//! ```

use std::fmt;

/// `(shortcut, server command)`
const SHORTCUTS: [(&str, &str); 3] = [
    ("/ask", "iask"),
    ("/translate", "iatranslate"),
    ("/summarize", "isummarize"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Text(String),
    Command { command: &'static str, body: String },
}

impl Outgoing {
    pub fn into_wire(self) -> String {
        match self {
            Outgoing::Text(text) => text,
            Outgoing::Command { command, body } => format!("{command}({body})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeError {
    Empty,
    MissingArgument(&'static str),
}

impl fmt::Display for ComposeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComposeError::Empty => write!(f, "nothing to send"),
            ComposeError::MissingArgument(shortcut) => write!(f, "usage: {shortcut} <text>"),
        }
    }
}

impl std::error::Error for ComposeError {}

pub fn compose(input: &str) -> Result<Outgoing, ComposeError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ComposeError::Empty);
    }

    let (head, rest) = match input.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (input, ""),
    };
    for (shortcut, command) in SHORTCUTS {
        if head == shortcut {
            if rest.is_empty() {
                return Err(ComposeError::MissingArgument(shortcut));
            }
            return Ok(Outgoing::Command {
                command,
                body: rest.to_string(),
            });
        }
    }
    Ok(Outgoing::Text(input.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_trimmed() {
        assert_eq!(compose("  hi there "), Ok(Outgoing::Text("hi there".to_string())));
    }

    #[test]
    fn test_shortcuts_map_to_commands() {
        assert_eq!(compose("/ask why is the sky blue?").unwrap().into_wire(), "iask(why is the sky blue?)");
        assert_eq!(compose("/translate  hola").unwrap().into_wire(), "iatranslate(hola)");
        assert_eq!(compose("/summarize the thread").unwrap().into_wire(), "isummarize(the thread)");
    }

    #[test]
    fn test_shortcut_without_text_is_rejected() {
        assert_eq!(compose("/ask"), Err(ComposeError::MissingArgument("/ask")));
        assert_eq!(compose("/ask   "), Err(ComposeError::MissingArgument("/ask")));
    }

    #[test]
    fn test_unknown_slash_passes_through() {
        assert_eq!(compose("/shrug ok"), Ok(Outgoing::Text("/shrug ok".to_string())));
        // Prefix match is not enough
        assert_eq!(compose("/asking x"), Ok(Outgoing::Text("/asking x".to_string())));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(compose("   "), Err(ComposeError::Empty));
    }
}

//! Room message log with idempotent, id-keyed appends.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

/// Reaction symbols offered by the chat view.
pub const REACTIONS: [&str; 6] = ["👍", "❤️", "😂", "😮", "😢", "😡"];

/// A chat message. Only `reactions` changes after creation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Message {
    pub id: String,
    pub body: String,
    pub author: String,
    #[serde(default)]
    pub reactions: BTreeMap<String, BTreeSet<String>>,
    /// Streamed agent fragment, rendered dimmed.
    #[serde(default)]
    pub partial: bool,
}

impl Message {
    pub fn new(id: impl Into<String>, body: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
            author: author.into(),
            reactions: BTreeMap::new(),
            partial: false,
        }
    }

    /// Agents post as `Agent…` and command bots as `AI_…`.
    pub fn is_agent(&self) -> bool {
        self.author.starts_with("Agent") || self.author.starts_with("AI_")
    }
}

/// Ordered message log. Each id appears at most once.
#[derive(Debug, Default, Clone)]
pub struct MessageLog {
    messages: Vec<Message>,
    ids: HashSet<String>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `message` unless its id is already present. Returns whether it was added.
    pub fn append(&mut self, message: Message) -> bool {
        if !self.ids.insert(message.id.clone()) {
            return false;
        }
        self.messages.push(message);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.ids.clear();
    }

    /// Builds an id for a message that arrived without one.
    ///
    /// Uses the millisecond timestamp, suffixed with `-N` when that id is taken.
    pub fn synthesize_id(&self, unix_millis: i64) -> String {
        let base = unix_millis.to_string();
        if !self.contains(&base) {
            return base;
        }
        (1..)
            .map(|n| format!("{base}-{n}"))
            .find(|candidate| !self.contains(candidate))
            .unwrap_or(base)
    }

    /// Records `author` under `symbol` on message `id`.
    ///
    /// Returns the updated message, or `None` if the id is unknown or the
    /// author had already reacted with that symbol.
    pub fn add_reaction(&mut self, id: &str, symbol: &str, author: &str) -> Option<&Message> {
        let message = self.messages.iter_mut().find(|m| m.id == id)?;
        let added = message
            .reactions
            .entry(symbol.to_string())
            .or_default()
            .insert(author.to_string());
        added.then_some(&*message)
    }
}

//! # TitleBar Component
//!
//! Top status bar: which screen is showing, who is logged in, the active
//! room and its connection state, and the latest status message.
//!
//! Purely presentational. All fields are props:
//!
//! ```text
//! roomtalk | Chat #general (open) | alice | Joined #general | ↓ New
//! ```
//!
//! Segments that are empty are skipped, so narrow terminals keep the most
//! important text on the left.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::tui::component::Component;

pub struct TitleBar {
    pub screen: String,
    /// `#room (state)` when a room is active
    pub room: Option<String>,
    pub username: String,
    pub status_message: String,
    pub has_unseen_content: bool,
    pub is_loading: bool,
}

impl TitleBar {
    fn text(&self) -> String {
        let mut parts = vec![String::from("roomtalk")];
        match &self.room {
            Some(room) => parts.push(format!("{} {}", self.screen, room)),
            None => parts.push(self.screen.clone()),
        }
        parts.push(self.username.clone());
        if self.is_loading {
            parts.push("…".to_string());
        }
        if !self.status_message.is_empty() {
            parts.push(self.status_message.clone());
        }
        if self.has_unseen_content {
            parts.push("↓ New".to_string());
        }
        parts.join(" | ")
    }
}

impl Component for TitleBar {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let line = Line::from(Span::styled(self.text(), Style::default().fg(Color::White)))
            .style(Style::default().bg(Color::Blue));
        frame.render_widget(line, area);
    }
}

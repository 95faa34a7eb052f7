//! # InputBox Component
//!
//! A bordered single-line text field. Used for the chat composer and for
//! every form field (login, room name, agent details, profile).
//!
//! ## Responsibilities
//!
//! - Capture text input and paste (newlines in pastes become spaces)
//! - Handle editing (backspace, delete, cursor movement)
//! - Emit `Submit` on Enter with non-blank content
//! - Scroll horizontally so the cursor stays visible
//! - Mask its content for password fields
//!
//! The buffer is internal state; `title`, `masked` and `focused` are props.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, BorderType, Padding, Paragraph};
use unicode_width::UnicodeWidthChar;

use crate::tui::component::{Component, EventHandler};
use crate::tui::event::TuiEvent;

/// Border (2) + padding (2) consumed horizontally
const HORIZONTAL_OVERHEAD: u16 = 4;
/// Rendered height: one text line between two borders
pub const INPUT_HEIGHT: u16 = 3;
const MASK: char = '•';

/// High-level events emitted by the InputBox
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// User submitted the text (Enter pressed)
    Submit(String),
    /// Text or cursor changed
    ContentChanged,
}

pub struct InputBox {
    /// Text buffer (Internal State)
    buffer: String,
    /// Cursor position as a byte offset into `buffer`
    cursor: usize,
    /// First visible display column, updated on render
    scroll: usize,
    pub title: String,
    pub masked: bool,
    pub focused: bool,
}

impl InputBox {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            buffer: String::new(),
            cursor: 0,
            scroll: 0,
            title: title.into(),
            masked: false,
            focused: true,
        }
    }

    /// A field whose content renders as bullets.
    pub fn masked(title: impl Into<String>) -> Self {
        Self {
            masked: true,
            ..Self::new(title)
        }
    }

    pub fn value(&self) -> &str {
        &self.buffer
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.buffer = value.into();
        self.cursor = self.buffer.len();
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
        self.scroll = 0;
    }

    /// Takes the buffer, leaving the field empty.
    pub fn take(&mut self) -> String {
        let text = std::mem::take(&mut self.buffer);
        self.clear();
        text
    }

    fn display_char(&self, c: char) -> char {
        if self.masked { MASK } else { c }
    }

    /// Display width of the text before the cursor.
    fn cursor_column(&self) -> usize {
        self.buffer[..self.cursor]
            .chars()
            .map(|c| self.display_char(c).width().unwrap_or(0))
            .sum()
    }

    /// Keeps the cursor inside a window `inner` columns wide.
    fn update_scroll(&mut self, inner: usize) {
        let column = self.cursor_column();
        if column < self.scroll {
            self.scroll = column;
        } else if inner > 0 && column >= self.scroll + inner {
            self.scroll = column + 1 - inner;
        }
    }

    /// The slice of the (possibly masked) text that fits the window.
    fn visible_text(&self, inner: usize) -> String {
        let mut column = 0;
        let mut visible = String::new();
        for c in self.buffer.chars().map(|c| self.display_char(c)) {
            let width = c.width().unwrap_or(0);
            if column >= self.scroll {
                if column + width > self.scroll + inner {
                    break;
                }
                visible.push(c);
            }
            column += width;
        }
        visible
    }

    fn insert_str(&mut self, text: &str) {
        self.buffer.insert_str(self.cursor, text);
        self.cursor += text.len();
    }
}

fn prev_char_boundary(text: &str, pos: usize) -> usize {
    text[..pos]
        .char_indices()
        .next_back()
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn next_char_boundary(text: &str, pos: usize) -> usize {
    text[pos..]
        .chars()
        .next()
        .map(|c| pos + c.len_utf8())
        .unwrap_or(text.len())
}

impl Component for InputBox {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let inner = area.width.saturating_sub(HORIZONTAL_OVERHEAD) as usize;
        self.update_scroll(inner);

        let (text_style, border_style) = if self.focused {
            (Style::default().fg(Color::Green), Style::default().fg(Color::Green))
        } else {
            (
                Style::default().fg(Color::Gray),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM),
            )
        };

        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(border_style)
            .title(self.title.as_str())
            .padding(Padding::horizontal(1));
        let input = Paragraph::new(self.visible_text(inner))
            .block(block)
            .style(text_style);
        frame.render_widget(input, area);

        if self.focused {
            let column = (self.cursor_column() - self.scroll) as u16;
            frame.set_cursor_position((area.x + 2 + column, area.y + 1));
        }
    }
}

impl EventHandler for InputBox {
    type Event = InputEvent;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match event {
            TuiEvent::InputChar(c) => {
                self.buffer.insert(self.cursor, *c);
                self.cursor += c.len_utf8();
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::Paste(text) => {
                let flattened = text.replace("\r\n", " ").replace(['\n', '\r'], " ");
                self.insert_str(&flattened);
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::Backspace => (self.cursor > 0).then(|| {
                let prev = prev_char_boundary(&self.buffer, self.cursor);
                self.buffer.drain(prev..self.cursor);
                self.cursor = prev;
                InputEvent::ContentChanged
            }),
            TuiEvent::Delete => (self.cursor < self.buffer.len()).then(|| {
                let next = next_char_boundary(&self.buffer, self.cursor);
                self.buffer.drain(self.cursor..next);
                InputEvent::ContentChanged
            }),
            TuiEvent::CursorLeft => (self.cursor > 0).then(|| {
                self.cursor = prev_char_boundary(&self.buffer, self.cursor);
                InputEvent::ContentChanged
            }),
            TuiEvent::CursorRight => (self.cursor < self.buffer.len()).then(|| {
                self.cursor = next_char_boundary(&self.buffer, self.cursor);
                InputEvent::ContentChanged
            }),
            TuiEvent::CursorHome => (self.cursor != 0).then(|| {
                self.cursor = 0;
                InputEvent::ContentChanged
            }),
            TuiEvent::CursorEnd => (self.cursor != self.buffer.len()).then(|| {
                self.cursor = self.buffer.len();
                InputEvent::ContentChanged
            }),
            TuiEvent::Submit => {
                if self.buffer.trim().is_empty() {
                    None
                } else {
                    Some(InputEvent::Submit(self.take()))
                }
            }
            _ => None,
        }
    }
}

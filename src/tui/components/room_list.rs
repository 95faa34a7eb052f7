//! # RoomList Component
//!
//! The room browser: a selectable list of rooms above a name field.
//!
//! - Up/Down move the selection
//! - Enter joins the typed room, or the selected one when the field is empty
//! - Ctrl+N creates a room named by the field
//! - Tab flips whether a new room is public or private

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, List, ListItem, ListState};

use crate::api::Room;
use crate::tui::component::{Component, EventHandler};
use crate::tui::components::input_box::{INPUT_HEIGHT, InputBox};
use crate::tui::event::TuiEvent;

#[derive(Debug, Clone, PartialEq)]
pub enum RoomListEvent {
    Join(String),
    Create { name: String, is_public: bool },
}

pub struct RoomListState {
    pub list_state: ListState,
    pub name_input: InputBox,
    pub create_private: bool,
    /// Room names as last rendered, for selection lookups
    names: Vec<String>,
}

impl Default for RoomListState {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomListState {
    pub fn new() -> Self {
        let mut state = Self {
            list_state: ListState::default(),
            name_input: InputBox::new(""),
            create_private: false,
            names: Vec::new(),
        };
        state.update_title();
        state
    }

    /// Keeps the selection inside `rooms` and remembers their names.
    pub fn sync(&mut self, rooms: &[Room]) {
        self.names = rooms.iter().map(|r| r.name.clone()).collect();
        match self.list_state.selected() {
            _ if self.names.is_empty() => self.list_state.select(None),
            None => self.list_state.select(Some(0)),
            Some(i) if i >= self.names.len() => self.list_state.select(Some(self.names.len() - 1)),
            Some(_) => {}
        }
    }

    pub fn selected_name(&self) -> Option<&str> {
        self.names
            .get(self.list_state.selected()?)
            .map(String::as_str)
    }

    fn update_title(&mut self) {
        let visibility = if self.create_private { "private" } else { "public" };
        self.name_input.title =
            format!("Room name (Enter: join, Ctrl+N: create {visibility}, Tab: toggle)");
    }
}

impl EventHandler for RoomListState {
    type Event = RoomListEvent;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match event {
            TuiEvent::CursorUp => {
                if !self.names.is_empty() {
                    self.list_state.select_previous();
                }
                None
            }
            TuiEvent::CursorDown => {
                if let Some(i) = self.list_state.selected()
                    && i + 1 < self.names.len()
                {
                    self.list_state.select(Some(i + 1));
                }
                None
            }
            TuiEvent::NextField | TuiEvent::PrevField => {
                self.create_private = !self.create_private;
                self.update_title();
                None
            }
            TuiEvent::Submit => {
                let typed = self.name_input.value().trim().to_string();
                if !typed.is_empty() {
                    self.name_input.clear();
                    return Some(RoomListEvent::Join(typed));
                }
                self.selected_name()
                    .map(|name| RoomListEvent::Join(name.to_string()))
            }
            TuiEvent::Create => {
                let name = self.name_input.value().trim().to_string();
                if name.is_empty() {
                    return None;
                }
                self.name_input.clear();
                Some(RoomListEvent::Create {
                    name,
                    is_public: !self.create_private,
                })
            }
            other => {
                self.name_input.handle_event(other);
                None
            }
        }
    }
}

fn room_line<'a>(room: &'a Room, is_active: bool) -> Line<'a> {
    let mut spans = vec![Span::styled(
        format!("#{}", room.name),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];
    if !room.is_public {
        spans.push(Span::styled("  private", Style::default().fg(Color::Yellow)));
    }
    spans.push(Span::styled(
        format!(
            "  {} users, {} agents",
            room.users.len(),
            room.agents.len()
        ),
        Style::default().fg(Color::DarkGray),
    ));
    if is_active {
        spans.push(Span::styled("  (joined)", Style::default().fg(Color::Green)));
    }
    Line::from(spans)
}

pub struct RoomList<'a> {
    pub state: &'a mut RoomListState,
    pub rooms: &'a [Room],
    pub active_room: Option<&'a str>,
}

impl<'a> Component for RoomList<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        self.state.sync(self.rooms);
        let [list_area, input_area] =
            Layout::vertical([Constraint::Min(0), Constraint::Length(INPUT_HEIGHT)]).areas(area);

        let items: Vec<ListItem> = self
            .rooms
            .iter()
            .map(|room| ListItem::new(room_line(room, self.active_room == Some(room.name.as_str()))))
            .collect();
        let title = if items.is_empty() {
            "Rooms (none yet, create one below)".to_string()
        } else {
            format!("Rooms ({})", items.len())
        };
        let list = List::new(items)
            .block(Block::bordered().border_type(BorderType::Rounded).title(title))
            .highlight_style(Style::default().bg(Color::DarkGray))
            .highlight_symbol("▶ ");
        frame.render_stateful_widget(list, list_area, &mut self.state.list_state);

        self.state.name_input.render(frame, input_area);
    }
}

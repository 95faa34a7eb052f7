//! # ProfileView Component
//!
//! Shows the logged-in user's profile and edits status and avatar.
//! Blank fields are left out of the update, so the server keeps them.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Paragraph};

use crate::api::{ProfileUpdate, UserProfile};
use crate::tui::component::{Component, EventHandler};
use crate::tui::components::input_box::{INPUT_HEIGHT, InputBox};
use crate::tui::event::TuiEvent;

#[derive(Debug, Clone, PartialEq)]
pub enum ProfileEvent {
    Save(ProfileUpdate),
}

pub struct ProfileState {
    status: InputBox,
    avatar: InputBox,
}

impl Default for ProfileState {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileState {
    pub fn new() -> Self {
        let mut avatar = InputBox::new("New avatar URL");
        avatar.focused = false;
        Self {
            status: InputBox::new("New status"),
            avatar,
        }
    }

    fn toggle_focus(&mut self) {
        self.status.focused = !self.status.focused;
        self.avatar.focused = !self.status.focused;
    }

    fn take_update(&mut self) -> Option<ProfileUpdate> {
        let non_blank = |text: String| {
            let text = text.trim().to_string();
            (!text.is_empty()).then_some(text)
        };
        let update = ProfileUpdate {
            status: non_blank(self.status.take()),
            avatar: non_blank(self.avatar.take()),
        };
        (update != ProfileUpdate::default()).then_some(update)
    }
}

impl EventHandler for ProfileState {
    type Event = ProfileEvent;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match event {
            TuiEvent::NextField | TuiEvent::PrevField | TuiEvent::CursorUp | TuiEvent::CursorDown => {
                self.toggle_focus();
                None
            }
            TuiEvent::Submit if self.status.focused => {
                self.toggle_focus();
                None
            }
            TuiEvent::Submit => {
                let update = self.take_update();
                self.toggle_focus();
                update.map(ProfileEvent::Save)
            }
            other if self.status.focused => {
                self.status.handle_event(other);
                None
            }
            other => {
                self.avatar.handle_event(other);
                None
            }
        }
    }
}

pub struct ProfileView<'a> {
    pub state: &'a mut ProfileState,
    pub profile: Option<&'a UserProfile>,
}

fn field<'a>(label: &'a str, value: String) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("{label:>10}: "), Style::default().fg(Color::DarkGray)),
        Span::raw(value),
    ])
}

impl<'a> Component for ProfileView<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let [info_area, status_area, avatar_area] = Layout::vertical([
            Constraint::Min(0),
            Constraint::Length(INPUT_HEIGHT),
            Constraint::Length(INPUT_HEIGHT),
        ])
        .areas(area);

        let lines = match self.profile {
            Some(profile) => vec![
                field("Username", profile.username.clone()),
                field("Id", profile.id.to_string()),
                field(
                    "Role",
                    if profile.is_moderator { "moderator" } else { "member" }.to_string(),
                ),
                field("Status", profile.status.clone()),
                field("Avatar", profile.avatar.clone().unwrap_or_else(|| "(none)".to_string())),
            ],
            None => vec![Line::styled(
                "Loading profile...",
                Style::default().add_modifier(Modifier::ITALIC),
            )],
        };
        let info = Paragraph::new(lines).block(
            Block::bordered()
                .border_type(BorderType::Rounded)
                .title("Profile (Tab: switch field, Enter: save)"),
        );
        frame.render_widget(info, info_area);

        self.state.status.render(frame, status_area);
        self.state.avatar.render(frame, avatar_area);
    }
}

//! # AuthForm Component
//!
//! Username and password fields shared by the login and register screens.
//! Tab or Up/Down moves between fields, Enter on the username moves to the
//! password, Enter on the password submits. Ctrl+N flips between logging
//! in and registering.

use ratatui::Frame;
use ratatui::layout::{Constraint, Flex, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, BorderType, Paragraph};

use crate::api::Credentials;
use crate::tui::component::{Component, EventHandler};
use crate::tui::components::input_box::{INPUT_HEIGHT, InputBox};
use crate::tui::event::TuiEvent;

#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    Submit(Credentials),
    SwitchMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Username,
    Password,
}

pub struct AuthFormState {
    username: InputBox,
    password: InputBox,
    focus: Field,
}

impl Default for AuthFormState {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthFormState {
    pub fn new() -> Self {
        let mut state = Self {
            username: InputBox::new("Username"),
            password: InputBox::masked("Password"),
            focus: Field::Username,
        };
        state.apply_focus();
        state
    }

    /// Prefills the username (e.g. right after registering) and focuses the password.
    pub fn prefill_username(&mut self, username: &str) {
        self.username.set_value(username);
        self.password.clear();
        self.focus = Field::Password;
        self.apply_focus();
    }

    fn apply_focus(&mut self) {
        self.username.focused = self.focus == Field::Username;
        self.password.focused = self.focus == Field::Password;
    }

    fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Field::Username => Field::Password,
            Field::Password => Field::Username,
        };
        self.apply_focus();
    }

    fn focused_input(&mut self) -> &mut InputBox {
        match self.focus {
            Field::Username => &mut self.username,
            Field::Password => &mut self.password,
        }
    }
}

impl EventHandler for AuthFormState {
    type Event = AuthEvent;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match event {
            TuiEvent::NextField | TuiEvent::PrevField | TuiEvent::CursorUp | TuiEvent::CursorDown => {
                self.toggle_focus();
                None
            }
            TuiEvent::Create => Some(AuthEvent::SwitchMode),
            TuiEvent::Submit if self.focus == Field::Username => {
                self.toggle_focus();
                None
            }
            TuiEvent::Submit => {
                let credentials = Credentials {
                    username: self.username.value().trim().to_string(),
                    password: self.password.take(),
                };
                Some(AuthEvent::Submit(credentials))
            }
            other => {
                self.focused_input().handle_event(other);
                None
            }
        }
    }
}

pub struct AuthForm<'a> {
    pub state: &'a mut AuthFormState,
    pub registering: bool,
}

impl<'a> Component for AuthForm<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let [column] = Layout::horizontal([Constraint::Max(50)])
            .flex(Flex::Center)
            .areas(area);
        let [form_area] = Layout::vertical([Constraint::Length(2 * INPUT_HEIGHT + 4)])
            .flex(Flex::Center)
            .areas(column);

        let (title, hint) = if self.registering {
            ("Create account", "Enter: register   Ctrl+N: back to login")
        } else {
            ("Log in", "Enter: log in   Ctrl+N: create an account")
        };
        let block = Block::bordered().border_type(BorderType::Rounded).title(title);
        let inner = block.inner(form_area);
        frame.render_widget(block, form_area);

        let [user_area, pass_area, hint_area] = Layout::vertical([
            Constraint::Length(INPUT_HEIGHT),
            Constraint::Length(INPUT_HEIGHT),
            Constraint::Length(1),
        ])
        .areas(inner);
        self.state.username.render(frame, user_area);
        self.state.password.render(frame, pass_area);
        frame.render_widget(
            Paragraph::new(hint).style(Style::default().fg(Color::DarkGray)),
            hint_area,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn type_text(state: &mut AuthFormState, text: &str) {
        for c in text.chars() {
            state.handle_event(&TuiEvent::InputChar(c));
        }
    }

    #[test]
    fn test_enter_walks_fields_then_submits() {
        let mut state = AuthFormState::new();
        type_text(&mut state, "alice ");
        assert_eq!(state.handle_event(&TuiEvent::Submit), None);
        type_text(&mut state, "s3cret");

        assert_eq!(
            state.handle_event(&TuiEvent::Submit),
            Some(AuthEvent::Submit(Credentials {
                username: "alice".to_string(),
                password: "s3cret".to_string(),
            }))
        );
        // Password is not kept around after submitting
        assert!(state.password.value().is_empty());
        assert_eq!(state.username.value(), "alice ");
    }

    #[test]
    fn test_prefill_focuses_password() {
        let mut state = AuthFormState::new();
        state.prefill_username("bob");
        assert!(state.password.focused);
        type_text(&mut state, "pw");
        assert_eq!(state.password.value(), "pw");
    }

    #[test]
    fn test_ctrl_n_switches_mode() {
        let mut state = AuthFormState::new();
        assert_eq!(state.handle_event(&TuiEvent::Create), Some(AuthEvent::SwitchMode));
    }

    #[test]
    fn test_render_masks_password() {
        let backend = TestBackend::new(60, 14);
        let mut terminal = Terminal::new(backend).unwrap();
        let mut state = AuthFormState::new();
        type_text(&mut state, "alice");
        state.handle_event(&TuiEvent::NextField);
        type_text(&mut state, "hunter2");

        terminal
            .draw(|f| {
                AuthForm {
                    state: &mut state,
                    registering: false,
                }
                .render(f, f.area())
            })
            .unwrap();

        let text = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect::<String>();
        assert!(text.contains("Log in"));
        assert!(text.contains("alice"));
        assert!(!text.contains("hunter2"));
    }
}

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, BorderType, Paragraph, Wrap};

use crate::channel::{Notice, REACTIONS};
use crate::core::state::{App, Screen};
use crate::tui::component::Component;
use crate::tui::components::{
    AgentPanel, AuthForm, INPUT_HEIGHT, MessageList, ProfileView, RoomList, TitleBar,
};
use crate::tui::{InputMode, TuiState};

const KEY_HINTS: &str =
    "Ctrl+R rooms  Ctrl+T chat  Ctrl+G agents  Ctrl+P profile  Ctrl+X logout  Ctrl+C quit";

pub fn draw_ui(frame: &mut Frame, app: &App, tui: &mut TuiState) {
    use Constraint::{Length, Min};
    let error_height = if app.error.is_some() { 3 } else { 0 };
    let [title_area, error_area, main_area, hint_area] =
        Layout::vertical([Length(1), Length(error_height), Min(0), Length(1)])
            .areas(frame.area());

    let room = app
        .chat
        .room
        .as_ref()
        .map(|room| format!("#{room} ({})", app.chat.state.label()));
    let mut title_bar = TitleBar {
        screen: app.screen.title().to_string(),
        room,
        username: app.session.username.clone(),
        status_message: app.status_message.clone(),
        has_unseen_content: app.screen == Screen::Chat && tui.message_list.has_unseen_content(),
        is_loading: app.is_loading(),
    };
    title_bar.render(frame, title_area);

    if let Some(error) = &app.error {
        draw_error_banner(frame, error_area, error);
    }

    match app.screen {
        Screen::Login | Screen::Register => {
            AuthForm {
                state: &mut tui.auth,
                registering: app.screen == Screen::Register,
            }
            .render(frame, main_area);
        }
        Screen::Rooms => {
            RoomList {
                state: &mut tui.rooms,
                rooms: &app.rooms,
                active_room: app.chat.room.as_deref(),
            }
            .render(frame, main_area);
        }
        Screen::Chat => draw_chat(frame, main_area, app, tui),
        Screen::Agents => {
            AgentPanel {
                state: &mut tui.agents,
                agents: &app.agents,
                room: app.current_room(),
                is_moderator: app.is_moderator(),
            }
            .render(frame, main_area);
        }
        Screen::Profile => {
            ProfileView {
                state: &mut tui.profile,
                profile: app.profile.as_ref(),
            }
            .render(frame, main_area);
        }
    }

    frame.render_widget(
        Paragraph::new(KEY_HINTS).style(Style::default().fg(Color::DarkGray)),
        hint_area,
    );
}

fn draw_error_banner(frame: &mut Frame, area: Rect, error: &str) {
    let banner = Paragraph::new(error)
        .block(
            Block::bordered()
                .border_type(BorderType::Rounded)
                .title("Error (Esc to dismiss)"),
        )
        .style(Style::default().fg(Color::Red))
        .wrap(Wrap { trim: true });
    frame.render_widget(banner, area);
}

fn draw_chat(frame: &mut Frame, area: Rect, app: &App, tui: &mut TuiState) {
    use Constraint::{Length, Min};
    let notice_height = if app.chat.notice.is_some() { 1 } else { 0 };
    let [notice_area, list_area, typing_area, input_area] = Layout::vertical([
        Length(notice_height),
        Min(0),
        Length(1),
        Length(INPUT_HEIGHT),
    ])
    .areas(area);

    if let Some(notice) = &app.chat.notice {
        frame.render_widget(Paragraph::new(notice.to_string()).style(notice_style(notice)), notice_area);
    }

    tui.chat_list_area = list_area;
    MessageList::new(&mut tui.message_list, &app.chat.messages, &app.session.username)
        .render(frame, list_area);

    let typing = typing_label(&app.chat.others_typing(&app.session.username));
    frame.render_widget(
        Paragraph::new(typing).style(
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        ),
        typing_area,
    );

    let room = app.chat.room.as_deref().unwrap_or_default();
    tui.composer.focused = tui.input_mode == InputMode::Input;
    tui.composer.title = match tui.input_mode {
        InputMode::Input => format!("Message #{room} (Esc: select, /ask /translate /summarize)"),
        InputMode::Cursor => format!("Select: ↑↓  React: {}  Enter: type", reaction_keys()),
    };
    tui.composer.render(frame, input_area);
}

fn notice_style(notice: &Notice) -> Style {
    if notice.is_blocking() {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Yellow)
    }
}

/// `1👍 2❤️ …` for the reaction keys shown in Cursor mode.
fn reaction_keys() -> String {
    REACTIONS
        .iter()
        .enumerate()
        .map(|(i, symbol)| format!("{}{symbol}", i + 1))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Human-readable typing indicator for other users.
pub fn typing_label(users: &[&str]) -> String {
    match users {
        [] => String::new(),
        [one] => format!("{one} is typing..."),
        [a, b] => format!("{a} and {b} are typing..."),
        many => format!("{} people are typing...", many.len()),
    }
}

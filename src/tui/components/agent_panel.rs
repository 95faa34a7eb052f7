//! # AgentPanel Component
//!
//! Agent and room-command management.
//!
//! ```text
//! ┌ Agents ─────────────────┐┌ Commands in #room ─┐
//! │▶ Helper   active  in room││  [x] iask           │
//! │  Critic   inactive       ││  [ ] iatranslate    │
//! └──────────────────────────┘└─────────────────────┘
//! [ Name ] [ Personality ] [ Context ]
//! ```
//!
//! Tab cycles focus: agents → commands → name → personality → context.
//! In the agent list Space toggles the agent globally and Enter toggles it
//! in the current room. In the command list Enter or Space toggles the
//! command. Enter on the last form field creates the agent.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, List, ListItem, ListState};

use crate::api::{Agent, NewAgent, ROOM_COMMANDS, Room};
use crate::tui::component::{Component, EventHandler};
use crate::tui::components::input_box::{INPUT_HEIGHT, InputBox};
use crate::tui::event::TuiEvent;

#[derive(Debug, Clone, PartialEq)]
pub enum AgentPanelEvent {
    ToggleActive(i64),
    ToggleInRoom(i64),
    ToggleCommand(String),
    Create(NewAgent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Agents,
    Commands,
    Field(usize),
}

const FIELD_COUNT: usize = 3;

pub struct AgentPanelState {
    agent_list: ListState,
    command_list: ListState,
    fields: [InputBox; FIELD_COUNT],
    focus: Focus,
    agent_ids: Vec<i64>,
}

impl Default for AgentPanelState {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentPanelState {
    pub fn new() -> Self {
        let mut state = Self {
            agent_list: ListState::default(),
            command_list: ListState::default().with_selected(Some(0)),
            fields: [
                InputBox::new("Name"),
                InputBox::new("Personality"),
                InputBox::new("Context"),
            ],
            focus: Focus::Agents,
            agent_ids: Vec::new(),
        };
        state.apply_focus();
        state
    }

    pub fn sync(&mut self, agents: &[Agent]) {
        self.agent_ids = agents.iter().map(|a| a.id).collect();
        match self.agent_list.selected() {
            _ if self.agent_ids.is_empty() => self.agent_list.select(None),
            None => self.agent_list.select(Some(0)),
            Some(i) if i >= self.agent_ids.len() => {
                self.agent_list.select(Some(self.agent_ids.len() - 1))
            }
            Some(_) => {}
        }
    }

    fn selected_agent(&self) -> Option<i64> {
        self.agent_ids.get(self.agent_list.selected()?).copied()
    }

    fn selected_command(&self) -> Option<&'static str> {
        ROOM_COMMANDS.get(self.command_list.selected()?).copied()
    }

    fn apply_focus(&mut self) {
        for (i, field) in self.fields.iter_mut().enumerate() {
            field.focused = self.focus == Focus::Field(i);
        }
    }

    fn cycle_focus(&mut self, forward: bool) {
        const ORDER: [Focus; 5] = [
            Focus::Agents,
            Focus::Commands,
            Focus::Field(0),
            Focus::Field(1),
            Focus::Field(2),
        ];
        let pos = ORDER.iter().position(|f| *f == self.focus).unwrap_or(0);
        let next = if forward {
            (pos + 1) % ORDER.len()
        } else {
            (pos + ORDER.len() - 1) % ORDER.len()
        };
        self.focus = ORDER[next];
        self.apply_focus();
    }

    fn submit_form(&mut self) -> Option<AgentPanelEvent> {
        if self.fields[0].value().trim().is_empty() {
            self.focus = Focus::Field(0);
            self.apply_focus();
            return None;
        }
        let [name, personality, context] = &mut self.fields;
        let agent = NewAgent {
            name: name.take().trim().to_string(),
            personality: personality.take(),
            context: context.take(),
        };
        self.focus = Focus::Agents;
        self.apply_focus();
        Some(AgentPanelEvent::Create(agent))
    }
}

impl EventHandler for AgentPanelState {
    type Event = AgentPanelEvent;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match (self.focus, event) {
            (_, TuiEvent::NextField) => {
                self.cycle_focus(true);
                None
            }
            (_, TuiEvent::PrevField) => {
                self.cycle_focus(false);
                None
            }
            (_, TuiEvent::Create) => {
                self.focus = Focus::Field(0);
                self.apply_focus();
                None
            }
            (Focus::Agents, TuiEvent::CursorUp) => {
                self.agent_list.select_previous();
                None
            }
            (Focus::Agents, TuiEvent::CursorDown) => {
                if let Some(i) = self.agent_list.selected()
                    && i + 1 < self.agent_ids.len()
                {
                    self.agent_list.select(Some(i + 1));
                }
                None
            }
            (Focus::Agents, TuiEvent::InputChar(' ')) => {
                self.selected_agent().map(AgentPanelEvent::ToggleActive)
            }
            (Focus::Agents, TuiEvent::Submit) => {
                self.selected_agent().map(AgentPanelEvent::ToggleInRoom)
            }
            (Focus::Commands, TuiEvent::CursorUp) => {
                self.command_list.select_previous();
                None
            }
            (Focus::Commands, TuiEvent::CursorDown) => {
                if let Some(i) = self.command_list.selected()
                    && i + 1 < ROOM_COMMANDS.len()
                {
                    self.command_list.select(Some(i + 1));
                }
                None
            }
            (Focus::Commands, TuiEvent::Submit | TuiEvent::InputChar(' ')) => self
                .selected_command()
                .map(|c| AgentPanelEvent::ToggleCommand(c.to_string())),
            (Focus::Field(i), TuiEvent::Submit) if i + 1 < FIELD_COUNT => {
                self.cycle_focus(true);
                None
            }
            (Focus::Field(_), TuiEvent::Submit) => self.submit_form(),
            (Focus::Field(i), other) => {
                self.fields[i].handle_event(other);
                None
            }
            _ => None,
        }
    }
}

pub struct AgentPanel<'a> {
    pub state: &'a mut AgentPanelState,
    pub agents: &'a [Agent],
    pub room: Option<&'a Room>,
    pub is_moderator: bool,
}

impl<'a> AgentPanel<'a> {
    fn pane_block(&self, title: String, focused: bool) -> Block<'static> {
        let style = if focused {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(style)
            .title(title)
    }

    fn agent_line(&self, agent: &'a Agent) -> Line<'a> {
        let (label, color) = if agent.is_active {
            ("active", Color::Green)
        } else {
            ("inactive", Color::DarkGray)
        };
        let mut spans = vec![
            Span::styled(agent.name.as_str(), Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(format!("  {label}"), Style::default().fg(color)),
        ];
        if self
            .room
            .is_some_and(|room| room.agents.iter().any(|a| a.id == agent.id))
        {
            spans.push(Span::styled("  in room", Style::default().fg(Color::Cyan)));
        }
        Line::from(spans)
    }
}

impl<'a> Component for AgentPanel<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        self.state.sync(self.agents);
        let [lists_area, form_area] =
            Layout::vertical([Constraint::Min(0), Constraint::Length(INPUT_HEIGHT)]).areas(area);
        let [agents_area, commands_area] =
            Layout::horizontal([Constraint::Percentage(60), Constraint::Percentage(40)])
                .areas(lists_area);

        let agent_items: Vec<ListItem> = self
            .agents
            .iter()
            .map(|agent| ListItem::new(self.agent_line(agent)))
            .collect();
        let agents_title = "Agents (Space: on/off, Enter: add/remove in room)".to_string();
        let list = List::new(agent_items)
            .block(self.pane_block(agents_title, self.state.focus == Focus::Agents))
            .highlight_style(Style::default().bg(Color::DarkGray))
            .highlight_symbol("▶ ");
        frame.render_stateful_widget(list, agents_area, &mut self.state.agent_list);

        let command_items: Vec<ListItem> = ROOM_COMMANDS
            .iter()
            .map(|command| {
                let enabled = self
                    .room
                    .is_some_and(|room| room.active_commands.iter().any(|c| c == command));
                let mark = if enabled { "[x]" } else { "[ ]" };
                ListItem::new(format!("{mark} {command}"))
            })
            .collect();
        let commands_title = match (self.room, self.is_moderator) {
            (Some(room), true) => format!("Commands in #{}", room.name),
            (Some(room), false) => format!("Commands in #{} (moderators only)", room.name),
            (None, _) => "Commands (join a room)".to_string(),
        };
        let commands = List::new(command_items)
            .block(self.pane_block(commands_title, self.state.focus == Focus::Commands))
            .highlight_style(Style::default().bg(Color::DarkGray));
        frame.render_stateful_widget(commands, commands_area, &mut self.state.command_list);

        let field_areas = Layout::horizontal([Constraint::Ratio(1, 3); FIELD_COUNT]).split(form_area);
        for (field, field_area) in self.state.fields.iter_mut().zip(field_areas.iter()) {
            field.render(frame, *field_area);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_room;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn agents() -> Vec<Agent> {
        vec![
            Agent { id: 7, name: "Helper".to_string(), is_active: true },
            Agent { id: 9, name: "Critic".to_string(), is_active: false },
        ]
    }

    fn synced() -> AgentPanelState {
        let mut state = AgentPanelState::new();
        state.sync(&agents());
        state
    }

    #[test]
    fn test_agent_list_toggles() {
        let mut state = synced();
        assert_eq!(
            state.handle_event(&TuiEvent::InputChar(' ')),
            Some(AgentPanelEvent::ToggleActive(7))
        );
        state.handle_event(&TuiEvent::CursorDown);
        assert_eq!(
            state.handle_event(&TuiEvent::Submit),
            Some(AgentPanelEvent::ToggleInRoom(9))
        );
    }

    #[test]
    fn test_command_list_toggles() {
        let mut state = synced();
        state.handle_event(&TuiEvent::NextField);
        state.handle_event(&TuiEvent::CursorDown);
        assert_eq!(
            state.handle_event(&TuiEvent::Submit),
            Some(AgentPanelEvent::ToggleCommand("iatranslate".to_string()))
        );
    }

    #[test]
    fn test_form_creates_agent() {
        let mut state = synced();
        state.handle_event(&TuiEvent::Create);
        for (i, text) in ["Bard", "poetic", "rhymes"].iter().enumerate() {
            for c in text.chars() {
                state.handle_event(&TuiEvent::InputChar(c));
            }
            let res = state.handle_event(&TuiEvent::Submit);
            if i < 2 {
                assert_eq!(res, None);
            } else {
                assert_eq!(
                    res,
                    Some(AgentPanelEvent::Create(NewAgent {
                        name: "Bard".to_string(),
                        personality: "poetic".to_string(),
                        context: "rhymes".to_string(),
                    }))
                );
            }
        }
        assert!(state.fields.iter().all(|f| f.value().is_empty()));
        assert_eq!(state.focus, Focus::Agents);
    }

    #[test]
    fn test_form_requires_name() {
        let mut state = synced();
        state.handle_event(&TuiEvent::Create);
        state.handle_event(&TuiEvent::NextField);
        state.handle_event(&TuiEvent::NextField);
        assert_eq!(state.handle_event(&TuiEvent::Submit), None);
        assert_eq!(state.focus, Focus::Field(0));
    }

    #[test]
    fn test_space_in_form_is_text() {
        let mut state = synced();
        state.handle_event(&TuiEvent::Create);
        state.handle_event(&TuiEvent::InputChar('a'));
        assert_eq!(state.handle_event(&TuiEvent::InputChar(' ')), None);
        assert_eq!(state.fields[0].value(), "a ");
    }

    #[test]
    fn test_render_marks_room_membership() {
        let backend = TestBackend::new(100, 12);
        let mut terminal = Terminal::new(backend).unwrap();
        let agents = agents();
        let mut room = test_room(3, "lab");
        room.agents = vec![agents[0].clone()];
        room.active_commands = vec!["iask".to_string()];
        let mut state = AgentPanelState::new();

        terminal
            .draw(|f| {
                AgentPanel {
                    state: &mut state,
                    agents: &agents,
                    room: Some(&room),
                    is_moderator: true,
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
        assert!(text.contains("Helper"));
        assert!(text.contains("active  in room"));
        assert!(text.contains("Commands in #lab"));
        assert!(text.contains("[x] iask"));
        assert!(text.contains("[ ] isummarize"));
    }
}

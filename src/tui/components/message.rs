use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Text};
use ratatui::widgets::{Block, BorderType, Padding, Paragraph, Widget, Wrap};

use crate::channel::Message;
use crate::tui::component::Component;

/// Horizontal padding (per side) between the border and text content.
const CONTENT_PAD_H: u16 = 1;
/// Total horizontal space consumed by borders (1 left + 1 right) and padding.
const HORIZONTAL_OVERHEAD: u16 = 2 + CONTENT_PAD_H * 2;
/// Total vertical space consumed by borders (1 top + 1 bottom).
const VERTICAL_OVERHEAD: u16 = 2;

/// A single chat message: author in the border, body inside, reaction
/// counts on a trailing line.
///
/// Transient: built each frame by `MessageList` for the visible messages.
/// Own messages are green and right-aligned, agents blue, everyone else cyan. Streamed agent
/// fragments (`partial`) render dimmed and italic.
#[derive(Clone, Copy)]
pub struct MessageView<'a> {
    pub message: &'a Message,
    pub is_own: bool,
    pub is_selected: bool,
}

impl<'a> MessageView<'a> {
    pub fn new(message: &'a Message, is_own: bool, is_selected: bool) -> Self {
        Self {
            message,
            is_own,
            is_selected,
        }
    }

    /// Predicts the rendered height without rendering, using the same
    /// wrapping rules as the `Paragraph` below.
    pub fn calculate_height(message: &Message, width: u16) -> u16 {
        let content_width = width.saturating_sub(HORIZONTAL_OVERHEAD);
        if content_width == 0 {
            return 1;
        }

        let mut lines = wrapped_line_count(message.body.trim(), content_width);
        let summary = reaction_summary(message);
        if !summary.is_empty() {
            lines += wrapped_line_count(&summary, content_width);
        }
        lines.max(1) + VERTICAL_OVERHEAD
    }

    fn style(&self) -> Style {
        let base = if self.is_own {
            Style::default().fg(Color::Green)
        } else if self.message.is_agent() {
            Style::default().fg(Color::Blue)
        } else {
            Style::default().fg(Color::Cyan)
        };
        if self.message.partial {
            base.add_modifier(Modifier::DIM | Modifier::ITALIC)
        } else {
            base
        }
    }
}

fn wrapped_line_count(text: &str, content_width: u16) -> u16 {
    if text.is_empty() {
        return 0;
    }
    let options = textwrap::Options::new(content_width as usize)
        .break_words(true)
        .word_separator(textwrap::WordSeparator::AsciiSpace);
    textwrap::wrap(text, options).len() as u16
}

/// `👍 2  ❤️ 1` for every symbol with at least one reactor.
pub fn reaction_summary(message: &Message) -> String {
    message
        .reactions
        .iter()
        .filter(|(_, users)| !users.is_empty())
        .map(|(symbol, users)| format!("{symbol} {}", users.len()))
        .collect::<Vec<_>>()
        .join("  ")
}

impl<'a> Widget for MessageView<'a> {
    fn render(self, area: Rect, buf: &mut ratatui::buffer::Buffer) {
        let style = self.style();
        let border_style = if self.is_selected {
            Style::default().fg(Color::Yellow)
        } else {
            style.add_modifier(Modifier::DIM)
        };

        let alignment = if self.is_own {
            Alignment::Right
        } else {
            Alignment::Left
        };
        let block = Block::bordered()
            .title(Line::from(self.message.author.as_str()).alignment(alignment))
            .border_type(BorderType::Rounded)
            .border_style(border_style)
            .title_style(border_style)
            .padding(Padding::horizontal(CONTENT_PAD_H));

        let inner_area = block.inner(area);
        block.render(area, buf);

        let mut text = Text::styled(self.message.body.trim().to_string(), style);
        let summary = reaction_summary(self.message);
        if !summary.is_empty() {
            text.push_line(Line::styled(summary, Style::default().fg(Color::Yellow)));
        }
        Paragraph::new(text)
            .alignment(alignment)
            .wrap(Wrap { trim: true })
            .render(inner_area, buf);
    }
}

impl<'a> Component for MessageView<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        frame.render_widget(*self, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(body: &str) -> Message {
        Message::new("m1", body, "bob")
    }

    #[test]
    fn calculate_height_single_line() {
        assert_eq!(MessageView::calculate_height(&message("Hello"), 80), 1 + VERTICAL_OVERHEAD);
    }

    #[test]
    fn calculate_height_empty_body_keeps_one_line() {
        assert_eq!(MessageView::calculate_height(&message("   "), 80), 1 + VERTICAL_OVERHEAD);
    }

    #[test]
    fn calculate_height_degenerate_width() {
        assert_eq!(MessageView::calculate_height(&message("Hello"), HORIZONTAL_OVERHEAD), 1);
    }

    #[test]
    fn calculate_height_wraps_at_width_boundary() {
        // content width 5: "Hello" | "world"
        assert_eq!(
            MessageView::calculate_height(&message("Hello world"), 9),
            2 + VERTICAL_OVERHEAD
        );
    }

    #[test]
    fn calculate_height_counts_reaction_line() {
        let mut msg = message("Hello");
        msg.reactions
            .entry("👍".to_string())
            .or_default()
            .insert("alice".to_string());
        assert_eq!(MessageView::calculate_height(&msg, 80), 2 + VERTICAL_OVERHEAD);
    }

    #[test]
    fn reaction_summary_counts_users_and_skips_empty() {
        let mut msg = message("Hello");
        let thumbs = msg.reactions.entry("👍".to_string()).or_default();
        thumbs.insert("alice".to_string());
        thumbs.insert("bob".to_string());
        msg.reactions.entry("😂".to_string()).or_default();
        assert_eq!(reaction_summary(&msg), "👍 2");
    }

    #[test]
    fn style_depends_on_author() {
        let own = message("hi");
        assert_eq!(MessageView::new(&own, true, false).style().fg, Some(Color::Green));
        assert_eq!(MessageView::new(&own, false, false).style().fg, Some(Color::Cyan));

        let agent = Message::new("m2", "beep", "AgentSmith");
        assert_eq!(MessageView::new(&agent, false, false).style().fg, Some(Color::Blue));
    }

    #[test]
    fn partial_fragments_are_dimmed() {
        let mut fragment = Message::new("m3", "thinking", "AI_iask");
        fragment.partial = true;
        let style = MessageView::new(&fragment, false, false).style();
        assert!(style.add_modifier.contains(Modifier::DIM));
        assert!(style.add_modifier.contains(Modifier::ITALIC));
    }

    #[test]
    fn own_messages_render_right_aligned() {
        use ratatui::Terminal;
        use ratatui::backend::TestBackend;

        let msg = message("hi");
        let mut terminal = Terminal::new(TestBackend::new(20, 3)).unwrap();
        terminal
            .draw(|f| f.render_widget(MessageView::new(&msg, true, false), f.area()))
            .unwrap();
        let buffer = terminal.backend().buffer();
        // Last content column sits inside the right border and padding
        assert_eq!(buffer[(17, 1)].symbol(), "i");
        assert_eq!(buffer[(2, 1)].symbol(), " ");
    }
}

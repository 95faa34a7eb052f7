//! # MessageList Component
//!
//! Scrollable view of the active room's messages.
//!
//! ## Responsibilities
//!
//! - Display the message log, newest at the bottom
//! - Stick to the bottom while new messages arrive, unless scrolled up
//! - Keyboard selection (for reactions) and mouse hover hit testing
//! - Cache per-message heights so only changed messages are re-measured
//!
//! `MessageList` is created each frame and borrows `&'a mut MessageListState`
//! (persistent) together with the messages (props).

use ratatui::Frame;
use ratatui::layout::{Alignment, Position, Rect, Size};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::Paragraph;
use tui_scrollview::{ScrollView, ScrollViewState, ScrollbarVisibility};

use crate::channel::Message;
use crate::tui::component::{Component, EventHandler};
use crate::tui::components::message::MessageView;
use crate::tui::event::TuiEvent;

/// Scroll, selection and layout state for the message list.
/// Persisted in `TuiState`.
pub struct MessageListState {
    pub scroll_state: ScrollViewState,
    pub layout: LayoutCache,
    /// When true, auto-scroll to bottom on new content
    pub stick_to_bottom: bool,
    /// Selected message index (hover or keyboard navigation)
    pub selected_index: Option<usize>,
    /// Last known viewport height (for scroll clamping between frames)
    pub viewport_height: u16,
}

impl Default for MessageListState {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageListState {
    pub fn new() -> Self {
        Self {
            scroll_state: ScrollViewState::default(),
            layout: LayoutCache::new(),
            stick_to_bottom: true,
            selected_index: None,
            viewport_height: 0,
        }
    }

    fn max_offset(&self) -> u16 {
        self.layout.total_height().saturating_sub(self.viewport_height)
    }

    /// Clamp scroll offset so it never exceeds the content bounds.
    pub fn clamp_scroll(&mut self) {
        let max_y = self.max_offset();
        let current = self.scroll_state.offset();
        if current.y > max_y {
            self.scroll_state.set_offset(Position { x: current.x, y: max_y });
        }
    }

    /// Re-engage auto-scroll once the user scrolls back to the bottom.
    pub fn repin_if_at_bottom(&mut self) {
        let max_y = self.max_offset();
        let current = self.scroll_state.offset();
        if current.y >= max_y {
            self.stick_to_bottom = true;
            self.scroll_state.set_offset(Position { x: current.x, y: max_y });
        }
    }

    /// Whether messages exist below the visible window.
    pub fn has_unseen_content(&self) -> bool {
        !self.stick_to_bottom && self.scroll_state.offset().y < self.max_offset()
    }

    /// Scroll so the selected message is fully visible; tall messages align to their top.
    pub fn scroll_to_selected(&mut self) {
        let Some(idx) = self.selected_index else {
            return;
        };
        let Some(&item_bottom) = self.layout.prefix_heights.get(idx) else {
            return;
        };
        let item_top = item_bottom - self.layout.heights[idx];
        let offset_y = self.scroll_state.offset().y;

        if item_top < offset_y {
            self.scroll_state.set_offset(Position { x: 0, y: item_top });
            self.stick_to_bottom = false;
        } else if item_bottom > offset_y + self.viewport_height {
            let new_y = item_bottom.saturating_sub(self.viewport_height);
            self.scroll_state.set_offset(Position { x: 0, y: new_y });
            self.stick_to_bottom = new_y >= self.max_offset();
        }
    }

    /// Moves the selection up, starting from the newest message.
    pub fn select_previous(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        self.selected_index = Some(match self.selected_index {
            Some(i) => i.saturating_sub(1).min(len - 1),
            None => len - 1,
        });
        self.scroll_to_selected();
    }

    pub fn select_next(&mut self, len: usize) {
        if let Some(i) = self.selected_index
            && i + 1 < len
        {
            self.selected_index = Some(i + 1);
            self.scroll_to_selected();
        }
    }

    /// Content row (relative to the list's top edge) → message index.
    pub fn hit_test(&self, row_in_view: u16) -> Option<usize> {
        let content_y = row_in_view + self.scroll_state.offset().y;
        let idx = self.layout.prefix_heights.partition_point(|&end| end <= content_y);
        (idx < self.layout.prefix_heights.len()).then_some(idx)
    }
}

pub struct MessageList<'a> {
    pub state: &'a mut MessageListState,
    pub messages: &'a [Message],
    /// The local username, to style own messages
    pub me: &'a str,
}

impl<'a> MessageList<'a> {
    pub fn new(state: &'a mut MessageListState, messages: &'a [Message], me: &'a str) -> Self {
        Self { state, messages, me }
    }
}

impl<'a> Component for MessageList<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        self.state.viewport_height = area.height;

        if self.messages.is_empty() {
            self.state.layout = LayoutCache::new();
            let hint = Paragraph::new("No messages yet. Say hi!")
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC));
            frame.render_widget(hint, area);
            return;
        }

        let content_width = area.width.saturating_sub(1); // -1 for scrollbar
        self.state.layout.measure(self.messages, content_width);
        let total_height = self.state.layout.total_height();

        if self.state.stick_to_bottom {
            let bottom = total_height.saturating_sub(area.height);
            self.state.scroll_state.set_offset(Position { x: 0, y: bottom });
        } else {
            self.state.clamp_scroll();
        }

        let scroll_offset = self.state.scroll_state.offset().y;
        let visible_range = self.state.layout.visible_range(scroll_offset, area.height);

        let mut scroll_view = ScrollView::new(Size::new(content_width, total_height))
            .vertical_scrollbar_visibility(ScrollbarVisibility::Always)
            .horizontal_scrollbar_visibility(ScrollbarVisibility::Never);

        for i in visible_range {
            let height = self.state.layout.heights[i];
            let top = self.state.layout.prefix_heights[i] - height;
            let message = &self.messages[i];
            let view = MessageView::new(
                message,
                message.author == self.me,
                self.state.selected_index == Some(i),
            );
            scroll_view.render_widget(view, Rect::new(0, top, content_width, height));
        }

        frame.render_stateful_widget(scroll_view, area, &mut self.state.scroll_state);
    }
}

impl EventHandler for MessageListState {
    type Event = ();

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match event {
            TuiEvent::ScrollUp => {
                self.scroll_state.scroll_up();
                self.stick_to_bottom = false;
            }
            TuiEvent::ScrollDown => {
                self.scroll_state.scroll_down();
                self.repin_if_at_bottom();
            }
            TuiEvent::ScrollPageUp => {
                self.scroll_state.scroll_page_up();
                self.stick_to_bottom = false;
            }
            TuiEvent::ScrollPageDown => {
                self.scroll_state.scroll_page_down();
                self.repin_if_at_bottom();
            }
            _ => {}
        }
        None
    }
}

/// What a cached height was measured from. Only reactions and streamed
/// bodies change after a message is logged.
#[derive(Debug, Clone, PartialEq, Eq)]
struct MeasureKey {
    id: String,
    body_len: usize,
    reactions: usize,
    partial: bool,
}

impl MeasureKey {
    fn of(message: &Message) -> Self {
        Self {
            id: message.id.clone(),
            body_len: message.body.len(),
            reactions: message.reactions.values().map(|users| users.len()).sum(),
            partial: message.partial,
        }
    }
}

/// Cached layout measurements
#[derive(Default)]
pub struct LayoutCache {
    pub heights: Vec<u16>,
    pub prefix_heights: Vec<u16>,
    keys: Vec<MeasureKey>,
    content_width: u16,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_height(&self) -> u16 {
        self.prefix_heights.last().copied().unwrap_or(0)
    }

    /// Leading heights still valid for `messages` at `content_width`.
    pub fn reusable_count(&self, messages: &[Message], content_width: u16) -> usize {
        if self.content_width != content_width {
            return 0;
        }
        self.keys
            .iter()
            .zip(messages)
            .take_while(|(key, message)| **key == MeasureKey::of(message))
            .count()
    }

    /// Re-measures every message from the first changed one onward.
    pub fn measure(&mut self, messages: &[Message], content_width: u16) {
        let reusable = self.reusable_count(messages, content_width);
        if reusable == messages.len() && reusable == self.heights.len() {
            return;
        }
        self.heights.truncate(reusable);
        self.keys.truncate(reusable);
        for message in &messages[reusable..] {
            self.heights.push(MessageView::calculate_height(message, content_width));
            self.keys.push(MeasureKey::of(message));
        }
        self.content_width = content_width;
        self.rebuild_prefix_heights();
    }

    pub fn rebuild_prefix_heights(&mut self) {
        self.prefix_heights = self
            .heights
            .iter()
            .scan(0u16, |acc, &h| {
                *acc = acc.saturating_add(h);
                Some(*acc)
            })
            .collect();
    }

    /// Indices overlapping the viewport, padded by half a screen each way.
    pub fn visible_range(&self, scroll_offset: u16, viewport_height: u16) -> std::ops::Range<usize> {
        let buffer = viewport_height / 2;
        let buffered_start = scroll_offset.saturating_sub(buffer);
        let buffered_end = scroll_offset
            .saturating_add(viewport_height)
            .saturating_add(buffer);

        let start = self
            .prefix_heights
            .partition_point(|&end| end <= buffered_start);
        let end = self
            .prefix_heights
            .partition_point(|&end| end < buffered_end)
            .saturating_add(1)
            .min(self.prefix_heights.len());

        start..end
    }
}

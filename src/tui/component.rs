use ratatui::Frame;
use ratatui::layout::Rect;

/// A piece of UI that renders itself into a `Rect`.
///
/// Components receive what they display as struct fields ("props") and may
/// borrow persistent state mutably, the same split ratatui makes with
/// `StatefulWidget`. `render` takes `&mut self` so a component can update
/// layout caches or scroll offsets while it draws.
pub trait Component {
    fn render(&mut self, frame: &mut Frame, area: Rect);
}

/// A component that consumes terminal events.
pub trait EventHandler {
    /// The high-level event this component emits.
    type Event;

    /// Handle a low-level `TuiEvent` and optionally return a high-level event.
    fn handle_event(&mut self, event: &super::event::TuiEvent) -> Option<Self::Event>;
}

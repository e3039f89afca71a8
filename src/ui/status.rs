use crate::app::App;
use ratatui::{layout::Rect, widgets::Paragraph, Frame};
use std::borrow::Cow;

/// Render the status bar: message, refresh progress or the page's key hint.
pub fn render(f: &mut Frame, app: &mut App, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    let text: Cow<'_, str> = if let Some((msg, _)) = &app.status_message {
        Cow::Owned(msg.to_string())
    } else if app.refreshing {
        Cow::Borrowed("Checking books for updates...")
    } else {
        let hint = app.shell.current_page().hint();
        if hint.is_empty() {
            Cow::Borrowed("[1-4]tabs [Tab]next [Esc]back [?]help")
        } else {
            Cow::Owned(format!("{hint} · [1-4]tabs [Esc]back [?]help"))
        }
    };

    f.render_widget(Paragraph::new(text).style(app.style("status_bar")), area);
}

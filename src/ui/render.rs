//! Render functions for the TUI.
//!
//! Frame layout, top to bottom: the current page, the bottom navigation bar
//! and the status bar. Dialog and help overlays draw on top.

use crate::app::App;
use crate::pages::PageContext;
use crate::shell::{Tab, TabLayout};
use crate::theme::StyleMap;
use crate::util::unix_now;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

use super::{dialog, help, status};

/// Minimum terminal dimensions required for normal operation.
pub(super) const MIN_WIDTH: u16 = 40;
pub(super) const MIN_HEIGHT: u16 = 10;

/// Elevation at which the navigation bar border turns thick.
const THICK_ELEVATION: u16 = 8;

/// Main render dispatch function.
pub(super) fn render(f: &mut Frame, app: &mut App) {
    let area = f.area();

    if area.width < 1 || area.height < 1 {
        return;
    }

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = if area.height < 3 || area.width < 20 {
            Paragraph::new("Too small")
        } else {
            Paragraph::new(format!(
                "Terminal too small\n\nMinimum: {}x{}\nCurrent: {}x{}",
                MIN_WIDTH, MIN_HEIGHT, area.width, area.height
            ))
            .alignment(Alignment::Center)
        };
        f.render_widget(msg, area);
        return;
    }

    let elevation = app.shell.elevation();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(nav_bar_height(elevation)),
            Constraint::Length(1),
        ])
        .split(area);

    let ctx = PageContext {
        library: &app.library,
        prefs: &app.prefs,
        styles: &app.theme,
        now: unix_now(),
    };
    app.shell.current_page().render(f, chunks[0], &ctx);

    render_nav_bar(
        f,
        chunks[1],
        app.shell.layout(),
        app.shell.current_tab(),
        elevation,
        &app.theme,
        app.library.updated_count(),
    );
    status::render(f, app, chunks[2]);

    if app.show_help {
        help::render(f, app);
    }
    if app.dialog.is_some() {
        dialog::render(f, app);
    }
}

/// A flat bar is one row; any elevation adds a top border.
fn nav_bar_height(elevation: u16) -> u16 {
    if elevation > 0 {
        2
    } else {
        1
    }
}

/// Bottom navigation bar: one entry per visible tab, the checked one
/// highlighted.
fn render_nav_bar(
    f: &mut Frame,
    area: Rect,
    layout: &TabLayout,
    checked: Tab,
    elevation: u16,
    styles: &StyleMap,
    updated_books: usize,
) {
    let mut spans = Vec::with_capacity(layout.count() * 2);
    for (position, tab) in layout.iter().enumerate() {
        if position > 0 {
            spans.push(Span::styled("  ", styles.resolve("nav_bar")));
        }
        let label = match tab {
            Tab::Bookshelf if updated_books > 0 => {
                format!(" {} {} ({updated_books}) ", position + 1, tab.label())
            }
            _ => format!(" {} {} ", position + 1, tab.label()),
        };
        let style = if tab == checked {
            styles.resolve("nav_checked")
        } else {
            styles.resolve("nav_item")
        };
        spans.push(Span::styled(label, style));
    }

    let mut bar = Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .style(styles.resolve("nav_bar"));
    if elevation > 0 {
        let border_type = if elevation >= THICK_ELEVATION {
            BorderType::Thick
        } else {
            BorderType::Plain
        };
        bar = bar.block(
            Block::default()
                .borders(Borders::TOP)
                .border_type(border_type)
                .border_style(styles.resolve("panel_border")),
        );
    }
    f.render_widget(bar, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::test_app;
    use ratatui::{backend::TestBackend, Terminal};

    fn screen(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_nav_bar_height_follows_elevation() {
        assert_eq!(nav_bar_height(0), 1);
        assert_eq!(nav_bar_height(4), 2);
    }

    #[tokio::test]
    async fn test_renders_visible_tabs_only() {
        let mut app = test_app().await;
        app.set_preference("show_rss", "false", Some(crate::shell::Notification::RefreshNavigation))
            .await
            .unwrap();

        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal.draw(|f| render(f, &mut app)).unwrap();
        let text = screen(&terminal);

        assert!(text.contains(" 1 Bookshelf "));
        assert!(text.contains(" 2 Discovery "));
        assert!(text.contains(" 3 Settings "));
        assert!(!text.contains(" 4 Settings "));
    }

    #[tokio::test]
    async fn test_too_small_terminal() {
        let mut app = test_app().await;
        let mut terminal = Terminal::new(TestBackend::new(15, 5)).unwrap();
        terminal.draw(|f| render(f, &mut app)).unwrap();
        assert!(screen(&terminal).contains("Too small"));
    }
}

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use super::{Cursor, Page, PageCommand, PageContext};
use crate::keybindings::Action;
use crate::shell::Tab;
use crate::util::sanitize_line;

#[derive(Debug, Default)]
pub struct RssPage {
    cursor: Cursor,
    list_state: ListState,
}

impl Page for RssPage {
    fn tab(&self) -> Tab {
        Tab::Rss
    }

    fn render(&mut self, f: &mut Frame, area: Rect, ctx: &PageContext<'_>) {
        let sources = &ctx.library.rss_sources;
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(ctx.styles.resolve("panel_border_focused"))
            .title(" RSS ");

        if sources.is_empty() {
            f.render_widget(Paragraph::new("No RSS sources.").block(block), area);
            return;
        }

        let items: Vec<ListItem> = sources
            .iter()
            .map(|source| {
                let style = if source.enabled {
                    ctx.styles.resolve("list_item")
                } else {
                    ctx.styles.resolve("setting_off")
                };
                let mut spans = vec![Span::styled(sanitize_line(&source.name).into_owned(), style)];
                if let Some(group) = &source.source_group {
                    spans.push(Span::styled(
                        format!("  [{}]", sanitize_line(group)),
                        ctx.styles.resolve("list_meta"),
                    ));
                }
                ListItem::new(Line::from(spans))
            })
            .collect();

        self.list_state.select(self.cursor.selected(sources.len()));
        let list = List::new(items)
            .block(block)
            .highlight_style(ctx.styles.resolve("list_selected"));
        f.render_stateful_widget(list, area, &mut self.list_state);
    }

    fn handle_action(&mut self, action: Action, ctx: &PageContext<'_>) -> Option<PageCommand> {
        let sources = &ctx.library.rss_sources;
        match action {
            Action::NavDown => self.cursor.down(sources.len()),
            Action::NavUp => self.cursor.up(sources.len()),
            Action::Select => {
                let source = sources.get(self.cursor.selected(sources.len())?)?;
                return Some(PageCommand::Status(source.url.clone()));
            }
            _ => {}
        }
        None
    }

    fn hint(&self) -> &'static str {
        "Enter show url"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::test_support::{rss, Fixture};
    use crate::storage::Library;

    #[test]
    fn test_select_reports_url() {
        let fx = Fixture::new(Library {
            rss_sources: vec![rss(1, "one"), rss(2, "two")],
            ..Library::default()
        });
        let mut page = RssPage::default();
        page.handle_action(Action::NavDown, &fx.ctx());
        page.handle_action(Action::NavDown, &fx.ctx());
        assert_eq!(
            page.handle_action(Action::Select, &fx.ctx()),
            Some(PageCommand::Status("https://two.example/feed".to_string()))
        );
    }
}

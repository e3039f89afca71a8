use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use super::{Cursor, Page, PageCommand, PageContext};
use crate::keybindings::Action;
use crate::shell::Tab;
use crate::util::{format_relative_time, format_size, sanitize_line, truncate_to_width};

/// Shelf of local books, newest first.
#[derive(Debug, Default)]
pub struct BookshelfPage {
    cursor: Cursor,
    list_state: ListState,
}

impl BookshelfPage {
    pub fn selected(&self, len: usize) -> Option<usize> {
        self.cursor.selected(len)
    }
}

impl Page for BookshelfPage {
    fn tab(&self) -> Tab {
        Tab::Bookshelf
    }

    fn render(&mut self, f: &mut Frame, area: Rect, ctx: &PageContext<'_>) {
        let books = &ctx.library.books;
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(ctx.styles.resolve("panel_border_focused"))
            .title(format!(" Bookshelf ({}) ", books.len()));

        if books.is_empty() {
            let empty = Paragraph::new(vec![
                Line::from("No books on the shelf."),
                Line::from(Span::styled(
                    "Start quire with --add-book FILE to add one.",
                    ctx.styles.resolve("list_meta"),
                )),
            ])
            .block(block);
            f.render_widget(empty, area);
            return;
        }

        let name_width = usize::from(area.width.saturating_sub(4)).saturating_sub(24);
        let items: Vec<ListItem> = books
            .iter()
            .map(|book| {
                let name = sanitize_line(&book.name);
                let mut spans = vec![Span::styled(
                    truncate_to_width(&name, name_width).into_owned(),
                    ctx.styles.resolve("list_item"),
                )];
                if book.has_update {
                    spans.push(Span::styled(" ● new", ctx.styles.resolve("list_badge")));
                }
                spans.push(Span::styled(
                    format!(
                        "  {} · checked {}",
                        format_size(book.size),
                        format_relative_time(book.last_check_time, ctx.now)
                    ),
                    ctx.styles.resolve("list_meta"),
                ));
                ListItem::new(Line::from(spans))
            })
            .collect();

        self.list_state.select(self.cursor.selected(books.len()));
        let list = List::new(items)
            .block(block)
            .highlight_style(ctx.styles.resolve("list_selected"));
        f.render_stateful_widget(list, area, &mut self.list_state);
    }

    fn handle_action(&mut self, action: Action, ctx: &PageContext<'_>) -> Option<PageCommand> {
        let books = &ctx.library.books;
        match action {
            Action::NavDown => self.cursor.down(books.len()),
            Action::NavUp => self.cursor.up(books.len()),
            Action::Select => {
                let book = books.get(self.cursor.selected(books.len())?)?;
                return Some(PageCommand::OpenBook {
                    id: book.id,
                    name: book.name.clone(),
                });
            }
            Action::RefreshBooks => return Some(PageCommand::RefreshBooks),
            _ => {}
        }
        None
    }

    /// Scroll back to the top of the shelf.
    fn shortcut(&mut self) {
        self.cursor.top();
        *self.list_state.offset_mut() = 0;
    }

    fn hint(&self) -> &'static str {
        "Enter open · r refresh · 1 1 top"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::test_support::{book, Fixture};
    use crate::storage::Library;

    fn fixture() -> Fixture {
        Fixture::new(Library {
            books: vec![book(1, "Dune", false), book(2, "Emma", true), book(3, "Ulysses", false)],
            ..Library::default()
        })
    }

    #[test]
    fn test_select_opens_highlighted_book() {
        let fx = fixture();
        let mut page = BookshelfPage::default();
        page.handle_action(Action::NavDown, &fx.ctx());

        assert_eq!(
            page.handle_action(Action::Select, &fx.ctx()),
            Some(PageCommand::OpenBook {
                id: 2,
                name: "Emma".to_string()
            })
        );
    }

    #[test]
    fn test_shortcut_scrolls_to_top() {
        let fx = fixture();
        let mut page = BookshelfPage::default();
        page.handle_action(Action::NavDown, &fx.ctx());
        page.handle_action(Action::NavDown, &fx.ctx());
        assert_eq!(page.selected(3), Some(2));

        page.shortcut();
        assert_eq!(page.selected(3), Some(0));
    }

    #[test]
    fn test_empty_shelf() {
        let fx = Fixture::new(Library::default());
        let mut page = BookshelfPage::default();
        assert_eq!(page.handle_action(Action::Select, &fx.ctx()), None);
        assert_eq!(
            page.handle_action(Action::RefreshBooks, &fx.ctx()),
            Some(PageCommand::RefreshBooks)
        );
    }
}

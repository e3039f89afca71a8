use std::collections::BTreeSet;

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use super::{Cursor, Page, PageCommand, PageContext};
use crate::keybindings::Action;
use crate::shell::Tab;
use crate::storage::BookSource;
use crate::util::sanitize_line;

const UNGROUPED: &str = "Ungrouped";

/// A visible row: a group header or a source inside an expanded group.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Row {
    Group { name: String, count: usize, expanded: bool },
    Source(usize),
}

/// Book sources grouped by their group name, groups expandable.
#[derive(Debug, Default)]
pub struct ExplorePage {
    expanded: BTreeSet<String>,
    cursor: Cursor,
    list_state: ListState,
}

impl ExplorePage {
    fn rows(&self, sources: &[BookSource]) -> Vec<Row> {
        let mut rows = Vec::new();
        let mut i = 0;
        while i < sources.len() {
            let group = group_name(&sources[i]);
            let end = sources[i..]
                .iter()
                .position(|s| group_name(s) != group)
                .map_or(sources.len(), |n| i + n);
            let expanded = self.expanded.contains(group);
            rows.push(Row::Group {
                name: group.to_string(),
                count: end - i,
                expanded,
            });
            if expanded {
                rows.extend((i..end).map(Row::Source));
            }
            i = end;
        }
        rows
    }

    pub fn expanded_groups(&self) -> usize {
        self.expanded.len()
    }

    fn toggle(&mut self, group: &str) {
        if !self.expanded.remove(group) {
            self.expanded.insert(group.to_string());
        }
    }
}

/// Sources arrive sorted by group, so equal groups are contiguous.
fn group_name(source: &BookSource) -> &str {
    source.source_group.as_deref().unwrap_or(UNGROUPED)
}

impl Page for ExplorePage {
    fn tab(&self) -> Tab {
        Tab::Discovery
    }

    fn render(&mut self, f: &mut Frame, area: Rect, ctx: &PageContext<'_>) {
        let sources = &ctx.library.book_sources;
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(ctx.styles.resolve("panel_border_focused"))
            .title(format!(" Discovery ({} sources) ", sources.len()));

        if sources.is_empty() {
            let empty = Paragraph::new(Line::from(Span::styled(
                "No book sources. Import some with --import-sources FILE.",
                ctx.styles.resolve("list_meta"),
            )))
            .block(block);
            f.render_widget(empty, area);
            return;
        }

        let rows = self.rows(sources);
        let items: Vec<ListItem> = rows
            .iter()
            .map(|row| match row {
                Row::Group {
                    name,
                    count,
                    expanded,
                } => {
                    let marker = if *expanded { "▾" } else { "▸" };
                    ListItem::new(Line::from(vec![
                        Span::styled(
                            format!("{marker} {}", sanitize_line(name)),
                            ctx.styles.resolve("group_header"),
                        ),
                        Span::styled(format!("  {count}"), ctx.styles.resolve("list_meta")),
                    ]))
                }
                Row::Source(idx) => {
                    let source = &sources[*idx];
                    let style = if source.enabled {
                        ctx.styles.resolve("list_item")
                    } else {
                        ctx.styles.resolve("setting_off")
                    };
                    ListItem::new(Line::from(vec![
                        Span::styled(format!("    {}", sanitize_line(&source.name)), style),
                        Span::styled(
                            format!("  {}", sanitize_line(&source.url)),
                            ctx.styles.resolve("list_meta"),
                        ),
                    ]))
                }
            })
            .collect();

        self.list_state.select(self.cursor.selected(rows.len()));
        let list = List::new(items)
            .block(block)
            .highlight_style(ctx.styles.resolve("list_selected"));
        f.render_stateful_widget(list, area, &mut self.list_state);
    }

    fn handle_action(&mut self, action: Action, ctx: &PageContext<'_>) -> Option<PageCommand> {
        let sources = &ctx.library.book_sources;
        let rows = self.rows(sources);
        match action {
            Action::NavDown => self.cursor.down(rows.len()),
            Action::NavUp => self.cursor.up(rows.len()),
            Action::Select => match rows.get(self.cursor.selected(rows.len())?)? {
                Row::Group { name, .. } => {
                    let name = name.clone();
                    self.toggle(&name);
                    // Keep the cursor on the header that was toggled
                    if let Some(pos) = self
                        .rows(sources)
                        .iter()
                        .position(|r| matches!(r, Row::Group { name: n, .. } if *n == name))
                    {
                        self.cursor.set(pos);
                    }
                }
                Row::Source(idx) => {
                    let source = &sources[*idx];
                    return Some(PageCommand::Status(format!(
                        "{}: {}",
                        source.name, source.url
                    )));
                }
            },
            _ => {}
        }
        None
    }

    /// Collapse every group and return to the first row.
    fn shortcut(&mut self) {
        self.expanded.clear();
        self.cursor.top();
        *self.list_state.offset_mut() = 0;
    }

    fn hint(&self) -> &'static str {
        "Enter expand · 2 2 collapse all"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::test_support::{source, Fixture};
    use crate::storage::Library;
    use pretty_assertions::assert_eq;

    fn fixture() -> Fixture {
        Fixture::new(Library {
            book_sources: vec![
                source(1, "alpha", Some("Comics")),
                source(2, "beta", Some("Fiction")),
                source(3, "gamma", Some("Fiction")),
                source(4, "delta", None),
            ],
            ..Library::default()
        })
    }

    #[test]
    fn test_groups_start_collapsed() {
        let fx = fixture();
        let page = ExplorePage::default();
        assert_eq!(
            page.rows(&fx.library.book_sources),
            vec![
                Row::Group { name: "Comics".into(), count: 1, expanded: false },
                Row::Group { name: "Fiction".into(), count: 2, expanded: false },
                Row::Group { name: UNGROUPED.into(), count: 1, expanded: false },
            ]
        );
    }

    #[test]
    fn test_select_expands_group_in_place() {
        let fx = fixture();
        let mut page = ExplorePage::default();
        page.handle_action(Action::NavDown, &fx.ctx());
        page.handle_action(Action::Select, &fx.ctx());

        let rows = page.rows(&fx.library.book_sources);
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[2], Row::Source(1));
        assert_eq!(rows[3], Row::Source(2));

        page.handle_action(Action::NavDown, &fx.ctx());
        assert_eq!(
            page.handle_action(Action::Select, &fx.ctx()),
            Some(PageCommand::Status("beta: https://beta.example".to_string()))
        );
    }

    #[test]
    fn test_shortcut_compresses_all_groups() {
        let fx = fixture();
        let mut page = ExplorePage::default();
        page.handle_action(Action::Select, &fx.ctx());
        page.handle_action(Action::NavDown, &fx.ctx());
        page.handle_action(Action::NavDown, &fx.ctx());
        page.handle_action(Action::Select, &fx.ctx());
        assert_eq!(page.expanded_groups(), 2);

        page.shortcut();
        assert_eq!(page.expanded_groups(), 0);
        assert_eq!(page.rows(&fx.library.book_sources).len(), 3);
        assert_eq!(page.cursor.selected(3), Some(0));
    }
}

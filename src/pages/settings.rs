use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};

use super::{Cursor, Page, PageCommand, PageContext};
use crate::keybindings::Action;
use crate::preferences::{ELEVATION_RANGE, THREAD_COUNT_RANGE};
use crate::shell::{Notification, ShellConfig, Tab};

/// One editable row on the settings page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingItem {
    Theme,
    ShowDiscovery,
    ShowRss,
    Elevation,
    AutoRefreshBook,
    ThreadCount,
}

impl SettingItem {
    pub const ALL: [SettingItem; 6] = [
        SettingItem::Theme,
        SettingItem::ShowDiscovery,
        SettingItem::ShowRss,
        SettingItem::Elevation,
        SettingItem::AutoRefreshBook,
        SettingItem::ThreadCount,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Theme => "theme",
            Self::ShowDiscovery => "show_discovery",
            Self::ShowRss => "show_rss",
            Self::Elevation => "elevation",
            Self::AutoRefreshBook => "auto_refresh_book",
            Self::ThreadCount => "thread_count",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Theme => "Theme",
            Self::ShowDiscovery => "Show Discovery",
            Self::ShowRss => "Show RSS",
            Self::Elevation => "Navigation bar elevation",
            Self::AutoRefreshBook => "Auto refresh books",
            Self::ThreadCount => "Refresh threads",
        }
    }

    /// Notification posted after the value changes.
    pub fn notification(self) -> Option<Notification> {
        match self {
            Self::Theme | Self::Elevation => Some(Notification::Recreate),
            Self::ShowDiscovery | Self::ShowRss => Some(Notification::RefreshNavigation),
            Self::ThreadCount => Some(Notification::ThreadCountChanged),
            Self::AutoRefreshBook => None,
        }
    }

    fn display(self, cfg: &dyn ShellConfig) -> (String, bool) {
        match self {
            Self::Theme => (cfg.theme().name().to_string(), true),
            Self::ShowDiscovery => on_off(cfg.show_discovery()),
            Self::ShowRss => on_off(cfg.show_rss()),
            Self::Elevation => match cfg.elevation() {
                e if e < 0 => ("theme default".to_string(), true),
                e => (e.to_string(), true),
            },
            Self::AutoRefreshBook => on_off(cfg.auto_refresh_book()),
            Self::ThreadCount => (cfg.thread_count().to_string(), true),
        }
    }

    /// New value after stepping by `delta` (toggles ignore the sign).
    fn step(self, cfg: &dyn ShellConfig, delta: i32) -> Option<String> {
        let value = match self {
            Self::Theme => cfg.theme().next().key().to_string(),
            Self::ShowDiscovery => (!cfg.show_discovery()).to_string(),
            Self::ShowRss => (!cfg.show_rss()).to_string(),
            Self::AutoRefreshBook => (!cfg.auto_refresh_book()).to_string(),
            Self::Elevation => {
                let next = (cfg.elevation() + delta)
                    .clamp(*ELEVATION_RANGE.start(), *ELEVATION_RANGE.end());
                if next == cfg.elevation() {
                    return None;
                }
                next.to_string()
            }
            Self::ThreadCount => {
                let current = cfg.thread_count();
                let next = if delta < 0 {
                    current.saturating_sub(1)
                } else {
                    current + 1
                }
                .clamp(*THREAD_COUNT_RANGE.start(), *THREAD_COUNT_RANGE.end());
                if next == current {
                    return None;
                }
                next.to_string()
            }
        };
        Some(value)
    }
}

fn on_off(value: bool) -> (String, bool) {
    (if value { "on" } else { "off" }.to_string(), value)
}

#[derive(Debug, Default)]
pub struct SettingsPage {
    cursor: Cursor,
    list_state: ListState,
}

impl SettingsPage {
    fn current(&self) -> Option<SettingItem> {
        self.cursor
            .selected(SettingItem::ALL.len())
            .map(|i| SettingItem::ALL[i])
    }

    fn change(&self, item: SettingItem, ctx: &PageContext<'_>, delta: i32) -> Option<PageCommand> {
        let value = item.step(ctx.prefs, delta)?;
        Some(PageCommand::SetPreference {
            key: item.key(),
            value,
            notify: item.notification(),
        })
    }
}

impl Page for SettingsPage {
    fn tab(&self) -> Tab {
        Tab::Settings
    }

    fn render(&mut self, f: &mut Frame, area: Rect, ctx: &PageContext<'_>) {
        let items: Vec<ListItem> = SettingItem::ALL
            .iter()
            .map(|item| {
                let (value, on) = item.display(ctx.prefs);
                let value_style = if on {
                    ctx.styles.resolve("setting_on")
                } else {
                    ctx.styles.resolve("setting_off")
                };
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{:<28}", item.label()), ctx.styles.resolve("list_item")),
                    Span::styled(value, value_style),
                ]))
            })
            .collect();

        self.list_state.select(self.cursor.selected(items.len()));
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(ctx.styles.resolve("panel_border_focused"))
                    .title(" Settings "),
            )
            .highlight_style(ctx.styles.resolve("list_selected"));
        f.render_stateful_widget(list, area, &mut self.list_state);
    }

    fn handle_action(&mut self, action: Action, ctx: &PageContext<'_>) -> Option<PageCommand> {
        let len = SettingItem::ALL.len();
        match action {
            Action::NavDown => self.cursor.down(len),
            Action::NavUp => self.cursor.up(len),
            Action::Select | Action::Increase => return self.change(self.current()?, ctx, 1),
            Action::Decrease => return self.change(self.current()?, ctx, -1),
            _ => {}
        }
        None
    }

    fn hint(&self) -> &'static str {
        "Enter toggle · +/- adjust"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::test_support::Fixture;
    use crate::storage::Library;

    fn select(page: &mut SettingsPage, item: SettingItem) {
        let idx = SettingItem::ALL.iter().position(|i| *i == item).unwrap();
        page.cursor.set(idx);
    }

    #[test]
    fn test_toggle_rss_refreshes_navigation() {
        let fx = Fixture::new(Library::default());
        let mut page = SettingsPage::default();
        select(&mut page, SettingItem::ShowRss);

        assert_eq!(
            page.handle_action(Action::Select, &fx.ctx()),
            Some(PageCommand::SetPreference {
                key: "show_rss",
                value: "false".to_string(),
                notify: Some(Notification::RefreshNavigation),
            })
        );
    }

    #[test]
    fn test_theme_cycles_and_recreates() {
        let fx = Fixture::new(Library::default());
        let mut page = SettingsPage::default();
        assert_eq!(
            page.handle_action(Action::Select, &fx.ctx()),
            Some(PageCommand::SetPreference {
                key: "theme",
                value: "light".to_string(),
                notify: Some(Notification::Recreate),
            })
        );
    }

    #[test]
    fn test_thread_count_steps_within_range() {
        let fx = Fixture::new(Library::default());
        let mut page = SettingsPage::default();
        select(&mut page, SettingItem::ThreadCount);

        assert_eq!(
            page.handle_action(Action::Decrease, &fx.ctx()),
            Some(PageCommand::SetPreference {
                key: "thread_count",
                value: "15".to_string(),
                notify: Some(Notification::ThreadCountChanged),
            })
        );
    }

    #[test]
    fn test_elevation_floor_is_noop() {
        let fx = Fixture::new(Library::default());
        let mut page = SettingsPage::default();
        select(&mut page, SettingItem::Elevation);

        assert_eq!(page.handle_action(Action::Decrease, &fx.ctx()), None);
        assert!(matches!(
            page.handle_action(Action::Increase, &fx.ctx()),
            Some(PageCommand::SetPreference { key: "elevation", ref value, .. }) if value == "0"
        ));
    }

    #[test]
    fn test_auto_refresh_has_no_notification() {
        assert_eq!(SettingItem::AutoRefreshBook.notification(), None);
    }
}

//! Tab pages hosted by the navigation shell.
//!
//! Each page owns its own cursor and view state; the data it shows comes in
//! through [`PageContext`] on every call so a reloaded [`Library`] is picked
//! up without rebuilding the page.

mod bookshelf;
mod explore;
mod rss;
mod settings;

pub use bookshelf::BookshelfPage;
pub use explore::ExplorePage;
pub use rss::RssPage;
pub use settings::{SettingItem, SettingsPage};

use ratatui::{layout::Rect, Frame};

use crate::keybindings::Action;
use crate::preferences::PreferenceManager;
use crate::shell::{Notification, PageFactory, Tab};
use crate::storage::Library;
use crate::theme::StyleMap;

/// Everything a page may read while rendering or handling input.
pub struct PageContext<'a> {
    pub library: &'a Library,
    pub prefs: &'a PreferenceManager,
    pub styles: &'a StyleMap,
    /// Unix seconds, for relative timestamps.
    pub now: i64,
}

/// Work a page asks the application to do on its behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCommand {
    /// Persist a preference, then post the notification if any.
    SetPreference {
        key: &'static str,
        value: String,
        notify: Option<Notification>,
    },
    OpenBook { id: i64, name: String },
    RefreshBooks,
    Status(String),
}

/// A tab's content view.
pub trait Page: Send {
    fn tab(&self) -> Tab;

    fn render(&mut self, f: &mut Frame, area: Rect, ctx: &PageContext<'_>);

    fn handle_action(&mut self, action: Action, ctx: &PageContext<'_>) -> Option<PageCommand>;

    /// Reselection shortcut. Most pages have none.
    fn shortcut(&mut self) {}

    /// One-line key hint for the status bar.
    fn hint(&self) -> &'static str {
        ""
    }
}

/// Builds the real pages.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPages;

impl PageFactory for DefaultPages {
    fn create(&self, tab: Tab) -> Box<dyn Page> {
        match tab {
            Tab::Bookshelf => Box::new(BookshelfPage::default()),
            Tab::Discovery => Box::new(ExplorePage::default()),
            Tab::Rss => Box::new(RssPage::default()),
            Tab::Settings => Box::new(SettingsPage::default()),
        }
    }
}

// ============================================================================
// Cursor
// ============================================================================

/// Selection index into a list whose length can change underneath it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Cursor {
    selected: usize,
}

impl Cursor {
    pub(crate) fn selected(&self, len: usize) -> Option<usize> {
        (len > 0).then(|| self.selected.min(len - 1))
    }

    pub(crate) fn down(&mut self, len: usize) {
        if len > 0 {
            self.selected = (self.selected + 1).min(len - 1);
        }
    }

    pub(crate) fn up(&mut self, len: usize) {
        self.selected = self.selected.min(len.saturating_sub(1)).saturating_sub(1);
    }

    pub(crate) fn top(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn set(&mut self, index: usize) {
        self.selected = index;
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_clamps_to_shrinking_list() {
        let mut cursor = Cursor::default();
        assert_eq!(cursor.selected(0), None);
        cursor.down(5);
        cursor.down(5);
        assert_eq!(cursor.selected(5), Some(2));
        assert_eq!(cursor.selected(2), Some(1));
        cursor.up(2);
        assert_eq!(cursor.selected(2), Some(0));
        cursor.up(2);
        assert_eq!(cursor.selected(2), Some(0));
    }

    #[test]
    fn test_default_pages_build_matching_tabs() {
        for tab in Tab::ALL {
            assert_eq!(DefaultPages.create(tab).tab(), tab);
        }
    }
}

//! Paged container state bound to the bottom navigation bar.

use super::pages::PageAdapter;
use super::tabs::Tab;

/// Emitted whenever the displayed page changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSelected {
    pub position: usize,
    /// Navigation entry that is now checked.
    pub tab: Tab,
}

/// Tracks the current page and keeps neighbouring pages alive.
#[derive(Debug)]
pub struct PageHost {
    current: usize,
    offscreen_limit: usize,
    checked: Tab,
}

impl PageHost {
    pub fn new(offscreen_limit: usize) -> Self {
        Self {
            current: 0,
            offscreen_limit,
            checked: Tab::Bookshelf,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    /// Navigation entry currently marked checked.
    pub fn checked(&self) -> Tab {
        self.checked
    }

    pub fn offscreen_limit(&self) -> usize {
        self.offscreen_limit
    }

    /// Jump to `position` without animation.
    ///
    /// Out-of-range positions are clamped to the last page. Returns the
    /// selection notification when the displayed page actually changed.
    pub fn set_current(
        &mut self,
        position: usize,
        adapter: &mut PageAdapter,
    ) -> Option<PageSelected> {
        let count = adapter.item_count();
        let position = position.min(count.saturating_sub(1));
        let tab = adapter.item_id(position)?;
        self.retain_window(position, adapter);

        if position == self.current && tab == self.checked {
            return None;
        }
        self.current = position;
        Some(self.on_page_selected(position, tab))
    }

    /// Re-apply the current position after the adapter's data changed.
    ///
    /// Always notifies, since the tab behind the position may differ.
    pub fn rebind(&mut self, position: usize, adapter: &mut PageAdapter) -> Option<PageSelected> {
        let position = position.min(adapter.item_count().saturating_sub(1));
        let tab = adapter.item_id(position)?;
        self.retain_window(position, adapter);
        self.current = position;
        Some(self.on_page_selected(position, tab))
    }

    fn on_page_selected(&mut self, position: usize, tab: Tab) -> PageSelected {
        self.checked = tab;
        tracing::debug!(position, tab = tab.label(), "Page selected");
        PageSelected { position, tab }
    }

    /// Instantiate every page inside the offscreen window around `position`.
    fn retain_window(&self, position: usize, adapter: &mut PageAdapter) {
        let start = position.saturating_sub(self.offscreen_limit);
        let end = (position + self.offscreen_limit).min(adapter.item_count().saturating_sub(1));
        for p in start..=end {
            adapter.create_page(p);
        }
    }
}

//! Page adapter: lazily builds and memoizes one page per tab.

use std::collections::HashMap;

use super::tabs::{Tab, TabLayout};
use crate::pages::Page;

/// Builds the page instance for a tab.
pub trait PageFactory: Send {
    fn create(&self, tab: Tab) -> Box<dyn Page>;
}

/// Bridges the visible [`TabLayout`] and the page instances.
///
/// Instances are created on first need and never evicted; a tab hidden by a
/// layout change keeps its page so it comes back with its state intact.
pub struct PageAdapter {
    layout: TabLayout,
    pages: HashMap<Tab, Box<dyn Page>>,
    factory: Box<dyn PageFactory>,
}

impl PageAdapter {
    pub fn new(layout: TabLayout, factory: Box<dyn PageFactory>) -> Self {
        Self {
            layout,
            pages: HashMap::with_capacity(Tab::ALL.len()),
            factory,
        }
    }

    pub fn layout(&self) -> &TabLayout {
        &self.layout
    }

    /// Swap in a recomputed layout (a full dataset change).
    pub fn notify_layout_changed(&mut self, layout: TabLayout) {
        tracing::debug!(count = layout.count(), "Page layout changed");
        self.layout = layout;
    }

    /// Whether a page instance exists for `tab`.
    pub fn contains_item(&self, tab: Tab) -> bool {
        self.pages.contains_key(&tab)
    }

    pub fn item_count(&self) -> usize {
        self.layout.count()
    }

    /// Tab id at a dense position.
    pub fn item_id(&self, position: usize) -> Option<Tab> {
        self.layout.id_at(position)
    }

    /// Ensure the page at `position` exists, building it on first request.
    pub fn create_page(&mut self, position: usize) -> Option<&mut Box<dyn Page>> {
        let tab = self.item_id(position)?;
        Some(self.page_entry(tab))
    }

    /// Page for `tab`, creating it if needed.
    pub fn page_entry(&mut self, tab: Tab) -> &mut Box<dyn Page> {
        let factory = &self.factory;
        self.pages.entry(tab).or_insert_with(|| {
            tracing::debug!(tab = tab.label(), "Creating page");
            factory.create(tab)
        })
    }

    /// Existing page for `tab`, without creating one.
    pub fn get_mut(&mut self, tab: Tab) -> Option<&mut Box<dyn Page>> {
        self.pages.get_mut(&tab)
    }

    /// Number of live page instances.
    pub fn live_count(&self) -> usize {
        self.pages.len()
    }

    /// Drop every page instance.
    pub fn clear(&mut self) {
        self.pages.clear();
    }
}

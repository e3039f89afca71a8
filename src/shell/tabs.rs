//! Tab visibility resolution.
//!
//! The bottom navigation always carries four logical entries. Two of them
//! (Discovery and RSS) can be hidden through configuration, so the dense
//! page positions shown to the user have to be remapped onto stable tab ids.

// ============================================================================
// Tab
// ============================================================================

/// A logical tab with a stable small-integer id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tab {
    Bookshelf,
    Discovery,
    Rss,
    Settings,
}

impl Tab {
    /// All tabs in navigation-menu order.
    pub const ALL: [Tab; 4] = [Tab::Bookshelf, Tab::Discovery, Tab::Rss, Tab::Settings];

    /// Stable id (0-3), also the index of the entry in the navigation menu.
    pub fn id(self) -> usize {
        match self {
            Self::Bookshelf => 0,
            Self::Discovery => 1,
            Self::Rss => 2,
            Self::Settings => 3,
        }
    }

    /// Inverse of [`Tab::id`]. Any id past RSS resolves to Settings.
    pub fn from_id(id: usize) -> Self {
        match id {
            0 => Self::Bookshelf,
            1 => Self::Discovery,
            2 => Self::Rss,
            _ => Self::Settings,
        }
    }

    /// Label shown in the bottom navigation bar.
    pub fn label(self) -> &'static str {
        match self {
            Self::Bookshelf => "Bookshelf",
            Self::Discovery => "Discovery",
            Self::Rss => "RSS",
            Self::Settings => "Settings",
        }
    }
}

// ============================================================================
// Tab Layout
// ============================================================================

/// Position-to-tab map for the currently visible tab set.
///
/// Position 0 is always Bookshelf and the last position is always Settings.
/// Discovery and RSS sit between them, Discovery first, when shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabLayout {
    positions: Vec<Tab>,
}

impl TabLayout {
    /// Build the layout from the two visibility flags.
    pub fn resolve(show_discovery: bool, show_rss: bool) -> Self {
        let mut positions = Vec::with_capacity(4);
        positions.push(Tab::Bookshelf);
        if show_discovery {
            positions.push(Tab::Discovery);
        }
        if show_rss {
            positions.push(Tab::Rss);
        }
        positions.push(Tab::Settings);
        Self { positions }
    }

    /// Number of visible tabs (2-4).
    pub fn count(&self) -> usize {
        self.positions.len()
    }

    /// Tab shown at `position`, or `None` past the end.
    pub fn id_at(&self, position: usize) -> Option<Tab> {
        self.positions.get(position).copied()
    }

    /// Dense position of `tab`, or `None` when it is hidden.
    pub fn position_of(&self, tab: Tab) -> Option<usize> {
        self.positions.iter().position(|t| *t == tab)
    }

    /// Whether `tab` is part of the visible set.
    pub fn contains(&self, tab: Tab) -> bool {
        self.positions.contains(&tab)
    }

    /// Position of the Settings tab (always the last one).
    pub fn settings_position(&self) -> usize {
        self.positions.len() - 1
    }

    /// Visible tabs in position order.
    pub fn iter(&self) -> impl Iterator<Item = Tab> + '_ {
        self.positions.iter().copied()
    }
}

impl Default for TabLayout {
    fn default() -> Self {
        Self::resolve(true, true)
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Theme system for the TUI.
//!
//! Provides semantic color roles that map to ratatui `Style` values.
//! The `ThemeVariant` enum selects between Dark and Light palettes,
//! and `StyleMap` resolves role names to concrete styles.

use ratatui::style::{Color, Modifier, Style};
use std::collections::HashMap;

// ============================================================================
// Theme Variant
// ============================================================================

/// Available theme variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeVariant {
    Dark,
    Light,
}

impl ThemeVariant {
    /// Parse a variant name from a string (case-insensitive).
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dark" => Some(Self::Dark),
            "light" => Some(Self::Light),
            _ => None,
        }
    }

    /// Build the `ColorPalette` for this variant.
    pub fn palette(self) -> ColorPalette {
        match self {
            Self::Dark => ColorPalette::dark(),
            Self::Light => ColorPalette::light(),
        }
    }

    /// Cycle to the next variant: Dark → Light → Dark.
    pub fn next(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    /// Lowercase name, as stored in preferences.
    pub fn key(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }

    /// Human-readable name for status display.
    pub fn name(self) -> &'static str {
        match self {
            Self::Dark => "Dark",
            Self::Light => "Light",
        }
    }

    /// Elevation of the navigation bar when the user has not overridden it.
    pub fn default_elevation(self) -> u16 {
        match self {
            Self::Dark => 4,
            Self::Light => 2,
        }
    }
}

/// Effective bottom-bar elevation: negative settings defer to the theme.
pub fn resolve_elevation(setting: i32, theme_default: u16) -> u16 {
    if setting < 0 {
        theme_default
    } else {
        u16::try_from(setting).unwrap_or(u16::MAX)
    }
}

// ============================================================================
// Color Palette: semantic roles to Style
// ============================================================================

/// A complete color palette mapping every semantic UI role to a `Style`.
#[derive(Debug, Clone)]
pub struct ColorPalette {
    // -- Navigation bar --
    pub nav_bar: Style,
    pub nav_item: Style,
    pub nav_checked: Style,

    // -- Lists --
    pub list_item: Style,
    pub list_selected: Style,
    pub list_meta: Style,
    pub list_badge: Style,
    pub group_header: Style,
    pub setting_on: Style,
    pub setting_off: Style,

    // -- Dialog --
    pub dialog_heading: Style,
    pub dialog_body: Style,
    pub dialog_code: Style,
    pub dialog_emphasis: Style,
    pub dialog_strong: Style,
    pub dialog_countdown: Style,

    // -- Chrome --
    pub status_bar: Style,
    pub panel_border: Style,
    pub panel_border_focused: Style,
}

impl ColorPalette {
    fn dark() -> Self {
        Self {
            nav_bar: Style::default().bg(Color::Black),
            nav_item: Style::default().fg(Color::Gray),
            nav_checked: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),

            list_item: Style::default(),
            list_selected: Style::default().bg(Color::DarkGray).fg(Color::White),
            list_meta: Style::default().fg(Color::DarkGray),
            list_badge: Style::default().fg(Color::Yellow),
            group_header: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            setting_on: Style::default().fg(Color::Green),
            setting_off: Style::default().fg(Color::DarkGray),

            dialog_heading: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            dialog_body: Style::default(),
            dialog_code: Style::default().fg(Color::Yellow).bg(Color::Black),
            dialog_emphasis: Style::default().add_modifier(Modifier::ITALIC),
            dialog_strong: Style::default().add_modifier(Modifier::BOLD),
            dialog_countdown: Style::default().fg(Color::Yellow),

            status_bar: Style::default().bg(Color::DarkGray).fg(Color::White),
            panel_border: Style::default(),
            panel_border_focused: Style::default().fg(Color::Cyan),
        }
    }

    fn light() -> Self {
        Self {
            nav_bar: Style::default().bg(Color::White),
            nav_item: Style::default().fg(Color::DarkGray),
            nav_checked: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),

            list_item: Style::default().fg(Color::Black),
            list_selected: Style::default().bg(Color::Blue).fg(Color::White),
            list_meta: Style::default().fg(Color::DarkGray),
            list_badge: Style::default().fg(Color::Magenta),
            group_header: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            setting_on: Style::default().fg(Color::Green),
            setting_off: Style::default().fg(Color::Gray),

            dialog_heading: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            dialog_body: Style::default().fg(Color::Black),
            dialog_code: Style::default().fg(Color::DarkGray).bg(Color::White),
            dialog_emphasis: Style::default().add_modifier(Modifier::ITALIC),
            dialog_strong: Style::default().add_modifier(Modifier::BOLD),
            dialog_countdown: Style::default().fg(Color::Magenta),

            status_bar: Style::default().bg(Color::White).fg(Color::Black),
            panel_border: Style::default().fg(Color::DarkGray),
            panel_border_focused: Style::default().fg(Color::Blue),
        }
    }
}

// ============================================================================
// Style Map: string-keyed lookup
// ============================================================================

/// String-keyed style lookup, built from a `ColorPalette`.
#[derive(Debug, Clone)]
pub struct StyleMap {
    map: HashMap<&'static str, Style>,
}

/// All semantic role names, in declaration order.
const ROLE_NAMES: [&str; 19] = [
    "nav_bar",
    "nav_item",
    "nav_checked",
    "list_item",
    "list_selected",
    "list_meta",
    "list_badge",
    "group_header",
    "setting_on",
    "setting_off",
    "dialog_heading",
    "dialog_body",
    "dialog_code",
    "dialog_emphasis",
    "dialog_strong",
    "dialog_countdown",
    "status_bar",
    "panel_border",
    "panel_border_focused",
];

impl StyleMap {
    /// Build a `StyleMap` from a `ColorPalette`.
    pub fn from_palette(p: &ColorPalette) -> Self {
        let styles: [Style; 19] = [
            p.nav_bar,
            p.nav_item,
            p.nav_checked,
            p.list_item,
            p.list_selected,
            p.list_meta,
            p.list_badge,
            p.group_header,
            p.setting_on,
            p.setting_off,
            p.dialog_heading,
            p.dialog_body,
            p.dialog_code,
            p.dialog_emphasis,
            p.dialog_strong,
            p.dialog_countdown,
            p.status_bar,
            p.panel_border,
            p.panel_border_focused,
        ];

        let mut map = HashMap::with_capacity(ROLE_NAMES.len());
        for (name, style) in ROLE_NAMES.iter().zip(styles.iter()) {
            map.insert(*name, *style);
        }

        Self { map }
    }

    /// Resolve a role name to its `Style`. Returns `Style::default()` for unknown roles.
    pub fn resolve(&self, role: &str) -> Style {
        self.map.get(role).copied().unwrap_or_default()
    }
}

impl Default for StyleMap {
    fn default() -> Self {
        Self::from_palette(&ThemeVariant::Dark.palette())
    }
}

// ============================================================================
// Tests
// ============================================================================

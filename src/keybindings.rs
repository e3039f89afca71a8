//! Keybinding registry: maps actions to key events with config overrides.
//!
//! Bindings are grouped by context so the same key can mean different things
//! on different pages, with Global as the fallback for every page.
use crossterm::event::{KeyCode, KeyModifiers};
use std::collections::HashMap;

use crate::shell::Tab;

// ============================================================================
// Action Enum
// ============================================================================

/// All user-facing actions that can be triggered by keybindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Quit,
    Back,
    NavDown,
    NavUp,
    Select,
    Increase,
    Decrease,
    NextPage,
    PrevPage,
    GotoBookshelf,
    GotoDiscovery,
    GotoRss,
    GotoSettings,
    RefreshBooks,
    ShowHelp,
    DismissDialog,
    ScrollDown,
    ScrollUp,
}

impl Action {
    /// Human-readable description for the help screen.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Quit => "Quit immediately",
            Self::Back => "Back (twice on bookshelf to exit)",
            Self::NavDown => "Navigate down",
            Self::NavUp => "Navigate up",
            Self::Select => "Select / toggle",
            Self::Increase => "Increase value",
            Self::Decrease => "Decrease value",
            Self::NextPage => "Next tab",
            Self::PrevPage => "Previous tab",
            Self::GotoBookshelf => "Bookshelf (twice: scroll to top)",
            Self::GotoDiscovery => "Discovery (twice: collapse groups)",
            Self::GotoRss => "RSS",
            Self::GotoSettings => "Settings",
            Self::RefreshBooks => "Check books for updates",
            Self::ShowHelp => "Show help",
            Self::DismissDialog => "Close dialog",
            Self::ScrollDown => "Scroll down one line",
            Self::ScrollUp => "Scroll up one line",
        }
    }

    /// Navigation entry selected by this action, if it is a tab shortcut.
    pub fn tab(self) -> Option<Tab> {
        match self {
            Self::GotoBookshelf => Some(Tab::Bookshelf),
            Self::GotoDiscovery => Some(Tab::Discovery),
            Self::GotoRss => Some(Tab::Rss),
            Self::GotoSettings => Some(Tab::Settings),
            _ => None,
        }
    }
}

// ============================================================================
// Context Enum
// ============================================================================

/// Dispatch context. Determines which bindings are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Context {
    Global,
    Bookshelf,
    Discovery,
    Rss,
    Settings,
    Dialog,
}

impl Context {
    /// Page context for a tab.
    pub fn for_tab(tab: Tab) -> Self {
        match tab {
            Tab::Bookshelf => Self::Bookshelf,
            Tab::Discovery => Self::Discovery,
            Tab::Rss => Self::Rss,
            Tab::Settings => Self::Settings,
        }
    }
}

// ============================================================================
// Key Specification
// ============================================================================

/// A key event: code + modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeySpec {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeySpec {
    pub const fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    pub const fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    pub const fn ctrl(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    /// Terminals report Shift on uppercase letters and BackTab; bindings don't.
    fn normalized(mut self) -> Self {
        if matches!(self.code, KeyCode::Char(_) | KeyCode::BackTab) {
            self.modifiers.remove(KeyModifiers::SHIFT);
        }
        self
    }
}

/// Parse a key string from config into a KeySpec.
///
/// Supported formats:
/// - Single char: "q", "j", "/"
/// - Named keys: "Enter", "Esc", "Tab", "BackTab", "Up", "Down", "Backspace"
/// - Modifier combos: "Ctrl+d", "Ctrl+q"
/// - Function keys: "F1" through "F12"
fn parse_key_string(s: &str) -> Option<KeySpec> {
    let s = s.trim();

    if let Some(rest) = s.strip_prefix("Ctrl+") {
        let rest = rest.trim();
        if rest.chars().count() == 1 {
            let c = rest.chars().next()?;
            return Some(KeySpec::ctrl(c));
        }
        return None;
    }

    match s.to_lowercase().as_str() {
        "enter" | "return" => return Some(KeySpec::plain(KeyCode::Enter)),
        "esc" | "escape" => return Some(KeySpec::plain(KeyCode::Esc)),
        "tab" => return Some(KeySpec::plain(KeyCode::Tab)),
        "backtab" => return Some(KeySpec::plain(KeyCode::BackTab)),
        "up" => return Some(KeySpec::plain(KeyCode::Up)),
        "down" => return Some(KeySpec::plain(KeyCode::Down)),
        "left" => return Some(KeySpec::plain(KeyCode::Left)),
        "right" => return Some(KeySpec::plain(KeyCode::Right)),
        "backspace" => return Some(KeySpec::plain(KeyCode::Backspace)),
        "space" => return Some(KeySpec::plain(KeyCode::Char(' '))),
        _ => {}
    }

    if s.starts_with('F') || s.starts_with('f') {
        if let Ok(n) = s[1..].parse::<u8>() {
            if (1..=12).contains(&n) {
                return Some(KeySpec::plain(KeyCode::F(n)));
            }
        }
    }

    if s.chars().count() == 1 {
        let c = s.chars().next()?;
        return Some(KeySpec::plain(KeyCode::Char(c)));
    }

    None
}

/// Format a KeySpec as a human-readable string for the help screen.
fn format_key(key: &KeySpec) -> String {
    let modifier = if key.modifiers.contains(KeyModifiers::CONTROL) {
        "Ctrl+"
    } else {
        ""
    };

    let key_name = match key.code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::BackTab => "Shift+Tab".to_string(),
        KeyCode::Up => "Up".to_string(),
        KeyCode::Down => "Down".to_string(),
        KeyCode::Left => "Left".to_string(),
        KeyCode::Right => "Right".to_string(),
        KeyCode::Backspace => "Backspace".to_string(),
        KeyCode::F(n) => format!("F{}", n),
        _ => "?".to_string(),
    };

    format!("{}{}", modifier, key_name)
}

// ============================================================================
// Keybinding Registry
// ============================================================================

/// Registry of keybindings, supporting default bindings and config overrides.
///
/// Lookup is O(1) via HashMap. The same key can map to different actions in
/// different contexts; Global is consulted when the page context has no match.
pub struct KeybindingRegistry {
    lookup: HashMap<(Context, KeySpec), Action>,
    bindings: Vec<(Context, KeySpec, Action)>,
}

impl KeybindingRegistry {
    /// Create a registry with the default bindings.
    pub fn new() -> Self {
        let mut registry = Self {
            lookup: HashMap::new(),
            bindings: Vec::new(),
        };
        registry.register_defaults();
        registry
    }

    fn bind(&mut self, context: Context, key: KeySpec, action: Action) {
        self.lookup.insert((context, key), action);
        self.bindings.push((context, key, action));
    }

    fn register_defaults(&mut self) {
        use KeyCode::Char;

        // === Global ===
        self.bind(Context::Global, KeySpec::ctrl('q'), Action::Quit);
        self.bind(Context::Global, KeySpec::plain(KeyCode::Esc), Action::Back);
        self.bind(
            Context::Global,
            KeySpec::plain(KeyCode::Backspace),
            Action::Back,
        );

        self.bind(Context::Global, KeySpec::plain(Char('j')), Action::NavDown);
        self.bind(Context::Global, KeySpec::plain(KeyCode::Down), Action::NavDown);
        self.bind(Context::Global, KeySpec::plain(Char('k')), Action::NavUp);
        self.bind(Context::Global, KeySpec::plain(KeyCode::Up), Action::NavUp);
        self.bind(Context::Global, KeySpec::plain(KeyCode::Enter), Action::Select);

        // Paging and navigation entries
        self.bind(Context::Global, KeySpec::plain(KeyCode::Tab), Action::NextPage);
        self.bind(
            Context::Global,
            KeySpec::plain(KeyCode::BackTab),
            Action::PrevPage,
        );
        self.bind(Context::Global, KeySpec::plain(Char('1')), Action::GotoBookshelf);
        self.bind(Context::Global, KeySpec::plain(Char('2')), Action::GotoDiscovery);
        self.bind(Context::Global, KeySpec::plain(Char('3')), Action::GotoRss);
        self.bind(Context::Global, KeySpec::plain(Char('4')), Action::GotoSettings);

        self.bind(Context::Global, KeySpec::plain(Char('?')), Action::ShowHelp);

        // === Bookshelf ===
        self.bind(
            Context::Bookshelf,
            KeySpec::plain(Char('r')),
            Action::RefreshBooks,
        );

        // === Settings ===
        self.bind(Context::Settings, KeySpec::plain(Char('+')), Action::Increase);
        self.bind(Context::Settings, KeySpec::plain(Char('=')), Action::Increase);
        self.bind(
            Context::Settings,
            KeySpec::plain(KeyCode::Right),
            Action::Increase,
        );
        self.bind(Context::Settings, KeySpec::plain(Char('-')), Action::Decrease);
        self.bind(
            Context::Settings,
            KeySpec::plain(KeyCode::Left),
            Action::Decrease,
        );
        self.bind(Context::Settings, KeySpec::plain(Char(' ')), Action::Select);

        // === Dialog ===
        self.bind(
            Context::Dialog,
            KeySpec::plain(KeyCode::Esc),
            Action::DismissDialog,
        );
        self.bind(
            Context::Dialog,
            KeySpec::plain(KeyCode::Enter),
            Action::DismissDialog,
        );
        self.bind(Context::Dialog, KeySpec::plain(Char('q')), Action::DismissDialog);
        self.bind(Context::Dialog, KeySpec::plain(Char('j')), Action::ScrollDown);
        self.bind(Context::Dialog, KeySpec::plain(KeyCode::Down), Action::ScrollDown);
        self.bind(Context::Dialog, KeySpec::plain(Char('k')), Action::ScrollUp);
        self.bind(Context::Dialog, KeySpec::plain(KeyCode::Up), Action::ScrollUp);
    }

    /// Apply user overrides from config keybindings map.
    ///
    /// Keys in the map are action names (e.g., "quit", "next_page").
    /// Values are key strings (e.g., "q", "Ctrl+d", "F5").
    ///
    /// Returns a list of warnings for unrecognized action names or unparseable keys.
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, String>) -> Vec<String> {
        let mut warnings = Vec::new();

        for (action_name, key_str) in overrides {
            let action = match parse_action_name(action_name) {
                Some(a) => a,
                None => {
                    warnings.push(format!("Unknown action '{}', ignoring", action_name));
                    continue;
                }
            };

            let key = match parse_key_string(key_str) {
                Some(k) => k,
                None => {
                    warnings.push(format!(
                        "Cannot parse key '{}' for action '{}', ignoring",
                        key_str, action_name
                    ));
                    continue;
                }
            };

            let contexts_for_action: Vec<Context> = self
                .bindings
                .iter()
                .filter(|(_, _, a)| *a == action)
                .map(|(c, _, _)| *c)
                .collect();

            self.lookup.retain(|_, a| *a != action);
            self.bindings.retain(|(_, _, a)| *a != action);

            let mut rebound = Vec::with_capacity(contexts_for_action.len());
            for ctx in contexts_for_action {
                if !rebound.contains(&ctx) {
                    self.bind(ctx, key, action);
                    rebound.push(ctx);
                }
            }

            tracing::info!(
                action = %action_name,
                key = %key_str,
                "Applied keybinding override"
            );
        }

        warnings
    }

    /// Look up the action for a given key in a given context.
    ///
    /// Tries the specific context first, then falls back to Global. The
    /// dialog context never falls back: dialogs capture every key.
    pub fn action_for_key(
        &self,
        code: KeyCode,
        modifiers: KeyModifiers,
        context: Context,
    ) -> Option<Action> {
        let key = KeySpec::new(code, modifiers).normalized();

        if let Some(&action) = self.lookup.get(&(context, key)) {
            return Some(action);
        }

        if context != Context::Global && context != Context::Dialog {
            if let Some(&action) = self.lookup.get(&(Context::Global, key)) {
                return Some(action);
            }
        }

        None
    }

    /// Get all bindings for the help screen.
    ///
    /// Returns (context, key_display_string, action, description) tuples.
    pub fn all_bindings(&self) -> Vec<(Context, String, Action, &'static str)> {
        self.bindings
            .iter()
            .map(|(ctx, key, action)| (*ctx, format_key(key), *action, action.describe()))
            .collect()
    }
}

impl Default for KeybindingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse an action name string (from config) into an Action enum.
fn parse_action_name(name: &str) -> Option<Action> {
    match name.to_lowercase().as_str() {
        "quit" => Some(Action::Quit),
        "back" => Some(Action::Back),
        "nav_down" | "navdown" | "down" => Some(Action::NavDown),
        "nav_up" | "navup" | "up" => Some(Action::NavUp),
        "select" | "enter" => Some(Action::Select),
        "increase" => Some(Action::Increase),
        "decrease" => Some(Action::Decrease),
        "next_page" | "nextpage" => Some(Action::NextPage),
        "prev_page" | "prevpage" => Some(Action::PrevPage),
        "goto_bookshelf" | "bookshelf" => Some(Action::GotoBookshelf),
        "goto_discovery" | "discovery" | "explore" => Some(Action::GotoDiscovery),
        "goto_rss" | "rss" => Some(Action::GotoRss),
        "goto_settings" | "settings" => Some(Action::GotoSettings),
        "refresh_books" | "refreshbooks" | "refresh" => Some(Action::RefreshBooks),
        "show_help" | "showhelp" | "help" => Some(Action::ShowHelp),
        "dismiss_dialog" | "dismiss" => Some(Action::DismissDialog),
        "scroll_down" | "scrolldown" => Some(Action::ScrollDown),
        "scroll_up" | "scrollup" => Some(Action::ScrollUp),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================

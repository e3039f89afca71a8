//! Navigation shell: the tabbed host behind the bottom navigation bar.
//!
//! The shell owns the page cache and the page host, maps navigation
//! selections to positions, runs the back-key exit policy and fires the
//! lifecycle triggers (version check, deferred maintenance, backup on pause,
//! cache cleanup on destroy). Everything it depends on is injected:
//! configuration through [`ShellConfig`], background work through
//! [`Maintenance`], read-aloud status through [`ReadAloud`].

mod host;
mod pages;
mod tabs;
mod timing;

pub use host::{PageHost, PageSelected};
pub use pages::{PageAdapter, PageFactory};
pub use tabs::{Tab, TabLayout};
pub use timing::TapWindow;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::assets;
use crate::dialog::TextDialog;
use crate::pages::Page;
use crate::storage::LocalConfig;
use crate::theme::{resolve_elevation, ThemeVariant};

/// Pages kept alive on either side of the current one.
pub const OFFSCREEN_PAGE_LIMIT: usize = 3;
/// Double-tap window for reselecting Bookshelf or Discovery.
pub const RESELECT_WINDOW: Duration = Duration::from_millis(300);
/// Second back press within this window leaves the app.
pub const EXIT_WINDOW: Duration = Duration::from_millis(2000);
pub const TOC_REFRESH_DELAY: Duration = Duration::from_secs(1);
pub const POST_LOAD_DELAY: Duration = Duration::from_secs(3);

const UPDATE_LOG_COUNTDOWN: Duration = Duration::from_secs(5);

// ============================================================================
// Collaborators
// ============================================================================

/// Build identity compared against the stored version code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildInfo {
    pub version_code: u32,
    pub debug: bool,
}

impl BuildInfo {
    /// `major * 10000 + minor * 100 + patch` of this crate.
    pub fn current() -> Self {
        Self {
            version_code: version_code(env!("CARGO_PKG_VERSION")),
            debug: cfg!(debug_assertions),
        }
    }
}

/// Parse `x.y.z` (pre-release suffixes ignored) into a version code.
pub fn version_code(version: &str) -> u32 {
    let core = version.split(['-', '+']).next().unwrap_or(version);
    let mut parts = core.split('.').map(|p| p.parse::<u32>().unwrap_or(0));
    let major = parts.next().unwrap_or(0);
    let minor = parts.next().unwrap_or(0);
    let patch = parts.next().unwrap_or(0);
    major
        .saturating_mul(10_000)
        .saturating_add(minor.min(99) * 100)
        .saturating_add(patch.min(99))
}

/// Settings the shell reads. Implemented by the preference store.
pub trait ShellConfig {
    fn show_discovery(&self) -> bool;
    fn show_rss(&self) -> bool;
    /// Bottom bar elevation override; negative means theme default.
    fn elevation(&self) -> i32;
    fn auto_refresh_book(&self) -> bool;
    fn thread_count(&self) -> usize;
    fn theme(&self) -> ThemeVariant;
}

/// Background work the shell triggers but never waits on.
pub trait Maintenance: Send + Sync {
    fn refresh_all_tocs(&self);
    fn post_load(&self);
    fn auto_backup(&self);
    fn clear_removed_cache(&self);
    fn reconfigure_pool(&self, threads: usize);
    fn import_default_toc_rules(&self);
    fn upgrade_default_data(&self);
}

pub trait ReadAloud: Send + Sync {
    fn is_paused(&self) -> bool;
}

// ============================================================================
// Notifications and outcomes
// ============================================================================

/// Named app-wide notifications the shell reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    Recreate,
    RefreshNavigation,
    ThreadCountChanged,
}

impl Notification {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "recreate" => Some(Self::Recreate),
            "notifyMain" => Some(Self::RefreshNavigation),
            "threadCount" => Some(Self::ThreadCountChanged),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Recreate => "recreate",
            Self::RefreshNavigation => "notifyMain",
            Self::ThreadCountChanged => "threadCount",
        }
    }
}

/// What a navigation-item selection did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabSelection {
    Selected(PageSelected),
    /// The checked entry was reselected inside the double-tap window.
    Shortcut(Tab),
    /// The checked entry was reselected; the tap was recorded.
    Reselected,
    /// The entry is hidden by the current layout.
    Ignored,
}

/// Result of a back key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackOutcome {
    JumpedToBookshelf,
    /// First press on the bookshelf: show "press again to exit".
    ExitHint,
    Finish,
    Background,
}

// ============================================================================
// Shell
// ============================================================================

pub struct Shell {
    adapter: PageAdapter,
    host: PageHost,
    build: BuildInfo,
    maintenance: Arc<dyn Maintenance>,
    read_aloud: Arc<dyn ReadAloud>,
    bookshelf_reselect: TapWindow,
    explore_reselect: TapWindow,
    exit_guard: TapWindow,
    elevation: u16,
    deferred: Vec<JoinHandle<()>>,
}

impl Shell {
    pub fn new(
        factory: Box<dyn PageFactory>,
        build: BuildInfo,
        maintenance: Arc<dyn Maintenance>,
        read_aloud: Arc<dyn ReadAloud>,
    ) -> Self {
        Self {
            adapter: PageAdapter::new(TabLayout::default(), factory),
            host: PageHost::new(OFFSCREEN_PAGE_LIMIT),
            build,
            maintenance,
            read_aloud,
            bookshelf_reselect: TapWindow::new(RESELECT_WINDOW),
            explore_reselect: TapWindow::new(RESELECT_WINDOW),
            exit_guard: TapWindow::sticky(EXIT_WINDOW),
            elevation: 0,
            deferred: Vec::new(),
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Apply theme settings, resolve the layout and show the first page.
    pub fn on_create(&mut self, cfg: &dyn ShellConfig) {
        self.elevation = resolve_elevation(cfg.elevation(), cfg.theme().default_elevation());
        let layout = TabLayout::resolve(cfg.show_discovery(), cfg.show_rss());
        self.adapter.notify_layout_changed(layout);
        self.host.rebind(0, &mut self.adapter);
        tracing::info!(
            tabs = self.adapter.item_count(),
            elevation = self.elevation,
            "Shell created"
        );
    }

    /// Version check and deferred maintenance.
    ///
    /// Returns the dialog to show, if any. The caller persists `local`.
    pub fn post_create(
        &mut self,
        cfg: &dyn ShellConfig,
        local: &mut LocalConfig,
    ) -> Option<TextDialog> {
        let dialog = self.check_version(local);
        self.schedule_deferred(cfg);
        dialog
    }

    fn check_version(&mut self, local: &mut LocalConfig) -> Option<TextDialog> {
        if local.version_code == self.build.version_code {
            return None;
        }
        tracing::info!(
            stored = local.version_code,
            current = self.build.version_code,
            "Version changed"
        );
        local.version_code = self.build.version_code;

        let dialog = if local.take_first_open() {
            load_dialog(assets::APP_HELP, None)
        } else if !self.build.debug {
            let dialog = load_dialog(assets::UPDATE_LOG, Some(UPDATE_LOG_COUNTDOWN));
            self.maintenance.import_default_toc_rules();
            dialog
        } else {
            None
        };
        self.maintenance.upgrade_default_data();
        dialog
    }

    /// Must be called inside a tokio runtime.
    fn schedule_deferred(&mut self, cfg: &dyn ShellConfig) {
        if cfg.auto_refresh_book() {
            let maintenance = Arc::clone(&self.maintenance);
            self.deferred.push(tokio::spawn(async move {
                tokio::time::sleep(TOC_REFRESH_DELAY).await;
                maintenance.refresh_all_tocs();
            }));
        }
        let maintenance = Arc::clone(&self.maintenance);
        self.deferred.push(tokio::spawn(async move {
            tokio::time::sleep(POST_LOAD_DELAY).await;
            maintenance.post_load();
        }));
    }

    /// Focus lost, suspended or exiting.
    pub fn on_pause(&self) {
        if !self.build.debug {
            self.maintenance.auto_backup();
        }
    }

    pub fn on_destroy(&mut self) {
        for handle in self.deferred.drain(..) {
            handle.abort();
        }
        self.maintenance.clear_removed_cache();
        tracing::debug!("Shell destroyed");
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// A navigation-bar entry was chosen.
    pub fn select_tab(&mut self, tab: Tab, now: Instant) -> TabSelection {
        if tab == self.host.checked() {
            return self.reselect(tab, now);
        }
        let Some(position) = self.adapter.layout().position_of(tab) else {
            return TabSelection::Ignored;
        };
        match self.host.set_current(position, &mut self.adapter) {
            Some(selected) => TabSelection::Selected(selected),
            None => TabSelection::Reselected,
        }
    }

    fn reselect(&mut self, tab: Tab, now: Instant) -> TabSelection {
        let window = match tab {
            Tab::Bookshelf => &mut self.bookshelf_reselect,
            Tab::Discovery => &mut self.explore_reselect,
            Tab::Rss | Tab::Settings => return TabSelection::Reselected,
        };
        if !window.tap(now) {
            return TabSelection::Reselected;
        }
        if let Some(page) = self.adapter.get_mut(tab) {
            page.shortcut();
        }
        tracing::debug!(tab = tab.label(), "Reselect shortcut");
        TabSelection::Shortcut(tab)
    }

    /// Swipe to the next page, wrapping around.
    pub fn next_page(&mut self) -> Option<PageSelected> {
        let count = self.adapter.item_count();
        if count == 0 {
            return None;
        }
        let position = (self.host.current() + 1) % count;
        self.host.set_current(position, &mut self.adapter)
    }

    pub fn prev_page(&mut self) -> Option<PageSelected> {
        let count = self.adapter.item_count();
        if count == 0 {
            return None;
        }
        let position = (self.host.current() + count - 1) % count;
        self.host.set_current(position, &mut self.adapter)
    }

    pub fn on_back(&mut self, now: Instant) -> BackOutcome {
        if self.host.current() != 0 {
            self.host.set_current(0, &mut self.adapter);
            return BackOutcome::JumpedToBookshelf;
        }
        if !self.exit_guard.tap(now) {
            return BackOutcome::ExitHint;
        }
        if self.read_aloud.is_paused() {
            BackOutcome::Finish
        } else {
            BackOutcome::Background
        }
    }

    // ========================================================================
    // Notifications
    // ========================================================================

    pub fn handle_notification(&mut self, notification: Notification, cfg: &dyn ShellConfig) {
        tracing::debug!(key = notification.key(), "Notification");
        match notification {
            Notification::Recreate => {
                self.recreate(cfg);
            }
            Notification::RefreshNavigation => {
                self.refresh_navigation(cfg);
            }
            Notification::ThreadCountChanged => {
                self.maintenance.reconfigure_pool(cfg.thread_count());
            }
        }
    }

    /// Recompute visibility, keeping the displayed tab when it is still shown.
    pub fn apply_visibility(&mut self, cfg: &dyn ShellConfig) -> Option<PageSelected> {
        let keep = self.host.checked();
        let layout = TabLayout::resolve(cfg.show_discovery(), cfg.show_rss());
        let position = layout
            .position_of(keep)
            .unwrap_or_else(|| layout.settings_position());
        self.adapter.notify_layout_changed(layout);
        self.host.rebind(position, &mut self.adapter)
    }

    /// Recompute visibility and land on the Settings page.
    pub fn refresh_navigation(&mut self, cfg: &dyn ShellConfig) -> Option<PageSelected> {
        let layout = TabLayout::resolve(cfg.show_discovery(), cfg.show_rss());
        let position = layout.settings_position();
        self.adapter.notify_layout_changed(layout);
        self.host.rebind(position, &mut self.adapter)
    }

    /// Rebuild every page and reapply theme settings.
    pub fn recreate(&mut self, cfg: &dyn ShellConfig) -> Option<PageSelected> {
        self.adapter.clear();
        self.bookshelf_reselect.reset();
        self.explore_reselect.reset();
        self.elevation = resolve_elevation(cfg.elevation(), cfg.theme().default_elevation());
        self.apply_visibility(cfg)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn layout(&self) -> &TabLayout {
        self.adapter.layout()
    }

    pub fn current_position(&self) -> usize {
        self.host.current()
    }

    pub fn current_tab(&self) -> Tab {
        self.host.checked()
    }

    pub fn elevation(&self) -> u16 {
        self.elevation
    }

    pub fn build(&self) -> BuildInfo {
        self.build
    }

    pub fn adapter(&self) -> &PageAdapter {
        &self.adapter
    }

    /// The page being displayed.
    pub fn current_page(&mut self) -> &mut Box<dyn Page> {
        let tab = self.host.checked();
        self.adapter.page_entry(tab)
    }

    pub fn pending_deferred(&self) -> usize {
        self.deferred.iter().filter(|h| !h.is_finished()).count()
    }
}

fn load_dialog(path: &'static str, countdown: Option<Duration>) -> Option<TextDialog> {
    match assets::read(path) {
        Ok(text) => Some(TextDialog::new(path, text, countdown)),
        Err(e) => {
            tracing::warn!(path, error = %e, "Skipping dialog");
            None
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

use crate::dialog::TextDialog;
use crate::keybindings::KeybindingRegistry;
use crate::preferences::PreferenceManager;
use crate::shell::{Maintenance, Notification, ReadAloud, Shell};
use crate::storage::{Database, Library, LocalConfig};
use crate::tasks::RefreshSummary;
use crate::theme::{StyleMap, ThemeVariant};
use anyhow::Result;
use ratatui::style::Style;
use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// How long a status message stays on screen.
pub const STATUS_TTL: Duration = Duration::from_secs(3);

// ============================================================================
// Events
// ============================================================================

/// Events from background tasks
#[derive(Debug)]
pub enum AppEvent {
    BooksRefreshed(RefreshSummary),
    /// Expired cache rows removed by the post-load task.
    CachesPurged(u64),
    BackupWritten(PathBuf),
    /// Cache directories of removed books deleted.
    CacheCleared(usize),
    DefaultDataImported {
        what: &'static str,
        count: usize,
    },
    /// A background task panicked.
    ///
    /// Fields:
    /// - `task`: Name of the task that panicked (e.g., "refresh_books")
    /// - `error`: The panic message extracted from the panic payload
    TaskPanicked {
        task: &'static str,
        error: String,
    },
}

// ============================================================================
// Read aloud
// ============================================================================

/// Read-aloud playback flag. There is no speech engine, so it starts
/// paused and the back key always finishes.
#[derive(Debug)]
pub struct ReadAloudState {
    paused: AtomicBool,
}

impl ReadAloudState {
    /// Hook for a future speech player to report playback. Nothing in the
    /// app calls it yet, so [`BackOutcome::Background`] is only reached
    /// when a caller sets it.
    ///
    /// [`BackOutcome::Background`]: crate::shell::BackOutcome::Background
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
    }
}

impl Default for ReadAloudState {
    fn default() -> Self {
        Self {
            paused: AtomicBool::new(true),
        }
    }
}

impl ReadAloud for ReadAloudState {
    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }
}

// ============================================================================
// Application State
// ============================================================================

/// Central application state
pub struct App {
    pub db: Database,
    pub shell: Shell,
    pub prefs: PreferenceManager,
    pub maintenance: Arc<dyn Maintenance>,

    // Theme
    pub theme_variant: ThemeVariant,
    /// Active style map for all UI rendering.
    pub theme: StyleMap,

    pub keybindings: KeybindingRegistry,

    /// Data the pages display, reloaded after background changes.
    pub library: Library,

    /// Help document or update log shown over the pages.
    pub dialog: Option<TextDialog>,

    pub show_help: bool,
    pub help_scroll_offset: usize,

    pub status_message: Option<(Cow<'static, str>, Instant)>,
    /// A book refresh is in flight.
    pub refreshing: bool,
    pub needs_redraw: bool,
}

impl App {
    pub fn new(
        db: Database,
        prefs: PreferenceManager,
        shell: Shell,
        maintenance: Arc<dyn Maintenance>,
    ) -> Self {
        let theme_variant = prefs.theme_variant();
        let mut app = Self {
            db,
            shell,
            prefs,
            maintenance,
            theme_variant,
            theme: StyleMap::from_palette(&theme_variant.palette()),
            keybindings: KeybindingRegistry::new(),
            library: Library::default(),
            dialog: None,
            show_help: false,
            help_scroll_offset: 0,
            status_message: None,
            refreshing: false,
            needs_redraw: true,
        };
        app.rebuild_keybindings();
        app
    }

    /// Create the shell and run its version check.
    ///
    /// `local` is updated in place; the caller persists it. Must be called
    /// inside a tokio runtime.
    pub fn start(&mut self, local: &mut LocalConfig) {
        self.shell.on_create(&self.prefs);
        self.dialog = self.shell.post_create(&self.prefs, local);
        self.needs_redraw = true;
    }

    /// Resolve a semantic role name to its `Style`.
    pub fn style(&self, role: &str) -> Style {
        self.theme.resolve(role)
    }

    /// Rebuild styles from the theme preference.
    pub fn apply_theme(&mut self) {
        self.theme_variant = self.prefs.theme_variant();
        self.theme = StyleMap::from_palette(&self.theme_variant.palette());
        self.needs_redraw = true;
    }

    fn rebuild_keybindings(&mut self) {
        let mut registry = KeybindingRegistry::new();
        for warning in registry.apply_overrides(&self.prefs.keybinding_overrides()) {
            tracing::warn!(%warning, "Keybinding override rejected");
        }
        self.keybindings = registry;
    }

    pub async fn reload_library(&mut self) -> Result<()> {
        self.library = self.db.load_library().await?;
        self.needs_redraw = true;
        Ok(())
    }

    /// Persist a preference, then deliver its notification.
    pub async fn set_preference(
        &mut self,
        key: &str,
        value: &str,
        notify: Option<Notification>,
    ) -> Result<()> {
        self.prefs.set(&self.db, key, value).await?;
        tracing::info!(key, value, "Preference changed");
        if let Some(notification) = notify {
            self.notify(notification);
        }
        self.needs_redraw = true;
        Ok(())
    }

    /// Deliver a notification to the shell and refresh what depends on it.
    pub fn notify(&mut self, notification: Notification) {
        self.shell.handle_notification(notification, &self.prefs);
        if notification == Notification::Recreate {
            self.apply_theme();
            self.rebuild_keybindings();
        }
        self.needs_redraw = true;
    }

    // ========================================================================
    // Dialog and status
    // ========================================================================

    /// Close the dialog if its countdown allows it. Returns false while the
    /// countdown is still running.
    pub fn dismiss_dialog(&mut self, now: Instant) -> bool {
        match &self.dialog {
            Some(dialog) if !dialog.can_dismiss(now) => false,
            _ => {
                self.dialog = None;
                self.needs_redraw = true;
                true
            }
        }
    }

    /// Per-tick housekeeping. Returns true when something visible changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut changed = self.clear_expired_status();
        if let Some(dialog) = &self.dialog {
            if dialog.should_auto_close(now) {
                tracing::debug!(source = dialog.source(), "Dialog auto-closed");
                self.dialog = None;
                changed = true;
            } else if dialog.countdown().is_some() {
                // Countdown label changes every second
                changed = true;
            }
        }
        changed
    }

    /// Set status message (will auto-expire after 3 seconds)
    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
        self.needs_redraw = true;
    }

    /// Clear status message if expired.
    /// Returns true if a message was actually cleared
    pub fn clear_expired_status(&mut self) -> bool {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed() >= STATUS_TTL {
                self.status_message = None;
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::Config;
    use crate::pages::DefaultPages;
    use crate::shell::{BuildInfo, Tab};
    use tokio::time;

    #[derive(Default)]
    pub(crate) struct NoopMaintenance;

    impl Maintenance for NoopMaintenance {
        fn refresh_all_tocs(&self) {}
        fn post_load(&self) {}
        fn auto_backup(&self) {}
        fn clear_removed_cache(&self) {}
        fn reconfigure_pool(&self, _threads: usize) {}
        fn import_default_toc_rules(&self) {}
        fn upgrade_default_data(&self) {}
    }

    pub(crate) async fn test_app() -> App {
        let db = Database::open(":memory:").await.unwrap();
        let prefs = PreferenceManager::from_config(&Config::default());
        let maintenance: Arc<dyn Maintenance> = Arc::new(NoopMaintenance);
        let shell = Shell::new(
            Box::new(DefaultPages),
            BuildInfo {
                version_code: 100,
                debug: true,
            },
            Arc::clone(&maintenance),
            Arc::new(ReadAloudState::default()),
        );
        let mut app = App::new(db, prefs, shell, maintenance);
        app.shell.on_create(&app.prefs);
        app
    }

    #[tokio::test]
    async fn test_status_expires_after_3_seconds() {
        // Create app before pausing time to avoid DB connection timeout
        let mut app = test_app().await;
        time::pause();
        app.set_status("Test message");

        time::advance(Duration::from_secs(2)).await;
        assert!(!app.clear_expired_status());
        assert!(app.status_message.is_some());

        time::advance(Duration::from_secs(2)).await;
        assert!(app.clear_expired_status());
        assert!(app.status_message.is_none());
    }

    #[tokio::test]
    async fn test_start_shows_help_on_first_open() {
        let mut app = test_app().await;
        let mut local = LocalConfig::default();
        app.start(&mut local);

        assert_eq!(local.version_code, 100);
        assert!(!local.is_first_open());
        assert_eq!(
            app.dialog.as_ref().map(|d| d.source()),
            Some(crate::assets::APP_HELP)
        );
        assert!(app.dismiss_dialog(Instant::now()));
        assert!(app.dialog.is_none());
    }

    #[tokio::test]
    async fn test_countdown_dialog_blocks_dismiss() {
        let mut app = test_app().await;
        time::pause();
        app.dialog = Some(TextDialog::new(
            crate::assets::UPDATE_LOG,
            "# Log",
            Some(Duration::from_secs(5)),
        ));

        assert!(!app.dismiss_dialog(Instant::now()));
        assert!(app.tick(Instant::now()));
        assert!(app.dialog.is_some());

        time::advance(Duration::from_secs(5)).await;
        app.tick(Instant::now());
        assert!(app.dialog.is_none());
    }

    #[tokio::test]
    async fn test_hiding_rss_lands_on_settings() {
        let mut app = test_app().await;
        app.set_preference("show_rss", "false", Some(Notification::RefreshNavigation))
            .await
            .unwrap();

        assert!(!app.shell.layout().contains(Tab::Rss));
        assert_eq!(app.shell.current_tab(), Tab::Settings);
        assert_eq!(
            app.db.get_preference("show_rss").await.unwrap().as_deref(),
            Some("false")
        );
    }

    #[tokio::test]
    async fn test_theme_change_recreates_styles() {
        let mut app = test_app().await;
        assert_eq!(app.theme_variant, ThemeVariant::Dark);
        app.set_preference("theme", "light", Some(Notification::Recreate))
            .await
            .unwrap();
        assert_eq!(app.theme_variant, ThemeVariant::Light);
        assert_eq!(app.shell.elevation(), ThemeVariant::Light.default_elevation());
    }

    #[tokio::test]
    async fn test_keybinding_override_from_preferences() {
        use crate::keybindings::{Action, Context};
        use crossterm::event::{KeyCode, KeyModifiers};

        let mut app = test_app().await;
        app.set_preference("keybind.refresh_books", "u", Some(Notification::Recreate))
            .await
            .unwrap();
        assert_eq!(
            app.keybindings
                .action_for_key(KeyCode::Char('u'), KeyModifiers::NONE, Context::Bookshelf),
            Some(Action::RefreshBooks)
        );
    }
}

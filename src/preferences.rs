//! Preference manager that merges config.toml defaults with DB overrides.
//!
//! Config values serve as defaults; DB values (user_preferences table) override them.
//! Writes always go to the DB, never to the config file.
use std::collections::HashMap;

use anyhow::Result;

use crate::config::Config;
use crate::shell::ShellConfig;
use crate::storage::Database;
use crate::theme::ThemeVariant;

/// Allowed thread counts for background refreshes.
pub const THREAD_COUNT_RANGE: std::ops::RangeInclusive<usize> = 1..=64;
/// Allowed explicit elevations; -1 means theme default.
pub const ELEVATION_RANGE: std::ops::RangeInclusive<i32> = -1..=24;

// ============================================================================
// PreferenceManager
// ============================================================================

/// Merged preference store: config.toml defaults + DB overrides.
///
/// On load, config values are flattened into a `HashMap<String, String>`, then
/// all DB preferences are layered on top. Reads are in-memory. Writes
/// persist to the DB and then update the in-memory map.
#[derive(Debug, Clone)]
pub struct PreferenceManager {
    prefs: HashMap<String, String>,
}

impl PreferenceManager {
    /// Load preferences: config defaults first, DB values win.
    pub async fn load(config: &Config, db: &Database) -> Result<Self> {
        let mut prefs = Self::flatten_config(config);

        for (key, value) in db.get_all_preferences().await? {
            prefs.insert(key, value);
        }

        Ok(Self { prefs })
    }

    /// Create from config only (no DB). Fallback for when DB load fails.
    pub fn from_config(config: &Config) -> Self {
        Self {
            prefs: Self::flatten_config(config),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.prefs.get(key).map(String::as_str)
    }

    /// Set a preference: writes to DB and updates in-memory map.
    pub async fn set(&mut self, db: &Database, key: &str, value: &str) -> Result<()> {
        db.set_preference(key, value).await?;
        self.prefs.insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Keybinding overrides (`keybind.<action>`), keyed by action name.
    pub fn keybinding_overrides(&self) -> HashMap<String, String> {
        self.prefs
            .iter()
            .filter_map(|(k, v)| {
                k.strip_prefix("keybind.")
                    .map(|action| (action.to_string(), v.clone()))
            })
            .collect()
    }

    // ========================================================================
    // Type-safe Accessors
    // ========================================================================

    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(|v| v.parse().ok()).unwrap_or(default)
    }

    pub fn theme_variant(&self) -> ThemeVariant {
        self.get("theme")
            .and_then(ThemeVariant::from_str_name)
            .unwrap_or(ThemeVariant::Dark)
    }

    // ========================================================================
    // Internal Helpers
    // ========================================================================

    fn flatten_config(config: &Config) -> HashMap<String, String> {
        let mut map = HashMap::new();

        map.insert("theme".to_string(), config.theme.clone());
        map.insert(
            "show_discovery".to_string(),
            config.show_discovery.to_string(),
        );
        map.insert("show_rss".to_string(), config.show_rss.to_string());
        map.insert("elevation".to_string(), config.elevation.to_string());
        map.insert(
            "auto_refresh_book".to_string(),
            config.auto_refresh_book.to_string(),
        );
        map.insert("thread_count".to_string(), config.thread_count.to_string());

        for (action, key_str) in &config.keybindings {
            map.insert(format!("keybind.{}", action), key_str.clone());
        }

        map
    }
}

impl ShellConfig for PreferenceManager {
    fn show_discovery(&self) -> bool {
        self.get_bool("show_discovery", true)
    }

    fn show_rss(&self) -> bool {
        self.get_bool("show_rss", true)
    }

    fn elevation(&self) -> i32 {
        self.get("elevation")
            .and_then(|v| v.parse::<i32>().ok())
            .map(|e| e.clamp(*ELEVATION_RANGE.start(), *ELEVATION_RANGE.end()))
            .unwrap_or(-1)
    }

    fn auto_refresh_book(&self) -> bool {
        self.get_bool("auto_refresh_book", true)
    }

    fn thread_count(&self) -> usize {
        self.get("thread_count")
            .and_then(|v| v.parse::<usize>().ok())
            .map(|n| n.clamp(*THREAD_COUNT_RANGE.start(), *THREAD_COUNT_RANGE.end()))
            .unwrap_or(16)
    }

    fn theme(&self) -> ThemeVariant {
        self.theme_variant()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::storage::Database;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_load_defaults_from_config() {
        let db = test_db().await;
        let pm = PreferenceManager::load(&Config::default(), &db).await.unwrap();

        assert_eq!(pm.theme(), ThemeVariant::Dark);
        assert!(pm.show_discovery());
        assert!(pm.show_rss());
        assert_eq!(pm.elevation(), -1);
        assert!(pm.auto_refresh_book());
        assert_eq!(pm.thread_count(), 16);
    }

    #[tokio::test]
    async fn test_db_overrides_config() {
        let db = test_db().await;
        db.set_preference("show_rss", "false").await.unwrap();
        db.set_preference("theme", "light").await.unwrap();

        let pm = PreferenceManager::load(&Config::default(), &db).await.unwrap();
        assert!(!pm.show_rss());
        assert_eq!(pm.theme(), ThemeVariant::Light);
    }

    #[tokio::test]
    async fn test_set_persists_and_updates_memory() {
        let db = test_db().await;
        let mut pm = PreferenceManager::load(&Config::default(), &db).await.unwrap();

        pm.set(&db, "thread_count", "4").await.unwrap();
        assert_eq!(pm.thread_count(), 4);
        assert_eq!(
            db.get_preference("thread_count").await.unwrap(),
            Some("4".to_string())
        );

        let reloaded = PreferenceManager::load(&Config::default(), &db).await.unwrap();
        assert_eq!(reloaded.thread_count(), 4);
    }

    #[test]
    fn test_out_of_range_values_clamped() {
        let config = Config {
            thread_count: 0,
            elevation: -7,
            ..Config::default()
        };
        let pm = PreferenceManager::from_config(&config);
        assert_eq!(pm.thread_count(), 1);
        assert_eq!(pm.elevation(), -1);

        let config = Config {
            thread_count: 1000,
            elevation: 99,
            ..Config::default()
        };
        let pm = PreferenceManager::from_config(&config);
        assert_eq!(pm.thread_count(), 64);
        assert_eq!(pm.elevation(), 24);
    }

    #[tokio::test]
    async fn test_garbage_db_values_fall_back() {
        let db = test_db().await;
        db.set_preference("show_discovery", "maybe").await.unwrap();
        db.set_preference("theme", "solarized").await.unwrap();

        let pm = PreferenceManager::load(&Config::default(), &db).await.unwrap();
        assert!(pm.show_discovery());
        assert_eq!(pm.theme(), ThemeVariant::Dark);
    }

    #[tokio::test]
    async fn test_keybinding_overrides_merge() {
        let db = test_db().await;
        let mut config = Config::default();
        config
            .keybindings
            .insert("quit".to_string(), "Ctrl+q".to_string());
        config
            .keybindings
            .insert("refresh_books".to_string(), "F5".to_string());
        db.set_preference("keybind.quit", "Ctrl+w").await.unwrap();

        let pm = PreferenceManager::load(&config, &db).await.unwrap();
        let overrides = pm.keybinding_overrides();
        assert_eq!(overrides.len(), 2);
        assert_eq!(overrides.get("quit").map(String::as_str), Some("Ctrl+w"));
        assert_eq!(overrides.get("refresh_books").map(String::as_str), Some("F5"));
    }

    #[tokio::test]
    async fn test_config_file_load_and_merge() {
        let db = test_db().await;
        let dir = std::env::temp_dir().join("quire_prefs_lifecycle_test");
        std::fs::create_dir_all(&dir).unwrap();
        let config_path = dir.join("config.toml");
        std::fs::write(
            &config_path,
            "show_discovery = false\nelevation = 6\nauto_refresh_book = false\n",
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        db.set_preference("elevation", "10").await.unwrap();

        let pm = PreferenceManager::load(&config, &db).await.unwrap();
        assert!(!pm.show_discovery());
        assert!(!pm.auto_refresh_book());
        assert_eq!(pm.elevation(), 10);

        std::fs::remove_dir_all(&dir).ok();
    }
}

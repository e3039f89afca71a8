use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::path::Path;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another instance of the application has locked the database
    #[error("Another instance of quire appears to be running. Please close it and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Map a sqlx error, recognising lock contention from another instance.
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if is_lock_message(&err.to_string()) {
            return DatabaseError::InstanceLocked;
        }
        DatabaseError::Other(err)
    }
}

/// SQLITE_BUSY (5), SQLITE_LOCKED (6) and SQLITE_CANTOPEN (14) messages.
pub(crate) fn is_lock_message(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("sqlite_busy")
        || message.contains("sqlite_locked")
        || message.contains("unable to open database file")
}

// ============================================================================
// Shelf
// ============================================================================

/// A book on the shelf, backed by a local file.
#[derive(Debug, Clone, FromRow)]
pub struct Book {
    pub id: i64,
    pub name: String,
    pub author: String,
    /// Absolute path of the book file.
    pub origin: String,
    /// File size in bytes at the last check.
    pub size: i64,
    /// File modification time (unix seconds) at the last check.
    pub modified: i64,
    /// Unix seconds of the last update check, 0 if never checked.
    pub last_check_time: i64,
    /// Set when the last check found the file changed since it was read.
    pub has_update: bool,
    /// Whether the periodic refresh should look at this book.
    pub can_update: bool,
    pub added_at: i64,
}

/// A book file about to be placed on the shelf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub name: String,
    pub author: String,
    pub origin: String,
    pub size: i64,
    pub modified: i64,
}

impl NewBook {
    /// Describe a local file. The name is the file stem.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let path = path.canonicalize()?;
        let meta = std::fs::metadata(&path)?;
        if !meta.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a file", path.display()),
            ));
        }
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            name,
            author: String::new(),
            origin: path.display().to_string(),
            size: i64::try_from(meta.len()).unwrap_or(i64::MAX),
            modified: modified_secs(&meta),
        })
    }
}

/// File modification time as unix seconds, 0 when unavailable.
pub fn modified_secs(meta: &std::fs::Metadata) -> i64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Result of checking one book file for changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookCheck {
    pub book_id: i64,
    pub size: i64,
    pub modified: i64,
    pub changed: bool,
}

// ============================================================================
// Sources
// ============================================================================

/// A book source shown on the Discovery page.
#[derive(Debug, Clone, FromRow)]
pub struct BookSource {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub source_group: Option<String>,
    pub enabled: bool,
}

/// Book source as it appears in an import file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NewBookSource {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// An RSS source shown on the RSS page.
#[derive(Debug, Clone, FromRow)]
pub struct RssSource {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub source_group: Option<String>,
    pub enabled: bool,
    pub sort_order: i64,
}

/// RSS source as bundled in default data.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRssSource {
    pub source_name: String,
    pub source_url: String,
    #[serde(default)]
    pub source_group: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub custom_order: i64,
}

/// Chapter-title rule for plain text books, as bundled in default data.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TxtTocRule {
    pub id: i64,
    pub name: String,
    pub rule: String,
    #[serde(default)]
    pub example: Option<String>,
    #[serde(default = "default_true")]
    pub enable: bool,
    #[serde(default)]
    pub serial_number: i64,
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Library Snapshot
// ============================================================================

/// Everything the pages display, loaded in one pass.
#[derive(Debug, Clone, Default)]
pub struct Library {
    pub books: Vec<Book>,
    pub book_sources: Vec<BookSource>,
    pub rss_sources: Vec<RssSource>,
}

impl Library {
    pub fn updated_count(&self) -> usize {
        self.books.iter().filter(|b| b.has_update).count()
    }
}

// ============================================================================
// Local Config
// ============================================================================

/// Per-installation state that is not a user preference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalConfig {
    /// Version code of the build that last ran, 0 before the first run.
    pub version_code: u32,
    first_open: bool,
    /// Unix seconds of the last automatic backup, 0 if none.
    pub last_backup: i64,
}

impl LocalConfig {
    pub fn new(version_code: u32, first_open: bool, last_backup: i64) -> Self {
        Self {
            version_code,
            first_open,
            last_backup,
        }
    }

    /// True exactly once per installation; the flag clears when read.
    pub fn take_first_open(&mut self) -> bool {
        std::mem::replace(&mut self.first_open, false)
    }

    /// Peek at the first-open flag without clearing it.
    pub fn is_first_open(&self) -> bool {
        self.first_open
    }
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self::new(0, true, 0)
    }
}

//! Background maintenance: book refresh, cache housekeeping, backups and
//! bundled data imports.
//!
//! [`BackgroundTasks`] is the shell's [`Maintenance`] collaborator. Every
//! trigger spawns a tokio task and returns at once; results come back to the
//! UI loop as [`AppEvent`]s, failures are logged and panics reported as
//! `TaskPanicked`.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::{stream, FutureExt, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::app::AppEvent;
use crate::assets;
use crate::paths::{atomic_copy, AppPaths};
use crate::shell::Maintenance;
use crate::storage::{modified_secs, Book, BookCheck, Database};
use crate::util::unix_now;

/// Minimum spacing of automatic backups.
pub const BACKUP_INTERVAL_SECS: i64 = 24 * 60 * 60;
/// Backups kept in the backups directory.
pub const MAX_BACKUPS: usize = 7;

const TOC_RULES_BUNDLE_KEY: &str = "bundle.txt_toc_rules";
const RSS_SOURCES_BUNDLE_KEY: &str = "bundle.rss_sources";

// ============================================================================
// Errors and results
// ============================================================================

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Backup I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database snapshot failed: {0}")]
    Snapshot(String),

    #[error("Config copy failed: {0}")]
    Config(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub checked: usize,
    pub updated: usize,
    /// Books whose file could not be read.
    pub missing: usize,
}

// ============================================================================
// Panic isolation
// ============================================================================

/// Run a future, turning a panic inside it into an error message.
pub(crate) async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: Future<Output = T>,
{
    AssertUnwindSafe(future).catch_unwind().await.map_err(|panic| {
        if let Some(s) = panic.downcast_ref::<&'static str>() {
            s.to_string()
        } else if let Some(s) = panic.downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        }
    })
}

// ============================================================================
// BackgroundTasks
// ============================================================================

pub struct BackgroundTasks {
    db: Database,
    paths: AppPaths,
    thread_count: Arc<AtomicUsize>,
    event_tx: mpsc::Sender<AppEvent>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl BackgroundTasks {
    pub fn new(
        db: Database,
        paths: AppPaths,
        thread_count: usize,
        event_tx: mpsc::Sender<AppEvent>,
    ) -> Self {
        Self {
            db,
            paths,
            thread_count: Arc::new(AtomicUsize::new(thread_count.max(1))),
            event_tx,
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count.load(Ordering::Relaxed)
    }

    /// Spawn `work`, forwarding its event to the UI.
    fn spawn<F>(&self, task: &'static str, work: F)
    where
        F: Future<Output = Result<Option<AppEvent>>> + Send + 'static,
    {
        let tx = self.event_tx.clone();
        let handle = tokio::spawn(async move {
            match catch_task_panic(work).await {
                Ok(Ok(Some(event))) => {
                    let _ = tx.send(event).await;
                }
                Ok(Ok(None)) => {}
                Ok(Err(e)) => tracing::warn!(task, error = %e, "Background task failed"),
                Err(error) => {
                    tracing::error!(task, error = %error, "Background task panicked");
                    let _ = tx.send(AppEvent::TaskPanicked { task, error }).await;
                }
            }
        });

        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    /// Wait for in-flight tasks, giving up after `timeout`.
    pub async fn wait_idle(&self, timeout: Duration) {
        let handles: Vec<JoinHandle<()>> = {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            pending.drain(..).collect()
        };
        if handles.is_empty() {
            return;
        }
        let count = handles.len();
        let joined = tokio::time::timeout(timeout, futures::future::join_all(handles)).await;
        if joined.is_err() {
            tracing::warn!(count, "Background tasks still running at exit");
        }
    }
}

impl Maintenance for BackgroundTasks {
    fn refresh_all_tocs(&self) {
        let db = self.db.clone();
        let threads = Arc::clone(&self.thread_count);
        self.spawn("refresh_books", async move {
            let summary = refresh_books(&db, threads.load(Ordering::Relaxed), unix_now()).await?;
            Ok(Some(AppEvent::BooksRefreshed(summary)))
        });
    }

    fn post_load(&self) {
        let db = self.db.clone();
        self.spawn("post_load", async move {
            let purged = post_load(&db, unix_now()).await?;
            Ok((purged > 0).then_some(AppEvent::CachesPurged(purged)))
        });
    }

    fn auto_backup(&self) {
        let db = self.db.clone();
        let paths = self.paths.clone();
        self.spawn("auto_backup", async move {
            let written = auto_backup(&db, &paths, unix_now(), false).await?;
            Ok(written.map(AppEvent::BackupWritten))
        });
    }

    fn clear_removed_cache(&self) {
        let db = self.db.clone();
        let cache_dir = self.paths.cache_dir.clone();
        self.spawn("clear_removed_cache", async move {
            let removed = clear_removed_cache(&db, &cache_dir).await?;
            Ok((removed > 0).then_some(AppEvent::CacheCleared(removed)))
        });
    }

    fn reconfigure_pool(&self, threads: usize) {
        let threads = threads.max(1);
        self.thread_count.store(threads, Ordering::Relaxed);
        tracing::info!(threads, "Refresh pool reconfigured");
    }

    fn import_default_toc_rules(&self) {
        let db = self.db.clone();
        self.spawn("import_toc_rules", async move {
            let count = import_default_toc_rules(&db).await?;
            Ok(Some(AppEvent::DefaultDataImported {
                what: "TXT TOC rules",
                count,
            }))
        });
    }

    fn upgrade_default_data(&self) {
        let db = self.db.clone();
        self.spawn("upgrade_default_data", async move {
            let count = upgrade_default_data(&db).await?;
            Ok((count > 0).then_some(AppEvent::DefaultDataImported {
                what: "default data",
                count,
            }))
        });
    }
}

// ============================================================================
// Book refresh
// ============================================================================

/// Check every updatable book file with at most `threads` checks in flight.
pub async fn refresh_books(db: &Database, threads: usize, now: i64) -> Result<RefreshSummary> {
    let books = db.get_updatable_books().await?;
    let total = books.len();

    let checks: Vec<Option<BookCheck>> = stream::iter(books)
        .map(|book| async move { check_book(&book).await })
        .buffer_unordered(threads.max(1))
        .collect()
        .await;
    let checks: Vec<BookCheck> = checks.into_iter().flatten().collect();

    db.record_book_checks(&checks, now).await?;

    let summary = RefreshSummary {
        checked: checks.len(),
        updated: checks.iter().filter(|c| c.changed).count(),
        missing: total - checks.len(),
    };
    tracing::info!(
        checked = summary.checked,
        updated = summary.updated,
        missing = summary.missing,
        "Book refresh complete"
    );
    Ok(summary)
}

/// Compare a book's file against the stats recorded at the last check.
pub async fn check_book(book: &Book) -> Option<BookCheck> {
    let meta = match tokio::fs::metadata(&book.origin).await {
        Ok(meta) => meta,
        Err(e) => {
            tracing::warn!(book_id = book.id, path = %book.origin, error = %e, "Book file unreadable");
            return None;
        }
    };
    let size = i64::try_from(meta.len()).unwrap_or(i64::MAX);
    let modified = modified_secs(&meta);
    Some(BookCheck {
        book_id: book.id,
        size,
        modified,
        changed: size != book.size || modified != book.modified,
    })
}

// ============================================================================
// Housekeeping
// ============================================================================

/// Deferred startup work: drop expired cache entries.
pub async fn post_load(db: &Database, now: i64) -> Result<u64> {
    let purged = db.delete_expired_caches(now).await?;
    tracing::debug!(purged, "Expired caches removed");
    Ok(purged)
}

/// Remove `cache_dir/<id>` directories whose book left the shelf.
pub async fn clear_removed_cache(db: &Database, cache_dir: &Path) -> Result<usize> {
    let ids = db.book_ids().await?;
    let mut entries = match tokio::fs::read_dir(cache_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(id) = name.to_str().and_then(|n| n.parse::<i64>().ok()) else {
            continue;
        };
        if ids.binary_search(&id).is_ok() || !entry.file_type().await?.is_dir() {
            continue;
        }
        tokio::fs::remove_dir_all(entry.path()).await?;
        removed += 1;
    }
    if removed > 0 {
        tracing::info!(removed, "Removed caches of deleted books");
    }
    Ok(removed)
}

// ============================================================================
// Backup
// ============================================================================

/// Snapshot the database and config file into the backups directory.
///
/// Skipped (returns `None`) when the previous backup is younger than a day,
/// unless `force` is set.
pub async fn auto_backup(
    db: &Database,
    paths: &AppPaths,
    now: i64,
    force: bool,
) -> Result<Option<PathBuf>, BackupError> {
    let local = db
        .load_local_config()
        .await
        .map_err(|e| BackupError::Snapshot(e.to_string()))?;
    if !force && local.last_backup > 0 && now - local.last_backup < BACKUP_INTERVAL_SECS {
        tracing::debug!(last = local.last_backup, "Backup is recent, skipping");
        return Ok(None);
    }

    tokio::fs::create_dir_all(&paths.backups_dir).await?;
    let stamp = DateTime::<Utc>::from_timestamp(now, 0)
        .map(|dt| dt.format("%Y%m%d-%H%M%S").to_string())
        .unwrap_or_else(|| now.to_string());

    let db_dest = paths.backups_dir.join(format!("quire-{stamp}.db"));
    db.backup_to(&db_dest)
        .await
        .map_err(|e| BackupError::Snapshot(e.to_string()))?;

    if paths.config_file.exists() {
        let src = paths.config_file.clone();
        let dst = paths.backups_dir.join(format!("config-{stamp}.toml"));
        tokio::task::spawn_blocking(move || atomic_copy(&src, &dst))
            .await
            .map_err(|e| BackupError::Config(e.to_string()))?
            .map_err(|e| BackupError::Config(e.to_string()))?;
    }

    db.record_backup(now)
        .await
        .map_err(|e| BackupError::Snapshot(e.to_string()))?;
    prune_backups(&paths.backups_dir).await?;

    tracing::info!(path = %db_dest.display(), "Backup written");
    Ok(Some(db_dest))
}

/// Keep the newest [`MAX_BACKUPS`] snapshots of each kind.
async fn prune_backups(dir: &Path) -> std::io::Result<()> {
    for (prefix, ext) in [("quire-", ".db"), ("config-", ".toml")] {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(prefix) && name.ends_with(ext) {
                names.push(name);
            }
        }
        // Timestamps sort lexically
        names.sort_unstable_by(|a, b| b.cmp(a));
        for stale in names.iter().skip(MAX_BACKUPS) {
            tokio::fs::remove_file(dir.join(stale)).await?;
        }
    }
    Ok(())
}

// ============================================================================
// Bundled data
// ============================================================================

pub async fn import_default_toc_rules(db: &Database) -> Result<usize> {
    let rules = assets::txt_toc_rules()?;
    let count = db.import_txt_toc_rules(&rules).await?;
    tracing::info!(count, "Imported default TXT TOC rules");
    Ok(count)
}

/// Re-import every bundled data set whose version is newer than the one
/// recorded in the local config. Returns the number of rows written.
pub async fn upgrade_default_data(db: &Database) -> Result<usize> {
    let mut written = 0;

    if db.get_local_i64(TOC_RULES_BUNDLE_KEY).await? < assets::TXT_TOC_RULES_VERSION {
        written += import_default_toc_rules(db).await?;
        db.set_local(TOC_RULES_BUNDLE_KEY, &assets::TXT_TOC_RULES_VERSION.to_string())
            .await?;
    }

    if db.get_local_i64(RSS_SOURCES_BUNDLE_KEY).await? < assets::RSS_SOURCES_VERSION {
        let sources = assets::rss_sources()?;
        let count = db.upsert_rss_sources(&sources).await?;
        tracing::info!(count, "Imported default RSS sources");
        written += count;
        db.set_local(RSS_SOURCES_BUNDLE_KEY, &assets::RSS_SOURCES_VERSION.to_string())
            .await?;
    }

    Ok(written)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::NewBook;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("quire_tasks_test_{name}"));
        std::fs::remove_dir_all(&dir).ok();
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_catch_task_panic() {
        let ok = catch_task_panic(async { 7 }).await;
        assert_eq!(ok, Ok(7));

        let err = catch_task_panic(async {
            panic!("boom");
            #[allow(unreachable_code)]
            0
        })
        .await;
        assert_eq!(err, Err("boom".to_string()));
    }

    #[tokio::test]
    async fn test_refresh_marks_changed_files() {
        let dir = temp_dir("refresh");
        let db = test_db().await;
        let changed = dir.join("changed.txt");
        let same = dir.join("same.txt");
        std::fs::write(&changed, "chapter one").unwrap();
        std::fs::write(&same, "chapter one").unwrap();

        db.add_book(&NewBook::from_path(&changed).unwrap()).await.unwrap();
        db.add_book(&NewBook::from_path(&same).unwrap()).await.unwrap();
        let mut gone = NewBook::from_path(&same).unwrap();
        gone.origin = dir.join("gone.txt").display().to_string();
        db.add_book(&gone).await.unwrap();

        std::fs::write(&changed, "chapter one\nchapter two").unwrap();

        let summary = refresh_books(&db, 2, 1_800_000_000).await.unwrap();
        assert_eq!(
            summary,
            RefreshSummary {
                checked: 2,
                updated: 1,
                missing: 1
            }
        );

        let books = db.get_books().await.unwrap();
        let updated: Vec<&str> = books
            .iter()
            .filter(|b| b.has_update)
            .map(|b| b.name.as_str())
            .collect();
        assert_eq!(updated, vec!["changed"]);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_clear_removed_cache() {
        let dir = temp_dir("cache");
        let db = test_db().await;
        let book = dir.join("kept.txt");
        std::fs::write(&book, "x").unwrap();
        let kept = db.add_book(&NewBook::from_path(&book).unwrap()).await.unwrap();

        let cache = dir.join("cache");
        std::fs::create_dir_all(cache.join(kept.to_string())).unwrap();
        std::fs::create_dir_all(cache.join("9999")).unwrap();
        std::fs::create_dir_all(cache.join("not-a-book")).unwrap();

        assert_eq!(clear_removed_cache(&db, &cache).await.unwrap(), 1);
        assert!(cache.join(kept.to_string()).exists());
        assert!(!cache.join("9999").exists());
        assert!(cache.join("not-a-book").exists());

        // Missing cache dir is fine
        assert_eq!(clear_removed_cache(&db, &dir.join("nope")).await.unwrap(), 0);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_backup_once_per_day() {
        let dir = temp_dir("backup");
        let paths = AppPaths::new(dir.clone());
        std::fs::write(&paths.config_file, "show_rss = false\n").unwrap();
        let db = test_db().await;
        let now = 1_800_000_000;

        let first = auto_backup(&db, &paths, now, false).await.unwrap().unwrap();
        assert!(first.exists());
        assert!(paths.backups_dir.join("config-20270115-080000.toml").exists());
        assert_eq!(db.load_local_config().await.unwrap().last_backup, now);

        assert!(auto_backup(&db, &paths, now + 3_600, false)
            .await
            .unwrap()
            .is_none());
        assert!(auto_backup(&db, &paths, now + 3_600, true)
            .await
            .unwrap()
            .is_some());
        assert!(auto_backup(&db, &paths, now + BACKUP_INTERVAL_SECS + 3_600, false)
            .await
            .unwrap()
            .is_some());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_backups_pruned() {
        let dir = temp_dir("prune");
        let paths = AppPaths::new(dir.clone());
        let db = test_db().await;
        for day in 0..(MAX_BACKUPS as i64 + 3) {
            auto_backup(&db, &paths, 1_800_000_000 + day * BACKUP_INTERVAL_SECS, false)
                .await
                .unwrap();
        }
        let count = std::fs::read_dir(&paths.backups_dir).unwrap().count();
        assert_eq!(count, MAX_BACKUPS);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_upgrade_default_data_is_version_gated() {
        let db = test_db().await;
        let first = upgrade_default_data(&db).await.unwrap();
        assert!(first > 0);
        assert!(!db.get_rss_sources().await.unwrap().is_empty());
        assert!(!db.get_txt_toc_rules().await.unwrap().is_empty());

        assert_eq!(upgrade_default_data(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_post_load_purges_expired() {
        let db = test_db().await;
        db.put_cache("old", "v", 10).await.unwrap();
        assert_eq!(post_load(&db, 100).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_reconfigure_pool() {
        let (tx, _rx) = mpsc::channel(4);
        let tasks = BackgroundTasks::new(
            test_db().await,
            AppPaths::new(temp_dir("pool")),
            16,
            tx,
        );
        tasks.reconfigure_pool(4);
        assert_eq!(tasks.thread_count(), 4);
        tasks.reconfigure_pool(0);
        assert_eq!(tasks.thread_count(), 1);
    }

    #[tokio::test]
    async fn test_trigger_reports_event() {
        let (tx, mut rx) = mpsc::channel(4);
        let tasks = BackgroundTasks::new(
            test_db().await,
            AppPaths::new(temp_dir("trigger")),
            4,
            tx,
        );
        tasks.import_default_toc_rules();
        tasks.wait_idle(Duration::from_secs(5)).await;

        match rx.recv().await {
            Some(AppEvent::DefaultDataImported { count, .. }) => assert!(count > 0),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}

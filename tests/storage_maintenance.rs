//! Integration tests for background maintenance against a file-backed
//! database: triggers go through the `Maintenance` trait and results come
//! back on the application event channel.

use std::path::Path;
use std::time::Duration;

use quire::app::AppEvent;
use quire::paths::AppPaths;
use quire::shell::Maintenance;
use quire::storage::{Database, NewBook};
use quire::tasks::BackgroundTasks;
use tokio::sync::mpsc;

struct Fixture {
    db: Database,
    paths: AppPaths,
    tasks: BackgroundTasks,
    events: mpsc::Receiver<AppEvent>,
}

async fn fixture(name: &str) -> Fixture {
    let dir = std::env::temp_dir().join(format!("quire_it_{name}"));
    std::fs::remove_dir_all(&dir).ok();
    let paths = AppPaths::new(dir);
    paths.ensure_config_dir().unwrap();

    let db = Database::open(paths.db_path_str().unwrap()).await.unwrap();
    let (tx, events) = mpsc::channel(8);
    let tasks = BackgroundTasks::new(db.clone(), paths.clone(), 4, tx);
    Fixture {
        db,
        paths,
        tasks,
        events,
    }
}

impl Fixture {
    async fn settle(&mut self) -> Vec<AppEvent> {
        self.tasks.wait_idle(Duration::from_secs(5)).await;
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }

    fn cleanup(self) {
        std::fs::remove_dir_all(&self.paths.config_dir).ok();
    }
}

fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// ============================================================================
// Bundled data
// ============================================================================

#[tokio::test]
async fn test_default_data_imported_once() {
    let mut fx = fixture("default_data").await;

    fx.tasks.upgrade_default_data();
    let events = fx.settle().await;
    assert_eq!(events.len(), 1);
    assert!(matches!(
        events[0],
        AppEvent::DefaultDataImported { what: "default data", count } if count > 0
    ));
    assert!(!fx.db.get_txt_toc_rules().await.unwrap().is_empty());
    assert!(!fx.db.get_rss_sources().await.unwrap().is_empty());

    // Versions are recorded, so a second run writes nothing
    fx.tasks.upgrade_default_data();
    assert!(fx.settle().await.is_empty());

    fx.cleanup();
}

// ============================================================================
// Backup
// ============================================================================

#[tokio::test]
async fn test_backup_written_then_throttled() {
    let mut fx = fixture("backup").await;
    std::fs::write(&fx.paths.config_file, "theme = \"light\"\n").unwrap();

    fx.tasks.auto_backup();
    let events = fx.settle().await;
    let written = match events.as_slice() {
        [AppEvent::BackupWritten(path)] => path.clone(),
        other => panic!("unexpected events: {other:?}"),
    };
    assert!(written.exists());

    let names = list_dir(&fx.paths.backups_dir);
    assert_eq!(names.len(), 2);
    assert!(names[0].starts_with("config-") && names[0].ends_with(".toml"));
    assert!(names[1].starts_with("quire-") && names[1].ends_with(".db"));

    // The snapshot is a usable database
    let snapshot = Database::open(written.to_str().unwrap()).await.unwrap();
    assert!(snapshot.book_ids().await.unwrap().is_empty());
    assert!(fx.db.load_local_config().await.unwrap().last_backup > 0);

    fx.tasks.auto_backup();
    assert!(fx.settle().await.is_empty());
    assert_eq!(list_dir(&fx.paths.backups_dir).len(), 2);

    fx.cleanup();
}

// ============================================================================
// Book refresh and caches
// ============================================================================

#[tokio::test]
async fn test_refresh_flags_changed_book_until_opened() {
    let mut fx = fixture("refresh").await;
    let file = fx.paths.config_dir.join("novel.txt");
    std::fs::write(&file, "Chapter 1\n").unwrap();
    let id = fx
        .db
        .add_book(&NewBook::from_path(&file).unwrap())
        .await
        .unwrap();

    std::fs::write(&file, "Chapter 1\nChapter 2\n").unwrap();
    fx.tasks.refresh_all_tocs();
    let events = fx.settle().await;
    match events.as_slice() {
        [AppEvent::BooksRefreshed(summary)] => {
            assert_eq!(summary.checked, 1);
            assert_eq!(summary.updated, 1);
            assert_eq!(summary.missing, 0);
        }
        other => panic!("unexpected events: {other:?}"),
    }

    let library = fx.db.load_library().await.unwrap();
    assert_eq!(library.updated_count(), 1);

    // An unchanged file leaves the flag in place
    fx.tasks.refresh_all_tocs();
    fx.settle().await;
    assert_eq!(fx.db.load_library().await.unwrap().updated_count(), 1);

    fx.db.clear_book_update(id).await.unwrap();
    assert_eq!(fx.db.load_library().await.unwrap().updated_count(), 0);

    fx.cleanup();
}

#[tokio::test]
async fn test_cache_of_removed_book_cleared() {
    let mut fx = fixture("cache").await;
    let file = fx.paths.config_dir.join("kept.txt");
    std::fs::write(&file, "text").unwrap();
    let kept = fx
        .db
        .add_book(&NewBook::from_path(&file).unwrap())
        .await
        .unwrap();

    std::fs::create_dir_all(fx.paths.cache_dir.join(kept.to_string())).unwrap();
    std::fs::create_dir_all(fx.paths.cache_dir.join("9999")).unwrap();
    std::fs::create_dir_all(fx.paths.cache_dir.join("fonts")).unwrap();

    fx.tasks.clear_removed_cache();
    let events = fx.settle().await;
    assert!(matches!(events.as_slice(), [AppEvent::CacheCleared(1)]));

    let mut expected = vec![kept.to_string(), "fonts".to_string()];
    expected.sort();
    assert_eq!(list_dir(&fx.paths.cache_dir), expected);

    fx.cleanup();
}

#[tokio::test]
async fn test_pool_reconfigure_clamps_to_one() {
    let fx = fixture("pool").await;
    assert_eq!(fx.tasks.thread_count(), 4);
    fx.tasks.reconfigure_pool(0);
    assert_eq!(fx.tasks.thread_count(), 1);
    fx.cleanup();
}

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use quire::app::{App, AppEvent, ReadAloudState};
use quire::config::Config;
use quire::pages::DefaultPages;
use quire::paths::AppPaths;
use quire::preferences::PreferenceManager;
use quire::shell::{BuildInfo, Maintenance, Shell, ShellConfig};
use quire::storage::{Database, DatabaseError, NewBook, NewBookSource};
use quire::tasks::{self, BackgroundTasks};
use quire::ui;
use quire::util::unix_now;

/// Largest accepted source import file.
const MAX_IMPORT_SIZE: u64 = 10 * 1024 * 1024;

#[derive(Parser, Debug)]
#[command(name = "quire", version, about = "Terminal e-book reader shell")]
struct Args {
    /// Add a local book file to the shelf (repeatable)
    #[arg(long, value_name = "FILE")]
    add_book: Vec<PathBuf>,

    /// Import book sources from a JSON array of {name, url, group?, enabled?}
    #[arg(long, value_name = "FILE")]
    import_sources: Option<PathBuf>,

    /// Reset database (delete and recreate)
    #[arg(long)]
    reset_db: bool,

    /// Write a backup now and exit
    #[arg(long)]
    backup_now: bool,
}

fn init_logging(paths: &AppPaths) -> Result<()> {
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.log_file)
        .with_context(|| format!("Failed to open log file {}", paths.log_file.display()))?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();
    Ok(())
}

async fn open_database(paths: &AppPaths) -> Result<Database> {
    match Database::open(paths.db_path_str()?).await {
        Ok(db) => Ok(db),
        Err(DatabaseError::InstanceLocked) => {
            eprintln!(
                "Error: Another instance of quire appears to be running. Please close it and try again."
            );
            std::process::exit(1);
        }
        Err(e) => Err(anyhow::anyhow!("Failed to open database: {}", e)),
    }
}

fn reset_database(paths: &AppPaths) -> Result<()> {
    for suffix in ["", "-wal", "-shm"] {
        let path = PathBuf::from(format!("{}{suffix}", paths.db_file.display()));
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to delete {}", path.display()))?;
        }
    }
    tracing::info!("Database reset");
    println!("Database reset.");
    Ok(())
}

async fn add_books(db: &Database, files: &[PathBuf]) -> Result<()> {
    for file in files {
        let book = NewBook::from_path(file)
            .with_context(|| format!("Cannot add book {}", file.display()))?;
        let id = db.add_book(&book).await.context("Failed to add book")?;
        tracing::info!(book_id = id, origin = %book.origin, "Book added");
        println!("Added \"{}\" (id {id})", book.name);
    }
    Ok(())
}

async fn import_sources(db: &Database, file: &Path) -> Result<()> {
    let canonical = file
        .canonicalize()
        .with_context(|| format!("Failed to resolve import file: {}", file.display()))?;
    let metadata = std::fs::metadata(&canonical)?;
    if !metadata.is_file() {
        anyhow::bail!("Import path must be a regular file");
    }
    if metadata.len() > MAX_IMPORT_SIZE {
        anyhow::bail!("Import file is larger than {} bytes", MAX_IMPORT_SIZE);
    }

    let content = std::fs::read_to_string(&canonical)
        .with_context(|| format!("Failed to read import file: {}", canonical.display()))?;
    let sources: Vec<NewBookSource> =
        serde_json::from_str(&content).context("Import file is not a JSON array of sources")?;
    let count = db
        .upsert_book_sources(&sources)
        .await
        .context("Failed to import sources")?;
    tracing::info!(count, "Book sources imported");
    println!("Imported {count} book sources from {}", canonical.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let paths = AppPaths::from_home()?;
    paths.ensure_config_dir()?;
    init_logging(&paths)?;

    let config = match Config::load(&paths.config_file) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "Config file rejected, using defaults");
            eprintln!("Warning: {e}. Using default settings.");
            Config::default()
        }
    };

    if args.reset_db {
        reset_database(&paths)?;
    }

    let db = open_database(&paths).await?;

    add_books(&db, &args.add_book).await?;
    if let Some(file) = &args.import_sources {
        import_sources(&db, file).await?;
    }

    if args.backup_now {
        let written = tasks::auto_backup(&db, &paths, unix_now(), true)
            .await
            .context("Backup failed")?;
        if let Some(path) = written {
            println!("Backup written to {}", path.display());
        }
        return Ok(());
    }

    let prefs = match PreferenceManager::load(&config, &db).await {
        Ok(prefs) => prefs,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load stored preferences");
            PreferenceManager::from_config(&config)
        }
    };

    let (event_tx, event_rx) = mpsc::channel::<AppEvent>(32);
    let background = Arc::new(BackgroundTasks::new(
        db.clone(),
        paths.clone(),
        prefs.thread_count(),
        event_tx,
    ));
    let maintenance: Arc<dyn Maintenance> = background.clone();
    let shell = Shell::new(
        Box::new(DefaultPages),
        BuildInfo::current(),
        Arc::clone(&maintenance),
        Arc::new(ReadAloudState::default()),
    );

    let mut app = App::new(db.clone(), prefs, shell, maintenance);
    app.reload_library().await.context("Failed to load library")?;

    let mut local = db
        .load_local_config()
        .await
        .context("Failed to read local config")?;
    app.start(&mut local);
    db.save_local_config(&local)
        .await
        .context("Failed to save local config")?;

    ui::run(&mut app, event_rx).await?;

    background.wait_idle(Duration::from_secs(5)).await;
    println!("Goodbye!");
    Ok(())
}

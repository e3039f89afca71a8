//! On-disk layout under `~/.config/quire/` and file helpers.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub db_file: PathBuf,
    pub log_file: PathBuf,
    pub backups_dir: PathBuf,
    /// Per-book cache directories, one per book id.
    pub cache_dir: PathBuf,
}

impl AppPaths {
    pub fn new(config_dir: PathBuf) -> Self {
        Self {
            config_file: config_dir.join("config.toml"),
            db_file: config_dir.join("quire.db"),
            log_file: config_dir.join("quire.log"),
            backups_dir: config_dir.join("backups"),
            cache_dir: config_dir.join("cache"),
            config_dir,
        }
    }

    /// `~/.config/quire`
    pub fn from_home() -> Result<Self> {
        let home = std::env::var("HOME").context("HOME environment variable not set")?;
        Ok(Self::new(PathBuf::from(home).join(".config").join("quire")))
    }

    /// Create the config directory, user-only on Unix.
    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)
                .context("Failed to create config directory")?;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            if let Err(e) = std::fs::set_permissions(&self.config_dir, perms) {
                tracing::warn!(
                    path = %self.config_dir.display(),
                    error = %e,
                    "Failed to set config directory permissions to 0700"
                );
            }
        }
        Ok(())
    }

    pub fn db_path_str(&self) -> Result<&str> {
        self.db_file
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))
    }
}

/// Copy `src` to `dst` through a temp file and rename, so `dst` is never
/// left half written.
pub fn atomic_copy(src: &Path, dst: &Path) -> Result<()> {
    use std::time::{SystemTime, UNIX_EPOCH};
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let temp_path = dst.with_extension(format!("tmp.{:016x}", suffix));

    let content = std::fs::read(src)
        .with_context(|| format!("Failed to read '{}'", src.display()))?;

    let write = || -> Result<()> {
        let mut temp_file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
            .with_context(|| format!("Failed to create '{}'", temp_path.display()))?;
        temp_file.write_all(&content)?;
        temp_file.sync_all()?;
        drop(temp_file);

        #[cfg(windows)]
        if dst.exists() {
            std::fs::remove_file(dst)?;
        }
        std::fs::rename(&temp_path, dst).with_context(|| {
            format!(
                "Failed to rename '{}' to '{}'",
                temp_path.display(),
                dst.display()
            )
        })
    };

    write().inspect_err(|_| {
        let _ = std::fs::remove_file(&temp_path);
    })
}

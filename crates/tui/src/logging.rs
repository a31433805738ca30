//! File logging for the interactive client.
//!
//! The terminal is owned by the UI while it runs, so tracing output goes to
//! a size-rotated file instead of stderr. Every line is passed through
//! [`redact_sensitive`] before it is written.

use std::env;
use std::fs::{File, OpenOptions, create_dir_all};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use dirs_next::config_dir;
use flowdesk_util::{expand_tilde, redact_sensitive};
use tracing_subscriber::EnvFilter;

/// Overrides the log file path.
pub const TUI_LOG_PATH_ENV: &str = "FLOWDESK_TUI_LOG_PATH";
/// Overrides the size at which the log file is rotated.
pub const TUI_LOG_MAX_BYTES_ENV: &str = "FLOWDESK_TUI_LOG_MAX_BYTES";
/// Overrides how many rotated files are kept.
pub const TUI_LOG_MAX_FILES_ENV: &str = "FLOWDESK_TUI_LOG_MAX_FILES";

const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_MAX_FILES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Retention {
    /// Size at which the live file is moved aside.
    limit: u64,
    /// Number of `.N` backups kept; zero discards old output.
    backups: usize,
}

/// Log file that moves itself aside to `<path>.1` once it passes the size
/// limit, shifting older backups up by one.
#[derive(Debug)]
pub struct RotatingLogFile {
    path: PathBuf,
    live: File,
    retention: Retention,
}

impl RotatingLogFile {
    pub fn open(path: PathBuf) -> io::Result<Self> {
        Self::with_retention(path, retention_from_env())
    }

    fn with_retention(path: PathBuf, retention: Retention) -> io::Result<Self> {
        if let Some(dir) = path.parent() {
            create_dir_all(dir)?;
        }
        let live = open_append(&path)?;
        Ok(Self { path, live, retention })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_full(&self) -> bool {
        self.live.metadata().map(|meta| meta.len() >= self.retention.limit).unwrap_or(false)
    }

    fn roll_over(&mut self) -> io::Result<()> {
        self.live.flush()?;
        shift_backups(&self.path, self.retention.backups)?;
        self.live = open_append(&self.path)?;
        Ok(())
    }
}

impl Write for RotatingLogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.is_full() {
            self.roll_over()?;
        }
        let line = redact_sensitive(&String::from_utf8_lossy(buf));
        self.live.write_all(line.as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.live.flush()
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Err(error) if error.kind() != io::ErrorKind::NotFound => Err(error),
        _ => Ok(()),
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Drop the oldest backup, move each `.N` to `.N+1`, and move the live file
/// to `.1`.
fn shift_backups(live: &Path, backups: usize) -> io::Result<()> {
    if backups == 0 {
        return remove_if_present(live);
    }
    remove_if_present(&backup_path(live, backups))?;
    for generation in (1..backups).rev() {
        let older = backup_path(live, generation);
        if older.exists() {
            std::fs::rename(&older, backup_path(live, generation + 1))?;
        }
    }
    if live.exists() {
        std::fs::rename(live, backup_path(live, 1))?;
    }
    Ok(())
}

/// Route tracing output to the log file. Returns the file's path.
///
/// The filter comes from `RUST_LOG` and defaults to `info`.
pub fn init_file_logging() -> anyhow::Result<PathBuf> {
    let path = resolve_log_path();
    let writer = RotatingLogFile::open(path.clone()).with_context(|| format!("failed to open log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(writer))
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to install log subscriber: {error}"))?;
    Ok(path)
}

pub fn resolve_log_path() -> PathBuf {
    if let Ok(path) = env::var(TUI_LOG_PATH_ENV)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("flowdesk")
        .join("logs")
        .join("tui.log")
}

fn retention_from_env() -> Retention {
    Retention {
        limit: env_number::<u64>(TUI_LOG_MAX_BYTES_ENV)
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_MAX_BYTES),
        backups: env_number(TUI_LOG_MAX_FILES_ENV).unwrap_or(DEFAULT_MAX_FILES),
    }
}

fn env_number<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|raw| raw.trim().parse().ok())
}

fn backup_path(live: &Path, generation: usize) -> PathBuf {
    let mut name = live.as_os_str().to_owned();
    name.push(format!(".{generation}"));
    PathBuf::from(name)
}

//! Loading and saving the catalog file.
//!
//! This module handles:
//! - First start (missing file is created with defaults)
//! - Recovery from an unreadable file (moved to `.bak`, defaults written)
//! - Synchronous saves for shutdown and explicit flushes
//! - The debounce decision for saves requested after mutations
//!
//! Debounce is last-write-wins within the window: a request that arrives less
//! than the interval after the previous debounced write is dropped, not queued.
//! State changed inside the window reaches disk on the next request outside it,
//! or on the shutdown flush.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use bestiary_types::Config;
use bestiary_utils::{AtomicWriteOptions, atomic_write_with_options, ensure_parent_dir, quarantine};
use thiserror::Error;
use tokio::task::JoinError;

use crate::beasts::BeastStore;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        source: io::Error,
    },
    #[error("failed to serialize catalog: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("persistence task did not complete: {0}")]
    Task(#[from] JoinError),
}

impl PersistError {
    fn io<'a>(action: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> Self + 'a {
        move |source| Self::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// How [`Persistence::load`] obtained its config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No file existed; defaults were written.
    Created,
    /// The file parsed.
    Loaded,
    /// The file did not parse. It was moved to `backup` and defaults written.
    Recovered { backup: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Written,
    /// Skipped: the previous debounced write is too recent.
    Debounced,
}

/// Serialized catalog waiting to be written.
///
/// Produced under the owner's lock; [`PendingWrite::commit`] does the blocking
/// IO and can run elsewhere.
#[derive(Debug)]
pub struct PendingWrite {
    path: PathBuf,
    bytes: Vec<u8>,
    options: AtomicWriteOptions,
}

impl PendingWrite {
    pub fn commit(self) -> Result<(), PersistError> {
        atomic_write_with_options(&self.path, &self.bytes, self.options)
            .map_err(PersistError::io("write", &self.path))
    }
}

/// Owner of the catalog and its backing file.
#[derive(Debug)]
pub struct Persistence {
    config: Config,
    path: PathBuf,
    debounce: Duration,
    last_write: Option<Instant>,
    writes: u64,
    options: AtomicWriteOptions,
}

impl Persistence {
    /// Read the catalog at `path`, creating or resetting it when needed.
    ///
    /// Never fails because of file contents; only IO errors are returned.
    pub fn load(
        path: impl Into<PathBuf>,
        debounce: Duration,
    ) -> Result<(Self, LoadOutcome), PersistError> {
        Self::load_with_options(path, debounce, AtomicWriteOptions::default())
    }

    pub fn load_with_options(
        path: impl Into<PathBuf>,
        debounce: Duration,
        options: AtomicWriteOptions,
    ) -> Result<(Self, LoadOutcome), PersistError> {
        let mut this = Self {
            config: Config::default(),
            path: path.into(),
            debounce,
            last_write: None,
            writes: 0,
            options,
        };

        let outcome = match fs::read(&this.path) {
            Ok(bytes) => match serde_json::from_slice::<Config>(&bytes) {
                Ok(config) => {
                    this.config = config;
                    LoadOutcome::Loaded
                }
                Err(err) => {
                    tracing::warn!(
                        path = %this.path.display(),
                        "Catalog file is unreadable, starting from defaults: {err}"
                    );
                    let backup =
                        quarantine(&this.path).map_err(PersistError::io("back up", &this.path))?;
                    this.save()?;
                    LoadOutcome::Recovered { backup }
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                ensure_parent_dir(&this.path)
                    .map_err(PersistError::io("create directory for", &this.path))?;
                this.save()?;
                LoadOutcome::Created
            }
            Err(err) => return Err(PersistError::io("read", &this.path)(err)),
        };

        tracing::info!(
            path = %this.path.display(),
            beasts = this.config.len(),
            ?outcome,
            "Catalog loaded"
        );
        Ok((this, outcome))
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Catalog operations over the owned config.
    pub fn store(&mut self) -> BeastStore<'_> {
        BeastStore::new(&mut self.config)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Physical writes performed so far, including the one made by `load`.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    pub fn prepare_write(&self) -> Result<PendingWrite, PersistError> {
        Ok(PendingWrite {
            path: self.path.clone(),
            bytes: serde_json::to_vec(&self.config)?,
            options: self.options,
        })
    }

    /// Record a committed write. `debounced_at` is set for writes that
    /// should restart the debounce window.
    pub fn complete_write(&mut self, debounced_at: Option<Instant>) {
        self.writes += 1;
        if let Some(at) = debounced_at {
            self.last_write = Some(at);
        }
    }

    /// Whether a debounced save requested at `now` would write.
    #[must_use]
    pub fn debounce_due(&self, now: Instant) -> bool {
        self.last_write
            .is_none_or(|last| now.saturating_duration_since(last) >= self.debounce)
    }

    /// Write the whole catalog now, ignoring the debounce window.
    pub fn save(&mut self) -> Result<(), PersistError> {
        self.prepare_write()?.commit()?;
        self.complete_write(None);
        Ok(())
    }

    /// The write a debounced save requested at `now` should perform, or
    /// `None` while the previous debounced write is inside the window.
    ///
    /// The caller commits the write and then reports it with
    /// `complete_write(Some(now))`. A write that fails is never reported, so
    /// the window stays open and the next request retries.
    pub fn debounced_write(&self, now: Instant) -> Result<Option<PendingWrite>, PersistError> {
        if !self.debounce_due(now) {
            return Ok(None);
        }
        self.prepare_write().map(Some)
    }
}

#[cfg(test)]
mod tests {
    use bestiary_types::{BeastDraft, ClientAddr, DEFAULT_MAX_PAGESIZE};
    use bestiary_utils::{FileSyncPolicy, ParentDirSyncPolicy};

    use super::*;

    const FAST: AtomicWriteOptions = AtomicWriteOptions {
        file_sync: FileSyncPolicy::SkipSync,
        parent_dir_sync: ParentDirSyncPolicy::SkipSync,
    };
    const WINDOW: Duration = Duration::from_secs(5);

    fn load(path: &Path) -> (Persistence, LoadOutcome) {
        Persistence::load_with_options(path, WINDOW, FAST).expect("load")
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("instance").join("cfg.json");

        let (persistence, outcome) = load(&path);

        assert_eq!(outcome, LoadOutcome::Created);
        assert!(persistence.config().is_empty());
        assert_eq!(persistence.config().max_pagesize(), DEFAULT_MAX_PAGESIZE);
        let written: serde_json::Value =
            serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(written["max_pagesize"], 35);
        assert_eq!(written["beasts"], serde_json::json!([]));
    }

    #[test]
    fn corrupt_file_is_backed_up_and_reset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        let garbage = b"{\"beasts\": [ this is not json";
        fs::write(&path, garbage).unwrap();

        let (persistence, outcome) = load(&path);

        let backup = dir.path().join("cfg.json.bak");
        assert_eq!(outcome, LoadOutcome::Recovered { backup: backup.clone() });
        assert_eq!(fs::read(&backup).unwrap(), garbage);
        assert!(persistence.config().is_empty());
        let rewritten: Config = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert!(rewritten.is_empty());
    }

    #[test]
    fn valid_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        fs::write(
            &path,
            r#"{"beasts":[{"uuid":"67e55044-10b1-426f-9247-bb680e5fe0c8","name":"Slime","percentage":10,
               "meta":{"description":"gooey","like":["203.0.113.5"],"dislike":[],"created_at":1700000000.5}}],
               "max_pagesize":12}"#,
        )
        .unwrap();

        let (persistence, outcome) = load(&path);

        assert_eq!(outcome, LoadOutcome::Loaded);
        assert_eq!(persistence.write_count(), 0);
        assert_eq!(persistence.config().max_pagesize(), 12);
        let beast = persistence.config().iter().next().unwrap();
        assert_eq!(beast.name, "Slime");
        assert_eq!(beast.meta.like().len(), 1);
    }

    #[test]
    fn saved_state_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        let voter: ClientAddr = "2001:db8::7".parse().unwrap();

        let (mut persistence, _) = load(&path);
        let id = persistence.store().add(BeastDraft::new("Golem", 80), None).uuid;
        persistence.store().toggle_dislike(id, voter).unwrap();
        persistence.save().unwrap();

        let (reloaded, outcome) = load(&path);
        assert_eq!(outcome, LoadOutcome::Loaded);
        let beast = reloaded.config().get(id).unwrap();
        assert_eq!(beast.name, "Golem");
        assert_eq!(beast.percentage, 80);
        assert!(beast.meta.dislike().contains(&voter));
    }

    #[test]
    fn debounced_write_follows_the_window() {
        let dir = tempfile::tempdir().unwrap();
        let (mut persistence, _) = load(&dir.path().join("cfg.json"));
        let t0 = Instant::now();

        let first = persistence.debounced_write(t0).unwrap().expect("first request writes");
        first.commit().unwrap();
        persistence.complete_write(Some(t0));

        let inside = persistence.debounced_write(t0 + Duration::from_secs(1)).unwrap();
        assert!(inside.is_none());
        assert!(persistence.debounced_write(t0 + WINDOW).unwrap().is_some());
    }

    #[test]
    fn unreported_write_keeps_the_window_open() {
        let dir = tempfile::tempdir().unwrap();
        let (persistence, _) = load(&dir.path().join("cfg.json"));
        let t0 = Instant::now();

        let failed = persistence.debounced_write(t0).unwrap();
        assert!(failed.is_some());
        drop(failed);
        assert!(persistence.debounced_write(t0 + Duration::from_secs(1)).unwrap().is_some());
    }

    #[test]
    fn explicit_save_does_not_move_the_window() {
        let dir = tempfile::tempdir().unwrap();
        let (mut persistence, _) = load(&dir.path().join("cfg.json"));
        let t0 = Instant::now();

        persistence.save().unwrap();
        assert!(persistence.debounce_due(t0));
    }

    #[test]
    fn directory_in_place_of_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        fs::create_dir(&path).unwrap();

        let err = Persistence::load_with_options(&path, WINDOW, FAST).unwrap_err();
        assert!(matches!(err, PersistError::Io { action: "read", .. }));
    }
}

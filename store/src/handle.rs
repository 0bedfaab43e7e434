//! Shared, cloneable access to the catalog for concurrent request handlers.

use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bestiary_types::{
    Beast, BeastDraft, BeastId, BeastPatch, ClientAddr, MetaPatch, PublicBeast, VoteSet,
    VoteSummary,
};
use tokio::sync::Mutex;
use tokio::task;

use crate::beasts::{BeastStore, StoreError};
use crate::persistence::{LoadOutcome, PersistError, Persistence, SaveOutcome};

/// Handle to the single catalog owner.
///
/// Every operation takes the same lock, so mutations, the debounce decision
/// and the write that follows are serialised. Successful mutations request a
/// debounced save before the lock is released; save failures are logged and
/// retried by the next request rather than returned to the caller.
#[derive(Debug, Clone)]
pub struct BestiaryHandle {
    inner: Arc<Mutex<Persistence>>,
}

impl BestiaryHandle {
    #[must_use]
    pub fn new(persistence: Persistence) -> Self {
        Self {
            inner: Arc::new(Mutex::new(persistence)),
        }
    }

    /// Load the catalog at `path` off the async runtime and wrap it.
    pub async fn open(
        path: impl Into<PathBuf>,
        debounce: Duration,
    ) -> Result<(Self, LoadOutcome), PersistError> {
        let path = path.into();
        let (persistence, outcome) =
            task::spawn_blocking(move || Persistence::load(path, debounce)).await??;
        Ok((Self::new(persistence), outcome))
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.config().len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn write_count(&self) -> u64 {
        self.inner.lock().await.write_count()
    }

    pub async fn paged(&self, page: usize, count: usize) -> Vec<Beast> {
        let mut guard = self.inner.lock().await;
        guard
            .store()
            .paged(page, count)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn paged_public(&self, page: usize, count: usize) -> Vec<PublicBeast> {
        let mut guard = self.inner.lock().await;
        guard
            .store()
            .paged(page, count)
            .into_iter()
            .map(Beast::to_public)
            .collect()
    }

    pub async fn get(&self, id: BeastId) -> Result<Beast, StoreError> {
        let mut guard = self.inner.lock().await;
        guard.store().get(id).cloned()
    }

    pub async fn like_summary(
        &self,
        id: BeastId,
        addr: ClientAddr,
    ) -> Result<VoteSummary, StoreError> {
        let mut guard = self.inner.lock().await;
        guard.store().like_summary(id, addr)
    }

    pub async fn dislike_summary(
        &self,
        id: BeastId,
        addr: ClientAddr,
    ) -> Result<VoteSummary, StoreError> {
        let mut guard = self.inner.lock().await;
        guard.store().dislike_summary(id, addr)
    }

    pub async fn add(&self, draft: BeastDraft, uuid: Option<BeastId>) -> Beast {
        let added = self
            .mutate(|store| Ok::<_, Infallible>(store.add(draft, uuid).clone()))
            .await;
        match added {
            Ok(beast) => beast,
            Err(never) => match never {},
        }
    }

    pub async fn patch_meta(&self, id: BeastId, patch: MetaPatch) -> Result<Beast, StoreError> {
        self.mutate(|store| store.patch_meta(id, &patch).cloned())
            .await
    }

    pub async fn patch(&self, id: BeastId, patch: BeastPatch) -> Result<Beast, StoreError> {
        self.mutate(|store| store.patch(id, &patch).cloned()).await
    }

    pub async fn toggle_like(&self, id: BeastId, addr: ClientAddr) -> Result<VoteSet, StoreError> {
        self.mutate(|store| store.toggle_like(id, addr).cloned())
            .await
    }

    pub async fn toggle_dislike(
        &self,
        id: BeastId,
        addr: ClientAddr,
    ) -> Result<VoteSet, StoreError> {
        self.mutate(|store| store.toggle_dislike(id, addr).cloned())
            .await
    }

    /// Write the catalog now, ignoring the debounce window.
    pub async fn flush(&self) -> Result<(), PersistError> {
        let mut guard = self.inner.lock().await;
        let pending = guard.prepare_write()?;
        task::spawn_blocking(move || pending.commit()).await??;
        guard.complete_write(None);
        Ok(())
    }

    /// Debounced save: writes unless the previous debounced write is inside
    /// the window.
    pub async fn request_save(&self) -> Result<SaveOutcome, PersistError> {
        let mut guard = self.inner.lock().await;
        save_debounced(&mut guard, Instant::now()).await
    }

    /// Final flush at process exit.
    pub async fn shutdown(&self) -> Result<(), PersistError> {
        self.flush().await?;
        let guard = self.inner.lock().await;
        tracing::info!(
            path = %guard.path().display(),
            writes = guard.write_count(),
            "Catalog flushed"
        );
        Ok(())
    }

    async fn mutate<T, E>(
        &self,
        op: impl FnOnce(&mut BeastStore<'_>) -> Result<T, E>,
    ) -> Result<T, E> {
        let mut guard = self.inner.lock().await;
        let result = op(&mut guard.store());
        if result.is_ok()
            && let Err(e) = save_debounced(&mut guard, Instant::now()).await
        {
            tracing::warn!("Debounced save failed: {e}");
        }
        result
    }
}

async fn save_debounced(
    persistence: &mut Persistence,
    now: Instant,
) -> Result<SaveOutcome, PersistError> {
    let Some(pending) = persistence.debounced_write(now)? else {
        tracing::trace!("Save request inside debounce window, skipped");
        return Ok(SaveOutcome::Debounced);
    };
    task::spawn_blocking(move || pending.commit()).await??;
    persistence.complete_write(Some(now));
    Ok(SaveOutcome::Written)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use bestiary_types::Config;
    use tokio::time;

    use super::*;

    async fn open(dir: &tempfile::TempDir, debounce: Duration) -> BestiaryHandle {
        let (handle, outcome) = BestiaryHandle::open(dir.path().join("cfg.json"), debounce)
            .await
            .expect("open");
        assert_eq!(outcome, LoadOutcome::Created);
        handle
    }

    #[tokio::test]
    async fn slime_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let handle = open(&dir, Duration::from_secs(5)).await;
        let voter: ClientAddr = "203.0.113.5".parse().unwrap();

        let id = handle.add(BeastDraft::new("Slime", 10), None).await.uuid;
        assert_eq!(handle.get(id).await.unwrap().name, "Slime");

        let like = handle.toggle_like(id, voter).await.unwrap();
        assert_eq!(like.len(), 1);
        assert!(like.contains(&voter));
        assert_eq!(handle.get(id).await.unwrap().meta.dislike().len(), 0);
    }

    #[tokio::test]
    async fn burst_of_mutations_writes_once() {
        let dir = tempfile::tempdir().unwrap();
        let handle = open(&dir, Duration::from_secs(3600)).await;
        let after_load = handle.write_count().await;

        let id = handle.add(BeastDraft::new("a", 1), None).await.uuid;
        handle.add(BeastDraft::new("b", 2), None).await;
        handle
            .toggle_like(id, "10.0.0.1".parse().unwrap())
            .await
            .unwrap();

        assert_eq!(handle.write_count().await, after_load + 1);

        handle.shutdown().await.unwrap();
        assert_eq!(handle.write_count().await, after_load + 2);
        let on_disk: Config =
            serde_json::from_slice(&fs::read(dir.path().join("cfg.json")).unwrap()).unwrap();
        assert_eq!(on_disk.len(), 2);
    }

    fn beasts_on_disk(path: &Path) -> usize {
        let config: Config = serde_json::from_slice(&fs::read(path).unwrap()).unwrap();
        config.len()
    }

    #[tokio::test]
    async fn requests_inside_the_window_are_coalesced() {
        let dir = tempfile::tempdir().unwrap();
        let handle = open(&dir, Duration::from_secs(5)).await;
        let mut guard = handle.inner.lock().await;
        let base = guard.write_count();
        let t0 = Instant::now();

        assert_eq!(save_debounced(&mut guard, t0).await.unwrap(), SaveOutcome::Written);
        assert_eq!(
            save_debounced(&mut guard, t0 + Duration::from_secs(1))
                .await
                .unwrap(),
            SaveOutcome::Debounced
        );
        assert_eq!(guard.write_count(), base + 1);

        assert_eq!(
            save_debounced(&mut guard, t0 + Duration::from_secs(5))
                .await
                .unwrap(),
            SaveOutcome::Written
        );
        assert_eq!(guard.write_count(), base + 2);
    }

    #[tokio::test]
    async fn mutation_after_the_window_writes_coalesced_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        let handle = open(&dir, Duration::from_millis(200)).await;

        let id = handle.add(BeastDraft::new("first", 1), None).await.uuid;
        handle.add(BeastDraft::new("second", 2), None).await;
        assert_eq!(beasts_on_disk(&path), 1);

        time::sleep(Duration::from_millis(300)).await;
        handle
            .toggle_like(id, "10.0.0.1".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(beasts_on_disk(&path), 2);
        assert_eq!(handle.request_save().await.unwrap(), SaveOutcome::Debounced);
    }

    #[tokio::test]
    async fn failed_debounced_write_is_retried_by_next_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("instance");
        let path = data_dir.join("cfg.json");
        let (handle, _) = BestiaryHandle::open(&path, Duration::from_secs(3600))
            .await
            .unwrap();
        let after_load = handle.write_count().await;

        fs::remove_dir_all(&data_dir).unwrap();
        handle.add(BeastDraft::new("lost write", 1), None).await;
        assert_eq!(handle.write_count().await, after_load);

        fs::create_dir_all(&data_dir).unwrap();
        handle.add(BeastDraft::new("retried", 2), None).await;
        assert_eq!(handle.write_count().await, after_load + 1);
        assert_eq!(beasts_on_disk(&path), 2);
    }

    #[tokio::test]
    async fn zero_window_writes_every_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let handle = open(&dir, Duration::ZERO).await;
        let after_load = handle.write_count().await;

        handle.add(BeastDraft::new("a", 1), None).await;
        handle.add(BeastDraft::new("b", 2), None).await;

        assert_eq!(handle.write_count().await, after_load + 2);
    }

    #[tokio::test]
    async fn failed_mutation_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let handle = open(&dir, Duration::ZERO).await;
        let after_load = handle.write_count().await;
        let missing = BeastId::generate();

        let err = handle
            .patch_meta(missing, MetaPatch::description("x"))
            .await
            .unwrap_err();

        assert_eq!(err, StoreError::NotFound(missing));
        assert_eq!(handle.write_count().await, after_load);
    }

    #[tokio::test]
    async fn clones_share_one_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let handle = open(&dir, Duration::from_secs(5)).await;
        let other = handle.clone();

        let id = handle.add(BeastDraft::new("Shared", 3), None).await.uuid;
        assert_eq!(other.get(id).await.unwrap().percentage, 3);
        assert_eq!(other.paged_public(0, 10).await[0].name, "Shared");
    }

    #[tokio::test]
    async fn concurrent_votes_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let handle = open(&dir, Duration::from_secs(5)).await;
        let id = handle.add(BeastDraft::new("Popular", 0), None).await.uuid;

        let tasks: Vec<_> = (1..=20u8)
            .map(|i| {
                let handle = handle.clone();
                tokio::spawn(async move {
                    handle
                        .toggle_like(id, ClientAddr::from([10, 0, 0, i]))
                        .await
                        .unwrap();
                })
            })
            .collect();
        for t in tasks {
            t.await.unwrap();
        }

        assert_eq!(handle.get(id).await.unwrap().meta.like().len(), 20);
    }
}

//! Catalog operations over a borrowed [`Config`].

use bestiary_types::{
    Beast, BeastDraft, BeastId, BeastPatch, ClientAddr, Config, MetaPatch, VoteSet, VoteSummary,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Beast(uuid={0}) does not exist")]
    NotFound(BeastId),
}

/// Read and mutate the beasts of a [`Config`] in place.
///
/// The store never copies the config; it only borrows it from whoever owns it.
pub struct BeastStore<'a> {
    config: &'a mut Config,
}

impl<'a> BeastStore<'a> {
    pub fn new(config: &'a mut Config) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.config.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.config.is_empty()
    }

    /// Page `page` of at most `count` beasts, with `count` capped by the
    /// configured `max_pagesize`. Pages past the end are empty.
    #[must_use]
    pub fn paged(&self, page: usize, count: usize) -> Vec<&Beast> {
        let count = count.min(self.config.max_pagesize());
        let start = page.saturating_mul(count);
        let end = start.saturating_add(count);
        self.config.range(start, end).collect()
    }

    pub fn get(&self, id: BeastId) -> Result<&Beast, StoreError> {
        self.config.get(id).ok_or(StoreError::NotFound(id))
    }

    fn get_mut(&mut self, id: BeastId) -> Result<&mut Beast, StoreError> {
        self.config.get_mut(id).ok_or(StoreError::NotFound(id))
    }

    /// Insert a new beast, generating its id when `uuid` is `None`.
    pub fn add(&mut self, draft: BeastDraft, uuid: Option<BeastId>) -> &Beast {
        let id = uuid.unwrap_or_else(BeastId::generate);
        tracing::debug!(uuid = %id, name = %draft.name, "Adding beast");
        self.config.insert(draft.into_beast(id))
    }

    /// Merge `patch` onto the beast's metadata, replacing it as one value.
    pub fn patch_meta(&mut self, id: BeastId, patch: &MetaPatch) -> Result<&Beast, StoreError> {
        let beast = self.get_mut(id)?;
        beast.meta = beast.meta.merged(patch);
        Ok(beast)
    }

    /// Admin update: rating plus metadata.
    pub fn patch(&mut self, id: BeastId, patch: &BeastPatch) -> Result<&Beast, StoreError> {
        let beast = self.get_mut(id)?;
        if let Some(percentage) = patch.percentage {
            beast.percentage = percentage;
        }
        beast.meta = beast.meta.merged(&patch.meta);
        Ok(beast)
    }

    pub fn toggle_like(&mut self, id: BeastId, addr: ClientAddr) -> Result<&VoteSet, StoreError> {
        Ok(self.get_mut(id)?.meta.toggle_like(addr))
    }

    pub fn toggle_dislike(
        &mut self,
        id: BeastId,
        addr: ClientAddr,
    ) -> Result<&VoteSet, StoreError> {
        Ok(self.get_mut(id)?.meta.toggle_dislike(addr))
    }

    pub fn like_summary(&self, id: BeastId, addr: ClientAddr) -> Result<VoteSummary, StoreError> {
        Ok(VoteSummary::of(self.get(id)?.meta.like(), &addr))
    }

    pub fn dislike_summary(
        &self,
        id: BeastId,
        addr: ClientAddr,
    ) -> Result<VoteSummary, StoreError> {
        Ok(VoteSummary::of(self.get(id)?.meta.dislike(), &addr))
    }
}

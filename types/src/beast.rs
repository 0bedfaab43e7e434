use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::epoch;
use crate::ids::BeastId;

/// Address of the client casting a vote.
pub type ClientAddr = IpAddr;

/// Unordered set of voters. Kept sorted so persisted files are stable.
pub type VoteSet = BTreeSet<ClientAddr>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("address {0} is present in both like and dislike")]
pub struct ConflictingVoteError(pub ClientAddr);

/// Descriptive and voting state attached to a [`Beast`].
///
/// An address is never in `like` and `dislike` at the same time. The vote sets
/// are only reachable through the toggle methods, and deserialization rejects
/// documents that break the rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MetaRepr", into = "MetaRepr")]
pub struct BeastMeta {
    description: String,
    like: VoteSet,
    dislike: VoteSet,
    created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct MetaRepr {
    #[serde(default, deserialize_with = "null_as_empty")]
    description: String,
    #[serde(default)]
    like: VoteSet,
    #[serde(default)]
    dislike: VoteSet,
    #[serde(default = "Utc::now", with = "epoch")]
    created_at: DateTime<Utc>,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl TryFrom<MetaRepr> for BeastMeta {
    type Error = ConflictingVoteError;

    fn try_from(raw: MetaRepr) -> Result<Self, Self::Error> {
        if let Some(addr) = raw.like.intersection(&raw.dislike).next() {
            return Err(ConflictingVoteError(*addr));
        }
        Ok(Self {
            description: raw.description,
            like: raw.like,
            dislike: raw.dislike,
            created_at: raw.created_at,
        })
    }
}

impl From<BeastMeta> for MetaRepr {
    fn from(meta: BeastMeta) -> Self {
        Self {
            description: meta.description,
            like: meta.like,
            dislike: meta.dislike,
            created_at: meta.created_at,
        }
    }
}

impl Default for BeastMeta {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl BeastMeta {
    /// Metadata with no votes, created now.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            like: VoteSet::new(),
            dislike: VoteSet::new(),
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn like(&self) -> &VoteSet {
        &self.like
    }

    #[must_use]
    pub fn dislike(&self) -> &VoteSet {
        &self.dislike
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Flip `addr` in the like set, then drop it from dislike.
    ///
    /// The dislike removal happens even when this call removes the like.
    pub fn toggle_like(&mut self, addr: ClientAddr) -> &VoteSet {
        toggle(&mut self.like, addr);
        self.dislike.remove(&addr);
        &self.like
    }

    /// Flip `addr` in the dislike set, then drop it from like.
    pub fn toggle_dislike(&mut self, addr: ClientAddr) -> &VoteSet {
        toggle(&mut self.dislike, addr);
        self.like.remove(&addr);
        &self.dislike
    }

    /// New metadata value with the supplied patch fields applied.
    #[must_use]
    pub fn merged(&self, patch: &MetaPatch) -> Self {
        Self {
            description: patch
                .description
                .clone()
                .unwrap_or_else(|| self.description.clone()),
            like: self.like.clone(),
            dislike: self.dislike.clone(),
            created_at: patch.created_at.unwrap_or(self.created_at),
        }
    }
}

fn toggle(set: &mut VoteSet, addr: ClientAddr) {
    if !set.remove(&addr) {
        set.insert(addr);
    }
}

/// Partial metadata update. `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, with = "epoch::option", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl MetaPatch {
    #[must_use]
    pub fn description(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            created_at: None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.created_at.is_none()
    }
}

/// Admin-side update of a beast: its rating plus metadata fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeastPatch {
    #[serde(
        default,
        deserialize_with = "optional_whole_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub percentage: Option<i64>,
    #[serde(flatten)]
    pub meta: MetaPatch,
}

/// A catalog entry. Two beasts are equal when their ids are equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Beast {
    pub uuid: BeastId,
    #[serde(default)]
    pub name: String,
    #[serde(deserialize_with = "whole_number")]
    pub percentage: i64,
    #[serde(default)]
    pub meta: BeastMeta,
}

impl PartialEq for Beast {
    fn eq(&self, other: &Self) -> bool {
        self.uuid == other.uuid
    }
}

impl Eq for Beast {}

impl Hash for Beast {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uuid.hash(state);
    }
}

impl Beast {
    #[must_use]
    pub fn new(uuid: BeastId, name: impl Into<String>, percentage: i64, meta: BeastMeta) -> Self {
        Self {
            uuid,
            name: name.into(),
            percentage,
            meta,
        }
    }

    /// View without vote sets, for anonymous clients.
    #[must_use]
    pub fn to_public(&self) -> PublicBeast {
        PublicBeast {
            name: self.name.clone(),
            percentage: self.percentage,
            description: self.meta.description.clone(),
            created_at: self.meta.created_at,
        }
    }
}

/// Input for creating a beast. The id is assigned on insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeastDraft {
    pub name: String,
    #[serde(default, deserialize_with = "whole_number")]
    pub percentage: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
}

impl BeastDraft {
    #[must_use]
    pub fn new(name: impl Into<String>, percentage: i64) -> Self {
        Self {
            name: name.into(),
            percentage,
            description: String::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn into_beast(self, uuid: BeastId) -> Beast {
        Beast::new(uuid, self.name, self.percentage, BeastMeta::new(self.description))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicBeast {
    pub name: String,
    pub percentage: i64,
    pub description: String,
    #[serde(serialize_with = "epoch::serialize")]
    pub created_at: DateTime<Utc>,
}

/// Whether one address voted a given way, and how many addresses did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoteSummary {
    pub voted: bool,
    pub count: usize,
}

impl VoteSummary {
    #[must_use]
    pub fn of(set: &VoteSet, addr: &ClientAddr) -> Self {
        Self {
            voted: set.contains(addr),
            count: set.len(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Number {
    Whole(i64),
    Fractional(f64),
}

impl Number {
    fn truncate(self) -> i64 {
        match self {
            Self::Whole(value) => value,
            Self::Fractional(value) => value.trunc() as i64,
        }
    }
}

// Ratings arrive as floats from some clients; only the integer part is kept.
fn whole_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Number::deserialize(deserializer).map(Number::truncate)
}

fn optional_whole_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<i64>, D::Error> {
    Ok(Option::<Number>::deserialize(deserializer)?.map(Number::truncate))
}

//! The persisted catalog document.

use std::collections::HashMap;
use std::fmt;

use serde::de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::beast::Beast;
use crate::ids::BeastId;

pub const DEFAULT_MAX_PAGESIZE: usize = 35;

/// Every beast plus the page size ceiling.
///
/// Beasts are keyed by id. Iteration follows insertion order; replacing an
/// existing id keeps its slot.
///
/// On disk `beasts` is a list. A keyed object is also accepted when reading
/// and is normalised to its values.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "ConfigRepr")]
pub struct Config {
    beasts: HashMap<BeastId, Beast>,
    order: Vec<BeastId>,
    max_pagesize: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self::with_max_pagesize(DEFAULT_MAX_PAGESIZE)
    }
}

impl Config {
    #[must_use]
    pub fn with_max_pagesize(max_pagesize: usize) -> Self {
        Self {
            beasts: HashMap::new(),
            order: Vec::new(),
            max_pagesize,
        }
    }

    #[must_use]
    pub fn max_pagesize(&self) -> usize {
        self.max_pagesize
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: BeastId) -> bool {
        self.beasts.contains_key(&id)
    }

    #[must_use]
    pub fn get(&self, id: BeastId) -> Option<&Beast> {
        self.beasts.get(&id)
    }

    pub fn get_mut(&mut self, id: BeastId) -> Option<&mut Beast> {
        self.beasts.get_mut(&id)
    }

    /// Insert or replace by id and return the stored value.
    pub fn insert(&mut self, beast: Beast) -> &Beast {
        let id = beast.uuid;
        if self.beasts.insert(id, beast).is_none() {
            self.order.push(id);
        }
        &self.beasts[&id]
    }

    /// Beasts in iteration order.
    pub fn iter(&self) -> impl Iterator<Item = &Beast> {
        self.order.iter().filter_map(|id| self.beasts.get(id))
    }

    /// Beasts at positions `[start, end)`, clamped to the collection.
    pub fn range(&self, start: usize, end: usize) -> impl Iterator<Item = &Beast> {
        let len = self.order.len();
        let (start, end) = (start.min(len), end.min(len).max(start.min(len)));
        self.order[start..end]
            .iter()
            .filter_map(|id| self.beasts.get(id))
    }
}

impl Serialize for Config {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let beasts: Vec<&Beast> = self.iter().collect();
        let mut state = serializer.serialize_struct("Config", 2)?;
        state.serialize_field("beasts", &beasts)?;
        state.serialize_field("max_pagesize", &self.max_pagesize)?;
        state.end()
    }
}

#[derive(Deserialize)]
struct ConfigRepr {
    #[serde(default)]
    beasts: BeastsRepr,
    #[serde(default = "default_max_pagesize")]
    max_pagesize: usize,
}

const fn default_max_pagesize() -> usize {
    DEFAULT_MAX_PAGESIZE
}

/// `beasts` as read from disk: a list, or an object keyed by id. Keys are
/// ignored in favour of each entry's own `uuid`; file order is kept either way.
#[derive(Default)]
struct BeastsRepr(Vec<Beast>);

impl<'de> Deserialize<'de> for BeastsRepr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(BeastsVisitor)
    }
}

struct BeastsVisitor;

impl<'de> Visitor<'de> for BeastsVisitor {
    type Value = BeastsRepr;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a list of beasts or an object of beasts keyed by id")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(BeastsRepr::default())
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut beasts = Vec::new();
        while let Some(beast) = seq.next_element()? {
            beasts.push(beast);
        }
        Ok(BeastsRepr(beasts))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut beasts = Vec::new();
        while let Some((IgnoredAny, beast)) = map.next_entry()? {
            beasts.push(beast);
        }
        Ok(BeastsRepr(beasts))
    }
}

impl From<ConfigRepr> for Config {
    fn from(raw: ConfigRepr) -> Self {
        let mut config = Config::with_max_pagesize(raw.max_pagesize);
        for beast in raw.beasts.0 {
            config.insert(beast);
        }
        config
    }
}

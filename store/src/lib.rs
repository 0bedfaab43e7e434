//! Beast catalog storage.
//!
//! [`BeastStore`] holds the catalog operations and borrows the config it works
//! on. [`Persistence`] owns that config and its file. [`BestiaryHandle`] puts
//! a `Persistence` behind one async lock for concurrent callers and requests a
//! debounced save after every successful mutation.

mod beasts;
mod handle;
mod persistence;

pub use beasts::{BeastStore, StoreError};
pub use handle::BestiaryHandle;
pub use persistence::{LoadOutcome, PendingWrite, PersistError, Persistence, SaveOutcome};

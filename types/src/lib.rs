//! Core domain types for Bestiary.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! The catalog document ([`Config`]), its entries ([`Beast`]) and the typed
//! partial updates applied to them all live here.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod beast;
mod config;
pub mod epoch;
mod ids;

pub use beast::{
    Beast, BeastDraft, BeastMeta, BeastPatch, ClientAddr, ConflictingVoteError, MetaPatch,
    PublicBeast, VoteSet, VoteSummary,
};
pub use config::{Config, DEFAULT_MAX_PAGESIZE};
pub use ids::BeastId;

//! Shared infrastructure utilities for Bestiary.
//!
//! - **`atomic_write`**: Crash-safe file persistence (temp + rename) and
//!   quarantine of files that could not be read back

pub mod atomic_write;

pub use atomic_write::{
    AtomicWriteOptions, FileSyncPolicy, ParentDirSyncPolicy, atomic_write_with_options,
    ensure_parent_dir, quarantine, sibling_with_suffix,
};

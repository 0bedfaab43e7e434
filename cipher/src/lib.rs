//! Seeded keystream cipher for Bestiary.
//!
//! Leaves first:
//!
//! - [`ByteGenerator`]: reproducible bounded integers from a seed
//! - [`StreamMask`]: XOR of data against a keystream, one value per byte
//! - [`Cipher`]: one-shot encrypt/decrypt built from the two above
//! - [`credentials`]: printable admin passwords derived from a name and seed
//!
//! The output is reproducible for a given seed on this implementation. It is
//! not meant to protect data from anyone who knows the seed.

pub mod base85;
mod cipher;
pub mod credentials;
mod error;
mod generator;
mod mask;

pub use cipher::{Cipher, decrypt, encrypt};
pub use credentials::{AdminAuthority, derive_password, verify_password};
pub use error::{AuthError, CipherError};
pub use generator::{ByteGenerator, DEFAULT_MAX, DEFAULT_MIN};
pub use mask::StreamMask;

//! Admin passwords derived from a name and a secret seed.
//!
//! The password for `name` is the radix-85 text of `name` encrypted under the
//! seed. Nothing is stored: verification derives the value again and compares.

use std::collections::BTreeSet;
use std::fmt;

use crate::base85;
use crate::cipher::encrypt;
use crate::error::AuthError;

#[must_use]
pub fn derive_password(name: &str, seed: i64) -> String {
    base85::encode(&encrypt(name.as_bytes(), seed))
}

/// Whether `supplied` is the password derived for `name`.
#[must_use]
pub fn verify_password(name: &str, seed: i64, supplied: &str) -> bool {
    constant_time_eq(derive_password(name, seed).as_bytes(), supplied.as_bytes())
}

/// Constant-time comparison. Length mismatch returns early; lengths are not secret.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Allow-list of admin names plus the seed their passwords derive from.
#[derive(Clone)]
pub struct AdminAuthority {
    seed: i64,
    admins: BTreeSet<String>,
}

// Manual Debug impl to keep the seed out of logs.
impl fmt::Debug for AdminAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminAuthority")
            .field("seed", &"[REDACTED]")
            .field("admins", &self.admins)
            .finish()
    }
}

impl AdminAuthority {
    pub fn new<I, S>(seed: i64, admins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            seed,
            admins: admins.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn is_admin(&self, name: &str) -> bool {
        self.admins.contains(name)
    }

    pub fn admins(&self) -> impl Iterator<Item = &str> {
        self.admins.iter().map(String::as_str)
    }

    pub fn password_for(&self, name: &str) -> Result<String, AuthError> {
        self.ensure_admin(name)?;
        Ok(derive_password(name, self.seed))
    }

    /// Check an admin login. Names outside the allow-list are an error; a
    /// wrong password is `Ok(false)`.
    pub fn verify(&self, name: &str, password: &str) -> Result<bool, AuthError> {
        self.ensure_admin(name)?;
        let accepted = verify_password(name, self.seed, password);
        if !accepted {
            tracing::debug!(admin = name, "Admin password mismatch");
        }
        Ok(accepted)
    }

    fn ensure_admin(&self, name: &str) -> Result<(), AuthError> {
        if self.is_admin(name) {
            Ok(())
        } else {
            Err(AuthError::UnknownAdmin(name.to_owned()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_reproducible_and_printable() {
        let a = derive_password("dokutah", 114_514);
        let b = derive_password("dokutah", 114_514);
        assert_eq!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_graphic()));
    }

    #[test]
    fn seed_and_name_both_matter() {
        let base = derive_password("dokutah", 1);
        assert_ne!(base, derive_password("dokutah", 2));
        assert_ne!(base, derive_password("amiya", 1));
    }

    #[test]
    fn verify_accepts_only_the_derived_value() {
        let password = derive_password("kaltsit", 42);
        assert!(verify_password("kaltsit", 42, &password));
        assert!(!verify_password("kaltsit", 42, "wrong"));
        assert!(!verify_password("kaltsit", 43, &password));
    }

    #[test]
    fn constant_time_eq_handles_lengths() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"hello", b"hell"));
        assert!(!constant_time_eq(b"hell", b"hello"));
    }

    #[test]
    fn authority_rejects_unknown_names() {
        let authority = AdminAuthority::new(7, ["dokutah"]);
        assert_eq!(
            authority.verify("anonymous", "x"),
            Err(AuthError::UnknownAdmin("anonymous".to_owned()))
        );
        assert!(authority.password_for("anonymous").is_err());
    }

    #[test]
    fn authority_checks_passwords_for_admins() {
        let authority = AdminAuthority::new(7, ["dokutah", "amiya"]);
        let password = authority.password_for("amiya").unwrap();
        assert_eq!(authority.verify("amiya", &password), Ok(true));
        assert_eq!(authority.verify("amiya", "nope"), Ok(false));
        assert_eq!(authority.verify("dokutah", &password), Ok(false));
    }

    #[test]
    fn debug_output_redacts_seed() {
        let rendered = format!("{:?}", AdminAuthority::new(987_654_321, ["dokutah"]));
        assert!(!rendered.contains("987654321"));
        assert!(rendered.contains("REDACTED"));
    }
}

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    #[error("invalid keystream range: min {min} is greater than max {max}")]
    InvalidRange { min: i32, max: i32 },
    #[error("keystream ended after {produced} of {needed} values")]
    KeystreamExhausted { needed: usize, produced: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("{0:?} is not an admin name")]
    UnknownAdmin(String),
}

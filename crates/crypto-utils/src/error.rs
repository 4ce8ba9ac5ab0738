use thiserror::Error;

/// Cryptographic primitive errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid key length")]
    InvalidKeyLength,

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

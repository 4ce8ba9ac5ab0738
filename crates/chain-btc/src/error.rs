use thiserror::Error;

/// Bitcoin engine errors.
#[derive(Debug, Error)]
pub enum BtcError {
    /// A scalar fell outside `[1, n)`, either as input or as the result of a
    /// derivation tweak.
    #[error("invalid private key: {0}")]
    InvalidKey(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid script: {0}")]
    InvalidScript(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("insufficient funds: need more than {needed} sat, largest coin is {available} sat")]
    InsufficientFunds { needed: u64, available: u64 },

    /// A produced signature failed its strict-DER / low-S / self-verification
    /// check. This is an internal bug, never a recoverable condition.
    #[error("signature encoding error: {0}")]
    SignatureEncoding(String),

    #[error("crypto error: {0}")]
    Crypto(#[from] crypto_utils::CryptoError),
}

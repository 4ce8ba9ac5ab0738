use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Base58Check decode failed: {0}")]
    Decode(String),

    #[error("Malformed extended key: {0}")]
    MalformedKey(String),

    #[error("Invalid derivation path: {0}")]
    InvalidPath(String),

    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Block source failed: {0}")]
    Source(String),

    #[error("No ring key controls script {0}")]
    UnknownScript(String),

    #[error("BTC: {0}")]
    Btc(#[from] chain_btc::error::BtcError),

    #[error("Crypto: {0}")]
    Crypto(#[from] crypto_utils::error::CryptoError),
}

//! Base58Check: Base58 text with a 4-byte double-SHA256 checksum suffix.

use crate::error::WalletError;

/// Decode Base58Check text and return the payload with the checksum removed.
///
/// The checksum is verified; a mismatch is a decode error, never a silent
/// truncation.
pub fn decode_check(encoded: &str) -> Result<Vec<u8>, WalletError> {
    bs58::decode(encoded)
        .with_check(None)
        .into_vec()
        .map_err(|e| WalletError::Decode(e.to_string()))
}

/// Encode `payload` as Base58Check.
pub fn encode_check(payload: &[u8]) -> String {
    bs58::encode(payload).with_check().into_string()
}

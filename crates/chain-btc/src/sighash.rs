//! BIP143 signature digest for version 0 witness inputs, SIGHASH_ALL only.

use crypto_utils::hash::sha256d;

use crate::error::BtcError;
use crate::keys::SIGHASH_ALL;
use crate::script::p2pkh_script;
use crate::transaction::{write_compact_size, UnsignedTx};

/// The script committed to by the digest for the input being signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptCode {
    /// P2WPKH spends commit to the equivalent P2PKH script.
    P2wpkh { pubkey_hash: [u8; 20] },
    /// P2WSH spends commit to the full witness script.
    P2wsh { witness_script: Vec<u8> },
}

impl ScriptCode {
    /// Length-prefixed script code as it appears in the preimage.
    pub fn serialize(&self) -> Vec<u8> {
        let script = match self {
            ScriptCode::P2wpkh { pubkey_hash } => p2pkh_script(pubkey_hash),
            ScriptCode::P2wsh { witness_script } => witness_script.clone(),
        };
        let mut buf = Vec::with_capacity(script.len() + 3);
        write_compact_size(&mut buf, script.len() as u64);
        buf.extend_from_slice(&script);
        buf
    }
}

/// Build the BIP143 preimage for `input_index` spending a coin worth
/// `value_sat`.
pub fn segwit_v0_preimage(
    tx: &UnsignedTx,
    input_index: usize,
    script_code: &ScriptCode,
    value_sat: u64,
) -> Result<Vec<u8>, BtcError> {
    let input = tx.inputs.get(input_index).ok_or_else(|| {
        BtcError::TransactionBuildError(format!(
            "input index {input_index} out of range for {} inputs",
            tx.inputs.len()
        ))
    })?;

    let prevouts: Vec<u8> = tx
        .inputs
        .iter()
        .flat_map(|i| i.previous_output.serialize())
        .collect();
    let sequences: Vec<u8> = tx
        .inputs
        .iter()
        .flat_map(|i| i.sequence.to_le_bytes())
        .collect();

    let mut preimage = Vec::with_capacity(256);
    preimage.extend_from_slice(&tx.version.to_le_bytes());
    preimage.extend_from_slice(&sha256d(&prevouts));
    preimage.extend_from_slice(&sha256d(&sequences));
    preimage.extend_from_slice(&input.previous_output.serialize());
    preimage.extend_from_slice(&script_code.serialize());
    preimage.extend_from_slice(&value_sat.to_le_bytes());
    preimage.extend_from_slice(&input.sequence.to_le_bytes());
    preimage.extend_from_slice(&sha256d(&tx.serialized_outputs()));
    preimage.extend_from_slice(&tx.lock_time.to_le_bytes());
    preimage.extend_from_slice(&u32::from(SIGHASH_ALL).to_le_bytes());
    Ok(preimage)
}

/// The 32-byte message signed for a version 0 witness input.
pub fn segwit_v0_digest(
    tx: &UnsignedTx,
    input_index: usize,
    script_code: &ScriptCode,
    value_sat: u64,
) -> Result<[u8; 32], BtcError> {
    segwit_v0_preimage(tx, input_index, script_code, value_sat).map(|p| sha256d(&p))
}

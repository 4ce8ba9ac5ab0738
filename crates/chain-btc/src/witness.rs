//! Witness stacks for the two spend shapes the engine produces.

use tracing::debug;

use crate::error::BtcError;
use crate::keys::{public_key_from_private, sign_digest};
use crate::script::multisig_pubkeys;
use crate::transaction::write_compact_size;

/// The witness stack of a single input, bottom item first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Witness {
    items: Vec<Vec<u8>>,
}

impl Witness {
    pub fn new(items: Vec<Vec<u8>>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[Vec<u8>] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// `item count || (len || item)*`.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        write_compact_size(&mut buf, self.items.len() as u64);
        for item in &self.items {
            write_compact_size(&mut buf, item.len() as u64);
            buf.extend_from_slice(item);
        }
        buf
    }
}

/// `[signature, pubkey]` for a P2WPKH input.
pub fn p2wpkh_witness(private_key: &[u8; 32], digest: &[u8; 32]) -> Result<Witness, BtcError> {
    let signature = sign_digest(private_key, digest)?;
    let pubkey = public_key_from_private(private_key)?;
    Ok(Witness::new(vec![signature, pubkey.to_vec()]))
}

/// `[<empty>, sig_a, sig_b, witness_script]` for a 2-of-2 P2WSH input.
///
/// OP_CHECKMULTISIG matches signatures against keys in push order, so
/// `key_a` must own the first key in the script and `key_b` the second.
/// The leading empty item feeds the extra stack pop of CHECKMULTISIG.
pub fn p2wsh_multisig_witness(
    key_a: &[u8; 32],
    key_b: &[u8; 32],
    digest: &[u8; 32],
    witness_script: &[u8],
) -> Result<Witness, BtcError> {
    let (script_a, script_b) = multisig_pubkeys(witness_script)?;
    if public_key_from_private(key_a)? != script_a || public_key_from_private(key_b)? != script_b {
        return Err(BtcError::TransactionBuildError(
            "signing keys do not match witness script key order".into(),
        ));
    }

    let (sig_a, sig_b) = rayon::join(|| sign_digest(key_a, digest), || sign_digest(key_b, digest));
    let (sig_a, sig_b) = (sig_a?, sig_b?);
    debug!(sig_a_len = sig_a.len(), sig_b_len = sig_b.len(), "signed multisig input");

    Ok(Witness::new(vec![
        Vec::new(),
        sig_a,
        sig_b,
        witness_script.to_vec(),
    ]))
}

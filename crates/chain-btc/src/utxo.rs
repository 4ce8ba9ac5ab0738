use crate::error::BtcError;
use crate::transaction::OutPoint;

/// A single unspent transaction output (UTXO).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    pub outpoint: OutPoint,
    /// Value in satoshis.
    pub value_sat: u64,
    /// The locking script (scriptPubKey) serialized bytes.
    pub script_pubkey: Vec<u8>,
}

/// Result of coin selection: the coin to spend and what is left after the
/// payment and fee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinSelection {
    pub utxo: Utxo,
    pub change_sat: u64,
}

/// Pick one coin that pays `amount_sat` plus `fee_sat` and still leaves a
/// non-zero change output.
///
/// Largest-first: the biggest coin is tried, so the call fails only when no
/// single coin is large enough. Ties keep the earliest coin in `utxos`.
pub fn select_utxo(
    utxos: &[Utxo],
    amount_sat: u64,
    fee_sat: u64,
) -> Result<CoinSelection, BtcError> {
    let needed = amount_sat
        .checked_add(fee_sat)
        .ok_or_else(|| BtcError::TransactionBuildError("amount plus fee overflows".into()))?;

    let largest = utxos
        .iter()
        .enumerate()
        .max_by(|(ia, a), (ib, b)| a.value_sat.cmp(&b.value_sat).then(ib.cmp(ia)))
        .map(|(_, utxo)| utxo);

    match largest {
        Some(utxo) if utxo.value_sat > needed => Ok(CoinSelection {
            utxo: utxo.clone(),
            change_sat: utxo.value_sat - needed,
        }),
        other => Err(BtcError::InsufficientFunds {
            needed,
            available: other.map_or(0, |u| u.value_sat),
        }),
    }
}

//! Block scanning: find coins paying ring programs and drop the ones spent
//! later in the range.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::RangeInclusive;

use chain_btc::script::WitnessProgram;
use chain_btc::transaction::{OutPoint, Txid};
use chain_btc::utxo::Utxo;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::WalletError;

const SATS_PER_BTC: f64 = 100_000_000.0;

/// Supplies decoded block transactions by height, in block order.
///
/// Mirrors `getblockhash` + `getblock <hash> 2`. Implementations do their own
/// I/O; scanning itself never blocks on anything else.
pub trait BlockSource {
    fn block_transactions(&self, height: u64) -> Result<Vec<TxRecord>, WalletError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TxRecord {
    pub txid: String,
    #[serde(default)]
    pub vin: Vec<VinRecord>,
    #[serde(default)]
    pub vout: Vec<VoutRecord>,
}

/// Coinbase inputs carry no `txid`/`vout`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VinRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vout: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coinbase: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub txinwitness: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoutRecord {
    pub n: u32,
    /// BTC, as the node reports it.
    pub value: f64,
    #[serde(rename = "scriptPubKey")]
    pub script_pubkey: ScriptPubKeyRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptPubKeyRecord {
    pub hex: String,
    #[serde(default)]
    pub asm: String,
}

/// Unspent coins owned by the ring, keyed by outpoint and iterated in
/// discovery order.
#[derive(Debug, Clone, Default)]
pub struct UtxoSet {
    coins: HashMap<OutPoint, (u64, Utxo)>,
    order: BTreeMap<u64, OutPoint>,
    next_seq: u64,
}

impl UtxoSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a coin unless its outpoint is already tracked.
    pub fn insert(&mut self, utxo: Utxo) -> bool {
        if self.contains(&utxo.outpoint) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, utxo.outpoint);
        self.coins.insert(utxo.outpoint, (seq, utxo));
        true
    }

    pub fn remove(&mut self, outpoint: &OutPoint) -> Option<Utxo> {
        let (seq, utxo) = self.coins.remove(outpoint)?;
        self.order.remove(&seq);
        Some(utxo)
    }

    pub fn contains(&self, outpoint: &OutPoint) -> bool {
        self.coins.contains_key(outpoint)
    }

    pub fn get(&self, outpoint: &OutPoint) -> Option<&Utxo> {
        self.coins.get(outpoint).map(|(_, utxo)| utxo)
    }

    pub fn len(&self) -> usize {
        self.coins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Utxo> {
        self.order.values().filter_map(|outpoint| self.get(outpoint))
    }

    pub fn to_vec(&self) -> Vec<Utxo> {
        self.iter().cloned().collect()
    }

    pub fn balance_sat(&self) -> u64 {
        self.coins.values().map(|(_, utxo)| utxo.value_sat).sum()
    }
}

/// Convert a node-reported BTC amount to satoshis, rounding to the nearest
/// satoshi.
pub fn btc_to_sat(value_btc: f64) -> Result<u64, WalletError> {
    if !value_btc.is_finite() || value_btc < 0.0 {
        return Err(WalletError::Source(format!("invalid output value {value_btc}")));
    }
    Ok((value_btc * SATS_PER_BTC).round() as u64)
}

/// Scan `heights` for outputs paying any of `programs`, removing coins that a
/// later input spends.
pub fn scan_blocks<S: BlockSource + ?Sized>(
    source: &S,
    heights: RangeInclusive<u64>,
    programs: &[WitnessProgram],
) -> Result<UtxoSet, WalletError> {
    let watched: HashSet<Vec<u8>> = programs.iter().map(WitnessProgram::script_pubkey).collect();
    let mut utxos = UtxoSet::new();

    for height in heights.clone() {
        for tx in source.block_transactions(height)? {
            apply_transaction(&mut utxos, &tx, &watched, height)?;
        }
    }

    info!(
        start = heights.start(),
        end = heights.end(),
        utxos = utxos.len(),
        balance_sat = utxos.balance_sat(),
        "block scan complete"
    );
    Ok(utxos)
}

fn apply_transaction(
    utxos: &mut UtxoSet,
    tx: &TxRecord,
    watched: &HashSet<Vec<u8>>,
    height: u64,
) -> Result<(), WalletError> {
    for input in &tx.vin {
        let (Some(txid), Some(vout)) = (&input.txid, input.vout) else {
            continue;
        };
        let outpoint = OutPoint::new(parse_txid(txid)?, vout);
        if let Some(spent) = utxos.remove(&outpoint) {
            debug!(height, %outpoint, spent_by = %tx.txid, value_sat = spent.value_sat, "coin spent");
        }
    }

    for output in &tx.vout {
        let script_pubkey = hex::decode(&output.script_pubkey.hex).map_err(|e| {
            WalletError::Source(format!("bad scriptPubKey hex in {}: {e}", tx.txid))
        })?;
        if !watched.contains(&script_pubkey) {
            continue;
        }
        let utxo = Utxo {
            outpoint: OutPoint::new(parse_txid(&tx.txid)?, output.n),
            value_sat: btc_to_sat(output.value)?,
            script_pubkey,
        };
        debug!(height, outpoint = %utxo.outpoint, value_sat = utxo.value_sat, "found coin");
        utxos.insert(utxo);
    }
    Ok(())
}

fn parse_txid(txid: &str) -> Result<Txid, WalletError> {
    Txid::from_hex(txid).map_err(|e| WalletError::Source(format!("bad txid {txid}: {e}")))
}

use std::fmt;

use crypto_utils::hash::sha256d;

use crate::error::BtcError;
use crate::witness::Witness;

/// Transaction version used for every transaction this engine builds.
pub const TX_VERSION: u32 = 2;
/// Final sequence: no RBF signalling, no relative locktime.
pub const SEQUENCE_FINAL: u32 = 0xFFFF_FFFF;
/// No absolute locktime.
pub const LOCK_TIME: u32 = 0;

const SEGWIT_MARKER: u8 = 0x00;
const SEGWIT_FLAG: u8 = 0x01;

/// A transaction id. Stored in internal (hash) byte order, displayed reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Txid([u8; 32]);

impl Txid {
    /// Parse a txid from its conventional big-endian display hex.
    pub fn from_hex(txid_hex: &str) -> Result<Self, BtcError> {
        parse_txid(txid_hex).map(Self)
    }

    pub fn from_internal_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Bytes as they appear on the wire and inside outpoints.
    pub fn as_internal_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut display = self.0;
        display.reverse();
        f.write_str(&hex::encode(display))
    }
}

/// Reference to a previous transaction output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutPoint {
    pub txid: Txid,
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: Txid, vout: u32) -> Self {
        Self { txid, vout }
    }

    /// `txid (internal order) || vout (LE)`, 36 bytes. BIP143 reuses these
    /// exact bytes.
    pub fn serialize(&self) -> [u8; 36] {
        let mut out = [0u8; 36];
        out[..32].copy_from_slice(self.txid.as_internal_bytes());
        out[32..].copy_from_slice(&self.vout.to_le_bytes());
        out
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

/// A segwit input: outpoint, empty scriptSig, sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxIn {
    pub previous_output: OutPoint,
    pub sequence: u32,
}

impl TxIn {
    pub fn new(previous_output: OutPoint) -> Self {
        Self {
            previous_output,
            sequence: SEQUENCE_FINAL,
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(41);
        buf.extend_from_slice(&self.previous_output.serialize());
        write_compact_size(&mut buf, 0); // scriptSig lives in the witness
        buf.extend_from_slice(&self.sequence.to_le_bytes());
        buf
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOut {
    pub value_sat: u64,
    pub script_pubkey: Vec<u8>,
}

impl TxOut {
    pub fn new(value_sat: u64, script_pubkey: Vec<u8>) -> Self {
        Self {
            value_sat,
            script_pubkey,
        }
    }

    /// `value (8, LE) || len || script`.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(9 + self.script_pubkey.len());
        buf.extend_from_slice(&self.value_sat.to_le_bytes());
        write_compact_size(&mut buf, self.script_pubkey.len() as u64);
        buf.extend_from_slice(&self.script_pubkey);
        buf
    }
}

/// A transaction before witnesses are attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTx {
    pub version: u32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
}

impl UnsignedTx {
    pub fn new(inputs: Vec<TxIn>, outputs: Vec<TxOut>) -> Result<Self, BtcError> {
        if inputs.is_empty() {
            return Err(BtcError::TransactionBuildError("no inputs".into()));
        }
        if outputs.is_empty() {
            return Err(BtcError::TransactionBuildError("no outputs".into()));
        }
        Ok(Self {
            version: TX_VERSION,
            inputs,
            outputs,
            lock_time: LOCK_TIME,
        })
    }

    /// Concatenated serialized outputs, the preimage of BIP143 `hashOutputs`.
    pub fn serialized_outputs(&self) -> Vec<u8> {
        self.outputs.iter().flat_map(TxOut::serialize).collect()
    }

    /// Witness-stripped serialization: the txid preimage.
    pub fn serialize_legacy(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256);
        buf.extend_from_slice(&self.version.to_le_bytes());
        self.write_inputs_outputs(&mut buf);
        buf.extend_from_slice(&self.lock_time.to_le_bytes());
        buf
    }

    pub fn txid(&self) -> Txid {
        Txid(sha256d(&self.serialize_legacy()))
    }

    /// Attach one witness per input.
    pub fn with_witnesses(self, witnesses: Vec<Witness>) -> Result<SignedTx, BtcError> {
        if witnesses.len() != self.inputs.len() {
            return Err(BtcError::TransactionBuildError(format!(
                "{} witnesses for {} inputs",
                witnesses.len(),
                self.inputs.len()
            )));
        }
        Ok(SignedTx {
            unsigned: self,
            witnesses,
        })
    }

    fn write_inputs_outputs(&self, buf: &mut Vec<u8>) {
        write_compact_size(buf, self.inputs.len() as u64);
        for input in &self.inputs {
            buf.extend_from_slice(&input.serialize());
        }
        write_compact_size(buf, self.outputs.len() as u64);
        for output in &self.outputs {
            buf.extend_from_slice(&output.serialize());
        }
    }
}

/// A fully witnessed transaction, ready for broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTx {
    unsigned: UnsignedTx,
    witnesses: Vec<Witness>,
}

impl SignedTx {
    pub fn unsigned(&self) -> &UnsignedTx {
        &self.unsigned
    }

    pub fn witnesses(&self) -> &[Witness] {
        &self.witnesses
    }

    /// `version || 0x00 0x01 || inputs || outputs || witnesses || locktime`.
    pub fn serialize(&self) -> Vec<u8> {
        let tx = &self.unsigned;
        let mut buf = Vec::with_capacity(512);
        buf.extend_from_slice(&tx.version.to_le_bytes());
        buf.push(SEGWIT_MARKER);
        buf.push(SEGWIT_FLAG);
        tx.write_inputs_outputs(&mut buf);
        for witness in &self.witnesses {
            buf.extend_from_slice(&witness.serialize());
        }
        buf.extend_from_slice(&tx.lock_time.to_le_bytes());
        buf
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.serialize())
    }

    /// Witness data never enters the txid preimage.
    pub fn txid(&self) -> Txid {
        self.unsigned.txid()
    }

    /// BIP141 wtxid: the hash of the full serialization.
    pub fn wtxid(&self) -> Txid {
        Txid(sha256d(&self.serialize()))
    }

    /// BIP141 weight: base size * 3 + total size.
    pub fn weight(&self) -> usize {
        self.unsigned.serialize_legacy().len() * 3 + self.serialize().len()
    }

    pub fn vsize(&self) -> usize {
        self.weight().div_ceil(4)
    }
}

/// Parse a hex txid string (big-endian display) to internal byte order (little-endian).
fn parse_txid(txid_hex: &str) -> Result<[u8; 32], BtcError> {
    let bytes = hex::decode(txid_hex)
        .map_err(|e| BtcError::TransactionBuildError(format!("invalid txid hex: {e}")))?;
    if bytes.len() != 32 {
        return Err(BtcError::TransactionBuildError(format!(
            "txid must be 32 bytes, got {}",
            bytes.len()
        )));
    }
    let mut result = [0u8; 32];
    for (i, &b) in bytes.iter().rev().enumerate() {
        result[i] = b;
    }
    Ok(result)
}

/// Write a Bitcoin CompactSize (variable-length integer).
pub fn write_compact_size(buf: &mut Vec<u8>, val: u64) {
    if val < 0xFD {
        buf.push(val as u8);
    } else if val <= 0xFFFF {
        buf.push(0xFD);
        buf.extend_from_slice(&(val as u16).to_le_bytes());
    } else if val <= 0xFFFFFFFF {
        buf.push(0xFE);
        buf.extend_from_slice(&(val as u32).to_le_bytes());
    } else {
        buf.push(0xFF);
        buf.extend_from_slice(&val.to_le_bytes());
    }
}

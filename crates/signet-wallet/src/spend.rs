//! The two spends: a ring P2WPKH coin into a 2-of-2 P2WSH multisig, then that
//! multisig coin into an OP_RETURN with change back to the ring.

use chain_btc::error::BtcError;
use chain_btc::script::{multisig_script, op_return_script, p2wpkh_program, p2wsh_program};
use chain_btc::sighash::{segwit_v0_digest, ScriptCode};
use chain_btc::transaction::{OutPoint, SignedTx, TxIn, TxOut, Txid, UnsignedTx};
use chain_btc::utxo::{select_utxo, Utxo};
use chain_btc::witness::{p2wpkh_witness, p2wsh_multisig_witness};
use tracing::info;

use crate::config::WalletConfig;
use crate::error::WalletError;
use crate::key_ring::{KeyPair, KeyRing};

/// Amounts and payload shared by both spends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendParams {
    pub multisig_amount_sat: u64,
    pub fee_sat: u64,
    pub op_return_data: Vec<u8>,
}

impl From<&WalletConfig> for SpendParams {
    fn from(config: &WalletConfig) -> Self {
        Self {
            multisig_amount_sat: config.multisig_amount_sat,
            fee_sat: config.fee_sat,
            op_return_data: config.op_return_data.as_bytes().to_vec(),
        }
    }
}

/// A signed, serialized transaction ready for `sendrawtransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedSpend {
    pub txid: Txid,
    pub raw_hex: String,
    pub tx: SignedTx,
}

impl From<SignedTx> for SignedSpend {
    fn from(tx: SignedTx) -> Self {
        Self {
            txid: tx.txid(),
            raw_hex: tx.to_hex(),
            tx,
        }
    }
}

/// The first spend plus what the second one needs to find its coin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisigFunding {
    pub spend: SignedSpend,
    pub outpoint: OutPoint,
    pub value_sat: u64,
    pub witness_script: Vec<u8>,
}

/// Ring members 0 and 1, in multisig key order.
fn multisig_keys(ring: &KeyRing) -> Result<(&KeyPair, &KeyPair), WalletError> {
    match (ring.get(0), ring.get(1)) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(BtcError::TransactionBuildError(format!(
            "multisig needs two ring keys, ring has {}",
            ring.len()
        ))
        .into()),
    }
}

/// Pay `multisig_amount_sat` to P2WSH(2-of-2 of ring keys 0 and 1), with
/// change to ring key 0.
///
/// The coin is picked from `utxos` largest-first and signed by whichever ring
/// member its scriptPubKey belongs to.
pub fn fund_multisig(
    ring: &KeyRing,
    utxos: &[Utxo],
    params: &SpendParams,
) -> Result<MultisigFunding, WalletError> {
    let (key_a, key_b) = multisig_keys(ring)?;
    let selection = select_utxo(utxos, params.multisig_amount_sat, params.fee_sat)?;
    let coin = &selection.utxo;
    let signer = ring.signer_for(&coin.script_pubkey)?;
    info!(
        outpoint = %coin.outpoint,
        value_sat = coin.value_sat,
        signer = signer.child_number(),
        "selected coin"
    );

    let witness_script = multisig_script(key_a.public_key(), key_b.public_key());
    let tx = UnsignedTx::new(
        vec![TxIn::new(coin.outpoint)],
        vec![
            TxOut::new(
                params.multisig_amount_sat,
                p2wsh_program(&witness_script).script_pubkey(),
            ),
            TxOut::new(
                selection.change_sat,
                p2wpkh_program(key_a.public_key()).script_pubkey(),
            ),
        ],
    )?;

    let pubkey_hash = signer.program().pubkey_hash().ok_or_else(|| {
        BtcError::InvalidScript("ring program is not P2WPKH".into())
    })?;
    let digest = segwit_v0_digest(
        &tx,
        0,
        &ScriptCode::P2wpkh { pubkey_hash },
        coin.value_sat,
    )?;
    let witness = p2wpkh_witness(signer.secret().as_bytes(), &digest)?;
    let spend = SignedSpend::from(tx.with_witnesses(vec![witness])?);
    info!(
        txid = %spend.txid,
        wtxid = %spend.tx.wtxid(),
        vsize = spend.tx.vsize(),
        "signed multisig funding transaction"
    );

    Ok(MultisigFunding {
        outpoint: OutPoint::new(spend.txid, 0),
        value_sat: params.multisig_amount_sat,
        witness_script,
        spend,
    })
}

/// Spend the multisig coin to `OP_RETURN <op_return_data>` (value 0), with
/// change to ring key 0. Both ring keys sign.
pub fn spend_multisig(
    ring: &KeyRing,
    funding: &MultisigFunding,
    params: &SpendParams,
) -> Result<SignedSpend, WalletError> {
    let (key_a, key_b) = multisig_keys(ring)?;
    if funding.value_sat <= params.fee_sat {
        return Err(BtcError::InsufficientFunds {
            needed: params.fee_sat,
            available: funding.value_sat,
        }
        .into());
    }
    let change_sat = funding.value_sat - params.fee_sat;

    let tx = UnsignedTx::new(
        vec![TxIn::new(funding.outpoint)],
        vec![
            TxOut::new(0, op_return_script(&params.op_return_data)?),
            TxOut::new(change_sat, p2wpkh_program(key_a.public_key()).script_pubkey()),
        ],
    )?;

    let digest = segwit_v0_digest(
        &tx,
        0,
        &ScriptCode::P2wsh {
            witness_script: funding.witness_script.clone(),
        },
        funding.value_sat,
    )?;
    let witness = p2wsh_multisig_witness(
        key_a.secret().as_bytes(),
        key_b.secret().as_bytes(),
        &digest,
        &funding.witness_script,
    )?;
    let spend = SignedSpend::from(tx.with_witnesses(vec![witness])?);
    info!(
        txid = %spend.txid,
        wtxid = %spend.tx.wtxid(),
        vsize = spend.tx.vsize(),
        "signed multisig spend"
    );
    Ok(spend)
}

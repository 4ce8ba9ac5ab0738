//! Signet wallet recovery and spending.
//!
//! `xprv` descriptor → key ring → scanned coins → two signed transactions:
//! a P2WPKH coin into a 2-of-2 P2WSH multisig, and that multisig coin into an
//! OP_RETURN. Every stage is a plain value handed to the next one.

pub mod base58;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod extended_key;
pub mod hd_derivation;
pub mod key_ring;
pub mod scan;
pub mod spend;

use chain_btc::address::witness_program_address;
use chain_btc::network::BtcNetwork;
use tracing::info;

use config::WalletConfig;
use error::WalletError;
use hd_derivation::derive_ring;
use key_ring::KeyRing;
use scan::{scan_blocks, BlockSource, UtxoSet};
use spend::{fund_multisig, spend_multisig, SignedSpend, SpendParams};

// ─── Wallet state ────────────────────────────────────────────────────

/// Keys and coins recovered from a descriptor and a block range.
#[derive(Debug, Clone)]
pub struct WalletState {
    pub network: BtcNetwork,
    pub ring: KeyRing,
    pub utxos: UtxoSet,
}

impl WalletState {
    pub fn balance_sat(&self) -> u64 {
        self.utxos.balance_sat()
    }

    /// bech32 address of the ring member at `position`.
    pub fn address(&self, position: usize) -> Result<String, WalletError> {
        let member = self.ring.get(position).ok_or_else(|| {
            WalletError::InvalidPath(format!(
                "ring position {position} out of range ({} keys)",
                self.ring.len()
            ))
        })?;
        Ok(witness_program_address(&member.program(), self.network)?)
    }
}

/// The two transactions, in broadcast order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendPair {
    pub funding: SignedSpend,
    pub multisig_spend: SignedSpend,
}

// ─── Pipeline ────────────────────────────────────────────────────────

/// Derive the ring from the configured descriptor and scan the configured
/// block range for its coins.
pub fn recover_wallet<S: BlockSource + ?Sized>(
    config: &WalletConfig,
    source: &S,
) -> Result<WalletState, WalletError> {
    config.validate()?;
    let descriptor = config.descriptor()?;
    let root = descriptor.extended_key()?;

    match root.key_version() {
        Some(version) if !version.private => {
            return Err(WalletError::MalformedKey(
                "descriptor holds a public key; signing needs xprv/tprv".into(),
            ));
        }
        Some(version) if version.mainnet != (config.network == BtcNetwork::Mainnet) => {
            return Err(WalletError::Config(format!(
                "extended key version does not match network {}",
                config.network
            )));
        }
        Some(_) => {}
        None => {
            return Err(WalletError::MalformedKey(format!(
                "unknown version bytes {}",
                hex::encode(root.version())
            )));
        }
    }

    let ring = derive_ring(&root, descriptor.path(), config.ring_size)?;
    let utxos = scan_blocks(
        source,
        config.scan_start_height..=config.scan_end_height,
        &ring.programs(),
    )?;
    info!(
        network = %config.network,
        keys = ring.len(),
        utxos = utxos.len(),
        balance_sat = utxos.balance_sat(),
        "wallet recovered"
    );

    Ok(WalletState {
        network: config.network,
        ring,
        utxos,
    })
}

/// Build and sign both spends from a recovered wallet.
pub fn build_spends(state: &WalletState, params: &SpendParams) -> Result<SpendPair, WalletError> {
    let funding = fund_multisig(&state.ring, &state.utxos.to_vec(), params)?;
    let multisig_spend = spend_multisig(&state.ring, &funding, params)?;
    Ok(SpendPair {
        funding: funding.spend,
        multisig_spend,
    })
}

/// [`recover_wallet`] followed by [`build_spends`] with the configured amounts.
pub fn run(config: &WalletConfig, source: &dyn BlockSource) -> Result<SpendPair, WalletError> {
    let state = recover_wallet(config, source)?;
    build_spends(&state, &SpendParams::from(config))
}

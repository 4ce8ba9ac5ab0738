use bitcoin::Network;
use serde::{Deserialize, Serialize};

/// BIP32 version bytes for mainnet private keys (`xprv`).
pub const XPRV_VERSION: [u8; 4] = [0x04, 0x88, 0xAD, 0xE4];
/// BIP32 version bytes for mainnet public keys (`xpub`).
pub const XPUB_VERSION: [u8; 4] = [0x04, 0x88, 0xB2, 0x1E];
/// BIP32 version bytes for test-network private keys (`tprv`).
pub const TPRV_VERSION: [u8; 4] = [0x04, 0x35, 0x83, 0x94];
/// BIP32 version bytes for test-network public keys (`tpub`).
pub const TPUB_VERSION: [u8; 4] = [0x04, 0x35, 0x87, 0xCF];

/// Supported Bitcoin networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BtcNetwork {
    Mainnet,
    Testnet,
    Signet,
    Regtest,
}

impl BtcNetwork {
    /// Convert to the `bitcoin` crate's `Network` type.
    pub fn to_bitcoin_network(self) -> Network {
        match self {
            BtcNetwork::Mainnet => Network::Bitcoin,
            BtcNetwork::Testnet => Network::Testnet,
            BtcNetwork::Signet => Network::Signet,
            BtcNetwork::Regtest => Network::Regtest,
        }
    }
}

/// What a set of BIP32 version bytes says about a serialized key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyVersion {
    /// `true` for mainnet (`xprv`/`xpub`), `false` for the shared test prefix.
    pub mainnet: bool,
    pub private: bool,
}

impl KeyVersion {
    /// Recognise the four standard version prefixes. Test networks all share
    /// `tprv`/`tpub`, so they cannot be told apart from the bytes alone.
    pub fn from_bytes(version: [u8; 4]) -> Option<Self> {
        match version {
            XPRV_VERSION => Some(Self { mainnet: true, private: true }),
            XPUB_VERSION => Some(Self { mainnet: true, private: false }),
            TPRV_VERSION => Some(Self { mainnet: false, private: true }),
            TPUB_VERSION => Some(Self { mainnet: false, private: false }),
            _ => None,
        }
    }
}

impl std::fmt::Display for BtcNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BtcNetwork::Mainnet => write!(f, "mainnet"),
            BtcNetwork::Testnet => write!(f, "testnet"),
            BtcNetwork::Signet => write!(f, "signet"),
            BtcNetwork::Regtest => write!(f, "regtest"),
        }
    }
}

use std::path::Path;

use chain_btc::network::BtcNetwork;
use chain_btc::script::MAX_OP_RETURN_DATA;
use crypto_utils::zeroizing::ZeroizingString;
use serde::{Deserialize, Serialize};

use crate::descriptor::Descriptor;
use crate::error::WalletError;

fn default_ring_size() -> u32 {
    2000
}

fn default_scan_end_height() -> u64 {
    310
}

fn default_multisig_amount_sat() -> u64 {
    1_000_000
}

fn default_fee_sat() -> u64 {
    1_000
}

fn default_op_return_data() -> String {
    "signet-wallet".into()
}

/// Wallet recovery and spend parameters, loaded from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WalletConfig {
    pub network: BtcNetwork,
    /// `wpkh(<xprv>/<path>)#checksum`. Held in zeroizing memory.
    #[serde(with = "zeroizing_string")]
    pub descriptor: ZeroizingString,
    #[serde(default = "default_ring_size")]
    pub ring_size: u32,
    #[serde(default)]
    pub scan_start_height: u64,
    /// Inclusive.
    #[serde(default = "default_scan_end_height")]
    pub scan_end_height: u64,
    #[serde(default = "default_multisig_amount_sat")]
    pub multisig_amount_sat: u64,
    /// Flat fee paid by each of the two spends.
    #[serde(default = "default_fee_sat")]
    pub fee_sat: u64,
    #[serde(default = "default_op_return_data")]
    pub op_return_data: String,
}

impl WalletConfig {
    /// Config with defaults for everything but the network and descriptor.
    pub fn new(network: BtcNetwork, descriptor: impl Into<ZeroizingString>) -> Self {
        Self {
            network,
            descriptor: descriptor.into(),
            ring_size: default_ring_size(),
            scan_start_height: 0,
            scan_end_height: default_scan_end_height(),
            multisig_amount_sat: default_multisig_amount_sat(),
            fee_sat: default_fee_sat(),
            op_return_data: default_op_return_data(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, WalletError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| WalletError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, WalletError> {
        let path = path.as_ref();
        let json = ZeroizingString::new(std::fs::read_to_string(path).map_err(|e| {
            WalletError::Config(format!("reading {}: {e}", path.display()))
        })?);
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), WalletError> {
        if self.ring_size == 0 {
            return Err(WalletError::Config("ring_size must be at least 1".into()));
        }
        if self.scan_start_height > self.scan_end_height {
            return Err(WalletError::Config(format!(
                "scan range {}..={} is empty",
                self.scan_start_height, self.scan_end_height
            )));
        }
        if self.op_return_data.len() > MAX_OP_RETURN_DATA {
            return Err(WalletError::Config(format!(
                "op_return_data is {} bytes, max {MAX_OP_RETURN_DATA}",
                self.op_return_data.len()
            )));
        }
        if self.multisig_amount_sat == 0 {
            return Err(WalletError::Config("multisig_amount_sat must be non-zero".into()));
        }
        Ok(())
    }

    pub fn descriptor(&self) -> Result<Descriptor, WalletError> {
        Descriptor::parse(&self.descriptor)
    }
}

mod zeroizing_string {
    use crypto_utils::zeroizing::ZeroizingString;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &ZeroizingString, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<ZeroizingString, D::Error> {
        String::deserialize(d).map(ZeroizingString::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIPTOR: &str = "wpkh(tprv8ZgxMBicQKsPf4ey4o4mdpUh3AYy7JA5vySudZ8boXjFhYYjJ9TrP5FPiqhiAh8jPcPi4zMJ2FkdPgnzXDogMy8uoEAWDBVDrRAzyz8J7Dz/84h/1h/0h/0/*)#qwlqgth7";

    #[test]
    fn minimal_json_uses_defaults() {
        let json = format!(r#"{{"network": "signet", "descriptor": "{DESCRIPTOR}"}}"#);
        let config = WalletConfig::from_json(&json).unwrap();
        assert_eq!(config.network, BtcNetwork::Signet);
        assert_eq!(config.ring_size, 2000);
        assert_eq!(config.scan_start_height, 0);
        assert_eq!(config.scan_end_height, 310);
        assert_eq!(config.multisig_amount_sat, 1_000_000);
        assert_eq!(config.fee_sat, 1_000);
        assert_eq!(config.op_return_data, "signet-wallet");
        assert_eq!(config.descriptor().unwrap().path().to_string(), "m/84'/1'/0'/0/*");
    }

    #[test]
    fn overrides_are_applied() {
        let json = format!(
            r#"{{"network": "regtest", "descriptor": "{DESCRIPTOR}", "ring_size": 3,
                "scan_start_height": 100, "scan_end_height": 200, "fee_sat": 500}}"#
        );
        let config = WalletConfig::from_json(&json).unwrap();
        assert_eq!(config.network, BtcNetwork::Regtest);
        assert_eq!(config.ring_size, 3);
        assert_eq!(config.scan_start_height, 100);
        assert_eq!(config.fee_sat, 500);
    }

    #[test]
    fn rejects_invalid_values() {
        let mut config = WalletConfig::new(BtcNetwork::Signet, DESCRIPTOR);
        config.ring_size = 0;
        assert!(matches!(config.validate(), Err(WalletError::Config(_))));

        let mut config = WalletConfig::new(BtcNetwork::Signet, DESCRIPTOR);
        config.scan_start_height = 311;
        assert!(config.validate().is_err());

        let mut config = WalletConfig::new(BtcNetwork::Signet, DESCRIPTOR);
        config.op_return_data = "x".repeat(81);
        assert!(config.validate().is_err());

        let mut config = WalletConfig::new(BtcNetwork::Signet, DESCRIPTOR);
        config.multisig_amount_sat = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            WalletConfig::from_json("{"),
            Err(WalletError::Config(_))
        ));
        assert!(WalletConfig::from_json(r#"{"network": "signet"}"#).is_err());
        let json = format!(r#"{{"network": "signet", "descriptor": "{DESCRIPTOR}", "rpc": 1}}"#);
        assert!(WalletConfig::from_json(&json).is_err());
    }

    #[test]
    fn debug_does_not_leak_descriptor_key() {
        let config = WalletConfig::new(BtcNetwork::Signet, DESCRIPTOR);
        assert!(!format!("{config:?}").contains("tprv"));
    }

    #[test]
    fn serializes_back_to_json() {
        let config = WalletConfig::new(BtcNetwork::Signet, DESCRIPTOR);
        let json = serde_json::to_string(&config).unwrap();
        let back = WalletConfig::from_json(&json).unwrap();
        assert_eq!(&*back.descriptor, DESCRIPTOR);
        assert_eq!(back.network, BtcNetwork::Signet);
    }

    #[test]
    fn missing_file_is_config_error() {
        assert!(matches!(
            WalletConfig::from_file("/nonexistent/signet-wallet.json"),
            Err(WalletError::Config(_))
        ));
    }
}

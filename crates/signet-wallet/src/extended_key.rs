//! BIP32 extended keys: the 78-byte serialization and its Base58Check form.

use std::fmt;

use chain_btc::keys::public_key_from_private;
use chain_btc::network::KeyVersion;
use crypto_utils::hash::hash160;
use crypto_utils::zeroizing::SecretScalar;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::base58::{decode_check, encode_check};
use crate::error::WalletError;
use crate::hd_derivation::{derive_child, DerivationStep};

/// Length of a serialized extended key.
pub const EXTENDED_KEY_LEN: usize = 78;

/// `version(4) || depth(1) || parent fingerprint(4) || child number(4) ||
/// chain code(32) || key material(33)`.
///
/// Private key material is `0x00 || k`; public material is a compressed point.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ExtendedKey {
    version: [u8; 4],
    depth: u8,
    parent_fingerprint: [u8; 4],
    child_number: u32,
    chain_code: [u8; 32],
    key_material: [u8; 33],
}

impl ExtendedKey {
    /// Split a 78-byte serialization at its fixed offsets.
    pub fn parse(bytes: &[u8]) -> Result<Self, WalletError> {
        if bytes.len() != EXTENDED_KEY_LEN {
            return Err(WalletError::MalformedKey(format!(
                "expected {EXTENDED_KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }

        let mut key = Self {
            version: [0; 4],
            depth: bytes[4],
            parent_fingerprint: [0; 4],
            child_number: 0,
            chain_code: [0; 32],
            key_material: [0; 33],
        };
        key.version.copy_from_slice(&bytes[0..4]);
        key.parent_fingerprint.copy_from_slice(&bytes[5..9]);
        let mut child_number = [0u8; 4];
        child_number.copy_from_slice(&bytes[9..13]);
        key.child_number = u32::from_be_bytes(child_number);
        key.chain_code.copy_from_slice(&bytes[13..45]);
        key.key_material.copy_from_slice(&bytes[45..78]);
        Ok(key)
    }

    /// Exact inverse of [`ExtendedKey::parse`].
    pub fn serialize(&self) -> [u8; EXTENDED_KEY_LEN] {
        let mut out = [0u8; EXTENDED_KEY_LEN];
        out[0..4].copy_from_slice(&self.version);
        out[4] = self.depth;
        out[5..9].copy_from_slice(&self.parent_fingerprint);
        out[9..13].copy_from_slice(&self.child_number.to_be_bytes());
        out[13..45].copy_from_slice(&self.chain_code);
        out[45..78].copy_from_slice(&self.key_material);
        out
    }

    /// Decode an `xprv`/`tprv` (or public) Base58Check string.
    pub fn from_base58(encoded: &str) -> Result<Self, WalletError> {
        let mut payload = decode_check(encoded)?;
        let key = Self::parse(&payload);
        payload.zeroize();
        key
    }

    pub fn to_base58(&self) -> String {
        let mut bytes = self.serialize();
        let encoded = encode_check(&bytes);
        bytes.zeroize();
        encoded
    }

    pub fn version(&self) -> [u8; 4] {
        self.version
    }

    /// Network class and key type implied by the version bytes, when they are
    /// one of the four standard prefixes.
    pub fn key_version(&self) -> Option<KeyVersion> {
        KeyVersion::from_bytes(self.version)
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn parent_fingerprint(&self) -> [u8; 4] {
        self.parent_fingerprint
    }

    pub fn child_number(&self) -> u32 {
        self.child_number
    }

    pub fn chain_code(&self) -> &[u8; 32] {
        &self.chain_code
    }

    pub fn key_material(&self) -> &[u8; 33] {
        &self.key_material
    }

    pub fn is_private(&self) -> bool {
        self.key_material[0] == 0x00
    }

    /// The 32-byte private scalar, with the `0x00` marker stripped.
    pub fn private_scalar(&self) -> Result<SecretScalar, WalletError> {
        if !self.is_private() {
            return Err(WalletError::MalformedKey(
                "key material is not a private key".into(),
            ));
        }
        Ok(SecretScalar::from_slice(&self.key_material[1..])?)
    }

    /// Compressed public key for this node.
    pub fn public_key(&self) -> Result<[u8; 33], WalletError> {
        if self.is_private() {
            let secret = self.private_scalar()?;
            return Ok(public_key_from_private(secret.as_bytes())?);
        }
        Ok(self.key_material)
    }

    /// First four bytes of HASH160 of the public key.
    pub fn fingerprint(&self) -> Result<[u8; 4], WalletError> {
        let hash = hash160(&self.public_key()?);
        Ok([hash[0], hash[1], hash[2], hash[3]])
    }

    /// Private child derivation yielding a full extended key, so any node on
    /// a path can be re-serialized.
    pub fn derive_private_child(&self, step: DerivationStep) -> Result<Self, WalletError> {
        let depth = self.depth.checked_add(1).ok_or_else(|| {
            WalletError::MalformedKey("depth 255 cannot have children".into())
        })?;
        let secret = self.private_scalar()?;
        let child = derive_child(&secret, &self.chain_code, step)?;

        let mut key_material = [0u8; 33];
        key_material[1..].copy_from_slice(child.secret.as_bytes());
        Ok(Self {
            version: self.version,
            depth,
            parent_fingerprint: self.fingerprint()?,
            child_number: step.child_number(),
            chain_code: child.chain_code,
            key_material,
        })
    }

    /// Walk every step of `steps` with [`ExtendedKey::derive_private_child`].
    pub fn derive_path(&self, steps: &[DerivationStep]) -> Result<Self, WalletError> {
        steps
            .iter()
            .try_fold(self.clone(), |node, step| node.derive_private_child(*step))
    }
}

impl fmt::Debug for ExtendedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendedKey")
            .field("version", &hex::encode(self.version))
            .field("depth", &self.depth)
            .field("parent_fingerprint", &hex::encode(self.parent_fingerprint))
            .field("child_number", &self.child_number)
            .field("private", &self.is_private())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_btc::network::{TPRV_VERSION, XPRV_VERSION};
    use proptest::prelude::*;

    const TV1_MASTER: &str = "xprv9s21ZrQH143K3QTDL4LXw2F7HEK3wJUD2nW2nRk4stbPy6cq3jPPqjiChkVvvNKmPGJxWUtg6LnF5kejMRNNU3TGtRBeJgk33yuGBxrMPHi";
    const TV1_M0H: &str = "xprv9uHRZZhk6KAJC1avXpDAp4MDc3sQKNxDiPvvkX8Br5ngLNv1TxvUxt4cV1rGL5hj6KCesnDYUhd7oWgT11eZG7XnxHrnYeSvkzY7d2bhkJ7";
    const TV1_M0H1: &str = "xprv9wTYmMFdV23N2TdNG573QoEsfRrWKQgWeibmLntzniatZvR9BmLnvSxqu53Kw1UmYPxLgboyZQaXwTCg8MSY3H2EU4pWcQDnRnrVA1xe8fs";
    const TPRV: &str = "tprv8ZgxMBicQKsPf4ey4o4mdpUh3AYy7JA5vySudZ8boXjFhYYjJ9TrP5FPiqhiAh8jPcPi4zMJ2FkdPgnzXDogMy8uoEAWDBVDrRAzyz8J7Dz";

    #[test]
    fn parses_tv1_master() {
        let key = ExtendedKey::from_base58(TV1_MASTER).unwrap();
        assert_eq!(key.version(), XPRV_VERSION);
        assert_eq!(key.depth(), 0);
        assert_eq!(key.parent_fingerprint(), [0; 4]);
        assert_eq!(key.child_number(), 0);
        assert_eq!(
            hex::encode(key.chain_code()),
            "873dff81c02f525623fd1fe5167eac3a55a049de3d314bb42ee227ffed37d508"
        );
        assert_eq!(
            hex::encode(key.private_scalar().unwrap().as_bytes()),
            "e8f32e723decf4051aefac8e2c93c9c5b214313817cdb01a1494b917c8436b35"
        );
        assert_eq!(
            hex::encode(key.public_key().unwrap()),
            "0339a36013301597daef41fbe593a02cc513d0b55527ec2df1050e2e8ff49c85c2"
        );
        assert_eq!(hex::encode(key.fingerprint().unwrap()), "3442193e");
        let version = key.key_version().unwrap();
        assert!(version.mainnet && version.private);
    }

    #[test]
    fn derives_tv1_children_as_extended_keys() {
        let master = ExtendedKey::from_base58(TV1_MASTER).unwrap();
        let m0h = master
            .derive_private_child(DerivationStep::hardened(0).unwrap())
            .unwrap();
        assert_eq!(m0h.to_base58(), TV1_M0H);
        assert_eq!(m0h.depth(), 1);
        assert_eq!(m0h.child_number(), 0x8000_0000);

        let path = [
            DerivationStep::hardened(0).unwrap(),
            DerivationStep::normal(1).unwrap(),
        ];
        assert_eq!(master.derive_path(&path).unwrap().to_base58(), TV1_M0H1);
    }

    #[test]
    fn derives_testnet_branch_node() {
        let root = ExtendedKey::from_base58(TPRV).unwrap();
        assert_eq!(root.version(), TPRV_VERSION);
        let path: crate::hd_derivation::DerivationPath = "m/84'/1'/0'/0/*".parse().unwrap();
        let branch = root.derive_path(path.prefix()).unwrap();
        assert_eq!(
            branch.to_base58(),
            "tprv8igzTzMegzTotXmsRCPBBPd8CVX5CCsvpMkwxTAi8crmMScxhrih1AqFcYqA1UbjT3VfWvCCNqMTbVzYK23fWW9cCUAsoAppbQgvLBxbtDY"
        );
    }

    #[test]
    fn base58_round_trip() {
        let key = ExtendedKey::from_base58(TPRV).unwrap();
        assert_eq!(key.to_base58(), TPRV);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(matches!(
            ExtendedKey::parse(&[0u8; 77]),
            Err(WalletError::MalformedKey(_))
        ));
        assert!(matches!(
            ExtendedKey::parse(&[0u8; 79]),
            Err(WalletError::MalformedKey(_))
        ));
        // Valid Base58Check, but a 21-byte payload.
        assert!(matches!(
            ExtendedKey::from_base58("1111111111111111111114oLvT2"),
            Err(WalletError::MalformedKey(_))
        ));
    }

    #[test]
    fn public_material_has_no_private_scalar() {
        let mut bytes = ExtendedKey::from_base58(TV1_MASTER).unwrap().serialize();
        bytes[45] = 0x02;
        let key = ExtendedKey::parse(&bytes).unwrap();
        assert!(!key.is_private());
        assert!(matches!(key.private_scalar(), Err(WalletError::MalformedKey(_))));
        assert!(key.derive_private_child(DerivationStep::normal(0).unwrap()).is_err());
    }

    #[test]
    fn debug_output_hides_key_material() {
        let key = ExtendedKey::from_base58(TV1_MASTER).unwrap();
        let debug = format!("{key:?}");
        assert!(debug.contains("0488ade4"));
        assert!(!debug.contains("e8f32e72"));
        assert!(!debug.contains("873dff81"));
    }

    proptest! {
        #[test]
        fn parse_serialize_round_trip(bytes in proptest::collection::vec(any::<u8>(), 78)) {
            let key = ExtendedKey::parse(&bytes).unwrap();
            prop_assert_eq!(key.serialize().to_vec(), bytes);
        }
    }
}

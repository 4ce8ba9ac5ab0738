use std::collections::HashMap;

use chain_btc::keys::public_key_from_private;
use chain_btc::script::{p2wpkh_program, WitnessProgram};
use crypto_utils::zeroizing::SecretScalar;

use crate::error::WalletError;

/// One ring member: private scalar, compressed public key, and the BIP32
/// child number it was derived at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    child_number: u32,
    secret: SecretScalar,
    public_key: [u8; 33],
}

impl KeyPair {
    pub fn new(child_number: u32, secret: SecretScalar) -> Result<Self, WalletError> {
        let public_key = public_key_from_private(secret.as_bytes())?;
        Ok(Self {
            child_number,
            secret,
            public_key,
        })
    }

    pub fn child_number(&self) -> u32 {
        self.child_number
    }

    pub fn secret(&self) -> &SecretScalar {
        &self.secret
    }

    pub fn public_key(&self) -> &[u8; 33] {
        &self.public_key
    }

    pub fn program(&self) -> WitnessProgram {
        p2wpkh_program(&self.public_key)
    }
}

/// Ordered, read-only set of derived keys with a scriptPubKey index.
#[derive(Debug, Clone)]
pub struct KeyRing {
    members: Vec<KeyPair>,
    by_script: HashMap<Vec<u8>, usize>,
}

impl KeyRing {
    pub fn new(members: Vec<KeyPair>) -> Self {
        let by_script = members
            .iter()
            .enumerate()
            .map(|(position, member)| (member.program().script_pubkey(), position))
            .collect();
        Self { members, by_script }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&KeyPair> {
        self.members.get(position)
    }

    pub fn members(&self) -> &[KeyPair] {
        &self.members
    }

    /// P2WPKH programs, index-aligned with the members.
    pub fn programs(&self) -> Vec<WitnessProgram> {
        self.members.iter().map(KeyPair::program).collect()
    }

    /// The member whose P2WPKH scriptPubKey is `script_pubkey`.
    pub fn find_by_script_pubkey(&self, script_pubkey: &[u8]) -> Option<&KeyPair> {
        self.by_script
            .get(script_pubkey)
            .and_then(|&position| self.members.get(position))
    }

    /// Like [`KeyRing::find_by_script_pubkey`], but a miss is an error.
    pub fn signer_for(&self, script_pubkey: &[u8]) -> Result<&KeyPair, WalletError> {
        self.find_by_script_pubkey(script_pubkey)
            .ok_or_else(|| WalletError::UnknownScript(hex::encode(script_pubkey)))
    }
}

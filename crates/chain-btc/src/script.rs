//! Locking scripts: v0 witness programs, the 2-of-2 multisig witness script,
//! and OP_RETURN data carriers.

use crypto_utils::hash::{hash160, sha256};

use crate::error::BtcError;

pub const OP_0: u8 = 0x00;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_1: u8 = 0x51;
pub const OP_2: u8 = 0x52;
pub const OP_RETURN: u8 = 0x6a;
pub const OP_DUP: u8 = 0x76;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_CHECKMULTISIG: u8 = 0xae;

/// Largest OP_RETURN payload relayed by default policy.
pub const MAX_OP_RETURN_DATA: usize = 80;

/// A segwit witness program: version plus 2..=40 program bytes.
///
/// The rendered scriptPubKey (`OP_n <push len> <program>`) is the join key
/// between ring keys and coins reported by a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WitnessProgram {
    version: u8,
    program: Vec<u8>,
}

impl WitnessProgram {
    pub fn new(version: u8, program: Vec<u8>) -> Result<Self, BtcError> {
        if version > 16 {
            return Err(BtcError::InvalidScript(format!(
                "witness version {version} out of range"
            )));
        }
        if !(2..=40).contains(&program.len()) {
            return Err(BtcError::InvalidScript(format!(
                "witness program must be 2..=40 bytes, got {}",
                program.len()
            )));
        }
        if version == 0 && program.len() != 20 && program.len() != 32 {
            return Err(BtcError::InvalidScript(format!(
                "v0 witness program must be 20 or 32 bytes, got {}",
                program.len()
            )));
        }
        Ok(Self { version, program })
    }

    /// Parse a scriptPubKey of the form `OP_n <push> <program>`.
    pub fn from_script_pubkey(script: &[u8]) -> Result<Self, BtcError> {
        let (&op, rest) = script
            .split_first()
            .ok_or_else(|| BtcError::InvalidScript("empty script".into()))?;
        let version = match op {
            OP_0 => 0,
            OP_1..=0x60 => op - OP_1 + 1,
            _ => {
                return Err(BtcError::InvalidScript(format!(
                    "not a witness version opcode: {op:#04x}"
                )))
            }
        };
        let (&len, program) = rest
            .split_first()
            .ok_or_else(|| BtcError::InvalidScript("missing program push".into()))?;
        if len as usize != program.len() {
            return Err(BtcError::InvalidScript(format!(
                "push length {len} does not match {} program bytes",
                program.len()
            )));
        }
        Self::new(version, program.to_vec())
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn program(&self) -> &[u8] {
        &self.program
    }

    pub fn is_p2wpkh(&self) -> bool {
        self.version == 0 && self.program.len() == 20
    }

    pub fn is_p2wsh(&self) -> bool {
        self.version == 0 && self.program.len() == 32
    }

    /// The 20-byte key hash of a P2WPKH program.
    pub fn pubkey_hash(&self) -> Option<[u8; 20]> {
        if !self.is_p2wpkh() {
            return None;
        }
        self.program.as_slice().try_into().ok()
    }

    /// `OP_n <len> <program>`, byte-identical to a node's `scriptPubKey.hex`.
    pub fn script_pubkey(&self) -> Vec<u8> {
        let mut script = Vec::with_capacity(2 + self.program.len());
        script.push(match self.version {
            0 => OP_0,
            v => OP_1 + v - 1,
        });
        script.push(self.program.len() as u8);
        script.extend_from_slice(&self.program);
        script
    }
}

/// P2WPKH program: v0, HASH160(pubkey).
pub fn p2wpkh_program(pubkey: &[u8; 33]) -> WitnessProgram {
    WitnessProgram {
        version: 0,
        program: hash160(pubkey).to_vec(),
    }
}

/// P2WSH program: v0, SHA256(witness script).
pub fn p2wsh_program(witness_script: &[u8]) -> WitnessProgram {
    WitnessProgram {
        version: 0,
        program: sha256(witness_script).to_vec(),
    }
}

/// `OP_2 <a> <b> OP_2 OP_CHECKMULTISIG`.
///
/// Key order is preserved as given; spending signatures must follow it.
pub fn multisig_script(pubkey_a: &[u8; 33], pubkey_b: &[u8; 33]) -> Vec<u8> {
    let mut script = Vec::with_capacity(71);
    script.push(OP_2);
    for key in [pubkey_a, pubkey_b] {
        script.push(key.len() as u8);
        script.extend_from_slice(key);
    }
    script.push(OP_2);
    script.push(OP_CHECKMULTISIG);
    script
}

/// The two public keys pushed by a script built with [`multisig_script`].
pub fn multisig_pubkeys(script: &[u8]) -> Result<([u8; 33], [u8; 33]), BtcError> {
    let well_formed = script.len() == 71
        && script[0] == OP_2
        && script[1] == 33
        && script[35] == 33
        && script[69] == OP_2
        && script[70] == OP_CHECKMULTISIG;
    if !well_formed {
        return Err(BtcError::InvalidScript("not a 2-of-2 multisig script".into()));
    }
    let mut a = [0u8; 33];
    let mut b = [0u8; 33];
    a.copy_from_slice(&script[2..35]);
    b.copy_from_slice(&script[36..69]);
    Ok((a, b))
}

/// `OP_RETURN <data>`, using OP_PUSHDATA1 past 75 bytes.
pub fn op_return_script(data: &[u8]) -> Result<Vec<u8>, BtcError> {
    if data.len() > MAX_OP_RETURN_DATA {
        return Err(BtcError::InvalidScript(format!(
            "OP_RETURN data is {} bytes, max {MAX_OP_RETURN_DATA}",
            data.len()
        )));
    }
    let mut script = Vec::with_capacity(data.len() + 3);
    script.push(OP_RETURN);
    if data.len() > 75 {
        script.push(OP_PUSHDATA1);
    }
    script.push(data.len() as u8);
    script.extend_from_slice(data);
    Ok(script)
}

/// Legacy P2PKH script for a key hash; BIP143 uses it as the P2WPKH script code.
pub fn p2pkh_script(pubkey_hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(25);
    script.push(OP_DUP);
    script.push(OP_HASH160);
    script.push(0x14); // Push 20 bytes
    script.extend_from_slice(pubkey_hash);
    script.push(OP_EQUALVERIFY);
    script.push(OP_CHECKSIG);
    script
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator_pubkey() -> [u8; 33] {
        hex::decode("0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798")
            .unwrap()
            .try_into()
            .unwrap()
    }

    #[test]
    fn p2wpkh_program_matches_bip173_vector() {
        // bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4
        let program = p2wpkh_program(&generator_pubkey());
        assert_eq!(
            hex::encode(program.script_pubkey()),
            "0014751e76e8199196d454941c45d1b3a323f1433bd6"
        );
        assert!(program.is_p2wpkh());
        assert_eq!(
            hex::encode(program.pubkey_hash().unwrap()),
            "751e76e8199196d454941c45d1b3a323f1433bd6"
        );
    }

    #[test]
    fn p2wsh_program_of_bip173_script() {
        // BIP173 P2WSH example: <pubkey> OP_CHECKSIG
        let mut script = vec![0x21];
        script.extend_from_slice(&generator_pubkey());
        script.push(OP_CHECKSIG);
        let program = p2wsh_program(&script);
        assert_eq!(
            hex::encode(program.script_pubkey()),
            "00201863143c14c5166804bd19203356da136c985678cd4d27a1b8c6329604903262"
        );
        assert!(program.is_p2wsh());
        assert!(program.pubkey_hash().is_none());
    }

    #[test]
    fn script_pubkey_round_trips_through_parser() {
        let program = p2wpkh_program(&generator_pubkey());
        let parsed = WitnessProgram::from_script_pubkey(&program.script_pubkey()).unwrap();
        assert_eq!(parsed, program);
    }

    #[test]
    fn parser_accepts_taproot_shape() {
        let mut spk = vec![OP_1, 32];
        spk.extend_from_slice(&[0x55; 32]);
        let program = WitnessProgram::from_script_pubkey(&spk).unwrap();
        assert_eq!(program.version(), 1);
        assert_eq!(program.script_pubkey(), spk);
    }

    #[test]
    fn parser_rejects_non_witness_scripts() {
        let p2pkh = p2pkh_script(&[0x11; 20]);
        assert!(WitnessProgram::from_script_pubkey(&p2pkh).is_err());
        assert!(WitnessProgram::from_script_pubkey(&[]).is_err());
        assert!(WitnessProgram::from_script_pubkey(&[OP_0]).is_err());
        // Length byte disagrees with the payload.
        assert!(WitnessProgram::from_script_pubkey(&[OP_0, 20, 1, 2, 3]).is_err());
    }

    #[test]
    fn v0_program_length_is_enforced() {
        assert!(WitnessProgram::new(0, vec![0; 20]).is_ok());
        assert!(WitnessProgram::new(0, vec![0; 32]).is_ok());
        assert!(WitnessProgram::new(0, vec![0; 21]).is_err());
        assert!(WitnessProgram::new(17, vec![0; 32]).is_err());
    }

    #[test]
    fn multisig_script_layout() {
        let a = generator_pubkey();
        let mut b = generator_pubkey();
        b[0] = 0x03;
        let script = multisig_script(&a, &b);
        assert_eq!(script.len(), 71);
        assert_eq!(script[0], OP_2);
        assert_eq!(script[1], 0x21);
        assert_eq!(&script[2..35], &a);
        assert_eq!(script[35], 0x21);
        assert_eq!(&script[36..69], &b);
        assert_eq!(&script[69..], &[OP_2, OP_CHECKMULTISIG]);
    }

    #[test]
    fn multisig_pubkeys_preserve_order() {
        let a = generator_pubkey();
        let mut b = generator_pubkey();
        b[0] = 0x03;
        let (first, second) = multisig_pubkeys(&multisig_script(&a, &b)).unwrap();
        assert_eq!(first, a);
        assert_eq!(second, b);
        assert!(multisig_pubkeys(&[OP_2, OP_CHECKMULTISIG]).is_err());
    }

    #[test]
    fn op_return_direct_push() {
        let script = op_return_script(b"signet-wallet").unwrap();
        assert_eq!(hex::encode(&script), "6a0d7369676e65742d77616c6c6574");
    }

    #[test]
    fn op_return_pushdata1_and_limit() {
        let script = op_return_script(&[0xAA; 80]).unwrap();
        assert_eq!(&script[..3], &[OP_RETURN, OP_PUSHDATA1, 80]);
        assert_eq!(script.len(), 83);
        assert!(op_return_script(&[0xAA; 81]).is_err());
    }

    #[test]
    fn p2pkh_script_format() {
        let hash = [0x42; 20];
        let script = p2pkh_script(&hash);
        assert_eq!(script.len(), 25);
        assert_eq!(script[0], OP_DUP);
        assert_eq!(script[1], OP_HASH160);
        assert_eq!(script[2], 0x14);
        assert_eq!(&script[3..23], &hash);
        assert_eq!(script[23], OP_EQUALVERIFY);
        assert_eq!(script[24], OP_CHECKSIG);
    }
}

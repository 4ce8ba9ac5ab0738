use std::fmt;
use std::str::FromStr;

use chain_btc::error::BtcError;
use chain_btc::keys::{add_scalars, public_key_from_private};
use crypto_utils::hash::hmac_sha512;
use crypto_utils::zeroizing::SecretScalar;
use rayon::prelude::*;
use tracing::{debug, info, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::WalletError;
use crate::extended_key::ExtendedKey;
use crate::key_ring::{KeyPair, KeyRing};

/// Child numbers at or above this value are hardened.
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// One level of a BIP32 path: a 31-bit index and the hardened flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DerivationStep {
    index: u32,
    hardened: bool,
}

impl DerivationStep {
    pub fn new(index: u32, hardened: bool) -> Result<Self, WalletError> {
        if index >= HARDENED_OFFSET {
            return Err(WalletError::InvalidPath(format!(
                "index {index} does not fit in 31 bits"
            )));
        }
        Ok(Self { index, hardened })
    }

    pub fn normal(index: u32) -> Result<Self, WalletError> {
        Self::new(index, false)
    }

    pub fn hardened(index: u32) -> Result<Self, WalletError> {
        Self::new(index, true)
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn is_hardened(&self) -> bool {
        self.hardened
    }

    /// `ser32` input: the index with the hardened bit applied.
    pub fn child_number(&self) -> u32 {
        if self.hardened {
            self.index | HARDENED_OFFSET
        } else {
            self.index
        }
    }

    /// The same kind of step `offset` indices further along.
    pub fn offset(&self, offset: u32) -> Result<Self, WalletError> {
        let index = self.index.checked_add(offset).ok_or_else(|| {
            WalletError::InvalidPath(format!("index {} + {offset} overflows", self.index))
        })?;
        Self::new(index, self.hardened)
    }
}

impl fmt::Display for DerivationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index)?;
        if self.hardened {
            f.write_str("'")?;
        }
        Ok(())
    }
}

/// An ordered list of steps. The last step is where the ring fans out.
///
/// Parsed from `m/84'/1'/0'/0/*` or the descriptor form `84h/1h/0h/0/*`.
/// A trailing `*` stands for "fan out from index 0".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationPath {
    steps: Vec<DerivationStep>,
    wildcard: bool,
}

impl DerivationPath {
    pub fn new(steps: Vec<DerivationStep>) -> Result<Self, WalletError> {
        if steps.is_empty() {
            return Err(WalletError::InvalidPath("path has no steps".into()));
        }
        Ok(Self {
            steps,
            wildcard: false,
        })
    }

    pub fn steps(&self) -> &[DerivationStep] {
        &self.steps
    }

    /// All steps above the fan-out level.
    pub fn prefix(&self) -> &[DerivationStep] {
        &self.steps[..self.steps.len() - 1]
    }

    /// The first child derived at the fan-out level.
    pub fn fan_out_start(&self) -> DerivationStep {
        self.steps[self.steps.len() - 1]
    }

    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }
}

impl FromStr for DerivationPath {
    type Err = WalletError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let body = match path.strip_prefix('m') {
            Some(rest) => rest.strip_prefix('/').unwrap_or(rest),
            None => path,
        };
        if body.is_empty() {
            return Err(WalletError::InvalidPath(format!("'{path}' has no steps")));
        }

        let components: Vec<&str> = body.split('/').collect();
        let last = components.len() - 1;
        let mut steps = Vec::with_capacity(components.len());
        let mut wildcard = false;

        for (position, component) in components.iter().enumerate() {
            let (digits, hardened) = match component
                .strip_suffix('\'')
                .or_else(|| component.strip_suffix('h'))
                .or_else(|| component.strip_suffix('H'))
            {
                Some(digits) => (digits, true),
                None => (*component, false),
            };

            let index = if digits == "*" {
                if position != last {
                    return Err(WalletError::InvalidPath(format!(
                        "wildcard must be the last step in '{path}'"
                    )));
                }
                wildcard = true;
                0
            } else {
                digits.parse::<u32>().map_err(|_| {
                    WalletError::InvalidPath(format!("invalid index '{component}' in '{path}'"))
                })?
            };
            steps.push(DerivationStep::new(index, hardened)?);
        }

        Ok(Self { steps, wildcard })
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for step in self.prefix() {
            write!(f, "/{step}")?;
        }
        let last = self.fan_out_start();
        if self.wildcard {
            f.write_str("/*")?;
            if last.is_hardened() {
                f.write_str("'")?;
            }
            Ok(())
        } else {
            write!(f, "/{last}")
        }
    }
}

/// A derived private key and its chain code.
#[derive(Debug, Clone, Zeroize, ZeroizeOnDrop)]
pub struct ChildKey {
    pub secret: SecretScalar,
    pub chain_code: [u8; 32],
}

/// BIP32 CKDpriv.
///
/// `I = HMAC-SHA512(chain_code, 0x00 || k || ser32(i))` for hardened steps,
/// `HMAC-SHA512(chain_code, serP(point(k)) || ser32(i))` otherwise. The child
/// scalar is `(k + I_L) mod n` and the child chain code is `I_R`.
///
/// Returns `WalletError::Btc(BtcError::InvalidKey)` when `I_L >= n` or the
/// child scalar is zero.
pub fn derive_child(
    parent: &SecretScalar,
    chain_code: &[u8; 32],
    step: DerivationStep,
) -> Result<ChildKey, WalletError> {
    let index = step.child_number().to_be_bytes();
    let mut i = if step.is_hardened() {
        hmac_sha512(chain_code, &[&[0x00], parent.as_bytes(), &index])?
    } else {
        let parent_pub = public_key_from_private(parent.as_bytes())?;
        hmac_sha512(chain_code, &[&parent_pub, &index])?
    };

    let mut il = [0u8; 32];
    let mut ir = [0u8; 32];
    il.copy_from_slice(&i[..32]);
    ir.copy_from_slice(&i[32..]);
    i.zeroize();

    let child = add_scalars(parent.as_bytes(), &il);
    il.zeroize();

    Ok(ChildKey {
        secret: SecretScalar::new(child?),
        chain_code: ir,
    })
}

/// Derive the key ring: walk the path prefix, then derive `ring_size`
/// consecutive children at the last level in parallel.
///
/// A child index that yields an invalid key is skipped and the ring carries on
/// with the next index, so the ring always has exactly `ring_size` members.
/// Invalid keys above the fan-out level are an error.
pub fn derive_ring(
    root: &ExtendedKey,
    path: &DerivationPath,
    ring_size: u32,
) -> Result<KeyRing, WalletError> {
    derive_ring_from_scalar(&root.private_scalar()?, root.chain_code(), path, ring_size)
}

/// [`derive_ring`] starting from a bare root scalar and chain code.
pub fn derive_ring_from_scalar(
    root_secret: &SecretScalar,
    root_chain_code: &[u8; 32],
    path: &DerivationPath,
    ring_size: u32,
) -> Result<KeyRing, WalletError> {
    let mut node = ChildKey {
        secret: root_secret.clone(),
        chain_code: *root_chain_code,
    };
    for step in path.prefix() {
        node = derive_child(&node.secret, &node.chain_code, *step)?;
        debug!(%step, "derived path prefix step");
    }

    let start = path.fan_out_start();
    let candidates: Vec<Option<KeyPair>> = (0..ring_size)
        .into_par_iter()
        .map(|offset| fan_out_member(&node, start.offset(offset)?))
        .collect::<Result<_, _>>()?;

    let mut members: Vec<KeyPair> = candidates.into_iter().flatten().collect();
    let mut next = ring_size;
    while members.len() < ring_size as usize {
        if let Some(member) = fan_out_member(&node, start.offset(next)?)? {
            members.push(member);
        }
        next = next
            .checked_add(1)
            .ok_or_else(|| WalletError::InvalidPath("ring index overflow".into()))?;
    }

    info!(%path, ring_size, "derived key ring");
    Ok(KeyRing::new(members))
}

fn fan_out_member(
    parent: &ChildKey,
    step: DerivationStep,
) -> Result<Option<KeyPair>, WalletError> {
    match derive_child(&parent.secret, &parent.chain_code, step) {
        Ok(child) => KeyPair::new(step.child_number(), child.secret.clone()).map(Some),
        Err(WalletError::Btc(BtcError::InvalidKey(reason))) => {
            warn!(index = step.index(), %reason, "skipping invalid child index");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

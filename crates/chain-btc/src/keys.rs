//! secp256k1 key math: public key derivation, the BIP32 scalar tweak, and
//! canonical (low-S, strict DER) ECDSA signing over precomputed digests.

use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::scalar::IsHigh;
use k256::elliptic_curve::PrimeField;
use k256::{FieldBytes, NonZeroScalar, Scalar};

use crate::error::BtcError;

/// SIGHASH_ALL, appended to every signature this engine produces.
pub const SIGHASH_ALL: u8 = 0x01;

/// Length of a compressed SEC1 public key.
pub const COMPRESSED_PUBKEY_LEN: usize = 33;

fn signing_key(private_key: &[u8; 32]) -> Result<SigningKey, BtcError> {
    SigningKey::from_bytes(private_key.into())
        .map_err(|e| BtcError::InvalidKey(format!("invalid secp256k1 scalar: {e}")))
}

/// Derive the compressed public key (`0x02`/`0x03` prefix + x) for a scalar.
pub fn public_key_from_private(private_key: &[u8; 32]) -> Result<[u8; 33], BtcError> {
    let signing_key = signing_key(private_key)?;
    signing_key
        .verifying_key()
        .to_encoded_point(true)
        .as_bytes()
        .try_into()
        .map_err(|_| BtcError::InvalidPublicKey("compressed point is not 33 bytes".into()))
}

/// `(parent + tweak) mod n`, the private-key half of BIP32 CKDpriv.
///
/// Fails with [`BtcError::InvalidKey`] when the tweak is not below the curve
/// order or the sum is zero; BIP32 callers must then move on to the next index.
pub fn add_scalars(parent: &[u8; 32], tweak: &[u8; 32]) -> Result<[u8; 32], BtcError> {
    let parent = Option::<Scalar>::from(Scalar::from_repr(FieldBytes::from(*parent)))
        .ok_or_else(|| BtcError::InvalidKey("parent scalar not below curve order".into()))?;
    let tweak = Option::<Scalar>::from(Scalar::from_repr(FieldBytes::from(*tweak)))
        .ok_or_else(|| BtcError::InvalidKey("tweak not below curve order".into()))?;

    let child = Option::<NonZeroScalar>::from(NonZeroScalar::new(parent + tweak))
        .ok_or_else(|| BtcError::InvalidKey("derived scalar is zero".into()))?;
    Ok(child.to_bytes().into())
}

/// Force `s` into the lower half of the curve order (BIP62 low-S).
fn canonicalize_low_s(sig: Signature) -> Result<Signature, BtcError> {
    let s: Scalar = *sig.s();
    if !bool::from(s.is_high()) {
        return Ok(sig);
    }
    let r: Scalar = *sig.r();
    Signature::from_scalars(r.to_bytes(), (-s).to_bytes())
        .map_err(|e| BtcError::SignatureEncoding(format!("re-encoding low-s signature: {e}")))
}

/// Sign a 32-byte digest and return `DER(r, s) || SIGHASH_ALL`.
///
/// Nonces are RFC6979-deterministic, so the same key and digest always give
/// the same bytes. The encoded signature is parsed back and verified against
/// the signer's own public key before it is returned.
pub fn sign_digest(private_key: &[u8; 32], digest: &[u8; 32]) -> Result<Vec<u8>, BtcError> {
    let signing_key = signing_key(private_key)?;

    let raw: Signature = signing_key
        .sign_prehash(digest)
        .map_err(|e| BtcError::SignatureEncoding(format!("ECDSA signing failed: {e}")))?;
    let sig = canonicalize_low_s(raw)?;

    let der = sig.to_der();
    let reparsed = Signature::from_der(der.as_bytes())
        .map_err(|e| BtcError::SignatureEncoding(format!("DER round trip failed: {e}")))?;
    if reparsed != sig || bool::from(reparsed.s().is_high()) {
        return Err(BtcError::SignatureEncoding("signature is not canonical".into()));
    }
    signing_key
        .verifying_key()
        .verify_prehash(digest, &reparsed)
        .map_err(|e| BtcError::SignatureEncoding(format!("self-verification failed: {e}")))?;

    let mut out = der.as_bytes().to_vec();
    out.push(SIGHASH_ALL);
    Ok(out)
}

/// Verify a `DER || sighash` signature over `digest` for a compressed pubkey.
///
/// High-S signatures are rejected, matching standardness policy.
pub fn verify_digest(
    public_key: &[u8; 33],
    digest: &[u8; 32],
    signature: &[u8],
) -> Result<bool, BtcError> {
    let (der, _sighash) = signature
        .split_last()
        .map(|(last, der)| (der, *last))
        .ok_or_else(|| BtcError::SignatureEncoding("empty signature".into()))?;

    let verifying_key = VerifyingKey::from_sec1_bytes(public_key)
        .map_err(|e| BtcError::InvalidPublicKey(format!("failed to parse public key: {e}")))?;
    let sig = Signature::from_der(der)
        .map_err(|e| BtcError::SignatureEncoding(format!("invalid DER: {e}")))?;
    if bool::from(sig.s().is_high()) {
        return Ok(false);
    }
    Ok(verifying_key.verify_prehash(digest, &sig).is_ok())
}

//! `wpkh(<xprv>/<path>)#<checksum>` descriptors as returned by
//! `listdescriptors true`.

use std::fmt;
use std::str::FromStr;

use crypto_utils::zeroizing::ZeroizingString;

use crate::error::WalletError;
use crate::extended_key::ExtendedKey;
use crate::hd_derivation::DerivationPath;

/// A parsed single-key P2WPKH descriptor.
#[derive(Clone)]
pub struct Descriptor {
    extended_key: ZeroizingString,
    path: DerivationPath,
}

impl Descriptor {
    /// Parse a `wpkh()` descriptor. An optional `[fingerprint/origin]` key
    /// prefix is skipped and the `#checksum` suffix is not verified.
    pub fn parse(descriptor: &str) -> Result<Self, WalletError> {
        let body = descriptor
            .split_once('#')
            .map_or(descriptor, |(body, _checksum)| body)
            .trim();

        let inner = body
            .strip_prefix("wpkh(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| {
                WalletError::InvalidDescriptor("expected wpkh(<key>/<path>)".into())
            })?;

        let inner = match inner.strip_prefix('[') {
            Some(rest) => {
                let (_origin, key) = rest.split_once(']').ok_or_else(|| {
                    WalletError::InvalidDescriptor("unterminated key origin".into())
                })?;
                key
            }
            None => inner,
        };

        let (key, path) = inner.split_once('/').ok_or_else(|| {
            WalletError::InvalidDescriptor("missing derivation path after key".into())
        })?;
        if key.is_empty() {
            return Err(WalletError::InvalidDescriptor("empty key".into()));
        }

        Ok(Self {
            extended_key: ZeroizingString::from(key),
            path: path.parse()?,
        })
    }

    /// The Base58Check extended key text.
    pub fn extended_key_str(&self) -> &str {
        &self.extended_key
    }

    /// Decode the embedded extended key.
    pub fn extended_key(&self) -> Result<ExtendedKey, WalletError> {
        ExtendedKey::from_base58(&self.extended_key)
    }

    pub fn path(&self) -> &DerivationPath {
        &self.path
    }
}

impl FromStr for Descriptor {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("extended_key", &self.extended_key)
            .field("path", &self.path.to_string())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hd_derivation::DerivationStep;

    const TPRV: &str = "tprv8ZgxMBicQKsPf4ey4o4mdpUh3AYy7JA5vySudZ8boXjFhYYjJ9TrP5FPiqhiAh8jPcPi4zMJ2FkdPgnzXDogMy8uoEAWDBVDrRAzyz8J7Dz";

    #[test]
    fn parses_listdescriptors_output() {
        let text = format!("wpkh({TPRV}/84h/1h/0h/0/*)#qwlqgth7");
        let descriptor = Descriptor::parse(&text).unwrap();
        assert_eq!(descriptor.extended_key_str(), TPRV);
        assert_eq!(descriptor.path().to_string(), "m/84'/1'/0'/0/*");
        assert_eq!(
            descriptor.path().prefix()[0],
            DerivationStep::hardened(84).unwrap()
        );
        assert!(descriptor.extended_key().unwrap().is_private());
    }

    #[test]
    fn checksum_is_optional() {
        let text = format!("wpkh({TPRV}/0/*)");
        let descriptor: Descriptor = text.parse().unwrap();
        assert_eq!(descriptor.path().steps().len(), 2);
    }

    #[test]
    fn skips_key_origin() {
        let text = format!("wpkh([d34db33f/84h/1h/0h]{TPRV}/0/*)#abcdefgh");
        let descriptor = Descriptor::parse(&text).unwrap();
        assert_eq!(descriptor.extended_key_str(), TPRV);
        assert_eq!(descriptor.path().to_string(), "m/0/*");
    }

    #[test]
    fn rejects_other_descriptor_types() {
        let text = format!("tr({TPRV}/86h/1h/0h/0/*)");
        assert!(matches!(
            Descriptor::parse(&text),
            Err(WalletError::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn rejects_missing_path() {
        let text = format!("wpkh({TPRV})");
        assert!(matches!(
            Descriptor::parse(&text),
            Err(WalletError::InvalidDescriptor(_))
        ));
        assert!(matches!(
            Descriptor::parse("wpkh(/0/*)"),
            Err(WalletError::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn bad_path_is_a_path_error() {
        let text = format!("wpkh({TPRV}/84h/x/*)");
        assert!(matches!(
            Descriptor::parse(&text),
            Err(WalletError::InvalidPath(_))
        ));
    }

    #[test]
    fn debug_output_hides_key() {
        let descriptor = Descriptor::parse(&format!("wpkh({TPRV}/0/*)")).unwrap();
        let debug = format!("{descriptor:?}");
        assert!(!debug.contains("tprv"));
        assert!(debug.contains("m/0/*"));
    }
}

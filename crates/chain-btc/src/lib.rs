//! Bitcoin primitives for the signet wallet engine.
//!
//! secp256k1 key math and canonical signing, v0 witness programs and the
//! 2-of-2 multisig script, a hand-rolled transaction codec, the BIP143
//! digest, witness assembly, and single-coin selection.

pub mod address;
pub mod error;
pub mod keys;
pub mod network;
pub mod script;
pub mod sighash;
pub mod transaction;
pub mod utxo;
pub mod witness;

pub use error::BtcError;
pub use network::BtcNetwork;

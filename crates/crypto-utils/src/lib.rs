//! # crypto-utils
//!
//! Hash primitives and memory-safety wrappers shared by the wallet crates.

pub mod error;
pub mod hash;
pub mod zeroizing;

pub use error::CryptoError;

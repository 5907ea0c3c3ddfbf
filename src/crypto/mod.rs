//! Crypto module: signing keys and ed25519 signatures.
//!
//! - Keys: generation, identifiers, devnet account address derivation
//! - Sign: Ed25519 signatures over transaction hashes

pub mod keys;
pub mod sign;

pub use keys::{Key, KeyId, PublicKey};
pub use sign::{Signature, Signer, Verifier};

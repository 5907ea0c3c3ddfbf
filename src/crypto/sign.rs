use std::convert::TryFrom;
use std::fmt;

use ed25519_dalek::{
    Keypair as DalekKeypair, PublicKey as DalekPublic, SecretKey, Signature as DalekSig,
    Signer as DalekSigner, Verifier as DalekVerifier,
};

use crate::crypto::{Key, PublicKey};
use crate::utils::CryptoError;

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature(0x{}..)", hex::encode(&self.0[..8]))
    }
}

/// Trait for signing
pub trait Signer {
    fn sign(&self, msg: &[u8]) -> Result<Signature, CryptoError>;
}

/// Trait for verifying
pub trait Verifier {
    fn verify(&self, msg: &[u8], sig: &Signature) -> Result<(), CryptoError>;
}

impl Signer for Key {
    fn sign(&self, msg: &[u8]) -> Result<Signature, CryptoError> {
        let secret = SecretKey::from_bytes(self.secret_bytes()).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let public = DalekPublic::from(&secret);
        let kp = DalekKeypair { secret, public };
        Ok(Signature(kp.sign(msg).to_bytes()))
    }
}

impl Verifier for PublicKey {
    fn verify(&self, msg: &[u8], sig: &Signature) -> Result<(), CryptoError> {
        let pk = DalekPublic::from_bytes(&self.0).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let ds = DalekSig::try_from(&sig.0[..]).map_err(|_| CryptoError::BadSignature)?;
        pk.verify(msg, &ds).map_err(|_| CryptoError::BadSignature)
    }
}

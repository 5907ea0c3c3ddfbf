use std::fmt;

use ed25519_dalek::{PublicKey as DalekPublic, SecretKey};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::chain::Address;
use crate::utils::CryptoError;

/// Context string for deriving devnet account addresses from public keys.
const ACCOUNT_ADDRESS_CONTEXT: &str = "pecunovus-txm 2024-01-01 devnet account address";

/// Stable identifier of a signing key (hex of its public key).
pub type KeyId = String;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; 32]);

impl PublicKey {
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

/// Ed25519 signing key held by a keystore.
///
/// Only raw bytes are stored; the dalek key pair is rebuilt for each signature
/// so nothing outlives the signing call.
#[derive(Clone)]
pub struct Key {
    secret: [u8; 32],
    public: PublicKey,
}

impl Key {
    /// Generate a new random key
    pub fn generate() -> Self {
        loop {
            let mut seed = [0u8; 32];
            OsRng.fill_bytes(&mut seed);
            if let Ok(key) = Self::from_secret_bytes(&seed) {
                return key;
            }
        }
    }

    /// Construct from raw secret bytes
    pub fn from_secret_bytes(secret: &[u8]) -> Result<Self, CryptoError> {
        let sk = SecretKey::from_bytes(secret).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let public = PublicKey(DalekPublic::from(&sk).to_bytes());
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(sk.as_bytes());
        Ok(Self { secret: bytes, public })
    }

    /// Construct from a hex-encoded secret (`0x` prefix optional)
    pub fn from_secret_hex(s: &str) -> Result<Self, CryptoError> {
        let raw = hex::decode(s.trim_start_matches("0x")).map_err(|e| CryptoError::Encoding(e.to_string()))?;
        Self::from_secret_bytes(&raw)
    }

    pub fn public(&self) -> PublicKey {
        self.public
    }

    /// Keystore identifier for this key.
    pub fn id(&self) -> KeyId {
        self.public.to_hex()
    }

    /// Address of the devnet account controlled by this key.
    pub fn account_address(&self) -> Address {
        Address(blake3::derive_key(ACCOUNT_ADDRESS_CONTEXT, &self.public.0))
    }

    pub(crate) fn secret_bytes(&self) -> &[u8; 32] {
        &self.secret
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key").field("id", &self.id()).finish_non_exhaustive()
    }
}

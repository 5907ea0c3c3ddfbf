//! Wire-level types shared between the manager and chain clients.
//!
//! - Address / TxHash: 32-byte values rendered as `0x`-prefixed hex
//! - FunctionCall: contract address + entry point selector + calldata
//! - TxPayload: what gets hashed and signed (account, nonce, chain id, call)
//! - SignedTransaction: payload + signature + signer public key

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::crypto::{PublicKey, Signature, Signer, Verifier};
use crate::utils::CryptoError;

fn parse_hex32(s: &str) -> Result<[u8; 32], CryptoError> {
    let digits = s.trim().trim_start_matches("0x").trim_start_matches("0X");
    if digits.is_empty() || digits.len() > 64 {
        return Err(CryptoError::Encoding(format!("expected 1..=64 hex digits, got {:?}", s)));
    }
    // short felts are left-padded ("0x1" == 0x00..01)
    let padded = format!("{:0>64}", digits);
    let raw = hex::decode(padded).map_err(|e| CryptoError::Encoding(e.to_string()))?;
    let mut out = [0u8; 32];
    out.copy_from_slice(&raw);
    Ok(out)
}

/// Account or contract address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub [u8; 32]);

impl Address {
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        parse_hex32(s).map(Address)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

/// Transaction hash as returned by the chain on submission.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(pub [u8; 32]);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self)
    }
}

impl FromStr for TxHash {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex32(s).map(TxHash)
    }
}

/// A single contract invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub contract_address: Address,
    pub entry_point_selector: String,
    #[serde(default)]
    pub calldata: Vec<String>,
}

impl FunctionCall {
    pub fn new(contract_address: Address, entry_point_selector: impl Into<String>) -> Self {
        Self { contract_address, entry_point_selector: entry_point_selector.into(), calldata: vec![] }
    }

    pub fn with_calldata(mut self, calldata: Vec<String>) -> Self {
        self.calldata = calldata;
        self
    }
}

/// Unsigned transaction body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxPayload {
    pub account: Address,
    pub nonce: u64,
    pub chain_id: String,
    pub call: FunctionCall,
}

impl TxPayload {
    pub fn encode(&self) -> Result<Vec<u8>, CryptoError> {
        bincode::serialize(self).map_err(|e| CryptoError::Encoding(e.to_string()))
    }

    /// SHA-256 of the bincode encoding
    pub fn hash(&self) -> Result<TxHash, CryptoError> {
        let bin = self.encode()?;
        let mut h = Sha256::new();
        h.update(&bin);
        Ok(TxHash(h.finalize().into()))
    }

    /// Hash and sign with `signer`, producing a transaction ready for submission.
    pub fn sign<S: Signer>(self, signer: &S, public_key: PublicKey) -> Result<SignedTransaction, CryptoError> {
        let hash = self.hash()?;
        let signature = signer.sign(&hash.0)?;
        Ok(SignedTransaction { payload: self, hash, signature, public_key })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub payload: TxPayload,
    pub hash: TxHash,
    pub signature: Signature,
    pub public_key: PublicKey,
}

impl SignedTransaction {
    /// Recompute the hash and check the signature against the embedded public key.
    pub fn verify(&self) -> Result<(), CryptoError> {
        if self.payload.hash()? != self.hash {
            return Err(CryptoError::BadSignature);
        }
        self.public_key.verify(&self.hash.0, &self.signature)
    }
}

/// Status of a submitted transaction as reported by the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    /// The node has no record of the hash (yet).
    Unknown,
    /// Received, not yet included / finalized.
    Pending,
    /// Included and finalized.
    Confirmed,
    /// Refused by the sequencer.
    Rejected(String),
    /// Included but execution reverted.
    Reverted(String),
}

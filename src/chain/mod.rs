//! Chain capability consumed by the transaction manager.
//!
//! The manager never talks to a node directly; it goes through `ChainClient`,
//! obtained per use from a `ClientAccessor`.

pub mod client;
#[cfg(feature = "inmem-chain")]
pub mod memory;
pub mod types;

pub use client::{static_accessor, ChainClient, ClientAccessor};
#[cfg(feature = "inmem-chain")]
pub use memory::{InMemoryChain, DEVNET_CHAIN_ID};
pub use types::{Address, FunctionCall, SignedTransaction, TxHash, TxPayload, TxStatus};

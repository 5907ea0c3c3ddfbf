//! Pecu Novus transaction manager.
//!
//! Accepts contract calls on behalf of keystore-held signing keys, sequences
//! them per account, signs and broadcasts them through a pluggable chain client,
//! and tracks each one to confirmation, failure or timeout.
//!
//! ```no_run
//! use std::sync::Arc;
//! use pecunovus_txm::chain::{static_accessor, Address, FunctionCall, InMemoryChain};
//! use pecunovus_txm::crypto::Key;
//! use pecunovus_txm::keystore::InMemoryKeystore;
//! use pecunovus_txm::txm::{Txm, TxmConfig};
//!
//! # async fn run() -> Result<(), pecunovus_txm::utils::TxmError> {
//! let keystore = Arc::new(InMemoryKeystore::new());
//! let key = Key::generate();
//! let sender = keystore.insert(key.clone());
//!
//! let chain = Arc::new(InMemoryChain::default());
//! let txm = Txm::new(keystore, Arc::new(TxmConfig::default()), static_accessor(chain))?;
//! txm.start()?;
//!
//! let token = Address::from_hex("0x49d3")?;
//! txm.enqueue(&sender, key.account_address(), FunctionCall::new(token, "totalSupply"))?;
//!
//! let (queued, unconfirmed) = txm.inflight_count();
//! println!("queued={} unconfirmed={}", queued, unconfirmed);
//! txm.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod chain;
pub mod crypto;
pub mod keystore;
pub mod txm;
pub mod utils;

pub use chain::{ChainClient, ClientAccessor};
pub use keystore::Keystore;
pub use txm::{Config, LifecycleState, TxEvent, Txm, TxmConfig};
pub use utils::{Result, TxmError};

//! Run the transaction manager against an in-memory devnet.
//!
//! Generates accounts, enqueues calls for each, and prints the inflight count
//! until everything is resolved or the wait budget runs out.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use tokio::time::{sleep, Instant};
use tracing::info;

use pecunovus_txm::chain::{static_accessor, Address, FunctionCall, InMemoryChain};
use pecunovus_txm::crypto::Key;
use pecunovus_txm::keystore::InMemoryKeystore;
use pecunovus_txm::txm::{Txm, TxmConfig};
use pecunovus_txm::utils::init_logging;

/// Devnet driver for the transaction manager.
#[derive(Parser)]
#[clap(name = "txm-devnet", version)]
struct Cli {
    /// Optional TOML config (tx_timeout, confirmation_poll)
    #[clap(long)]
    config: Option<PathBuf>,

    /// Number of devnet accounts
    #[clap(long, default_value_t = 3)]
    accounts: usize,

    /// Calls enqueued per account
    #[clap(long, default_value_t = 2)]
    calls: usize,

    /// Contract the calls target
    #[clap(long, default_value = "0x49D36570D4E46F48E99674BD3FCC84644DDD6B96F7C741B1562B82F9E004DC7")]
    contract: String,

    /// Entry point invoked on the contract
    #[clap(long, default_value = "totalSupply")]
    entry_point: String,

    /// Simulated time until the devnet finalizes a transaction
    #[clap(long, default_value = "1s", value_parser = humantime::parse_duration)]
    block_time: Duration,

    /// Give up waiting for the queue to drain after this long
    #[clap(long, default_value = "30s", value_parser = humantime::parse_duration)]
    wait: Duration,

    /// Log level used when RUST_LOG is unset
    #[clap(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let cfg = match &cli.config {
        Some(path) => TxmConfig::load(path)?,
        None => TxmConfig::default(),
    };

    let chain = Arc::new(InMemoryChain::default());
    chain.set_confirmation_latency(Some(cli.block_time));

    let keystore = Arc::new(InMemoryKeystore::new());
    let keys: Vec<Key> = (0..cli.accounts).map(|_| Key::generate()).collect();
    for key in &keys {
        keystore.insert(key.clone());
        info!(id = %key.id(), account = %key.account_address(), "devnet account");
    }

    let txm = Txm::new(keystore.clone(), Arc::new(cfg), static_accessor(chain.clone()))?;
    txm.start()?;
    txm.ready()?;

    let contract = Address::from_hex(&cli.contract)?;
    for key in &keys {
        for _ in 0..cli.calls {
            txm.enqueue(&key.id(), key.account_address(), FunctionCall::new(contract, cli.entry_point.clone()))?;
        }
    }

    let deadline = Instant::now() + cli.wait;
    let drained = loop {
        let (queued, unconfirmed) = txm.inflight_count();
        println!("inflight count: queued ({}), unconfirmed ({})", queued, unconfirmed);
        if queued == 0 && unconfirmed == 0 {
            break true;
        }
        if Instant::now() >= deadline {
            break false;
        }
        sleep(Duration::from_millis(500)).await;
    };

    txm.close().await?;
    let (counters, _) = txm.metrics().snapshot();
    let mut names: Vec<_> = counters.into_iter().collect();
    names.sort();
    for (name, value) in names {
        println!("{} = {}", name, value);
    }
    println!("devnet accepted {} transactions", chain.submissions().len());

    if !drained {
        bail!("transaction manager timed out while confirming transactions");
    }
    Ok(())
}

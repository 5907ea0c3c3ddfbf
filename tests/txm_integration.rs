//! End-to-end tests: the manager driving the in-memory devnet.

#![cfg(feature = "inmem-chain")]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::{sleep, Instant};
use tokio_test::{assert_err, assert_ok};

use pecunovus_txm::chain::{static_accessor, Address, ChainClient, ClientAccessor, FunctionCall, InMemoryChain};
use pecunovus_txm::crypto::Key;
use pecunovus_txm::keystore::InMemoryKeystore;
use pecunovus_txm::utils::{init_logging, metrics, ChainError};
use pecunovus_txm::{TxEvent, Txm, TxmConfig, TxmError};

const ETH_TOKEN: &str = "0x49D36570D4E46F48E99674BD3FCC84644DDD6B96F7C741B1562B82F9E004DC7";

struct Devnet {
    chain: Arc<InMemoryChain>,
    keystore: Arc<InMemoryKeystore>,
    keys: Vec<Key>,
}

fn devnet(accounts: usize) -> Devnet {
    init_logging("debug");
    let chain = Arc::new(InMemoryChain::default());
    let keystore = Arc::new(InMemoryKeystore::new());
    let keys: Vec<Key> = (0..accounts).map(|_| Key::generate()).collect();
    for key in &keys {
        keystore.insert(key.clone());
    }
    Devnet { chain, keystore, keys }
}

fn txm_for(net: &Devnet, tx_timeout: Duration, poll: Duration) -> Txm {
    Txm::new(net.keystore.clone(), Arc::new(TxmConfig::new(tx_timeout, poll)), static_accessor(net.chain.clone())).unwrap()
}

fn total_supply() -> FunctionCall {
    FunctionCall::new(Address::from_hex(ETH_TOKEN).unwrap(), "totalSupply")
}

async fn wait_until<F: Fn() -> bool>(cond: F, budget: Duration) -> bool {
    let deadline = Instant::now() + budget;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        sleep(Duration::from_millis(20)).await;
    }
    cond()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn drains_two_calls_and_stops() {
    let net = devnet(1);
    let txm = txm_for(&net, Duration::from_secs(10), Duration::from_millis(100));

    assert_err!(txm.ready());
    assert_ok!(txm.start());
    assert_ok!(txm.ready());

    let key = &net.keys[0];
    for _ in 0..2 {
        assert_ok!(txm.enqueue(&key.id(), key.account_address(), total_supply()));
    }

    let mut empty = false;
    for _ in 0..60 {
        let (queued, unconfirmed) = txm.inflight_count();
        if queued == 0 && unconfirmed == 0 {
            empty = true;
            break;
        }
        sleep(Duration::from_millis(100)).await;
    }
    assert!(empty, "txm timed out while trying to confirm transactions");
    assert_eq!(net.chain.nonce_of(&key.account_address()), 2);
    assert_eq!(txm.metrics().counter(metrics::CONFIRMED), 2);

    assert_ok!(txm.close().await);
    assert_err!(txm.ready());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn same_sender_submits_in_enqueue_order() {
    let net = devnet(1);
    let txm = txm_for(&net, Duration::from_secs(10), Duration::from_millis(50));
    txm.start().unwrap();

    let key = &net.keys[0];
    for i in 0..20 {
        let call = total_supply().with_calldata(vec![format!("0x{:x}", i)]);
        txm.enqueue(&key.id(), key.account_address(), call).unwrap();
    }
    assert!(wait_until(|| txm.inflight_count() == (0, 0), Duration::from_secs(5)).await);

    let sent = net.chain.submissions_for(&key.account_address());
    assert_eq!(sent.len(), 20);
    for (i, tx) in sent.iter().enumerate() {
        assert_eq!(tx.payload.nonce, i as u64);
        assert_eq!(tx.payload.call.calldata, vec![format!("0x{:x}", i)]);
    }
    txm.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn slow_account_does_not_block_others() {
    let net = devnet(3);
    let slow = &net.keys[0];
    net.chain.set_submit_delay(slow.account_address(), Duration::from_millis(800));
    let txm = txm_for(&net, Duration::from_secs(10), Duration::from_millis(50));
    txm.start().unwrap();

    for key in &net.keys {
        for _ in 0..2 {
            txm.enqueue(&key.id(), key.account_address(), total_supply()).unwrap();
        }
    }

    let fast_done = wait_until(
        || net.keys[1..].iter().all(|k| net.chain.submissions_for(&k.account_address()).len() == 2),
        Duration::from_millis(500),
    )
    .await;
    assert!(fast_done, "fast accounts were held up by the slow one");
    assert!(net.chain.submissions_for(&slow.account_address()).is_empty());

    assert!(wait_until(|| txm.inflight_count() == (0, 0), Duration::from_secs(5)).await);
    assert_eq!(net.chain.submissions_for(&slow.account_address()).len(), 2);
    txm.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_enqueue_across_senders() {
    let net = devnet(8);
    let txm = txm_for(&net, Duration::from_secs(10), Duration::from_millis(50));
    txm.start().unwrap();

    let tasks = net.keys.iter().cloned().map(|key| {
        let txm = txm.clone();
        tokio::task::spawn_blocking(move || {
            for _ in 0..5 {
                txm.enqueue(&key.id(), key.account_address(), total_supply())?;
            }
            Ok::<_, TxmError>(())
        })
    });
    for res in join_all(tasks).await {
        assert_ok!(res.unwrap());
    }

    assert!(wait_until(|| txm.inflight_count() == (0, 0), Duration::from_secs(5)).await);
    for key in &net.keys {
        assert_eq!(net.chain.nonce_of(&key.account_address()), 5);
    }
    assert_eq!(txm.metrics().counter(metrics::ENQUEUED), 40);
    txm.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unresolved_transaction_times_out() {
    let net = devnet(1);
    net.chain.set_confirmation_latency(None);
    let txm = txm_for(&net, Duration::from_millis(400), Duration::from_millis(50));
    let mut events = txm.subscribe();
    txm.start().unwrap();

    let key = &net.keys[0];
    txm.enqueue(&key.id(), key.account_address(), total_supply()).unwrap();
    assert!(wait_until(|| txm.inflight_count() == (0, 1), Duration::from_secs(1)).await);

    assert!(wait_until(|| txm.inflight_count() == (0, 0), Duration::from_secs(2)).await);
    assert_eq!(txm.metrics().counter(metrics::TIMED_OUT), 1);
    // never re-queued or re-sent
    assert_eq!(net.chain.submissions().len(), 1);

    assert!(matches!(events.recv().await.unwrap(), TxEvent::Submitted { nonce: 0, .. }));
    assert!(matches!(events.recv().await.unwrap(), TxEvent::TimedOut { .. }));
    txm.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn requests_counted_once_until_terminal() {
    let net = devnet(2);
    net.chain.set_confirmation_latency(Some(Duration::from_millis(150)));
    for key in &net.keys {
        net.chain.set_submit_delay(key.account_address(), Duration::from_millis(30));
    }
    let txm = txm_for(&net, Duration::from_secs(10), Duration::from_millis(40));
    txm.start().unwrap();

    for key in &net.keys {
        for _ in 0..4 {
            txm.enqueue(&key.id(), key.account_address(), total_supply()).unwrap();
        }
    }

    let deadline = Instant::now() + Duration::from_secs(5);
    let remaining = loop {
        let (queued, unconfirmed) = txm.inflight_count();
        let total = queued + unconfirmed;
        assert!(total <= 8, "double counted: {} queued + {} unconfirmed", queued, unconfirmed);
        if total == 0 || Instant::now() >= deadline {
            break total;
        }
        sleep(Duration::from_millis(5)).await;
    };
    assert_eq!(remaining, 0);
    txm.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn worker_retires_and_reactivates() {
    let net = devnet(1);
    let txm = txm_for(&net, Duration::from_secs(10), Duration::from_millis(50));
    txm.start().unwrap();
    let key = &net.keys[0];

    txm.enqueue(&key.id(), key.account_address(), total_supply()).unwrap();
    assert!(wait_until(|| !txm.is_worker_active(&key.id()) && txm.inflight_count().0 == 0, Duration::from_secs(2)).await);

    txm.enqueue(&key.id(), key.account_address(), total_supply()).unwrap();
    assert!(wait_until(|| net.chain.nonce_of(&key.account_address()) == 2, Duration::from_secs(2)).await);
    assert!(wait_until(|| txm.inflight_count() == (0, 0), Duration::from_secs(2)).await);
    txm.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unreachable_account_is_dropped_after_budget() {
    let net = devnet(2);
    let (stuck, healthy) = (&net.keys[0], &net.keys[1]);
    net.chain.set_account_offline(stuck.account_address(), true);
    let txm = txm_for(&net, Duration::from_millis(600), Duration::from_millis(50));
    let mut events = txm.subscribe();
    txm.start().unwrap();

    txm.enqueue(&stuck.id(), stuck.account_address(), total_supply()).unwrap();
    txm.enqueue(&healthy.id(), healthy.account_address(), total_supply()).unwrap();

    assert!(wait_until(|| net.chain.nonce_of(&healthy.account_address()) == 1, Duration::from_millis(400)).await);
    assert_eq!(txm.inflight_count().0, 1, "stuck request still queued while retrying");

    assert!(wait_until(|| txm.inflight_count() == (0, 0), Duration::from_secs(3)).await);
    assert_eq!(txm.metrics().counter(metrics::DROPPED), 1);
    assert!(txm.metrics().counter(metrics::SUBMIT_RETRIES) >= 2);
    assert_eq!(net.chain.nonce_of(&stuck.account_address()), 0);

    let mut dropped = None;
    while let Ok(ev) = events.try_recv() {
        if let TxEvent::Dropped { sender, .. } = ev {
            dropped = Some(sender);
        }
    }
    assert_eq!(dropped, Some(stuck.id()));
    txm.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn rotated_out_key_drops_pending_request() {
    let net = devnet(1);
    let key = &net.keys[0];
    net.chain.set_submit_delay(key.account_address(), Duration::from_millis(300));
    let txm = txm_for(&net, Duration::from_secs(10), Duration::from_millis(50));
    txm.start().unwrap();

    txm.enqueue(&key.id(), key.account_address(), total_supply()).unwrap();
    txm.enqueue(&key.id(), key.account_address(), total_supply()).unwrap();
    sleep(Duration::from_millis(100)).await;
    net.keystore.remove(&key.id());

    assert!(wait_until(|| txm.inflight_count() == (0, 0), Duration::from_secs(3)).await);
    assert_eq!(net.chain.submissions().len(), 1);
    assert_eq!(txm.metrics().counter(metrics::DROPPED), 1);
    assert_eq!(
        txm.enqueue(&key.id(), key.account_address(), total_supply()),
        Err(TxmError::KeyNotFound(key.id()))
    );
    txm.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reverted_call_is_terminal_failure() {
    let net = devnet(1);
    net.chain.revert_entry_point("burn");
    let txm = txm_for(&net, Duration::from_secs(10), Duration::from_millis(50));
    txm.start().unwrap();
    let key = &net.keys[0];

    let burn = FunctionCall::new(Address::from_hex(ETH_TOKEN).unwrap(), "burn");
    txm.enqueue(&key.id(), key.account_address(), burn).unwrap();
    txm.enqueue(&key.id(), key.account_address(), total_supply()).unwrap();

    assert!(wait_until(|| txm.inflight_count() == (0, 0), Duration::from_secs(3)).await);
    assert_eq!(txm.metrics().counter(metrics::FAILED), 1);
    assert_eq!(txm.metrics().counter(metrics::CONFIRMED), 1);
    assert_eq!(net.chain.submissions().len(), 2);
    txm.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn accessor_outage_is_retried() {
    let net = devnet(1);
    let failures_left = Arc::new(AtomicUsize::new(3));
    let chain = net.chain.clone();
    let counter = failures_left.clone();
    let accessor: ClientAccessor = Arc::new(move || {
        let prev = counter.load(Ordering::SeqCst);
        if prev > 0 {
            counter.store(prev - 1, Ordering::SeqCst);
            return Err(ChainError::Unavailable("reconnecting".into()));
        }
        Ok(chain.clone() as Arc<dyn ChainClient>)
    });
    let txm = Txm::new(
        net.keystore.clone(),
        Arc::new(TxmConfig::new(Duration::from_secs(10), Duration::from_millis(50))),
        accessor,
    )
    .unwrap();
    txm.start().unwrap();

    let key = &net.keys[0];
    txm.enqueue(&key.id(), key.account_address(), total_supply()).unwrap();
    assert!(wait_until(|| txm.inflight_count() == (0, 0), Duration::from_secs(5)).await);
    assert_eq!(net.chain.nonce_of(&key.account_address()), 1);
    assert!(txm.metrics().counter(metrics::SUBMIT_RETRIES) >= 1);
    txm.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn close_finishes_current_submission_and_abandons_rest() {
    let net = devnet(1);
    let key = &net.keys[0];
    net.chain.set_submit_delay(key.account_address(), Duration::from_millis(300));
    net.chain.set_confirmation_latency(None);
    let txm = txm_for(&net, Duration::from_secs(10), Duration::from_millis(50));
    txm.start().unwrap();

    for _ in 0..3 {
        txm.enqueue(&key.id(), key.account_address(), total_supply()).unwrap();
    }
    sleep(Duration::from_millis(100)).await;

    let started = Instant::now();
    txm.close().await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(100));

    // the in-progress submission completed; nothing after it was sent
    assert_eq!(net.chain.submissions().len(), 1);
    assert_eq!(txm.inflight_count(), (2, 1));
    assert!(!txm.is_worker_active(&key.id()));
    assert_eq!(txm.enqueue(&key.id(), key.account_address(), total_supply()), Err(TxmError::ManagerNotStarted));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn hung_status_query_only_affects_its_account() {
    let net = devnet(2);
    let (stuck, healthy) = (&net.keys[0], &net.keys[1]);
    net.chain.stall_status(stuck.account_address(), true);
    let txm = txm_for(&net, Duration::from_millis(500), Duration::from_millis(50));
    txm.start().unwrap();

    txm.enqueue(&stuck.id(), stuck.account_address(), total_supply()).unwrap();
    txm.enqueue(&healthy.id(), healthy.account_address(), total_supply()).unwrap();

    assert!(wait_until(|| txm.metrics().counter(metrics::CONFIRMED) == 1, Duration::from_millis(400)).await);
    assert_eq!(txm.inflight_count(), (0, 1));

    assert!(wait_until(|| txm.inflight_count() == (0, 0), Duration::from_secs(2)).await);
    assert_eq!(txm.metrics().counter(metrics::TIMED_OUT), 1);

    let closed = tokio::time::timeout(Duration::from_secs(1), txm.close()).await;
    assert_ok!(closed.expect("close should not wait on a hung status query"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn hung_submit_is_dropped_after_budget() {
    let net = devnet(2);
    let (stuck, healthy) = (&net.keys[0], &net.keys[1]);
    net.chain.stall_submissions(stuck.account_address(), true);
    let txm = txm_for(&net, Duration::from_millis(300), Duration::from_millis(50));
    let mut events = txm.subscribe();
    txm.start().unwrap();

    txm.enqueue(&stuck.id(), stuck.account_address(), total_supply()).unwrap();
    txm.enqueue(&healthy.id(), healthy.account_address(), total_supply()).unwrap();

    assert!(wait_until(|| txm.inflight_count() == (0, 0), Duration::from_secs(2)).await);
    assert_eq!(txm.metrics().counter(metrics::DROPPED), 1);
    assert_eq!(txm.metrics().counter(metrics::CONFIRMED), 1);
    assert!(!txm.is_worker_active(&stuck.id()));

    let mut dropped = None;
    while let Ok(ev) = events.try_recv() {
        if let TxEvent::Dropped { sender, .. } = ev {
            dropped = Some(sender);
        }
    }
    assert_eq!(dropped, Some(stuck.id()));

    let closed = tokio::time::timeout(Duration::from_secs(1), txm.close()).await;
    assert_ok!(closed.expect("close should not wait on a hung submission"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn close_during_hung_submit_waits_at_most_the_budget() {
    let net = devnet(1);
    let key = &net.keys[0];
    net.chain.stall_submissions(key.account_address(), true);
    let txm = txm_for(&net, Duration::from_millis(600), Duration::from_millis(50));
    txm.start().unwrap();

    txm.enqueue(&key.id(), key.account_address(), total_supply()).unwrap();
    txm.enqueue(&key.id(), key.account_address(), total_supply()).unwrap();
    sleep(Duration::from_millis(100)).await;

    let closed = tokio::time::timeout(Duration::from_secs(2), txm.close()).await;
    assert_ok!(closed.expect("close should return once the attempt budget ends"));
    // the abandoned attempt was dropped; the request behind it was never sent
    assert_eq!(txm.inflight_count(), (1, 0));
    assert!(net.chain.submissions().is_empty());
}

//! Background sweeper tests.
//!
//! Run on a paused Tokio clock with [`SimEnv`], whose virtual wall clock moves
//! by exactly the duration each sweeper sleep covers.

use std::time::Duration;

use driftbox_core::{MessageStore, StoreConfig};
use driftbox_harness::SimEnv;
use driftbox_server::Sweeper;

const INTERVAL: Duration = Duration::from_secs(60);

fn store(env: &SimEnv) -> MessageStore<SimEnv> {
    MessageStore::new(env.clone(), StoreConfig::default())
}

#[tokio::test(start_paused = true)]
async fn seen_message_is_swept_without_traffic() {
    let env = SimEnv::with_seed(1);
    let store = store(&env);

    store.append("hello").unwrap();
    assert_eq!(store.drain_visible().messages.len(), 1);
    assert_eq!(store.len(), 1);

    let sweeper = Sweeper::spawn(store.clone(), env.clone(), INTERVAL);

    // 9 passes cover 9 minutes: still inside the seen TTL
    tokio::time::sleep(Duration::from_secs(9 * 60 + 30)).await;
    assert_eq!(store.len(), 1);

    // 10th pass lands exactly on the seen TTL
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(store.is_empty());

    let passes = sweeper.shutdown().await.unwrap();
    assert_eq!(passes, 10);
}

#[tokio::test(start_paused = true)]
async fn unseen_message_is_swept_after_six_hours() {
    let env = SimEnv::with_seed(2);
    let store = store(&env);
    store.append("nobody reads this").unwrap();

    let sweeper = Sweeper::spawn(store.clone(), env.clone(), INTERVAL);

    tokio::time::sleep(Duration::from_secs(6 * 60 * 60 - 30)).await;
    assert_eq!(store.len(), 1);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(store.is_empty());

    sweeper.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn fresh_messages_survive_sweeps() {
    let env = SimEnv::with_seed(3);
    let store = store(&env);
    let sweeper = Sweeper::spawn(store.clone(), env.clone(), INTERVAL);

    tokio::time::sleep(Duration::from_secs(150)).await;
    store.append("late arrival").unwrap();

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(store.len(), 1);
    assert_eq!(store.drain_visible().messages[0].text, "late arrival");

    sweeper.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn shutdown_before_first_pass() {
    let env = SimEnv::with_seed(4);
    let sweeper = Sweeper::spawn(store(&env), env, INTERVAL);

    let passes = sweeper.shutdown().await.unwrap();

    assert_eq!(passes, 0);
}

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TryRecvError;

use crate::test_utils::fan_rpm_path;
use crate::test_utils::platform_tree;
use crate::test_utils::port_speed_path;
use crate::AttributeDatabase;
use crate::DatabaseConfig;
use crate::InlineExecutor;
use crate::Value;

fn make_database() -> Arc<AttributeDatabase> {
    AttributeDatabase::make(platform_tree(), Arc::new(InlineExecutor), DatabaseConfig::default(), true)
        .expect("should succeed")
}

/// # Case: Scenario A from the delivery contract
///
/// ## Validation Criterias:
/// 1. A new subscriber receives a snapshot immediately, regardless of its
///    requested interval
#[tokio::test(start_paused = true)]
async fn test_new_subscriber_receives_immediate_snapshot() {
    let database = make_database();
    let query = database.make_query(vec![fan_rpm_path(0)]).expect("should succeed");

    let (tx, mut rx) = database.subscription_channel();
    query.subscribe(tx, Duration::from_secs(3600)).expect("should succeed");

    let snapshot = rx.recv().await.expect("should receive the initial snapshot");
    assert_eq!(snapshot.leaf(&fan_rpm_path(0)), Some(&Value::UInt(4200)));
}

#[tokio::test(start_paused = true)]
async fn test_value_change_is_delivered_on_next_deadline() {
    let database = make_database();
    let query = database.make_query(vec![fan_rpm_path(0)]).expect("should succeed");

    let (tx, mut rx) = database.subscription_channel();
    query.subscribe(tx, Duration::from_secs(1)).expect("should succeed");
    rx.recv().await.expect("should receive the initial snapshot");

    let mut values = HashMap::new();
    values.insert(fan_rpm_path(0), Value::UInt(5000));
    database.set(values).expect("should succeed");

    let snapshot = rx.recv().await.expect("should receive the changed snapshot");
    assert_eq!(snapshot.leaf(&fan_rpm_path(0)), Some(&Value::UInt(5000)));
}

/// An unchanging value produces no deliveries, however many polls elapse.
#[tokio::test(start_paused = true)]
async fn test_unchanged_value_is_not_redelivered() {
    let database = make_database();
    let query = database.make_query(vec![fan_rpm_path(0)]).expect("should succeed");

    let (tx, mut rx) = database.subscription_channel();
    query.subscribe(tx, Duration::from_secs(1)).expect("should succeed");
    rx.recv().await.expect("should receive the initial snapshot");

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}

/// A change to an unobserved subtree must not wake this query's subscriber.
#[tokio::test(start_paused = true)]
async fn test_unrelated_change_is_not_delivered() {
    let database = make_database();
    let query = database.make_query(vec![fan_rpm_path(0)]).expect("should succeed");

    let (tx, mut rx) = database.subscription_channel();
    query.subscribe(tx, Duration::from_secs(1)).expect("should succeed");
    rx.recv().await.expect("should receive the initial snapshot");

    let mut values = HashMap::new();
    values.insert(port_speed_path(0, 0), Value::UInt(200_000_000_000));
    database.set(values).expect("should succeed");

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}

/// # Case: out-of-band event short-circuits polling
///
/// ## Validation Criterias:
/// 1. With a one-hour polling interval, a configuration event still forces
///    an immediate delivery round
#[tokio::test(start_paused = true)]
async fn test_event_callback_forces_delivery() {
    let database = make_database();
    let query = database.make_query(vec![fan_rpm_path(0)]).expect("should succeed");

    let (tx, mut rx) = database.subscription_channel();
    query.subscribe(tx, Duration::from_secs(3600)).expect("should succeed");
    rx.recv().await.expect("should receive the initial snapshot");

    let mut values = HashMap::new();
    values.insert(fan_rpm_path(0), Value::UInt(0));
    database.set(values).expect("should succeed");

    database.event_callback().configuration_applied();

    let snapshot = rx.recv().await.expect("should receive the forced snapshot");
    assert_eq!(snapshot.leaf(&fan_rpm_path(0)), Some(&Value::UInt(0)));
}

/// The event callback is inert once the database is gone.
#[tokio::test(start_paused = true)]
async fn test_event_callback_outliving_database_is_harmless() {
    let database = make_database();
    let callback = database.event_callback();
    database.stop_scheduler().await.expect("should succeed");
    drop(database);

    callback.configuration_applied();
}

/// With no registered queries the loop parks on an infinite deadline; a stop
/// request must still wake it promptly.
#[tokio::test(start_paused = true)]
async fn test_stop_wakes_idle_scheduler() {
    let database = make_database();
    database.stop_scheduler().await.expect("should succeed");
    assert!(!database.scheduler_is_running());
}

/// Two subscribers of one query both receive every delivery round.
#[tokio::test(start_paused = true)]
async fn test_fanout_to_multiple_subscribers() {
    let database = make_database();
    let query = database.make_query(vec![fan_rpm_path(0)]).expect("should succeed");

    let (tx1, mut rx1) = database.subscription_channel();
    let (tx2, mut rx2) = database.subscription_channel();
    query.subscribe(tx1, Duration::from_secs(1)).expect("should succeed");
    query.subscribe(tx2, Duration::from_secs(5)).expect("should succeed");

    // Both receive the forced initial snapshot.
    rx1.recv().await.expect("should receive");
    rx2.recv().await.expect("should receive");

    let mut values = HashMap::new();
    values.insert(fan_rpm_path(0), Value::UInt(6000));
    database.set(values).expect("should succeed");

    // Coalesced to the shorter cadence: both see the change.
    let s1 = rx1.recv().await.expect("should receive");
    let s2 = rx2.recv().await.expect("should receive");
    assert_eq!(s1.leaf(&fan_rpm_path(0)), Some(&Value::UInt(6000)));
    assert_eq!(s2, s1);
}

/// A query whose handle is dropped is never observed by the loop again.
#[tokio::test(start_paused = true)]
async fn test_dropped_query_stops_polling() {
    let database = make_database();
    let query = database.make_query(vec![fan_rpm_path(0)]).expect("should succeed");

    let (tx, mut rx) = database.subscription_channel();
    query.subscribe(tx, Duration::from_secs(1)).expect("should succeed");
    rx.recv().await.expect("should receive the initial snapshot");

    drop(query);

    let mut values = HashMap::new();
    values.insert(fan_rpm_path(0), Value::UInt(7000));
    database.set(values).expect("should succeed");

    tokio::time::sleep(Duration::from_secs(3)).await;
    // The channel is closed because the handle owned the query.
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected)));
}

//! Runs against a real Postgres when `TEST_DATABASE_URL` is set; skipped otherwise.

mod common;

use std::sync::Arc;

use common::{assert_replay_consistent, member, member_with_balance};
use messmate::accounts::{AccountStore, NewAccount};
use messmate::config::DbConfig;
use messmate::db::StoreHandle;
use messmate::ledger::{EntryKind, LedgerError, LedgerService, LedgerStore};
use messmate::storage::PgStore;
use uuid::Uuid;

async fn pg_store() -> Option<Arc<PgStore>> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return None;
    };
    let handle = StoreHandle::new(&DbConfig {
        url,
        max_connections: 16,
        retry_base_ms: 100,
        retry_max_ms: 500,
        connect_timeout_ms: 5_000,
        retry_max_attempts: Some(3),
    })
    .expect("database url");
    handle.wait_ready().await.expect("database reachable");
    handle.migrate().await.expect("migrations");
    Some(Arc::new(PgStore::new(handle.pool().clone())))
}

/// Unique per test run, so tests can share one database.
fn tag(name: &str) -> String {
    format!("{name}-{}", Uuid::new_v4().simple())
}

#[tokio::test]
async fn duplicate_insert_returns_none() {
    let Some(store) = pg_store().await else { return };
    let t = tag("dup");
    let first = member(store.as_ref(), &t).await;

    let clash = NewAccount::member(
        "Someone Else".into(),
        first.email.clone(),
        "5550101".into(),
        tag("other-number"),
        "not-a-real-hash".into(),
    );
    assert!(store.insert(clash).await.unwrap().is_none());

    let clash = NewAccount::member(
        "Someone Else".into(),
        format!("{}@campus.edu", tag("other-email")),
        "5550101".into(),
        first.member_number.clone(),
        "not-a-real-hash".into(),
    );
    assert!(store.insert(clash).await.unwrap().is_none());
}

#[tokio::test]
async fn overdraw_is_refused_and_rolled_back() {
    let Some(store) = pg_store().await else { return };
    let ledger = LedgerService::new(store.clone());
    let acc = member_with_balance(store.as_ref(), &tag("low"), Some(2)).await;

    let err = ledger.redeem(&acc.identity_token, 3, None).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientBalance {
            balance: 2,
            required: 3
        }
    ));
    assert_eq!(store.find_by_id(acc.id).await.unwrap().unwrap().balance, 2);
    assert!(store.list_by_account(acc.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn overflowing_delta_is_refused_not_raised() {
    let Some(store) = pg_store().await else { return };
    let acc = member(store.as_ref(), &tag("ceiling")).await;

    assert!(store.atomic_apply_delta(acc.id, i64::MAX).await.unwrap().is_none());
    assert!(store.atomic_apply_delta(acc.id, i64::MIN).await.unwrap().is_none());
    assert_eq!(store.find_by_id(acc.id).await.unwrap().unwrap().balance, 10);

    let ledger = LedgerService::new(store.clone());
    let err = ledger.adjust(acc.id, i64::MAX, None).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidArgument(_)));
}

#[tokio::test]
async fn history_is_newest_first_and_replays() {
    let Some(store) = pg_store().await else { return };
    let ledger = LedgerService::new(store.clone());
    let acc = member(store.as_ref(), &tag("order")).await;

    ledger.redeem(&acc.identity_token, 1, Some("breakfast")).await.unwrap();
    ledger.adjust(acc.id, 4, Some("top-up")).await.unwrap();
    ledger.redeem(&acc.identity_token, 2, Some("lunch")).await.unwrap();
    ledger.adjust(acc.id, -3, None).await.unwrap();

    let history = ledger.history(acc.id).await.unwrap();
    let amounts: Vec<_> = history.iter().map(|e| e.amount).collect();
    assert_eq!(amounts, [-3, -2, 4, -1]);
    assert_eq!(history[1].kind, EntryKind::Deduct);
    assert_eq!(history[2].kind, EntryKind::Refill);
    assert_eq!(history[0].balance_after, 8);
    assert_replay_consistent(&history);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_redeems_never_overdraw() {
    let Some(store) = pg_store().await else { return };
    let ledger = LedgerService::new(store.clone());
    let n: i64 = 12;
    let acc = member_with_balance(store.as_ref(), &tag("race"), Some(n)).await;

    let mut tasks = Vec::new();
    for _ in 0..n + 4 {
        let ledger = ledger.clone();
        let token = acc.identity_token.clone();
        tasks.push(tokio::spawn(async move { ledger.redeem(&token, 1, None).await }));
    }
    let mut ok = 0;
    for task in tasks {
        match task.await.expect("task panicked") {
            Ok(_) => ok += 1,
            Err(LedgerError::InsufficientBalance { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(ok, n);
    assert_eq!(store.find_by_id(acc.id).await.unwrap().unwrap().balance, 0);
    let history = ledger.history(acc.id).await.unwrap();
    assert_eq!(history.len() as i64, n);
    assert_replay_consistent(&history);
}

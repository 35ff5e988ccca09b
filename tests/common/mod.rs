// Helpers are shared by several test binaries, each using a subset.
#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use messmate::accounts::{Account, AccountStore, NewAccount};
use messmate::ledger::{CreditStore, LedgerEntry, LedgerService, LedgerStore, NewLedgerEntry};
use messmate::storage::MemoryStore;
use uuid::Uuid;

/// Ledger service over a fresh in-memory store.
pub fn memory_ledger() -> (LedgerService, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (LedgerService::new(store.clone()), store)
}

pub async fn member<S: AccountStore + ?Sized>(store: &S, tag: &str) -> Account {
    member_with_balance(store, tag, None).await
}

pub async fn member_with_balance<S: AccountStore + ?Sized>(
    store: &S,
    tag: &str,
    balance: Option<i64>,
) -> Account {
    let mut new = NewAccount::member(
        format!("Member {tag}"),
        format!("{tag}@campus.edu"),
        "5550100".into(),
        format!("ROLL-{tag}"),
        "not-a-real-hash".into(),
    );
    if let Some(balance) = balance {
        new.balance = balance;
    }
    store
        .insert(new)
        .await
        .expect("insert account")
        .expect("unique account")
}

/// Asserts each entry's `balance_after` equals the running sum of amounts, oldest first.
pub fn assert_replay_consistent(history_newest_first: &[LedgerEntry]) {
    let mut oldest_first = history_newest_first.to_vec();
    oldest_first.reverse();
    let Some(first) = oldest_first.first() else {
        return;
    };
    let mut running = first.balance_after - first.amount;
    for entry in &oldest_first {
        running += entry.amount;
        assert_eq!(entry.balance_after, running, "entry {} breaks the running sum", entry.id);
        assert!(entry.balance_after >= 0);
    }
}

/// Store that uses the write-then-append path and can be told to fail appends.
pub struct TwoStepStore {
    pub inner: MemoryStore,
    pub fail_appends: bool,
}

impl TwoStepStore {
    pub fn new(fail_appends: bool) -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_appends,
        }
    }
}

#[async_trait]
impl AccountStore for TwoStepStore {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Account>> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_identity_token(&self, token: &str) -> anyhow::Result<Option<Account>> {
        self.inner.find_by_identity_token(token).await
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<Account>> {
        self.inner.find_by_email(email).await
    }

    async fn find_by_email_or_member_number(
        &self,
        email: &str,
        member_number: &str,
    ) -> anyhow::Result<Option<Account>> {
        self.inner.find_by_email_or_member_number(email, member_number).await
    }

    async fn find_any_admin(&self) -> anyhow::Result<Option<Account>> {
        self.inner.find_any_admin().await
    }

    async fn list(&self) -> anyhow::Result<Vec<Account>> {
        self.inner.list().await
    }

    async fn insert(&self, account: NewAccount) -> anyhow::Result<Option<Account>> {
        self.inner.insert(account).await
    }

    async fn save(&self, account: &Account) -> anyhow::Result<()> {
        self.inner.save(account).await
    }

    async fn atomic_decrement(&self, id: Uuid, amount: i64) -> anyhow::Result<Option<Account>> {
        self.inner.atomic_decrement(id, amount).await
    }

    async fn atomic_apply_delta(&self, id: Uuid, delta: i64) -> anyhow::Result<Option<Account>> {
        self.inner.atomic_apply_delta(id, delta).await
    }
}

#[async_trait]
impl LedgerStore for TwoStepStore {
    async fn append(&self, entry: NewLedgerEntry) -> anyhow::Result<LedgerEntry> {
        if self.fail_appends {
            anyhow::bail!("ledger collection unavailable");
        }
        self.inner.append(entry).await
    }

    async fn list_by_account(&self, account_id: Uuid) -> anyhow::Result<Vec<LedgerEntry>> {
        self.inner.list_by_account(account_id).await
    }
}

#[async_trait]
impl CreditStore for TwoStepStore {}

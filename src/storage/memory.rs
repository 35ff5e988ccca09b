use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::accounts::{Account, AccountStore, NewAccount, Role};
use crate::ledger::{Applied, CreditStore, EntryDraft, LedgerEntry, LedgerStore, Mutation, NewLedgerEntry};

#[derive(Default)]
struct Inner {
    accounts: HashMap<Uuid, Account>,
    /// Insertion order is mutation order.
    entries: Vec<LedgerEntry>,
}

impl Inner {
    fn unique_clash(&self, account: &NewAccount) -> bool {
        self.accounts.values().any(|a| {
            a.email == account.email
                || a.member_number == account.member_number
                || a.identity_token == account.identity_token
        })
    }

    fn apply(&mut self, id: Uuid, delta: i64) -> Option<Account> {
        let account = self.accounts.get_mut(&id)?;
        let next = account.balance.checked_add(delta)?;
        if next < 0 {
            return None;
        }
        account.balance = next;
        Some(account.clone())
    }

    fn push_entry(&mut self, entry: NewLedgerEntry) -> LedgerEntry {
        // Keep timestamps monotonic so created_at ordering matches insertion order.
        let now = OffsetDateTime::now_utc();
        let created_at = match self.entries.last() {
            Some(last) if last.created_at > now => last.created_at,
            _ => now,
        };
        let stored = LedgerEntry {
            id: Uuid::new_v4(),
            account_id: entry.account_id,
            amount: entry.amount,
            kind: entry.kind,
            category: entry.category,
            note: entry.note,
            balance_after: entry.balance_after,
            created_at,
        };
        self.entries.push(stored.clone());
        stored
    }
}

/// Process-local store for development runs without a database, and for tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Account>> {
        Ok(self.lock()?.accounts.get(&id).cloned())
    }

    async fn find_by_identity_token(&self, token: &str) -> anyhow::Result<Option<Account>> {
        Ok(self
            .lock()?
            .accounts
            .values()
            .find(|a| a.identity_token == token)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<Account>> {
        Ok(self
            .lock()?
            .accounts
            .values()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn find_by_email_or_member_number(
        &self,
        email: &str,
        member_number: &str,
    ) -> anyhow::Result<Option<Account>> {
        Ok(self
            .lock()?
            .accounts
            .values()
            .find(|a| a.email == email || a.member_number == member_number)
            .cloned())
    }

    async fn find_any_admin(&self) -> anyhow::Result<Option<Account>> {
        Ok(self
            .lock()?
            .accounts
            .values()
            .find(|a| a.role == Role::Admin)
            .cloned())
    }

    async fn list(&self) -> anyhow::Result<Vec<Account>> {
        let mut all: Vec<Account> = self.lock()?.accounts.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn insert(&self, account: NewAccount) -> anyhow::Result<Option<Account>> {
        let mut inner = self.lock()?;
        if inner.unique_clash(&account) {
            return Ok(None);
        }
        let stored = Account {
            id: Uuid::new_v4(),
            name: account.name,
            email: account.email,
            phone: account.phone,
            member_number: account.member_number,
            password_hash: account.password_hash,
            role: account.role,
            balance: account.balance,
            identity_token: account.identity_token,
            avatar_url: None,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.accounts.insert(stored.id, stored.clone());
        Ok(Some(stored))
    }

    async fn save(&self, account: &Account) -> anyhow::Result<()> {
        let mut inner = self.lock()?;
        let existing = inner
            .accounts
            .get_mut(&account.id)
            .ok_or_else(|| anyhow::anyhow!("account {} does not exist", account.id))?;
        existing.name = account.name.clone();
        existing.phone = account.phone.clone();
        existing.role = account.role;
        existing.avatar_url = account.avatar_url.clone();
        Ok(())
    }

    async fn atomic_decrement(&self, id: Uuid, amount: i64) -> anyhow::Result<Option<Account>> {
        Ok(self.lock()?.apply(id, -amount))
    }

    async fn atomic_apply_delta(&self, id: Uuid, delta: i64) -> anyhow::Result<Option<Account>> {
        Ok(self.lock()?.apply(id, delta))
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn append(&self, entry: NewLedgerEntry) -> anyhow::Result<LedgerEntry> {
        Ok(self.lock()?.push_entry(entry))
    }

    async fn list_by_account(&self, account_id: Uuid) -> anyhow::Result<Vec<LedgerEntry>> {
        Ok(self
            .lock()?
            .entries
            .iter()
            .rev()
            .filter(|e| e.account_id == account_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CreditStore for MemoryStore {
    async fn apply_and_append(
        &self,
        account_id: Uuid,
        mutation: Mutation,
        draft: EntryDraft,
    ) -> anyhow::Result<Option<Applied>> {
        let mut inner = self.lock()?;
        let delta = mutation.delta();
        let Some(account) = inner.apply(account_id, delta) else {
            return Ok(None);
        };
        let entry = inner.push_entry(draft.into_entry(account_id, delta, account.balance));
        Ok(Some(Applied {
            account,
            entry: Some(entry),
        }))
    }
}

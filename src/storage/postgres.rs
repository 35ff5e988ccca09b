use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::repo_types::{into_account, AccountRow, EntryRow};
use crate::accounts::{Account, AccountStore, NewAccount};
use crate::ledger::{Applied, CreditStore, EntryDraft, LedgerEntry, LedgerStore, Mutation, NewLedgerEntry};

const ACCOUNT_COLUMNS: &str = "id, name, email, phone, member_number, password_hash, role, \
     balance, identity_token, avatar_url, created_at";

const ENTRY_COLUMNS: &str = "id, account_id, amount, kind, category, note, balance_after, created_at";

/// Postgres-backed account and ledger store.
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn find_one(&self, filter: &str, value: &str) -> anyhow::Result<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE {filter}");
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await
            .with_context(|| format!("fetch account by {filter}"))?;
        into_account(row)
    }

    /// Conditional balance update; the row lock it takes is held until `tx` ends.
    /// The bound is checked in numeric so an overflowing delta is refused, not raised.
    async fn apply_delta_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        delta: i64,
    ) -> anyhow::Result<Option<Account>> {
        let sql = format!(
            "UPDATE accounts SET balance = balance + $2, updated_at = now() \
             WHERE id = $1 AND balance::numeric + $2 BETWEEN 0 AND 9223372036854775807 \
             RETURNING {ACCOUNT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(id)
            .bind(delta)
            .fetch_optional(&mut **tx)
            .await
            .context("conditional balance update")?;
        into_account(row)
    }

    async fn insert_entry_tx(
        tx: &mut Transaction<'_, Postgres>,
        entry: NewLedgerEntry,
    ) -> anyhow::Result<LedgerEntry> {
        // clock_timestamp(), not now(): the stamp must follow lock acquisition, not tx start.
        let sql = format!(
            "INSERT INTO ledger_entries (id, account_id, amount, kind, category, note, balance_after, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, clock_timestamp()) \
             RETURNING {ENTRY_COLUMNS}"
        );
        let row = sqlx::query_as::<_, EntryRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(entry.account_id)
            .bind(entry.amount)
            .bind(entry.kind.as_str())
            .bind(entry.category)
            .bind(entry.note)
            .bind(entry.balance_after)
            .fetch_one(&mut **tx)
            .await
            .context("insert ledger entry")?;
        LedgerEntry::try_from(row)
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl AccountStore for PgStore {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("fetch account by id")?;
        into_account(row)
    }

    async fn find_by_identity_token(&self, token: &str) -> anyhow::Result<Option<Account>> {
        self.find_one("identity_token = $1", token).await
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<Account>> {
        self.find_one("email = $1", email).await
    }

    async fn find_by_email_or_member_number(
        &self,
        email: &str,
        member_number: &str,
    ) -> anyhow::Result<Option<Account>> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1 OR member_number = $2 LIMIT 1"
        );
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(email)
            .bind(member_number)
            .fetch_optional(&self.db)
            .await
            .context("fetch account by email or member number")?;
        into_account(row)
    }

    async fn find_any_admin(&self) -> anyhow::Result<Option<Account>> {
        self.find_one("role = $1 ORDER BY created_at LIMIT 1", "admin").await
    }

    async fn list(&self) -> anyhow::Result<Vec<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY name ASC");
        let rows = sqlx::query_as::<_, AccountRow>(&sql)
            .fetch_all(&self.db)
            .await
            .context("list accounts")?;
        rows.into_iter().map(Account::try_from).collect()
    }

    async fn insert(&self, account: NewAccount) -> anyhow::Result<Option<Account>> {
        let sql = format!(
            "INSERT INTO accounts (id, name, email, phone, member_number, password_hash, role, balance, identity_token) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {ACCOUNT_COLUMNS}"
        );
        let result = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&account.name)
            .bind(&account.email)
            .bind(&account.phone)
            .bind(&account.member_number)
            .bind(&account.password_hash)
            .bind(account.role.as_str())
            .bind(account.balance)
            .bind(&account.identity_token)
            .fetch_one(&self.db)
            .await;

        match result {
            Ok(row) => Ok(Some(Account::try_from(row)?)),
            Err(e) if is_unique_violation(&e) => Ok(None),
            Err(e) => Err(anyhow::Error::new(e).context("insert account")),
        }
    }

    async fn save(&self, account: &Account) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE accounts
               SET name = $2, phone = $3, role = $4, avatar_url = $5, updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(account.id)
        .bind(&account.name)
        .bind(&account.phone)
        .bind(account.role.as_str())
        .bind(&account.avatar_url)
        .execute(&self.db)
        .await
        .context("save account")?;
        Ok(())
    }

    async fn atomic_decrement(&self, id: Uuid, amount: i64) -> anyhow::Result<Option<Account>> {
        let sql = format!(
            "UPDATE accounts SET balance = balance - $2, updated_at = now() \
             WHERE id = $1 AND balance >= $2 \
             RETURNING {ACCOUNT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(id)
            .bind(amount)
            .fetch_optional(&self.db)
            .await
            .context("conditional decrement")?;
        into_account(row)
    }

    async fn atomic_apply_delta(&self, id: Uuid, delta: i64) -> anyhow::Result<Option<Account>> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        let account = Self::apply_delta_tx(&mut tx, id, delta).await?;
        tx.commit().await.context("commit tx")?;
        Ok(account)
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn append(&self, entry: NewLedgerEntry) -> anyhow::Result<LedgerEntry> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        let stored = Self::insert_entry_tx(&mut tx, entry).await?;
        tx.commit().await.context("commit tx")?;
        Ok(stored)
    }

    async fn list_by_account(&self, account_id: Uuid) -> anyhow::Result<Vec<LedgerEntry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries \
             WHERE account_id = $1 \
             ORDER BY created_at DESC, seq DESC"
        );
        let rows = sqlx::query_as::<_, EntryRow>(&sql)
            .bind(account_id)
            .fetch_all(&self.db)
            .await
            .context("list ledger entries")?;
        rows.into_iter().map(LedgerEntry::try_from).collect()
    }
}

#[async_trait]
impl CreditStore for PgStore {
    async fn apply_and_append(
        &self,
        account_id: Uuid,
        mutation: Mutation,
        draft: EntryDraft,
    ) -> anyhow::Result<Option<Applied>> {
        let delta = mutation.delta();
        let mut tx = self.db.begin().await.context("begin tx")?;

        let Some(account) = Self::apply_delta_tx(&mut tx, account_id, delta).await? else {
            tx.rollback().await.context("rollback tx")?;
            return Ok(None);
        };
        let entry =
            Self::insert_entry_tx(&mut tx, draft.into_entry(account_id, delta, account.balance))
                .await?;

        tx.commit().await.context("commit tx")?;
        Ok(Some(Applied {
            account,
            entry: Some(entry),
        }))
    }
}

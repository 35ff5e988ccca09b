use async_trait::async_trait;
use uuid::Uuid;

use super::{Account, NewAccount};

/// Persistence for accounts.
///
/// Balance changes go exclusively through [`AccountStore::atomic_decrement`] and
/// [`AccountStore::atomic_apply_delta`]; each must be a single conditional update
/// so concurrent callers can never both spend the same credit.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Account>>;

    async fn find_by_identity_token(&self, token: &str) -> anyhow::Result<Option<Account>>;

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<Account>>;

    async fn find_by_email_or_member_number(
        &self,
        email: &str,
        member_number: &str,
    ) -> anyhow::Result<Option<Account>>;

    async fn find_any_admin(&self) -> anyhow::Result<Option<Account>>;

    /// All accounts ordered by name.
    async fn list(&self) -> anyhow::Result<Vec<Account>>;

    /// Returns `None` when the email, member number or identity token is taken.
    async fn insert(&self, account: NewAccount) -> anyhow::Result<Option<Account>>;

    /// Persists profile and role fields. The balance is left untouched.
    async fn save(&self, account: &Account) -> anyhow::Result<()>;

    /// Subtracts `amount` if and only if the balance covers it.
    async fn atomic_decrement(&self, id: Uuid, amount: i64) -> anyhow::Result<Option<Account>>;

    /// Adds `delta` (either sign) if and only if the result stays within `0..=i64::MAX`.
    async fn atomic_apply_delta(&self, id: Uuid, delta: i64) -> anyhow::Result<Option<Account>>;
}

use async_trait::async_trait;
use tracing::error;
use uuid::Uuid;

use super::model::{EntryDraft, LedgerEntry, Mutation, NewLedgerEntry};
use crate::accounts::{Account, AccountStore};

/// Append-only log of balance mutations.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn append(&self, entry: NewLedgerEntry) -> anyhow::Result<LedgerEntry>;

    /// Entries for one account, newest first.
    async fn list_by_account(&self, account_id: Uuid) -> anyhow::Result<Vec<LedgerEntry>>;
}

/// Result of a committed balance mutation.
#[derive(Debug, Clone)]
pub struct Applied {
    pub account: Account,
    /// `None` when the balance write landed but the entry could not be appended.
    pub entry: Option<LedgerEntry>,
}

/// Everything the ledger service needs from storage.
#[async_trait]
pub trait CreditStore: AccountStore + LedgerStore {
    /// Applies `mutation` and records it. `Ok(None)` means the balance would have
    /// gone negative and nothing was written.
    ///
    /// The provided body writes the guarded balance first and appends afterwards.
    /// An append failure is logged for reconciliation and does not fail the call,
    /// since the balance has already moved. Concurrent calls on one account may
    /// also append in a different order than their balance writes landed, so
    /// entry order is only guaranteed to replay to the balance by overrides.
    /// Stores with transactions override this to commit both writes together.
    async fn apply_and_append(
        &self,
        account_id: Uuid,
        mutation: Mutation,
        draft: EntryDraft,
    ) -> anyhow::Result<Option<Applied>> {
        let updated = match mutation {
            Mutation::Deduct(amount) => self.atomic_decrement(account_id, amount).await?,
            Mutation::Apply(delta) => self.atomic_apply_delta(account_id, delta).await?,
        };
        let Some(account) = updated else {
            return Ok(None);
        };

        let delta = mutation.delta();
        let new_entry = draft.into_entry(account_id, delta, account.balance);
        match self.append(new_entry).await {
            Ok(entry) => Ok(Some(Applied {
                account,
                entry: Some(entry),
            })),
            Err(e) => {
                error!(
                    error = %e,
                    %account_id,
                    delta,
                    balance_after = account.balance,
                    reconcile = true,
                    "ledger append failed after balance write"
                );
                Ok(Some(Applied {
                    account,
                    entry: None,
                }))
            }
        }
    }
}

use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::error::LedgerError;
use super::model::{EntryDraft, EntryKind, LedgerEntry, Mutation};
use super::store::CreditStore;

/// Default number of credits a scan consumes.
pub const DEFAULT_REDEEM_AMOUNT: i64 = 1;

/// Outcome of a scan-and-deduct.
#[derive(Debug, Clone)]
pub struct Redemption {
    pub account_id: Uuid,
    pub account_name: String,
    pub new_balance: i64,
    pub entry: Option<LedgerEntry>,
}

/// Outcome of an administrative adjustment.
#[derive(Debug, Clone)]
pub struct Adjustment {
    pub account_id: Uuid,
    pub new_balance: i64,
    pub entry: Option<LedgerEntry>,
}

/// Applies credit mutations and keeps the per-account ledger in step with the balance.
#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn CreditStore>,
}

impl LedgerService {
    pub fn new(store: Arc<dyn CreditStore>) -> Self {
        Self { store }
    }

    /// Deduct `amount` credits from the account whose QR identity is `identity_token`.
    #[instrument(skip(self, identity_token))]
    pub async fn redeem(
        &self,
        identity_token: &str,
        amount: i64,
        category: Option<&str>,
    ) -> Result<Redemption, LedgerError> {
        let identity_token = identity_token.trim();
        if identity_token.is_empty() {
            return Err(LedgerError::InvalidArgument("QR data is required".into()));
        }

        let account = self
            .store
            .find_by_identity_token(identity_token)
            .await?
            .ok_or_else(|| {
                LedgerError::NotFound("User not found for supplied QR code".into())
            })?;

        if amount <= 0 {
            return Err(LedgerError::InvalidArgument(
                "Amount must be greater than zero".into(),
            ));
        }

        let draft = EntryDraft {
            kind: EntryKind::Deduct,
            category: normalize_category(category),
            note: None,
        };
        let applied = match self
            .store
            .apply_and_append(account.id, Mutation::Deduct(amount), draft)
            .await?
        {
            Some(applied) => applied,
            None => return Err(self.refusal(account.id, -amount).await),
        };

        info!(
            account_id = %applied.account.id,
            amount,
            new_balance = applied.account.balance,
            "credits redeemed"
        );
        Ok(Redemption {
            account_id: applied.account.id,
            account_name: applied.account.name,
            new_balance: applied.account.balance,
            entry: applied.entry,
        })
    }

    /// Apply a signed correction to an account's balance.
    ///
    /// Zero is rejected: it would only add a no-op line to the ledger.
    #[instrument(skip(self, note))]
    pub async fn adjust(
        &self,
        account_id: Uuid,
        amount: i64,
        note: Option<&str>,
    ) -> Result<Adjustment, LedgerError> {
        let account = self
            .store
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound("User not found".into()))?;

        if amount == 0 {
            return Err(LedgerError::InvalidArgument(
                "Amount must be non-zero".into(),
            ));
        }

        if account.balance.checked_add(amount).is_none() {
            return Err(out_of_range());
        }

        let draft = EntryDraft {
            kind: EntryKind::for_amount(amount),
            category: None,
            note: normalize_note(note),
        };
        let applied = match self
            .store
            .apply_and_append(account.id, Mutation::Apply(amount), draft)
            .await?
        {
            Some(applied) => applied,
            None => return Err(self.refusal(account_id, amount).await),
        };

        info!(
            %account_id,
            amount,
            new_balance = applied.account.balance,
            "credits adjusted"
        );
        Ok(Adjustment {
            account_id,
            new_balance: applied.account.balance,
            entry: applied.entry,
        })
    }

    /// Classifies a refused balance write against the balance as it stands now,
    /// since the pre-read copy may be stale under concurrent mutations.
    async fn refusal(&self, account_id: Uuid, delta: i64) -> LedgerError {
        let account = match self.store.find_by_id(account_id).await {
            Ok(Some(account)) => account,
            Ok(None) => return LedgerError::NotFound("User not found".into()),
            Err(e) => return LedgerError::StoreUnavailable(e),
        };
        if account.balance.checked_add(delta).is_none() {
            return out_of_range();
        }
        warn!(%account_id, balance = account.balance, delta, "insufficient credits");
        LedgerError::InsufficientBalance {
            balance: account.balance,
            required: delta.unsigned_abs(),
        }
    }

    /// Every entry for the account, most recent first.
    pub async fn history(&self, account_id: Uuid) -> Result<Vec<LedgerEntry>, LedgerError> {
        if self.store.find_by_id(account_id).await?.is_none() {
            return Err(LedgerError::NotFound("User not found".into()));
        }
        Ok(self.store.list_by_account(account_id).await?)
    }
}

fn out_of_range() -> LedgerError {
    LedgerError::InvalidArgument("Amount is out of range".into())
}

fn normalize_category(category: Option<&str>) -> Option<String> {
    category
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty())
}

fn normalize_note(note: Option<&str>) -> Option<String> {
    note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

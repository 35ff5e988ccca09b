use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::accounts::{Account, Role};
use crate::ledger::{EntryKind, LedgerEntry};

/// `accounts` row as stored.
#[derive(Debug, FromRow)]
pub struct AccountRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub member_number: String,
    pub password_hash: String,
    pub role: String,
    pub balance: i64,
    pub identity_token: String,
    pub avatar_url: Option<String>,
    pub created_at: OffsetDateTime,
}

impl TryFrom<AccountRow> for Account {
    type Error = anyhow::Error;

    fn try_from(r: AccountRow) -> Result<Self, Self::Error> {
        let role = Role::parse(&r.role)
            .ok_or_else(|| anyhow::anyhow!("invalid role {:?} on account {}", r.role, r.id))?;
        Ok(Self {
            id: r.id,
            name: r.name,
            email: r.email,
            phone: r.phone,
            member_number: r.member_number,
            password_hash: r.password_hash,
            role,
            balance: r.balance,
            identity_token: r.identity_token,
            avatar_url: r.avatar_url,
            created_at: r.created_at,
        })
    }
}

/// `ledger_entries` row as stored.
#[derive(Debug, FromRow)]
pub struct EntryRow {
    pub id: Uuid,
    pub account_id: Uuid,
    pub amount: i64,
    pub kind: String,
    pub category: Option<String>,
    pub note: Option<String>,
    pub balance_after: i64,
    pub created_at: OffsetDateTime,
}

impl TryFrom<EntryRow> for LedgerEntry {
    type Error = anyhow::Error;

    fn try_from(r: EntryRow) -> Result<Self, Self::Error> {
        let kind = EntryKind::parse(&r.kind)
            .ok_or_else(|| anyhow::anyhow!("invalid entry kind {:?} on entry {}", r.kind, r.id))?;
        Ok(Self {
            id: r.id,
            account_id: r.account_id,
            amount: r.amount,
            kind,
            category: r.category,
            note: r.note,
            balance_after: r.balance_after,
            created_at: r.created_at,
        })
    }
}

pub(crate) fn into_account(row: Option<AccountRow>) -> anyhow::Result<Option<Account>> {
    row.map(Account::try_from).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(role: &str) -> AccountRow {
        AccountRow {
            id: Uuid::new_v4(),
            name: "Asha".into(),
            email: "asha@campus.edu".into(),
            phone: "5550100".into(),
            member_number: "CS-042".into(),
            password_hash: "h".into(),
            role: role.into(),
            balance: 10,
            identity_token: "tok".into(),
            avatar_url: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn account_row_converts() {
        let acc = Account::try_from(row("admin")).unwrap();
        assert_eq!(acc.role, Role::Admin);
        assert_eq!(acc.balance, 10);
    }

    #[test]
    fn unknown_role_is_an_error() {
        assert!(Account::try_from(row("superuser")).is_err());
    }

    #[test]
    fn entry_row_rejects_unknown_kind() {
        let r = EntryRow {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            amount: 1,
            kind: "gift".into(),
            category: None,
            note: None,
            balance_after: 1,
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        assert!(LedgerEntry::try_from(r).is_err());
    }
}

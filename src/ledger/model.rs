use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Deduct,
    Refill,
}

impl EntryKind {
    /// Direction implied by a signed amount; zero counts as a refill.
    pub fn for_amount(amount: i64) -> Self {
        if amount >= 0 {
            EntryKind::Refill
        } else {
            EntryKind::Deduct
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Deduct => "deduct",
            EntryKind::Refill => "refill",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "deduct" => Some(EntryKind::Deduct),
            "refill" => Some(EntryKind::Refill),
            _ => None,
        }
    }
}

/// Immutable record of one balance mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: Uuid,
    pub account_id: Uuid,
    pub amount: i64,
    pub kind: EntryKind,
    pub category: Option<String>, // meal slot on deductions
    pub note: Option<String>,     // free text on adjustments
    pub balance_after: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Entry as handed to [`super::LedgerStore::append`]; id and timestamp are assigned on write.
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub account_id: Uuid,
    pub amount: i64,
    pub kind: EntryKind,
    pub category: Option<String>,
    pub note: Option<String>,
    pub balance_after: i64,
}

/// The balance change a caller asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// Subtract a positive magnitude.
    Deduct(i64),
    /// Add a signed delta.
    Apply(i64),
}

impl Mutation {
    pub fn delta(&self) -> i64 {
        match *self {
            Mutation::Deduct(n) => -n,
            Mutation::Apply(d) => d,
        }
    }
}

/// Descriptive half of an entry, known before the balance write.
#[derive(Debug, Clone)]
pub struct EntryDraft {
    pub kind: EntryKind,
    pub category: Option<String>,
    pub note: Option<String>,
}

impl EntryDraft {
    pub fn into_entry(self, account_id: Uuid, amount: i64, balance_after: i64) -> NewLedgerEntry {
        NewLedgerEntry {
            account_id,
            amount,
            kind: self.kind,
            category: self.category,
            note: self.note,
            balance_after,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_sign() {
        assert_eq!(EntryKind::for_amount(5), EntryKind::Refill);
        assert_eq!(EntryKind::for_amount(0), EntryKind::Refill);
        assert_eq!(EntryKind::for_amount(-3), EntryKind::Deduct);
    }

    #[test]
    fn mutation_delta_is_signed() {
        assert_eq!(Mutation::Deduct(2).delta(), -2);
        assert_eq!(Mutation::Apply(-4).delta(), -4);
        assert_eq!(Mutation::Apply(7).delta(), 7);
    }

    #[test]
    fn entry_serializes_camel_case() {
        let entry = LedgerEntry {
            id: Uuid::nil(),
            account_id: Uuid::nil(),
            amount: -1,
            kind: EntryKind::Deduct,
            category: Some("lunch".into()),
            note: None,
            balance_after: 9,
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["balanceAfter"], 9);
        assert_eq!(json["kind"], "deduct");
        assert_eq!(json["category"], "lunch");
        assert_eq!(json["createdAt"], "1970-01-01T00:00:00Z");
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{LedgerEntry, DEFAULT_REDEEM_AMOUNT};
use crate::accounts::Account;

fn default_amount() -> i64 {
    DEFAULT_REDEEM_AMOUNT
}

/// POST /admin/scan
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    #[serde(default)]
    pub qr_data: String,
    #[serde(default = "default_amount")]
    pub amount: i64,
    pub meal_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub message: String,
    pub new_balance: i64,
    pub user_name: String,
}

/// PUT /admin/credits
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustRequest {
    pub user_id: Uuid,
    pub amount: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustResponse {
    pub message: String,
    pub new_balance: i64,
}

#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    pub transactions: Vec<LedgerEntry>,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<Account>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_amount_defaults_to_one() {
        let req: ScanRequest = serde_json::from_str(r#"{"qrData":"abc","mealType":"Lunch"}"#).unwrap();
        assert_eq!(req.amount, 1);
        assert_eq!(req.qr_data, "abc");
        assert_eq!(req.meal_type.as_deref(), Some("Lunch"));
    }

    #[test]
    fn adjust_requires_numeric_amount() {
        let id = Uuid::new_v4();
        let body = format!(r#"{{"userId":"{id}","amount":"five"}}"#);
        assert!(serde_json::from_str::<AdjustRequest>(&body).is_err());
        let body = format!(r#"{{"userId":"{id}","amount":-3,"notes":"refund"}}"#);
        let req: AdjustRequest = serde_json::from_str(&body).unwrap();
        assert_eq!(req.amount, -3);
    }
}

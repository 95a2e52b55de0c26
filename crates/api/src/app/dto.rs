use serde::{Deserialize, Serialize};

use ledgergate_accounting::{
    AccountCreated, BalancePoint, BalanceReport, CreateAccount, GetBalance, GetMovements,
    Movement, MovementHistory, TransferCompleted, TransferFunds,
};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub bank: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferFundsRequest {
    pub from_user_id: String,
    pub to_user_id: String,
    pub amount: u64,
    #[serde(default)]
    pub from_user_email: Option<String>,
}

/// Times are microseconds since the epoch; omitted or `0` means unset.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetBalanceRequest {
    pub user_id: String,
    #[serde(default)]
    pub from_time: u64,
    #[serde(default)]
    pub to_time: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetMovementsRequest {
    pub user_id: String,
    #[serde(default)]
    pub from_time: u64,
    #[serde(default)]
    pub to_time: u64,
    #[serde(default)]
    pub limit: bool,
}

impl From<CreateAccountRequest> for CreateAccount {
    fn from(r: CreateAccountRequest) -> Self {
        Self {
            user_id: r.user_id,
            username: r.username,
            bank: r.bank,
        }
    }
}

impl From<TransferFundsRequest> for TransferFunds {
    fn from(r: TransferFundsRequest) -> Self {
        Self {
            from_user_id: r.from_user_id,
            to_user_id: r.to_user_id,
            amount: r.amount,
            from_user_email: r.from_user_email,
        }
    }
}

impl From<GetBalanceRequest> for GetBalance {
    fn from(r: GetBalanceRequest) -> Self {
        Self {
            user_id: r.user_id,
            from_time: r.from_time,
            to_time: r.to_time,
        }
    }
}

impl From<GetMovementsRequest> for GetMovements {
    fn from(r: GetMovementsRequest) -> Self {
        Self {
            user_id: r.user_id,
            from_time: r.from_time,
            to_time: r.to_time,
            limit: r.limit,
        }
    }
}

// -------------------------
// Response DTOs
// -------------------------
//
// Amounts are 128-bit on the engine side, so they travel as decimal strings.

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountResponse {
    pub success: bool,
    pub message: String,
    pub user_id: String,
    pub timestamp: String,
}

impl From<AccountCreated> for CreateAccountResponse {
    fn from(c: AccountCreated) -> Self {
        Self {
            success: true,
            message: format!("Account created for {} with id: {}", c.username, c.user_id),
            user_id: c.user_id.to_string(),
            timestamp: c.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferFundsResponse {
    pub success: bool,
    pub message: String,
    pub transfer_id: String,
    pub timestamp: String,
}

impl From<TransferCompleted> for TransferFundsResponse {
    fn from(t: TransferCompleted) -> Self {
        Self {
            success: true,
            message: format!(
                "Transferred {} from {} to {}",
                t.amount, t.from_user_id, t.to_user_id
            ),
            transfer_id: t.transfer_id.to_string(),
            timestamp: t.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BalanceEntry {
    pub income: String,
    pub outcome: String,
}

impl From<&BalancePoint> for BalanceEntry {
    fn from(p: &BalancePoint) -> Self {
        Self {
            income: p.income.to_string(),
            outcome: p.outcome.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub success: bool,
    pub message: String,
    pub current: String,
    pub timestamp: String,
    pub balances: Vec<BalanceEntry>,
}

impl From<BalanceReport> for BalanceResponse {
    fn from(r: BalanceReport) -> Self {
        let message = if r.balances.is_empty() {
            format!("No balances found for {}", r.user_id)
        } else {
            format!("Balances for {}.", r.user_id)
        };
        Self {
            success: true,
            message,
            current: r.current.to_string(),
            timestamp: r.timestamp,
            balances: r.balances.iter().map(BalanceEntry::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementEntry {
    pub transfer_id: String,
    pub from_username: String,
    pub to_username: String,
    pub amount: String,
    pub timestamp: String,
}

impl From<Movement> for MovementEntry {
    fn from(m: Movement) -> Self {
        Self {
            transfer_id: m.transfer_id.to_string(),
            from_username: m.from_username,
            to_username: m.to_username,
            amount: m.amount.to_string(),
            timestamp: m.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MovementsResponse {
    pub success: bool,
    pub message: String,
    pub movements: Vec<MovementEntry>,
}

impl From<MovementHistory> for MovementsResponse {
    fn from(h: MovementHistory) -> Self {
        let message = if h.movements.is_empty() {
            format!("No movements found for {}", h.user_id)
        } else {
            format!("History of movements for: {}", h.user_id)
        };
        Self {
            success: true,
            message,
            movements: h.movements.into_iter().map(MovementEntry::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgergate_core::{AccountId, TimeWindow};

    #[test]
    fn requests_use_camel_case_and_optional_fields() {
        let r: TransferFundsRequest = serde_json::from_value(serde_json::json!({
            "fromUserId": "a",
            "toUserId": "b",
            "amount": 5,
        }))
        .unwrap();
        assert_eq!(r.from_user_email, None);

        let r: GetMovementsRequest =
            serde_json::from_value(serde_json::json!({ "userId": "a" })).unwrap();
        assert_eq!((r.from_time, r.to_time, r.limit), (0, 0, false));
    }

    #[test]
    fn empty_balance_reports_zero_with_not_found_message() {
        let user_id = AccountId::new();
        let body = serde_json::to_value(BalanceResponse::from(BalanceReport {
            user_id,
            current: 0,
            balances: vec![],
            window: TimeWindow::resolve(0, 1, 1).unwrap(),
            timestamp: "2024-01-01 00:00".to_string(),
        }))
        .unwrap();

        assert_eq!(body["success"], true);
        assert_eq!(body["current"], "0");
        assert_eq!(body["message"], format!("No balances found for {user_id}"));
        assert_eq!(body["balances"], serde_json::json!([]));
    }

    #[test]
    fn negative_balances_render_as_signed_decimal() {
        let body = serde_json::to_value(BalanceResponse::from(BalanceReport {
            user_id: AccountId::new(),
            current: -700,
            balances: vec![BalancePoint {
                income: 300,
                outcome: 1_000,
            }],
            window: TimeWindow::resolve(0, 1, 1).unwrap(),
            timestamp: String::new(),
        }))
        .unwrap();

        assert_eq!(body["current"], "-700");
        assert_eq!(body["balances"][0], serde_json::json!({"income": "300", "outcome": "1000"}));
    }
}

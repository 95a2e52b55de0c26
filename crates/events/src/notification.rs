use serde::{Deserialize, Serialize};

/// Event published after a transfer has been committed by the engine.
///
/// Serialized as `{"type", "email", "transactionId", "amount"}` for the
/// downstream mail consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferNotification {
    #[serde(rename = "type")]
    pub kind: String,
    pub email: String,
    #[serde(rename = "transactionId")]
    pub transaction_id: String,
    pub amount: u64,
}

impl TransferNotification {
    pub const KIND_TRANSACTION: &'static str = "transaction";

    pub fn transaction(
        email: impl Into<String>,
        transaction_id: impl Into<String>,
        amount: u64,
    ) -> Self {
        Self {
            kind: Self::KIND_TRANSACTION.to_string(),
            email: email.into(),
            transaction_id: transaction_id.into(),
            amount,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

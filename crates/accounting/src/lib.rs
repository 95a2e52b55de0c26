//! Ledger gateway domain: the accounting-engine contract, request handling and
//! balance/history aggregation.
//!
//! No IO lives here. The engine client and the notification hand-off are
//! injected as trait objects.

pub mod aggregation;
pub mod engine;
pub mod error;
pub mod gateway;

pub use aggregation::{BalancePoint, BalanceSummary, Movement, signed_balance};
pub use engine::{
    Account, AccountBalance, AccountFilter, AccountFilterFlags, AccountFlags, AccountKind,
    AccountingEngine, BatchResult, CreateAccountResult, CreateAccountsResult,
    CreateTransferResult, CreateTransfersResult, EngineError, EngineResultCode, Transfer,
};
pub use error::{ErrorKind, GatewayError, GatewayResult};
pub use gateway::{
    AccountCreated, BalanceReport, CreateAccount, GatewayConfig, GetBalance, GetMovements,
    LedgerGateway, MovementHistory, TransferCompleted, TransferFunds,
};

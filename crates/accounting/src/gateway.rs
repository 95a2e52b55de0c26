//! Ledger gateway: validates caller requests, delegates to the accounting
//! engine and reshapes the answers.
//!
//! The gateway keeps no per-request state. Its two collaborators, the engine
//! client and the transfer notifier, are created once at startup and shared
//! by every request.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use ledgergate_core::{AccountId, DisplayClock, DisplayName, TimeWindow, TransferId, now_micros};
use ledgergate_events::{TransferNotification, TransferNotifier};

use crate::aggregation::{self, BalancePoint, Movement};
use crate::engine::{Account, AccountFilter, AccountKind, AccountingEngine, EngineError, Transfer};
use crate::error::{GatewayError, GatewayResult};

/// Every account and transfer lives on ledger 1.
pub const LEDGER: u32 = 1;
pub const ACCOUNT_CODE: u16 = 1;
pub const TRANSFER_CODE: u16 = 1;

/// Default cap on balance records and (when requested) transfers per query.
pub const DEFAULT_PAGE_SIZE: u32 = 40;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub page_size: u32,
    /// Upper bound on each engine call.
    pub engine_timeout: Duration,
    pub display_clock: DisplayClock,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            engine_timeout: Duration::from_secs(5),
            display_clock: DisplayClock::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateAccount {
    pub user_id: String,
    pub username: String,
    /// `true` provisions a bank/float account, `false` a customer account.
    pub bank: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountCreated {
    pub user_id: AccountId,
    pub username: DisplayName,
    pub kind: AccountKind,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferFunds {
    pub from_user_id: String,
    pub to_user_id: String,
    pub amount: u64,
    /// Recipient of the transfer notification; none means no notification.
    pub from_user_email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferCompleted {
    pub transfer_id: TransferId,
    pub from_user_id: AccountId,
    pub to_user_id: AccountId,
    pub amount: u64,
    /// Submission clock in the display timezone. The engine's commit
    /// timestamp is not read back.
    pub timestamp: String,
}

/// Window query. `0` leaves a bound unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetBalance {
    pub user_id: String,
    pub from_time: u64,
    pub to_time: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceReport {
    pub user_id: AccountId,
    pub current: i128,
    pub balances: Vec<BalancePoint>,
    pub window: TimeWindow,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetMovements {
    pub user_id: String,
    pub from_time: u64,
    pub to_time: u64,
    /// Cap the result at the page size.
    pub limit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementHistory {
    pub user_id: AccountId,
    pub movements: Vec<Movement>,
}

pub struct LedgerGateway {
    engine: Arc<dyn AccountingEngine>,
    notifier: Arc<dyn TransferNotifier>,
    config: GatewayConfig,
}

impl core::fmt::Debug for LedgerGateway {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LedgerGateway")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LedgerGateway {
    pub fn new(
        engine: Arc<dyn AccountingEngine>,
        notifier: Arc<dyn TransferNotifier>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            engine,
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Provision one account with history and the selected direction.
    #[instrument(skip(self, request), fields(user_id = %request.user_id, bank = request.bank), err)]
    pub async fn create_account(&self, request: CreateAccount) -> GatewayResult<AccountCreated> {
        let user_id: AccountId = request.user_id.parse()?;
        let username = DisplayName::parse(request.username)?;
        let kind = AccountKind::from_bank_flag(request.bank);
        let clock = now_micros();

        let mut account = Account::new(user_id.engine_key(), LEDGER, ACCOUNT_CODE, kind.flags());
        account.user_data_128 = username.to_engine_field();
        account.user_data_64 = clock;

        let results = self
            .write("create_accounts", self.engine.create_accounts(vec![account]))
            .await?;
        if let Some(rejected) = results.first() {
            return Err(GatewayError::rejection("create_accounts", rejected.result));
        }

        info!(%user_id, ?kind, engine_key = %user_id.engine_key(), "account created");
        Ok(AccountCreated {
            user_id,
            username,
            kind,
            timestamp: self.config.display_clock.format_micros(clock),
        })
    }

    /// Move `amount` from `from_user_id` (credited) to `to_user_id` (debited).
    ///
    /// Once the engine has accepted the transfer it is a fact: the
    /// notification is handed off before returning and cannot fail the call.
    #[instrument(
        skip(self, request),
        fields(from = %request.from_user_id, to = %request.to_user_id, amount = request.amount),
        err
    )]
    pub async fn transfer_funds(&self, request: TransferFunds) -> GatewayResult<TransferCompleted> {
        let from_user_id: AccountId = request.from_user_id.parse()?;
        let to_user_id: AccountId = request.to_user_id.parse()?;
        if request.amount == 0 {
            return Err(GatewayError::invalid_argument("amount must be greater than 0"));
        }

        let transfer_id = TransferId::new();
        let clock = now_micros();
        let transfer = Transfer {
            id: transfer_id.engine_key(),
            debit_account_id: to_user_id.engine_key(),
            credit_account_id: from_user_id.engine_key(),
            amount: u128::from(request.amount),
            user_data_128: 0,
            user_data_64: clock,
            ledger: LEDGER,
            code: TRANSFER_CODE,
            timestamp: 0,
        };

        let results = self
            .write("create_transfers", self.engine.create_transfers(vec![transfer]))
            .await?;
        if let Some(rejected) = results.first() {
            return Err(GatewayError::rejection("create_transfers", rejected.result));
        }

        info!(%transfer_id, "transfer committed");
        self.hand_off_notification(request.from_user_email.as_deref(), transfer_id, request.amount);

        Ok(TransferCompleted {
            transfer_id,
            from_user_id,
            to_user_id,
            amount: request.amount,
            timestamp: self.config.display_clock.format_micros(clock),
        })
    }

    #[instrument(skip(self, request), fields(user_id = %request.user_id), err)]
    pub async fn get_balance(&self, request: GetBalance) -> GatewayResult<BalanceReport> {
        let user_id: AccountId = request.user_id.parse()?;
        let window = TimeWindow::resolve(request.from_time, request.to_time, now_micros())?;

        let filter = AccountFilter::for_window(user_id.engine_key(), &window, Some(self.config.page_size));
        let records = self
            .query("get_account_balances", self.engine.get_account_balances(filter))
            .await?;
        if records.is_empty() {
            debug!(%user_id, "no balance records in window");
        }

        let summary = aggregation::summarize_balances(&records);
        Ok(BalanceReport {
            user_id,
            current: summary.current,
            balances: summary.points,
            window,
            timestamp: self.config.display_clock.format_now(),
        })
    }

    #[instrument(skip(self, request), fields(user_id = %request.user_id, limit = request.limit), err)]
    pub async fn get_movements(&self, request: GetMovements) -> GatewayResult<MovementHistory> {
        let user_id: AccountId = request.user_id.parse()?;
        let window = TimeWindow::resolve(request.from_time, request.to_time, now_micros())?;

        let limit = request.limit.then_some(self.config.page_size);
        let filter = AccountFilter::for_window(user_id.engine_key(), &window, limit);
        let transfers = self
            .query("get_account_transfers", self.engine.get_account_transfers(filter))
            .await?;
        if transfers.is_empty() {
            return Ok(MovementHistory {
                user_id,
                movements: Vec::new(),
            });
        }

        let keys = aggregation::counterparty_keys(&transfers);
        let accounts = self
            .query("lookup_accounts", self.engine.lookup_accounts(keys))
            .await?;
        let movements =
            aggregation::enrich_transfers(&transfers, &accounts, &self.config.display_clock)?;

        Ok(MovementHistory { user_id, movements })
    }

    fn hand_off_notification(&self, email: Option<&str>, transfer_id: TransferId, amount: u64) {
        match email.map(str::trim).filter(|e| !e.is_empty()) {
            Some(email) => self.notifier.notify(TransferNotification::transaction(
                email,
                transfer_id.to_string(),
                amount,
            )),
            None => debug!(%transfer_id, "no recipient email; notification skipped"),
        }
    }

    async fn query<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, EngineError>>,
    ) -> GatewayResult<T> {
        self.bounded(operation, call, false).await
    }

    async fn write<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, EngineError>>,
    ) -> GatewayResult<T> {
        self.bounded(operation, call, true).await
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, EngineError>>,
        outcome_unknown_on_timeout: bool,
    ) -> GatewayResult<T> {
        let after_ms = u64::try_from(self.config.engine_timeout.as_millis()).unwrap_or(u64::MAX);
        match tokio::time::timeout(self.config.engine_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => {
                warn!(operation, error = %source, "engine call failed");
                Err(GatewayError::Transport { operation, source })
            }
            Err(_) if outcome_unknown_on_timeout => {
                warn!(operation, after_ms, "engine write timed out; outcome unknown");
                Err(GatewayError::OutcomeUnknown { operation, after_ms })
            }
            Err(_) => {
                warn!(operation, after_ms, "engine query timed out");
                Err(GatewayError::TimedOut { operation, after_ms })
            }
        }
    }
}

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use ledgergate_accounting::{
    Account, AccountBalance, AccountFilter, AccountingEngine, BatchResult, CreateAccountResult,
    CreateAccountsResult, CreateTransferResult, CreateTransfersResult, EngineError, Transfer,
};
use ledgergate_core::EngineKey;

/// Balance snapshot taken right after a transfer posted to an account.
#[derive(Debug, Copy, Clone)]
struct HistoryEntry {
    balance: AccountBalance,
    /// The account was the debit side of that transfer.
    debit_side: bool,
}

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<EngineKey, Account>,
    /// Commit order, so timestamps are strictly increasing.
    transfers: Vec<Transfer>,
    transfer_index: HashMap<EngineKey, usize>,
    history: HashMap<EngineKey, Vec<HistoryEntry>>,
    last_timestamp: u64,
}

impl State {
    /// Wall clock in nanoseconds, forced strictly monotonic.
    fn next_timestamp(&mut self) -> u64 {
        let now = Utc::now()
            .timestamp_nanos_opt()
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or(0);
        self.last_timestamp = now.max(self.last_timestamp + 1);
        self.last_timestamp
    }

    fn validate_account(&self, a: &Account) -> CreateAccountResult {
        use CreateAccountResult as R;

        if a.timestamp != 0 {
            return R::TimestampMustBeZero;
        }
        if a.id.is_zero() {
            return R::IdMustNotBeZero;
        }
        if a.id == EngineKey::MAX {
            return R::IdMustNotBeIntMax;
        }
        if a.flags.is_mutually_exclusive_violation() {
            return R::FlagsAreMutuallyExclusive;
        }
        if a.debits_posted != 0 {
            return R::DebitsPostedMustBeZero;
        }
        if a.credits_posted != 0 {
            return R::CreditsPostedMustBeZero;
        }
        if a.ledger == 0 {
            return R::LedgerMustNotBeZero;
        }
        if a.code == 0 {
            return R::CodeMustNotBeZero;
        }

        match self.accounts.get(&a.id) {
            None => R::Ok,
            Some(e) if e.flags != a.flags => R::ExistsWithDifferentFlags,
            Some(e) if e.user_data_128 != a.user_data_128 => R::ExistsWithDifferentUserData128,
            Some(e) if e.user_data_64 != a.user_data_64 => R::ExistsWithDifferentUserData64,
            Some(e) if e.ledger != a.ledger => R::ExistsWithDifferentLedger,
            Some(e) if e.code != a.code => R::ExistsWithDifferentCode,
            Some(_) => R::Exists,
        }
    }

    fn validate_transfer(&self, t: &Transfer) -> CreateTransferResult {
        use CreateTransferResult as R;

        if t.timestamp != 0 {
            return R::TimestampMustBeZero;
        }
        if t.id.is_zero() {
            return R::IdMustNotBeZero;
        }
        if t.id == EngineKey::MAX {
            return R::IdMustNotBeIntMax;
        }
        if t.debit_account_id.is_zero() {
            return R::DebitAccountIdMustNotBeZero;
        }
        if t.credit_account_id.is_zero() {
            return R::CreditAccountIdMustNotBeZero;
        }
        if t.debit_account_id == t.credit_account_id {
            return R::AccountsMustBeDifferent;
        }
        if t.amount == 0 {
            return R::AmountMustNotBeZero;
        }
        if t.ledger == 0 {
            return R::LedgerMustNotBeZero;
        }
        if t.code == 0 {
            return R::CodeMustNotBeZero;
        }
        if self.transfer_index.contains_key(&t.id) {
            return R::Exists;
        }

        let Some(dr) = self.accounts.get(&t.debit_account_id) else {
            return R::DebitAccountNotFound;
        };
        let Some(cr) = self.accounts.get(&t.credit_account_id) else {
            return R::CreditAccountNotFound;
        };
        if dr.ledger != cr.ledger {
            return R::AccountsMustHaveTheSameLedger;
        }
        if t.ledger != dr.ledger {
            return R::TransferMustHaveTheSameLedgerAsAccounts;
        }

        let Some(dr_debits) = dr.debits_posted.checked_add(t.amount) else {
            return R::OverflowsDebitsPosted;
        };
        let Some(cr_credits) = cr.credits_posted.checked_add(t.amount) else {
            return R::OverflowsCreditsPosted;
        };
        if dr.flags.debits_must_not_exceed_credits && dr_debits > dr.credits_posted {
            return R::ExceedsCredits;
        }
        if cr.flags.credits_must_not_exceed_debits && cr_credits > cr.debits_posted {
            return R::ExceedsDebits;
        }

        R::Ok
    }

    /// Post a validated transfer: stamp it, move the totals, snapshot history.
    fn post(&mut self, mut t: Transfer) {
        t.timestamp = self.next_timestamp();

        for (key, debit_side) in [(t.debit_account_id, true), (t.credit_account_id, false)] {
            let Some(account) = self.accounts.get_mut(&key) else {
                continue;
            };
            if debit_side {
                account.debits_posted += t.amount;
            } else {
                account.credits_posted += t.amount;
            }
            if account.flags.history {
                let balance = AccountBalance {
                    timestamp: t.timestamp,
                    debits_posted: account.debits_posted,
                    credits_posted: account.credits_posted,
                };
                self.history
                    .entry(key)
                    .or_default()
                    .push(HistoryEntry { balance, debit_side });
            }
        }

        self.transfer_index.insert(t.id, self.transfers.len());
        self.transfers.push(t);
    }
}

/// Does `timestamp` fall inside the filter window? Zero bounds are open.
fn in_window(filter: &AccountFilter, timestamp: u64) -> bool {
    (filter.timestamp_min == 0 || timestamp >= filter.timestamp_min)
        && (filter.timestamp_max == 0 || timestamp <= filter.timestamp_max)
}

/// Order (oldest-first input) and cap a filtered result.
fn page<T>(mut items: Vec<T>, filter: &AccountFilter) -> Vec<T> {
    if filter.flags.reversed {
        items.reverse();
    }
    if let Some(limit) = filter.limit {
        items.truncate(limit as usize);
    }
    items
}

fn check_filter(filter: &AccountFilter) -> Result<(), EngineError> {
    if filter.limit == Some(0) {
        return Err(EngineError::InvalidRequest("limit must not be zero".to_string()));
    }
    if filter.timestamp_max != 0 && filter.timestamp_min > filter.timestamp_max {
        return Err(EngineError::InvalidRequest(format!(
            "timestamp_min {} > timestamp_max {}",
            filter.timestamp_min, filter.timestamp_max
        )));
    }
    Ok(())
}

/// In-process accounting engine.
///
/// Mirrors the real engine's per-item result codes and balance constraints,
/// and stamps commits in nanoseconds.
///
/// Intended for tests/dev. State is lost on drop.
#[derive(Debug, Default)]
pub struct InMemoryEngine {
    state: RwLock<State>,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, State>, EngineError> {
        self.state
            .read()
            .map_err(|_| EngineError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, State>, EngineError> {
        self.state
            .write()
            .map_err(|_| EngineError::Unavailable("lock poisoned".to_string()))
    }
}

#[async_trait]
impl AccountingEngine for InMemoryEngine {
    async fn create_accounts(
        &self,
        accounts: Vec<Account>,
    ) -> Result<Vec<CreateAccountsResult>, EngineError> {
        let mut state = self.write()?;
        let mut results = Vec::new();

        for (index, mut account) in accounts.into_iter().enumerate() {
            let result = state.validate_account(&account);
            if result != CreateAccountResult::Ok {
                results.push(BatchResult {
                    index: index as u32,
                    result,
                });
                continue;
            }
            account.timestamp = state.next_timestamp();
            debug!(id = %account.id, "account stored");
            state.accounts.insert(account.id, account);
        }

        Ok(results)
    }

    async fn create_transfers(
        &self,
        transfers: Vec<Transfer>,
    ) -> Result<Vec<CreateTransfersResult>, EngineError> {
        let mut state = self.write()?;
        let mut results = Vec::new();

        for (index, transfer) in transfers.into_iter().enumerate() {
            let result = state.validate_transfer(&transfer);
            if result != CreateTransferResult::Ok {
                results.push(BatchResult {
                    index: index as u32,
                    result,
                });
                continue;
            }
            state.post(transfer);
        }

        Ok(results)
    }

    async fn get_account_balances(
        &self,
        filter: AccountFilter,
    ) -> Result<Vec<AccountBalance>, EngineError> {
        check_filter(&filter)?;
        let state = self.read()?;

        let Some(history) = state.history.get(&filter.account_id) else {
            return Ok(Vec::new());
        };
        let matching = history
            .iter()
            .filter(|h| (h.debit_side && filter.flags.debits) || (!h.debit_side && filter.flags.credits))
            .filter(|h| in_window(&filter, h.balance.timestamp))
            .map(|h| h.balance)
            .collect();

        Ok(page(matching, &filter))
    }

    async fn get_account_transfers(
        &self,
        filter: AccountFilter,
    ) -> Result<Vec<Transfer>, EngineError> {
        check_filter(&filter)?;
        let state = self.read()?;

        let key = filter.account_id;
        let matching = state
            .transfers
            .iter()
            .filter(|t| {
                (filter.flags.debits && t.debit_account_id == key)
                    || (filter.flags.credits && t.credit_account_id == key)
            })
            .filter(|t| in_window(&filter, t.timestamp))
            .cloned()
            .collect();

        Ok(page(matching, &filter))
    }

    async fn lookup_accounts(&self, ids: Vec<EngineKey>) -> Result<Vec<Account>, EngineError> {
        let state = self.read()?;
        Ok(ids
            .iter()
            .filter_map(|id| state.accounts.get(id).cloned())
            .collect())
    }
}

//! Accounting engine data model and client contract.
//!
//! The engine owns every durable account and transfer. The gateway only talks
//! to it through [`AccountingEngine`], which mirrors the five batch/query
//! operations the engine client exposes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ledgergate_core::{EngineKey, TimeWindow};

/// Account balance-direction constraint + history retention.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountFlags {
    pub debits_must_not_exceed_credits: bool,
    pub credits_must_not_exceed_debits: bool,
    pub history: bool,
}

impl AccountFlags {
    const DEBITS_MUST_NOT_EXCEED_CREDITS: u16 = 1 << 1;
    const CREDITS_MUST_NOT_EXCEED_DEBITS: u16 = 1 << 2;
    const HISTORY: u16 = 1 << 3;

    pub fn to_u16(self) -> u16 {
        let mut bits = 0;
        if self.debits_must_not_exceed_credits {
            bits |= Self::DEBITS_MUST_NOT_EXCEED_CREDITS;
        }
        if self.credits_must_not_exceed_debits {
            bits |= Self::CREDITS_MUST_NOT_EXCEED_DEBITS;
        }
        if self.history {
            bits |= Self::HISTORY;
        }
        bits
    }

    pub fn from_u16(bits: u16) -> Self {
        Self {
            debits_must_not_exceed_credits: bits & Self::DEBITS_MUST_NOT_EXCEED_CREDITS != 0,
            credits_must_not_exceed_debits: bits & Self::CREDITS_MUST_NOT_EXCEED_DEBITS != 0,
            history: bits & Self::HISTORY != 0,
        }
    }

    /// Both directional constraints at once is contradictory.
    pub fn is_mutually_exclusive_violation(self) -> bool {
        self.debits_must_not_exceed_credits && self.credits_must_not_exceed_debits
    }
}

/// Which directional constraint an account is provisioned with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// Debits ≤ credits: receives at most what it has sent, so its balance
    /// is ≤ 0.
    Customer,
    /// Credits ≤ debits: pays out at most what it has taken in; its balance
    /// is ≥ 0.
    Bank,
}

impl AccountKind {
    pub fn from_bank_flag(bank: bool) -> Self {
        if bank { Self::Bank } else { Self::Customer }
    }

    /// Flags for a newly provisioned account: one direction, always with history.
    pub fn flags(self) -> AccountFlags {
        AccountFlags {
            debits_must_not_exceed_credits: self == Self::Customer,
            credits_must_not_exceed_debits: self == Self::Bank,
            history: true,
        }
    }

    /// `None` unless exactly one directional constraint is set.
    pub fn from_flags(flags: AccountFlags) -> Option<Self> {
        match (
            flags.debits_must_not_exceed_credits,
            flags.credits_must_not_exceed_debits,
        ) {
            (true, false) => Some(Self::Customer),
            (false, true) => Some(Self::Bank),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: EngineKey,
    pub debits_posted: u128,
    pub credits_posted: u128,
    /// Packed display name.
    pub user_data_128: u128,
    /// Submission clock, microseconds since the epoch.
    pub user_data_64: u64,
    pub ledger: u32,
    pub code: u16,
    pub flags: AccountFlags,
    /// Assigned by the engine (nanoseconds). Must be zero on create.
    pub timestamp: u64,
}

impl Account {
    pub fn new(id: EngineKey, ledger: u32, code: u16, flags: AccountFlags) -> Self {
        Self {
            id,
            debits_posted: 0,
            credits_posted: 0,
            user_data_128: 0,
            user_data_64: 0,
            ledger,
            code,
            flags,
            timestamp: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub id: EngineKey,
    pub debit_account_id: EngineKey,
    pub credit_account_id: EngineKey,
    pub amount: u128,
    pub user_data_128: u128,
    /// Submission clock, microseconds since the epoch.
    pub user_data_64: u64,
    pub ledger: u32,
    pub code: u16,
    /// Assigned by the engine on commit (nanoseconds). Must be zero on create.
    pub timestamp: u64,
}

/// Posted totals of one account right after a transfer touched it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountBalance {
    pub timestamp: u64,
    pub debits_posted: u128,
    pub credits_posted: u128,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct AccountFilterFlags {
    /// Include transfers where the account is on the debit side.
    pub debits: bool,
    /// Include transfers where the account is on the credit side.
    pub credits: bool,
    /// Newest first.
    pub reversed: bool,
}

impl AccountFilterFlags {
    pub fn both_sides_newest_first() -> Self {
        Self {
            debits: true,
            credits: true,
            reversed: true,
        }
    }
}

/// Query shape shared by `get_account_balances` and `get_account_transfers`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AccountFilter {
    pub account_id: EngineKey,
    /// Inclusive, engine units. `0` means unbounded.
    pub timestamp_min: u64,
    /// Inclusive, engine units. `0` means unbounded.
    pub timestamp_max: u64,
    /// `None` returns every matching record.
    pub limit: Option<u32>,
    pub flags: AccountFilterFlags,
}

impl AccountFilter {
    pub fn for_window(account_id: EngineKey, window: &TimeWindow, limit: Option<u32>) -> Self {
        Self {
            account_id,
            timestamp_min: window.engine_min(),
            timestamp_max: window.engine_max(),
            limit,
            flags: AccountFilterFlags::both_sides_newest_first(),
        }
    }
}

/// Numeric code + stable name of a per-item engine result.
pub trait EngineResultCode: Copy + core::fmt::Debug {
    fn code(self) -> u32;
    fn name(self) -> &'static str;
}

macro_rules! result_codes {
    ($(#[$meta:meta])* $t:ident { $($variant:ident = $code:literal => $name:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        #[repr(u32)]
        pub enum $t {
            $($variant = $code),+
        }

        impl EngineResultCode for $t {
            fn code(self) -> u32 {
                self as u32
            }

            fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name),+
                }
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{} ({})", self.code(), self.name())
            }
        }
    };
}

result_codes!(
    /// Outcome of one account in a `create_accounts` batch.
    CreateAccountResult {
        Ok = 0 => "ok",
        LinkedEventFailed = 1 => "linked_event_failed",
        TimestampMustBeZero = 3 => "timestamp_must_be_zero",
        IdMustNotBeZero = 6 => "id_must_not_be_zero",
        IdMustNotBeIntMax = 7 => "id_must_not_be_int_max",
        FlagsAreMutuallyExclusive = 8 => "flags_are_mutually_exclusive",
        DebitsPostedMustBeZero = 10 => "debits_posted_must_be_zero",
        CreditsPostedMustBeZero = 12 => "credits_posted_must_be_zero",
        LedgerMustNotBeZero = 13 => "ledger_must_not_be_zero",
        CodeMustNotBeZero = 14 => "code_must_not_be_zero",
        ExistsWithDifferentFlags = 15 => "exists_with_different_flags",
        ExistsWithDifferentUserData128 = 16 => "exists_with_different_user_data_128",
        ExistsWithDifferentUserData64 = 17 => "exists_with_different_user_data_64",
        ExistsWithDifferentLedger = 19 => "exists_with_different_ledger",
        ExistsWithDifferentCode = 20 => "exists_with_different_code",
        Exists = 21 => "exists",
    }
);

result_codes!(
    /// Outcome of one transfer in a `create_transfers` batch.
    CreateTransferResult {
        Ok = 0 => "ok",
        LinkedEventFailed = 1 => "linked_event_failed",
        TimestampMustBeZero = 3 => "timestamp_must_be_zero",
        IdMustNotBeZero = 5 => "id_must_not_be_zero",
        IdMustNotBeIntMax = 6 => "id_must_not_be_int_max",
        DebitAccountIdMustNotBeZero = 8 => "debit_account_id_must_not_be_zero",
        CreditAccountIdMustNotBeZero = 10 => "credit_account_id_must_not_be_zero",
        AccountsMustBeDifferent = 12 => "accounts_must_be_different",
        AmountMustNotBeZero = 18 => "amount_must_not_be_zero",
        LedgerMustNotBeZero = 19 => "ledger_must_not_be_zero",
        CodeMustNotBeZero = 20 => "code_must_not_be_zero",
        DebitAccountNotFound = 21 => "debit_account_not_found",
        CreditAccountNotFound = 22 => "credit_account_not_found",
        AccountsMustHaveTheSameLedger = 23 => "accounts_must_have_the_same_ledger",
        TransferMustHaveTheSameLedgerAsAccounts = 24 => "transfer_must_have_the_same_ledger_as_accounts",
        Exists = 46 => "exists",
        OverflowsDebitsPosted = 49 => "overflows_debits_posted",
        OverflowsCreditsPosted = 50 => "overflows_credits_posted",
        ExceedsCredits = 54 => "exceeds_credits",
        ExceedsDebits = 55 => "exceeds_debits",
    }
);

/// A non-ok entry of a batch create. Successful items are omitted.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BatchResult<R> {
    pub index: u32,
    pub result: R,
}

pub type CreateAccountsResult = BatchResult<CreateAccountResult>;
pub type CreateTransfersResult = BatchResult<CreateTransferResult>;

/// Transport-level failure talking to the engine.
///
/// Per-item rejections are not errors at this level; they come back as
/// [`BatchResult`] entries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    #[error("request rejected by engine client: {0}")]
    InvalidRequest(String),

    #[error("engine client closed")]
    ClientClosed,
}

/// Client capability for the external accounting engine.
///
/// One instance is created at process start and shared by every request;
/// implementations must be safe for concurrent use.
#[async_trait]
pub trait AccountingEngine: Send + Sync {
    async fn create_accounts(
        &self,
        accounts: Vec<Account>,
    ) -> Result<Vec<CreateAccountsResult>, EngineError>;

    async fn create_transfers(
        &self,
        transfers: Vec<Transfer>,
    ) -> Result<Vec<CreateTransfersResult>, EngineError>;

    async fn get_account_balances(
        &self,
        filter: AccountFilter,
    ) -> Result<Vec<AccountBalance>, EngineError>;

    async fn get_account_transfers(&self, filter: AccountFilter)
    -> Result<Vec<Transfer>, EngineError>;

    /// Accounts that do not exist are omitted from the result.
    async fn lookup_accounts(&self, ids: Vec<EngineKey>) -> Result<Vec<Account>, EngineError>;
}

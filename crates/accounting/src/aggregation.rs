//! Balance and history shaping over engine records.
//!
//! Transfers credit the sender and debit the receiver, so the current
//! balance of every account is `debits_posted − credits_posted`. A customer
//! that has only sent funds shows a negative balance.

use std::collections::{HashMap, HashSet};

use ledgergate_core::{DisplayClock, DisplayName, EngineKey, TransferId};

use crate::engine::{Account, AccountBalance, Transfer};
use crate::error::{GatewayError, GatewayResult};

/// Posted totals of one balance record, named from the account holder's view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalancePoint {
    /// Debits posted (money received).
    pub income: u128,
    /// Credits posted (money sent).
    pub outcome: u128,
}

impl From<&AccountBalance> for BalancePoint {
    fn from(record: &AccountBalance) -> Self {
        Self {
            income: record.debits_posted,
            outcome: record.credits_posted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceSummary {
    pub current: i128,
    /// Records in the order the engine returned them.
    pub points: Vec<BalancePoint>,
}

/// `debits − credits`, saturating at the `i128` range.
pub fn signed_balance(debits_posted: u128, credits_posted: u128) -> i128 {
    if debits_posted >= credits_posted {
        i128::try_from(debits_posted - credits_posted).unwrap_or(i128::MAX)
    } else {
        i128::try_from(credits_posted - debits_posted)
            .map(|v| -v)
            .unwrap_or(i128::MIN)
    }
}

/// Current balance from the most recent record in the window.
///
/// An empty window is a zero balance, not an error.
pub fn summarize_balances(records: &[AccountBalance]) -> BalanceSummary {
    let current = records
        .iter()
        .max_by_key(|r| r.timestamp)
        .map(|r| signed_balance(r.debits_posted, r.credits_posted))
        .unwrap_or(0);

    BalanceSummary {
        current,
        points: records.iter().map(BalancePoint::from).collect(),
    }
}

/// A transfer with both counterparties' display names resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Movement {
    pub transfer_id: TransferId,
    /// Credited account (the sender).
    pub from_username: String,
    /// Debited account (the receiver).
    pub to_username: String,
    pub amount: u128,
    /// Submission clock in the display timezone.
    pub timestamp: String,
}

/// Distinct accounts referenced by `transfers`, in first-seen order.
pub fn counterparty_keys(transfers: &[Transfer]) -> Vec<EngineKey> {
    let mut seen = HashSet::new();
    transfers
        .iter()
        .flat_map(|t| [t.credit_account_id, t.debit_account_id])
        .filter(|key| seen.insert(*key))
        .collect()
}

/// Join transfers with looked-up accounts.
///
/// All-or-nothing: if any counterparty is missing, no movements are returned.
pub fn enrich_transfers(
    transfers: &[Transfer],
    accounts: &[Account],
    clock: &DisplayClock,
) -> GatewayResult<Vec<Movement>> {
    let names: HashMap<EngineKey, String> = accounts
        .iter()
        .map(|a| (a.id, DisplayName::decode_engine_field(a.user_data_128)))
        .collect();

    transfers
        .iter()
        .map(|t| {
            let transfer_id = TransferId::from_engine_key(t.id);
            let resolve = |account: EngineKey| {
                names
                    .get(&account)
                    .cloned()
                    .ok_or(GatewayError::UnresolvedCounterparty {
                        transfer_id,
                        account,
                    })
            };

            Ok(Movement {
                transfer_id,
                from_username: resolve(t.credit_account_id)?,
                to_username: resolve(t.debit_account_id)?,
                amount: t.amount,
                timestamp: clock.format_micros(t.user_data_64),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::AccountKind;

    fn account(id: u128, name: &str) -> Account {
        let mut a = Account::new(EngineKey::from_u128(id), 1, 1, AccountKind::Customer.flags());
        a.user_data_128 = DisplayName::parse(name).unwrap().to_engine_field();
        a
    }

    fn transfer(id: u128, from: u128, to: u128, amount: u128) -> Transfer {
        Transfer {
            id: EngineKey::from_u128(id),
            debit_account_id: EngineKey::from_u128(to),
            credit_account_id: EngineKey::from_u128(from),
            amount,
            user_data_128: 0,
            user_data_64: 1_704_087_000_000_000,
            ledger: 1,
            code: 1,
            timestamp: 1,
        }
    }

    fn record(timestamp: u64, debits: u128, credits: u128) -> AccountBalance {
        AccountBalance {
            timestamp,
            debits_posted: debits,
            credits_posted: credits,
        }
    }

    #[test]
    fn empty_window_is_zero_balance() {
        let summary = summarize_balances(&[]);
        assert_eq!(summary.current, 0);
        assert!(summary.points.is_empty());
    }

    #[test]
    fn current_balance_uses_most_recent_record() {
        // Newest first, as the engine returns them with `reversed`.
        let records = [record(30, 300, 1_000), record(20, 0, 1_000), record(10, 0, 0)];
        let summary = summarize_balances(&records);

        assert_eq!(summary.current, -700);
        assert_eq!(
            summary.points[0],
            BalancePoint {
                income: 300,
                outcome: 1_000
            }
        );
        assert_eq!(summary.points.len(), 3);
    }

    #[test]
    fn sender_balance_is_negative() {
        assert_eq!(signed_balance(0, 500), -500);
        assert_eq!(signed_balance(500, 0), 500);
    }

    #[test]
    fn signed_balance_saturates() {
        assert_eq!(signed_balance(u128::MAX, 0), i128::MAX);
        assert_eq!(signed_balance(0, u128::MAX), i128::MIN);
        assert_eq!(signed_balance(0, 1u128 << 127), i128::MIN);
    }

    #[test]
    fn counterparties_are_deduplicated() {
        let transfers = [transfer(1, 10, 20, 5), transfer(2, 20, 10, 5), transfer(3, 10, 30, 5)];
        let keys = counterparty_keys(&transfers);
        assert_eq!(
            keys,
            vec![
                EngineKey::from_u128(10),
                EngineKey::from_u128(20),
                EngineKey::from_u128(30)
            ]
        );
    }

    #[test]
    fn enrichment_resolves_both_sides() {
        let movements = enrich_transfers(
            &[transfer(1, 10, 20, 500)],
            &[account(10, "alice"), account(20, "bank")],
            &DisplayClock::default(),
        )
        .unwrap();

        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].from_username, "alice");
        assert_eq!(movements[0].to_username, "bank");
        assert_eq!(movements[0].amount, 500);
        assert_eq!(movements[0].timestamp, "2024-01-01 00:30");
    }

    #[test]
    fn enrichment_is_all_or_nothing() {
        let transfers = [transfer(1, 10, 20, 5), transfer(2, 10, 30, 5), transfer(3, 20, 10, 5)];
        let err = enrich_transfers(
            &transfers,
            &[account(10, "alice"), account(20, "bank")],
            &DisplayClock::default(),
        )
        .unwrap_err();

        assert_eq!(
            err,
            GatewayError::UnresolvedCounterparty {
                transfer_id: TransferId::from_engine_key(EngineKey::from_u128(2)),
                account: EngineKey::from_u128(30),
            }
        );
    }
}

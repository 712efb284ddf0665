// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Running-balance reconstruction.
//!
//! Every function here is a pure fold over a slice of transactions: no
//! database access, no shared accumulator. Ordering is always ascending by
//! `(date, id)` so identical inputs give identical sequences.

use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{LedgerError, Result};
use crate::models::{Transaction, TransactionKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BalancePoint {
    pub transaction_id: i64,
    pub balance_after: Decimal,
}

pub fn chronological_key(tx: &Transaction) -> (NaiveDate, i64) {
    (tx.date, tx.id)
}

pub fn sort_chronological(txs: &mut [Transaction]) {
    txs.sort_by_key(chronological_key);
}

/// Effect on the total across all accounts. Transfers move money between
/// accounts the caller already holds, so they never change the total.
pub fn aggregate_effect(tx: &Transaction) -> Decimal {
    match tx.kind {
        TransactionKind::Income => tx.amount,
        TransactionKind::Expense => -tx.amount,
        TransactionKind::Transfer => Decimal::ZERO,
    }
}

/// Effect on a single account's balance.
pub fn account_effect(tx: &Transaction, account_id: i64) -> Decimal {
    let outflow = tx.origin_account_id == Some(account_id);
    let inflow = tx.destination_account_id == Some(account_id);
    match tx.kind {
        TransactionKind::Income if inflow => tx.amount,
        TransactionKind::Income => Decimal::ZERO,
        TransactionKind::Expense if outflow => -tx.amount,
        TransactionKind::Expense => Decimal::ZERO,
        TransactionKind::Transfer => {
            let mut delta = Decimal::ZERO;
            if outflow {
                delta -= tx.amount;
            }
            if inflow {
                delta += tx.amount;
            }
            delta
        }
    }
}

/// Verifies a caller-supplied sequence is strictly ascending by `(date, id)`.
pub fn check_order(txs: &[Transaction]) -> Result<()> {
    for (i, pair) in txs.windows(2).enumerate() {
        if chronological_key(&pair[0]) >= chronological_key(&pair[1]) {
            return Err(LedgerError::InvalidOrdering { position: i + 1 });
        }
    }
    Ok(())
}

fn fold<'a, I>(starting: Decimal, ordered: I, include_planned: bool) -> Vec<BalancePoint>
where
    I: Iterator<Item = &'a Transaction>,
{
    ordered
        .filter(|tx| include_planned || tx.is_confirmed())
        .scan(starting, |balance, tx| {
            *balance += aggregate_effect(tx);
            Some(BalancePoint {
                transaction_id: tx.id,
                balance_after: *balance,
            })
        })
        .collect()
}

/// Aggregate running balance after each transaction, in `(date, id)` order.
///
/// With `include_planned = false` planned rows are dropped entirely (the
/// authoritative ledger); with `true` they are folded in as well (projection).
pub fn reconstruct(
    starting: Decimal,
    txs: &[Transaction],
    include_planned: bool,
) -> Vec<BalancePoint> {
    let mut ordered: Vec<&Transaction> = txs.iter().collect();
    ordered.sort_by_key(|tx| chronological_key(tx));
    fold(starting, ordered.into_iter(), include_planned)
}

/// Same fold as [`reconstruct`] over a slice the caller claims is already sorted.
pub fn reconstruct_sorted(
    starting: Decimal,
    txs: &[Transaction],
    include_planned: bool,
) -> Result<Vec<BalancePoint>> {
    check_order(txs)?;
    Ok(fold(starting, txs.iter(), include_planned))
}

/// Confirmed-only running balance of one account.
///
/// `known_accounts` is the working set of account ids; the target account and
/// every account referenced by the input must be part of it.
pub fn reconstruct_for_account(
    account_id: i64,
    starting: Decimal,
    txs: &[Transaction],
    known_accounts: &HashSet<i64>,
) -> Result<Vec<BalancePoint>> {
    if !known_accounts.contains(&account_id) {
        return Err(LedgerError::reference(format!(
            "account {} is not in the working set",
            account_id
        )));
    }
    for tx in txs {
        for referenced in [tx.origin_account_id, tx.destination_account_id]
            .into_iter()
            .flatten()
        {
            if !known_accounts.contains(&referenced) {
                return Err(LedgerError::reference(format!(
                    "transaction {} references unknown account {}",
                    tx.id, referenced
                )));
            }
        }
    }

    let mut ordered: Vec<&Transaction> = txs
        .iter()
        .filter(|tx| tx.is_confirmed() && tx.touches_account(account_id))
        .collect();
    ordered.sort_by_key(|tx| chronological_key(tx));

    Ok(ordered
        .into_iter()
        .scan(starting, |balance, tx| {
            *balance += account_effect(tx, account_id);
            Some(BalancePoint {
                transaction_id: tx.id,
                balance_after: *balance,
            })
        })
        .collect())
}

pub fn final_balance(starting: Decimal, points: &[BalancePoint]) -> Decimal {
    points.last().map_or(starting, |p| p.balance_after)
}

/// Id of the first planned transaction in chronological order: where the
/// confirmed ledger ends and the projection begins.
pub fn projection_boundary(txs: &[Transaction]) -> Option<i64> {
    txs.iter()
        .filter(|tx| tx.is_planned())
        .min_by_key(|tx| chronological_key(tx))
        .map(|tx| tx.id)
}

// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use regex::{Regex, RegexBuilder};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

use super::{balance, read_snapshot, registry, store};
use crate::error::{LedgerError, Result};
use crate::models::Transaction;

/// Post-filter applied to a period view. Empty filter keeps every row.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Case-insensitive substring of the description.
    pub text: Option<String>,
    pub category_ids: Option<BTreeSet<i64>>,
}

impl TransactionFilter {
    fn matcher(&self) -> Result<Option<Regex>> {
        let Some(text) = self.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(None);
        };
        RegexBuilder::new(&regex::escape(text))
            .case_insensitive(true)
            .build()
            .map(Some)
            .map_err(|e| LedgerError::validation(format!("search text: {}", e)))
    }

    fn keeps(&self, matcher: Option<&Regex>, tx: &Transaction) -> bool {
        let text_ok = matcher.is_none_or(|re| re.is_match(&tx.description));
        let category_ok = self
            .category_ids
            .as_ref()
            .is_none_or(|ids| tx.category_id.is_some_and(|c| ids.contains(&c)));
        text_ok && category_ok
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PeriodView {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub opening_balance_for_period: Decimal,
    pub transactions: Vec<Transaction>,
    /// Index-aligned with `transactions`.
    pub running_balances: Vec<Decimal>,
    /// First planned transaction of the period, if any.
    pub projection_starts_at: Option<i64>,
}

impl PeriodView {
    pub fn rows(&self) -> impl Iterator<Item = (&Transaction, Decimal)> {
        self.transactions.iter().zip(self.running_balances.iter().copied())
    }

    pub fn closing_balance(&self) -> Decimal {
        self.running_balances
            .last()
            .copied()
            .unwrap_or(self.opening_balance_for_period)
    }
}

/// Aggregate confirmed balance just before `start`.
pub fn opening_balance_for_period(conn: &Connection, start: NaiveDate) -> Result<Decimal> {
    let opening = registry::opening_total(conn)?;
    let earlier = store::list_before(conn, start)?;
    let points = balance::reconstruct(opening, &earlier, false);
    Ok(balance::final_balance(opening, &points))
}

/// Transactions in `[start, end]` with the aggregate balance after each one.
///
/// Balances are computed over the whole period, planned rows included, before
/// the filter narrows the rows returned.
pub fn query(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
    filter: &TransactionFilter,
) -> Result<PeriodView> {
    if start > end {
        return Err(LedgerError::validation(format!(
            "period start {} is after end {}",
            start, end
        )));
    }
    let matcher = filter.matcher()?;

    let snap = read_snapshot(conn)?;
    let opening = opening_balance_for_period(&snap, start)?;
    let period = store::list_between(&snap, start, end)?;
    drop(snap);

    let points = balance::reconstruct_sorted(opening, &period, true)?;
    let projection_starts_at = balance::projection_boundary(&period);
    tracing::debug!(%start, %end, rows = period.len(), "period reconstructed");

    let mut transactions = Vec::new();
    let mut running_balances = Vec::new();
    for (tx, point) in period.into_iter().zip(points) {
        if filter.keeps(matcher.as_ref(), &tx) {
            running_balances.push(point.balance_after);
            transactions.push(tx);
        }
    }

    Ok(PeriodView {
        start_date: start,
        end_date: end,
        opening_balance_for_period: opening,
        transactions,
        running_balances,
        projection_starts_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{CategoryKind, NewAccount, NewTransaction, TransactionKind, TransactionState};
    use std::str::FromStr;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    struct Book {
        conn: Connection,
        salary: i64,
        food: i64,
    }

    fn book() -> Book {
        let mut conn = db::open_in_memory().unwrap();
        let bank = registry::create_account(
            &mut conn,
            &NewAccount { name: "Bank".into(), r#type: "checking".into(), opening_balance: Decimal::from(100_000) },
        )
        .unwrap()
        .id;
        let savings = registry::create_account(
            &mut conn,
            &NewAccount { name: "Savings".into(), r#type: "savings".into(), opening_balance: Decimal::ZERO },
        )
        .unwrap()
        .id;
        let salary = registry::create_category(&mut conn, "Salary", CategoryKind::Income).unwrap().id;
        let food = registry::create_category(&mut conn, "Food", CategoryKind::Expense).unwrap().id;

        let rows = [
            (d(2), "50000", TransactionKind::Income, "Payroll", None, Some(bank), Some(salary)),
            (d(5), "20000", TransactionKind::Expense, "Market run", Some(bank), None, Some(food)),
            (d(6), "10000", TransactionKind::Transfer, "Move to savings", Some(bank), Some(savings), None),
        ];
        for (date, amount, kind, description, origin, destination, category) in rows {
            store::create_transaction(
                &mut conn,
                &NewTransaction {
                    date,
                    amount: Decimal::from_str(amount).unwrap(),
                    kind,
                    state: TransactionState::Confirmed,
                    description: description.into(),
                    origin_account_id: origin,
                    destination_account_id: destination,
                    category_id: category,
                },
            )
            .unwrap();
        }
        Book { conn, salary, food }
    }

    #[test]
    fn running_balances_follow_the_period() {
        let b = book();
        let view = query(&b.conn, d(1), d(31), &TransactionFilter::default()).unwrap();
        assert_eq!(view.opening_balance_for_period, Decimal::from(100_000));
        assert_eq!(
            view.running_balances,
            vec![Decimal::from(150_000), Decimal::from(130_000), Decimal::from(130_000)]
        );
        assert_eq!(view.closing_balance(), Decimal::from(130_000));
        assert_eq!(view.projection_starts_at, None);
    }

    #[test]
    fn earlier_rows_roll_into_the_opening_balance() {
        let b = book();
        let view = query(&b.conn, d(5), d(5), &TransactionFilter::default()).unwrap();
        assert_eq!(view.opening_balance_for_period, Decimal::from(150_000));
        assert_eq!(view.transactions.len(), 1);
        assert_eq!(view.running_balances, vec![Decimal::from(130_000)]);
    }

    #[test]
    fn filtering_keeps_each_rows_balance() {
        let b = book();
        let by_text = TransactionFilter { text: Some("MARKET".into()), ..Default::default() };
        let view = query(&b.conn, d(1), d(31), &by_text).unwrap();
        assert_eq!(view.transactions.len(), 1);
        assert_eq!(view.running_balances, vec![Decimal::from(130_000)]);

        let by_category = TransactionFilter {
            category_ids: Some(BTreeSet::from([b.salary, b.food])),
            ..Default::default()
        };
        let view = query(&b.conn, d(1), d(31), &by_category).unwrap();
        let descriptions: Vec<_> = view.transactions.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(descriptions, ["Payroll", "Market run"]);
        assert_eq!(view.running_balances, vec![Decimal::from(150_000), Decimal::from(130_000)]);
    }

    #[test]
    fn search_text_is_literal() {
        let b = book();
        let f = TransactionFilter { text: Some("(".into()), ..Default::default() };
        assert!(query(&b.conn, d(1), d(31), &f).unwrap().transactions.is_empty());
    }

    #[test]
    fn planned_rows_project_but_do_not_open_later_periods() {
        let mut b = book();
        let planned = store::create_transaction(
            &mut b.conn,
            &NewTransaction {
                date: d(20),
                amount: Decimal::from(1_000),
                kind: TransactionKind::Expense,
                state: TransactionState::Planned,
                description: "Dinner".into(),
                origin_account_id: None,
                destination_account_id: None,
                category_id: Some(b.food),
            },
        )
        .unwrap();
        let view = query(&b.conn, d(1), d(31), &TransactionFilter::default()).unwrap();
        assert_eq!(view.projection_starts_at, Some(planned.id));
        assert_eq!(view.closing_balance(), Decimal::from(129_000));

        let april = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        let next = query(&b.conn, april, april, &TransactionFilter::default()).unwrap();
        assert_eq!(next.opening_balance_for_period, Decimal::from(130_000));
    }

    #[test]
    fn reversed_period_is_rejected() {
        let b = book();
        assert!(matches!(
            query(&b.conn, d(10), d(1), &TransactionFilter::default()),
            Err(LedgerError::Validation(_))
        ));
    }
}

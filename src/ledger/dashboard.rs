// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

use super::{read_snapshot, registry, scheduler, store};
use crate::error::{LedgerError, Result};
use crate::models::TransactionKind;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummary {
    pub month: u32,
    pub income: Decimal,
    pub expense: Decimal,
    pub net: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category_id: i64,
    pub name: String,
    pub total: Decimal,
}

fn year_bounds(year: i32) -> Result<(NaiveDate, NaiveDate)> {
    match (
        NaiveDate::from_ymd_opt(year, 1, 1),
        NaiveDate::from_ymd_opt(year, 12, 31),
    ) {
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Err(LedgerError::validation(format!("year {} is out of range", year))),
    }
}

/// Confirmed income and expense per month of `year`; all twelve months are present.
pub fn monthly_summary(conn: &Connection, year: i32) -> Result<Vec<MonthlySummary>> {
    let (start, end) = year_bounds(year)?;
    let txs = store::list_between(conn, start, end)?;

    let mut months: Vec<MonthlySummary> = (1..=12)
        .map(|month| MonthlySummary {
            month,
            income: Decimal::ZERO,
            expense: Decimal::ZERO,
            net: Decimal::ZERO,
        })
        .collect();
    for tx in txs.iter().filter(|tx| tx.is_confirmed()) {
        let slot = &mut months[tx.date.month0() as usize];
        match tx.kind {
            TransactionKind::Income => slot.income += tx.amount,
            TransactionKind::Expense => slot.expense += tx.amount,
            TransactionKind::Transfer => {}
        }
    }
    for m in &mut months {
        m.net = m.income - m.expense;
    }
    Ok(months)
}

/// Confirmed expenses of one month grouped by category, largest first.
pub fn category_expenses(conn: &Connection, year: i32, month: u32) -> Result<Vec<CategoryTotal>> {
    let last = scheduler::last_day_of_month(year, month)
        .ok_or_else(|| LedgerError::validation(format!("invalid month {}-{}", year, month)))?;
    let (start, end) = match (
        NaiveDate::from_ymd_opt(year, month, 1),
        NaiveDate::from_ymd_opt(year, month, last),
    ) {
        (Some(s), Some(e)) => (s, e),
        _ => return Err(LedgerError::validation(format!("invalid month {}-{}", year, month))),
    };

    let snap = read_snapshot(conn)?;
    let txs = store::list_between(&snap, start, end)?;
    let mut totals: HashMap<i64, Decimal> = HashMap::new();
    for tx in &txs {
        if !tx.is_confirmed() || tx.kind != TransactionKind::Expense {
            continue;
        }
        if let Some(category) = tx.category_id {
            *totals.entry(category).or_insert(Decimal::ZERO) += tx.amount;
        }
    }

    let mut out = Vec::with_capacity(totals.len());
    for (category_id, total) in totals {
        let name = registry::get_category(&snap, category_id)?.name;
        out.push(CategoryTotal {
            category_id,
            name,
            total,
        });
    }
    out.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
    Ok(out)
}

// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Expands recurring rules into planned transactions for one calendar month.
//!
//! A generated transaction carries `(recurring_rule_id, scheduled_date)`; a
//! date is skipped whenever a transaction with that key already exists, so a
//! period can be generated any number of times.

use chrono::{Datelike, NaiveDate};
use rusqlite::Connection;
use serde::Serialize;

use super::{rules, store, write_tx};
use crate::error::{LedgerError, Result};
use crate::models::{Frequency, RecurringRule, Transaction, TransactionState};

#[derive(Debug, Clone, Serialize)]
pub struct RuleFailure {
    pub rule_id: i64,
    pub description: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationReport {
    pub generated_count: usize,
    pub failures: Vec<RuleFailure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub transaction_ids: Vec<i64>,
}

pub fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some(next.signed_duration_since(first).num_days() as u32)
}

/// Dates in `(year, month)` the rule fires on, ascending.
pub fn occurrence_dates(rule: &RecurringRule, year: i32, month: u32) -> Vec<NaiveDate> {
    let Some(last) = last_day_of_month(year, month) else {
        return Vec::new();
    };
    let clamped = |day: u32| NaiveDate::from_ymd_opt(year, month, day.min(last));
    match rule.frequency {
        Frequency::Monthly => clamped(rule.day).into_iter().collect(),
        Frequency::Annual if rule.month == Some(month) => clamped(rule.day).into_iter().collect(),
        Frequency::Annual => Vec::new(),
        Frequency::Weekly => (1..=last)
            .filter_map(|d| NaiveDate::from_ymd_opt(year, month, d))
            .filter(|date| date.weekday().num_days_from_monday() == rule.day)
            .collect(),
    }
}

fn planned_from(rule: &RecurringRule, date: NaiveDate) -> Transaction {
    Transaction {
        id: 0,
        date,
        amount: rule.default_amount,
        kind: rule.kind.into(),
        state: TransactionState::Planned,
        description: rule.description.clone(),
        origin_account_id: None,
        destination_account_id: None,
        category_id: rule.default_category_id,
        recurring_rule_id: Some(rule.id),
        scheduled_date: Some(date),
    }
}

fn generate_rule(conn: &Connection, rule: &RecurringRule, year: i32, month: u32) -> Result<Vec<i64>> {
    rules::validate_shape(rule)?;
    let mut ids = Vec::new();
    for date in occurrence_dates(rule, year, month) {
        if store::schedule_key_exists(conn, rule.id, date)? {
            continue;
        }
        let planned = planned_from(rule, date);
        store::validate(conn, &planned)?;
        ids.push(store::insert(conn, &planned)?);
    }
    Ok(ids)
}

/// Generates the planned transactions of every active rule for `(year, month)`.
///
/// A rule that fails is skipped and reported; the other rules still commit.
/// Storage failures abort the whole batch.
pub fn generate_for_period(conn: &mut Connection, year: i32, month: u32) -> Result<GenerationReport> {
    if !(1..=12).contains(&month) {
        return Err(LedgerError::validation(format!("month must be 1-12, got {}", month)));
    }
    if last_day_of_month(year, month).is_none() {
        return Err(LedgerError::validation(format!("year {} is out of range", year)));
    }

    let mut db = write_tx(conn)?;
    let active = rules::scan_rules(&db, true)?;
    tracing::debug!(year, month, rules = active.len(), "generating planned transactions");

    let mut report = GenerationReport::default();
    for stored in active {
        let outcome = match stored.decoded {
            Ok(rule) => {
                let sp = db.savepoint()?;
                let generated = generate_rule(&sp, &rule, year, month);
                if generated.is_ok() {
                    sp.commit()?;
                }
                generated
            }
            Err(err) => Err(err),
        };
        match outcome {
            Ok(ids) => report.transaction_ids.extend(ids),
            Err(LedgerError::Storage(e)) => return Err(LedgerError::Storage(e)),
            Err(err) => {
                tracing::warn!(rule_id = stored.id, error = %err, "recurring rule skipped");
                report.failures.push(RuleFailure {
                    rule_id: stored.id,
                    description: stored.description,
                    error: err.to_string(),
                });
            }
        }
    }
    db.commit()?;

    report.generated_count = report.transaction_ids.len();
    tracing::info!(
        year,
        month,
        generated = report.generated_count,
        failed = report.failures.len(),
        "planned transactions generated"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::ledger::registry;
    use crate::models::{CategoryKind, CategoryPatch, NewRule};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn rule(frequency: Frequency, day: u32, month: Option<u32>) -> RecurringRule {
        RecurringRule {
            id: 1,
            description: "Rent".into(),
            default_amount: Decimal::from(1200),
            kind: CategoryKind::Expense,
            frequency,
            day,
            month,
            default_category_id: None,
            active: true,
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn monthly_day_31_clamps_to_month_end() {
        let r = rule(Frequency::Monthly, 31, None);
        assert_eq!(occurrence_dates(&r, 2025, 4), vec![d(2025, 4, 30)]);
        assert_eq!(occurrence_dates(&r, 2025, 2), vec![d(2025, 2, 28)]);
        assert_eq!(occurrence_dates(&r, 2024, 2), vec![d(2024, 2, 29)]);
        assert_eq!(occurrence_dates(&r, 2025, 1), vec![d(2025, 1, 31)]);
    }

    #[test]
    fn annual_fires_only_in_its_month() {
        let r = rule(Frequency::Annual, 30, Some(2));
        assert!(occurrence_dates(&r, 2025, 3).is_empty());
        assert_eq!(occurrence_dates(&r, 2025, 2), vec![d(2025, 2, 28)]);
    }

    #[test]
    fn weekly_fires_on_every_matching_weekday() {
        // September 2025 starts on a Monday and has five of them.
        let mondays = occurrence_dates(&rule(Frequency::Weekly, 0, None), 2025, 9);
        assert_eq!(mondays.len(), 5);
        assert_eq!(mondays[0], d(2025, 9, 1));
        let sundays = occurrence_dates(&rule(Frequency::Weekly, 6, None), 2025, 9);
        assert_eq!(sundays.first(), Some(&d(2025, 9, 7)));
        assert_eq!(sundays.len(), 4);
    }

    #[test]
    fn last_day_handles_december() {
        assert_eq!(last_day_of_month(2025, 12), Some(31));
        assert_eq!(last_day_of_month(2025, 13), None);
    }

    #[test]
    fn weekly_monday_rule_generates_once_per_monday() {
        let mut conn = db::open_in_memory().unwrap();
        let r = rules::create_rule(
            &mut conn,
            &NewRule {
                description: "Groceries".into(),
                default_amount: Decimal::from_str("5000").unwrap(),
                kind: CategoryKind::Expense,
                frequency: Frequency::Weekly,
                day: 0,
                month: None,
                default_category_id: None,
            },
        )
        .unwrap();

        // February 2025 has exactly four Mondays.
        let first = generate_for_period(&mut conn, 2025, 2).unwrap();
        assert_eq!(first.generated_count, 4);
        assert!(first.failures.is_empty());

        let txs = store::list_all(&conn).unwrap();
        assert_eq!(txs.len(), 4);
        for tx in &txs {
            assert!(tx.is_planned());
            assert_eq!(tx.recurring_rule_id, Some(r.id));
            assert_eq!(tx.description, "Groceries");
            assert_eq!(tx.origin_account_id, None);
            assert_eq!(tx.date.weekday().num_days_from_monday(), 0);
        }

        let second = generate_for_period(&mut conn, 2025, 2).unwrap();
        assert_eq!(second.generated_count, 0);
        assert_eq!(store::list_all(&conn).unwrap(), txs);
    }

    #[test]
    fn broken_rule_is_reported_and_others_still_generate() {
        let mut conn = db::open_in_memory().unwrap();
        let housing = registry::create_category(&mut conn, "Housing", CategoryKind::Expense).unwrap();
        let base = NewRule {
            description: "Rent".into(),
            default_amount: Decimal::from(900),
            kind: CategoryKind::Expense,
            frequency: Frequency::Monthly,
            day: 1,
            month: None,
            default_category_id: Some(housing.id),
        };
        let broken = rules::create_rule(&mut conn, &base).unwrap();
        let fine = rules::create_rule(
            &mut conn,
            &NewRule { description: "Gym".into(), default_category_id: None, ..base.clone() },
        )
        .unwrap();

        // Category flips kind after the rule was saved; nothing references it yet.
        registry::update_category(
            &mut conn,
            housing.id,
            &CategoryPatch { kind: Some(CategoryKind::Income), ..Default::default() },
        )
        .unwrap();

        let report = generate_for_period(&mut conn, 2025, 3).unwrap();
        assert_eq!(report.generated_count, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].rule_id, broken.id);

        let txs = store::list_all(&conn).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].recurring_rule_id, Some(fine.id));
    }

    #[test]
    fn undecodable_rule_rows_fail_alone() {
        let mut conn = db::open_in_memory().unwrap();
        let base = NewRule {
            description: "Rent".into(),
            default_amount: Decimal::from(900),
            kind: CategoryKind::Expense,
            frequency: Frequency::Monthly,
            day: 1,
            month: None,
            default_category_id: None,
        };
        let negative_day = rules::create_rule(&mut conn, &base).unwrap();
        let bad_amount = rules::create_rule(
            &mut conn,
            &NewRule { description: "Phone".into(), ..base.clone() },
        )
        .unwrap();
        let fine = rules::create_rule(
            &mut conn,
            &NewRule { description: "Gym".into(), ..base.clone() },
        )
        .unwrap();
        conn.execute(
            "UPDATE recurring_rules SET day=-3 WHERE id=?1",
            [negative_day.id],
        )
        .unwrap();
        conn.execute(
            "UPDATE recurring_rules SET default_amount='lots' WHERE id=?1",
            [bad_amount.id],
        )
        .unwrap();

        let report = generate_for_period(&mut conn, 2025, 3).unwrap();
        assert_eq!(report.generated_count, 1);
        let failed: Vec<i64> = report.failures.iter().map(|f| f.rule_id).collect();
        assert_eq!(failed, vec![negative_day.id, bad_amount.id]);
        assert_eq!(report.failures[1].description, "Phone");

        let txs = store::list_all(&conn).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].recurring_rule_id, Some(fine.id));
    }

    #[test]
    fn inactive_rules_and_bad_months() {
        let mut conn = db::open_in_memory().unwrap();
        let r = rules::create_rule(
            &mut conn,
            &NewRule {
                description: "Insurance".into(),
                default_amount: Decimal::from(300),
                kind: CategoryKind::Expense,
                frequency: Frequency::Annual,
                day: 15,
                month: Some(6),
                default_category_id: None,
            },
        )
        .unwrap();
        rules::set_rule_active(&mut conn, r.id, false).unwrap();
        assert_eq!(generate_for_period(&mut conn, 2025, 6).unwrap().generated_count, 0);

        rules::set_rule_active(&mut conn, r.id, true).unwrap();
        assert_eq!(generate_for_period(&mut conn, 2025, 5).unwrap().generated_count, 0);
        assert_eq!(generate_for_period(&mut conn, 2025, 6).unwrap().generated_count, 1);

        for month in [0, 13] {
            assert!(matches!(
                generate_for_period(&mut conn, 2025, month),
                Err(LedgerError::Validation(_))
            ));
        }
    }

    #[test]
    fn confirmed_occurrence_still_blocks_regeneration() {
        let mut conn = db::open_in_memory().unwrap();
        let salary = registry::create_category(&mut conn, "Salary", CategoryKind::Income).unwrap();
        let bank = registry::create_account(
            &mut conn,
            &crate::models::NewAccount {
                name: "Bank".into(),
                r#type: "checking".into(),
                opening_balance: Decimal::ZERO,
            },
        )
        .unwrap();
        rules::create_rule(
            &mut conn,
            &NewRule {
                description: "Salary".into(),
                default_amount: Decimal::from(3000),
                kind: CategoryKind::Income,
                frequency: Frequency::Monthly,
                day: 25,
                month: None,
                default_category_id: Some(salary.id),
            },
        )
        .unwrap();
        let report = generate_for_period(&mut conn, 2025, 1).unwrap();
        let id = report.transaction_ids[0];
        store::update_transaction(
            &mut conn,
            id,
            &crate::models::TransactionPatch {
                destination_account_id: Some(Some(bank.id)),
                state: Some(TransactionState::Confirmed),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(generate_for_period(&mut conn, 2025, 1).unwrap().generated_count, 0);
        assert_eq!(
            registry::get_account(&conn, bank.id).unwrap().current_balance,
            Decimal::from(3000)
        );
    }
}

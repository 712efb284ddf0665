// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Recurring rule registry.

use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;

use super::{registry, required_text, stored_decimal, stored_label, write_tx};
use crate::error::{LedgerError, Result};
use crate::models::{Frequency, NewRule, RecurringRule, RulePatch};

const COLUMNS: &str =
    "id, description, default_amount, kind, frequency, day, month, default_category_id, active";

type RawRule = (
    i64,
    String,
    String,
    String,
    String,
    i64,
    Option<i64>,
    Option<i64>,
    bool,
);

fn read_rule(r: &rusqlite::Row<'_>) -> rusqlite::Result<RawRule> {
    Ok((
        r.get(0)?,
        r.get(1)?,
        r.get(2)?,
        r.get(3)?,
        r.get(4)?,
        r.get(5)?,
        r.get(6)?,
        r.get(7)?,
        r.get(8)?,
    ))
}

fn to_rule(raw: RawRule) -> Result<RecurringRule> {
    let (id, description, amount, kind, frequency, day, month, category, active) = raw;
    let day = u32::try_from(day)
        .map_err(|_| LedgerError::Corrupt(format!("rule {} day {}", id, day)))?;
    let month = month
        .map(|m| u32::try_from(m).map_err(|_| LedgerError::Corrupt(format!("rule {} month {}", id, m))))
        .transpose()?;
    Ok(RecurringRule {
        id,
        description,
        default_amount: stored_decimal(&amount, "rule amount")?,
        kind: stored_label(&kind, "rule kind")?,
        frequency: stored_label(&frequency, "rule frequency")?,
        day,
        month,
        default_category_id: category,
        active,
    })
}

/// Shape rules for a recurring rule; no database access.
pub fn validate_shape(rule: &RecurringRule) -> Result<()> {
    if rule.description.trim().is_empty() {
        return Err(LedgerError::validation("rule description must not be empty"));
    }
    if rule.default_amount <= Decimal::ZERO {
        return Err(LedgerError::validation(format!(
            "rule amount must be positive, got {}",
            rule.default_amount
        )));
    }
    match rule.frequency {
        Frequency::Monthly | Frequency::Annual if !(1..=31).contains(&rule.day) => {
            return Err(LedgerError::validation(format!(
                "day of month must be 1-31, got {}",
                rule.day
            )));
        }
        Frequency::Weekly if rule.day > 6 => {
            return Err(LedgerError::validation(format!(
                "weekday must be 0 (Monday) to 6 (Sunday), got {}",
                rule.day
            )));
        }
        _ => {}
    }
    match (rule.frequency, rule.month) {
        (Frequency::Annual, None) => Err(LedgerError::validation("annual rules need a month")),
        (Frequency::Annual, Some(m)) if !(1..=12).contains(&m) => Err(LedgerError::validation(
            format!("month must be 1-12, got {}", m),
        )),
        (Frequency::Monthly | Frequency::Weekly, Some(_)) => Err(LedgerError::validation(
            "only annual rules take a month",
        )),
        _ => Ok(()),
    }
}

fn validate(conn: &Connection, rule: &RecurringRule) -> Result<()> {
    validate_shape(rule)?;
    if let Some(category) = rule.default_category_id {
        registry::resolve_category(conn, category, rule.kind)?;
    }
    Ok(())
}

pub fn get_rule(conn: &Connection, id: i64) -> Result<RecurringRule> {
    let sql = format!("SELECT {} FROM recurring_rules WHERE id=?1", COLUMNS);
    let raw = conn
        .query_row(&sql, params![id], read_rule)
        .optional()?
        .ok_or_else(|| LedgerError::not_found("recurring rule", id))?;
    to_rule(raw)
}

/// A stored rule row whose fields have not been checked yet.
pub(crate) struct StoredRule {
    pub id: i64,
    pub description: String,
    pub decoded: Result<RecurringRule>,
}

/// Rows in id order, each decoded on its own; only storage errors fail the scan.
pub(crate) fn scan_rules(conn: &Connection, active_only: bool) -> Result<Vec<StoredRule>> {
    let sql = if active_only {
        format!("SELECT {} FROM recurring_rules WHERE active=1 ORDER BY id", COLUMNS)
    } else {
        format!("SELECT {} FROM recurring_rules ORDER BY id", COLUMNS)
    };
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map([], read_rule)?;
    let mut out = Vec::new();
    for row in rows {
        let raw = row?;
        out.push(StoredRule {
            id: raw.0,
            description: raw.1.clone(),
            decoded: to_rule(raw),
        });
    }
    Ok(out)
}

pub fn list_rules(conn: &Connection, active_only: bool) -> Result<Vec<RecurringRule>> {
    scan_rules(conn, active_only)?
        .into_iter()
        .map(|stored| stored.decoded)
        .collect()
}

pub fn create_rule(conn: &mut Connection, new: &NewRule) -> Result<RecurringRule> {
    let mut rule = RecurringRule {
        id: 0,
        description: required_text(&new.description, "rule description")?,
        default_amount: new.default_amount,
        kind: new.kind,
        frequency: new.frequency,
        day: new.day,
        month: new.month,
        default_category_id: new.default_category_id,
        active: true,
    };
    validate_shape(&rule)?;

    let tx = write_tx(conn)?;
    validate(&tx, &rule)?;
    tx.execute(
        "INSERT INTO recurring_rules(description, default_amount, kind, frequency, day, month,
             default_category_id, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1)",
        params![
            rule.description,
            rule.default_amount.to_string(),
            rule.kind.as_str(),
            rule.frequency.as_str(),
            rule.day,
            rule.month,
            rule.default_category_id,
        ],
    )?;
    rule.id = tx.last_insert_rowid();
    tx.commit()?;
    tracing::info!(rule_id = rule.id, frequency = %rule.frequency, "recurring rule created");
    Ok(rule)
}

pub fn update_rule(conn: &mut Connection, id: i64, patch: &RulePatch) -> Result<RecurringRule> {
    let tx = write_tx(conn)?;
    let mut rule = get_rule(&tx, id)?;
    if let Some(ref d) = patch.description {
        rule.description = required_text(d, "rule description")?;
    }
    if let Some(amount) = patch.default_amount {
        rule.default_amount = amount;
    }
    if let Some(kind) = patch.kind {
        rule.kind = kind;
    }
    if let Some(frequency) = patch.frequency {
        rule.frequency = frequency;
    }
    if let Some(day) = patch.day {
        rule.day = day;
    }
    if let Some(month) = patch.month {
        rule.month = month;
    }
    if let Some(category) = patch.default_category_id {
        rule.default_category_id = category;
    }
    if let Some(active) = patch.active {
        rule.active = active;
    }
    validate(&tx, &rule)?;
    tx.execute(
        "UPDATE recurring_rules SET description=?1, default_amount=?2, kind=?3, frequency=?4,
             day=?5, month=?6, default_category_id=?7, active=?8
         WHERE id=?9",
        params![
            rule.description,
            rule.default_amount.to_string(),
            rule.kind.as_str(),
            rule.frequency.as_str(),
            rule.day,
            rule.month,
            rule.default_category_id,
            rule.active,
            id
        ],
    )?;
    tx.commit()?;
    tracing::info!(rule_id = id, "recurring rule updated");
    Ok(rule)
}

/// Pauses or resumes a rule without touching anything else about it.
pub fn set_rule_active(conn: &mut Connection, id: i64, active: bool) -> Result<RecurringRule> {
    let tx = write_tx(conn)?;
    let mut rule = get_rule(&tx, id)?;
    tx.execute(
        "UPDATE recurring_rules SET active=?1 WHERE id=?2",
        params![active, id],
    )?;
    tx.commit()?;
    rule.active = active;
    tracing::info!(rule_id = id, active, "recurring rule toggled");
    Ok(rule)
}

/// Deletes a rule. Transactions it generated stay, detached from the rule.
pub fn delete_rule(conn: &mut Connection, id: i64) -> Result<usize> {
    let tx = write_tx(conn)?;
    get_rule(&tx, id)?;
    let detached = tx.execute(
        "UPDATE transactions SET recurring_rule_id=NULL, scheduled_date=NULL
         WHERE recurring_rule_id=?1",
        params![id],
    )?;
    tx.execute("DELETE FROM recurring_rules WHERE id=?1", params![id])?;
    tx.commit()?;
    tracing::info!(rule_id = id, detached, "recurring rule deleted");
    Ok(detached)
}

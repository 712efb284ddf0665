// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Consistency checks over stored data that the write path cannot prevent
//! on its own (stale planned rows, rules drifting from their categories).

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;

use super::{read_snapshot, registry, rules, store};
use crate::error::{LedgerError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub code: &'static str,
    pub detail: String,
}

pub fn diagnose(conn: &Connection, today: NaiveDate) -> Result<Vec<Issue>> {
    let snap = read_snapshot(conn)?;
    let mut issues = Vec::new();

    // 1) Planned rows already due that still cannot be confirmed
    for tx in store::list_before(&snap, today)? {
        if !tx.is_planned() {
            continue;
        }
        let missing_origin = tx.kind.takes_origin() && tx.origin_account_id.is_none();
        let missing_destination = tx.kind.takes_destination() && tx.destination_account_id.is_none();
        if missing_origin || missing_destination {
            issues.push(Issue {
                code: "overdue_planned_without_account",
                detail: format!("#{} {} {} {}", tx.id, tx.date, tx.kind, tx.description),
            });
        }
    }

    // 2) Active rules whose default category drifted
    let all_rules = rules::list_rules(&snap, false)?;
    for rule in all_rules.iter().filter(|r| r.active) {
        let Some(category) = rule.default_category_id else {
            continue;
        };
        match registry::resolve_category(&snap, category, rule.kind) {
            Ok(_) => {}
            Err(LedgerError::InconsistentReference(msg)) => issues.push(Issue {
                code: "rule_category_mismatch",
                detail: format!("rule #{} '{}': {}", rule.id, rule.description, msg),
            }),
            Err(e) => return Err(e),
        }
    }

    // 3) Rule links pointing nowhere
    let mut stmt = snap.prepare(
        "SELECT t.id, t.recurring_rule_id FROM transactions t
         LEFT JOIN recurring_rules r ON r.id = t.recurring_rule_id
         WHERE t.recurring_rule_id IS NOT NULL AND r.id IS NULL
         ORDER BY t.id",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let tx_id: i64 = r.get(0)?;
        let rule_id: i64 = r.get(1)?;
        issues.push(Issue {
            code: "orphaned_rule_link",
            detail: format!("transaction #{} -> rule #{}", tx_id, rule_id),
        });
    }

    tracing::debug!(issues = issues.len(), "doctor finished");
    Ok(issues)
}

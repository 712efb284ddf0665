// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Transaction store: the only owner of transaction rows.
//!
//! Writes validate the whole record before touching the database: shape
//! problems are `Validation`, dangling or mismatched ids are
//! `InconsistentReference`.

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;

use super::{registry, stored_decimal, stored_label, write_tx};
use crate::error::{LedgerError, Result};
use crate::models::{
    NewTransaction, Transaction, TransactionKind, TransactionPatch, TransactionState,
};

const COLUMNS: &str = "id, date, amount, kind, state, description, origin_account_id, \
     destination_account_id, category_id, recurring_rule_id, scheduled_date";

struct TxRow {
    id: i64,
    date: NaiveDate,
    amount: String,
    kind: String,
    state: String,
    description: String,
    origin_account_id: Option<i64>,
    destination_account_id: Option<i64>,
    category_id: Option<i64>,
    recurring_rule_id: Option<i64>,
    scheduled_date: Option<NaiveDate>,
}

impl TxRow {
    fn read(r: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: r.get(0)?,
            date: r.get(1)?,
            amount: r.get(2)?,
            kind: r.get(3)?,
            state: r.get(4)?,
            description: r.get(5)?,
            origin_account_id: r.get(6)?,
            destination_account_id: r.get(7)?,
            category_id: r.get(8)?,
            recurring_rule_id: r.get(9)?,
            scheduled_date: r.get(10)?,
        })
    }

    fn into_model(self) -> Result<Transaction> {
        Ok(Transaction {
            id: self.id,
            date: self.date,
            amount: stored_decimal(&self.amount, "transaction amount")?,
            kind: stored_label(&self.kind, "transaction kind")?,
            state: stored_label(&self.state, "transaction state")?,
            description: self.description,
            origin_account_id: self.origin_account_id,
            destination_account_id: self.destination_account_id,
            category_id: self.category_id,
            recurring_rule_id: self.recurring_rule_id,
            scheduled_date: self.scheduled_date,
        })
    }
}

fn select<P: rusqlite::Params>(conn: &Connection, filter: &str, args: P) -> Result<Vec<Transaction>> {
    let sql = format!(
        "SELECT {} FROM transactions {} ORDER BY date, id",
        COLUMNS, filter
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map(args, TxRow::read)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?.into_model()?);
    }
    Ok(out)
}

/// All transactions in `(date, id)` order.
pub fn list_all(conn: &Connection) -> Result<Vec<Transaction>> {
    select(conn, "", [])
}

/// Transactions dated within `[start, end]`, both inclusive.
pub fn list_between(conn: &Connection, start: NaiveDate, end: NaiveDate) -> Result<Vec<Transaction>> {
    select(conn, "WHERE date >= ?1 AND date <= ?2", params![start, end])
}

/// Transactions dated strictly before `date`.
pub fn list_before(conn: &Connection, date: NaiveDate) -> Result<Vec<Transaction>> {
    select(conn, "WHERE date < ?1", params![date])
}

pub fn list_touching_account(conn: &Connection, account_id: i64) -> Result<Vec<Transaction>> {
    select(
        conn,
        "WHERE origin_account_id = ?1 OR destination_account_id = ?1",
        params![account_id],
    )
}

pub fn get_transaction(conn: &Connection, id: i64) -> Result<Transaction> {
    let sql = format!("SELECT {} FROM transactions WHERE id=?1", COLUMNS);
    conn.query_row(&sql, params![id], TxRow::read)
        .optional()?
        .ok_or_else(|| LedgerError::not_found("transaction", id))?
        .into_model()
}

pub fn count_account_references(conn: &Connection, account_id: i64) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM transactions WHERE origin_account_id=?1 OR destination_account_id=?1",
        params![account_id],
        |r| r.get(0),
    )?)
}

pub fn count_category_references(conn: &Connection, category_id: i64) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM transactions WHERE category_id=?1",
        params![category_id],
        |r| r.get(0),
    )?)
}

/// Shape rules that need no database access.
pub fn validate_shape(tx: &Transaction) -> Result<()> {
    if tx.amount <= Decimal::ZERO {
        return Err(LedgerError::validation(format!(
            "amount must be positive, got {}",
            tx.amount
        )));
    }
    let kind = tx.kind;
    if tx.origin_account_id.is_some() && !kind.takes_origin() {
        return Err(LedgerError::validation(format!(
            "{} transactions have no origin account",
            kind
        )));
    }
    if tx.destination_account_id.is_some() && !kind.takes_destination() {
        return Err(LedgerError::validation(format!(
            "{} transactions have no destination account",
            kind
        )));
    }
    if tx.category_id.is_some() && kind.category_kind().is_none() {
        return Err(LedgerError::validation("transfers cannot carry a category"));
    }
    if let TransactionKind::Transfer = kind {
        match (tx.origin_account_id, tx.destination_account_id) {
            (Some(o), Some(d)) if o == d => {
                return Err(LedgerError::validation(
                    "transfer origin and destination must differ",
                ));
            }
            (Some(_), Some(_)) => {}
            _ => {
                return Err(LedgerError::validation(
                    "transfers need both an origin and a destination account",
                ));
            }
        }
    }

    // A planned income or expense may still be missing its account; a confirmed one may not.
    if tx.is_confirmed() {
        let missing = match kind {
            TransactionKind::Income => tx.destination_account_id.is_none(),
            TransactionKind::Expense => tx.origin_account_id.is_none(),
            TransactionKind::Transfer => false,
        };
        if missing {
            return Err(LedgerError::validation(format!(
                "confirmed {} transaction is missing an account",
                kind
            )));
        }
        if kind.category_kind().is_some() && tx.category_id.is_none() {
            return Err(LedgerError::validation(format!(
                "confirmed {} transaction needs a category",
                kind
            )));
        }
    }
    Ok(())
}

/// Full check: shape first, then every referenced id against the registries.
pub fn validate(conn: &Connection, tx: &Transaction) -> Result<()> {
    validate_shape(tx)?;
    for account in [tx.origin_account_id, tx.destination_account_id]
        .into_iter()
        .flatten()
    {
        registry::ensure_account(conn, account)?;
    }
    if let (Some(category), Some(expected)) = (tx.category_id, tx.kind.category_kind()) {
        registry::resolve_category(conn, category, expected)?;
    }
    Ok(())
}

/// Inserts an already validated record and returns its id.
pub(crate) fn insert(conn: &Connection, tx: &Transaction) -> Result<i64> {
    conn.execute(
        "INSERT INTO transactions(date, amount, kind, state, description, origin_account_id,
             destination_account_id, category_id, recurring_rule_id, scheduled_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            tx.date,
            tx.amount.to_string(),
            tx.kind.as_str(),
            tx.state.as_str(),
            tx.description,
            tx.origin_account_id,
            tx.destination_account_id,
            tx.category_id,
            tx.recurring_rule_id,
            tx.scheduled_date,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn create_transaction(conn: &mut Connection, new: &NewTransaction) -> Result<Transaction> {
    let mut record = Transaction {
        id: 0,
        date: new.date,
        amount: new.amount,
        kind: new.kind,
        state: new.state,
        description: new.description.trim().to_string(),
        origin_account_id: new.origin_account_id,
        destination_account_id: new.destination_account_id,
        category_id: new.category_id,
        recurring_rule_id: None,
        scheduled_date: None,
    };
    validate_shape(&record)?;

    let db = write_tx(conn)?;
    validate(&db, &record)?;
    record.id = insert(&db, &record)?;
    db.commit()?;
    tracing::info!(
        transaction_id = record.id,
        kind = %record.kind,
        state = %record.state,
        amount = %record.amount,
        "transaction created"
    );
    Ok(record)
}

fn apply_patch(mut tx: Transaction, patch: &TransactionPatch) -> Transaction {
    if let Some(date) = patch.date {
        tx.date = date;
    }
    if let Some(amount) = patch.amount {
        tx.amount = amount;
    }
    if let Some(kind) = patch.kind {
        tx.kind = kind;
    }
    if let Some(state) = patch.state {
        tx.state = state;
    }
    if let Some(ref description) = patch.description {
        tx.description = description.trim().to_string();
    }
    if let Some(origin) = patch.origin_account_id {
        tx.origin_account_id = origin;
    }
    if let Some(destination) = patch.destination_account_id {
        tx.destination_account_id = destination;
    }
    if let Some(category) = patch.category_id {
        tx.category_id = category;
    }
    tx
}

/// Applies an edit and validates the merged record as a whole.
pub fn update_transaction(
    conn: &mut Connection,
    id: i64,
    patch: &TransactionPatch,
) -> Result<Transaction> {
    let db = write_tx(conn)?;
    let current = get_transaction(&db, id)?;
    let was = current.state;
    let updated = apply_patch(current, patch);
    validate(&db, &updated)?;
    db.execute(
        "UPDATE transactions SET date=?1, amount=?2, kind=?3, state=?4, description=?5,
             origin_account_id=?6, destination_account_id=?7, category_id=?8
         WHERE id=?9",
        params![
            updated.date,
            updated.amount.to_string(),
            updated.kind.as_str(),
            updated.state.as_str(),
            updated.description,
            updated.origin_account_id,
            updated.destination_account_id,
            updated.category_id,
            id
        ],
    )?;
    db.commit()?;
    if was != updated.state {
        tracing::info!(transaction_id = id, from = %was, to = %updated.state, "transaction state changed");
    } else {
        tracing::info!(transaction_id = id, "transaction updated");
    }
    Ok(updated)
}

/// Planned -> Confirmed. Fails like any edit if required fields are still missing.
pub fn confirm_transaction(conn: &mut Connection, id: i64) -> Result<Transaction> {
    update_transaction(
        conn,
        id,
        &TransactionPatch {
            state: Some(TransactionState::Confirmed),
            ..Default::default()
        },
    )
}

pub fn delete_transaction(conn: &mut Connection, id: i64) -> Result<()> {
    let db = write_tx(conn)?;
    let n = db.execute("DELETE FROM transactions WHERE id=?1", params![id])?;
    if n == 0 {
        return Err(LedgerError::not_found("transaction", id));
    }
    db.commit()?;
    tracing::info!(transaction_id = id, "transaction deleted");
    Ok(())
}

/// True when a transaction already carries the `(rule, scheduled date)` key.
pub(crate) fn schedule_key_exists(conn: &Connection, rule_id: i64, date: NaiveDate) -> Result<bool> {
    let hit: Option<i64> = conn
        .query_row(
            "SELECT id FROM transactions WHERE recurring_rule_id=?1 AND scheduled_date=?2",
            params![rule_id, date],
            |r| r.get(0),
        )
        .optional()?;
    Ok(hit.is_some())
}

// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Account and category registries.

use std::collections::HashSet;

use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;

use super::{balance, read_snapshot, required_text, store, stored_decimal, stored_label, write_tx};
use crate::error::{LedgerError, Result};
use crate::models::{
    Account, AccountPatch, Category, CategoryKind, CategoryPatch, NewAccount, Transaction,
};

struct AccountRow {
    id: i64,
    name: String,
    r#type: String,
    opening_balance: String,
}

impl AccountRow {
    fn read(r: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: r.get(0)?,
            name: r.get(1)?,
            r#type: r.get(2)?,
            opening_balance: r.get(3)?,
        })
    }

    /// Attaches the derived current balance.
    fn into_account(
        self,
        transactions: &[Transaction],
        known: &HashSet<i64>,
    ) -> Result<Account> {
        let opening = stored_decimal(&self.opening_balance, "opening balance")?;
        let points = balance::reconstruct_for_account(self.id, opening, transactions, known)?;
        Ok(Account {
            id: self.id,
            name: self.name,
            r#type: self.r#type,
            opening_balance: opening,
            current_balance: balance::final_balance(opening, &points),
        })
    }
}

fn account_rows(conn: &Connection) -> Result<Vec<AccountRow>> {
    let mut stmt =
        conn.prepare_cached("SELECT id, name, type, opening_balance FROM accounts ORDER BY name, id")?;
    let rows = stmt.query_map([], AccountRow::read)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn account_row(conn: &Connection, id: i64) -> Result<AccountRow> {
    conn.query_row(
        "SELECT id, name, type, opening_balance FROM accounts WHERE id=?1",
        params![id],
        AccountRow::read,
    )
    .optional()?
    .ok_or_else(|| LedgerError::not_found("account", id))
}

pub fn account_ids(conn: &Connection) -> Result<HashSet<i64>> {
    let mut stmt = conn.prepare_cached("SELECT id FROM accounts")?;
    let rows = stmt.query_map([], |r| r.get::<_, i64>(0))?;
    let mut ids = HashSet::new();
    for id in rows {
        ids.insert(id?);
    }
    Ok(ids)
}

pub fn get_account(conn: &Connection, id: i64) -> Result<Account> {
    let snap = read_snapshot(conn)?;
    let row = account_row(&snap, id)?;
    let txs = store::list_touching_account(&snap, id)?;
    row.into_account(&txs, &account_ids(&snap)?)
}

pub fn list_accounts(conn: &Connection) -> Result<Vec<Account>> {
    let snap = read_snapshot(conn)?;
    let rows = account_rows(&snap)?;
    let txs = store::list_all(&snap)?;
    let known = account_ids(&snap)?;
    rows.into_iter()
        .map(|row| row.into_account(&txs, &known))
        .collect()
}

/// Sum of every account's current balance.
pub fn total_balance(conn: &Connection) -> Result<Decimal> {
    Ok(list_accounts(conn)?
        .iter()
        .map(|a| a.current_balance)
        .sum())
}

/// Sum of every account's opening balance: the aggregate before any transaction.
pub fn opening_total(conn: &Connection) -> Result<Decimal> {
    let mut total = Decimal::ZERO;
    for row in account_rows(conn)? {
        total += stored_decimal(&row.opening_balance, "opening balance")?;
    }
    Ok(total)
}

pub fn create_account(conn: &mut Connection, new: &NewAccount) -> Result<Account> {
    let name = required_text(&new.name, "account name")?;
    let typ = required_text(&new.r#type, "account type")?;

    let tx = write_tx(conn)?;
    ensure_account_name_free(&tx, &name, None)?;
    tx.execute(
        "INSERT INTO accounts(name, type, opening_balance) VALUES (?1, ?2, ?3)",
        params![name, typ, new.opening_balance.to_string()],
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;
    tracing::info!(account_id = id, %name, "account created");

    Ok(Account {
        id,
        name,
        r#type: typ,
        opening_balance: new.opening_balance,
        current_balance: new.opening_balance,
    })
}

/// Renames or retypes an account. The opening balance is fixed at creation.
pub fn update_account(conn: &mut Connection, id: i64, patch: &AccountPatch) -> Result<Account> {
    if patch.opening_balance.is_some() {
        return Err(LedgerError::validation(
            "opening balance cannot be changed after creation",
        ));
    }
    let name = patch
        .name
        .as_deref()
        .map(|n| required_text(n, "account name"))
        .transpose()?;
    let typ = patch
        .r#type
        .as_deref()
        .map(|t| required_text(t, "account type"))
        .transpose()?;

    let tx = write_tx(conn)?;
    let current = account_row(&tx, id)?;
    if let Some(ref n) = name {
        ensure_account_name_free(&tx, n, Some(id))?;
    }
    tx.execute(
        "UPDATE accounts SET name=?1, type=?2 WHERE id=?3",
        params![
            name.unwrap_or(current.name),
            typ.unwrap_or(current.r#type),
            id
        ],
    )?;
    tx.commit()?;
    tracing::info!(account_id = id, "account updated");
    get_account(conn, id)
}

pub fn delete_account(conn: &mut Connection, id: i64) -> Result<()> {
    let tx = write_tx(conn)?;
    account_row(&tx, id)?;
    let references = store::count_account_references(&tx, id)?;
    if references > 0 {
        tracing::warn!(account_id = id, references, "account delete refused");
        return Err(LedgerError::EntityInUse {
            entity: "account",
            id,
            references,
        });
    }
    tx.execute("DELETE FROM accounts WHERE id=?1", params![id])?;
    tx.commit()?;
    tracing::info!(account_id = id, "account deleted");
    Ok(())
}

fn ensure_account_name_free(conn: &Connection, name: &str, except: Option<i64>) -> Result<()> {
    let existing: Option<i64> = conn
        .query_row("SELECT id FROM accounts WHERE name=?1", params![name], |r| r.get(0))
        .optional()?;
    match existing {
        Some(other) if Some(other) != except => Err(LedgerError::validation(format!(
            "account name '{}' already exists",
            name
        ))),
        _ => Ok(()),
    }
}

/// Referential check used by transaction writes.
pub fn ensure_account(conn: &Connection, id: i64) -> Result<()> {
    let found: Option<i64> = conn
        .query_row("SELECT id FROM accounts WHERE id=?1", params![id], |r| r.get(0))
        .optional()?;
    found
        .map(|_| ())
        .ok_or_else(|| LedgerError::reference(format!("unknown account {}", id)))
}

fn read_category(r: &rusqlite::Row<'_>) -> rusqlite::Result<(i64, String, String)> {
    Ok((r.get(0)?, r.get(1)?, r.get(2)?))
}

fn to_category((id, name, kind): (i64, String, String)) -> Result<Category> {
    Ok(Category {
        id,
        name,
        kind: stored_label(&kind, "category kind")?,
    })
}

fn find_category(conn: &Connection, id: i64) -> Result<Option<Category>> {
    conn.query_row(
        "SELECT id, name, kind FROM categories WHERE id=?1",
        params![id],
        read_category,
    )
    .optional()?
    .map(to_category)
    .transpose()
}

pub fn get_category(conn: &Connection, id: i64) -> Result<Category> {
    find_category(conn, id)?.ok_or_else(|| LedgerError::not_found("category", id))
}

pub fn category_by_name(conn: &Connection, name: &str) -> Result<Option<Category>> {
    conn.query_row(
        "SELECT id, name, kind FROM categories WHERE name=?1",
        params![name.trim()],
        read_category,
    )
    .optional()?
    .map(to_category)
    .transpose()
}

pub fn list_categories(conn: &Connection, kind: Option<CategoryKind>) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare_cached("SELECT id, name, kind FROM categories ORDER BY name, id")?;
    let rows = stmt.query_map([], read_category)?;
    let mut out = Vec::new();
    for row in rows {
        let cat = to_category(row?)?;
        if kind.is_none_or(|k| k == cat.kind) {
            out.push(cat);
        }
    }
    Ok(out)
}

/// Resolves a category for an income/expense record, rejecting unknown ids
/// and kind mismatches.
pub fn resolve_category(conn: &Connection, id: i64, expected: CategoryKind) -> Result<Category> {
    let cat = find_category(conn, id)?
        .ok_or_else(|| LedgerError::reference(format!("unknown category {}", id)))?;
    if cat.kind != expected {
        return Err(LedgerError::reference(format!(
            "category '{}' is {} but the record is {}",
            cat.name, cat.kind, expected
        )));
    }
    Ok(cat)
}

pub fn create_category(conn: &mut Connection, name: &str, kind: CategoryKind) -> Result<Category> {
    let name = required_text(name, "category name")?;
    let tx = write_tx(conn)?;
    if category_by_name(&tx, &name)?.is_some() {
        return Err(LedgerError::validation(format!(
            "category '{}' already exists",
            name
        )));
    }
    tx.execute(
        "INSERT INTO categories(name, kind) VALUES (?1, ?2)",
        params![name, kind.as_str()],
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;
    tracing::info!(category_id = id, %name, %kind, "category created");
    Ok(Category { id, name, kind })
}

/// Renames a category; the kind may only change while nothing references it.
pub fn update_category(conn: &mut Connection, id: i64, patch: &CategoryPatch) -> Result<Category> {
    let name = patch
        .name
        .as_deref()
        .map(|n| required_text(n, "category name"))
        .transpose()?;

    let tx = write_tx(conn)?;
    let current = get_category(&tx, id)?;
    if let Some(ref n) = name {
        if let Some(other) = category_by_name(&tx, n)? {
            if other.id != id {
                return Err(LedgerError::validation(format!(
                    "category '{}' already exists",
                    n
                )));
            }
        }
    }
    let kind = patch.kind.unwrap_or(current.kind);
    if kind != current.kind {
        let references = store::count_category_references(&tx, id)?;
        if references > 0 {
            return Err(LedgerError::EntityInUse {
                entity: "category",
                id,
                references,
            });
        }
    }
    let updated = Category {
        id,
        name: name.unwrap_or(current.name),
        kind,
    };
    tx.execute(
        "UPDATE categories SET name=?1, kind=?2 WHERE id=?3",
        params![updated.name, updated.kind.as_str(), id],
    )?;
    tx.commit()?;
    tracing::info!(category_id = id, "category updated");
    Ok(updated)
}

pub fn delete_category(conn: &mut Connection, id: i64) -> Result<()> {
    let tx = write_tx(conn)?;
    get_category(&tx, id)?;
    let references = store::count_category_references(&tx, id)?;
    if references > 0 {
        tracing::warn!(category_id = id, references, "category delete refused");
        return Err(LedgerError::EntityInUse {
            entity: "category",
            id,
            references,
        });
    }
    tx.execute("DELETE FROM categories WHERE id=?1", params![id])?;
    tx.commit()?;
    tracing::info!(category_id = id, "category deleted");
    Ok(())
}

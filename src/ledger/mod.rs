// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! The ledger engine: registries, transaction store, balance reconstruction,
//! recurrence scheduling and period queries. Every operation takes the
//! connection explicitly; nothing here holds global state.

pub mod balance;
pub mod dashboard;
pub mod doctor;
pub mod query;
pub mod registry;
pub mod rules;
pub mod scheduler;
pub mod store;

use std::str::FromStr;

use rusqlite::{Connection, TransactionBehavior};
use rust_decimal::Decimal;

use crate::error::{LedgerError, Result};

/// Opens the exclusive write section every mutation runs in.
pub(crate) fn write_tx(conn: &mut Connection) -> Result<rusqlite::Transaction<'_>> {
    Ok(conn.transaction_with_behavior(TransactionBehavior::Immediate)?)
}

/// Read snapshot: everything read through it sees one consistent state.
pub(crate) fn read_snapshot(conn: &Connection) -> Result<rusqlite::Transaction<'_>> {
    Ok(conn.unchecked_transaction()?)
}

pub(crate) fn stored_decimal(raw: &str, what: &str) -> Result<Decimal> {
    Decimal::from_str_exact(raw.trim())
        .map_err(|e| LedgerError::Corrupt(format!("{} '{}': {}", what, raw, e)))
}

pub(crate) fn stored_label<T: FromStr>(raw: &str, what: &str) -> Result<T> {
    raw.parse::<T>()
        .map_err(|_| LedgerError::Corrupt(format!("{} '{}'", what, raw)))
}

pub(crate) fn required_text(value: &str, field: &str) -> Result<String> {
    let v = value.trim();
    if v.is_empty() {
        return Err(LedgerError::validation(format!("{} must not be empty", field)));
    }
    Ok(v.to_string())
}

// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;

use crate::ledger::scheduler::last_day_of_month;

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

/// `YYYY-MM` into `(year, month)`.
pub fn parse_month(s: &str) -> Result<(i32, u32)> {
    let d = NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
        .with_context(|| format!("Invalid month '{}', expected YYYY-MM", s))?;
    Ok((chrono::Datelike::year(&d), chrono::Datelike::month(&d)))
}

/// First and last day of a calendar month.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate)> {
    let last = last_day_of_month(year, month)
        .ok_or_else(|| anyhow!("Invalid month {}-{:02}", year, month))?;
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| anyhow!("Invalid month {}-{:02}", year, month))?;
    let end = NaiveDate::from_ymd_opt(year, month, last)
        .ok_or_else(|| anyhow!("Invalid month {}-{:02}", year, month))?;
    Ok((start, end))
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    s.trim()
        .parse::<Decimal>()
        .with_context(|| format!("Invalid decimal '{}'", s))
}

pub fn fmt_money(d: &Decimal) -> String {
    format!("{:.2}", d.round_dp(2))
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

fn lookup_id(conn: &Connection, table: &str, what: &str, key: &str) -> Result<i64> {
    let key = key.trim();
    let sql = format!("SELECT id FROM {} WHERE name=?1", table);
    let by_name: Option<i64> = conn.query_row(&sql, params![key], |r| r.get(0)).optional()?;
    // An exact name wins over an id, so all-digit names stay reachable.
    match by_name {
        Some(id) => Ok(id),
        None => key
            .parse::<i64>()
            .map_err(|_| anyhow!("{} '{}' not found", what, key)),
    }
}

/// Account reference given on the command line: numeric id or exact name.
pub fn id_for_account(conn: &Connection, key: &str) -> Result<i64> {
    lookup_id(conn, "accounts", "Account", key)
}

pub fn id_for_category(conn: &Connection, key: &str) -> Result<i64> {
    lookup_id(conn, "categories", "Category", key)
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // Arrays stream one element per line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}

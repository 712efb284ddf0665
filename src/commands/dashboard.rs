// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, anyhow};
use rusqlite::Connection;

use super::output_flags;
use crate::ledger::{dashboard, registry};
use crate::utils::{fmt_money, maybe_print_json, pretty_table};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("summary", sub)) => summary(conn, sub)?,
        Some(("categories", sub)) => categories(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn year_of(sub: &clap::ArgMatches) -> Result<i32> {
    sub.get_one::<i32>("year")
        .copied()
        .ok_or_else(|| anyhow!("--year is required"))
}

fn summary(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let (json_flag, jsonl_flag) = output_flags(sub);
    let months = dashboard::monthly_summary(conn, year_of(sub)?)?;
    if maybe_print_json(json_flag, jsonl_flag, &months)? {
        return Ok(());
    }
    let data = months
        .iter()
        .map(|m| {
            vec![
                format!("{:02}", m.month),
                fmt_money(&m.income),
                fmt_money(&m.expense),
                fmt_money(&m.net),
            ]
        })
        .collect();
    println!("{}", pretty_table(&["Month", "Income", "Expense", "Net"], data));
    println!("Global balance: {}", fmt_money(&registry::total_balance(conn)?));
    Ok(())
}

fn categories(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let (json_flag, jsonl_flag) = output_flags(sub);
    let month = sub
        .get_one::<u32>("month")
        .copied()
        .ok_or_else(|| anyhow!("--month is required"))?;
    let totals = dashboard::category_expenses(conn, year_of(sub)?, month)?;
    if !maybe_print_json(json_flag, jsonl_flag, &totals)? {
        let data = totals
            .iter()
            .map(|c| vec![c.name.clone(), fmt_money(&c.total)])
            .collect();
        println!("{}", pretty_table(&["Category", "Spent"], data));
    }
    Ok(())
}

// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::HashMap;

use anyhow::{Context, Result, bail};
use rusqlite::Connection;
use serde_json::json;

use super::required;
use crate::ledger::query::{self, TransactionFilter};
use crate::ledger::registry;
use crate::utils::parse_date;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("transactions", sub)) => export_transactions(conn, sub),
        _ => Ok(()),
    }
}

fn export_transactions(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let fmt = required(sub, "format")?.to_lowercase();
    let out = required(sub, "out")?;
    let start = parse_date(required(sub, "from")?)?;
    let end = parse_date(required(sub, "to")?)?;

    let view = query::query(conn, start, end, &TransactionFilter::default())?;
    let accounts: HashMap<i64, String> = registry::list_accounts(conn)?
        .into_iter()
        .map(|a| (a.id, a.name))
        .collect();
    let categories: HashMap<i64, String> = registry::list_categories(conn, None)?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();
    let name = |map: &HashMap<i64, String>, id: Option<i64>| {
        id.and_then(|i| map.get(&i).cloned()).unwrap_or_default()
    };

    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)
                .with_context(|| format!("Failed to create {}", out))?;
            wtr.write_record([
                "id", "date", "kind", "state", "amount", "origin", "destination", "category",
                "description", "balance",
            ])?;
            for (tx, balance) in view.rows() {
                wtr.write_record([
                    tx.id.to_string(),
                    tx.date.to_string(),
                    tx.kind.to_string(),
                    tx.state.to_string(),
                    tx.amount.to_string(),
                    name(&accounts, tx.origin_account_id),
                    name(&accounts, tx.destination_account_id),
                    name(&categories, tx.category_id),
                    tx.description.clone(),
                    balance.to_string(),
                ])?;
            }
            wtr.flush()?;
        }
        "json" => {
            let items: Vec<_> = view
                .rows()
                .map(|(tx, balance)| {
                    json!({
                        "id": tx.id,
                        "date": tx.date,
                        "kind": tx.kind,
                        "state": tx.state,
                        "amount": tx.amount,
                        "origin": name(&accounts, tx.origin_account_id),
                        "destination": name(&accounts, tx.destination_account_id),
                        "category": name(&categories, tx.category_id),
                        "description": tx.description,
                        "balance": balance,
                    })
                })
                .collect();
            let doc = json!({
                "start_date": view.start_date,
                "end_date": view.end_date,
                "opening_balance_for_period": view.opening_balance_for_period,
                "transactions": items,
            });
            std::fs::write(out, serde_json::to_string_pretty(&doc)?)
                .with_context(|| format!("Failed to write {}", out))?;
        }
        other => bail!("Unknown format: {} (use csv|json)", other),
    }
    tracing::info!(%start, %end, rows = view.transactions.len(), out, "transactions exported");
    println!("Exported {} transactions to {}", view.transactions.len(), out);
    Ok(())
}

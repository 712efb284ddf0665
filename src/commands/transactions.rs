// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::{BTreeSet, HashMap};

use anyhow::{Context, Result, bail};
use rusqlite::Connection;

use super::{output_flags, required, required_id};
use crate::ledger::query::{self, TransactionFilter};
use crate::ledger::{registry, store};
use crate::models::{NewTransaction, Transaction, TransactionKind, TransactionPatch, TransactionState};
use crate::utils::{
    fmt_money, id_for_account, id_for_category, maybe_print_json, parse_date, parse_decimal,
    pretty_table,
};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("edit", sub)) => edit(conn, sub)?,
        Some(("confirm", sub)) => confirm(conn, sub)?,
        Some(("show", sub)) => show(conn, sub)?,
        Some(("rm", sub)) => {
            let id = required_id(sub)?;
            store::delete_transaction(conn, id)
                .with_context(|| format!("Failed to remove transaction #{}", id))?;
            println!("Removed transaction #{}", id);
        }
        Some(("list", sub)) => list(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn optional_ref(
    conn: &Connection,
    sub: &clap::ArgMatches,
    name: &str,
    resolve: fn(&Connection, &str) -> Result<i64>,
) -> Result<Option<i64>> {
    sub.get_one::<String>(name)
        .map(|key| resolve(conn, key))
        .transpose()
}

fn add(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let new = NewTransaction {
        date: parse_date(required(sub, "date")?)?,
        amount: parse_decimal(required(sub, "amount")?)?,
        kind: required(sub, "kind")?.parse()?,
        state: if sub.get_flag("planned") {
            TransactionState::Planned
        } else {
            TransactionState::Confirmed
        },
        description: sub.get_one::<String>("desc").cloned().unwrap_or_default(),
        origin_account_id: optional_ref(conn, sub, "origin", id_for_account)?,
        destination_account_id: optional_ref(conn, sub, "dest", id_for_account)?,
        category_id: optional_ref(conn, sub, "category", id_for_category)?,
    };
    let tx = store::create_transaction(conn, &new).context("Failed to record transaction")?;
    println!(
        "Recorded #{} {} {} on {} ({})",
        tx.id,
        tx.kind,
        fmt_money(&tx.amount),
        tx.date,
        tx.state
    );
    Ok(())
}

fn cleared_or(
    conn: &Connection,
    sub: &clap::ArgMatches,
    name: &str,
    clear: &str,
    resolve: fn(&Connection, &str) -> Result<i64>,
) -> Result<Option<Option<i64>>> {
    if sub.get_flag(clear) {
        if sub.get_one::<String>(name).is_some() {
            bail!("--{} and --{} are mutually exclusive", name, clear);
        }
        return Ok(Some(None));
    }
    Ok(optional_ref(conn, sub, name, resolve)?.map(Some))
}

fn edit(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = required_id(sub)?;
    let patch = TransactionPatch {
        date: sub.get_one::<String>("date").map(|s| parse_date(s)).transpose()?,
        amount: sub
            .get_one::<String>("amount")
            .map(|s| parse_decimal(s))
            .transpose()?,
        kind: sub
            .get_one::<String>("kind")
            .map(|s| s.parse::<TransactionKind>())
            .transpose()?,
        state: sub
            .get_one::<String>("state")
            .map(|s| s.parse::<TransactionState>())
            .transpose()?,
        description: sub.get_one::<String>("desc").cloned(),
        origin_account_id: cleared_or(conn, sub, "origin", "clear-origin", id_for_account)?,
        destination_account_id: cleared_or(conn, sub, "dest", "clear-dest", id_for_account)?,
        category_id: cleared_or(conn, sub, "category", "clear-category", id_for_category)?,
    };
    let tx = store::update_transaction(conn, id, &patch)
        .with_context(|| format!("Failed to edit transaction #{}", id))?;
    println!("Updated transaction #{} ({})", tx.id, tx.state);
    Ok(())
}

fn confirm(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = required_id(sub)?;
    let origin = optional_ref(conn, sub, "origin", id_for_account)?;
    let dest = optional_ref(conn, sub, "dest", id_for_account)?;
    let result = if origin.is_none() && dest.is_none() {
        store::confirm_transaction(conn, id)
    } else {
        store::update_transaction(
            conn,
            id,
            &TransactionPatch {
                state: Some(TransactionState::Confirmed),
                origin_account_id: origin.map(Some),
                destination_account_id: dest.map(Some),
                ..Default::default()
            },
        )
    };
    let tx = result.with_context(|| format!("Failed to confirm transaction #{}", id))?;
    println!("Confirmed #{} {} {}", tx.id, tx.kind, fmt_money(&tx.amount));
    Ok(())
}

fn show(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let (json_flag, jsonl_flag) = output_flags(sub);
    let tx = store::get_transaction(conn, required_id(sub)?)?;
    if !maybe_print_json(json_flag, jsonl_flag, &tx)? {
        let names = Names::load(conn)?;
        println!(
            "{}",
            pretty_table(
                &["ID", "Date", "Kind", "State", "Amount", "From", "To", "Category", "Description"],
                vec![names.row(&tx, None)],
            )
        );
    }
    Ok(())
}

struct Names {
    accounts: HashMap<i64, String>,
    categories: HashMap<i64, String>,
}

impl Names {
    fn load(conn: &Connection) -> Result<Self> {
        let accounts = registry::list_accounts(conn)?
            .into_iter()
            .map(|a| (a.id, a.name))
            .collect();
        let categories = registry::list_categories(conn, None)?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();
        Ok(Self {
            accounts,
            categories,
        })
    }

    fn account(&self, id: Option<i64>) -> String {
        id.map(|id| self.accounts.get(&id).cloned().unwrap_or_else(|| format!("#{}", id)))
            .unwrap_or_default()
    }

    fn row(&self, tx: &Transaction, balance: Option<rust_decimal::Decimal>) -> Vec<String> {
        let mut row = vec![
            tx.id.to_string(),
            tx.date.to_string(),
            tx.kind.to_string(),
            tx.state.to_string(),
            fmt_money(&tx.amount),
            self.account(tx.origin_account_id),
            self.account(tx.destination_account_id),
            tx.category_id
                .and_then(|c| self.categories.get(&c).cloned())
                .unwrap_or_default(),
            tx.description.clone(),
        ];
        if let Some(b) = balance {
            row.push(fmt_money(&b));
        }
        row
    }
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let (json_flag, jsonl_flag) = output_flags(sub);
    let start = parse_date(required(sub, "from")?)?;
    let end = parse_date(required(sub, "to")?)?;

    let category_ids = match sub.get_many::<String>("category") {
        Some(keys) => Some(
            keys.map(|k| id_for_category(conn, k))
                .collect::<Result<BTreeSet<i64>>>()?,
        ),
        None => None,
    };
    let filter = TransactionFilter {
        text: sub.get_one::<String>("search").cloned(),
        category_ids,
    };
    let view = query::query(conn, start, end, &filter)
        .with_context(|| format!("Failed to query {} .. {}", start, end))?;

    if maybe_print_json(json_flag, jsonl_flag, &view)? {
        return Ok(());
    }
    let names = Names::load(conn)?;
    let data: Vec<Vec<String>> = view
        .rows()
        .map(|(tx, balance)| names.row(tx, Some(balance)))
        .collect();
    println!(
        "Opening balance on {}: {}",
        view.start_date,
        fmt_money(&view.opening_balance_for_period)
    );
    println!(
        "{}",
        pretty_table(
            &[
                "ID", "Date", "Kind", "State", "Amount", "From", "To", "Category", "Description",
                "Balance",
            ],
            data,
        )
    );
    if let Some(id) = view.projection_starts_at {
        println!("Projected from transaction #{} onwards (planned rows included)", id);
    }
    Ok(())
}

// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use rusqlite::Connection;

use super::{output_flags, required, required_id};
use crate::ledger::registry;
use crate::models::{Account, AccountPatch, NewAccount};
use crate::utils::{fmt_money, maybe_print_json, parse_decimal, pretty_table};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let new = NewAccount {
                name: required(sub, "name")?.to_string(),
                r#type: required(sub, "type")?.trim().to_string(),
                opening_balance: parse_decimal(required(sub, "opening")?)?,
            };
            let account = registry::create_account(conn, &new)
                .with_context(|| format!("Failed to add account '{}'", new.name.trim()))?;
            println!(
                "Added account #{} '{}' ({}, opening {})",
                account.id,
                account.name,
                account.r#type,
                fmt_money(&account.opening_balance)
            );
        }
        Some(("list", sub)) => {
            let (json_flag, jsonl_flag) = output_flags(sub);
            let accounts = registry::list_accounts(conn)?;
            if !maybe_print_json(json_flag, jsonl_flag, &accounts)? {
                let total: rust_decimal::Decimal = accounts.iter().map(|a| a.current_balance).sum();
                let mut data = rows(&accounts);
                data.push(vec![
                    String::new(),
                    "Total".into(),
                    String::new(),
                    String::new(),
                    fmt_money(&total),
                ]);
                println!(
                    "{}",
                    pretty_table(&["ID", "Name", "Type", "Opening", "Current"], data)
                );
            }
        }
        Some(("show", sub)) => {
            let (json_flag, jsonl_flag) = output_flags(sub);
            let account = registry::get_account(conn, required_id(sub)?)?;
            if !maybe_print_json(json_flag, jsonl_flag, &account)? {
                println!(
                    "{}",
                    pretty_table(
                        &["ID", "Name", "Type", "Opening", "Current"],
                        rows(std::slice::from_ref(&account))
                    )
                );
            }
        }
        Some(("edit", sub)) => {
            let id = required_id(sub)?;
            let patch = AccountPatch {
                name: sub.get_one::<String>("name").cloned(),
                r#type: sub.get_one::<String>("type").map(|t| t.trim().to_string()),
                opening_balance: sub
                    .get_one::<String>("opening")
                    .map(|s| parse_decimal(s))
                    .transpose()?,
            };
            let account = registry::update_account(conn, id, &patch)
                .with_context(|| format!("Failed to edit account #{}", id))?;
            println!("Updated account #{} '{}'", account.id, account.name);
        }
        Some(("rm", sub)) => {
            let id = required_id(sub)?;
            registry::delete_account(conn, id)
                .with_context(|| format!("Failed to remove account #{}", id))?;
            println!("Removed account #{}", id);
        }
        _ => {}
    }
    Ok(())
}

fn rows(accounts: &[Account]) -> Vec<Vec<String>> {
    accounts
        .iter()
        .map(|a| {
            vec![
                a.id.to_string(),
                a.name.clone(),
                a.r#type.clone(),
                fmt_money(&a.opening_balance),
                fmt_money(&a.current_balance),
            ]
        })
        .collect()
}

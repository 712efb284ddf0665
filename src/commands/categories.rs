// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use rusqlite::Connection;

use super::{output_flags, required, required_id};
use crate::ledger::registry;
use crate::models::{CategoryKind, CategoryPatch};
use crate::utils::{maybe_print_json, pretty_table};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = required(sub, "name")?;
            let kind: CategoryKind = required(sub, "kind")?.parse()?;
            let cat = registry::create_category(conn, name, kind)
                .with_context(|| format!("Failed to add category '{}'", name.trim()))?;
            println!("Added category #{} '{}' ({})", cat.id, cat.name, cat.kind);
        }
        Some(("list", sub)) => {
            let (json_flag, jsonl_flag) = output_flags(sub);
            let kind = sub
                .get_one::<String>("kind")
                .map(|k| k.parse::<CategoryKind>())
                .transpose()?;
            let cats = registry::list_categories(conn, kind)?;
            if !maybe_print_json(json_flag, jsonl_flag, &cats)? {
                let data = cats
                    .iter()
                    .map(|c| vec![c.id.to_string(), c.name.clone(), c.kind.to_string()])
                    .collect();
                println!("{}", pretty_table(&["ID", "Name", "Kind"], data));
            }
        }
        Some(("edit", sub)) => {
            let id = required_id(sub)?;
            let patch = CategoryPatch {
                name: sub.get_one::<String>("name").cloned(),
                kind: sub
                    .get_one::<String>("kind")
                    .map(|k| k.parse::<CategoryKind>())
                    .transpose()?,
            };
            let cat = registry::update_category(conn, id, &patch)
                .with_context(|| format!("Failed to edit category #{}", id))?;
            println!("Updated category #{} '{}' ({})", cat.id, cat.name, cat.kind);
        }
        Some(("rm", sub)) => {
            let id = required_id(sub)?;
            registry::delete_category(conn, id)
                .with_context(|| format!("Failed to remove category #{}", id))?;
            println!("Removed category #{}", id);
        }
        _ => {}
    }
    Ok(())
}

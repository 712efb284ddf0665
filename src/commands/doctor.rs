// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;

use super::output_flags;
use crate::ledger::doctor;
use crate::utils::{maybe_print_json, pretty_table};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let (json_flag, jsonl_flag) = output_flags(m);
    let today = chrono::Local::now().date_naive();
    let issues = doctor::diagnose(conn, today)?;
    if maybe_print_json(json_flag, jsonl_flag, &issues)? {
        return Ok(());
    }
    if issues.is_empty() {
        println!("doctor: no issues found");
    } else {
        let rows = issues
            .into_iter()
            .map(|i| vec![i.code.to_string(), i.detail])
            .collect();
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}

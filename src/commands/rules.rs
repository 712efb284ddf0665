// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result, anyhow};
use rusqlite::Connection;

use super::{output_flags, required, required_id};
use crate::ledger::{rules, scheduler};
use crate::models::{CategoryKind, Frequency, NewRule, RecurringRule, RulePatch};
use crate::utils::{fmt_money, id_for_category, maybe_print_json, parse_decimal, pretty_table};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let new = NewRule {
                description: required(sub, "desc")?.to_string(),
                default_amount: parse_decimal(required(sub, "amount")?)?,
                kind: required(sub, "kind")?.parse()?,
                frequency: required(sub, "frequency")?.parse()?,
                day: sub
                    .get_one::<u32>("day")
                    .copied()
                    .ok_or_else(|| anyhow!("--day is required"))?,
                month: sub.get_one::<u32>("month").copied(),
                default_category_id: sub
                    .get_one::<String>("category")
                    .map(|c| id_for_category(conn, c))
                    .transpose()?,
            };
            let rule = rules::create_rule(conn, &new).context("Failed to add recurring rule")?;
            println!("Added rule #{} '{}' ({})", rule.id, rule.description, schedule(&rule));
        }
        Some(("list", sub)) => {
            let (json_flag, jsonl_flag) = output_flags(sub);
            let list = rules::list_rules(conn, sub.get_flag("active"))?;
            if !maybe_print_json(json_flag, jsonl_flag, &list)? {
                let data = list
                    .iter()
                    .map(|r| {
                        vec![
                            r.id.to_string(),
                            r.description.clone(),
                            r.kind.to_string(),
                            fmt_money(&r.default_amount),
                            schedule(r),
                            r.default_category_id.map(|c| c.to_string()).unwrap_or_default(),
                            if r.active { "yes".into() } else { "no".into() },
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(
                        &["ID", "Description", "Kind", "Amount", "Schedule", "Category", "Active"],
                        data
                    )
                );
            }
        }
        Some(("edit", sub)) => {
            let id = required_id(sub)?;
            let patch = RulePatch {
                description: sub.get_one::<String>("desc").cloned(),
                default_amount: sub
                    .get_one::<String>("amount")
                    .map(|s| parse_decimal(s))
                    .transpose()?,
                kind: sub
                    .get_one::<String>("kind")
                    .map(|s| s.parse::<CategoryKind>())
                    .transpose()?,
                frequency: sub
                    .get_one::<String>("frequency")
                    .map(|s| s.parse::<Frequency>())
                    .transpose()?,
                day: sub.get_one::<u32>("day").copied(),
                month: if sub.get_flag("clear-month") {
                    Some(None)
                } else {
                    sub.get_one::<u32>("month").copied().map(Some)
                },
                default_category_id: if sub.get_flag("clear-category") {
                    Some(None)
                } else {
                    sub.get_one::<String>("category")
                        .map(|c| id_for_category(conn, c))
                        .transpose()?
                        .map(Some)
                },
                active: None,
            };
            let rule = rules::update_rule(conn, id, &patch)
                .with_context(|| format!("Failed to edit rule #{}", id))?;
            println!("Updated rule #{} ({})", rule.id, schedule(&rule));
        }
        Some(("enable", sub)) => toggle(conn, required_id(sub)?, true)?,
        Some(("disable", sub)) => toggle(conn, required_id(sub)?, false)?,
        Some(("rm", sub)) => {
            let id = required_id(sub)?;
            let detached = rules::delete_rule(conn, id)
                .with_context(|| format!("Failed to remove rule #{}", id))?;
            println!(
                "Removed rule #{} ({} generated transactions kept)",
                id, detached
            );
        }
        Some(("generate", sub)) => generate(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn toggle(conn: &mut Connection, id: i64, active: bool) -> Result<()> {
    let rule = rules::set_rule_active(conn, id, active)
        .with_context(|| format!("Failed to update rule #{}", id))?;
    println!(
        "Rule #{} '{}' is now {}",
        rule.id,
        rule.description,
        if active { "active" } else { "paused" }
    );
    Ok(())
}

fn generate(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let (json_flag, jsonl_flag) = output_flags(sub);
    let year = *sub
        .get_one::<i32>("year")
        .ok_or_else(|| anyhow!("--year is required"))?;
    let month = *sub
        .get_one::<u32>("month")
        .ok_or_else(|| anyhow!("--month is required"))?;
    let report = scheduler::generate_for_period(conn, year, month)
        .with_context(|| format!("Failed to generate {}-{:02}", year, month))?;
    if maybe_print_json(json_flag, jsonl_flag, &report)? {
        return Ok(());
    }
    println!(
        "Generated {} planned transaction(s) for {}-{:02}",
        report.generated_count, year, month
    );
    if !report.failures.is_empty() {
        let data = report
            .failures
            .iter()
            .map(|f| vec![f.rule_id.to_string(), f.description.clone(), f.error.clone()])
            .collect();
        println!("{}", pretty_table(&["Rule", "Description", "Error"], data));
    }
    Ok(())
}

fn schedule(rule: &RecurringRule) -> String {
    const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
    match rule.frequency {
        Frequency::Monthly => format!("monthly on day {}", rule.day),
        Frequency::Weekly => format!(
            "weekly on {}",
            WEEKDAYS.get(rule.day as usize).copied().unwrap_or("?")
        ),
        Frequency::Annual => format!(
            "yearly on {:02}-{:02}",
            rule.month.unwrap_or_default(),
            rule.day
        ),
    }
}

// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use ledgerline::ledger::{rules, scheduler, store};
use ledgerline::models::{CategoryKind, Frequency, NewRule};
use ledgerline::{cli, commands, db};
use rusqlite::Connection;
use rust_decimal::Decimal;

fn rules_cmd(conn: &mut Connection, args: &[&str]) -> anyhow::Result<()> {
    let mut argv = vec!["ledgerline", "rules"];
    argv.extend_from_slice(args);
    let matches = cli::build_cli().get_matches_from(argv);
    if let Some(("rules", rules_m)) = matches.subcommand() {
        commands::rules::handle(conn, rules_m)
    } else {
        panic!("rules command not parsed");
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn weekly_rule_fills_every_monday_once() {
    let mut conn = db::open_in_memory().unwrap();
    rules_cmd(
        &mut conn,
        &[
            "add", "--desc", "Groceries", "--amount", "5000", "--kind", "expense",
            "--frequency", "weekly", "--day", "0",
        ],
    )
    .unwrap();

    // June 2025 has five Mondays, February 2025 has four.
    rules_cmd(&mut conn, &["generate", "--year", "2025", "--month", "2"]).unwrap();
    let feb = store::list_all(&conn).unwrap();
    assert_eq!(
        feb.iter().map(|t| t.date).collect::<Vec<_>>(),
        [date(2025, 2, 3), date(2025, 2, 10), date(2025, 2, 17), date(2025, 2, 24)]
    );
    assert!(feb.iter().all(|t| t.is_planned() && t.amount == Decimal::from(5000)));

    rules_cmd(&mut conn, &["generate", "--year", "2025", "--month", "2"]).unwrap();
    assert_eq!(store::list_all(&conn).unwrap().len(), 4);

    let june = scheduler::generate_for_period(&mut conn, 2025, 6).unwrap();
    assert_eq!(june.generated_count, 5);
}

#[test]
fn month_end_rule_clamps_in_short_months() {
    let mut conn = db::open_in_memory().unwrap();
    rules_cmd(
        &mut conn,
        &[
            "add", "--desc", "Rent", "--amount", "1200", "--kind", "expense", "--frequency",
            "monthly", "--day", "31",
        ],
    )
    .unwrap();
    for (year, month) in [(2025, 4), (2025, 2), (2024, 2)] {
        scheduler::generate_for_period(&mut conn, year, month).unwrap();
    }
    let dates: Vec<_> = store::list_all(&conn).unwrap().into_iter().map(|t| t.date).collect();
    assert_eq!(dates, [date(2024, 2, 29), date(2025, 2, 28), date(2025, 4, 30)]);
}

#[test]
fn repeated_generation_is_idempotent_across_rules() {
    let mut conn = db::open_in_memory().unwrap();
    let schedules = [
        (Frequency::Monthly, 15, None),
        (Frequency::Weekly, 4, None),
        (Frequency::Annual, 1, Some(3)),
        (Frequency::Annual, 1, Some(9)),
    ];
    for (i, (frequency, day, month)) in schedules.into_iter().enumerate() {
        rules::create_rule(
            &mut conn,
            &NewRule {
                description: format!("rule {}", i),
                default_amount: Decimal::from(10 + i as i64),
                kind: CategoryKind::Expense,
                frequency,
                day,
                month,
                default_category_id: None,
            },
        )
        .unwrap();
    }

    let first = scheduler::generate_for_period(&mut conn, 2025, 3).unwrap();
    let snapshot = store::list_all(&conn).unwrap();
    // 1 monthly + 4 Fridays + 1 annual in March
    assert_eq!(first.generated_count, 6);
    assert_eq!(snapshot.len(), 6);

    let second = scheduler::generate_for_period(&mut conn, 2025, 3).unwrap();
    assert_eq!(second.generated_count, 0);
    assert!(second.failures.is_empty());
    assert_eq!(store::list_all(&conn).unwrap(), snapshot);
}

#[test]
fn deleting_a_rule_keeps_its_transactions() {
    let mut conn = db::open_in_memory().unwrap();
    rules_cmd(
        &mut conn,
        &[
            "add", "--desc", "Gym", "--amount", "30", "--kind", "expense", "--frequency",
            "monthly", "--day", "5",
        ],
    )
    .unwrap();
    scheduler::generate_for_period(&mut conn, 2025, 1).unwrap();
    rules_cmd(&mut conn, &["rm", "--id", " 1 "]).unwrap();

    let txs = store::list_all(&conn).unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].recurring_rule_id, None);
    assert_eq!(txs[0].description, "Gym");
    assert!(rules::list_rules(&conn, false).unwrap().is_empty());
}

#[test]
fn disabled_rules_are_skipped_until_enabled() {
    let mut conn = db::open_in_memory().unwrap();
    rules_cmd(
        &mut conn,
        &[
            "add", "--desc", "Insurance", "--amount", "300", "--kind", "expense", "--frequency",
            "annual", "--day", "15", "--month", "6",
        ],
    )
    .unwrap();
    rules_cmd(&mut conn, &["disable", "--id", "1"]).unwrap();
    rules_cmd(&mut conn, &["generate", "--year", "2025", "--month", "6"]).unwrap();
    assert!(store::list_all(&conn).unwrap().is_empty());

    rules_cmd(&mut conn, &["enable", "--id", "1"]).unwrap();
    rules_cmd(&mut conn, &["generate", "--year", "2025", "--month", "6"]).unwrap();
    assert_eq!(store::list_all(&conn).unwrap()[0].date, date(2025, 6, 15));
}

#[test]
fn annual_rule_without_month_is_rejected() {
    let mut conn = db::open_in_memory().unwrap();
    let err = rules_cmd(
        &mut conn,
        &[
            "add", "--desc", "Tax", "--amount", "99", "--kind", "expense", "--frequency",
            "annual", "--day", "1",
        ],
    )
    .unwrap_err();
    assert!(format!("{:#}", err).contains("annual rules need a month"));
}

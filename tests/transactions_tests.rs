// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use ledgerline::ledger::{query, registry, store};
use ledgerline::models::TransactionState;
use ledgerline::{LedgerError, cli, commands, db};
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::str::FromStr;

fn run(conn: &mut Connection, args: &[&str]) -> anyhow::Result<()> {
    let mut argv = vec!["ledgerline"];
    argv.extend_from_slice(args);
    let matches = cli::build_cli().get_matches_from(argv);
    match matches.subcommand() {
        Some(("account", sub)) => commands::accounts::handle(conn, sub),
        Some(("category", sub)) => commands::categories::handle(conn, sub),
        Some(("tx", sub)) => commands::transactions::handle(conn, sub),
        Some(("rules", sub)) => commands::rules::handle(conn, sub),
        other => panic!("unexpected command {:?}", other.map(|(n, _)| n)),
    }
}

fn setup() -> Connection {
    let mut conn = db::open_in_memory().unwrap();
    run(&mut conn, &["account", "add", "--name", "Checking", "--opening", "1000"]).unwrap();
    run(&mut conn, &["account", "add", "--name", "Savings", "--type", "savings"]).unwrap();
    run(&mut conn, &["category", "add", "--name", "Salary", "--kind", "income"]).unwrap();
    run(&mut conn, &["category", "add", "--name", "Groceries", "--kind", "Expense"]).unwrap();
    conn
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

#[test]
fn add_resolves_names_and_updates_balances() {
    let mut conn = setup();
    run(
        &mut conn,
        &[
            "tx", "add", "--date", "2025-03-01", "--amount", "2500", "--kind", "income",
            "--dest", "Checking", "--category", "Salary", "--desc", "March pay",
        ],
    )
    .unwrap();
    run(
        &mut conn,
        &[
            "tx", "add", "--date", "2025-03-03", "--amount", "300", "--kind", "transfer",
            "--origin", "Checking", "--dest", "Savings",
        ],
    )
    .unwrap();

    let accounts = registry::list_accounts(&conn).unwrap();
    let by_name = |n: &str| accounts.iter().find(|a| a.name == n).unwrap().current_balance;
    assert_eq!(by_name("Checking"), dec("3200"));
    assert_eq!(by_name("Savings"), dec("300"));
    assert_eq!(registry::total_balance(&conn).unwrap(), dec("3500"));
}

#[test]
fn add_rejects_category_of_the_wrong_kind() {
    let mut conn = setup();
    let err = run(
        &mut conn,
        &[
            "tx", "add", "--date", "2025-03-01", "--amount", "10", "--kind", "income",
            "--dest", "Checking", "--category", "Groceries",
        ],
    )
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LedgerError>(),
        Some(LedgerError::InconsistentReference(_))
    ));
    assert!(store::list_all(&conn).unwrap().is_empty());
}

#[test]
fn planned_transaction_needs_an_account_before_confirming() {
    let mut conn = setup();
    run(
        &mut conn,
        &[
            "tx", "add", "--planned", "--date", "2025-04-10", "--amount", "80", "--kind",
            "expense", "--category", "Groceries",
        ],
    )
    .unwrap();
    let id = store::list_all(&conn).unwrap()[0].id.to_string();

    let err = run(&mut conn, &["tx", "confirm", "--id", &id]).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LedgerError>(),
        Some(LedgerError::Validation(_))
    ));

    run(&mut conn, &["tx", "confirm", "--id", &id, "--origin", "Checking"]).unwrap();
    let tx = store::get_transaction(&conn, id.parse().unwrap()).unwrap();
    assert_eq!(tx.state, TransactionState::Confirmed);
    assert_eq!(
        registry::get_account(&conn, tx.origin_account_id.unwrap())
            .unwrap()
            .current_balance,
        dec("920")
    );
}

#[test]
fn edit_can_clear_a_reference_and_revert_to_planned() {
    let mut conn = setup();
    run(
        &mut conn,
        &[
            "tx", "add", "--date", "2025-04-10", "--amount", "80", "--kind", "expense",
            "--origin", "Checking", "--category", "Groceries",
        ],
    )
    .unwrap();

    // A confirmed expense cannot lose its account.
    assert!(run(&mut conn, &["tx", "edit", "--id", "1", "--clear-origin"]).is_err());

    run(
        &mut conn,
        &["tx", "edit", "--id", " 1 ", "--clear-origin", "--state", "planned", "--amount", "95.50"],
    )
    .unwrap();
    let tx = store::get_transaction(&conn, 1).unwrap();
    assert_eq!(tx.origin_account_id, None);
    assert_eq!(tx.amount, dec("95.50"));
    assert!(tx.is_planned());
}

#[test]
fn referenced_account_cannot_be_removed() {
    let mut conn = setup();
    run(
        &mut conn,
        &[
            "tx", "add", "--date", "2025-03-05", "--amount", "40", "--kind", "expense",
            "--origin", "1", "--category", "Groceries",
        ],
    )
    .unwrap();
    let err = run(&mut conn, &["account", "rm", "--id", "1"]).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LedgerError>(),
        Some(LedgerError::EntityInUse { entity: "account", id: 1, references: 1 })
    ));
    assert_eq!(registry::get_account(&conn, 1).unwrap().current_balance, dec("960"));
    assert_eq!(store::list_all(&conn).unwrap().len(), 1);

    run(&mut conn, &["account", "rm", "--id", "2"]).unwrap();
    assert_eq!(registry::list_accounts(&conn).unwrap().len(), 1);
}

#[test]
fn opening_balance_is_fixed_after_creation() {
    let mut conn = setup();
    let err = run(&mut conn, &["account", "edit", "--id", "1", "--opening", "5"]).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LedgerError>(),
        Some(LedgerError::Validation(_))
    ));
    run(&mut conn, &["account", "edit", "--id", "1", "--name", "Main"]).unwrap();
    let acct = registry::get_account(&conn, 1).unwrap();
    assert_eq!(acct.name, "Main");
    assert_eq!(acct.opening_balance, dec("1000"));
}

#[test]
fn list_filters_rows_without_touching_balances() {
    let mut conn = setup();
    for (date, amount, kind, extra) in [
        ("2025-05-01", "2000", "income", ["--dest", "Checking", "--category", "Salary"]),
        ("2025-05-02", "150", "expense", ["--origin", "Checking", "--category", "Groceries"]),
        ("2025-05-09", "60", "expense", ["--origin", "Checking", "--category", "Groceries"]),
    ] {
        let mut args = vec!["tx", "add", "--date", date, "--amount", amount, "--kind", kind];
        args.extend(extra);
        run(&mut conn, &args).unwrap();
    }
    run(
        &mut conn,
        &["tx", "list", "--from", "2025-05-01", "--to", "2025-05-31", "--category", "Groceries"],
    )
    .unwrap();

    let groceries = registry::category_by_name(&conn, "Groceries").unwrap().unwrap();
    let view = query::query(
        &conn,
        chrono::NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
        chrono::NaiveDate::from_ymd_opt(2025, 5, 31).unwrap(),
        &query::TransactionFilter {
            text: None,
            category_ids: Some([groceries.id].into()),
        },
    )
    .unwrap();
    assert_eq!(view.running_balances, vec![dec("2850"), dec("2790")]);
}

#[test]
fn missing_transaction_is_not_found() {
    let mut conn = setup();
    let err = run(&mut conn, &["tx", "rm", "--id", "42"]).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LedgerError>(),
        Some(LedgerError::NotFound { entity: "transaction", id: 42 })
    ));
}

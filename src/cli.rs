// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, value_parser};

fn parse_id(s: &str) -> Result<i64, String> {
    s.trim()
        .parse::<i64>()
        .map_err(|_| format!("'{}' is not a valid id", s))
}

fn parse_month_number(s: &str) -> Result<u32, String> {
    match s.trim().parse::<u32>() {
        Ok(m) if (1..=12).contains(&m) => Ok(m),
        _ => Err(format!("'{}' is not a month (1-12)", s)),
    }
}

fn id_arg() -> Arg {
    Arg::new("id")
        .long("id")
        .required(true)
        .value_parser(parse_id)
}

fn json_args() -> [Arg; 2] {
    [
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print JSON"),
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print one JSON object per line"),
    ]
}

fn account_cmd() -> Command {
    Command::new("account")
        .about("Manage accounts")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .about("Add an account")
                .arg(Arg::new("name").long("name").required(true))
                .arg(Arg::new("type").long("type").default_value("checking"))
                .arg(
                    Arg::new("opening")
                        .long("opening")
                        .default_value("0")
                        .help("Opening balance; fixed once the account exists"),
                ),
        )
        .subcommand(Command::new("list").about("List accounts with current balances").args(json_args()))
        .subcommand(Command::new("show").arg(id_arg()).args(json_args()))
        .subcommand(
            Command::new("edit")
                .about("Rename or retype an account")
                .arg(id_arg())
                .arg(Arg::new("name").long("name"))
                .arg(Arg::new("type").long("type"))
                .arg(Arg::new("opening").long("opening").hide(true)),
        )
        .subcommand(Command::new("rm").about("Delete an unused account").arg(id_arg()))
}

fn category_cmd() -> Command {
    Command::new("category")
        .about("Manage categories")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .arg(Arg::new("name").long("name").required(true))
                .arg(Arg::new("kind").long("kind").required(true).help("income|expense")),
        )
        .subcommand(
            Command::new("list")
                .arg(Arg::new("kind").long("kind"))
                .args(json_args()),
        )
        .subcommand(
            Command::new("edit")
                .arg(id_arg())
                .arg(Arg::new("name").long("name"))
                .arg(Arg::new("kind").long("kind")),
        )
        .subcommand(Command::new("rm").arg(id_arg()))
}

fn tx_fields(cmd: Command, required: bool) -> Command {
    cmd.arg(Arg::new("date").long("date").required(required).help("YYYY-MM-DD"))
        .arg(Arg::new("amount").long("amount").required(required))
        .arg(
            Arg::new("kind")
                .long("kind")
                .required(required)
                .help("income|expense|transfer"),
        )
        .arg(Arg::new("desc").long("desc"))
        .arg(Arg::new("origin").long("origin").help("Account paying out (id or name)"))
        .arg(Arg::new("dest").long("dest").help("Account receiving (id or name)"))
        .arg(Arg::new("category").long("category").help("Category id or name"))
}

fn tx_cmd() -> Command {
    Command::new("tx")
        .about("Record and browse transactions")
        .subcommand_required(true)
        .subcommand(
            tx_fields(Command::new("add"), true).arg(
                Arg::new("planned")
                    .long("planned")
                    .action(ArgAction::SetTrue)
                    .help("Record as planned instead of confirmed"),
            ),
        )
        .subcommand(
            tx_fields(Command::new("edit").arg(id_arg()), false)
                .arg(Arg::new("state").long("state").help("planned|confirmed"))
                .arg(Arg::new("clear-origin").long("clear-origin").action(ArgAction::SetTrue))
                .arg(Arg::new("clear-dest").long("clear-dest").action(ArgAction::SetTrue))
                .arg(Arg::new("clear-category").long("clear-category").action(ArgAction::SetTrue)),
        )
        .subcommand(
            Command::new("confirm")
                .about("Confirm a planned transaction, optionally assigning accounts")
                .arg(id_arg())
                .arg(Arg::new("origin").long("origin"))
                .arg(Arg::new("dest").long("dest")),
        )
        .subcommand(Command::new("show").arg(id_arg()).args(json_args()))
        .subcommand(Command::new("rm").arg(id_arg()))
        .subcommand(
            Command::new("list")
                .about("Transactions of a period with running balances")
                .arg(Arg::new("from").long("from").required(true).help("YYYY-MM-DD"))
                .arg(Arg::new("to").long("to").required(true).help("YYYY-MM-DD"))
                .arg(Arg::new("search").long("search"))
                .arg(
                    Arg::new("category")
                        .long("category")
                        .action(ArgAction::Append)
                        .help("Category id or name; repeatable"),
                )
                .args(json_args()),
        )
}

fn rule_fields(cmd: Command, required: bool) -> Command {
    cmd.arg(Arg::new("desc").long("desc").required(required))
        .arg(Arg::new("amount").long("amount").required(required))
        .arg(Arg::new("kind").long("kind").required(required).help("income|expense"))
        .arg(
            Arg::new("frequency")
                .long("frequency")
                .required(required)
                .help("monthly|weekly|annual"),
        )
        .arg(
            Arg::new("day")
                .long("day")
                .required(required)
                .value_parser(value_parser!(u32))
                .help("Day of month (1-31), or weekday 0=Mon..6=Sun for weekly rules"),
        )
        .arg(
            Arg::new("month")
                .long("month")
                .value_parser(parse_month_number)
                .help("Month for annual rules"),
        )
        .arg(Arg::new("category").long("category"))
}

fn rules_cmd() -> Command {
    Command::new("rules")
        .about("Recurring rules")
        .subcommand_required(true)
        .subcommand(rule_fields(Command::new("add"), true))
        .subcommand(
            Command::new("list")
                .arg(Arg::new("active").long("active").action(ArgAction::SetTrue))
                .args(json_args()),
        )
        .subcommand(
            rule_fields(Command::new("edit").arg(id_arg()), false)
                .arg(Arg::new("clear-month").long("clear-month").action(ArgAction::SetTrue))
                .arg(Arg::new("clear-category").long("clear-category").action(ArgAction::SetTrue)),
        )
        .subcommand(Command::new("enable").arg(id_arg()))
        .subcommand(Command::new("disable").arg(id_arg()))
        .subcommand(Command::new("rm").arg(id_arg()))
        .subcommand(
            Command::new("generate")
                .about("Create planned transactions for one month")
                .arg(
                    Arg::new("year")
                        .long("year")
                        .required(true)
                        .value_parser(value_parser!(i32)),
                )
                .arg(
                    Arg::new("month")
                        .long("month")
                        .required(true)
                        .value_parser(parse_month_number),
                )
                .args(json_args()),
        )
}

fn dashboard_cmd() -> Command {
    let year = || {
        Arg::new("year")
            .long("year")
            .required(true)
            .value_parser(value_parser!(i32))
    };
    Command::new("dashboard")
        .about("Yearly and monthly summaries")
        .subcommand_required(true)
        .subcommand(Command::new("summary").arg(year()).args(json_args()))
        .subcommand(
            Command::new("categories")
                .arg(year())
                .arg(
                    Arg::new("month")
                        .long("month")
                        .required(true)
                        .value_parser(parse_month_number),
                )
                .args(json_args()),
        )
}

fn export_cmd() -> Command {
    Command::new("export")
        .about("Export data")
        .subcommand_required(true)
        .subcommand(
            Command::new("transactions")
                .arg(Arg::new("from").long("from").required(true))
                .arg(Arg::new("to").long("to").required(true))
                .arg(
                    Arg::new("format")
                        .long("format")
                        .default_value("csv")
                        .value_parser(["csv", "json"]),
                )
                .arg(Arg::new("out").long("out").required(true)),
        )
}

pub fn build_cli() -> Command {
    Command::new("ledgerline")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Personal ledger: accounts, planned and confirmed transactions, recurring rules")
        .arg(
            Arg::new("db")
                .long("db")
                .global(true)
                .help("Database file (overrides LEDGERLINE_DB and the config file)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .subcommand(Command::new("init").about("Create the database"))
        .subcommand(account_cmd())
        .subcommand(category_cmd())
        .subcommand(tx_cmd())
        .subcommand(rules_cmd())
        .subcommand(dashboard_cmd())
        .subcommand(export_cmd())
        .subcommand(Command::new("doctor").about("Check stored data").args(json_args()))
}

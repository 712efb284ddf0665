// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::path::PathBuf;

use anyhow::Result;

use ledgerline::{cli, commands, config::Config, db, logging};

fn main() -> Result<()> {
    let matches = cli::build_cli().get_matches();

    let config = Config::load()?.with_database(matches.get_one::<String>("db").map(PathBuf::from));
    logging::init(config.log_filter.as_deref(), matches.get_flag("verbose"));

    let mut conn = db::open_or_init(&config)?;

    match matches.subcommand() {
        Some(("init", _)) => {
            let path = match &config.database {
                Some(p) => p.clone(),
                None => db::default_db_path()?,
            };
            println!("Database initialized at {}", path.display());
        }
        Some(("account", sub)) => commands::accounts::handle(&mut conn, sub)?,
        Some(("category", sub)) => commands::categories::handle(&mut conn, sub)?,
        Some(("tx", sub)) => commands::transactions::handle(&mut conn, sub)?,
        Some(("rules", sub)) => commands::rules::handle(&mut conn, sub)?,
        Some(("dashboard", sub)) => commands::dashboard::handle(&conn, sub)?,
        Some(("export", sub)) => commands::exporter::handle(&conn, sub)?,
        Some(("doctor", sub)) => commands::doctor::handle(&conn, sub)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}

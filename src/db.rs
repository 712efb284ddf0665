// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::{Connection, OptionalExtension, params};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Config;

pub(crate) static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "Ledgerline", "ledgerline"));

pub const SCHEMA_VERSION: &str = "1";

pub fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")
}

pub fn default_db_path() -> Result<PathBuf> {
    let proj = project_dirs()?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("ledgerline.sqlite"))
}

pub fn open_or_init(config: &Config) -> Result<Connection> {
    let path = match &config.database {
        Some(p) => p.clone(),
        None => default_db_path()?,
    };
    open_path(&path, config.busy_timeout_ms)
}

pub fn open_path(path: &Path, busy_timeout_ms: u64) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut conn =
        Connection::open(path).with_context(|| format!("Open DB at {}", path.display()))?;
    conn.busy_timeout(Duration::from_millis(busy_timeout_ms))?;
    init_schema(&mut conn)?;
    tracing::debug!(path = %path.display(), "database ready");
    Ok(conn)
}

/// Fresh in-memory database with the full schema; used by tests and dry runs.
pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory()?;
    init_schema(&mut conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS accounts(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        type TEXT NOT NULL,
        opening_balance TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS categories(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        kind TEXT NOT NULL CHECK(kind IN ('Income','Expense'))
    );

    -- default_category_id is not a foreign key: a rule may outlive its
    -- category, the scheduler reports it per rule.
    CREATE TABLE IF NOT EXISTS recurring_rules(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        description TEXT NOT NULL,
        default_amount TEXT NOT NULL,
        kind TEXT NOT NULL CHECK(kind IN ('Income','Expense')),
        frequency TEXT NOT NULL CHECK(frequency IN ('Monthly','Weekly','Annual')),
        day INTEGER NOT NULL,
        month INTEGER,
        default_category_id INTEGER,
        active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date TEXT NOT NULL,
        amount TEXT NOT NULL,
        kind TEXT NOT NULL CHECK(kind IN ('Income','Expense','Transfer')),
        state TEXT NOT NULL CHECK(state IN ('Planned','Confirmed')),
        description TEXT NOT NULL DEFAULT '',
        origin_account_id INTEGER,
        destination_account_id INTEGER,
        category_id INTEGER,
        recurring_rule_id INTEGER,
        scheduled_date TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(origin_account_id) REFERENCES accounts(id),
        FOREIGN KEY(destination_account_id) REFERENCES accounts(id),
        FOREIGN KEY(category_id) REFERENCES categories(id),
        FOREIGN KEY(recurring_rule_id) REFERENCES recurring_rules(id)
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date, id);
    CREATE UNIQUE INDEX IF NOT EXISTS idx_transactions_schedule
        ON transactions(recurring_rule_id, scheduled_date)
        WHERE recurring_rule_id IS NOT NULL;
    "#,
    )?;
    conn.execute(
        "INSERT INTO settings(key, value) VALUES('schema_version', ?1)
         ON CONFLICT(key) DO NOTHING",
        params![SCHEMA_VERSION],
    )?;
    Ok(())
}

pub fn schema_version(conn: &Connection) -> Result<Option<String>> {
    let v = conn
        .query_row(
            "SELECT value FROM settings WHERE key='schema_version'",
            [],
            |r| r.get(0),
        )
        .optional()?;
    Ok(v)
}

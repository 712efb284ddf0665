// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod accounts;
pub mod categories;
pub mod dashboard;
pub mod doctor;
pub mod exporter;
pub mod rules;
pub mod transactions;

use anyhow::{Result, anyhow};

pub(crate) fn required<'a>(m: &'a clap::ArgMatches, name: &str) -> Result<&'a str> {
    m.get_one::<String>(name)
        .map(|s| s.as_str())
        .ok_or_else(|| anyhow!("--{} is required", name))
}

pub(crate) fn required_id(m: &clap::ArgMatches) -> Result<i64> {
    m.get_one::<i64>("id")
        .copied()
        .ok_or_else(|| anyhow!("--id is required"))
}

pub(crate) fn output_flags(m: &clap::ArgMatches) -> (bool, bool) {
    (m.get_flag("json"), m.get_flag("jsonl"))
}

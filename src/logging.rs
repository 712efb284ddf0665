// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub const DEFAULT_FILTER: &str = "ledgerline=info";
pub const VERBOSE_FILTER: &str = "ledgerline=debug";

/// Picks the filter directive: `RUST_LOG` wins, then the configured filter,
/// then the built-in default.
pub fn filter_directive(env: Option<String>, configured: Option<&str>, verbose: bool) -> String {
    if let Some(v) = env.filter(|s| !s.trim().is_empty()) {
        return v;
    }
    if verbose {
        return VERBOSE_FILTER.to_string();
    }
    configured.unwrap_or(DEFAULT_FILTER).to_string()
}

/// Installs the global subscriber. Logs go to stderr so `--json` output stays clean.
pub fn init(configured: Option<&str>, verbose: bool) {
    let directive = filter_directive(std::env::var("RUST_LOG").ok(), configured, verbose);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_log_wins() {
        let d = filter_directive(Some("warn".into()), Some("ledgerline=trace"), true);
        assert_eq!(d, "warn");
    }

    #[test]
    fn verbose_beats_config() {
        assert_eq!(filter_directive(None, Some("error"), true), VERBOSE_FILTER);
        assert_eq!(filter_directive(None, Some("error"), false), "error");
        assert_eq!(filter_directive(Some(" ".into()), None, false), DEFAULT_FILTER);
    }
}

// SPDX-License-Identifier: Apache-2.0

//! Command-line surface (spec.md §6: `--config`, `--override`, `--log-prefix`,
//! `--no-console-wrapper`, `--debug`).

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "kismetd", about = "Wireless sniffer/IDS core daemon")]
pub struct Args {
    /// Path to a `key=value` config file (spec.md §1: parsing richness is
    /// an external collaborator's concern; this reads the core's own keys).
    #[arg(long, value_name = "file")]
    pub config: Option<PathBuf>,

    /// Repeatable `key=value` override, applied after the config file and
    /// environment (spec.md §6).
    #[arg(long = "override", value_name = "k=v")]
    pub overrides: Vec<String>,

    /// Directory prefix for log/capture output.
    #[arg(long, value_name = "dir")]
    pub log_prefix: Option<PathBuf>,

    /// Present for CLI-surface parity with the spec; this daemon never
    /// spawns a console wrapper, so the flag is accepted and ignored.
    #[arg(long)]
    pub no_console_wrapper: bool,

    /// Raises the default log level to `debug` for the `kismet_*` targets.
    #[arg(long)]
    pub debug: bool,
}

impl Args {
    /// Splits each `--override k=v` into a `(key, value)` pair, surfacing a
    /// fatal config error on a malformed entry rather than silently
    /// dropping it.
    pub fn parsed_overrides(&self) -> Result<Vec<(String, String)>, kismet_common::KismetError> {
        self.overrides
            .iter()
            .map(|entry| {
                entry
                    .split_once('=')
                    .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                    .ok_or_else(|| {
                        kismet_common::KismetError::Config(format!(
                            "--override {entry:?} is not key=value"
                        ))
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repeated_overrides() {
        let args = Args::parse_from([
            "kismetd",
            "--override",
            "httpd_port=9000",
            "--override",
            "debug=true",
        ]);
        let parsed = args.parsed_overrides().unwrap();
        assert_eq!(
            parsed,
            vec![
                ("httpd_port".to_string(), "9000".to_string()),
                ("debug".to_string(), "true".to_string()),
            ]
        );
    }

    #[test]
    fn rejects_override_without_equals() {
        let args = Args::parse_from(["kismetd", "--override", "nope"]);
        assert!(args.parsed_overrides().is_err());
    }
}

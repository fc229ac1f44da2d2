// SPDX-License-Identifier: Apache-2.0

//! Core configuration (spec.md §6 CLI/environment surface). Full config
//! *file* parsing is an explicit external collaborator (spec.md §1); this
//! module only owns the in-process defaults plus the `KISMET_*` environment
//! overrides the spec names, and a minimal `key=value` line reader good
//! enough for the core's own settings and `--override k=v` flags.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Process-wide settings gathered from defaults, an optional config file,
/// environment variables, and `--override` flags, in that increasing order
/// of precedence — mirroring the teacher's `Settings`-from-env layering
/// (`ddtelemetry::config::Settings`).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Config {
    pub log_prefix: PathBuf,
    pub httpd_port: u16,
    pub remote_listen_port: u16,
    pub default_hop_rate_hz: f64,
    pub hop_on_open: bool,
    pub split_same_sources: bool,
    pub random_channel_order: bool,
    pub retry_on_error: bool,
    pub device_max_age: Duration,
    pub device_keep_threshold: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_prefix: PathBuf::from("."),
            httpd_port: 2501,
            remote_listen_port: 3501,
            default_hop_rate_hz: 5.0,
            hop_on_open: true,
            split_same_sources: true,
            random_channel_order: false,
            retry_on_error: true,
            device_max_age: Duration::from_secs(3600),
            device_keep_threshold: 0,
        }
    }
}

impl Config {
    /// Loads defaults, then a config file's `key=value` lines (if given),
    /// then `KISMET_*` environment overrides, then explicit `--override`
    /// pairs — highest precedence last.
    pub fn load(
        config_path: Option<&std::path::Path>,
        overrides: &[(String, String)],
    ) -> Result<Config, crate::KismetError> {
        let mut cfg = Config::default();

        if let Some(path) = config_path {
            let text = std::fs::read_to_string(path)
                .map_err(|e| crate::KismetError::Config(format!("{}: {e}", path.display())))?;
            apply_kv(&mut cfg, &parse_kv_lines(&text))?;
        }

        apply_env_overrides(&mut cfg);

        let override_map: HashMap<String, String> = overrides.iter().cloned().collect();
        apply_kv(&mut cfg, &override_map)?;

        Ok(cfg)
    }
}

fn parse_kv_lines(text: &str) -> HashMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|l| l.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(port) = env::var("KISMET_HTTPD_PORT") {
        if let Ok(p) = port.parse() {
            cfg.httpd_port = p;
        }
    }
    if let Ok(prefix) = env::var("KISMET_LOG_PREFIX") {
        cfg.log_prefix = PathBuf::from(prefix);
    }
    // KISMET_CONF is consumed by the caller before `Config::load` runs (it
    // names an alternate config file path, the same role as `--config`).
}

fn apply_kv(cfg: &mut Config, kv: &HashMap<String, String>) -> Result<(), crate::KismetError> {
    for (key, value) in kv {
        match key.as_str() {
            "httpd_port" => {
                cfg.httpd_port = value
                    .parse()
                    .map_err(|_| crate::KismetError::Config(format!("bad httpd_port: {value}")))?
            }
            "remote_listen_port" => {
                cfg.remote_listen_port = value.parse().map_err(|_| {
                    crate::KismetError::Config(format!("bad remote_listen_port: {value}"))
                })?
            }
            "default_hop_rate_hz" => {
                cfg.default_hop_rate_hz = value.parse().map_err(|_| {
                    crate::KismetError::Config(format!("bad default_hop_rate_hz: {value}"))
                })?
            }
            "hop_on_open" => cfg.hop_on_open = parse_bool(value)?,
            "split_same_sources" => cfg.split_same_sources = parse_bool(value)?,
            "random_channel_order" => cfg.random_channel_order = parse_bool(value)?,
            "retry_on_error" => cfg.retry_on_error = parse_bool(value)?,
            "log_prefix" => cfg.log_prefix = PathBuf::from(value),
            "device_max_age_secs" => {
                let secs: u64 = value.parse().map_err(|_| {
                    crate::KismetError::Config(format!("bad device_max_age_secs: {value}"))
                })?;
                cfg.device_max_age = Duration::from_secs(secs);
            }
            "device_keep_threshold" => {
                cfg.device_keep_threshold = value.parse().map_err(|_| {
                    crate::KismetError::Config(format!("bad device_keep_threshold: {value}"))
                })?
            }
            // Unknown keys are tolerated: the real config file format has a
            // much larger surface owned by the external collaborator
            // (spec.md §1); the core only understands the keys it needs.
            _ => {}
        }
    }
    Ok(())
}

fn parse_bool(v: &str) -> Result<bool, crate::KismetError> {
    match v {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(crate::KismetError::Config(format!(
            "not a boolean: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::default();
        assert_eq!(cfg.remote_listen_port, 3501);
        assert!(cfg.retry_on_error);
    }

    #[test]
    fn overrides_win_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kismet.conf");
        std::fs::write(&path, "httpd_port=9000\n").unwrap();
        let cfg = Config::load(
            Some(&path),
            &[("httpd_port".to_string(), "9100".to_string())],
        )
        .unwrap();
        assert_eq!(cfg.httpd_port, 9100);
    }

    #[test]
    fn rejects_malformed_override() {
        let err = Config::load(None, &[("httpd_port".to_string(), "nope".to_string())]);
        assert!(err.is_err());
    }
}

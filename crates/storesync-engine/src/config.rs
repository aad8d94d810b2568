//! Engine YAML configuration with environment variable substitution.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var regex"));

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    pub destination: DestinationConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

/// Source catalog API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the catalog API (no trailing slash).
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Destination database and target schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    pub host: String,
    #[serde(default = "default_pg_port")]
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub dbname: String,
    /// Prefix of the content and attribute tables (`{prefix}posts`,
    /// `{prefix}postmeta`).
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,
    #[serde(default = "default_connect_retries")]
    pub connect_retries: u32,
}

/// Durable queue tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_stuck_timeout")]
    pub stuck_timeout_minutes: u32,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

/// Unattended-mode schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Daily sync time as `HH:MM` (24h, UTC); `None` disables it.
    #[serde(default)]
    pub daily_sync: Option<String>,
    #[serde(default = "default_reaper_interval")]
    pub reaper_interval_minutes: u32,
    /// Daily retention sweep time as `HH:MM`.
    #[serde(default = "default_purge_time")]
    pub purge_time: String,
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_pg_port() -> u16 {
    5432
}
fn default_table_prefix() -> String {
    "wp_".to_string()
}
fn default_connect_retries() -> u32 {
    3
}
fn default_db_path() -> String {
    "data/storesync.db".to_string()
}
fn default_max_attempts() -> u32 {
    3
}
fn default_stuck_timeout() -> u32 {
    10
}
fn default_retention_days() -> u32 {
    7
}
fn default_reaper_interval() -> u32 {
    10
}
fn default_purge_time() -> String {
    "02:00".to_string()
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            max_attempts: default_max_attempts(),
            stuck_timeout_minutes: default_stuck_timeout(),
            retention_days: default_retention_days(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            daily_sync: None,
            reaper_interval_minutes: default_reaper_interval(),
            purge_time: default_purge_time(),
        }
    }
}

/// Substitute `${VAR_NAME}` patterns with environment variable values.
///
/// # Errors
///
/// Returns an error if any referenced environment variable is not set.
pub fn substitute_env_vars(input: &str) -> Result<String> {
    let mut result = input.to_string();
    let mut missing = Vec::new();

    for cap in ENV_VAR_RE.captures_iter(input) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(val) => {
                result = result.replace(&cap[0], &val);
            }
            Err(_) => {
                missing.push(var_name.to_string());
            }
        }
    }

    if !missing.is_empty() {
        anyhow::bail!("Missing environment variable(s): {}", missing.join(", "));
    }

    Ok(result)
}

/// Parse a config YAML string (after env var substitution).
///
/// # Errors
///
/// Returns an error if env var substitution fails or the YAML is invalid.
pub fn parse_config_str(yaml_str: &str) -> Result<Config> {
    let substituted = substitute_env_vars(yaml_str)?;
    let config: Config =
        serde_yaml::from_str(&substituted).context("Failed to parse config YAML")?;
    Ok(config)
}

/// Parse a config YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the YAML is invalid.
pub fn load(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config_str(&content)
}

/// Parse a `HH:MM` schedule time into hour and minute.
#[must_use]
pub fn parse_hhmm(s: &str) -> Option<(u32, u32)> {
    let (h, m) = s.split_once(':')?;
    let hour: u32 = h.parse().ok()?;
    let minute: u32 = m.parse().ok()?;
    (hour < 24 && minute < 60).then_some((hour, minute))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_YAML: &str = r"
source:
  endpoint: http://erp.local/api
destination:
  host: localhost
  user: catalog
  dbname: storefront
";

    #[test]
    fn minimal_config_gets_defaults() {
        let config = parse_config_str(MINIMAL_YAML).unwrap();
        assert_eq!(config.source.timeout_secs, 30);
        assert_eq!(config.destination.port, 5432);
        assert_eq!(config.destination.table_prefix, "wp_");
        assert_eq!(config.destination.connect_retries, 3);
        assert_eq!(config.queue.max_attempts, 3);
        assert_eq!(config.queue.stuck_timeout_minutes, 10);
        assert_eq!(config.queue.retention_days, 7);
        assert!(config.schedule.daily_sync.is_none());
        assert_eq!(config.schedule.purge_time, "02:00");
    }

    #[test]
    fn env_var_substitution() {
        std::env::set_var("SS_TEST_PASS", "hunter2");
        let yaml = format!("{MINIMAL_YAML}  password: ${{SS_TEST_PASS}}\n");
        let config = parse_config_str(&yaml).unwrap();
        assert_eq!(config.destination.password, "hunter2");
        std::env::remove_var("SS_TEST_PASS");
    }

    #[test]
    fn missing_env_vars_all_reported() {
        let input = "${SS_MISSING_X} and ${SS_MISSING_Y}";
        let err = substitute_env_vars(input).unwrap_err().to_string();
        assert!(err.contains("SS_MISSING_X"));
        assert!(err.contains("SS_MISSING_Y"));
    }

    #[test]
    fn passthrough_without_env_vars() {
        let input = "host: localhost\nport: 5432";
        assert_eq!(substitute_env_vars(input).unwrap(), input);
    }

    #[test]
    fn full_schedule_section() {
        let yaml = format!(
            "{MINIMAL_YAML}schedule:\n  daily_sync: \"06:30\"\n  reaper_interval_minutes: 5\n"
        );
        let config = parse_config_str(&yaml).unwrap();
        assert_eq!(config.schedule.daily_sync.as_deref(), Some("06:30"));
        assert_eq!(config.schedule.reaper_interval_minutes, 5);
    }

    #[test]
    fn hhmm_parsing() {
        assert_eq!(parse_hhmm("06:30"), Some((6, 30)));
        assert_eq!(parse_hhmm("23:59"), Some((23, 59)));
        assert_eq!(parse_hhmm("24:00"), None);
        assert_eq!(parse_hhmm("12:60"), None);
        assert_eq!(parse_hhmm("noon"), None);
    }
}

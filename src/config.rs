//! Demo constants, with the two environment overrides read at startup.

use std::str::FromStr;
use std::time::Duration;

use log::LevelFilter;

use crate::error::ConfigError;

/// Length of one tick in milliseconds.
pub const TICK_ENV: &str = "COOP_TICK_MS";
/// Log level filter for stderr logging.
pub const LOG_ENV: &str = "COOP_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoConfig {
    pub tick: Duration,
    /// Wait of each unit in a group, in ticks, in scheduling order.
    pub durations: [u32; 3],
    pub id_bound: u32,
    pub payload_len: usize,
    pub payload_max: u32,
    pub log_level: LevelFilter,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            durations: [5, 8, 2],
            id_bound: 10,
            payload_len: 2,
            payload_max: 50,
            log_level: LevelFilter::Warn,
        }
    }
}

impl DemoConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup(TICK_ENV) {
            match value.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => config.tick = Duration::from_millis(ms),
                _ => return Err(ConfigError::InvalidTick { value }),
            }
        }

        if let Some(value) = lookup(LOG_ENV) {
            config.log_level = LevelFilter::from_str(value.trim())
                .map_err(|_| ConfigError::InvalidLogLevel { value })?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn defaults_without_overrides() {
        let config = DemoConfig::from_lookup(lookup(&[])).expect("config");
        assert_eq!(config, DemoConfig::default());
        assert_eq!(config.tick, Duration::from_secs(1));
        assert_eq!(config.durations, [5, 8, 2]);
        assert_eq!(config.id_bound, 10);
    }

    #[test]
    fn overrides_are_applied() {
        let config =
            DemoConfig::from_lookup(lookup(&[(TICK_ENV, "25"), (LOG_ENV, "debug")])).expect("config");
        assert_eq!(config.tick, Duration::from_millis(25));
        assert_eq!(config.log_level, LevelFilter::Debug);
    }

    #[test]
    fn invalid_values_are_rejected() {
        for bad in ["0", "-3", "fast"] {
            assert_eq!(
                DemoConfig::from_lookup(lookup(&[(TICK_ENV, bad)])),
                Err(ConfigError::InvalidTick {
                    value: bad.to_string()
                })
            );
        }
        assert!(matches!(
            DemoConfig::from_lookup(lookup(&[(LOG_ENV, "loud")])),
            Err(ConfigError::InvalidLogLevel { .. })
        ));
    }
}

use crate::{ClientError, ClientResult};

pub const HORIZON_DAYS_ENV_VAR: &str = "AGENDAR_HORIZON_DAYS";
pub const RUN_INTERVAL_DAYS_ENV_VAR: &str = "AGENDAR_RUN_INTERVAL_DAYS";
pub const DEFAULT_COMMISSION_ENV_VAR: &str = "AGENDAR_DEFAULT_COMMISSION_PERCENT";

/// Tunables threaded into the materializers and the commission engine.
///
/// The horizon must stay strictly larger than the run interval so that a
/// single missed scheduled run still leaves the agenda covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub horizon_days: i64,
    pub run_interval_days: i64,
    /// Whole-number percentage used when a professional has no override.
    pub default_commission_percent: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            horizon_days: 56,
            run_interval_days: 7,
            default_commission_percent: 0,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> ClientResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> ClientResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            horizon_days: parse_var(&lookup, HORIZON_DAYS_ENV_VAR)?
                .unwrap_or(defaults.horizon_days),
            run_interval_days: parse_var(&lookup, RUN_INTERVAL_DAYS_ENV_VAR)?
                .unwrap_or(defaults.run_interval_days),
            default_commission_percent: parse_var(&lookup, DEFAULT_COMMISSION_ENV_VAR)?
                .unwrap_or(defaults.default_commission_percent),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ClientResult<()> {
        if self.run_interval_days < 1 {
            return Err(ClientError::invalid_config(
                RUN_INTERVAL_DAYS_ENV_VAR,
                "run interval must be at least 1 day",
            ));
        }
        if self.horizon_days <= self.run_interval_days {
            return Err(ClientError::invalid_config(
                HORIZON_DAYS_ENV_VAR,
                "horizon must be longer than the run interval",
            ));
        }
        if self.default_commission_percent > 100 {
            return Err(ClientError::invalid_config(
                DEFAULT_COMMISSION_ENV_VAR,
                "commission percentage must be between 0 and 100",
            ));
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, name: &str) -> ClientResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<T>()
        .map(Some)
        .map_err(|_| ClientError::invalid_config(name, &format!("`{trimmed}` is not a number")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{EngineConfig, HORIZON_DAYS_ENV_VAR, RUN_INTERVAL_DAYS_ENV_VAR};

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<String, String>>();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = EngineConfig::from_lookup(lookup_from(&[]));
        assert!(config.is_ok());
        if let Ok(value) = config {
            assert_eq!(value, EngineConfig::default());
        }
    }

    #[test]
    fn horizon_must_exceed_run_interval() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            (HORIZON_DAYS_ENV_VAR, "7"),
            (RUN_INTERVAL_DAYS_ENV_VAR, "7"),
        ]));
        assert!(config.is_err());
        if let Err(error) = config {
            assert_eq!(error.code, "invalid_config");
            assert!(error.message.contains(HORIZON_DAYS_ENV_VAR));
        }
    }

    #[test]
    fn non_numeric_values_are_rejected() {
        let config = EngineConfig::from_lookup(lookup_from(&[(HORIZON_DAYS_ENV_VAR, "lots")]));
        assert!(config.is_err());
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = EngineConfig::from_lookup(lookup_from(&[(HORIZON_DAYS_ENV_VAR, "  ")]));
        assert!(config.is_ok());
        if let Ok(value) = config {
            assert_eq!(value.horizon_days, 56);
        }
    }
}

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::env;
use std::str::FromStr;

use crate::AnalysisError;

/// Which indicators the pipeline computes and with what parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub moving_average_windows: BTreeSet<usize>,
    pub bollinger_window: usize,
    pub bollinger_k: f64,
    pub rsi_window: usize,
    pub include_bollinger: bool,
    pub include_rsi: bool,
    pub include_volatility: bool,
    pub volatility_window: usize,
    pub trading_days_per_year: u32,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            moving_average_windows: BTreeSet::from([20, 50]),
            bollinger_window: 20,
            bollinger_k: 2.0,
            rsi_window: 14,
            include_bollinger: true,
            include_rsi: true,
            include_volatility: true,
            volatility_window: 20,
            trading_days_per_year: 252,
        }
    }
}

impl IndicatorConfig {
    /// Reject zero windows and non-positive multipliers.
    ///
    /// Parameters of disabled indicators are validated too, so a config that
    /// passes here stays valid when a flag is switched on later.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.moving_average_windows.contains(&0) {
            return Err(AnalysisError::InvalidConfig(
                "moving average windows must be positive".to_string(),
            ));
        }
        for (name, value) in [
            ("bollinger_window", self.bollinger_window),
            ("rsi_window", self.rsi_window),
            ("volatility_window", self.volatility_window),
        ] {
            if value == 0 {
                return Err(AnalysisError::InvalidConfig(format!("{} must be positive", name)));
            }
        }
        if !(self.bollinger_k.is_finite() && self.bollinger_k > 0.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "bollinger_k must be a positive number, got {}",
                self.bollinger_k
            )));
        }
        if self.trading_days_per_year == 0 {
            return Err(AnalysisError::InvalidConfig(
                "trading_days_per_year must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Load from `INDICATOR_*` environment variables, falling back to defaults
    /// for unset ones. The result is validated.
    pub fn from_env() -> Result<Self, AnalysisError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env` but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AnalysisError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let moving_average_windows = match lookup("INDICATOR_MA_WINDOWS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| parse_value::<usize>("INDICATOR_MA_WINDOWS", s))
                .collect::<Result<BTreeSet<_>, _>>()?,
            None => defaults.moving_average_windows,
        };

        let config = Self {
            moving_average_windows,
            bollinger_window: env_or(&lookup, "INDICATOR_BOLLINGER_WINDOW", defaults.bollinger_window)?,
            bollinger_k: env_or(&lookup, "INDICATOR_BOLLINGER_K", defaults.bollinger_k)?,
            rsi_window: env_or(&lookup, "INDICATOR_RSI_WINDOW", defaults.rsi_window)?,
            include_bollinger: env_or(&lookup, "INDICATOR_INCLUDE_BOLLINGER", defaults.include_bollinger)?,
            include_rsi: env_or(&lookup, "INDICATOR_INCLUDE_RSI", defaults.include_rsi)?,
            include_volatility: env_or(&lookup, "INDICATOR_INCLUDE_VOLATILITY", defaults.include_volatility)?,
            volatility_window: env_or(&lookup, "INDICATOR_VOLATILITY_WINDOW", defaults.volatility_window)?,
            trading_days_per_year: env_or(&lookup, "INDICATOR_TRADING_DAYS", defaults.trading_days_per_year)?,
        };

        config.validate()?;
        Ok(config)
    }
}

fn env_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, AnalysisError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => parse_value(key, raw.trim()),
        None => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T, AnalysisError> {
    raw.parse()
        .map_err(|_| AnalysisError::InvalidConfig(format!("{}: cannot parse '{}'", key, raw)))
}

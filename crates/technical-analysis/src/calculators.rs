use std::collections::BTreeSet;

use analysis_core::{AnalysisError, IndicatorCalculator, TimeSeriesFrame};

use crate::indicators::*;

pub const DAILY_RETURN: &str = "Daily_Return";
pub const CUMULATIVE_RETURN: &str = "Cumulative_Return";
pub const BB_UPPER: &str = "BB_upper";
pub const BB_LOWER: &str = "BB_lower";
pub const RSI: &str = "RSI";
pub const VOLATILITY: &str = "Volatility";

/// Column name of the simple moving average over `window` bars
pub fn ma_column(window: usize) -> String {
    format!("MA_{}", window)
}

fn positive_window(name: &str, window: usize) -> Result<usize, AnalysisError> {
    if window == 0 {
        return Err(AnalysisError::InvalidConfig(format!("{} must be positive", name)));
    }
    Ok(window)
}

/// Appends `Daily_Return` and `Cumulative_Return`
#[derive(Debug, Clone, Copy, Default)]
pub struct ReturnCalculator;

impl IndicatorCalculator for ReturnCalculator {
    fn name(&self) -> &'static str {
        "returns"
    }

    fn apply(&self, frame: &mut TimeSeriesFrame) -> Result<(), AnalysisError> {
        let daily = daily_returns(&frame.closes());
        let cumulative = cumulative_returns(&daily);
        frame.insert_column(DAILY_RETURN, daily)?;
        frame.insert_column(CUMULATIVE_RETURN, cumulative)
    }
}

/// Appends one `MA_<w>` column per window, smallest window first
#[derive(Debug, Clone)]
pub struct MovingAverageCalculator {
    windows: BTreeSet<usize>,
}

impl MovingAverageCalculator {
    pub fn new(windows: impl IntoIterator<Item = usize>) -> Result<Self, AnalysisError> {
        let windows = windows
            .into_iter()
            .map(|w| positive_window("moving average window", w))
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Self { windows })
    }

    pub fn windows(&self) -> impl Iterator<Item = usize> + '_ {
        self.windows.iter().copied()
    }
}

impl IndicatorCalculator for MovingAverageCalculator {
    fn name(&self) -> &'static str {
        "moving_averages"
    }

    fn apply(&self, frame: &mut TimeSeriesFrame) -> Result<(), AnalysisError> {
        let closes = frame.closes();
        for &window in &self.windows {
            frame.insert_column(ma_column(window), sma(&closes, window))?;
        }
        Ok(())
    }
}

/// Appends `BB_upper` / `BB_lower`, plus `MA_<w>` when no earlier step produced it
#[derive(Debug, Clone)]
pub struct BollingerBandCalculator {
    window: usize,
    k: f64,
}

impl BollingerBandCalculator {
    pub fn new(window: usize, k: f64) -> Result<Self, AnalysisError> {
        let window = positive_window("bollinger window", window)?;
        if !(k.is_finite() && k > 0.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "bollinger multiplier must be positive, got {}",
                k
            )));
        }
        Ok(Self { window, k })
    }
}

impl IndicatorCalculator for BollingerBandCalculator {
    fn name(&self) -> &'static str {
        "bollinger"
    }

    fn apply(&self, frame: &mut TimeSeriesFrame) -> Result<(), AnalysisError> {
        let bands = bollinger_bands(&frame.closes(), self.window, self.k);

        let middle_name = ma_column(self.window);
        if !frame.has_column(&middle_name) {
            frame.insert_column(middle_name, bands.middle)?;
        }
        frame.insert_column(BB_UPPER, bands.upper)?;
        frame.insert_column(BB_LOWER, bands.lower)
    }
}

/// Appends `RSI`
#[derive(Debug, Clone)]
pub struct RsiCalculator {
    window: usize,
}

impl RsiCalculator {
    pub fn new(window: usize) -> Result<Self, AnalysisError> {
        Ok(Self {
            window: positive_window("rsi window", window)?,
        })
    }
}

impl IndicatorCalculator for RsiCalculator {
    fn name(&self) -> &'static str {
        "rsi"
    }

    fn apply(&self, frame: &mut TimeSeriesFrame) -> Result<(), AnalysisError> {
        let values = rsi(&frame.closes(), self.window);
        frame.insert_column(RSI, values)
    }
}

/// Appends `Volatility` (annualized rolling standard deviation of daily returns)
#[derive(Debug, Clone)]
pub struct VolatilityCalculator {
    window: usize,
    trading_days_per_year: u32,
}

impl VolatilityCalculator {
    pub fn new(window: usize, trading_days_per_year: u32) -> Result<Self, AnalysisError> {
        if trading_days_per_year == 0 {
            return Err(AnalysisError::InvalidConfig(
                "trading days per year must be positive".to_string(),
            ));
        }
        Ok(Self {
            window: positive_window("volatility window", window)?,
            trading_days_per_year,
        })
    }
}

impl IndicatorCalculator for VolatilityCalculator {
    fn name(&self) -> &'static str {
        "volatility"
    }

    fn apply(&self, frame: &mut TimeSeriesFrame) -> Result<(), AnalysisError> {
        // Reuse the return column when the pipeline already produced it
        let values = match frame.column(DAILY_RETURN) {
            Some(returns) => rolling_volatility(returns, self.window, self.trading_days_per_year),
            None => {
                let returns = daily_returns(&frame.closes());
                rolling_volatility(&returns, self.window, self.trading_days_per_year)
            }
        };
        frame.insert_column(VOLATILITY, values)
    }
}

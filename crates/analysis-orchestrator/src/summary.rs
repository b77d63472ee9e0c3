use analysis_core::TimeSeriesFrame;
use serde::{Deserialize, Serialize};

/// Headline figures of one enriched frame.
///
/// Derived once from a frame; a recomputed frame needs a new record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    /// Last close of the period
    pub latest_price: f64,
    /// First open of the period
    pub period_open: f64,
    pub change_abs: f64,
    /// Percent change against the period open; absent when the open is not positive
    pub change_pct: Option<f64>,
    /// Highest intraday high
    pub high: f64,
    /// Lowest intraday low
    pub low: f64,
    pub avg_volume: f64,
}

impl SummaryRecord {
    pub fn from_frame(frame: &TimeSeriesFrame) -> Self {
        let bars = frame.bars();
        let latest_price = frame.last_bar().close;
        let period_open = frame.first_bar().open;

        let change_pct = if period_open > 0.0 {
            Some((latest_price / period_open - 1.0) * 100.0)
        } else {
            None
        };

        let high = bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let low = bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        let avg_volume = bars.iter().map(|b| b.volume as f64).sum::<f64>() / bars.len() as f64;

        Self {
            latest_price,
            period_open,
            change_abs: latest_price - period_open,
            change_pct,
            high,
            low,
            avg_volume,
        }
    }
}

use async_trait::async_trait;
use crate::{AnalysisError, MarketData, Period, TimeSeriesFrame};

/// A step of the indicator pipeline that appends columns to a frame
pub trait IndicatorCalculator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Append this calculator's columns. Must not touch columns it did not create.
    fn apply(&self, frame: &mut TimeSeriesFrame) -> Result<(), AnalysisError>;
}

/// Source of daily bars and ticker metadata
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch(&self, ticker: &str, period: Period) -> Result<MarketData, AnalysisError>;
}

/// Text generation backend used for narratives and ad-hoc answers
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, AnalysisError>;
}

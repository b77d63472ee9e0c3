use analysis_core::{AnalysisError, Bar, IndicatorCalculator, IndicatorConfig, TimeSeriesFrame};
use rayon::prelude::*;
use technical_analysis::{
    BollingerBandCalculator, MovingAverageCalculator, ReturnCalculator, RsiCalculator,
    VolatilityCalculator,
};

use crate::summary::SummaryRecord;

/// An enriched frame together with the summary computed from it
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedAnalysis {
    pub frame: TimeSeriesFrame,
    pub summary: SummaryRecord,
}

/// Runs the enabled indicator calculators over a fresh frame.
///
/// Calculator order is fixed (returns, moving averages, Bollinger, RSI,
/// volatility) so later steps can read columns produced by earlier ones.
pub struct PipelineOrchestrator {
    config: IndicatorConfig,
    calculators: Vec<Box<dyn IndicatorCalculator>>,
}

impl PipelineOrchestrator {
    pub fn new(config: IndicatorConfig) -> Result<Self, AnalysisError> {
        config.validate()?;

        let mut calculators: Vec<Box<dyn IndicatorCalculator>> = vec![
            Box::new(ReturnCalculator),
            Box::new(MovingAverageCalculator::new(config.moving_average_windows.iter().copied())?),
        ];
        if config.include_bollinger {
            calculators.push(Box::new(BollingerBandCalculator::new(
                config.bollinger_window,
                config.bollinger_k,
            )?));
        }
        if config.include_rsi {
            calculators.push(Box::new(RsiCalculator::new(config.rsi_window)?));
        }
        if config.include_volatility {
            calculators.push(Box::new(VolatilityCalculator::new(
                config.volatility_window,
                config.trading_days_per_year,
            )?));
        }

        Ok(Self { config, calculators })
    }

    pub fn config(&self) -> &IndicatorConfig {
        &self.config
    }

    /// Names of the steps that will run, in order
    pub fn steps(&self) -> Vec<&'static str> {
        self.calculators.iter().map(|c| c.name()).collect()
    }

    /// Enrich `bars` and summarize the result. Short histories are not an
    /// error; they only leave more leading values undefined.
    pub fn run(&self, bars: Vec<Bar>) -> Result<EnrichedAnalysis, AnalysisError> {
        let mut frame = TimeSeriesFrame::new(bars)?;

        for calculator in &self.calculators {
            tracing::debug!("Applying {} over {} bars", calculator.name(), frame.len());
            calculator.apply(&mut frame)?;
        }

        let summary = SummaryRecord::from_frame(&frame);
        tracing::info!(
            "Pipeline produced {} columns over {} bars (latest close {:.2})",
            frame.columns().len(),
            frame.len(),
            summary.latest_price
        );

        Ok(EnrichedAnalysis { frame, summary })
    }

    /// Run independent jobs in parallel, each on its own frame.
    pub fn run_batch(
        &self,
        jobs: Vec<(String, Vec<Bar>)>,
    ) -> Vec<(String, Result<EnrichedAnalysis, AnalysisError>)> {
        jobs.into_par_iter()
            .map(|(ticker, bars)| {
                let result = self.run(bars);
                if let Err(e) = &result {
                    tracing::warn!("Pipeline failed for {}: {}", ticker, e);
                }
                (ticker, result)
            })
            .collect()
    }
}

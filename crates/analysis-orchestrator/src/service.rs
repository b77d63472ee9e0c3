use std::sync::Arc;

use analysis_core::{AnalysisError, MarketDataSource, NarrativeGenerator, Period, TickerInfo};
use serde::Serialize;
use tokio::task::JoinSet;

use crate::pipeline::{EnrichedAnalysis, PipelineOrchestrator};
use crate::prompt::{analysis_prompt, question_prompt, ANALYSIS_MAX_TOKENS, QUESTION_MAX_TOKENS};

/// Outcome of narrative generation. A failure never replaces the numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Narrative {
    Generated { text: String },
    Unavailable { reason: String },
}

/// Fetched and enriched data for one ticker
#[derive(Debug, Clone)]
pub struct PreparedAnalysis {
    pub ticker: String,
    pub period: Period,
    pub info: TickerInfo,
    pub analysis: EnrichedAnalysis,
}

#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub prepared: PreparedAnalysis,
    pub narrative: Narrative,
}

/// Fetch -> enrich -> narrate for a single request.
///
/// Holds no per-request state, so one instance can serve concurrent calls.
pub struct AnalysisService {
    source: Arc<dyn MarketDataSource>,
    generator: Option<Arc<dyn NarrativeGenerator>>,
    pipeline: PipelineOrchestrator,
}

fn normalize_ticker(ticker: &str) -> Result<String, AnalysisError> {
    let ticker = ticker.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(AnalysisError::InvalidInput("ticker must not be empty".to_string()));
    }
    Ok(ticker)
}

impl AnalysisService {
    pub fn new(source: Arc<dyn MarketDataSource>, pipeline: PipelineOrchestrator) -> Self {
        Self {
            source,
            generator: None,
            pipeline,
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn NarrativeGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn pipeline(&self) -> &PipelineOrchestrator {
        &self.pipeline
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    /// Fetch bars for `ticker` and run the indicator pipeline over them.
    pub async fn prepare(&self, ticker: &str, period: Period) -> Result<PreparedAnalysis, AnalysisError> {
        let ticker = normalize_ticker(ticker)?;
        tracing::info!("Preparing analysis for {} ({})", ticker, period);

        let data = self.source.fetch(&ticker, period).await.map_err(|e| match e {
            AnalysisError::NoData(_) => e,
            other => AnalysisError::NoData(other.to_string()),
        })?;
        tracing::debug!("Fetched {} bars and {} info fields for {}", data.bars.len(), data.info.len(), ticker);

        let analysis = self.pipeline.run(data.bars)?;

        Ok(PreparedAnalysis {
            ticker,
            period,
            info: data.info,
            analysis,
        })
    }

    /// Prepare several tickers concurrently. Results come back in completion order.
    pub async fn prepare_many(
        self: &Arc<Self>,
        tickers: Vec<String>,
        period: Period,
    ) -> Vec<(String, Result<PreparedAnalysis, AnalysisError>)> {
        let mut tasks = JoinSet::new();

        for ticker in tickers {
            let service = Arc::clone(self);
            tasks.spawn(async move {
                let result = service.prepare(&ticker, period).await;
                (ticker, result)
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(pair) => results.push(pair),
                Err(e) => tracing::warn!("Analysis task failed to complete: {}", e),
            }
        }
        results
    }

    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, AnalysisError> {
        let generator = self
            .generator
            .as_ref()
            .ok_or_else(|| AnalysisError::NoNarrative("no narrative generator configured".to_string()))?;

        generator.generate(prompt, max_tokens).await.map_err(|e| match e {
            AnalysisError::NoNarrative(_) => e,
            other => AnalysisError::NoNarrative(other.to_string()),
        })
    }

    /// Prepare the data, then ask for a narrative. A generation failure is
    /// reported inside the report instead of failing the call.
    pub async fn analyze(&self, ticker: &str, period: Period) -> Result<AnalysisReport, AnalysisError> {
        let prepared = self.prepare(ticker, period).await?;
        let prompt = analysis_prompt(&prepared.ticker, &prepared.analysis, &prepared.info);

        let narrative = match self.generate(&prompt, ANALYSIS_MAX_TOKENS).await {
            Ok(text) => Narrative::Generated { text },
            Err(e) => {
                tracing::warn!("Narrative unavailable for {}: {}", prepared.ticker, e);
                Narrative::Unavailable { reason: e.to_string() }
            }
        };

        Ok(AnalysisReport { prepared, narrative })
    }

    /// Answer a free-form question about `ticker`.
    pub async fn ask(&self, ticker: &str, period: Period, question: &str) -> Result<String, AnalysisError> {
        if question.trim().is_empty() {
            return Err(AnalysisError::InvalidInput("question must not be empty".to_string()));
        }

        let prepared = self.prepare(ticker, period).await?;
        let prompt = question_prompt(&prepared.ticker, question, &prepared.analysis);
        self.generate(&prompt, QUESTION_MAX_TOKENS).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{Bar, IndicatorConfig, MarketData};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    struct FakeSource {
        bars: Vec<Bar>,
        fail: bool,
    }

    #[async_trait]
    impl MarketDataSource for FakeSource {
        async fn fetch(&self, ticker: &str, _period: Period) -> Result<MarketData, AnalysisError> {
            if self.fail {
                return Err(AnalysisError::InvalidData(format!("upstream rejected {}", ticker)));
            }
            Ok(MarketData {
                bars: self.bars.clone(),
                info: TickerInfo::new(),
            })
        }
    }

    struct FakeGenerator {
        reply: Result<String, AnalysisError>,
        prompts: Mutex<Vec<(String, u32)>>,
    }

    impl FakeGenerator {
        fn new(reply: Result<String, AnalysisError>) -> Self {
            Self {
                reply,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl NarrativeGenerator for FakeGenerator {
        async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, AnalysisError> {
            self.prompts.lock().unwrap().push((prompt.to_string(), max_tokens));
            self.reply.clone()
        }
    }

    fn sample_bars() -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        (0..25)
            .map(|i| Bar {
                date: start + chrono::Duration::days(i),
                open: 50.0 + i as f64,
                high: 51.0 + i as f64,
                low: 49.0 + i as f64,
                close: 50.5 + i as f64,
                volume: 2_000,
            })
            .collect()
    }

    fn service(source: FakeSource) -> AnalysisService {
        let pipeline = PipelineOrchestrator::new(IndicatorConfig::default()).unwrap();
        AnalysisService::new(Arc::new(source), pipeline)
    }

    #[tokio::test]
    async fn test_prepare_normalizes_ticker() {
        let svc = service(FakeSource { bars: sample_bars(), fail: false });
        let prepared = svc.prepare("  msft ", Period::ThreeMonths).await.unwrap();

        assert_eq!(prepared.ticker, "MSFT");
        assert_eq!(prepared.period, Period::ThreeMonths);
        assert_eq!(prepared.analysis.frame.len(), 25);
    }

    #[tokio::test]
    async fn test_blank_ticker_rejected() {
        let svc = service(FakeSource { bars: sample_bars(), fail: false });
        let err = svc.prepare("   ", Period::OneMonth).await.unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_fetch_failure_is_no_data() {
        let svc = service(FakeSource { bars: vec![], fail: true });
        let err = svc.analyze("AAPL", Period::OneMonth).await.unwrap_err();

        assert!(matches!(err, AnalysisError::NoData(_)));
        assert!(err.is_no_data());
    }

    #[tokio::test]
    async fn test_empty_fetch_is_empty_series() {
        let svc = service(FakeSource { bars: vec![], fail: false });
        let err = svc.prepare("AAPL", Period::OneMonth).await.unwrap_err();
        assert_eq!(err, AnalysisError::EmptySeries);
    }

    #[tokio::test]
    async fn test_analyze_with_narrative() {
        let generator = Arc::new(FakeGenerator::new(Ok("Looks steady.".to_string())));
        let svc = service(FakeSource { bars: sample_bars(), fail: false }).with_generator(generator.clone());

        let report = svc.analyze("aapl", Period::OneMonth).await.unwrap();

        assert_eq!(report.narrative, Narrative::Generated { text: "Looks steady.".to_string() });
        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].0.contains("AAPL"));
        assert_eq!(prompts[0].1, ANALYSIS_MAX_TOKENS);
    }

    #[tokio::test]
    async fn test_generator_failure_keeps_data() {
        let generator = Arc::new(FakeGenerator::new(Err(AnalysisError::NoNarrative("timeout".to_string()))));
        let svc = service(FakeSource { bars: sample_bars(), fail: false }).with_generator(generator);

        let report = svc.analyze("AAPL", Period::OneMonth).await.unwrap();

        assert!(matches!(report.narrative, Narrative::Unavailable { .. }));
        assert_eq!(report.prepared.analysis.frame.len(), 25);
    }

    #[tokio::test]
    async fn test_missing_generator_is_unavailable() {
        let svc = service(FakeSource { bars: sample_bars(), fail: false });
        let report = svc.analyze("AAPL", Period::OneMonth).await.unwrap();

        assert!(matches!(report.narrative, Narrative::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_ask() {
        let generator = Arc::new(FakeGenerator::new(Ok("Moderately.".to_string())));
        let svc = service(FakeSource { bars: sample_bars(), fail: false }).with_generator(generator.clone());

        let answer = svc.ask("AAPL", Period::OneMonth, "How volatile is it?").await.unwrap();

        assert_eq!(answer, "Moderately.");
        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].0.contains("How volatile is it?"));
        assert_eq!(prompts[0].1, QUESTION_MAX_TOKENS);
    }

    #[tokio::test]
    async fn test_ask_failure_is_no_narrative() {
        let generator = Arc::new(FakeGenerator::new(Err(AnalysisError::InvalidData("bad reply".to_string()))));
        let svc = service(FakeSource { bars: sample_bars(), fail: false }).with_generator(generator);

        let err = svc.ask("AAPL", Period::OneMonth, "Why?").await.unwrap_err();
        assert!(matches!(err, AnalysisError::NoNarrative(_)));

        let err = svc.ask("AAPL", Period::OneMonth, " ").await.unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_prepare_many() {
        let svc = Arc::new(service(FakeSource { bars: sample_bars(), fail: false }));
        let results = svc
            .prepare_many(vec!["AAA".to_string(), "".to_string()], Period::OneMonth)
            .await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().any(|(t, r)| t == "AAA" && r.is_ok()));
        assert!(results.iter().any(|(t, r)| t.is_empty() && r.is_err()));
    }
}

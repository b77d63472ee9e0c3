pub mod cache;
pub mod payload;
pub mod pipeline;
pub mod prompt;
pub mod service;
pub mod summary;

pub use cache::{CachedMarketData, DEFAULT_CACHE_TTL_SECS};
pub use pipeline::{EnrichedAnalysis, PipelineOrchestrator};
pub use service::{AnalysisReport, AnalysisService, Narrative, PreparedAnalysis};
pub use summary::SummaryRecord;

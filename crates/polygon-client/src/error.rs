use analysis_core::AnalysisError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PolygonError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Rate limited by Polygon after {0} attempts")]
    RateLimited(u32),

    #[error("Missing configuration: {0}")]
    MissingConfig(String),
}

impl From<PolygonError> for AnalysisError {
    fn from(e: PolygonError) -> Self {
        AnalysisError::NoData(e.to_string())
    }
}

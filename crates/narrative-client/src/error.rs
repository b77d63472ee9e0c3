use analysis_core::AnalysisError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NarrativeError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Missing configuration: {0}")]
    MissingConfig(String),
}

pub type NarrativeResult<T> = Result<T, NarrativeError>;

impl From<NarrativeError> for AnalysisError {
    fn from(err: NarrativeError) -> Self {
        AnalysisError::NoNarrative(err.to_string())
    }
}

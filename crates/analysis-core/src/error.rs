use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Empty series: no bars supplied")]
    EmptySeries,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("No data: {0}")]
    NoData(String),

    #[error("No narrative: {0}")]
    NoNarrative(String),
}

impl AnalysisError {
    /// True for failures of the market-data collaborator (or an empty result from it).
    pub fn is_no_data(&self) -> bool {
        matches!(self, AnalysisError::NoData(_) | AnalysisError::EmptySeries)
    }
}

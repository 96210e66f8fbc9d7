//! Error type shared by every madhype-core operation.

use madhype_stats::StatsError;

/// Everything that can go wrong in an analysis run. Errors are never
/// transient.
#[derive(Debug, thiserror::Error)]
pub enum MadhypeError {
    /// A count, probability or threshold outside its domain.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// An approximation was requested where the caller demanded validity.
    #[error("precondition violated: {0}")]
    PreconditionViolation(String),

    /// Nothing to analyze, e.g. zero wells or an empty grid.
    #[error("empty input: {0}")]
    EmptyInput(String),

    #[error(transparent)]
    Stats(#[from] StatsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MadhypeError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }

    pub fn empty(message: impl Into<String>) -> Self {
        Self::EmptyInput(message.into())
    }
}

pub type Result<T> = std::result::Result<T, MadhypeError>;

pub(crate) fn check_probability(name: &str, p: f64) -> Result<()> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(MadhypeError::invalid(format!(
            "{name} must lie in [0, 1], got {p}"
        )))
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndicatorError {
    #[error("Invalid comparison type: {0}")]
    InvalidComparisonType(String),

    #[error("Invalid totals strategy: {0}")]
    InvalidTotalsStrategy(String),

    #[error("Invalid reference year {0}: must be greater than zero")]
    InvalidReferenceYear(i32),

    #[error("Invalid smoothing parameter {name}={value}: must be within (0, 1]")]
    InvalidSmoothingParameter { name: String, value: f64 },

    #[error("Invalid season length {0}: must be at least 2")]
    InvalidSeasonLength(usize),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, IndicatorError>;

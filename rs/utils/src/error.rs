use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum QuantizationError {
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid cluster config: {0}")]
    InvalidClusterConfig(String),

    #[error("insufficient points: need at least {required}, got {available}")]
    InsufficientPoints { required: usize, available: usize },

    #[error("expected {expected} codes, got {actual}")]
    CodeLengthMismatch { expected: usize, actual: usize },

    #[error("code {code} at stage {stage} is out of range for {num_centroids} centroids")]
    InvalidCode {
        stage: usize,
        code: usize,
        num_centroids: usize,
    },
}

pub type Result<T> = std::result::Result<T, QuantizationError>;

/// Returns `DimensionMismatch` unless `actual == expected`.
pub fn check_dimension(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(QuantizationError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

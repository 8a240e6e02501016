pub mod artifacts;
pub mod classifier;
pub mod engine;
pub mod scaler;

/// Runtime failure while scaling or scoring a single feature vector.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("expected {expected} features, got {found}")]
    WidthMismatch { expected: usize, found: usize },
    #[error("scaler returned {found} values for {expected} inputs")]
    ScalerOutput { expected: usize, found: usize },
    #[error("classifier returned {found} probabilities for {expected} classes")]
    ProbabilityCount { expected: usize, found: usize },
    #[error("classifier returned an invalid probability distribution: {0}")]
    InvalidProbabilities(String),
    #[error("classifier produced no output")]
    EmptyOutput,
}

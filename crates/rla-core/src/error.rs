use thiserror::Error;

pub type AuditResult<T> = Result<T, AuditError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuditError {
    #[error("invalid population range: a = {a} is greater than b = {b}")]
    InvalidRange { a: i64, b: i64 },

    #[error("infeasible sample: {n} distinct draws requested from a population of {population}")]
    InfeasibleSample { n: usize, population: u128 },

    #[error("invalid skip: {skip} previously drawn entries exceed the sample size {n}")]
    InvalidSkip { skip: usize, n: usize },

    #[error("invalid window: start {from} is past end {to}")]
    InvalidWindow { from: usize, to: usize },

    #[error("negative {field}: {value}")]
    NegativeCount { field: &'static str, value: i64 },

    #[error("risk limit must lie strictly between 0 and 1, got {0}")]
    InvalidRiskLimit(f64),

    #[error("invalid seed: {0}")]
    InvalidSeed(String),

    #[error("unknown choice {choice:?} in contest {contest:?}")]
    UnknownChoice { contest: String, choice: String },

    #[error("invalid contest {contest:?}: {reason}")]
    InvalidContest { contest: String, reason: String },

    #[error("published sample does not match recomputation: {0}")]
    SampleMismatch(String),

    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for AuditError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

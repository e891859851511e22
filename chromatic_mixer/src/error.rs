//! Error types for mixture search operations
//!
//! Configuration problems fail fast at session construction. Surrogate
//! failures never abort a search: they travel inside the proposal as a
//! [`SurrogateError`] so callers can tell a degraded step from a guided one.

use std::fmt;

/// Result type alias for mixture search operations
pub type MixerResult<T> = Result<T, MixerError>;

/// Error type for session, candidate and bench operations
#[derive(Debug, Clone, PartialEq)]
pub enum MixerError {
    /// Session configuration rejected at construction
    InvalidConfiguration {
        parameter: String,
        value: String,
        reason: String,
    },

    /// A mixture would overflow its destination vessel
    CapacityExceeded {
        requested: f64,
        capacity: f64,
        context: String,
    },

    /// No novel mixture could be produced within the attempt bound
    ExhaustedSearchSpace { context: String, attempts: usize },

    /// Vector length disagrees with the configured dye count
    DimensionMismatch {
        expected: usize,
        got: usize,
        context: String,
    },

    /// Mixture violates the step or budget invariants
    InvalidMixture { details: String },

    /// The external bench failed while dispensing or reading
    Bench { operation: String, details: String },
}

impl fmt::Display for MixerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MixerError::InvalidConfiguration {
                parameter,
                value,
                reason,
            } => {
                write!(
                    f,
                    "Invalid configuration for parameter '{}' with value '{}': {}",
                    parameter, value, reason
                )
            }
            MixerError::CapacityExceeded {
                requested,
                capacity,
                context,
            } => {
                write!(
                    f,
                    "Capacity exceeded in {}: requested {} but only {} fits",
                    context, requested, capacity
                )
            }
            MixerError::ExhaustedSearchSpace { context, attempts } => {
                write!(
                    f,
                    "Search space exhausted in {}: no novel mixture after {} attempts",
                    context, attempts
                )
            }
            MixerError::DimensionMismatch {
                expected,
                got,
                context,
            } => {
                write!(
                    f,
                    "Dimension mismatch in {}: expected {} dyes, got {}",
                    context, expected, got
                )
            }
            MixerError::InvalidMixture { details } => {
                write!(f, "Invalid mixture: {}", details)
            }
            MixerError::Bench { operation, details } => {
                write!(f, "Bench failure during {}: {}", operation, details)
            }
        }
    }
}

impl std::error::Error for MixerError {}

impl MixerError {
    /// Create an invalid configuration error
    pub fn invalid_config(
        parameter: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        MixerError::InvalidConfiguration {
            parameter: parameter.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a capacity exceeded error
    pub fn capacity_exceeded(requested: f64, capacity: f64, context: impl Into<String>) -> Self {
        MixerError::CapacityExceeded {
            requested,
            capacity,
            context: context.into(),
        }
    }

    /// Create a search space exhaustion error
    pub fn exhausted(context: impl Into<String>, attempts: usize) -> Self {
        MixerError::ExhaustedSearchSpace {
            context: context.into(),
            attempts,
        }
    }

    /// Create a dimension mismatch error
    pub fn dimension_mismatch(expected: usize, got: usize, context: impl Into<String>) -> Self {
        MixerError::DimensionMismatch {
            expected,
            got,
            context: context.into(),
        }
    }

    /// Create an invalid mixture error
    pub fn invalid_mixture(details: impl Into<String>) -> Self {
        MixerError::InvalidMixture {
            details: details.into(),
        }
    }

    /// Wrap a bench failure, keeping the full context chain as text
    pub fn bench(operation: impl Into<String>, err: &anyhow::Error) -> Self {
        MixerError::Bench {
            operation: operation.into(),
            details: format!("{err:#}"),
        }
    }
}

/// Reasons the surrogate model could not produce a guided proposal.
///
/// None of these abort a search; the optimizer substitutes a random
/// mixture and reports the reason alongside it.
#[derive(Debug, Clone, PartialEq)]
pub enum SurrogateError {
    /// No experiments to learn from
    EmptyTrainingSet,
    /// Feature rows and labels disagree in shape
    DimensionMismatch { expected: usize, got: usize },
    /// A training label was NaN or infinite
    NonFiniteLabel { index: usize },
    /// The ensemble produced a NaN or infinite prediction
    NonFinitePrediction { candidate: usize },
    /// The ensemble was asked to predict with zero trees
    EmptyEnsemble,
}

impl fmt::Display for SurrogateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurrogateError::EmptyTrainingSet => write!(f, "training set is empty"),
            SurrogateError::DimensionMismatch { expected, got } => {
                write!(f, "expected {} rows or columns, got {}", expected, got)
            }
            SurrogateError::NonFiniteLabel { index } => {
                write!(f, "training label {} is not finite", index)
            }
            SurrogateError::NonFinitePrediction { candidate } => {
                write!(f, "prediction for candidate {} is not finite", candidate)
            }
            SurrogateError::EmptyEnsemble => write!(f, "ensemble has no trees"),
        }
    }
}

impl std::error::Error for SurrogateError {}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when a numeric parameter's lower bound exceeds its upper bound
    /// or either bound is not finite.
    #[error("invalid bounds for '{name}': low ({low}) must be less than or equal to high ({high})")]
    InvalidBounds {
        /// The offending parameter.
        name: String,
        /// The lower bound value.
        low: f64,
        /// The upper bound value.
        high: f64,
    },

    /// Returned when categorical choices are empty.
    #[error("categorical parameter '{0}' has no choices")]
    EmptyChoices(String),

    /// Returned when a parameter name is empty.
    #[error("parameter names cannot be empty")]
    EmptyName,

    /// Returned when two parameters in one space share a name.
    #[error("duplicate parameter name '{0}'")]
    DuplicateParameter(String),

    /// Returned when a declared default lies outside its parameter's domain.
    #[error("default value of '{0}' is outside its domain")]
    InvalidDefault(String),

    /// Returned when a pipeline is built over a space without parameters.
    #[error("parameter space is empty")]
    EmptySpace,

    /// Returned when a count-like setting (top-K, levels, components, period) is not positive.
    #[error("invalid cardinality for '{name}': {value}")]
    InvalidCardinality {
        /// The name of the setting.
        name: &'static str,
        /// The rejected value.
        value: usize,
    },

    /// Returned when a ratio-like setting lies outside its valid range.
    #[error("invalid ratio for '{name}': {value}")]
    InvalidRatio {
        /// The name of the setting.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// Returned when a source similarity weight lies outside `[0, 1]`.
    #[error("invalid similarity for source {index}: {value} must be in [0, 1]")]
    InvalidSimilarity {
        /// Index of the source history.
        index: usize,
        /// The rejected weight.
        value: f64,
    },

    /// Returned when a step identifier is not recognised.
    #[error("unknown compression step '{0}'")]
    UnknownStep(String),

    /// Returned when an update strategy identifier is not recognised.
    #[error("unknown update strategy '{0}'")]
    UnknownUpdateStrategy(String),

    /// Returned when a step's input requirements cannot be met by the pipeline.
    #[error("incompatible step '{step}': {reason}")]
    IncompatibleStep {
        /// Name of the step.
        step: String,
        /// Why the step cannot run in this position.
        reason: String,
    },

    /// Returned when a point does not have the shape of the space it is mapped from.
    #[error("shape mismatch: expected {expected} parameters, got {got}")]
    ShapeMismatch {
        /// Number of parameters in the expected space.
        expected: usize,
        /// Number of values in the supplied point.
        got: usize,
    },

    /// Returned when a point or request names a parameter the space does not contain.
    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),

    /// Returned when a value's kind does not match its parameter (e.g. a float for a categorical).
    #[error("value kind mismatch for parameter '{0}'")]
    ValueKindMismatch(String),

    /// Returned when point mapping is requested before `compress_space` has run.
    #[error("pipeline has not been compressed yet")]
    NotCompressed,

    /// Returned by importance or density estimators that cannot produce a result.
    ///
    /// Steps catch this and fall back to their no-op behaviour.
    #[error("estimator failure: {0}")]
    Estimator(String),

    /// Returned when an internal invariant is violated.
    #[error("internal error: {0}")]
    Internal(&'static str),

    /// Returned when JSON export fails.
    #[cfg(feature = "serde")]
    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = core::result::Result<T, Error>;

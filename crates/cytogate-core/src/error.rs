//! # Error Types: Structured Error Hierarchy
//!
//! Defines the error types used throughout cytogate. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Configuration errors ([`StrategyError`], parameter validation in
//!   [`TransformError::InvalidParameter`]) surface when a strategy is built,
//!   before any sample is touched.
//! - Numeric errors ([`TransformError::Domain`], [`CompensationError::Singular`])
//!   abort the evaluation of the sample that triggered them and carry the
//!   offending value so the caller can report it.
//! - Structural errors name the gate path and the reference that failed.

use thiserror::Error;

/// Top-level error type for cytogate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CytogateError {
    /// Transform evaluation or configuration failed.
    #[error("transform error: {0}")]
    Transform(#[from] TransformError),

    /// Compensation matrix could not be applied or inverted.
    #[error("compensation error: {0}")]
    Compensation(#[from] CompensationError),

    /// A dimension could not be resolved against a sample.
    #[error("dimension error: {0}")]
    Dimension(#[from] DimensionError),

    /// The gating strategy is structurally invalid.
    #[error("strategy error: {0}")]
    Strategy(#[from] StrategyError),

    /// Sample data was rejected at ingestion.
    #[error("sample error: {0}")]
    Sample(#[from] SampleError),

    /// A forward/inverse symmetry self-check failed.
    #[error("tolerance violation: {0}")]
    Tolerance(#[from] ToleranceViolation),

    /// Identifier failed validation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Error raised by a transform.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    /// Input value lies outside the transform's valid domain.
    #[error("value {value} is outside the domain of transform '{transform}'")]
    Domain {
        /// Transform name.
        transform: String,
        /// The offending input value.
        value: f64,
    },

    /// The parameter set is not valid for the transform kind.
    #[error("invalid parameters for transform '{transform}': {reason}")]
    InvalidParameter {
        /// Transform name.
        transform: String,
        /// What was wrong with the parameters.
        reason: String,
    },

    /// The transform needs a second (reference) column and was applied to
    /// a single column.
    #[error("transform '{transform}' requires a reference column")]
    RequiresReference {
        /// Transform name.
        transform: String,
    },

    /// Paired columns (numerator/denominator) differ in length.
    #[error("transform '{transform}' received columns of length {expected} and {found}")]
    LengthMismatch {
        /// Transform name.
        transform: String,
        /// Length of the primary column.
        expected: usize,
        /// Length of the reference column.
        found: usize,
    },

    /// The operation does not apply to this transform kind.
    #[error("transform '{transform}' is a {kind} transform; {operation} is not supported")]
    UnsupportedOperation {
        /// Transform name.
        transform: String,
        /// Transform kind label.
        kind: String,
        /// Attempted operation.
        operation: String,
    },
}

/// Error in spillover compensation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompensationError {
    /// The spillover matrix is not invertible.
    #[error("compensation matrix '{matrix}' is singular")]
    Singular {
        /// Matrix name.
        matrix: String,
    },

    /// Matrix dimensions do not agree with the detector list.
    #[error("compensation matrix '{matrix}' has shape {rows}x{cols} but {detectors} detectors")]
    Shape {
        /// Matrix name.
        matrix: String,
        /// Row count supplied.
        rows: usize,
        /// Column count supplied (of the first mismatching row).
        cols: usize,
        /// Detector count supplied.
        detectors: usize,
    },

    /// A detector named by the matrix is absent from the event data.
    #[error("compensation matrix '{matrix}' references missing channel '{channel}'")]
    MissingChannel {
        /// Matrix name.
        matrix: String,
        /// Missing channel name.
        channel: String,
    },

    /// A spillover coefficient is NaN or infinite.
    #[error("compensation matrix '{matrix}' has non-finite coefficient {value} at ({row}, {col})")]
    NonFinite {
        /// Matrix name.
        matrix: String,
        /// Row of the coefficient.
        row: usize,
        /// Column of the coefficient.
        col: usize,
        /// The coefficient.
        value: f64,
    },

    /// Detector names are repeated.
    #[error("compensation matrix '{matrix}' lists detector '{detector}' more than once")]
    DuplicateDetector {
        /// Matrix name.
        matrix: String,
        /// Repeated detector.
        detector: String,
    },
}

/// Error resolving a dimension against a sample.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DimensionError {
    /// The referenced channel is not present in the sample.
    #[error("channel '{channel}' is not present in the sample")]
    MissingChannel {
        /// Channel name.
        channel: String,
    },

    /// The dimension asks for the sample's embedded spillover but the
    /// sample carries none.
    #[error("sample '{sample}' has no embedded spillover matrix")]
    MissingSpillover {
        /// Sample identifier.
        sample: String,
    },

    /// Two columns that must align have different lengths.
    #[error("column length mismatch: expected {expected}, found {found}")]
    LengthMismatch {
        /// Expected length.
        expected: usize,
        /// Actual length.
        found: usize,
    },
}

/// Structural error in a gating strategy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StrategyError {
    /// A boolean gate references a gate that has not been defined.
    #[error("gate '{gate}' references undefined gate '{reference}'")]
    UndefinedGateReference {
        /// Referencing gate.
        gate: String,
        /// The unresolved reference.
        reference: String,
    },

    /// An unqualified reference matches more than one gate.
    #[error("gate '{gate}' reference '{reference}' is ambiguous; qualify it with a path")]
    AmbiguousGateReference {
        /// Referencing gate.
        gate: String,
        /// The ambiguous reference.
        reference: String,
    },

    /// The parent/reference graph contains a cycle.
    #[error("gate dependency graph contains a cycle through: {}", gates.join(", "))]
    CyclicGateGraph {
        /// Gates that could not be ordered.
        gates: Vec<String>,
    },

    /// A sibling with the same name already exists.
    #[error("gate '{gate}' already exists under '{parent}'")]
    DuplicateGateName {
        /// Gate name.
        gate: String,
        /// Parent path.
        parent: String,
    },

    /// The requested parent gate does not exist.
    #[error("parent gate '{parent}' does not exist")]
    ParentNotFound {
        /// Parent path.
        parent: String,
    },

    /// No gate lives at the given path.
    #[error("gate '{path}' does not exist")]
    GateNotFound {
        /// Requested path.
        path: String,
    },

    /// A dimension references a transform that is not registered.
    #[error("gate '{gate}' references undefined transform '{transform}'")]
    UndefinedTransform {
        /// Referencing gate.
        gate: String,
        /// Transform name.
        transform: String,
    },

    /// A dimension references a compensation matrix that is not registered.
    #[error("gate '{gate}' references undefined compensation '{compensation}'")]
    UndefinedCompensation {
        /// Referencing gate.
        gate: String,
        /// Compensation name.
        compensation: String,
    },

    /// Gate geometry is malformed (vertex count, covariance shape, ...).
    #[error("gate '{gate}' has invalid geometry: {reason}")]
    InvalidGeometry {
        /// Gate name.
        gate: String,
        /// What is wrong.
        reason: String,
    },
}

/// Sample data rejected at ingestion.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SampleError {
    /// A row or column does not match the channel count.
    #[error("expected {expected} values per event, found {found} (event {event})")]
    ChannelCountMismatch {
        /// Channel count.
        expected: usize,
        /// Values supplied.
        found: usize,
        /// Offending event (row) index.
        event: usize,
    },

    /// Columns have different event counts.
    #[error("channel '{channel}' has {found} events, expected {expected}")]
    EventCountMismatch {
        /// Channel name.
        channel: String,
        /// Expected event count.
        expected: usize,
        /// Actual event count.
        found: usize,
    },

    /// A value is NaN or infinite.
    #[error("non-finite value in channel '{channel}' at event {event}")]
    NonFinite {
        /// Channel name.
        channel: String,
        /// Event index.
        event: usize,
    },

    /// Channel names are not unique.
    #[error("duplicate channel name '{0}'")]
    DuplicateChannel(String),
}

/// A forward/inverse round trip drifted beyond the allowed tolerance.
///
/// Produced only by the symmetry self-check utilities, never during
/// gate evaluation.
#[derive(Error, Debug, Clone, PartialEq)]
#[error(
    "transform '{transform}' round trip of {input} returned {recovered} (tolerance {tolerance})"
)]
pub struct ToleranceViolation {
    /// Transform name.
    pub transform: String,
    /// Original input.
    pub input: f64,
    /// Value recovered by `inverse(forward(input))`.
    pub recovered: f64,
    /// Relative tolerance that was exceeded.
    pub tolerance: f64,
}

/// Identifier validation failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Identifier is empty or whitespace.
    #[error("{kind} must not be empty")]
    Empty {
        /// Identifier kind.
        kind: &'static str,
    },

    /// Identifier contains a reserved character.
    #[error("{kind} '{value}' contains reserved character '{character}'")]
    ReservedCharacter {
        /// Identifier kind.
        kind: &'static str,
        /// Rejected value.
        value: String,
        /// Offending character.
        character: char,
    },
}

//! Error type shared by every stage of the estimator.

use crate::landmarks::Axis;

/// Errors raised while validating input or running the estimator.
#[derive(Debug, Clone, PartialEq)]
pub enum GroundTruthError {
    /// No annotators, or annotators without samples.
    EmptyInput {
        /// Number of annotators provided.
        annotators: usize,
        /// Number of samples per annotator.
        samples: usize,
    },
    /// An annotator contributed a different number of samples than the first one.
    RaggedSamples {
        /// Offending annotator row.
        annotator: usize,
        /// Sample count of the first annotator.
        expected: usize,
        /// Sample count of the offending annotator.
        got: usize,
    },
    /// A sample coordinate is NaN or infinite.
    NonFiniteSample {
        /// Annotator row.
        annotator: usize,
        /// Sample index within the annotator.
        sample: usize,
    },
    /// Landmark rows and metadata rows are not index-aligned.
    DimensionMismatch {
        /// Annotator count of the landmark tensor.
        landmarks: usize,
        /// Row count of the metadata table.
        metadata: usize,
    },
    /// Precision along an axis sums to zero or overflows, so weights are undefined.
    DegeneratePrecision {
        /// Axis whose weights could not be normalized.
        axis: Axis,
    },
    /// A precision entry is zero, negative or not finite.
    InvalidPrecision {
        /// Annotator row.
        annotator: usize,
        /// Axis of the offending entry.
        axis: Axis,
    },
    /// A ranked selection count resolves to nothing useful.
    InvalidSelectCount {
        /// Human-readable description of the requested count.
        requested: String,
        /// Annotators available for selection.
        available: usize,
    },
    /// A selection index does not address a row of the tensor.
    IndexOutOfRange {
        /// Offending index.
        index: usize,
        /// Number of rows available.
        len: usize,
    },
    /// Per-axis selections disagree in length and cannot form a tensor.
    AxisLengthMismatch {
        /// Rows kept along x.
        x: usize,
        /// Rows kept along y.
        y: usize,
    },
    /// A selection round did not reduce the annotator count.
    SelectorNonProgress {
        /// One-based elimination round.
        round: usize,
        /// Annotators remaining before and after the round.
        annotators: usize,
    },
    /// The elimination loop hit its round limit before one annotator remained.
    RoundLimitExceeded {
        /// Configured or derived round limit.
        limit: usize,
        /// Annotators remaining when the limit was hit.
        remaining: usize,
    },
    /// Configuration values are out of range.
    InvalidConfig(String),
}

impl std::fmt::Display for GroundTruthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyInput {
                annotators,
                samples,
            } => write!(
                f,
                "empty input: {} annotators with {} samples each",
                annotators, samples
            ),
            Self::RaggedSamples {
                annotator,
                expected,
                got,
            } => write!(
                f,
                "annotator {} has {} samples, expected {}",
                annotator, got, expected
            ),
            Self::NonFiniteSample { annotator, sample } => write!(
                f,
                "non-finite coordinate at annotator {}, sample {}",
                annotator, sample
            ),
            Self::DimensionMismatch {
                landmarks,
                metadata,
            } => write!(
                f,
                "dimension mismatch: {} landmark rows vs {} metadata rows",
                landmarks, metadata
            ),
            Self::DegeneratePrecision { axis } => {
                write!(f, "degenerate precision sum along {} axis", axis)
            }
            Self::InvalidPrecision { annotator, axis } => write!(
                f,
                "precision of annotator {} along {} axis must be finite and positive",
                annotator, axis
            ),
            Self::InvalidSelectCount {
                requested,
                available,
            } => write!(
                f,
                "invalid selection count {} for {} annotators",
                requested, available
            ),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "index {} out of range for {} rows", index, len)
            }
            Self::AxisLengthMismatch { x, y } => write!(
                f,
                "per-axis selections differ in length: x keeps {}, y keeps {}",
                x, y
            ),
            Self::SelectorNonProgress { round, annotators } => write!(
                f,
                "selection round {} did not reduce {} annotators",
                round, annotators
            ),
            Self::RoundLimitExceeded { limit, remaining } => write!(
                f,
                "round limit {} reached with {} annotators remaining",
                limit, remaining
            ),
            Self::InvalidConfig(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for GroundTruthError {}

//! crowdtruth — robust ground-truth estimation for crowd-sourced 2D landmarks.
//!
//! Many annotators each place the same landmark several times. The estimator
//! alternates two steps until a single annotator row remains:
//!
//! 1. **Converge** – precision-weighted mean, where an annotator's precision
//!    is the inverse mean absolute deviation of its samples from the current
//!    estimate.
//! 2. **Select** – drop the least reliable annotators with a
//!    [`SelectionStrategy`].
//!
//! Every intermediate estimate is kept in a [`HistoryLog`]; its last entry is
//! the ground-truth estimate.
//!
//! # Public API
//! - [`GroundTruthEstimator`] and [`GroundTruthConfig`] as primary entry points
//! - [`LandmarkTensor`] and [`AnnotatorMetadata`] for input
//! - [`converge_mean`], [`annotator_precision`] and [`SelectionStrategy`] for
//!   running single stages
//!
//! Reading annotation files, downloading datasets and plotting are left to
//! callers.

mod converge;
mod error;
mod estimator;
mod history;
mod landmarks;
mod metadata;
mod precision;
mod select;

pub use converge::{converge_mean, ConvergeConfig, MeanEstimate, StopRule};
pub use error::GroundTruthError;
pub use estimator::{estimate_ground_truth, GroundTruthConfig, GroundTruthEstimator};
pub use history::{HistoryEntry, HistoryLog, HistoryReport, HistoryStep};
pub use landmarks::{Axis, LandmarkTensor};
pub use metadata::{filter_category, AnnotatorCategory, AnnotatorMetadata, AnnotatorRecord};
pub use precision::{annotator_precision, PrecisionMatrix};
pub use select::{SelectCount, Selection, SelectionStrategy};

pub use nalgebra::Vector2;

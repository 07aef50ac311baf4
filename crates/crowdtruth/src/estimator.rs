//! Elimination loop: converge, select, record, repeat.
//!
//! [`GroundTruthEstimator`] is the primary entry point. Each round converges
//! a precision-weighted mean over the remaining annotators, narrows the
//! annotator set with the configured [`SelectionStrategy`], and appends the
//! outcome to a [`HistoryLog`]. The loop ends once a single annotator row
//! remains; the last history entry holds the ground-truth estimate.

use serde::{Deserialize, Serialize};

use crate::converge::{converge_mean, ConvergeConfig};
use crate::error::GroundTruthError;
use crate::history::HistoryLog;
use crate::landmarks::{Axis, LandmarkTensor};
use crate::metadata::AnnotatorMetadata;
use crate::select::SelectionStrategy;

/// Configuration of a full ground-truth run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundTruthConfig {
    /// Mean convergence parameters used in every round.
    pub converge: ConvergeConfig,
    /// Elimination policy.
    pub strategy: SelectionStrategy,
    /// Upper bound on elimination rounds.
    ///
    /// `None` bounds the loop by `annotators - 1`, the most rounds any
    /// strategy that makes progress can need.
    pub max_rounds: Option<usize>,
}

impl GroundTruthConfig {
    pub fn validate(&self) -> Result<(), GroundTruthError> {
        self.converge.validate()?;
        if self.max_rounds == Some(0) {
            return Err(GroundTruthError::InvalidConfig(
                "max_rounds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Ground-truth estimator.
///
/// Create once, run on many landmark sets.
///
/// # Examples
///
/// ```
/// use crowdtruth::{
///     AnnotatorCategory, AnnotatorMetadata, AnnotatorRecord, GroundTruthEstimator,
///     LandmarkTensor, SelectionStrategy,
/// };
///
/// let landmarks = LandmarkTensor::new(vec![
///     vec![[10.0, 12.0], [10.2, 11.9]],
///     vec![[9.8, 12.1], [10.1, 12.0]],
///     vec![[14.0, 7.0], [6.0, 16.0]],
/// ])?;
/// let metadata = AnnotatorMetadata::new(vec![
///     AnnotatorRecord::new("e1", AnnotatorCategory::Expert),
///     AnnotatorRecord::new("e2", AnnotatorCategory::Expert),
///     AnnotatorRecord::new("w1", AnnotatorCategory::Worker),
/// ]);
///
/// let estimator = GroundTruthEstimator::with_strategy(SelectionStrategy::WorstSingleElimination);
/// let history = estimator.run(landmarks, &metadata)?;
/// assert_eq!(history.len(), 3);
/// let truth = history.final_mean().expect("non-empty history");
/// assert!((truth.x - 10.0).abs() < 0.5 && (truth.y - 12.0).abs() < 0.5);
/// # Ok::<(), crowdtruth::GroundTruthError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct GroundTruthEstimator {
    config: GroundTruthConfig,
}

impl GroundTruthEstimator {
    pub fn new(config: GroundTruthConfig) -> Self {
        Self { config }
    }

    /// Default convergence settings with an explicit elimination policy.
    pub fn with_strategy(strategy: SelectionStrategy) -> Self {
        Self::new(GroundTruthConfig {
            strategy,
            ..GroundTruthConfig::default()
        })
    }

    pub fn config(&self) -> &GroundTruthConfig {
        &self.config
    }

    /// Run elimination until one annotator row remains.
    ///
    /// `metadata` must be index-aligned with the rows of `landmarks`; it is
    /// copied into the returned history. The history starts with the
    /// unweighted global mean and gains one entry per round.
    pub fn run(
        &self,
        landmarks: LandmarkTensor,
        metadata: &AnnotatorMetadata,
    ) -> Result<HistoryLog, GroundTruthError> {
        estimate_ground_truth(landmarks, metadata, &self.config)
    }
}

/// Functional form of [`GroundTruthEstimator::run`].
pub fn estimate_ground_truth(
    landmarks: LandmarkTensor,
    metadata: &AnnotatorMetadata,
    config: &GroundTruthConfig,
) -> Result<HistoryLog, GroundTruthError> {
    config.validate()?;
    metadata.check_aligned(&landmarks)?;

    let n_start = landmarks.n_annotators();
    let max_rounds = config
        .max_rounds
        .unwrap_or_else(|| n_start.saturating_sub(1));

    if !config.strategy.guarantees_progress() {
        tracing::debug!(
            "{:?} may keep every annotator; each round is checked for progress",
            config.strategy
        );
    }

    let mut history = HistoryLog::new(metadata);
    history.add(landmarks.global_mean(), None, None)?;

    // Metadata row behind each current tensor row, per axis.
    let mut origin: [Vec<usize>; 2] = [(0..n_start).collect(), (0..n_start).collect()];
    let mut landmarks = landmarks;
    let mut round = 0;

    while landmarks.n_annotators() > 1 {
        if round >= max_rounds {
            return Err(GroundTruthError::RoundLimitExceeded {
                limit: max_rounds,
                remaining: landmarks.n_annotators(),
            });
        }
        round += 1;

        let estimate = converge_mean(&landmarks, &config.converge)?;
        if !estimate.converged {
            tracing::warn!(
                "round {}: mean did not converge within {} iterations",
                round,
                estimate.iterations
            );
        }

        let selection = config.strategy.select(&estimate.precision)?;
        let narrowed = selection.apply(&landmarks)?;
        if narrowed.n_annotators() >= landmarks.n_annotators() {
            return Err(GroundTruthError::SelectorNonProgress {
                round,
                annotators: landmarks.n_annotators(),
            });
        }

        origin = Axis::ALL.map(|axis| {
            selection
                .included(axis)
                .iter()
                .map(|&row| origin[axis.index()][row])
                .collect()
        });

        tracing::info!(
            "round {}: {} -> {} annotators, mean=({:.4}, {:.4})",
            round,
            landmarks.n_annotators(),
            narrowed.n_annotators(),
            estimate.mean.x,
            estimate.mean.y
        );

        history.add_round(
            estimate.mean,
            narrowed.clone(),
            origin.clone(),
            estimate.converged,
        )?;
        landmarks = narrowed;
    }

    tracing::info!(
        "ground truth after {} rounds from {} annotators: {}",
        round,
        n_start,
        history
    );
    Ok(history)
}

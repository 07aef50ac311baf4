//! Precision-weighted mean estimation.
//!
//! Starting from the unweighted global mean, each iteration scores every
//! annotator by its precision around the current estimate and replaces the
//! estimate with the precision-weighted average of the annotators' own
//! sample means. Iteration stops when the change between two consecutive
//! estimates satisfies the [`StopRule`], or after `max_iterations`.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::error::GroundTruthError;
use crate::landmarks::LandmarkTensor;
use crate::precision::{annotator_precision, PrecisionMatrix};

/// Stop predicate applied to the per-axis change of the mean estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopRule {
    /// Stop as soon as the change along at least one axis is below `tol`.
    #[default]
    AnyAxis,
}

impl StopRule {
    pub fn is_satisfied(self, delta: &Vector2<f64>, tol: f64) -> bool {
        match self {
            Self::AnyAxis => delta.iter().any(|d| *d < tol),
        }
    }
}

/// Configuration for [`converge_mean`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergeConfig {
    /// Maximum number of weighting iterations.
    pub max_iterations: usize,
    /// Change in mean position (per axis) treated as converged.
    pub tol: f64,
    /// How per-axis changes are combined into a stop decision.
    pub stop_rule: StopRule,
}

impl Default for ConvergeConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            tol: 1e-4,
            stop_rule: StopRule::AnyAxis,
        }
    }
}

impl ConvergeConfig {
    pub fn validate(&self) -> Result<(), GroundTruthError> {
        if self.max_iterations == 0 {
            return Err(GroundTruthError::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if !(self.tol.is_finite() && self.tol >= 0.0) {
            return Err(GroundTruthError::InvalidConfig(format!(
                "tol must be finite and non-negative, got {}",
                self.tol
            )));
        }
        Ok(())
    }
}

/// Outcome of [`converge_mean`].
#[derive(Debug, Clone, PartialEq)]
pub struct MeanEstimate {
    /// Precision-weighted mean estimate.
    pub mean: Vector2<f64>,
    /// Annotator precision around the estimate that produced `mean`.
    pub precision: PrecisionMatrix,
    /// Iterations actually performed.
    pub iterations: usize,
    /// `false` when the iteration cap was hit before the stop rule held.
    pub converged: bool,
}

/// Converge on a precision-weighted estimate of the landmark location.
pub fn converge_mean(
    landmarks: &LandmarkTensor,
    config: &ConvergeConfig,
) -> Result<MeanEstimate, GroundTruthError> {
    config.validate()?;

    let annotator_means = landmarks.annotator_means();
    let mut mean = landmarks.global_mean();
    // Infinite previous estimate so the first update can never pass the stop rule.
    let mut prev = Vector2::repeat(f64::INFINITY);

    let mut iteration = 0;
    loop {
        iteration += 1;
        let precision = annotator_precision(landmarks, &mean);
        let weights = precision.weights()?;

        mean = annotator_means
            .iter()
            .zip(&weights)
            .fold(Vector2::<f64>::zeros(), |acc, (m, w)| {
                acc + Vector2::new(m.x * w[0], m.y * w[1])
            });

        let delta = (mean - prev).abs();
        tracing::trace!(
            "iteration {}: mean=({:.6}, {:.6}) delta=({:.3e}, {:.3e})",
            iteration,
            mean.x,
            mean.y,
            delta.x,
            delta.y
        );

        if config.stop_rule.is_satisfied(&delta, config.tol) {
            tracing::debug!(
                "mean converged after {} iterations over {} annotators",
                iteration,
                landmarks.n_annotators()
            );
            return Ok(MeanEstimate {
                mean,
                precision,
                iterations: iteration,
                converged: true,
            });
        }

        if iteration >= config.max_iterations {
            tracing::debug!(
                "mean did not converge within {} iterations (tol={})",
                config.max_iterations,
                config.tol
            );
            return Ok(MeanEstimate {
                mean,
                precision,
                iterations: iteration,
                converged: false,
            });
        }

        prev = mean;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn scenario() -> LandmarkTensor {
        LandmarkTensor::new(vec![
            vec![[-1.0, -1.0]; 2],
            vec![[1.0, 3.0]; 2],
            vec![[2.1, 5.0]; 2],
        ])
        .expect("tensor")
    }

    fn with_iterations(max_iterations: usize) -> ConvergeConfig {
        ConvergeConfig {
            max_iterations,
            ..ConvergeConfig::default()
        }
    }

    #[test]
    fn single_iteration_differs_from_converged_estimate() {
        let landmarks = scenario();
        let one = converge_mean(&landmarks, &with_iterations(1)).expect("converge");
        let full = converge_mean(&landmarks, &with_iterations(20)).expect("converge");

        assert_eq!(one.iterations, 1);
        assert!(!one.converged);
        assert!((one.mean - full.mean).norm() > 1e-3);
        assert!((one.mean - Vector2::new(2.0, 4.0)).norm() > 1e-3);
        assert_ne!(one.precision, full.precision);
    }

    #[test]
    fn first_update_matches_hand_computed_weights() {
        // Global mean is (0.7, 7/3); precision around it weights annotator 1 most.
        let landmarks = scenario();
        let est = converge_mean(&landmarks, &with_iterations(1)).expect("converge");

        let g = Vector2::<f64>::new(0.7, 7.0 / 3.0);
        let px = [1.0 / 1.7, 1.0 / 0.3, 1.0 / 1.4];
        let py = [
            1.0 / (g.y + 1.0),
            1.0 / (g.y - 3.0).abs(),
            1.0 / (5.0 - g.y),
        ];
        let x = (-px[0] + px[1] + 2.1 * px[2]) / px.iter().sum::<f64>();
        let y = (-py[0] + 3.0 * py[1] + 5.0 * py[2]) / py.iter().sum::<f64>();
        assert_abs_diff_eq!(est.mean.x, x, epsilon = 1e-9);
        assert_abs_diff_eq!(est.mean.y, y, epsilon = 1e-9);
    }

    #[test]
    fn identical_annotators_stop_on_second_iteration() {
        // Every annotator agrees, so the second estimate repeats the first.
        let landmarks = LandmarkTensor::filled(4, 3, [10.0, 12.0]).expect("tensor");
        let est = converge_mean(&landmarks, &with_iterations(100)).expect("converge");
        assert!(est.converged);
        assert_eq!(est.iterations, 2);
        assert_abs_diff_eq!(est.mean.x, 10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(est.mean.y, 12.0, epsilon = 1e-12);
    }

    #[test]
    fn estimate_is_pulled_toward_the_tight_cluster() {
        let landmarks = LandmarkTensor::new(vec![
            vec![[10.0, 10.0], [10.1, 9.9], [9.9, 10.1]],
            vec![[10.05, 9.95], [9.95, 10.05], [10.0, 10.0]],
            vec![[30.0, -5.0], [-10.0, 25.0], [20.0, 40.0]],
        ])
        .expect("tensor");
        let naive = landmarks.global_mean();
        let est = converge_mean(&landmarks, &ConvergeConfig::default()).expect("converge");
        let truth = Vector2::new(10.0, 10.0);
        assert!((est.mean - truth).norm() < (naive - truth).norm());
        assert!(est.converged);
    }

    #[test]
    fn any_axis_rule_needs_only_one_axis_below_tolerance() {
        let rule = StopRule::AnyAxis;
        assert!(rule.is_satisfied(&Vector2::new(1e-6, 5.0), 1e-4));
        assert!(!rule.is_satisfied(&Vector2::new(1e-3, 5.0), 1e-4));
        assert!(!rule.is_satisfied(&Vector2::repeat(f64::INFINITY), 1e-4));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let landmarks = scenario();
        assert!(matches!(
            converge_mean(&landmarks, &with_iterations(0)),
            Err(GroundTruthError::InvalidConfig(_))
        ));
        let cfg = ConvergeConfig {
            tol: f64::NAN,
            ..ConvergeConfig::default()
        };
        assert!(matches!(
            converge_mean(&landmarks, &cfg),
            Err(GroundTruthError::InvalidConfig(_))
        ));
    }
}

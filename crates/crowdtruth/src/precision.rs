//! Annotator precision: inverse mean absolute deviation from a mean estimate.

use nalgebra::Vector2;

use crate::error::GroundTruthError;
use crate::landmarks::{Axis, LandmarkTensor};

/// Per-annotator, per-axis precision, indexed `[annotator][axis]`.
///
/// Every entry is finite and strictly positive.
#[derive(Debug, Clone, PartialEq)]
pub struct PrecisionMatrix {
    rows: Vec<[f64; 2]>,
}

impl PrecisionMatrix {
    /// Wrap externally computed precision rows.
    ///
    /// Rejects an empty matrix and any entry that is not finite and positive.
    pub fn from_rows(rows: Vec<[f64; 2]>) -> Result<Self, GroundTruthError> {
        if rows.is_empty() {
            return Err(GroundTruthError::EmptyInput {
                annotators: 0,
                samples: 0,
            });
        }
        for (annotator, row) in rows.iter().enumerate() {
            for axis in Axis::ALL {
                let v = row[axis.index()];
                if !(v.is_finite() && v > 0.0) {
                    return Err(GroundTruthError::InvalidPrecision { annotator, axis });
                }
            }
        }
        Ok(Self { rows })
    }

    pub fn n_annotators(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[[f64; 2]] {
        &self.rows
    }

    #[inline]
    pub fn get(&self, annotator: usize, axis: Axis) -> f64 {
        self.rows[annotator][axis.index()]
    }

    /// Precision of every annotator along `axis`.
    pub fn column(&self, axis: Axis) -> impl Iterator<Item = f64> + '_ {
        let k = axis.index();
        self.rows.iter().map(move |r| r[k])
    }

    /// Sum over annotators along `axis`.
    pub fn axis_sum(&self, axis: Axis) -> f64 {
        self.column(axis).sum()
    }

    /// Sum of both axes for each annotator.
    pub fn annotator_totals(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r[0] + r[1]).collect()
    }

    /// Normalized weights `precision[a][k] / sum_a precision[a][k]`.
    ///
    /// Fails when an axis sum is zero or non-finite.
    pub fn weights(&self) -> Result<Vec<[f64; 2]>, GroundTruthError> {
        let mut sums = [0.0; 2];
        for axis in Axis::ALL {
            let s = self.axis_sum(axis);
            if !(s.is_finite() && s > 0.0) {
                return Err(GroundTruthError::DegeneratePrecision { axis });
            }
            sums[axis.index()] = s;
        }
        Ok(self
            .rows
            .iter()
            .map(|r| [r[0] / sums[0], r[1] / sums[1]])
            .collect())
    }
}

/// Precision of every annotator relative to `mean`.
///
/// For annotator `a` and axis `k` this is `1 / (mean_s |x[a][s][k] - mean[k]| + eps)`
/// with `eps = f64::EPSILON`, so an annotator whose samples sit exactly on the
/// mean still gets a finite score. Deterministic in its inputs.
pub fn annotator_precision(landmarks: &LandmarkTensor, mean: &Vector2<f64>) -> PrecisionMatrix {
    let n = landmarks.n_samples() as f64;
    let rows = landmarks
        .rows()
        .map(|samples| {
            let mut dev = [0.0; 2];
            for p in samples {
                dev[0] += (p[0] - mean.x).abs();
                dev[1] += (p[1] - mean.y).abs();
            }
            [
                1.0 / (dev[0] / n + f64::EPSILON),
                1.0 / (dev[1] / n + f64::EPSILON),
            ]
        })
        .collect();
    PrecisionMatrix { rows }
}

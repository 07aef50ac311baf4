//! Annotator sample tensor: `[annotator][sample][axis]`.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::error::GroundTruthError;

/// Coordinate axis of a 2D landmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    /// Both axes in storage order.
    pub const ALL: [Axis; 2] = [Axis::X, Axis::Y];

    /// Position of this axis inside a `[f64; 2]` sample.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
        }
    }
}

/// Coordinate samples of every annotator for one landmark.
///
/// Every annotator contributes the same number of samples `S`, stored
/// row-major so annotator `a` owns `data[a * S..(a + 1) * S]`. Selection
/// never mutates a tensor; it builds a new, smaller one.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkTensor {
    n_samples: usize,
    data: Vec<[f64; 2]>,
}

impl LandmarkTensor {
    /// Build a tensor from per-annotator sample lists.
    ///
    /// Fails on zero annotators, zero samples, ragged rows or non-finite
    /// coordinates.
    pub fn new(rows: Vec<Vec<[f64; 2]>>) -> Result<Self, GroundTruthError> {
        let n_samples = rows.first().map_or(0, Vec::len);
        if rows.is_empty() || n_samples == 0 {
            return Err(GroundTruthError::EmptyInput {
                annotators: rows.len(),
                samples: n_samples,
            });
        }

        let mut data = Vec::with_capacity(rows.len() * n_samples);
        for (annotator, row) in rows.into_iter().enumerate() {
            if row.len() != n_samples {
                return Err(GroundTruthError::RaggedSamples {
                    annotator,
                    expected: n_samples,
                    got: row.len(),
                });
            }
            for (sample, p) in row.iter().enumerate() {
                if !(p[0].is_finite() && p[1].is_finite()) {
                    return Err(GroundTruthError::NonFiniteSample { annotator, sample });
                }
            }
            data.extend(row);
        }

        Ok(Self { n_samples, data })
    }

    /// Tensor where every sample of every annotator equals `value`.
    pub fn filled(
        n_annotators: usize,
        n_samples: usize,
        value: [f64; 2],
    ) -> Result<Self, GroundTruthError> {
        Self::new(vec![vec![value; n_samples]; n_annotators])
    }

    /// Number of annotators (dimension 0).
    pub fn n_annotators(&self) -> usize {
        self.data.len() / self.n_samples
    }

    /// Number of samples per annotator (dimension 1).
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// `[annotators, samples, axes]`.
    pub fn shape(&self) -> [usize; 3] {
        [self.n_annotators(), self.n_samples, 2]
    }

    /// Samples of annotator `a`.
    ///
    /// # Panics
    /// Panics if `a >= n_annotators()`.
    pub fn annotator(&self, a: usize) -> &[[f64; 2]] {
        &self.data[a * self.n_samples..(a + 1) * self.n_samples]
    }

    /// Iterate annotator rows in order.
    pub fn rows(&self) -> impl Iterator<Item = &[[f64; 2]]> + '_ {
        self.data.chunks_exact(self.n_samples)
    }

    /// Unweighted mean over all annotators and all samples.
    pub fn global_mean(&self) -> Vector2<f64> {
        let sum: Vector2<f64> = self.data.iter().map(point).sum();
        sum / self.data.len() as f64
    }

    /// Per-annotator sample mean.
    pub fn annotator_means(&self) -> Vec<Vector2<f64>> {
        let n = self.n_samples as f64;
        self.rows()
            .map(|row| row.iter().map(point).sum::<Vector2<f64>>() / n)
            .collect()
    }

    /// New tensor holding the given annotator rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Result<Self, GroundTruthError> {
        self.select_per_axis(indices, indices)
    }

    /// New tensor whose row `i` takes x from annotator `x_rows[i]` and y from
    /// annotator `y_rows[i]`.
    ///
    /// With identical index lists this is a plain row selection; otherwise
    /// coordinates of different annotators are mixed per axis.
    pub fn select_per_axis(
        &self,
        x_rows: &[usize],
        y_rows: &[usize],
    ) -> Result<Self, GroundTruthError> {
        if x_rows.len() != y_rows.len() {
            return Err(GroundTruthError::AxisLengthMismatch {
                x: x_rows.len(),
                y: y_rows.len(),
            });
        }
        if x_rows.is_empty() {
            return Err(GroundTruthError::EmptyInput {
                annotators: 0,
                samples: self.n_samples,
            });
        }
        let len = self.n_annotators();
        if let Some(&index) = x_rows.iter().chain(y_rows).find(|&&i| i >= len) {
            return Err(GroundTruthError::IndexOutOfRange { index, len });
        }

        let mut data = Vec::with_capacity(x_rows.len() * self.n_samples);
        for (&ax, &ay) in x_rows.iter().zip(y_rows) {
            let xs = self.annotator(ax);
            let ys = self.annotator(ay);
            data.extend(xs.iter().zip(ys).map(|(px, py)| [px[0], py[1]]));
        }

        Ok(Self {
            n_samples: self.n_samples,
            data,
        })
    }
}

fn point(p: &[f64; 2]) -> Vector2<f64> {
    Vector2::new(p[0], p[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn three_annotators() -> LandmarkTensor {
        LandmarkTensor::new(vec![
            vec![[0.0, 10.0], [2.0, 12.0]],
            vec![[4.0, 14.0], [6.0, 16.0]],
            vec![[8.0, 18.0], [10.0, 20.0]],
        ])
        .expect("valid tensor")
    }

    #[test]
    fn rejects_empty_and_ragged_input() {
        assert!(matches!(
            LandmarkTensor::new(Vec::new()),
            Err(GroundTruthError::EmptyInput { annotators: 0, .. })
        ));
        assert!(matches!(
            LandmarkTensor::new(vec![Vec::new(), Vec::new()]),
            Err(GroundTruthError::EmptyInput {
                annotators: 2,
                samples: 0
            })
        ));
        assert_eq!(
            LandmarkTensor::new(vec![vec![[0.0, 0.0]; 2], vec![[0.0, 0.0]; 3]]),
            Err(GroundTruthError::RaggedSamples {
                annotator: 1,
                expected: 2,
                got: 3
            })
        );
        assert_eq!(
            LandmarkTensor::new(vec![vec![[0.0, f64::NAN]]]),
            Err(GroundTruthError::NonFiniteSample {
                annotator: 0,
                sample: 0
            })
        );
    }

    #[test]
    fn means_cover_all_samples() {
        let t = three_annotators();
        assert_eq!(t.shape(), [3, 2, 2]);
        let m = t.global_mean();
        assert_relative_eq!(m.x, 5.0, epsilon = 1e-12);
        assert_relative_eq!(m.y, 15.0, epsilon = 1e-12);

        let per = t.annotator_means();
        assert_eq!(per.len(), 3);
        assert_relative_eq!(per[1].x, 5.0, epsilon = 1e-12);
        assert_relative_eq!(per[2].y, 19.0, epsilon = 1e-12);
    }

    #[test]
    fn row_selection_builds_a_new_tensor_in_index_order() {
        let t = three_annotators();
        let s = t.select_rows(&[2, 0]).expect("select");
        assert_eq!(s.shape(), [2, 2, 2]);
        assert_eq!(s.annotator(0), t.annotator(2));
        assert_eq!(s.annotator(1), t.annotator(0));
        // source untouched
        assert_eq!(t.n_annotators(), 3);
    }

    #[test]
    fn per_axis_selection_mixes_annotators() {
        let t = three_annotators();
        let s = t.select_per_axis(&[0, 1], &[2, 0]).expect("select");
        assert_eq!(s.annotator(0), &[[0.0, 18.0], [2.0, 20.0]]);
        assert_eq!(s.annotator(1), &[[4.0, 10.0], [6.0, 12.0]]);
    }

    #[test]
    fn selection_guards_indices_and_lengths() {
        let t = three_annotators();
        assert_eq!(
            t.select_rows(&[0, 3]),
            Err(GroundTruthError::IndexOutOfRange { index: 3, len: 3 })
        );
        assert_eq!(
            t.select_per_axis(&[0, 1], &[0]),
            Err(GroundTruthError::AxisLengthMismatch { x: 2, y: 1 })
        );
        assert!(matches!(
            t.select_rows(&[]),
            Err(GroundTruthError::EmptyInput { annotators: 0, .. })
        ));
    }
}

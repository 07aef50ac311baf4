//! Annotator selection strategies.
//!
//! A strategy looks at the precision of the remaining annotators and splits
//! them into included and excluded sets. Results are always reported per
//! axis so the elimination loop does not care whether a strategy treats the
//! axes independently ([`SelectionStrategy::RankedTopK`]) or keeps each
//! annotator's x and y together ([`SelectionStrategy::WorstSingleElimination`]).

use serde::{Deserialize, Serialize};

use crate::error::GroundTruthError;
use crate::landmarks::{Axis, LandmarkTensor};
use crate::precision::PrecisionMatrix;

/// How many annotators a ranked selection keeps per axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectCount {
    /// Keep exactly this many.
    Count(usize),
    /// Keep all but the lowest-ranked `n`.
    AllBut(usize),
    /// Keep `floor(fraction * available)`; fraction must lie in (0, 1].
    Fraction(f64),
}

impl Default for SelectCount {
    fn default() -> Self {
        Self::AllBut(1)
    }
}

impl std::fmt::Display for SelectCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{}", n),
            Self::AllBut(n) => write!(f, "-{}", n),
            Self::Fraction(v) => write!(f, "{}", v),
        }
    }
}

impl SelectCount {
    /// Number of annotators kept out of `available`.
    ///
    /// Fails when the result would be zero or larger than `available`.
    pub fn resolve(&self, available: usize) -> Result<usize, GroundTruthError> {
        let kept = match *self {
            Self::Count(n) => Some(n),
            Self::AllBut(n) => available.checked_sub(n),
            Self::Fraction(v) if v > 0.0 && v <= 1.0 => {
                Some((v * available as f64).floor() as usize)
            }
            Self::Fraction(_) => None,
        };
        match kept {
            Some(k) if k >= 1 && k <= available => Ok(k),
            _ => Err(GroundTruthError::InvalidSelectCount {
                requested: self.to_string(),
                available,
            }),
        }
    }
}

/// Elimination policy applied after each mean convergence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Rank annotators by precision separately per axis and keep the top
    /// `num_select` on each. Axes are decoupled: the narrowed tensor may pair
    /// one annotator's x with another annotator's y.
    RankedTopK {
        #[serde(default)]
        num_select: SelectCount,
    },
    /// Sum precision over both axes and drop the single lowest-scoring
    /// annotator. Always removes exactly one annotator.
    WorstSingleElimination,
}

impl Default for SelectionStrategy {
    fn default() -> Self {
        Self::WorstSingleElimination
    }
}

impl SelectionStrategy {
    /// Top-k ranking with the given count.
    pub fn ranked(num_select: SelectCount) -> Self {
        Self::RankedTopK { num_select }
    }

    /// `true` for strategies that remove at least one annotator whenever more
    /// than one remains.
    pub fn guarantees_progress(&self) -> bool {
        matches!(self, Self::WorstSingleElimination)
    }

    /// Partition annotators into included/excluded sets.
    pub fn select(&self, precision: &PrecisionMatrix) -> Result<Selection, GroundTruthError> {
        match self {
            Self::RankedTopK { num_select } => ranked_top_k(precision, *num_select),
            Self::WorstSingleElimination => Ok(worst_single_elimination(precision)),
        }
    }
}

/// Included/excluded annotator rows, one list per axis.
///
/// Indices address rows of the tensor the precision was computed on.
/// Included rows keep the strategy's ranking order, not the row order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    included: [Vec<usize>; 2],
    excluded: [Vec<usize>; 2],
}

impl Selection {
    /// Same included/excluded rows on both axes.
    pub fn coupled(included: Vec<usize>, excluded: Vec<usize>) -> Self {
        Self {
            included: [included.clone(), included],
            excluded: [excluded.clone(), excluded],
        }
    }

    /// Independent per-axis selections, `[x, y]`.
    pub fn per_axis(included: [Vec<usize>; 2], excluded: [Vec<usize>; 2]) -> Self {
        Self { included, excluded }
    }

    pub fn included(&self, axis: Axis) -> &[usize] {
        &self.included[axis.index()]
    }

    pub fn excluded(&self, axis: Axis) -> &[usize] {
        &self.excluded[axis.index()]
    }

    /// `true` when both axes keep the same annotators in the same order.
    pub fn is_coupled(&self) -> bool {
        self.included[0] == self.included[1]
    }

    /// Build the narrowed tensor: x from the x-included rows, y from the
    /// y-included rows.
    pub fn apply(&self, landmarks: &LandmarkTensor) -> Result<LandmarkTensor, GroundTruthError> {
        landmarks.select_per_axis(&self.included[0], &self.included[1])
    }
}

fn ranked_top_k(
    precision: &PrecisionMatrix,
    num_select: SelectCount,
) -> Result<Selection, GroundTruthError> {
    let keep = num_select.resolve(precision.n_annotators())?;

    let split = |axis: Axis| {
        let mut order: Vec<usize> = (0..precision.n_annotators()).collect();
        // stable: ties keep row order
        order.sort_by(|&a, &b| precision.get(b, axis).total_cmp(&precision.get(a, axis)));
        let excluded = order.split_off(keep);
        (order, excluded)
    };

    let (inc_x, exc_x) = split(Axis::X);
    let (inc_y, exc_y) = split(Axis::Y);
    Ok(Selection::per_axis([inc_x, inc_y], [exc_x, exc_y]))
}

fn worst_single_elimination(precision: &PrecisionMatrix) -> Selection {
    let totals = precision.annotator_totals();
    let mut order: Vec<usize> = (0..totals.len()).collect();
    order.sort_by(|&a, &b| totals[a].total_cmp(&totals[b]));
    let worst = order.remove(0);
    Selection::coupled(order, vec![worst])
}

//! Append-only record of every estimate produced during elimination.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::error::GroundTruthError;
use crate::landmarks::{Axis, LandmarkTensor};
use crate::metadata::{AnnotatorMetadata, AnnotatorRecord};

#[derive(Debug, Clone)]
struct Snapshot {
    mean: Vector2<f64>,
    landmarks: Option<LandmarkTensor>,
    /// Metadata rows per axis; `None` means the full table.
    included: Option<[Vec<usize>; 2]>,
    converged: Option<bool>,
}

/// Ordered history of `(mean, remaining landmarks, included annotators)`.
///
/// The metadata table is copied on construction, so later changes to the
/// caller's table never alter recorded history. Snapshots are only ever
/// appended; `len()` equals the number of successful `add*` calls.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    metadata: AnnotatorMetadata,
    snapshots: Vec<Snapshot>,
}

impl HistoryLog {
    pub fn new(metadata: &AnnotatorMetadata) -> Self {
        Self {
            metadata: metadata.clone(),
            snapshots: Vec::new(),
        }
    }

    /// Append a snapshot.
    ///
    /// `included` lists metadata rows of the annotators still in play, in
    /// selection order; `None` stands for the whole table. Out-of-range rows
    /// are rejected and nothing is recorded.
    pub fn add(
        &mut self,
        mean: Vector2<f64>,
        landmarks: Option<LandmarkTensor>,
        included: Option<&[usize]>,
    ) -> Result<(), GroundTruthError> {
        let included = included.map(|rows| [rows.to_vec(), rows.to_vec()]);
        self.push(mean, landmarks, included, None)
    }

    /// Append the outcome of one elimination round.
    ///
    /// `included` holds metadata rows per axis (`[x, y]`); `converged` tags
    /// whether the mean estimate met its stop rule.
    pub fn add_round(
        &mut self,
        mean: Vector2<f64>,
        landmarks: LandmarkTensor,
        included: [Vec<usize>; 2],
        converged: bool,
    ) -> Result<(), GroundTruthError> {
        self.push(mean, Some(landmarks), Some(included), Some(converged))
    }

    fn push(
        &mut self,
        mean: Vector2<f64>,
        landmarks: Option<LandmarkTensor>,
        included: Option<[Vec<usize>; 2]>,
        converged: Option<bool>,
    ) -> Result<(), GroundTruthError> {
        let len = self.metadata.len();
        if let Some(rows) = &included {
            if let Some(&index) = rows.iter().flatten().find(|&&r| r >= len) {
                return Err(GroundTruthError::IndexOutOfRange { index, len });
            }
        }
        self.snapshots.push(Snapshot {
            mean,
            landmarks,
            included,
            converged,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Metadata table copied at construction.
    pub fn metadata(&self) -> &AnnotatorMetadata {
        &self.metadata
    }

    pub fn get(&self, index: usize) -> Option<HistoryEntry<'_>> {
        self.snapshots.get(index).map(|snapshot| HistoryEntry {
            metadata: &self.metadata,
            snapshot,
        })
    }

    pub fn first(&self) -> Option<HistoryEntry<'_>> {
        self.get(0)
    }

    pub fn last(&self) -> Option<HistoryEntry<'_>> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    /// Entries in insertion order. Each call starts from the beginning.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = HistoryEntry<'_>> + '_ {
        self.snapshots.iter().map(move |snapshot| HistoryEntry {
            metadata: &self.metadata,
            snapshot,
        })
    }

    /// Mean of the last snapshot: the ground-truth estimate after a run.
    pub fn final_mean(&self) -> Option<Vector2<f64>> {
        self.snapshots.last().map(|s| s.mean)
    }

    /// Means in insertion order, from the global mean to the final estimate.
    pub fn trajectory(&self) -> Vec<[f64; 2]> {
        self.snapshots
            .iter()
            .map(|s| [s.mean.x, s.mean.y])
            .collect()
    }

    /// Serializable summary of every snapshot.
    pub fn report(&self) -> HistoryReport {
        let steps = self
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let ids = |axis: Axis| {
                    entry
                        .included_records(axis)
                        .iter()
                        .map(|r| r.id.clone())
                        .collect::<Vec<_>>()
                };
                let annotators = ids(Axis::X);
                let y_annotators = Some(ids(Axis::Y)).filter(|y| *y != annotators);
                HistoryStep {
                    index,
                    mean: [entry.mean().x, entry.mean().y],
                    remaining: entry
                        .landmarks()
                        .map_or(annotators.len(), LandmarkTensor::n_annotators),
                    annotators,
                    y_annotators,
                    converged: entry.converged(),
                }
            })
            .collect();

        HistoryReport {
            final_mean: self.final_mean().map(|m| [m.x, m.y]),
            steps,
        }
    }
}

impl std::fmt::Display for HistoryLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.final_mean() {
            Some(m) => write!(f, "({:4.2},{:4.2})@{}", m.x, m.y, self.len()),
            None => write!(f, "(empty)@0"),
        }
    }
}

impl<'a> IntoIterator for &'a HistoryLog {
    type Item = HistoryEntry<'a>;
    type IntoIter = Box<dyn ExactSizeIterator<Item = HistoryEntry<'a>> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

/// Borrowed view of one snapshot.
#[derive(Debug, Clone, Copy)]
pub struct HistoryEntry<'a> {
    metadata: &'a AnnotatorMetadata,
    snapshot: &'a Snapshot,
}

impl<'a> HistoryEntry<'a> {
    pub fn mean(&self) -> Vector2<f64> {
        self.snapshot.mean
    }

    /// Remaining landmarks; `None` for the seed entry.
    pub fn landmarks(&self) -> Option<&'a LandmarkTensor> {
        self.snapshot.landmarks.as_ref()
    }

    /// Whether this step's mean met its stop rule; `None` when not a round.
    pub fn converged(&self) -> Option<bool> {
        self.snapshot.converged
    }

    /// Metadata rows recorded for `axis`; `None` means the full table.
    pub fn included_rows(&self, axis: Axis) -> Option<&'a [usize]> {
        self.snapshot
            .included
            .as_ref()
            .map(|rows| rows[axis.index()].as_slice())
    }

    /// Metadata of the included annotators (x-axis selection), in selection order.
    pub fn included(&self) -> AnnotatorMetadata {
        self.included_for_axis(Axis::X)
    }

    /// Metadata of the annotators included along `axis`, in selection order.
    pub fn included_for_axis(&self, axis: Axis) -> AnnotatorMetadata {
        self.included_records(axis).into_iter().cloned().collect()
    }

    fn included_records(&self, axis: Axis) -> Vec<&'a AnnotatorRecord> {
        match self.included_rows(axis) {
            // rows were range-checked when recorded
            Some(rows) => rows.iter().filter_map(|&r| self.metadata.get(r)).collect(),
            None => self.metadata.iter().collect(),
        }
    }
}

/// JSON-friendly summary of a [`HistoryLog`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryReport {
    /// Ground-truth estimate (mean of the last step).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_mean: Option<[f64; 2]>,
    pub steps: Vec<HistoryStep>,
}

/// One row of a [`HistoryReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryStep {
    /// Position in the history; 0 is the unweighted global mean.
    pub index: usize,
    pub mean: [f64; 2],
    /// Annotator rows remaining after this step.
    pub remaining: usize,
    /// Ids of the included annotators (x axis), in selection order.
    pub annotators: Vec<String>,
    /// Ids included along y, when they differ from x.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_annotators: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converged: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::AnnotatorCategory;

    fn meta() -> AnnotatorMetadata {
        AnnotatorMetadata::new(vec![
            AnnotatorRecord::new("1", AnnotatorCategory::Worker),
            AnnotatorRecord::new("2", AnnotatorCategory::Expert),
            AnnotatorRecord::new("3", AnnotatorCategory::Worker),
            AnnotatorRecord::new("4", AnnotatorCategory::Expert),
        ])
    }

    fn tensor(rows: &[[f64; 2]]) -> LandmarkTensor {
        LandmarkTensor::new(rows.iter().map(|p| vec![*p]).collect()).expect("tensor")
    }

    fn filled_log() -> (
        HistoryLog,
        Vec<Vector2<f64>>,
        Vec<LandmarkTensor>,
        Vec<Vec<usize>>,
    ) {
        let means = vec![
            Vector2::new(1.0, 2.0),
            Vector2::new(2.0, 3.0),
            Vector2::new(4.0, 5.0),
        ];
        let landmarks = vec![
            tensor(&[[3.0, 0.0], [2.0, 1.0], [1.0, 2.0]]),
            tensor(&[[3.0, 1.0], [1.0, 2.0]]),
            tensor(&[[3.0, 2.0]]),
        ];
        let include = vec![vec![0, 2, 3], vec![1, 2], vec![0]];

        let mut log = HistoryLog::new(&meta());
        for i in 0..3 {
            let rows = include[i].as_slice();
            log.add(means[i], Some(landmarks[i].clone()), Some(rows)).expect("add");
        }
        (log, means, landmarks, include)
    }

    #[test]
    fn entries_come_back_in_insertion_order() {
        let (log, means, landmarks, include) = filled_log();
        assert_eq!(log.len(), 3);
        assert_eq!(log.final_mean(), Some(means[2]));

        for (i, entry) in log.iter().enumerate() {
            assert_eq!(entry.mean(), means[i]);
            assert_eq!(entry.landmarks(), Some(&landmarks[i]));
            let expected = meta().select(&include[i]).expect("select");
            assert_eq!(entry.included(), expected);
            assert_eq!(entry.converged(), None);
        }
    }

    #[test]
    fn iteration_is_restartable_and_indexable() {
        let (log, means, _, _) = filled_log();
        let first: Vec<_> = log.iter().map(|e| e.mean()).collect();
        let second: Vec<_> = (&log).into_iter().map(|e| e.mean()).collect();
        assert_eq!(first, second);
        assert_eq!(log.get(1).map(|e| e.mean()), Some(means[1]));
        assert!(log.get(3).is_none());
        assert_eq!(log.trajectory(), vec![[1.0, 2.0], [2.0, 3.0], [4.0, 5.0]]);
    }

    #[test]
    fn missing_selection_means_full_table() {
        let mut log = HistoryLog::new(&meta());
        log.add(Vector2::new(0.0, 0.0), None, None).expect("add");
        let entry = log.first().expect("entry");
        assert!(entry.landmarks().is_none());
        assert!(entry.included_rows(Axis::X).is_none());
        assert_eq!(entry.included(), meta());
    }

    #[test]
    fn included_follows_selection_order_not_row_order() {
        let mut log = HistoryLog::new(&meta());
        log.add(Vector2::zeros(), None, Some(&[3, 1][..])).expect("add");
        let included = log.last().expect("entry").included();
        let ids: Vec<&str> = included.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["4", "2"]);
    }

    #[test]
    fn metadata_is_copied_defensively() {
        let mut external = meta();
        let mut log = HistoryLog::new(&external);
        external = external.select(&[0]).expect("select");
        log.add(Vector2::zeros(), None, None).expect("add");
        assert_eq!(external.len(), 1);
        assert_eq!(log.metadata().len(), 4);
        assert_eq!(log.first().expect("entry").included().len(), 4);
    }

    #[test]
    fn out_of_range_rows_are_not_recorded() {
        let mut log = HistoryLog::new(&meta());
        assert_eq!(
            log.add(Vector2::zeros(), None, Some(&[0, 9][..])),
            Err(GroundTruthError::IndexOutOfRange { index: 9, len: 4 })
        );
        assert!(log.is_empty());
    }

    #[test]
    fn per_axis_rounds_report_both_selections() {
        let mut log = HistoryLog::new(&meta());
        log.add(Vector2::new(1.0, 1.0), None, None).expect("seed");
        log.add_round(
            Vector2::new(2.0, 2.0),
            tensor(&[[0.0, 0.0], [1.0, 1.0]]),
            [vec![2, 3], vec![3, 1]],
            false,
        )
        .expect("round");

        let entry = log.last().expect("entry");
        assert_eq!(entry.converged(), Some(false));
        let y_included = entry.included_for_axis(Axis::Y);
        assert_eq!(y_included.get(1).map(|r| r.id.as_str()), Some("2"));

        let report = log.report();
        assert_eq!(report.final_mean, Some([2.0, 2.0]));
        assert_eq!(report.steps[0].remaining, 4);
        assert_eq!(report.steps[0].y_annotators, None);
        assert_eq!(report.steps[1].remaining, 2);
        assert_eq!(report.steps[1].annotators, ["3", "4"]);
        assert_eq!(
            report.steps[1].y_annotators,
            Some(vec!["4".to_string(), "2".to_string()])
        );
        assert_eq!(log.to_string(), "(2.00,2.00)@2");
    }
}

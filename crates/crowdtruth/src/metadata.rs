//! Annotator metadata, index-aligned with the rows of a [`LandmarkTensor`].
//!
//! [`LandmarkTensor`]: crate::LandmarkTensor

use serde::{Deserialize, Serialize};

use crate::error::GroundTruthError;
use crate::landmarks::LandmarkTensor;

/// Population an annotator was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotatorCategory {
    /// Crowd-sourced worker.
    Worker,
    /// Domain expert.
    Expert,
}

impl std::fmt::Display for AnnotatorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Worker => write!(f, "worker"),
            Self::Expert => write!(f, "expert"),
        }
    }
}

/// One metadata row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatorRecord {
    /// Annotator identifier (worker id or expert name).
    pub id: String,
    /// Population the annotator belongs to.
    pub category: AnnotatorCategory,
}

impl AnnotatorRecord {
    pub fn new(id: impl Into<String>, category: AnnotatorCategory) -> Self {
        Self {
            id: id.into(),
            category,
        }
    }
}

/// Ordered metadata table; row `i` describes annotator `i` of the tensor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotatorMetadata {
    records: Vec<AnnotatorRecord>,
}

impl AnnotatorMetadata {
    pub fn new(records: Vec<AnnotatorRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<&AnnotatorRecord> {
        self.records.get(row)
    }

    pub fn records(&self) -> &[AnnotatorRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AnnotatorRecord> {
        self.records.iter()
    }

    /// Rows picked by `rows`, in the order of `rows`.
    pub fn select(&self, rows: &[usize]) -> Result<Self, GroundTruthError> {
        rows.iter()
            .map(|&row| {
                self.records
                    .get(row)
                    .cloned()
                    .ok_or(GroundTruthError::IndexOutOfRange {
                        index: row,
                        len: self.records.len(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }

    /// Fail unless this table has one row per annotator of `landmarks`.
    pub fn check_aligned(&self, landmarks: &LandmarkTensor) -> Result<(), GroundTruthError> {
        if self.len() != landmarks.n_annotators() {
            return Err(GroundTruthError::DimensionMismatch {
                landmarks: landmarks.n_annotators(),
                metadata: self.len(),
            });
        }
        Ok(())
    }
}

impl FromIterator<AnnotatorRecord> for AnnotatorMetadata {
    fn from_iter<T: IntoIterator<Item = AnnotatorRecord>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a AnnotatorMetadata {
    type Item = &'a AnnotatorRecord;
    type IntoIter = std::slice::Iter<'a, AnnotatorRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Keep only annotators of `category`, preserving row alignment.
///
/// Returns [`GroundTruthError::EmptyInput`] when no annotator matches.
pub fn filter_category(
    landmarks: &LandmarkTensor,
    metadata: &AnnotatorMetadata,
    category: AnnotatorCategory,
) -> Result<(LandmarkTensor, AnnotatorMetadata), GroundTruthError> {
    metadata.check_aligned(landmarks)?;
    let rows: Vec<usize> = metadata
        .iter()
        .enumerate()
        .filter(|(_, r)| r.category == category)
        .map(|(i, _)| i)
        .collect();
    tracing::debug!(
        "{} of {} annotators are {}",
        rows.len(),
        metadata.len(),
        category
    );
    Ok((landmarks.select_rows(&rows)?, metadata.select(&rows)?))
}

//! JSON annotation sets read and written by the CLI.

use std::path::Path;

use crowdtruth::{
    AnnotatorCategory, AnnotatorMetadata, AnnotatorRecord, GroundTruthError, LandmarkTensor,
};
use serde::{Deserialize, Serialize};

/// All annotations of one landmark.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationSet {
    pub annotators: Vec<AnnotatorInput>,
}

/// Samples placed by one annotator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatorInput {
    pub id: String,
    pub category: AnnotatorCategory,
    pub samples: Vec<[f64; 2]>,
}

impl AnnotationSet {
    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Split into an index-aligned tensor and metadata table.
    pub fn into_parts(self) -> Result<(LandmarkTensor, AnnotatorMetadata), GroundTruthError> {
        let (rows, records): (Vec<_>, Vec<_>) = self
            .annotators
            .into_iter()
            .map(|a| (a.samples, AnnotatorRecord::new(a.id, a.category)))
            .unzip();
        Ok((LandmarkTensor::new(rows)?, AnnotatorMetadata::new(records)))
    }
}

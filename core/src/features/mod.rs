//! Feature extraction
//!
//! Crops the ROI, normalises it to the classifier's declared input contract
//! and converts the classifier's per-axis output into a typed [`FeatureSet`].
//!
//! [`FeatureSet`]: crate::types::FeatureSet

mod extractor;
mod preprocess;

pub use extractor::{FeatureExtraction, FeatureExtractor};
pub use preprocess::{crop_and_normalize, InputContract, NormalizedCrop, Normalization};

use crate::error::Result;
use std::collections::BTreeMap;

/// Classifier output for one axis, before label validation
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct RawFeatureOutput {
    pub class: String,
    pub confidence: f64,
    pub distribution: BTreeMap<String, f64>,
}

impl RawFeatureOutput {
    /// Builds an output from per-class probabilities, picking the argmax
    ///
    /// Ties keep the first label. Returns `None` for an empty slice.
    pub fn from_probabilities(probabilities: &[(&str, f64)]) -> Option<Self> {
        let (class, confidence) = probabilities.iter().fold(None, |best, &(label, p)| match best {
            Some((_, bp)) if bp >= p => best,
            _ => Some((label, p)),
        })?;

        Some(Self {
            class: class.to_string(),
            confidence,
            distribution: probabilities
                .iter()
                .map(|&(label, p)| (label.to_string(), p))
                .collect(),
        })
    }
}

/// Loosely typed classifier output keyed by axis name
pub type RawClassification = BTreeMap<String, RawFeatureOutput>;

/// External multi-label feature classifier
///
/// Implementations hold loaded weights and must be safe to share across
/// concurrent runs.
pub trait Classifier: Send + Sync {
    /// Model name and version for provenance
    fn name(&self) -> &str;

    /// Input size and normalisation the model was trained with
    fn input_contract(&self) -> InputContract;

    /// Classifies a normalised ROI crop
    ///
    /// The result should contain one entry per feature axis; extra entries
    /// (for example an auxiliary TI-RADS head) are ignored.
    fn classify(&self, crop: &NormalizedCrop) -> Result<RawClassification>;
}

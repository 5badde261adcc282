use crate::types::CoordinateSpace;
use std::fmt;
use thiserror::Error;

/// Result type for TI-RADS pipeline operations
pub type Result<T> = std::result::Result<T, TiradsError>;

/// Pipeline stage that produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
#[cfg_attr(feature = "json", serde(rename_all = "snake_case"))]
pub enum PipelineStage {
    Decode,
    Locate,
    Remap,
    Extract,
    Score,
    Explain,
}

impl PipelineStage {
    /// Returns simple name for display
    pub fn simple_name(&self) -> &'static str {
        match self {
            PipelineStage::Decode => "decode",
            PipelineStage::Locate => "locate",
            PipelineStage::Remap => "remap",
            PipelineStage::Extract => "extract",
            PipelineStage::Score => "score",
            PipelineStage::Explain => "explain",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}

/// Error types for TI-RADS pipeline operations
#[derive(Error, Debug)]
pub enum TiradsError {
    /// Image bytes could not be decoded
    #[error("Malformed image: {0}")]
    MalformedImage(String),

    /// Clamped crop region has zero area
    #[error("Empty ROI: clamped region [{x1}, {y1}, {x2}, {y2}] has zero area")]
    EmptyRoi { x1: i64, y1: i64, x2: i64, y2: i64 },

    /// Classifier output is missing one or more feature axes
    #[error("Incomplete feature set: missing {}", .0.join(", "))]
    IncompleteFeatureSet(Vec<String>),

    /// Classifier emitted a label outside the rule table
    #[error("Unknown class '{class}' for feature '{feature}'")]
    UnknownFeatureClass { feature: String, class: String },

    /// Classifier emitted a confidence or distribution that violates its contract
    #[error("Invalid prediction: {0}")]
    InvalidPrediction(String),

    /// Box coordinates violate ordering or finiteness
    #[error("Invalid bounding box: {0}")]
    InvalidBox(String),

    /// Box is expressed in a different frame than the operation requires
    #[error("Invalid coordinate space: expected {expected}, found {found}")]
    InvalidCoordinateSpace {
        expected: CoordinateSpace,
        found: CoordinateSpace,
    },

    /// Detector collaborator failed
    #[error("Detector error: {0}")]
    Detector(String),

    /// Classifier collaborator failed
    #[error("Classifier error: {0}")]
    Classifier(String),

    /// Configuration file or command-line value could not be used
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A pipeline stage failed; the run was aborted
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: PipelineStage,
        #[source]
        source: Box<TiradsError>,
    },

    /// I/O error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl TiradsError {
    /// Wraps this error with the stage that produced it
    ///
    /// Already-wrapped errors keep their original stage.
    pub fn at_stage(self, stage: PipelineStage) -> Self {
        match self {
            TiradsError::Stage { .. } => self,
            other => TiradsError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Returns the failing stage, if this error came out of a pipeline run
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            TiradsError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Returns the innermost error, unwrapping any stage context
    pub fn root_cause(&self) -> &TiradsError {
        match self {
            TiradsError::Stage { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

// Convert image decoding errors
impl From<image::ImageError> for TiradsError {
    fn from(e: image::ImageError) -> Self {
        TiradsError::MalformedImage(format!("{}", e))
    }
}

pub mod api;
pub mod cli;
pub mod detection;
pub mod error;
pub mod explain;
pub mod features;
pub mod rules;
pub mod transform;
pub mod types;

pub use api::{
    decode, InferenceModels, InferencePipeline, ModelInfo, PipelineWarning, PredictionId,
    PredictionResult, StageTimings, PIPELINE_VERSION,
};
pub use cli::report::TextReport;
pub use detection::{Candidate, Detector, RoiLocation, RoiLocator, RoiStatus};
pub use error::{PipelineStage, Result, TiradsError};
pub use explain::{ExplanationRecord, ExplanationService, TextGenerator};
pub use features::{Classifier, FeatureExtractor, RawClassification, RawFeatureOutput};
pub use rules::{score, TiradsResult};
pub use types::*;

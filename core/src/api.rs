use crate::detection::{Detector, FallbackReason, RoiLocation, RoiLocator, RoiStatus};
use crate::error::{PipelineStage, Result, TiradsError};
use crate::explain::{
    ExplanationInput, ExplanationRecord, ExplanationService, GenerationError, TextGenerator,
    FALLBACK_ENGINE_NAME,
};
use crate::features::{Classifier, FeatureExtractor};
use crate::rules::{self, ScoreAnomaly, TiradsResult};
use crate::transform::{to_xywh, CropRect};
use crate::types::{BoundingBox, DetectionSettings, FeatureSet, PipelineConfig, TiradsCategory};
use chrono::{DateTime, Utc};
use image::RgbImage;
use log::{debug, info};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Crate part of the version string embedded in every prediction
///
/// A prediction's `pipeline_version` appends the detection settings tag,
/// e.g. `tirads-core/0.1.0+t0.5-full-native`.
pub const PIPELINE_VERSION: &str = concat!("tirads-core/", env!("CARGO_PKG_VERSION"));

/// Unique id of one pipeline run
pub type PredictionId = Uuid;

/// Loaded model collaborators, built once at process start
///
/// Cheap to clone; every clone shares the same models.
#[derive(Clone)]
pub struct InferenceModels {
    pub detector: Arc<dyn Detector>,
    pub classifier: Arc<dyn Classifier>,
}

impl InferenceModels {
    pub fn new(detector: Arc<dyn Detector>, classifier: Arc<dyn Classifier>) -> Self {
        Self {
            detector,
            classifier,
        }
    }
}

/// Identity of the models and rules that produced a prediction
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct ModelInfo {
    pub detector: String,
    pub classifier: String,
    pub rule_set: String,
}

/// Wall-clock time per stage, in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct StageTimings {
    pub decode_ms: f64,
    pub locate_ms: f64,
    pub remap_ms: f64,
    pub extract_ms: f64,
    pub score_ms: f64,
    /// Total inference time, excluding any explanation
    pub total_ms: f64,
    #[cfg_attr(feature = "json", serde(skip_serializing_if = "Option::is_none"))]
    pub explain_ms: Option<f64>,
}

/// Non-fatal degradation recorded on a prediction
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
#[cfg_attr(feature = "json", serde(tag = "kind", rename_all = "snake_case"))]
pub enum PipelineWarning {
    /// Detector found nothing; features were read from the whole image
    NoDetection,
    /// Best detection scored below the threshold; whole image used
    LowConfidenceDetection { best_score: f64, threshold: f64 },
    /// Point total outside the ACR thresholds
    UndefinedPointTotal { total_points: u8 },
    /// Explanation came from the rule-based template
    ExplanationUnavailable { reason: GenerationError },
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineWarning::NoDetection => {
                write!(f, "no nodule detected; features read from the whole image")
            }
            PipelineWarning::LowConfidenceDetection {
                best_score,
                threshold,
            } => write!(
                f,
                "low confidence detection ({:.3} < {:.3}); features read from the whole image",
                best_score, threshold
            ),
            PipelineWarning::UndefinedPointTotal { total_points } => write!(
                f,
                "point total {} is undefined in ACR TI-RADS; reported as TR1",
                total_points
            ),
            PipelineWarning::ExplanationUnavailable { reason } => {
                write!(f, "rule-based explanation used: {}", reason)
            }
        }
    }
}

/// Complete output of one pipeline run
///
/// Immutable except for the lazily attached explanation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct PredictionResult {
    pub id: PredictionId,
    /// Crate version plus the detection settings tag
    pub pipeline_version: String,
    /// Detection settings in effect for this run
    pub detection: DetectionSettings,
    pub created_at: DateTime<Utc>,
    pub image_width: u32,
    pub image_height: u32,
    /// ROI in raw image space (xyxy)
    pub roi: RoiLocation,
    /// Pixel region the classifier saw
    pub crop: CropRect,
    pub features: FeatureSet,
    pub tirads: TiradsResult,
    #[cfg_attr(feature = "json", serde(skip_serializing_if = "Option::is_none"))]
    pub explanation: Option<ExplanationRecord>,
    pub timings: StageTimings,
    pub models: ModelInfo,
    pub warnings: Vec<PipelineWarning>,
}

impl PredictionResult {
    /// ROI in raw image space (xyxy)
    pub fn bounding_box(&self) -> &BoundingBox {
        &self.roi.bbox
    }

    /// ROI in raw image space as xywh, the display format
    pub fn bounding_box_xywh(&self) -> BoundingBox {
        to_xywh(&self.roi.bbox)
    }

    pub fn category(&self) -> TiradsCategory {
        self.tirads.category
    }

    pub fn is_explained(&self) -> bool {
        self.explanation.is_some()
    }
}

/// Sequences ROI location, remapping, feature extraction and scoring
///
/// Every stage's output is validated before the next stage sees it; the
/// first failure aborts the run with the failing stage attached. The
/// pipeline is cheap to clone and safe to share between threads.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tirads_core::cli::{ManualClassifier, ManualDetector};
/// use tirads_core::{InferenceModels, InferencePipeline, PipelineConfig, TiradsCategory};
/// use image::RgbImage;
///
/// let detector = ManualDetector::new(vec![]);
/// let classifier = ManualClassifier::parse(&[
///     "composition=solid",
///     "echogenicity=hypoechoic",
///     "shape=taller_than_wide",
///     "margin=irregular",
///     "echogenic_foci=punctate_echogenic_foci",
/// ])
/// .unwrap();
/// let models = InferenceModels::new(Arc::new(detector), Arc::new(classifier));
/// let pipeline = InferencePipeline::new(models, PipelineConfig::default());
///
/// let mut result = pipeline.run_image(&RgbImage::new(64, 48)).unwrap();
/// assert_eq!(result.tirads.total_points, 12);
/// assert_eq!(result.category(), TiradsCategory::Tr5);
/// assert!(result.roi.is_fallback());
///
/// let explanation = pipeline.explain(&mut result).clone();
/// assert_eq!(pipeline.explain(&mut result), &explanation);
/// ```
#[derive(Clone)]
pub struct InferencePipeline {
    config: PipelineConfig,
    version: String,
    locator: RoiLocator,
    extractor: FeatureExtractor,
    explanations: Arc<ExplanationService>,
}

impl InferencePipeline {
    /// Creates a pipeline whose explanations always use the rule-based template
    pub fn new(models: InferenceModels, config: PipelineConfig) -> Self {
        Self::with_text_generator(models, config, None)
    }

    /// Creates a pipeline with an optional text generator for explanations
    pub fn with_text_generator(
        models: InferenceModels,
        config: PipelineConfig,
        generator: Option<Arc<dyn TextGenerator>>,
    ) -> Self {
        let explanations = Arc::new(ExplanationService::new(generator, &config));
        let version = format!("{}+{}", PIPELINE_VERSION, config.detection_settings().tag());
        info!(
            "Pipeline {} explains with {}",
            version,
            explanations.engine_name().unwrap_or(FALLBACK_ENGINE_NAME)
        );
        Self {
            version,
            locator: RoiLocator::with_config(models.detector, &config),
            extractor: FeatureExtractor::new(models.classifier),
            explanations,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Version string stamped on this pipeline's predictions
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the shared explanation cache
    pub fn explanations(&self) -> &ExplanationService {
        &self.explanations
    }

    /// Reads and decodes an image file, then runs the pipeline
    ///
    /// # Errors
    ///
    /// `Stage { stage: Decode, .. }` if the file cannot be read or decoded,
    /// otherwise as [`run_image`](Self::run_image).
    pub fn run_path<P: AsRef<Path>>(&self, path: P) -> Result<PredictionResult> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| TiradsError::from(e).at_stage(PipelineStage::Decode))?;
        self.run_bytes(&bytes)
    }

    /// Decodes raw image bytes, then runs the pipeline
    pub fn run_bytes(&self, bytes: &[u8]) -> Result<PredictionResult> {
        let start = Instant::now();
        let image = decode(bytes).map_err(|e| e.at_stage(PipelineStage::Decode))?;
        let decode_ms = elapsed_ms(start);

        let mut result = self.run_image(&image)?;
        result.timings.decode_ms = decode_ms;
        result.timings.total_ms += decode_ms;
        Ok(result)
    }

    /// Runs the pipeline on an already decoded RGB image
    ///
    /// # Errors
    ///
    /// `TiradsError::Stage` naming the failing stage; no partial result is
    /// returned.
    pub fn run_image(&self, image: &RgbImage) -> Result<PredictionResult> {
        let start = Instant::now();
        let mut timings = StageTimings::default();
        let (image_width, image_height) = image.dimensions();

        let t = Instant::now();
        let proposal = self
            .locator
            .propose(image)
            .map_err(|e| e.at_stage(PipelineStage::Locate))?;
        timings.locate_ms = elapsed_ms(t);

        let t = Instant::now();
        let roi = proposal
            .into_location()
            .map_err(|e| e.at_stage(PipelineStage::Remap))?;
        timings.remap_ms = elapsed_ms(t);

        let t = Instant::now();
        let extraction = self
            .extractor
            .extract(image, &roi.bbox)
            .map_err(|e| e.at_stage(PipelineStage::Extract))?;
        timings.extract_ms = elapsed_ms(t);

        let t = Instant::now();
        extraction
            .features
            .validate()
            .map_err(|e| e.at_stage(PipelineStage::Score))?;
        let tirads = rules::score(&extraction.features);
        timings.score_ms = elapsed_ms(t);
        timings.total_ms = elapsed_ms(start);

        let warnings = self.warnings_for(&roi, &tirads);
        let result = PredictionResult {
            id: Uuid::new_v4(),
            pipeline_version: self.version.clone(),
            detection: self.config.detection_settings(),
            created_at: Utc::now(),
            image_width,
            image_height,
            models: ModelInfo {
                detector: self.locator.detector_name().to_string(),
                classifier: self.extractor.classifier_name().to_string(),
                rule_set: tirads.rule_set.clone(),
            },
            roi,
            crop: extraction.crop,
            features: extraction.features,
            tirads,
            explanation: None,
            timings,
            warnings,
        };

        info!(
            "Prediction {}: {} ({} points) in {:.1} ms",
            result.id, result.tirads.category, result.tirads.total_points, timings.total_ms
        );
        Ok(result)
    }

    /// Attaches an explanation to `result`, generating it on first call
    ///
    /// Idempotent: later calls return the attached record unchanged. Never
    /// fails; generator problems yield a rule-based record and a warning.
    pub fn explain<'a>(&self, result: &'a mut PredictionResult) -> &'a ExplanationRecord {
        let record = match result.explanation.take() {
            Some(record) => record,
            None => {
                let input = ExplanationInput::from_result(&result.tirads);
                let record = self.explanations.explain(result.id, &input);
                debug!(
                    "Explanation for {} from {} (fallback: {})",
                    result.id, record.engine_name, record.is_fallback
                );

                if let Some(reason) = &record.fallback_reason {
                    if *reason != GenerationError::Disabled {
                        result.warnings.push(PipelineWarning::ExplanationUnavailable {
                            reason: reason.clone(),
                        });
                    }
                }
                result.timings.explain_ms = Some(record.generation_time_ms as f64);
                record
            }
        };
        result.explanation.insert(record)
    }

    fn warnings_for(&self, roi: &RoiLocation, tirads: &TiradsResult) -> Vec<PipelineWarning> {
        let mut warnings = Vec::new();
        match roi.status {
            RoiStatus::Detected => {}
            RoiStatus::Fallback {
                reason: FallbackReason::NoCandidates,
            } => warnings.push(PipelineWarning::NoDetection),
            RoiStatus::Fallback {
                reason: FallbackReason::LowConfidence { best_score },
            } => warnings.push(PipelineWarning::LowConfidenceDetection {
                best_score,
                threshold: self.config.score_threshold,
            }),
        }
        if let Some(ScoreAnomaly::UndefinedPointTotal) = tirads.anomaly {
            warnings.push(PipelineWarning::UndefinedPointTotal {
                total_points: tirads.total_points,
            });
        }
        warnings
    }
}

/// Decodes encoded image bytes into an RGB buffer
///
/// # Errors
///
/// `MalformedImage` if the bytes are not a supported image or decode to
/// zero pixels.
pub fn decode(bytes: &[u8]) -> Result<RgbImage> {
    let image = image::load_from_memory(bytes)?.to_rgb8();
    if image.width() == 0 || image.height() == 0 {
        return Err(TiradsError::MalformedImage(format!(
            "decoded image has no pixels ({}x{})",
            image.width(),
            image.height()
        )));
    }
    Ok(image)
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

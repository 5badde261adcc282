use super::{Candidate, Detector};
use crate::error::{Result, TiradsError};
use crate::transform::{to_xyxy, LocalFrame};
use crate::types::{BoundingBox, CoordinateSpace, PipelineConfig};
use image::imageops::{self, FilterType};
use image::RgbImage;
use log::{debug, warn};
use std::borrow::Cow;
use std::sync::Arc;

/// Why the locator fell back to the whole image
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
#[cfg_attr(feature = "json", serde(tag = "reason", rename_all = "snake_case"))]
pub enum FallbackReason {
    /// Detector returned no usable candidates
    NoCandidates,
    /// Best candidate scored below the threshold
    LowConfidence { best_score: f64 },
}

/// Outcome tag carried by every located ROI
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
#[cfg_attr(feature = "json", serde(tag = "kind", rename_all = "snake_case"))]
pub enum RoiStatus {
    Detected,
    Fallback {
        #[cfg_attr(feature = "json", serde(flatten))]
        reason: FallbackReason,
    },
}

impl RoiStatus {
    pub fn is_fallback(&self) -> bool {
        matches!(self, RoiStatus::Fallback { .. })
    }
}

/// Locator decision before the box has been mapped to raw space
#[derive(Debug, Clone, PartialEq)]
pub enum RoiProposal {
    /// Confident candidate, still in the detector's local frame
    Detected {
        local_bbox: BoundingBox,
        score: f64,
        frame: LocalFrame,
    },
    /// No confident candidate; the ROI becomes the whole raw image
    Fallback {
        reason: FallbackReason,
        raw_width: u32,
        raw_height: u32,
    },
}

impl RoiProposal {
    /// Resolves the proposal into a raw-space xyxy box
    ///
    /// # Errors
    ///
    /// Returns `InvalidCoordinateSpace`/`InvalidBox` if the detected box
    /// cannot be remapped.
    pub fn into_location(self) -> Result<RoiLocation> {
        match self {
            RoiProposal::Detected {
                local_bbox,
                score,
                frame,
            } => {
                let bbox = to_xyxy(&frame.to_raw(&local_bbox)?);
                bbox.validate()?;
                Ok(RoiLocation {
                    bbox,
                    score,
                    status: RoiStatus::Detected,
                    local_bbox: Some(local_bbox),
                })
            }
            RoiProposal::Fallback {
                reason,
                raw_width,
                raw_height,
            } => Ok(RoiLocation {
                bbox: BoundingBox::whole_image(raw_width, raw_height, CoordinateSpace::RawImage),
                score: 0.0,
                status: RoiStatus::Fallback { reason },
                local_bbox: None,
            }),
        }
    }
}

/// Located region of interest, always xyxy in raw image space
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct RoiLocation {
    pub bbox: BoundingBox,
    /// Detector score; 0.0 for fallbacks
    pub score: f64,
    pub status: RoiStatus,
    /// Detector box before remapping, kept for audit
    pub local_bbox: Option<BoundingBox>,
}

impl RoiLocation {
    pub fn is_fallback(&self) -> bool {
        self.status.is_fallback()
    }
}

/// Selects exactly one ROI per image from detector output
///
/// Policy: the highest-scoring candidate wins; if there is none, or it
/// scores below the threshold, the whole image is returned with score 0.0.
#[derive(Clone)]
pub struct RoiLocator {
    detector: Arc<dyn Detector>,
    score_threshold: f64,
    focal_window: Option<u32>,
    detector_input_size: Option<u32>,
}

impl RoiLocator {
    /// Creates a locator with the default threshold and no focal window
    pub fn new(detector: Arc<dyn Detector>) -> Self {
        Self::with_config(detector, &PipelineConfig::default())
    }

    /// Creates a locator from pipeline configuration
    pub fn with_config(detector: Arc<dyn Detector>, config: &PipelineConfig) -> Self {
        Self {
            detector,
            score_threshold: config.score_threshold,
            focal_window: config.focal_window,
            detector_input_size: config.detector_input_size,
        }
    }

    /// Returns the wrapped detector's name
    pub fn detector_name(&self) -> &str {
        self.detector.name()
    }

    /// Locates the ROI and maps it to raw image space
    pub fn locate(&self, image: &RgbImage) -> Result<RoiLocation> {
        self.propose(image)?.into_location()
    }

    /// Runs the detector and applies the threshold/fallback policy
    ///
    /// # Errors
    ///
    /// - `MalformedImage` if the image has no pixels
    /// - `Detector` (or whatever the detector reports) on inference failure
    /// - `InvalidBox` if the winning candidate has inverted or non-finite corners
    pub fn propose(&self, image: &RgbImage) -> Result<RoiProposal> {
        let (raw_width, raw_height) = image.dimensions();
        if raw_width == 0 || raw_height == 0 {
            return Err(TiradsError::MalformedImage(format!(
                "image has no pixels ({}x{})",
                raw_width, raw_height
            )));
        }

        let frame = LocalFrame::focal(
            raw_width,
            raw_height,
            self.focal_window,
            self.detector_input_size,
        );
        let input = detector_input(image, &frame);
        debug!(
            "Running detector {} on {}x{} input",
            self.detector.name(),
            input.width(),
            input.height()
        );

        let candidates = self.detector.detect(&input)?;
        let best = select_best(&candidates);

        let proposal = match best {
            None => {
                warn!(
                    "Detector {} returned no usable candidates, using whole image",
                    self.detector.name()
                );
                RoiProposal::Fallback {
                    reason: FallbackReason::NoCandidates,
                    raw_width,
                    raw_height,
                }
            }
            Some(candidate) if candidate.score < self.score_threshold => {
                warn!(
                    "Low confidence detection ({:.3} < {:.3}), using whole image",
                    candidate.score, self.score_threshold
                );
                RoiProposal::Fallback {
                    reason: FallbackReason::LowConfidence {
                        best_score: candidate.score,
                    },
                    raw_width,
                    raw_height,
                }
            }
            Some(candidate) => {
                let local_bbox =
                    frame.local_box(candidate.xmin, candidate.ymin, candidate.xmax, candidate.ymax);
                local_bbox.validate()?;
                debug!(
                    "Selected candidate {} (score {:.3}) out of {}",
                    local_bbox,
                    candidate.score,
                    candidates.len()
                );
                RoiProposal::Detected {
                    local_bbox,
                    score: candidate.score,
                    frame,
                }
            }
        };

        Ok(proposal)
    }
}

/// Picks the highest finite score; ties keep the first candidate
fn select_best(candidates: &[Candidate]) -> Option<Candidate> {
    candidates
        .iter()
        .filter(|c| c.score.is_finite())
        .fold(None, |best: Option<Candidate>, c| match best {
            Some(b) if b.score >= c.score => Some(b),
            _ => Some(*c),
        })
}

/// Cuts and resizes the detector's view of the raw image
fn detector_input<'a>(image: &'a RgbImage, frame: &LocalFrame) -> Cow<'a, RgbImage> {
    if frame.is_identity() {
        return Cow::Borrowed(image);
    }

    let window = imageops::crop_imm(
        image,
        frame.offset_x,
        frame.offset_y,
        frame.source_width,
        frame.source_height,
    )
    .to_image();

    if frame.needs_resize() {
        Cow::Owned(imageops::resize(
            &window,
            frame.width,
            frame.height,
            FilterType::Triangle,
        ))
    } else {
        Cow::Owned(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoxFormat;
    use parking_lot::Mutex;

    struct FixedDetector {
        candidates: Vec<Candidate>,
        seen: Mutex<Option<(u32, u32)>>,
    }

    impl FixedDetector {
        fn new(candidates: Vec<Candidate>) -> Arc<Self> {
            Arc::new(Self {
                candidates,
                seen: Mutex::new(None),
            })
        }
    }

    impl Detector for FixedDetector {
        fn name(&self) -> &str {
            "fixed"
        }

        fn detect(&self, pixels: &RgbImage) -> Result<Vec<Candidate>> {
            *self.seen.lock() = Some(pixels.dimensions());
            Ok(self.candidates.clone())
        }
    }

    struct FailingDetector;

    impl Detector for FailingDetector {
        fn name(&self) -> &str {
            "failing"
        }

        fn detect(&self, _pixels: &RgbImage) -> Result<Vec<Candidate>> {
            Err(TiradsError::Detector("weights not loaded".to_string()))
        }
    }

    fn image(w: u32, h: u32) -> RgbImage {
        RgbImage::new(w, h)
    }

    #[test]
    fn test_no_candidates_falls_back_to_whole_image() {
        let locator = RoiLocator::new(FixedDetector::new(vec![]));
        let roi = locator.locate(&image(100, 80)).unwrap();

        assert!(roi.is_fallback());
        assert_eq!(roi.score, 0.0);
        assert_eq!(roi.bbox.corners(), (0.0, 0.0, 100.0, 80.0));
        assert_eq!(roi.bbox.format(), BoxFormat::Xyxy);
        assert_eq!(roi.bbox.coordinate_space, CoordinateSpace::RawImage);
        assert_eq!(
            roi.status,
            RoiStatus::Fallback {
                reason: FallbackReason::NoCandidates
            }
        );
        assert!(roi.local_bbox.is_none());
    }

    #[test]
    fn test_low_confidence_falls_back() {
        let detector = FixedDetector::new(vec![Candidate::new(10.0, 10.0, 40.0, 40.0, 0.3)]);
        let roi = RoiLocator::new(detector).locate(&image(100, 100)).unwrap();

        assert_eq!(
            roi.status,
            RoiStatus::Fallback {
                reason: FallbackReason::LowConfidence { best_score: 0.3 }
            }
        );
        assert_eq!(roi.score, 0.0);
        assert_eq!(roi.bbox.corners(), (0.0, 0.0, 100.0, 100.0));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let detector = FixedDetector::new(vec![Candidate::new(10.0, 10.0, 40.0, 40.0, 0.5)]);
        let roi = RoiLocator::new(detector).locate(&image(100, 100)).unwrap();
        assert_eq!(roi.status, RoiStatus::Detected);
        assert_eq!(roi.score, 0.5);
    }

    #[test]
    fn test_picks_highest_score() {
        let detector = FixedDetector::new(vec![
            Candidate::new(0.0, 0.0, 10.0, 10.0, 0.6),
            Candidate::new(20.0, 30.0, 60.0, 70.0, 0.9),
            Candidate::new(5.0, 5.0, 15.0, 15.0, f64::NAN),
            Candidate::new(50.0, 50.0, 90.0, 90.0, 0.7),
        ]);
        let roi = RoiLocator::new(detector).locate(&image(100, 100)).unwrap();

        assert_eq!(roi.status, RoiStatus::Detected);
        assert_eq!(roi.score, 0.9);
        assert_eq!(roi.bbox.corners(), (20.0, 30.0, 60.0, 70.0));
        assert_eq!(roi.bbox.coordinate_space, CoordinateSpace::RawImage);
        assert_eq!(
            roi.local_bbox.unwrap().coordinate_space,
            CoordinateSpace::LocalCrop
        );
    }

    #[test]
    fn test_only_nan_scores_fall_back() {
        let detector = FixedDetector::new(vec![Candidate::new(0.0, 0.0, 10.0, 10.0, f64::NAN)]);
        let roi = RoiLocator::new(detector).locate(&image(50, 50)).unwrap();
        assert_eq!(
            roi.status,
            RoiStatus::Fallback {
                reason: FallbackReason::NoCandidates
            }
        );
    }

    #[test]
    fn test_focal_window_remaps_to_raw() {
        let detector = FixedDetector::new(vec![Candidate::new(10.0, 20.0, 60.0, 70.0, 0.95)]);
        let config = PipelineConfig::default()
            .with_focal_window(512)
            .with_detector_input_size(256);
        let locator = RoiLocator::with_config(detector.clone(), &config);

        let roi = locator.locate(&image(1000, 800)).unwrap();

        assert_eq!(*detector.seen.lock(), Some((256, 256)));
        assert_eq!(roi.bbox.corners(), (264.0, 184.0, 364.0, 284.0));
        assert_eq!((roi.bbox.image_width, roi.bbox.image_height), (1000, 800));
    }

    #[test]
    fn test_detector_sees_full_image_by_default() {
        let detector = FixedDetector::new(vec![]);
        RoiLocator::new(detector.clone())
            .locate(&image(320, 240))
            .unwrap();
        assert_eq!(*detector.seen.lock(), Some((320, 240)));
    }

    #[test]
    fn test_inverted_candidate_is_rejected() {
        let detector = FixedDetector::new(vec![Candidate::new(60.0, 60.0, 10.0, 10.0, 0.9)]);
        let err = RoiLocator::new(detector)
            .propose(&image(100, 100))
            .unwrap_err();
        assert!(matches!(err, TiradsError::InvalidBox(_)));
    }

    #[test]
    fn test_detector_failure_propagates() {
        let err = RoiLocator::new(Arc::new(FailingDetector))
            .locate(&image(10, 10))
            .unwrap_err();
        assert!(matches!(err, TiradsError::Detector(_)));
    }

    #[test]
    fn test_empty_image_is_malformed() {
        let err = RoiLocator::new(FixedDetector::new(vec![]))
            .locate(&image(0, 0))
            .unwrap_err();
        assert!(matches!(err, TiradsError::MalformedImage(_)));
    }
}

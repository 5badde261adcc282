//! ROI localisation
//!
//! Wraps an external nodule detector and applies the score threshold and
//! whole-image fallback policy.

mod roi;

pub use roi::{FallbackReason, RoiLocation, RoiLocator, RoiProposal, RoiStatus};

use crate::error::Result;
use image::RgbImage;

/// One detector output, in the pixel frame of the image the detector was given
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
    pub score: f64,
}

impl Candidate {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64, score: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
            score,
        }
    }
}

/// External nodule detector
///
/// Implementations hold loaded weights and must be safe to share across
/// concurrent runs. Returning an empty list is a valid "nothing found".
pub trait Detector: Send + Sync {
    /// Model name and version for provenance
    fn name(&self) -> &str;

    /// Detects candidate nodules in `pixels`
    ///
    /// # Errors
    ///
    /// Only for inference failures; never for "no detection".
    fn detect(&self, pixels: &RgbImage) -> Result<Vec<Candidate>>;
}

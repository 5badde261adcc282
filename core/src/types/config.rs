use std::time::Duration;

/// Minimum detector score for a candidate to be accepted as the ROI
pub const DEFAULT_SCORE_THRESHOLD: f64 = 0.5;

/// Default timeout for the text-generation call
pub const DEFAULT_EXPLANATION_TIMEOUT_MS: u64 = 10_000;

/// Default number of explanations kept in memory
pub const DEFAULT_EXPLANATION_CACHE_CAPACITY: usize = 1024;

/// Settings that decide which region the classifier sees
///
/// Recorded on every prediction so a result can be traced back to the
/// detection configuration that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct DetectionSettings {
    pub score_threshold: f64,
    pub focal_window: Option<u32>,
    pub detector_input_size: Option<u32>,
}

impl DetectionSettings {
    /// Compact tag for version strings
    ///
    /// # Example
    ///
    /// ```
    /// use tirads_core::PipelineConfig;
    ///
    /// assert_eq!(PipelineConfig::default().detection_settings().tag(), "t0.5-full-native");
    /// let config = PipelineConfig::default()
    ///     .with_score_threshold(0.25)
    ///     .with_focal_window(512)
    ///     .with_detector_input_size(256);
    /// assert_eq!(config.detection_settings().tag(), "t0.25-w512-s256");
    /// ```
    pub fn tag(&self) -> String {
        let window = self
            .focal_window
            .map_or_else(|| "full".to_string(), |side| format!("w{}", side));
        let input = self
            .detector_input_size
            .map_or_else(|| "native".to_string(), |size| format!("s{}", size));
        format!("t{}-{}-{}", self.score_threshold, window, input)
    }
}

/// Configuration for the inference pipeline
///
/// # Example
///
/// ```
/// use tirads_core::PipelineConfig;
///
/// let config = PipelineConfig::default()
///     .with_focal_window(512)
///     .with_detector_input_size(256)
///     .enable_llm_explanations(false);
///
/// assert_eq!(config.score_threshold, 0.5);
/// assert_eq!(config.focal_window, Some(512));
/// assert!(!config.llm_explanations);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(default))]
pub struct PipelineConfig {
    /// Candidates scoring below this are treated as "nothing detected"
    pub score_threshold: f64,

    /// Side of the centred square window handed to the detector
    /// If None, the detector sees the whole raw image.
    pub focal_window: Option<u32>,

    /// Longer side the detector window is resized to
    /// If None, the window is passed at native resolution.
    pub detector_input_size: Option<u32>,

    /// Whether the explanation service may call the text generator
    pub llm_explanations: bool,

    /// Timeout for one text-generation call, in milliseconds
    pub explanation_timeout_ms: u64,

    /// Maximum number of explanations kept in the cache
    /// The oldest stored entries are evicted first.
    pub explanation_cache_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            focal_window: None,
            detector_input_size: None,
            llm_explanations: true,
            explanation_timeout_ms: DEFAULT_EXPLANATION_TIMEOUT_MS,
            explanation_cache_capacity: DEFAULT_EXPLANATION_CACHE_CAPACITY,
        }
    }
}

impl PipelineConfig {
    /// Builder: Set the detection score threshold
    pub fn with_score_threshold(mut self, threshold: f64) -> Self {
        self.score_threshold = threshold;
        self
    }

    /// Builder: Restrict detection to a centred square window
    pub fn with_focal_window(mut self, side: u32) -> Self {
        self.focal_window = Some(side);
        self
    }

    /// Builder: Resize the detector window so its longer side is `size`
    pub fn with_detector_input_size(mut self, size: u32) -> Self {
        self.detector_input_size = Some(size);
        self
    }

    /// Builder: Enable or disable the text-generation path
    ///
    /// When disabled every explanation uses the rule-based template.
    pub fn enable_llm_explanations(mut self, enable: bool) -> Self {
        self.llm_explanations = enable;
        self
    }

    /// Builder: Set the text-generation timeout
    pub fn with_explanation_timeout(mut self, timeout: Duration) -> Self {
        self.explanation_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Builder: Set how many explanations the cache keeps
    pub fn with_explanation_cache_capacity(mut self, capacity: usize) -> Self {
        self.explanation_cache_capacity = capacity;
        self
    }

    /// Returns the text-generation timeout
    pub fn explanation_timeout(&self) -> Duration {
        Duration::from_millis(self.explanation_timeout_ms)
    }

    /// Returns the settings that affect ROI selection
    pub fn detection_settings(&self) -> DetectionSettings {
        DetectionSettings {
            score_threshold: self.score_threshold,
            focal_window: self.focal_window,
            detector_input_size: self.detector_input_size,
        }
    }
}

pub mod manual;
pub mod report;

pub use manual::{parse_feature, parse_roi, ManualClassifier, ManualDetector};

use crate::error::{Result, TiradsError};
use crate::types::PipelineConfig;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

/// Command-line arguments for tirads
#[derive(Parser, Debug)]
#[command(name = "tirads")]
#[command(about = "ACR TI-RADS scoring for thyroid ultrasound images")]
#[command(version)]
pub struct Cli {
    /// Path to ultrasound image (PNG, JPEG, ...)
    #[arg(value_name = "IMAGE")]
    pub image: PathBuf,

    /// Detector candidate as x1,y1,x2,y2[:score]; repeatable
    #[arg(long = "roi", value_name = "BOX", allow_hyphen_values = true)]
    pub rois: Vec<String>,

    /// Feature label as axis=class[:confidence]; repeatable
    #[arg(long = "feature", value_name = "AXIS=CLASS")]
    pub features: Vec<String>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Attach a natural-language explanation
    #[arg(short, long)]
    pub explain: bool,

    /// Minimum detector score for a candidate to be used
    #[arg(short, long)]
    pub threshold: Option<f64>,

    /// Pipeline configuration file (JSON)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Builds the pipeline configuration from `--config` and overrides
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(threshold) = self.threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(TiradsError::InvalidConfig(format!(
                    "threshold {} outside [0, 1]",
                    threshold
                )));
            }
            config = config.with_score_threshold(threshold);
        }
        Ok(config)
    }
}

/// Output format options
#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    Text,
    /// JSON format
    Json,
}

/// Loads a [`PipelineConfig`] from a JSON file
///
/// Missing fields keep their defaults.
#[cfg(feature = "json")]
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text)
        .map_err(|e| TiradsError::InvalidConfig(format!("{}: {}", path.display(), e)))
}

#[cfg(not(feature = "json"))]
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    Err(TiradsError::InvalidConfig(format!(
        "{}: configuration files require the 'json' feature",
        path.display()
    )))
}

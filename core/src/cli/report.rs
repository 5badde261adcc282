use crate::api::PredictionResult;
use crate::detection::{FallbackReason, RoiStatus};
use crate::types::BoxCoords;
use std::fmt;

/// Text report formatter for a prediction
pub struct TextReport<'a> {
    result: &'a PredictionResult,
}

impl<'a> TextReport<'a> {
    /// Creates a new text report
    pub fn new(result: &'a PredictionResult) -> Self {
        Self { result }
    }
}

impl<'a> fmt::Display for TextReport<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.result;
        let tirads = &result.tirads;

        writeln!(f, "TI-RADS Assessment")?;
        writeln!(f, "==================")?;
        writeln!(f)?;
        writeln!(
            f,
            "Category:       {} ({})",
            tirads.category,
            tirads.category.risk_label()
        )?;
        writeln!(f, "Total Points:   {}", tirads.total_points)?;
        writeln!(f, "Confidence:     {:.4}", tirads.aggregate_confidence)?;
        writeln!(f, "Rule Set:       {}", tirads.rule_set)?;
        writeln!(f)?;

        writeln!(f, "Region of Interest")?;
        writeln!(f, "------------------")?;
        match result.roi.status {
            RoiStatus::Detected => {
                writeln!(f, "Status:         detected (score {:.3})", result.roi.score)?
            }
            RoiStatus::Fallback {
                reason: FallbackReason::NoCandidates,
            } => writeln!(f, "Status:         whole image (no detection)")?,
            RoiStatus::Fallback {
                reason: FallbackReason::LowConfidence { best_score },
            } => writeln!(
                f,
                "Status:         whole image (best score {:.3})",
                best_score
            )?,
        }
        if let BoxCoords::Xywh {
            x,
            y,
            width,
            height,
        } = result.bounding_box_xywh().coords
        {
            writeln!(f, "Box (xywh):     [{}, {}, {}, {}]", x, y, width, height)?;
        }
        writeln!(f, "Crop:           {}", result.crop)?;
        writeln!(
            f,
            "Image:          {}x{}",
            result.image_width, result.image_height
        )?;
        writeln!(f)?;

        writeln!(f, "Features")?;
        writeln!(f, "--------")?;
        for score in &tirads.breakdown {
            writeln!(
                f,
                "{:<16}{:<26}{} pts  ({:.2})",
                format!("{}:", score.axis.display_name()),
                score.class_label,
                score.points,
                score.confidence
            )?;
        }

        if !result.warnings.is_empty() {
            writeln!(f)?;
            writeln!(f, "Warnings")?;
            writeln!(f, "--------")?;
            for warning in &result.warnings {
                writeln!(f, "- {}", warning)?;
            }
        }

        if let Some(explanation) = &result.explanation {
            writeln!(f)?;
            writeln!(f, "Explanation ({})", explanation.engine_name)?;
            writeln!(f, "-----------")?;
            writeln!(f, "{}", explanation.text)?;
        }

        writeln!(f)?;
        writeln!(f, "Pipeline")?;
        writeln!(f, "--------")?;
        writeln!(f, "Prediction:     {}", result.id)?;
        writeln!(f, "Version:        {}", result.pipeline_version)?;
        writeln!(
            f,
            "Models:         {} / {}",
            result.models.detector, result.models.classifier
        )?;
        writeln!(f, "Inference:      {:.1} ms", result.timings.total_ms)?;

        Ok(())
    }
}

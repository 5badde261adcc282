use crate::rules::TiradsResult;
use crate::types::{FeatureAxis, TiradsCategory};

/// Sampling temperature for explanation requests
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Output token cap for explanation requests
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 256;

const SYSTEM_INSTRUCTION: &str = "\
You are a medical explanation generator for a thyroid nodule analysis system. \
You do not diagnose, predict, or modify findings. \
You ONLY explain the provided structured data from the vision model. \
Do NOT introduce new features, risks, or recommendations. \
Keep the tone neutral, professional, and factual (suitable for clinicians).";

/// One axis as seen by the explanation layer
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct ExplanationFeature {
    pub axis: FeatureAxis,
    pub class_label: String,
    pub points: u8,
    pub confidence: f64,
}

/// Structured data an explanation is generated from
///
/// Stored verbatim in the resulting record so the text can be audited
/// against exactly what the generator was shown.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct ExplanationInput {
    pub category: TiradsCategory,
    pub total_points: u8,
    pub overall_confidence: f64,
    pub features: Vec<ExplanationFeature>,
}

impl ExplanationInput {
    /// Snapshots a rule-engine result
    pub fn from_result(result: &TiradsResult) -> Self {
        Self {
            category: result.category,
            total_points: result.total_points,
            overall_confidence: result.aggregate_confidence,
            features: result
                .breakdown
                .iter()
                .map(|s| ExplanationFeature {
                    axis: s.axis,
                    class_label: s.class_label.to_string(),
                    points: s.points,
                    confidence: s.confidence,
                })
                .collect(),
        }
    }

    /// Returns the class label reported for `axis`
    pub fn class_for(&self, axis: FeatureAxis) -> Option<&str> {
        self.features
            .iter()
            .find(|f| f.axis == axis)
            .map(|f| f.class_label.as_str())
    }

    /// Renders the data block embedded in the user prompt
    pub fn data_block(&self) -> String {
        let mut out = format!(
            "tirads: {}\ntotal_points: {}\noverall_confidence: {:.2}\nfeatures:\n",
            self.category.number(),
            self.total_points,
            self.overall_confidence
        );
        for f in &self.features {
            out.push_str(&format!(
                "- {}: {} (confidence {:.2}, {} points)\n",
                f.axis.key(),
                f.class_label,
                f.confidence,
                f.points
            ));
        }
        out
    }
}

/// Prompt handed to a [`TextGenerator`](super::TextGenerator)
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Prompt {
    /// Builds the explanation prompt for `input`
    ///
    /// The generator only ever sees the structured breakdown; no image data
    /// or identifiers are included.
    pub fn for_input(input: &ExplanationInput) -> Self {
        let user = format!(
            "Using ONLY the provided data:\n\
             - Explain why the TI-RADS score of {} was assigned.\n\
             - Mention specific features listed (e.g., composition, echogenicity).\n\
             - Reflect confidence values qualitatively (e.g., \"high confidence\", \"moderate confidence\").\n\
             - Do NOT add clinical advice or follow-up steps.\n\
             - Maximum 100 words.\n\
             \n\
             DATA:\n{}",
            input.category.number(),
            input.data_block()
        );

        Self {
            system: SYSTEM_INSTRUCTION.to_string(),
            user,
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }
}

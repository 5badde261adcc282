use super::prompt::ExplanationInput;
use crate::types::FeatureAxis;

/// Engine name recorded for template-generated explanations
pub const FALLBACK_ENGINE_NAME: &str = "rule-based-fallback";

/// Marker every template explanation starts with
pub const FALLBACK_PREFIX: &str = "Clinical Summary (Rule-Based)";

/// Builds the deterministic rule-based explanation
///
/// Names the category and every reported feature class. Makes no numeric
/// claims beyond the category number, so it can never contradict the data.
///
/// # Example
///
/// ```
/// use tirads_core::explain::{fallback_explanation, ExplanationInput};
/// use tirads_core::rules::score;
/// use tirads_core::{Composition, EchogenicFoci, Echogenicity, FeatureSet, Margin, Shape};
///
/// let features = FeatureSet::certain(
///     Composition::Solid,
///     Echogenicity::Hypoechoic,
///     Shape::WiderThanTall,
///     Margin::Smooth,
///     EchogenicFoci::None,
/// );
/// let text = fallback_explanation(&ExplanationInput::from_result(&score(&features)));
/// assert!(text.starts_with("Clinical Summary (Rule-Based): The thyroid nodule is classified as TI-RADS 4 (moderately suspicious)."));
/// ```
pub fn fallback_explanation(input: &ExplanationInput) -> String {
    let mut summary = format!(
        "{}: The thyroid nodule is classified as TI-RADS {} ({}). ",
        FALLBACK_PREFIX,
        input.category.number(),
        input.category.risk_label()
    );

    let findings: Vec<String> = FeatureAxis::ALL
        .iter()
        .filter_map(|&axis| {
            let class = input.class_for(axis)?;
            Some(finding(axis, class))
        })
        .collect();

    if findings.is_empty() {
        summary.push_str("No individual feature findings were reported.");
    } else {
        summary.push_str("Key findings include: ");
        summary.push_str(&findings.join(", "));
        summary.push('.');
    }
    summary
}

fn finding(axis: FeatureAxis, class_label: &str) -> String {
    let class = class_label.replace('_', " ");
    match axis {
        FeatureAxis::Margin => format!("margins are {}", class),
        FeatureAxis::EchogenicFoci => format!("echogenic foci: {}", class),
        _ => format!("{} is {}", axis.display_name(), class),
    }
}

use super::points::TiradsPoints;
use crate::types::{FeatureAxis, FeaturePrediction, FeatureSet, TiradsCategory};
use log::{debug, warn};
use std::fmt;

/// Name of the rule set applied by [`score`]
pub const RULE_SET_NAME: &str = "acr-tirads";

/// Version of the rule set applied by [`score`]
pub const RULE_SET_VERSION: &str = "2017";

/// A point total the ACR thresholds do not define
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
#[cfg_attr(feature = "json", serde(rename_all = "snake_case"))]
pub enum ScoreAnomaly {
    /// Total of exactly 1 point; reported as TR1
    UndefinedPointTotal,
}

impl fmt::Display for ScoreAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreAnomaly::UndefinedPointTotal => {
                write!(f, "point total 1 is undefined in ACR TI-RADS; reported as TR1")
            }
        }
    }
}

/// Contribution of one axis to the total
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct FeatureScore {
    pub axis: FeatureAxis,
    pub class_label: &'static str,
    pub points: u8,
    pub confidence: f64,
    pub rationale: String,
}

/// Output of the rule engine
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct TiradsResult {
    pub total_points: u8,
    pub category: TiradsCategory,
    /// One entry per axis, in report order
    pub breakdown: Vec<FeatureScore>,
    /// Mean of the five feature confidences, rounded to 4 decimals
    pub aggregate_confidence: f64,
    #[cfg_attr(feature = "json", serde(skip_serializing_if = "Option::is_none"))]
    pub anomaly: Option<ScoreAnomaly>,
    pub rule_set: String,
}

impl TiradsResult {
    /// Returns the breakdown entry for `axis`
    pub fn feature(&self, axis: FeatureAxis) -> Option<&FeatureScore> {
        self.breakdown.iter().find(|s| s.axis == axis)
    }
}

/// Maps a point total to its category
///
/// 0 → TR1, 2 → TR2, 3 → TR3, 4..=6 → TR4, 7+ → TR5. A total of 1 is not
/// covered by the thresholds; it maps to TR1 and is flagged.
///
/// # Example
///
/// ```
/// use tirads_core::rules::{category_for_points, ScoreAnomaly};
/// use tirads_core::TiradsCategory;
///
/// assert_eq!(category_for_points(5), (TiradsCategory::Tr4, None));
/// assert_eq!(
///     category_for_points(1),
///     (TiradsCategory::Tr1, Some(ScoreAnomaly::UndefinedPointTotal))
/// );
/// ```
pub fn category_for_points(total: u8) -> (TiradsCategory, Option<ScoreAnomaly>) {
    match total {
        0 => (TiradsCategory::Tr1, None),
        1 => (TiradsCategory::Tr1, Some(ScoreAnomaly::UndefinedPointTotal)),
        2 => (TiradsCategory::Tr2, None),
        3 => (TiradsCategory::Tr3, None),
        4..=6 => (TiradsCategory::Tr4, None),
        _ => (TiradsCategory::Tr5, None),
    }
}

/// Scores a feature set
///
/// Pure and deterministic: the same features always produce the same result.
pub fn score(features: &FeatureSet) -> TiradsResult {
    let breakdown = vec![
        feature_score(&features.composition),
        feature_score(&features.echogenicity),
        feature_score(&features.shape),
        feature_score(&features.margin),
        feature_score(&features.echogenic_foci),
    ];

    let total_points: u8 = breakdown.iter().map(|s| s.points).sum();
    let (category, anomaly) = category_for_points(total_points);
    if let Some(anomaly) = anomaly {
        warn!("{}", anomaly);
    }

    let confidences = features.confidences();
    let mean = confidences.iter().sum::<f64>() / confidences.len() as f64;

    debug!(
        "TI-RADS total {} -> {} ({})",
        total_points,
        category,
        category.risk_label()
    );

    TiradsResult {
        total_points,
        category,
        breakdown,
        aggregate_confidence: round4(mean),
        anomaly,
        rule_set: format!("{}/{}", RULE_SET_NAME, RULE_SET_VERSION),
    }
}

fn feature_score<C: TiradsPoints>(prediction: &FeaturePrediction<C>) -> FeatureScore {
    let class = prediction.predicted_class;
    let points = class.points();
    FeatureScore {
        axis: C::AXIS,
        class_label: class.label(),
        points,
        confidence: prediction.confidence,
        rationale: format!(
            "{}: {} ({}) contributes {} point{}",
            C::AXIS.display_name(),
            class.label(),
            class.description(),
            points,
            if points == 1 { "" } else { "s" }
        ),
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::points::max_total_points;
    use crate::types::{Composition, EchogenicFoci, Echogenicity, Margin, Shape};
    use rstest::rstest;

    #[rstest]
    #[case(0, TiradsCategory::Tr1)]
    #[case(1, TiradsCategory::Tr1)]
    #[case(2, TiradsCategory::Tr2)]
    #[case(3, TiradsCategory::Tr3)]
    #[case(4, TiradsCategory::Tr4)]
    #[case(6, TiradsCategory::Tr4)]
    #[case(7, TiradsCategory::Tr5)]
    #[case(14, TiradsCategory::Tr5)]
    fn test_category_thresholds(#[case] total: u8, #[case] expected: TiradsCategory) {
        assert_eq!(category_for_points(total).0, expected);
    }

    #[test]
    fn test_category_monotonic() {
        let mut previous = TiradsCategory::Tr1;
        for total in 0..=max_total_points() {
            let (category, _) = category_for_points(total);
            assert!(category >= previous, "category dropped at {}", total);
            previous = category;
        }
    }

    #[test]
    fn test_only_one_point_is_anomalous() {
        for total in 0..=max_total_points() {
            let (_, anomaly) = category_for_points(total);
            assert_eq!(anomaly.is_some(), total == 1);
        }
    }

    #[test]
    fn test_highly_suspicious_nodule() {
        let features = FeatureSet::certain(
            Composition::Solid,
            Echogenicity::VeryHypoechoic,
            Shape::TallerThanWide,
            Margin::Irregular,
            EchogenicFoci::PunctateEchogenicFoci,
        );
        let result = score(&features);

        assert_eq!(result.total_points, 13);
        assert_eq!(result.category, TiradsCategory::Tr5);
        assert_eq!(result.anomaly, None);
        assert_eq!(result.aggregate_confidence, 1.0);
    }

    #[test]
    fn test_highly_suspicious_with_microcalcifications() {
        let features = FeatureSet::certain(
            Composition::Solid,
            Echogenicity::VeryHypoechoic,
            Shape::TallerThanWide,
            Margin::Irregular,
            EchogenicFoci::Microcalcifications,
        );
        let result = score(&features);

        assert_eq!(result.total_points, 13);
        assert_eq!(result.category, TiradsCategory::Tr5);
        assert_eq!(result.anomaly, None);

        let foci = result.feature(FeatureAxis::EchogenicFoci).unwrap();
        assert_eq!(foci.class_label, "microcalcifications");
        assert_eq!(foci.points, 3);
    }

    #[test]
    fn test_benign_nodule() {
        let features = FeatureSet::certain(
            Composition::Spongiform,
            Echogenicity::Anechoic,
            Shape::WiderThanTall,
            Margin::Smooth,
            EchogenicFoci::None,
        );
        let result = score(&features);

        assert_eq!(result.total_points, 0);
        assert_eq!(result.category, TiradsCategory::Tr1);
        assert!(result.breakdown.iter().all(|s| s.points == 0));
    }

    #[test]
    fn test_one_point_flagged() {
        let features = FeatureSet::certain(
            Composition::Cystic,
            Echogenicity::Isoechoic,
            Shape::WiderThanTall,
            Margin::Smooth,
            EchogenicFoci::None,
        );
        let result = score(&features);

        assert_eq!(result.total_points, 1);
        assert_eq!(result.category, TiradsCategory::Tr1);
        assert_eq!(result.anomaly, Some(ScoreAnomaly::UndefinedPointTotal));
    }

    #[test]
    fn test_breakdown_and_confidence() {
        let mut features = FeatureSet::certain(
            Composition::Solid,
            Echogenicity::Hypoechoic,
            Shape::WiderThanTall,
            Margin::Smooth,
            EchogenicFoci::Macrocalcifications,
        );
        features.composition = FeaturePrediction::with_confidence(Composition::Solid, 0.9);
        features.echogenicity = FeaturePrediction::with_confidence(Echogenicity::Hypoechoic, 0.8);
        features.shape = FeaturePrediction::with_confidence(Shape::WiderThanTall, 0.7);
        features.margin = FeaturePrediction::with_confidence(Margin::Smooth, 0.6);
        features.echogenic_foci =
            FeaturePrediction::with_confidence(EchogenicFoci::Macrocalcifications, 0.33333);

        let result = score(&features);

        assert_eq!(result.total_points, 5);
        assert_eq!(result.category, TiradsCategory::Tr4);
        assert_eq!(result.aggregate_confidence, 0.6667);
        assert_eq!(result.breakdown.len(), 5);
        assert_eq!(result.rule_set, "acr-tirads/2017");

        let foci = result.feature(FeatureAxis::EchogenicFoci).unwrap();
        assert_eq!(foci.class_label, "macrocalcifications");
        assert_eq!(foci.points, 1);
        assert_eq!(
            foci.rationale,
            "echogenic foci: macrocalcifications (Macrocalcifications) contributes 1 point"
        );
    }

    #[test]
    fn test_breakdown_in_report_order() {
        let features = FeatureSet::certain(
            Composition::Solid,
            Echogenicity::Hypoechoic,
            Shape::WiderThanTall,
            Margin::Smooth,
            EchogenicFoci::None,
        );
        let axes: Vec<_> = score(&features).breakdown.iter().map(|s| s.axis).collect();
        assert_eq!(axes, FeatureAxis::ALL.to_vec());
    }
}

use super::enums::{Composition, EchogenicFoci, Echogenicity, FeatureClass, Margin, Shape};
use crate::error::{Result, TiradsError};
use std::collections::BTreeMap;

/// Tolerance when checking that a distribution sums to one
const DISTRIBUTION_TOLERANCE: f64 = 1e-3;

/// Classifier prediction for one feature axis
///
/// `distribution` holds the probability of every class the classifier
/// reported; `predicted_class` is its argmax as reported by the classifier.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct FeaturePrediction<C: FeatureClass> {
    pub predicted_class: C,
    pub confidence: f64,
    pub distribution: BTreeMap<C, f64>,
}

impl<C: FeatureClass> FeaturePrediction<C> {
    /// Creates a prediction with an explicit distribution
    pub fn new(predicted_class: C, confidence: f64, distribution: BTreeMap<C, f64>) -> Self {
        Self {
            predicted_class,
            confidence,
            distribution,
        }
    }

    /// Creates a one-hot prediction with confidence 1.0
    pub fn certain(predicted_class: C) -> Self {
        Self::with_confidence(predicted_class, 1.0)
    }

    /// Creates a prediction whose remaining mass is spread evenly over the other classes
    pub fn with_confidence(predicted_class: C, confidence: f64) -> Self {
        let others = (C::ALL.len() - 1) as f64;
        let rest = if others > 0.0 {
            (1.0 - confidence) / others
        } else {
            0.0
        };
        let distribution = C::ALL
            .iter()
            .map(|&class| {
                let p = if class == predicted_class {
                    confidence
                } else {
                    rest
                };
                (class, p)
            })
            .collect();
        Self::new(predicted_class, confidence, distribution)
    }

    /// Returns the axis name
    pub fn feature_name(&self) -> &'static str {
        C::AXIS.key()
    }

    /// Checks the confidence and distribution against the classifier contract
    ///
    /// # Errors
    ///
    /// Returns `InvalidPrediction` if the confidence is outside `[0, 1]`, any
    /// probability is outside `[0, 1]`, or a non-empty distribution does not
    /// sum to one.
    pub fn validate(&self) -> Result<()> {
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(TiradsError::InvalidPrediction(format!(
                "{} confidence {} outside [0, 1]",
                C::AXIS,
                self.confidence
            )));
        }
        if let Some((class, p)) = self
            .distribution
            .iter()
            .find(|(_, p)| !p.is_finite() || !(0.0..=1.0).contains(*p))
        {
            return Err(TiradsError::InvalidPrediction(format!(
                "{} probability for '{}' is {}",
                C::AXIS,
                class,
                p
            )));
        }
        if !self.distribution.is_empty() {
            let total: f64 = self.distribution.values().sum();
            if (total - 1.0).abs() > DISTRIBUTION_TOLERANCE {
                return Err(TiradsError::InvalidPrediction(format!(
                    "{} distribution sums to {:.4}",
                    C::AXIS,
                    total
                )));
            }
        }
        Ok(())
    }
}

/// Complete set of feature predictions, one slot per axis
///
/// # Example
///
/// ```
/// use tirads_core::{Composition, EchogenicFoci, Echogenicity, FeatureSet, Margin, Shape};
///
/// let features = FeatureSet::certain(
///     Composition::Solid,
///     Echogenicity::Hypoechoic,
///     Shape::WiderThanTall,
///     Margin::Smooth,
///     EchogenicFoci::None,
/// );
/// assert_eq!(features.confidences(), [1.0; 5]);
/// assert!(features.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct FeatureSet {
    pub composition: FeaturePrediction<Composition>,
    pub echogenicity: FeaturePrediction<Echogenicity>,
    pub shape: FeaturePrediction<Shape>,
    pub margin: FeaturePrediction<Margin>,
    pub echogenic_foci: FeaturePrediction<EchogenicFoci>,
}

impl FeatureSet {
    /// Creates a set of one-hot predictions with confidence 1.0
    pub fn certain(
        composition: Composition,
        echogenicity: Echogenicity,
        shape: Shape,
        margin: Margin,
        echogenic_foci: EchogenicFoci,
    ) -> Self {
        Self {
            composition: FeaturePrediction::certain(composition),
            echogenicity: FeaturePrediction::certain(echogenicity),
            shape: FeaturePrediction::certain(shape),
            margin: FeaturePrediction::certain(margin),
            echogenic_foci: FeaturePrediction::certain(echogenic_foci),
        }
    }

    /// Validates every slot
    pub fn validate(&self) -> Result<()> {
        self.composition.validate()?;
        self.echogenicity.validate()?;
        self.shape.validate()?;
        self.margin.validate()?;
        self.echogenic_foci.validate()
    }

    /// Returns per-axis confidences in report order
    pub fn confidences(&self) -> [f64; 5] {
        [
            self.composition.confidence,
            self.echogenicity.confidence,
            self.shape.confidence,
            self.margin.confidence,
            self.echogenic_foci.confidence,
        ]
    }
}

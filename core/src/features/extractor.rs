use super::preprocess::crop_and_normalize;
use super::{Classifier, RawClassification, RawFeatureOutput};
use crate::error::{Result, TiradsError};
use crate::transform::{clamp_crop, CropRect};
use crate::types::{BoundingBox, FeatureAxis, FeatureClass, FeaturePrediction, FeatureSet};
use image::RgbImage;
use log::debug;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Feature extraction output
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureExtraction {
    /// Pixel region actually handed to the classifier
    pub crop: CropRect,
    pub features: FeatureSet,
}

/// Crops the ROI, runs the classifier and types its output
#[derive(Clone)]
pub struct FeatureExtractor {
    classifier: Arc<dyn Classifier>,
}

impl FeatureExtractor {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }

    /// Returns the wrapped classifier's name
    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }

    /// Extracts the five TI-RADS features from the ROI
    ///
    /// # Arguments
    ///
    /// * `image` - Raw RGB image
    /// * `roi` - ROI in `raw_image` space (any format)
    ///
    /// # Errors
    ///
    /// - `InvalidCoordinateSpace` if `roi` is not in raw image space
    /// - `EmptyRoi` if the clamped crop has zero area
    /// - `IncompleteFeatureSet` if the classifier omitted an axis
    /// - `UnknownFeatureClass` / `InvalidPrediction` for output outside the rule table
    pub fn extract(&self, image: &RgbImage, roi: &BoundingBox) -> Result<FeatureExtraction> {
        let crop = clamp_crop(roi)?;
        let contract = self.classifier.input_contract();
        debug!(
            "Cropping {} and resizing to {}x{} for {}",
            crop,
            contract.width,
            contract.height,
            self.classifier.name()
        );

        let input = crop_and_normalize(image, &crop, &contract);
        let raw = self.classifier.classify(&input)?;
        let features = into_feature_set(&raw)?;

        Ok(FeatureExtraction { crop, features })
    }
}

/// Converts loosely typed classifier output into a [`FeatureSet`]
///
/// Axis keys and class labels are normalised before matching; keys that
/// are not feature axes are ignored.
///
/// # Errors
///
/// - `IncompleteFeatureSet` listing every missing axis
/// - `InvalidPrediction` if two keys name the same axis, or a confidence is out of range
/// - `UnknownFeatureClass` if a predicted or distribution label is not on its axis
pub fn into_feature_set(raw: &RawClassification) -> Result<FeatureSet> {
    let mut by_axis: BTreeMap<FeatureAxis, &RawFeatureOutput> = BTreeMap::new();
    for (key, output) in raw {
        match FeatureAxis::from_str(key) {
            Some(axis) => {
                if by_axis.insert(axis, output).is_some() {
                    return Err(TiradsError::InvalidPrediction(format!(
                        "axis '{}' reported more than once",
                        axis
                    )));
                }
            }
            None => debug!("Ignoring classifier output '{}'", key),
        }
    }

    let missing: Vec<String> = FeatureAxis::ALL
        .iter()
        .filter(|axis| !by_axis.contains_key(axis))
        .map(|axis| axis.key().to_string())
        .collect();
    if !missing.is_empty() {
        return Err(TiradsError::IncompleteFeatureSet(missing));
    }

    let features = FeatureSet {
        composition: typed(by_axis[&FeatureAxis::Composition])?,
        echogenicity: typed(by_axis[&FeatureAxis::Echogenicity])?,
        shape: typed(by_axis[&FeatureAxis::Shape])?,
        margin: typed(by_axis[&FeatureAxis::Margin])?,
        echogenic_foci: typed(by_axis[&FeatureAxis::EchogenicFoci])?,
    };
    features.validate()?;
    Ok(features)
}

fn typed<C: FeatureClass>(output: &RawFeatureOutput) -> Result<FeaturePrediction<C>> {
    let parse = |label: &str| {
        C::parse(label).ok_or_else(|| TiradsError::UnknownFeatureClass {
            feature: C::AXIS.key().to_string(),
            class: label.to_string(),
        })
    };

    let predicted_class = parse(&output.class)?;
    let mut distribution = BTreeMap::new();
    for (label, p) in &output.distribution {
        distribution.insert(parse(label)?, *p);
    }

    Ok(FeaturePrediction::new(
        predicted_class,
        output.confidence,
        distribution,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{InputContract, NormalizedCrop, Normalization};
    use crate::types::{
        Composition, CoordinateSpace, EchogenicFoci, Echogenicity, Margin, Shape,
    };
    use parking_lot::Mutex;

    fn output(class: &str, confidence: f64) -> RawFeatureOutput {
        RawFeatureOutput {
            class: class.to_string(),
            confidence,
            distribution: BTreeMap::new(),
        }
    }

    fn full_output() -> RawClassification {
        let mut raw = RawClassification::new();
        raw.insert("composition".into(), output("Solid", 0.9));
        raw.insert("echogenicity".into(), output("Hypoechoic", 0.8));
        raw.insert("shape".into(), output("Taller-than-wide", 0.7));
        raw.insert("margin".into(), output("Smooth", 0.6));
        raw.insert("echogenic_foci".into(), output("None", 0.5));
        raw
    }

    struct FixedClassifier {
        output: RawClassification,
        seen: Mutex<Option<(u32, u32)>>,
    }

    impl Classifier for FixedClassifier {
        fn name(&self) -> &str {
            "fixed"
        }

        fn input_contract(&self) -> InputContract {
            InputContract {
                width: 32,
                height: 32,
                normalization: Normalization::Symmetric,
            }
        }

        fn classify(&self, crop: &NormalizedCrop) -> Result<RawClassification> {
            *self.seen.lock() = Some((crop.width, crop.height));
            Ok(self.output.clone())
        }
    }

    fn extractor(output: RawClassification) -> (FeatureExtractor, Arc<FixedClassifier>) {
        let classifier = Arc::new(FixedClassifier {
            output,
            seen: Mutex::new(None),
        });
        (FeatureExtractor::new(classifier.clone()), classifier)
    }

    #[test]
    fn test_into_feature_set() {
        let features = into_feature_set(&full_output()).unwrap();
        assert_eq!(features.composition.predicted_class, Composition::Solid);
        assert_eq!(features.echogenicity.predicted_class, Echogenicity::Hypoechoic);
        assert_eq!(features.shape.predicted_class, Shape::TallerThanWide);
        assert_eq!(features.margin.predicted_class, Margin::Smooth);
        assert_eq!(features.echogenic_foci.predicted_class, EchogenicFoci::None);
        assert_eq!(features.shape.confidence, 0.7);
    }

    #[test]
    fn test_missing_axes_reported() {
        let mut raw = full_output();
        raw.remove("shape");
        raw.remove("echogenic_foci");

        match into_feature_set(&raw) {
            Err(TiradsError::IncompleteFeatureSet(missing)) => {
                assert_eq!(missing, vec!["shape".to_string(), "echogenic_foci".to_string()]);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_legacy_axis_aliases() {
        let mut raw = full_output();
        let margin = raw.remove("margin").unwrap();
        let foci = raw.remove("echogenic_foci").unwrap();
        raw.insert("margins".into(), margin);
        raw.insert("calcifications".into(), foci);

        assert!(into_feature_set(&raw).is_ok());
    }

    #[test]
    fn test_duplicate_axis_rejected() {
        let mut raw = full_output();
        raw.insert("margins".into(), output("irregular", 0.9));
        assert!(matches!(
            into_feature_set(&raw),
            Err(TiradsError::InvalidPrediction(_))
        ));
    }

    #[test]
    fn test_extra_heads_ignored() {
        let mut raw = full_output();
        raw.insert("tirads".into(), output("TIRADS_4", 0.4));
        assert!(into_feature_set(&raw).is_ok());
    }

    #[test]
    fn test_unknown_class() {
        let mut raw = full_output();
        raw.insert("composition".into(), output("granular", 0.9));
        match into_feature_set(&raw) {
            Err(TiradsError::UnknownFeatureClass { feature, class }) => {
                assert_eq!(feature, "composition");
                assert_eq!(class, "granular");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_distribution_labels_are_typed() {
        let mut raw = full_output();
        let shape = RawFeatureOutput::from_probabilities(&[
            ("wider_than_tall", 0.25),
            ("taller_than_wide", 0.75),
        ])
        .unwrap();
        raw.insert("shape".into(), shape);

        let features = into_feature_set(&raw).unwrap();
        assert_eq!(features.shape.distribution[&Shape::TallerThanWide], 0.75);
        assert_eq!(features.shape.distribution[&Shape::WiderThanTall], 0.25);
    }

    #[test]
    fn test_out_of_range_confidence() {
        let mut raw = full_output();
        raw.insert("margin".into(), output("smooth", 1.5));
        assert!(matches!(
            into_feature_set(&raw),
            Err(TiradsError::InvalidPrediction(_))
        ));
    }

    #[test]
    fn test_extract_crops_to_contract() {
        let (extractor, classifier) = extractor(full_output());
        let image = RgbImage::new(100, 100);
        let roi = BoundingBox::xyxy(-50.0, -50.0, 30.0, 30.0, CoordinateSpace::RawImage, 100, 100);

        let extraction = extractor.extract(&image, &roi).unwrap();

        assert_eq!(extraction.crop, CropRect { x1: 0, y1: 0, x2: 30, y2: 30 });
        assert_eq!(*classifier.seen.lock(), Some((32, 32)));
        assert_eq!(extraction.features.margin.predicted_class, Margin::Smooth);
    }

    #[test]
    fn test_extract_rejects_local_box() {
        let (extractor, classifier) = extractor(full_output());
        let image = RgbImage::new(100, 100);
        let roi = BoundingBox::xyxy(0.0, 0.0, 30.0, 30.0, CoordinateSpace::LocalCrop, 100, 100);

        assert!(matches!(
            extractor.extract(&image, &roi),
            Err(TiradsError::InvalidCoordinateSpace { .. })
        ));
        assert!(classifier.seen.lock().is_none());
    }

    #[test]
    fn test_extract_empty_roi() {
        let (extractor, _) = extractor(full_output());
        let image = RgbImage::new(100, 100);
        let roi = BoundingBox::xyxy(40.0, 40.0, 40.0, 80.0, CoordinateSpace::RawImage, 100, 100);

        assert!(matches!(
            extractor.extract(&image, &roi),
            Err(TiradsError::EmptyRoi { .. })
        ));
    }
}

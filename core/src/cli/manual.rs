use crate::detection::{Candidate, Detector};
use crate::error::{Result, TiradsError};
use crate::features::{
    Classifier, InputContract, NormalizedCrop, RawClassification, RawFeatureOutput,
};
use crate::types::FeatureAxis;
use image::RgbImage;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Detector that returns operator-supplied boxes
///
/// Coordinates are in the frame handed to the detector, which is the raw
/// image unless a focal window is configured.
#[derive(Debug, Clone, Default)]
pub struct ManualDetector {
    candidates: Vec<Candidate>,
}

impl ManualDetector {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    /// Parses `x1,y1,x2,y2[:score]` specs; the score defaults to 1.0
    pub fn parse<S: AsRef<str>>(specs: &[S]) -> Result<Self> {
        let candidates = specs
            .iter()
            .map(|s| parse_roi(s.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(candidates))
    }
}

impl Detector for ManualDetector {
    fn name(&self) -> &str {
        "manual-roi"
    }

    fn detect(&self, _pixels: &RgbImage) -> Result<Vec<Candidate>> {
        Ok(self.candidates.clone())
    }
}

/// Classifier that returns operator-supplied feature labels
///
/// Labels are passed through unchecked so that unknown classes and missing
/// axes surface from feature extraction exactly as model output would.
#[derive(Debug, Clone, Default)]
pub struct ManualClassifier {
    outputs: RawClassification,
}

impl ManualClassifier {
    /// Parses `axis=class[:confidence]` specs; the confidence defaults to 1.0
    pub fn parse<S: AsRef<str>>(specs: &[S]) -> Result<Self> {
        let mut outputs = BTreeMap::new();
        for spec in specs {
            let (axis, class, confidence) = parse_feature(spec.as_ref())?;
            outputs.insert(
                axis.key().to_string(),
                RawFeatureOutput {
                    class,
                    confidence,
                    distribution: BTreeMap::new(),
                },
            );
        }
        Ok(Self { outputs })
    }
}

impl Classifier for ManualClassifier {
    fn name(&self) -> &str {
        "manual-features"
    }

    fn input_contract(&self) -> InputContract {
        InputContract::xception()
    }

    fn classify(&self, _crop: &NormalizedCrop) -> Result<RawClassification> {
        Ok(self.outputs.clone())
    }
}

/// Parses `x1,y1,x2,y2[:score]`
pub fn parse_roi(s: &str) -> Result<Candidate> {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    let re = REGEX.get_or_init(|| {
        let num = r"\s*(-?\d+(?:\.\d+)?)\s*";
        Regex::new(&format!(r"^{num},{num},{num},{num}(?::{num})?$"))
            .expect("Failed to compile regex")
    });

    let caps = re
        .captures(s)
        .ok_or_else(|| TiradsError::InvalidBox(format!("cannot parse ROI '{}'", s)))?;
    let num = |i: usize| -> Result<f64> {
        caps[i]
            .parse()
            .map_err(|_| TiradsError::InvalidBox(format!("bad number in ROI '{}'", s)))
    };

    let score = match caps.get(5) {
        Some(m) => m
            .as_str()
            .parse()
            .map_err(|_| TiradsError::InvalidBox(format!("bad score in ROI '{}'", s)))?,
        None => 1.0,
    };
    Ok(Candidate::new(num(1)?, num(2)?, num(3)?, num(4)?, score))
}

/// Parses `axis=class[:confidence]`
pub fn parse_feature(s: &str) -> Result<(FeatureAxis, String, f64)> {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    let re = REGEX.get_or_init(|| {
        Regex::new(r"^\s*([A-Za-z_\- ]+?)\s*=\s*([A-Za-z_\- ]+?)\s*(?::\s*(\d+(?:\.\d+)?))?\s*$")
            .expect("Failed to compile regex")
    });

    let invalid = || TiradsError::InvalidConfig(format!("cannot parse feature '{}'", s));
    let caps = re.captures(s).ok_or_else(invalid)?;

    let axis = FeatureAxis::from_str(&caps[1]).ok_or_else(|| {
        TiradsError::InvalidConfig(format!("unknown feature axis '{}'", &caps[1]))
    })?;
    let confidence = match caps.get(3) {
        Some(m) => m.as_str().parse().map_err(|_| invalid())?,
        None => 1.0,
    };
    Ok((axis, caps[2].to_string(), confidence))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("10,20,30,40", (10.0, 20.0, 30.0, 40.0, 1.0))]
    #[case("10.5, 20, 30.25, 40:0.8", (10.5, 20.0, 30.25, 40.0, 0.8))]
    #[case("-50,-50,30,30:0.3", (-50.0, -50.0, 30.0, 30.0, 0.3))]
    fn test_parse_roi(#[case] spec: &str, #[case] expected: (f64, f64, f64, f64, f64)) {
        let c = parse_roi(spec).unwrap();
        assert_eq!((c.xmin, c.ymin, c.xmax, c.ymax, c.score), expected);
    }

    #[rstest]
    #[case("10,20,30")]
    #[case("a,b,c,d")]
    #[case("1,2,3,4:")]
    fn test_parse_roi_rejects(#[case] spec: &str) {
        assert!(matches!(parse_roi(spec), Err(TiradsError::InvalidBox(_))));
    }

    #[test]
    fn test_parse_feature() {
        let (axis, class, confidence) = parse_feature("margins = Irregular:0.75").unwrap();
        assert_eq!(axis, FeatureAxis::Margin);
        assert_eq!(class, "Irregular");
        assert_eq!(confidence, 0.75);

        let (axis, class, confidence) = parse_feature("echogenic-foci=none").unwrap();
        assert_eq!(axis, FeatureAxis::EchogenicFoci);
        assert_eq!(class, "none");
        assert_eq!(confidence, 1.0);
    }

    #[test]
    fn test_parse_feature_unknown_axis() {
        assert!(matches!(
            parse_feature("size=large"),
            Err(TiradsError::InvalidConfig(_))
        ));
        assert!(parse_feature("composition").is_err());
    }

    #[test]
    fn test_manual_classifier_keys_by_canonical_axis() {
        let classifier = ManualClassifier::parse(&["calcifications=macrocalcifications:0.6"]).unwrap();
        let crop = NormalizedCrop {
            width: 0,
            height: 0,
            data: vec![],
        };
        let out = classifier.classify(&crop).unwrap();

        assert_eq!(out["echogenic_foci"].class, "macrocalcifications");
        assert_eq!(out["echogenic_foci"].confidence, 0.6);
    }

    #[test]
    fn test_manual_detector_returns_boxes() {
        let detector = ManualDetector::parse(&["1,2,3,4:0.9", "5,6,7,8"]).unwrap();
        let found = detector.detect(&RgbImage::new(1, 1)).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].score, 1.0);
    }
}

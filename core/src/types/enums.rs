use super::macros::feature_class;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Clinical feature axis scored by ACR TI-RADS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "snake_case"))]
pub enum FeatureAxis {
    Composition,
    Echogenicity,
    Shape,
    Margin,
    EchogenicFoci,
}

impl FeatureAxis {
    /// All axes, in report order
    pub const ALL: [FeatureAxis; 5] = [
        FeatureAxis::Composition,
        FeatureAxis::Echogenicity,
        FeatureAxis::Shape,
        FeatureAxis::Margin,
        FeatureAxis::EchogenicFoci,
    ];

    /// Returns the canonical key used by classifiers and serialized output
    pub fn key(&self) -> &'static str {
        match self {
            FeatureAxis::Composition => "composition",
            FeatureAxis::Echogenicity => "echogenicity",
            FeatureAxis::Shape => "shape",
            FeatureAxis::Margin => "margin",
            FeatureAxis::EchogenicFoci => "echogenic_foci",
        }
    }

    /// Returns human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            FeatureAxis::Composition => "composition",
            FeatureAxis::Echogenicity => "echogenicity",
            FeatureAxis::Shape => "shape",
            FeatureAxis::Margin => "margin",
            FeatureAxis::EchogenicFoci => "echogenic foci",
        }
    }

    /// Parses an axis key
    ///
    /// Matching is case-insensitive and punctuation-insensitive. The legacy
    /// keys `margins` and `calcifications` are accepted as aliases.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match normalize_label(s).as_str() {
            "composition" => Some(FeatureAxis::Composition),
            "echogenicity" => Some(FeatureAxis::Echogenicity),
            "shape" => Some(FeatureAxis::Shape),
            "margin" | "margins" => Some(FeatureAxis::Margin),
            "echogenic_foci" | "calcifications" => Some(FeatureAxis::EchogenicFoci),
            _ => None,
        }
    }
}

impl fmt::Display for FeatureAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Folds a free-form label into canonical snake_case
///
/// "Taller-than-wide" → "taller_than_wide", " Very Hypoechoic " → "very_hypoechoic"
pub fn normalize_label(s: &str) -> String {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    let re = REGEX.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("Failed to compile regex"));

    let lowered = s.trim().to_lowercase();
    re.replace_all(&lowered, "_").trim_matches('_').to_string()
}

/// A categorical class on one feature axis
pub trait FeatureClass: Copy + Ord + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Axis this class belongs to
    const AXIS: FeatureAxis;

    /// Every class on the axis
    const ALL: &'static [Self];

    /// Canonical snake_case label
    fn label(&self) -> &'static str;

    /// Clinical description
    fn description(&self) -> &'static str;

    /// Parses a label after normalization, `None` if it is not on this axis
    fn parse(s: &str) -> Option<Self> {
        let normalized = normalize_label(s);
        Self::ALL
            .iter()
            .copied()
            .find(|class| class.label() == normalized)
    }
}

feature_class!(
    /// Nodule composition
    Composition, FeatureAxis::Composition, {
        Cystic => ("cystic", "Cystic or almost completely cystic"),
        Spongiform => ("spongiform", "Spongiform"),
        MixedCysticSolid => ("mixed_cystic_solid", "Mixed cystic and solid"),
        PartiallyCystic => ("partially_cystic", "Partially cystic with solid components"),
        Solid => ("solid", "Solid or almost completely solid"),
    }
);

feature_class!(
    /// Echogenicity relative to thyroid parenchyma
    Echogenicity, FeatureAxis::Echogenicity, {
        Anechoic => ("anechoic", "Anechoic"),
        Hyperechoic => ("hyperechoic", "Hyperechoic relative to thyroid"),
        Isoechoic => ("isoechoic", "Isoechoic relative to thyroid"),
        Hypoechoic => ("hypoechoic", "Hypoechoic relative to thyroid"),
        VeryHypoechoic => ("very_hypoechoic", "Very hypoechoic, darker than strap muscles"),
    }
);

feature_class!(
    /// Shape on transverse view
    Shape, FeatureAxis::Shape, {
        WiderThanTall => ("wider_than_tall", "Wider than tall"),
        TallerThanWide => ("taller_than_wide", "Taller than wide"),
    }
);

feature_class!(
    /// Margin definition
    Margin, FeatureAxis::Margin, {
        Smooth => ("smooth", "Smooth margins"),
        IllDefined => ("ill_defined", "Ill-defined margins"),
        Lobulated => ("lobulated", "Lobulated margins"),
        Irregular => ("irregular", "Irregular margins"),
        ExtrathyroidalExtension => ("extrathyroidal_extension", "Extra-thyroidal extension"),
    }
);

feature_class!(
    /// Echogenic foci
    EchogenicFoci, FeatureAxis::EchogenicFoci, {
        None => ("none", "None or large comet-tail artifacts"),
        Macrocalcifications => ("macrocalcifications", "Macrocalcifications"),
        Peripheral => ("peripheral", "Peripheral (rim) calcifications"),
        PunctateEchogenicFoci => ("punctate_echogenic_foci", "Punctate echogenic foci"),
        Microcalcifications => ("microcalcifications", "Microcalcifications"),
    }
);

/// ACR TI-RADS risk category (TR1..TR5)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
#[cfg_attr(feature = "json", serde(into = "u8"))]
pub enum TiradsCategory {
    Tr1,
    Tr2,
    Tr3,
    Tr4,
    Tr5,
}

impl TiradsCategory {
    /// Returns the category number 1..=5
    pub fn number(&self) -> u8 {
        match self {
            TiradsCategory::Tr1 => 1,
            TiradsCategory::Tr2 => 2,
            TiradsCategory::Tr3 => 3,
            TiradsCategory::Tr4 => 4,
            TiradsCategory::Tr5 => 5,
        }
    }

    /// Returns the ACR risk label
    pub fn risk_label(&self) -> &'static str {
        match self {
            TiradsCategory::Tr1 => "benign",
            TiradsCategory::Tr2 => "not suspicious",
            TiradsCategory::Tr3 => "mildly suspicious",
            TiradsCategory::Tr4 => "moderately suspicious",
            TiradsCategory::Tr5 => "highly suspicious",
        }
    }
}

impl From<TiradsCategory> for u8 {
    fn from(category: TiradsCategory) -> Self {
        category.number()
    }
}

impl fmt::Display for TiradsCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TR{}", self.number())
    }
}

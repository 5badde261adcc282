use crate::types::{Composition, EchogenicFoci, Echogenicity, FeatureClass, Margin, Shape};

/// ACR TI-RADS 2017 point value of a feature class
///
/// Every class on every axis has an explicit entry; adding a class to an axis
/// without a point value does not compile.
pub trait TiradsPoints: FeatureClass {
    /// Points contributed by this class (0..=3)
    fn points(&self) -> u8;
}

impl TiradsPoints for Composition {
    fn points(&self) -> u8 {
        match self {
            Composition::Cystic | Composition::Spongiform => 0,
            Composition::MixedCysticSolid | Composition::PartiallyCystic => 1,
            Composition::Solid => 2,
        }
    }
}

impl TiradsPoints for Echogenicity {
    fn points(&self) -> u8 {
        match self {
            Echogenicity::Anechoic => 0,
            Echogenicity::Hyperechoic | Echogenicity::Isoechoic => 1,
            Echogenicity::Hypoechoic => 2,
            Echogenicity::VeryHypoechoic => 3,
        }
    }
}

impl TiradsPoints for Shape {
    fn points(&self) -> u8 {
        match self {
            Shape::WiderThanTall => 0,
            Shape::TallerThanWide => 3,
        }
    }
}

impl TiradsPoints for Margin {
    fn points(&self) -> u8 {
        match self {
            Margin::Smooth | Margin::IllDefined => 0,
            Margin::Lobulated | Margin::Irregular => 2,
            Margin::ExtrathyroidalExtension => 3,
        }
    }
}

impl TiradsPoints for EchogenicFoci {
    fn points(&self) -> u8 {
        match self {
            EchogenicFoci::None => 0,
            EchogenicFoci::Macrocalcifications => 1,
            EchogenicFoci::Peripheral => 2,
            EchogenicFoci::PunctateEchogenicFoci | EchogenicFoci::Microcalcifications => 3,
        }
    }
}

/// Highest point value any class on the axis can contribute
pub fn max_points<C: TiradsPoints>() -> u8 {
    C::ALL.iter().map(|c| c.points()).max().unwrap_or(0)
}

/// Highest total the five axes can reach
pub fn max_total_points() -> u8 {
    max_points::<Composition>()
        + max_points::<Echogenicity>()
        + max_points::<Shape>()
        + max_points::<Margin>()
        + max_points::<EchogenicFoci>()
}

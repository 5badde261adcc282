use crate::error::{Result, TiradsError};
use crate::types::{BoundingBox, CoordinateSpace};
use std::fmt;

/// Integer pixel rectangle inside the raw image, half-open `[x1, x2) × [y1, y2)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct CropRect {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl CropRect {
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }
}

impl fmt::Display for CropRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}, {}]", self.x1, self.y1, self.x2, self.y2)
    }
}

/// Clamps a raw-space box to integer pixel bounds for cropping
///
/// Coordinates are truncated toward zero, then clamped per axis:
/// `x1 = max(0, min(x1, w - 1))`, `x2 = max(1, min(x2, w))` (same for y).
///
/// # Errors
///
/// - `InvalidCoordinateSpace` if the box is not in `raw_image` space
/// - `InvalidBox` if the box has non-finite or inverted coordinates
/// - `EmptyRoi` if the clamped region has zero area
///
/// # Example
///
/// ```
/// use tirads_core::transform::clamp_crop;
/// use tirads_core::{BoundingBox, CoordinateSpace};
///
/// let roi = BoundingBox::xyxy(-50.0, -50.0, 30.0, 30.0, CoordinateSpace::RawImage, 100, 100);
/// let rect = clamp_crop(&roi).unwrap();
/// assert_eq!((rect.x1, rect.y1, rect.x2, rect.y2), (0, 0, 30, 30));
/// ```
pub fn clamp_crop(bbox: &BoundingBox) -> Result<CropRect> {
    bbox.require_space(CoordinateSpace::RawImage)?;
    bbox.validate()?;

    let (xmin, ymin, xmax, ymax) = bbox.corners();
    let (x1, x2) = clamp_axis(xmin, xmax, bbox.image_width);
    let (y1, y2) = clamp_axis(ymin, ymax, bbox.image_height);

    if bbox.image_width == 0 || bbox.image_height == 0 || x2 <= x1 || y2 <= y1 {
        return Err(TiradsError::EmptyRoi { x1, y1, x2, y2 });
    }

    Ok(CropRect {
        x1: x1 as u32,
        y1: y1 as u32,
        x2: x2 as u32,
        y2: y2 as u32,
    })
}

fn clamp_axis(lo: f64, hi: f64, size: u32) -> (i64, i64) {
    let size = size as i64;
    let lo = (lo.trunc() as i64).min(size - 1).max(0);
    let hi = (hi.trunc() as i64).min(size).max(1);
    (lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn raw(xmin: f64, ymin: f64, xmax: f64, ymax: f64, w: u32, h: u32) -> BoundingBox {
        BoundingBox::xyxy(xmin, ymin, xmax, ymax, CoordinateSpace::RawImage, w, h)
    }

    #[test]
    fn test_clamp_negative_origin() {
        let rect = clamp_crop(&raw(-50.0, -50.0, 30.0, 30.0, 100, 100)).unwrap();
        assert_eq!(rect, CropRect { x1: 0, y1: 0, x2: 30, y2: 30 });
        assert_eq!(rect.width(), 30);
        assert_eq!(rect.height(), 30);
    }

    #[rstest]
    #[case(raw(10.0, 20.0, 60.0, 70.0, 100, 100), (10, 20, 60, 70))]
    #[case(raw(90.0, 90.0, 150.0, 150.0, 100, 100), (90, 90, 100, 100))]
    #[case(raw(10.9, 20.2, 60.7, 70.99, 100, 100), (10, 20, 60, 70))]
    #[case(raw(0.0, 0.0, 640.0, 480.0, 640, 480), (0, 0, 640, 480))]
    #[case(raw(150.0, 10.0, 200.0, 50.0, 100, 100), (99, 10, 100, 50))]
    fn test_clamp_cases(#[case] bbox: BoundingBox, #[case] expected: (u32, u32, u32, u32)) {
        let rect = clamp_crop(&bbox).unwrap();
        assert_eq!((rect.x1, rect.y1, rect.x2, rect.y2), expected);
    }

    #[test]
    fn test_clamp_xywh_input() {
        let bbox = BoundingBox::xywh(-10.0, 5.0, 40.0, 20.0, CoordinateSpace::RawImage, 100, 100);
        let rect = clamp_crop(&bbox).unwrap();
        assert_eq!(rect, CropRect { x1: 0, y1: 5, x2: 30, y2: 25 });
    }

    #[rstest]
    #[case(raw(50.0, 10.0, 50.0, 40.0, 100, 100))]
    #[case(raw(99.2, 0.0, 99.7, 10.0, 100, 100))]
    #[case(raw(0.0, 0.0, 10.0, 10.0, 0, 100))]
    fn test_clamp_empty(#[case] bbox: BoundingBox) {
        assert!(matches!(clamp_crop(&bbox), Err(TiradsError::EmptyRoi { .. })));
    }

    #[test]
    fn test_clamp_rejects_local_space() {
        let bbox = BoundingBox::xyxy(0.0, 0.0, 10.0, 10.0, CoordinateSpace::LocalCrop, 100, 100);
        assert!(matches!(
            clamp_crop(&bbox),
            Err(TiradsError::InvalidCoordinateSpace { .. })
        ));
    }

    #[test]
    fn test_clamp_rejects_inverted() {
        assert!(matches!(
            clamp_crop(&raw(60.0, 0.0, 10.0, 10.0, 100, 100)),
            Err(TiradsError::InvalidBox(_))
        ));
    }
}

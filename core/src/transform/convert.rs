use crate::error::{Result, TiradsError};
use crate::types::{BoundingBox, BoxCoords, BoxFormat, CoordinateSpace};

/// Re-encodes a box as corner-corner
///
/// Metadata (space, frame size) is carried over unchanged. A box that is
/// already xyxy is returned as is.
pub fn to_xyxy(bbox: &BoundingBox) -> BoundingBox {
    let (xmin, ymin, xmax, ymax) = bbox.corners();
    BoundingBox {
        coords: BoxCoords::Xyxy {
            xmin,
            ymin,
            xmax,
            ymax,
        },
        ..*bbox
    }
}

/// Re-encodes a box as origin+extent
///
/// Metadata (space, frame size) is carried over unchanged. A box that is
/// already xywh is returned as is.
pub fn to_xywh(bbox: &BoundingBox) -> BoundingBox {
    let (x, y, width, height) = bbox.extent();
    BoundingBox {
        coords: BoxCoords::Xywh {
            x,
            y,
            width,
            height,
        },
        ..*bbox
    }
}

/// Maps a box from a sub-image's local frame into the raw image's frame
///
/// `raw = local * scale + offset` for the origin, `raw = local * scale` for
/// the extent. The result keeps the input's format, is tagged
/// `raw_image` and carries the raw frame size. No clamping is applied.
///
/// # Arguments
///
/// * `bbox` - Box in `local_crop` space
/// * `offset_x`, `offset_y` - Position of the sub-image's origin in the raw image
/// * `scale` - Raw pixels per local pixel
/// * `raw_width`, `raw_height` - Raw image size
///
/// # Errors
///
/// Returns `InvalidCoordinateSpace` if `bbox` is not in `local_crop` space,
/// and `InvalidBox` if `scale` is not a positive finite number.
///
/// # Example
///
/// ```
/// use tirads_core::transform::remap_to_raw_image;
/// use tirads_core::{BoundingBox, CoordinateSpace};
///
/// let local = BoundingBox::xywh(10.0, 10.0, 20.0, 30.0, CoordinateSpace::LocalCrop, 256, 256);
/// let raw = remap_to_raw_image(&local, 100.0, 50.0, 2.0, 1000, 800).unwrap();
///
/// assert_eq!(raw.coordinate_space, CoordinateSpace::RawImage);
/// assert_eq!(raw.extent(), (120.0, 70.0, 40.0, 60.0));
/// ```
pub fn remap_to_raw_image(
    bbox: &BoundingBox,
    offset_x: f64,
    offset_y: f64,
    scale: f64,
    raw_width: u32,
    raw_height: u32,
) -> Result<BoundingBox> {
    bbox.require_space(CoordinateSpace::LocalCrop)?;
    if !scale.is_finite() || scale <= 0.0 {
        return Err(TiradsError::InvalidBox(format!(
            "remap scale must be positive, got {}",
            scale
        )));
    }

    let (x, y, width, height) = bbox.extent();
    let remapped = BoundingBox::xywh(
        x * scale + offset_x,
        y * scale + offset_y,
        width * scale,
        height * scale,
        CoordinateSpace::RawImage,
        raw_width,
        raw_height,
    );

    Ok(match bbox.format() {
        BoxFormat::Xyxy => to_xyxy(&remapped),
        BoxFormat::Xywh => remapped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 0.0, 0.0, 0.0)]
    #[case(10.0, 20.0, 30.0, 40.0)]
    #[case(-5.0, 7.0, 1.0, 0.0)]
    #[case(1023.0, 767.0, 1.0, 1.0)]
    fn test_xywh_round_trip(
        #[case] x: f64,
        #[case] y: f64,
        #[case] width: f64,
        #[case] height: f64,
    ) {
        let b = BoundingBox::xywh(x, y, width, height, CoordinateSpace::RawImage, 1024, 768);
        let xyxy = to_xyxy(&b);
        assert_eq!(xyxy.format(), BoxFormat::Xyxy);
        assert_eq!(to_xywh(&xyxy), b);
    }

    #[test]
    fn test_xyxy_round_trip() {
        let b = BoundingBox::xyxy(3.0, 4.0, 50.0, 90.0, CoordinateSpace::LocalCrop, 299, 299);
        assert_eq!(to_xyxy(&to_xywh(&b)), b);
    }

    #[test]
    fn test_conversion_keeps_metadata() {
        let b = BoundingBox::xyxy(3.0, 4.0, 50.0, 90.0, CoordinateSpace::LocalCrop, 299, 200);
        let c = to_xywh(&b);
        assert_eq!(c.coordinate_space, CoordinateSpace::LocalCrop);
        assert_eq!((c.image_width, c.image_height), (299, 200));
        assert_eq!(c.extent(), (3.0, 4.0, 47.0, 86.0));
    }

    #[test]
    fn test_remap_identity() {
        let local = BoundingBox::xywh(12.0, 34.0, 56.0, 78.0, CoordinateSpace::LocalCrop, 200, 200);
        let raw = remap_to_raw_image(&local, 0.0, 0.0, 1.0, 200, 200).unwrap();

        assert_eq!(raw.extent(), local.extent());
        assert_eq!(raw.coordinate_space, CoordinateSpace::RawImage);
    }

    #[test]
    fn test_remap_keeps_xyxy_format() {
        let local = BoundingBox::xyxy(10.0, 10.0, 20.0, 30.0, CoordinateSpace::LocalCrop, 512, 512);
        let raw = remap_to_raw_image(&local, 244.0, 144.0, 1.0, 1000, 800).unwrap();

        assert_eq!(raw.format(), BoxFormat::Xyxy);
        assert_eq!(raw.corners(), (254.0, 154.0, 264.0, 174.0));
        assert_eq!((raw.image_width, raw.image_height), (1000, 800));
    }

    #[test]
    fn test_remap_does_not_clamp() {
        let local = BoundingBox::xyxy(0.0, 0.0, 100.0, 100.0, CoordinateSpace::LocalCrop, 100, 100);
        let raw = remap_to_raw_image(&local, 50.0, 50.0, 1.0, 120, 120).unwrap();
        assert_eq!(raw.corners(), (50.0, 50.0, 150.0, 150.0));
        assert!(raw.corners().2 > raw.image_width as f64);
    }

    #[test]
    fn test_remap_rejects_raw_space() {
        let raw = BoundingBox::xyxy(0.0, 0.0, 10.0, 10.0, CoordinateSpace::RawImage, 100, 100);
        let err = remap_to_raw_image(&raw, 0.0, 0.0, 1.0, 100, 100).unwrap_err();
        assert!(matches!(
            err,
            TiradsError::InvalidCoordinateSpace {
                expected: CoordinateSpace::LocalCrop,
                found: CoordinateSpace::RawImage,
            }
        ));
    }

    #[rstest]
    #[case(0.0)]
    #[case(-1.0)]
    #[case(f64::INFINITY)]
    fn test_remap_rejects_bad_scale(#[case] scale: f64) {
        let local = BoundingBox::xyxy(0.0, 0.0, 10.0, 10.0, CoordinateSpace::LocalCrop, 100, 100);
        assert!(matches!(
            remap_to_raw_image(&local, 0.0, 0.0, scale, 100, 100),
            Err(TiradsError::InvalidBox(_))
        ));
    }
}

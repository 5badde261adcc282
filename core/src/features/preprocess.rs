use crate::transform::CropRect;
use image::imageops::{self, FilterType};
use image::RgbImage;

/// Pixel normalisation expected by a classifier
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Normalization {
    /// `p / 255` → `[0, 1]`
    UnitRange,
    /// `p / 127.5 - 1` → `[-1, 1]` (Xception)
    Symmetric,
    /// `(p / 255 - mean) / std` per channel
    MeanStd { mean: [f32; 3], std: [f32; 3] },
}

impl Normalization {
    fn apply(&self, channel: usize, value: u8) -> f32 {
        let v = value as f32;
        match self {
            Normalization::UnitRange => v / 255.0,
            Normalization::Symmetric => v / 127.5 - 1.0,
            Normalization::MeanStd { mean, std } => (v / 255.0 - mean[channel]) / std[channel],
        }
    }
}

/// Input size and normalisation a classifier was trained with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputContract {
    pub width: u32,
    pub height: u32,
    pub normalization: Normalization,
}

impl InputContract {
    /// 299×299, `[-1, 1]`
    pub fn xception() -> Self {
        Self {
            width: 299,
            height: 299,
            normalization: Normalization::Symmetric,
        }
    }
}

/// Normalised RGB crop in CHW layout
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedCrop {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f32>,
}

impl NormalizedCrop {
    /// Returns one channel plane (0 = R, 1 = G, 2 = B)
    pub fn channel(&self, c: usize) -> &[f32] {
        let plane = (self.width * self.height) as usize;
        &self.data[c * plane..(c + 1) * plane]
    }

    /// Returns the value at channel `c`, row `y`, column `x`
    pub fn get(&self, c: usize, y: u32, x: u32) -> f32 {
        self.channel(c)[(y * self.width + x) as usize]
    }
}

/// Crops `rect` out of `image`, resizes bilinearly and normalises
///
/// `rect` must come from [`clamp_crop`](crate::transform::clamp_crop) so it
/// is non-empty and inside the image.
pub fn crop_and_normalize(
    image: &RgbImage,
    rect: &CropRect,
    contract: &InputContract,
) -> NormalizedCrop {
    let roi = imageops::crop_imm(image, rect.x1, rect.y1, rect.width(), rect.height()).to_image();
    let roi = if roi.dimensions() == (contract.width, contract.height) {
        roi
    } else {
        imageops::resize(&roi, contract.width, contract.height, FilterType::Triangle)
    };

    let plane = (contract.width * contract.height) as usize;
    let mut data = vec![0.0f32; plane * 3];
    for (x, y, pixel) in roi.enumerate_pixels() {
        let idx = (y * contract.width + x) as usize;
        for c in 0..3 {
            data[c * plane + idx] = contract.normalization.apply(c, pixel[c]);
        }
    }

    NormalizedCrop {
        width: contract.width,
        height: contract.height,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn rect(x1: u32, y1: u32, x2: u32, y2: u32) -> CropRect {
        CropRect { x1, y1, x2, y2 }
    }

    #[test]
    fn test_symmetric_range() {
        let mut image = RgbImage::from_pixel(40, 40, Rgb([255, 0, 255]));
        image.put_pixel(0, 0, Rgb([0, 0, 0]));

        let contract = InputContract {
            width: 10,
            height: 10,
            normalization: Normalization::Symmetric,
        };
        let crop = crop_and_normalize(&image, &rect(20, 20, 30, 30), &contract);

        assert_eq!(crop.data.len(), 300);
        assert!(crop.channel(0).iter().all(|&v| (v - 1.0).abs() < 1e-6));
        assert!(crop.channel(1).iter().all(|&v| (v + 1.0).abs() < 1e-6));
        assert!(crop.channel(2).iter().all(|&v| (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_unit_range_and_chw_layout() {
        let image = RgbImage::from_pixel(8, 8, Rgb([255, 0, 51]));
        let contract = InputContract {
            width: 8,
            height: 8,
            normalization: Normalization::UnitRange,
        };
        let crop = crop_and_normalize(&image, &rect(0, 0, 8, 8), &contract);

        assert_eq!(crop.get(0, 3, 4), 1.0);
        assert_eq!(crop.get(1, 3, 4), 0.0);
        assert!((crop.get(2, 7, 7) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_resize_to_contract() {
        let image = RgbImage::from_pixel(100, 60, Rgb([128, 128, 128]));
        let crop = crop_and_normalize(&image, &rect(10, 10, 50, 30), &InputContract::xception());

        assert_eq!((crop.width, crop.height), (299, 299));
        assert_eq!(crop.data.len(), 299 * 299 * 3);
    }

    #[test]
    fn test_crop_reads_the_right_region() {
        let mut image = RgbImage::from_pixel(20, 20, Rgb([0, 0, 0]));
        for y in 5..10 {
            for x in 5..10 {
                image.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        let contract = InputContract {
            width: 5,
            height: 5,
            normalization: Normalization::UnitRange,
        };
        let crop = crop_and_normalize(&image, &rect(5, 5, 10, 10), &contract);
        assert!(crop.data.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_mean_std_normalization() {
        let n = Normalization::MeanStd {
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
        };
        let v = n.apply(0, 255);
        assert!((v - (1.0 - 0.485) / 0.229).abs() < 1e-5);
    }
}

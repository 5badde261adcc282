use super::convert::remap_to_raw_image;
use crate::error::Result;
use crate::types::{BoundingBox, CoordinateSpace};

/// Geometry of a sub-image handed to a model, relative to the raw image
///
/// A local pixel `(u, v)` corresponds to raw pixel
/// `(offset_x + u * scale, offset_y + v * scale)`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct LocalFrame {
    pub offset_x: u32,
    pub offset_y: u32,
    /// Raw pixels per local pixel
    pub scale: f64,
    /// Width of the region taken from the raw image
    pub source_width: u32,
    /// Height of the region taken from the raw image
    pub source_height: u32,
    /// Width of the sub-image after resizing
    pub width: u32,
    /// Height of the sub-image after resizing
    pub height: u32,
    pub raw_width: u32,
    pub raw_height: u32,
}

impl LocalFrame {
    /// Frame covering the whole raw image at native resolution
    pub fn identity(raw_width: u32, raw_height: u32) -> Self {
        Self {
            offset_x: 0,
            offset_y: 0,
            scale: 1.0,
            source_width: raw_width,
            source_height: raw_height,
            width: raw_width,
            height: raw_height,
            raw_width,
            raw_height,
        }
    }

    /// Builds a centred focal window, optionally downsized for the model
    ///
    /// # Arguments
    ///
    /// * `window` - Side of the centred square window; clipped to the image
    /// * `input_size` - Longer side of the resized window
    ///
    /// With both `None` this is [`LocalFrame::identity`].
    pub fn focal(
        raw_width: u32,
        raw_height: u32,
        window: Option<u32>,
        input_size: Option<u32>,
    ) -> Self {
        let source_width = window.map_or(raw_width, |w| w.min(raw_width));
        let source_height = window.map_or(raw_height, |w| w.min(raw_height));
        let offset_x = (raw_width - source_width) / 2;
        let offset_y = (raw_height - source_height) / 2;

        let longer = source_width.max(source_height);
        let scale = match input_size {
            Some(size) if size > 0 && longer > 0 => longer as f64 / size as f64,
            _ => 1.0,
        };
        let width = ((source_width as f64 / scale).round() as u32).max(1);
        let height = ((source_height as f64 / scale).round() as u32).max(1);

        Self {
            offset_x,
            offset_y,
            scale,
            source_width,
            source_height,
            width,
            height,
            raw_width,
            raw_height,
        }
    }

    /// Whether the frame maps one-to-one onto the raw image
    pub fn is_identity(&self) -> bool {
        self.offset_x == 0
            && self.offset_y == 0
            && self.scale == 1.0
            && self.width == self.raw_width
            && self.height == self.raw_height
    }

    /// Whether the model input must be resampled from the source region
    pub fn needs_resize(&self) -> bool {
        self.width != self.source_width || self.height != self.source_height
    }

    /// Tags detector output as an xyxy box in this frame
    pub fn local_box(&self, xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> BoundingBox {
        BoundingBox::xyxy(
            xmin,
            ymin,
            xmax,
            ymax,
            CoordinateSpace::LocalCrop,
            self.width,
            self.height,
        )
    }

    /// Maps a box in this frame into raw image space
    pub fn to_raw(&self, bbox: &BoundingBox) -> Result<BoundingBox> {
        remap_to_raw_image(
            bbox,
            self.offset_x as f64,
            self.offset_y as f64,
            self.scale,
            self.raw_width,
            self.raw_height,
        )
    }
}

use crate::error::{Result, TiradsError};
use std::fmt;

/// Bounding box encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "lowercase"))]
pub enum BoxFormat {
    /// Corner-corner (Pascal VOC)
    Xyxy,
    /// Origin plus extent
    Xywh,
}

impl BoxFormat {
    /// Returns simple name for display
    pub fn simple_name(&self) -> &'static str {
        match self {
            BoxFormat::Xyxy => "xyxy",
            BoxFormat::Xywh => "xywh",
        }
    }
}

impl fmt::Display for BoxFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}

/// Frame of reference a box's coordinates are expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "snake_case"))]
pub enum CoordinateSpace {
    /// Pixel frame of the decoded, unmodified image
    RawImage,
    /// Pixel frame of a sub-image handed to a model (cropped and/or scaled)
    LocalCrop,
}

impl CoordinateSpace {
    /// Returns simple name for display
    pub fn simple_name(&self) -> &'static str {
        match self {
            CoordinateSpace::RawImage => "raw_image",
            CoordinateSpace::LocalCrop => "local_crop",
        }
    }
}

impl fmt::Display for CoordinateSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}

/// Box coordinates; the variant is the format tag
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(tag = "format", rename_all = "lowercase"))]
pub enum BoxCoords {
    Xyxy {
        xmin: f64,
        ymin: f64,
        xmax: f64,
        ymax: f64,
    },
    Xywh {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
}

/// Axis-aligned bounding box tagged with its format and coordinate space
///
/// `image_width`/`image_height` describe the frame named by
/// `coordinate_space`: the raw image for [`CoordinateSpace::RawImage`],
/// the model's sub-image for [`CoordinateSpace::LocalCrop`].
///
/// # Example
///
/// ```
/// use tirads_core::{BoundingBox, BoxFormat, CoordinateSpace};
///
/// let roi = BoundingBox::xyxy(10.0, 20.0, 110.0, 80.0, CoordinateSpace::RawImage, 640, 480);
/// assert_eq!(roi.format(), BoxFormat::Xyxy);
/// assert_eq!(roi.width(), 100.0);
/// assert_eq!(roi.height(), 60.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    #[cfg_attr(feature = "json", serde(flatten))]
    pub coords: BoxCoords,
    pub coordinate_space: CoordinateSpace,
    pub image_width: u32,
    pub image_height: u32,
}

impl BoundingBox {
    /// Creates a corner-corner box
    pub fn xyxy(
        xmin: f64,
        ymin: f64,
        xmax: f64,
        ymax: f64,
        coordinate_space: CoordinateSpace,
        image_width: u32,
        image_height: u32,
    ) -> Self {
        Self {
            coords: BoxCoords::Xyxy {
                xmin,
                ymin,
                xmax,
                ymax,
            },
            coordinate_space,
            image_width,
            image_height,
        }
    }

    /// Creates an origin+extent box
    pub fn xywh(
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        coordinate_space: CoordinateSpace,
        image_width: u32,
        image_height: u32,
    ) -> Self {
        Self {
            coords: BoxCoords::Xywh {
                x,
                y,
                width,
                height,
            },
            coordinate_space,
            image_width,
            image_height,
        }
    }

    /// Creates an xyxy box covering the whole frame
    pub fn whole_image(
        image_width: u32,
        image_height: u32,
        coordinate_space: CoordinateSpace,
    ) -> Self {
        Self::xyxy(
            0.0,
            0.0,
            image_width as f64,
            image_height as f64,
            coordinate_space,
            image_width,
            image_height,
        )
    }

    /// Returns the encoding of the stored coordinates
    pub fn format(&self) -> BoxFormat {
        match self.coords {
            BoxCoords::Xyxy { .. } => BoxFormat::Xyxy,
            BoxCoords::Xywh { .. } => BoxFormat::Xywh,
        }
    }

    /// Returns `(xmin, ymin, xmax, ymax)` regardless of format
    pub fn corners(&self) -> (f64, f64, f64, f64) {
        match self.coords {
            BoxCoords::Xyxy {
                xmin,
                ymin,
                xmax,
                ymax,
            } => (xmin, ymin, xmax, ymax),
            BoxCoords::Xywh {
                x,
                y,
                width,
                height,
            } => (x, y, x + width, y + height),
        }
    }

    /// Returns `(x, y, width, height)` regardless of format
    pub fn extent(&self) -> (f64, f64, f64, f64) {
        match self.coords {
            BoxCoords::Xyxy {
                xmin,
                ymin,
                xmax,
                ymax,
            } => (xmin, ymin, xmax - xmin, ymax - ymin),
            BoxCoords::Xywh {
                x,
                y,
                width,
                height,
            } => (x, y, width, height),
        }
    }

    pub fn width(&self) -> f64 {
        self.extent().2
    }

    pub fn height(&self) -> f64 {
        self.extent().3
    }

    /// Fails with `InvalidCoordinateSpace` unless the box is in `expected`
    pub fn require_space(&self, expected: CoordinateSpace) -> Result<()> {
        if self.coordinate_space == expected {
            Ok(())
        } else {
            Err(TiradsError::InvalidCoordinateSpace {
                expected,
                found: self.coordinate_space,
            })
        }
    }

    /// Checks coordinate finiteness and ordering (`xmax ≥ xmin`, `ymax ≥ ymin`)
    ///
    /// # Errors
    ///
    /// Returns `InvalidBox` describing the first violated invariant
    pub fn validate(&self) -> Result<()> {
        let (xmin, ymin, xmax, ymax) = self.corners();
        if ![xmin, ymin, xmax, ymax].iter().all(|v| v.is_finite()) {
            return Err(TiradsError::InvalidBox(format!(
                "non-finite coordinates in {}",
                self
            )));
        }
        if xmax < xmin || ymax < ymin {
            return Err(TiradsError::InvalidBox(format!(
                "inverted corners in {}",
                self
            )));
        }
        Ok(())
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.coords {
            BoxCoords::Xyxy {
                xmin,
                ymin,
                xmax,
                ymax,
            } => write!(f, "xyxy[{}, {}, {}, {}]", xmin, ymin, xmax, ymax)?,
            BoxCoords::Xywh {
                x,
                y,
                width,
                height,
            } => write!(f, "xywh[{}, {}, {}, {}]", x, y, width, height)?,
        }
        write!(
            f,
            " in {} ({}x{})",
            self.coordinate_space, self.image_width, self.image_height
        )
    }
}

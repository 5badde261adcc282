//! Coordinate transform utilities
//!
//! Pure conversions between box encodings, remapping from a model's local
//! frame into raw image space, and clamping for crops. Every operation
//! checks the coordinate space it is given.

pub mod convert;
pub mod crop;
pub mod frame;

pub use convert::{remap_to_raw_image, to_xywh, to_xyxy};
pub use crop::{clamp_crop, CropRect};
pub use frame::LocalFrame;

//! Core type definitions for TI-RADS inference
//!
//! This module provides the fundamental types used throughout the library:
//! - [`BoundingBox`]: Box coordinates tagged with format and coordinate space
//! - [`FeatureAxis`]: The five ACR TI-RADS feature axes
//! - [`Composition`], [`Echogenicity`], [`Shape`], [`Margin`], [`EchogenicFoci`]: Per-axis classes
//! - [`FeatureSet`]: One typed prediction per axis
//! - [`TiradsCategory`]: TR1..TR5 risk category
//! - [`PipelineConfig`]: Thresholds and switches for a pipeline run

mod bbox;
mod config;
mod enums;
mod features;
mod macros;

pub use bbox::{BoundingBox, BoxCoords, BoxFormat, CoordinateSpace};
pub use config::{
    DetectionSettings, PipelineConfig, DEFAULT_EXPLANATION_CACHE_CAPACITY,
    DEFAULT_EXPLANATION_TIMEOUT_MS, DEFAULT_SCORE_THRESHOLD,
};
pub use enums::{
    normalize_label, Composition, EchogenicFoci, Echogenicity, FeatureAxis, FeatureClass, Margin,
    Shape, TiradsCategory,
};
pub use features::{FeaturePrediction, FeatureSet};

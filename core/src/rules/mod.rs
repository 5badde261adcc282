//! ACR TI-RADS rule engine
//!
//! Converts a typed [`FeatureSet`](crate::types::FeatureSet) into a point
//! total, risk category and per-axis breakdown. No I/O, no models.

mod points;
mod tirads;

pub use points::{max_points, max_total_points, TiradsPoints};
pub use tirads::{
    category_for_points, score, FeatureScore, ScoreAnomaly, TiradsResult, RULE_SET_NAME,
    RULE_SET_VERSION,
};

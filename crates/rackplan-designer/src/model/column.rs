use serde::{Deserialize, Serialize};

use super::rack::normalize_mm;

/// Building column payload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Column {
    /// Steel or concrete profile name, e.g. `HEA200`.
    pub profile: String,
    pub size_index: Option<usize>,
    pub change_order: u64,
}

impl Column {
    pub fn new(profile: &str) -> Self {
        Self {
            profile: profile.to_string(),
            size_index: None,
            change_order: 0,
        }
    }
}

/// Normalized structural fields of a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnSignature {
    pub length: i64,
    pub width: i64,
    pub height: i64,
    pub profile: String,
}

impl ColumnSignature {
    pub(crate) fn new(column: &Column, length: f64, width: f64, height: f64) -> Self {
        Self {
            length: normalize_mm(length),
            width: normalize_mm(width),
            height: normalize_mm(height),
            profile: column.profile.clone(),
        }
    }
}

//! The undoable part of a document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rackplan_core::{LayoutError, Result};

use crate::model::{ColumnSignature, RackSignature};
use crate::rack_settings::RackSettings;
use crate::sheet::Sheet;
use crate::size_index::SizeIndexTable;

/// Descriptive information about a layout document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub id: Uuid,
    pub project: String,
    pub customer: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            project: String::new(),
            customer: String::new(),
            created: now,
            modified: now,
        }
    }
}

/// Everything an undo step restores. Snapshots are plain clones; shapes refer
/// to each other by id and groups by index, so nothing needs remapping.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentState {
    pub metadata: DocumentMetadata,
    pub sheets: Vec<Sheet>,
    pub current_sheet: usize,
    pub rack_sizes: SizeIndexTable<RackSignature>,
    pub column_sizes: SizeIndexTable<ColumnSignature>,
    pub rack_settings: RackSettings,
}

impl DocumentState {
    pub fn sheet(&self, index: usize) -> Result<&Sheet> {
        self.sheets.get(index).ok_or(LayoutError::UnknownSheet(index))
    }

    pub fn sheet_mut(&mut self, index: usize) -> Result<&mut Sheet> {
        self.sheets
            .get_mut(index)
            .ok_or(LayoutError::UnknownSheet(index))
    }

    /// Highest change order stamped on any shape.
    pub fn max_change_order(&self) -> u64 {
        self.sheets
            .iter()
            .flat_map(|s| s.shapes.iter())
            .map(|s| s.change_order())
            .max()
            .unwrap_or(0)
    }

    /// Recounts both size tables from the indices stored on the shapes.
    pub fn reconcile_size_tables(&mut self) {
        let shapes = || self.sheets.iter().flat_map(|s| s.shapes.iter());
        let racks: Vec<usize> = shapes()
            .filter(|s| s.is_rack())
            .filter_map(|s| s.size_index())
            .collect();
        let columns: Vec<usize> = shapes()
            .filter(|s| s.as_column().is_some())
            .filter_map(|s| s.size_index())
            .collect();
        self.rack_sizes.reconcile(racks);
        self.column_sizes.reconcile(columns);
    }
}

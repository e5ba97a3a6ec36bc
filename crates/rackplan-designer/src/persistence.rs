//! Save/load model for layout documents.
//!
//! The file format mirrors the durable parts of a document only. Groups and
//! tie beams are derived on load and never trusted from the file. Loading is
//! tolerant: unknown shape kinds and broken entries are skipped and listed in
//! the [`LoadReport`] instead of failing the whole file.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use rackplan_core::ShapeId;
use rackplan_settings::EngineConfig;

use crate::document::{DocumentMetadata, DocumentState, DrawingDocument};
use crate::geometry::{Point, Rotation};
use crate::model::{
    Column, ColumnSignature, LayoutRules, Rack, RackSignature, Shape, ShapeKind, ShapeType,
};
use crate::rack_settings::RackSettings;
use crate::sheet::Sheet;
use crate::size_index::{SizeEntry, SizeIndexTable};

/// Current layout file format version
pub const FORMAT_VERSION: u32 = 3;

fn default_format_version() -> u32 {
    FORMAT_VERSION
}

/// Complete layout file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedDocument {
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    #[serde(default)]
    pub metadata: DocumentMetadata,
    #[serde(default)]
    pub rack_settings: RackSettings,
    #[serde(default)]
    pub current_sheet: usize,
    #[serde(default)]
    pub sheets: Vec<PersistedSheet>,
    #[serde(default)]
    pub rack_sizes: Vec<SizeEntry<RackSignature>>,
    #[serde(default)]
    pub column_sizes: Vec<SizeEntry<ColumnSignature>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedSheet {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub length: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub shapes: Vec<PersistedShape>,
}

/// Serialized shape data
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedShape {
    #[serde(default)]
    pub id: ShapeId,
    /// Kind name as returned by `ShapeType::name`
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub length: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub rotation: Rotation,
    #[serde(default)]
    pub margin_x: f64,
    #[serde(default)]
    pub margin_y: f64,
    #[serde(default)]
    pub rack: Option<Rack>,
    #[serde(default)]
    pub column: Option<Column>,
    #[serde(default)]
    pub label: Option<String>,
}

/// What went wrong while loading, without failing the load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Shapes of kinds this version does not know, as `sheet/id: kind`.
    pub unsupported: Vec<String>,
    /// The file was written by a newer format version.
    pub newer_version: bool,
    /// Entries that were dropped or repaired.
    pub partial_errors: Vec<String>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.unsupported.is_empty() && !self.newer_version && self.partial_errors.is_empty()
    }
}

impl PersistedDocument {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize layout")
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse layout file")
    }

    /// Save layout to file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path.as_ref(), json).context("Failed to write layout file")?;
        Ok(())
    }

    /// Load layout from file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read layout file")?;
        Self::from_json(&content)
    }
}

impl PersistedShape {
    fn from_shape(shape: &Shape) -> Self {
        let (rack, column, label) = match &shape.kind {
            ShapeKind::Rack(rack) => (Some(rack.clone()), None, None),
            ShapeKind::Column(column) => (None, Some(column.clone()), None),
            ShapeKind::SheetMarker { label } => (None, None, Some(label.clone())),
            _ => (None, None, None),
        };
        Self {
            id: shape.id,
            kind: shape.shape_type().name().to_string(),
            name: shape.name.clone(),
            x: shape.top_left.x,
            y: shape.top_left.y,
            length: shape.length,
            width: shape.width,
            height: shape.height,
            rotation: shape.rotation,
            margin_x: shape.margin_x,
            margin_y: shape.margin_y,
            rack,
            column,
            label,
        }
    }

    /// `Ok(None)` for kinds that are not loaded (derived tie beams).
    fn to_shape(&self) -> std::result::Result<Option<Shape>, String> {
        let kind = match ShapeType::from_name(&self.kind) {
            Some(ShapeType::Rack) => ShapeKind::Rack(self.rack.clone().unwrap_or_default()),
            Some(ShapeType::Column) => ShapeKind::Column(self.column.clone().unwrap_or_default()),
            Some(ShapeType::Block) => ShapeKind::Block,
            Some(ShapeType::AisleSpace) => ShapeKind::AisleSpace,
            Some(ShapeType::Wall) => ShapeKind::Wall,
            Some(ShapeType::Shutter) => ShapeKind::Shutter,
            Some(ShapeType::SheetMarker) => ShapeKind::SheetMarker {
                label: self.label.clone().unwrap_or_default(),
            },
            Some(ShapeType::TieBeam) => return Ok(None),
            None => return Err(self.kind.clone()),
        };
        let mut shape = Shape::new(
            kind,
            Point::new(self.x, self.y),
            self.length,
            self.width,
            self.height,
            self.rotation,
        )
        .with_margin(self.margin_x, self.margin_y);
        shape.id = self.id;
        if !self.name.is_empty() {
            shape.name = self.name.clone();
        }
        Ok(Some(shape))
    }
}

impl DrawingDocument {
    /// Builds the file model of this document.
    pub fn to_persisted(&self) -> PersistedDocument {
        let state = self.state();
        PersistedDocument {
            format_version: FORMAT_VERSION,
            metadata: state.metadata.clone(),
            rack_settings: state.rack_settings.clone(),
            current_sheet: state.current_sheet,
            sheets: state
                .sheets
                .iter()
                .map(|sheet| PersistedSheet {
                    name: sheet.name.clone(),
                    length: sheet.length,
                    width: sheet.width,
                    shapes: sheet
                        .shapes
                        .iter()
                        .filter(|s| s.initialized)
                        .map(PersistedShape::from_shape)
                        .collect(),
                })
                .collect(),
            rack_sizes: state.rack_sizes.entries().to_vec(),
            column_sizes: state.column_sizes.entries().to_vec(),
        }
    }

    /// Opens a document from its file model. Anything that cannot be used
    /// is skipped and reported; derived data is rebuilt.
    pub fn from_persisted(persisted: PersistedDocument, config: EngineConfig) -> (Self, LoadReport) {
        let mut report = LoadReport::default();
        if persisted.format_version > FORMAT_VERSION {
            tracing::warn!(
                "layout format {} is newer than supported {}",
                persisted.format_version,
                FORMAT_VERSION
            );
            report.newer_version = true;
        }

        let rack_settings = match persisted.rack_settings.validate() {
            Ok(()) => persisted.rack_settings,
            Err(e) => {
                report.partial_errors.push(format!("rack settings: {}", e));
                RackSettings::default()
            }
        };
        let frame_offset = rack_settings.frame_offset;

        let mut sheets = Vec::new();
        for (index, persisted_sheet) in persisted.sheets.into_iter().enumerate() {
            if !(persisted_sheet.length > 0.0 && persisted_sheet.width > 0.0) {
                report
                    .partial_errors
                    .push(format!("sheet {}: invalid size, skipped", index));
                continue;
            }
            let mut sheet = Sheet::new(persisted_sheet.name, persisted_sheet.length, persisted_sheet.width);
            for entry in &persisted_sheet.shapes {
                match entry.to_shape() {
                    Ok(Some(shape)) => {
                        if let Err(e) = shape.validate(frame_offset) {
                            report
                                .partial_errors
                                .push(format!("sheet {} shape {}: {}", index, entry.id, e));
                        } else if !sheet.shapes.restore(shape) {
                            report
                                .partial_errors
                                .push(format!("sheet {} shape {}: duplicate id", index, entry.id));
                        }
                    }
                    Ok(None) => {}
                    Err(kind) => {
                        report
                            .unsupported
                            .push(format!("{}/{}: {}", index, entry.id, kind));
                    }
                }
            }
            sheets.push(sheet);
        }

        let current_sheet = if persisted.current_sheet < sheets.len() {
            persisted.current_sheet
        } else {
            0
        };
        let state = DocumentState {
            metadata: persisted.metadata,
            sheets,
            current_sheet,
            rack_sizes: SizeIndexTable::from_entries(persisted.rack_sizes),
            column_sizes: SizeIndexTable::from_entries(persisted.column_sizes),
            rack_settings,
        };

        let mut document = DrawingDocument::new(config);
        if let Err(e) = document.restore(state.clone()) {
            tracing::warn!("loaded layout could not be derived: {}", e);
            report.partial_errors.push(e.to_string());
            document.install_underived(state);
        }
        if !report.is_clean() {
            tracing::info!(
                "layout loaded with {} unsupported shape(s) and {} error(s)",
                report.unsupported.len(),
                report.partial_errors.len()
            );
        }
        (document, report)
    }
}

//! Whole-document consistency check, run after loading or importing.

use std::collections::HashSet;

use rackplan_core::{AppEvent, LayoutError, LayoutEvent, Result, ShapeId};

use super::DrawingDocument;
use crate::confirm::Confirmation;
use crate::history::HistoryMode;
use crate::model::LayoutRules;
use crate::validity::{self, Repair};

/// Result of [`DrawingDocument::check_document`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Nothing overlapped.
    Ok,
    /// Overlapping shapes were moved (and, if the user agreed, removed).
    Repaired { moved: usize, removed: usize },
    /// Some shapes can only be fixed by deleting them. The document is
    /// unchanged. Entries are `(sheet, shape)`.
    NeedsUserDecision { unrepairable: Vec<(usize, ShapeId)> },
}

impl DrawingDocument {
    /// Finds every overlapping shape and moves it to a free spot. Shapes
    /// with no free spot are deleted only if `allow_prompts` is set and the
    /// confirmation service answers yes.
    pub fn check_document(&mut self, allow_prompts: bool) -> Result<CheckOutcome> {
        if self.mode != HistoryMode::Idle {
            return Err(LayoutError::CommandInProgress);
        }
        let backup = self.state.clone();
        let selection = self.selection.clone();
        self.change_token += 1;

        let (moved, unrepairable) = match self.repair_all() {
            Ok(found) => found,
            Err(e) => {
                self.state = backup;
                return Err(e);
            }
        };

        if unrepairable.is_empty() {
            if moved == 0 {
                return Ok(CheckOutcome::Ok);
            }
            if let Err(e) = self.commit() {
                self.state = backup;
                self.selection = selection;
                self.touched.clear();
                self.publish_rejection(&e);
                return Err(e);
            }
            tracing::info!("document check moved {} shape(s)", moved);
            return Ok(CheckOutcome::Repaired { moved, removed: 0 });
        }

        let answer = if allow_prompts {
            let message = format!(
                "{} shape(s) overlap other shapes and cannot be moved. Delete them?",
                unrepairable.len()
            );
            self.confirmation.confirm(&message)
        } else {
            Confirmation::Cancel
        };
        if answer != Confirmation::Yes {
            self.state = backup;
            self.touched.clear();
            return Ok(CheckOutcome::NeedsUserDecision { unrepairable });
        }

        let mut removed_per_sheet: Vec<(usize, usize)> = Vec::new();
        let removal = (0..self.state.sheets.len()).try_for_each(|sheet| {
            let ids: Vec<ShapeId> = unrepairable
                .iter()
                .filter(|(s, _)| *s == sheet)
                .map(|(_, id)| *id)
                .collect();
            if !ids.is_empty() {
                let count = self.remove_shapes(sheet, &ids)?;
                removed_per_sheet.push((sheet, count));
            }
            Ok::<(), LayoutError>(())
        });
        if let Err(e) = removal.and_then(|()| self.commit()) {
            self.state = backup;
            self.selection = selection;
            self.touched.clear();
            self.publish_rejection(&e);
            return Err(e);
        }

        let removed: usize = removed_per_sheet.iter().map(|(_, count)| count).sum();
        for (sheet, count) in removed_per_sheet {
            self.publish(AppEvent::Layout(LayoutEvent::ShapesRemoved { sheet, count }));
        }
        tracing::info!("document check moved {} and removed {} shape(s)", moved, removed);
        Ok(CheckOutcome::Repaired { moved, removed })
    }

    /// Moves every conflicting shape it can, in registry order. Returns the
    /// number moved and the shapes that could not be placed.
    pub(super) fn repair_all(&mut self) -> Result<(usize, Vec<(usize, ShapeId)>)> {
        let layout = self.config.layout.clone();
        let mut moved = 0;
        let mut unrepairable = Vec::new();

        for index in 0..self.state.sheets.len() {
            let ids: Vec<ShapeId> = self
                .state
                .sheet(index)?
                .shapes
                .iter()
                .filter(|s| s.initialized && !s.is_overlap_exempt() && !s.is_boundary_fixture())
                .map(|s| s.id)
                .collect();
            // Shapes given up on are treated as already gone.
            let mut gone: HashSet<ShapeId> = HashSet::new();

            for id in ids {
                let sheet = self.state.sheet(index)?;
                let Some(shape) = sheet.shape(id) else {
                    continue;
                };
                let bounds = sheet.bounds();
                let validity = validity::is_valid(&[shape], sheet.shapes.all(), &gone, &bounds, &layout);
                if validity.is_ok() {
                    continue;
                }
                let repair = validity::find_non_overlapping_position(
                    shape,
                    &validity.conflicting_shapes(),
                    sheet.shapes.all(),
                    &gone,
                    &bounds,
                    &layout,
                );
                match repair {
                    Repair::Repaired(point) => {
                        let shape = self
                            .state
                            .sheet_mut(index)?
                            .shape_mut(id)
                            .ok_or(LayoutError::UnknownShape(id))?;
                        shape.move_to(point);
                        moved += 1;
                        self.touched.insert(index);
                    }
                    Repair::Unrepairable => {
                        tracing::warn!("shape {} on sheet {} cannot be placed", id, index);
                        gone.insert(id);
                        unrepairable.push((index, id));
                    }
                }
            }
        }
        Ok((moved, unrepairable))
    }
}

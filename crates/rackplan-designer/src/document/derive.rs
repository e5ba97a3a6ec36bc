//! Re-derivation of groups, uprights, size indices and tie beams after a
//! change.

use std::collections::HashSet;

use rackplan_core::{LayoutError, Result, ShapeId};

use super::DrawingDocument;
use crate::catalog::UprightRequirement;
use crate::geometry::Point;
use crate::grouping;
use crate::model::Shape;
use crate::tie_beam;
use crate::validity::{self, Repair};

impl DrawingDocument {
    pub(super) fn rederive(&mut self) -> Result<()> {
        for index in 0..self.state.sheets.len() {
            self.regroup_sheet(index)?;
        }
        self.check_heights()?;
        self.select_uprights();
        self.reindex();
        self.place_tie_beams();
        Ok(())
    }

    /// Groups racks and converts them between master and subordinate until
    /// nothing moves any more.
    fn regroup_sheet(&mut self, index: usize) -> Result<()> {
        let frame_offset = self.state.rack_settings.frame_offset;
        let passes = self.config.layout.max_derive_passes;

        for pass in 0..passes {
            let sheet = self.state.sheet_mut(index)?;
            let racks: Vec<&Shape> = sheet.shapes.racks().collect();
            let groups = grouping::group(&racks, frame_offset, &self.config.layout);
            let conversions = grouping::apply_groups(&mut sheet.shapes, &groups, frame_offset);
            sheet.groups = groups;
            if conversions.is_empty() {
                return Ok(());
            }

            // Conversions keep their change order: the master flag is part
            // of the signature, so reindex re-acquires them anyway.
            tracing::debug!(
                "sheet {} pass {}: {} rack(s) converted",
                index,
                pass,
                conversions.len()
            );

            let mut moved = false;
            for conversion in conversions.iter().filter(|c| c.grew) {
                moved |= self.resolve_growth(index, conversion.rack)?;
            }
            if !moved {
                return Ok(());
            }
        }

        tracing::warn!(
            "sheet {} rack groups did not settle after {} passes",
            index,
            passes
        );
        Ok(())
    }

    /// A rack that became a master grew at its leading edge. If it now
    /// overlaps something, move the rack, or failing that the other shapes.
    /// Returns whether anything moved.
    fn resolve_growth(&mut self, index: usize, rack: ShapeId) -> Result<bool> {
        let layout = self.config.layout.clone();
        let sheet = self.state.sheet(index)?;
        let bounds = sheet.bounds();
        let Some(shape) = sheet.shape(rack).cloned() else {
            return Ok(false);
        };
        let no_ignore = HashSet::new();

        let validity = validity::is_valid(&[&shape], sheet.shapes.all(), &no_ignore, &bounds, &layout);
        if validity.is_ok() {
            return Ok(false);
        }
        let conflicts = validity.conflicting_shapes();

        let repair = validity::find_non_overlapping_position(
            &shape,
            &conflicts,
            sheet.shapes.all(),
            &no_ignore,
            &bounds,
            &layout,
        );
        if let Repair::Repaired(point) = repair {
            tracing::debug!("grown rack {} moved to ({:.1}, {:.1})", rack, point.x, point.y);
            self.move_shape(index, rack, point)?;
            return Ok(true);
        }

        if conflicts.is_empty() {
            return Err(LayoutError::Unrepairable {
                shape: rack,
                iterations: layout.repair_max_iterations,
            });
        }

        for other in conflicts {
            let sheet = self.state.sheet(index)?;
            let Some(other_shape) = sheet.shape(other).cloned() else {
                continue;
            };
            let repair = validity::find_non_overlapping_position(
                &other_shape,
                &[rack],
                sheet.shapes.all(),
                &no_ignore,
                &bounds,
                &layout,
            );
            match repair {
                Repair::Repaired(point) => {
                    tracing::debug!("shape {} moved aside for grown rack {}", other, rack);
                    self.move_shape(index, other, point)?;
                }
                Repair::Unrepairable => {
                    return Err(LayoutError::Unrepairable {
                        shape: rack,
                        iterations: layout.repair_max_iterations,
                    });
                }
            }
        }
        Ok(true)
    }

    fn move_shape(&mut self, index: usize, id: ShapeId, point: Point) -> Result<()> {
        let shape = self
            .state
            .sheet_mut(index)?
            .shape_mut(id)
            .ok_or(LayoutError::UnknownShape(id))?;
        shape.move_to(point);
        Ok(())
    }

    /// Racks edited by the running command must fit under the clear height.
    fn check_heights(&self) -> Result<()> {
        let clear_height = self.state.rack_settings.clear_height;
        let offender = self
            .state
            .sheets
            .iter()
            .flat_map(|s| s.shapes.racks())
            .find(|r| r.change_order() == self.change_token && r.height > clear_height);
        match offender {
            Some(rack) => Err(LayoutError::HeightExceeded {
                shape: rack.id,
                height: rack.height,
                clear_height,
            }),
            None => Ok(()),
        }
    }

    /// Looks up uprights for edited racks and racks that have none yet.
    fn select_uprights(&mut self) {
        let token = self.change_token;
        let catalog = &self.catalog;
        for sheet in &mut self.state.sheets {
            for shape in sheet.shapes.iter_mut() {
                let (height, depth, edited) = (shape.height, shape.width, shape.change_order() == token);
                let Some(rack) = shape.as_rack_mut() else {
                    continue;
                };
                if !edited && rack.config.upright.is_some() {
                    continue;
                }
                let requirement = UprightRequirement {
                    height,
                    depth,
                    max_level_load_kg: rack.config.max_level_load_kg(),
                    level_count: rack.config.levels.len(),
                };
                let part = catalog.select_upright(&requirement);
                if part.is_none() {
                    tracing::warn!("no upright in the catalog fits {:?}", requirement);
                }
                rack.config.upright = part.map(|p| p.code);
            }
        }
    }

    /// Re-indexes every rack and column that was edited or whose index no
    /// longer resolves to its signature.
    fn reindex(&mut self) {
        let token = self.change_token;
        let frame_offset = self.state.rack_settings.frame_offset;

        let mut racks = Vec::new();
        let mut rack_batch = Vec::new();
        let mut columns = Vec::new();
        let mut column_batch = Vec::new();
        for (index, sheet) in self.state.sheets.iter().enumerate() {
            for shape in sheet.shapes.iter().filter(|s| s.initialized) {
                let edited = shape.change_order() == token;
                if let Some(signature) = shape.rack_signature(frame_offset) {
                    let current = shape.size_index();
                    let resolves = current.is_some_and(|i| self.state.rack_sizes.resolves(i, &signature));
                    if edited || !resolves {
                        racks.push((index, shape.id));
                        rack_batch.push((current, signature));
                    }
                } else if let Some(signature) = shape.column_signature() {
                    let current = shape.size_index();
                    let resolves = current.is_some_and(|i| self.state.column_sizes.resolves(i, &signature));
                    if edited || !resolves {
                        columns.push((index, shape.id));
                        column_batch.push((current, signature));
                    }
                }
            }
        }

        if !rack_batch.is_empty() {
            let (indices, stale) = self.state.rack_sizes.recalc(rack_batch);
            self.report_stale(&racks, &stale);
            self.store_indices(&racks, &indices);
        }
        if !column_batch.is_empty() {
            let (indices, stale) = self.state.column_sizes.recalc(column_batch);
            self.report_stale(&columns, &stale);
            self.store_indices(&columns, &indices);
        }
    }

    fn report_stale(&self, shapes: &[(usize, ShapeId)], stale: &[usize]) {
        for index in stale {
            let holder = shapes
                .iter()
                .find(|(sheet, id)| {
                    self.state
                        .sheets
                        .get(*sheet)
                        .and_then(|s| s.shape(*id))
                        .and_then(Shape::size_index)
                        == Some(*index)
                })
                .map(|(_, id)| *id)
                .unwrap_or_default();
            let error = LayoutError::IndexInconsistency {
                shape: holder,
                index: *index,
            };
            tracing::warn!("{}; re-acquired", error);
        }
    }

    fn store_indices(&mut self, shapes: &[(usize, ShapeId)], indices: &[usize]) {
        for ((sheet, id), index) in shapes.iter().zip(indices) {
            let Some(shape) = self.state.sheets.get_mut(*sheet).and_then(|s| s.shape_mut(*id)) else {
                continue;
            };
            if let Some(rack) = shape.as_rack_mut() {
                rack.size_index = Some(*index);
            } else if let Some(column) = shape.as_column_mut() {
                column.size_index = Some(*index);
            }
        }
    }

    fn place_tie_beams(&mut self) {
        let rack_settings = &self.state.rack_settings;
        for sheet in &mut self.state.sheets {
            let result = tie_beam::recompute(
                &sheet.shapes,
                rack_settings,
                &self.config.tie_beam,
                &self.config.layout,
            );
            for shape in sheet.shapes.iter_mut() {
                let flagged = result.errors.contains(&shape.id);
                if let Some(rack) = shape.as_rack_mut() {
                    rack.tie_beam_error = flagged;
                }
            }
            sheet.tie_beams = result.beams;
            sheet.tie_beam_errors = result.errors;
        }
    }
}

//! Mutating commands.

use std::collections::HashSet;

use chrono::Utc;

use rackplan_core::{AppEvent, HistoryEvent, LayoutError, LayoutEvent, Result, ShapeId};

use super::{DocumentState, DrawingDocument};
use crate::geometry::{Bounds, Offset, Point};
use crate::history::HistoryMode;
use crate::model::{LayoutRules, Shape};
use crate::rack_settings::RackSettings;
use crate::sheet::Sheet;
use crate::validity::{self, Repair};

impl DrawingDocument {
    /// Runs `command` against the live state. On success the change is
    /// committed; on any error the state (and selection) is put back.
    pub(super) fn run_command<R>(
        &mut self,
        name: &str,
        command: impl FnOnce(&mut Self) -> Result<R>,
    ) -> Result<R> {
        if self.mode != HistoryMode::Idle {
            return Err(LayoutError::CommandInProgress);
        }
        let backup = self.state.clone();
        let selection = self.selection.clone();
        self.change_token += 1;

        let result = match command(self) {
            Ok(value) => self.commit().map(|()| value),
            Err(e) => Err(e),
        };
        match result {
            Ok(value) => {
                tracing::info!("{} committed (change {})", name, self.change_token);
                Ok(value)
            }
            Err(e) => {
                self.state = backup;
                self.selection = selection;
                self.touched.clear();
                self.publish_rejection(&e);
                Err(e)
            }
        }
    }

    /// Re-derives and records a snapshot. Does nothing inside an open command.
    pub(super) fn commit(&mut self) -> Result<()> {
        if self.mode != HistoryMode::Idle {
            return Ok(());
        }
        self.rederive()?;
        self.state.metadata.modified = Utc::now();
        self.history.record(self.state.clone());
        self.publish_changes();
        self.publish_history(HistoryEvent::Recorded {
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        });
        Ok(())
    }

    /// Commits edits made through [`DrawingDocument::state_mut`]. Shapes the
    /// edits left overlapping are moved to a free spot first. If one has no
    /// free spot, or the edits cannot be derived, the document reverts to the
    /// last snapshot.
    pub fn mark_changed(&mut self) -> Result<()> {
        if self.mode == HistoryMode::InCommand {
            return Ok(());
        }
        self.change_token += 1;
        self.touched.insert(self.state.current_sheet);
        let committed = self.repair_all().and_then(|(moved, unrepairable)| {
            if let Some(&(_, shape)) = unrepairable.first() {
                return Err(LayoutError::Unrepairable {
                    shape,
                    iterations: self.config.layout.repair_max_iterations,
                });
            }
            if moved > 0 {
                tracing::info!("bulk edit: moved {} overlapping shape(s)", moved);
            }
            self.commit()
        });
        match committed {
            Ok(()) => Ok(()),
            Err(e) => {
                self.set_last_state();
                self.publish_rejection(&e);
                Err(e)
            }
        }
    }

    /// Throws away uncommitted changes.
    pub fn set_last_state(&mut self) {
        if let Some(state) = self.history.current() {
            self.state = state.clone();
        }
        self.mode = HistoryMode::Idle;
        self.pending_backup = None;
        self.pending_shape = None;
        self.touched.clear();
        self.prune_selection();
        self.publish_history(HistoryEvent::Reverted);
    }

    /// Opens an interactive command. Edits until [`DrawingDocument::end_command`]
    /// are recorded as one undo step.
    pub fn begin_command(&mut self) -> Result<()> {
        if self.mode != HistoryMode::Idle {
            return Err(LayoutError::CommandInProgress);
        }
        self.pending_backup = Some(self.state.clone());
        self.change_token += 1;
        self.mode = HistoryMode::InCommand;
        Ok(())
    }

    pub fn end_command(&mut self) -> Result<()> {
        if self.mode != HistoryMode::InCommand {
            return Err(LayoutError::NoCommand);
        }
        self.mode = HistoryMode::Idle;
        self.pending_shape = None;
        let backup = self.pending_backup.take();
        if let Err(e) = self.commit() {
            if let Some(state) = backup {
                self.state = state;
            }
            self.touched.clear();
            self.prune_selection();
            self.publish_rejection(&e);
            return Err(e);
        }
        Ok(())
    }

    pub fn cancel_command(&mut self) -> Result<()> {
        if self.mode != HistoryMode::InCommand {
            return Err(LayoutError::NoCommand);
        }
        if let Some(state) = self.pending_backup.take() {
            self.state = state;
        }
        self.mode = HistoryMode::Idle;
        self.pending_shape = None;
        self.touched.clear();
        self.prune_selection();
        Ok(())
    }

    pub fn add_sheet(&mut self, name: impl Into<String>, length: f64, width: f64) -> Result<usize> {
        let name = name.into();
        let index = self.run_command("add sheet", |doc| {
            if !(length.is_finite() && width.is_finite() && length > 0.0 && width > 0.0) {
                return Err(LayoutError::invalid("sheet size must be positive"));
            }
            doc.state.sheets.push(Sheet::new(name, length, width));
            let index = doc.state.sheets.len() - 1;
            doc.touched.insert(index);
            Ok(index)
        })?;
        self.publish(AppEvent::Layout(LayoutEvent::SheetAdded { sheet: index }));
        Ok(index)
    }

    /// Switches the active sheet. The selection is cleared.
    pub fn set_current_sheet(&mut self, sheet: usize) -> Result<()> {
        self.state.sheet(sheet)?;
        if self.state.current_sheet == sheet {
            return Ok(());
        }
        self.state.current_sheet = sheet;
        self.selection.clear();
        self.publish(AppEvent::Layout(LayoutEvent::CurrentSheetChanged { sheet }));
        Ok(())
    }

    /// Adds a shape. A shape that overlaps something is moved to the nearest
    /// free spot; if there is none the shape is refused.
    pub fn create_shape(&mut self, sheet: usize, shape: Shape) -> Result<ShapeId> {
        self.run_command("create shape", |doc| {
            let frame_offset = doc.state.rack_settings.frame_offset;
            let mut shape = shape;
            shape.initialized = true;
            shape.validate(frame_offset)?;
            shape.touch(doc.change_token);
            let id = doc.state.sheet_mut(sheet)?.shapes.add(shape);
            doc.place_shape(sheet, id)?;
            doc.touched.insert(sheet);
            Ok(id)
        })
    }

    /// Starts drawing a shape interactively. The shape takes no part in
    /// validity checks until [`DrawingDocument::commit_create`].
    pub fn begin_create(&mut self, sheet: usize, shape: Shape) -> Result<ShapeId> {
        self.state.sheet(sheet)?;
        self.begin_command()?;
        let mut shape = shape;
        shape.initialized = false;
        shape.touch(self.change_token);
        let id = self.state.sheet_mut(sheet)?.shapes.add(shape);
        self.pending_shape = Some((sheet, id));
        Ok(id)
    }

    pub fn update_pending(&mut self, top_left: Point, length: f64, width: f64) -> Result<()> {
        let (sheet, id) = self.pending_shape.ok_or(LayoutError::NoCommand)?;
        let shape = self
            .state
            .sheet_mut(sheet)?
            .shape_mut(id)
            .ok_or(LayoutError::UnknownShape(id))?;
        shape.top_left = top_left;
        shape.length = length;
        shape.width = width;
        Ok(())
    }

    pub fn commit_create(&mut self) -> Result<ShapeId> {
        let (sheet, id) = self.pending_shape.ok_or(LayoutError::NoCommand)?;
        if let Err(e) = self.finish_pending(sheet, id) {
            self.cancel_command()?;
            self.publish_rejection(&e);
            return Err(e);
        }
        self.touched.insert(sheet);
        self.end_command()?;
        Ok(id)
    }

    fn finish_pending(&mut self, sheet: usize, id: ShapeId) -> Result<()> {
        let frame_offset = self.state.rack_settings.frame_offset;
        let shape = self
            .state
            .sheet_mut(sheet)?
            .shape_mut(id)
            .ok_or(LayoutError::UnknownShape(id))?;
        shape.initialized = true;
        shape.validate(frame_offset)?;
        self.place_shape(sheet, id)
    }

    /// Removes shapes and releases their size indices.
    pub fn delete_shapes(&mut self, sheet: usize, ids: &[ShapeId]) -> Result<usize> {
        let count = self.run_command("delete shapes", |doc| doc.remove_shapes(sheet, ids))?;
        self.publish(AppEvent::Layout(LayoutEvent::ShapesRemoved { sheet, count }));
        Ok(count)
    }

    pub(super) fn remove_shapes(&mut self, sheet: usize, ids: &[ShapeId]) -> Result<usize> {
        let target = self.state.sheet(sheet)?;
        if let Some(missing) = ids.iter().find(|id| !target.shapes.contains(**id)) {
            return Err(LayoutError::UnknownShape(*missing));
        }

        let state = &mut self.state;
        let removed = state
            .sheets
            .get_mut(sheet)
            .ok_or(LayoutError::UnknownSheet(sheet))?
            .shapes
            .remove(ids);
        for shape in &removed {
            release_size_index(state, shape);
        }

        if sheet == self.state.current_sheet {
            self.selection.retain(|id| !ids.contains(id));
        }
        self.touched.insert(sheet);
        Ok(removed.len())
    }

    /// Moves the selected shapes by `offset`, clamped so they stay on the
    /// sheet. Returns the offset actually applied. Fails without moving
    /// anything if the shapes would overlap something at the new position.
    pub fn move_selection(&mut self, offset: Offset) -> Result<Offset> {
        if self.mode == HistoryMode::InCommand {
            return self.apply_move(offset);
        }
        self.run_command("move selection", |doc| doc.apply_move(offset))
    }

    fn apply_move(&mut self, offset: Offset) -> Result<Offset> {
        let index = self.state.current_sheet;
        let sheet = self.state.sheet(index)?;
        let bounds = sheet.bounds();
        let selected: Vec<Shape> = sheet
            .shapes
            .iter()
            .filter(|s| self.selection.contains(&s.id))
            .cloned()
            .collect();
        if selected.is_empty() {
            return Err(LayoutError::NoSelection);
        }

        let applied = clamp_offset(&selected, offset, &bounds);
        let moved: Vec<Shape> = selected
            .into_iter()
            .map(|mut shape| {
                shape.translate(applied);
                shape
            })
            .collect();

        let ignore: HashSet<ShapeId> = self.selection.iter().copied().collect();
        let candidates: Vec<&Shape> = moved.iter().collect();
        let validity = validity::is_valid(
            &candidates,
            sheet.shapes.all(),
            &ignore,
            &bounds,
            &self.config.layout,
        );
        if let Some(first) = validity.conflicts().first() {
            return Err(LayoutError::LayoutConflict {
                shape: first.candidate,
                conflicts: validity.conflicting_shapes(),
            });
        }

        let sheet = self.state.sheet_mut(index)?;
        for shape in moved {
            if let Some(target) = sheet.shape_mut(shape.id) {
                target.move_to(shape.top_left);
            }
        }
        self.touched.insert(index);
        Ok(applied)
    }

    /// Applies a structural edit to one shape. The edit may not change the
    /// shape's id or kind, and the result must be valid where it stands.
    pub fn modify_shape<F>(&mut self, sheet: usize, id: ShapeId, edit: F) -> Result<()>
    where
        F: FnOnce(&mut Shape),
    {
        self.run_command("modify shape", |doc| {
            let token = doc.change_token;
            let frame_offset = doc.state.rack_settings.frame_offset;
            let shape = doc
                .state
                .sheet_mut(sheet)?
                .shape_mut(id)
                .ok_or(LayoutError::UnknownShape(id))?;
            let kind = shape.shape_type();
            edit(shape);
            if shape.id != id || shape.shape_type() != kind {
                return Err(LayoutError::invalid("a shape's id and kind cannot be edited"));
            }
            shape.validate(frame_offset)?;
            shape.touch(token);
            doc.touched.insert(sheet);
            doc.ensure_valid(sheet, id)
        })
    }

    /// Replaces the document rack settings. A frame offset change moves the
    /// leading edge of every rack and keeps its trailing edge: master racks
    /// grow by the change, subordinate racks give it up so their structural
    /// start stays where the row expects it.
    pub fn set_rack_settings(&mut self, settings: RackSettings) -> Result<()> {
        self.run_command("rack settings", |doc| {
            settings.validate()?;
            let delta = settings.frame_offset - doc.state.rack_settings.frame_offset;
            let token = doc.change_token;

            let mut grown = Vec::new();
            for (index, sheet) in doc.state.sheets.iter_mut().enumerate() {
                for shape in sheet.shapes.iter_mut() {
                    let Some(rack) = shape.as_rack() else {
                        continue;
                    };
                    if delta != 0.0 {
                        // Masters carry the offset, subordinates leave it free.
                        let change = if rack.is_master() { delta } else { -delta };
                        let axis = shape.run_axis();
                        let start = shape.run_start();
                        shape.length += change;
                        shape.top_left.set_along(axis, start - change);
                        shape.validate(settings.frame_offset)?;
                        if change > 0.0 {
                            grown.push((index, shape.id));
                        }
                    }
                    shape.touch(token);
                }
                doc.touched.insert(index);
            }
            doc.state.rack_settings = settings;

            for (sheet, id) in grown {
                doc.ensure_valid(sheet, id)?;
            }
            Ok(())
        })
    }

    /// Steps back one snapshot. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> Result<bool> {
        if self.mode != HistoryMode::Idle {
            return Err(LayoutError::CommandInProgress);
        }
        let Some(state) = self.history.undo().cloned() else {
            return Ok(false);
        };
        self.restore_snapshot(state);
        self.publish_history(HistoryEvent::Undone {
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        });
        Ok(true)
    }

    /// Steps forward one snapshot. Returns false when there is nothing to redo.
    pub fn redo(&mut self) -> Result<bool> {
        if self.mode != HistoryMode::Idle {
            return Err(LayoutError::CommandInProgress);
        }
        let Some(state) = self.history.redo().cloned() else {
            return Ok(false);
        };
        self.restore_snapshot(state);
        self.publish_history(HistoryEvent::Redone {
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        });
        Ok(true)
    }

    /// Drops all history, keeping the current state as the only snapshot.
    /// Called after a save.
    pub fn purge_history(&mut self) {
        self.history.purge(self.state.clone());
        self.publish_history(HistoryEvent::Purged);
    }

    fn restore_snapshot(&mut self, state: DocumentState) {
        self.mode = HistoryMode::Restoring;
        self.state = state;
        self.prune_selection();
        self.mode = HistoryMode::Idle;
        let sheet = self.state.current_sheet;
        self.publish(AppEvent::Layout(LayoutEvent::ShapesChanged { sheet }));
    }

    pub(super) fn prune_selection(&mut self) {
        match self.state.sheets.get(self.state.current_sheet) {
            Some(sheet) => self.selection.retain(|id| sheet.shapes.contains(*id)),
            None => self.selection.clear(),
        }
    }

    /// Moves a freshly placed shape off whatever it overlaps.
    fn place_shape(&mut self, sheet: usize, id: ShapeId) -> Result<()> {
        let target = self.state.sheet(sheet)?;
        let shape = target.shape(id).ok_or(LayoutError::UnknownShape(id))?;
        let bounds = target.bounds();
        let ignore = HashSet::new();
        let layout = &self.config.layout;

        let validity = validity::is_valid(&[shape], target.shapes.all(), &ignore, &bounds, layout);
        if validity.is_ok() {
            return Ok(());
        }
        let conflicts = validity.conflicting_shapes();
        let repair = validity::find_non_overlapping_position(
            shape,
            &conflicts,
            target.shapes.all(),
            &ignore,
            &bounds,
            layout,
        );
        match repair {
            Repair::Repaired(point) => {
                tracing::debug!(
                    "shape {} moved to ({:.1}, {:.1}) to clear {:?}",
                    id,
                    point.x,
                    point.y,
                    conflicts
                );
                if let Some(shape) = self.state.sheet_mut(sheet)?.shape_mut(id) {
                    shape.move_to(point);
                }
                Ok(())
            }
            Repair::Unrepairable => Err(LayoutError::LayoutConflict {
                shape: id,
                conflicts,
            }),
        }
    }

    /// Fails with `LayoutConflict` if the shape overlaps anything where it is.
    pub(super) fn ensure_valid(&self, sheet: usize, id: ShapeId) -> Result<()> {
        let target = self.state.sheet(sheet)?;
        let shape = target.shape(id).ok_or(LayoutError::UnknownShape(id))?;
        let validity = validity::is_valid(
            &[shape],
            target.shapes.all(),
            &HashSet::new(),
            &target.bounds(),
            &self.config.layout,
        );
        if validity.is_ok() {
            Ok(())
        } else {
            Err(LayoutError::LayoutConflict {
                shape: id,
                conflicts: validity.conflicting_shapes(),
            })
        }
    }
}

/// Drops the size table reference a removed rack or column held.
pub(super) fn release_size_index(state: &mut DocumentState, shape: &Shape) {
    let Some(index) = shape.size_index() else {
        return;
    };
    let released = if shape.is_rack() {
        state.rack_sizes.release(index)
    } else {
        state.column_sizes.release(index)
    };
    if !released {
        tracing::warn!("shape {} held unknown size index {}", shape.id, index);
    }
}

/// Limits `offset` so the margin boxes of `shapes` stay on the sheet. Walls
/// are not limited.
fn clamp_offset(shapes: &[Shape], offset: Offset, sheet: &Bounds) -> Offset {
    let boxes: Vec<Bounds> = shapes
        .iter()
        .filter(|s| !s.is_boundary_fixture())
        .map(|s| s.inflated_bounds())
        .collect();
    let Some(union) = Bounds::union_all(&boxes) else {
        return offset;
    };
    let limit = |value: f64, low: f64, high: f64| {
        if low > high {
            0.0
        } else {
            value.clamp(low, high)
        }
    };
    Offset::new(
        limit(offset.dx, sheet.min_x - union.min_x, sheet.max_x - union.max_x),
        limit(offset.dy, sheet.min_y - union.min_y, sheet.max_y - union.max_y),
    )
}

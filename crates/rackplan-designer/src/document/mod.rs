//! Drawing document: the owner of the layout state, its history and its
//! notifications.
//!
//! Every mutating command works on a backup of the state. It either commits
//! (re-deriving groups, size indices and tie beams, then recording a
//! snapshot) or restores the backup and reports why, so a caller never sees
//! a half-applied edit.

mod check;
mod commands;
mod derive;
mod state;

pub use check::CheckOutcome;
pub use state::{DocumentMetadata, DocumentState};

use std::collections::{BTreeSet, HashSet};

use rackplan_core::{
    AppEvent, DiagnosticEvent, EventBus, HistoryEvent, LayoutError, LayoutEvent, Result, ShapeId,
};
use rackplan_settings::EngineConfig;

use crate::catalog::{ColumnCatalog, TableCatalog};
use crate::confirm::{Confirmation, ConfirmationService, FixedAnswer};
use crate::grouping::RackGroup;
use crate::history::{HistoryMode, UndoRedoManager};
use crate::model::Shape;
use crate::sheet::Sheet;
use crate::validity::{self, Repair, Validity};

/// A layout document with undo/redo.
pub struct DrawingDocument {
    state: DocumentState,
    history: UndoRedoManager<DocumentState>,
    mode: HistoryMode,
    /// State at `begin_command`, restored on cancel.
    pending_backup: Option<DocumentState>,
    /// Shape being drawn interactively.
    pending_shape: Option<(usize, ShapeId)>,
    config: EngineConfig,
    catalog: Box<dyn ColumnCatalog>,
    confirmation: Box<dyn ConfirmationService>,
    events: EventBus,
    /// Bumped once per command; racks and columns edited by the command carry it.
    change_token: u64,
    /// Selected shapes of the current sheet. Not part of undo snapshots.
    selection: BTreeSet<ShapeId>,
    /// Sheets edited by the running command.
    touched: BTreeSet<usize>,
}

impl DrawingDocument {
    /// Empty document using the standard upright catalog. Prompts are
    /// answered with `No`.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_collaborators(
            config,
            Box::new(TableCatalog::standard()),
            Box::new(FixedAnswer(Confirmation::No)),
        )
    }

    pub fn with_collaborators(
        config: EngineConfig,
        catalog: Box<dyn ColumnCatalog>,
        confirmation: Box<dyn ConfirmationService>,
    ) -> Self {
        let state = DocumentState::default();
        let mut history = UndoRedoManager::new(config.history.max_depth);
        history.record(state.clone());
        Self {
            state,
            history,
            mode: HistoryMode::Idle,
            pending_backup: None,
            pending_shape: None,
            config,
            catalog,
            confirmation,
            events: EventBus::new(),
            change_token: 0,
            selection: BTreeSet::new(),
            touched: BTreeSet::new(),
        }
    }

    pub fn set_catalog(&mut self, catalog: Box<dyn ColumnCatalog>) {
        self.catalog = catalog;
    }

    pub fn set_confirmation_service(&mut self, confirmation: Box<dyn ConfirmationService>) {
        self.confirmation = confirmation;
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn mode(&self) -> HistoryMode {
        self.mode
    }

    pub fn change_token(&self) -> u64 {
        self.change_token
    }

    pub fn state(&self) -> &DocumentState {
        &self.state
    }

    /// Direct access for bulk edits. Call [`DrawingDocument::mark_changed`]
    /// afterwards to re-derive and record the result.
    pub fn state_mut(&mut self) -> &mut DocumentState {
        &mut self.state
    }

    pub fn snapshot(&self) -> DocumentState {
        self.state.clone()
    }

    /// Replaces the whole state, e.g. with a freshly loaded one. History is
    /// reset to the restored state. On error the document is unchanged.
    pub fn restore(&mut self, state: DocumentState) -> Result<()> {
        if self.mode == HistoryMode::InCommand {
            return Err(LayoutError::CommandInProgress);
        }
        let backup = std::mem::replace(&mut self.state, state);
        self.mode = HistoryMode::Restoring;
        self.state.reconcile_size_tables();
        self.change_token = self.state.max_change_order() + 1;
        let derived = self.rederive();
        self.mode = HistoryMode::Idle;
        if let Err(e) = derived {
            self.state = backup;
            return Err(e);
        }
        self.selection.clear();
        self.history.purge(self.state.clone());
        self.publish(AppEvent::History(HistoryEvent::Purged));
        Ok(())
    }

    /// Installs a state that failed to derive, so a partially broken file
    /// can still be opened and repaired by the user.
    pub(crate) fn install_underived(&mut self, mut state: DocumentState) {
        state.reconcile_size_tables();
        self.change_token = state.max_change_order() + 1;
        self.state = state;
        self.mode = HistoryMode::Idle;
        self.selection.clear();
        self.history.purge(self.state.clone());
    }

    pub fn sheet(&self, index: usize) -> Result<&Sheet> {
        self.state.sheet(index)
    }

    pub fn sheet_count(&self) -> usize {
        self.state.sheets.len()
    }

    pub fn current_sheet(&self) -> usize {
        self.state.current_sheet
    }

    pub fn shape(&self, sheet: usize, id: ShapeId) -> Result<&Shape> {
        self.sheet(sheet)?
            .shape(id)
            .ok_or(LayoutError::UnknownShape(id))
    }

    pub fn selection(&self) -> &BTreeSet<ShapeId> {
        &self.selection
    }

    /// Selects `ids` on `sheet`, switching to it first if needed.
    pub fn select(&mut self, sheet: usize, ids: &[ShapeId]) -> Result<()> {
        let target = self.sheet(sheet)?;
        if let Some(missing) = ids.iter().find(|id| !target.shapes.contains(**id)) {
            return Err(LayoutError::UnknownShape(*missing));
        }
        if sheet != self.state.current_sheet {
            self.set_current_sheet(sheet)?;
        }
        self.selection.extend(ids.iter().copied());
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn rack_groups(&self, sheet: usize) -> Result<&[RackGroup]> {
        Ok(&self.sheet(sheet)?.groups)
    }

    pub fn size_index(&self, sheet: usize, id: ShapeId) -> Result<Option<usize>> {
        Ok(self.shape(sheet, id)?.size_index())
    }

    pub fn tie_beams(&self, sheet: usize) -> Result<&[Shape]> {
        Ok(&self.sheet(sheet)?.tie_beams)
    }

    pub fn tie_beam_errors(&self, sheet: usize) -> Result<&[ShapeId]> {
        Ok(&self.sheet(sheet)?.tie_beam_errors)
    }

    pub fn can_undo(&self) -> bool {
        self.mode == HistoryMode::Idle && self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.mode == HistoryMode::Idle && self.history.can_redo()
    }

    pub fn undo_depth(&self) -> usize {
        self.history.undo_depth()
    }

    pub fn redo_depth(&self) -> usize {
        self.history.redo_depth()
    }

    /// Checks `shape` against the committed shapes of `sheet`, ignoring
    /// `ignore` and the registry copy of the shape itself.
    pub fn validate_placement(
        &self,
        sheet: usize,
        shape: &Shape,
        ignore: &HashSet<ShapeId>,
    ) -> Result<Validity> {
        let sheet = self.sheet(sheet)?;
        Ok(validity::is_valid(
            &[shape],
            sheet.shapes.all(),
            ignore,
            &sheet.bounds(),
            &self.config.layout,
        ))
    }

    /// Looks for the nearest valid position of `shape` on `sheet`.
    pub fn find_position(&self, sheet: usize, shape: &Shape) -> Result<Repair> {
        let sheet = self.sheet(sheet)?;
        let validity = validity::is_valid(
            &[shape],
            sheet.shapes.all(),
            &HashSet::new(),
            &sheet.bounds(),
            &self.config.layout,
        );
        if validity.is_ok() {
            return Ok(Repair::Repaired(shape.top_left));
        }
        Ok(validity::find_non_overlapping_position(
            shape,
            &validity.conflicting_shapes(),
            sheet.shapes.all(),
            &HashSet::new(),
            &sheet.bounds(),
            &self.config.layout,
        ))
    }

    fn publish(&self, event: AppEvent) {
        // Nobody listening is fine for a headless document.
        let _ = self.events.publish(event);
    }

    fn publish_history(&self, event: HistoryEvent) {
        self.publish(AppEvent::History(event));
    }

    fn publish_rejection(&self, error: &LayoutError) {
        tracing::info!("command rejected: {}", error);
        self.publish(AppEvent::Diagnostics(DiagnosticEvent::OperationRejected {
            reason: error.to_string(),
        }));
    }

    fn publish_changes(&mut self) {
        let touched = std::mem::take(&mut self.touched);
        for sheet in touched {
            self.publish(AppEvent::Layout(LayoutEvent::ShapesChanged { sheet }));
        }
        for (index, sheet) in self.state.sheets.iter().enumerate() {
            if !sheet.tie_beam_errors.is_empty() {
                self.publish(AppEvent::Diagnostics(DiagnosticEvent::TieBeamErrors {
                    sheet: index,
                    racks: sheet.tie_beam_errors.clone(),
                }));
            }
        }
    }
}

impl Default for DrawingDocument {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

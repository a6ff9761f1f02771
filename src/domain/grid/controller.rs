//! Transient edit state for one table view.
//!
//! The controller tracks which cell is in edit mode, the uncommitted values
//! typed into cells, and at most one change waiting on confirmation. It never
//! touches the underlying dataset; callers apply committed values themselves
//! and then call [`EditableGridController::confirm_edit`].

use std::collections::HashMap;

use crate::domain::entities::edit::{CellKey, CellValue, EditingState, PendingChange};

#[derive(Debug, Clone, PartialEq)]
pub enum GridAction<V = CellValue> {
    StartEdit(CellKey),
    SetScratchValue { key: CellKey, value: V },
    ProposeChange(PendingChange<V>),
    CancelEdit,
    ConfirmEdit,
    Reset,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GridPhase<'a, V = CellValue> {
    Idle,
    Editing {
        cell: &'a CellKey,
    },
    Pending {
        cell: Option<&'a CellKey>,
        change: &'a PendingChange<V>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditableGridController<V = CellValue> {
    state: EditingState<V>,
}

impl<V> Default for EditableGridController<V> {
    fn default() -> Self {
        Self {
            state: EditingState::default(),
        }
    }
}

impl<V: Clone> EditableGridController<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatch(&mut self, action: GridAction<V>) {
        match action {
            GridAction::StartEdit(key) => self.start_edit(key),
            GridAction::SetScratchValue { key, value } => self.set_scratch_value(key, value),
            GridAction::ProposeChange(change) => self.propose_change(change),
            GridAction::CancelEdit => self.cancel_edit(),
            GridAction::ConfirmEdit => self.confirm_edit(),
            GridAction::Reset => self.reset(),
        }
    }

    pub fn start_edit(&mut self, key: CellKey) {
        log::trace!("grid: start edit {key}");
        self.state.active_cell = Some(key);
    }

    pub fn set_scratch_value(&mut self, key: CellKey, value: V) {
        log::trace!("grid: scratch value for {key}");
        self.state.scratch_values.insert(key, value);
    }

    /// Replaces any unresolved pending change (last write wins).
    pub fn propose_change(&mut self, change: PendingChange<V>) {
        if let Some(previous) = &self.state.pending_change {
            log::debug!(
                "grid: pending change for {} replaced by {}",
                previous.key,
                change.key
            );
        }
        log::trace!("grid: propose change for {}", change.key);
        self.state.pending_change = Some(change);
    }

    pub fn cancel_edit(&mut self) {
        log::trace!("grid: cancel edit");
        self.clear();
    }

    pub fn confirm_edit(&mut self) {
        log::trace!("grid: confirm edit");
        self.clear();
    }

    pub fn reset(&mut self) {
        log::trace!("grid: reset");
        self.clear();
    }

    fn clear(&mut self) {
        self.state = EditingState::default();
    }

    pub fn state(&self) -> &EditingState<V> {
        &self.state
    }

    pub fn active_cell(&self) -> Option<&CellKey> {
        self.state.active_cell.as_ref()
    }

    pub fn is_editing(&self, key: &CellKey) -> bool {
        self.state.active_cell.as_ref() == Some(key)
    }

    pub fn scratch_value(&self, key: &CellKey) -> Option<&V> {
        self.state.scratch_values.get(key)
    }

    pub fn scratch_values(&self) -> &HashMap<CellKey, V> {
        &self.state.scratch_values
    }

    pub fn pending_change(&self) -> Option<&PendingChange<V>> {
        self.state.pending_change.as_ref()
    }

    pub fn is_idle(&self) -> bool {
        self.state.is_idle()
    }

    pub fn phase(&self) -> GridPhase<'_, V> {
        match (&self.state.active_cell, &self.state.pending_change) {
            (cell, Some(change)) => GridPhase::Pending {
                cell: cell.as_ref(),
                change,
            },
            (Some(cell), None) => GridPhase::Editing { cell },
            (None, None) => GridPhase::Idle,
        }
    }
}

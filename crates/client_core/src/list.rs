//! The in-memory transfer list a batch is assembled in.
//!
//! Rows are held in canonical order together with a display permutation. While
//! a column sort is active the two differ; display positions always map back to
//! a canonical index for edit and delete addressing. Drag moves and saves write
//! the displayed order back into the canonical vector.

use std::collections::HashSet;

use shared::protocol::DraftSeed;
use tracing::debug;

use crate::{
    draft::{DraftTransfer, RowKey},
    editor::{EditState, EditableField, InlineEditor, StagedEdit},
    error::ListError,
    ordering::{self, SortDirection, SortField, SortSpec},
};

#[derive(Debug, Clone, Default)]
pub struct TransferList {
    rows: Vec<DraftTransfer>,
    display: Vec<usize>,
    sort: Option<SortSpec>,
    editor: InlineEditor,
    revision: u64,
}

impl TransferList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<DraftTransfer>) -> Result<Self, ListError> {
        let mut list = Self::new();
        list.replace_all(rows)?;
        Ok(list)
    }

    pub fn from_seeds(seeds: Vec<DraftSeed>) -> Result<Self, ListError> {
        let mut list = Self::new();
        list.load_seeds(seeds)?;
        Ok(list)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in canonical order.
    pub fn rows(&self) -> &[DraftTransfer] {
        &self.rows
    }

    /// Rows in the order they are shown.
    pub fn displayed(&self) -> impl Iterator<Item = &DraftTransfer> + '_ {
        self.display.iter().map(|&index| &self.rows[index])
    }

    pub fn displayed_keys(&self) -> Vec<RowKey> {
        self.displayed().map(|row| row.key().clone()).collect()
    }

    pub fn displayed_row(&self, display_index: usize) -> Option<&DraftTransfer> {
        self.canonical_index(display_index)
            .map(|index| &self.rows[index])
    }

    pub fn canonical_index(&self, display_index: usize) -> Option<usize> {
        self.display.get(display_index).copied()
    }

    pub fn position_of(&self, key: &RowKey) -> Option<usize> {
        self.rows.iter().position(|row| row.key() == key)
    }

    pub fn active_sort(&self) -> Option<SortSpec> {
        self.sort
    }

    /// Bumped every time the displayed order actually changes.
    pub fn order_revision(&self) -> u64 {
        self.revision
    }

    pub fn all_persisted(&self) -> bool {
        !self.rows.is_empty() && self.rows.iter().all(|row| row.key().is_persisted())
    }

    pub fn push(&mut self, row: DraftTransfer) -> Result<(), ListError> {
        if self.position_of(row.key()).is_some() {
            return Err(ListError::DuplicateRow(row.key().clone()));
        }
        self.rows.push(row);
        self.display.push(self.rows.len() - 1);
        self.revision += 1;
        self.resort();
        Ok(())
    }

    /// Removes the row shown at `display_index`.
    pub fn remove(&mut self, display_index: usize) -> Option<DraftTransfer> {
        let canonical = self.canonical_index(display_index)?;
        let removed = self.rows.remove(canonical);
        self.display.retain(|&index| index != canonical);
        for index in &mut self.display {
            if *index > canonical {
                *index -= 1;
            }
        }
        self.editor.forget_row(removed.key());
        self.revision += 1;
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.display.clear();
        self.editor.cancel_edit();
        self.revision += 1;
    }

    /// Replaces every row, as when a template or invoice selection is loaded.
    pub fn replace_all(&mut self, rows: Vec<DraftTransfer>) -> Result<(), ListError> {
        let mut seen = HashSet::with_capacity(rows.len());
        for row in &rows {
            if !seen.insert(row.key().clone()) {
                return Err(ListError::DuplicateRow(row.key().clone()));
            }
        }
        self.display = (0..rows.len()).collect();
        self.rows = rows;
        self.editor.cancel_edit();
        self.revision += 1;
        self.resort();
        Ok(())
    }

    pub fn load_seeds(&mut self, seeds: Vec<DraftSeed>) -> Result<(), ListError> {
        self.replace_all(seeds.into_iter().map(DraftTransfer::from_seed).collect())
    }

    /// Drag-and-drop move between displayed positions. A manual move overrides
    /// an active sort. Equal or out-of-range indices are ignored.
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        if from == to || from >= self.len() || to >= self.len() {
            return false;
        }
        self.materialize();
        self.sort = None;
        ordering::reorder(&mut self.rows, from, to);
        self.revision += 1;
        debug!(from, to, "reordered transfer rows");
        true
    }

    /// Applies a column sort. Returns whether the displayed order changed.
    pub fn sort_by(&mut self, field: SortField, direction: SortDirection) -> bool {
        self.sort = Some(SortSpec::new(field, direction));
        self.resort()
    }

    /// Column header click: ascending first, then flips direction on the same field.
    pub fn toggle_sort(&mut self, field: SortField) -> SortSpec {
        let direction = match self.sort {
            Some(spec) if spec.field == field => spec.direction.toggled(),
            _ => SortDirection::Ascending,
        };
        self.sort_by(field, direction);
        SortSpec::new(field, direction)
    }

    /// Re-applies the active sort. Returns true only when the displayed
    /// identity sequence differs from before.
    pub fn resort(&mut self) -> bool {
        let Some(spec) = self.sort else {
            return false;
        };
        let mut next = self.display.clone();
        ordering::sort_permutation(&self.rows, &mut next, spec);
        if next == self.display {
            return false;
        }
        self.display = next;
        self.revision += 1;
        debug!(field = %spec.field, direction = ?spec.direction, "re-sorted transfer rows");
        true
    }

    pub fn edit_state(&self) -> &EditState {
        self.editor.state()
    }

    pub fn staged(&self) -> Option<&StagedEdit> {
        self.editor.staged()
    }

    /// Where the edited row is shown now, looked up by key.
    pub fn editing_position(&self) -> Option<usize> {
        let key = self.editor.editing_key()?;
        self.displayed().position(|row| row.key() == key)
    }

    /// Opens the row shown at `display_index` for editing.
    pub fn start_edit(&mut self, display_index: usize) -> bool {
        match self.canonical_index(display_index) {
            Some(index) => self.editor.start_edit(&self.rows, index),
            None => false,
        }
    }

    pub fn update_staged_field(&mut self, field: EditableField, value: impl Into<String>) -> bool {
        self.editor.update_staged_field(field, value)
    }

    /// Commits the staged edit and returns the canonical index of the edited row.
    pub fn commit_edit(&mut self) -> Option<usize> {
        let index = self.editor.commit_edit(&mut self.rows)?;
        self.resort();
        Some(index)
    }

    pub fn cancel_edit(&mut self) -> bool {
        self.editor.cancel_edit()
    }

    /// Writes the displayed order into the canonical vector and numbers each
    /// row by its position.
    pub(crate) fn prepare_for_save(&mut self) {
        self.materialize();
        for (position, row) in self.rows.iter_mut().enumerate() {
            row.set_order(position as u32);
        }
    }

    /// Swaps in rows that differ from the current ones only by server ids.
    pub(crate) fn replace_persisted(&mut self, rows: Vec<DraftTransfer>) {
        debug_assert_eq!(rows.len(), self.rows.len());
        for (old, new) in self.rows.iter().zip(&rows) {
            if old.key() != new.key() {
                self.editor.rekey(old.key(), new.key());
            }
        }
        self.rows = rows;
    }

    fn materialize(&mut self) {
        if self.display.iter().enumerate().all(|(pos, &index)| pos == index) {
            return;
        }
        let mut slots: Vec<Option<DraftTransfer>> = self.rows.drain(..).map(Some).collect();
        self.rows = self
            .display
            .iter()
            .filter_map(|&index| slots[index].take())
            .collect();
        self.display = (0..self.rows.len()).collect();
    }
}

#[cfg(test)]
#[path = "tests/list_tests.rs"]
mod tests;

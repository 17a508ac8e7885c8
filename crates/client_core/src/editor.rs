//! Single-row inline editing with a staging record.

use crate::draft::{DraftTransfer, RowKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditableField {
    Amount,
    ExecutionDate,
    RemittanceInfo,
}

/// Field values being edited, kept apart from the committed row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagedEdit {
    pub amount: String,
    pub execution_date: String,
    pub remittance_info: String,
}

impl StagedEdit {
    fn from_row(row: &DraftTransfer) -> Self {
        Self {
            amount: row.amount.clone(),
            execution_date: row.execution_date.clone(),
            remittance_info: row.remittance_info.clone().unwrap_or_default(),
        }
    }

    fn set(&mut self, field: EditableField, value: String) {
        match field {
            EditableField::Amount => self.amount = value,
            EditableField::ExecutionDate => self.execution_date = value,
            EditableField::RemittanceInfo => self.remittance_info = value,
        }
    }

    fn apply_to(self, row: &mut DraftTransfer) {
        row.amount = self.amount;
        row.execution_date = self.execution_date;
        row.remittance_info = if self.remittance_info.is_empty() {
            None
        } else {
            Some(self.remittance_info)
        };
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EditState {
    #[default]
    Idle,
    /// The session follows the row by key; its position can change while editing.
    Editing {
        key: RowKey,
        staged: StagedEdit,
    },
}

#[derive(Debug, Clone, Default)]
pub struct InlineEditor {
    state: EditState,
}

impl InlineEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.state, EditState::Editing { .. })
    }

    pub fn editing_key(&self) -> Option<&RowKey> {
        match &self.state {
            EditState::Editing { key, .. } => Some(key),
            EditState::Idle => None,
        }
    }

    pub fn staged(&self) -> Option<&StagedEdit> {
        match &self.state {
            EditState::Editing { staged, .. } => Some(staged),
            EditState::Idle => None,
        }
    }

    /// Opens `row_index` for editing. Any open session is dropped along with its
    /// staged values. An out-of-range index leaves the editor as it was.
    pub fn start_edit(&mut self, rows: &[DraftTransfer], row_index: usize) -> bool {
        let Some(row) = rows.get(row_index) else {
            return false;
        };
        self.state = EditState::Editing {
            key: row.key().clone(),
            staged: StagedEdit::from_row(row),
        };
        true
    }

    pub fn update_staged_field(&mut self, field: EditableField, value: impl Into<String>) -> bool {
        match &mut self.state {
            EditState::Editing { staged, .. } => {
                staged.set(field, value.into());
                true
            }
            EditState::Idle => false,
        }
    }

    /// Writes the staged fields onto the edited row and returns its index.
    ///
    /// The row is located by key, so a move since `start_edit` does not redirect
    /// the commit. Returns `None` when idle or when the row is gone.
    pub fn commit_edit(&mut self, rows: &mut [DraftTransfer]) -> Option<usize> {
        let EditState::Editing { key, staged } = std::mem::take(&mut self.state) else {
            return None;
        };
        let index = rows.iter().position(|row| row.key() == &key)?;
        staged.apply_to(&mut rows[index]);
        Some(index)
    }

    pub fn cancel_edit(&mut self) -> bool {
        let was_editing = self.is_editing();
        self.state = EditState::Idle;
        was_editing
    }

    /// Ends the session if it targets `key`.
    pub(crate) fn forget_row(&mut self, key: &RowKey) {
        if self.editing_key() == Some(key) {
            self.state = EditState::Idle;
        }
    }

    /// Follows a key change of the edited row (draft to persisted).
    pub(crate) fn rekey(&mut self, from: &RowKey, to: &RowKey) {
        if let EditState::Editing { key, .. } = &mut self.state {
            if key == from {
                *key = to.clone();
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/editor_tests.rs"]
mod tests;

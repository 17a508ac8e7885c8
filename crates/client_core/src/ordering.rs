//! Drag-and-drop moves and stable column sorts over draft rows.

use std::{cmp::Ordering, fmt, str::FromStr};

use crate::draft::DraftTransfer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortField {
    BeneficiaryName,
    Amount,
    ExecutionDate,
    RemittanceInfo,
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beneficiary" | "name" | "beneficiary_name" => Ok(SortField::BeneficiaryName),
            "amount" => Ok(SortField::Amount),
            "date" | "execution_date" => Ok(SortField::ExecutionDate),
            "remittance" | "remittance_info" => Ok(SortField::RemittanceInfo),
            other => Err(format!("unknown sort field '{other}'")),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortField::BeneficiaryName => "beneficiary_name",
            SortField::Amount => "amount",
            SortField::ExecutionDate => "execution_date",
            SortField::RemittanceInfo => "remittance_info",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }
}

impl FromStr for SortSpec {
    type Err = String;

    /// Parses `field` or `field:asc|desc`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, direction) = match s.split_once(':') {
            Some((field, dir)) => {
                let direction = match dir.trim().to_ascii_lowercase().as_str() {
                    "asc" | "ascending" => SortDirection::Ascending,
                    "desc" | "descending" => SortDirection::Descending,
                    other => return Err(format!("unknown sort direction '{other}'")),
                };
                (field, direction)
            }
            None => (s, SortDirection::Ascending),
        };
        Ok(SortSpec::new(field.parse()?, direction))
    }
}

/// Key comparison for one field. Unparsable amounts order before every number.
pub fn compare_by(a: &DraftTransfer, b: &DraftTransfer, field: SortField) -> Ordering {
    match field {
        SortField::BeneficiaryName => a.beneficiary.name.cmp(&b.beneficiary.name),
        SortField::Amount => a.parsed_amount().cmp(&b.parsed_amount()),
        SortField::ExecutionDate => a.execution_date.cmp(&b.execution_date),
        SortField::RemittanceInfo => a
            .remittance_info
            .as_deref()
            .unwrap_or_default()
            .cmp(b.remittance_info.as_deref().unwrap_or_default()),
    }
}

fn compare_directed(a: &DraftTransfer, b: &DraftTransfer, spec: SortSpec) -> Ordering {
    let ordering = compare_by(a, b, spec.field);
    match spec.direction {
        SortDirection::Ascending => ordering,
        // Reverse the key comparison, not the sequence: ties keep their prior order.
        SortDirection::Descending => ordering.reverse(),
    }
}

/// Moves the element at `from` to `to`. Returns false and leaves the slice
/// untouched when the indices are equal or out of bounds.
pub fn reorder<T>(items: &mut Vec<T>, from: usize, to: usize) -> bool {
    if from == to || from >= items.len() || to >= items.len() {
        return false;
    }
    let item = items.remove(from);
    items.insert(to, item);
    true
}

/// Stable sort of a display permutation over `rows`, starting from the order it
/// already has.
pub fn sort_permutation(rows: &[DraftTransfer], permutation: &mut [usize], spec: SortSpec) {
    permutation.sort_by(|&a, &b| compare_directed(&rows[a], &rows[b], spec));
}

/// Returns `rows` in the order given by `spec`; equal keys keep their relative order.
pub fn sort_by(rows: &[DraftTransfer], field: SortField, direction: SortDirection) -> Vec<DraftTransfer> {
    let mut sorted = rows.to_vec();
    let spec = SortSpec::new(field, direction);
    sorted.sort_by(|a, b| compare_directed(a, b, spec));
    sorted
}

#[cfg(test)]
#[path = "tests/ordering_tests.rs"]
mod tests;

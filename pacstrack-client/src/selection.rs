//! Carrying a table's selection across a rebuild.
//!
//! Selection is tracked by row position. If a refresh reorders rows the
//! restored selection points at different rows; that is accepted, never an
//! error.

use pacstrack_model::FieldLookup;

use crate::view::RecordTable;

/// Row positions selected at capture time, ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet(Vec<usize>);

impl SelectionSet {
    pub fn from_positions(mut positions: Vec<usize>) -> Self {
        positions.sort_unstable();
        positions.dedup();
        Self(positions)
    }

    pub fn positions(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SelectionTracker;

impl SelectionTracker {
    pub fn capture<T: FieldLookup>(table: &RecordTable<T>) -> SelectionSet {
        SelectionSet(table.selected_positions())
    }

    /// Re-mark the captured positions; positions past the end of the rebuilt
    /// table are skipped. Returns how many rows ended up selected.
    pub fn restore<T: FieldLookup>(table: &mut RecordTable<T>, selection: &SelectionSet) -> usize {
        table.deselect_all();
        selection
            .positions()
            .iter()
            .filter(|position| table.select(**position))
            .count()
    }
}

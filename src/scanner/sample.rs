//! Grid data: raw readings, cell states, snapshots and change events.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CellState {
    Off,
    On,
}

impl CellState {
    pub fn is_on(self) -> bool {
        self == CellState::On
    }

    /// 1 for on (slot filled), 0 for off.
    pub fn as_bit(self) -> u8 {
        self.is_on() as u8
    }
}

impl From<bool> for CellState {
    fn from(on: bool) -> Self {
        if on { CellState::On } else { CellState::Off }
    }
}

/// Intensity readings (0-255) for one full pass, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSample {
    rows: usize,
    columns: usize,
    readings: Vec<u8>,
}

impl RawSample {
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            readings: vec![0; rows * columns],
        }
    }

    /// Builds a sample from a function of (row, column).
    pub fn from_fn(rows: usize, columns: usize, mut f: impl FnMut(usize, usize) -> u8) -> Self {
        let readings = (0..rows)
            .flat_map(|row| (0..columns).map(move |column| (row, column)))
            .map(|(row, column)| f(row, column))
            .collect();
        Self {
            rows,
            columns,
            readings,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn get(&self, row: usize, column: usize) -> Option<u8> {
        if row < self.rows && column < self.columns {
            Some(self.readings[row * self.columns + column])
        } else {
            None
        }
    }

    pub(crate) fn set(&mut self, row: usize, column: usize, value: u8) {
        self.readings[row * self.columns + column] = value;
    }

    pub fn readings(&self) -> &[u8] {
        &self.readings
    }
}

/// Full grid state at one point in time.
///
/// The sequence number increases by one on every completed scan pass.
/// Sequence 0 is the all-off state the scanner starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridSnapshot {
    sequence: u64,
    rows: usize,
    columns: usize,
    cells: Vec<CellState>,
}

impl GridSnapshot {
    pub fn initial(rows: usize, columns: usize) -> Self {
        Self {
            sequence: 0,
            rows,
            columns,
            cells: vec![CellState::Off; rows * columns],
        }
    }

    pub(crate) fn from_cells(
        sequence: u64,
        rows: usize,
        columns: usize,
        cells: Vec<CellState>,
    ) -> Self {
        debug_assert_eq!(cells.len(), rows * columns);
        Self {
            sequence,
            rows,
            columns,
            cells,
        }
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn get(&self, row: usize, column: usize) -> Option<CellState> {
        if row < self.rows && column < self.columns {
            Some(self.cells[row * self.columns + column])
        } else {
            None
        }
    }

    /// Row-major cell states.
    pub fn cells(&self) -> &[CellState] {
        &self.cells
    }

    /// Iterates `(row, column, state)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, CellState)> + '_ {
        let columns = self.columns;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, &state)| (i / columns, i % columns, state))
    }

    /// Number of filled (on) slots.
    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_on()).count()
    }

    /// Coordinates of every filled slot.
    pub fn filled(&self) -> Vec<(usize, usize)> {
        self.iter()
            .filter(|(_, _, state)| state.is_on())
            .map(|(row, column, _)| (row, column))
            .collect()
    }

    /// Cells whose state differs between `self` and `next`, tagged with `next`'s sequence.
    pub fn diff(&self, next: &GridSnapshot) -> ChangeEvent {
        debug_assert_eq!((self.rows, self.columns), (next.rows, next.columns));
        let changes = self
            .iter()
            .zip(next.cells.iter())
            .filter(|((_, _, old), new)| old != *new)
            .map(|((row, column, old), &new)| CellChange {
                row,
                column,
                old,
                new,
            })
            .collect();
        ChangeEvent {
            sequence: next.sequence,
            changes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellChange {
    pub row: usize,
    pub column: usize,
    pub old: CellState,
    pub new: CellState,
}

/// Cells that flipped between two consecutive snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    sequence: u64,
    changes: Vec<CellChange>,
}

impl ChangeEvent {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn changes(&self) -> &[CellChange] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }
}

//! The 5×5 bingo card and its column letters.
//!
//! A [`Grid`] arrives column-major on the wire: five arrays, one per letter,
//! each holding five cells top to bottom. The centre cell is the free
//! marker `"F"`, every other cell a number from its column's range.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolViolation;
use crate::protocol::CardId;

/// Number of columns (and rows) on a card.
pub const GRID_SIZE: usize = 5;

/// Column and row index of the free cell.
pub const FREE_CELL: (usize, usize) = (2, 2);

/// Wire spelling of the free cell.
const FREE_MARKER: &str = "F";

// ── Letters ─────────────────────────────────────────────────────────

/// One of the five B-I-N-G-O buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Letter {
    B,
    I,
    N,
    G,
    O,
}

impl Letter {
    /// All letters in column order.
    pub const ALL: [Letter; GRID_SIZE] = [Letter::B, Letter::I, Letter::N, Letter::G, Letter::O];

    /// The bucket a called number belongs to, or `None` outside 1..=75.
    pub fn of(number: i64) -> Option<Letter> {
        match number {
            1..=15 => Some(Letter::B),
            16..=30 => Some(Letter::I),
            31..=45 => Some(Letter::N),
            46..=60 => Some(Letter::G),
            61..=75 => Some(Letter::O),
            _ => None,
        }
    }

    /// Zero-based column index of this letter.
    pub fn column(self) -> usize {
        self as usize
    }

    /// The numbers that may appear under this letter.
    pub fn range(self) -> RangeInclusive<u8> {
        // Column index is at most 4, so this never overflows.
        let start = self as u8 * 15 + 1;
        start..=start + 14
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Letter::B => "B",
            Letter::I => "I",
            Letter::N => "N",
            Letter::G => "G",
            Letter::O => "O",
        };
        f.write_str(s)
    }
}

// ── Cells ───────────────────────────────────────────────────────────

/// A single square of the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCell", into = "RawCell")]
pub enum Cell {
    Number(u8),
    Free,
}

/// Wire form of a cell: a bare number or the `"F"` marker.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawCell {
    Number(u8),
    Marker(String),
}

impl TryFrom<RawCell> for Cell {
    type Error = String;

    fn try_from(raw: RawCell) -> std::result::Result<Self, Self::Error> {
        match raw {
            RawCell::Number(n) => Ok(Cell::Number(n)),
            RawCell::Marker(m) if m == FREE_MARKER => Ok(Cell::Free),
            RawCell::Marker(m) => Err(format!("unknown cell marker {m:?}")),
        }
    }
}

impl From<Cell> for RawCell {
    fn from(cell: Cell) -> Self {
        match cell {
            Cell::Number(n) => RawCell::Number(n),
            Cell::Free => RawCell::Marker(FREE_MARKER.to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Free => f.write_str(FREE_MARKER),
        }
    }
}

// ── Grid ────────────────────────────────────────────────────────────

/// Column-major 5×5 card layout as sent by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grid {
    columns: [[Cell; GRID_SIZE]; GRID_SIZE],
}

impl Grid {
    /// Build a grid from five columns (B first), each listed top to bottom.
    pub fn from_columns(columns: [[Cell; GRID_SIZE]; GRID_SIZE]) -> Self {
        Self { columns }
    }

    /// The cell at `column`, `row`, or `None` when out of bounds.
    pub fn cell(&self, column: usize, row: usize) -> Option<Cell> {
        self.columns.get(column)?.get(row).copied()
    }

    /// Cells of one row, left to right.
    pub fn row(&self, row: usize) -> impl Iterator<Item = Cell> + '_ {
        self.columns.iter().filter_map(move |col| col.get(row).copied())
    }

    /// Check the column ranges, the free centre, and per-card uniqueness.
    pub fn validate(&self) -> Result<(), ProtocolViolation> {
        let mut seen: u128 = 0;
        for (letter, column) in Letter::ALL.iter().zip(self.columns.iter()) {
            for (row, cell) in column.iter().enumerate() {
                let at_centre = (letter.column(), row) == FREE_CELL;
                match *cell {
                    Cell::Free if at_centre => {}
                    Cell::Free => {
                        return Err(ProtocolViolation::MalformedCard(format!(
                            "free cell at {letter}{row}"
                        )));
                    }
                    Cell::Number(_) if at_centre => {
                        return Err(ProtocolViolation::MalformedCard(
                            "centre cell is not free".into(),
                        ));
                    }
                    Cell::Number(n) => {
                        if !letter.range().contains(&n) {
                            return Err(ProtocolViolation::MalformedCard(format!(
                                "{n} does not belong under {letter}"
                            )));
                        }
                        let bit = 1u128 << n;
                        if seen & bit != 0 {
                            return Err(ProtocolViolation::MalformedCard(format!(
                                "{n} appears twice"
                            )));
                        }
                        seen |= bit;
                    }
                }
            }
        }
        Ok(())
    }
}

// ── Card ────────────────────────────────────────────────────────────

/// The card owned by the local player for this round.
///
/// Only the marked-cell annotation changes after assignment. Marks are a
/// local aid; the coordinator judges claims against its own view of the card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    /// Pool id, when the coordinator or the pending purchase told us.
    pub id: Option<CardId>,
    grid: Grid,
    marked: BTreeSet<(usize, usize)>,
}

impl Card {
    pub(crate) fn new(id: Option<CardId>, grid: Grid) -> Self {
        Self {
            id,
            grid,
            marked: BTreeSet::new(),
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Whether the cell counts as matched. The free cell always does.
    pub fn is_marked(&self, column: usize, row: usize) -> bool {
        (column, row) == FREE_CELL || self.marked.contains(&(column, row))
    }

    /// Cells the player has toggled on, excluding the free cell.
    pub fn marked_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.marked.iter().copied()
    }

    /// Flip the mark on a numbered cell and return its new state.
    ///
    /// Returns `None` for the free cell and for coordinates off the card.
    pub fn toggle_mark(&mut self, column: usize, row: usize) -> Option<bool> {
        match self.grid.cell(column, row)? {
            Cell::Free => None,
            Cell::Number(_) => {
                if self.marked.remove(&(column, row)) {
                    Some(false)
                } else {
                    self.marked.insert((column, row));
                    Some(true)
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
pub(crate) mod tests {
    use super::*;

    /// A valid grid: column `c` holds `15c+1 ..= 15c+5`, centre free.
    pub(crate) fn sample_grid() -> Grid {
        let mut columns = [[Cell::Free; GRID_SIZE]; GRID_SIZE];
        for (c, column) in columns.iter_mut().enumerate() {
            for (r, cell) in column.iter_mut().enumerate() {
                if (c, r) != FREE_CELL {
                    *cell = Cell::Number((c * 15 + r + 1) as u8);
                }
            }
        }
        Grid::from_columns(columns)
    }

    #[test]
    fn letter_ranges_cover_one_to_seventy_five() {
        assert_eq!(Letter::of(1), Some(Letter::B));
        assert_eq!(Letter::of(15), Some(Letter::B));
        assert_eq!(Letter::of(16), Some(Letter::I));
        assert_eq!(Letter::of(45), Some(Letter::N));
        assert_eq!(Letter::of(46), Some(Letter::G));
        assert_eq!(Letter::of(75), Some(Letter::O));
        assert_eq!(Letter::of(0), None);
        assert_eq!(Letter::of(76), None);
        assert_eq!(Letter::O.range(), 61..=75);
    }

    #[test]
    fn grid_decodes_column_major_with_free_marker() {
        let json = r#"[[1,2,3,4,5],[16,17,18,19,20],[31,32,"F",34,35],[46,47,48,49,50],[61,62,63,64,65]]"#;
        let grid: Grid = serde_json::from_str(json).unwrap();
        assert_eq!(grid.cell(2, 2), Some(Cell::Free));
        assert_eq!(grid.cell(1, 0), Some(Cell::Number(16)));
        assert_eq!(grid.row(0).collect::<Vec<_>>()[4], Cell::Number(61));
        assert!(grid.validate().is_ok());

        let back = serde_json::to_string(&grid).unwrap();
        assert_eq!(back, json);
    }

    #[test]
    fn unknown_marker_fails_to_decode() {
        let json = r#"[[1,2,3,4,5],[16,17,18,19,20],[31,32,"X",34,35],[46,47,48,49,50],[61,62,63,64,65]]"#;
        assert!(serde_json::from_str::<Grid>(json).is_err());
    }

    #[test]
    fn validate_rejects_number_in_wrong_column() {
        let mut columns = [[Cell::Free; GRID_SIZE]; GRID_SIZE];
        columns.copy_from_slice(&sample_grid().columns);
        columns[0][0] = Cell::Number(70);
        let err = Grid::from_columns(columns).validate().unwrap_err();
        assert!(matches!(err, ProtocolViolation::MalformedCard(_)));
    }

    #[test]
    fn validate_rejects_numbered_centre_and_stray_free() {
        let mut columns = sample_grid().columns;
        columns[2][2] = Cell::Number(33);
        assert!(Grid::from_columns(columns).validate().is_err());

        let mut columns = sample_grid().columns;
        columns[0][1] = Cell::Free;
        assert!(Grid::from_columns(columns).validate().is_err());
    }

    #[test]
    fn validate_rejects_repeated_number() {
        let mut columns = sample_grid().columns;
        columns[0][1] = Cell::Number(1);
        assert!(Grid::from_columns(columns).validate().is_err());
    }

    #[test]
    fn free_cell_is_always_marked_and_cannot_toggle() {
        let mut card = Card::new(Some(7), sample_grid());
        assert!(card.is_marked(2, 2));
        assert_eq!(card.toggle_mark(2, 2), None);
        assert!(card.is_marked(2, 2));
    }

    #[test]
    fn toggle_mark_flips_numbered_cells() {
        let mut card = Card::new(None, sample_grid());
        assert!(!card.is_marked(0, 0));
        assert_eq!(card.toggle_mark(0, 0), Some(true));
        assert!(card.is_marked(0, 0));
        assert_eq!(card.marked_cells().collect::<Vec<_>>(), vec![(0, 0)]);
        assert_eq!(card.toggle_mark(0, 0), Some(false));
        assert!(!card.is_marked(0, 0));
        assert_eq!(card.toggle_mark(5, 0), None);
    }
}

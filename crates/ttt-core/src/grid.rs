//! The 3x3 board and its text rendering.

use std::fmt;

use crate::Mark;

/// Width and height of the board.
pub const GRID_SIZE: usize = 3;

/// The eight winning lines as (row, col) triples: rows, columns, diagonals.
const LINES: [[(usize, usize); 3]; 8] = [
    // Rows
    [(0, 0), (0, 1), (0, 2)],
    [(1, 0), (1, 1), (1, 2)],
    [(2, 0), (2, 1), (2, 2)],
    // Columns
    [(0, 0), (1, 0), (2, 0)],
    [(0, 1), (1, 1), (2, 1)],
    [(0, 2), (1, 2), (2, 2)],
    // Diagonals
    [(0, 0), (1, 1), (2, 2)],
    [(0, 2), (1, 1), (2, 0)],
];

/// A single square on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    #[default]
    Empty,
    Marked(Mark),
}

impl Cell {
    fn symbol(self) -> char {
        match self {
            Cell::Empty => ' ',
            Cell::Marked(mark) => mark.symbol(),
        }
    }
}

/// 3x3 grid, indexed by (row, col).
///
/// Cells only ever go from `Empty` to `Marked`; there is no way to clear one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Grid {
    cells: [[Cell; GRID_SIZE]; GRID_SIZE],
}

impl Grid {
    /// Creates an empty grid.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cell at (row, col), or `None` when out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<Cell> {
        self.cells.get(row)?.get(col).copied()
    }

    /// Marks an empty cell. Returns false when the cell is out of bounds
    /// or already marked.
    pub(crate) fn place(&mut self, row: usize, col: usize, mark: Mark) -> bool {
        match self.cells.get_mut(row).and_then(|r| r.get_mut(col)) {
            Some(cell @ Cell::Empty) => {
                *cell = Cell::Marked(mark);
                true
            }
            _ => false,
        }
    }

    /// Checks whether `mark` holds all three cells of any row, column or diagonal.
    pub fn has_line(&self, mark: Mark) -> bool {
        LINES.iter().any(|line| {
            line.iter()
                .all(|&(row, col)| self.get(row, col) == Some(Cell::Marked(mark)))
        })
    }

    /// Number of marked cells.
    pub fn filled(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|cell| **cell != Cell::Empty)
            .count()
    }

    /// Renders the board as sent over the wire: a column header, one line
    /// per row with separators between rows, ending in a newline.
    ///
    /// ```text
    ///    0   1   2
    /// 0  X | O |  
    ///   ---+---+---
    /// 1    | X |  
    ///   ---+---+---
    /// 2    |   | O
    /// ```
    pub fn render(&self) -> String {
        let mut out = String::from("   0   1   2\n");
        for (i, row) in self.cells.iter().enumerate() {
            out.push_str(&format!("{i} "));
            for (j, cell) in row.iter().enumerate() {
                if j != 0 {
                    out.push('|');
                }
                out.push(' ');
                out.push(cell.symbol());
                out.push(' ');
            }
            out.push('\n');
            if i + 1 != GRID_SIZE {
                out.push_str("  ---+---+---\n");
            }
        }
        out
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

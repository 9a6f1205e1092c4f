use serde::{Deserialize, Serialize};

pub const GRID_SIZE: usize = 4;

/// One atomic step on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Move {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub const START: Position = Position { row: 0, col: 0 };

    /// One step in the given direction; steps past a grid edge stay put.
    pub fn step(self, mv: Move) -> Position {
        let Position { row, col } = self;
        match mv {
            Move::Up => Position {
                row: row.saturating_sub(1),
                col,
            },
            Move::Down => Position {
                row: (row + 1).min(GRID_SIZE - 1),
                col,
            },
            Move::Left => Position {
                row,
                col: col.saturating_sub(1),
            },
            Move::Right => Position {
                row,
                col: (col + 1).min(GRID_SIZE - 1),
            },
        }
    }
}

/// Walks the move list in order from the start tile.
pub fn resolve(moves: &[Move]) -> Position {
    moves.iter().fold(Position::START, |pos, mv| pos.step(*mv))
}

/// The fixed 4x4 terrain map. Built once at startup, never mutated; both
/// pipelines read from this single 0-indexed representation.
#[derive(Debug, Clone)]
pub struct TerrainMap {
    cells: [[&'static str; GRID_SIZE]; GRID_SIZE],
}

const DEFAULT_CELLS: [[&'static str; GRID_SIZE]; GRID_SIZE] = [
    ["Start", "Trawa", "Drzewo", "Dom"],
    ["Trawa", "Wiatrak", "Trawa", "Most"],
    ["Ruiny", "Wóz pełen siana", "Bagno", "Las"],
    ["Góry", "Pszczoły", "Samochód", "Jaskinia"],
];

impl Default for TerrainMap {
    fn default() -> Self {
        Self {
            cells: DEFAULT_CELLS,
        }
    }
}

impl TerrainMap {
    pub fn new(cells: [[&'static str; GRID_SIZE]; GRID_SIZE]) -> Self {
        Self { cells }
    }

    pub fn label_at(&self, row: usize, col: usize) -> &'static str {
        self.cells[row.min(GRID_SIZE - 1)][col.min(GRID_SIZE - 1)]
    }

    /// Tile description for a resolved position, shortened to its first two
    /// words when the label is longer.
    pub fn describe(&self, position: Position) -> String {
        self.label_at(position.row, position.col)
            .split_whitespace()
            .take(2)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

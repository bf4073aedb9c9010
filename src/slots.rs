use std::fmt;

/// Number of slots on the grid.
pub const SLOT_COUNT: usize = 9;
/// Slots per grid row.
pub const GRID_COLUMNS: usize = 3;

/// A slot on the 3x3 grid, numbered 1..=9 row by row.
///
/// This is the only position type in the crate. Raw slot numbers coming from
/// the UI go through [`Position::new`] so an out-of-range value can never reach
/// the photo store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position(u8);

impl Position {
    pub fn new(value: u8) -> Option<Self> {
        if (1..=SLOT_COUNT as u8).contains(&value) {
            Some(Self(value))
        } else {
            None
        }
    }

    /// All nine positions in ascending order.
    pub fn all() -> impl Iterator<Item = Position> {
        (1..=SLOT_COUNT as u8).map(Position)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-based index, row-major.
    pub fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    pub fn row(self) -> usize {
        self.index() / GRID_COLUMNS
    }

    pub fn column(self) -> usize {
        self.index() % GRID_COLUMNS
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Occupancy of a slot. Derived from the photo store, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Empty,
    Occupied,
}

impl SlotState {
    pub fn is_empty(self) -> bool {
        self == SlotState::Empty
    }
}
